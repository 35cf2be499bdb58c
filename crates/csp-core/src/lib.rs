// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Coordinators that provision and verify CSP-hosted clouds.
//!
//! [`RegistrationCoordinator`] signs up new clouds and binds names to them in
//! the Registrar, the CSP registry and the cloud itself.
//! [`VerificationCoordinator`] runs two-factor verification of a cloud's email
//! address and phone number and records signed proofs.
//!
//! Both coordinators can share an [`IdentityLedger`] that tracks each cloud's
//! [`LifecycleState`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use csp_core::{CspInformation, RegistrationCoordinator};
//! use csp_directory::{CloudName, CloudNumber, HttpDirectoryClient, SecretString};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let csp = CspInformation {
//! 	cloud_number: CloudNumber::parse("[+]!:uuid:1111")?,
//! 	secret_token: SecretString::new("CSPTOKEN01"),
//! 	registrar_cloud_number: CloudNumber::parse("[+]!:uuid:9999")?,
//! 	registrar_endpoint: "https://registrar.example.com/".to_string(),
//! 	registry_endpoint: "https://registry.example.com/".to_string(),
//! 	cloud_base_endpoint: "https://clouds.example.com/".to_string(),
//! 	connect_service_uri: csp_core::DEFAULT_CONNECT_SERVICE_URI.to_string(),
//! };
//!
//! let coordinator = RegistrationCoordinator::new(csp, Arc::new(HttpDirectoryClient::new()?))?;
//! let credential = coordinator.sign_up_new_user().await?;
//! coordinator
//! 	.register_user_cloud(
//! 		&credential.cloud_number,
//! 		&CloudName::parse("=alice")?,
//! 		&credential.secret_token,
//! 	)
//! 	.await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod profile;
pub mod registration;
pub mod verification;

pub use config::{CspInformation, CONNECT_SERVICE_KEY, DEFAULT_CONNECT_SERVICE_URI};
pub use error::{CspError, CspResult};
pub use identity::{CloudIdentity, CspUserCredential, IdentityLedger, LifecycleState, RegistrationStep};
pub use profile::{ContactKind, UserProfile};
pub use registration::RegistrationCoordinator;
pub use verification::{VerificationCoordinator, VerificationCoordinatorBuilder, VerificationProof};
