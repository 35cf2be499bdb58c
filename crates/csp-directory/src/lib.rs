// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory graph model and clients for CSP cloud provisioning.
//!
//! A cloud identity lives in three independently operated directories: the
//! central Registrar, the CSP's own registry, and the identity's own cloud.
//! This crate models what travels between them:
//!
//! - [`Address`], [`CloudNumber`] and [`CloudName`]: the addressing scheme
//! - [`Statement`]: a `(subject, predicate, object)` triple
//! - [`DirectoryMessage`]: one atomic request carrying [`Operation`]s
//! - [`ResultGraph`]: the statements a directory returns
//!
//! and provides the [`DirectoryClient`] seam with two implementations:
//! [`HttpDirectoryClient`] for remote directories and [`MemoryDirectory`] for
//! an in-process network of directories.
//!
//! # Example
//!
//! ```no_run
//! use csp_directory::{
//! 	xdi, CloudName, CloudNumber, DirectoryClient, DirectoryMessage, HttpDirectoryClient,
//! 	SecretString,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpDirectoryClient::new()?;
//! let registrar = CloudNumber::parse("[+]!:uuid:9999")?;
//! let name = CloudName::parse("=alice")?;
//!
//! let message = DirectoryMessage::new(
//! 	"[+]!:uuid:1111",
//! 	registrar.peer_root(),
//! 	xdi::REGISTRAR_LINK_CONTRACT,
//! )
//! .with_secret_token(SecretString::new("csp-token"))
//! .get(name.peer_root());
//!
//! let graph = client.send("https://registrar.example.com/", &message).await?;
//! let bound = graph.relation_target(name.peer_root().as_str(), xdi::REF);
//! println!("{bound:?}");
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod generator;
pub mod http;
pub mod memory;
pub mod message;
pub mod secret;
pub mod statement;

pub use address::{xdi, Address, AddressError, CloudName, CloudNumber, ContextSymbol};
pub use client::DirectoryClient;
pub use endpoint::{cloud_endpoint, cloud_number_from_endpoint, decode_identifier, encode_identifier};
pub use error::DirectoryError;
pub use generator::{CloudNumberGenerator, UuidCloudNumberGenerator};
pub use http::HttpDirectoryClient;
pub use memory::MemoryDirectory;
pub use message::{DirectoryMessage, Operation, ResultGraph};
pub use secret::{secret_digest, SecretString, REDACTED};
pub use statement::{Object, Statement};
