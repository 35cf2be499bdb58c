// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the CSP coordinators.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`/etc/csp/csp.toml` or an explicit path)
//! 3. Environment variables (`CSP_*`, secrets also via `*_FILE`)
//!
//! # Usage
//!
//! ```no_run
//! use csp_config::load_config;
//!
//! let settings = load_config()?;
//! println!("CSP {} via {}", settings.csp.cloud_number, settings.csp.registry_endpoint);
//! # Ok::<(), csp_config::ConfigError>(())
//! ```
//!
//! An example file:
//!
//! ```toml
//! [csp]
//! cloud_number = "[+]!:uuid:1111"
//! registrar_cloud_number = "[+]!:uuid:9999"
//! registrar_endpoint = "https://registrar.example.com/"
//! registry_endpoint = "https://registry.example.com/"
//! cloud_base_endpoint = "https://clouds.example.com/"
//!
//! [verification]
//! validation_endpoint = "https://csp.example.com/validate"
//! code_ttl_secs = 900
//!
//! [smtp]
//! host = "smtp.example.com"
//! from_address = "noreply@example.com"
//! tls_mode = "starttls"
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::SettingsLayer;
pub use sections::*;
pub use sources::{load_secret_env, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use csp_core::CspInformation;
use csp_verification::SmtpConfig;
use tracing::{debug, info};

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct CspSettings {
	pub csp: CspInformation,
	pub verification: VerificationConfig,
	pub smtp: Option<SmtpConfig>,
}

/// Load settings from all sources with standard precedence.
pub fn load_config() -> Result<CspSettings, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load settings with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<std::path::PathBuf>) -> Result<CspSettings, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load settings from the environment only.
pub fn load_config_from_env() -> Result<CspSettings, ConfigError> {
	let mut merged = SettingsLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<CspSettings, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = SettingsLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize a merged layer into validated settings.
pub fn finalize(layer: SettingsLayer) -> Result<CspSettings, ConfigError> {
	let csp = layer.csp.unwrap_or_default().build()?;
	let verification = layer.verification.unwrap_or_default().build()?;
	let smtp = layer.smtp.unwrap_or_default().build()?;

	info!(
		cloud_number = %csp.cloud_number,
		registrar = %csp.registrar_endpoint,
		registry = %csp.registry_endpoint,
		code_ttl_secs = verification.code_ttl_secs,
		signing_configured = verification.signing_key.is_some(),
		smtp_configured = smtp.is_some(),
		"CSP configuration loaded"
	);

	Ok(CspSettings {
		csp,
		verification,
		smtp,
	})
}
