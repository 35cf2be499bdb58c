// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use csp_directory::SecretString;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::SettingsLayer;
use crate::sections::{parse_tls_mode, CspConfigLayer, SmtpConfigLayer, VerificationConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<SettingsLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<SettingsLayer, ConfigError> {
		debug!("loading defaults");
		Ok(SettingsLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/csp/csp.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<SettingsLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(SettingsLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: SettingsLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: CSP_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<SettingsLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(SettingsLayer {
			csp: Some(load_csp_from_env()?),
			verification: Some(load_verification_from_env()?),
			smtp: Some(load_smtp_from_env()?),
		})
	}
}

/// Load a secret from `VAR`, or from the file named by `VAR_FILE`.
///
/// `VAR_FILE` wins when both are set. A single trailing newline is stripped
/// from file contents.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, ConfigError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = std::env::var(&file_var) {
		if path.is_empty() {
			return Err(ConfigError::EmptySecretPath(file_var));
		}

		let path = PathBuf::from(path);
		let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::SecretFile {
			path: path.clone(),
			source: e,
		})?;
		let secret = content.strip_suffix('\n').unwrap_or(&content);
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(std::env::var(var).ok().map(SecretString::new))
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_csp_from_env() -> Result<CspConfigLayer, ConfigError> {
	Ok(CspConfigLayer {
		cloud_number: env_var("CSP_CLOUD_NUMBER"),
		secret_token: load_secret_env("CSP_SECRET_TOKEN")?,
		registrar_cloud_number: env_var("CSP_REGISTRAR_CLOUD_NUMBER"),
		registrar_endpoint: env_var("CSP_REGISTRAR_ENDPOINT"),
		registry_endpoint: env_var("CSP_REGISTRY_ENDPOINT"),
		cloud_base_endpoint: env_var("CSP_CLOUD_BASE_ENDPOINT"),
		connect_service_uri: env_var("CSP_CONNECT_SERVICE_URI"),
	})
}

fn load_verification_from_env() -> Result<VerificationConfigLayer, ConfigError> {
	Ok(VerificationConfigLayer {
		validation_endpoint: env_var("CSP_VERIFICATION_VALIDATION_ENDPOINT"),
		code_ttl_secs: env_u64("CSP_VERIFICATION_CODE_TTL_SECS")?,
		provider_name: env_var("CSP_VERIFICATION_PROVIDER_NAME"),
		signing_key: load_secret_env("CSP_VERIFICATION_SIGNING_KEY")?,
	})
}

fn load_smtp_from_env() -> Result<SmtpConfigLayer, ConfigError> {
	let tls_mode = env_var("CSP_SMTP_TLS").map(|v| parse_tls_mode(&v)).transpose()?;

	Ok(SmtpConfigLayer {
		host: env_var("CSP_SMTP_HOST"),
		port: env_u16("CSP_SMTP_PORT")?,
		username: env_var("CSP_SMTP_USERNAME"),
		password: load_secret_env("CSP_SMTP_PASSWORD")?,
		from_address: env_var("CSP_SMTP_FROM_ADDRESS"),
		from_name: env_var("CSP_SMTP_FROM_NAME"),
		tls_mode,
	})
}
