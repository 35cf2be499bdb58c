// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP section for delivering verification emails.

use csp_directory::SecretString;
use csp_verification::{SmtpConfig, TlsMode};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parse a TLS mode from an environment or TOML value.
pub fn parse_tls_mode(value: &str) -> Result<TlsMode, ConfigError> {
	match value.to_lowercase().as_str() {
		"true" | "tls" => Ok(TlsMode::Tls),
		"starttls" => Ok(TlsMode::StartTls),
		"false" | "none" => Ok(TlsMode::None),
		_ => Err(ConfigError::InvalidValue {
			key: "smtp.tls_mode".to_string(),
			message: format!("Invalid value: '{value}'. Expected: true, tls, starttls, false, none"),
		}),
	}
}

/// Configuration layer for SMTP settings (all fields optional for layering).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<SecretString>,
	pub from_address: Option<String>,
	pub from_name: Option<String>,
	pub tls_mode: Option<TlsMode>,
}

impl SmtpConfigLayer {
	/// Merge with another layer, preferring values from `other`.
	pub fn merge(&mut self, other: SmtpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.from_address.is_some() {
			self.from_address = other.from_address;
		}
		if other.from_name.is_some() {
			self.from_name = other.from_name;
		}
		if other.tls_mode.is_some() {
			self.tls_mode = other.tls_mode;
		}
	}

	/// Build the final config, returning None if SMTP is not configured.
	pub fn build(self) -> Result<Option<SmtpConfig>, ConfigError> {
		let Some(host) = self.host.filter(|h| !h.is_empty()) else {
			return Ok(None);
		};

		let from_address = self
			.from_address
			.filter(|a| !a.is_empty())
			.ok_or_else(|| ConfigError::Validation("SMTP from_address is required when host is configured".to_string()))?;

		Ok(Some(SmtpConfig {
			host,
			port: self.port.unwrap_or(587),
			username: self.username,
			password: self.password,
			from_address,
			from_name: self.from_name.unwrap_or_else(|| "Cloud Service Provider".to_string()),
			tls_mode: self.tls_mode.unwrap_or_default(),
		}))
	}
}
