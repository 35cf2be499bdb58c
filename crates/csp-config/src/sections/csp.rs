// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity and endpoints of the CSP.

use csp_core::{CspInformation, DEFAULT_CONNECT_SERVICE_URI};
use csp_directory::{CloudNumber, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration layer for the CSP section (all fields optional for layering).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CspConfigLayer {
	/// The CSP's own cloud number.
	pub cloud_number: Option<String>,
	/// Token authorizing the CSP at the Registrar and in its registry.
	#[serde(skip_serializing)]
	pub secret_token: Option<SecretString>,
	pub registrar_cloud_number: Option<String>,
	pub registrar_endpoint: Option<String>,
	pub registry_endpoint: Option<String>,
	/// Prefix of hosted cloud endpoints.
	pub cloud_base_endpoint: Option<String>,
	pub connect_service_uri: Option<String>,
}

impl CspConfigLayer {
	/// Merge with another layer, preferring values from `other`.
	pub fn merge(&mut self, other: CspConfigLayer) {
		if other.cloud_number.is_some() {
			self.cloud_number = other.cloud_number;
		}
		if other.secret_token.is_some() {
			self.secret_token = other.secret_token;
		}
		if other.registrar_cloud_number.is_some() {
			self.registrar_cloud_number = other.registrar_cloud_number;
		}
		if other.registrar_endpoint.is_some() {
			self.registrar_endpoint = other.registrar_endpoint;
		}
		if other.registry_endpoint.is_some() {
			self.registry_endpoint = other.registry_endpoint;
		}
		if other.cloud_base_endpoint.is_some() {
			self.cloud_base_endpoint = other.cloud_base_endpoint;
		}
		if other.connect_service_uri.is_some() {
			self.connect_service_uri = other.connect_service_uri;
		}
	}

	/// Build validated CSP information.
	pub fn build(self) -> Result<CspInformation, ConfigError> {
		let info = CspInformation {
			cloud_number: parse_cloud_number("csp.cloud_number", self.cloud_number)?,
			secret_token: required("csp.secret_token", self.secret_token)?,
			registrar_cloud_number: parse_cloud_number(
				"csp.registrar_cloud_number",
				self.registrar_cloud_number,
			)?,
			registrar_endpoint: required("csp.registrar_endpoint", self.registrar_endpoint)?,
			registry_endpoint: required("csp.registry_endpoint", self.registry_endpoint)?,
			cloud_base_endpoint: required("csp.cloud_base_endpoint", self.cloud_base_endpoint)?,
			connect_service_uri: self
				.connect_service_uri
				.unwrap_or_else(|| DEFAULT_CONNECT_SERVICE_URI.to_string()),
		};

		info
			.validate()
			.map_err(|e| ConfigError::Validation(e.to_string()))?;
		Ok(info)
	}
}

fn required<T>(key: &str, value: Option<T>) -> Result<T, ConfigError> {
	value.ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn parse_cloud_number(key: &str, value: Option<String>) -> Result<CloudNumber, ConfigError> {
	let value = required(key, value)?;
	CloudNumber::parse(&value).map_err(|e| ConfigError::InvalidValue {
		key: key.to_string(),
		message: e.to_string(),
	})
}
