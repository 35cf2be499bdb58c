// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity and endpoints of the CSP running the coordinators.

use csp_directory::{cloud_endpoint, CloudNumber, SecretString};
use url::Url;

use crate::error::{CspError, CspResult};

/// Service key of the connect endpoint declared in every new cloud.
pub const CONNECT_SERVICE_KEY: &str = "<$https><$connect><$xdi>";

/// Connect endpoint used when none is configured.
pub const DEFAULT_CONNECT_SERVICE_URI: &str =
	"http://respectconnect-dev.respectnetwork.net/respectconnect/";

/// Everything the coordinators need to know about the CSP itself.
///
/// Built once, validated with [`CspInformation::validate`] and never mutated.
#[derive(Debug, Clone)]
pub struct CspInformation {
	/// The CSP's own cloud number.
	pub cloud_number: CloudNumber,
	/// Token authorizing the CSP at the Registrar and in its registry.
	pub secret_token: SecretString,
	pub registrar_cloud_number: CloudNumber,
	pub registrar_endpoint: String,
	/// Endpoint of the registry holding hosted clouds' endpoints and token digests.
	pub registry_endpoint: String,
	/// Prefix of hosted cloud endpoints; the encoded cloud number is appended.
	pub cloud_base_endpoint: String,
	pub connect_service_uri: String,
}

impl CspInformation {
	pub fn validate(&self) -> CspResult<()> {
		if self.secret_token.is_empty() {
			return Err(CspError::Configuration("CSP secret token is empty".to_string()));
		}

		for (name, value) in [
			("registrar_endpoint", &self.registrar_endpoint),
			("registry_endpoint", &self.registry_endpoint),
			("cloud_base_endpoint", &self.cloud_base_endpoint),
			("connect_service_uri", &self.connect_service_uri),
		] {
			Url::parse(value)
				.map_err(|e| CspError::Configuration(format!("{name} '{value}' is not a URL: {e}")))?;
		}

		Ok(())
	}

	/// Endpoint of a cloud hosted by this CSP.
	pub fn cloud_endpoint(&self, number: &CloudNumber) -> String {
		cloud_endpoint(&self.cloud_base_endpoint, number)
	}
}
