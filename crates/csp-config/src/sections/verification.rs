// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Two-factor verification section.

use std::sync::Arc;

use csp_directory::SecretString;
use csp_verification::{
	DefaultMessageRenderer, HmacSigner, InMemoryTokenManager, Signer, UnimplementedSigner,
	DEFAULT_CODE_TTL_SECS, MAX_CODE_TTL_SECS,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

const DEFAULT_PROVIDER_NAME: &str = "Cloud Service Provider";

/// Configuration layer for verification settings (all fields optional for layering).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationConfigLayer {
	/// Callback linked from verification emails.
	pub validation_endpoint: Option<String>,
	/// Lifetime of issued codes.
	pub code_ttl_secs: Option<u64>,
	/// Name shown in verification messages.
	pub provider_name: Option<String>,
	/// HMAC key for verification proofs.
	#[serde(skip_serializing)]
	pub signing_key: Option<SecretString>,
}

impl VerificationConfigLayer {
	/// Merge with another layer, preferring values from `other`.
	pub fn merge(&mut self, other: VerificationConfigLayer) {
		if other.validation_endpoint.is_some() {
			self.validation_endpoint = other.validation_endpoint;
		}
		if other.code_ttl_secs.is_some() {
			self.code_ttl_secs = other.code_ttl_secs;
		}
		if other.provider_name.is_some() {
			self.provider_name = other.provider_name;
		}
		if other.signing_key.is_some() {
			self.signing_key = other.signing_key;
		}
	}

	pub fn build(self) -> Result<VerificationConfig, ConfigError> {
		let validation_endpoint = self
			.validation_endpoint
			.ok_or_else(|| ConfigError::Missing("verification.validation_endpoint".to_string()))?;
		Url::parse(&validation_endpoint).map_err(|e| ConfigError::InvalidValue {
			key: "verification.validation_endpoint".to_string(),
			message: e.to_string(),
		})?;

		let code_ttl_secs = self.code_ttl_secs.unwrap_or(DEFAULT_CODE_TTL_SECS as u64);
		if code_ttl_secs == 0 {
			return Err(ConfigError::Validation(
				"verification.code_ttl_secs must be greater than zero".to_string(),
			));
		}
		let code_ttl = i64::try_from(code_ttl_secs)
			.ok()
			.filter(|secs| *secs <= MAX_CODE_TTL_SECS)
			.and_then(chrono::TimeDelta::try_seconds)
			.ok_or_else(|| ConfigError::InvalidValue {
				key: "verification.code_ttl_secs".to_string(),
				message: format!("{code_ttl_secs} exceeds the maximum of {MAX_CODE_TTL_SECS} seconds"),
			})?;

		Ok(VerificationConfig {
			validation_endpoint,
			code_ttl_secs,
			code_ttl,
			provider_name: self
				.provider_name
				.unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
			signing_key: self.signing_key.filter(|key| !key.is_empty()),
		})
	}
}

/// Validated verification settings.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
	pub validation_endpoint: String,
	pub code_ttl_secs: u64,
	pub code_ttl: chrono::TimeDelta,
	pub provider_name: String,
	pub signing_key: Option<SecretString>,
}

impl VerificationConfig {
	pub fn token_manager(&self) -> InMemoryTokenManager {
		InMemoryTokenManager::new().with_ttl(self.code_ttl)
	}

	pub fn renderer(&self) -> DefaultMessageRenderer {
		DefaultMessageRenderer::new(self.provider_name.clone())
	}

	/// HMAC signer when a signing key is configured. Without one, proofs
	/// cannot be signed and verification fails at the signing step.
	pub fn signer(&self) -> Arc<dyn Signer> {
		match &self.signing_key {
			Some(key) => Arc::new(HmacSigner::new(key.clone())),
			None => Arc::new(UnimplementedSigner),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use csp_directory::CloudNumber;
	use csp_verification::{TokenKey, TokenManager};
	use proptest::prelude::*;

	fn layer() -> VerificationConfigLayer {
		VerificationConfigLayer {
			validation_endpoint: Some("https://csp.example.com/validate".to_string()),
			..Default::default()
		}
	}

	#[test]
	fn applies_defaults() {
		let config = layer().build().unwrap();
		assert_eq!(config.code_ttl_secs, 900);
		assert_eq!(config.provider_name, DEFAULT_PROVIDER_NAME);
		assert!(config.signing_key.is_none());
	}

	#[test]
	fn requires_validation_endpoint() {
		assert!(matches!(
			VerificationConfigLayer::default().build(),
			Err(ConfigError::Missing(_))
		));
	}

	#[test]
	fn rejects_relative_validation_endpoint() {
		let layer = VerificationConfigLayer {
			validation_endpoint: Some("/validate".to_string()),
			..Default::default()
		};
		assert!(matches!(layer.build(), Err(ConfigError::InvalidValue { .. })));
	}

	#[test]
	fn rejects_zero_ttl() {
		let layer = VerificationConfigLayer {
			code_ttl_secs: Some(0),
			..layer()
		};
		assert!(matches!(layer.build(), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn rejects_ttl_above_maximum() {
		for ttl in [MAX_CODE_TTL_SECS as u64 + 1, 10_000_000_000_000, u64::MAX] {
			let layer = VerificationConfigLayer {
				code_ttl_secs: Some(ttl),
				..layer()
			};
			assert!(matches!(
				layer.build(),
				Err(ConfigError::InvalidValue { ref key, .. }) if key == "verification.code_ttl_secs"
			));
		}
	}

	#[tokio::test]
	async fn maximum_ttl_issues_codes() {
		let config = VerificationConfigLayer {
			code_ttl_secs: Some(MAX_CODE_TTL_SECS as u64),
			..layer()
		}
		.build()
		.unwrap();
		let key = TokenKey::email(&CloudNumber::parse("[=]!:uuid:1").unwrap());
		assert!(config.token_manager().create_token(&key).await.is_ok());
	}

	#[test]
	fn signer_without_key_is_unimplemented() {
		let config = layer().build().unwrap();
		assert!(config.signer().sign(b"alice@example.com").is_err());
	}

	#[test]
	fn signer_with_key_signs() {
		let config = VerificationConfigLayer {
			signing_key: Some(SecretString::new("proof-key")),
			..layer()
		}
		.build()
		.unwrap();
		let signature = config.signer().sign(b"alice@example.com").unwrap();
		assert!(HmacSigner::new(SecretString::new("proof-key")).verify(b"alice@example.com", &signature));
	}

	#[test]
	fn empty_signing_key_counts_as_unset() {
		let config = VerificationConfigLayer {
			signing_key: Some(SecretString::new("")),
			..layer()
		}
		.build()
		.unwrap();
		assert!(config.signing_key.is_none());
	}

	proptest! {
		#[test]
		fn positive_ttl_is_kept(ttl in 1u64..=MAX_CODE_TTL_SECS as u64) {
			let config = VerificationConfigLayer {
				code_ttl_secs: Some(ttl),
				..layer()
			}
			.build()
			.unwrap();
			prop_assert_eq!(config.code_ttl_secs, ttl);
			prop_assert_eq!(config.code_ttl.num_seconds(), ttl as i64);
		}
	}
}
