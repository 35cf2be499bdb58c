// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signatures over verified contact values.

use csp_directory::SecretString;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
	#[error("signing is not implemented by this signer")]
	NotImplemented,

	#[error("signing failed: {0}")]
	Failed(String),
}

/// Produces the signature stored in a verification proof.
pub trait Signer: Send + Sync {
	fn sign(&self, data: &[u8]) -> Result<String, SignerError>;
}

/// HMAC-SHA256 keyed with a CSP secret, hex encoded.
#[derive(Debug, Clone)]
pub struct HmacSigner {
	key: SecretString,
}

impl HmacSigner {
	pub fn new(key: SecretString) -> Self {
		Self { key }
	}

	/// Check `signature` against `data`.
	pub fn verify(&self, data: &[u8], signature: &str) -> bool {
		let Ok(expected) = hex::decode(signature) else {
			return false;
		};
		match HmacSha256::new_from_slice(self.key.expose().as_bytes()) {
			Ok(mut mac) => {
				mac.update(data);
				mac.verify_slice(&expected).is_ok()
			}
			Err(_) => false,
		}
	}
}

impl Signer for HmacSigner {
	fn sign(&self, data: &[u8]) -> Result<String, SignerError> {
		let mut mac = HmacSha256::new_from_slice(self.key.expose().as_bytes())
			.map_err(|e| SignerError::Failed(e.to_string()))?;
		mac.update(data);
		Ok(hex::encode(mac.finalize().into_bytes()))
	}
}

/// Refuses to sign anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedSigner;

impl Signer for UnimplementedSigner {
	fn sign(&self, _data: &[u8]) -> Result<String, SignerError> {
		Err(SignerError::NotImplemented)
	}
}
