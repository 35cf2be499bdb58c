// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-use verification codes.
//!
//! A code is issued per [`TokenKey`], i.e. per cloud and per [`Purpose`].
//! Issuing a new code for a key replaces the previous one, so at most one code
//! per key is ever active.
//!
//! # Lifecycle
//!
//! ```text
//! create_token ──> active ──validate_token──> active (true/false)
//!                    │
//!                    ├──invalidate_token──> consumed ──validate_token──> TokenError::Consumed
//!                    │
//!                    └──ttl elapses──────> expired  ──validate_token──> TokenError::Expired
//! ```
//!
//! Validation never consumes a code. Callers that check a pair of codes
//! invalidate both only once both have matched.
//!
//! Codes are six decimal digits. [`InMemoryTokenManager`] stores only an
//! Argon2id hash of each code.

use std::collections::HashMap;
use std::fmt;

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use csp_directory::CloudNumber;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

/// Default lifetime of an issued code.
pub const DEFAULT_CODE_TTL_SECS: i64 = 15 * 60;

/// Longest lifetime a verification code may be configured with.
pub const MAX_CODE_TTL_SECS: i64 = 24 * 60 * 60;

/// What a code verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
	Email,
	Sms,
}

impl fmt::Display for Purpose {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Purpose::Email => f.write_str("email"),
			Purpose::Sms => f.write_str("sms"),
		}
	}
}

/// Identifies one code slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
	pub identity: CloudNumber,
	pub purpose: Purpose,
}

impl TokenKey {
	pub fn new(identity: CloudNumber, purpose: Purpose) -> Self {
		Self { identity, purpose }
	}

	pub fn email(identity: &CloudNumber) -> Self {
		Self::new(identity.clone(), Purpose::Email)
	}

	pub fn sms(identity: &CloudNumber) -> Self {
		Self::new(identity.clone(), Purpose::Sms)
	}
}

impl fmt::Display for TokenKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.identity, self.purpose)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
	#[error("no verification code issued for {0}")]
	NotFound(TokenKey),

	#[error("verification code for {0} has already been used")]
	Consumed(TokenKey),

	#[error("verification code for {0} has expired")]
	Expired(TokenKey),

	#[error("token storage error: {0}")]
	Storage(String),
}

/// Issues, checks and retires verification codes.
#[async_trait]
pub trait TokenManager: Send + Sync {
	/// Issue a fresh code for `key`, replacing any previous one.
	async fn create_token(&self, key: &TokenKey) -> Result<String, TokenError>;

	/// Whether `code` matches the active code for `key`. Does not consume it.
	async fn validate_token(&self, key: &TokenKey, code: &str) -> Result<bool, TokenError>;

	/// Mark the code for `key` as used. Fails with [`TokenError::Consumed`]
	/// if it already was, so at most one caller retires a given code.
	async fn invalidate_token(&self, key: &TokenKey) -> Result<(), TokenError>;
}

/// Generate a six digit numeric code.
pub fn generate_code() -> String {
	let mut rng = rand::thread_rng();
	format!("{:06}", rng.gen_range(0..1_000_000u32))
}

#[derive(Debug)]
struct IssuedCode {
	hash: String,
	expires_at: DateTime<Utc>,
	consumed: bool,
}

/// [`TokenManager`] backed by a process-local map.
pub struct InMemoryTokenManager {
	codes: RwLock<HashMap<TokenKey, IssuedCode>>,
	ttl: Duration,
	hasher: Argon2<'static>,
}

impl Default for InMemoryTokenManager {
	fn default() -> Self {
		Self::new()
	}
}

impl InMemoryTokenManager {
	pub fn new() -> Self {
		Self {
			codes: RwLock::new(HashMap::new()),
			ttl: Duration::seconds(DEFAULT_CODE_TTL_SECS),
			hasher: Argon2::default(),
		}
	}

	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	/// Replace the Argon2 parameters used to hash codes.
	pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
		self.hasher = hasher;
		self
	}

	fn hash(&self, code: &str) -> Result<String, TokenError> {
		let salt = SaltString::generate(&mut OsRng);
		self
			.hasher
			.hash_password(code.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| TokenError::Storage(format!("failed to hash code: {e}")))
	}

	fn verify(&self, code: &str, hash: &str) -> bool {
		match PasswordHash::new(hash) {
			Ok(parsed) => self.hasher.verify_password(code.as_bytes(), &parsed).is_ok(),
			Err(_) => false,
		}
	}
}

#[async_trait]
impl TokenManager for InMemoryTokenManager {
	#[instrument(skip(self), fields(key = %key))]
	async fn create_token(&self, key: &TokenKey) -> Result<String, TokenError> {
		let expires_at = Utc::now()
			.checked_add_signed(self.ttl)
			.ok_or_else(|| TokenError::Storage(format!("code lifetime {} overflows", self.ttl)))?;

		let code = generate_code();
		let issued = IssuedCode {
			hash: self.hash(&code)?,
			expires_at,
			consumed: false,
		};

		let replaced = self.codes.write().await.insert(key.clone(), issued).is_some();
		debug!(replaced, "issued verification code");
		Ok(code)
	}

	#[instrument(skip(self, code), fields(key = %key))]
	async fn validate_token(&self, key: &TokenKey, code: &str) -> Result<bool, TokenError> {
		let codes = self.codes.read().await;
		let issued = codes
			.get(key)
			.ok_or_else(|| TokenError::NotFound(key.clone()))?;

		if issued.consumed {
			return Err(TokenError::Consumed(key.clone()));
		}
		if Utc::now() >= issued.expires_at {
			return Err(TokenError::Expired(key.clone()));
		}

		let matched = self.verify(code, &issued.hash);
		debug!(matched, "validated verification code");
		Ok(matched)
	}

	#[instrument(skip(self), fields(key = %key))]
	async fn invalidate_token(&self, key: &TokenKey) -> Result<(), TokenError> {
		let mut codes = self.codes.write().await;
		let issued = codes
			.get_mut(key)
			.ok_or_else(|| TokenError::NotFound(key.clone()))?;

		if issued.consumed {
			return Err(TokenError::Consumed(key.clone()));
		}
		issued.consumed = true;
		debug!("invalidated verification code");
		Ok(())
	}
}
