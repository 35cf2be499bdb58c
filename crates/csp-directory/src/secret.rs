// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret tokens and other sensitive strings.
//!
//! A cloud's secret token authorizes writes into its directory. Directories
//! only ever persist its SHA-256 digest; the plaintext lives in a
//! [`SecretString`], which
//!
//! - prints `[REDACTED]` through `Debug`, `Display` and `Serialize`
//! - is zeroized on drop
//! - hands out the value only through an explicit [`SecretString::expose`]
//!
//! ```
//! use csp_directory::SecretString;
//!
//! let token = SecretString::new("K3Q8ZP1M0A");
//! assert_eq!(format!("{token}"), "[REDACTED]");
//! assert_eq!(token.expose(), "K3Q8ZP1M0A");
//! assert!(token.matches_digest(&token.digest()));
//! ```

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// Length of generated cloud secret tokens.
pub const SECRET_TOKEN_LENGTH: usize = 10;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A sensitive string that never shows up in logs.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SecretString {
	inner: String,
}

impl SecretString {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	/// Generate a fresh cloud secret token of uppercase letters and digits.
	pub fn generate_token() -> Self {
		let mut rng = rand::thread_rng();
		let inner = (0..SECRET_TOKEN_LENGTH)
			.map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
			.collect::<String>();
		Self { inner }
	}

	/// Explicitly access the plaintext.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Lowercase hex SHA-256 digest of the plaintext.
	pub fn digest(&self) -> String {
		secret_digest(&self.inner)
	}

	pub fn matches_digest(&self, digest: &str) -> bool {
		self.digest().eq_ignore_ascii_case(digest)
	}
}

/// Lowercase hex SHA-256 digest of a secret token.
pub fn secret_digest(plaintext: &str) -> String {
	hex::encode(Sha256::digest(plaintext.as_bytes()))
}

impl Clone for SecretString {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}
