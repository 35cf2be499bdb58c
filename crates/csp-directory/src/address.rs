// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Addresses, cloud numbers and cloud names.
//!
//! Everything stored in a directory is keyed by an [`Address`]. Two kinds of
//! address identify a cloud:
//!
//! - A [`CloudNumber`] is the permanent, opaque identifier assigned at sign-up,
//!   e.g. `[=]!:uuid:4f5c1a52-...`.
//! - A [`CloudName`] is a human alias (`=alice`, `alice.example`) bound to a
//!   cloud number through `$ref` relations.
//!
//! Both have a *peer root* form, `(<address>)`, used when a statement talks
//! about the cloud as a whole rather than something inside it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known addresses used by the provisioning protocol.
pub mod xdi {
	/// Binds a name (or peer root) to the cloud number it refers to.
	pub const REF: &str = "$ref";
	/// Reverse binding from a cloud number to its names.
	pub const IS_REF: &str = "$is$ref";
	/// Variable target; the directory assigns a value on write.
	pub const VARIABLE: &str = "{}";
	/// Predicate used by literal statements.
	pub const LITERAL: &str = "&";

	/// Root link contract of a cloud or registry.
	pub const ROOT_LINK_CONTRACT: &str = "$do";
	/// Public link contract; anything granted here is world readable.
	pub const PUBLIC_LINK_CONTRACT: &str = "$public$do";
	/// Link contract the Registrar exposes to member CSPs.
	pub const REGISTRAR_LINK_CONTRACT: &str = "+registrar$do";
	/// Read permission.
	pub const GET: &str = "$get";

	/// Literal holding the digest of a cloud's secret token.
	pub const SECRET_TOKEN_DIGEST: &str = "<$digest><$secret><$token>&";
	/// Custom operation that stores the digest of the supplied secret token.
	pub const SET_SECRET_TOKEN_DIGEST: &str = "$do<$digest><$secret><$token>";
	/// Literal holding the endpoint of a cloud.
	pub const XDI_ENDPOINT: &str = "<$xdi><$uri>&";
	/// Service URI segment.
	pub const URI: &str = "<$uri>";
	/// Attribution of a verification proof.
	pub const VALIDATOR: &str = "+validator";
}

/// Errors raised when parsing cloud numbers or names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
	#[error("address is empty")]
	Empty,

	#[error("invalid cloud number '{0}'")]
	InvalidCloudNumber(String),

	#[error("invalid cloud name '{0}'")]
	InvalidCloudName(String),
}

/// A directory address.
///
/// Addresses compose by plain concatenation, so `(=!:uuid:1)` joined with
/// `<$xdi><$uri>&` yields `(=!:uuid:1)<$xdi><$uri>&`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
	pub fn new(address: impl Into<String>) -> Self {
		Self(address.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Append `suffix` to this address.
	pub fn join(&self, suffix: &str) -> Address {
		Address(format!("{}{suffix}", self.0))
	}

	pub fn is_variable(&self) -> bool {
		self.0 == xdi::VARIABLE
	}

	/// The address wrapped by a peer root, if this is one.
	pub fn peer_root_inner(&self) -> Option<&str> {
		self
			.0
			.strip_prefix('(')
			.and_then(|rest| rest.strip_suffix(')'))
			.filter(|inner| !inner.is_empty())
	}

	/// Whether this address lies at or below `prefix`.
	pub fn starts_with(&self, prefix: &Address) -> bool {
		self.0.starts_with(prefix.as_str())
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Address {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<String> for Address {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&Address> for Address {
	fn from(value: &Address) -> Self {
		value.clone()
	}
}

/// Context symbol of a cloud number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSymbol {
	/// `=`: an individual.
	Person,
	/// `@`: an organization.
	Organization,
	/// `+`: a general concept or service.
	General,
}

impl ContextSymbol {
	pub fn as_char(self) -> char {
		match self {
			ContextSymbol::Person => '=',
			ContextSymbol::Organization => '@',
			ContextSymbol::General => '+',
		}
	}

	pub fn from_char(c: char) -> Option<Self> {
		match c {
			'=' => Some(ContextSymbol::Person),
			'@' => Some(ContextSymbol::Organization),
			'+' => Some(ContextSymbol::General),
			_ => None,
		}
	}
}

/// Characters that may never appear inside a cloud number or name.
fn has_reserved_chars(value: &str) -> bool {
	value
		.chars()
		.any(|c| c.is_whitespace() || matches!(c, '/' | '(' | ')' | '{' | '}' | '&' | '"'))
}

/// Permanent identifier of a cloud, e.g. `[=]!:uuid:4f5c1a52-...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CloudNumber(String);

impl CloudNumber {
	/// Parse a cloud number of the form `[<cs>]!<rest>`.
	pub fn parse(value: &str) -> Result<Self, AddressError> {
		if value.is_empty() {
			return Err(AddressError::Empty);
		}

		let mut chars = value.chars();
		let well_formed = chars.next() == Some('[')
			&& chars.next().and_then(ContextSymbol::from_char).is_some()
			&& chars.next() == Some(']')
			&& chars.next() == Some('!')
			&& chars.next().is_some()
			&& !has_reserved_chars(value);

		if !well_formed {
			return Err(AddressError::InvalidCloudNumber(value.to_string()));
		}

		Ok(Self(value.to_string()))
	}

	pub(crate) fn new_unchecked(value: String) -> Self {
		Self(value)
	}

	/// Parse the cloud number wrapped by a peer root address.
	pub fn from_peer_root(address: &Address) -> Result<Self, AddressError> {
		let inner = address
			.peer_root_inner()
			.ok_or_else(|| AddressError::InvalidCloudNumber(address.to_string()))?;
		Self::parse(inner)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn context_symbol(&self) -> ContextSymbol {
		// parse() guarantees the second character is a context symbol
		self
			.0
			.chars()
			.nth(1)
			.and_then(ContextSymbol::from_char)
			.unwrap_or(ContextSymbol::General)
	}

	pub fn address(&self) -> Address {
		Address(self.0.clone())
	}

	pub fn peer_root(&self) -> Address {
		Address(format!("({})", self.0))
	}
}

impl fmt::Display for CloudNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl TryFrom<String> for CloudNumber {
	type Error = AddressError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl From<CloudNumber> for String {
	fn from(value: CloudNumber) -> Self {
		value.0
	}
}

impl std::str::FromStr for CloudNumber {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Human-readable alias of a cloud.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CloudName(String);

impl CloudName {
	pub fn parse(value: &str) -> Result<Self, AddressError> {
		if value.is_empty() {
			return Err(AddressError::Empty);
		}
		if has_reserved_chars(value) || value.contains('!') {
			return Err(AddressError::InvalidCloudName(value.to_string()));
		}
		Ok(Self(value.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn address(&self) -> Address {
		Address(self.0.clone())
	}

	pub fn peer_root(&self) -> Address {
		Address(format!("({})", self.0))
	}
}

impl fmt::Display for CloudName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl TryFrom<String> for CloudName {
	type Error = AddressError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl From<CloudName> for String {
	fn from(value: CloudName) -> Self {
		value.0
	}
}

impl std::str::FromStr for CloudName {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
