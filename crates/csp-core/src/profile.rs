// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Personal profile stored in a cloud and the contact channels it verifies.

use std::fmt;

use csp_directory::{Address, CloudNumber, Statement};
use csp_verification::{is_valid_email, Purpose};
use serde::{Deserialize, Serialize};

use crate::error::{CspError, CspResult};

/// A verifiable contact channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
	Email,
	Phone,
}

impl ContactKind {
	pub const ALL: [ContactKind; 2] = [ContactKind::Email, ContactKind::Phone];

	/// Address segment the contact is stored under.
	pub fn segment(self) -> &'static str {
		match self {
			ContactKind::Email => "<+email>",
			ContactKind::Phone => "<+phone>",
		}
	}

	/// Code purpose that verifies this channel.
	pub fn purpose(self) -> Purpose {
		match self {
			ContactKind::Email => Purpose::Email,
			ContactKind::Phone => Purpose::Sms,
		}
	}

	/// Literal holding the contact value, e.g. `[=]!:uuid:1<+email>&`.
	pub fn value_address(self, number: &CloudNumber) -> Address {
		number.address().join(self.segment()).join("&")
	}
}

impl fmt::Display for ContactKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ContactKind::Email => f.write_str("email"),
			ContactKind::Phone => f.write_str("phone"),
		}
	}
}

/// Profile collected before contact verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	pub name: String,
	pub nickname: String,
	pub email: String,
	pub phone: String,
	pub street: String,
	pub city: String,
	pub state: String,
	pub postal_code: String,
}

impl UserProfile {
	pub fn validate(&self) -> CspResult<()> {
		if !is_valid_email(&self.email) {
			return Err(CspError::InvalidInput(format!(
				"'{}' is not a valid email address",
				self.email
			)));
		}

		let phone_ok = self.phone.chars().any(|c| c.is_ascii_digit())
			&& self
				.phone
				.chars()
				.all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
		if !phone_ok {
			return Err(CspError::InvalidInput(format!(
				"'{}' is not a valid phone number",
				self.phone
			)));
		}

		Ok(())
	}

	/// One literal per non-empty field, addressed under `number`.
	pub fn statements(&self, number: &CloudNumber) -> Vec<Statement> {
		let base = number.address();
		[
			("<+name><+full>&", &self.name),
			("<+name><+nickname>&", &self.nickname),
			("<+email>&", &self.email),
			("<+phone>&", &self.phone),
			("<+addr><+street>&", &self.street),
			("<+addr><+city>&", &self.city),
			("<+addr><+state>&", &self.state),
			("<+addr><+postalcode>&", &self.postal_code),
		]
		.into_iter()
		.filter(|(_, value)| !value.is_empty())
		.map(|(suffix, value)| Statement::literal(base.join(suffix), value.as_str()))
		.collect()
	}
}
