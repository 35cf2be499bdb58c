// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory statements.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{xdi, Address};

/// Object of a statement: either another address or a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Object {
	Address(Address),
	Literal(String),
}

/// A `(subject, predicate, object)` triple.
///
/// Relations point one address at another. Literals carry a string value and
/// always use the `&` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
	pub subject: Address,
	pub predicate: Address,
	pub object: Object,
}

impl Statement {
	pub fn relation(
		subject: impl Into<Address>,
		predicate: impl Into<Address>,
		target: impl Into<Address>,
	) -> Self {
		Self {
			subject: subject.into(),
			predicate: predicate.into(),
			object: Object::Address(target.into()),
		}
	}

	pub fn literal(subject: impl Into<Address>, value: impl Into<String>) -> Self {
		Self {
			subject: subject.into(),
			predicate: Address::new(xdi::LITERAL),
			object: Object::Literal(value.into()),
		}
	}

	pub fn is_literal(&self) -> bool {
		matches!(self.object, Object::Literal(_))
	}

	pub fn target(&self) -> Option<&Address> {
		match &self.object {
			Object::Address(target) => Some(target),
			Object::Literal(_) => None,
		}
	}

	pub fn literal_value(&self) -> Option<&str> {
		match &self.object {
			Object::Literal(value) => Some(value),
			Object::Address(_) => None,
		}
	}
}

impl fmt::Display for Statement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.object {
			Object::Address(target) => write!(f, "{}/{}/{}", self.subject, self.predicate, target),
			Object::Literal(value) => write!(f, "{}/{}/{value:?}", self.subject, self.predicate),
		}
	}
}
