// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory messages and the graphs they return.

use serde::{Deserialize, Serialize};

use crate::address::{xdi, Address};
use crate::secret::SecretString;
use crate::statement::Statement;

/// A single operation inside a [`DirectoryMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
	/// Read every statement at or below `address`.
	Get { address: Address },
	/// Upsert statements.
	Set { statements: Vec<Statement> },
	/// Directory-specific operation identified by `opcode`.
	Custom {
		opcode: Address,
		statements: Vec<Statement>,
	},
}

impl Operation {
	pub fn is_write(&self) -> bool {
		!matches!(self, Operation::Get { .. })
	}
}

/// One request to a directory.
///
/// A directory applies all operations of a message atomically or none of them.
#[derive(Debug, Clone)]
pub struct DirectoryMessage {
	/// Cloud number of the party sending the message.
	pub sender: Address,
	/// Peer root of the directory being addressed.
	pub to_peer_root: Address,
	/// Link contract the operations are authorized under.
	pub link_contract: Address,
	pub secret_token: Option<SecretString>,
	pub operations: Vec<Operation>,
}

impl DirectoryMessage {
	pub fn new(
		sender: impl Into<Address>,
		to_peer_root: impl Into<Address>,
		link_contract: impl Into<Address>,
	) -> Self {
		Self {
			sender: sender.into(),
			to_peer_root: to_peer_root.into(),
			link_contract: link_contract.into(),
			secret_token: None,
			operations: Vec::new(),
		}
	}

	pub fn with_secret_token(mut self, token: SecretString) -> Self {
		self.secret_token = Some(token);
		self
	}

	pub fn get(mut self, address: impl Into<Address>) -> Self {
		self.operations.push(Operation::Get {
			address: address.into(),
		});
		self
	}

	pub fn set(mut self, statements: Vec<Statement>) -> Self {
		self.operations.push(Operation::Set { statements });
		self
	}

	pub fn custom(mut self, opcode: impl Into<Address>, statements: Vec<Statement>) -> Self {
		self.operations.push(Operation::Custom {
			opcode: opcode.into(),
			statements,
		});
		self
	}

	pub fn is_read_only(&self) -> bool {
		!self.operations.iter().any(Operation::is_write)
	}

	/// Number of statements this message writes.
	pub fn write_count(&self) -> usize {
		self
			.operations
			.iter()
			.map(|op| match op {
				Operation::Get { .. } => 0,
				Operation::Set { statements } | Operation::Custom { statements, .. } => statements.len(),
			})
			.sum()
	}
}

/// Statements returned by a directory for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultGraph {
	#[serde(default)]
	statements: Vec<Statement>,
}

impl ResultGraph {
	pub fn new(statements: Vec<Statement>) -> Self {
		Self { statements }
	}

	pub fn statements(&self) -> &[Statement] {
		&self.statements
	}

	pub fn into_statements(self) -> Vec<Statement> {
		self.statements
	}

	pub fn is_empty(&self) -> bool {
		self.statements.is_empty()
	}

	pub fn len(&self) -> usize {
		self.statements.len()
	}

	/// Target of the first relation `subject/predicate/*`.
	pub fn relation_target(&self, subject: &str, predicate: &str) -> Option<&Address> {
		self
			.statements
			.iter()
			.filter(|s| s.subject.as_str() == subject && s.predicate.as_str() == predicate)
			.find_map(Statement::target)
	}

	/// Value of the literal stored at `subject`.
	pub fn literal(&self, subject: &str) -> Option<&str> {
		self
			.statements
			.iter()
			.filter(|s| s.subject.as_str() == subject && s.predicate.as_str() == xdi::LITERAL)
			.find_map(Statement::literal_value)
	}

	pub fn contains(&self, statement: &Statement) -> bool {
		self.statements.contains(statement)
	}
}
