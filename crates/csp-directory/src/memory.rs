// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process network of directories.
//!
//! [`MemoryDirectory`] behaves like the Registrar, a CSP registry and every
//! cloud the CSP hosts, all behind one [`DirectoryClient`]. It keeps one graph
//! per endpoint and enforces the same rules the remote directories do:
//!
//! - **Authorization**: service endpoints (Registrar, registry) require their
//!   configured secret token. Hosted clouds require the token whose digest the
//!   registry stores at `(<cloud number>)<$digest><$secret><$token>&`.
//! - **Bindings are write-once**: the first `$ref` written for a subject wins.
//!   A later write returns the existing binding, which is how callers detect
//!   conflicts.
//! - **Variables**: a `$ref` pointing at `{}` is assigned a fresh cloud number.
//! - **Atomicity**: a message is validated completely before anything is
//!   applied.
//!
//! Failure injection and request counters make it suitable for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::address::{xdi, Address, CloudNumber, ContextSymbol};
use crate::client::DirectoryClient;
use crate::endpoint::cloud_number_from_endpoint;
use crate::error::DirectoryError;
use crate::generator::{CloudNumberGenerator, UuidCloudNumberGenerator};
use crate::message::{DirectoryMessage, Operation, ResultGraph};
use crate::secret::{secret_digest, SecretString};
use crate::statement::{Object, Statement};

/// Statements stored at one endpoint, in insertion order.
#[derive(Debug, Default)]
struct Graph {
	statements: Vec<Statement>,
}

impl Graph {
	fn query(&self, prefix: &Address) -> Vec<Statement> {
		self
			.statements
			.iter()
			.filter(|s| s.subject.starts_with(prefix))
			.cloned()
			.collect()
	}

	fn binding(&self, subject: &Address) -> Option<&Statement> {
		self
			.statements
			.iter()
			.find(|s| &s.subject == subject && s.predicate.as_str() == xdi::REF)
	}

	fn literal(&self, subject: &str) -> Option<&str> {
		self
			.statements
			.iter()
			.find(|s| s.subject.as_str() == subject && s.predicate.as_str() == xdi::LITERAL)
			.and_then(Statement::literal_value)
	}

	fn upsert_literal(&mut self, statement: Statement) {
		self
			.statements
			.retain(|s| !(s.subject == statement.subject && s.predicate.as_str() == xdi::LITERAL));
		self.statements.push(statement);
	}

	fn insert_relation(&mut self, statement: Statement) {
		if !self.statements.contains(&statement) {
			self.statements.push(statement);
		}
	}
}

#[derive(Debug, Clone)]
enum Access {
	/// Requests must carry a token with this digest.
	Token(String),
	Open,
}

#[derive(Debug, Clone)]
struct Hosting {
	cloud_base: String,
	registry_endpoint: String,
}

#[derive(Debug, Default)]
struct State {
	graphs: HashMap<String, Graph>,
	services: HashMap<String, Access>,
	hosting: Option<Hosting>,
	pending_failures: HashMap<String, String>,
	requests: HashMap<String, usize>,
	writes: HashMap<String, usize>,
}

/// An in-memory directory network.
///
/// ```
/// use csp_directory::{MemoryDirectory, SecretString};
///
/// let csp_token = SecretString::new("CSPTOKEN01");
/// let directory = MemoryDirectory::new()
/// 	.with_service("https://registrar.example.com/", &csp_token)
/// 	.with_service("https://registry.example.com/", &csp_token)
/// 	.with_cloud_hosting("https://cloud.example.com/", "https://registry.example.com/");
/// ```
pub struct MemoryDirectory {
	state: Mutex<State>,
	generator: Arc<dyn CloudNumberGenerator>,
}

impl Default for MemoryDirectory {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDirectory {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State::default()),
			generator: Arc::new(UuidCloudNumberGenerator),
		}
	}

	/// Serve `endpoint`, requiring `token` on every message.
	pub fn with_service(mut self, endpoint: impl Into<String>, token: &SecretString) -> Self {
		self
			.state
			.get_mut()
			.services
			.insert(endpoint.into(), Access::Token(token.digest()));
		self
	}

	/// Serve `endpoint` without authorization.
	pub fn with_open_service(mut self, endpoint: impl Into<String>) -> Self {
		self
			.state
			.get_mut()
			.services
			.insert(endpoint.into(), Access::Open);
		self
	}

	/// Host clouds under `cloud_base`, authorized by digests kept in the
	/// registry served at `registry_endpoint`.
	pub fn with_cloud_hosting(
		mut self,
		cloud_base: impl Into<String>,
		registry_endpoint: impl Into<String>,
	) -> Self {
		self.state.get_mut().hosting = Some(Hosting {
			cloud_base: cloud_base.into(),
			registry_endpoint: registry_endpoint.into(),
		});
		self
	}

	/// Use `generator` to resolve `{}` binding targets.
	pub fn with_generator(mut self, generator: Arc<dyn CloudNumberGenerator>) -> Self {
		self.generator = generator;
		self
	}

	/// Make the next message sent to `endpoint` fail with a transport error.
	pub async fn fail_next(&self, endpoint: impl Into<String>, reason: impl Into<String>) {
		self
			.state
			.lock()
			.await
			.pending_failures
			.insert(endpoint.into(), reason.into());
	}

	/// Every statement stored at `endpoint`.
	pub async fn snapshot(&self, endpoint: &str) -> ResultGraph {
		let state = self.state.lock().await;
		let statements = state
			.graphs
			.get(endpoint)
			.map(|g| g.statements.clone())
			.unwrap_or_default();
		ResultGraph::new(statements)
	}

	/// Messages received by `endpoint`, including rejected ones.
	pub async fn request_count(&self, endpoint: &str) -> usize {
		let state = self.state.lock().await;
		state.requests.get(endpoint).copied().unwrap_or(0)
	}

	/// Messages that changed the graph at `endpoint`.
	pub async fn write_count(&self, endpoint: &str) -> usize {
		let state = self.state.lock().await;
		state.writes.get(endpoint).copied().unwrap_or(0)
	}

	pub async fn total_write_count(&self) -> usize {
		let state = self.state.lock().await;
		state.writes.values().sum()
	}
}

impl State {
	fn authorize(&self, endpoint: &str, message: &DirectoryMessage) -> Result<(), DirectoryError> {
		let required = match self.services.get(endpoint) {
			Some(Access::Open) => return Ok(()),
			Some(Access::Token(digest)) => digest.clone(),
			None => self.hosted_cloud_digest(endpoint)?,
		};

		match &message.secret_token {
			Some(token) if token.matches_digest(&required) => Ok(()),
			Some(_) => Err(DirectoryError::Unauthorized(format!(
				"secret token rejected by {endpoint}"
			))),
			None => Err(DirectoryError::Unauthorized(format!(
				"{endpoint} requires a secret token"
			))),
		}
	}

	fn hosted_cloud_digest(&self, endpoint: &str) -> Result<String, DirectoryError> {
		let not_found = || DirectoryError::Remote {
			status: 404,
			message: format!("no directory at {endpoint}"),
		};

		let hosting = self.hosting.as_ref().ok_or_else(not_found)?;
		let number = cloud_number_from_endpoint(&hosting.cloud_base, endpoint).ok_or_else(not_found)?;
		let digest_subject = number.peer_root().join(xdi::SECRET_TOKEN_DIGEST);

		self
			.graphs
			.get(&hosting.registry_endpoint)
			.and_then(|registry| registry.literal(digest_subject.as_str()))
			.map(str::to_string)
			.ok_or_else(not_found)
	}
}

fn validate_operations(message: &DirectoryMessage) -> Result<(), DirectoryError> {
	for op in &message.operations {
		if let Operation::Custom { opcode, statements } = op {
			if opcode.as_str() != xdi::SET_SECRET_TOKEN_DIGEST {
				return Err(DirectoryError::UnsupportedOperation(opcode.to_string()));
			}
			if statements.iter().any(|s| !s.is_literal()) {
				return Err(DirectoryError::UnsupportedOperation(format!(
					"{opcode} only accepts literal statements"
				)));
			}
		}
	}
	Ok(())
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
	#[instrument(
		skip(self, message),
		fields(to = %message.to_peer_root, operations = message.operations.len())
	)]
	async fn send(
		&self,
		endpoint: &str,
		message: &DirectoryMessage,
	) -> Result<ResultGraph, DirectoryError> {
		let mut state = self.state.lock().await;
		*state.requests.entry(endpoint.to_string()).or_default() += 1;

		if let Some(reason) = state.pending_failures.remove(endpoint) {
			warn!(endpoint = %endpoint, reason = %reason, "injected directory failure");
			return Err(DirectoryError::Transport(reason));
		}

		state.authorize(endpoint, message)?;
		validate_operations(message)?;

		let graph = state.graphs.entry(endpoint.to_string()).or_default();
		let mut result = Vec::new();

		for op in &message.operations {
			match op {
				Operation::Get { address } => result.extend(graph.query(address)),
				Operation::Set { statements } => {
					for statement in statements {
						result.push(apply_set(graph, statement, self.generator.as_ref()));
					}
				}
				Operation::Custom { statements, .. } => {
					for statement in statements {
						let plaintext = statement.literal_value().unwrap_or_default();
						let stored = Statement::literal(statement.subject.clone(), secret_digest(plaintext));
						graph.upsert_literal(stored.clone());
						result.push(stored);
					}
				}
			}
		}

		if !message.is_read_only() {
			*state.writes.entry(endpoint.to_string()).or_default() += 1;
		}

		debug!(endpoint = %endpoint, statements = result.len(), "message applied");
		Ok(ResultGraph::new(result))
	}
}

/// Apply one `Set` statement and return what the graph now holds for it.
fn apply_set(graph: &mut Graph, statement: &Statement, generator: &dyn CloudNumberGenerator) -> Statement {
	if statement.predicate.as_str() == xdi::REF {
		if let Some(existing) = graph.binding(&statement.subject) {
			return existing.clone();
		}

		let bound = match &statement.object {
			Object::Address(target) if target.is_variable() => Statement::relation(
				statement.subject.clone(),
				xdi::REF,
				assign_number(generator).peer_root(),
			),
			_ => statement.clone(),
		};
		graph.insert_relation(bound.clone());
		return bound;
	}

	if statement.is_literal() {
		graph.upsert_literal(statement.clone());
	} else {
		graph.insert_relation(statement.clone());
	}
	statement.clone()
}

fn assign_number(generator: &dyn CloudNumberGenerator) -> CloudNumber {
	generator.generate(ContextSymbol::Person)
}
