// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cloud sign-up and name registration.
//!
//! A cloud is provisioned across three directories that share no transaction:
//!
//! | Directory     | Authorized by               | Holds                                      |
//! |---------------|-----------------------------|--------------------------------------------|
//! | Registrar     | CSP token, `+registrar$do`  | global name → number bindings, endpoints   |
//! | CSP registry  | CSP token, `$do`            | endpoints, token digests, local bindings   |
//! | Cloud         | cloud token, `$do`          | bindings, services, profile                |
//!
//! Writes happen one message at a time, in a fixed order, with no rollback.
//! The only guard against two CSPs claiming the same name is reading the
//! binding back after writing it; see [`RegistrationCoordinator::register_name_to`].

use std::collections::BTreeMap;
use std::sync::Arc;

use csp_directory::{
	xdi, CloudName, CloudNumber, CloudNumberGenerator, ContextSymbol, DirectoryClient,
	DirectoryError, DirectoryMessage, ResultGraph, SecretString, Statement,
	UuidCloudNumberGenerator,
};
use tracing::{debug, info, instrument, warn};

use crate::config::{CspInformation, CONNECT_SERVICE_KEY};
use crate::error::{CspError, CspResult};
use crate::identity::{CloudIdentity, CspUserCredential, IdentityLedger, LifecycleState, RegistrationStep};

/// Drives sign-up and naming of clouds hosted by one CSP.
pub struct RegistrationCoordinator {
	csp: Arc<CspInformation>,
	directory: Arc<dyn DirectoryClient>,
	generator: Arc<dyn CloudNumberGenerator>,
	ledger: Arc<IdentityLedger>,
}

impl RegistrationCoordinator {
	/// Validate `csp` and build a coordinator with a fresh ledger.
	pub fn new(csp: CspInformation, directory: Arc<dyn DirectoryClient>) -> CspResult<Self> {
		csp.validate()?;
		Ok(Self {
			csp: Arc::new(csp),
			directory,
			generator: Arc::new(UuidCloudNumberGenerator),
			ledger: Arc::new(IdentityLedger::new()),
		})
	}

	pub fn with_generator(mut self, generator: Arc<dyn CloudNumberGenerator>) -> Self {
		self.generator = generator;
		self
	}

	/// Share `ledger` with other coordinators.
	pub fn with_ledger(mut self, ledger: Arc<IdentityLedger>) -> Self {
		self.ledger = ledger;
		self
	}

	pub fn ledger(&self) -> Arc<IdentityLedger> {
		Arc::clone(&self.ledger)
	}

	pub fn csp_information(&self) -> &CspInformation {
		&self.csp
	}

	pub async fn identity(&self, number: &CloudNumber) -> Option<CloudIdentity> {
		self.ledger.get(number).await
	}

	// =========================================================================
	// Messages
	// =========================================================================

	fn registrar_message(&self) -> DirectoryMessage {
		DirectoryMessage::new(
			self.csp.cloud_number.address(),
			self.csp.registrar_cloud_number.peer_root(),
			xdi::REGISTRAR_LINK_CONTRACT,
		)
		.with_secret_token(self.csp.secret_token.clone())
	}

	fn registry_message(&self) -> DirectoryMessage {
		DirectoryMessage::new(
			self.csp.cloud_number.address(),
			self.csp.cloud_number.peer_root(),
			xdi::ROOT_LINK_CONTRACT,
		)
		.with_secret_token(self.csp.secret_token.clone())
	}

	fn cloud_message(&self, number: &CloudNumber, secret_token: &SecretString) -> DirectoryMessage {
		DirectoryMessage::new(number.address(), number.peer_root(), xdi::ROOT_LINK_CONTRACT)
			.with_secret_token(secret_token.clone())
	}

	fn endpoint_or_derived(&self, number: &CloudNumber, endpoint: Option<&str>) -> String {
		endpoint
			.map(str::to_string)
			.unwrap_or_else(|| self.csp.cloud_endpoint(number))
	}

	fn endpoint_statement(number: &CloudNumber, endpoint: &str) -> Statement {
		Statement::literal(number.peer_root().join(xdi::XDI_ENDPOINT), endpoint)
	}

	fn token_digest_statement(number: &CloudNumber, secret_token: &SecretString) -> Statement {
		Statement::literal(
			number.peer_root().join(xdi::SECRET_TOKEN_DIGEST),
			secret_token.expose(),
		)
	}

	fn resolved_binding(graph: &ResultGraph, name: &CloudName) -> Result<CloudNumber, DirectoryError> {
		let subject = name.peer_root();
		let target = graph
			.relation_target(subject.as_str(), xdi::REF)
			.ok_or_else(|| DirectoryError::UnresolvedRelation {
				subject: subject.to_string(),
				predicate: xdi::REF.to_string(),
			})?;
		Ok(CloudNumber::from_peer_root(target)?)
	}

	// =========================================================================
	// Sign-up
	// =========================================================================

	/// Create a new cloud: fresh number and token, registered with the CSP
	/// and seeded with the default connect service.
	///
	/// Nothing is rolled back. If the service write fails the cloud stays
	/// `Provisional` in the registry and the ledger.
	#[instrument(skip(self))]
	pub async fn sign_up_new_user(&self) -> CspResult<CspUserCredential> {
		let cloud_number = self.generator.generate(ContextSymbol::Person);
		let secret_token = SecretString::generate_token();
		let endpoint = self.csp.cloud_endpoint(&cloud_number);
		debug!(cloud_number = %cloud_number, "generated cloud number");

		self
			.write_cloud_in_csp(&cloud_number, &secret_token, &endpoint)
			.await
			.map_err(|e| {
				warn!(cloud_number = %cloud_number, error = %e, "failed to register cloud with CSP");
				CspError::Provisioning(e)
			})?;

		self
			.ledger
			.insert(CloudIdentity::provisional(
				cloud_number.clone(),
				endpoint,
				secret_token.digest(),
			))
			.await;

		let services = BTreeMap::from([(
			CONNECT_SERVICE_KEY.to_string(),
			self.csp.connect_service_uri.clone(),
		)]);
		self
			.write_services(&cloud_number, &secret_token, &services)
			.await
			.map_err(|e| {
				warn!(cloud_number = %cloud_number, error = %e, "failed to seed cloud services");
				CspError::Provisioning(e)
			})?;

		info!(cloud_number = %cloud_number, "signed up new cloud");
		Ok(CspUserCredential {
			cloud_number,
			secret_token,
		})
	}

	/// Register a cloud's endpoint and token digest in the CSP registry.
	#[instrument(skip(self, secret_token), fields(cloud_number = %number))]
	pub async fn register_cloud_in_csp(&self, number: &CloudNumber, secret_token: &SecretString) -> CspResult<()> {
		let endpoint = self.csp.cloud_endpoint(number);
		self.write_cloud_in_csp(number, secret_token, &endpoint).await?;
		Ok(())
	}

	async fn write_cloud_in_csp(
		&self,
		number: &CloudNumber,
		secret_token: &SecretString,
		endpoint: &str,
	) -> Result<(), DirectoryError> {
		let message = self
			.registry_message()
			.custom(
				xdi::SET_SECRET_TOKEN_DIGEST,
				vec![Self::token_digest_statement(number, secret_token)],
			)
			.set(vec![Self::endpoint_statement(number, endpoint)]);

		self.directory.send(&self.csp.registry_endpoint, &message).await?;
		debug!(cloud_number = %number, "registered cloud in CSP registry");
		Ok(())
	}

	// =========================================================================
	// Registrar
	// =========================================================================

	/// Cloud number `name` is bound to at the Registrar, or `None` if the
	/// name is available.
	#[instrument(skip(self), fields(name = %name))]
	pub async fn check_name_available(&self, name: &CloudName) -> CspResult<Option<CloudNumber>> {
		let message = self.registrar_message().get(name.peer_root());
		let graph = self.directory.send(&self.csp.registrar_endpoint, &message).await?;

		let bound = graph
			.relation_target(name.peer_root().as_str(), xdi::REF)
			.map(CloudNumber::from_peer_root)
			.transpose()
			.map_err(DirectoryError::from)?;

		debug!(available = bound.is_none(), "checked cloud name");
		Ok(bound)
	}

	/// Bind `name` to a cloud number the Registrar assigns, then record that
	/// cloud's endpoint at the Registrar.
	#[instrument(skip(self), fields(name = %name))]
	pub async fn register_name(&self, name: &CloudName) -> CspResult<CloudNumber> {
		let bind = self
			.registrar_message()
			.set(vec![Statement::relation(name.peer_root(), xdi::REF, xdi::VARIABLE)]);
		let graph = self.directory.send(&self.csp.registrar_endpoint, &bind).await?;
		let number = Self::resolved_binding(&graph, name)?;
		debug!(cloud_number = %number, "registrar assigned cloud number");

		self.write_registrar_endpoint(&number, None).await?;

		info!(cloud_number = %number, "registered cloud name");
		Ok(number)
	}

	/// Bind `name` to `number` at the Registrar.
	///
	/// The Registrar keeps the first binding it sees, so the binding is read
	/// back from the write result and compared. A different number means
	/// another cloud owns the name: this fails with [`CspError::Conflict`]
	/// and writes nothing else. The check is best-effort; two registrations
	/// racing for one name can both pass if neither sees the other's write.
	#[instrument(skip(self), fields(name = %name, cloud_number = %number))]
	pub async fn register_name_to(&self, name: &CloudName, number: &CloudNumber) -> CspResult<()> {
		let bind = self
			.registrar_message()
			.set(vec![Statement::relation(name.peer_root(), xdi::REF, number.peer_root())]);
		let graph = self.directory.send(&self.csp.registrar_endpoint, &bind).await?;
		let registered = Self::resolved_binding(&graph, name)?;

		if &registered != number {
			warn!(registered = %registered, "cloud name already bound to another cloud");
			return Err(CspError::Conflict {
				name: name.clone(),
				registered,
				requested: number.clone(),
			});
		}

		self.write_registrar_endpoint(number, None).await?;

		info!("registered cloud name");
		Ok(())
	}

	/// Record a cloud's endpoint at the Registrar. Without an explicit
	/// endpoint the hosted endpoint is used.
	#[instrument(skip(self), fields(cloud_number = %number))]
	pub async fn set_cloud_endpoint_in_registrar(&self, number: &CloudNumber, endpoint: Option<&str>) -> CspResult<()> {
		self.write_registrar_endpoint(number, endpoint).await?;
		Ok(())
	}

	async fn write_registrar_endpoint(&self, number: &CloudNumber, endpoint: Option<&str>) -> Result<(), DirectoryError> {
		let endpoint = self.endpoint_or_derived(number, endpoint);
		let message = self
			.registrar_message()
			.set(vec![Self::endpoint_statement(number, &endpoint)]);
		self.directory.send(&self.csp.registrar_endpoint, &message).await?;
		debug!(endpoint = %endpoint, "recorded endpoint at registrar");
		Ok(())
	}

	// =========================================================================
	// CSP registry
	// =========================================================================

	/// Bind `name` to `number` in the CSP registry.
	#[instrument(skip(self), fields(name = %name, cloud_number = %number))]
	pub async fn register_name_in_csp(&self, name: &CloudName, number: &CloudNumber) -> CspResult<()> {
		let message = self
			.registry_message()
			.set(vec![Statement::relation(name.peer_root(), xdi::REF, number.peer_root())]);
		self.directory.send(&self.csp.registry_endpoint, &message).await?;
		info!("registered cloud name in CSP registry");
		Ok(())
	}

	/// Record a cloud's endpoint in the CSP registry.
	#[instrument(skip(self), fields(cloud_number = %number))]
	pub async fn set_cloud_endpoint_in_csp(&self, number: &CloudNumber, endpoint: Option<&str>) -> CspResult<()> {
		let endpoint = self.endpoint_or_derived(number, endpoint);
		let message = self
			.registry_message()
			.set(vec![Self::endpoint_statement(number, &endpoint)]);
		self.directory.send(&self.csp.registry_endpoint, &message).await?;
		debug!(endpoint = %endpoint, "recorded endpoint in CSP registry");
		Ok(())
	}

	/// Replace the token digest the CSP registry holds for a cloud.
	#[instrument(skip(self, secret_token), fields(cloud_number = %number))]
	pub async fn set_cloud_secret_token_in_csp(&self, number: &CloudNumber, secret_token: &SecretString) -> CspResult<()> {
		let message = self.registry_message().custom(
			xdi::SET_SECRET_TOKEN_DIGEST,
			vec![Self::token_digest_statement(number, secret_token)],
		);
		self.directory.send(&self.csp.registry_endpoint, &message).await?;
		info!("updated cloud secret token digest");
		Ok(())
	}

	// =========================================================================
	// Cloud
	// =========================================================================

	/// Bind `name` inside the cloud itself: forward bindings, the reverse
	/// binding, and public read access to the reverse binding.
	#[instrument(skip(self, secret_token), fields(name = %name, cloud_number = %number))]
	pub async fn register_name_in_cloud(
		&self,
		name: &CloudName,
		number: &CloudNumber,
		secret_token: &SecretString,
	) -> CspResult<()> {
		let reverse_binding = format!("({}/{}/{})", number, xdi::IS_REF, xdi::VARIABLE);
		let message = self.cloud_message(number, secret_token).set(vec![
			Statement::relation(name.peer_root(), xdi::REF, number.peer_root()),
			Statement::relation(name.address(), xdi::REF, number.address()),
			Statement::relation(number.address(), xdi::IS_REF, name.address()),
			Statement::relation(xdi::PUBLIC_LINK_CONTRACT, xdi::GET, reverse_binding),
		]);

		self
			.directory
			.send(&self.csp.cloud_endpoint(number), &message)
			.await?;
		info!("registered cloud name in cloud");
		Ok(())
	}

	/// Declare services in a cloud, each publicly readable. All entries are
	/// written in one message; an empty map writes nothing.
	#[instrument(skip(self, secret_token, services), fields(cloud_number = %number, services = services.len()))]
	pub async fn set_cloud_services_in_cloud(
		&self,
		number: &CloudNumber,
		secret_token: &SecretString,
		services: &BTreeMap<String, String>,
	) -> CspResult<()> {
		self.write_services(number, secret_token, services).await?;
		Ok(())
	}

	async fn write_services(
		&self,
		number: &CloudNumber,
		secret_token: &SecretString,
		services: &BTreeMap<String, String>,
	) -> Result<(), DirectoryError> {
		if services.is_empty() {
			debug!("no services to declare");
			return Ok(());
		}

		let statements = services
			.iter()
			.flat_map(|(key, uri)| {
				let uri_address = format!("{key}{}", xdi::URI);
				[
					Statement::literal(format!("{uri_address}&"), uri.as_str()),
					Statement::relation(xdi::PUBLIC_LINK_CONTRACT, xdi::GET, uri_address),
				]
			})
			.collect();

		let message = self.cloud_message(number, secret_token).set(statements);
		self
			.directory
			.send(&self.csp.cloud_endpoint(number), &message)
			.await?;
		debug!(services = services.len(), "declared cloud services");
		Ok(())
	}

	// =========================================================================
	// Naming saga
	// =========================================================================

	/// Bind `name` to a signed-up cloud in the Registrar, the CSP registry
	/// and the cloud, in that order.
	///
	/// Each completed step is recorded in the ledger. Calling this again
	/// after a failure skips completed steps and resumes with the first
	/// incomplete one. The identity becomes [`LifecycleState::Named`] once
	/// all steps are done.
	#[instrument(skip(self, secret_token), fields(cloud_number = %number, name = %name))]
	pub async fn register_user_cloud(
		&self,
		number: &CloudNumber,
		name: &CloudName,
		secret_token: &SecretString,
	) -> CspResult<()> {
		let identity = self
			.ledger
			.get(number)
			.await
			.ok_or_else(|| CspError::InvalidInput(format!("cloud {number} was not signed up by this CSP")))?;

		if let Some(existing) = identity.name.as_ref().filter(|existing| *existing != name) {
			return Err(CspError::InvalidInput(format!(
				"cloud {number} is already being registered as {existing}"
			)));
		}

		for step in RegistrationStep::ALL {
			if identity.has_completed(step) {
				debug!(step = %step, "step already completed, skipping");
				continue;
			}

			match step {
				RegistrationStep::RegistrarBinding => self.register_name_to(name, number).await?,
				RegistrationStep::CspBinding => self.register_name_in_csp(name, number).await?,
				RegistrationStep::CloudBinding => self.register_name_in_cloud(name, number, secret_token).await?,
			}

			self.ledger.record_step(number, name, step).await;
		}

		self.ledger.advance(number, LifecycleState::Named).await;
		info!("cloud registered and named");
		Ok(())
	}
}
