// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Two-factor verification of a cloud's contact information.
//!
//! [`VerificationCoordinator::request_verification`] stores the profile and
//! sends one code by email and one by SMS. [`VerificationCoordinator::validate_codes`]
//! accepts the pair back; once both match, the codes are consumed and a signed
//! [`VerificationProof`] is written for each contact channel.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use csp_directory::{xdi, Address, CloudNumber, DirectoryClient, DirectoryError, DirectoryMessage, SecretString, Statement};
use csp_verification::{MessageRenderer, Notifier, Signer, TokenKey, TokenManager};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::CspInformation;
use crate::error::{CspError, CspResult};
use crate::identity::{IdentityLedger, LifecycleState};
use crate::profile::{ContactKind, UserProfile};

/// Signed attestation that a contact value was verified by a CSP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationProof {
	pub cloud_number: CloudNumber,
	pub kind: ContactKind,
	pub validated_at: DateTime<Utc>,
	pub signature: String,
	/// Cloud number of the CSP that verified the contact.
	pub validator: CloudNumber,
}

impl VerificationProof {
	/// `[=]!:uuid:1<+email><+validation>`
	pub fn base_address(number: &CloudNumber, kind: ContactKind) -> Address {
		number.address().join(kind.segment()).join("<+validation>")
	}

	pub fn signature_address(number: &CloudNumber, kind: ContactKind) -> Address {
		Self::base_address(number, kind).join("<+validationsignature>")
	}

	/// Statements recording this proof. Only the signature is publicly readable.
	pub fn statements(&self) -> Vec<Statement> {
		let base = Self::base_address(&self.cloud_number, self.kind);
		let signature = Self::signature_address(&self.cloud_number, self.kind);
		vec![
			Statement::literal(
				base.join("<+validationdate>&"),
				self.validated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
			),
			Statement::literal(signature.join("&"), self.signature.as_str()),
			Statement::relation(base, xdi::VALIDATOR, self.validator.address()),
			Statement::relation(xdi::PUBLIC_LINK_CONTRACT, xdi::GET, signature),
		]
	}
}

/// Builder for [`VerificationCoordinator`]. Every collaborator is required.
#[derive(Default)]
pub struct VerificationCoordinatorBuilder {
	csp: Option<CspInformation>,
	directory: Option<Arc<dyn DirectoryClient>>,
	token_manager: Option<Arc<dyn TokenManager>>,
	notifier: Option<Arc<dyn Notifier>>,
	renderer: Option<Arc<dyn MessageRenderer>>,
	signer: Option<Arc<dyn Signer>>,
	validation_endpoint: Option<String>,
	ledger: Option<Arc<IdentityLedger>>,
}

impl VerificationCoordinatorBuilder {
	pub fn csp_information(mut self, csp: CspInformation) -> Self {
		self.csp = Some(csp);
		self
	}

	pub fn directory(mut self, directory: Arc<dyn DirectoryClient>) -> Self {
		self.directory = Some(directory);
		self
	}

	pub fn token_manager(mut self, token_manager: Arc<dyn TokenManager>) -> Self {
		self.token_manager = Some(token_manager);
		self
	}

	pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = Some(notifier);
		self
	}

	pub fn renderer(mut self, renderer: Arc<dyn MessageRenderer>) -> Self {
		self.renderer = Some(renderer);
		self
	}

	pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
		self.signer = Some(signer);
		self
	}

	/// Callback linked from verification emails.
	pub fn validation_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.validation_endpoint = Some(endpoint.into());
		self
	}

	/// Ledger to advance lifecycle states in. Optional.
	pub fn ledger(mut self, ledger: Arc<IdentityLedger>) -> Self {
		self.ledger = Some(ledger);
		self
	}

	pub fn build(self) -> CspResult<VerificationCoordinator> {
		fn required<T>(value: Option<T>, name: &str) -> CspResult<T> {
			value.ok_or_else(|| CspError::Configuration(format!("verification coordinator requires a {name}")))
		}

		let csp = required(self.csp, "CSP information")?;
		csp.validate()?;

		let validation_endpoint = required(self.validation_endpoint, "validation endpoint")?;
		Url::parse(&validation_endpoint).map_err(|e| {
			CspError::Configuration(format!("validation endpoint '{validation_endpoint}' is not a URL: {e}"))
		})?;

		Ok(VerificationCoordinator {
			csp: Arc::new(csp),
			directory: required(self.directory, "directory client")?,
			token_manager: required(self.token_manager, "token manager")?,
			notifier: required(self.notifier, "notifier")?,
			renderer: required(self.renderer, "message renderer")?,
			signer: required(self.signer, "signer")?,
			validation_endpoint,
			ledger: self.ledger,
		})
	}
}

/// Sends verification codes and records proofs once they come back.
pub struct VerificationCoordinator {
	csp: Arc<CspInformation>,
	directory: Arc<dyn DirectoryClient>,
	token_manager: Arc<dyn TokenManager>,
	notifier: Arc<dyn Notifier>,
	renderer: Arc<dyn MessageRenderer>,
	signer: Arc<dyn Signer>,
	validation_endpoint: String,
	ledger: Option<Arc<IdentityLedger>>,
}

impl VerificationCoordinator {
	pub fn builder() -> VerificationCoordinatorBuilder {
		VerificationCoordinatorBuilder::default()
	}

	pub fn validation_endpoint(&self) -> &str {
		&self.validation_endpoint
	}

	fn cloud_message(&self, number: &CloudNumber, secret_token: &SecretString) -> DirectoryMessage {
		DirectoryMessage::new(number.address(), number.peer_root(), xdi::ROOT_LINK_CONTRACT)
			.with_secret_token(secret_token.clone())
	}

	async fn advance(&self, number: &CloudNumber, state: LifecycleState) {
		if let Some(ledger) = &self.ledger {
			ledger.advance(number, state).await;
		}
	}

	/// Store `profile` in the cloud and send an email code and an SMS code.
	///
	/// Failures surface immediately; messages already sent are not retracted.
	#[instrument(skip(self, profile, secret_token), fields(cloud_number = %number))]
	pub async fn request_verification(
		&self,
		number: &CloudNumber,
		profile: &UserProfile,
		secret_token: &SecretString,
	) -> CspResult<()> {
		profile.validate()?;

		let email_code = self.token_manager.create_token(&TokenKey::email(number)).await?;
		let sms_code = self.token_manager.create_token(&TokenKey::sms(number)).await?;
		debug!("issued verification codes");

		let email = self
			.renderer
			.render_email(&email_code, &self.validation_endpoint, number)?;
		let sms = self.renderer.render_sms(&sms_code)?;

		self.notifier.send_email(&profile.email, &email).await?;
		self.notifier.send_sms(&profile.phone, &sms).await?;
		debug!("sent verification codes");

		let message = self
			.cloud_message(number, secret_token)
			.set(profile.statements(number));
		self
			.directory
			.send(&self.csp.cloud_endpoint(number), &message)
			.await?;

		self.advance(number, LifecycleState::ProfileSubmitted).await;
		info!("verification requested");
		Ok(())
	}

	/// Check both codes and, if they match, record verification proofs.
	///
	/// Returns `false` without consuming anything when either code is wrong.
	/// Once both match they are consumed before anything is written, so a
	/// later directory or signing failure leaves them consumed.
	#[instrument(skip(self, email_code, sms_code, secret_token), fields(cloud_number = %number))]
	pub async fn validate_codes(
		&self,
		number: &CloudNumber,
		email_code: &str,
		sms_code: &str,
		secret_token: &SecretString,
	) -> CspResult<bool> {
		let keys = ContactKind::ALL.map(|kind| TokenKey::new(number.clone(), kind.purpose()));

		for (key, code) in keys.iter().zip([email_code, sms_code]) {
			if !self.token_manager.validate_token(key, code).await? {
				warn!(key = %key, "verification code rejected");
				return Ok(false);
			}
		}

		// Only one caller retires a code; a concurrent submission of the
		// same pair fails here with `TokenError::Consumed`.
		for key in &keys {
			self.token_manager.invalidate_token(key).await?;
		}
		debug!("verification codes consumed");

		let endpoint = self.csp.cloud_endpoint(number);
		let contacts = self
			.directory
			.send(&endpoint, &self.cloud_message(number, secret_token).get(number.address()))
			.await?;

		let validated_at = Utc::now();
		let mut statements = Vec::new();
		for kind in ContactKind::ALL {
			let value_address = kind.value_address(number);
			let value = contacts
				.literal(value_address.as_str())
				.ok_or_else(|| DirectoryError::MissingLiteral {
					subject: value_address.to_string(),
				})?;

			let proof = VerificationProof {
				cloud_number: number.clone(),
				kind,
				validated_at,
				signature: self.signer.sign(value.as_bytes())?,
				validator: self.csp.cloud_number.clone(),
			};
			statements.extend(proof.statements());
		}

		self
			.directory
			.send(&endpoint, &self.cloud_message(number, secret_token).set(statements))
			.await?;

		self.advance(number, LifecycleState::Verified).await;
		info!("contact information verified");
		Ok(true)
	}

	/// Whether `email` and `phone` are already verified for some cloud.
	///
	/// The Registrar exposes no verified-contact registry yet.
	#[instrument(skip(self, email, phone))]
	pub async fn check_verified_contact_information(&self, email: &str, phone: &str) -> CspResult<bool> {
		let _ = (email, phone);
		Err(CspError::NotImplemented("verified contact registry lookup"))
	}

	/// Record `email` and `phone` as verified for `number` in the Registrar.
	#[instrument(skip(self, email, phone), fields(cloud_number = %number))]
	pub async fn set_verified_contact_information(
		&self,
		number: &CloudNumber,
		email: &str,
		phone: &str,
	) -> CspResult<()> {
		let _ = (number, email, phone);
		Err(CspError::NotImplemented("verified contact registry update"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::fixtures::csp_information;
	use chrono::TimeZone;
	use csp_directory::MemoryDirectory;
	use csp_verification::{DefaultMessageRenderer, HmacSigner, InMemoryTokenManager, RecordingNotifier};

	fn number() -> CloudNumber {
		CloudNumber::parse("[=]!:uuid:1").unwrap()
	}

	fn complete_builder() -> VerificationCoordinatorBuilder {
		VerificationCoordinator::builder()
			.csp_information(csp_information())
			.directory(Arc::new(MemoryDirectory::new()))
			.token_manager(Arc::new(InMemoryTokenManager::new()))
			.notifier(Arc::new(RecordingNotifier::new()))
			.renderer(Arc::new(DefaultMessageRenderer::default()))
			.signer(Arc::new(HmacSigner::new(SecretString::new("signing-key"))))
			.validation_endpoint("https://csp.example.com/validate")
	}

	mod proof {
		use super::*;

		#[test]
		fn statements_expose_only_signature() {
			let proof = VerificationProof {
				cloud_number: number(),
				kind: ContactKind::Email,
				validated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
				signature: "abc123".to_string(),
				validator: CloudNumber::parse("[+]!:uuid:csp").unwrap(),
			};
			let statements = proof.statements();

			assert!(statements.contains(&Statement::literal(
				"[=]!:uuid:1<+email><+validation><+validationdate>&",
				"2025-03-01T12:00:00Z"
			)));
			assert!(statements.contains(&Statement::literal(
				"[=]!:uuid:1<+email><+validation><+validationsignature>&",
				"abc123"
			)));
			assert!(statements.contains(&Statement::relation(
				"[=]!:uuid:1<+email><+validation>",
				xdi::VALIDATOR,
				"[+]!:uuid:csp"
			)));

			let grants: Vec<_> = statements
				.iter()
				.filter(|s| s.subject.as_str() == xdi::PUBLIC_LINK_CONTRACT)
				.collect();
			assert_eq!(grants.len(), 1);
			assert_eq!(
				grants[0].target().map(Address::as_str),
				Some("[=]!:uuid:1<+email><+validation><+validationsignature>")
			);
		}
	}

	mod builder {
		use super::*;

		fn config_error(result: CspResult<VerificationCoordinator>) -> String {
			match result {
				Err(CspError::Configuration(message)) => message,
				Err(other) => panic!("expected configuration error, got {other}"),
				Ok(_) => panic!("expected configuration error"),
			}
		}

		#[test]
		fn complete_builder_succeeds() {
			let coordinator = complete_builder().build().unwrap();
			assert_eq!(coordinator.validation_endpoint(), "https://csp.example.com/validate");
		}

		#[test]
		fn missing_signer_is_named() {
			let mut builder = complete_builder();
			builder.signer = None;
			assert!(config_error(builder.build()).contains("signer"));
		}

		#[test]
		fn missing_token_manager_is_named() {
			let mut builder = complete_builder();
			builder.token_manager = None;
			assert!(config_error(builder.build()).contains("token manager"));
		}

		#[test]
		fn malformed_validation_endpoint_is_rejected() {
			let builder = complete_builder().validation_endpoint("not a url");
			assert!(config_error(builder.build()).contains("validation endpoint"));
		}

		#[test]
		fn empty_builder_fails() {
			assert!(config_error(VerificationCoordinator::builder().build()).contains("CSP information"));
		}
	}

	mod contact_registry {
		use super::*;

		#[tokio::test]
		async fn lookups_are_not_implemented() {
			let coordinator = complete_builder().build().unwrap();
			assert!(matches!(
				coordinator
					.check_verified_contact_information("alice@example.com", "+15550100")
					.await,
				Err(CspError::NotImplemented(_))
			));
			assert!(matches!(
				coordinator
					.set_verified_contact_information(&number(), "alice@example.com", "+15550100")
					.await,
				Err(CspError::NotImplemented(_))
			));
		}
	}
}
