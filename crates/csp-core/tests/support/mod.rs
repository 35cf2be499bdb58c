// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures: an in-memory directory network with coordinators wired to it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use csp_core::{
	CspInformation, IdentityLedger, RegistrationCoordinator, VerificationCoordinator,
	DEFAULT_CONNECT_SERVICE_URI,
};
use csp_directory::{CloudNumber, MemoryDirectory, SecretString};
use csp_verification::{
	DefaultMessageRenderer, HmacSigner, InMemoryTokenManager, MessageRenderer, Purpose,
	RecordingNotifier, Signer, TokenError, TokenKey, TokenManager,
};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const REGISTRAR: &str = "https://registrar.example.com/";
pub const REGISTRY: &str = "https://registry.example.com/";
pub const CLOUDS: &str = "https://cloud.example.com/";
pub const VALIDATION_ENDPOINT: &str = "https://csp.example.com/validate";
pub const SIGNING_KEY: &str = "csp-signing-key";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn csp_information() -> CspInformation {
	CspInformation {
		cloud_number: CloudNumber::parse("[+]!:uuid:csp").unwrap(),
		secret_token: SecretString::new("CSPTOKEN01"),
		registrar_cloud_number: CloudNumber::parse("[+]!:uuid:registrar").unwrap(),
		registrar_endpoint: REGISTRAR.to_string(),
		registry_endpoint: REGISTRY.to_string(),
		cloud_base_endpoint: CLOUDS.to_string(),
		connect_service_uri: DEFAULT_CONNECT_SERVICE_URI.to_string(),
	}
}

/// Argon2id with minimal cost so tests stay fast.
pub fn fast_hasher() -> Argon2<'static> {
	let params = Params::new(1024, 1, 1, None).unwrap();
	Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Wraps [`InMemoryTokenManager`] and remembers the last code issued per
/// key, standing in for the person reading their inbox.
pub struct CapturingTokenManager {
	inner: InMemoryTokenManager,
	issued: Mutex<HashMap<TokenKey, String>>,
}

impl CapturingTokenManager {
	pub fn new() -> Self {
		Self {
			inner: InMemoryTokenManager::new().with_hasher(fast_hasher()),
			issued: Mutex::new(HashMap::new()),
		}
	}

	pub async fn code(&self, number: &CloudNumber, purpose: Purpose) -> String {
		self
			.issued
			.lock()
			.await
			.get(&TokenKey::new(number.clone(), purpose))
			.cloned()
			.expect("no code issued")
	}
}

#[async_trait]
impl TokenManager for CapturingTokenManager {
	async fn create_token(&self, key: &TokenKey) -> Result<String, TokenError> {
		let code = self.inner.create_token(key).await?;
		self.issued.lock().await.insert(key.clone(), code.clone());
		Ok(code)
	}

	async fn validate_token(&self, key: &TokenKey, code: &str) -> Result<bool, TokenError> {
		self.inner.validate_token(key, code).await
	}

	async fn invalidate_token(&self, key: &TokenKey) -> Result<(), TokenError> {
		self.inner.invalidate_token(key).await
	}
}

/// A CSP wired to an in-memory Registrar, registry and cloud host.
pub struct TestCsp {
	pub directory: Arc<MemoryDirectory>,
	pub ledger: Arc<IdentityLedger>,
	pub registration: RegistrationCoordinator,
	pub verification: VerificationCoordinator,
	pub notifier: Arc<RecordingNotifier>,
	pub tokens: Arc<CapturingTokenManager>,
}

impl TestCsp {
	pub fn new() -> Self {
		Self::with_signer(Arc::new(HmacSigner::new(SecretString::new(SIGNING_KEY))))
	}

	pub fn with_signer(signer: Arc<dyn Signer>) -> Self {
		init_tracing();

		let csp = csp_information();
		let directory = Arc::new(
			MemoryDirectory::new()
				.with_service(REGISTRAR, &csp.secret_token)
				.with_service(REGISTRY, &csp.secret_token)
				.with_cloud_hosting(CLOUDS, REGISTRY),
		);
		let ledger = Arc::new(IdentityLedger::new());
		let notifier = Arc::new(RecordingNotifier::new());
		let tokens = Arc::new(CapturingTokenManager::new());

		let registration = RegistrationCoordinator::new(csp.clone(), directory.clone())
			.unwrap()
			.with_ledger(ledger.clone());

		let verification = VerificationCoordinator::builder()
			.csp_information(csp)
			.directory(directory.clone())
			.token_manager(tokens.clone())
			.notifier(notifier.clone())
			.renderer(Arc::new(DefaultMessageRenderer::new("Example CSP")))
			.signer(signer)
			.validation_endpoint(VALIDATION_ENDPOINT)
			.ledger(ledger.clone())
			.build()
			.unwrap();

		Self {
			directory,
			ledger,
			registration,
			verification,
			notifier,
			tokens,
		}
	}

	/// A second verification coordinator over the same directory, notifier
	/// and ledger, with its own token manager and renderer.
	pub fn verification_with(
		&self,
		tokens: Arc<dyn TokenManager>,
		renderer: Arc<dyn MessageRenderer>,
	) -> VerificationCoordinator {
		VerificationCoordinator::builder()
			.csp_information(csp_information())
			.directory(self.directory.clone())
			.token_manager(tokens)
			.notifier(self.notifier.clone())
			.renderer(renderer)
			.signer(Arc::new(HmacSigner::new(SecretString::new(SIGNING_KEY))))
			.validation_endpoint(VALIDATION_ENDPOINT)
			.ledger(self.ledger.clone())
			.build()
			.unwrap()
	}

	pub fn cloud_endpoint(&self, number: &CloudNumber) -> String {
		self.registration.csp_information().cloud_endpoint(number)
	}
}
