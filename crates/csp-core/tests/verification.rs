// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Verification coordinator against an in-memory directory network.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use csp_core::{ContactKind, CspError, CspUserCredential, LifecycleState, UserProfile, VerificationProof};
use csp_directory::{CloudNumber, DirectoryError};
use csp_verification::{
	Channel, DefaultMessageRenderer, EmailMessage, InMemoryTokenManager, MessageCreationError,
	MessageRenderer, NotificationError, Purpose, SignerError, TokenError, TokenKey, TokenManager,
	UnimplementedSigner,
};
use support::TestCsp;

/// Token manager whose storage is unavailable.
struct UnavailableTokenManager;

#[async_trait]
impl TokenManager for UnavailableTokenManager {
	async fn create_token(&self, _key: &TokenKey) -> Result<String, TokenError> {
		Err(TokenError::Storage("token store unavailable".to_string()))
	}

	async fn validate_token(&self, _key: &TokenKey, _code: &str) -> Result<bool, TokenError> {
		Err(TokenError::Storage("token store unavailable".to_string()))
	}

	async fn invalidate_token(&self, _key: &TokenKey) -> Result<(), TokenError> {
		Err(TokenError::Storage("token store unavailable".to_string()))
	}
}

/// Renderer with a broken email template.
struct BrokenTemplateRenderer;

impl MessageRenderer for BrokenTemplateRenderer {
	fn render_email(
		&self,
		_code: &str,
		_callback_url: &str,
		_identity: &CloudNumber,
	) -> Result<EmailMessage, MessageCreationError> {
		Err(MessageCreationError::Template("missing email template".to_string()))
	}

	fn render_sms(&self, code: &str) -> Result<String, MessageCreationError> {
		Ok(code.to_string())
	}
}

fn profile() -> UserProfile {
	UserProfile {
		name: "Alice Example".to_string(),
		nickname: "alice".to_string(),
		email: "alice@example.com".to_string(),
		phone: "+1 555-0100".to_string(),
		city: "Springfield".to_string(),
		..Default::default()
	}
}

async fn signed_up(csp: &TestCsp) -> CspUserCredential {
	csp.registration.sign_up_new_user().await.unwrap()
}

async fn codes(csp: &TestCsp, number: &CloudNumber) -> (String, String) {
	(
		csp.tokens.code(number, Purpose::Email).await,
		csp.tokens.code(number, Purpose::Sms).await,
	)
}

fn wrong(code: &str) -> String {
	code
		.chars()
		.map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
		.collect()
}

#[tokio::test]
async fn test_request_sends_email_then_sms_and_stores_profile() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let number = &credential.cloud_number;

	csp
		.verification
		.request_verification(number, &profile(), &credential.secret_token)
		.await
		.unwrap();

	let sent = csp.notifier.sent().await;
	assert_eq!(sent.len(), 2);
	assert_eq!(sent[0].channel, Channel::Email);
	assert_eq!(sent[0].recipient, "alice@example.com");
	assert_eq!(sent[1].channel, Channel::Sms);
	assert_eq!(sent[1].recipient, "+1 555-0100");

	let (email_code, sms_code) = codes(&csp, number).await;
	assert!(sent[0].body.contains(&email_code));
	assert!(sent[0].body.contains(support::VALIDATION_ENDPOINT));
	assert!(sent[1].body.contains(&sms_code));

	let cloud = csp.directory.snapshot(&csp.cloud_endpoint(number)).await;
	assert_eq!(
		cloud.literal(ContactKind::Email.value_address(number).as_str()),
		Some("alice@example.com")
	);
	let city = number.address().join("<+addr><+city>&");
	assert_eq!(cloud.literal(city.as_str()), Some("Springfield"));
	let street = number.address().join("<+addr><+street>&");
	assert_eq!(cloud.literal(street.as_str()), None);

	let identity = csp.registration.identity(number).await.unwrap();
	assert_eq!(identity.state, LifecycleState::ProfileSubmitted);
}

#[tokio::test]
async fn test_invalid_profile_has_no_side_effects() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let writes_before = csp.directory.total_write_count().await;

	let no_phone = UserProfile {
		phone: String::new(),
		..profile()
	};
	let err = csp
		.verification
		.request_verification(&credential.cloud_number, &no_phone, &credential.secret_token)
		.await
		.unwrap_err();

	assert!(matches!(err, CspError::InvalidInput(_)));
	assert!(csp.notifier.sent().await.is_empty());
	assert_eq!(csp.directory.total_write_count().await, writes_before);
}

#[tokio::test]
async fn test_sms_failure_surfaces_after_email_was_sent() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	csp.notifier.fail_channel(Channel::Sms).await;

	let err = csp
		.verification
		.request_verification(&credential.cloud_number, &profile(), &credential.secret_token)
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		CspError::Notification(NotificationError::Delivery {
			channel: Channel::Sms,
			..
		})
	));
	assert_eq!(csp.notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn test_token_failure_surfaces_before_sending() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let verification = csp.verification_with(
		Arc::new(UnavailableTokenManager),
		Arc::new(DefaultMessageRenderer::default()),
	);
	let writes_before = csp.directory.total_write_count().await;

	let err = verification
		.request_verification(&credential.cloud_number, &profile(), &credential.secret_token)
		.await
		.unwrap_err();

	assert!(matches!(err, CspError::Token(TokenError::Storage(_))));
	assert!(csp.notifier.sent().await.is_empty());
	assert_eq!(csp.directory.total_write_count().await, writes_before);
}

#[tokio::test]
async fn test_render_failure_is_message_creation_error() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let verification = csp.verification_with(
		Arc::new(InMemoryTokenManager::new().with_hasher(support::fast_hasher())),
		Arc::new(BrokenTemplateRenderer),
	);
	let writes_before = csp.directory.total_write_count().await;

	let err = verification
		.request_verification(&credential.cloud_number, &profile(), &credential.secret_token)
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		CspError::MessageCreation(MessageCreationError::Template(_))
	));
	assert!(csp.notifier.sent().await.is_empty());
	assert_eq!(csp.directory.total_write_count().await, writes_before);
}

/// Test that a failed profile write surfaces after both codes went out.
/// **Why Important**: sent notifications are never retracted, so the caller
/// must see the directory failure rather than a silent success.
#[tokio::test]
async fn test_profile_write_failure_is_directory_error() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let number = &credential.cloud_number;
	csp
		.directory
		.fail_next(csp.cloud_endpoint(number), "cloud offline")
		.await;

	let err = csp
		.verification
		.request_verification(number, &profile(), &credential.secret_token)
		.await
		.unwrap_err();

	assert!(matches!(err, CspError::Directory(DirectoryError::Transport(_))));
	let sent = csp.notifier.sent().await;
	assert_eq!(sent.len(), 2);
	assert_eq!(sent[0].channel, Channel::Email);
	assert_eq!(sent[1].channel, Channel::Sms);

	let cloud = csp.directory.snapshot(&csp.cloud_endpoint(number)).await;
	assert_eq!(cloud.literal(ContactKind::Email.value_address(number).as_str()), None);
	let identity = csp.registration.identity(number).await.unwrap();
	assert_eq!(identity.state, LifecycleState::Provisional);
}

/// Test that one wrong code rejects the pair and consumes neither code.
/// **Why Important**: a typo in one code must not force the person to
/// request fresh codes for both channels.
#[tokio::test]
async fn test_single_mismatch_keeps_both_codes() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let number = &credential.cloud_number;
	csp
		.verification
		.request_verification(number, &profile(), &credential.secret_token)
		.await
		.unwrap();
	let (email_code, sms_code) = codes(&csp, number).await;

	assert!(!csp
		.verification
		.validate_codes(number, &wrong(&email_code), &sms_code, &credential.secret_token)
		.await
		.unwrap());
	assert!(!csp
		.verification
		.validate_codes(number, &email_code, &wrong(&sms_code), &credential.secret_token)
		.await
		.unwrap());

	assert!(csp
		.verification
		.validate_codes(number, &email_code, &sms_code, &credential.secret_token)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_consumed_codes_are_rejected() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let number = &credential.cloud_number;
	csp
		.verification
		.request_verification(number, &profile(), &credential.secret_token)
		.await
		.unwrap();
	let (email_code, sms_code) = codes(&csp, number).await;

	assert!(csp
		.verification
		.validate_codes(number, &email_code, &sms_code, &credential.secret_token)
		.await
		.unwrap());

	let err = csp
		.verification
		.validate_codes(number, &email_code, &sms_code, &credential.secret_token)
		.await
		.unwrap_err();
	assert!(matches!(err, CspError::Token(TokenError::Consumed(_))));
}

/// Test that the same code pair submitted concurrently is accepted once.
/// **Why Important**: codes are single use; a second acceptance would
/// rewrite the proofs the first one recorded.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_validation_accepts_pair_once() {
	let csp = Arc::new(TestCsp::new());
	let credential = signed_up(&csp).await;
	let number = credential.cloud_number.clone();
	csp
		.verification
		.request_verification(&number, &profile(), &credential.secret_token)
		.await
		.unwrap();
	let (email_code, sms_code) = codes(&csp, &number).await;

	let handles: Vec<_> = (0..4)
		.map(|_| {
			let csp = csp.clone();
			let number = number.clone();
			let email_code = email_code.clone();
			let sms_code = sms_code.clone();
			let token = credential.secret_token.clone();
			tokio::spawn(async move {
				csp
					.verification
					.validate_codes(&number, &email_code, &sms_code, &token)
					.await
			})
		})
		.collect();

	let mut accepted = 0;
	for handle in handles {
		match handle.await.unwrap() {
			Ok(true) => accepted += 1,
			Ok(false) => panic!("matching codes were rejected"),
			Err(err) => assert!(matches!(err, CspError::Token(TokenError::Consumed(_)))),
		}
	}
	assert_eq!(accepted, 1);

	let identity = csp.registration.identity(&number).await.unwrap();
	assert_eq!(identity.state, LifecycleState::Verified);
}

#[tokio::test]
async fn test_codes_without_request_are_not_found() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;

	let err = csp
		.verification
		.validate_codes(&credential.cloud_number, "123456", "654321", &credential.secret_token)
		.await
		.unwrap_err();
	assert!(matches!(err, CspError::Token(TokenError::NotFound(_))));
}

/// Test that a signing failure surfaces after the codes were consumed.
#[tokio::test]
async fn test_signing_failure_leaves_codes_consumed() {
	let csp = TestCsp::with_signer(Arc::new(UnimplementedSigner));
	let credential = signed_up(&csp).await;
	let number = &credential.cloud_number;
	csp
		.verification
		.request_verification(number, &profile(), &credential.secret_token)
		.await
		.unwrap();
	let (email_code, sms_code) = codes(&csp, number).await;

	let err = csp
		.verification
		.validate_codes(number, &email_code, &sms_code, &credential.secret_token)
		.await
		.unwrap_err();
	assert!(matches!(err, CspError::Signing(SignerError::NotImplemented)));

	let cloud = csp.directory.snapshot(&csp.cloud_endpoint(number)).await;
	let signature = VerificationProof::signature_address(number, ContactKind::Email).join("&");
	assert_eq!(cloud.literal(signature.as_str()), None);

	let retry = csp
		.verification
		.validate_codes(number, &email_code, &sms_code, &credential.secret_token)
		.await
		.unwrap_err();
	assert!(matches!(retry, CspError::Token(TokenError::Consumed(_))));

	let identity = csp.registration.identity(number).await.unwrap();
	assert_eq!(identity.state, LifecycleState::ProfileSubmitted);
}

#[tokio::test]
async fn test_proof_write_failure_is_directory_error() {
	let csp = TestCsp::new();
	let credential = signed_up(&csp).await;
	let number = &credential.cloud_number;
	csp
		.verification
		.request_verification(number, &profile(), &credential.secret_token)
		.await
		.unwrap();
	let (email_code, sms_code) = codes(&csp, number).await;

	csp
		.directory
		.fail_next(csp.cloud_endpoint(number), "cloud offline")
		.await;
	let err = csp
		.verification
		.validate_codes(number, &email_code, &sms_code, &credential.secret_token)
		.await
		.unwrap_err();
	assert!(matches!(err, CspError::Directory(DirectoryError::Transport(_))));
}
