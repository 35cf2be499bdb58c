// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collaborators for two-factor contact verification.
//!
//! Verifying a cloud's contact information sends one code by email and one by
//! SMS, then records signed proofs once both codes come back. This crate holds
//! the pieces that flow relies on, each behind a trait:
//!
//! | Trait               | Default implementation    | Purpose                               |
//! |---------------------|---------------------------|---------------------------------------|
//! | [`TokenManager`]    | [`InMemoryTokenManager`]  | Single-use codes per (cloud, purpose) |
//! | [`Notifier`]        | [`SmtpNotifier`]          | Deliver rendered messages             |
//! | [`MessageRenderer`] | [`DefaultMessageRenderer`]| Turn codes into message bodies        |
//! | [`Signer`]          | [`HmacSigner`]            | Sign verified contact values          |
//!
//! [`RecordingNotifier`] keeps an in-memory outbox and [`UnimplementedSigner`]
//! fails every request; both are useful when wiring things up.

pub mod notifier;
pub mod render;
pub mod signer;
pub mod smtp;
pub mod token;

pub use notifier::{Channel, NotificationError, Notifier, RecordingNotifier, SentNotification};
pub use render::{DefaultMessageRenderer, EmailMessage, MessageCreationError, MessageRenderer};
pub use signer::{HmacSigner, Signer, SignerError, UnimplementedSigner};
pub use smtp::{is_valid_email, SmtpConfig, SmtpError, SmtpNotifier, TlsMode};
pub use token::{
	generate_code, InMemoryTokenManager, Purpose, TokenError, TokenKey, TokenManager, CODE_LENGTH,
	DEFAULT_CODE_TTL_SECS, MAX_CODE_TTL_SECS,
};
