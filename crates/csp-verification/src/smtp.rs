// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP delivery of verification emails.
//!
//! [`SmtpNotifier`] sends email through [`lettre`]'s async transport. It does
//! not speak SMS; pair it with an SMS-capable [`Notifier`] when both channels
//! are needed.
//!
//! # Example
//!
//! ```no_run
//! use csp_directory::SecretString;
//! use csp_verification::{EmailMessage, Notifier, SmtpConfig, SmtpNotifier, TlsMode};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let notifier = SmtpNotifier::new(SmtpConfig {
//! 	host: "smtp.example.com".to_string(),
//! 	port: 587,
//! 	username: Some("csp".to_string()),
//! 	password: Some(SecretString::new("password")),
//! 	from_address: "verify@csp.example.com".to_string(),
//! 	from_name: "Example CSP".to_string(),
//! 	tls_mode: TlsMode::StartTls,
//! })?;
//!
//! notifier
//! 	.send_email(
//! 		"alice@example.com",
//! 		&EmailMessage {
//! 			subject: "Verify".to_string(),
//! 			body: "Your code is 123456".to_string(),
//! 		},
//! 	)
//! 	.await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use csp_directory::SecretString;
use lettre::{
	message::{header::ContentType, Mailbox},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};

use crate::notifier::{Channel, NotificationError, Notifier};
use crate::render::EmailMessage;

#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	#[error("connection failed: {0}")]
	Connection(String),

	#[error("send failed: {0}")]
	Send(String),

	#[error("invalid email address: {0}")]
	Address(String),
}

impl From<SmtpError> for NotificationError {
	fn from(e: SmtpError) -> Self {
		match e {
			SmtpError::Address(recipient) => NotificationError::InvalidRecipient {
				channel: Channel::Email,
				recipient,
			},
			other => NotificationError::Delivery {
				channel: Channel::Email,
				message: other.to_string(),
			},
		}
	}
}

/// TLS mode for SMTP connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
	/// Plain text connection.
	None,
	/// STARTTLS upgrade after connecting.
	StartTls,
	/// Direct TLS connection.
	#[default]
	Tls,
}

/// Settings for [`SmtpNotifier`].
#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	pub from_name: String,
	pub tls_mode: TlsMode,
}

impl SmtpConfig {
	pub fn has_auth(&self) -> bool {
		self.username.is_some() && self.password.is_some()
	}
}

/// [`Notifier`] that sends email over SMTP.
pub struct SmtpNotifier {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from_mailbox: Mailbox,
}

impl SmtpNotifier {
	/// Build the transport. No connection is made until the first send.
	#[tracing::instrument(
		name = "smtp_notifier_new",
		skip(config),
		fields(host = %config.host, port = config.port, tls_mode = ?config.tls_mode)
	)]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let from_mailbox: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
			.parse()
			.map_err(|e| SmtpError::Address(format!("{e}")))?;

		let builder = match config.tls_mode {
			TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?,
			TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?,
			TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
		};

		let mut builder = builder.port(config.port);
		if let (Some(username), Some(password)) = (config.username, config.password) {
			builder = builder.credentials(Credentials::new(username, password.expose().to_string()));
		}

		tracing::debug!("SMTP notifier initialized");

		Ok(Self {
			transport: builder.build(),
			from_mailbox,
		})
	}

	/// Check that the SMTP server is reachable.
	pub async fn check_health(&self) -> Result<(), SmtpError> {
		self
			.transport
			.test_connection()
			.await
			.map_err(|e| SmtpError::Connection(format!("{e}")))?;
		Ok(())
	}

	async fn deliver(&self, to: &str, message: &EmailMessage) -> Result<(), SmtpError> {
		let to_mailbox: Mailbox = to.parse().map_err(|_| SmtpError::Address(to.to_string()))?;

		let email = Message::builder()
			.from(self.from_mailbox.clone())
			.to(to_mailbox)
			.subject(message.subject.as_str())
			.header(ContentType::TEXT_PLAIN)
			.body(message.body.clone())
			.map_err(|e| SmtpError::Send(format!("failed to build message: {e}")))?;

		self
			.transport
			.send(email)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::info!("verification email sent");
		Ok(())
	}
}

#[async_trait]
impl Notifier for SmtpNotifier {
	#[tracing::instrument(name = "smtp_send_email", skip(self, message), fields(to = %address))]
	async fn send_email(&self, address: &str, message: &EmailMessage) -> Result<(), NotificationError> {
		self.deliver(address, message).await.map_err(NotificationError::from)
	}

	async fn send_sms(&self, _number: &str, _body: &str) -> Result<(), NotificationError> {
		Err(NotificationError::UnsupportedChannel(Channel::Sms))
	}
}

/// Whether `email` parses as a mailbox.
pub fn is_valid_email(email: &str) -> bool {
	email.parse::<Mailbox>().is_ok()
}
