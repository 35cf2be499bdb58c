// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of verification messages.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::render::EmailMessage;

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
	Email,
	Sms,
}

impl fmt::Display for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Channel::Email => f.write_str("email"),
			Channel::Sms => f.write_str("sms"),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
	#[error("invalid {channel} recipient: {recipient}")]
	InvalidRecipient { channel: Channel, recipient: String },

	#[error("{channel} delivery failed: {message}")]
	Delivery { channel: Channel, message: String },

	#[error("{0} delivery is not supported by this notifier")]
	UnsupportedChannel(Channel),
}

/// Sends rendered messages to people.
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn send_email(&self, address: &str, message: &EmailMessage) -> Result<(), NotificationError>;

	async fn send_sms(&self, number: &str, body: &str) -> Result<(), NotificationError>;
}

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
	pub channel: Channel,
	pub recipient: String,
	pub subject: Option<String>,
	pub body: String,
}

/// Keeps every message in an in-memory outbox instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
	outbox: Mutex<Vec<SentNotification>>,
	failing: Mutex<Option<Channel>>,
}

impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fail every delivery on `channel` from now on.
	pub async fn fail_channel(&self, channel: Channel) {
		*self.failing.lock().await = Some(channel);
	}

	pub async fn sent(&self) -> Vec<SentNotification> {
		self.outbox.lock().await.clone()
	}

	pub async fn sent_to(&self, recipient: &str) -> Vec<SentNotification> {
		self
			.outbox
			.lock()
			.await
			.iter()
			.filter(|n| n.recipient == recipient)
			.cloned()
			.collect()
	}

	async fn record(&self, notification: SentNotification) -> Result<(), NotificationError> {
		if *self.failing.lock().await == Some(notification.channel) {
			return Err(NotificationError::Delivery {
				channel: notification.channel,
				message: "recording notifier configured to fail".to_string(),
			});
		}
		debug!(channel = %notification.channel, recipient = %notification.recipient, "recorded notification");
		self.outbox.lock().await.push(notification);
		Ok(())
	}
}

#[async_trait]
impl Notifier for RecordingNotifier {
	#[instrument(skip(self, message), fields(to = %address))]
	async fn send_email(&self, address: &str, message: &EmailMessage) -> Result<(), NotificationError> {
		self
			.record(SentNotification {
				channel: Channel::Email,
				recipient: address.to_string(),
				subject: Some(message.subject.clone()),
				body: message.body.clone(),
			})
			.await
	}

	#[instrument(skip(self, body), fields(to = %number))]
	async fn send_sms(&self, number: &str, body: &str) -> Result<(), NotificationError> {
		self
			.record(SentNotification {
				channel: Channel::Sms,
				recipient: number.to_string(),
				subject: None,
				body: body.to_string(),
			})
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn email() -> EmailMessage {
		EmailMessage {
			subject: "Verify".to_string(),
			body: "code 123456".to_string(),
		}
	}

	#[tokio::test]
	async fn records_both_channels_in_order() {
		let notifier = RecordingNotifier::new();
		notifier.send_email("alice@example.com", &email()).await.unwrap();
		notifier.send_sms("+15550100", "code 654321").await.unwrap();

		let sent = notifier.sent().await;
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].channel, Channel::Email);
		assert_eq!(sent[0].subject.as_deref(), Some("Verify"));
		assert_eq!(sent[1].channel, Channel::Sms);
		assert_eq!(sent[1].body, "code 654321");
		assert_eq!(notifier.sent_to("+15550100").await.len(), 1);
	}

	#[tokio::test]
	async fn failing_channel_records_nothing() {
		let notifier = RecordingNotifier::new();
		notifier.fail_channel(Channel::Sms).await;

		let err = notifier.send_sms("+15550100", "code").await.unwrap_err();
		assert!(matches!(err, NotificationError::Delivery { channel: Channel::Sms, .. }));
		notifier.send_email("alice@example.com", &email()).await.unwrap();
		assert_eq!(notifier.sent().await.len(), 1);
	}
}
