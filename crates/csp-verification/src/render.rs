// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rendering of verification messages.

use csp_directory::CloudNumber;
use url::Url;

/// Subject and plain-text body of a verification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
	pub subject: String,
	pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageCreationError {
	#[error("invalid validation callback '{url}': {reason}")]
	InvalidCallback { url: String, reason: String },

	#[error("template error: {0}")]
	Template(String),
}

/// Turns verification codes into message bodies.
pub trait MessageRenderer: Send + Sync {
	/// Email carrying `code` and a link back to `callback_url` for `identity`.
	fn render_email(
		&self,
		code: &str,
		callback_url: &str,
		identity: &CloudNumber,
	) -> Result<EmailMessage, MessageCreationError>;

	fn render_sms(&self, code: &str) -> Result<String, MessageCreationError>;
}

/// Plain-text templates branded with the CSP's display name.
#[derive(Debug, Clone)]
pub struct DefaultMessageRenderer {
	provider_name: String,
}

impl Default for DefaultMessageRenderer {
	fn default() -> Self {
		Self::new("Your cloud provider")
	}
}

impl DefaultMessageRenderer {
	pub fn new(provider_name: impl Into<String>) -> Self {
		Self {
			provider_name: provider_name.into(),
		}
	}

	/// `callback_url` with the cloud number and code appended as query
	/// parameters.
	pub fn verification_link(
		callback_url: &str,
		identity: &CloudNumber,
		code: &str,
	) -> Result<Url, MessageCreationError> {
		let mut url = Url::parse(callback_url).map_err(|e| MessageCreationError::InvalidCallback {
			url: callback_url.to_string(),
			reason: e.to_string(),
		})?;
		url
			.query_pairs_mut()
			.append_pair("cloudnumber", identity.as_str())
			.append_pair("code", code);
		Ok(url)
	}
}

impl MessageRenderer for DefaultMessageRenderer {
	fn render_email(
		&self,
		code: &str,
		callback_url: &str,
		identity: &CloudNumber,
	) -> Result<EmailMessage, MessageCreationError> {
		if code.is_empty() {
			return Err(MessageCreationError::Template("empty verification code".to_string()));
		}
		let link = Self::verification_link(callback_url, identity, code)?;

		Ok(EmailMessage {
			subject: format!("Verify your email address with {}", self.provider_name),
			body: format!(
				"Your email verification code is {code}.\n\n\
				 To confirm this address for cloud {identity}, open:\n\
				 {link}\n\n\
				 If you did not request this, you can ignore this email.\n\n\
				 - {}",
				self.provider_name
			),
		})
	}

	fn render_sms(&self, code: &str) -> Result<String, MessageCreationError> {
		if code.is_empty() {
			return Err(MessageCreationError::Template("empty verification code".to_string()));
		}
		Ok(format!("{}: your verification code is {code}", self.provider_name))
	}
}
