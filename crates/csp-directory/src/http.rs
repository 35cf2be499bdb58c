// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP transport for remote directories.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, trace};

use crate::client::DirectoryClient;
use crate::error::DirectoryError;
use crate::message::{DirectoryMessage, Operation, ResultGraph};
use crate::statement::Statement;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends directory messages as JSON over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
	http_client: Client,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
	from: &'a str,
	to: &'a str,
	link_contract: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	secret_token: Option<&'a str>,
	operations: &'a [Operation],
}

#[derive(Debug, Deserialize)]
struct WireResponse {
	#[serde(default)]
	statements: Vec<Statement>,
}

impl HttpDirectoryClient {
	pub fn new() -> Result<Self, DirectoryError> {
		Self::with_timeout(DEFAULT_TIMEOUT)
	}

	pub fn with_timeout(timeout: Duration) -> Result<Self, DirectoryError> {
		let http_client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| DirectoryError::Transport(format!("failed to build HTTP client: {e}")))?;
		Ok(Self { http_client })
	}
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
	#[instrument(
		skip(self, message),
		fields(to = %message.to_peer_root, operations = message.operations.len())
	)]
	async fn send(
		&self,
		endpoint: &str,
		message: &DirectoryMessage,
	) -> Result<ResultGraph, DirectoryError> {
		let wire = WireMessage {
			from: message.sender.as_str(),
			to: message.to_peer_root.as_str(),
			link_contract: message.link_contract.as_str(),
			secret_token: message.secret_token.as_ref().map(|t| t.expose()),
			operations: &message.operations,
		};

		debug!(endpoint = %endpoint, "sending directory message");

		let response = self
			.http_client
			.post(endpoint)
			.json(&wire)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					error!(endpoint = %endpoint, "directory request timed out");
					return DirectoryError::Timeout;
				}
				error!(endpoint = %endpoint, error = %e, "directory request failed");
				DirectoryError::Transport(e.to_string())
			})?;

		let status = response.status();
		debug!(status = %status, "received directory response");

		if !status.is_success() {
			let status_code = status.as_u16();
			let body = response.text().await.unwrap_or_default();

			if status_code == 401 || status_code == 403 {
				error!(status = status_code, "directory rejected credentials");
				return Err(DirectoryError::Unauthorized(body));
			}

			error!(status = status_code, body = %body, "directory returned an error");
			return Err(DirectoryError::Remote {
				status: status_code,
				message: body,
			});
		}

		let body = response
			.text()
			.await
			.map_err(|e| DirectoryError::Transport(format!("failed to read response body: {e}")))?;

		trace!(body = %body, "directory response body");

		let parsed: WireResponse = serde_json::from_str(&body).map_err(|e| {
			error!(error = %e, "failed to parse directory response");
			DirectoryError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		debug!(statements = parsed.statements.len(), "directory message applied");
		Ok(ResultGraph::new(parsed.statements))
	}
}
