// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::address::AddressError;

/// Errors raised while talking to a directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
	#[error("transport error: {0}")]
	Transport(String),

	#[error("request timed out")]
	Timeout,

	#[error("unauthorized: {0}")]
	Unauthorized(String),

	#[error("directory returned {status}: {message}")]
	Remote { status: u16, message: String },

	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("no relation resolved for {subject}/{predicate}")]
	UnresolvedRelation { subject: String, predicate: String },

	#[error("no literal stored at {subject}")]
	MissingLiteral { subject: String },

	#[error("unsupported operation: {0}")]
	UnsupportedOperation(String),

	#[error(transparent)]
	Address(#[from] AddressError),
}

impl DirectoryError {
	/// Whether the failure happened before the directory could answer.
	pub fn is_transport(&self) -> bool {
		matches!(self, DirectoryError::Transport(_) | DirectoryError::Timeout)
	}
}
