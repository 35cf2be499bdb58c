// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use csp_directory::{CloudName, CloudNumber, DirectoryError};
use csp_verification::{MessageCreationError, NotificationError, SignerError, TokenError};
use thiserror::Error;

/// Result type alias for coordinator operations.
pub type CspResult<T> = Result<T, CspError>;

/// Errors surfaced by the registration and verification coordinators.
///
/// Every collaborator failure maps to exactly one variant. Nothing is retried
/// and nothing is rolled back.
#[derive(Error, Debug)]
pub enum CspError {
	#[error("configuration error: {0}")]
	Configuration(String),

	#[error("directory error: {0}")]
	Directory(#[from] DirectoryError),

	#[error("cloud name {name} is bound to {registered}, not {requested}")]
	Conflict {
		name: CloudName,
		registered: CloudNumber,
		requested: CloudNumber,
	},

	#[error("token error: {0}")]
	Token(#[from] TokenError),

	#[error("notification error: {0}")]
	Notification(#[from] NotificationError),

	#[error("message creation error: {0}")]
	MessageCreation(#[from] MessageCreationError),

	/// Sign-up could not write the new cloud's records.
	#[error("provisioning failed: {0}")]
	Provisioning(#[source] DirectoryError),

	#[error("signing error: {0}")]
	Signing(#[from] SignerError),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("not implemented: {0}")]
	NotImplemented(&'static str),
}
