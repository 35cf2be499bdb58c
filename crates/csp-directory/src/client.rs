// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::message::{DirectoryMessage, ResultGraph};

/// Transport to a directory.
///
/// Implementations send one message per call and never retry; a message is
/// applied atomically by the directory or not at all.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
	async fn send(
		&self,
		endpoint: &str,
		message: &DirectoryMessage,
	) -> Result<ResultGraph, DirectoryError>;
}

#[async_trait]
impl<T> DirectoryClient for Arc<T>
where
	T: DirectoryClient + ?Sized,
{
	async fn send(
		&self,
		endpoint: &str,
		message: &DirectoryMessage,
	) -> Result<ResultGraph, DirectoryError> {
		(**self).send(endpoint, message).await
	}
}
