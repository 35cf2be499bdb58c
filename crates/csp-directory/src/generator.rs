// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use uuid::Uuid;

use crate::address::{CloudNumber, ContextSymbol};

/// Source of fresh, globally unique cloud numbers.
pub trait CloudNumberGenerator: Send + Sync {
	fn generate(&self, cs: ContextSymbol) -> CloudNumber;
}

/// Generates `[<cs>]!:uuid:<v4 uuid>` cloud numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCloudNumberGenerator;

impl CloudNumberGenerator for UuidCloudNumberGenerator {
	fn generate(&self, cs: ContextSymbol) -> CloudNumber {
		CloudNumber::new_unchecked(format!("[{}]!:uuid:{}", cs.as_char(), Uuid::new_v4()))
	}
}
