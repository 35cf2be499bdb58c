// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{CspConfigLayer, SmtpConfigLayer, VerificationConfigLayer};

/// Settings layer; every section is optional so sources can be merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsLayer {
	#[serde(default)]
	pub csp: Option<CspConfigLayer>,
	#[serde(default)]
	pub verification: Option<VerificationConfigLayer>,
	#[serde(default)]
	pub smtp: Option<SmtpConfigLayer>,
}

impl SettingsLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: SettingsLayer) {
		merge_option(&mut self.csp, other.csp, CspConfigLayer::merge);
		merge_option(
			&mut self.verification,
			other.verification,
			VerificationConfigLayer::merge,
		);
		merge_option(&mut self.smtp, other.smtp, SmtpConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
