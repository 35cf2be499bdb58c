// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cloud identities and the ledger that tracks their lifecycle.
//!
//! ```text
//! Unprovisioned ──sign-up──> Provisional ──naming saga──> Named
//!                                                          │
//!                              Verified <──codes── ProfileSubmitted
//! ```
//!
//! Transitions only move forward. The ledger also records which steps of the
//! naming saga have completed so an interrupted saga resumes where it stopped.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use csp_directory::{CloudName, CloudNumber, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Lifecycle state of a cloud identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
	Unprovisioned,
	/// Endpoint and token digest are registered with the CSP.
	Provisional,
	/// A cloud name is bound in all three directories.
	Named,
	/// Profile written and verification codes sent.
	ProfileSubmitted,
	/// Both contact channels verified.
	Verified,
}

impl fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			LifecycleState::Unprovisioned => "unprovisioned",
			LifecycleState::Provisional => "provisional",
			LifecycleState::Named => "named",
			LifecycleState::ProfileSubmitted => "profile_submitted",
			LifecycleState::Verified => "verified",
		};
		f.write_str(s)
	}
}

/// Steps of the naming saga, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
	/// Name bound at the Registrar.
	RegistrarBinding,
	/// Name bound in the CSP registry.
	CspBinding,
	/// Name bound inside the cloud itself.
	CloudBinding,
}

impl RegistrationStep {
	pub const ALL: [RegistrationStep; 3] = [
		RegistrationStep::RegistrarBinding,
		RegistrationStep::CspBinding,
		RegistrationStep::CloudBinding,
	];
}

impl fmt::Display for RegistrationStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			RegistrationStep::RegistrarBinding => "registrar_binding",
			RegistrationStep::CspBinding => "csp_binding",
			RegistrationStep::CloudBinding => "cloud_binding",
		};
		f.write_str(s)
	}
}

/// What the CSP knows about one cloud it hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudIdentity {
	pub cloud_number: CloudNumber,
	pub endpoint: String,
	/// SHA-256 digest of the cloud's secret token.
	pub secret_token_digest: String,
	pub state: LifecycleState,
	pub name: Option<CloudName>,
	pub completed_steps: BTreeSet<RegistrationStep>,
}

impl CloudIdentity {
	pub fn provisional(cloud_number: CloudNumber, endpoint: String, secret_token_digest: String) -> Self {
		Self {
			cloud_number,
			endpoint,
			secret_token_digest,
			state: LifecycleState::Provisional,
			name: None,
			completed_steps: BTreeSet::new(),
		}
	}

	pub fn has_completed(&self, step: RegistrationStep) -> bool {
		self.completed_steps.contains(&step)
	}
}

/// Returned to the owner of a newly signed-up cloud.
#[derive(Debug, Clone)]
pub struct CspUserCredential {
	pub cloud_number: CloudNumber,
	pub secret_token: SecretString,
}

/// Process-local record of the clouds this CSP provisioned.
#[derive(Debug, Default)]
pub struct IdentityLedger {
	identities: RwLock<HashMap<CloudNumber, CloudIdentity>>,
}

impl IdentityLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn insert(&self, identity: CloudIdentity) {
		debug!(cloud_number = %identity.cloud_number, state = %identity.state, "recording identity");
		self
			.identities
			.write()
			.await
			.insert(identity.cloud_number.clone(), identity);
	}

	pub async fn get(&self, number: &CloudNumber) -> Option<CloudIdentity> {
		self.identities.read().await.get(number).cloned()
	}

	/// Move `number` forward to `state`.
	///
	/// Returns the state the identity is in afterwards, or `None` if the
	/// ledger does not know it. Moving backwards is a no-op.
	pub async fn advance(&self, number: &CloudNumber, state: LifecycleState) -> Option<LifecycleState> {
		let mut identities = self.identities.write().await;
		let identity = identities.get_mut(number)?;
		if state > identity.state {
			debug!(cloud_number = %number, from = %identity.state, to = %state, "advancing lifecycle");
			identity.state = state;
		}
		Some(identity.state)
	}

	/// Record a completed saga step together with the name it bound.
	pub async fn record_step(&self, number: &CloudNumber, name: &CloudName, step: RegistrationStep) -> bool {
		let mut identities = self.identities.write().await;
		let Some(identity) = identities.get_mut(number) else {
			return false;
		};
		identity.name = Some(name.clone());
		identity.completed_steps.insert(step);
		debug!(cloud_number = %number, step = %step, "recorded registration step");
		true
	}

	pub async fn len(&self) -> usize {
		self.identities.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.identities.read().await.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn number() -> CloudNumber {
		CloudNumber::parse("[=]!:uuid:1").unwrap()
	}

	fn identity() -> CloudIdentity {
		CloudIdentity::provisional(number(), "https://cloud.example.com/x".to_string(), "digest".to_string())
	}

	#[tokio::test]
	async fn advance_moves_forward_only() {
		let ledger = IdentityLedger::new();
		ledger.insert(identity()).await;

		assert_eq!(
			ledger.advance(&number(), LifecycleState::ProfileSubmitted).await,
			Some(LifecycleState::ProfileSubmitted)
		);
		assert_eq!(
			ledger.advance(&number(), LifecycleState::Named).await,
			Some(LifecycleState::ProfileSubmitted)
		);
	}

	#[tokio::test]
	async fn advance_unknown_identity_is_none() {
		let ledger = IdentityLedger::new();
		assert_eq!(ledger.advance(&number(), LifecycleState::Named).await, None);
	}

	#[tokio::test]
	async fn record_step_stores_name() {
		let ledger = IdentityLedger::new();
		ledger.insert(identity()).await;
		let name = CloudName::parse("=alice").unwrap();

		assert!(ledger.record_step(&number(), &name, RegistrationStep::RegistrarBinding).await);
		let stored = ledger.get(&number()).await.unwrap();
		assert_eq!(stored.name, Some(name));
		assert!(stored.has_completed(RegistrationStep::RegistrarBinding));
		assert!(!stored.has_completed(RegistrationStep::CspBinding));
	}

	#[test]
	fn steps_are_ordered() {
		let mut sorted = RegistrationStep::ALL;
		sorted.sort();
		assert_eq!(sorted, RegistrationStep::ALL);
	}

	fn any_state() -> impl Strategy<Value = LifecycleState> {
		prop::sample::select(vec![
			LifecycleState::Unprovisioned,
			LifecycleState::Provisional,
			LifecycleState::Named,
			LifecycleState::ProfileSubmitted,
			LifecycleState::Verified,
		])
	}

	proptest! {
		#[test]
		fn lifecycle_never_regresses(steps in prop::collection::vec(any_state(), 1..10)) {
			let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
			rt.block_on(async {
				let ledger = IdentityLedger::new();
				ledger.insert(identity()).await;
				let mut highest = LifecycleState::Provisional;
				for state in steps {
					let now = ledger.advance(&number(), state).await.unwrap();
					highest = highest.max(state);
					assert_eq!(now, highest);
				}
			});
		}
	}
}
