// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cloud endpoint construction.
//!
//! A cloud hosted by a CSP is reachable at `base + percentEncode(cloudNumber)`.
//! Cloud numbers contain `[`, `]`, `!` and `:`, so the encoding has to be
//! reversible for the hosting side to find the cloud again.

use crate::address::CloudNumber;

pub fn encode_identifier(identifier: &str) -> String {
	urlencoding::encode(identifier).into_owned()
}

pub fn decode_identifier(encoded: &str) -> Option<String> {
	urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

/// Endpoint of `number`'s cloud under `base`.
pub fn cloud_endpoint(base: &str, number: &CloudNumber) -> String {
	format!("{base}{}", encode_identifier(number.as_str()))
}

/// Recover the cloud number from an endpoint built by [`cloud_endpoint`].
pub fn cloud_number_from_endpoint(base: &str, endpoint: &str) -> Option<CloudNumber> {
	let encoded = endpoint.strip_prefix(base)?;
	let decoded = decode_identifier(encoded)?;
	CloudNumber::parse(&decoded).ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const BASE: &str = "https://cloud.example.com/";

	#[test]
	fn encodes_reserved_characters() {
		let number = CloudNumber::parse("[=]!:uuid:1234").unwrap();
		assert_eq!(
			cloud_endpoint(BASE, &number),
			"https://cloud.example.com/%5B%3D%5D%21%3Auuid%3A1234"
		);
	}

	#[test]
	fn endpoint_is_deterministic() {
		let number = CloudNumber::parse("[=]!:uuid:1234").unwrap();
		assert_eq!(cloud_endpoint(BASE, &number), cloud_endpoint(BASE, &number));
	}

	#[test]
	fn other_base_does_not_match() {
		let number = CloudNumber::parse("[=]!:uuid:1234").unwrap();
		let endpoint = cloud_endpoint(BASE, &number);
		assert_eq!(cloud_number_from_endpoint("https://other.example.com/", &endpoint), None);
	}

	proptest! {
		#[test]
		fn identifiers_roundtrip(id in "\\[[=@+]\\]![:a-z0-9\\[\\]!-]{1,40}") {
			let decoded = decode_identifier(&encode_identifier(&id));
			prop_assert_eq!(decoded.as_deref(), Some(id.as_str()));
		}

		#[test]
		fn cloud_numbers_roundtrip_through_endpoints(uuid in "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}") {
			let number = CloudNumber::parse(&format!("[=]!:uuid:{uuid}")).unwrap();
			let endpoint = cloud_endpoint(BASE, &number);
			prop_assert_eq!(cloud_number_from_endpoint(BASE, &endpoint), Some(number));
		}
	}
}
