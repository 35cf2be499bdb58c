// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod csp;
pub mod smtp;
pub mod verification;

pub use csp::CspConfigLayer;
pub use smtp::{parse_tls_mode, SmtpConfigLayer};
pub use verification::{VerificationConfig, VerificationConfigLayer};
