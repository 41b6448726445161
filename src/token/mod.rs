// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Credential issuance and verification
//!
//! This module contains the claim set data model, the signer that mints
//! new API credentials, and the multi-stage verification pipeline with its
//! closed error taxonomy.

/// JWT claim structures for API credentials
pub mod claims;

/// Closed error taxonomies for issuance and verification
pub mod error;

/// Credential issuance
pub mod issuer;

/// The verification pipeline
pub mod verifier;

pub use claims::{ApiKeyClaims, CLAIMS_VERSION};
pub use error::{IssueError, VerifyError};
pub use issuer::{issue, IssueConfig, IssuedApiKey};
pub use verifier::{quick_check, verify, VerifyConfig, MAX_TOKEN_BYTES};
