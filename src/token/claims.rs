// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT claim structures for API credentials
//!
//! This module defines the claim set carried by every signed API
//! credential. It follows the standard JWT claims of RFC 7519 plus a
//! protocol version claim and an open map of application claims.
//!
//! A claim set is a value object: once signed it is immutable, and any
//! change requires re-issuance under a new key identifier.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Protocol version stamped into every issued credential.
///
/// The verifier rejects any credential claiming a version newer than this
/// rather than accepting it best-effort.
pub const CLAIMS_VERSION: u32 = 1;

/// Claim set of a signed API credential
///
/// This structure is serialized into the JWT payload at issuance and
/// returned, fully validated, by the verifier. The issuer claim embeds the
/// key identifier as its final path segment; the verifier cross-checks it
/// against the kid declared in the JWT header.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiKeyClaims {
    /// Subject (typically the account or principal the credential names)
    ///
    /// Identifies the principal that is the subject of the JWT.
    pub sub: String,

    /// Issuer
    ///
    /// The configured issuer base URL with the key identifier appended as
    /// the final path segment, e.g. `https://keys.example.com/v1/<kid>`.
    pub iss: String,

    /// Audience
    ///
    /// Identifies the recipients the credential is intended for.
    pub aud: String,

    /// Expiration timestamp
    ///
    /// The expiration time after which the credential must not be accepted
    /// for processing, as seconds since 1970-01-01T00:00:00Z UTC. Always
    /// present; credentials without an expiration are rejected outright.
    pub exp: i64,

    /// Not before timestamp (when the credential becomes valid)
    ///
    /// Optional. Seconds since 1970-01-01T00:00:00Z UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued at timestamp
    ///
    /// Optional. Seconds since 1970-01-01T00:00:00Z UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Protocol version of the claim set
    ///
    /// See [`CLAIMS_VERSION`].
    pub ver: u32,

    /// Additional application claims
    ///
    /// Open map of claims the issuing application attaches to the
    /// credential. Flattened into the JWT payload alongside the standard
    /// claims.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
