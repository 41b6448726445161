// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Closed error taxonomies for issuance and verification
//!
//! Every failure of the verification pipeline maps to exactly one variant
//! of [`VerifyError`], tagged with the first stage that failed; callers can
//! branch exhaustively on the kind. Variants carry the offending and
//! expected values for diagnostics but never key material.

use thiserror::Error;

/// Verification failures
///
/// One variant per pipeline stage outcome. The pipeline aborts at the
/// first failing stage, so a caller always receives exactly one of these.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token exceeds the size ceiling. Rejected before any parsing.
    #[error("Token of {size} bytes exceeds the {limit} byte ceiling")]
    TokenTooLarge {
        /// Observed token size in bytes.
        size: usize,
        /// The configured ceiling.
        limit: usize,
    },

    /// The token does not decompose into a well-formed JWT.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The header declares an algorithm other than RS256.
    ///
    /// Checked from the untrusted header before any cryptographic
    /// operation, so `"none"` and HMAC algorithms never reach signature
    /// verification.
    #[error("Unsupported JWT algorithm: {0}")]
    AlgorithmUnsupported(String),

    /// A claim the pipeline requires is absent.
    ///
    /// A missing expiration is reported through this kind, deliberately
    /// distinct from [`VerifyError::Expired`].
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),

    /// The claimed protocol version is newer than this verifier understands.
    #[error("Claims version {version} exceeds maximum understood version {max}")]
    VersionTooHigh {
        /// Version claimed by the token.
        version: u64,
        /// Newest version this verifier accepts.
        max: u64,
    },

    /// The issuer claim does not match the configured base or does not end
    /// in a well-formed kid segment.
    #[error("Invalid issuer: {0}")]
    IssuerInvalid(String),

    /// The kid in the JWT header differs from the kid embedded in the
    /// issuer claim.
    #[error("Header kid {header_kid} does not match issuer kid {issuer_kid}")]
    KidMismatch {
        /// Kid declared in the JWT header.
        header_kid: String,
        /// Kid parsed from the issuer claim.
        issuer_kid: String,
    },

    /// No key exists for the kid (or the key is revoked; the two are
    /// indistinguishable at this boundary).
    #[error("Key not found for kid {kid}")]
    KeyNotFound {
        /// The kid that failed to resolve.
        kid: String,
    },

    /// Key lookup did not complete within the configured timeout.
    #[error("Key store timeout while resolving kid {kid}")]
    KeyStoreTimeout {
        /// The kid being resolved when the deadline expired.
        kid: String,
    },

    /// The key store is temporarily unreachable.
    #[error("Key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    /// Cryptographic signature verification failed.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The credential's expiration instant has been reached.
    #[error("Token expired at {expired_at}")]
    Expired {
        /// The `exp` claim, seconds since the Unix epoch.
        expired_at: i64,
    },

    /// The credential is not yet within its validity window.
    #[error("Token not valid before {valid_from}")]
    NotYetValid {
        /// The violated `nbf` or `iat` claim, seconds since the Unix epoch.
        valid_from: i64,
    },

    /// Any failure that does not fit the taxonomy; logged with detail,
    /// opaque to external callers.
    #[error("Unexpected internal error: {0}")]
    UnexpectedInternal(String),
}

/// Issuance failures
#[derive(Debug, Error)]
pub enum IssueError {
    /// The issuance inputs are malformed (empty subject/issuer/audience,
    /// expiration not in the future).
    #[error("Invalid issuance input: {0}")]
    Validation(String),

    /// The RSA key generation primitive failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Building or applying the RS256 signature failed.
    #[error("Signing failed: {0}")]
    Signing(String),
}
