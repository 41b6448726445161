// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The verification pipeline
//!
//! This module validates incoming credential strings through a sequence of
//! hard gates. Each stage either refines the state for the next stage or
//! aborts with that stage's [`VerifyError`] kind; stages are never run
//! past the first failure, so error reporting is unambiguous and no
//! network key retrieval happens for tokens already known malformed.
//!
//! Stage order:
//!
//! 1. size ceiling (before any parsing)
//! 2. three-segment structure
//! 3. algorithm pinned to RS256, read from the untrusted header
//! 4. unverified payload parse for routing claims
//! 5. protocol version
//! 6. issuer format (configured base + kid segment)
//! 7. header kid versus issuer kid
//! 8. key retrieval under a deadline
//! 9. RS256 signature verification
//! 10. strict time validation (expiration mandatory, zero skew)
//!
//! The verifier is stateless; a [`VerifyConfig`] can be shared by any
//! number of concurrent calls. The only suspension point is the key
//! lookup, which is bounded by the configured timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use japikeys::key::store::{LocalKeySource, MemoryKeyStore};
//! use japikeys::token::verifier::{verify, VerifyConfig};
//!
//! # async fn example(token: &str) {
//! let store = Arc::new(MemoryKeyStore::new());
//! let config = VerifyConfig {
//!     issuer_base: "https://keys.example.com/v1".to_string(),
//!     key_source: Arc::new(LocalKeySource::new(store)),
//!     lookup_timeout: Duration::from_secs(2),
//! };
//!
//! match verify(token, &config).await {
//!     Ok(claims) => println!("credential for {}", claims.sub),
//!     Err(err) => println!("rejected: {}", err),
//! }
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use log::debug;
use serde::Deserialize;
use uuid::Uuid;

use crate::key::jwk::JwkSet;
use crate::key::store::{KeySource, KeyStoreError};

use super::claims::{ApiKeyClaims, CLAIMS_VERSION};
use super::error::VerifyError;

/// Hard ceiling on accepted token size, applied before any parsing.
pub const MAX_TOKEN_BYTES: usize = 4096;

/// Verification configuration
///
/// Shared, immutable bundle a verifying party constructs once: the issuer
/// base every credential must claim, the key lookup capability, and the
/// deadline that bounds each lookup.
pub struct VerifyConfig {
    /// Issuer base URL credentials must carry in their `iss` claim.
    pub issuer_base: String,

    /// Key lookup capability; may perform network or database I/O.
    pub key_source: Arc<dyn KeySource>,

    /// Deadline applied to each key lookup.
    pub lookup_timeout: Duration,
}

/// The JWT header fields the pipeline reads before trusting anything.
#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
    kid: Option<String>,
}

/// Verify a credential string
///
/// Runs the full pipeline described in the module documentation and
/// returns the validated claim set, or the error kind of the first stage
/// that failed.
pub async fn verify(token: &str, config: &VerifyConfig) -> Result<ApiKeyClaims, VerifyError> {
    // Stage 1: size ceiling, before any parsing.
    if token.len() > MAX_TOKEN_BYTES {
        return Err(VerifyError::TokenTooLarge {
            size: token.len(),
            limit: MAX_TOKEN_BYTES,
        });
    }

    // Stage 2: exactly three non-empty dot-separated segments.
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|segment| segment.is_empty()) {
        return Err(VerifyError::MalformedToken(
            "token is not three dot-separated segments".to_string(),
        ));
    }

    // Stage 3: the declared algorithm must be exactly RS256. Read from
    // the raw header string so "none" and HMAC algorithms are rejected
    // before any cryptographic operation.
    let header_bytes = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|_| VerifyError::MalformedToken("header is not valid base64url".to_string()))?;
    let header: RawHeader = serde_json::from_slice(&header_bytes)
        .map_err(|err| VerifyError::MalformedToken(format!("undecodable header: {}", err)))?;
    if header.alg != "RS256" {
        return Err(VerifyError::AlgorithmUnsupported(header.alg));
    }
    let header_kid = header.kid.ok_or(VerifyError::MissingClaim("kid"))?;

    // Stage 4: unverified claim extraction: parse the payload for the
    // routing claims without yet trusting them cryptographically.
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|_| VerifyError::MalformedToken("payload is not valid base64url".to_string()))?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|err| VerifyError::MalformedToken(format!("undecodable payload: {}", err)))?;

    // Stage 5: protocol version must be present and understood.
    let version = payload
        .get("ver")
        .ok_or(VerifyError::MissingClaim("ver"))?
        .as_u64()
        .ok_or_else(|| VerifyError::MalformedToken("ver claim is not an integer".to_string()))?;
    if version > CLAIMS_VERSION as u64 {
        return Err(VerifyError::VersionTooHigh {
            version,
            max: CLAIMS_VERSION as u64,
        });
    }

    // Stage 6: issuer must be the configured base plus a kid segment.
    let issuer = payload
        .get("iss")
        .and_then(|value| value.as_str())
        .ok_or(VerifyError::MissingClaim("iss"))?;
    let issuer_kid = parse_issuer_kid(issuer, &config.issuer_base)?;

    // Stage 7: the header kid and the issuer kid must agree. A mismatch
    // is rejected even when both look well-formed on their own; it means
    // header and payload were stitched from different credentials.
    let header_kid_parsed = Uuid::parse_str(&header_kid)
        .map_err(|_| VerifyError::MalformedToken("header kid is not a UUID".to_string()))?;
    if header_kid_parsed != issuer_kid {
        return Err(VerifyError::KidMismatch {
            header_kid,
            issuer_kid: issuer_kid.to_string(),
        });
    }

    // Stage 8: key retrieval, bounded by the configured deadline.
    let lookup = config.key_source.fetch_jwks(&issuer_kid);
    let jwks_bytes = match tokio::time::timeout(config.lookup_timeout, lookup).await {
        Err(_) => {
            return Err(VerifyError::KeyStoreTimeout {
                kid: issuer_kid.to_string(),
            })
        }
        Ok(Err(KeyStoreError::NotFound)) => {
            return Err(VerifyError::KeyNotFound {
                kid: issuer_kid.to_string(),
            })
        }
        Ok(Err(KeyStoreError::Timeout)) => {
            return Err(VerifyError::KeyStoreTimeout {
                kid: issuer_kid.to_string(),
            })
        }
        Ok(Err(KeyStoreError::Unavailable(message))) => {
            return Err(VerifyError::KeyStoreUnavailable(message))
        }
        Ok(Err(KeyStoreError::Other(message))) => {
            return Err(VerifyError::UnexpectedInternal(message))
        }
        Ok(Ok(bytes)) => bytes,
    };

    let jwk_set = JwkSet::parse(&jwks_bytes).map_err(|err| {
        VerifyError::UnexpectedInternal(format!("key source returned invalid JWKS: {}", err))
    })?;
    let decoding_key = jwk_set
        .sole_key()
        .and_then(|jwk| jwk.to_decoding_key())
        .map_err(|err| {
            VerifyError::UnexpectedInternal(format!("key source returned unusable key: {}", err))
        })?;

    // Stage 9: cryptographic signature verification over header+payload.
    // Time claims are re-checked manually below with strict comparisons,
    // so the library's (leeway-tolerant) checks are disabled here.
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    let verified = decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|err| {
        match err.kind() {
            ErrorKind::InvalidSignature => VerifyError::SignatureInvalid,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => VerifyError::MalformedToken(err.to_string()),
            _ => VerifyError::UnexpectedInternal(err.to_string()),
        }
    })?;
    let claims = verified.claims;

    // Stage 10: time validation, strict comparisons, zero skew.
    // Expiration is mandatory; its absence is a distinct failure from
    // "expired". A credential whose expiration equals "now" is expired.
    let now = Utc::now().timestamp();
    let exp = claims
        .get("exp")
        .ok_or(VerifyError::MissingClaim("exp"))?
        .as_i64()
        .ok_or_else(|| VerifyError::MalformedToken("exp claim is not an integer".to_string()))?;
    if now >= exp {
        return Err(VerifyError::Expired { expired_at: exp });
    }
    if let Some(value) = claims.get("nbf") {
        let nbf = value
            .as_i64()
            .ok_or_else(|| VerifyError::MalformedToken("nbf claim is not an integer".to_string()))?;
        if now < nbf {
            return Err(VerifyError::NotYetValid { valid_from: nbf });
        }
    }
    if let Some(value) = claims.get("iat") {
        let iat = value
            .as_i64()
            .ok_or_else(|| VerifyError::MalformedToken("iat claim is not an integer".to_string()))?;
        if now < iat {
            return Err(VerifyError::NotYetValid { valid_from: iat });
        }
    }

    debug!("credential for kid {} verified", issuer_kid);
    serde_json::from_value::<ApiKeyClaims>(claims)
        .map_err(|err| VerifyError::MalformedToken(format!("invalid claim set: {}", err)))
}

/// Cheap, side-effect-free plausibility check
///
/// Inspects only size, three-segment structure and the issuer prefix to
/// decide whether a string is plausibly a credential of this system.
/// Performs no cryptographic or network work; intended for routing layers
/// that must cheaply decide whether to hand a token to [`verify`] at all.
pub fn quick_check(token: &str, issuer_base: &str) -> bool {
    if token.len() > MAX_TOKEN_BYTES {
        return false;
    }
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|segment| segment.is_empty()) {
        return false;
    }
    let Ok(payload_bytes) = URL_SAFE_NO_PAD.decode(segments[1]) else {
        return false;
    };
    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(&payload_bytes) else {
        return false;
    };
    match payload.get("iss").and_then(|value| value.as_str()) {
        Some(issuer) => issuer.starts_with(issuer_base.trim_end_matches('/')),
        None => false,
    }
}

/// Split an issuer claim into base and kid segment
///
/// The issuer must be exactly the configured base followed by one path
/// segment holding a well-formed kid.
fn parse_issuer_kid(issuer: &str, issuer_base: &str) -> Result<Uuid, VerifyError> {
    let base = issuer_base.trim_end_matches('/');
    let rest = issuer
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| VerifyError::IssuerInvalid(issuer.to_string()))?;
    Uuid::parse_str(rest).map_err(|_| VerifyError::IssuerInvalid(issuer.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_kid_parsing() {
        let kid = Uuid::new_v4();
        let base = "https://keys.example.com/v1";

        let parsed = parse_issuer_kid(&format!("{}/{}", base, kid), base).expect("valid issuer");
        assert_eq!(parsed, kid);

        // Trailing slash on the configured base is tolerated.
        let parsed =
            parse_issuer_kid(&format!("{}/{}", base, kid), "https://keys.example.com/v1/")
                .expect("valid issuer with trailing slash base");
        assert_eq!(parsed, kid);

        // Wrong base, missing kid, or junk kid all fail.
        assert!(parse_issuer_kid(&format!("https://other.example.com/{}", kid), base).is_err());
        assert!(parse_issuer_kid(base, base).is_err());
        assert!(parse_issuer_kid(&format!("{}/not-a-uuid", base), base).is_err());
        assert!(parse_issuer_kid(&format!("{}/{}/extra", base, kid), base).is_err());
    }

    #[test]
    fn quick_check_filters_on_shape_only() {
        let base = "https://keys.example.com/v1";

        assert!(!quick_check("", base));
        assert!(!quick_check("a.b", base));
        assert!(!quick_check(&"x".repeat(MAX_TOKEN_BYTES + 1), base));

        // A structurally plausible token passes even though its signature
        // is garbage; quick_check never inspects cryptography.
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({"iss": format!("{}/{}", base, Uuid::new_v4())}).to_string(),
        );
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#);
        let token = format!("{}.{}.{}", header, payload, "sig");
        assert!(quick_check(&token, base));

        // Same token, different expected issuer base.
        assert!(!quick_check(&token, "https://other.example.com"));
    }
}
