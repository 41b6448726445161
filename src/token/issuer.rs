// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Credential issuance
//!
//! This module mints new API credentials: it generates a fresh RSA key
//! pair, assigns a key identifier, builds the claim set and signs it with
//! RS256. The private key exists only inside [`issue`] and is dropped
//! before the function returns; the caller receives the signed token, the
//! public key and the kid.
//!
//! # Example
//!
//! ```no_run
//! use japikeys::token::issuer::{issue, IssueConfig};
//! use chrono::{Duration, Utc};
//!
//! let config = IssueConfig {
//!     subject: "account-42".to_string(),
//!     issuer_base: "https://keys.example.com/v1".to_string(),
//!     audience: "orders-api".to_string(),
//!     expires_at: Utc::now() + Duration::hours(12),
//!     not_before: None,
//!     extra_claims: Default::default(),
//! };
//!
//! let issued = issue(&config).unwrap();
//! println!("kid {} token {}", issued.kid, issued.token);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use uuid::Uuid;

use super::claims::{ApiKeyClaims, CLAIMS_VERSION};
use super::error::IssueError;

/// RSA modulus size for newly generated credential keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Inputs to credential issuance
#[derive(Debug, Clone)]
pub struct IssueConfig {
    /// Subject the credential names. Must be non-empty.
    pub subject: String,

    /// Issuer base URL; the minted kid is appended as the final path
    /// segment to form the `iss` claim. Must be non-empty.
    pub issuer_base: String,

    /// Audience the credential is intended for. Must be non-empty.
    pub audience: String,

    /// Expiration instant. Must be strictly after the time of issuance.
    pub expires_at: DateTime<Utc>,

    /// Optional activation instant (`nbf` claim).
    pub not_before: Option<DateTime<Utc>>,

    /// Additional application claims merged into the payload.
    pub extra_claims: HashMap<String, serde_json::Value>,
}

/// A freshly issued credential
///
/// Carries everything the caller needs: the signed token to hand out, the
/// public key to register with the key store, and the kid naming the pair.
/// The private half of the key pair is gone by the time this exists.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    /// The signed JWT.
    pub token: String,

    /// Public half of the generated key pair.
    pub public_key: RsaPublicKey,

    /// Key identifier minted for this credential.
    pub kid: Uuid,
}

/// Issue a new API credential
///
/// Validates the inputs, generates a fresh 2048-bit RSA key pair, mints a
/// v4 kid, builds the claim set (protocol version [`CLAIMS_VERSION`],
/// issuer = base + kid, `iat` = now) and signs it with RS256. The JWT
/// header carries the kid so verifiers can resolve the key before
/// checking the signature.
///
/// # Errors
///
/// * [`IssueError::Validation`] - empty subject/issuer/audience or an
///   expiration that is not in the future
/// * [`IssueError::KeyGeneration`] - the RSA primitive failed
/// * [`IssueError::Signing`] - encoding the private key or applying the
///   signature failed
pub fn issue(config: &IssueConfig) -> Result<IssuedApiKey, IssueError> {
    if config.subject.is_empty() {
        return Err(IssueError::Validation("subject must not be empty".into()));
    }
    if config.issuer_base.is_empty() {
        return Err(IssueError::Validation("issuer base must not be empty".into()));
    }
    if config.audience.is_empty() {
        return Err(IssueError::Validation("audience must not be empty".into()));
    }
    let now = Utc::now();
    if config.expires_at <= now {
        return Err(IssueError::Validation(
            "expiration must be strictly in the future".into(),
        ));
    }

    let mut rng = rsa::rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|err| IssueError::KeyGeneration(err.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let kid = Uuid::new_v4();
    let claims = ApiKeyClaims {
        sub: config.subject.clone(),
        iss: format!("{}/{}", config.issuer_base.trim_end_matches('/'), kid),
        aud: config.audience.clone(),
        exp: config.expires_at.timestamp(),
        nbf: config.not_before.map(|instant| instant.timestamp()),
        iat: Some(now.timestamp()),
        ver: CLAIMS_VERSION,
        extra: config.extra_claims.clone(),
    };

    let private_pem = private_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|err| IssueError::Signing(err.to_string()))?;
    let signing_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
        .map_err(|err| IssueError::Signing(err.to_string()))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let token =
        encode(&header, &claims, &signing_key).map_err(|err| IssueError::Signing(err.to_string()))?;

    // The private key and its PEM encoding drop with this scope; only the
    // signed token and the public half leave the function.
    Ok(IssuedApiKey {
        token,
        public_key,
        kid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_config() -> IssueConfig {
        IssueConfig {
            subject: "account-1".to_string(),
            issuer_base: "https://keys.example.com/v1".to_string(),
            audience: "api".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            not_before: None,
            extra_claims: HashMap::new(),
        }
    }

    #[test]
    fn rejects_empty_inputs() {
        let mut config = base_config();
        config.subject = String::new();
        assert!(matches!(issue(&config), Err(IssueError::Validation(_))));

        let mut config = base_config();
        config.audience = String::new();
        assert!(matches!(issue(&config), Err(IssueError::Validation(_))));

        let mut config = base_config();
        config.issuer_base = String::new();
        assert!(matches!(issue(&config), Err(IssueError::Validation(_))));
    }

    #[test]
    fn rejects_expiration_not_in_future() {
        let mut config = base_config();
        config.expires_at = Utc::now() - Duration::seconds(1);
        assert!(matches!(issue(&config), Err(IssueError::Validation(_))));
    }

    #[test]
    fn issuer_claim_embeds_kid() {
        let issued = issue(&base_config()).expect("issuance succeeds");

        // Decode the payload without verification to inspect the claims.
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let payload_segment = issued.token.split('.').nth(1).expect("payload segment");
        let payload = URL_SAFE_NO_PAD.decode(payload_segment).expect("base64url");
        let claims: serde_json::Value = serde_json::from_slice(&payload).expect("json payload");

        assert_eq!(
            claims["iss"],
            format!("https://keys.example.com/v1/{}", issued.kid)
        );
        assert_eq!(claims["sub"], "account-1");
        assert_eq!(claims["ver"], 1);
    }

    #[test]
    fn header_kid_matches_minted_kid() {
        let issued = issue(&base_config()).expect("issuance succeeds");
        let header = jsonwebtoken::decode_header(&issued.token).expect("decodable header");
        assert_eq!(header.kid.as_deref(), Some(issued.kid.to_string().as_str()));
        assert_eq!(header.alg, Algorithm::RS256);
    }
}
