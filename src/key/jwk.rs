// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWK and JWK Set wire codec
//!
//! This module converts between an RSA public key plus key identifier and
//! the JSON Web Key / JWK Set wire representations defined in RFC 7517.
//! Validation of the wire form (key type, field presence, base64url
//! decodability, positivity of the decoded integers, kid syntax) happens
//! exactly once, in [`JwkSet::parse`] / [`Jwk::validate`]; a `Jwk` obtained
//! through those paths is assumed valid for the rest of its lifetime.
//!
//! # Example
//!
//! ```no_run
//! use japikeys::key::jwk::JwkSet;
//! # let public_key: rsa::RsaPublicKey = unimplemented!();
//! let kid = uuid::Uuid::new_v4();
//! let set = JwkSet::for_key(&public_key, &kid);
//! let body = serde_json::to_string(&set).unwrap();
//!
//! // On the consuming side, parse + validate in one step:
//! let parsed = JwkSet::parse(body.as_bytes()).unwrap();
//! let decoding_key = parsed.sole_key().unwrap().to_decoding_key().unwrap();
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::DecodingKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the JWK codec
///
/// All variants describe structural problems with the wire form. None of
/// them ever carries key material beyond the already-public components.
#[derive(Debug, Error)]
pub enum JwkError {
    /// The `kty` field names a key type other than RSA.
    #[error("Unsupported JWK key type: {0}")]
    UnsupportedKeyType(String),

    /// A required field is missing or empty.
    #[error("Missing or empty JWK field: {0}")]
    MissingField(&'static str),

    /// The kid is not a well-formed UUID.
    #[error("Invalid JWK kid: {0}")]
    InvalidKid(String),

    /// A component is not valid base64url.
    #[error("JWK field {field} is not valid base64url")]
    InvalidBase64 {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A component decoded to zero or to an empty byte string.
    #[error("JWK field {field} must decode to a positive integer")]
    NonPositiveComponent {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A key set does not contain exactly one key where one is expected.
    #[error("JWK set contains {0} keys where exactly one is expected")]
    NotSingleKey(usize),

    /// The document is not a syntactically valid JWKS.
    #[error("Malformed JWKS document: {0}")]
    Malformed(String),

    /// The decoded components do not form a usable RSA public key.
    #[error("Invalid RSA key material: {0}")]
    InvalidKey(String),
}

/// A single RSA JSON Web Key
///
/// Wire representation of one RSA public key as defined in RFC 7517:
/// key type, key identifier, and the base64url-encoded big-endian modulus
/// and public exponent. This system issues exactly one key per kid, so a
/// `Jwk` always carries a kid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `"RSA"` for keys issued by this system.
    pub kty: String,

    /// Key identifier, a hyphenated UUID naming one key pair.
    pub kid: String,

    /// Modulus, base64url-encoded unsigned big-endian bytes.
    pub n: String,

    /// Public exponent, base64url-encoded unsigned big-endian bytes.
    /// Keys generated by this system use 65537 (`"AQAB"`).
    pub e: String,
}

impl Jwk {
    /// Encode an RSA public key and kid into wire form
    ///
    /// The modulus and exponent are emitted as base64url unsigned
    /// big-endian bytes; whatever public exponent the key carries is
    /// encoded the same way (65537 for keys this system generates).
    pub fn from_public_key(public_key: &RsaPublicKey, kid: &Uuid) -> Self {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    /// Validate the wire form
    ///
    /// Checks key type, field presence, kid syntax, base64url
    /// decodability and positivity of both integer components. Called by
    /// [`JwkSet::parse`]; code that constructs a `Jwk` from raw input by
    /// other means must call it before trusting the value.
    pub fn validate(&self) -> Result<(), JwkError> {
        if self.kty != "RSA" {
            return Err(JwkError::UnsupportedKeyType(self.kty.clone()));
        }
        if self.kid.is_empty() {
            return Err(JwkError::MissingField("kid"));
        }
        Uuid::parse_str(&self.kid).map_err(|_| JwkError::InvalidKid(self.kid.clone()))?;
        decode_component(&self.n, "n")?;
        decode_component(&self.e, "e")?;
        Ok(())
    }

    /// Decode the wire form back into an RSA public key
    pub fn to_public_key(&self) -> Result<RsaPublicKey, JwkError> {
        let n = decode_component(&self.n, "n")?;
        let e = decode_component(&self.e, "e")?;
        RsaPublicKey::new(n, e).map_err(|err| JwkError::InvalidKey(err.to_string()))
    }

    /// Build a `jsonwebtoken` decoding key from the wire components
    ///
    /// This is the form the verifier consumes for RS256 signature checks.
    pub fn to_decoding_key(&self) -> Result<DecodingKey, JwkError> {
        DecodingKey::from_rsa_components(&self.n, &self.e)
            .map_err(|err| JwkError::InvalidKey(err.to_string()))
    }
}

/// A JSON Web Key Set
///
/// An ordered collection of JWKs. A set produced by this system for a
/// single kid contains exactly one key; [`JwkSet::sole_key`] enforces
/// that expectation on the consuming side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Build the single-key set for one public key and kid
    pub fn for_key(public_key: &RsaPublicKey, kid: &Uuid) -> Self {
        JwkSet {
            keys: vec![Jwk::from_public_key(public_key, kid)],
        }
    }

    /// Parse and validate a JWKS document from raw bytes
    ///
    /// This is the single validation point for key material received from
    /// the outside: every key in the set is structurally validated here,
    /// and never again afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`JwkError::Malformed`] when the bytes are not a JWKS
    /// document at all, or the per-key validation error of the first
    /// offending key.
    pub fn parse(bytes: &[u8]) -> Result<Self, JwkError> {
        let set: JwkSet =
            serde_json::from_slice(bytes).map_err(|err| JwkError::Malformed(err.to_string()))?;
        for key in &set.keys {
            key.validate()?;
        }
        Ok(set)
    }

    /// Return the set's only key
    ///
    /// # Errors
    ///
    /// Returns [`JwkError::NotSingleKey`] when the set is empty or holds
    /// more than one key. This system issues one key per kid, never key
    /// families.
    pub fn sole_key(&self) -> Result<&Jwk, JwkError> {
        match self.keys.as_slice() {
            [key] => Ok(key),
            keys => Err(JwkError::NotSingleKey(keys.len())),
        }
    }
}

/// Decode one base64url integer component, rejecting empty and zero values
fn decode_component(value: &str, field: &'static str) -> Result<BigUint, JwkError> {
    if value.is_empty() {
        return Err(JwkError::MissingField(field));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| JwkError::InvalidBase64 { field })?;
    let int = BigUint::from_bytes_be(&bytes);
    if bytes.is_empty() || int == BigUint::from_bytes_be(&[0]) {
        return Err(JwkError::NonPositiveComponent { field });
    }
    Ok(int)
}
