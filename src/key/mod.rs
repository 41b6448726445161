// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Key material handling
//!
//! This module groups everything related to RSA public key material:
//! the JWK/JWKS wire codec and the key store abstraction that the JWKS
//! server and the verifier resolve key identifiers through.

/// JWK / JWK Set wire codec
pub mod jwk;

/// Key store and key source abstractions
pub mod store;

pub use jwk::{Jwk, JwkError, JwkSet};
pub use store::{
    HttpKeySource, KeyRecord, KeySource, KeyStore, KeyStoreError, LocalKeySource, MemoryKeyStore,
};
