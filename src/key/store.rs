// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Key store and key source abstractions
//!
//! The JWKS server resolves key identifiers through the [`KeyStore`] trait,
//! the sole persistence boundary of the system: implementations answer
//! "give me the key for this kid" with the public key and a revoked flag,
//! or with one of a fixed set of failure outcomes. The verifier resolves
//! kids through the narrower [`KeySource`] trait, which yields raw JWKS
//! bytes that the codec interprets.
//!
//! Revoked keys and absent keys are collapsed to the same observable
//! outcome at every external boundary; only internal log lines record the
//! true reason.

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, warn};
use rocket::async_trait;
use rsa::RsaPublicKey;
use thiserror::Error;
use uuid::Uuid;

use super::jwk::JwkSet;

/// Failure outcomes of a key lookup
///
/// This is the closed outcome set of the external key store capability.
/// Callers branch on the variant to decide the externally visible result;
/// `Unavailable` and `Other` carry operator-facing context, never key
/// material.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key exists for the requested kid.
    #[error("Key not found")]
    NotFound,

    /// The store did not answer within its deadline.
    #[error("Key store timeout")]
    Timeout,

    /// The store is temporarily unreachable.
    #[error("Key store unavailable: {0}")]
    Unavailable(String),

    /// Any other store failure.
    #[error("Key store error: {0}")]
    Other(String),
}

/// A key lookup result: the public key plus its revocation status
///
/// Owned by the caller that requested it; the verifier never caches these.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    /// RSA public key registered for the kid.
    pub public_key: RsaPublicKey,

    /// Whether the key has been revoked. A revoked key keeps its
    /// historical record but must never be served or trusted again.
    pub revoked: bool,
}

/// The external key store capability
///
/// Implementations resolve a kid to a [`KeyRecord`] or one of the
/// [`KeyStoreError`] outcomes. Implementations must be safe to call from
/// many concurrent lookups; deadline enforcement is the caller's job.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the key record for a kid.
    async fn fetch(&self, kid: &Uuid) -> Result<KeyRecord, KeyStoreError>;
}

/// Verifier-side key lookup: kid to raw JWKS bytes
///
/// The verifier does not care where key material comes from: an HTTP
/// JWKS endpoint, an in-process store, a file. Whatever the source
/// returns is interpreted by the JWK codec.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the JWKS document bytes for a kid.
    async fn fetch_jwks(&self, kid: &Uuid) -> Result<Vec<u8>, KeyStoreError>;
}

/// In-memory key store
///
/// Reference [`KeyStore`] used by the daemon and the test suite.
/// Persistence-backed stores live behind the same trait in deployments
/// that need them.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: DashMap<Uuid, KeyRecord>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a public key under a kid.
    pub fn insert(&self, kid: Uuid, public_key: RsaPublicKey) {
        self.keys.insert(
            kid,
            KeyRecord {
                public_key,
                revoked: false,
            },
        );
    }

    /// Mark a kid as revoked, keeping its record.
    ///
    /// Returns `false` when the kid is unknown.
    pub fn revoke(&self, kid: &Uuid) -> bool {
        match self.keys.get_mut(kid) {
            Some(mut record) => {
                record.revoked = true;
                true
            }
            None => false,
        }
    }

    /// Remove a kid entirely.
    pub fn remove(&self, kid: &Uuid) -> bool {
        self.keys.remove(kid).is_some()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn fetch(&self, kid: &Uuid) -> Result<KeyRecord, KeyStoreError> {
        self.keys
            .get(kid)
            .map(|record| record.value().clone())
            .ok_or(KeyStoreError::NotFound)
    }
}

/// In-process [`KeySource`] over any [`KeyStore`]
///
/// Applies the same revocation mapping as the JWKS server: a revoked key
/// is reported as not found, with the true reason kept to the audit log.
pub struct LocalKeySource {
    store: Arc<dyn KeyStore>,
}

impl LocalKeySource {
    /// Wrap a key store.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        LocalKeySource { store }
    }
}

#[async_trait]
impl KeySource for LocalKeySource {
    async fn fetch_jwks(&self, kid: &Uuid) -> Result<Vec<u8>, KeyStoreError> {
        let record = self.store.fetch(kid).await?;
        if record.revoked {
            warn!("audit: lookup of revoked kid {} reported as not found", kid);
            return Err(KeyStoreError::NotFound);
        }
        let set = JwkSet::for_key(&record.public_key, kid);
        serde_json::to_vec(&set).map_err(|err| KeyStoreError::Other(err.to_string()))
    }
}

/// HTTP [`KeySource`] against a per-kid JWKS endpoint
///
/// Fetches `{base}/{kid}/.well-known/jwks.json` and maps the endpoint's
/// response statuses back onto the lookup outcome set: 404 to not-found,
/// 503 to unavailable, transport timeouts to timeout.
pub struct HttpKeySource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKeySource {
    /// Create a source for the JWKS endpoint rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpKeySource {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch_jwks(&self, kid: &Uuid) -> Result<Vec<u8>, KeyStoreError> {
        let url = format!(
            "{}/{}/.well-known/jwks.json",
            self.base_url.trim_end_matches('/'),
            kid
        );
        debug!("Fetching JWKS from {}", url);

        let response = self.client.get(&url).send().await.map_err(|err| {
            if err.is_timeout() {
                KeyStoreError::Timeout
            } else if err.is_connect() {
                KeyStoreError::Unavailable(err.to_string())
            } else {
                KeyStoreError::Other(err.to_string())
            }
        })?;

        match response.status().as_u16() {
            200 => response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|err| KeyStoreError::Other(err.to_string())),
            404 => Err(KeyStoreError::NotFound),
            503 => Err(KeyStoreError::Unavailable("JWKS endpoint returned 503".to_string())),
            status => Err(KeyStoreError::Other(format!(
                "JWKS endpoint returned unexpected status {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    fn test_public_key() -> RsaPublicKey {
        let mut rng = rsa::rand_core::OsRng;
        let private_key =
            RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA private key");
        RsaPublicKey::from(&private_key)
    }

    #[tokio::test]
    async fn memory_store_fetch_and_revoke() {
        let store = MemoryKeyStore::new();
        let kid = Uuid::new_v4();
        let public_key = test_public_key();

        assert!(matches!(
            store.fetch(&kid).await.unwrap_err(),
            KeyStoreError::NotFound
        ));

        store.insert(kid, public_key.clone());
        let record = store.fetch(&kid).await.expect("key present");
        assert!(!record.revoked);
        assert_eq!(record.public_key, public_key);

        assert!(store.revoke(&kid));
        let record = store.fetch(&kid).await.expect("record survives revocation");
        assert!(record.revoked);

        assert!(store.remove(&kid));
        assert!(!store.revoke(&kid));
    }

    #[tokio::test]
    async fn local_source_collapses_revoked_to_not_found() {
        let store = Arc::new(MemoryKeyStore::new());
        let kid = Uuid::new_v4();
        store.insert(kid, test_public_key());

        let source = LocalKeySource::new(store.clone());
        let bytes = source.fetch_jwks(&kid).await.expect("jwks served");
        let set = JwkSet::parse(&bytes).expect("valid JWKS");
        assert_eq!(set.sole_key().unwrap().kid, kid.to_string());

        store.revoke(&kid);
        assert!(matches!(
            source.fetch_jwks(&kid).await.unwrap_err(),
            KeyStoreError::NotFound
        ));

        // A never-issued kid must be indistinguishable from the revoked one.
        let unknown = Uuid::new_v4();
        assert!(matches!(
            source.fetch_jwks(&unknown).await.unwrap_err(),
            KeyStoreError::NotFound
        ));
    }
}
