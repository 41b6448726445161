// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Integration tests for the JWKS distribution endpoint
//!
//! Drives the mounted Rocket instance through its local client and pins
//! the full response mapping: 200 with a single-key JWKS, 400 for
//! malformed kids, the 404 revocation/absence collapse, 503 for slow or
//! unreachable stores, 500 for anything unexpected, and the cache
//! staleness window.

use std::sync::Arc;
use std::time::Duration;

use rocket::async_trait;
use rocket::http::Status;
use rocket::local::asynchronous::Client;
use rsa::{RsaPrivateKey, RsaPublicKey};
use uuid::Uuid;

use japikeys::jwks_server::{build_rocket, JwksCache, JwksServerState};
use japikeys::key::jwk::JwkSet;
use japikeys::key::store::{KeyRecord, KeyStore, KeyStoreError, MemoryKeyStore};

/// Generate a test configuration for Rocket
fn test_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("port", 0)) // Use random port for testing
        .merge(("address", "127.0.0.1"))
        .merge(("log_level", rocket::config::LogLevel::Debug))
}

fn test_public_key() -> RsaPublicKey {
    let mut rng = rsa::rand_core::OsRng;
    let private_key =
        RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA private key");
    RsaPublicKey::from(&private_key)
}

async fn client_with(state: JwksServerState) -> Client {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
    let rocket = build_rocket(test_figment(), "/keys", state);
    Client::tracked(rocket)
        .await
        .expect("valid rocket instance")
}

fn state_with_store(store: Arc<dyn KeyStore>, cache_max_age_secs: i64) -> JwksServerState {
    JwksServerState {
        store,
        cache: JwksCache::new(cache_max_age_secs),
        store_timeout: Duration::from_millis(200),
    }
}

fn jwks_path(kid: &Uuid) -> String {
    format!("/keys/{}/.well-known/jwks.json", kid)
}

#[rocket::async_test]
async fn known_kid_is_served_as_single_key_jwks() {
    let store = Arc::new(MemoryKeyStore::new());
    let kid = Uuid::new_v4();
    let public_key = test_public_key();
    store.insert(kid, public_key.clone());

    let client = client_with(state_with_store(store, 60)).await;
    let response = client.get(jwks_path(&kid)).dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.expect("response body");
    let set = JwkSet::parse(body.as_bytes()).expect("valid JWKS body");
    let key = set.sole_key().expect("exactly one key");
    assert_eq!(key.kid, kid.to_string());
    assert_eq!(key.kty, "RSA");
    assert_eq!(key.to_public_key().expect("decodable"), public_key);
}

#[rocket::async_test]
async fn malformed_kid_is_rejected_before_the_store() {
    let store = Arc::new(MemoryKeyStore::new());
    let client = client_with(state_with_store(store, 60)).await;

    let response = client
        .get("/keys/not-a-uuid/.well-known/jwks.json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn revoked_and_unknown_kids_are_observably_identical() {
    let store = Arc::new(MemoryKeyStore::new());
    let revoked_kid = Uuid::new_v4();
    store.insert(revoked_kid, test_public_key());
    store.revoke(&revoked_kid);
    let unknown_kid = Uuid::new_v4();

    let client = client_with(state_with_store(store, 0)).await;

    let revoked_response = client.get(jwks_path(&revoked_kid)).dispatch().await;
    let revoked_status = revoked_response.status();
    let revoked_body = revoked_response.into_string().await;

    let unknown_response = client.get(jwks_path(&unknown_kid)).dispatch().await;
    let unknown_status = unknown_response.status();
    let unknown_body = unknown_response.into_string().await;

    assert_eq!(revoked_status, Status::NotFound);
    assert_eq!(unknown_status, Status::NotFound);
    assert_eq!(revoked_body, unknown_body);
}

/// A store that answers long after the server's deadline
struct HungStore;

#[async_trait]
impl KeyStore for HungStore {
    async fn fetch(&self, _kid: &Uuid) -> Result<KeyRecord, KeyStoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(KeyStoreError::NotFound)
    }
}

/// A store answering with a fixed failure outcome
struct FailingStore(fn() -> KeyStoreError);

#[async_trait]
impl KeyStore for FailingStore {
    async fn fetch(&self, _kid: &Uuid) -> Result<KeyRecord, KeyStoreError> {
        Err((self.0)())
    }
}

#[rocket::async_test]
async fn slow_or_unreachable_store_maps_to_503() {
    let kid = Uuid::new_v4();

    let client = client_with(state_with_store(Arc::new(HungStore), 0)).await;
    let response = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(response.status(), Status::ServiceUnavailable);

    let client = client_with(state_with_store(
        Arc::new(FailingStore(|| KeyStoreError::Timeout)),
        0,
    ))
    .await;
    let response = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(response.status(), Status::ServiceUnavailable);

    let client = client_with(state_with_store(
        Arc::new(FailingStore(|| {
            KeyStoreError::Unavailable("backend down".to_string())
        })),
        0,
    ))
    .await;
    let response = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(response.status(), Status::ServiceUnavailable);
}

#[rocket::async_test]
async fn unexpected_store_failure_maps_to_500() {
    let kid = Uuid::new_v4();
    let client = client_with(state_with_store(
        Arc::new(FailingStore(|| {
            KeyStoreError::Other("schema drift".to_string())
        })),
        0,
    ))
    .await;

    let response = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
}

#[rocket::async_test]
async fn cache_serves_stale_keys_within_the_window() {
    let store = Arc::new(MemoryKeyStore::new());
    let kid = Uuid::new_v4();
    store.insert(kid, test_public_key());

    let client = client_with(state_with_store(store.clone(), 60)).await;

    let first = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(first.status(), Status::Ok);
    let first_body = first.into_string().await;

    // Revoked in the store, but the cached body is still within its
    // staleness window and keeps being served.
    store.revoke(&kid);
    let second = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(second.status(), Status::Ok);
    assert_eq!(second.into_string().await, first_body);
}

#[rocket::async_test]
async fn zero_max_age_always_reflects_the_store() {
    let store = Arc::new(MemoryKeyStore::new());
    let kid = Uuid::new_v4();
    store.insert(kid, test_public_key());

    let client = client_with(state_with_store(store.clone(), 0)).await;

    let first = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(first.status(), Status::Ok);

    store.revoke(&kid);
    let second = client.get(jwks_path(&kid)).dispatch().await;
    assert_eq!(second.status(), Status::NotFound);
}
