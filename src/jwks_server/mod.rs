// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Key Cache / JWKS Server
//!
//! This module exposes, over HTTP, a per-kid JWKS document backed by an
//! external key store, with bounded-staleness caching and revocation-aware
//! error mapping. It is the distribution half of the system's trust
//! boundary: untrusted callers on one side, a caller-supplied key store on
//! the other.
//!
//! Response mapping:
//!
//! - success, key not revoked → `200` with the JWKS body
//! - key absent or revoked → `404` (identical in body and semantics; the
//!   true reason is recorded only in the server log)
//! - store timeout or unavailable → `503`
//! - anything else → `500`, logged with detail, opaque to the caller
//!
//! `404` and `503` are expected steady-state outcomes; only `500`-class
//! failures are logged as errors.

/// Bounded-staleness JWKS body cache
pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use rocket::figment::Figment;
use rocket::http::{ContentType, Status};
use rocket::{get, routes, Build, Rocket, State};
use uuid::Uuid;

use crate::key::jwk::JwkSet;
use crate::key::store::{KeyStore, KeyStoreError};

pub use cache::JwksCache;

/// Shared state of the JWKS server
pub struct JwksServerState {
    /// The external key store capability.
    pub store: Arc<dyn KeyStore>,

    /// Cache of serialized JWKS bodies, keyed by kid.
    pub cache: JwksCache,

    /// Deadline applied to every store call.
    pub store_timeout: Duration,
}

/// Per-kid JWKS endpoint
///
/// # URL
///
/// `GET /<kid>/.well-known/jwks.json` (relative to the configured mount
/// base)
///
/// The kid path segment must parse as a UUID; malformed identifiers are
/// rejected with `400` before the store is touched.
#[get("/<kid>/.well-known/jwks.json")]
pub async fn jwks_by_kid(
    kid: &str,
    state: &State<JwksServerState>,
) -> Result<(ContentType, String), Status> {
    let kid: Uuid = match kid.parse() {
        Ok(kid) => kid,
        Err(_) => {
            debug!("rejected malformed kid path segment {:?}", kid);
            return Err(Status::BadRequest);
        }
    };

    if let Some(body) = state.cache.get(&kid) {
        debug!("serving kid {} from cache", kid);
        return Ok((ContentType::JSON, body.as_ref().clone()));
    }

    let record = match tokio::time::timeout(state.store_timeout, state.store.fetch(&kid)).await {
        Err(_) => {
            warn!("key store lookup for kid {} hit the {:?} deadline", kid, state.store_timeout);
            return Err(Status::ServiceUnavailable);
        }
        Ok(Err(KeyStoreError::Timeout)) => {
            warn!("key store reported a timeout resolving kid {}", kid);
            return Err(Status::ServiceUnavailable);
        }
        Ok(Err(KeyStoreError::Unavailable(message))) => {
            warn!("key store unavailable resolving kid {}: {}", kid, message);
            return Err(Status::ServiceUnavailable);
        }
        Ok(Err(KeyStoreError::NotFound)) => {
            debug!("kid {} not found", kid);
            return Err(Status::NotFound);
        }
        Ok(Err(KeyStoreError::Other(message))) => {
            error!("unexpected key store failure resolving kid {}: {}", kid, message);
            return Err(Status::InternalServerError);
        }
        Ok(Ok(record)) => record,
    };

    if record.revoked {
        // Same observable outcome as an absent key; the true reason lives
        // only in this log line.
        warn!("audit: JWKS request for revoked kid {} answered as not found", kid);
        return Err(Status::NotFound);
    }

    let set = JwkSet::for_key(&record.public_key, &kid);
    let body = match serde_json::to_string(&set) {
        Ok(body) => body,
        Err(err) => {
            error!("failed to serialize JWKS for kid {}: {}", kid, err);
            return Err(Status::InternalServerError);
        }
    };

    let body = state.cache.put(kid, body);
    Ok((ContentType::JSON, body.as_ref().clone()))
}

/// Assemble the Rocket instance serving the JWKS endpoint
///
/// Mounts the per-kid route under `mount_base` and installs the shared
/// server state.
pub fn build_rocket(figment: Figment, mount_base: &str, state: JwksServerState) -> Rocket<Build> {
    rocket::custom(figment)
        .mount(mount_base, routes![jwks_by_kid])
        .manage(state)
}
