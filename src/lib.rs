//! JAPIKeys library
//!
//! This library issues and verifies self-describing API credentials: RS256
//! signed JWTs whose public verification keys are published per key
//! identifier as JWKS documents served over HTTP.

pub mod config;
pub mod jwks_server;
pub mod key;
pub mod token;
