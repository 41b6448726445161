// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the JWKS service
//!
//! This module provides functionality for loading, validating, and
//! applying configuration settings for the JWKS service daemon. The
//! configuration is backed by a YAML file; every section falls back to
//! defaults when not specified, so a minimal (or absent) file is enough
//! to start a local instance.
//!
//! ## Configuration Structure
//!
//! - `server`: network binding and mount base of the JWKS endpoint
//! - `keys`: issuer base, cache staleness bound and store deadline
//!
//! ## Usage
//!
//! ```no_run
//! use japikeys::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some(8081), Some("0.0.0.0".to_string()), None);
//!
//! config.validate().unwrap();
//! println!("Server port: {}", config.server.port);
//! ```

pub mod utils;

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

pub use utils::is_valid_ip_address;

/// Root configuration structure for the JWKS service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the HTTP server component.
    #[serde(default)]
    pub server: ServerConfig,

    /// Settings for key distribution: issuer base, caching, store deadline.
    #[serde(default)]
    pub keys: KeyServiceConfig,
}

/// Network settings of the JWKS server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP port the server binds.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the server binds.
    #[serde(default = "default_address")]
    pub address: String,

    /// Path prefix the JWKS route is mounted under.
    #[serde(default = "default_mount_base")]
    pub mount_base: String,
}

/// Key distribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyServiceConfig {
    /// Issuer base URL stamped into issued credentials and expected by
    /// verifiers. The kid is appended to this as the final path segment.
    #[serde(default = "default_issuer_base")]
    pub issuer_base: String,

    /// Maximum age of cached JWKS bodies, in seconds. Zero disables
    /// caching; negative values are clamped to zero at cache creation.
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: i64,

    /// Deadline for each key store call, in seconds.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_mount_base() -> String {
    "/keys".to_string()
}

fn default_issuer_base() -> String {
    "http://127.0.0.1:8080/keys".to_string()
}

fn default_cache_max_age() -> i64 {
    300
}

fn default_store_timeout() -> u64 {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            address: default_address(),
            mount_base: default_mount_base(),
        }
    }
}

impl Default for KeyServiceConfig {
    fn default() -> Self {
        KeyServiceConfig {
            issuer_base: default_issuer_base(),
            cache_max_age_secs: default_cache_max_age(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            keys: KeyServiceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// When the file does not exist, a default configuration is written
    /// to the given path and returned, so a first run leaves a template
    /// behind for the operator to edit.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {:?} not found, creating default", path);
            let config = Config::default();
            config.save_to_file(path)?;
            return Ok(config);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file at {:?}", path))?;
        let config: Config = serde_yml::from_reader(file)
            .with_context(|| format!("Failed to parse config file at {:?}", path))?;
        Ok(config)
    }

    /// Save the configuration to a YAML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yml::to_string(self).context("Failed to serialize configuration")?;
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create config file at {:?}", path))?;
        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write config file at {:?}", path))?;
        Ok(())
    }

    /// Apply command-line overrides on top of the loaded file
    pub fn apply_args(
        &mut self,
        port: Option<u16>,
        address: Option<String>,
        cache_max_age_secs: Option<i64>,
    ) {
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(address) = address {
            self.server.address = address;
        }
        if let Some(max_age) = cache_max_age_secs {
            self.keys.cache_max_age_secs = max_age;
        }
    }

    /// Validate rules that the type system and serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if !is_valid_ip_address(&self.server.address) {
            return Err(anyhow!("Invalid server address: {}", self.server.address));
        }
        if self.server.port == 0 {
            return Err(anyhow!("Server port must not be 0"));
        }
        if !self.server.mount_base.starts_with('/') {
            return Err(anyhow!(
                "Mount base must start with '/': {}",
                self.server.mount_base
            ));
        }
        Url::parse(&self.keys.issuer_base)
            .map_err(|err| anyhow!("Invalid issuer base URL {}: {}", self.keys.issuer_base, err))?;
        if self.keys.store_timeout_secs == 0 {
            return Err(anyhow!("Store timeout must be at least one second"));
        }
        Ok(())
    }
}
