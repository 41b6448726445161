// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Daemon entry point serving the per-kid JWKS endpoint

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rocket::config::LogLevel;

use japikeys::config::Config;
use japikeys::jwks_server::{build_rocket, JwksCache, JwksServerState};
use japikeys::key::store::MemoryKeyStore;

/// JWKS distribution server for JAPIKeys credentials
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Server port (overrides the config file)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Server address (overrides the config file)
    #[arg(short, long)]
    address: Option<String>,

    /// JWKS cache max age in seconds, 0 disables caching (overrides the config file)
    #[arg(long)]
    cache_max_age: Option<i64>,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.port, args.address, args.cache_max_age);
    config.validate()?;

    println!(
        "JWKS server on {}:{}{}",
        config.server.address, config.server.port, config.server.mount_base
    );

    let figment = rocket::Config::figment()
        .merge((
            "ident",
            format!("JapikeysServer/{}", env!("CARGO_PKG_VERSION")),
        ))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("log_level", LogLevel::Normal));

    // The built-in store starts empty; key registration happens through
    // whatever store implementation a deployment wires in instead.
    let state = JwksServerState {
        store: Arc::new(MemoryKeyStore::new()),
        cache: JwksCache::new(config.keys.cache_max_age_secs),
        store_timeout: Duration::from_secs(config.keys.store_timeout_secs),
    };

    let rocket = build_rocket(figment, &config.server.mount_base, state);
    let _ = rocket.ignite().await?.launch().await?;

    Ok(())
}
