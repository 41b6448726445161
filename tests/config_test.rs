use anyhow::Result;
use japikeys::config::{Config, KeyServiceConfig, ServerConfig};
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let config = Config {
        server: ServerConfig {
            port: 8081,
            address: "192.168.1.1".to_string(),
            mount_base: "/jwks".to_string(),
        },
        keys: KeyServiceConfig {
            issuer_base: "https://keys.example.com/v1".to_string(),
            cache_max_age_secs: 120,
            store_timeout_secs: 5,
        },
    };

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;

    // Verify loaded config matches original
    assert_eq!(loaded_config.server.port, 8081);
    assert_eq!(loaded_config.server.address, "192.168.1.1");
    assert_eq!(loaded_config.server.mount_base, "/jwks");
    assert_eq!(loaded_config.keys.cache_max_age_secs, 120);
    assert_eq!(loaded_config.keys.store_timeout_secs, 5);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert_eq!(default_config.server.port, 8080);
    assert_eq!(default_config.server.address, "127.0.0.1");
    assert_eq!(default_config.keys.cache_max_age_secs, 300);

    // Test apply_args method
    let mut config = Config::default();
    assert_eq!(config.server.port, 8080);

    // Apply command-line arguments
    config.apply_args(Some(9000), Some("192.168.0.1".to_string()), Some(0));

    // Verify values were overridden
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.address, "192.168.0.1");
    assert_eq!(config.keys.cache_max_age_secs, 0);

    Ok(())
}

#[test]
fn test_config_validation() -> Result<()> {
    // Valid config
    let valid_config = Config::default();
    assert!(valid_config.validate().is_ok());

    // Invalid bind address
    let mut config = Config::default();
    config.server.address = "keys.example.com".to_string();
    assert!(config.validate().is_err());

    // Port zero
    let mut config = Config::default();
    config.server.port = 0;
    assert!(config.validate().is_err());

    // Mount base without a leading slash
    let mut config = Config::default();
    config.server.mount_base = "keys".to_string();
    assert!(config.validate().is_err());

    // Issuer base must be a URL
    let mut config = Config::default();
    config.keys.issuer_base = "not a url".to_string();
    assert!(config.validate().is_err());

    // Store timeout of zero would disable the deadline entirely
    let mut config = Config::default();
    config.keys.store_timeout_secs = 0;
    assert!(config.validate().is_err());

    Ok(())
}

#[test]
fn test_partial_file_falls_back_to_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("partial.yaml");

    std::fs::write(&config_path, "server:\n  port: 9999\n")?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.server.port, 9999);
    assert_eq!(config.server.address, "127.0.0.1");
    assert_eq!(config.server.mount_base, "/keys");
    assert_eq!(config.keys.store_timeout_secs, 2);

    Ok(())
}
