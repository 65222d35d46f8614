use cipherswap_sdk::logging::{LogFormat, LogLevel};
use cipherswap_sdk::Config;
use tempfile::tempdir;

#[test]
fn test_config_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.network.chain_id = 11155111;
    config.network.network_name = "sepolia".to_string();
    config.workflow.success_dismiss_ms = 1500;
    config.workflow.pending_dismiss_ms = Some(30_000);
    config.logging.level = LogLevel::Debug;
    config.logging.format = LogFormat::Json;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_or_create_writes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    assert!(!path.exists());

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(config.pairs, vec!["ETH/ZAMA", "ZAMA/USDC", "ETH/USDC"]);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[workflow]\nledger_capacity = 5\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.workflow.ledger_capacity, 5);
    assert_eq!(config.workflow.error_dismiss_ms, 3000);
    assert_eq!(config.network, Config::default().network);
}

#[test]
fn test_invalid_pair_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "pairs = [\"ETHZAMA\"]\n").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn test_ledger_capacity_above_ten_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[workflow]\nledger_capacity = 25\n").unwrap();

    assert!(Config::load(&path).is_err());
}
