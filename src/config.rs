use config::{Config as ConfigLoader, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::ledger::DEFAULT_LEDGER_CAPACITY;
use crate::logging::LoggingConfig;

/// Environment prefix for configuration overrides (`CIPHERSWAP__WORKFLOW__LEDGER_CAPACITY=5`)
pub const ENV_PREFIX: &str = "CIPHERSWAP";

/// Network and contract settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Network name (e.g., sepolia)
    pub network_name: String,
    /// EVM chain ID
    pub chain_id: u64,
    /// Address of the confidential pool contract
    pub contract_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_name: "local-devnet".to_string(),
            chain_id: 31337,
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
        }
    }
}

/// Timings and limits of the transaction workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// Auto-dismiss delay for success notifications
    pub success_dismiss_ms: u64,
    /// Auto-dismiss delay for error notifications
    pub error_dismiss_ms: u64,
    /// Auto-dismiss delay for pending notifications (never hidden when unset)
    pub pending_dismiss_ms: Option<u64>,
    /// Maximum number of concurrent per-pool reads during a refresh
    pub refresh_concurrency: usize,
    /// Number of recent trades kept by the ledger, at most 10
    pub ledger_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            success_dismiss_ms: 2000,
            error_dismiss_ms: 3000,
            pending_dismiss_ms: None,
            refresh_concurrency: 8,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
        }
    }
}

impl WorkflowConfig {
    pub fn success_dismiss(&self) -> Duration {
        Duration::from_millis(self.success_dismiss_ms)
    }

    pub fn error_dismiss(&self) -> Duration {
        Duration::from_millis(self.error_dismiss_ms)
    }

    pub fn pending_dismiss(&self) -> Option<Duration> {
        self.pending_dismiss_ms.map(Duration::from_millis)
    }

    /// Validate limits
    pub fn validate(&self) -> Result<(), Error> {
        if self.refresh_concurrency == 0 {
            return Err(Error::Config(
                "refresh_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.ledger_capacity == 0 || self.ledger_capacity > DEFAULT_LEDGER_CAPACITY {
            return Err(Error::Config(format!(
                "ledger_capacity must be between 1 and {}",
                DEFAULT_LEDGER_CAPACITY
            )));
        }
        Ok(())
    }
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,
    /// Workflow timings and limits
    pub workflow: WorkflowConfig,
    /// Tradable token symbols, in display order
    pub tokens: Vec<String>,
    /// Pool pairs offered by the pool-creation form
    pub pairs: Vec<String>,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            workflow: WorkflowConfig::default(),
            tokens: vec!["ETH".to_string(), "ZAMA".to_string(), "USDC".to_string()],
            pairs: vec![
                "ETH/ZAMA".to_string(),
                "ZAMA/USDC".to_string(),
                "ETH/USDC".to_string(),
            ],
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file, layered over the defaults and
    /// overridden by `CIPHERSWAP__*` environment variables
    pub fn load(path: &Path) -> Result<Self, Error> {
        let defaults = toml::to_string(&Config::default())?;

        let settings = ConfigLoader::builder()
            .add_source(File::from_str(&defaults, FileFormat::Toml))
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration at `path`, writing the defaults there first if
    /// the file does not exist
    pub fn load_or_create(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            Config::default().save(path)?;
        }
        Self::load(path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("cipherswap");
        path.push("config.toml");
        path
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), Error> {
        self.workflow.validate()?;
        if self.tokens.is_empty() {
            return Err(Error::Config("at least one token is required".to_string()));
        }
        if let Some(pair) = self.pairs.iter().find(|p| p.split('/').count() != 2) {
            return Err(Error::Config(format!(
                "pair '{}' must be of the form BASE/QUOTE",
                pair
            )));
        }
        Ok(())
    }
}
