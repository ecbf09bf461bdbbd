//! Runtime configuration for the `kiosk` binary.
//!
//! Read from a JSON file. Every key is optional; a missing file means all
//! defaults.
//!
//! ```json
//! {
//!   "database_path": "/var/lib/kiosk/kiosk.db",
//!   "port_path": "/dev/ttyUSB0",
//!   "denominations": [1, 5, 10, 20],
//!   "log_level": "info"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use kiosk_core::DenominationSet;
use kiosk_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_DENOMINATIONS, DEFAULT_FLUSH_INTERVAL_MS,
    DEFAULT_FRAGMENT_TIMEOUT_MS, DEFAULT_MAX_OPEN_ATTEMPTS, DEFAULT_RETRY_INTERVAL_MS,
};
use kiosk_hardware::ConnectionConfig;
use kiosk_intake::IntakeConfig;
use kiosk_protocol::DecoderConfig;
use kiosk_storage::DatabaseConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV: &str = "KIOSK_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    pub database_path: String,

    /// Fixed acceptor device; `None` picks the first enumerated port.
    pub port_path: Option<String>,

    pub baud_rate: u32,
    pub retry_interval_ms: u64,
    pub max_open_attempts: u32,
    pub reconnect_on_loss: bool,
    pub fragment_timeout_ms: u64,
    pub denominations: Vec<u32>,
    pub flush_interval_ms: u64,

    /// Default `tracing` filter, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            database_path: "kiosk.db".to_string(),
            port_path: None,
            baud_rate: DEFAULT_BAUD_RATE,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_open_attempts: DEFAULT_MAX_OPEN_ATTEMPTS,
            reconnect_on_loss: true,
            fragment_timeout_ms: DEFAULT_FRAGMENT_TIMEOUT_MS,
            denominations: DEFAULT_DENOMINATIONS.to_vec(),
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            log_level: "info".to_string(),
        }
    }
}

impl KioskConfig {
    /// Load and validate the config file, falling back to defaults when
    /// `path` is `None` or does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            _ => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.database_path.is_empty(), "database_path must not be empty");
        ensure!(self.baud_rate > 0, "baud_rate must be positive");
        ensure!(
            self.fragment_timeout_ms > 0,
            "fragment_timeout_ms must be positive"
        );
        self.denomination_set()?;
        Ok(())
    }

    pub fn denomination_set(&self) -> Result<DenominationSet> {
        DenominationSet::new(self.denominations.iter().copied())
            .context("invalid denominations")
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_path.clone())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        let config = ConnectionConfig::default()
            .baud_rate(self.baud_rate)
            .retry_interval(Duration::from_millis(self.retry_interval_ms))
            .max_open_attempts(self.max_open_attempts)
            .reconnect_on_loss(self.reconnect_on_loss);

        match &self.port_path {
            Some(path) => config.port_path(path.clone()),
            None => config,
        }
    }

    pub fn intake_config(&self) -> Result<IntakeConfig> {
        let decoder = DecoderConfig::default()
            .denominations(self.denomination_set()?)
            .fragment_timeout(Duration::from_millis(self.fragment_timeout_ms));

        Ok(IntakeConfig::default()
            .decoder(decoder)
            .flush_interval(Duration::from_millis(self.flush_interval_ms)))
    }
}

/// Config file location: first argument, else `KIOSK_CONFIG`.
pub fn config_path(
    mut args: impl Iterator<Item = String>,
    env: Option<String>,
) -> Option<PathBuf> {
    args.next()
        .or(env)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}
