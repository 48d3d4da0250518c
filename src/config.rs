// src/config.rs

//! --- Treasury Configuration ---
//! Ledger endpoint, pool sizing, address rules and logging for a treasury run.
//! Loaded from a TOML file; every value is validated before a run starts.

use crate::address::{AddressRules, AddressRuleError};
use crate::denom::DEFAULT_DENOM;
use crate::pool::DEFAULT_MAX_WORKERS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

// --- Constants for Validation ---
const MIN_WORKERS: usize = 1;
const MAX_WORKERS: usize = 256;
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 600;

pub const DEFAULT_CONFIG_PATH: &str = "treasury.toml";
pub const DEFAULT_NODE_URL: &str = "https://shannon-grove-rpc.mainnet.poktroll.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to save configuration to '{path}': {source}")]
    Save {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<AddressRuleError> for ConfigError {
    fn from(e: AddressRuleError) -> Self {
        ConfigError::Validation(e.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TreasuryConfig {
    pub ledger: LedgerConfig,
    pub pool: PoolConfig,
    pub addresses: AddressConfig,
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// `pocketd` executable, resolved through `PATH` when not absolute.
    pub binary: String,
    pub node_url: String,
    pub denom: String,
    pub query_timeout_secs: u64,
    pub supplier_query_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            binary: "pocketd".to_string(),
            node_url: DEFAULT_NODE_URL.to_string(),
            denom: DEFAULT_DENOM.to_string(),
            query_timeout_secs: 10,
            supplier_query_timeout_secs: 120,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    pub max_workers: usize,
    /// Process-wide query rate limit. Unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queries_per_second: Option<u32>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            max_queries_per_second: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AddressConfig {
    pub account_prefix: String,
    pub operator_prefix: String,
    pub enforce_format: bool,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            account_prefix: "pokt".to_string(),
            operator_prefix: "poktvaloper".to_string(),
            enforce_format: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TreasuryConfig {
    /// Loads and validates `path`. A missing file yields the defaults.
    #[instrument]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            debug!("No configuration at '{path}', using defaults");
            return Ok(TreasuryConfig::default());
        }

        let content = fs::read_to_string(path)
            .context("Failed to read configuration file.")
            .map_err(|source| ConfigError::Load {
                path: path.to_string(),
                source,
            })?;
        let config: TreasuryConfig = toml::from_str(&content)
            .context("Failed to parse TOML from configuration file.")
            .map_err(|source| ConfigError::Load {
                path: path.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    #[instrument(skip(self))]
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize configuration to TOML.")
            .map_err(|source| ConfigError::Save {
                path: path.to_string(),
                source,
            })?;
        fs::write(path, toml_string)
            .context("Failed to write configuration to file.")
            .map_err(|source| ConfigError::Save {
                path: path.to_string(),
                source,
            })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ledger = &self.ledger;
        if ledger.binary.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ledger.binary must not be empty".to_string(),
            ));
        }

        if !ledger.node_url.starts_with("http://") && !ledger.node_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "Invalid node URL: '{}' (expected http:// or https://)",
                ledger.node_url
            )));
        }

        if ledger.denom.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ledger.denom must not be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("query_timeout_secs", ledger.query_timeout_secs),
            (
                "supplier_query_timeout_secs",
                ledger.supplier_query_timeout_secs,
            ),
        ] {
            if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}"
                )));
            }
        }

        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.pool.max_workers) {
            return Err(ConfigError::Validation(format!(
                "max_workers must be between {MIN_WORKERS} and {MAX_WORKERS}"
            )));
        }

        if self.pool.max_queries_per_second == Some(0) {
            return Err(ConfigError::Validation(
                "max_queries_per_second must be at least 1".to_string(),
            ));
        }

        self.address_rules()?;
        Ok(())
    }

    /// Address format rules built from the configured prefixes.
    pub fn address_rules(&self) -> Result<AddressRules, ConfigError> {
        Ok(AddressRules::new(
            &self.addresses.account_prefix,
            &self.addresses.operator_prefix,
        )?)
    }
}
