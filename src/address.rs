// src/address.rs

//! --- Treasury Addresses & Categories ---
//! Addresses are opaque bech32 strings compared by exact match. Every address
//! belongs to exactly one of the five treasury categories for a given run.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of the bech32 data part (32 payload chars + 6 checksum chars) for a
/// 20-byte account or operator key.
const BECH32_DATA_LEN: usize = 38;
const BECH32_CHARSET: &str = "[02-9ac-hj-np-z]";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The five disjoint address groupings of a treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "liquid")]
    Liquid,
    #[serde(rename = "app_stakes")]
    AppStake,
    #[serde(rename = "node_stakes")]
    NodeStake,
    #[serde(rename = "validator_stakes")]
    ValidatorStake,
    #[serde(rename = "delegator_stakes")]
    DelegatorStake,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Liquid,
        Category::AppStake,
        Category::NodeStake,
        Category::ValidatorStake,
        Category::DelegatorStake,
    ];

    /// Key of this category's array in a treasury JSON file.
    pub fn json_key(self) -> &'static str {
        match self {
            Category::Liquid => "liquid",
            Category::AppStake => "app_stakes",
            Category::NodeStake => "node_stakes",
            Category::ValidatorStake => "validator_stakes",
            Category::DelegatorStake => "delegator_stakes",
        }
    }

    pub fn from_json_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.json_key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Liquid => "Liquid",
            Category::AppStake => "App stake",
            Category::NodeStake => "Node stake",
            Category::ValidatorStake => "Validator stake",
            Category::DelegatorStake => "Delegator stake",
        }
    }

    /// Validator stakes are keyed by operator address, everything else by
    /// account address.
    pub fn address_kind(self) -> AddressKind {
        match self {
            Category::ValidatorStake => AddressKind::Operator,
            _ => AddressKind::Account,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Account,
    Operator,
}

#[derive(Error, Debug)]
pub enum AddressRuleError {
    #[error("Invalid address prefix '{0}'")]
    InvalidPrefix(String),
    #[error("Failed to build address pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Format rules for the ledger's account and operator address encodings.
#[derive(Debug, Clone)]
pub struct AddressRules {
    account: Regex,
    operator: Regex,
    account_prefix: String,
    operator_prefix: String,
}

impl AddressRules {
    pub fn new(account_prefix: &str, operator_prefix: &str) -> Result<Self, AddressRuleError> {
        Ok(Self {
            account: Self::pattern(account_prefix)?,
            operator: Self::pattern(operator_prefix)?,
            account_prefix: account_prefix.to_string(),
            operator_prefix: operator_prefix.to_string(),
        })
    }

    fn pattern(prefix: &str) -> Result<Regex, AddressRuleError> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(AddressRuleError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Regex::new(&format!(
            "^{prefix}1{BECH32_CHARSET}{{{BECH32_DATA_LEN}}}$"
        ))?)
    }

    pub fn is_valid(&self, address: &Address, kind: AddressKind) -> bool {
        match kind {
            AddressKind::Account => self.account.is_match(address.as_str()),
            AddressKind::Operator => self.operator.is_match(address.as_str()),
        }
    }

    /// Human readable description of the expected format, used in error listings.
    pub fn describe(&self, kind: AddressKind) -> String {
        let prefix = match kind {
            AddressKind::Account => &self.account_prefix,
            AddressKind::Operator => &self.operator_prefix,
        };
        format!(
            "{prefix}1... ({} characters)",
            prefix.len() + 1 + BECH32_DATA_LEN
        )
    }
}

impl Default for AddressRules {
    fn default() -> Self {
        Self::new("pokt", "poktvaloper").expect("static address prefixes are valid")
    }
}
