//! --- Remote Ledger Client ---
//! One async call per ledger query. Every call resolves to a decoded payload
//! or a [`QueryError`]; a "nothing found" answer for stakes, commission and
//! rewards is a successful empty payload, never an error.

pub mod payload;
pub mod pocketd;
pub mod throttle;

use crate::address::Address;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use payload::{Coin, RewardEntry};
pub use pocketd::PocketdClient;
pub use throttle::ThrottledClient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Failed to launch '{program}': {message}")]
    Spawn { program: String, message: String },
    #[error("{stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("{call} query timeout after {}s", .after.as_secs())]
    Timeout { call: &'static str, after: Duration },
    #[error("Invalid {call} response: {message}")]
    InvalidResponse { call: &'static str, message: String },
}

impl QueryError {
    pub fn invalid(call: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            call,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Bank balances of an account address, all denominations.
    async fn liquid_balance(&self, address: &Address) -> Result<Vec<Coin>, QueryError>;

    /// Application stake, `None` when the address has no application.
    async fn application_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError>;

    /// Supplier (node) stake, `None` when the address has no supplier.
    async fn supplier_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError>;

    /// Bonded tokens of a validator as an integer string, `None` when no
    /// validator exists for the operator address.
    async fn validator_tokens(&self, operator: &Address) -> Result<Option<String>, QueryError>;

    /// Outstanding commission of a validator as decimal coin strings.
    async fn validator_commission(&self, operator: &Address) -> Result<Vec<String>, QueryError>;

    /// Outstanding delegation rewards of a delegator, one entry per validator.
    async fn delegator_rewards(&self, address: &Address) -> Result<Vec<RewardEntry>, QueryError>;

    /// Converts a validator operator address into its account address.
    async fn account_address(&self, operator: &Address) -> Result<Address, QueryError>;

    /// Operator addresses of every supplier staked by `owner`.
    async fn suppliers_for_owner(&self, owner: &Address) -> Result<Vec<Address>, QueryError>;
}
