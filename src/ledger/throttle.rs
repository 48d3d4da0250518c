//! Opt-in query rate limit shared by every pool of a run.
//!
//! Without it the number of in-flight queries against the endpoint is only
//! bounded by `categories × max_workers`.

use super::{Coin, LedgerClient, QueryError, RewardEntry};
use crate::address::Address;
use async_trait::async_trait;
use governor::clock::QuantaClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Wraps a [`LedgerClient`] and waits for a rate-limit cell before each call.
/// Calls are spaced evenly; there is no burst allowance.
pub struct ThrottledClient {
    inner: Arc<dyn LedgerClient>,
    limiter: DirectRateLimiter,
}

impl ThrottledClient {
    pub fn new(inner: Arc<dyn LedgerClient>, queries_per_second: NonZeroU32) -> Self {
        Self {
            inner,
            limiter: RateLimiter::direct(
                Quota::per_second(queries_per_second).allow_burst(NonZeroU32::MIN),
            ),
        }
    }
}

#[async_trait]
impl LedgerClient for ThrottledClient {
    async fn liquid_balance(&self, address: &Address) -> Result<Vec<Coin>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.liquid_balance(address).await
    }

    async fn application_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.application_stake(address).await
    }

    async fn supplier_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.supplier_stake(address).await
    }

    async fn validator_tokens(&self, operator: &Address) -> Result<Option<String>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.validator_tokens(operator).await
    }

    async fn validator_commission(&self, operator: &Address) -> Result<Vec<String>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.validator_commission(operator).await
    }

    async fn delegator_rewards(&self, address: &Address) -> Result<Vec<RewardEntry>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.delegator_rewards(address).await
    }

    async fn account_address(&self, operator: &Address) -> Result<Address, QueryError> {
        self.limiter.until_ready().await;
        self.inner.account_address(operator).await
    }

    async fn suppliers_for_owner(&self, owner: &Address) -> Result<Vec<Address>, QueryError> {
        self.limiter.until_ready().await;
        self.inner.suppliers_for_owner(owner).await
    }
}
