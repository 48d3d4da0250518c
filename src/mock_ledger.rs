//! Mock ledger for testing the fetchers, pools and orchestrator
//! This module provides a scriptable in-memory `LedgerClient`

use crate::address::Address;
use crate::ledger::{Coin, LedgerClient, QueryError, RewardEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Scripted replies of one address. Unscripted addresses fail every call.
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub liquid: Result<Vec<Coin>, QueryError>,
    pub application_stake: Result<Option<Coin>, QueryError>,
    pub supplier_stake: Result<Option<Coin>, QueryError>,
    pub validator_tokens: Result<Option<String>, QueryError>,
    pub validator_commission: Result<Vec<String>, QueryError>,
    pub delegator_rewards: Result<Vec<RewardEntry>, QueryError>,
    pub account_address: Result<Address, QueryError>,
    pub latency: Option<Duration>,
    pub panic_on_query: bool,
}

impl Default for MockAccount {
    fn default() -> Self {
        Self {
            liquid: Ok(Vec::new()),
            application_stake: Ok(None),
            supplier_stake: Ok(None),
            validator_tokens: Ok(None),
            validator_commission: Ok(Vec::new()),
            delegator_rewards: Ok(Vec::new()),
            account_address: Err(command_failed("address is not an operator address")),
            latency: None,
            panic_on_query: false,
        }
    }
}

pub fn upokt(amount: u128) -> Coin {
    Coin::new("upokt", amount.to_string())
}

pub fn command_failed(stderr: &str) -> QueryError {
    QueryError::CommandFailed {
        code: Some(1),
        stderr: stderr.to_string(),
    }
}

impl MockAccount {
    /// Account holding `amount` micro-units of the native denomination.
    pub fn liquid(amount: u128) -> Self {
        Self {
            liquid: Ok(vec![upokt(amount)]),
            ..Self::default()
        }
    }

    pub fn failing_liquid(mut self, error: QueryError) -> Self {
        self.liquid = Err(error);
        self
    }

    pub fn with_application_stake(mut self, amount: u128) -> Self {
        self.application_stake = Ok(Some(upokt(amount)));
        self
    }

    pub fn with_supplier_stake(mut self, amount: u128) -> Self {
        self.supplier_stake = Ok(Some(upokt(amount)));
        self
    }

    /// Operator address converting to `account` with `tokens` bonded.
    pub fn validator(account: &Address, tokens: u128) -> Self {
        Self {
            account_address: Ok(account.clone()),
            validator_tokens: Ok(Some(tokens.to_string())),
            ..Self::default()
        }
    }

    pub fn with_commission(mut self, entries: &[&str]) -> Self {
        self.validator_commission = Ok(entries.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn with_rewards(mut self, entries: &[&str]) -> Self {
        self.delegator_rewards = Ok(vec![RewardEntry {
            validator_address: None,
            reward: entries.iter().map(|e| e.to_string()).collect(),
        }]);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every call on this address panics.
    pub fn panicking() -> Self {
        Self {
            panic_on_query: true,
            ..Self::default()
        }
    }

    /// Every call on this address fails with `error`.
    pub fn unreachable(error: QueryError) -> Self {
        Self {
            liquid: Err(error.clone()),
            application_stake: Err(error.clone()),
            supplier_stake: Err(error.clone()),
            validator_tokens: Err(error.clone()),
            validator_commission: Err(error.clone()),
            delegator_rewards: Err(error.clone()),
            account_address: Err(error),
            latency: None,
            panic_on_query: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct MockLedger {
    accounts: Mutex<HashMap<Address, MockAccount>>,
    calls: Mutex<HashMap<Address, usize>>,
    total_calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `latency` to every call of accounts without their own latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&self, address: &Address, account: MockAccount) {
        lock(&self.accounts).insert(address.clone(), account);
    }

    pub fn call_count(&self, address: &Address) -> usize {
        lock(&self.calls).get(address).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call<T>(
        &self,
        address: &Address,
        reply: impl FnOnce(&MockAccount) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        *lock(&self.calls).entry(address.clone()).or_insert(0) += 1;
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(self.in_flight.clone());

        let account = lock(&self.accounts).get(address).cloned();
        let Some(account) = account else {
            tokio::time::sleep(self.latency).await;
            return Err(command_failed(&format!("unknown address {address}")));
        };

        tokio::time::sleep(account.latency.unwrap_or(self.latency)).await;
        if account.panic_on_query {
            panic!("mock ledger scripted panic for {address}");
        }
        reply(&account)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn liquid_balance(&self, address: &Address) -> Result<Vec<Coin>, QueryError> {
        self.call(address, |a| a.liquid.clone()).await
    }

    async fn application_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError> {
        self.call(address, |a| a.application_stake.clone()).await
    }

    async fn supplier_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError> {
        self.call(address, |a| a.supplier_stake.clone()).await
    }

    async fn validator_tokens(&self, operator: &Address) -> Result<Option<String>, QueryError> {
        self.call(operator, |a| a.validator_tokens.clone()).await
    }

    async fn validator_commission(&self, operator: &Address) -> Result<Vec<String>, QueryError> {
        self.call(operator, |a| a.validator_commission.clone()).await
    }

    async fn delegator_rewards(&self, address: &Address) -> Result<Vec<RewardEntry>, QueryError> {
        self.call(address, |a| a.delegator_rewards.clone()).await
    }

    async fn account_address(&self, operator: &Address) -> Result<Address, QueryError> {
        self.call(operator, |a| a.account_address.clone()).await
    }

    async fn suppliers_for_owner(&self, owner: &Address) -> Result<Vec<Address>, QueryError> {
        let known: Vec<Address> = {
            let accounts = lock(&self.accounts);
            let mut operators: Vec<Address> = accounts
                .iter()
                .filter(|(_, account)| matches!(account.supplier_stake, Ok(Some(_))))
                .map(|(address, _)| address.clone())
                .collect();
            operators.sort();
            operators
        };
        self.call(owner, |_| Ok(known)).await
    }
}
