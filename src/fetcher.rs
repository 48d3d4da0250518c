// src/fetcher.rs

//! --- Category Fetchers ---
//! Composes one or more ledger calls into the single outcome of an address.
//! Each call is independently fallible; a partial failure only zeroes the
//! component it would have produced.

use crate::address::{Address, Category};
use crate::denom;
use crate::ledger::{Coin, LedgerClient, QueryError};
use crate::report::{AddressOutcome, Component, Holdings};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Stake lookups that share the liquid + stake composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StakeKind {
    Application,
    Supplier,
}

impl StakeKind {
    fn category(self) -> Category {
        match self {
            StakeKind::Application => Category::AppStake,
            StakeKind::Supplier => Category::NodeStake,
        }
    }

    fn missing_note(self) -> &'static str {
        match self {
            StakeKind::Application => "No app stake found",
            StakeKind::Supplier => "No node stake found",
        }
    }

    fn label(self) -> &'static str {
        match self {
            StakeKind::Application => "App stake",
            StakeKind::Supplier => "Node stake",
        }
    }
}

const NO_VALIDATOR_STAKE: &str = "No validator stake found";

#[derive(Clone)]
pub struct CategoryFetcher {
    client: Arc<dyn LedgerClient>,
    denom: String,
}

impl CategoryFetcher {
    pub fn new(client: Arc<dyn LedgerClient>, denom: impl Into<String>) -> Self {
        Self {
            client,
            denom: denom.into(),
        }
    }

    /// Produces the terminal outcome of `address` within `category`.
    pub async fn fetch(&self, category: Category, address: &Address) -> AddressOutcome {
        match category {
            Category::Liquid => self.fetch_liquid(address).await,
            Category::AppStake => self.fetch_staked(StakeKind::Application, address).await,
            Category::NodeStake => self.fetch_staked(StakeKind::Supplier, address).await,
            Category::ValidatorStake => self.fetch_validator(address).await,
            Category::DelegatorStake => self.fetch_delegator(address).await,
        }
    }

    /// Native-denomination balance of `address` in display units; 0 when the
    /// denomination is absent.
    async fn liquid_amount(&self, address: &Address) -> Result<f64, QueryError> {
        let balances = self.client.liquid_balance(address).await?;
        match balances.iter().find(|coin| coin.denom == self.denom) {
            Some(coin) => self.coin_amount(coin, "bank balance"),
            None => Ok(0.0),
        }
    }

    fn coin_amount(&self, coin: &Coin, call: &'static str) -> Result<f64, QueryError> {
        denom::parse_micro_amount(&coin.amount)
            .map(denom::micro_to_display)
            .ok_or_else(|| {
                QueryError::invalid(call, format!("invalid amount '{}'", coin.amount))
            })
    }

    #[instrument(skip(self), fields(category = "liquid"))]
    async fn fetch_liquid(&self, address: &Address) -> AddressOutcome {
        match self.liquid_amount(address).await {
            Ok(amount) => AddressOutcome::Success(
                Holdings::for_category(Category::Liquid).with(Component::Liquid, amount),
            ),
            Err(e) => AddressOutcome::failure(e.to_string()),
        }
    }

    #[instrument(skip(self, kind), fields(category = %kind.category()))]
    async fn fetch_staked(&self, kind: StakeKind, address: &Address) -> AddressOutcome {
        let liquid = self.liquid_amount(address).await;
        let stake = match kind {
            StakeKind::Application => self.client.application_stake(address).await,
            StakeKind::Supplier => self.client.supplier_stake(address).await,
        };

        // Missing or zero stakes are not an error, but they cannot rescue a
        // failed liquid query either.
        let staked = match &stake {
            Ok(Some(coin)) => self.coin_amount(coin, "stake").map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e.clone()),
        };
        let staked_amount = match &staked {
            Ok(Some(amount)) if *amount > 0.0 => Some(*amount),
            _ => None,
        };

        let liquid_amount = match &liquid {
            Ok(amount) => Some(*amount),
            Err(_) => None,
        };
        if liquid_amount.is_none() && staked_amount.is_none() {
            let reason = match liquid {
                Err(e) => e.to_string(),
                Ok(_) => kind.missing_note().to_string(),
            };
            return AddressOutcome::failure(reason);
        }

        let mut holdings = Holdings::for_category(kind.category())
            .with(Component::Liquid, liquid_amount.unwrap_or(0.0))
            .with(Component::Staked, staked_amount.unwrap_or(0.0));
        match staked {
            Err(e) => holdings = holdings.note(format!("{} query failed: {e}", kind.label())),
            Ok(_) if staked_amount.is_none() => holdings = holdings.note(kind.missing_note()),
            Ok(_) => {}
        }
        if let Err(e) = liquid {
            holdings = holdings.note(format!("Liquid query failed: {e}"));
        }
        AddressOutcome::Success(holdings)
    }

    #[instrument(skip(self), fields(category = "validator_stakes"))]
    async fn fetch_validator(&self, operator: &Address) -> AddressOutcome {
        let account = match self.client.account_address(operator).await {
            Ok(account) => account,
            Err(e) => return AddressOutcome::failure(format!("Address conversion failed: {e}")),
        };
        debug!("Operator {operator} resolves to account {account}");

        let liquid = self.liquid_amount(&account).await;
        let commission = self
            .client
            .validator_commission(operator)
            .await
            .map(|entries| denom::sum_decimal_coins(entries.iter().map(String::as_str), &self.denom));
        let tokens = self.client.validator_tokens(operator).await;

        let staked = match &tokens {
            Ok(Some(raw)) => denom::parse_micro_amount(raw)
                .map(denom::micro_to_display)
                .ok_or_else(|| QueryError::invalid("validator stake", format!("invalid tokens '{raw}'"))),
            Ok(None) => Ok(0.0),
            Err(e) => Err(e.clone()),
        };
        let staked_amount = match staked {
            Ok(amount) if amount > 0.0 => Some(amount),
            _ => None,
        };

        if liquid.is_err() && commission.is_err() && staked_amount.is_none() {
            let stake_reason = match &staked {
                Err(e) => e.to_string(),
                Ok(_) => NO_VALIDATOR_STAKE.to_string(),
            };
            return AddressOutcome::failure(format!(
                "Liquid: {}; Commission: {}; Stake: {stake_reason}",
                liquid.err().map(|e| e.to_string()).unwrap_or_default(),
                commission.err().map(|e| e.to_string()).unwrap_or_default(),
            ));
        }

        let mut holdings = Holdings::for_category(Category::ValidatorStake)
            .with(Component::Liquid, *liquid.as_ref().unwrap_or(&0.0))
            .with(Component::Staked, staked_amount.unwrap_or(0.0))
            .with(Component::Commission, *commission.as_ref().unwrap_or(&0.0));
        match &staked {
            Err(e) => holdings = holdings.note(format!("Validator stake query failed: {e}")),
            Ok(_) if staked_amount.is_none() => holdings = holdings.note(NO_VALIDATOR_STAKE),
            Ok(_) => {}
        }
        if let Err(e) = &liquid {
            holdings = holdings.note(format!("Liquid query failed: {e}"));
        }
        if let Err(e) = &commission {
            holdings = holdings.note(format!("Commission query failed: {e}"));
        }
        AddressOutcome::Success(holdings)
    }

    #[instrument(skip(self), fields(category = "delegator_stakes"))]
    async fn fetch_delegator(&self, address: &Address) -> AddressOutcome {
        let liquid = self.liquid_amount(address).await;
        let rewards = self.client.delegator_rewards(address).await.map(|entries| {
            denom::sum_decimal_coins(
                entries
                    .iter()
                    .flat_map(|entry| entry.reward.iter().map(String::as_str)),
                &self.denom,
            )
        });

        match (liquid, rewards) {
            (Err(liquid_err), Err(rewards_err)) => AddressOutcome::failure(format!(
                "Liquid: {liquid_err}; Delegator: {rewards_err}"
            )),
            (liquid, rewards) => {
                let mut holdings = Holdings::for_category(Category::DelegatorStake)
                    .with(Component::Liquid, *liquid.as_ref().unwrap_or(&0.0))
                    .with(Component::Rewards, *rewards.as_ref().unwrap_or(&0.0));
                if let Err(e) = liquid {
                    holdings = holdings.note(format!("Liquid query failed: {e}"));
                }
                if let Err(e) = rewards {
                    holdings = holdings.note(format!("Delegator rewards query failed: {e}"));
                }
                AddressOutcome::Success(holdings)
            }
        }
    }
}
