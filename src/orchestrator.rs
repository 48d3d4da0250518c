// src/orchestrator.rs

//! --- Category Orchestrator ---
//! Runs one bounded pool per non-empty category of a validated plan, all
//! categories at once, and assembles the treasury report when every pool
//! has finished.

use crate::address::{Address, Category};
use crate::fetcher::CategoryFetcher;
use crate::ledger::LedgerClient;
use crate::pool::BoundedAddressPool;
use crate::progress::{ProgressReporter, SilentProgress};
use crate::report::{CategoryResult, TreasuryReport};
use crate::validation::{TreasuryPlan, ValidationError};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum TreasuryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Category task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct CategoryOrchestrator {
    client: Arc<dyn LedgerClient>,
    denom: String,
    max_workers: NonZeroUsize,
    progress: Arc<dyn ProgressReporter>,
}

impl CategoryOrchestrator {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        denom: impl Into<String>,
        max_workers: NonZeroUsize,
    ) -> Self {
        Self {
            client,
            denom: denom.into(),
            max_workers,
            progress: Arc::new(SilentProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers.get()
    }

    fn pool(&self) -> BoundedAddressPool {
        BoundedAddressPool::new(
            CategoryFetcher::new(self.client.clone(), self.denom.clone()),
            self.max_workers,
            self.progress.clone(),
        )
    }

    /// Runs every non-empty category of `plan` concurrently. Categories
    /// without addresses are left out of the report.
    #[instrument(skip(self, plan), fields(addresses = plan.total_addresses()))]
    pub async fn run(&self, plan: &TreasuryPlan) -> Result<TreasuryReport, TreasuryError> {
        let mut tasks: JoinSet<CategoryResult> = JoinSet::new();
        for (category, addresses) in plan.categories() {
            let pool = self.pool();
            let addresses = addresses.to_vec();
            tasks.spawn(async move { pool.run(category, addresses).await });
        }

        let mut categories = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let result = joined?;
            categories.insert(result.category(), result);
        }

        let report = TreasuryReport::new(categories);
        info!(
            "Treasury run complete: {} categories, {} failures, grand total {:.2}",
            report.categories().len(),
            report.failure_count(),
            report.grand_total()
        );
        Ok(report)
    }

    /// Runs a single category in the current task.
    pub async fn run_category(&self, category: Category, addresses: Vec<Address>) -> CategoryResult {
        self.pool().run(category, addresses).await
    }
}
