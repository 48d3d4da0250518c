// src/pool.rs

//! --- Bounded Address Pool ---
//! Fans the queries of one category out over at most `max_workers` concurrent
//! address tasks and folds their outcomes back into a `CategoryResult`.
//!
//! Every address task is spawned up front and waits for a semaphore permit
//! before issuing its first query, so at most `max_workers` addresses of the
//! pool are ever querying the ledger. Outcomes are joined by the driver loop
//! alone; it is the only writer of the success map, failure list and
//! completion counter.

use crate::address::{Address, Category};
use crate::fetcher::CategoryFetcher;
use crate::progress::ProgressReporter;
use crate::report::{AddressOutcome, CategoryResult, Holdings};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, instrument, warn};

pub const DEFAULT_MAX_WORKERS: usize = 10;

pub struct BoundedAddressPool {
    fetcher: CategoryFetcher,
    max_workers: NonZeroUsize,
    progress: Arc<dyn ProgressReporter>,
}

impl BoundedAddressPool {
    pub fn new(
        fetcher: CategoryFetcher,
        max_workers: NonZeroUsize,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            fetcher,
            max_workers,
            progress,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers.get()
    }

    /// Queries every address of `category` and returns the finalized result.
    ///
    /// Never fails: per-address errors, timeouts and panics are recorded as
    /// that address's failure. Repeated addresses are queried once.
    #[instrument(skip(self, addresses), fields(category = %category, addresses = addresses.len()))]
    pub async fn run(&self, category: Category, addresses: Vec<Address>) -> CategoryResult {
        let mut collector = OutcomeCollector::new(category, &addresses);
        let total = collector.expected();
        self.progress.category_started(category, total);

        let semaphore = Arc::new(Semaphore::new(self.max_workers.get()));
        let mut tasks: JoinSet<(Address, AddressOutcome)> = JoinSet::new();
        let mut spawned = HashSet::with_capacity(total);

        for address in addresses {
            if !spawned.insert(address.clone()) {
                warn!("Skipping repeated {category} address {address}");
                continue;
            }
            let fetcher = self.fetcher.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => AssertUnwindSafe(fetcher.fetch(category, &address))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            AddressOutcome::failure(format!(
                                "Query task panicked: {}",
                                panic_message(panic.as_ref())
                            ))
                        }),
                    Err(_) => AddressOutcome::failure("Worker pool closed before query started"),
                };
                (address, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((address, outcome)) => {
                    let success = outcome.is_success();
                    if collector.record(address.clone(), outcome) {
                        self.progress.address_completed(
                            category,
                            &address,
                            collector.completed(),
                            total,
                            success,
                        );
                    }
                }
                // Panics are caught inside the task, so this is an abort.
                Err(e) => error!("{category} address task ended abnormally: {e}"),
            }
        }

        let result = collector.finish();
        self.progress.category_finished(&result);
        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Accumulates the outcomes of one pool run. Outcomes are write-once.
struct OutcomeCollector {
    category: Category,
    positions: HashMap<Address, usize>,
    recorded: HashSet<Address>,
    results: BTreeMap<Address, Holdings>,
    failed: Vec<(usize, Address, String)>,
    completed: usize,
}

impl OutcomeCollector {
    fn new(category: Category, addresses: &[Address]) -> Self {
        let mut positions = HashMap::with_capacity(addresses.len());
        for (index, address) in addresses.iter().enumerate() {
            positions.entry(address.clone()).or_insert(index);
        }
        Self {
            category,
            positions,
            recorded: HashSet::new(),
            results: BTreeMap::new(),
            failed: Vec::new(),
            completed: 0,
        }
    }

    fn expected(&self) -> usize {
        self.positions.len()
    }

    fn completed(&self) -> usize {
        self.completed
    }

    fn is_recorded(&self, address: &Address) -> bool {
        self.recorded.contains(address)
    }

    /// Records the outcome of `address`; returns false when the address
    /// already has one or was never part of the input.
    fn record(&mut self, address: Address, outcome: AddressOutcome) -> bool {
        let Some(position) = self.positions.get(&address).copied() else {
            warn!("Ignoring outcome for unexpected address {address}");
            return false;
        };
        if !self.recorded.insert(address.clone()) {
            warn!("Ignoring second outcome for {address}");
            return false;
        }
        match outcome {
            AddressOutcome::Success(holdings) => {
                self.results.insert(address, holdings);
            }
            AddressOutcome::Failure { reason } => self.failed.push((position, address, reason)),
        }
        self.completed += 1;
        true
    }

    /// Gives every address without an outcome a failure, then finalizes.
    fn finish(mut self) -> CategoryResult {
        let missing: Vec<(Address, usize)> = self
            .positions
            .iter()
            .filter(|(address, _)| !self.is_recorded(address))
            .map(|(address, position)| (address.clone(), *position))
            .collect();
        for (address, position) in missing {
            self.failed
                .push((position, address, "Query task did not complete".to_string()));
        }

        self.failed.sort_by_key(|(position, _, _)| *position);
        let failed = self
            .failed
            .into_iter()
            .map(|(_, address, reason)| (address, reason))
            .collect();
        CategoryResult::finalize(self.category, self.results, failed)
    }
}
