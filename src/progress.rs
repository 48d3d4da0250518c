//! Progress reporting for running pools.
//!
//! Reporters only observe; they never see or mutate aggregation state.

use crate::address::{Address, Category};
use crate::report::CategoryResult;
use tracing::{debug, info, warn};

pub trait ProgressReporter: Send + Sync {
    fn category_started(&self, category: Category, total: usize);

    /// Called once per address as soon as its outcome is recorded.
    fn address_completed(
        &self,
        category: Category,
        address: &Address,
        completed: usize,
        total: usize,
        success: bool,
    );

    fn category_finished(&self, result: &CategoryResult);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn category_started(&self, _category: Category, _total: usize) {}

    fn address_completed(
        &self,
        _category: Category,
        _address: &Address,
        _completed: usize,
        _total: usize,
        _success: bool,
    ) {
    }

    fn category_finished(&self, _result: &CategoryResult) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn category_started(&self, category: Category, total: usize) {
        info!("Querying {total} {} addresses...", category.label().to_lowercase());
    }

    fn address_completed(
        &self,
        category: Category,
        address: &Address,
        completed: usize,
        total: usize,
        success: bool,
    ) {
        if success {
            debug!("{} {completed}/{total}: {address}... done", category.label());
        } else {
            warn!("{} {completed}/{total}: {address}... failed", category.label());
        }
    }

    fn category_finished(&self, result: &CategoryResult) {
        info!(
            "{} queries complete: {}/{} succeeded",
            result.category().label(),
            result.results().len(),
            result.address_count()
        );
    }
}
