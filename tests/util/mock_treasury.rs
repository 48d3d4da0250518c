//! Mock ledger fixtures shared by the integration suites.

use pocket_treasury::address::Address;
use pocket_treasury::mock_ledger::{command_failed, MockAccount, MockLedger};
use pocket_treasury::orchestrator::CategoryOrchestrator;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// One micro-unit amount per address, derived from its index.
pub fn amount_for(index: usize) -> u128 {
    (index as u128 + 1) * 1_000_000 + 250_000
}

/// Ledger where every address holds `amount_for(i)` liquid micro-units,
/// except those at `failing` indices which fail every call.
pub fn liquid_ledger(addresses: &[Address], failing: &[usize]) -> Arc<MockLedger> {
    let ledger = MockLedger::new();
    for (index, address) in addresses.iter().enumerate() {
        let account = if failing.contains(&index) {
            MockAccount::unreachable(command_failed("connection refused"))
        } else {
            MockAccount::liquid(amount_for(index))
        };
        ledger.insert(address, account);
    }
    Arc::new(ledger)
}

pub fn orchestrator(ledger: Arc<MockLedger>, max_workers: usize) -> CategoryOrchestrator {
    CategoryOrchestrator::new(
        ledger,
        "upokt",
        NonZeroUsize::new(max_workers).expect("max_workers must be non-zero"),
    )
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
