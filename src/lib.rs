// The modules that make up a treasury run, from address intake to the report.
pub mod address;
pub mod aggregate;
pub mod config;
pub mod denom;
pub mod fetcher;
pub mod ledger;
pub mod loader;
pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod render;
pub mod report;
pub mod validation;

// Scriptable in-memory ledger used by the test suites.
pub mod mock_ledger;
