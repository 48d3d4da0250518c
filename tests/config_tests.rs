use pocket_treasury::address::{Address, Category};
use pocket_treasury::config::{ConfigError, TreasuryConfig};
use pocket_treasury::validation::{TreasuryPlan, ValidationError};
use std::fs;

mod util;
use util::test_address::make_account_address;

#[test]
fn test_default_config_round_trips_through_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("treasury.toml");
    let path = path.to_str().unwrap();

    TreasuryConfig::default().save(path).unwrap();
    let written = fs::read_to_string(path).unwrap();
    assert!(written.contains("[ledger]"));
    assert!(written.contains("shannon-grove-rpc.mainnet.poktroll.com"));
    assert!(!written.contains("max_queries_per_second"));

    assert_eq!(TreasuryConfig::load(path).unwrap(), TreasuryConfig::default());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[pool]\nmax_workers = 0\n").unwrap();

    let err = TreasuryConfig::load(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("max_workers")));
}

#[test]
fn test_configured_prefixes_drive_address_rules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("testnet.toml");
    fs::write(
        &path,
        "[addresses]\naccount_prefix = \"tpokt\"\noperator_prefix = \"tpoktvaloper\"\n",
    )
    .unwrap();

    let config = TreasuryConfig::load(path.to_str().unwrap()).unwrap();
    let rules = config.address_rules().unwrap();

    let mainnet = make_account_address(3);
    let testnet = Address::new(format!("t{}", mainnet.as_str()));

    assert!(TreasuryPlan::single(Category::Liquid, vec![testnet], Some(&rules)).is_ok());
    let err = TreasuryPlan::single(Category::Liquid, vec![mainnet], Some(&rules)).unwrap_err();
    assert!(matches!(err, ValidationError::MalformedAddress(_)));
    assert!(err.to_string().contains("tpokt1... (44 characters)"));
}
