use pocket_treasury::address::{Address, AddressRules, Category};
use pocket_treasury::loader;
use pocket_treasury::mock_ledger::{command_failed, MockAccount, MockLedger};
use pocket_treasury::orchestrator::TreasuryError;
use pocket_treasury::report::{AddressOutcome, Component, TreasuryReport};
use pocket_treasury::validation::{TreasuryPlan, ValidationError};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

mod util;
use util::mock_treasury::{assert_close, orchestrator};
use util::test_address::{make_account_address, make_operator_address};

async fn run_treasury(
    ledger: Arc<MockLedger>,
    categories: BTreeMap<Category, Vec<Address>>,
) -> Result<TreasuryReport, TreasuryError> {
    let rules = AddressRules::default();
    let plan = TreasuryPlan::new(categories, Some(&rules))?;
    orchestrator(ledger, 4).run(&plan).await
}

/// A treasury touching every category, with one failing address.
fn mixed_treasury() -> (Arc<MockLedger>, BTreeMap<Category, Vec<Address>>) {
    let ledger = MockLedger::new();

    let liquid = make_account_address(1);
    ledger.insert(&liquid, MockAccount::liquid(1_500_000));

    let app = make_account_address(2);
    ledger.insert(
        &app,
        MockAccount::liquid(0)
            .failing_liquid(command_failed("rpc error"))
            .with_application_stake(2_000_000),
    );

    let node = make_account_address(3);
    ledger.insert(&node, MockAccount::liquid(500_000).with_supplier_stake(60_000_000_000));

    let operator = make_operator_address(4);
    let operator_account = make_account_address(4);
    ledger.insert(
        &operator,
        MockAccount::validator(&operator_account, 15_000_000_000)
            .with_commission(&["garbage", "100.5upokt"]),
    );
    ledger.insert(&operator_account, MockAccount::liquid(2_000_000));

    let delegator = make_account_address(5);
    ledger.insert(
        &delegator,
        MockAccount::liquid(10_000_000).with_rewards(&["1250000.0upokt"]),
    );

    let unreachable = make_account_address(6);
    ledger.insert(&unreachable, MockAccount::unreachable(command_failed("connection refused")));

    let categories = BTreeMap::from([
        (Category::Liquid, vec![liquid, unreachable]),
        (Category::AppStake, vec![app]),
        (Category::NodeStake, vec![node]),
        (Category::ValidatorStake, vec![operator]),
        (Category::DelegatorStake, vec![delegator]),
    ]);
    (Arc::new(ledger), categories)
}

#[tokio::test]
async fn test_full_treasury_totals() {
    let (ledger, categories) = mixed_treasury();
    let report = run_treasury(ledger, categories).await.unwrap();

    assert_eq!(report.categories().len(), 5);
    assert_close(report.category_total(Category::Liquid), 1.5);
    assert_close(report.category_total(Category::AppStake), 2.0);
    assert_close(report.category_total(Category::NodeStake), 60_000.5);
    assert_close(
        report.category_total(Category::ValidatorStake),
        2.0 + 15_000.0 + 100.5 / 1e6,
    );
    assert_close(report.category_total(Category::DelegatorStake), 11.25);

    let expected: f64 = report
        .categories()
        .values()
        .flat_map(|result| result.results().values().map(|h| h.combined()))
        .sum();
    assert_close(report.grand_total(), expected);
    assert_eq!(report.failure_count(), 1);
}

#[tokio::test]
async fn test_composite_partial_failure_is_success() {
    let (ledger, categories) = mixed_treasury();
    let app = categories[&Category::AppStake][0].clone();
    let report = run_treasury(ledger, categories).await.unwrap();

    let app_result = report.category(Category::AppStake).unwrap();
    let Some(AddressOutcome::Success(holdings)) = app_result.outcome(&app) else {
        panic!("app stake address should succeed");
    };
    assert_eq!(holdings.get(Component::Liquid), 0.0);
    assert_eq!(holdings.get(Component::Staked), 2.0);
    assert!(holdings.notes().iter().any(|n| n.contains("rpc error")));
}

#[tokio::test]
async fn test_validator_conversion_failure_fails_address() {
    let ledger = Arc::new(MockLedger::new());
    let operator = make_operator_address(9);
    ledger.insert(
        &operator,
        MockAccount {
            account_address: Err(command_failed("decoding bech32 failed")),
            ..MockAccount::default()
        },
    );

    let report = run_treasury(
        ledger.clone(),
        BTreeMap::from([(Category::ValidatorStake, vec![operator.clone()])]),
    )
    .await
    .unwrap();

    let result = report.category(Category::ValidatorStake).unwrap();
    assert_eq!(
        result.failed(),
        [(
            operator.clone(),
            "Address conversion failed: decoding bech32 failed".to_string()
        )]
    );
    assert_eq!(ledger.total_calls(), 1);
    assert_eq!(report.grand_total(), 0.0);
}

#[tokio::test]
async fn test_duplicate_within_category_issues_no_queries() {
    let ledger = Arc::new(MockLedger::new());
    let a = make_account_address(1);
    let err = run_treasury(
        ledger.clone(),
        BTreeMap::from([(Category::Liquid, vec![a.clone(), make_account_address(2), a.clone()])]),
    )
    .await
    .unwrap_err();

    match err {
        TreasuryError::Validation(ValidationError::DuplicateWithinCategory(items)) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].address, a);
            assert_eq!(items[0].occurrences, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn test_cross_category_duplicate_issues_no_queries() {
    let ledger = Arc::new(MockLedger::new());
    let shared = make_account_address(7);
    let err = run_treasury(
        ledger.clone(),
        BTreeMap::from([
            (Category::Liquid, vec![shared.clone()]),
            (Category::AppStake, vec![shared.clone()]),
        ]),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TreasuryError::Validation(ValidationError::CrossCategory(ref items))
            if items[0].categories == vec![Category::Liquid, Category::AppStake]
    ));
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn test_malformed_address_issues_no_queries() {
    let ledger = Arc::new(MockLedger::new());
    let err = run_treasury(
        ledger.clone(),
        BTreeMap::from([(
            Category::ValidatorStake,
            vec![make_account_address(1)],
        )]),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TreasuryError::Validation(ValidationError::MalformedAddress(_))
    ));
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn test_treasury_file_end_to_end() {
    let (ledger, categories) = mixed_treasury();
    let json = serde_json::json!({
        "liquid": categories[&Category::Liquid],
        "delegator_stakes": categories[&Category::DelegatorStake],
        "app_stakes": [],
        "comment": "unknown keys are ignored",
    });
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.to_string().as_bytes()).unwrap();

    let loaded = loader::load_treasury(file.path()).unwrap();
    let report = run_treasury(ledger, loaded).await.unwrap();

    let present: Vec<Category> = report.categories().keys().copied().collect();
    assert_eq!(present, vec![Category::Liquid, Category::DelegatorStake]);
    assert_close(report.grand_total(), 1.5 + 11.25);

    let rendered = serde_json::to_value(&report).unwrap();
    assert!(rendered["categories"].get("app_stakes").is_none());
    assert_eq!(
        rendered["categories"]["liquid"]["failed"][0][1],
        "connection refused"
    );
}
