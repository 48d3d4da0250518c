// src/report.rs

//! --- Treasury Report Model ---
//! Per-address outcomes, per-category results and the final treasury report.
//! A report is assembled once per run and never mutated afterwards.

use crate::address::{Address, Category};
use crate::aggregate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named amount slots of a successful address outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Liquid,
    Staked,
    Commission,
    Rewards,
}

impl Component {
    pub fn label(self) -> &'static str {
        match self {
            Component::Liquid => "Liquid",
            Component::Staked => "Staked",
            Component::Commission => "Commission",
            Component::Rewards => "Delegator Rewards",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Category {
    /// Components reported for each address of this category, in column order.
    pub fn components(self) -> &'static [Component] {
        match self {
            Category::Liquid => &[Component::Liquid],
            Category::AppStake | Category::NodeStake => &[Component::Liquid, Component::Staked],
            Category::ValidatorStake => &[
                Component::Liquid,
                Component::Staked,
                Component::Commission,
            ],
            Category::DelegatorStake => &[Component::Liquid, Component::Rewards],
        }
    }
}

/// Component amounts (display units) of one successfully queried address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    components: BTreeMap<Component, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
}

impl Holdings {
    /// Creates zeroed holdings carrying every component of `category`.
    pub fn for_category(category: Category) -> Self {
        Self {
            components: category.components().iter().map(|c| (*c, 0.0)).collect(),
            notes: Vec::new(),
        }
    }

    pub fn with(mut self, component: Component, amount: f64) -> Self {
        self.components.insert(component, amount);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn get(&self, component: Component) -> f64 {
        self.components.get(&component).copied().unwrap_or(0.0)
    }

    pub fn components(&self) -> &BTreeMap<Component, f64> {
        &self.components
    }

    /// Informational, non-fatal remarks such as a missing stake.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Sum of every component.
    pub fn combined(&self) -> f64 {
        self.components.values().sum()
    }
}

/// Terminal result of one (category, address) query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddressOutcome {
    Success(Holdings),
    Failure { reason: String },
}

impl AddressOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub components: BTreeMap<Component, f64>,
    pub combined: f64,
}

impl CategoryTotals {
    pub fn get(&self, component: Component) -> f64 {
        self.components.get(&component).copied().unwrap_or(0.0)
    }
}

/// Finalized outcome set of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    category: Category,
    results: BTreeMap<Address, Holdings>,
    failed: Vec<(Address, String)>,
    totals: CategoryTotals,
}

impl CategoryResult {
    /// Finalizes a category from its successes and failures and computes its totals.
    pub fn finalize(
        category: Category,
        results: BTreeMap<Address, Holdings>,
        failed: Vec<(Address, String)>,
    ) -> Self {
        let totals = aggregate::category_totals(category, &results);
        Self {
            category,
            results,
            failed,
            totals,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn results(&self) -> &BTreeMap<Address, Holdings> {
        &self.results
    }

    pub fn failed(&self) -> &[(Address, String)] {
        &self.failed
    }

    pub fn totals(&self) -> &CategoryTotals {
        &self.totals
    }

    /// Number of addresses that received an outcome.
    pub fn address_count(&self) -> usize {
        self.results.len() + self.failed.len()
    }

    pub fn outcome(&self, address: &Address) -> Option<AddressOutcome> {
        if let Some(holdings) = self.results.get(address) {
            return Some(AddressOutcome::Success(holdings.clone()));
        }
        self.failed
            .iter()
            .find(|(failed, _)| failed == address)
            .map(|(_, reason)| AddressOutcome::failure(reason.clone()))
    }
}

/// Terminal artifact of a treasury run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryReport {
    categories: BTreeMap<Category, CategoryResult>,
    grand_total: f64,
    generated_at: DateTime<Utc>,
}

impl TreasuryReport {
    pub fn new(categories: BTreeMap<Category, CategoryResult>) -> Self {
        let grand_total = aggregate::grand_total(&categories);
        Self {
            categories,
            grand_total,
            generated_at: Utc::now(),
        }
    }

    pub fn categories(&self) -> &BTreeMap<Category, CategoryResult> {
        &self.categories
    }

    pub fn category(&self, category: Category) -> Option<&CategoryResult> {
        self.categories.get(&category)
    }

    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Combined total of a category, 0 when the category was not queried.
    pub fn category_total(&self, category: Category) -> f64 {
        self.categories
            .get(&category)
            .map(|result| result.totals().combined)
            .unwrap_or(0.0)
    }

    pub fn failure_count(&self) -> usize {
        self.categories.values().map(|r| r.failed().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdings_start_zeroed_per_category() {
        let holdings = Holdings::for_category(Category::ValidatorStake);
        assert_eq!(holdings.components().len(), 3);
        assert_eq!(holdings.combined(), 0.0);
        assert_eq!(holdings.get(Component::Rewards), 0.0);

        let holdings = Holdings::for_category(Category::DelegatorStake)
            .with(Component::Liquid, 1.25)
            .with(Component::Rewards, 0.75)
            .note("informational");
        assert_eq!(holdings.combined(), 2.0);
        assert_eq!(holdings.notes(), ["informational".to_string()]);
    }

    #[test]
    fn test_outcome_lookup() {
        let ok = Address::from("ok");
        let bad = Address::from("bad");
        let mut results = BTreeMap::new();
        results.insert(
            ok.clone(),
            Holdings::for_category(Category::Liquid).with(Component::Liquid, 3.0),
        );
        let result = CategoryResult::finalize(
            Category::Liquid,
            results,
            vec![(bad.clone(), "Query timeout".to_string())],
        );

        assert_eq!(result.address_count(), 2);
        assert!(result.outcome(&ok).is_some_and(|o| o.is_success()));
        assert_eq!(
            result.outcome(&bad),
            Some(AddressOutcome::failure("Query timeout"))
        );
        assert_eq!(result.outcome(&Address::from("missing")), None);
        assert_eq!(result.totals().combined, 3.0);
    }

    #[test]
    fn test_report_serializes_category_keys() {
        let result = CategoryResult::finalize(Category::AppStake, BTreeMap::new(), Vec::new());
        let mut categories = BTreeMap::new();
        categories.insert(Category::AppStake, result);
        let report = TreasuryReport::new(categories);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["categories"].get("app_stakes").is_some());
        assert_eq!(json["grand_total"], 0.0);
    }
}
