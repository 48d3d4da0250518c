// src/validation.rs

//! --- Pre-flight Validation ---
//! A treasury plan is only constructed from address lists that are unique
//! within each category, disjoint across categories and, when enforced,
//! well-formed. Any violation aborts the run before a single query is issued.

use crate::address::{Address, AddressRules, Category};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateAddress {
    pub category: Category,
    pub address: Address,
    pub occurrences: usize,
}

impl fmt::Display for DuplicateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} appears {} times in '{}'",
            self.address, self.occurrences, self.category
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossCategoryConflict {
    pub address: Address,
    pub categories: Vec<Category>,
}

impl fmt::Display for CrossCategoryConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let categories: Vec<&str> = self.categories.iter().map(|c| c.json_key()).collect();
        write!(f, "{} appears in: {}", self.address, categories.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAddress {
    pub category: Category,
    pub address: Address,
    pub expected: String,
}

impl fmt::Display for MalformedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in '{}' (expected {})",
            self.address, self.category, self.expected
        )
    }
}

fn listing<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("\n  • {item}"))
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Duplicate addresses found within a category:{}", listing(.0))]
    DuplicateWithinCategory(Vec<DuplicateAddress>),
    #[error(
        "Addresses found in multiple categories (would double-count liquid balances):{}",
        listing(.0)
    )]
    CrossCategory(Vec<CrossCategoryConflict>),
    #[error("Malformed addresses:{}", listing(.0))]
    MalformedAddress(Vec<MalformedAddress>),
}

impl ValidationError {
    /// Offending addresses, in listing order.
    pub fn offenders(&self) -> Vec<&Address> {
        match self {
            Self::DuplicateWithinCategory(items) => items.iter().map(|i| &i.address).collect(),
            Self::CrossCategory(items) => items.iter().map(|i| &i.address).collect(),
            Self::MalformedAddress(items) => items.iter().map(|i| &i.address).collect(),
        }
    }
}

fn find_duplicates(categories: &BTreeMap<Category, Vec<Address>>) -> Vec<DuplicateAddress> {
    let mut duplicates = Vec::new();
    for (category, addresses) in categories {
        let mut counts: HashMap<&Address, usize> = HashMap::new();
        for address in addresses {
            *counts.entry(address).or_insert(0) += 1;
        }
        let mut reported = HashSet::new();
        for address in addresses {
            let occurrences = counts[address];
            if occurrences > 1 && reported.insert(address) {
                duplicates.push(DuplicateAddress {
                    category: *category,
                    address: address.clone(),
                    occurrences,
                });
            }
        }
    }
    duplicates
}

fn find_cross_category(
    categories: &BTreeMap<Category, Vec<Address>>,
) -> Vec<CrossCategoryConflict> {
    let mut seen: Vec<(Address, Vec<Category>)> = Vec::new();
    let mut index: HashMap<Address, usize> = HashMap::new();
    for (category, addresses) in categories {
        for address in addresses {
            match index.get(address) {
                Some(&i) => {
                    if !seen[i].1.contains(category) {
                        seen[i].1.push(*category);
                    }
                }
                None => {
                    index.insert(address.clone(), seen.len());
                    seen.push((address.clone(), vec![*category]));
                }
            }
        }
    }
    seen.into_iter()
        .filter(|(_, categories)| categories.len() > 1)
        .map(|(address, categories)| CrossCategoryConflict {
            address,
            categories,
        })
        .collect()
}

fn find_malformed(
    categories: &BTreeMap<Category, Vec<Address>>,
    rules: &AddressRules,
) -> Vec<MalformedAddress> {
    categories
        .iter()
        .flat_map(|(category, addresses)| {
            let kind = category.address_kind();
            addresses
                .iter()
                .filter(move |address| !rules.is_valid(address, kind))
                .map(move |address| MalformedAddress {
                    category: *category,
                    address: address.clone(),
                    expected: rules.describe(kind),
                })
        })
        .collect()
}

/// Validated per-category address lists of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreasuryPlan {
    categories: BTreeMap<Category, Vec<Address>>,
}

impl TreasuryPlan {
    /// Validates `categories`; address formats are only checked when `rules`
    /// is given.
    pub fn new(
        categories: BTreeMap<Category, Vec<Address>>,
        rules: Option<&AddressRules>,
    ) -> Result<Self, ValidationError> {
        let duplicates = find_duplicates(&categories);
        if !duplicates.is_empty() {
            return Err(ValidationError::DuplicateWithinCategory(duplicates));
        }

        let conflicts = find_cross_category(&categories);
        if !conflicts.is_empty() {
            return Err(ValidationError::CrossCategory(conflicts));
        }

        if let Some(rules) = rules {
            let malformed = find_malformed(&categories, rules);
            if !malformed.is_empty() {
                return Err(ValidationError::MalformedAddress(malformed));
            }
        }

        Ok(Self { categories })
    }

    pub fn single(
        category: Category,
        addresses: Vec<Address>,
        rules: Option<&AddressRules>,
    ) -> Result<Self, ValidationError> {
        Self::new(BTreeMap::from([(category, addresses)]), rules)
    }

    /// Categories with at least one address, in report order.
    pub fn categories(&self) -> impl Iterator<Item = (Category, &[Address])> {
        self.categories
            .iter()
            .filter(|(_, addresses)| !addresses.is_empty())
            .map(|(category, addresses)| (*category, addresses.as_slice()))
    }

    pub fn addresses(&self, category: Category) -> &[Address] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn total_addresses(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_addresses() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(tag: &str) -> Address {
        Address::new(format!("pokt1{tag:q<38}"))
    }

    fn plan(entries: &[(Category, Vec<Address>)]) -> BTreeMap<Category, Vec<Address>> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn test_duplicates_within_category_are_listed() {
        let a = account("a");
        let result = TreasuryPlan::new(
            plan(&[(Category::Liquid, vec![a.clone(), account("c"), a.clone(), a.clone()])]),
            None,
        );
        assert_eq!(
            result,
            Err(ValidationError::DuplicateWithinCategory(vec![DuplicateAddress {
                category: Category::Liquid,
                address: a,
                occurrences: 3,
            }]))
        );
    }

    #[test]
    fn test_cross_category_conflicts_name_every_category() {
        let shared = account("s");
        let err = TreasuryPlan::new(
            plan(&[
                (Category::Liquid, vec![shared.clone()]),
                (Category::AppStake, vec![account("x")]),
                (Category::DelegatorStake, vec![shared.clone()]),
            ]),
            None,
        )
        .unwrap_err();

        assert_eq!(err.offenders(), vec![&shared]);
        let message = err.to_string();
        assert!(message.contains("appears in: liquid, delegator_stakes"));
    }

    #[test]
    fn test_malformed_addresses_checked_per_kind() {
        let rules = AddressRules::default();
        let operator = Address::new(format!("poktvaloper1{}", "q".repeat(38)));
        let ok = TreasuryPlan::new(
            plan(&[
                (Category::Liquid, vec![account("a")]),
                (Category::ValidatorStake, vec![operator.clone()]),
            ]),
            Some(&rules),
        );
        assert!(ok.is_ok());

        let err = TreasuryPlan::new(
            plan(&[(Category::NodeStake, vec![operator.clone(), Address::from("junk")])]),
            Some(&rules),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedAddress(ref items) if items.len() == 2));
        assert!(err.to_string().contains("expected pokt1... (43 characters)"));
    }

    #[test]
    fn test_plan_skips_empty_categories() {
        let plan = TreasuryPlan::new(
            plan(&[
                (Category::Liquid, vec![account("a"), account("c")]),
                (Category::AppStake, Vec::new()),
            ]),
            None,
        )
        .unwrap();
        let present: Vec<Category> = plan.categories().map(|(c, _)| c).collect();
        assert_eq!(present, vec![Category::Liquid]);
        assert_eq!(plan.total_addresses(), 2);
        assert!(plan.addresses(Category::NodeStake).is_empty());
    }
}
