//! Pure reduction of per-address outcomes into category and grand totals.
//!
//! Summation runs in address order so that the same outcome set always yields
//! bit-identical totals regardless of the order in which queries completed.

use crate::address::{Address, Category};
use crate::report::{CategoryResult, CategoryTotals, Holdings};
use std::collections::BTreeMap;

/// Totals of one category over its successful addresses. Failed addresses are
/// not part of `results` and therefore contribute nothing.
pub fn category_totals(
    category: Category,
    results: &BTreeMap<Address, Holdings>,
) -> CategoryTotals {
    let mut totals = CategoryTotals {
        components: category.components().iter().map(|c| (*c, 0.0)).collect(),
        combined: 0.0,
    };

    for holdings in results.values() {
        for (component, amount) in holdings.components() {
            *totals.components.entry(*component).or_insert(0.0) += amount;
        }
        totals.combined += holdings.combined();
    }

    totals
}

/// Sum of every category's combined total.
pub fn grand_total(categories: &BTreeMap<Category, CategoryResult>) -> f64 {
    categories.values().map(|r| r.totals().combined).sum()
}
