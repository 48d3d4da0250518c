//! Micro-unit conversion helpers.
//!
//! The ledger reports integer balances in its smallest denomination and
//! distribution amounts (commission, rewards) as decimal coin strings such as
//! `"16372.463008797333403449upokt"`.

use tracing::debug;

pub const DEFAULT_DENOM: &str = "upokt";
pub const MICRO_PER_UNIT: f64 = 1_000_000.0;

/// Converts an integer micro-unit amount to its display magnitude.
pub fn micro_to_display(amount: u128) -> f64 {
    amount as f64 / MICRO_PER_UNIT
}

/// Parses an integer micro-unit amount as returned in balance and stake payloads.
pub fn parse_micro_amount(raw: &str) -> Option<u128> {
    raw.trim().parse::<u128>().ok()
}

/// Parses a single decimal coin string carrying the `denom` suffix.
///
/// Returns `None` for entries of another denomination or whose numeric part
/// is not a finite number.
pub fn parse_decimal_coin(raw: &str, denom: &str) -> Option<f64> {
    let amount = raw.trim().strip_suffix(denom)?;
    match amount.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

/// Sums decimal coin strings of `denom` in micro-units, skipping unparseable
/// entries, and converts the total to its display magnitude.
pub fn sum_decimal_coins<'a, I>(entries: I, denom: &str) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total_micro = 0.0;
    for entry in entries {
        match parse_decimal_coin(entry, denom) {
            Some(value) => total_micro += value,
            None => debug!("Skipping unparseable coin amount '{entry}'"),
        }
    }
    total_micro / MICRO_PER_UNIT
}
