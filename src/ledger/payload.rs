//! Decoded response payloads of the ledger query commands.
//!
//! Only the fields consumed by the balance fetchers are modelled; unknown
//! fields are ignored. Amounts stay as strings, exactly as the ledger prints
//! them, and are interpreted by the caller.

use crate::address::Address;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(default)]
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BankBalancesResponse {
    #[serde(default)]
    pub balances: Vec<Coin>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StakedActor {
    #[serde(default)]
    pub stake: Option<Coin>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationResponse {
    #[serde(default)]
    pub application: Option<StakedActor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SupplierResponse {
    #[serde(default)]
    pub supplier: Option<StakedActor>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Validator {
    #[serde(default)]
    pub tokens: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidatorResponse {
    #[serde(default)]
    pub validator: Option<Validator>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CommissionAmounts {
    #[serde(default)]
    pub commission: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommissionResponse {
    #[serde(default)]
    pub commission: Option<CommissionAmounts>,
}

/// One delegation's accumulated rewards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RewardEntry {
    #[serde(default)]
    pub validator_address: Option<String>,
    #[serde(default)]
    pub reward: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RewardsResponse {
    #[serde(default)]
    pub rewards: Vec<RewardEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SupplierListEntry {
    #[serde(default)]
    pub operator_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SupplierListResponse {
    #[serde(default)]
    pub supplier: Vec<SupplierListEntry>,
}

/// Label of the account encoding in the `debug addr` report.
pub const ACCOUNT_ADDRESS_LABEL: &str = "Bech32 Acc";

/// Parsed `debug addr` report: one `Label: value` pair per line.
///
/// ```text
/// Address: [4 56 ...]
/// Address (hex): 0438...
/// Bech32 Acc: pokt1...
/// Bech32 Val: poktvaloper1...
/// Bech32 Con: poktvalcons1...
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressEncodings {
    entries: BTreeMap<String, String>,
}

impl AddressEncodings {
    pub fn parse(output: &str) -> Self {
        let entries = output
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(label, value)| (label.trim().to_string(), value.trim().to_string()))
            .filter(|(label, value)| !label.is_empty() && !value.is_empty())
            .collect();
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(String::as_str)
    }

    pub fn account_address(&self) -> Option<Address> {
        self.get(ACCOUNT_ADDRESS_LABEL).map(Address::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bank_balances() {
        let raw = r#"{"balances":[{"denom":"uatom","amount":"5"},{"denom":"upokt","amount":"1500000"}],"pagination":{"total":"2"}}"#;
        let decoded: BankBalancesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(decoded.balances.len(), 2);
        assert_eq!(decoded.balances[1], Coin::new("upokt", "1500000"));
    }

    #[test]
    fn test_decode_missing_stake_objects() {
        let decoded: ApplicationResponse = serde_json::from_str("{}").unwrap();
        assert!(decoded.application.is_none());

        let decoded: SupplierResponse =
            serde_json::from_str(r#"{"supplier":{"operator_address":"pokt1x"}}"#).unwrap();
        assert!(decoded.supplier.unwrap().stake.is_none());
    }

    #[test]
    fn test_decode_rewards() {
        let raw = r#"{"rewards":[{"validator_address":"poktvaloper1x","reward":["300491.883966650000000000upokt"]}],"total":[]}"#;
        let decoded: RewardsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(decoded.rewards[0].reward.len(), 1);
    }

    #[test]
    fn test_decode_supplier_list() {
        let raw = r#"{"supplier":[{"operator_address":"pokt1b","stake":{"denom":"upokt","amount":"1"}},{"owner_address":"pokt1o"}],"pagination":{"total":"2"}}"#;
        let decoded: SupplierListResponse = serde_json::from_str(raw).unwrap();
        let operators: Vec<_> = decoded
            .supplier
            .into_iter()
            .filter_map(|s| s.operator_address)
            .collect();
        assert_eq!(operators, ["pokt1b"]);
    }

    #[test]
    fn test_parse_debug_addr_output() {
        let output = "Address: [4 56 107]\nAddress (hex): 04386B\nBech32 Acc: pokt1abc\nBech32 Val: poktvaloper1abc\n";
        let encodings = AddressEncodings::parse(output);
        assert_eq!(encodings.account_address(), Some(Address::from("pokt1abc")));
        assert_eq!(encodings.get("Address (hex)"), Some("04386B"));

        let empty = AddressEncodings::parse("unexpected output");
        assert_eq!(empty.account_address(), None);
    }
}
