//! Test address utilities for generating well-formed ledger addresses.
//!
//! Addresses are deterministic: the same index always yields the same
//! address, and distinct indices yield distinct addresses.

use pocket_treasury::address::Address;

const BECH32_ALPHABET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const DATA_LEN: usize = 38;

fn bech32_data(mut index: u64) -> String {
    let mut data = vec![b'q'; DATA_LEN];
    let mut position = DATA_LEN;
    while index > 0 && position > 0 {
        position -= 1;
        data[position] = BECH32_ALPHABET[(index % 32) as usize];
        index /= 32;
    }
    String::from_utf8(data).expect("bech32 alphabet is ASCII")
}

/// A valid 43-character `pokt1...` account address.
pub fn make_account_address(index: u64) -> Address {
    Address::new(format!("pokt1{}", bech32_data(index)))
}

/// A valid 50-character `poktvaloper1...` operator address.
pub fn make_operator_address(index: u64) -> Address {
    Address::new(format!("poktvaloper1{}", bech32_data(index)))
}

pub fn make_account_addresses(count: u64) -> Vec<Address> {
    (0..count).map(make_account_address).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocket_treasury::address::{AddressKind, AddressRules};

    #[test]
    fn test_generated_addresses_are_well_formed() {
        let rules = AddressRules::default();
        for index in [0, 1, 31, 32, 1_000_000] {
            let account = make_account_address(index);
            assert_eq!(account.as_str().len(), 43);
            assert!(rules.is_valid(&account, AddressKind::Account));

            let operator = make_operator_address(index);
            assert_eq!(operator.as_str().len(), 50);
            assert!(rules.is_valid(&operator, AddressKind::Operator));
        }
    }

    #[test]
    fn test_generated_addresses_are_distinct() {
        let mut addresses = make_account_addresses(500);
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 500);
    }
}
