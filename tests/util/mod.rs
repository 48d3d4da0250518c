#![allow(dead_code)]

pub mod mock_treasury;
pub mod test_address;
