pub mod abi;
pub mod decode;
pub mod error;
pub mod invoke;
pub mod units;
