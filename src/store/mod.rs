//! Local persistence

mod contracts;

pub use contracts::{ContractRecord, ContractStore};
