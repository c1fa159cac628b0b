//! Prod: ABI-driven contract interaction
//!
//! Load a contract ABI, classify its methods, turn text inputs into typed
//! arguments, invoke reads and writes through a chain client and wallet, and
//! decode revert data, logs, calldata and return data back to named values.

pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod store;
