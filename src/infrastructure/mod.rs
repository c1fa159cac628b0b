//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - The alloy-dyn-abi chain codec
//! - Alloy HTTP providers for contract calls and node-managed wallets

pub mod abi;
pub mod ethereum;

pub use abi::AlloyCodec;
pub use ethereum::{AlloyChainClient, NodeWallet};
