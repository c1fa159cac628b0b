//! Ethereum infrastructure - Alloy provider implementations

mod provider;
mod wallet;

pub use provider::AlloyChainClient;
pub use wallet::NodeWallet;
