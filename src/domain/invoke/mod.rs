//! Contract invocation and the ports it drives

mod controller;
pub mod ports;

pub use controller::{format_result, InvocationController};
pub use ports::{ChainClient, ProviderError, WalletProvider};
