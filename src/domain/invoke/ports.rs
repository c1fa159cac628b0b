//! Collaborators the controller talks to

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::WalletEvent;
use crate::domain::abi::{CodecError, FunctionItem};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Chain-scoped contract access
///
/// The function item is passed instead of a bare name so overloads are
/// never ambiguous.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain this client is connected to
    fn chain_id(&self) -> u64;

    /// `eth_call`; a single output is returned bare, several as an array
    async fn read_contract(
        &self,
        function: &FunctionItem,
        address: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError>;

    /// Submit a transaction from `from`, returning the transaction hash
    async fn write_contract(
        &self,
        function: &FunctionItem,
        address: &str,
        from: &str,
        args: &[Value],
        value: Option<u128>,
    ) -> Result<String, ProviderError>;
}

/// The user's wallet
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
    /// Currently selected account, if connected
    async fn account(&self) -> Result<Option<String>, ProviderError>;

    /// Network the wallet is on
    async fn chain_id(&self) -> Result<Option<u64>, ProviderError>;

    /// Ask the wallet to switch networks
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Stream of account/network changes
    async fn subscribe(&self) -> Result<mpsc::Receiver<WalletEvent>, ProviderError>;
}
