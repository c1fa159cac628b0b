//! Chain client over an HTTP JSON-RPC endpoint
//!
//! Reads go through `eth_call`; writes through `eth_sendTransaction`, so the
//! node signs with one of its managed accounts (anvil, hardhat, geth --dev).

use std::str::FromStr;

use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::domain::abi::{ChainCodec, FunctionItem};
use crate::domain::invoke::{ChainClient, ProviderError};
use crate::infrastructure::abi::AlloyCodec;

// Type alias for the filled HTTP provider
pub(crate) type HttpFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

pub(crate) fn connect_http(url: &str) -> Result<HttpFillProvider> {
    let rpc_url = url.parse().context("Invalid HTTP URL")?;
    Ok(ProviderBuilder::new().connect_http(rpc_url))
}

/// Contract access on one chain
pub struct AlloyChainClient {
    chain_id: u64,
    provider: HttpFillProvider,
    endpoint: String,
    codec: AlloyCodec,
}

impl AlloyChainClient {
    /// Client for `chain_id` at `url`; no request is made until first use
    pub fn connect_http(chain_id: u64, url: &str) -> Result<Self> {
        Ok(Self {
            chain_id,
            provider: connect_http(url)?,
            endpoint: url.to_string(),
            codec: AlloyCodec::new(),
        })
    }

    /// Chain id reported by the node, to catch misconfigured endpoints
    pub async fn remote_chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .with_context(|| format!("eth_chainId on {}", self.endpoint))
    }

    fn request(
        &self,
        function: &FunctionItem,
        address: &str,
        args: &[Value],
    ) -> Result<TransactionRequest, ProviderError> {
        let to = parse_address(address, "contract")?;
        let input = self.codec.encode_function_call(function, args)?;
        Ok(TransactionRequest::default()
            .with_to(to)
            .with_input(Bytes::from(input)))
    }
}

#[async_trait::async_trait]
impl ChainClient for AlloyChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn read_contract(
        &self,
        function: &FunctionItem,
        address: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError> {
        let request = self.request(function, address, args)?;
        debug!(endpoint = %self.endpoint, function = %function.signature(), "eth_call");

        let output = self
            .provider
            .call(request)
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let mut values = self.codec.decode_function_result(function, &output)?;

        Ok(match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Array(values),
        })
    }

    async fn write_contract(
        &self,
        function: &FunctionItem,
        address: &str,
        from: &str,
        args: &[Value],
        value: Option<u128>,
    ) -> Result<String, ProviderError> {
        let mut request = self
            .request(function, address, args)?
            .with_from(parse_address(from, "sender")?);
        if let Some(wei) = value {
            request = request.with_value(U256::from(wei));
        }
        debug!(endpoint = %self.endpoint, function = %function.signature(), "eth_sendTransaction");

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| ProviderError::Rejected(e.to_string()))?;
        Ok(pending.tx_hash().to_string())
    }
}

fn parse_address(value: &str, what: &str) -> Result<Address, ProviderError> {
    Address::from_str(value.trim())
        .map_err(|e| ProviderError::Validation(format!("{} address {}: {}", what, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(AlloyChainClient::connect_http(1, "not a url").is_err());
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address(" 0x5FbDB2315678afecb367f032d93F642f64180aa3 ", "contract").is_ok());
        assert!(matches!(
            parse_address("0x1234", "contract"),
            Err(ProviderError::Validation(_))
        ));
    }
}
