//! Chain codec port and decoded result types
//!
//! The codec owns Keccak-256 and the binary ABI encoding. The engine only
//! hands it resolved schema items and codec-ready values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{ErrorItem, EventItem, FunctionItem};
use super::CodecError;

/// A decoded argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedArg {
    /// Parameter name (or "arg{n}" if unnamed)
    pub name: String,
    /// Canonical type, e.g. "uint256" or "(address,uint256)[]"
    pub kind: String,
    pub value: Value,
}

/// Result of any decode operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedItem {
    /// Error, event or function name
    pub name: String,
    /// Canonical signature, e.g. "transfer(address,uint256)"
    pub signature: String,
    pub args: Vec<DecodedArg>,
}

impl DecodedItem {
    /// Look up an argument value by name
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Arguments as a JSON object keyed by name
    pub fn args_object(&self) -> Map<String, Value> {
        self.args
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }
}

/// Encoding, hashing and decoding, per the EVM ABI specification
pub trait ChainCodec: Send + Sync {
    /// First 4 bytes of keccak256(signature)
    fn selector(&self, signature: &str) -> [u8; 4];

    /// keccak256(signature), the topic0 of a non-anonymous event
    fn event_topic(&self, signature: &str) -> [u8; 32];

    /// Selector followed by the encoded arguments
    fn encode_function_call(
        &self,
        function: &FunctionItem,
        args: &[Value],
    ) -> Result<Vec<u8>, CodecError>;

    /// `Ok(None)` when no error selector matches the leading bytes
    fn decode_error(
        &self,
        errors: &[&ErrorItem],
        data: &[u8],
    ) -> Result<Option<DecodedItem>, CodecError>;

    /// `Ok(None)` when no event matches topic0
    fn decode_event(
        &self,
        events: &[&EventItem],
        topics: &[[u8; 32]],
        data: &[u8],
    ) -> Result<Option<DecodedItem>, CodecError>;

    /// `Ok(None)` when no function selector matches
    fn decode_calldata(
        &self,
        functions: &[&FunctionItem],
        data: &[u8],
    ) -> Result<Option<DecodedItem>, CodecError>;

    /// Positional output values of `function`
    fn decode_function_result(
        &self,
        function: &FunctionItem,
        data: &[u8],
    ) -> Result<Vec<Value>, CodecError>;
}
