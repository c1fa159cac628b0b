//! Error taxonomy of the interaction engine
//!
//! Only [`SchemaError`] is fatal, and only to loading. Every other family is
//! local to one invocation or one decode request.

use thiserror::Error;

/// ABI document could not be turned into a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("malformed ABI: {0}")]
    MalformedAbi(String),
}

impl SchemaError {
    pub(crate) fn in_item(self, index: usize) -> Self {
        match self {
            SchemaError::MalformedAbi(reason) => {
                SchemaError::MalformedAbi(format!("item #{index}: {reason}"))
            }
        }
    }
}

/// User text could not be converted for its parameter type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("value is required")]
    EmptyArgument,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid integer: {0}")]
    InvalidNumber(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// A coercion failure tied to the parameter that caused it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("argument #{index} ({name}): {source}")]
pub struct ArgumentError {
    pub index: usize,
    pub name: String,
    #[source]
    pub source: CoercionError,
}

/// Failures reported by the chain codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unsupported type `{0}`")]
    UnsupportedType(String),
    #[error("invalid value for `{ty}`: {reason}")]
    InvalidValue { ty: String, reason: String },
    #[error("argument count mismatch: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("decoding failed: {0}")]
    Decode(String),
}

/// Failures of a read call or write transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("no ABI loaded")]
    NoSchema,
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("`{0}` is overloaded; use the full signature")]
    AmbiguousMethod(String),
    #[error("input #{index} out of range ({len} parameters)")]
    InputOutOfRange { index: usize, len: usize },
    #[error("`{0}` is not payable")]
    NotPayable(String),
    #[error("`{0}` already has an invocation in flight")]
    AlreadyInFlight(String),
    #[error("no chain client for chain {0}")]
    UnsupportedChain(u64),
    #[error("wallet not connected")]
    WalletNotConnected,
    #[error("connected wallet {active} does not own this contract (owner {bound})")]
    WalletMismatch { active: String, bound: String },
    #[error("wallet is on chain {active:?}, switch to chain {target} first")]
    ChainSwitchRequired { active: Option<u64>, target: u64 },
    #[error("network switch failed: {0}")]
    ChainSwitchFailed(String),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error("invalid payable value: {0}")]
    InvalidPayableValue(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("ABI was replaced while the invocation was in flight")]
    SchemaReplaced,
}

/// Failures of the four decode operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no ABI loaded")]
    NoSchema,
    #[error("event log has no topic0")]
    MissingTopic0,
    #[error("event log has {0} topics, at most 4 allowed")]
    TooManyTopics(usize),
    #[error("calldata too short: {0} bytes, need at least 4 for the selector")]
    CalldataTooShort(usize),
    #[error("no error in the ABI matches this data")]
    NoMatchingError,
    #[error("no event in the ABI matches topic0")]
    NoMatchingEvent,
    #[error("no function in the ABI matches `{0}`")]
    NoMatchingFunction(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
