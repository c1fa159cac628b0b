//! ABI domain models and contracts
//!
//! This module defines the schema, coercion and registry types, plus the
//! codec port, independent of the underlying implementation (alloy-dyn-abi).

mod codec;
mod coerce;
mod registry;
mod schema;
mod types;

pub use crate::domain::error::{
    ArgumentError, CodecError, CoercionError, DecodeError, InvocationError, SchemaError,
};
pub use codec::{ChainCodec, DecodedArg, DecodedItem};
pub use coerce::ArgumentCoercer;
pub use registry::{
    ErrorEntry, MethodEntry, MethodKey, MethodKind, MethodRegistry, MethodState, MethodStatus,
};
pub use schema::{
    signature, AbiItem, AbiSchema, ErrorItem, EventItem, EventParam, FunctionItem, Param,
    StateMutability,
};
pub use types::{positional_name, AbiType, ArrayLength, Component};
