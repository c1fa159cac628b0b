//! Raw error / event / calldata / return bytes back to named values

use crate::domain::abi::{
    positional_name, AbiSchema, ChainCodec, DecodeError, DecodedArg, DecodedItem, ErrorItem,
    EventItem, FunctionItem, MethodRegistry,
};

/// Maximum topics on an EVM log (topic0 plus three indexed)
const MAX_TOPICS: usize = 4;

/// Decoding against one loaded schema
pub struct DecodeDispatcher<'a> {
    schema: &'a AbiSchema,
    registry: &'a MethodRegistry,
    codec: &'a dyn ChainCodec,
}

impl<'a> DecodeDispatcher<'a> {
    pub fn new(
        schema: &'a AbiSchema,
        registry: &'a MethodRegistry,
        codec: &'a dyn ChainCodec,
    ) -> Self {
        Self {
            schema,
            registry,
            codec,
        }
    }

    /// Match revert data against the declared errors, then `Error(string)` and
    /// `Panic(uint256)`
    pub fn decode_error(&self, data: &[u8]) -> Result<DecodedItem, DecodeError> {
        let errors: Vec<&ErrorItem> = self.schema.errors().collect();
        self.codec
            .decode_error(&errors, data)?
            .ok_or(DecodeError::NoMatchingError)
    }

    /// Match a log by topic0; anonymous events never match
    pub fn decode_event(
        &self,
        topics: &[[u8; 32]],
        data: &[u8],
    ) -> Result<DecodedItem, DecodeError> {
        if topics.is_empty() {
            return Err(DecodeError::MissingTopic0);
        }
        if topics.len() > MAX_TOPICS {
            return Err(DecodeError::TooManyTopics(topics.len()));
        }

        let events: Vec<&EventItem> = self.schema.events().collect();
        self.codec
            .decode_event(&events, topics, data)?
            .ok_or(DecodeError::NoMatchingEvent)
    }

    /// Match transaction input by its 4-byte selector
    pub fn decode_calldata(&self, data: &[u8]) -> Result<DecodedItem, DecodeError> {
        if data.len() < 4 {
            return Err(DecodeError::CalldataTooShort(data.len()));
        }

        let functions: Vec<&FunctionItem> = self.schema.functions().collect();
        self.codec
            .decode_calldata(&functions, data)?
            .ok_or_else(|| {
                DecodeError::NoMatchingFunction(format!("0x{}", hex::encode(&data[..4])))
            })
    }

    /// Decode return data of the method named by selector hex or name.
    ///
    /// Reads are searched before writes, each in declaration order; the first
    /// method with outputs that matches wins.
    pub fn decode_return(
        &self,
        selector_or_name: &str,
        data: &[u8],
    ) -> Result<DecodedItem, DecodeError> {
        let wanted = selector_or_name.trim();
        let wanted_selector = if wanted.starts_with("0x") || wanted.starts_with("0X") {
            wanted.to_string()
        } else {
            format!("0x{}", wanted)
        };

        let entry = self
            .registry
            .reads()
            .chain(self.registry.writes())
            .filter(|m| !m.function.outputs.is_empty())
            .find(|m| {
                m.function.name == wanted || m.selector_hex().eq_ignore_ascii_case(&wanted_selector)
            })
            .ok_or_else(|| DecodeError::NoMatchingFunction(wanted.to_string()))?;

        let values = self.codec.decode_function_result(&entry.function, data)?;
        let args = entry
            .function
            .outputs
            .iter()
            .zip(values)
            .enumerate()
            .map(|(index, (param, value))| DecodedArg {
                name: positional_name(&param.name, index),
                kind: param.ty.canonical(),
                value,
            })
            .collect();

        Ok(DecodedItem {
            name: entry.function.name.clone(),
            signature: entry.key.to_string(),
            args,
        })
    }
}
