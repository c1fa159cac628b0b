//! Chain codec implementation using alloy-dyn-abi

use std::str::FromStr;

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, B256, I256, U256};
use serde_json::{Map, Value};

use crate::domain::abi::{
    positional_name, AbiType, ArrayLength, ChainCodec, CodecError, Component, DecodedArg,
    DecodedItem, ErrorItem, EventItem, FunctionItem, Param,
};

/// `Error(string)`, emitted by `require`/`revert` with a reason
const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// `Panic(uint256)`, emitted on assertion failures and arithmetic faults
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// ABI codec backed by alloy-dyn-abi and alloy-primitives' keccak256
#[derive(Debug, Default, Clone, Copy)]
pub struct AlloyCodec;

impl AlloyCodec {
    pub fn new() -> Self {
        Self
    }

    fn decode_error_item(&self, error: &ErrorItem, data: &[u8]) -> Result<DecodedItem, CodecError> {
        let values = decode_params(&error.inputs, &data[4..])?;
        Ok(decoded(&error.name, error.signature(), &error.inputs, values))
    }
}

impl ChainCodec for AlloyCodec {
    fn selector(&self, signature: &str) -> [u8; 4] {
        let hash = keccak256(signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    fn event_topic(&self, signature: &str) -> [u8; 32] {
        keccak256(signature.as_bytes()).0
    }

    fn encode_function_call(
        &self,
        function: &FunctionItem,
        args: &[Value],
    ) -> Result<Vec<u8>, CodecError> {
        if args.len() != function.inputs.len() {
            return Err(CodecError::ArgumentCount {
                expected: function.inputs.len(),
                got: args.len(),
            });
        }

        let values = function
            .inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| to_dyn_value(arg, &param.ty))
            .collect::<Result<Vec<_>, _>>()?;

        let mut data = self.selector(&function.signature()).to_vec();
        data.extend(DynSolValue::Tuple(values).abi_encode_params());
        Ok(data)
    }

    fn decode_error(
        &self,
        errors: &[&ErrorItem],
        data: &[u8],
    ) -> Result<Option<DecodedItem>, CodecError> {
        if data.len() < 4 {
            return Ok(None);
        }
        let selector = &data[..4];

        if let Some(error) = errors
            .iter()
            .find(|e| self.selector(&e.signature()) == selector)
        {
            return self.decode_error_item(error, data).map(Some);
        }

        let builtin = if selector == REVERT_SELECTOR {
            builtin_error("Error", "message", AbiType::String)
        } else if selector == PANIC_SELECTOR {
            builtin_error("Panic", "code", AbiType::Uint(256))
        } else {
            return Ok(None);
        };
        self.decode_error_item(&builtin, data).map(Some)
    }

    fn decode_event(
        &self,
        events: &[&EventItem],
        topics: &[[u8; 32]],
        data: &[u8],
    ) -> Result<Option<DecodedItem>, CodecError> {
        let Some(topic0) = topics.first() else {
            return Ok(None);
        };
        let Some(event) = events
            .iter()
            .filter(|e| !e.anonymous)
            .find(|e| &self.event_topic(&e.signature()) == topic0)
        else {
            return Ok(None);
        };

        let indexed_count = event.inputs.iter().filter(|p| p.indexed).count();
        if indexed_count != topics.len() - 1 {
            return Err(CodecError::Decode(format!(
                "{} expects {} indexed topics, got {}",
                event.name,
                indexed_count,
                topics.len() - 1
            )));
        }

        let body: Vec<Param> = event
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| Param {
                name: p.name.clone(),
                ty: p.ty.clone(),
            })
            .collect();
        let mut body_values = decode_params(&body, data)?.into_iter();
        let mut indexed_topics = topics[1..].iter();

        let mut args = Vec::with_capacity(event.inputs.len());
        for (index, param) in event.inputs.iter().enumerate() {
            let value = if param.indexed {
                let topic = indexed_topics
                    .next()
                    .ok_or_else(|| CodecError::Decode("missing indexed topic".into()))?;
                decode_topic(topic, &param.ty)?
            } else {
                let value = body_values
                    .next()
                    .ok_or_else(|| CodecError::Decode("missing event data".into()))?;
                to_json(&value, &param.ty)
            };
            args.push(DecodedArg {
                name: positional_name(&param.name, index),
                kind: param.ty.canonical(),
                value,
            });
        }

        Ok(Some(DecodedItem {
            name: event.name.clone(),
            signature: event.signature(),
            args,
        }))
    }

    fn decode_calldata(
        &self,
        functions: &[&FunctionItem],
        data: &[u8],
    ) -> Result<Option<DecodedItem>, CodecError> {
        if data.len() < 4 {
            return Ok(None);
        }
        let Some(function) = functions
            .iter()
            .find(|f| self.selector(&f.signature()) == data[..4])
        else {
            return Ok(None);
        };

        let values = decode_params(&function.inputs, &data[4..])?;
        Ok(Some(decoded(
            &function.name,
            function.signature(),
            &function.inputs,
            values,
        )))
    }

    fn decode_function_result(
        &self,
        function: &FunctionItem,
        data: &[u8],
    ) -> Result<Vec<Value>, CodecError> {
        let values = decode_params(&function.outputs, data)?;
        Ok(function
            .outputs
            .iter()
            .zip(values.iter())
            .map(|(param, value)| to_json(value, &param.ty))
            .collect())
    }
}

fn builtin_error(name: &str, param: &str, ty: AbiType) -> ErrorItem {
    ErrorItem {
        name: name.to_string(),
        inputs: vec![Param {
            name: param.to_string(),
            ty,
        }],
    }
}

fn decoded(name: &str, signature: String, params: &[Param], values: Vec<DynSolValue>) -> DecodedItem {
    let args = params
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(index, (param, value))| DecodedArg {
            name: positional_name(&param.name, index),
            kind: param.ty.canonical(),
            value: to_json(value, &param.ty),
        })
        .collect();

    DecodedItem {
        name: name.to_string(),
        signature,
        args,
    }
}

/// Decode `data` as the parameter tuple of `params`
fn decode_params(params: &[Param], data: &[u8]) -> Result<Vec<DynSolValue>, CodecError> {
    if params.is_empty() {
        return Ok(Vec::new());
    }

    let types = params
        .iter()
        .map(|p| dyn_type(&p.ty))
        .collect::<Result<Vec<_>, _>>()?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    match decoded {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Indexed parameters of dynamic or compound type only carry their hash
fn decode_topic(topic: &[u8; 32], ty: &AbiType) -> Result<Value, CodecError> {
    if ty.is_hashed_in_topic() {
        return Ok(Value::String(format!("0x{}", hex::encode(topic))));
    }
    let value = dyn_type(ty)?
        .abi_decode(topic)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(to_json(&value, ty))
}

pub(crate) fn dyn_type(ty: &AbiType) -> Result<DynSolType, CodecError> {
    Ok(match ty {
        AbiType::Uint(bits) => DynSolType::Uint(*bits),
        AbiType::Int(bits) => DynSolType::Int(*bits),
        AbiType::Address => DynSolType::Address,
        AbiType::Bool => DynSolType::Bool,
        AbiType::FixedBytes(size) => DynSolType::FixedBytes(*size),
        AbiType::Bytes => DynSolType::Bytes,
        AbiType::String => DynSolType::String,
        AbiType::Opaque(name) => DynSolType::parse(name)
            .map_err(|_| CodecError::UnsupportedType(name.clone()))?,
        AbiType::Array { element, length } => {
            let element = Box::new(dyn_type(element)?);
            match length {
                ArrayLength::Dynamic => DynSolType::Array(element),
                ArrayLength::Fixed(len) => DynSolType::FixedArray(element, *len),
            }
        }
        AbiType::Tuple(components) => DynSolType::Tuple(
            components
                .iter()
                .map(|c| dyn_type(&c.ty))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

fn invalid(ty: &AbiType, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidValue {
        ty: ty.canonical(),
        reason: reason.into(),
    }
}

/// Text of a JSON scalar; numbers are accepted where strings are expected
fn scalar_text<'v>(value: &'v Value, ty: &AbiType) -> Result<std::borrow::Cow<'v, str>, CodecError> {
    match value {
        Value::String(s) => Ok(std::borrow::Cow::Borrowed(s.trim())),
        Value::Number(n) => Ok(std::borrow::Cow::Owned(n.to_string())),
        other => Err(invalid(ty, format!("expected a scalar, got {}", other))),
    }
}

fn hex_bytes(text: &str, ty: &AbiType) -> Result<Vec<u8>, CodecError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|e| invalid(ty, e.to_string()))
}

/// JSON value (as produced by the coercer) to an alloy value of type `ty`
pub(crate) fn to_dyn_value(value: &Value, ty: &AbiType) -> Result<DynSolValue, CodecError> {
    match ty {
        AbiType::Uint(bits) => {
            let text = scalar_text(value, ty)?;
            let parsed = U256::from_str(&text).map_err(|e| invalid(ty, e.to_string()))?;
            if parsed.bit_len() > *bits {
                return Err(invalid(ty, format!("{} does not fit in {} bits", text, bits)));
            }
            Ok(DynSolValue::Uint(parsed, *bits))
        }

        AbiType::Int(bits) => {
            let text = scalar_text(value, ty)?;
            let parsed = I256::from_str(&text).map_err(|e| invalid(ty, e.to_string()))?;
            if *bits < 256 {
                let limit = U256::from(1u8) << (*bits - 1);
                let magnitude = parsed.unsigned_abs();
                let fits = if parsed.is_negative() {
                    magnitude <= limit
                } else {
                    magnitude < limit
                };
                if !fits {
                    return Err(invalid(ty, format!("{} does not fit in {} bits", text, bits)));
                }
            }
            Ok(DynSolValue::Int(parsed, *bits))
        }

        AbiType::Address => {
            let text = scalar_text(value, ty)?;
            let address = Address::from_str(&text).map_err(|e| invalid(ty, e.to_string()))?;
            Ok(DynSolValue::Address(address))
        }

        AbiType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s.trim() == "true" => Ok(DynSolValue::Bool(true)),
            Value::String(s) if s.trim() == "false" => Ok(DynSolValue::Bool(false)),
            other => Err(invalid(ty, format!("expected a boolean, got {}", other))),
        },

        AbiType::FixedBytes(size) => {
            let bytes = hex_bytes(&scalar_text(value, ty)?, ty)?;
            if bytes.len() != *size {
                return Err(invalid(ty, format!("expected {} bytes, got {}", size, bytes.len())));
            }
            Ok(DynSolValue::FixedBytes(B256::right_padding_from(&bytes), *size))
        }

        AbiType::Bytes => Ok(DynSolValue::Bytes(hex_bytes(&scalar_text(value, ty)?, ty)?)),

        AbiType::String => match value {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            other => Ok(DynSolValue::String(other.to_string())),
        },

        AbiType::Opaque(name) => {
            let parsed = DynSolType::parse(name)
                .map_err(|_| CodecError::UnsupportedType(name.clone()))?;
            parsed
                .coerce_str(&scalar_text(value, ty)?)
                .map_err(|e| invalid(ty, e.to_string()))
        }

        AbiType::Array { element, length } => {
            let Value::Array(items) = value else {
                return Err(invalid(ty, "expected a JSON array"));
            };
            if let ArrayLength::Fixed(len) = length {
                if items.len() != *len {
                    return Err(invalid(ty, format!("expected {} items, got {}", len, items.len())));
                }
            }
            let values = items
                .iter()
                .map(|item| to_dyn_value(item, element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match length {
                ArrayLength::Dynamic => DynSolValue::Array(values),
                ArrayLength::Fixed(_) => DynSolValue::FixedArray(values),
            })
        }

        AbiType::Tuple(components) => tuple_value(value, components, ty),
    }
}

/// Tuples are given either positionally or as an object keyed by component name
fn tuple_value(
    value: &Value,
    components: &[Component],
    ty: &AbiType,
) -> Result<DynSolValue, CodecError> {
    let fields: Vec<&Value> = match value {
        Value::Array(items) => {
            if items.len() != components.len() {
                return Err(invalid(
                    ty,
                    format!("expected {} fields, got {}", components.len(), items.len()),
                ));
            }
            items.iter().collect()
        }
        Value::Object(map) => components
            .iter()
            .enumerate()
            .map(|(index, c)| {
                map.get(&positional_name(&c.name, index))
                    .ok_or_else(|| invalid(ty, format!("missing field {}", c.name)))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(invalid(ty, "expected a JSON array or object")),
    };

    let values = components
        .iter()
        .zip(fields)
        .map(|(c, field)| to_dyn_value(field, &c.ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DynSolValue::Tuple(values))
}

/// Decoded alloy value to JSON: integers as decimal strings, bytes as hex,
/// tuples as objects keyed by component name
pub(crate) fn to_json(value: &DynSolValue, ty: &AbiType) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            let bytes = &word.as_slice()[..(*size).min(32)];
            Value::String(format!("0x{}", hex::encode(bytes)))
        }
        DynSolValue::Address(addr) => Value::String(addr.to_checksum(None)),
        DynSolValue::Function(func) => Value::String(format!("0x{}", hex::encode(func.as_slice()))),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            let element = match ty {
                AbiType::Array { element, .. } => element.as_ref(),
                other => other,
            };
            Value::Array(items.iter().map(|item| to_json(item, element)).collect())
        }
        DynSolValue::Tuple(fields) => match ty {
            AbiType::Tuple(components) if components.len() == fields.len() => {
                let object: Map<String, Value> = components
                    .iter()
                    .zip(fields)
                    .enumerate()
                    .map(|(index, (c, field))| {
                        (positional_name(&c.name, index), to_json(field, &c.ty))
                    })
                    .collect();
                Value::Object(object)
            }
            other => Value::Array(fields.iter().map(|f| to_json(f, other)).collect()),
        },
    }
}
