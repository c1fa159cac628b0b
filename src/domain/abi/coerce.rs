//! Text input to codec-ready values
//!
//! Values are `serde_json::Value`s shaped the way the chain codec expects:
//! integers as decimal strings (no precision loss), addresses as lower-case hex,
//! booleans as JSON booleans, and arrays/tuples as the JSON the user typed.

use serde_json::{Map, Value};

use super::registry::MethodState;
use super::schema::Param;
use super::types::{positional_name, AbiType};
use super::{ArgumentError, CoercionError};

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Type-directed conversion of user text
pub struct ArgumentCoercer;

impl ArgumentCoercer {
    /// Convert one text input for `ty`.
    ///
    /// Arrays and tuples are parsed as JSON and handed to the codec as-is;
    /// their leaves are not checked here. Booleans never fail: only `true`
    /// and `1` are true. Integer width is not checked here either.
    pub fn coerce(text: &str, ty: &AbiType) -> Result<Value, CoercionError> {
        if text.is_empty() {
            return Err(CoercionError::EmptyArgument);
        }

        match ty {
            AbiType::Array { .. } | AbiType::Tuple(_) => serde_json::from_str(text)
                .map_err(|e| CoercionError::InvalidJson(e.to_string())),

            AbiType::Uint(_) | AbiType::Int(_) => normalize_integer(text.trim())
                .map(Value::String)
                .ok_or_else(|| CoercionError::InvalidNumber(text.to_string())),

            AbiType::Address => {
                let lowered = text.trim().to_lowercase();
                if is_hex_address(&lowered) {
                    Ok(Value::String(lowered))
                } else {
                    Err(CoercionError::InvalidAddress(text.to_string()))
                }
            }

            AbiType::Bool => {
                let text = text.trim();
                Ok(Value::Bool(text == "true" || text == "1"))
            }

            AbiType::String
            | AbiType::Bytes
            | AbiType::FixedBytes(_)
            | AbiType::Opaque(_) => Ok(Value::String(text.to_string())),
        }
    }

    /// Canonical placeholder value for `ty`; never fails
    pub fn example_value(ty: &AbiType) -> Value {
        match ty {
            AbiType::Uint(_) | AbiType::Int(_) => Value::String("0".into()),
            AbiType::Address => Value::String(ZERO_ADDRESS.into()),
            AbiType::Bool => Value::Bool(false),
            AbiType::Bytes | AbiType::FixedBytes(_) => Value::String("0x".into()),
            AbiType::String | AbiType::Opaque(_) => Value::String(String::new()),
            AbiType::Array { element, .. } => Value::Array(vec![Self::example_value(element)]),
            AbiType::Tuple(components) => {
                let mut object = Map::new();
                for (index, component) in components.iter().enumerate() {
                    object.insert(
                        positional_name(&component.name, index),
                        Self::example_value(&component.ty),
                    );
                }
                Value::Object(object)
            }
        }
    }

    /// The example rendered as the text a user would type
    pub fn placeholder(ty: &AbiType) -> String {
        match Self::example_value(ty) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Coerce a method's positional inputs, stopping at the first failure
    pub fn build_arguments(
        state: &MethodState,
        inputs: &[Param],
    ) -> Result<Vec<Value>, ArgumentError> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let text = state.inputs.get(index).map(String::as_str).unwrap_or("");
                Self::coerce(text, &param.ty).map_err(|source| ArgumentError {
                    index,
                    name: positional_name(&param.name, index),
                    source,
                })
            })
            .collect()
    }
}

/// Canonical decimal form: optional `-`, no leading zeros
fn normalize_integer(text: &str) -> Option<String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some("0".into());
    }
    Some(if negative {
        format!("-{significant}")
    } else {
        significant.to_string()
    })
}

fn is_hex_address(lowered: &str) -> bool {
    lowered.len() == 42
        && lowered.starts_with("0x")
        && lowered[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::types::{ArrayLength, Component};
    use serde_json::json;

    fn tuple() -> AbiType {
        AbiType::Tuple(vec![
            Component {
                name: "to".into(),
                ty: AbiType::Address,
            },
            Component {
                name: "".into(),
                ty: AbiType::Array {
                    element: Box::new(AbiType::Uint(256)),
                    length: ArrayLength::Fixed(2),
                },
            },
        ])
    }

    #[test]
    fn test_empty_text_is_rejected() {
        for ty in [AbiType::Bool, AbiType::String, AbiType::Uint(8), tuple()] {
            assert_eq!(
                ArgumentCoercer::coerce("", &ty),
                Err(CoercionError::EmptyArgument)
            );
        }
    }

    #[test]
    fn test_integers() {
        assert_eq!(
            ArgumentCoercer::coerce("000123", &AbiType::Uint(256)).unwrap(),
            json!("123")
        );
        assert_eq!(
            ArgumentCoercer::coerce("-42", &AbiType::Int(64)).unwrap(),
            json!("-42")
        );
        // No width check at this layer
        assert_eq!(
            ArgumentCoercer::coerce("99999999999999999999999", &AbiType::Uint(8)).unwrap(),
            json!("99999999999999999999999")
        );
        assert!(matches!(
            ArgumentCoercer::coerce("12a", &AbiType::Uint(256)),
            Err(CoercionError::InvalidNumber(_))
        ));
        assert!(matches!(
            ArgumentCoercer::coerce("1.5", &AbiType::Int(256)),
            Err(CoercionError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_address_is_lowercased() {
        let value = ArgumentCoercer::coerce(
            "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01",
            &AbiType::Address,
        )
        .unwrap();
        assert_eq!(value, json!("0xabcdef0123456789abcdef0123456789abcdef01"));

        assert!(matches!(
            ArgumentCoercer::coerce("notanaddress", &AbiType::Address),
            Err(CoercionError::InvalidAddress(_))
        ));
        assert!(matches!(
            ArgumentCoercer::coerce("0x1234", &AbiType::Address),
            Err(CoercionError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_bool_is_permissive() {
        assert_eq!(ArgumentCoercer::coerce("true", &AbiType::Bool).unwrap(), json!(true));
        assert_eq!(ArgumentCoercer::coerce("1", &AbiType::Bool).unwrap(), json!(true));
        assert_eq!(ArgumentCoercer::coerce("TRUE", &AbiType::Bool).unwrap(), json!(false));
        assert_eq!(ArgumentCoercer::coerce("yes", &AbiType::Bool).unwrap(), json!(false));
    }

    #[test]
    fn test_compound_types_take_json() {
        let value = ArgumentCoercer::coerce(r#"["0x01", [1, "2"]]"#, &tuple()).unwrap();
        assert_eq!(value, json!(["0x01", [1, "2"]]));
        assert!(matches!(
            ArgumentCoercer::coerce("[1,2", &tuple()),
            Err(CoercionError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_passthrough_types() {
        assert_eq!(
            ArgumentCoercer::coerce(" hello ", &AbiType::String).unwrap(),
            json!(" hello ")
        );
        assert_eq!(
            ArgumentCoercer::coerce("0xdead", &AbiType::Bytes).unwrap(),
            json!("0xdead")
        );
        assert_eq!(ArgumentCoercer::coerce(" ", &AbiType::String).unwrap(), json!(" "));
    }

    #[test]
    fn test_blank_text_fails_per_type() {
        assert!(matches!(
            ArgumentCoercer::coerce("  ", &AbiType::Uint(256)),
            Err(CoercionError::InvalidNumber(_))
        ));
        assert!(matches!(
            ArgumentCoercer::coerce(" ", &AbiType::Address),
            Err(CoercionError::InvalidAddress(_))
        ));
        assert_eq!(ArgumentCoercer::coerce(" ", &AbiType::Bool).unwrap(), json!(false));
    }

    #[test]
    fn test_coerce_is_deterministic() {
        for text in ["7", "x", "", "0xAB"] {
            assert_eq!(
                ArgumentCoercer::coerce(text, &AbiType::Uint(256)),
                ArgumentCoercer::coerce(text, &AbiType::Uint(256))
            );
        }
    }

    #[test]
    fn test_example_value_shape() {
        let ty = AbiType::Array {
            element: Box::new(tuple()),
            length: ArrayLength::Dynamic,
        };
        assert_eq!(
            ArgumentCoercer::example_value(&ty),
            json!([{ "to": ZERO_ADDRESS, "arg1": ["0"] }])
        );
        assert_eq!(ArgumentCoercer::placeholder(&AbiType::Bytes), "0x");
        assert_eq!(ArgumentCoercer::placeholder(&AbiType::Bool), "false");
    }

    #[test]
    fn test_build_arguments_reports_failing_parameter() {
        let inputs = vec![
            Param {
                name: "to".into(),
                ty: AbiType::Address,
            },
            Param {
                name: "amount".into(),
                ty: AbiType::Uint(256),
            },
        ];
        let mut state = MethodState::new(2, false);
        state.inputs[0] = ZERO_ADDRESS.into();
        state.inputs[1] = "lots".into();

        let err = ArgumentCoercer::build_arguments(&state, &inputs).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.name, "amount");

        state.inputs[1] = "10".into();
        let args = ArgumentCoercer::build_arguments(&state, &inputs).unwrap();
        assert_eq!(args, vec![json!(ZERO_ADDRESS), json!("10")]);
    }
}
