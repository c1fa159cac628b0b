//! ABI document loading
//!
//! Accepts the standard JSON ABI (an array of items), artifact-style objects
//! wrapping it (`{"abi": [...]}`, explorer `{"result": "..."}` responses), and
//! JSON-encoded strings of either.

use serde::Deserialize;
use serde_json::Value;

use super::types::{AbiType, Component};
use super::SchemaError;

/// How many wrapper layers (objects or JSON strings) are peeled before giving up
const MAX_UNWRAP_DEPTH: usize = 4;

/// Object fields that may hold the item array
const WRAPPER_KEYS: &[&str] = &["abi", "result"];

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::Nonpayable => "nonpayable",
            StateMutability::Payable => "payable",
        }
    }
}

/// A named parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: AbiType,
}

/// A named event parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub ty: AbiType,
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionItem {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub mutability: StateMutability,
}

impl FunctionItem {
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.ty))
    }

    /// `pure` and `view` functions never change chain state
    pub fn is_read(&self) -> bool {
        matches!(
            self.mutability,
            StateMutability::Pure | StateMutability::View
        )
    }

    pub fn is_payable(&self) -> bool {
        self.mutability == StateMutability::Payable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventItem {
    pub name: String,
    pub inputs: Vec<EventParam>,
    pub anonymous: bool,
}

impl EventItem {
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.ty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorItem {
    pub name: String,
    pub inputs: Vec<Param>,
}

impl ErrorItem {
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.ty))
    }
}

/// One entry of an ABI document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiItem {
    Function(FunctionItem),
    Event(EventItem),
    Error(ErrorItem),
    Constructor { inputs: Vec<Param> },
    Fallback,
    Receive,
}

/// A parsed ABI document with per-kind indices
#[derive(Debug, Clone, Default)]
pub struct AbiSchema {
    items: Vec<AbiItem>,
    functions: Vec<usize>,
    events: Vec<usize>,
    errors: Vec<usize>,
}

impl AbiSchema {
    /// Parse an ABI document from text
    pub fn parse_str(text: &str) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::MalformedAbi(format!("document is not JSON: {e}")))?;
        Self::parse(document)
    }

    /// Parse an ABI document
    pub fn parse(document: Value) -> Result<Self, SchemaError> {
        let raw_items = unwrap_document(document, 0)?;
        if raw_items.is_empty() {
            return Err(SchemaError::MalformedAbi("ABI document is empty".into()));
        }

        let mut schema = AbiSchema::default();
        for (index, raw) in raw_items.into_iter().enumerate() {
            let raw: RawItem = serde_json::from_value(raw)
                .map_err(|e| SchemaError::MalformedAbi(format!("item #{index}: {e}")))?;
            let Some(item) = raw
                .into_item()
                .map_err(|e| e.in_item(index))?
            else {
                continue;
            };

            let slot = schema.items.len();
            match &item {
                AbiItem::Function(_) => schema.functions.push(slot),
                AbiItem::Event(_) => schema.events.push(slot),
                AbiItem::Error(_) => schema.errors.push(slot),
                _ => {}
            }
            schema.items.push(item);
        }

        Ok(schema)
    }

    /// All items in declaration order
    pub fn items(&self) -> &[AbiItem] {
        &self.items
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionItem> {
        self.functions.iter().filter_map(|&i| match &self.items[i] {
            AbiItem::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &EventItem> {
        self.events.iter().filter_map(|&i| match &self.items[i] {
            AbiItem::Event(e) => Some(e),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorItem> {
        self.errors.iter().filter_map(|&i| match &self.items[i] {
            AbiItem::Error(e) => Some(e),
            _ => None,
        })
    }
}

/// Build `name(type1,type2,...)`
pub fn signature<'a>(name: &str, types: impl Iterator<Item = &'a AbiType>) -> String {
    let types: Vec<String> = types.map(AbiType::canonical).collect();
    format!("{}({})", name, types.join(","))
}

fn unwrap_document(document: Value, depth: usize) -> Result<Vec<Value>, SchemaError> {
    if depth > MAX_UNWRAP_DEPTH {
        return Err(SchemaError::MalformedAbi(format!(
            "no item array found within {MAX_UNWRAP_DEPTH} wrapper levels"
        )));
    }

    match document {
        Value::Array(items) => Ok(items),
        Value::String(text) => {
            let inner: Value = serde_json::from_str(&text).map_err(|e| {
                SchemaError::MalformedAbi(format!("embedded ABI string is not JSON: {e}"))
            })?;
            unwrap_document(inner, depth + 1)
        }
        Value::Object(mut fields) => {
            for key in WRAPPER_KEYS {
                if let Some(inner) = fields.remove(*key) {
                    return unwrap_document(inner, depth + 1);
                }
            }
            Err(SchemaError::MalformedAbi(
                "object does not wrap an item array".into(),
            ))
        }
        other => Err(SchemaError::MalformedAbi(format!(
            "expected an item array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// === Wire format ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default)]
    state_mutability: Option<String>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    ty: Option<String>,
    #[serde(default)]
    components: Option<Vec<RawParam>>,
    #[serde(default)]
    indexed: bool,
}

impl RawItem {
    /// `Ok(None)` for item kinds this engine does not know
    fn into_item(self) -> Result<Option<AbiItem>, SchemaError> {
        let kind = self.kind.as_deref().unwrap_or("function");
        let item = match kind {
            "function" => {
                let name = self.required_name()?;
                let mutability = self.mutability();
                AbiItem::Function(FunctionItem {
                    name,
                    inputs: params(&self.inputs)?,
                    outputs: params(&self.outputs)?,
                    mutability,
                })
            }
            "event" => {
                let name = self.required_name()?;
                let inputs = self
                    .inputs
                    .iter()
                    .map(|raw| {
                        Ok(EventParam {
                            name: raw.name.clone().unwrap_or_default(),
                            ty: raw.resolve()?,
                            indexed: raw.indexed,
                        })
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                AbiItem::Event(EventItem {
                    name,
                    inputs,
                    anonymous: self.anonymous,
                })
            }
            "error" => AbiItem::Error(ErrorItem {
                name: self.required_name()?,
                inputs: params(&self.inputs)?,
            }),
            "constructor" => AbiItem::Constructor {
                inputs: params(&self.inputs)?,
            },
            "fallback" => AbiItem::Fallback,
            "receive" => AbiItem::Receive,
            other => {
                tracing::warn!(kind = other, "skipping ABI item of unknown kind");
                return Ok(None);
            }
        };
        Ok(Some(item))
    }

    fn required_name(&self) -> Result<String, SchemaError> {
        self.name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| SchemaError::MalformedAbi("item has no name".into()))
    }

    /// `stateMutability` wins; older compilers only emit `constant`/`payable`
    fn mutability(&self) -> StateMutability {
        match self.state_mutability.as_deref() {
            Some("pure") => StateMutability::Pure,
            Some("view") => StateMutability::View,
            Some("payable") => StateMutability::Payable,
            Some(_) => StateMutability::Nonpayable,
            None if self.constant == Some(true) => StateMutability::View,
            None if self.payable == Some(true) => StateMutability::Payable,
            None => StateMutability::Nonpayable,
        }
    }
}

impl RawParam {
    fn resolve(&self) -> Result<AbiType, SchemaError> {
        let ty = self
            .ty
            .as_deref()
            .ok_or_else(|| SchemaError::MalformedAbi("parameter has no type".into()))?;
        let components = match &self.components {
            Some(raw) => Some(
                raw.iter()
                    .map(|c| {
                        Ok(Component {
                            name: c.name.clone().unwrap_or_default(),
                            ty: c.resolve()?,
                        })
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?,
            ),
            None => None,
        };
        AbiType::resolve(ty, components.as_deref())
    }
}

fn params(raw: &[RawParam]) -> Result<Vec<Param>, SchemaError> {
    raw.iter()
        .map(|p| {
            Ok(Param {
                name: p.name.clone().unwrap_or_default(),
                ty: p.resolve()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn balance_of() -> Value {
        json!([{
            "type": "function",
            "name": "balanceOf",
            "inputs": [{"name": "owner", "type": "address"}],
            "outputs": [{"name": "", "type": "uint256"}],
            "stateMutability": "view"
        }])
    }

    #[test]
    fn test_parse_plain_array() {
        let schema = AbiSchema::parse(balance_of()).unwrap();
        let functions: Vec<_> = schema.functions().collect();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].signature(), "balanceOf(address)");
        assert!(functions[0].is_read());
    }

    #[test]
    fn test_unwraps_artifact_and_strings() {
        let artifact = json!({ "contractName": "Token", "abi": balance_of() });
        assert_eq!(AbiSchema::parse(artifact).unwrap().functions().count(), 1);

        let encoded = Value::String(balance_of().to_string());
        assert_eq!(AbiSchema::parse(encoded).unwrap().functions().count(), 1);

        // Explorer responses carry the ABI as a string in `result`
        let explorer = json!({ "status": "1", "result": balance_of().to_string() });
        assert_eq!(AbiSchema::parse(explorer).unwrap().functions().count(), 1);
    }

    #[test]
    fn test_unwrap_depth_is_bounded() {
        let mut doc = balance_of();
        for _ in 0..=MAX_UNWRAP_DEPTH {
            doc = json!({ "abi": doc });
        }
        assert!(matches!(
            AbiSchema::parse(doc),
            Err(SchemaError::MalformedAbi(_))
        ));
    }

    #[test]
    fn test_empty_and_non_array_documents_fail() {
        assert!(AbiSchema::parse(json!([])).is_err());
        assert!(AbiSchema::parse(json!({ "name": "x" })).is_err());
        assert!(AbiSchema::parse(json!(42)).is_err());
        assert!(AbiSchema::parse_str("not json").is_err());
    }

    #[test]
    fn test_tuple_without_components_is_malformed() {
        let doc = json!([{
            "type": "function",
            "name": "submit",
            "inputs": [{"name": "order", "type": "tuple"}],
            "outputs": [],
            "stateMutability": "nonpayable"
        }]);
        let err = AbiSchema::parse(doc).unwrap_err();
        assert!(err.to_string().contains("item #0"));
    }

    #[test]
    fn test_legacy_mutability_flags() {
        let doc = json!([
            {"type": "function", "name": "a", "inputs": [], "outputs": [], "constant": true},
            {"type": "function", "name": "b", "inputs": [], "outputs": [], "payable": true},
            {"name": "c", "inputs": [], "outputs": []}
        ]);
        let schema = AbiSchema::parse(doc).unwrap();
        let kinds: Vec<_> = schema.functions().map(|f| f.mutability).collect();
        assert_eq!(
            kinds,
            vec![
                StateMutability::View,
                StateMutability::Payable,
                StateMutability::Nonpayable
            ]
        );
    }

    #[test]
    fn test_indices_by_kind() {
        let doc = json!([
            {"type": "constructor", "inputs": [{"name": "supply", "type": "uint256"}]},
            {"type": "event", "name": "Transfer", "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ], "anonymous": false},
            {"type": "error", "name": "Unauthorized", "inputs": []},
            {"type": "receive", "stateMutability": "payable"},
            {"type": "something-new", "name": "x"}
        ]);
        let schema = AbiSchema::parse(doc).unwrap();
        assert_eq!(schema.items().len(), 4);
        assert_eq!(schema.functions().count(), 0);
        let event = schema.events().next().unwrap();
        assert_eq!(event.signature(), "Transfer(address,address,uint256)");
        assert!(event.inputs[0].indexed);
        assert_eq!(schema.errors().next().unwrap().signature(), "Unauthorized()");
    }

    #[test]
    fn test_tuple_signature_is_flattened() {
        let doc = json!([{
            "type": "function",
            "name": "fill",
            "inputs": [{
                "name": "orders",
                "type": "tuple[]",
                "components": [
                    {"name": "maker", "type": "address"},
                    {"name": "amounts", "type": "uint[2]"}
                ]
            }],
            "outputs": [],
            "stateMutability": "nonpayable"
        }]);
        let schema = AbiSchema::parse(doc).unwrap();
        let function = schema.functions().next().unwrap();
        assert_eq!(function.signature(), "fill((address,uint256[2])[])");
    }
}
