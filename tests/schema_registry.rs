mod common;

use std::sync::Arc;

use serde_json::json;

use common::*;
use prod::core::BindingContext;
use prod::domain::abi::{
    AbiSchema, AbiType, ArgumentCoercer, CoercionError, InvocationError, MethodKind,
    MethodRegistry, SchemaError,
};
use prod::domain::invoke::InvocationController;
use prod::infrastructure::AlloyCodec;

const BALANCE_OF_ABI: &str = r#"[{"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}]"#;

#[test]
fn test_round_trip_scenario() {
    let schema = AbiSchema::parse_str(BALANCE_OF_ABI).unwrap();
    let registry = MethodRegistry::build(&schema, &AlloyCodec::new());

    let entry = registry.method("balanceOf(address)").unwrap();
    assert_eq!(entry.kind, MethodKind::Read);
    assert_eq!(entry.selector_hex(), "0x70a08231");

    let ty = &entry.function.inputs[0].ty;
    let value =
        ArgumentCoercer::coerce("0xAbC0000000000000000000000000000000000DeF", ty).unwrap();
    assert_eq!(value, json!("0xabc0000000000000000000000000000000000def"));
    assert_eq!(
        ArgumentCoercer::coerce("notanaddress", ty),
        Err(CoercionError::InvalidAddress("notanaddress".into()))
    );
}

#[test]
fn test_wrapped_documents() {
    let artifact = json!({"contractName": "Token", "abi": serde_json::from_str::<serde_json::Value>(BALANCE_OF_ABI).unwrap()});
    assert_eq!(AbiSchema::parse(artifact).unwrap().functions().count(), 1);

    let explorer = json!({"status": "1", "result": BALANCE_OF_ABI});
    assert_eq!(AbiSchema::parse(explorer).unwrap().functions().count(), 1);

    let stringified = serde_json::to_string(BALANCE_OF_ABI).unwrap();
    assert_eq!(AbiSchema::parse_str(&stringified).unwrap().functions().count(), 1);
}

#[test]
fn test_malformed_documents() {
    assert!(matches!(AbiSchema::parse(json!([])), Err(SchemaError::MalformedAbi(_))));
    assert!(matches!(AbiSchema::parse(json!(42)), Err(SchemaError::MalformedAbi(_))));
    assert!(matches!(
        AbiSchema::parse(json!([{"type": "function", "name": "f", "inputs": [{"name": "x", "type": "tuple"}]}])),
        Err(SchemaError::MalformedAbi(_))
    ));
}

#[test]
fn test_token_registry_partition() {
    let schema = AbiSchema::parse_str(TOKEN_ABI).unwrap();
    let registry = MethodRegistry::build(&schema, &AlloyCodec::new());

    let reads: Vec<_> = registry.reads().map(|m| m.key.to_string()).collect();
    let writes: Vec<_> = registry.writes().map(|m| m.key.to_string()).collect();
    assert_eq!(
        reads,
        vec!["balanceOf(address)", "totalSupply()", "name()", "position(uint256)"]
    );
    assert_eq!(writes, vec!["transfer(address,uint256)", "deposit()"]);
    assert_eq!(registry.len(), schema.functions().count());

    assert_eq!(
        registry.selector("transfer(address,uint256)"),
        Some([0xa9, 0x05, 0x9c, 0xbb])
    );
    assert_eq!(registry.selector("totalSupply()"), Some([0x18, 0x16, 0x0d, 0xdd]));
    assert!(registry.selector("InsufficientBalance(uint256,uint256)").is_some());
    assert!(registry.collisions().is_empty());
}

#[test]
fn test_legacy_mutability_flags() {
    let schema = AbiSchema::parse(json!([
        {"name": "owner", "constant": true, "inputs": [], "outputs": [{"name": "", "type": "address"}]},
        {"type": "function", "name": "buy", "payable": true, "inputs": [], "outputs": []},
        {"type": "function", "name": "ping", "inputs": [], "outputs": []}
    ]))
    .unwrap();
    let registry = MethodRegistry::build(&schema, &AlloyCodec::new());

    assert_eq!(registry.method("owner()").unwrap().kind, MethodKind::Read);
    assert!(registry.method("buy()").unwrap().function.is_payable());
    assert_eq!(registry.method("ping()").unwrap().kind, MethodKind::Write);
}

#[test]
fn test_tuple_and_alias_signatures() {
    let schema = AbiSchema::parse(json!([
        {"type": "function", "name": "submit", "stateMutability": "nonpayable",
         "inputs": [
            {"name": "orders", "type": "tuple[]", "components": [
                {"name": "maker", "type": "address"},
                {"name": "amount", "type": "uint"}
            ]},
            {"name": "nonce", "type": "int"}
         ],
         "outputs": []}
    ]))
    .unwrap();
    let registry = MethodRegistry::build(&schema, &AlloyCodec::new());
    assert!(registry.method("submit((address,uint256)[],int256)").is_some());
}

#[test]
fn test_examples_and_placeholders() {
    let address = AbiType::resolve("address", None).unwrap();
    assert_eq!(
        ArgumentCoercer::placeholder(&address),
        "0x0000000000000000000000000000000000000000"
    );
    let list = AbiType::resolve("uint256[]", None).unwrap();
    assert_eq!(ArgumentCoercer::example_value(&list), json!(["0"]));
    assert_eq!(ArgumentCoercer::placeholder(&list), r#"["0"]"#);
    let flag = AbiType::resolve("bool", None).unwrap();
    assert_eq!(ArgumentCoercer::placeholder(&flag), "false");
}

#[tokio::test]
async fn test_controller_rejects_bad_document_and_bumps_generation() {
    let controller = InvocationController::new(
        Arc::new(AlloyCodec::new()),
        BindingContext::new(1, TOKEN),
    );
    assert_eq!(controller.generation(), 0);

    controller.load_schema_str(TOKEN_ABI).unwrap();
    assert_eq!(controller.generation(), 1);
    assert!(controller.schema().is_some());

    assert!(controller.load_schema(json!({"abi": "nope"})).is_err());
    assert_eq!(controller.generation(), 2);
    assert!(controller.schema().is_none());
    assert_eq!(
        controller.resolve_method("balanceOf"),
        Err(InvocationError::NoSchema)
    );
}

#[tokio::test]
async fn test_controller_method_lookup() {
    let controller = token_controller(BindingContext::new(1, TOKEN), Arc::new(MockClient::new(1)));
    assert_eq!(
        controller.resolve_method("transfer").unwrap().as_str(),
        "transfer(address,uint256)"
    );
    assert_eq!(
        controller.resolve_method("mint"),
        Err(InvocationError::UnknownMethod("mint".into()))
    );
    assert_eq!(
        controller.set_input("balanceOf(address)", 3, "x"),
        Err(InvocationError::InputOutOfRange { index: 3, len: 1 })
    );
    assert_eq!(
        controller.with_registry(|r| r.writes().count()),
        Some(2)
    );
}
