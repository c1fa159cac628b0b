//! Method registry - classifies functions and owns per-method state

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::codec::ChainCodec;
use super::schema::{AbiSchema, ErrorItem, FunctionItem};
use super::InvocationError;

/// Canonical `name(type1,type2,...)` key of a function or error
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey(String);

impl MethodKey {
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name part of the key
    pub fn name(&self) -> &str {
        self.0.split_once('(').map(|(name, _)| name).unwrap_or(&self.0)
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MethodKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Read methods are `pure`/`view`; everything else is a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Read,
    Write,
}

/// Invocation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MethodStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// User inputs and last outcome of one method
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodState {
    /// Raw text per parameter, positional
    pub inputs: Vec<String>,
    /// Decimal ether amount; `Some` only for payable methods
    pub payable_value: Option<String>,
    pub status: MethodStatus,
    pub result: Option<String>,
    pub transaction_hash: Option<String>,
    pub error: Option<String>,
}

impl MethodState {
    pub fn new(param_count: usize, payable: bool) -> Self {
        Self {
            inputs: vec![String::new(); param_count],
            payable_value: payable.then(String::new),
            ..Self::default()
        }
    }
}

/// A classified function with its cached selector
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub key: MethodKey,
    pub function: FunctionItem,
    pub kind: MethodKind,
    pub selector: [u8; 4],
}

impl MethodEntry {
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

/// An error item with its cached selector
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub key: MethodKey,
    pub error: ErrorItem,
    pub selector: [u8; 4],
}

/// Registry of methods built from one schema
///
/// Note: when two items share a key, the first declaration wins and the key
/// is recorded in [`MethodRegistry::collisions`].
#[derive(Debug, Default)]
pub struct MethodRegistry {
    reads: Vec<MethodKey>,
    writes: Vec<MethodKey>,
    methods: HashMap<MethodKey, MethodEntry>,
    states: HashMap<MethodKey, MethodState>,
    errors: Vec<ErrorEntry>,
    collisions: Vec<MethodKey>,
}

impl MethodRegistry {
    /// Classify every function and error of `schema`
    pub fn build(schema: &AbiSchema, codec: &dyn ChainCodec) -> Self {
        let mut registry = Self::default();

        for function in schema.functions() {
            let signature = function.signature();
            let key = MethodKey::new(signature.clone());
            if registry.methods.contains_key(&key) {
                warn!(%key, "duplicate function signature, keeping first declaration");
                registry.collisions.push(key);
                continue;
            }

            let kind = if function.is_read() {
                MethodKind::Read
            } else {
                MethodKind::Write
            };
            match kind {
                MethodKind::Read => registry.reads.push(key.clone()),
                MethodKind::Write => registry.writes.push(key.clone()),
            }
            registry.states.insert(
                key.clone(),
                MethodState::new(function.inputs.len(), function.is_payable()),
            );
            registry.methods.insert(
                key.clone(),
                MethodEntry {
                    key,
                    function: function.clone(),
                    kind,
                    selector: codec.selector(&signature),
                },
            );
        }

        for error in schema.errors() {
            let signature = error.signature();
            let key = MethodKey::new(signature.clone());
            if registry.errors.iter().any(|e| e.key == key) {
                warn!(%key, "duplicate error signature, keeping first declaration");
                registry.collisions.push(key);
                continue;
            }
            registry.errors.push(ErrorEntry {
                key,
                error: error.clone(),
                selector: codec.selector(&signature),
            });
        }

        registry
    }

    /// Read methods in declaration order
    pub fn reads(&self) -> impl Iterator<Item = &MethodEntry> {
        self.reads.iter().filter_map(|k| self.methods.get(k))
    }

    /// Write methods in declaration order
    pub fn writes(&self) -> impl Iterator<Item = &MethodEntry> {
        self.writes.iter().filter_map(|k| self.methods.get(k))
    }

    /// Error items in declaration order
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Keys declared more than once
    pub fn collisions(&self) -> &[MethodKey] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn method(&self, key: &str) -> Option<&MethodEntry> {
        self.methods.get(key)
    }

    /// Cached selector of a function or error key
    pub fn selector(&self, key: &str) -> Option<[u8; 4]> {
        self.methods.get(key).map(|m| m.selector).or_else(|| {
            self.errors
                .iter()
                .find(|e| e.key.as_str() == key)
                .map(|e| e.selector)
        })
    }

    /// Resolve a full key, or a bare name when only one overload exists
    pub fn resolve(&self, key_or_name: &str) -> Result<MethodKey, InvocationError> {
        if let Some(entry) = self.methods.get(key_or_name) {
            return Ok(entry.key.clone());
        }

        let mut matches = self
            .reads
            .iter()
            .chain(self.writes.iter())
            .filter(|k| k.name() == key_or_name);
        match (matches.next(), matches.next()) {
            (Some(key), None) => Ok(key.clone()),
            (Some(_), Some(_)) => Err(InvocationError::AmbiguousMethod(key_or_name.into())),
            _ => Err(InvocationError::UnknownMethod(key_or_name.into())),
        }
    }

    pub fn state(&self, key: &str) -> Option<&MethodState> {
        self.states.get(key)
    }

    pub(crate) fn state_mut(&mut self, key: &str) -> Option<&mut MethodState> {
        self.states.get_mut(key)
    }

    /// Set the raw text of one positional input
    pub fn set_input(
        &mut self,
        key: &str,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), InvocationError> {
        let state = self
            .states
            .get_mut(key)
            .ok_or_else(|| InvocationError::UnknownMethod(key.into()))?;
        let len = state.inputs.len();
        let slot = state
            .inputs
            .get_mut(index)
            .ok_or(InvocationError::InputOutOfRange { index, len })?;
        *slot = text.into();
        Ok(())
    }

    /// Set the ether amount sent with a payable method
    pub fn set_payable_value(
        &mut self,
        key: &str,
        text: impl Into<String>,
    ) -> Result<(), InvocationError> {
        let state = self
            .states
            .get_mut(key)
            .ok_or_else(|| InvocationError::UnknownMethod(key.into()))?;
        match state.payable_value.as_mut() {
            Some(value) => {
                *value = text.into();
                Ok(())
            }
            None => Err(InvocationError::NotPayable(key.into())),
        }
    }
}
