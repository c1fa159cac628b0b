//! Invocation controller - read calls and write transactions per method
//!
//! Each method moves `Idle -> Pending -> Succeeded | Failed`. A second
//! invocation of a method that is still `Pending` is rejected, while different
//! methods run independently. Loading a new ABI bumps a generation counter;
//! completions that started under an older generation are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::{BindingContext, WalletEvent};
use crate::domain::abi::{
    AbiSchema, ArgumentCoercer, ChainCodec, DecodeError, DecodedItem, FunctionItem,
    InvocationError, MethodKey, MethodRegistry, MethodState, MethodStatus, SchemaError,
};
use crate::domain::decode::DecodeDispatcher;
use crate::domain::invoke::ports::{ChainClient, ProviderError, WalletProvider};
use crate::domain::units::parse_ether;

/// Loaded schema plus the registry built from it
struct Loaded {
    schema: Arc<AbiSchema>,
    registry: MethodRegistry,
}

#[derive(Default)]
struct Session {
    generation: u64,
    loaded: Option<Loaded>,
}

/// What an invocation captured when it left `Idle`. Dropped without
/// `complete` (the caller abandoned the future), it puts the method back to
/// `Idle`.
struct Ticket<'c> {
    session: &'c Mutex<Session>,
    generation: u64,
    key: MethodKey,
    function: FunctionItem,
    settled: bool,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.generation != self.generation {
            return;
        }
        if let Some(state) = session
            .loaded
            .as_mut()
            .and_then(|l| l.registry.state_mut(self.key.as_str()))
        {
            if state.status == MethodStatus::Pending {
                debug!(key = %self.key, "invocation cancelled");
                state.status = MethodStatus::Idle;
            }
        }
    }
}

enum Outcome {
    Value(String),
    Transaction(String),
}

pub struct InvocationController {
    codec: Arc<dyn ChainCodec>,
    clients: HashMap<u64, Arc<dyn ChainClient>>,
    wallet: Option<Arc<dyn WalletProvider>>,
    session: Mutex<Session>,
    binding: Mutex<BindingContext>,
}

impl InvocationController {
    pub fn new(codec: Arc<dyn ChainCodec>, binding: BindingContext) -> Self {
        Self {
            codec,
            clients: HashMap::new(),
            wallet: None,
            session: Mutex::new(Session::default()),
            binding: Mutex::new(binding),
        }
    }

    /// Register a chain client under its chain id
    pub fn with_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.clients.insert(client.chain_id(), client);
        self
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletProvider>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    // === Schema ===

    /// Replace the loaded ABI; all method state of the previous one is discarded
    pub fn load_schema(&self, document: Value) -> Result<(), SchemaError> {
        self.install(AbiSchema::parse(document))
    }

    pub fn load_schema_str(&self, text: &str) -> Result<(), SchemaError> {
        self.install(AbiSchema::parse_str(text))
    }

    fn install(&self, parsed: Result<AbiSchema, SchemaError>) -> Result<(), SchemaError> {
        let mut session = self.session();
        session.generation += 1;
        match parsed {
            Ok(schema) => {
                let registry = MethodRegistry::build(&schema, self.codec.as_ref());
                info!(
                    generation = session.generation,
                    reads = registry.reads().count(),
                    writes = registry.writes().count(),
                    errors = registry.errors().len(),
                    "ABI loaded"
                );
                session.loaded = Some(Loaded {
                    schema: Arc::new(schema),
                    registry,
                });
                Ok(())
            }
            Err(err) => {
                warn!(generation = session.generation, %err, "ABI rejected");
                session.loaded = None;
                Err(err)
            }
        }
    }

    /// Bumped on every load attempt
    pub fn generation(&self) -> u64 {
        self.session().generation
    }

    pub fn schema(&self) -> Option<Arc<AbiSchema>> {
        self.session().loaded.as_ref().map(|l| l.schema.clone())
    }

    /// Run `f` against the current registry
    pub fn with_registry<R>(&self, f: impl FnOnce(&MethodRegistry) -> R) -> Option<R> {
        self.session().loaded.as_ref().map(|l| f(&l.registry))
    }

    pub fn resolve_method(&self, key_or_name: &str) -> Result<MethodKey, InvocationError> {
        self.session()
            .loaded
            .as_ref()
            .ok_or(InvocationError::NoSchema)?
            .registry
            .resolve(key_or_name)
    }

    pub fn method_state(&self, key: &str) -> Option<MethodState> {
        self.session()
            .loaded
            .as_ref()
            .and_then(|l| l.registry.state(key).cloned())
    }

    pub fn set_input(
        &self,
        key: &str,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), InvocationError> {
        self.session()
            .loaded
            .as_mut()
            .ok_or(InvocationError::NoSchema)?
            .registry
            .set_input(key, index, text)
    }

    pub fn set_payable_value(
        &self,
        key: &str,
        text: impl Into<String>,
    ) -> Result<(), InvocationError> {
        self.session()
            .loaded
            .as_mut()
            .ok_or(InvocationError::NoSchema)?
            .registry
            .set_payable_value(key, text)
    }

    // === Binding ===

    pub fn binding(&self) -> BindingContext {
        self.binding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point at another contract, keeping the wallet's active fields
    pub fn retarget(
        &self,
        chain_id: u64,
        address: impl Into<String>,
        bound_wallet: Option<String>,
    ) {
        let mut binding = self.binding.lock().unwrap_or_else(PoisonError::into_inner);
        binding.target_chain_id = chain_id;
        binding.target_contract_address = address.into();
        binding.bound_wallet_address = bound_wallet;
    }

    pub fn handle_wallet_event(&self, event: WalletEvent) {
        debug!(?event, "wallet event");
        self.binding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(event);
    }

    /// Pull the wallet's current account and network
    pub async fn sync_wallet(&self) -> Result<(), InvocationError> {
        let Some(wallet) = self.wallet.clone() else {
            return Ok(());
        };
        let account = wallet.account().await.map_err(provider_error)?;
        let chain_id = wallet.chain_id().await.map_err(provider_error)?;

        self.handle_wallet_event(WalletEvent::AccountChanged(account));
        if let Some(chain_id) = chain_id {
            self.handle_wallet_event(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    /// Apply wallet events until the provider closes the stream
    pub async fn follow_wallet(&self) -> Result<(), InvocationError> {
        let Some(wallet) = self.wallet.clone() else {
            return Ok(());
        };
        let mut events = wallet.subscribe().await.map_err(provider_error)?;
        while let Some(event) = events.recv().await {
            self.handle_wallet_event(event);
        }
        Ok(())
    }

    /// Ask the wallet to move to the target chain; no-op when already there
    pub async fn ensure_chain(&self) -> Result<(), InvocationError> {
        let binding = self.binding();
        if !binding.chain_mismatch() {
            return Ok(());
        }
        let wallet = self
            .wallet
            .clone()
            .ok_or_else(|| InvocationError::ChainSwitchFailed("no wallet provider".into()))?;

        info!(
            active = ?binding.active_chain_id,
            target = binding.target_chain_id,
            "requesting network switch"
        );
        wallet
            .switch_chain(binding.target_chain_id)
            .await
            .map_err(|e| InvocationError::ChainSwitchFailed(e.to_string()))?;
        let active = wallet
            .chain_id()
            .await
            .map_err(|e| InvocationError::ChainSwitchFailed(e.to_string()))?;
        if let Some(chain_id) = active {
            self.handle_wallet_event(WalletEvent::ChainChanged(chain_id));
        }

        let binding = self.binding();
        if binding.chain_mismatch() {
            return Err(InvocationError::ChainSwitchRequired {
                active: binding.active_chain_id,
                target: binding.target_chain_id,
            });
        }
        Ok(())
    }

    // === Invocation ===

    /// Call a read method, returning the formatted result
    pub async fn invoke_read(&self, key: &str) -> Result<String, InvocationError> {
        let ticket = self.begin(key)?;
        let outcome = self.run_read(&ticket).await;
        self.complete(ticket, outcome)
    }

    /// Send a write transaction, returning its hash
    pub async fn invoke_write(&self, key: &str) -> Result<String, InvocationError> {
        let ticket = self.begin(key)?;
        let outcome = self.run_write(&ticket).await;
        self.complete(ticket, outcome)
    }

    async fn run_read(&self, ticket: &Ticket<'_>) -> Result<Outcome, InvocationError> {
        let binding = self.binding();
        let client = self.client_for(binding.target_chain_id)?;
        let (args, _) = self.prepare(ticket)?;

        debug!(key = %ticket.key, chain_id = binding.target_chain_id, "eth_call");
        let value = client
            .read_contract(&ticket.function, &binding.target_contract_address, &args)
            .await
            .map_err(provider_error)?;
        Ok(Outcome::Value(format_result(&value)))
    }

    async fn run_write(&self, ticket: &Ticket<'_>) -> Result<Outcome, InvocationError> {
        let binding = self.binding();
        let from = binding
            .active_wallet_address
            .clone()
            .ok_or(InvocationError::WalletNotConnected)?;
        if binding.wallet_mismatch() {
            return Err(InvocationError::WalletMismatch {
                active: from,
                bound: binding.bound_wallet_address.unwrap_or_default(),
            });
        }
        if binding.chain_mismatch() {
            self.ensure_chain().await?;
        }

        let binding = self.binding();
        let client = self.client_for(binding.target_chain_id)?;
        let (args, value) = self.prepare(ticket)?;

        info!(key = %ticket.key, %from, ?value, "sending transaction");
        let hash = client
            .write_contract(
                &ticket.function,
                &binding.target_contract_address,
                &from,
                &args,
                value,
            )
            .await
            .map_err(provider_error)?;
        Ok(Outcome::Transaction(hash))
    }

    /// Guard against a second in-flight call and move the method to `Pending`
    fn begin(&self, key_or_name: &str) -> Result<Ticket<'_>, InvocationError> {
        let mut session = self.session();
        let generation = session.generation;
        let loaded = session.loaded.as_mut().ok_or(InvocationError::NoSchema)?;
        let key = loaded.registry.resolve(key_or_name)?;
        let function = loaded
            .registry
            .method(key.as_str())
            .map(|m| m.function.clone())
            .ok_or_else(|| InvocationError::UnknownMethod(key.to_string()))?;
        let state = loaded
            .registry
            .state_mut(key.as_str())
            .ok_or_else(|| InvocationError::UnknownMethod(key.to_string()))?;

        if state.status == MethodStatus::Pending {
            return Err(InvocationError::AlreadyInFlight(key.to_string()));
        }
        state.status = MethodStatus::Pending;
        debug!(%key, generation, "invocation pending");

        Ok(Ticket {
            session: &self.session,
            generation,
            key,
            function,
            settled: false,
        })
    }

    /// Coerce the method's current inputs and payable value
    fn prepare(&self, ticket: &Ticket<'_>) -> Result<(Vec<Value>, Option<u128>), InvocationError> {
        let session = self.session();
        let state = session
            .loaded
            .as_ref()
            .filter(|_| session.generation == ticket.generation)
            .and_then(|l| l.registry.state(ticket.key.as_str()))
            .ok_or(InvocationError::SchemaReplaced)?;

        let args = ArgumentCoercer::build_arguments(state, &ticket.function.inputs)?;
        let value = match state.payable_value.as_deref().map(str::trim) {
            Some(text) if ticket.function.is_payable() && !text.is_empty() => {
                Some(parse_ether(text).map_err(InvocationError::InvalidPayableValue)?)
            }
            _ => None,
        };
        Ok((args, value))
    }

    /// Record the outcome unless the schema was replaced meanwhile
    fn complete(
        &self,
        mut ticket: Ticket<'_>,
        outcome: Result<Outcome, InvocationError>,
    ) -> Result<String, InvocationError> {
        ticket.settled = true;
        let mut session = self.session();
        if session.generation != ticket.generation {
            debug!(key = %ticket.key, "dropping completion from a replaced ABI");
            return Err(InvocationError::SchemaReplaced);
        }
        let Some(state) = session
            .loaded
            .as_mut()
            .and_then(|l| l.registry.state_mut(ticket.key.as_str()))
        else {
            return Err(InvocationError::SchemaReplaced);
        };

        match outcome {
            Ok(Outcome::Value(result)) => {
                state.status = MethodStatus::Succeeded;
                state.result = Some(result.clone());
                state.error = None;
                Ok(result)
            }
            Ok(Outcome::Transaction(hash)) => {
                state.status = MethodStatus::Succeeded;
                state.transaction_hash = Some(hash.clone());
                state.error = None;
                Ok(hash)
            }
            Err(err) => {
                debug!(key = %ticket.key, %err, "invocation failed");
                state.status = MethodStatus::Failed;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn client_for(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, InvocationError> {
        self.clients
            .get(&chain_id)
            .cloned()
            .ok_or(InvocationError::UnsupportedChain(chain_id))
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Decoding ===

    pub fn decode_error(&self, data: &[u8]) -> Result<DecodedItem, DecodeError> {
        self.with_dispatcher(|d| d.decode_error(data))
    }

    pub fn decode_event(&self, topics: &[[u8; 32]], data: &[u8]) -> Result<DecodedItem, DecodeError> {
        self.with_dispatcher(|d| d.decode_event(topics, data))
    }

    pub fn decode_calldata(&self, data: &[u8]) -> Result<DecodedItem, DecodeError> {
        self.with_dispatcher(|d| d.decode_calldata(data))
    }

    pub fn decode_return(
        &self,
        selector_or_name: &str,
        data: &[u8],
    ) -> Result<DecodedItem, DecodeError> {
        self.with_dispatcher(|d| d.decode_return(selector_or_name, data))
    }

    fn with_dispatcher<R>(
        &self,
        f: impl FnOnce(&DecodeDispatcher<'_>) -> Result<R, DecodeError>,
    ) -> Result<R, DecodeError> {
        let session = self.session();
        let loaded = session.loaded.as_ref().ok_or(DecodeError::NoSchema)?;
        let dispatcher = DecodeDispatcher::new(&loaded.schema, &loaded.registry, self.codec.as_ref());
        f(&dispatcher)
    }
}

fn provider_error(err: ProviderError) -> InvocationError {
    InvocationError::Provider(err.to_string())
}

/// Bare strings (decimal integers, addresses) as-is, structures as pretty JSON
pub fn format_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
