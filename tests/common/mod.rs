//! Shared fixtures: a token ABI plus mock chain client and wallet
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::{mpsc, Semaphore};

use prod::core::{BindingContext, WalletEvent};
use prod::domain::abi::FunctionItem;
use prod::domain::invoke::{ChainClient, InvocationController, ProviderError, WalletProvider};
use prod::infrastructure::AlloyCodec;

pub const TOKEN: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const OTHER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub const TOKEN_ABI: &str = r#"[
  {"type":"function","name":"balanceOf","stateMutability":"view",
   "inputs":[{"name":"owner","type":"address"}],
   "outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"totalSupply","stateMutability":"view",
   "inputs":[],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"name","stateMutability":"view",
   "inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"position","stateMutability":"view",
   "inputs":[{"name":"id","type":"uint256"}],
   "outputs":[{"name":"owner","type":"address"},{"name":"size","type":"uint128"}]},
  {"type":"function","name":"transfer","stateMutability":"nonpayable",
   "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
   "outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"deposit","stateMutability":"payable","inputs":[],"outputs":[]},
  {"type":"event","name":"Transfer","anonymous":false,"inputs":[
    {"name":"from","type":"address","indexed":true},
    {"name":"to","type":"address","indexed":true},
    {"name":"value","type":"uint256","indexed":false}]},
  {"type":"error","name":"InsufficientBalance","inputs":[
    {"name":"available","type":"uint256"},
    {"name":"required","type":"uint256"}]}
]"#;

#[derive(Debug, Clone, PartialEq)]
pub struct ReadCall {
    pub signature: String,
    pub address: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    pub signature: String,
    pub address: String,
    pub from: String,
    pub args: Vec<Value>,
    pub value: Option<u128>,
}

/// Chain client that records calls; reads can be held at a gate
pub struct MockClient {
    chain_id: u64,
    responses: HashMap<String, Value>,
    failure: Option<String>,
    gate: Option<Arc<Semaphore>>,
    entered: Option<mpsc::UnboundedSender<String>>,
    pub reads: Mutex<Vec<ReadCall>>,
    pub writes: Mutex<Vec<WriteCall>>,
}

impl MockClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            responses: HashMap::new(),
            failure: None,
            gate: None,
            entered: None,
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, name: &str, value: Value) -> Self {
        self.responses.insert(name.to_string(), value);
        self
    }

    /// Every call fails with a provider rejection
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Reads report their signature on entry, then wait for a gate permit
    pub fn gated(mut self) -> (Self, Arc<Semaphore>, mpsc::UnboundedReceiver<String>) {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        self.gate = Some(gate.clone());
        self.entered = Some(tx);
        (self, gate, rx)
    }

    pub fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }

    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChainClient for MockClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn read_contract(
        &self,
        function: &FunctionItem,
        address: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError> {
        self.reads.lock().unwrap().push(ReadCall {
            signature: function.signature(),
            address: address.to_string(),
            args: args.to_vec(),
        });
        if let Some(entered) = &self.entered {
            let _ = entered.send(function.signature());
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(message) = &self.failure {
            return Err(ProviderError::Rejected(message.clone()));
        }
        Ok(self
            .responses
            .get(&function.name)
            .cloned()
            .unwrap_or_else(|| json!("1000")))
    }

    async fn write_contract(
        &self,
        function: &FunctionItem,
        address: &str,
        from: &str,
        args: &[Value],
        value: Option<u128>,
    ) -> Result<String, ProviderError> {
        self.writes.lock().unwrap().push(WriteCall {
            signature: function.signature(),
            address: address.to_string(),
            from: from.to_string(),
            args: args.to_vec(),
            value,
        });
        if let Some(message) = &self.failure {
            return Err(ProviderError::Rejected(message.clone()));
        }
        Ok(format!("0x{}", "ab".repeat(32)))
    }
}

/// How the mock wallet answers a network switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchBehavior {
    Accept,
    Reject,
    /// Succeeds but stays on the old network
    Ignore,
}

pub struct MockWallet {
    account: Mutex<Option<String>>,
    chain_id: Mutex<Option<u64>>,
    switch: SwitchBehavior,
    events: Mutex<Vec<WalletEvent>>,
    pub switch_requests: Mutex<Vec<u64>>,
}

impl MockWallet {
    pub fn new(account: Option<&str>, chain_id: Option<u64>) -> Self {
        Self {
            account: Mutex::new(account.map(str::to_string)),
            chain_id: Mutex::new(chain_id),
            switch: SwitchBehavior::Accept,
            events: Mutex::new(Vec::new()),
            switch_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn on_switch(mut self, behavior: SwitchBehavior) -> Self {
        self.switch = behavior;
        self
    }

    /// Events delivered by the next `subscribe`
    pub fn with_events(self, events: Vec<WalletEvent>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    pub fn switch_requests(&self) -> Vec<u64> {
        self.switch_requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl WalletProvider for MockWallet {
    async fn account(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.account.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> Result<Option<u64>, ProviderError> {
        Ok(*self.chain_id.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.switch_requests.lock().unwrap().push(chain_id);
        match self.switch {
            SwitchBehavior::Accept => {
                *self.chain_id.lock().unwrap() = Some(chain_id);
                Ok(())
            }
            SwitchBehavior::Reject => Err(ProviderError::Rejected("user rejected".into())),
            SwitchBehavior::Ignore => Ok(()),
        }
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<WalletEvent>, ProviderError> {
        let events: Vec<_> = self.events.lock().unwrap().drain(..).collect();
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }
}

/// Controller bound to the token on chain 1 with the token ABI loaded
pub fn token_controller(binding: BindingContext, client: Arc<MockClient>) -> InvocationController {
    let controller =
        InvocationController::new(Arc::new(AlloyCodec::new()), binding).with_client(client);
    controller.load_schema_str(TOKEN_ABI).unwrap();
    controller
}

/// Binding whose wallet is already on the target chain
pub fn connected(account: &str) -> BindingContext {
    let mut binding = BindingContext::new(1, TOKEN);
    binding.apply(WalletEvent::ChainChanged(1));
    binding.apply(WalletEvent::AccountChanged(Some(account.to_string())));
    binding
}
