//! Wallet provider backed by a node's managed accounts

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::providers::Provider;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::WalletEvent;
use crate::domain::invoke::{ProviderError, WalletProvider};
use crate::infrastructure::ethereum::provider::{connect_http, HttpFillProvider};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Uses the first account the node manages, or a pinned one
pub struct NodeWallet {
    provider: HttpFillProvider,
    pinned: Option<Address>,
}

impl NodeWallet {
    pub fn connect_http(url: &str, pinned: Option<&str>) -> Result<Self> {
        let pinned = pinned
            .map(|a| Address::from_str(a.trim()).context("Invalid wallet account"))
            .transpose()?;
        Ok(Self {
            provider: connect_http(url)?,
            pinned,
        })
    }
}

/// Account and network seen on one poll
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    account: Option<String>,
    chain_id: u64,
}

async fn observe(
    provider: &HttpFillProvider,
    pinned: Option<Address>,
) -> Result<Observed, ProviderError> {
    let accounts = provider
        .get_accounts()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;
    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;
    Ok(Observed {
        account: select_account(&accounts, pinned),
        chain_id,
    })
}

/// The pinned account if the node manages it, else the first one
fn select_account(accounts: &[Address], pinned: Option<Address>) -> Option<String> {
    match pinned {
        Some(pinned) => accounts.iter().find(|a| **a == pinned),
        None => accounts.first(),
    }
    .map(|a| a.to_checksum(None))
}

/// Poll every `interval` and forward what changed, until the receiver is gone
async fn poll_changes<F, Fut>(tx: mpsc::Sender<WalletEvent>, interval: Duration, mut poll: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed, ProviderError>>,
{
    let mut ticker = tokio::time::interval(interval);
    let mut last: Option<Observed> = None;
    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!("wallet subscriber dropped, poller stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let events = match poll().await {
            Ok(current) => {
                let events = changes(last.as_ref(), &current);
                last = Some(current);
                events
            }
            Err(err) => {
                debug!(%err, "wallet poll failed");
                match last.take() {
                    Some(_) => vec![WalletEvent::Disconnected],
                    None => Vec::new(),
                }
            }
        };
        for event in events {
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

/// Events that move `previous` to `current`
fn changes(previous: Option<&Observed>, current: &Observed) -> Vec<WalletEvent> {
    let mut events = Vec::new();
    if previous.map(|p| &p.account) != Some(&current.account) {
        events.push(WalletEvent::AccountChanged(current.account.clone()));
    }
    if previous.map(|p| p.chain_id) != Some(current.chain_id) {
        events.push(WalletEvent::ChainChanged(current.chain_id));
    }
    events
}

#[async_trait::async_trait]
impl WalletProvider for NodeWallet {
    async fn account(&self) -> Result<Option<String>, ProviderError> {
        let accounts = self
            .provider
            .get_accounts()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(select_account(&accounts, self.pinned))
    }

    async fn chain_id(&self) -> Result<Option<u64>, ProviderError> {
        self.provider
            .get_chain_id()
            .await
            .map(Some)
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let params = [json!({ "chainId": format!("0x{:x}", chain_id) })];
        let _: Value = self
            .provider
            .raw_request("wallet_switchEthereumChain".into(), params)
            .await
            .map_err(|e| ProviderError::Rejected(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<WalletEvent>, ProviderError> {
        let (tx, rx) = mpsc::channel(16);
        let provider = self.provider.clone();
        let pinned = self.pinned;

        tokio::spawn(poll_changes(tx, POLL_INTERVAL, move || {
            let provider = provider.clone();
            async move { observe(&provider, pinned).await }
        }));

        if self.pinned.is_some() {
            debug!(pinned = ?self.pinned, "wallet follows pinned account");
        } else {
            warn!("no wallet account pinned, using the node's first account");
        }
        Ok(rx)
    }
}
