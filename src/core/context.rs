//! Binding between the loaded contract and the connected wallet

use serde::{Deserialize, Serialize};

/// Account or network change reported by the wallet provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
    /// Active account changed; `None` when the wallet locked or revoked access
    AccountChanged(Option<String>),
    /// Active network changed
    ChainChanged(u64),
    Disconnected,
}

/// Which contract is targeted and which wallet is active
///
/// Updated only through [`BindingContext::apply`]; everything else reads a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingContext {
    pub target_chain_id: u64,
    pub target_contract_address: String,
    /// Owner of the saved contract record; writes are only valid from it
    pub bound_wallet_address: Option<String>,
    pub active_chain_id: Option<u64>,
    pub active_wallet_address: Option<String>,
}

impl BindingContext {
    pub fn new(target_chain_id: u64, target_contract_address: impl Into<String>) -> Self {
        Self {
            target_chain_id,
            target_contract_address: target_contract_address.into(),
            ..Self::default()
        }
    }

    pub fn bound_to(mut self, wallet: impl Into<String>) -> Self {
        self.bound_wallet_address = Some(wallet.into());
        self
    }

    /// Wallet is not on the target chain (or reports no chain)
    pub fn chain_mismatch(&self) -> bool {
        self.active_chain_id != Some(self.target_chain_id)
    }

    /// A bound owner exists and the active wallet is not it (case-insensitive)
    pub fn wallet_mismatch(&self) -> bool {
        match (&self.bound_wallet_address, &self.active_wallet_address) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(bound), Some(active)) => !bound.eq_ignore_ascii_case(active),
        }
    }

    pub fn apply(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::AccountChanged(account) => self.active_wallet_address = account,
            WalletEvent::ChainChanged(chain_id) => self.active_chain_id = Some(chain_id),
            WalletEvent::Disconnected => {
                self.active_wallet_address = None;
                self.active_chain_id = None;
            }
        }
    }
}
