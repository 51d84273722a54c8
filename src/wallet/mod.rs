//! Wallet Registry
//!
//! Wallet states are supplied from outside the ledger. The ledger itself only
//! writes main UTXO commitments, and records every commitment a sweep
//! consumes in an append-only spent set.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

use crate::types::{BridgeEvent, PubKeyHash, Wallet, WalletState};

#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    wallets: HashMap<PubKeyHash, Wallet>,
    spent_main_utxos: BTreeSet<[u8; 32]>,
}

/// Persisted form of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRegistryState {
    pub wallets: Vec<Wallet>,
    #[serde(with = "hex_list")]
    pub spent_main_utxos: Vec<[u8; 32]>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: WalletRegistryState) -> Self {
        Self {
            wallets: state
                .wallets
                .into_iter()
                .map(|w| (w.pub_key_hash, w))
                .collect(),
            spent_main_utxos: state.spent_main_utxos.into_iter().collect(),
        }
    }

    pub fn to_state(&self) -> WalletRegistryState {
        let mut wallets: Vec<Wallet> = self.wallets.values().cloned().collect();
        wallets.sort_by(|a, b| a.pub_key_hash.cmp(&b.pub_key_hash));
        WalletRegistryState {
            wallets,
            spent_main_utxos: self.spent_main_utxos.iter().copied().collect(),
        }
    }

    pub fn get(&self, pub_key_hash: &PubKeyHash) -> Option<&Wallet> {
        self.wallets.get(pub_key_hash)
    }

    /// State of a wallet; unregistered wallets are `Unknown`
    pub fn state_of(&self, pub_key_hash: &PubKeyHash) -> WalletState {
        self.get(pub_key_hash).map(|w| w.state).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Record a state reported by the wallet lifecycle, registering the
    /// wallet on first sight
    pub fn set_state(&mut self, pub_key_hash: PubKeyHash, state: WalletState) -> BridgeEvent {
        self.wallets
            .entry(pub_key_hash)
            .or_insert_with(|| Wallet::new(pub_key_hash, state))
            .state = state;

        BridgeEvent::WalletStateUpdated {
            wallet_pub_key_hash: pub_key_hash,
            state,
        }
    }

    pub fn is_spent(&self, commitment: &[u8; 32]) -> bool {
        self.spent_main_utxos.contains(commitment)
    }

    /// Move a wallet's main UTXO to the sweep output
    pub(crate) fn record_sweep(
        &mut self,
        pub_key_hash: &PubKeyHash,
        consumed: Option<[u8; 32]>,
        new_main_utxo: [u8; 32],
    ) {
        if let Some(commitment) = consumed {
            self.spent_main_utxos.insert(commitment);
        }
        if let Some(wallet) = self.wallets.get_mut(pub_key_hash) {
            wallet.main_utxo_hash = Some(new_main_utxo);
        }
    }
}

mod hex_list {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.iter()
            .map(|s| {
                let mut out = [0u8; 32];
                hex::decode_to_slice(s, &mut out).map_err(serde::de::Error::custom)?;
                Ok(out)
            })
            .collect()
    }
}
