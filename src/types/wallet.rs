//! Wallet Types
//!
//! Wallet lifecycle belongs to the wallet registry. The ledger reads the
//! state and owns only the main UTXO commitment.

use serde::{Deserialize, Serialize};

/// 20-byte public key hash identifying a wallet
pub type PubKeyHash = [u8; 20];

/// Lifecycle state reported by the wallet registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WalletState {
    #[default]
    Unknown,
    Live,
    MovingFunds,
    Closing,
    Closed,
    Terminated,
}

impl WalletState {
    /// Whether new deposits may target the wallet
    pub fn accepts_deposits(&self) -> bool {
        matches!(self, WalletState::Live)
    }

    /// Whether sweeps of already revealed deposits are accepted
    pub fn accepts_sweeps(&self) -> bool {
        matches!(self, WalletState::Live | WalletState::MovingFunds)
    }
}

impl std::fmt::Display for WalletState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Live => "live",
            Self::MovingFunds => "moving_funds",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for WalletState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "live" => Ok(Self::Live),
            "moving_funds" => Ok(Self::MovingFunds),
            "closing" => Ok(Self::Closing),
            "closed" => Ok(Self::Closed),
            "terminated" => Ok(Self::Terminated),
            _ => Err(format!("unknown wallet state: {}", s)),
        }
    }
}

/// A wallet as seen by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(with = "hex::serde")]
    pub pub_key_hash: PubKeyHash,
    pub state: WalletState,
    /// Commitment to the wallet's current main UTXO, if it has one
    pub main_utxo_hash: Option<[u8; 32]>,
}

impl Wallet {
    pub fn new(pub_key_hash: PubKeyHash, state: WalletState) -> Self {
        Self {
            pub_key_hash,
            state,
            main_utxo_hash: None,
        }
    }
}
