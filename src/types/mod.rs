//! Shared Types Module
//!
//! Data types shared across the ledger.

pub mod bitcoin_tx;
pub mod deposit;
pub mod events;
pub mod identity;
pub mod units;
pub mod wallet;

// Re-exports for convenience
pub use bitcoin_tx::{BitcoinTx, SpvProof, Utxo};
pub use deposit::{DepositRequest, DepositRevealInfo};
pub use events::{BridgeEvent, EventLog};
pub use identity::{AccountId, DepositKey, IdentityParseError};
pub use units::{
    parse_sats, sats_to_btc_string, sats_to_display, sats_to_token_units, token_units_to_display,
    token_units_to_sats, SATOSHI_MULTIPLIER, SATS_PER_BTC,
};
pub use wallet::{PubKeyHash, Wallet, WalletState};
