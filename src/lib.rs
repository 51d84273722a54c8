//! BTC Bridge Ledger - Accounting Core of a Bitcoin Bridge
//!
//! Turns externally observed Bitcoin transactions into authenticated
//! balance changes. Library only: no node, no network, no key management.
//!
//! ## Components
//!
//! 1. **SPV Verifier** - Merkle inclusion and proof-of-work depth of a transaction
//! 2. **Deposit Registry** - Revealed deposits and their funding scripts
//! 3. **Sweep Processor** - Settles proven sweeps: fee split, bank credits, vault batches
//! 4. **Optimistic Minting** - Fronted mints recorded as debt, repaid by sweeps
//! 5. **Governance** - Two-phase delayed updates of every tunable
//!
//! ## Supporting
//!
//! - `bank` - satoshi balances and the vault capability
//! - `wallet` - wallet states and main UTXO commitments
//! - `storage` - snapshot persistence (memory, SQLite)
//! - `bridge` - the facade that owns all of the above

// Ambient
pub mod common;
pub mod types;

// Core modules
pub mod bank;
pub mod bridge;
pub mod deposit;
pub mod governance;
pub mod minting;
pub mod spv;
pub mod storage;
pub mod sweep;
pub mod wallet;

// Re-exports: Facade
pub use bridge::{create_shared_bridge, Bridge, SharedBridge};

// Re-exports: Common
pub use common::{
    BridgeConfig, BridgeError, Clock, ConfigError, ErrorCategory, ManualClock, Network, Result,
    SystemClock,
};

// Re-exports: Domain types
pub use types::{
    AccountId, BitcoinTx, BridgeEvent, DepositKey, DepositRequest, DepositRevealInfo, SpvProof,
    Utxo, Wallet, WalletState,
};

// Re-exports: SPV
pub use spv::{DifficultyOracle, EpochDifficulty, SpvError, SpvVerifier};

// Re-exports: Sweeps and minting
pub use minting::{OptimisticMintingVault, Role};
pub use sweep::{SweepSummary, SweptDeposit};

// Re-exports: Governance
pub use governance::{BridgeParameters, ParameterKey};

// Re-exports: Storage
pub use storage::{BridgeSnapshot, MemoryStateStore, SqliteStateStore, StateStore, StorageError};
