//! Bridge Facade
//!
//! Owns every ledger component and is the only entry point that mutates
//! them. Each operation reads the clock once, runs to completion or fails
//! without writing, records its events and logs rejections.
//!
//! # Flow:
//! 1. The owner marks a wallet Live
//! 2. A depositor reveals a funding output locked to the wallet
//! 3. Optionally, a minter requests and finalizes an optimistic mint
//! 4. A relayer submits the sweep proof; depositors, vaults and the treasury
//!    are credited and outstanding debt is repaid

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bank::{Bank, Vault, VaultRegistry, VaultSet};
use crate::common::clock::Clock;
use crate::common::config::{BridgeConfig, Network};
use crate::common::error::{BridgeError, Result};
use crate::common::logging::{generate_correlation_id, log_rejection};
use crate::deposit::{DepositRegistry, RevealContext};
use crate::governance::{BridgeParameters, Governance, ParameterKey, PendingUpdate};
use crate::minting::{MintingContext, OptimisticMintingRequest, OptimisticMintingVault};
use crate::spv::{DifficultyOracle, EpochDifficulty, SpvVerifier};
use crate::storage::{BridgeSnapshot, StateStore, SNAPSHOT_VERSION};
use crate::sweep::{SweepProcessor, SweepSummary};
use crate::types::{
    AccountId, BitcoinTx, BridgeEvent, DepositKey, DepositRequest, DepositRevealInfo, EventLog,
    PubKeyHash, SpvProof, Utxo, Wallet, WalletState,
};
use crate::wallet::WalletRegistry;

/// The bridge ledger
pub struct Bridge {
    network: Network,
    governance: Governance,
    deposits: DepositRegistry,
    wallets: WalletRegistry,
    bank: Bank,
    vaults: VaultRegistry,
    minting: OptimisticMintingVault,
    /// Owner-maintained epoch difficulties
    difficulty: EpochDifficulty,
    /// Replaces `difficulty` when set
    oracle: Option<Arc<dyn DifficultyOracle>>,
    verifier: SpvVerifier,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl Bridge {
    /// Create an empty ledger from configuration
    pub fn new(config: &BridgeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        config.log_summary();

        let mut vaults = VaultRegistry::new();
        vaults.set_trusted(config.vault_id, true);

        tracing::info!(
            target: "bridge::system",
            network = ?config.network,
            owner = %config.owner,
            vault = %config.vault_id,
            "bridge ledger created"
        );

        Ok(Self {
            network: config.network,
            governance: Governance::new(config.owner, config.treasury, config.parameters),
            deposits: DepositRegistry::new(),
            wallets: WalletRegistry::new(),
            bank: Bank::new(),
            vaults,
            minting: OptimisticMintingVault::new(config.vault_id),
            difficulty: EpochDifficulty::default(),
            oracle: None,
            verifier: SpvVerifier::new(config.network.bitcoin_network()),
            clock,
            events: EventLog::new(),
        })
    }

    /// Rebuild a ledger from a snapshot
    ///
    /// Network and vault identity come from configuration; everything else,
    /// including the owner, comes from the snapshot. External vault
    /// implementations must be registered again.
    pub fn from_snapshot(
        config: &BridgeConfig,
        clock: Arc<dyn Clock>,
        snapshot: BridgeSnapshot,
    ) -> Result<Self> {
        snapshot.check_version()?;

        let deposits = DepositRegistry::from_deposits(snapshot.deposits.into_iter().map(|d| {
            (
                DepositKey::derive(&d.funding_tx_hash, d.funding_output_index),
                d,
            )
        }));

        let mut vaults = VaultRegistry::new();
        for vault in snapshot.trusted_vaults {
            vaults.set_trusted(vault, true);
        }

        tracing::info!(
            target: "bridge::system",
            taken_at = snapshot.taken_at,
            deposits = deposits.len(),
            "bridge ledger restored from snapshot"
        );

        Ok(Self {
            network: config.network,
            governance: Governance::from_state(snapshot.governance),
            deposits,
            wallets: WalletRegistry::from_state(snapshot.wallets),
            bank: Bank::from_balances(snapshot.bank_balances),
            vaults,
            minting: OptimisticMintingVault::from_state(config.vault_id, snapshot.minting)?,
            difficulty: snapshot.epoch_difficulty,
            oracle: None,
            verifier: SpvVerifier::new(config.network.bitcoin_network()),
            clock,
            events: EventLog::new(),
        })
    }

    /// Use an external difficulty oracle instead of owner-maintained values
    pub fn with_difficulty_oracle(mut self, oracle: Arc<dyn DifficultyOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Every persisted surface, with deterministic ordering
    pub fn snapshot(&self) -> BridgeSnapshot {
        let mut deposits: Vec<(DepositKey, DepositRequest)> = self
            .deposits
            .iter()
            .map(|(key, deposit)| (*key, deposit.clone()))
            .collect();
        deposits.sort_by(|a, b| a.0.cmp(&b.0));

        let mut bank_balances: Vec<(AccountId, u64)> =
            self.bank.balances().map(|(a, b)| (*a, *b)).collect();
        bank_balances.sort();

        BridgeSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.clock.now(),
            governance: self.governance.to_state(),
            deposits: deposits.into_iter().map(|(_, d)| d).collect(),
            wallets: self.wallets.to_state(),
            bank_balances,
            trusted_vaults: self.vaults.trusted().iter().copied().collect(),
            epoch_difficulty: self.difficulty,
            minting: self.minting.to_state(),
        }
    }

    /// Save a snapshot to `store`
    pub async fn persist(&self, store: &dyn StateStore) -> Result<()> {
        store.save(&self.snapshot()).await?;
        Ok(())
    }

    /// Load the latest snapshot from `store`, if there is one
    pub async fn restore(
        config: &BridgeConfig,
        clock: Arc<dyn Clock>,
        store: &dyn StateStore,
    ) -> Result<Option<Self>> {
        match store.load().await? {
            Some(snapshot) => Ok(Some(Self::from_snapshot(config, clock, snapshot)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Deposits and sweeps
    // ========================================================================

    /// Record a deposit locked in `funding_tx`
    pub fn reveal_deposit(
        &mut self,
        funding_tx: &BitcoinTx,
        reveal: &DepositRevealInfo,
    ) -> Result<DepositKey> {
        let ctx = RevealContext {
            wallet: self.wallets.get(&reveal.wallet_pub_key_hash),
            params: self.governance.parameters(),
            trusted_vaults: self.vaults.trusted(),
            now: self.clock.now(),
        };
        let result = self
            .deposits
            .reveal(funding_tx, reveal, &ctx)
            .map(|(key, event)| (key, vec![event]));
        self.finish("reveal_deposit", result)
    }

    /// Settle the deposits swept by a proven transaction
    pub fn submit_sweep_proof(
        &mut self,
        sweep_tx: &BitcoinTx,
        proof: &SpvProof,
        main_utxo: Option<&Utxo>,
        vault: Option<AccountId>,
    ) -> Result<SweepSummary> {
        let oracle: &dyn DifficultyOracle = match &self.oracle {
            Some(oracle) => oracle.as_ref(),
            None => &self.difficulty,
        };
        let mut processor = SweepProcessor {
            verifier: &self.verifier,
            oracle,
            params: self.governance.parameters(),
            treasury: self.governance.treasury(),
            deposits: &mut self.deposits,
            wallets: &mut self.wallets,
            bank: &mut self.bank,
            vaults: VaultSet {
                builtin: &mut self.minting,
                registry: &mut self.vaults,
            },
            now: self.clock.now(),
        };
        let result = processor.submit_proof(sweep_tx, proof, main_utxo, vault);
        self.finish("submit_sweep_proof", result)
    }

    // ========================================================================
    // Optimistic minting
    // ========================================================================

    pub fn request_optimistic_mint(&mut self, caller: AccountId, deposit_key: DepositKey) -> Result<()> {
        let ctx = MintingContext {
            deposits: &self.deposits,
            params: self.governance.parameters(),
            treasury: self.governance.treasury(),
            now: self.clock.now(),
        };
        let result = self
            .minting
            .request(caller, deposit_key, &ctx)
            .map(|event| ((), vec![event]));
        self.finish("request_optimistic_mint", result)
    }

    pub fn finalize_optimistic_mint(&mut self, caller: AccountId, deposit_key: DepositKey) -> Result<()> {
        let ctx = MintingContext {
            deposits: &self.deposits,
            params: self.governance.parameters(),
            treasury: self.governance.treasury(),
            now: self.clock.now(),
        };
        let result = self
            .minting
            .finalize(caller, deposit_key, &ctx)
            .map(|event| ((), vec![event]));
        self.finish("finalize_optimistic_mint", result)
    }

    pub fn cancel_optimistic_mint(&mut self, caller: AccountId, deposit_key: DepositKey) -> Result<()> {
        let result = self
            .minting
            .cancel(caller, deposit_key)
            .map(|event| ((), vec![event]));
        self.finish("cancel_optimistic_mint", result)
    }

    pub fn add_minter(&mut self, caller: AccountId, minter: AccountId) -> Result<()> {
        let result = self.owner_only(caller, |bridge| bridge.minting.add_minter(minter));
        self.finish("add_minter", result)
    }

    pub fn remove_minter(&mut self, caller: AccountId, minter: AccountId) -> Result<()> {
        let result = self.owner_only(caller, |bridge| bridge.minting.remove_minter(minter));
        self.finish("remove_minter", result)
    }

    pub fn add_guardian(&mut self, caller: AccountId, guardian: AccountId) -> Result<()> {
        let result = self.owner_only(caller, |bridge| bridge.minting.add_guardian(guardian));
        self.finish("add_guardian", result)
    }

    pub fn remove_guardian(&mut self, caller: AccountId, guardian: AccountId) -> Result<()> {
        let result = self.owner_only(caller, |bridge| bridge.minting.remove_guardian(guardian));
        self.finish("remove_guardian", result)
    }

    pub fn pause_optimistic_minting(&mut self, caller: AccountId) -> Result<()> {
        let result = self.owner_only(caller, |bridge| bridge.minting.pause());
        self.finish("pause_optimistic_minting", result)
    }

    pub fn unpause_optimistic_minting(&mut self, caller: AccountId) -> Result<()> {
        let result = self.owner_only(caller, |bridge| bridge.minting.unpause());
        self.finish("unpause_optimistic_minting", result)
    }

    // ========================================================================
    // Governance
    // ========================================================================

    pub fn begin_parameter_update(&mut self, caller: AccountId, key: ParameterKey, value: u64) -> Result<()> {
        let now = self.clock.now();
        let result = self
            .governance
            .begin_parameter_update(caller, key, value, now)
            .map(|event| ((), vec![event]));
        self.finish("begin_parameter_update", result)
    }

    pub fn finalize_parameter_update(&mut self, caller: AccountId, key: ParameterKey) -> Result<()> {
        let now = self.clock.now();
        let result = self
            .governance
            .finalize_parameter_update(caller, key, now)
            .map(|event| ((), vec![event]));
        self.finish("finalize_parameter_update", result)
    }

    pub fn begin_treasury_update(&mut self, caller: AccountId, treasury: AccountId) -> Result<()> {
        let now = self.clock.now();
        let result = self
            .governance
            .begin_treasury_update(caller, treasury, now)
            .map(|event| ((), vec![event]));
        self.finish("begin_treasury_update", result)
    }

    pub fn finalize_treasury_update(&mut self, caller: AccountId) -> Result<()> {
        let now = self.clock.now();
        let result = self
            .governance
            .finalize_treasury_update(caller, now)
            .map(|event| ((), vec![event]));
        self.finish("finalize_treasury_update", result)
    }

    pub fn transfer_ownership(&mut self, caller: AccountId, new_owner: AccountId) -> Result<()> {
        let result = self
            .governance
            .transfer_ownership(caller, new_owner)
            .map(|event| ((), vec![event]));
        self.finish("transfer_ownership", result)
    }

    /// Record a wallet state reported by the wallet lifecycle
    pub fn set_wallet_state(
        &mut self,
        caller: AccountId,
        wallet_pub_key_hash: PubKeyHash,
        state: WalletState,
    ) -> Result<()> {
        let result = self.owner_only(caller, |bridge| {
            Ok(bridge.wallets.set_state(wallet_pub_key_hash, state))
        });
        self.finish("set_wallet_state", result)
    }

    pub fn set_vault_trust(&mut self, caller: AccountId, vault: AccountId, trusted: bool) -> Result<()> {
        let result = self.owner_only(caller, |bridge| {
            if vault.is_zero() {
                return Err(BridgeError::invalid_parameter("vault", "must not be the zero identity"));
            }
            bridge.vaults.set_trusted(vault, trusted);
            Ok(BridgeEvent::VaultStatusUpdated { vault, trusted })
        });
        self.finish("set_vault_trust", result)
    }

    /// Register an additional vault implementation; trust is granted separately
    pub fn register_vault(&mut self, caller: AccountId, vault: Box<dyn Vault>) -> Result<()> {
        let result = self.governance.ensure_owner(caller).and_then(|_| {
            if vault.id() == Vault::id(&self.minting) {
                return Err(BridgeError::invalid_parameter(
                    "vault",
                    "identity is taken by the optimistic minting vault",
                ));
            }
            tracing::info!(target: "bridge::governance", vault = %vault.id(), "vault registered");
            self.vaults.register(vault);
            Ok(((), Vec::new()))
        });
        self.finish("register_vault", result)
    }

    /// Set the difficulties of the current and previous epochs
    pub fn update_epoch_difficulty(&mut self, caller: AccountId, current: u128, previous: u128) -> Result<()> {
        let result = self.owner_only(caller, |bridge| {
            if current == 0 || previous == 0 {
                return Err(BridgeError::invalid_parameter(
                    "epoch_difficulty",
                    "must be greater than zero",
                ));
            }
            bridge.difficulty = EpochDifficulty::new(current, previous);
            Ok(BridgeEvent::EpochDifficultyUpdated { current, previous })
        });
        self.finish("update_epoch_difficulty", result)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn owner(&self) -> AccountId {
        self.governance.owner()
    }

    pub fn treasury(&self) -> AccountId {
        self.governance.treasury()
    }

    pub fn parameters(&self) -> &BridgeParameters {
        self.governance.parameters()
    }

    pub fn pending_parameter_update(&self, key: ParameterKey) -> Option<&PendingUpdate<u64>> {
        self.governance.pending_update(key)
    }

    pub fn pending_treasury_update(&self) -> Option<&PendingUpdate<AccountId>> {
        self.governance.pending_treasury()
    }

    pub fn deposit(&self, deposit_key: &DepositKey) -> Option<&DepositRequest> {
        self.deposits.get(deposit_key)
    }

    pub fn deposit_count(&self) -> usize {
        self.deposits.len()
    }

    pub fn wallet(&self, wallet_pub_key_hash: &PubKeyHash) -> Option<&Wallet> {
        self.wallets.get(wallet_pub_key_hash)
    }

    pub fn is_main_utxo_spent(&self, commitment: &[u8; 32]) -> bool {
        self.wallets.is_spent(commitment)
    }

    /// Bank balance in satoshis
    pub fn bank_balance(&self, account: &AccountId) -> u64 {
        self.bank.balance_of(account)
    }

    pub fn is_vault_trusted(&self, vault: &AccountId) -> bool {
        self.vaults.is_trusted(vault)
    }

    pub fn epoch_difficulty(&self) -> EpochDifficulty {
        self.difficulty
    }

    pub fn minting(&self) -> &OptimisticMintingVault {
        &self.minting
    }

    pub fn optimistic_minting_request(&self, deposit_key: &DepositKey) -> Option<&OptimisticMintingRequest> {
        self.minting.request_of(deposit_key)
    }

    /// Outstanding optimistic minting debt in token units
    pub fn debt_of(&self, depositor: &AccountId) -> u128 {
        self.minting.debt_of(depositor)
    }

    /// Token balance in token units
    pub fn token_balance(&self, account: &AccountId) -> u128 {
        self.minting.token().balance_of(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.minting.token().total_supply()
    }

    /// Undrained events, oldest first
    pub fn events(&self) -> &[BridgeEvent] {
        self.events.events()
    }

    /// Events discarded because nobody drained the log in time
    pub fn dropped_event_count(&self) -> u64 {
        self.events.dropped()
    }

    /// Hand recorded events to an observer
    ///
    /// The log is bounded; long-running callers should drain it regularly.
    pub fn drain_events(&mut self) -> Vec<BridgeEvent> {
        self.events.drain()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn owner_only(
        &mut self,
        caller: AccountId,
        op: impl FnOnce(&mut Self) -> Result<BridgeEvent>,
    ) -> Result<((), Vec<BridgeEvent>)> {
        self.governance.ensure_owner(caller)?;
        op(self).map(|event| ((), vec![event]))
    }

    /// Record the events of a successful operation or log its rejection
    fn finish<T>(&mut self, operation: &str, result: Result<(T, Vec<BridgeEvent>)>) -> Result<T> {
        match result {
            Ok((value, events)) => {
                self.events.extend(events);
                Ok(value)
            }
            Err(error) => {
                log_rejection(operation, &error, Some(&generate_correlation_id()));
                Err(error)
            }
        }
    }
}

/// Shared bridge for concurrent callers; every mutation holds the write lock
pub type SharedBridge = Arc<RwLock<Bridge>>;

/// Create shared bridge
pub fn create_shared_bridge(bridge: Bridge) -> SharedBridge {
    Arc::new(RwLock::new(bridge))
}
