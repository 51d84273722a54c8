//! Sweep proof processing
//!
//! A sweep transaction consolidates revealed deposits, and optionally the
//! wallet's previous main UTXO, into a single output back to the wallet.
//!
//! ```text
//! proof ──► SPV ──► single 20-byte output ──► wallet ──► main UTXO
//!                                                            │
//!       ┌────────────────────────────────────────────────────┘
//!       ▼
//! classify inputs ──► fee checks ──► split fees ──► route credits
//!                                                       │
//!             stage bank ──► notify vault ──► commit ◄──┘
//! ```
//!
//! Nothing is written until every check has passed and the vault has
//! accepted its batch.

use bitcoin::hashes::Hash;
use bitcoin::Script;
use serde::Serialize;
use std::collections::HashSet;

use super::fees::{max_sweep_fee, split_sweep_fee};
use crate::bank::{Bank, VaultSet};
use crate::common::error::{BridgeError, Result};
use crate::deposit::DepositRegistry;
use crate::governance::BridgeParameters;
use crate::spv::{DifficultyOracle, SpvVerifier};
use crate::types::{
    AccountId, BitcoinTx, BridgeEvent, DepositKey, DepositRequest, PubKeyHash, SpvProof, Utxo,
};
use crate::wallet::WalletRegistry;

/// How one deposit of a sweep was settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweptDeposit {
    pub deposit_key: DepositKey,
    pub depositor: AccountId,
    pub amount: u64,
    pub treasury_fee: u64,
    pub sweep_fee_share: u64,
    /// Amount credited to the depositor or passed to the vault
    pub net_amount: u64,
    pub vault: Option<AccountId>,
}

/// Outcome of an accepted sweep proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    #[serde(with = "hex::serde")]
    pub sweep_tx_hash: [u8; 32],
    #[serde(with = "hex::serde")]
    pub wallet_pub_key_hash: PubKeyHash,
    pub sweep_fee: u64,
    pub treasury_fee: u64,
    /// In deposit input order
    pub deposits: Vec<SweptDeposit>,
    pub new_main_utxo: Utxo,
}

/// Borrowed view of every component a sweep reads or writes
pub struct SweepProcessor<'a> {
    pub verifier: &'a SpvVerifier,
    pub oracle: &'a dyn DifficultyOracle,
    pub params: &'a BridgeParameters,
    pub treasury: AccountId,
    pub deposits: &'a mut DepositRegistry,
    pub wallets: &'a mut WalletRegistry,
    pub bank: &'a mut Bank,
    pub vaults: VaultSet<'a>,
    pub now: u64,
}

impl SweepProcessor<'_> {
    /// Validate a sweep proof and settle its deposits
    ///
    /// Returns the summary and the events to record, `DepositsSwept` first.
    pub fn submit_proof(
        &mut self,
        sweep_tx: &BitcoinTx,
        proof: &SpvProof,
        main_utxo: Option<&Utxo>,
        vault: Option<AccountId>,
    ) -> Result<(SweepSummary, Vec<BridgeEvent>)> {
        // The zero identity means no vault
        let vault = vault.filter(|v| !v.is_zero());

        let sweep_tx_hash = self.verifier.verify(
            sweep_tx,
            proof,
            self.oracle,
            self.params.tx_proof_difficulty_factor,
        )?;

        // Single output to a wallet
        let outputs = sweep_tx.outputs()?;
        if outputs.len() != 1 {
            return Err(BridgeError::MustHaveSingleOutput);
        }
        let output_value = outputs[0].value.to_sat();
        let wallet_pub_key_hash = output_pub_key_hash(&outputs[0].script_pubkey)?;

        let state = self.wallets.state_of(&wallet_pub_key_hash);
        if !state.accepts_sweeps() {
            return Err(BridgeError::WalletNotLive(state));
        }

        if let Some(vault) = vault {
            if !self.vaults.is_trusted(&vault) {
                return Err(BridgeError::UntrustedVault(vault));
            }
        }

        let main_utxo = self.resolve_main_utxo(&wallet_pub_key_hash, main_utxo)?;

        // Classify inputs
        let swept = self.classify_inputs(sweep_tx, main_utxo)?;
        if swept.is_empty() {
            return Err(BridgeError::MustProcessAtLeastOneDeposit);
        }

        let total_input = swept
            .iter()
            .try_fold(main_utxo.map_or(0, |u| u.value), |acc, (_, d)| acc.checked_add(d.amount))
            .ok_or(BridgeError::ArithmeticOverflow)?;
        let sweep_fee = total_input
            .checked_sub(output_value)
            .ok_or(BridgeError::OutputExceedsInputs)?;
        let max_fee = max_sweep_fee(self.params.deposit_tx_max_fee, swept.len());
        if sweep_fee > max_fee {
            return Err(BridgeError::TransactionFeeTooHigh {
                fee: sweep_fee,
                max: max_fee,
            });
        }

        // Split fees and route credits
        let shares = split_sweep_fee(sweep_fee, swept.len());
        let mut settled = Vec::with_capacity(swept.len());
        let mut credits: Vec<(AccountId, u64)> = Vec::new();
        let mut batch_depositors = Vec::new();
        let mut batch_amounts = Vec::new();
        let mut treasury_fee: u64 = 0;

        for ((deposit_key, deposit), share) in swept.iter().zip(shares) {
            let net_amount = deposit
                .amount
                .checked_sub(deposit.treasury_fee)
                .and_then(|a| a.checked_sub(share))
                .ok_or(BridgeError::ArithmeticOverflow)?;

            match deposit.vault {
                None => credits.push((deposit.depositor, net_amount)),
                Some(routed) => {
                    if vault != Some(routed) {
                        return Err(BridgeError::RoutedToAnotherVault);
                    }
                    batch_depositors.push(deposit.depositor);
                    batch_amounts.push(net_amount);
                }
            }

            treasury_fee = treasury_fee
                .checked_add(deposit.treasury_fee)
                .ok_or(BridgeError::ArithmeticOverflow)?;

            settled.push(SweptDeposit {
                deposit_key: *deposit_key,
                depositor: deposit.depositor,
                amount: deposit.amount,
                treasury_fee: deposit.treasury_fee,
                sweep_fee_share: share,
                net_amount,
                vault: deposit.vault,
            });
        }

        let vault_total = batch_amounts
            .iter()
            .try_fold(0u64, |acc, a| acc.checked_add(*a))
            .ok_or(BridgeError::ArithmeticOverflow)?;
        let batch_vault = vault.filter(|_| !batch_depositors.is_empty());
        if let Some(vault) = batch_vault {
            credits.push((vault, vault_total));
        }
        credits.push((self.treasury, treasury_fee));

        let staged = self.bank.stage(&credits)?;

        // Last fallible step: the vault either accepts the whole batch or
        // leaves itself unchanged
        let mut vault_events = Vec::new();
        if let Some(vault) = batch_vault {
            let target = self
                .vaults
                .get_mut(&vault)
                .ok_or(BridgeError::UnknownVault(vault))?;
            vault_events = target.receive_balance_increase(&batch_depositors, &batch_amounts)?;
        }

        // Commit
        let new_main_utxo = Utxo {
            tx_hash: sweep_tx_hash,
            output_index: 0,
            value: output_value,
        };
        let keys: Vec<DepositKey> = swept.iter().map(|(key, _)| *key).collect();

        self.bank.commit(staged);
        self.deposits.mark_swept(&keys, self.now);
        self.wallets.record_sweep(
            &wallet_pub_key_hash,
            main_utxo.map(|u| u.commitment()),
            new_main_utxo.commitment(),
        );

        tracing::info!(
            target: "bridge::sweep",
            sweep_tx = %hex::encode(sweep_tx_hash),
            wallet = %hex::encode(wallet_pub_key_hash),
            deposits = keys.len(),
            sweep_fee,
            treasury_fee,
            vault_total,
            "sweep proof accepted"
        );

        let mut events = vec![BridgeEvent::DepositsSwept {
            sweep_tx_hash,
            wallet_pub_key_hash,
            deposit_count: keys.len(),
            sweep_fee,
            treasury_fee,
        }];
        events.extend(vault_events);

        let summary = SweepSummary {
            sweep_tx_hash,
            wallet_pub_key_hash,
            sweep_fee,
            treasury_fee,
            deposits: settled,
            new_main_utxo,
        };

        Ok((summary, events))
    }

    /// Check the supplied main UTXO against the wallet's commitment
    fn resolve_main_utxo<'u>(
        &self,
        wallet_pub_key_hash: &PubKeyHash,
        main_utxo: Option<&'u Utxo>,
    ) -> Result<Option<&'u Utxo>> {
        let commitment = self
            .wallets
            .get(wallet_pub_key_hash)
            .and_then(|w| w.main_utxo_hash);

        match (commitment, main_utxo) {
            (Some(expected), Some(utxo)) => {
                if utxo.commitment() != expected {
                    return Err(BridgeError::InvalidMainUtxoData);
                }
                Ok(Some(utxo))
            }
            (Some(_), None) => Err(BridgeError::ExpectedMainUtxoMissing),
            (None, Some(_)) => Err(BridgeError::MainUtxoNotExpected),
            (None, None) => Ok(None),
        }
    }

    /// Deposits spent by the sweep, in input order
    fn classify_inputs(
        &self,
        sweep_tx: &BitcoinTx,
        main_utxo: Option<&Utxo>,
    ) -> Result<Vec<(DepositKey, DepositRequest)>> {
        let inputs = sweep_tx.inputs()?;
        let mut main_utxo_spent = false;
        let mut seen = HashSet::new();
        let mut swept = Vec::new();

        for input in &inputs {
            let outpoint_tx_hash = input.previous_output.txid.to_byte_array();
            let outpoint_index = input.previous_output.vout;

            if let Some(utxo) = main_utxo {
                if !main_utxo_spent
                    && utxo.tx_hash == outpoint_tx_hash
                    && utxo.output_index == outpoint_index
                {
                    main_utxo_spent = true;
                    continue;
                }
            }

            let key = DepositKey::derive(&outpoint_tx_hash, outpoint_index);
            let deposit = self
                .deposits
                .get(&key)
                .ok_or(BridgeError::UnknownInputType)?;
            if deposit.is_swept() || !seen.insert(key) {
                return Err(BridgeError::AlreadySwept);
            }
            swept.push((key, deposit.clone()));
        }

        if main_utxo.is_some() && !main_utxo_spent {
            return Err(BridgeError::ExpectedMainUtxoMissing);
        }

        tracing::debug!(
            target: "bridge::sweep",
            inputs = inputs.len(),
            deposits = swept.len(),
            main_utxo_spent,
            "sweep inputs classified"
        );

        Ok(swept)
    }
}

/// Wallet public key hash of a P2PKH or P2WPKH output
fn output_pub_key_hash(script: &Script) -> Result<PubKeyHash> {
    let bytes = script.as_bytes();
    let hash = if script.is_p2pkh() {
        &bytes[3..23]
    } else if script.is_p2wpkh() {
        &bytes[2..22]
    } else {
        return Err(BridgeError::OutputMustBe20Byte);
    };

    let mut pub_key_hash = [0u8; 20];
    pub_key_hash.copy_from_slice(hash);
    Ok(pub_key_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::VaultRegistry;
    use crate::minting::OptimisticMintingVault;
    use crate::spv::testing::proof_for;
    use crate::spv::EpochDifficulty;
    use crate::types::WalletState;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::{
        Amount, OutPoint, PubkeyHash, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
        WPubkeyHash, Witness,
    };

    const WALLET: PubKeyHash = [0x11; 20];
    const VAULT: u64 = 3;
    const TREASURY: u64 = 2;

    fn id(n: u64) -> AccountId {
        AccountId::from_low_u64(n)
    }

    fn params() -> BridgeParameters {
        BridgeParameters {
            deposit_dust_threshold: 10_000,
            deposit_treasury_fee_divisor: 2_000,
            deposit_tx_max_fee: 2_000,
            deposit_reveal_ahead_period: 0,
            tx_proof_difficulty_factor: 1,
            optimistic_minting_fee_divisor: 0,
            optimistic_minting_delay: 0,
            governance_delay: 60,
        }
    }

    struct Fixture {
        verifier: SpvVerifier,
        oracle: EpochDifficulty,
        params: BridgeParameters,
        deposits: DepositRegistry,
        wallets: WalletRegistry,
        bank: Bank,
        minting: OptimisticMintingVault,
        registry: VaultRegistry,
    }

    impl Fixture {
        /// Deposits `(funding tx byte, amount, vault)` at output 0 of their funding txs
        fn new(deposits: &[(u8, u64, Option<AccountId>)]) -> Self {
            let deposits = DepositRegistry::from_deposits(deposits.iter().enumerate().map(
                |(i, (tx_byte, amount, vault))| {
                    let funding_tx_hash = [*tx_byte; 32];
                    (
                        DepositKey::derive(&funding_tx_hash, 0),
                        DepositRequest {
                            depositor: id(100 + i as u64),
                            funding_tx_hash,
                            funding_output_index: 0,
                            wallet_pub_key_hash: WALLET,
                            refund_pub_key_hash: [0x22; 20],
                            refund_locktime: [0; 4],
                            amount: *amount,
                            revealed_at: 0,
                            swept_at: None,
                            vault: *vault,
                            treasury_fee: amount / 2_000,
                            extra_data: None,
                        },
                    )
                },
            ));

            let mut wallets = WalletRegistry::new();
            wallets.set_state(WALLET, WalletState::Live);

            let mut registry = VaultRegistry::new();
            registry.set_trusted(id(VAULT), true);

            Self {
                verifier: SpvVerifier::new(bitcoin::Network::Regtest),
                oracle: EpochDifficulty::default(),
                params: params(),
                deposits,
                wallets,
                bank: Bank::new(),
                minting: OptimisticMintingVault::new(id(VAULT)),
                registry,
            }
        }

        fn submit(
            &mut self,
            tx: &BitcoinTx,
            main_utxo: Option<&Utxo>,
            vault: Option<AccountId>,
        ) -> Result<(SweepSummary, Vec<BridgeEvent>)> {
            let proof = proof_for(&tx.tx_hash(), 0);
            let mut processor = SweepProcessor {
                verifier: &self.verifier,
                oracle: &self.oracle,
                params: &self.params,
                treasury: id(TREASURY),
                deposits: &mut self.deposits,
                wallets: &mut self.wallets,
                bank: &mut self.bank,
                vaults: VaultSet {
                    builtin: &mut self.minting,
                    registry: &mut self.registry,
                },
                now: 1_000,
            };
            processor.submit_proof(tx, &proof, main_utxo, vault)
        }
    }

    fn sweep_tx(outpoints: &[([u8; 32], u32)], outputs: Vec<TxOut>) -> BitcoinTx {
        BitcoinTx::from_transaction(&Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: outpoints
                .iter()
                .map(|(hash, vout)| TxIn {
                    previous_output: OutPoint::new(Txid::from_byte_array(*hash), *vout),
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs,
        })
    }

    fn to_wallet(value: u64) -> TxOut {
        TxOut {
            value: Amount::from_sat(value),
            script_pubkey: ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(WALLET)),
        }
    }

    #[test]
    fn test_single_deposit_credits_depositor() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);
        let tx = sweep_tx(&[([1; 32], 0)], vec![to_wallet(18_000)]);

        let (summary, events) = fx.submit(&tx, None, None).unwrap();

        assert_eq!(summary.sweep_fee, 2_000);
        assert_eq!(summary.treasury_fee, 10);
        assert_eq!(summary.deposits[0].net_amount, 17_990);
        assert_eq!(fx.bank.balance_of(&id(100)), 17_990);
        assert_eq!(fx.bank.balance_of(&id(TREASURY)), 10);
        assert!(matches!(events[0], BridgeEvent::DepositsSwept { deposit_count: 1, .. }));

        let wallet = fx.wallets.get(&WALLET).unwrap();
        assert_eq!(wallet.main_utxo_hash, Some(summary.new_main_utxo.commitment()));
        assert!(fx.deposits.get(&summary.deposits[0].deposit_key).unwrap().is_swept());
    }

    #[test]
    fn test_p2pkh_output_identifies_wallet() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);
        let output = TxOut {
            value: Amount::from_sat(19_000),
            script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(WALLET)),
        };
        let tx = sweep_tx(&[([1; 32], 0)], vec![output]);
        let (summary, _) = fx.submit(&tx, None, None).unwrap();
        assert_eq!(summary.wallet_pub_key_hash, WALLET);
    }

    #[test]
    fn test_output_shape() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);

        let two = sweep_tx(&[([1; 32], 0)], vec![to_wallet(9_000), to_wallet(9_000)]);
        assert!(matches!(fx.submit(&two, None, None), Err(BridgeError::MustHaveSingleOutput)));

        let p2wsh = TxOut {
            value: Amount::from_sat(18_000),
            script_pubkey: ScriptBuf::new_p2wsh(&bitcoin::WScriptHash::from_byte_array([3; 32])),
        };
        let tx = sweep_tx(&[([1; 32], 0)], vec![p2wsh]);
        assert!(matches!(fx.submit(&tx, None, None), Err(BridgeError::OutputMustBe20Byte)));
    }

    #[test]
    fn test_closed_wallet_rejected() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);
        fx.wallets.set_state(WALLET, WalletState::Closed);
        let tx = sweep_tx(&[([1; 32], 0)], vec![to_wallet(18_000)]);
        assert!(matches!(
            fx.submit(&tx, None, None),
            Err(BridgeError::WalletNotLive(WalletState::Closed))
        ));
    }

    #[test]
    fn test_fee_cap_is_per_deposit() {
        let mut fx = Fixture::new(&[(1, 20_000, None), (2, 20_000, None)]);
        let tx = sweep_tx(&[([1; 32], 0), ([2; 32], 0)], vec![to_wallet(35_999)]);
        assert!(matches!(
            fx.submit(&tx, None, None),
            Err(BridgeError::TransactionFeeTooHigh { fee: 4_001, max: 4_000 })
        ));

        let tx = sweep_tx(&[([1; 32], 0), ([2; 32], 0)], vec![to_wallet(36_000)]);
        fx.submit(&tx, None, None).unwrap();
    }

    #[test]
    fn test_output_above_inputs() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);
        let tx = sweep_tx(&[([1; 32], 0)], vec![to_wallet(20_001)]);
        assert!(matches!(fx.submit(&tx, None, None), Err(BridgeError::OutputExceedsInputs)));
    }

    #[test]
    fn test_input_classification() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);

        let unknown = sweep_tx(&[([1; 32], 0), ([9; 32], 0)], vec![to_wallet(28_000)]);
        assert!(matches!(fx.submit(&unknown, None, None), Err(BridgeError::UnknownInputType)));

        let repeated = sweep_tx(&[([1; 32], 0), ([1; 32], 0)], vec![to_wallet(38_000)]);
        assert!(matches!(fx.submit(&repeated, None, None), Err(BridgeError::AlreadySwept)));
        assert_eq!(fx.bank.balance_of(&id(100)), 0);
    }

    #[test]
    fn test_main_utxo_carried_over() {
        let mut fx = Fixture::new(&[(1, 20_000, None), (2, 30_000, None)]);
        let first = sweep_tx(&[([1; 32], 0)], vec![to_wallet(19_000)]);
        let (summary, _) = fx.submit(&first, None, None).unwrap();
        let main_utxo = summary.new_main_utxo;

        // Omitted, wrong, and unspent main UTXO
        let second = sweep_tx(
            &[(main_utxo.tx_hash, 0), ([2; 32], 0)],
            vec![to_wallet(48_000)],
        );
        assert!(matches!(
            fx.submit(&second, None, None),
            Err(BridgeError::ExpectedMainUtxoMissing)
        ));
        let wrong = Utxo {
            value: main_utxo.value + 1,
            ..main_utxo
        };
        assert!(matches!(
            fx.submit(&second, Some(&wrong), None),
            Err(BridgeError::InvalidMainUtxoData)
        ));
        let unspent = sweep_tx(&[([2; 32], 0)], vec![to_wallet(29_000)]);
        assert!(matches!(
            fx.submit(&unspent, Some(&main_utxo), None),
            Err(BridgeError::ExpectedMainUtxoMissing)
        ));

        // Fee: 19000 + 30000 - 48000
        let (summary, _) = fx.submit(&second, Some(&main_utxo), None).unwrap();
        assert_eq!(summary.sweep_fee, 1_000);
        assert_eq!(summary.deposits.len(), 1);
        assert!(fx.wallets.is_spent(&main_utxo.commitment()));
    }

    #[test]
    fn test_main_utxo_not_expected() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);
        let utxo = Utxo {
            tx_hash: [7; 32],
            output_index: 0,
            value: 1_000,
        };
        let tx = sweep_tx(&[([7; 32], 0), ([1; 32], 0)], vec![to_wallet(20_000)]);
        assert!(matches!(
            fx.submit(&tx, Some(&utxo), None),
            Err(BridgeError::MainUtxoNotExpected)
        ));
    }

    #[test]
    fn test_main_utxo_only_sweep_rejected() {
        let mut fx = Fixture::new(&[(1, 20_000, None)]);
        let first = sweep_tx(&[([1; 32], 0)], vec![to_wallet(19_000)]);
        let (summary, _) = fx.submit(&first, None, None).unwrap();
        let main_utxo = summary.new_main_utxo;

        let tx = sweep_tx(&[(main_utxo.tx_hash, 0)], vec![to_wallet(18_500)]);
        assert!(matches!(
            fx.submit(&tx, Some(&main_utxo), None),
            Err(BridgeError::MustProcessAtLeastOneDeposit)
        ));
    }

    #[test]
    fn test_vault_batch_and_routing() {
        let mut fx = Fixture::new(&[(1, 20_000, Some(id(VAULT))), (2, 20_000, None)]);
        let tx = sweep_tx(&[([1; 32], 0), ([2; 32], 0)], vec![to_wallet(38_000)]);

        assert!(matches!(
            fx.submit(&tx, None, None),
            Err(BridgeError::RoutedToAnotherVault)
        ));
        assert!(matches!(
            fx.submit(&tx, None, Some(id(42))),
            Err(BridgeError::UntrustedVault(_))
        ));

        let (summary, _) = fx.submit(&tx, None, Some(id(VAULT))).unwrap();
        let routed = &summary.deposits[0];
        // 20000 - 10 - 1000
        assert_eq!(routed.net_amount, 18_990);
        assert_eq!(fx.bank.balance_of(&id(VAULT)), 18_990);
        assert_eq!(fx.bank.balance_of(&id(101)), 18_990);
        assert_eq!(fx.bank.balance_of(&id(TREASURY)), 20);
        assert_eq!(
            fx.minting.token().balance_of(&id(100)),
            crate::types::units::sats_to_token_units(18_990)
        );
    }

    #[test]
    fn test_trusted_but_unregistered_vault() {
        let mut fx = Fixture::new(&[(1, 20_000, Some(id(50)))]);
        fx.registry.set_trusted(id(50), true);
        let tx = sweep_tx(&[([1; 32], 0)], vec![to_wallet(19_000)]);

        assert!(matches!(
            fx.submit(&tx, None, Some(id(50))),
            Err(BridgeError::UnknownVault(_))
        ));
        assert_eq!(fx.bank.balance_of(&id(TREASURY)), 0);
        assert!(!fx.deposits.get(&DepositKey::derive(&[1; 32], 0)).unwrap().is_swept());
    }
}
