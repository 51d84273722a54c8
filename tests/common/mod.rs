//! Shared fixtures: a regtest bridge with a live wallet, real funding and
//! sweep transactions, and mined header chains.

#![allow(dead_code)]

use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::block::{Header, Version as BlockVersion};
use bitcoin::consensus::serialize;
use bitcoin::hashes::Hash;
use bitcoin::pow::CompactTarget;
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, BlockHash, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxMerkleNode, TxOut,
    Txid, WPubkeyHash, Witness,
};

use btc_bridge_ledger::bank::Vault;
use btc_bridge_ledger::deposit::{deposit_script, p2wsh_output};
use btc_bridge_ledger::spv::{compute_merkle_root_from_txs, merkle_proof_for};
use btc_bridge_ledger::{
    AccountId, BitcoinTx, Bridge, BridgeConfig, BridgeEvent, DepositKey, DepositRevealInfo,
    ManualClock, Result, SpvProof, WalletState,
};

pub const WALLET: [u8; 20] = [0x11; 20];
pub const START: u64 = 1_700_000_000;
const REGTEST_BITS: u32 = 0x207f_ffff;

pub fn id(n: u64) -> AccountId {
    AccountId::from_low_u64(n)
}

pub fn owner() -> AccountId {
    BridgeConfig::regtest().owner
}

pub fn treasury() -> AccountId {
    BridgeConfig::regtest().treasury
}

pub fn minting_vault() -> AccountId {
    BridgeConfig::regtest().vault_id
}

pub fn minter() -> AccountId {
    id(10)
}

pub fn guardian() -> AccountId {
    id(11)
}

pub fn depositor(n: u64) -> AccountId {
    id(100 + n)
}

pub struct Harness {
    pub bridge: Bridge,
    pub clock: ManualClock,
    funding_nonce: u8,
}

impl Harness {
    /// Regtest bridge with a live wallet, one minter and one guardian
    pub fn new() -> Self {
        let clock = ManualClock::new(START);
        let mut bridge = Bridge::new(&BridgeConfig::regtest(), Arc::new(clock.clone())).unwrap();
        bridge.set_wallet_state(owner(), WALLET, WalletState::Live).unwrap();
        bridge.add_minter(owner(), minter()).unwrap();
        bridge.add_guardian(owner(), guardian()).unwrap();
        bridge.drain_events();

        Self {
            bridge,
            clock,
            funding_nonce: 0,
        }
    }

    /// Reveal a fresh deposit of `amount` satoshis; returns its key and outpoint
    pub fn reveal(
        &mut self,
        depositor: AccountId,
        amount: u64,
        vault: Option<AccountId>,
    ) -> Result<(DepositKey, ([u8; 32], u32))> {
        self.funding_nonce += 1;
        let info = reveal_info(depositor, vault, self.funding_nonce);
        let funding = funding_tx(&info, amount, self.funding_nonce);
        let key = self.bridge.reveal_deposit(&funding, &info)?;
        Ok((key, (funding.tx_hash(), info.funding_output_index)))
    }

    /// Change a tunable through the full governance delay
    pub fn set_parameter(&mut self, key: btc_bridge_ledger::ParameterKey, value: u64) {
        self.bridge.begin_parameter_update(owner(), key, value).unwrap();
        self.clock.advance(self.bridge.parameters().governance_delay);
        self.bridge.finalize_parameter_update(owner(), key).unwrap();
    }
}

pub fn reveal_info(depositor: AccountId, vault: Option<AccountId>, blinding: u8) -> DepositRevealInfo {
    DepositRevealInfo {
        depositor,
        funding_output_index: 1,
        blinding_factor: [blinding; 8],
        wallet_pub_key_hash: WALLET,
        refund_pub_key_hash: [0x22; 20],
        refund_locktime: 1_800_000_000u32.to_le_bytes(),
        vault,
        extra_data: None,
    }
}

/// Funding transaction: change at output 0, the deposit at output 1
pub fn funding_tx(info: &DepositRevealInfo, amount: u64, nonce: u8) -> BitcoinTx {
    BitcoinTx::from_transaction(&Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([nonce; 32]), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            TxOut {
                value: Amount::from_sat(5_000),
                script_pubkey: ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array([0x33; 20])),
            },
            TxOut {
                value: Amount::from_sat(amount),
                script_pubkey: p2wsh_output(&deposit_script(info)),
            },
        ],
    })
}

/// Sweep spending `outpoints` in order into one P2WPKH output to the wallet
pub fn sweep_tx(outpoints: &[([u8; 32], u32)], output_value: u64) -> BitcoinTx {
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
        output: vec![TxOut {
            value: Amount::from_sat(output_value),
            script_pubkey: ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(WALLET)),
        }],
    })
}

fn mine(prev: BlockHash, merkle_root: [u8; 32]) -> Header {
    let mut header = Header {
        version: BlockVersion::ONE,
        prev_blockhash: prev,
        merkle_root: TxMerkleNode::from_byte_array(merkle_root),
        time: 1_700_000_000,
        bits: CompactTarget::from_consensus(REGTEST_BITS),
        nonce: 0,
    };
    while !header.target().is_met_by(header.block_hash()) {
        header.nonce += 1;
    }
    header
}

/// Proof for `tx` as the third transaction of a block, with `headers` headers
pub fn proof_for(tx: &BitcoinTx, headers: usize) -> SpvProof {
    let txs = [[0xc0u8; 32], [0xc1u8; 32], tx.tx_hash(), [0xc3u8; 32]];
    let root = compute_merkle_root_from_txs(&txs).unwrap();

    let mut chain = vec![mine(BlockHash::all_zeros(), root)];
    while chain.len() < headers {
        let prev = chain[chain.len() - 1].block_hash();
        chain.push(mine(prev, [0u8; 32]));
    }

    SpvProof {
        merkle_proof: merkle_proof_for(&txs, 2).unwrap(),
        tx_index_in_block: 2,
        bitcoin_headers: chain.iter().flat_map(|h| serialize(h)).collect(),
    }
}

/// Vault that accepts every batch and remembers it
pub struct RecordingVault {
    pub id: AccountId,
    pub batches: Arc<std::sync::Mutex<Vec<(Vec<AccountId>, Vec<u64>)>>>,
}

impl RecordingVault {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            batches: Arc::default(),
        }
    }
}

impl Vault for RecordingVault {
    fn id(&self) -> AccountId {
        self.id
    }

    fn receive_balance_increase(
        &mut self,
        depositors: &[AccountId],
        amounts: &[u64],
    ) -> Result<Vec<BridgeEvent>> {
        self.batches
            .lock()
            .unwrap()
            .push((depositors.to_vec(), amounts.to_vec()));
        Ok(Vec::new())
    }
}
