//! Regtest proof construction for unit tests

use bitcoin::block::{Header, Version};
use bitcoin::consensus::serialize;
use bitcoin::hashes::Hash;
use bitcoin::pow::CompactTarget;
use bitcoin::{BlockHash, TxMerkleNode};

use super::merkle::{compute_merkle_root_from_txs, merkle_proof_for};
use crate::types::SpvProof;

/// Difficulty 1 on regtest
pub const REGTEST_BITS: u32 = 0x207f_ffff;

pub fn mine(prev: BlockHash, merkle_root: [u8; 32], bits: u32) -> Header {
    let mut header = Header {
        version: Version::ONE,
        prev_blockhash: prev,
        merkle_root: TxMerkleNode::from_byte_array(merkle_root),
        time: 1_700_000_000,
        bits: CompactTarget::from_consensus(bits),
        nonce: 0,
    };
    while !header.target().is_met_by(header.block_hash()) {
        header.nonce += 1;
    }
    header
}

/// Proof for `tx_hash` at index 1 of a two-transaction block, followed by
/// `extra` confirming headers
pub fn proof_for(tx_hash: &[u8; 32], extra: usize) -> SpvProof {
    let txs = [[0xc0u8; 32], *tx_hash];
    let root = compute_merkle_root_from_txs(&txs).unwrap_or_default();
    let mut headers = vec![mine(BlockHash::all_zeros(), root, REGTEST_BITS)];
    for _ in 0..extra {
        let prev = headers[headers.len() - 1].block_hash();
        headers.push(mine(prev, [0u8; 32], REGTEST_BITS));
    }
    SpvProof {
        merkle_proof: merkle_proof_for(&txs, 1).unwrap_or_default(),
        tx_index_in_block: 1,
        bitcoin_headers: headers.iter().flat_map(|h| serialize(h)).collect(),
    }
}
