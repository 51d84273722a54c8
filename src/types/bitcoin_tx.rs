//! Bitcoin Transaction Data
//!
//! Transactions arrive split into the four fields that make up their legacy
//! (non-witness) serialization, exactly as a relayer extracts them from a
//! block. The transaction hash is computed over those bytes, so witness data
//! never influences it.

use bitcoin::consensus::{deserialize, serialize};
use bitcoin::{Transaction, TxIn, TxOut};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::spv::{double_sha256, SpvError};

/// A Bitcoin transaction in its relayed form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinTx {
    /// 4-byte little-endian version
    #[serde(with = "hex::serde")]
    pub version: [u8; 4],
    /// Compact-size prefixed input vector
    #[serde(with = "hex::serde")]
    pub input_vector: Vec<u8>,
    /// Compact-size prefixed output vector
    #[serde(with = "hex::serde")]
    pub output_vector: Vec<u8>,
    /// 4-byte little-endian locktime
    #[serde(with = "hex::serde")]
    pub locktime: [u8; 4],
}

impl BitcoinTx {
    /// Split a decoded transaction into its relayed form
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            version: tx.version.0.to_le_bytes(),
            input_vector: serialize(&tx.input),
            output_vector: serialize(&tx.output),
            locktime: tx.lock_time.to_consensus_u32().to_le_bytes(),
        }
    }

    /// Transaction hash (double SHA-256, internal byte order)
    pub fn tx_hash(&self) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(8 + self.input_vector.len() + self.output_vector.len());
        preimage.extend_from_slice(&self.version);
        preimage.extend_from_slice(&self.input_vector);
        preimage.extend_from_slice(&self.output_vector);
        preimage.extend_from_slice(&self.locktime);
        double_sha256(&preimage)
    }

    /// Decode the input vector; it must hold at least one input and nothing else
    pub fn inputs(&self) -> Result<Vec<TxIn>, SpvError> {
        match deserialize::<Vec<TxIn>>(&self.input_vector) {
            Ok(inputs) if !inputs.is_empty() => Ok(inputs),
            _ => Err(SpvError::InvalidInputVector),
        }
    }

    /// Decode the output vector; it must hold at least one output and nothing else
    pub fn outputs(&self) -> Result<Vec<TxOut>, SpvError> {
        match deserialize::<Vec<TxOut>>(&self.output_vector) {
            Ok(outputs) if !outputs.is_empty() => Ok(outputs),
            _ => Err(SpvError::InvalidOutputVector),
        }
    }
}

/// Inclusion and confirmation proof for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpvProof {
    /// Concatenated 32-byte merkle siblings, leaf to root
    #[serde(with = "hex::serde")]
    pub merkle_proof: Vec<u8>,
    /// Position of the transaction in its block
    pub tx_index_in_block: u32,
    /// Concatenated 80-byte headers; the first one contains the transaction
    #[serde(with = "hex::serde")]
    pub bitcoin_headers: Vec<u8>,
}

/// Preimage of a wallet's main UTXO commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    #[serde(with = "hex::serde")]
    pub tx_hash: [u8; 32],
    pub output_index: u32,
    pub value: u64,
}

impl Utxo {
    /// Commitment stored by the wallet: SHA-256(txHash || index BE || value BE)
    pub fn commitment(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.tx_hash);
        hasher.update(self.output_index.to_be_bytes());
        hasher.update(self.value.to_be_bytes());
        hasher.finalize().into()
    }
}
