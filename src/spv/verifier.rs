//! SPV proof verification
//!
//! ```text
//! tx fields ──► vectors decode ──► tx hash
//!                                     │
//! merkle proof + index ───────────────┴──► root == first header's root
//!
//! headers ──► linkage ──► work ──► one epoch ──► accumulated difficulty
//! ```
//!
//! Verification reads nothing but its arguments.

use bitcoin::params::Params;

use super::header::HeaderChain;
use super::merkle::compute_merkle_root;
use super::oracle::DifficultyOracle;
use super::SpvError;
use crate::types::{BitcoinTx, SpvProof};

/// Stateless SPV verifier for one Bitcoin network
#[derive(Debug, Clone)]
pub struct SpvVerifier {
    params: Params,
}

impl SpvVerifier {
    pub fn new(network: bitcoin::Network) -> Self {
        Self {
            params: Params::new(network),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Authenticate inclusion and confirmation depth of `tx`
    ///
    /// Returns the transaction hash (internal byte order).
    pub fn verify(
        &self,
        tx: &BitcoinTx,
        proof: &SpvProof,
        oracle: &dyn DifficultyOracle,
        difficulty_factor: u64,
    ) -> Result<[u8; 32], SpvError> {
        tx.inputs()?;
        tx.outputs()?;
        let tx_hash = tx.tx_hash();

        let chain = HeaderChain::parse(&proof.bitcoin_headers)?;
        if (chain.len() as u64) < difficulty_factor {
            return Err(SpvError::InvalidHeaderChainLength);
        }

        let root = compute_merkle_root(&tx_hash, proof.tx_index_in_block, &proof.merkle_proof)?;
        if root != chain.merkle_root() {
            return Err(SpvError::InvalidMerkleProof);
        }

        self.evaluate_proof_difficulty(&chain, oracle, difficulty_factor)?;

        Ok(tx_hash)
    }

    /// Check linkage, work, epoch and accumulated difficulty of a header chain
    pub fn evaluate_proof_difficulty(
        &self,
        chain: &HeaderChain,
        oracle: &dyn DifficultyOracle,
        difficulty_factor: u64,
    ) -> Result<(), SpvError> {
        chain.validate_linkage()?;
        chain.validate_work()?;

        let difficulties = chain.difficulties(&self.params)?;
        let first = difficulties[0];

        if first != oracle.current_epoch_difficulty() && first != oracle.previous_epoch_difficulty() {
            return Err(SpvError::WrongDifficultyEpoch);
        }
        let requested = first;

        if difficulties.iter().any(|d| *d != requested) {
            return Err(SpvError::WrongDifficultyEpoch);
        }

        let accumulated = difficulties
            .iter()
            .try_fold(0u128, |acc, d| acc.checked_add(*d))
            .ok_or(SpvError::InsufficientAccumulatedDifficulty)?;
        let required = requested
            .checked_mul(difficulty_factor as u128)
            .ok_or(SpvError::InsufficientAccumulatedDifficulty)?;

        if requested == 0 || accumulated < required {
            return Err(SpvError::InsufficientAccumulatedDifficulty);
        }

        Ok(())
    }
}
