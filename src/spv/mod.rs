//! SPV Verification
//!
//! Authenticates that a Bitcoin transaction is included in a block and buried
//! under enough proof-of-work, without running a node:
//!
//! - `merkle` - double SHA-256 merkle paths
//! - `header` - 80-byte header chains, linkage and work
//! - `oracle` - current/previous epoch difficulty
//! - `verifier` - the full proof check

pub mod header;
pub mod merkle;
pub mod oracle;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use header::{header_difficulty, HeaderChain, HEADER_SIZE};
pub use merkle::{
    compute_merkle_root, compute_merkle_root_from_txs, double_sha256, double_sha256_pair,
    merkle_proof_for,
};
pub use oracle::{DifficultyOracle, EpochDifficulty};
pub use verifier::SpvVerifier;

/// SPV proof failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpvError {
    #[error("invalid input vector")]
    InvalidInputVector,

    #[error("invalid output vector")]
    InvalidOutputVector,

    #[error("invalid merkle proof")]
    InvalidMerkleProof,

    #[error("invalid header chain length")]
    InvalidHeaderChainLength,

    #[error("header chain is not linked")]
    InvalidHeaderLinkage,

    #[error("header hash does not meet its target")]
    InsufficientWork,

    #[error("headers are not from the current or previous difficulty epoch")]
    WrongDifficultyEpoch,

    #[error("insufficient accumulated difficulty in header chain")]
    InsufficientAccumulatedDifficulty,
}

impl SpvError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SpvError::InvalidInputVector => "INVALID_INPUT_VECTOR",
            SpvError::InvalidOutputVector => "INVALID_OUTPUT_VECTOR",
            SpvError::InvalidMerkleProof => "INVALID_MERKLE_PROOF",
            SpvError::InvalidHeaderChainLength => "INVALID_HEADER_CHAIN_LENGTH",
            SpvError::InvalidHeaderLinkage => "INVALID_HEADER_LINKAGE",
            SpvError::InsufficientWork => "INSUFFICIENT_WORK",
            SpvError::WrongDifficultyEpoch => "WRONG_DIFFICULTY_EPOCH",
            SpvError::InsufficientAccumulatedDifficulty => "INSUFFICIENT_ACCUMULATED_DIFFICULTY",
        }
    }
}
