//! Bitcoin merkle proof verification
//!
//! Merkle nodes use double SHA-256. Proof nodes are supplied from leaf to
//! root as one byte string of concatenated 32-byte siblings.

use sha2::{Digest, Sha256};

use super::SpvError;

/// Double SHA-256, internal byte order
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Double SHA-256 of two concatenated nodes
pub fn double_sha256_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

/// Compute the merkle root from a leaf and a concatenated proof
///
/// # Arguments
/// * `tx_hash` - The transaction hash (internal byte order)
/// * `tx_index` - The index of the transaction in the block
/// * `merkle_proof` - Concatenated 32-byte siblings, leaf to root
pub fn compute_merkle_root(
    tx_hash: &[u8; 32],
    tx_index: u32,
    merkle_proof: &[u8],
) -> Result<[u8; 32], SpvError> {
    if merkle_proof.len() % 32 != 0 {
        return Err(SpvError::InvalidMerkleProof);
    }

    let mut current = *tx_hash;
    let mut index = tx_index;

    for chunk in merkle_proof.chunks_exact(32) {
        let mut sibling = [0u8; 32];
        sibling.copy_from_slice(chunk);

        // Even index: hash(current || sibling)
        // Odd index: hash(sibling || current)
        current = if index & 1 == 0 {
            double_sha256_pair(&current, &sibling)
        } else {
            double_sha256_pair(&sibling, &current)
        };
        index >>= 1;
    }

    Ok(current)
}

/// Compute merkle root for a list of transaction hashes
///
/// Odd levels duplicate their last element. Returns `None` for an empty list.
pub fn compute_merkle_root_from_txs(tx_hashes: &[[u8; 32]]) -> Option<[u8; 32]> {
    let mut level = tx_hashes.to_vec();
    if level.is_empty() {
        return None;
    }

    while level.len() > 1 {
        level = next_level(&level);
    }

    Some(level[0])
}

/// Build the concatenated proof for the transaction at `index`
pub fn merkle_proof_for(tx_hashes: &[[u8; 32]], index: usize) -> Option<Vec<u8>> {
    if index >= tx_hashes.len() {
        return None;
    }

    let mut proof = Vec::new();
    let mut level = tx_hashes.to_vec();
    let mut position = index;

    while level.len() > 1 {
        let sibling = if position % 2 == 0 {
            level.get(position + 1).unwrap_or(&level[position])
        } else {
            &level[position - 1]
        };
        proof.extend_from_slice(sibling);
        level = next_level(&level);
        position /= 2;
    }

    Some(proof)
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => double_sha256_pair(left, right),
            [single] => double_sha256_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two elements"),
        })
        .collect()
}
