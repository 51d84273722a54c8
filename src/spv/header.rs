//! Bitcoin header chains
//!
//! A proof carries its confirmation headers as concatenated 80-byte records.
//! Each header must link to the previous one and meet its own encoded target.

use bitcoin::block::Header;
use bitcoin::consensus::deserialize;
use bitcoin::hashes::Hash;
use bitcoin::params::Params;
use bitcoin::pow::Target;

use super::SpvError;

/// Serialized size of a block header
pub const HEADER_SIZE: usize = 80;

/// Parsed, non-empty run of consecutive headers
#[derive(Debug, Clone)]
pub struct HeaderChain {
    headers: Vec<Header>,
}

impl HeaderChain {
    /// Split concatenated headers; the length must be a positive multiple of 80
    pub fn parse(raw: &[u8]) -> Result<Self, SpvError> {
        if raw.is_empty() || raw.len() % HEADER_SIZE != 0 {
            return Err(SpvError::InvalidHeaderChainLength);
        }

        let headers = raw
            .chunks_exact(HEADER_SIZE)
            .map(|chunk| deserialize::<Header>(chunk).map_err(|_| SpvError::InvalidHeaderChainLength))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { headers })
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Header of the block that contains the proven transaction
    pub fn first(&self) -> &Header {
        &self.headers[0]
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Merkle root committed by the first header, internal byte order
    pub fn merkle_root(&self) -> [u8; 32] {
        self.first().merkle_root.to_byte_array()
    }

    /// Every header's previous-hash field must equal its predecessor's hash
    pub fn validate_linkage(&self) -> Result<(), SpvError> {
        for pair in self.headers.windows(2) {
            if pair[1].prev_blockhash != pair[0].block_hash() {
                return Err(SpvError::InvalidHeaderLinkage);
            }
        }
        Ok(())
    }

    /// Every header's hash must be at or below its own target
    pub fn validate_work(&self) -> Result<(), SpvError> {
        for header in &self.headers {
            let target = header.target();
            if target == Target::ZERO || !target.is_met_by(header.block_hash()) {
                return Err(SpvError::InsufficientWork);
            }
        }
        Ok(())
    }

    /// Difficulty of each header relative to the network's easiest target
    pub fn difficulties(&self, params: &Params) -> Result<Vec<u128>, SpvError> {
        self.headers
            .iter()
            .map(|header| header_difficulty(header, params))
            .collect()
    }
}

/// Difficulty encoded by a header's `bits`
pub fn header_difficulty(header: &Header, params: &Params) -> Result<u128, SpvError> {
    let target = header.target();
    if target == Target::ZERO {
        return Err(SpvError::InsufficientWork);
    }
    Ok(target.difficulty(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::block::Version;
    use bitcoin::consensus::serialize;
    use bitcoin::pow::CompactTarget;
    use bitcoin::{BlockHash, Network, TxMerkleNode};

    const REGTEST_BITS: u32 = 0x207f_ffff;

    fn mine(prev: BlockHash, merkle_root: [u8; 32]) -> Header {
        let mut header = Header {
            version: Version::ONE,
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

    fn chain(len: usize) -> Vec<Header> {
        let mut headers = vec![mine(BlockHash::all_zeros(), [1u8; 32])];
        while headers.len() < len {
            let prev = headers[headers.len() - 1].block_hash();
            headers.push(mine(prev, [0u8; 32]));
        }
        headers
    }

    fn raw(headers: &[Header]) -> Vec<u8> {
        headers.iter().flat_map(|h| serialize(h)).collect()
    }

    #[test]
    fn test_parse_rejects_bad_lengths() {
        assert!(matches!(HeaderChain::parse(&[]), Err(SpvError::InvalidHeaderChainLength)));
        assert!(matches!(
            HeaderChain::parse(&[0u8; 81]),
            Err(SpvError::InvalidHeaderChainLength)
        ));
    }

    #[test]
    fn test_valid_chain() {
        let headers = chain(3);
        let parsed = HeaderChain::parse(&raw(&headers)).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.merkle_root(), [1u8; 32]);
        parsed.validate_linkage().unwrap();
        parsed.validate_work().unwrap();

        let params = Params::new(Network::Regtest);
        assert_eq!(parsed.difficulties(&params).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn test_broken_linkage() {
        let mut headers = chain(2);
        headers.swap(0, 1);
        let parsed = HeaderChain::parse(&raw(&headers)).unwrap();
        assert!(matches!(parsed.validate_linkage(), Err(SpvError::InvalidHeaderLinkage)));
    }

    #[test]
    fn test_unmined_header_has_insufficient_work() {
        let mut header = mine(BlockHash::all_zeros(), [1u8; 32]);
        // Walk forward to a nonce whose hash misses the target
        while header.target().is_met_by(header.block_hash()) {
            header.nonce += 1;
        }
        let parsed = HeaderChain::parse(&serialize(&header)).unwrap();
        assert!(matches!(parsed.validate_work(), Err(SpvError::InsufficientWork)));
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let mut header = mine(BlockHash::all_zeros(), [1u8; 32]);
        header.bits = CompactTarget::from_consensus(0);
        let params = Params::new(Network::Regtest);
        assert!(matches!(
            header_difficulty(&header, &params),
            Err(SpvError::InsufficientWork)
        ));
    }
}
