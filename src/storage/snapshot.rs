//! Bridge snapshots
//!
//! Every persisted surface of the ledger in one serializable value.

use serde::{Deserialize, Serialize};

use super::traits::{StorageError, StorageResult};
use crate::governance::GovernanceState;
use crate::minting::OptimisticMintingState;
use crate::spv::EpochDifficulty;
use crate::types::{AccountId, DepositRequest};
use crate::wallet::WalletRegistryState;

/// Layout version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSnapshot {
    pub version: u32,
    pub taken_at: u64,
    pub governance: GovernanceState,
    /// Sorted by deposit key
    pub deposits: Vec<DepositRequest>,
    pub wallets: WalletRegistryState,
    /// Sorted by account
    pub bank_balances: Vec<(AccountId, u64)>,
    pub trusted_vaults: Vec<AccountId>,
    pub epoch_difficulty: EpochDifficulty,
    pub minting: OptimisticMintingState,
}

impl BridgeSnapshot {
    /// Reject snapshots written by another layout
    pub fn check_version(&self) -> StorageResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::common::Network;
    use crate::governance::{ParameterKey, PendingUpdate};
    use crate::minting::{AccountAmount, OptimisticMintingRequest};
    use crate::types::{DepositKey, Wallet, WalletState};

    pub fn snapshot() -> BridgeSnapshot {
        let id = AccountId::from_low_u64;
        let deposit = DepositRequest {
            depositor: id(100),
            funding_tx_hash: [1; 32],
            funding_output_index: 2,
            wallet_pub_key_hash: [0x11; 20],
            refund_pub_key_hash: [0x22; 20],
            refund_locktime: [0x80, 0xf0, 0xfa, 0x02],
            amount: 20_000,
            revealed_at: 500,
            swept_at: Some(900),
            vault: Some(id(3)),
            treasury_fee: 10,
            extra_data: Some([0x33; 32]),
        };
        let unswept = DepositRequest {
            funding_tx_hash: [4; 32],
            funding_output_index: 0,
            swept_at: None,
            vault: None,
            extra_data: None,
            ..deposit.clone()
        };

        let mut deposits = vec![deposit, unswept];
        deposits.sort_by_key(|d| DepositKey::derive(&d.funding_tx_hash, d.funding_output_index));

        BridgeSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: 1_000,
            governance: GovernanceState {
                owner: id(1),
                treasury: id(2),
                parameters: Network::Regtest.default_parameters(),
                pending: vec![(
                    ParameterKey::DepositDustThreshold,
                    PendingUpdate {
                        value: 20_000,
                        initiated_at: 950,
                    },
                )],
                pending_treasury: None,
            },
            deposits,
            wallets: WalletRegistryState {
                wallets: vec![Wallet {
                    pub_key_hash: [0x11; 20],
                    state: WalletState::Live,
                    main_utxo_hash: Some([9; 32]),
                }],
                spent_main_utxos: vec![[8; 32]],
            },
            bank_balances: vec![(id(2), 10), (id(3), 17_990), (id(u64::MAX), u64::MAX)],
            trusted_vaults: vec![id(3)],
            epoch_difficulty: EpochDifficulty::new(u128::from(u64::MAX) + 1, 1),
            minting: OptimisticMintingState {
                minters: vec![id(10)],
                guardians: vec![id(11)],
                requests: vec![(
                    DepositKey::derive(&[1; 32], 2),
                    OptimisticMintingRequest {
                        requested_at: 600,
                        finalized_at: Some(700),
                    },
                )],
                debts: vec![AccountAmount {
                    account: id(100),
                    amount: 199_900_000_000_000,
                }],
                token_balances: vec![AccountAmount {
                    account: id(100),
                    amount: 199_500_200_000_000,
                }],
                paused: false,
            },
        }
    }
}
