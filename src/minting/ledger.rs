//! Optimistic minting ledger
//!
//! Minters front tokens for a revealed deposit before its sweep is proven.
//! Each finalized mint records the gross amount as debt of the depositor;
//! when the sweep later reaches this vault, the depositor's share repays the
//! debt first and only the surplus is minted.
//!
//! ```text
//! request ──(delay)──► finalize ──► debt += gross
//!    │                                  │
//!    └──► cancel (guardian)             ▼
//!                     sweep ──► receive_balance_increase ──► repay, mint surplus
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::roles::{Role, RoleSet};
use super::token::TokenLedger;
use crate::bank::Vault;
use crate::common::error::{BridgeError, Result};
use crate::deposit::DepositRegistry;
use crate::governance::BridgeParameters;
use crate::types::units::{sats_to_token_units, u128_string};
use crate::types::{AccountId, BridgeEvent, DepositKey, DepositRequest};

/// One request per deposit key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimisticMintingRequest {
    pub requested_at: u64,
    pub finalized_at: Option<u64>,
}

impl OptimisticMintingRequest {
    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }
}

/// Everything request and finalize read besides the ledger itself
pub struct MintingContext<'a> {
    pub deposits: &'a DepositRegistry,
    pub params: &'a BridgeParameters,
    pub treasury: AccountId,
    pub now: u64,
}

/// Account paired with a token amount, for persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAmount {
    pub account: AccountId,
    #[serde(with = "u128_string")]
    pub amount: u128,
}

/// Persisted form of the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimisticMintingState {
    pub minters: Vec<AccountId>,
    pub guardians: Vec<AccountId>,
    pub requests: Vec<(DepositKey, OptimisticMintingRequest)>,
    pub debts: Vec<AccountAmount>,
    pub token_balances: Vec<AccountAmount>,
    pub paused: bool,
}

#[derive(Debug, Clone)]
pub struct OptimisticMintingVault {
    id: AccountId,
    minters: RoleSet,
    guardians: RoleSet,
    requests: HashMap<DepositKey, OptimisticMintingRequest>,
    debts: HashMap<AccountId, u128>,
    paused: bool,
    token: TokenLedger,
}

impl OptimisticMintingVault {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            minters: RoleSet::new(Role::Minter),
            guardians: RoleSet::new(Role::Guardian),
            requests: HashMap::new(),
            debts: HashMap::new(),
            paused: false,
            token: TokenLedger::new(),
        }
    }

    pub fn from_state(id: AccountId, state: OptimisticMintingState) -> Result<Self> {
        let token = TokenLedger::from_balances(
            state.token_balances.into_iter().map(|e| (e.account, e.amount)),
        )?;
        Ok(Self {
            id,
            minters: RoleSet::from_members(Role::Minter, state.minters),
            guardians: RoleSet::from_members(Role::Guardian, state.guardians),
            requests: state.requests.into_iter().collect(),
            debts: state
                .debts
                .into_iter()
                .map(|e| (e.account, e.amount))
                .collect(),
            paused: state.paused,
            token,
        })
    }

    pub fn to_state(&self) -> OptimisticMintingState {
        let mut requests: Vec<_> = self.requests.iter().map(|(k, r)| (*k, *r)).collect();
        requests.sort_by(|a, b| a.0.cmp(&b.0));

        let mut debts: Vec<_> = self
            .debts
            .iter()
            .map(|(account, amount)| AccountAmount {
                account: *account,
                amount: *amount,
            })
            .collect();
        debts.sort_by(|a, b| a.account.cmp(&b.account));

        let mut token_balances: Vec<_> = self
            .token
            .balances()
            .map(|(account, amount)| AccountAmount {
                account: *account,
                amount: *amount,
            })
            .collect();
        token_balances.sort_by(|a, b| a.account.cmp(&b.account));

        OptimisticMintingState {
            minters: self.minters.members().to_vec(),
            guardians: self.guardians.members().to_vec(),
            requests,
            debts,
            token_balances,
            paused: self.paused,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn minters(&self) -> &[AccountId] {
        self.minters.members()
    }

    pub fn guardians(&self) -> &[AccountId] {
        self.guardians.members()
    }

    pub fn is_minter(&self, account: &AccountId) -> bool {
        self.minters.contains(account)
    }

    pub fn is_guardian(&self, account: &AccountId) -> bool {
        self.guardians.contains(account)
    }

    pub fn request_of(&self, deposit_key: &DepositKey) -> Option<&OptimisticMintingRequest> {
        self.requests.get(deposit_key)
    }

    /// Outstanding debt in token units
    pub fn debt_of(&self, depositor: &AccountId) -> u128 {
        self.debts.get(depositor).copied().unwrap_or(0)
    }

    pub fn token(&self) -> &TokenLedger {
        &self.token
    }

    // ------------------------------------------------------------------
    // Minting
    // ------------------------------------------------------------------

    pub fn request(
        &mut self,
        caller: AccountId,
        deposit_key: DepositKey,
        ctx: &MintingContext<'_>,
    ) -> Result<BridgeEvent> {
        self.ensure_minter(caller)?;
        self.ensure_not_paused()?;

        let deposit = self.unswept_deposit(&deposit_key, ctx)?;
        // A deposit not routed here never repays its debt through this vault
        if deposit.vault != Some(self.id) {
            return Err(BridgeError::UnexpectedVault);
        }
        if self.requests.contains_key(&deposit_key) {
            return Err(BridgeError::AlreadyRequested);
        }

        self.requests.insert(
            deposit_key,
            OptimisticMintingRequest {
                requested_at: ctx.now,
                finalized_at: None,
            },
        );

        Ok(BridgeEvent::OptimisticMintingRequested {
            minter: caller,
            deposit_key,
            depositor: deposit.depositor,
            amount: deposit.amount,
            funding_tx_hash: deposit.funding_tx_hash,
            funding_output_index: deposit.funding_output_index,
        })
    }

    pub fn finalize(
        &mut self,
        caller: AccountId,
        deposit_key: DepositKey,
        ctx: &MintingContext<'_>,
    ) -> Result<BridgeEvent> {
        self.ensure_minter(caller)?;
        self.ensure_not_paused()?;

        let request = self
            .requests
            .get(&deposit_key)
            .copied()
            .ok_or(BridgeError::NotRequested)?;
        if request.is_finalized() {
            return Err(BridgeError::AlreadyFinalized);
        }
        if ctx.now.saturating_sub(request.requested_at) < ctx.params.optimistic_minting_delay {
            return Err(BridgeError::DelayNotElapsed);
        }

        let deposit = self.unswept_deposit(&deposit_key, ctx)?;
        let depositor = deposit.depositor;

        let gross = sats_to_token_units(deposit.amount_after_treasury_fee());
        let mint_fee = match ctx.params.optimistic_minting_fee_divisor {
            0 => 0,
            divisor => gross / u128::from(divisor),
        };

        let debt = self
            .debt_of(&depositor)
            .checked_add(gross)
            .ok_or(BridgeError::ArithmeticOverflow)?;
        let staged = self
            .token
            .stage(&[(depositor, gross - mint_fee), (ctx.treasury, mint_fee)])?;

        self.token.commit(staged);
        self.debts.insert(depositor, debt);
        if let Some(request) = self.requests.get_mut(&deposit_key) {
            request.finalized_at = Some(ctx.now);
        }

        tracing::debug!(
            target: "bridge::minting",
            deposit_key = %deposit_key,
            gross = %gross,
            mint_fee = %mint_fee,
            "optimistic mint finalized"
        );

        Ok(BridgeEvent::OptimisticMintingFinalized {
            minter: caller,
            deposit_key,
            depositor,
            optimistic_minting_debt: debt,
        })
    }

    pub fn cancel(&mut self, caller: AccountId, deposit_key: DepositKey) -> Result<BridgeEvent> {
        if !self.guardians.contains(&caller) {
            return Err(BridgeError::NotGuardian(caller));
        }

        let request = self
            .requests
            .get(&deposit_key)
            .ok_or(BridgeError::NotRequested)?;
        if request.is_finalized() {
            return Err(BridgeError::AlreadyFinalized);
        }
        self.requests.remove(&deposit_key);

        Ok(BridgeEvent::OptimisticMintingCancelled {
            guardian: caller,
            deposit_key,
        })
    }

    // ------------------------------------------------------------------
    // Administration; the caller has already been checked as owner
    // ------------------------------------------------------------------

    pub fn pause(&mut self) -> Result<BridgeEvent> {
        if self.paused {
            return Err(BridgeError::AlreadyPaused);
        }
        self.paused = true;
        Ok(BridgeEvent::OptimisticMintingPaused)
    }

    pub fn unpause(&mut self) -> Result<BridgeEvent> {
        if !self.paused {
            return Err(BridgeError::NotPaused);
        }
        self.paused = false;
        Ok(BridgeEvent::OptimisticMintingUnpaused)
    }

    pub fn add_minter(&mut self, minter: AccountId) -> Result<BridgeEvent> {
        self.minters.add(minter)?;
        Ok(BridgeEvent::MinterAdded { minter })
    }

    pub fn remove_minter(&mut self, minter: AccountId) -> Result<BridgeEvent> {
        self.minters.remove(minter)?;
        Ok(BridgeEvent::MinterRemoved { minter })
    }

    pub fn add_guardian(&mut self, guardian: AccountId) -> Result<BridgeEvent> {
        self.guardians.add(guardian)?;
        Ok(BridgeEvent::GuardianAdded { guardian })
    }

    pub fn remove_guardian(&mut self, guardian: AccountId) -> Result<BridgeEvent> {
        self.guardians.remove(guardian)?;
        Ok(BridgeEvent::GuardianRemoved { guardian })
    }

    fn ensure_minter(&self, caller: AccountId) -> Result<()> {
        if !self.minters.contains(&caller) {
            return Err(BridgeError::NotMinter(caller));
        }
        Ok(())
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(BridgeError::OptimisticMintingPaused);
        }
        Ok(())
    }

    fn unswept_deposit<'c>(
        &self,
        deposit_key: &DepositKey,
        ctx: &MintingContext<'c>,
    ) -> Result<&'c DepositRequest> {
        let deposit = ctx
            .deposits
            .get(deposit_key)
            .ok_or(BridgeError::DepositNotFound)?;
        if deposit.is_swept() {
            return Err(BridgeError::AlreadySwept);
        }
        Ok(deposit)
    }
}

impl Vault for OptimisticMintingVault {
    fn id(&self) -> AccountId {
        self.id
    }

    fn receive_balance_increase(
        &mut self,
        depositors: &[AccountId],
        amounts: &[u64],
    ) -> Result<Vec<BridgeEvent>> {
        if depositors.is_empty() {
            return Err(BridgeError::InvalidBalanceIncrease("no depositors specified"));
        }
        if depositors.len() != amounts.len() {
            return Err(BridgeError::InvalidBalanceIncrease(
                "depositors and amounts differ in length",
            ));
        }

        let mut debts: HashMap<AccountId, u128> = HashMap::new();
        let mut mints = Vec::new();
        let mut events = Vec::new();

        for (depositor, amount) in depositors.iter().zip(amounts) {
            let scaled = sats_to_token_units(*amount);
            let debt = match debts.get(depositor) {
                Some(staged) => *staged,
                None => self.debt_of(depositor),
            };

            let repay = debt.min(scaled);
            if repay > 0 {
                let remaining = debt - repay;
                debts.insert(*depositor, remaining);
                events.push(BridgeEvent::OptimisticMintingDebtRepaid {
                    depositor: *depositor,
                    optimistic_minting_debt: remaining,
                });
            }

            let surplus = scaled - repay;
            if surplus > 0 {
                mints.push((*depositor, surplus));
            }
        }

        let staged = self.token.stage(&mints)?;

        self.token.commit(staged);
        for (depositor, debt) in debts {
            if debt == 0 {
                self.debts.remove(&depositor);
            } else {
                self.debts.insert(depositor, debt);
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::units::SATOSHI_MULTIPLIER;

    const VAULT: u64 = 3;
    const MINTER: u64 = 10;
    const GUARDIAN: u64 = 11;
    const DEPOSITOR: u64 = 20;
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
            optimistic_minting_fee_divisor: 500,
            optimistic_minting_delay: 60,
            governance_delay: 60,
        }
    }

    fn deposit(tx_byte: u8, amount: u64, vault: Option<AccountId>) -> (DepositKey, DepositRequest) {
        let funding_tx_hash = [tx_byte; 32];
        let key = DepositKey::derive(&funding_tx_hash, 0);
        let request = DepositRequest {
            depositor: id(DEPOSITOR),
            funding_tx_hash,
            funding_output_index: 0,
            wallet_pub_key_hash: [0xaa; 20],
            refund_pub_key_hash: [0xbb; 20],
            refund_locktime: [0; 4],
            amount,
            revealed_at: 0,
            swept_at: None,
            vault,
            treasury_fee: amount / 2_000,
            extra_data: None,
        };
        (key, request)
    }

    fn vault() -> OptimisticMintingVault {
        let mut vault = OptimisticMintingVault::new(id(VAULT));
        vault.add_minter(id(MINTER)).unwrap();
        vault.add_guardian(id(GUARDIAN)).unwrap();
        vault
    }

    fn ctx<'a>(deposits: &'a DepositRegistry, params: &'a BridgeParameters, now: u64) -> MintingContext<'a> {
        MintingContext {
            deposits,
            params,
            treasury: id(TREASURY),
            now,
        }
    }

    #[test]
    fn test_finalize_mints_net_of_fee_and_records_debt() {
        let (key, request) = deposit(1, 20_000, Some(id(VAULT)));
        let deposits = DepositRegistry::from_deposits([(key, request)]);
        let params = params();
        let mut vault = vault();

        vault.request(id(MINTER), key, &ctx(&deposits, &params, 100)).unwrap();
        let event = vault.finalize(id(MINTER), key, &ctx(&deposits, &params, 160)).unwrap();

        // 20000 - 10 treasury fee
        let gross = 19_990 * SATOSHI_MULTIPLIER;
        let fee = gross / 500;
        assert_eq!(vault.token().balance_of(&id(DEPOSITOR)), gross - fee);
        assert_eq!(vault.token().balance_of(&id(TREASURY)), fee);
        assert_eq!(vault.debt_of(&id(DEPOSITOR)), gross);
        assert_eq!(vault.request_of(&key).unwrap().finalized_at, Some(160));
        assert!(matches!(
            event,
            BridgeEvent::OptimisticMintingFinalized { optimistic_minting_debt, .. } if optimistic_minting_debt == gross
        ));
    }

    #[test]
    fn test_finalize_before_delay() {
        let (key, request) = deposit(1, 20_000, Some(id(VAULT)));
        let deposits = DepositRegistry::from_deposits([(key, request)]);
        let params = params();
        let mut vault = vault();

        vault.request(id(MINTER), key, &ctx(&deposits, &params, 100)).unwrap();
        assert!(matches!(
            vault.finalize(id(MINTER), key, &ctx(&deposits, &params, 159)),
            Err(BridgeError::DelayNotElapsed)
        ));
        assert_eq!(vault.debt_of(&id(DEPOSITOR)), 0);
        assert_eq!(vault.token().total_supply(), 0);
    }

    #[test]
    fn test_request_checks() {
        let (routed, routed_req) = deposit(1, 20_000, Some(id(VAULT)));
        let (direct, direct_req) = deposit(2, 20_000, None);
        let (other, other_req) = deposit(3, 20_000, Some(id(99)));
        let (swept, mut swept_req) = deposit(4, 20_000, Some(id(VAULT)));
        swept_req.swept_at = Some(50);
        let deposits = DepositRegistry::from_deposits([
            (routed, routed_req),
            (direct, direct_req),
            (other, other_req),
            (swept, swept_req),
        ]);
        let params = params();
        let c = ctx(&deposits, &params, 100);
        let mut vault = vault();

        assert!(matches!(
            vault.request(id(GUARDIAN), routed, &c),
            Err(BridgeError::NotMinter(_))
        ));
        assert!(matches!(
            vault.request(id(MINTER), DepositKey([9; 32]), &c),
            Err(BridgeError::DepositNotFound)
        ));
        assert!(matches!(
            vault.request(id(MINTER), swept, &c),
            Err(BridgeError::AlreadySwept)
        ));
        assert!(matches!(
            vault.request(id(MINTER), direct, &c),
            Err(BridgeError::UnexpectedVault)
        ));
        assert!(matches!(
            vault.request(id(MINTER), other, &c),
            Err(BridgeError::UnexpectedVault)
        ));

        vault.request(id(MINTER), routed, &c).unwrap();
        assert!(matches!(
            vault.request(id(MINTER), routed, &c),
            Err(BridgeError::AlreadyRequested)
        ));
    }

    #[test]
    fn test_pause_blocks_request_and_finalize() {
        let (key, request) = deposit(1, 20_000, Some(id(VAULT)));
        let deposits = DepositRegistry::from_deposits([(key, request)]);
        let params = params();
        let mut vault = vault();

        vault.request(id(MINTER), key, &ctx(&deposits, &params, 100)).unwrap();
        vault.pause().unwrap();
        assert!(matches!(vault.pause(), Err(BridgeError::AlreadyPaused)));
        assert!(matches!(
            vault.finalize(id(MINTER), key, &ctx(&deposits, &params, 500)),
            Err(BridgeError::OptimisticMintingPaused)
        ));

        vault.unpause().unwrap();
        assert!(matches!(vault.unpause(), Err(BridgeError::NotPaused)));
        vault.finalize(id(MINTER), key, &ctx(&deposits, &params, 500)).unwrap();
    }

    #[test]
    fn test_cancel() {
        let (key, request) = deposit(1, 20_000, Some(id(VAULT)));
        let deposits = DepositRegistry::from_deposits([(key, request)]);
        let params = params();
        let mut vault = vault();

        assert!(matches!(vault.cancel(id(GUARDIAN), key), Err(BridgeError::NotRequested)));
        vault.request(id(MINTER), key, &ctx(&deposits, &params, 100)).unwrap();
        assert!(matches!(vault.cancel(id(MINTER), key), Err(BridgeError::NotGuardian(_))));

        vault.cancel(id(GUARDIAN), key).unwrap();
        assert!(vault.request_of(&key).is_none());

        // A cancelled deposit can be requested again
        vault.request(id(MINTER), key, &ctx(&deposits, &params, 200)).unwrap();
        vault.finalize(id(MINTER), key, &ctx(&deposits, &params, 260)).unwrap();
        assert!(matches!(vault.cancel(id(GUARDIAN), key), Err(BridgeError::AlreadyFinalized)));
    }

    #[test]
    fn test_balance_increase_repays_debt_then_mints_surplus() {
        let mut vault = vault();
        vault.debts.insert(id(DEPOSITOR), 1_000 * SATOSHI_MULTIPLIER);

        let events = vault
            .receive_balance_increase(&[id(DEPOSITOR), id(DEPOSITOR)], &[600, 700])
            .unwrap();

        assert_eq!(vault.debt_of(&id(DEPOSITOR)), 0);
        assert_eq!(vault.token().balance_of(&id(DEPOSITOR)), 300 * SATOSHI_MULTIPLIER);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            BridgeEvent::OptimisticMintingDebtRepaid {
                depositor: id(DEPOSITOR),
                optimistic_minting_debt: 400 * SATOSHI_MULTIPLIER,
            }
        );
    }

    #[test]
    fn test_balance_increase_without_debt_mints_everything() {
        let mut vault = vault();
        let events = vault.receive_balance_increase(&[id(7)], &[5_000]).unwrap();
        assert!(events.is_empty());
        assert_eq!(vault.token().balance_of(&id(7)), 5_000 * SATOSHI_MULTIPLIER);
    }

    #[test]
    fn test_balance_increase_rejects_malformed_batches() {
        let mut vault = vault();
        assert!(matches!(
            vault.receive_balance_increase(&[], &[]),
            Err(BridgeError::InvalidBalanceIncrease(_))
        ));
        assert!(matches!(
            vault.receive_balance_increase(&[id(1)], &[1, 2]),
            Err(BridgeError::InvalidBalanceIncrease(_))
        ));
    }

    #[test]
    fn test_state_round_trip() {
        let (key, request) = deposit(1, 20_000, Some(id(VAULT)));
        let deposits = DepositRegistry::from_deposits([(key, request)]);
        let params = params();
        let mut vault = vault();
        vault.request(id(MINTER), key, &ctx(&deposits, &params, 100)).unwrap();
        vault.finalize(id(MINTER), key, &ctx(&deposits, &params, 200)).unwrap();
        vault.pause().unwrap();

        let state = vault.to_state();
        let json = serde_json::to_string(&state).unwrap();
        let restored =
            OptimisticMintingVault::from_state(id(VAULT), serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(restored.to_state(), state);
        assert_eq!(restored.token().total_supply(), vault.token().total_supply());
        assert!(restored.is_paused());
    }
}
