//! Optimistic Minting
//!
//! The built-in vault: minter and guardian roles, per-depositor debt and the
//! token ledger it mints into.

pub mod ledger;
pub mod roles;
pub mod token;

pub use ledger::{
    AccountAmount, MintingContext, OptimisticMintingRequest, OptimisticMintingState,
    OptimisticMintingVault,
};
pub use roles::{Role, RoleSet};
pub use token::{StagedMints, TokenLedger};
