//! Deposit Reveal
//!
//! ```text
//! funding tx ─┐
//!             ├─► rebuild script ─► compare P2SH/P2WSH hash ─► dust check ─► record
//! reveal info ┘
//! ```
//!
//! A deposit becomes sweepable once revealed; the sweep processor is the only
//! writer after that.

pub mod registry;
pub mod script;

pub use registry::{validate_refund_locktime, DepositRegistry, RevealContext, LOCKTIME_THRESHOLD};
pub use script::{
    check_funding_script, deposit_script, extract_script_hash, p2sh_output, p2wsh_output,
    FundingScriptHash,
};
