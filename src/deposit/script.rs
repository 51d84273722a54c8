//! Deposit locking script
//!
//! ```text
//! <depositor20> DROP
//! [<extraData32> DROP]
//! <blinding8> DROP
//! DUP HASH160 <walletPKH20> EQUAL
//! IF
//!   CHECKSIG
//! ELSE
//!   DUP HASH160 <refundPKH20> EQUALVERIFY
//!   <locktime4> CHECKLOCKTIMEVERIFY DROP
//!   CHECKSIG
//! ENDIF
//! ```
//!
//! Funds go to either P2SH (HASH160 of the script) or P2WSH (SHA-256 of the
//! script).

use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CLTV, OP_DROP, OP_DUP, OP_ELSE, OP_ENDIF, OP_EQUAL, OP_EQUALVERIFY,
    OP_HASH160, OP_IF,
};
use bitcoin::script::Builder;
use bitcoin::{Script, ScriptBuf};

use crate::common::error::BridgeError;
use crate::types::DepositRevealInfo;

/// Hash carried by a funding output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingScriptHash {
    /// P2SH, P2PKH or a 20-byte witness program
    Hash20([u8; 20]),
    /// P2WSH or another 32-byte witness program
    Hash32([u8; 32]),
}

/// Rebuild the locking script committed to by a reveal
pub fn deposit_script(reveal: &DepositRevealInfo) -> ScriptBuf {
    let mut builder = Builder::new()
        .push_slice(reveal.depositor.0)
        .push_opcode(OP_DROP);

    if let Some(extra_data) = reveal.extra_data {
        builder = builder.push_slice(extra_data).push_opcode(OP_DROP);
    }

    builder
        .push_slice(reveal.blinding_factor)
        .push_opcode(OP_DROP)
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(reveal.wallet_pub_key_hash)
        .push_opcode(OP_EQUAL)
        .push_opcode(OP_IF)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ELSE)
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(reveal.refund_pub_key_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_slice(reveal.refund_locktime)
        .push_opcode(OP_CLTV)
        .push_opcode(OP_DROP)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ENDIF)
        .into_script()
}

/// P2SH output script paying to the deposit script
pub fn p2sh_output(script: &Script) -> ScriptBuf {
    ScriptBuf::new_p2sh(&script.script_hash())
}

/// P2WSH output script paying to the deposit script
pub fn p2wsh_output(script: &Script) -> ScriptBuf {
    ScriptBuf::new_p2wsh(&script.wscript_hash())
}

/// Extract the hash an output script pays to
pub fn extract_script_hash(output_script: &Script) -> Result<FundingScriptHash, BridgeError> {
    let bytes = output_script.as_bytes();

    let hash: &[u8] = if output_script.is_p2sh() {
        &bytes[2..22]
    } else if output_script.is_p2pkh() {
        &bytes[3..23]
    } else if output_script.is_witness_program() {
        &bytes[2..]
    } else {
        return Err(BridgeError::WrongScriptLength);
    };

    if let Ok(hash) = <[u8; 20]>::try_from(hash) {
        Ok(FundingScriptHash::Hash20(hash))
    } else if let Ok(hash) = <[u8; 32]>::try_from(hash) {
        Ok(FundingScriptHash::Hash32(hash))
    } else {
        Err(BridgeError::WrongScriptLength)
    }
}

/// Check that a funding output pays to `expected`
pub fn check_funding_script(output_script: &Script, expected: &Script) -> Result<(), BridgeError> {
    let matches = match extract_script_hash(output_script)? {
        FundingScriptHash::Hash20(hash) => hash == expected.script_hash().to_byte_array(),
        FundingScriptHash::Hash32(hash) => hash == expected.wscript_hash().to_byte_array(),
    };

    if matches {
        Ok(())
    } else {
        Err(BridgeError::WrongScriptHash)
    }
}
