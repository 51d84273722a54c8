//! Common Error Types for the Bridge Ledger
//!
//! Every protocol failure is a distinct variant so callers can match on it.
//! SPV failures keep their own enum and are wrapped unchanged.

use thiserror::Error;

use crate::minting::Role;
use crate::spv::SpvError;
use crate::storage::StorageError;
use crate::types::{AccountId, WalletState};

/// Broad classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Proof,
    Accounting,
    Authorization,
    Timer,
    Infrastructure,
}

/// Root error type for the bridge ledger
#[derive(Debug, Error)]
pub enum BridgeError {
    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------
    #[error("funding output script hash does not match the deposit script")]
    WrongScriptHash,

    #[error("funding output script hash must be 20 or 32 bytes")]
    WrongScriptLength,

    #[error("funding transaction has no output at index {0}")]
    FundingOutputNotFound(u32),

    #[error("deposit amount {amount} is below dust threshold {threshold}")]
    DustAmount { amount: u64, threshold: u64 },

    #[error("deposit already revealed")]
    AlreadyRevealed,

    #[error("vault {0} is not trusted")]
    UntrustedVault(AccountId),

    #[error("wallet state {0} does not allow this operation")]
    WalletNotLive(WalletState),

    #[error("refund locktime {0} is not a timestamp")]
    RefundLocktimeNotTimestamp(u32),

    #[error("refund locktime {0} is too close")]
    RefundLocktimeTooClose(u32),

    #[error("invalid value for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    // ------------------------------------------------------------------
    // Proof
    // ------------------------------------------------------------------
    #[error("SPV proof rejected: {0}")]
    Proof(#[from] SpvError),

    // ------------------------------------------------------------------
    // Accounting
    // ------------------------------------------------------------------
    #[error("sweep input spends neither a revealed deposit nor the main UTXO")]
    UnknownInputType,

    #[error("deposit already swept")]
    AlreadySwept,

    #[error("main UTXO data does not match the wallet commitment")]
    InvalidMainUtxoData,

    #[error("wallet main UTXO was expected but not provided or not spent")]
    ExpectedMainUtxoMissing,

    #[error("wallet has no main UTXO but one was provided")]
    MainUtxoNotExpected,

    #[error("deposit is routed to another vault")]
    RoutedToAnotherVault,

    #[error("sweep must process at least one deposit")]
    MustProcessAtLeastOneDeposit,

    #[error("sweep fee {fee} exceeds the maximum {max} for the batch")]
    TransactionFeeTooHigh { fee: u64, max: u64 },

    #[error("sweep transaction must have a single output")]
    MustHaveSingleOutput,

    #[error("sweep output must pay to a 20-byte public key hash")]
    OutputMustBe20Byte,

    #[error("sweep output value exceeds the total input value")]
    OutputExceedsInputs,

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("deposit not found")]
    DepositNotFound,

    #[error("deposit is not routed to this vault")]
    UnexpectedVault,

    #[error("optimistic minting already requested for the deposit")]
    AlreadyRequested,

    #[error("optimistic minting not requested for the deposit")]
    NotRequested,

    #[error("optimistic minting already finalized for the deposit")]
    AlreadyFinalized,

    #[error("optimistic minting is paused")]
    OptimisticMintingPaused,

    #[error("optimistic minting already paused")]
    AlreadyPaused,

    #[error("optimistic minting is not paused")]
    NotPaused,

    #[error("invalid balance increase: {0}")]
    InvalidBalanceIncrease(&'static str),

    #[error("no vault registered under {0}")]
    UnknownVault(AccountId),

    // ------------------------------------------------------------------
    // Authorization
    // ------------------------------------------------------------------
    #[error("caller {0} is not the owner")]
    NotOwner(AccountId),

    #[error("caller {0} is not a minter")]
    NotMinter(AccountId),

    #[error("caller {0} is not a guardian")]
    NotGuardian(AccountId),

    #[error("{account} is already a {role}")]
    AlreadyMember { role: Role, account: AccountId },

    #[error("{account} is not a {role}")]
    NotMember { role: Role, account: AccountId },

    // ------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------
    #[error("change not initiated")]
    ChangeNotInitiated,

    #[error("delay has not elapsed")]
    DelayNotElapsed,

    // ------------------------------------------------------------------
    // Infrastructure
    // ------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        use BridgeError::*;
        match self {
            WrongScriptHash
            | WrongScriptLength
            | FundingOutputNotFound(_)
            | DustAmount { .. }
            | AlreadyRevealed
            | UntrustedVault(_)
            | WalletNotLive(_)
            | RefundLocktimeNotTimestamp(_)
            | RefundLocktimeTooClose(_)
            | InvalidParameter { .. } => ErrorCategory::Validation,

            Proof(_) => ErrorCategory::Proof,

            UnknownInputType
            | AlreadySwept
            | InvalidMainUtxoData
            | ExpectedMainUtxoMissing
            | MainUtxoNotExpected
            | RoutedToAnotherVault
            | MustProcessAtLeastOneDeposit
            | TransactionFeeTooHigh { .. }
            | MustHaveSingleOutput
            | OutputMustBe20Byte
            | OutputExceedsInputs
            | ArithmeticOverflow
            | DepositNotFound
            | UnexpectedVault
            | AlreadyRequested
            | NotRequested
            | AlreadyFinalized
            | OptimisticMintingPaused
            | AlreadyPaused
            | NotPaused
            | InvalidBalanceIncrease(_)
            | UnknownVault(_) => ErrorCategory::Accounting,

            NotOwner(_)
            | NotMinter(_)
            | NotGuardian(_)
            | AlreadyMember { .. }
            | NotMember { .. } => ErrorCategory::Authorization,

            ChangeNotInitiated | DelayNotElapsed => ErrorCategory::Timer,

            Config(_) | Logging(_) | Storage(_) | Io(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Check if this is a retryable error
    ///
    /// Protocol rejections are final; only infrastructure may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Storage(_) | BridgeError::Io(_))
    }

    /// Stable error code for logs and callers
    pub fn error_code(&self) -> &'static str {
        use BridgeError::*;
        match self {
            WrongScriptHash => "WRONG_SCRIPT_HASH",
            WrongScriptLength => "WRONG_SCRIPT_LENGTH",
            FundingOutputNotFound(_) => "FUNDING_OUTPUT_NOT_FOUND",
            DustAmount { .. } => "DUST_AMOUNT",
            AlreadyRevealed => "ALREADY_REVEALED",
            UntrustedVault(_) => "UNTRUSTED_VAULT",
            WalletNotLive(_) => "WALLET_NOT_LIVE",
            RefundLocktimeNotTimestamp(_) => "REFUND_LOCKTIME_NOT_TIMESTAMP",
            RefundLocktimeTooClose(_) => "REFUND_LOCKTIME_TOO_CLOSE",
            InvalidParameter { .. } => "INVALID_PARAMETER",
            Proof(e) => e.error_code(),
            UnknownInputType => "UNKNOWN_INPUT_TYPE",
            AlreadySwept => "ALREADY_SWEPT",
            InvalidMainUtxoData => "INVALID_MAIN_UTXO_DATA",
            ExpectedMainUtxoMissing => "EXPECTED_MAIN_UTXO_MISSING",
            MainUtxoNotExpected => "MAIN_UTXO_NOT_EXPECTED",
            RoutedToAnotherVault => "ROUTED_TO_ANOTHER_VAULT",
            MustProcessAtLeastOneDeposit => "MUST_PROCESS_AT_LEAST_ONE_DEPOSIT",
            TransactionFeeTooHigh { .. } => "TRANSACTION_FEE_TOO_HIGH",
            MustHaveSingleOutput => "MUST_HAVE_SINGLE_OUTPUT",
            OutputMustBe20Byte => "OUTPUT_MUST_BE_20_BYTE",
            OutputExceedsInputs => "OUTPUT_EXCEEDS_INPUTS",
            ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
            DepositNotFound => "DEPOSIT_NOT_FOUND",
            UnexpectedVault => "UNEXPECTED_VAULT",
            AlreadyRequested => "ALREADY_REQUESTED",
            NotRequested => "NOT_REQUESTED",
            AlreadyFinalized => "ALREADY_FINALIZED",
            OptimisticMintingPaused => "OPTIMISTIC_MINTING_PAUSED",
            AlreadyPaused => "ALREADY_PAUSED",
            NotPaused => "NOT_PAUSED",
            InvalidBalanceIncrease(_) => "INVALID_BALANCE_INCREASE",
            UnknownVault(_) => "UNKNOWN_VAULT",
            NotOwner(_) => "NOT_OWNER",
            NotMinter(_) => "NOT_MINTER",
            NotGuardian(_) => "NOT_GUARDIAN",
            AlreadyMember { .. } => "ALREADY_MEMBER",
            NotMember { .. } => "NOT_MEMBER",
            ChangeNotInitiated => "CHANGE_NOT_INITIATED",
            DelayNotElapsed => "DELAY_NOT_ELAPSED",
            Config(_) => "CONFIG_ERROR",
            Logging(_) => "LOGGING_ERROR",
            Storage(_) => "STORAGE_ERROR",
            Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
