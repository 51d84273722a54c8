//! Environment-based Configuration for the Bridge Ledger
//!
//! Loads the network, the governance identities and the initial value of
//! every tunable from environment variables. Anything not set falls back to a
//! per-network default; owner and treasury are mandatory outside regtest.
//!
//! # Environment Variables
//!
//! ## Network and identities
//! - `BRIDGE_NETWORK` - "mainnet", "testnet", "signet" or "regtest" (default: "regtest")
//! - `BRIDGE_OWNER` - 20-byte hex governance identity
//! - `BRIDGE_TREASURY` - 20-byte hex treasury identity
//! - `BRIDGE_VAULT_ID` - 20-byte hex identity of the optimistic minting vault
//!
//! ## Deposit parameters
//! - `BRIDGE_DEPOSIT_DUST_THRESHOLD` - minimum deposit in satoshis
//! - `BRIDGE_DEPOSIT_TREASURY_FEE_DIVISOR` - 0 disables the treasury fee
//! - `BRIDGE_DEPOSIT_TX_MAX_FEE` - per-deposit cap on the sweep miner fee
//! - `BRIDGE_DEPOSIT_REVEAL_AHEAD_PERIOD` - seconds; 0 disables the refund locktime check
//! - `BRIDGE_TX_PROOF_DIFFICULTY_FACTOR` - confirmations required by SPV proofs
//!
//! ## Optimistic minting and governance
//! - `BRIDGE_OPTIMISTIC_MINTING_FEE_DIVISOR` - 0 disables the minting fee
//! - `BRIDGE_OPTIMISTIC_MINTING_DELAY` - seconds between request and finalize
//! - `BRIDGE_GOVERNANCE_DELAY` - seconds between begin and finalize of an update
//!
//! ## Optional Settings
//! - `BRIDGE_DB_PATH` - SQLite database file for snapshots
//! - `BRIDGE_LOG_LEVEL` - Logging level (debug, info, warn, error)

use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::governance::{BridgeParameters, ParameterKey};
use crate::types::AccountId;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("network mismatch: expected {0}, got {1}")]
    NetworkMismatch(String, String),
}

/// Bitcoin network the bridge follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" | "dev" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidValue(
                "BRIDGE_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Get bitcoin network enum
    pub fn bitcoin_network(&self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Signet => bitcoin::Network::Signet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }

    /// Initial tunables for this network
    pub fn default_parameters(&self) -> BridgeParameters {
        match self {
            Network::Mainnet => BridgeParameters {
                deposit_dust_threshold: 1_000_000,
                deposit_treasury_fee_divisor: 2_000,
                deposit_tx_max_fee: 100_000,
                deposit_reveal_ahead_period: 15 * 24 * 3600,
                tx_proof_difficulty_factor: 6,
                optimistic_minting_fee_divisor: 500,
                optimistic_minting_delay: 3 * 3600,
                governance_delay: 48 * 3600,
            },
            Network::Testnet | Network::Signet => BridgeParameters {
                deposit_dust_threshold: 100_000,
                deposit_treasury_fee_divisor: 2_000,
                deposit_tx_max_fee: 10_000,
                deposit_reveal_ahead_period: 24 * 3600,
                tx_proof_difficulty_factor: 1,
                optimistic_minting_fee_divisor: 500,
                optimistic_minting_delay: 600,
                governance_delay: 3600,
            },
            Network::Regtest => BridgeParameters {
                deposit_dust_threshold: 10_000,
                deposit_treasury_fee_divisor: 2_000,
                deposit_tx_max_fee: 2_000,
                deposit_reveal_ahead_period: 0,
                tx_proof_difficulty_factor: 1,
                optimistic_minting_fee_divisor: 500,
                optimistic_minting_delay: 60,
                governance_delay: 60,
            },
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bitcoin network
    pub network: Network,

    /// Governance identity
    pub owner: AccountId,

    /// Receives treasury and optimistic minting fees
    pub treasury: AccountId,

    /// Identity of the built-in optimistic minting vault
    pub vault_id: AccountId,

    /// Initial tunables
    pub parameters: BridgeParameters,

    /// SQLite database path, when snapshots are persisted
    pub db_path: Option<String>,

    /// Log level
    pub log_level: String,
}

impl BridgeConfig {
    /// Regtest defaults with fixed identities, used by tests and local runs
    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            owner: AccountId::from_low_u64(1),
            treasury: AccountId::from_low_u64(2),
            vault_id: AccountId::from_low_u64(3),
            parameters: Network::Regtest.default_parameters(),
            db_path: None,
            log_level: "info".to_string(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source, `from_env` style
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let network: Network = lookup("BRIDGE_NETWORK")
            .unwrap_or_else(|| "regtest".to_string())
            .parse()?;

        let owner = get_account_or_regtest_default(&lookup, "BRIDGE_OWNER", 1, network)?;
        let treasury = get_account_or_regtest_default(&lookup, "BRIDGE_TREASURY", 2, network)?;
        let vault_id = get_account_or_regtest_default(&lookup, "BRIDGE_VAULT_ID", 3, network)?;

        let mut parameters = network.default_parameters();
        for key in ParameterKey::ALL {
            let var_name = format!("BRIDGE_{}", key.name().to_uppercase());
            if let Some(raw) = lookup(&var_name) {
                let value: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidValue(var_name.clone(), "must be a number".to_string())
                })?;
                (key.tunable().set)(&mut parameters, value);
            }
        }

        let db_path = lookup("BRIDGE_DB_PATH").filter(|p| !p.is_empty());
        let log_level = lookup("BRIDGE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let config = Self {
            network,
            owner,
            treasury,
            vault_id,
            parameters,
            db_path,
            log_level,
        };
        config.validate()?;

        Ok(config)
    }

    /// Run every parameter validator against the initial values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in ParameterKey::ALL {
            let tunable = key.tunable();
            let value = (tunable.get)(&self.parameters);
            (tunable.validate)(&self.parameters, value).map_err(|e| {
                ConfigError::InvalidValue(format!("BRIDGE_{}", key.name().to_uppercase()), e.to_string())
            })?;
        }

        for (name, account) in [
            ("BRIDGE_OWNER", self.owner),
            ("BRIDGE_TREASURY", self.treasury),
            ("BRIDGE_VAULT_ID", self.vault_id),
        ] {
            if account.is_zero() {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    "must not be the zero identity".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Validate configuration for production readiness
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.network != Network::Mainnet {
            return Err(ConfigError::NetworkMismatch(
                "mainnet".to_string(),
                format!("{:?}", self.network),
            ));
        }

        if self.parameters.tx_proof_difficulty_factor < 6 {
            return Err(ConfigError::InvalidValue(
                "BRIDGE_TX_PROOF_DIFFICULTY_FACTOR".to_string(),
                "mainnet requires at least 6 confirmations".to_string(),
            ));
        }

        if self.owner == self.treasury {
            return Err(ConfigError::InvalidValue(
                "BRIDGE_TREASURY".to_string(),
                "treasury must differ from the owner".to_string(),
            ));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            target: "bridge::system",
            network = ?self.network,
            owner = %self.owner,
            treasury = %self.treasury,
            vault = %self.vault_id,
            dust_threshold = self.parameters.deposit_dust_threshold,
            tx_max_fee = self.parameters.deposit_tx_max_fee,
            proof_difficulty_factor = self.parameters.tx_proof_difficulty_factor,
            governance_delay = self.parameters.governance_delay,
            db_path = ?self.db_path,
            "bridge configuration loaded"
        );
    }
}

/// Get a required identity, or a fixed one on regtest only
fn get_account_or_regtest_default(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    regtest_default: u64,
    network: Network,
) -> Result<AccountId, ConfigError> {
    match lookup(var_name) {
        Some(value) => value
            .parse()
            .map_err(|e| ConfigError::InvalidValue(var_name.to_string(), format!("{}", e))),
        None => {
            if network == Network::Regtest {
                Ok(AccountId::from_low_u64(regtest_default))
            } else {
                Err(ConfigError::MissingEnvVar(var_name.to_string()))
            }
        }
    }
}
