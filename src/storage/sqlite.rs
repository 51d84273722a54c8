//! SQLite Persistent Storage for Bridge Snapshots
//!
//! Deposits and bank balances get typed tables so operators can query them
//! directly; the remaining state is stored as JSON documents keyed by name.
//! A save replaces everything in a single transaction.
//! Uses connection pooling via r2d2 for concurrent access.

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::snapshot::{BridgeSnapshot, SNAPSHOT_VERSION};
use super::traits::{StateStore, StorageError, StorageResult};
use crate::common::config::BridgeConfig;
use crate::types::{AccountId, DepositKey, DepositRequest};

/// SQLite-backed snapshot store with connection pooling
pub struct SqliteStateStore {
    pool: Pool<SqliteConnectionManager>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotMeta {
    version: u32,
    taken_at: u64,
}

/// Deposit row as stored, before hex decoding
struct DepositRow {
    depositor: String,
    funding_tx_hash: String,
    funding_output_index: i64,
    wallet_pub_key_hash: String,
    refund_pub_key_hash: String,
    refund_locktime: String,
    amount: i64,
    revealed_at: i64,
    swept_at: Option<i64>,
    vault: Option<String>,
    treasury_fee: i64,
    extra_data: Option<String>,
}

impl SqliteStateStore {
    /// Create a new store with the given database path
    ///
    /// Creates the database file and runs migrations if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Connection(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Open the database named by `BRIDGE_DB_PATH`, if one is configured
    pub fn from_config(config: &BridgeConfig) -> Result<Option<Self>, StorageError> {
        match config.db_path.as_deref() {
            Some(path) => {
                tracing::info!(target: "bridge::system", db_path = path, "opening snapshot database");
                Self::new(path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Get a connection from the pool
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS deposits (
                deposit_key TEXT PRIMARY KEY,
                depositor TEXT NOT NULL,
                funding_tx_hash TEXT NOT NULL,
                funding_output_index INTEGER NOT NULL,
                wallet_pub_key_hash TEXT NOT NULL,
                refund_pub_key_hash TEXT NOT NULL,
                refund_locktime TEXT NOT NULL,
                amount INTEGER NOT NULL,
                revealed_at INTEGER NOT NULL,
                swept_at INTEGER,
                vault TEXT,
                treasury_fee INTEGER NOT NULL,
                extra_data TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_deposits_depositor ON deposits(depositor);
            CREATE INDEX IF NOT EXISTS idx_deposits_wallet ON deposits(wallet_pub_key_hash);

            CREATE TABLE IF NOT EXISTS bank_balances (
                account TEXT PRIMARY KEY,
                balance INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ledger_state (
                name TEXT PRIMARY KEY,
                json TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    // Synchronous helper methods for the trait implementation

    fn save_sync(&self, snapshot: &BridgeSnapshot) -> Result<(), StorageError> {
        snapshot.check_version()?;

        let documents = [
            (
                "meta",
                to_json(&SnapshotMeta {
                    version: snapshot.version,
                    taken_at: snapshot.taken_at,
                })?,
            ),
            ("governance", to_json(&snapshot.governance)?),
            ("wallets", to_json(&snapshot.wallets)?),
            ("trusted_vaults", to_json(&snapshot.trusted_vaults)?),
            ("epoch_difficulty", to_json(&snapshot.epoch_difficulty)?),
            ("minting", to_json(&snapshot.minting)?),
        ];

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute("DELETE FROM deposits", []).map_err(db_err)?;
        for deposit in &snapshot.deposits {
            let key = DepositKey::derive(&deposit.funding_tx_hash, deposit.funding_output_index);
            tx.execute(
                r#"
                INSERT INTO deposits (
                    deposit_key, depositor, funding_tx_hash, funding_output_index,
                    wallet_pub_key_hash, refund_pub_key_hash, refund_locktime,
                    amount, revealed_at, swept_at, vault, treasury_fee, extra_data
                ) VALUES (
                    ?1, ?2, ?3, ?4,
                    ?5, ?6, ?7,
                    ?8, ?9, ?10, ?11, ?12, ?13
                )
                "#,
                params![
                    hex::encode(key.as_bytes()),
                    deposit.depositor.to_string(),
                    hex::encode(deposit.funding_tx_hash),
                    deposit.funding_output_index as i64,
                    hex::encode(deposit.wallet_pub_key_hash),
                    hex::encode(deposit.refund_pub_key_hash),
                    hex::encode(deposit.refund_locktime),
                    deposit.amount as i64,
                    deposit.revealed_at as i64,
                    deposit.swept_at.map(|v| v as i64),
                    deposit.vault.map(|v| v.to_string()),
                    deposit.treasury_fee as i64,
                    deposit.extra_data.map(hex::encode),
                ],
            )
            .map_err(db_err)?;
        }

        tx.execute("DELETE FROM bank_balances", []).map_err(db_err)?;
        for (account, balance) in &snapshot.bank_balances {
            tx.execute(
                "INSERT INTO bank_balances (account, balance) VALUES (?1, ?2)",
                params![account.to_string(), *balance as i64],
            )
            .map_err(db_err)?;
        }

        for (name, json) in &documents {
            tx.execute(
                "INSERT OR REPLACE INTO ledger_state (name, json) VALUES (?1, ?2)",
                params![name, json],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn load_sync(&self) -> Result<Option<BridgeSnapshot>, StorageError> {
        let conn = self.conn()?;

        let meta: Option<String> = conn
            .query_row(
                "SELECT json FROM ledger_state WHERE name = ?1",
                params!["meta"],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        let Some(meta) = meta else {
            return Ok(None);
        };
        let meta: SnapshotMeta = from_json(&meta)?;
        if meta.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: meta.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut stmt = conn
            .prepare(
                r#"
                SELECT depositor, funding_tx_hash, funding_output_index,
                       wallet_pub_key_hash, refund_pub_key_hash, refund_locktime,
                       amount, revealed_at, swept_at, vault, treasury_fee, extra_data
                FROM deposits ORDER BY deposit_key
                "#,
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_deposit)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        let deposits = rows
            .into_iter()
            .map(DepositRow::into_request)
            .collect::<StorageResult<Vec<_>>>()?;

        let mut stmt = conn
            .prepare("SELECT account, balance FROM bank_balances ORDER BY account")
            .map_err(db_err)?;
        let balances = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        let bank_balances = balances
            .into_iter()
            .map(|(account, balance)| Ok((parse_account(&account)?, balance)))
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Some(BridgeSnapshot {
            version: meta.version,
            taken_at: meta.taken_at,
            governance: Self::read_document(&conn, "governance")?,
            deposits,
            wallets: Self::read_document(&conn, "wallets")?,
            bank_balances,
            trusted_vaults: Self::read_document(&conn, "trusted_vaults")?,
            epoch_difficulty: Self::read_document(&conn, "epoch_difficulty")?,
            minting: Self::read_document(&conn, "minting")?,
        }))
    }

    fn read_document<T: DeserializeOwned>(
        conn: &rusqlite::Connection,
        name: &str,
    ) -> Result<T, StorageError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT json FROM ledger_state WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        let json = json.ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        from_json(&json)
    }

    /// Convert a database row to DepositRow
    fn row_to_deposit(row: &rusqlite::Row) -> rusqlite::Result<DepositRow> {
        Ok(DepositRow {
            depositor: row.get("depositor")?,
            funding_tx_hash: row.get("funding_tx_hash")?,
            funding_output_index: row.get("funding_output_index")?,
            wallet_pub_key_hash: row.get("wallet_pub_key_hash")?,
            refund_pub_key_hash: row.get("refund_pub_key_hash")?,
            refund_locktime: row.get("refund_locktime")?,
            amount: row.get("amount")?,
            revealed_at: row.get("revealed_at")?,
            swept_at: row.get("swept_at")?,
            vault: row.get("vault")?,
            treasury_fee: row.get("treasury_fee")?,
            extra_data: row.get("extra_data")?,
        })
    }
}

impl DepositRow {
    fn into_request(self) -> StorageResult<DepositRequest> {
        Ok(DepositRequest {
            depositor: parse_account(&self.depositor)?,
            funding_tx_hash: decode_fixed(&self.funding_tx_hash)?,
            funding_output_index: self.funding_output_index as u32,
            wallet_pub_key_hash: decode_fixed(&self.wallet_pub_key_hash)?,
            refund_pub_key_hash: decode_fixed(&self.refund_pub_key_hash)?,
            refund_locktime: decode_fixed(&self.refund_locktime)?,
            amount: self.amount as u64,
            revealed_at: self.revealed_at as u64,
            swept_at: self.swept_at.map(|v| v as u64),
            vault: self.vault.as_deref().map(parse_account).transpose()?,
            treasury_fee: self.treasury_fee as u64,
            extra_data: self.extra_data.as_deref().map(|s| decode_fixed(s)).transpose()?,
        })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save(&self, snapshot: &BridgeSnapshot) -> StorageResult<()> {
        self.save_sync(snapshot)
    }

    async fn load(&self) -> StorageResult<Option<BridgeSnapshot>> {
        self.load_sync()
    }
}

fn db_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::InvalidData(e.to_string()))
}

fn from_json<T: DeserializeOwned>(json: &str) -> StorageResult<T> {
    serde_json::from_str(json).map_err(|e| StorageError::InvalidData(e.to_string()))
}

fn parse_account(s: &str) -> StorageResult<AccountId> {
    s.parse()
        .map_err(|e| StorageError::InvalidData(format!("account {}: {}", s, e)))
}

fn decode_fixed<const N: usize>(s: &str) -> StorageResult<[u8; N]> {
    let mut out = [0u8; N];
    hex::decode_to_slice(s, &mut out)
        .map_err(|e| StorageError::InvalidData(format!("{}: {}", s, e)))?;
    Ok(out)
}
