//! Persistent token metadata cache

use std::path::Path;
use std::sync::Mutex;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::metadata::{MetadataError, MetadataProvider, TokenMetadata};

/// SQLite-backed token metadata store
#[derive(Debug)]
pub struct TokenStore {
    conn: Mutex<Connection>,
}

impl TokenStore {
    /// Open or create the store database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tokens (
                address     TEXT PRIMARY KEY,
                symbol      TEXT NOT NULL,
                decimals    INTEGER NOT NULL,
                updated_at  INTEGER DEFAULT (strftime('%s', 'now'))
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace metadata for `address`
    pub fn put(&self, address: Address, metadata: &TokenMetadata) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens(address, symbol, decimals) VALUES (?1, ?2, ?3)
             ON CONFLICT(address) DO UPDATE SET
                symbol=excluded.symbol,
                decimals=excluded.decimals,
                updated_at=strftime('%s', 'now')",
            params![key(address), metadata.symbol, metadata.decimals],
        )?;
        Ok(())
    }

    pub fn get(&self, address: Address) -> Result<Option<TokenMetadata>> {
        let metadata = self
            .conn()
            .query_row(
                "SELECT symbol, decimals FROM tokens WHERE address = ?1",
                params![key(address)],
                |row| {
                    Ok(TokenMetadata {
                        symbol: row.get(0)?,
                        decimals: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(metadata)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn key(address: Address) -> String {
    format!("{address:#x}")
}

#[async_trait]
impl MetadataProvider for TokenStore {
    fn name(&self) -> &'static str {
        "token-store"
    }

    async fn token_metadata(&self, address: Address) -> Result<TokenMetadata, MetadataError> {
        match self.get(address) {
            Ok(Some(metadata)) => Ok(metadata),
            Ok(None) => Err(MetadataError::NotFound(address)),
            Err(err) => Err(MetadataError::Unavailable {
                address,
                reason: format!("{err:#}"),
            }),
        }
    }
}
