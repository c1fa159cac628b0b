//! Saved contracts: name, deployment, owning wallet and ABI

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::core::BindingContext;

/// A contract the user saved for later interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub name: String,
    pub chain_id: u64,
    pub address: String,
    /// Wallet the contract is bound to; writes from any other account are refused
    pub owner: Option<String>,
    /// Raw ABI document as saved
    pub abi: String,
}

impl ContractRecord {
    /// Target chain, target address and bound wallet for this record
    pub fn binding(&self) -> BindingContext {
        let binding = BindingContext::new(self.chain_id, self.address.clone());
        match &self.owner {
            Some(owner) => binding.bound_to(owner.clone()),
            None => binding,
        }
    }
}

/// SQLite-backed contract records
#[derive(Debug)]
pub struct ContractStore {
    conn: Connection,
}

impl ContractStore {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory().context("open in-memory db")?,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS contracts (
                name        TEXT PRIMARY KEY,
                chain_id    INTEGER NOT NULL,
                address     TEXT NOT NULL,
                owner       TEXT,
                abi         TEXT NOT NULL,
                created_at  INTEGER DEFAULT (strftime('%s', 'now'))
            );
            CREATE INDEX IF NOT EXISTS idx_contracts_target ON contracts(chain_id, address);",
        )?;
        Ok(())
    }

    /// Insert or replace the record with the same name
    pub fn save(&self, record: &ContractRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO contracts(name, chain_id, address, owner, abi) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                chain_id=excluded.chain_id,
                address=excluded.address,
                owner=excluded.owner,
                abi=excluded.abi",
            params![
                record.name,
                record.chain_id,
                record.address.to_lowercase(),
                record.owner.as_ref().map(|o| o.to_lowercase()),
                record.abi
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<ContractRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, chain_id, address, owner, abi FROM contracts WHERE name = ?1",
        )?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(read_record(row)?)),
            None => Ok(None),
        }
    }

    /// All records ordered by name
    pub fn list(&self) -> Result<Vec<ContractRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, chain_id, address, owner, abi FROM contracts ORDER BY name")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_record(row)?);
        }
        Ok(out)
    }

    /// Returns whether a record was deleted
    pub fn remove(&self, name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM contracts WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<ContractRecord> {
    Ok(ContractRecord {
        name: row.get(0)?,
        chain_id: row.get(1)?,
        address: row.get(2)?,
        owner: row.get(3)?,
        abi: row.get(4)?,
    })
}
