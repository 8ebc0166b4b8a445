// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

//! The administrative index store.
//!
//! One SQLite database per data directory holds the block header index, the
//! signatory registry and the saved peer list. The connection is opened in
//! multi-threaded mode and guarded by a mutex, so every call observes a
//! consistent snapshot and mutations are serialized.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use parking_lot::Mutex;
use sqlite::State;

use crate::types::{BlockHeader, ChainError, DecodeError, RegistryEntry};

pub const INDEX_DB_BASE_NAME: &str = "chainstate.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS blocks (
    height INTEGER NOT NULL PRIMARY KEY,
    hash TEXT NOT NULL UNIQUE,
    previous_block_hash TEXT NOT NULL,
    previous_block_hash_signature TEXT NOT NULL,
    hash_signature TEXT NOT NULL,
    signature_public_key_hash TEXT NOT NULL,
    version INTEGER NOT NULL,
    time_accepted TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS pubkeys (
    pubkey_hash TEXT NOT NULL PRIMARY KEY,
    pubkey BLOB NOT NULL,
    added_at_height INTEGER NOT NULL,
    is_revoked INTEGER NOT NULL DEFAULT 0,
    time_revoked TEXT
);
CREATE TABLE IF NOT EXISTS peers (
    address TEXT NOT NULL PRIMARY KEY
);
";

pub struct IndexStore {
    db: Mutex<sqlite::Connection>,
}

impl IndexStore {
    /// Open (creating when absent) the index database inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, ChainError> {
        let flags = sqlite::OpenFlags::new()
            .set_create()
            .set_read_write()
            .set_no_mutex();
        let db = sqlite::Connection::open_with_flags(data_dir.join(INDEX_DB_BASE_NAME), flags)?;
        db.execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        db.execute(SCHEMA)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Height of the tip, or -1 when the chain is empty.
    pub fn height(&self) -> Result<i64, ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare("SELECT COALESCE(MAX(height), -1) FROM blocks")?;
        statement.next()?;
        Ok(statement.read::<i64>(0)?)
    }

    pub fn block_by_hash(&self, hash: &str) -> Result<Option<BlockHeader>, ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare(
            "SELECT height, hash, previous_block_hash, previous_block_hash_signature, \
             hash_signature, signature_public_key_hash, version, time_accepted \
             FROM blocks WHERE hash = ?",
        )?;
        statement.bind(1, hash)?;
        if !matches!(statement.next()?, State::Row) {
            return Ok(None);
        }
        Ok(Some(read_header(&statement)?))
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<BlockHeader>, ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare(
            "SELECT height, hash, previous_block_hash, previous_block_hash_signature, \
             hash_signature, signature_public_key_hash, version, time_accepted \
             FROM blocks WHERE height = ?",
        )?;
        statement.bind(1, height as i64)?;
        if !matches!(statement.next()?, State::Row) {
            return Ok(None);
        }
        Ok(Some(read_header(&statement)?))
    }

    /// Insert a header row. The height and the hash must both be new.
    pub fn insert_block(&self, header: &BlockHeader) -> Result<(), ChainError> {
        let db = self.db.lock();
        {
            let mut statement = db.prepare("SELECT height FROM blocks WHERE height = ?")?;
            statement.bind(1, header.height as i64)?;
            if matches!(statement.next()?, State::Row) {
                return Err(ChainError::DuplicateHeight(header.height));
            }
        }
        {
            let mut statement = db.prepare("SELECT height FROM blocks WHERE hash = ?")?;
            statement.bind(1, header.hash.as_str())?;
            if matches!(statement.next()?, State::Row) {
                return Err(ChainError::DuplicateHash(header.hash.clone()));
            }
        }
        let mut statement = db.prepare(
            "INSERT INTO blocks (height, hash, previous_block_hash, \
             previous_block_hash_signature, hash_signature, signature_public_key_hash, \
             version, time_accepted) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind(1, header.height as i64)?;
        statement.bind(2, header.hash.as_str())?;
        statement.bind(3, header.previous_block_hash.as_str())?;
        statement.bind(4, hex::encode(&header.previous_block_hash_signature).as_str())?;
        statement.bind(5, hex::encode(&header.hash_signature).as_str())?;
        statement.bind(6, header.signature_public_key_hash.as_str())?;
        statement.bind(7, header.version)?;
        statement.bind(
            8,
            header
                .time_accepted
                .to_rfc3339_opts(SecondsFormat::Secs, true)
                .as_str(),
        )?;
        statement.next()?;
        Ok(())
    }

    pub fn public_key(&self, hash: &str) -> Result<Option<RegistryEntry>, ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare(
            "SELECT pubkey_hash, pubkey, added_at_height, is_revoked, time_revoked \
             FROM pubkeys WHERE pubkey_hash = ?",
        )?;
        statement.bind(1, hash)?;
        if !matches!(statement.next()?, State::Row) {
            return Ok(None);
        }
        let time_revoked = statement
            .read::<Option<String>>(4)?
            .map(|t| DateTime::parse_from_rfc3339(&t).map_err(DecodeError::Timestamp))
            .transpose()?;
        Ok(Some(RegistryEntry {
            public_key_hash: statement.read::<String>(0)?,
            public_key: statement.read::<Vec<u8>>(1)?,
            added_at_height: statement.read::<i64>(2)? as u64,
            is_revoked: statement.read::<i64>(3)? != 0,
            time_revoked,
        }))
    }

    pub fn public_key_exists(&self, hash: &str) -> Result<bool, ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare("SELECT 1 FROM pubkeys WHERE pubkey_hash = ?")?;
        statement.bind(1, hash)?;
        Ok(matches!(statement.next()?, State::Row))
    }

    /// Register a key as a signatory from `added_at_height` on.
    pub fn write_public_key(
        &self,
        public_key: &[u8],
        hash: &str,
        added_at_height: u64,
    ) -> Result<(), ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare(
            "INSERT INTO pubkeys (pubkey_hash, pubkey, added_at_height) VALUES (?, ?, ?)",
        )?;
        statement.bind(1, hash)?;
        statement.bind(2, public_key)?;
        statement.bind(3, added_at_height as i64)?;
        statement.next()?;
        Ok(())
    }

    /// Flip a registry entry to revoked. Entries are never deleted, so a
    /// revoked key stays resolvable for historical signature checks.
    pub fn revoke_public_key(&self, hash: &str) -> Result<(), ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare(
            "UPDATE pubkeys SET is_revoked = 1, time_revoked = ? WHERE pubkey_hash = ?",
        )?;
        statement.bind(
            1,
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
                .as_str(),
        )?;
        statement.bind(2, hash)?;
        statement.next()?;
        Ok(())
    }

    /// Total and revoked signatory counts.
    pub fn count_public_keys(&self) -> Result<(u64, u64), ChainError> {
        let db = self.db.lock();
        let mut statement =
            db.prepare("SELECT COUNT(*), COALESCE(SUM(is_revoked), 0) FROM pubkeys")?;
        statement.next()?;
        Ok((
            statement.read::<i64>(0)? as u64,
            statement.read::<i64>(1)? as u64,
        ))
    }

    pub fn saved_peers(&self) -> Result<BTreeSet<String>, ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare("SELECT address FROM peers")?;
        let mut peers = BTreeSet::new();
        while matches!(statement.next()?, State::Row) {
            peers.insert(statement.read::<String>(0)?);
        }
        Ok(peers)
    }

    pub fn save_peer(&self, address: &str) -> Result<(), ChainError> {
        let db = self.db.lock();
        let mut statement = db.prepare("INSERT OR IGNORE INTO peers (address) VALUES (?)")?;
        statement.bind(1, address)?;
        statement.next()?;
        Ok(())
    }
}

fn read_header(statement: &sqlite::Statement<'_>) -> Result<BlockHeader, ChainError> {
    let previous_block_hash_signature =
        hex::decode(statement.read::<String>(3)?).map_err(DecodeError::Hex)?;
    let hash_signature = hex::decode(statement.read::<String>(4)?).map_err(DecodeError::Hex)?;
    let time_accepted: DateTime<FixedOffset> =
        DateTime::parse_from_rfc3339(&statement.read::<String>(7)?)
            .map_err(DecodeError::Timestamp)?;
    Ok(BlockHeader {
        height: statement.read::<i64>(0)? as u64,
        hash: statement.read::<String>(1)?,
        previous_block_hash: statement.read::<String>(2)?,
        previous_block_hash_signature,
        hash_signature,
        signature_public_key_hash: statement.read::<String>(5)?,
        version: statement.read::<i64>(6)?,
        time_accepted,
    })
}
