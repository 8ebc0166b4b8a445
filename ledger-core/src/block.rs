// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

//! Access to a single block file.
//!
//! Every block is a self-contained SQLite database carrying a `_meta`
//! key/value table and a `_keys` table of signatory operations. Extra tables
//! and extra `_meta` keys are payload and are ignored here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use sqlite::State;

use crate::crypto;
use crate::hashing;
use crate::types::{ChainError, DecodeError, IntegrityError};

pub const META_VERSION: &str = "Version";
pub const META_PREVIOUS_BLOCK_HASH: &str = "PreviousBlockHash";
pub const META_CREATOR_PUBLIC_KEY: &str = "CreatorPublicKey";
pub const META_PREVIOUS_BLOCK_HASH_SIGNATURE: &str = "PreviousBlockHashSignature";
pub const META_TIMESTAMP: &str = "Timestamp";

const META_TABLE_CREATE: &str =
    "CREATE TABLE IF NOT EXISTS _meta (key TEXT NOT NULL PRIMARY KEY, value TEXT NOT NULL)";
const KEYS_TABLE_CREATE: &str = "CREATE TABLE IF NOT EXISTS _keys (\
     op TEXT NOT NULL, \
     pubkey_hash TEXT NOT NULL, \
     pubkey TEXT NOT NULL, \
     sigkey_hash TEXT NOT NULL, \
     signature TEXT NOT NULL, \
     metadata TEXT)";

/// One `_keys` row: an add or revoke against a target key, co-signed by an
/// existing signatory.
#[derive(Clone, Debug)]
pub struct KeyOp {
    /// `"A"` or `"R"`; anything else is refused at acceptance.
    pub op: String,
    pub pubkey_hash: String,
    pub public_key_bytes: Vec<u8>,
    pub sigkey_hash: String,
    pub signature: Vec<u8>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The recognized `_meta` entries of one block file.
#[derive(Clone, Debug)]
pub struct BlockMeta {
    pub version: i64,
    pub previous_block_hash: String,
    pub creator_public_key_hash: String,
    pub previous_block_hash_signature: Vec<u8>,
    pub timestamp: DateTime<FixedOffset>,
}

/// A block file opened read-only. The content hash is computed from the
/// bytes on disk before the database is opened and never changes afterwards,
/// since installed block files are immutable.
pub struct BlockFile {
    path: PathBuf,
    hash: String,
    db: sqlite::Connection,
}

impl BlockFile {
    pub fn open(path: &Path) -> Result<Self, ChainError> {
        let hash = hashing::hash_file(path)?;
        let flags = sqlite::OpenFlags::new().set_read_only().set_no_mutex();
        let db = sqlite::Connection::open_with_flags(path, flags)?;
        Ok(Self {
            path: path.to_path_buf(),
            hash,
            db,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content hash of the file as it sits on disk, lowercase hex.
    pub fn content_hash(&self) -> &str {
        &self.hash
    }

    fn meta_value(&self, key: &str) -> Result<Option<String>, ChainError> {
        let mut statement = self.db.prepare("SELECT value FROM _meta WHERE key = ?")?;
        statement.bind(1, key)?;
        if !matches!(statement.next()?, State::Row) {
            return Ok(None);
        }
        Ok(Some(statement.read::<String>(0)?))
    }

    pub fn meta_string(&self, key: &str) -> Result<String, ChainError> {
        self.meta_value(key)?
            .ok_or_else(|| DecodeError::MissingMeta(key.to_string()).into())
    }

    pub fn meta_int(&self, key: &str) -> Result<i64, ChainError> {
        let value = self.meta_string(key)?;
        Ok(value.parse().map_err(DecodeError::Int)?)
    }

    pub fn meta_hex_bytes(&self, key: &str) -> Result<Vec<u8>, ChainError> {
        let value = self.meta_string(key)?;
        Ok(hex::decode(value).map_err(DecodeError::Hex)?)
    }

    /// RFC-3339 timestamp from `_meta`, or the file's mtime when the key is
    /// absent (candidate files prepared by older tooling omit it).
    pub fn meta_time(&self, key: &str) -> Result<DateTime<FixedOffset>, ChainError> {
        match self.meta_value(key)? {
            Some(value) => Ok(DateTime::parse_from_rfc3339(&value).map_err(DecodeError::Timestamp)?),
            None => {
                let modified = std::fs::metadata(&self.path)?.modified()?;
                Ok(DateTime::<Utc>::from(modified).fixed_offset())
            }
        }
    }

    /// The recognized `_meta` entries, parsed in one pass.
    pub fn meta(&self) -> Result<BlockMeta, ChainError> {
        Ok(BlockMeta {
            version: self.meta_int(META_VERSION)?,
            previous_block_hash: self.meta_string(META_PREVIOUS_BLOCK_HASH)?,
            creator_public_key_hash: self.meta_string(META_CREATOR_PUBLIC_KEY)?,
            previous_block_hash_signature: self
                .meta_hex_bytes(META_PREVIOUS_BLOCK_HASH_SIGNATURE)?,
            timestamp: self.meta_time(META_TIMESTAMP)?,
        })
    }

    /// All `_keys` rows grouped by target key hash, groups in first-seen
    /// order. Each row's stored hash must match its key bytes, and all rows
    /// for one target must agree on the op.
    pub fn read_key_ops(&self) -> Result<Vec<(String, Vec<KeyOp>)>, ChainError> {
        let mut statement = self.db.prepare(
            "SELECT op, pubkey_hash, pubkey, sigkey_hash, signature, COALESCE(metadata, '') \
             FROM _keys ORDER BY rowid",
        )?;
        let mut groups: Vec<(String, Vec<KeyOp>)> = Vec::new();
        while matches!(statement.next()?, State::Row) {
            let op = statement.read::<String>(0)?;
            let pubkey_hash = statement.read::<String>(1)?;
            let pubkey_hex = statement.read::<String>(2)?;
            let sigkey_hash = statement.read::<String>(3)?;
            let signature_hex = statement.read::<String>(4)?;
            let metadata_json = statement.read::<String>(5)?;

            let public_key_bytes = hex::decode(pubkey_hex).map_err(DecodeError::Hex)?;
            let public_key = crypto::decode_public_key(&public_key_bytes)?;
            if crypto::canonical_key_hash(&public_key) != pubkey_hash {
                return Err(IntegrityError::KeyHashMismatch(pubkey_hash).into());
            }
            let signature = hex::decode(signature_hex).map_err(DecodeError::Hex)?;
            let metadata = if metadata_json.is_empty() {
                None
            } else {
                Some(serde_json::from_str(&metadata_json).map_err(DecodeError::Metadata)?)
            };

            let key_op = KeyOp {
                op,
                pubkey_hash: pubkey_hash.clone(),
                public_key_bytes,
                sigkey_hash,
                signature,
                metadata,
            };
            match groups.iter_mut().find(|(target, _)| *target == pubkey_hash) {
                Some((_, ops)) => {
                    if ops[0].op != key_op.op {
                        return Err(IntegrityError::MixedOps(pubkey_hash).into());
                    }
                    ops.push(key_op);
                }
                None => groups.push((pubkey_hash, vec![key_op])),
            }
        }
        Ok(groups)
    }
}

/// Writes a candidate block file: the `_meta`/`_keys` tables plus whatever
/// payload tables the producer added out of band. Used by sign-import and by
/// tooling that prepares blocks for submission.
pub struct BlockBuilder {
    db: sqlite::Connection,
}

impl BlockBuilder {
    /// Open `path` read-write, creating the file and the two chain tables
    /// when missing.
    pub fn open(path: &Path) -> Result<Self, ChainError> {
        let flags = sqlite::OpenFlags::new()
            .set_create()
            .set_read_write()
            .set_no_mutex();
        let db = sqlite::Connection::open_with_flags(path, flags)?;
        db.execute(META_TABLE_CREATE)?;
        db.execute(KEYS_TABLE_CREATE)?;
        Ok(Self { db })
    }

    /// Run arbitrary SQL against the file, for producers that carry payload
    /// tables next to the chain tables.
    pub fn execute(&self, sql: &str) -> Result<(), ChainError> {
        self.db.execute(sql)?;
        Ok(())
    }

    pub fn set_meta_string(&self, key: &str, value: &str) -> Result<(), ChainError> {
        let mut statement = self
            .db
            .prepare("INSERT OR REPLACE INTO _meta (key, value) VALUES (?, ?)")?;
        statement.bind(1, key)?;
        statement.bind(2, value)?;
        statement.next()?;
        Ok(())
    }

    pub fn set_meta_int(&self, key: &str, value: i64) -> Result<(), ChainError> {
        self.set_meta_string(key, &value.to_string())
    }

    /// Append one `_keys` row. `pubkey` and `signature` are stored as hex.
    pub fn add_key_op(
        &self,
        op: &str,
        pubkey_hash: &str,
        public_key_bytes: &[u8],
        sigkey_hash: &str,
        signature: &[u8],
        metadata: Option<&str>,
    ) -> Result<(), ChainError> {
        let mut statement = self.db.prepare(
            "INSERT INTO _keys (op, pubkey_hash, pubkey, sigkey_hash, signature, metadata) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind(1, op)?;
        statement.bind(2, pubkey_hash)?;
        statement.bind(3, hex::encode(public_key_bytes).as_str())?;
        statement.bind(4, sigkey_hash)?;
        statement.bind(5, hex::encode(signature).as_str())?;
        match metadata {
            Some(json) => statement.bind(6, json)?,
            None => statement.bind(6, &sqlite::Value::Null)?,
        }
        statement.next()?;
        Ok(())
    }
}
