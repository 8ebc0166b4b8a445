// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

use chrono::{DateTime, FixedOffset};
use genesis::GenesisError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the block metadata understood by this node.
pub const CURRENT_BLOCK_VERSION: i64 = 1;

pub const GENESIS_BLOCK_HEIGHT: u64 = 0;

/// The per-block row in the index summarizing an installed block.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    /// Content hash of the block file exactly as it sits on disk, lowercase hex.
    pub hash: String,
    pub previous_block_hash: String,
    pub previous_block_hash_signature: Vec<u8>,
    pub hash_signature: Vec<u8>,
    /// Identifies the signer in the registry.
    pub signature_public_key_hash: String,
    pub version: i64,
    pub time_accepted: DateTime<FixedOffset>,
}

/// One authorized-signer entry. Identity is the hash; the key bytes are kept
/// so signatures can be verified without re-deriving them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub public_key_hash: String,
    pub public_key: Vec<u8>,
    pub added_at_height: u64,
    pub is_revoked: bool,
    pub time_revoked: Option<DateTime<FixedOffset>>,
}

/// Typed reasons for refusing a candidate block.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unsupported block version: {0}")]
    UnsupportedVersion(i64),
    #[error("cannot find previous block {0}")]
    UnknownParent(String),
    #[error("block would replace an existing block at height {0}")]
    HeightOccupied(u64),
    #[error("no accepted public key {0} signing the block")]
    UnknownSigner(String),
    #[error("the public key {0} signing the block is revoked")]
    RevokedSigner(String),
    #[error("verification of previous block hash signature failed")]
    BadPrevSig,
    #[error("verification of block hash signature failed")]
    BadHashSig,
    #[error("quorum of {required} not met for key ops on key {target}: {actual} signatures")]
    QuorumShort {
        target: String,
        required: usize,
        actual: usize,
    },
    #[error("cannot find key op signatory {0}")]
    UnknownOpSigner(String),
    #[error("failed verification of key op for {target} by {signer}")]
    BadOpSig { target: String, signer: String },
    #[error("attempt to add an already existing key {0} to the list of signatories")]
    DuplicateAdd(String),
    #[error("cannot revoke unknown key {0}")]
    UnknownRevokeTarget(String),
    #[error("attempt to revoke a key which is already revoked: {0}")]
    DoubleRevoke(String),
    #[error("invalid key op: {0:?}")]
    BadOp(String),
}

/// Malformed on-disk or in-band data.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid public key encoding")]
    PublicKey,
    #[error("invalid signature encoding")]
    Signature,
    #[error("invalid key op metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("invalid integer: {0}")]
    Int(#[from] std::num::ParseIntError),
    #[error("missing _meta key {0:?}")]
    MissingMeta(String),
}

/// A stored artifact disagrees with what was recorded about it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("file hash {actual} doesn't match recorded hash {expected}")]
    HashMismatch { expected: String, actual: String },
    #[error("genesis block hash doesn't match chain params: {actual} vs {expected}")]
    GenesisMismatch { expected: String, actual: String },
    #[error("public key hash doesn't match for {0}")]
    KeyHashMismatch(String),
    #[error("mixed key ops for a single public key {0}")]
    MixedOps(String),
    #[error("no block header at height {0}")]
    MissingHeader(u64),
    #[error("key ops for {target} don't have quorum: {actual} vs Q={required}")]
    QuorumMismatch {
        target: String,
        required: usize,
        actual: usize,
    },
    #[error("block {height} doesn't link to its parent: {actual} vs {expected}")]
    BrokenLink {
        height: u64,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[from] sqlite::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Rejected(#[from] RejectReason),
    #[error("genesis error: {0}")]
    Genesis(#[from] GenesisError),
    #[error("a block at height {0} is already indexed")]
    DuplicateHeight(u64),
    #[error("a block with hash {0} is already indexed")]
    DuplicateHash(String),
    #[error("the chain is empty")]
    EmptyChain,
    #[error("chain verification failed at height {height}: {source}")]
    Consistency {
        height: u64,
        #[source]
        source: Box<ChainError>,
    },
}

impl ChainError {
    /// The rejection behind this error, if it is one.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            ChainError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}
