// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

//! Chain acceptance, verification and bootstrap.
//!
//! A [`Chain`] handle owns the data directory of one node: the block files
//! under `blocks/` and the index store next to them. Exactly one acceptance
//! runs at a time; the rest of the API is read-only and safe to call
//! concurrently.

use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use genesis::{AssetSource, ChainParams, GENESIS_ASSET_NAME};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::block::{
    BlockBuilder, BlockFile, META_CREATOR_PUBLIC_KEY, META_PREVIOUS_BLOCK_HASH,
    META_PREVIOUS_BLOCK_HASH_SIGNATURE, META_TIMESTAMP, META_VERSION,
};
use crate::crypto::{self, SecretKey};
use crate::hashing;
use crate::quorum::quorum_for_height;
use crate::store::IndexStore;
use crate::types::{
    BlockHeader, ChainError, DecodeError, IntegrityError, RejectReason, CURRENT_BLOCK_VERSION,
    GENESIS_BLOCK_HEIGHT,
};

pub const BLOCKCHAIN_SUBDIR: &str = "blocks";

/// Everything the core needs to know about the node it runs in. Immutable
/// for the lifetime of the process; there is no global configuration.
#[derive(Clone, Debug)]
pub struct ChainContext {
    pub data_dir: PathBuf,
    pub params: ChainParams,
    /// Skip the startup consistency pass.
    pub fast_mode: bool,
}

/// Staged registry change, applied only once a candidate has passed every
/// acceptance check.
enum RegistryMutation {
    Add { hash: String, bytes: Vec<u8> },
    Revoke { hash: String },
}

pub struct Chain {
    ctx: ChainContext,
    store: IndexStore,
    accept_lock: Mutex<()>,
}

impl Chain {
    /// Open the chain in `ctx.data_dir`, creating the directory and the
    /// index store when missing, and fold the configured bootstrap peers
    /// into the saved peer set.
    pub fn open(ctx: ChainContext) -> Result<Self, ChainError> {
        ensure_dir(&ctx.data_dir, 0o700)?;
        let store = IndexStore::open(&ctx.data_dir)?;
        for peer in &ctx.params.bootstrap_peers {
            store.save_peer(peer)?;
        }
        Ok(Self {
            ctx,
            store,
            accept_lock: Mutex::new(()),
        })
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Height of the tip, or -1 when the chain is empty.
    pub fn height(&self) -> Result<i64, ChainError> {
        self.store.height()
    }

    pub fn tip(&self) -> Result<Option<BlockHeader>, ChainError> {
        let height = self.store.height()?;
        if height < 0 {
            return Ok(None);
        }
        self.store.block_by_height(height as u64)
    }

    /// Bring the chain up: write the genesis block when the index is empty
    /// and defaults are permitted, then run the consistency pass unless fast
    /// mode asked to skip it.
    pub fn init(&self, assets: &dyn AssetSource, create_default: bool) -> Result<(), ChainError> {
        if create_default && self.store.height()? == -1 {
            self.bootstrap(assets)?;
        }
        if self.ctx.fast_mode {
            info!("skipping blockchain consistency checks");
        } else {
            self.verify_everything()?;
        }
        Ok(())
    }

    /// Install the canonical genesis block from `assets` into an empty data
    /// directory. Returns false when the chain already has blocks.
    pub fn bootstrap(&self, assets: &dyn AssetSource) -> Result<bool, ChainError> {
        if self.store.height()? != -1 {
            return Ok(false);
        }
        info!("writing down the genesis block");
        let blob = assets.get(GENESIS_ASSET_NAME)?;
        let blob_hash = hashing::hash_bytes(&blob);
        if blob_hash != self.ctx.params.genesis_block_hash {
            return Err(IntegrityError::GenesisMismatch {
                expected: self.ctx.params.genesis_block_hash.clone(),
                actual: blob_hash,
            }
            .into());
        }
        self.ensure_block_dir(GENESIS_BLOCK_HEIGHT)?;
        let path = self.block_path(GENESIS_BLOCK_HEIGHT);
        fs::write(&path, &blob)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;

        let block = BlockFile::open(&path)?;
        let meta = block.meta()?;
        for (_, ops) in block.read_key_ops()? {
            for op in ops {
                if op.op != "A" {
                    return Err(RejectReason::BadOp(op.op).into());
                }
                // The genesis _keys table may list a bootstrap key more than
                // once; only the first row registers it.
                if self.store.public_key_exists(&op.pubkey_hash)? {
                    continue;
                }
                self.store.write_public_key(
                    &op.public_key_bytes,
                    &op.pubkey_hash,
                    GENESIS_BLOCK_HEIGHT,
                )?;
            }
        }

        let time_accepted =
            DateTime::parse_from_rfc3339(&self.ctx.params.genesis_block_timestamp)
                .map_err(DecodeError::Timestamp)?;
        let hash_signature = hex::decode(&self.ctx.params.genesis_block_hash_signature)
            .map_err(DecodeError::Hex)?;
        let header = BlockHeader {
            height: GENESIS_BLOCK_HEIGHT,
            hash: blob_hash,
            previous_block_hash: meta.previous_block_hash,
            previous_block_hash_signature: meta.previous_block_hash_signature,
            hash_signature,
            signature_public_key_hash: meta.creator_public_key_hash,
            version: meta.version,
            time_accepted,
        };
        self.store.insert_block(&header)?;
        Ok(true)
    }

    /// Decide whether the candidate block file at `file` legally extends the
    /// chain and, if so, install it. `hash_signature` is the signer's
    /// signature over the candidate's content hash; it travels next to the
    /// file, never inside it. Returns the height the block was installed at.
    pub fn accept_block(&self, file: &Path, hash_signature: &[u8]) -> Result<u64, ChainError> {
        let _guard = self.accept_lock.lock();

        let block = BlockFile::open(file)?;
        let meta = block.meta()?;

        if meta.version != CURRENT_BLOCK_VERSION {
            return Err(RejectReason::UnsupportedVersion(meta.version).into());
        }
        let prev = self
            .store
            .block_by_hash(&meta.previous_block_hash)?
            .ok_or_else(|| RejectReason::UnknownParent(meta.previous_block_hash.clone()))?;
        let height = prev.height + 1;
        if self.store.block_by_height(height)?.is_some() {
            return Err(RejectReason::HeightOccupied(height).into());
        }

        let signer = self
            .store
            .public_key(&meta.creator_public_key_hash)?
            .ok_or_else(|| RejectReason::UnknownSigner(meta.creator_public_key_hash.clone()))?;
        if signer.is_revoked {
            return Err(RejectReason::RevokedSigner(signer.public_key_hash).into());
        }
        let signer_key = crypto::decode_public_key(&signer.public_key)?;
        if !crypto::verify_hex(
            &signer_key,
            &meta.previous_block_hash,
            &meta.previous_block_hash_signature,
        )? {
            return Err(RejectReason::BadPrevSig.into());
        }
        if !crypto::verify_hex(&signer_key, block.content_hash(), hash_signature)? {
            return Err(RejectReason::BadHashSig.into());
        }

        // Key ops are checked against the registry as it stood before this
        // block; mutations are staged and applied only after every check has
        // passed, so a rejection never leaves partial state behind.
        let quorum = quorum_for_height(height);
        let mut mutations = Vec::new();
        for (target, ops) in block.read_key_ops()? {
            if ops.len() < quorum {
                return Err(RejectReason::QuorumShort {
                    target,
                    required: quorum,
                    actual: ops.len(),
                }
                .into());
            }
            for op in &ops {
                let op_signer = self
                    .store
                    .public_key(&op.sigkey_hash)?
                    .ok_or_else(|| RejectReason::UnknownOpSigner(op.sigkey_hash.clone()))?;
                let op_key = crypto::decode_public_key(&op_signer.public_key)?;
                if !crypto::verify_key_hash(&op_key, &target, &op.signature)? {
                    return Err(RejectReason::BadOpSig {
                        target,
                        signer: op.sigkey_hash.clone(),
                    }
                    .into());
                }
            }
            match ops[0].op.as_str() {
                "A" => {
                    if self.store.public_key_exists(&target)? {
                        return Err(RejectReason::DuplicateAdd(target).into());
                    }
                    mutations.push(RegistryMutation::Add {
                        hash: target,
                        bytes: ops[0].public_key_bytes.clone(),
                    });
                }
                "R" => match self.store.public_key(&target)? {
                    None => return Err(RejectReason::UnknownRevokeTarget(target).into()),
                    Some(entry) if entry.is_revoked => {
                        return Err(RejectReason::DoubleRevoke(target).into())
                    }
                    Some(_) => mutations.push(RegistryMutation::Revoke { hash: target }),
                },
                other => return Err(RejectReason::BadOp(other.to_string()).into()),
            }
        }

        for mutation in mutations {
            match mutation {
                RegistryMutation::Add { hash, bytes } => {
                    debug!("registering signatory {} at height {}", hash, height);
                    self.store.write_public_key(&bytes, &hash, height)?;
                }
                RegistryMutation::Revoke { hash } => {
                    debug!("revoking signatory {} at height {}", hash, height);
                    self.store.revoke_public_key(&hash)?;
                }
            }
        }

        self.ensure_block_dir(height)?;
        let dest = self.block_path(height);
        fs::copy(file, &dest)?;
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o644))?;

        let header = BlockHeader {
            height,
            hash: block.content_hash().to_string(),
            previous_block_hash: meta.previous_block_hash,
            previous_block_hash_signature: meta.previous_block_hash_signature,
            hash_signature: hash_signature.to_vec(),
            signature_public_key_hash: meta.creator_public_key_hash,
            version: meta.version,
            time_accepted: Utc::now().fixed_offset(),
        };
        self.store.insert_block(&header)?;
        info!("accepted block {} at height {}", header.hash, height);
        Ok(height)
    }

    /// Turn a prepared SQLite file into a candidate signed by `key` on top
    /// of the current tip, then run it through acceptance. The file keeps
    /// whatever payload tables and `_keys` rows it already carries.
    pub fn sign_import(&self, file: &Path, key: &SecretKey) -> Result<u64, ChainError> {
        let tip = self.tip()?.ok_or(ChainError::EmptyChain)?;
        let key_hash = crypto::canonical_key_hash(&key.verifying_key());
        {
            let builder = BlockBuilder::open(file)?;
            builder.set_meta_int(META_VERSION, CURRENT_BLOCK_VERSION)?;
            builder.set_meta_string(META_PREVIOUS_BLOCK_HASH, &tip.hash)?;
            builder.set_meta_string(META_CREATOR_PUBLIC_KEY, &key_hash)?;
            builder.set_meta_string(
                META_PREVIOUS_BLOCK_HASH_SIGNATURE,
                &hex::encode(crypto::sign_hex(key, &tip.hash)?),
            )?;
            builder.set_meta_string(
                META_TIMESTAMP,
                &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            )?;
        }
        let file_hash = hashing::hash_file(file)?;
        let hash_signature = crypto::sign_hex(key, &file_hash)?;
        self.accept_block(file, &hash_signature)
    }

    /// Re-check every invariant of every installed block, genesis to tip.
    /// Read-only; the first disagreement aborts with its height.
    pub fn verify_everything(&self) -> Result<(), ChainError> {
        let max_height = self.store.height()?;
        if max_height < 0 {
            return Ok(());
        }
        info!("verifying all the blocks up to height {}", max_height);
        for height in 0..=(max_height as u64) {
            if height > 0 && height % 1000 == 0 {
                info!("verifying block {}", height);
            }
            self.verify_height(height)
                .map_err(|source| ChainError::Consistency {
                    height,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    fn verify_height(&self, height: u64) -> Result<(), ChainError> {
        let header = self
            .store
            .block_by_height(height)?
            .ok_or(IntegrityError::MissingHeader(height))?;
        let path = self.block_path(height);
        let file_hash = hashing::hash_file(&path)?;
        if file_hash != header.hash {
            return Err(IntegrityError::HashMismatch {
                expected: header.hash,
                actual: file_hash,
            }
            .into());
        }
        if height == GENESIS_BLOCK_HEIGHT && file_hash != self.ctx.params.genesis_block_hash {
            return Err(IntegrityError::GenesisMismatch {
                expected: self.ctx.params.genesis_block_hash.clone(),
                actual: file_hash,
            }
            .into());
        }
        if height > 0 {
            let parent = self
                .store
                .block_by_height(height - 1)?
                .ok_or(IntegrityError::MissingHeader(height - 1))?;
            if header.previous_block_hash != parent.hash {
                return Err(IntegrityError::BrokenLink {
                    height,
                    expected: parent.hash,
                    actual: header.previous_block_hash,
                }
                .into());
            }
        }

        let signer = self
            .store
            .public_key(&header.signature_public_key_hash)?
            .ok_or_else(|| {
                RejectReason::UnknownSigner(header.signature_public_key_hash.clone())
            })?;
        let signer_key = crypto::decode_public_key(&signer.public_key)?;
        if !crypto::verify_hex(&signer_key, &header.hash, &header.hash_signature)? {
            return Err(RejectReason::BadHashSig.into());
        }
        if !crypto::verify_hex(
            &signer_key,
            &header.previous_block_hash,
            &header.previous_block_hash_signature,
        )? {
            return Err(RejectReason::BadPrevSig.into());
        }

        let block = BlockFile::open(&path)?;
        let quorum = quorum_for_height(height);
        for (target, ops) in block.read_key_ops()? {
            // Installed blocks must match the quorum exactly; acceptance is
            // looser and tolerates extra co-signatures.
            if ops.len() != quorum {
                return Err(IntegrityError::QuorumMismatch {
                    target,
                    required: quorum,
                    actual: ops.len(),
                }
                .into());
            }
            for op in &ops {
                let op_signer = self
                    .store
                    .public_key(&op.sigkey_hash)?
                    .ok_or_else(|| RejectReason::UnknownOpSigner(op.sigkey_hash.clone()))?;
                let op_key = crypto::decode_public_key(&op_signer.public_key)?;
                if !crypto::verify_key_hash(&op_key, &target, &op.signature)? {
                    return Err(RejectReason::BadOpSig {
                        target,
                        signer: op.sigkey_hash.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// `blocks/XXXX/block_YYYYYYYY.db` under the data directory, both parts
    /// hex, bucketed by `height / 65536`.
    pub fn block_path(&self, height: u64) -> PathBuf {
        self.ctx
            .data_dir
            .join(BLOCKCHAIN_SUBDIR)
            .join(format!("{:04x}", height / 65536))
            .join(format!("block_{:08x}.db", height))
    }

    fn ensure_block_dir(&self, height: u64) -> Result<(), ChainError> {
        let dir = self
            .ctx
            .data_dir
            .join(BLOCKCHAIN_SUBDIR)
            .join(format!("{:04x}", height / 65536));
        ensure_dir(&dir, 0o755)?;
        Ok(())
    }
}

fn ensure_dir(path: &Path, mode: u32) -> Result<(), ChainError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)?;
    Ok(())
}
