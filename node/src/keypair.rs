// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ledger_core::{canonical_key_hash, SecretKey};
use serde::{Deserialize, Serialize};

pub const KEYPAIR_BASE_NAME: &str = "node_key.json";

#[derive(Serialize, Deserialize)]
struct KeypairFile {
    public_key: String,
    secret_key: String,
}

pub fn default_keypair_path(data_dir: &Path) -> PathBuf {
    data_dir.join(KEYPAIR_BASE_NAME)
}

pub fn keypair_exists(path: &Path) -> bool {
    path.exists()
}

pub fn save_keypair(key: &SecretKey, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create keypair parent directory: {}",
                parent.display()
            )
        })?;
    }
    let file = KeypairFile {
        public_key: hex::encode(key.verifying_key().to_bytes()),
        secret_key: hex::encode(key.to_bytes()),
    };
    let out = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, out)
        .with_context(|| format!("failed to write keypair: {}", path.display()))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

pub fn load_keypair(path: &Path) -> Result<SecretKey> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read keypair: {}", path.display()))?;
    let file: KeypairFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse keypair: {}", path.display()))?;
    let seed: [u8; 32] = hex::decode(&file.secret_key)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| anyhow!("keypair {} has a malformed secret key", path.display()))?;
    let key = SecretKey::from_bytes(&seed);
    let derived = hex::encode(key.verifying_key().to_bytes());
    if derived != file.public_key {
        return Err(anyhow!(
            "keypair {} public key doesn't match its secret key",
            path.display()
        ));
    }
    Ok(key)
}

/// Hash under which the node key appears in the signatory registry.
pub fn key_hash(key: &SecretKey) -> String {
    canonical_key_hash(&key.verifying_key())
}
