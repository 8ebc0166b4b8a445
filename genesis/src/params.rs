// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::GenesisError;

/// Hard-coded stand-in hash of the non-existent block before genesis.
pub const GENESIS_PREVIOUS_BLOCK_HASH: &str =
    "1000000000000000000000000000000000000000000000000000000000000001";

/// Content hash of the canonical genesis block file shipped in this binary.
pub const GENESIS_BLOCK_HASH: &str =
    "0dec3ed2261fd1f18aa76fdc4f5ae4b890b60df6b8fa630cd57fab913033c33f";

/// Signature over the genesis block hash by the bootstrap signatory.
pub const GENESIS_BLOCK_HASH_SIGNATURE: &str = "b70bcf3c49c977aa21dc432540012bc709a23a25c352aa7db05b2fbdc4fabaf05aecd0918a5cb07014228c4495d1cfa5a4dea56066fdfa8ba03c6486cd68b80c";

pub const GENESIS_BLOCK_TIMESTAMP: &str = "2017-05-06T10:38:50+02:00";

/// File name of the optional on-disk chain params override.
pub const CHAIN_PARAMS_BASE_NAME: &str = "chainparams.json";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConsensusType {
    #[serde(rename = "PoA")]
    ProofOfAuthority,
}

/// Describes the genesis block and other fixed properties of one chain.
///
/// The compiled-in defaults describe the canonical QUORUS chain; a
/// `chainparams.json` file in the data directory replaces them wholesale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainParams {
    #[serde(rename = "ConsensusType")]
    pub consensus_type: ConsensusType,
    #[serde(rename = "GenesisBlockHash")]
    pub genesis_block_hash: String,
    #[serde(rename = "GenesisBlockHashSignature")]
    pub genesis_block_hash_signature: String,
    #[serde(rename = "GenesisBlockTimestamp")]
    pub genesis_block_timestamp: String,
    #[serde(rename = "BootstrapPeers", default)]
    pub bootstrap_peers: Vec<String>,
}

static DEFAULT_CHAIN_PARAMS: Lazy<ChainParams> = Lazy::new(|| ChainParams {
    consensus_type: ConsensusType::ProofOfAuthority,
    genesis_block_hash: GENESIS_BLOCK_HASH.to_string(),
    genesis_block_hash_signature: GENESIS_BLOCK_HASH_SIGNATURE.to_string(),
    genesis_block_timestamp: GENESIS_BLOCK_TIMESTAMP.to_string(),
    bootstrap_peers: Vec::new(),
});

impl Default for ChainParams {
    fn default() -> Self {
        DEFAULT_CHAIN_PARAMS.clone()
    }
}

impl ChainParams {
    /// Load the chain params for the given data directory: the on-disk
    /// override when present, the compiled-in defaults otherwise.
    pub fn load(data_dir: &Path) -> Result<Self, GenesisError> {
        let path = data_dir.join(CHAIN_PARAMS_BASE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read(&path)?;
        serde_json::from_slice(&raw).map_err(|source| GenesisError::InvalidParams {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn is_default(&self) -> bool {
        self.genesis_block_hash == GENESIS_BLOCK_HASH
    }
}
