//! Shared helpers for forging chains and candidate block files in tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use genesis::{
    AssetSource, ChainParams, ConsensusType, GenesisError, GENESIS_ASSET_NAME,
    GENESIS_PREVIOUS_BLOCK_HASH,
};
use ledger_core::block::{
    BlockBuilder, META_CREATOR_PUBLIC_KEY, META_PREVIOUS_BLOCK_HASH,
    META_PREVIOUS_BLOCK_HASH_SIGNATURE, META_TIMESTAMP, META_VERSION,
};
use ledger_core::{
    canonical_key_hash, hash_bytes, hash_file, sign_hex, sign_key_hash, Chain, ChainContext,
    SecretKey,
};
use tempfile::TempDir;

pub const TEST_GENESIS_TIMESTAMP: &str = "2024-01-01T00:00:00+00:00";

/// Deterministic keypair for tests.
pub fn keypair(n: u8) -> SecretKey {
    SecretKey::from_bytes(&[n; 32])
}

pub fn key_hash(key: &SecretKey) -> String {
    canonical_key_hash(&key.verifying_key())
}

/// Asset source handing out a genesis blob built by the test.
pub struct TestAssets {
    pub genesis: Vec<u8>,
}

impl AssetSource for TestAssets {
    fn get(&self, name: &str) -> Result<Vec<u8>, GenesisError> {
        if name == GENESIS_ASSET_NAME {
            Ok(self.genesis.clone())
        } else {
            Err(GenesisError::UnknownAsset(name.to_string()))
        }
    }
}

/// One key-op group in a forged block: `signers` each co-sign the target.
pub struct OpGroup<'a> {
    pub op: &'a str,
    pub target: &'a SecretKey,
    pub signers: Vec<&'a SecretKey>,
}

/// Write a candidate block file extending `prev_hash`, signed by `creator`.
/// Returns the file path and the signature over its content hash.
pub fn forge_block(
    dir: &Path,
    name: &str,
    prev_hash: &str,
    creator: &SecretKey,
    ops: &[OpGroup<'_>],
) -> (PathBuf, Vec<u8>) {
    let path = dir.join(name);
    {
        let builder = BlockBuilder::open(&path).unwrap();
        builder.set_meta_int(META_VERSION, 1).unwrap();
        builder
            .set_meta_string(META_PREVIOUS_BLOCK_HASH, prev_hash)
            .unwrap();
        builder
            .set_meta_string(META_CREATOR_PUBLIC_KEY, &key_hash(creator))
            .unwrap();
        builder
            .set_meta_string(
                META_PREVIOUS_BLOCK_HASH_SIGNATURE,
                &hex::encode(sign_hex(creator, prev_hash).unwrap()),
            )
            .unwrap();
        builder
            .set_meta_string(META_TIMESTAMP, "2024-01-02T03:04:05+00:00")
            .unwrap();
        for group in ops {
            let target_hash = key_hash(group.target);
            for signer in &group.signers {
                builder
                    .add_key_op(
                        group.op,
                        &target_hash,
                        group.target.verifying_key().as_bytes(),
                        &key_hash(signer),
                        &sign_key_hash(signer, &target_hash).unwrap(),
                        None,
                    )
                    .unwrap();
            }
        }
    }
    let hash = hash_file(&path).unwrap();
    let signature = sign_hex(creator, &hash).unwrap();
    (path, signature)
}

/// Build a genesis blob whose only signatory is `key`.
pub fn genesis_blob(dir: &Path, key: &SecretKey) -> Vec<u8> {
    let path = dir.join("genesis_seed.db");
    let hash = key_hash(key);
    {
        let builder = BlockBuilder::open(&path).unwrap();
        builder.set_meta_int(META_VERSION, 1).unwrap();
        builder
            .set_meta_string(META_PREVIOUS_BLOCK_HASH, GENESIS_PREVIOUS_BLOCK_HASH)
            .unwrap();
        builder.set_meta_string(META_CREATOR_PUBLIC_KEY, &hash).unwrap();
        builder
            .set_meta_string(
                META_PREVIOUS_BLOCK_HASH_SIGNATURE,
                &hex::encode(sign_hex(key, GENESIS_PREVIOUS_BLOCK_HASH).unwrap()),
            )
            .unwrap();
        builder
            .set_meta_string(META_TIMESTAMP, TEST_GENESIS_TIMESTAMP)
            .unwrap();
        builder
            .add_key_op(
                "A",
                &hash,
                key.verifying_key().as_bytes(),
                &hash,
                &sign_key_hash(key, &hash).unwrap(),
                Some(r#"{"name": "test signatory"}"#),
            )
            .unwrap();
    }
    std::fs::read(&path).unwrap()
}

/// A bootstrapped single-signatory chain in a temp directory.
pub struct TestChain {
    pub dir: TempDir,
    pub chain: Chain,
    pub genesis_key: SecretKey,
    pub assets: TestAssets,
}

impl TestChain {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let genesis_key = keypair(7);
        let genesis = genesis_blob(dir.path(), &genesis_key);
        let genesis_hash = hash_bytes(&genesis);
        let params = ChainParams {
            consensus_type: ConsensusType::ProofOfAuthority,
            genesis_block_hash: genesis_hash.clone(),
            genesis_block_hash_signature: hex::encode(
                sign_hex(&genesis_key, &genesis_hash).unwrap(),
            ),
            genesis_block_timestamp: TEST_GENESIS_TIMESTAMP.to_string(),
            bootstrap_peers: Vec::new(),
        };
        let chain = Chain::open(ChainContext {
            data_dir: dir.path().join("data"),
            params,
            fast_mode: false,
        })
        .unwrap();
        let assets = TestAssets { genesis };
        assert!(chain.bootstrap(&assets).unwrap());
        TestChain {
            dir,
            chain,
            genesis_key,
            assets,
        }
    }

    /// Forge a candidate on top of the current tip and accept it.
    pub fn accept(&self, name: &str, creator: &SecretKey, ops: &[OpGroup<'_>]) -> u64 {
        let tip = self.chain.tip().unwrap().unwrap();
        let (path, sig) = forge_block(self.dir.path(), name, &tip.hash, creator, ops);
        self.chain.accept_block(&path, &sig).unwrap()
    }
}
