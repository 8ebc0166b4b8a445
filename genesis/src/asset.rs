//! Embedded asset access for the canonical genesis block.
//!
//! The default chain ships its genesis block file as a gzipped in-binary
//! asset. Callers depend on the [`AssetSource`] capability rather than on
//! the embedding mechanism, so tests can substitute their own genesis.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::types::GenesisError;

/// Logical name of the genesis block asset.
pub const GENESIS_ASSET_NAME: &str = "bindata/genesis.db";

static GENESIS_DB_GZ: &[u8] = include_bytes!("../assets/genesis.db.gz");

/// Read-only source of named binary assets.
pub trait AssetSource {
    fn get(&self, name: &str) -> Result<Vec<u8>, GenesisError>;
}

/// The assets compiled into this binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn get(&self, name: &str) -> Result<Vec<u8>, GenesisError> {
        let compressed = match name {
            GENESIS_ASSET_NAME => GENESIS_DB_GZ,
            _ => return Err(GenesisError::UnknownAsset(name.to_string())),
        };
        let mut out = Vec::new();
        GzDecoder::new(compressed)
            .read_to_end(&mut out)
            .map_err(|source| GenesisError::CorruptAsset {
                name: name.to_string(),
                source,
            })?;
        Ok(out)
    }
}
