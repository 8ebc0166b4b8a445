//! Chain parameters and the embedded genesis block for the QUORUS ledger.

pub mod asset;
pub mod params;
pub mod types;

pub use crate::asset::{AssetSource, EmbeddedAssets, GENESIS_ASSET_NAME};
pub use crate::params::{
    ChainParams, ConsensusType, CHAIN_PARAMS_BASE_NAME, GENESIS_BLOCK_HASH,
    GENESIS_BLOCK_HASH_SIGNATURE, GENESIS_BLOCK_TIMESTAMP, GENESIS_PREVIOUS_BLOCK_HASH,
};
pub use crate::types::GenesisError;
