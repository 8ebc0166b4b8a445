//! Block verification and append core of the QUORUS proof-of-authority
//! ledger. Each block is a self-contained SQLite database; this crate owns
//! the on-disk layout, the signatory registry, the acceptance predicate and
//! the full-chain verifier.

pub mod block;
pub mod chain;
pub mod crypto;
pub mod hashing;
pub mod quorum;
pub mod store;
pub mod types;

pub use crate::block::{BlockBuilder, BlockFile, BlockMeta, KeyOp};
pub use crate::chain::{Chain, ChainContext, BLOCKCHAIN_SUBDIR};
pub use crate::crypto::{
    canonical_key_hash, decode_public_key, generate_keypair, sign_bytes, sign_hex, sign_key_hash,
    verify_bytes, verify_hex, verify_key_hash, PublicKey, SecretKey,
};
pub use crate::hashing::{hash_bytes, hash_file};
pub use crate::quorum::quorum_for_height;
pub use crate::store::IndexStore;
pub use crate::types::{
    BlockHeader, ChainError, DecodeError, IntegrityError, RegistryEntry, RejectReason,
    CURRENT_BLOCK_VERSION, GENESIS_BLOCK_HEIGHT,
};
