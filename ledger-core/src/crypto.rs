use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::types::DecodeError;

pub type PublicKey = VerifyingKey;
pub type SecretKey = SigningKey;

/// Decode the 32-byte Ed25519 encoding of a public key.
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, DecodeError> {
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| DecodeError::PublicKey)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| DecodeError::PublicKey)
}

/// Canonical hash identifying a public key in the registry and in `_keys`
/// rows: lowercase hex SHA-256 of the key encoding.
pub fn canonical_key_hash(key: &PublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.to_bytes());
    hex::encode(hasher.finalize())
}

/// Verify `signature` over raw `message` bytes. Malformed signature bytes
/// verify as false.
pub fn verify_bytes(key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(bytes) = <&[u8; 64]>::try_from(signature) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(bytes)).is_ok()
}

/// Verify `signature` over the bytes a hex string decodes to. The hex form
/// is the canonical message for block hashes.
pub fn verify_hex(
    key: &PublicKey,
    hex_message: &str,
    signature: &[u8],
) -> Result<bool, DecodeError> {
    let message = hex::decode(hex_message)?;
    Ok(verify_bytes(key, &message, signature))
}

/// Verify a key-op signature over a target public key hash.
pub fn verify_key_hash(
    key: &PublicKey,
    target_hash: &str,
    signature: &[u8],
) -> Result<bool, DecodeError> {
    verify_hex(key, target_hash, signature)
}

pub fn sign_bytes(key: &SecretKey, message: &[u8]) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}

pub fn sign_hex(key: &SecretKey, hex_message: &str) -> Result<Vec<u8>, DecodeError> {
    let message = hex::decode(hex_message)?;
    Ok(sign_bytes(key, &message))
}

/// Sign a target public key hash for a key-op row.
pub fn sign_key_hash(key: &SecretKey, target_hash: &str) -> Result<Vec<u8>, DecodeError> {
    sign_hex(key, target_hash)
}

pub fn generate_keypair() -> (PublicKey, SecretKey) {
    let mut rng = OsRng;
    let mut secret_bytes = [0u8; 32];
    rng.fill_bytes(secret_bytes.as_mut());
    let secret = SigningKey::from_bytes(&secret_bytes);
    let public = secret.verifying_key();
    (public, secret)
}
