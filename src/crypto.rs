//! Cryptographic primitives: keccak-256 hashing and recoverable secp256k1 signatures.

use crate::error::ChainError;
use crate::types::{Address, Bytes32};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::SECRET_KEY_SIZE,
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha3::{Digest, Keccak256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Length of a recoverable signature: `r ‖ s ‖ v`.
pub const SIGNATURE_LENGTH: usize = 65;

pub fn keccak256(data: &[u8]) -> Bytes32 {
    Bytes32(Keccak256::digest(data).into())
}

/// Address of a public key: the last 20 bytes of the keccak-256 of its uncompressed
/// form without the `0x04` prefix.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.0[12..]);
    Address(address)
}

/// Recovers the public key that produced `signature` over `digest`.
pub fn recover_public_key(digest: &Bytes32, signature: &[u8]) -> Result<PublicKey, ChainError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ChainError::Crypto(format!(
            "Signature must be exactly {} bytes, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )));
    }
    let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
        .map_err(|e| ChainError::Crypto(format!("Invalid recovery id: {}", e)))?;
    let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| ChainError::Crypto(format!("Invalid signature: {}", e)))?;

    let message = Message::from_digest(digest.0);
    SECP256K1_CONTEXT
        .recover_ecdsa(&message, &signature)
        .map_err(|e| ChainError::Crypto(format!("Public key recovery failed: {}", e)))
}

/// Recovers the signer address of `signature` over `digest`.
pub fn recover_address(digest: &Bytes32, signature: &[u8]) -> Result<Address, ChainError> {
    recover_public_key(digest, signature).map(|key| public_key_to_address(&key))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::new(&mut OsRng))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::Crypto(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::Crypto(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn address(&self) -> Address {
        public_key_to_address(&self.public_key)
    }

    /// Signs a 32-byte digest as-is (no further hashing) and returns `r ‖ s ‖ v`
    /// with `v` in `{0, 1}`.
    pub fn sign_digest(&self, digest: &Bytes32) -> [u8; SIGNATURE_LENGTH] {
        let message = Message::from_digest(digest.0);
        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&compact);
        // recovery ids are 0..=3, always fits
        out[64] = recovery_id.to_i32() as u8;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty_input() {
        assert_eq!(
            keccak256(&[]).to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let keypair = KeyPair::generate();
        let digest = keccak256(b"Hello, chainstate!");

        let signature = keypair.sign_digest(&digest);
        assert!(signature[64] <= 1);

        let recovered = recover_address(&digest, &signature).unwrap();
        assert_eq!(recovered, keypair.address());
    }

    #[test]
    fn test_recover_with_other_digest_yields_other_address() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign_digest(&keccak256(b"original"));

        match recover_address(&keccak256(b"tampered"), &signature) {
            Ok(address) => assert_ne!(address, keypair.address()),
            Err(err) => assert!(matches!(err, ChainError::Crypto(_))),
        }
    }

    #[test]
    fn test_invalid_signature_length() {
        let result = recover_address(&keccak256(b"x"), &[0u8; 64]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Signature must be exactly"));
    }

    #[test]
    fn test_invalid_recovery_id() {
        let keypair = KeyPair::generate();
        let digest = keccak256(b"x");
        let mut signature = keypair.sign_digest(&digest);
        signature[64] = 27;

        let result = recover_address(&digest, &signature);
        assert!(result.unwrap_err().to_string().contains("Invalid recovery id"));
    }

    #[test]
    fn test_from_secret_bytes_invalid_length() {
        let short_bytes = [1u8; SECRET_KEY_SIZE - 1];
        let result = KeyPair::from_secret_bytes(&short_bytes);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Secret key must be"));
    }

    #[test]
    fn test_from_secret_bytes_is_deterministic() {
        let a = KeyPair::from_secret_bytes(&[7u8; SECRET_KEY_SIZE]).unwrap();
        let b = KeyPair::from_secret_bytes(&[7u8; SECRET_KEY_SIZE]).unwrap();
        assert_eq!(a.address(), b.address());
    }
}
