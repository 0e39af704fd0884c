//! Primitive value types shared by the journal, the execution state and block headers.

use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 256-bit unsigned quantity used for balances and refunds.
pub type Amount = ethnum::U256;

/// Fixed 32-byte value: hashes, storage keys/values and block identifiers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bytes32(pub [u8; 32]);

/// Block identifier: number (4 bytes, big-endian) ‖ truncated hash ‖ chain tag (1 byte).
pub type BlockId = Bytes32;

impl Bytes32 {
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Left-pads `bytes` into a 32-byte value, keeping the rightmost 32 bytes if longer.
    pub fn from_slice_padded(bytes: &[u8]) -> Self {
        let mut out = [0u8; 32];
        let take = bytes.len().min(32);
        out[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
        Bytes32(out)
    }

    pub fn from_hex(s: &str) -> Result<Self, ChainError> {
        decode_fixed(s).map(Bytes32)
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Bytes32(bytes)
    }
}

impl AsRef<[u8]> for Bytes32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// 20-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Builds an address from the trailing bytes of `bytes`, left-padding short input.
    /// Handy for deterministic test fixtures.
    pub fn from_slice_padded(bytes: &[u8]) -> Self {
        let mut out = [0u8; 20];
        let take = bytes.len().min(20);
        out[20 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
        Address(out)
    }

    pub fn from_hex(s: &str) -> Result<Self, ChainError> {
        decode_fixed(s).map(Address)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ChainError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed)
        .map_err(|e| ChainError::Codec(format!("Invalid hex string: {}", e)))?;
    if bytes.len() != N {
        return Err(ChainError::Codec(format!(
            "Expected {} bytes, got {}",
            N,
            bytes.len()
        )));
    }
    bytes
        .try_into()
        .map_err(|_| ChainError::Codec("Failed to convert bytes".to_string()))
}

/// Event emitted by contract execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Bytes32>,
    pub data: Vec<u8>,
}

impl Log {
    pub fn new(address: Address, topics: Vec<Bytes32>, data: Vec<u8>) -> Self {
        Log {
            address,
            topics,
            data,
        }
    }
}
