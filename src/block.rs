//! Block headers and the block identifier scheme.
//!
//! A block ID is 32 bytes: the block number in the first four bytes (big-endian),
//! a truncated hash in the middle, and the chain tag in the last byte. Genesis is
//! the only block whose parent ID is all zero once the chain tag is cleared.

pub mod builder;
pub mod header;

pub use builder::HeaderBuilder;
pub use header::Header;

use crate::types::BlockId;

/// Block number embedded in the first four bytes of a block ID.
pub fn number(block_id: &BlockId) -> u32 {
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&block_id.0[..4]);
    u32::from_be_bytes(prefix)
}

/// Parent ID a genesis header is built on: zero except for the chain tag.
pub fn genesis_parent_id(chain_tag: u8) -> BlockId {
    let mut id = BlockId::ZERO;
    id.0[31] = chain_tag;
    id
}
