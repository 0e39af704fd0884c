//! chainstate - journaled execution state and self-identifying block headers
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Execution State
//! - [`journal`] - Layered key/value journal with checkpoint and replay
//! - [`state`] - Account store contract and an in-memory store
//! - [`statedb`] - Execution state facade used by the VM adapter
//!
//! ## Blocks
//! - [`block`] - Block headers, block IDs and the header builder
//! - [`cache`] - Shared signer cache
//!
//! ## Cryptography & Primitives
//! - [`crypto`] - keccak-256 and recoverable secp256k1 signatures
//! - [`types`] - Hashes, addresses, amounts and logs
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`context`] - Owner of shared resources
//! - [`error`] - Error types
//! - [`telemetry`] - Logging setup

#![forbid(unsafe_code)]

// ============================================================================
// Execution State
// ============================================================================
pub mod journal;
pub mod state;
pub mod statedb;

// ============================================================================
// Blocks
// ============================================================================
pub mod block;
pub mod cache;

// ============================================================================
// Cryptography & Primitives
// ============================================================================
pub mod crypto;
pub mod types;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod context;
pub mod error;
pub mod telemetry;
