//! Primitive types shared across the chain.
//!
//! - [`hash`]: 32-byte SHA-256 hashes, incremental hashing, hash memoization
//! - [`address`]: 20-byte account addresses
//! - [`bytes`]: reference-counted byte buffers
//! - [`list`]: insertion-ordered generic list
//! - [`encoding`]: deterministic binary codec traits

pub mod address;
pub mod bytes;
pub mod encoding;
pub mod hash;
pub mod list;
pub mod wrapper_types;
