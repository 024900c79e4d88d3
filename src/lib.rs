//! A single-validator permissioned blockchain node.
//!
//! Signed blocks over signed transactions, gossiped between peers; a bounded
//! mempool with insertion-order packing; a small stack VM executing
//! transaction payloads on block acceptance; and an in-memory chain and
//! state store.

pub mod core;
pub mod crypto;
pub mod network;
pub mod types;
pub mod utils;
pub mod virtual_machine;
