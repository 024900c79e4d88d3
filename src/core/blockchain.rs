//! The chain: an append-only header index plus block storage and VM state.

use crate::core::block::{Block, BlockError, Header};
use crate::core::storage::{MemoryStore, Storage};
use crate::core::validator::{BlockValidator, Validator};
use crate::types::hash::Hash;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::state::State;
use crate::virtual_machine::vm::Vm;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

/// Errors from chain queries and block insertion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The chain already holds a block at that height. Distinguished so the
    /// server can drop re-announced blocks without logging them as failures.
    #[error("chain already contains block {height} ({hash})")]
    BlockKnown { height: u32, hash: Hash },

    /// The block does not extend the current tip.
    #[error("block height {height} is out of order, current height is {tip}")]
    HeightOutOfOrder { height: u32, tip: u32 },

    /// A header was requested beyond the tip.
    #[error("height {requested} is too high, current height is {tip}")]
    HeightTooHigh { requested: u32, tip: u32 },

    /// The block's predecessor link does not match our header at height - 1.
    #[error("previous block hash mismatch for block at height {height}")]
    PrevHashMismatch { height: u32 },

    /// Signature or data-hash verification failed.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// A transaction payload failed in the VM; the block is rejected.
    #[error("transaction execution failed: {0}")]
    ExecutionFailed(#[from] VmError),
}

/// Append-only header index; height equals position.
#[derive(Debug, Default)]
pub struct HeaderList {
    headers: Vec<Header>,
}

impl HeaderList {
    fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Height of the tip. Callers guarantee at least the genesis header.
    pub fn height(&self) -> u32 {
        self.headers.len() as u32 - 1
    }

    /// True when a header exists at `height`.
    pub fn has(&self, height: u32) -> bool {
        height <= self.height()
    }

    /// The header at `height`, or `HeightTooHigh` past the tip.
    pub fn get(&self, height: u32) -> Result<&Header, ChainError> {
        if !self.has(height) {
            return Err(ChainError::HeightTooHigh {
                requested: height,
                tip: self.height(),
            });
        }
        Ok(&self.headers[height as usize])
    }

    fn push(&mut self, header: Header) {
        self.headers.push(header);
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// The blockchain: header index, block store, validator, and VM state.
///
/// Generic over the validation strategy and the storage backend; the writer
/// lock on the header index serializes insertions between the server loop
/// and the validator ticker.
pub struct Blockchain<V: Validator = BlockValidator, S: Storage = MemoryStore> {
    headers: RwLock<HeaderList>,
    store: S,
    state: RwLock<State>,
    validator: V,
}

impl Blockchain {
    /// Creates a chain seeded with `genesis`, stored without validation.
    pub fn new(genesis: Block) -> Self {
        Self::with_parts(genesis, BlockValidator, MemoryStore::new())
    }
}

impl<V: Validator, S: Storage> Blockchain<V, S> {
    /// Creates a chain with an explicit validator and storage backend.
    pub fn with_parts(genesis: Block, validator: V, store: S) -> Self {
        info!(
            height = genesis.header.height,
            hash = %genesis.hash(),
            "initializing chain from genesis"
        );

        let mut headers = HeaderList::new();
        headers.push(genesis.header.clone());
        store.put(Arc::new(genesis));

        Self {
            headers: RwLock::new(headers),
            store,
            state: RwLock::new(State::new()),
            validator,
        }
    }

    /// Height of the chain tip.
    pub fn height(&self) -> u32 {
        self.headers.read().unwrap().height()
    }

    /// True when a block exists at `height`.
    pub fn has_block(&self, height: u32) -> bool {
        self.headers.read().unwrap().has(height)
    }

    /// The header at `height`, or `HeightTooHigh` past the tip.
    pub fn get_header(&self, height: u32) -> Result<Header, ChainError> {
        self.headers.read().unwrap().get(height).map(|h| h.clone())
    }

    /// The stored block at `height`, if any.
    pub fn get_block(&self, height: u32) -> Option<Arc<Block>> {
        self.store.get(height)
    }

    /// The VM state store. No core opcode writes to it yet; this is the
    /// reserved surface for storage instructions.
    pub fn state(&self) -> &RwLock<State> {
        &self.state
    }

    /// Validates `block`, executes its transactions, and appends it.
    ///
    /// Holds the header writer lock across validate-execute-append, so
    /// concurrent insertions cannot interleave. Any VM failure rejects the
    /// whole block.
    pub fn add_block(&self, block: Block) -> Result<(), ChainError> {
        let mut headers = self.headers.write().unwrap();
        self.validator.validate_block(&headers, &block)?;

        {
            let mut state = self.state.write().unwrap();
            for tx in &block.transactions {
                let mut vm = Vm::new(tx.data.to_vec());
                vm.run(&mut state)?;
            }
        }

        info!(
            height = block.header.height,
            hash = %block.hash(),
            transactions = block.transactions.len(),
            "appended block"
        );

        headers.push(block.header.clone());
        self.store.put(Arc::new(block));
        Ok(())
    }
}
