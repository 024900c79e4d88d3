//! Block storage behind a narrow trait.
//!
//! Only the in-memory store exists today; the trait is the seam a durable
//! backend would implement.

use crate::core::block::Block;
use std::sync::{Arc, RwLock};

/// Height-keyed block storage.
///
/// Blocks arrive strictly in height order (the chain validates before
/// storing), so height doubles as the storage index.
pub trait Storage: Send + Sync {
    /// Stores the block at the next height.
    fn put(&self, block: Arc<Block>);

    /// Returns the block at `height`, if stored.
    fn get(&self, height: u32) -> Option<Arc<Block>>;

    /// Number of stored blocks.
    fn len(&self) -> usize;
}

/// In-memory block store: a height-indexed vector.
#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<Vec<Arc<Block>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(Vec::new()),
        }
    }
}

impl Storage for MemoryStore {
    fn put(&self, block: Arc<Block>) {
        self.blocks.write().unwrap().push(block);
    }

    fn get(&self, height: u32) -> Option<Arc<Block>> {
        self.blocks.read().unwrap().get(height as usize).cloned()
    }

    fn len(&self) -> usize {
        self.blocks.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::create_genesis;

    #[test]
    fn put_then_get_by_height() {
        let store = MemoryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.get(0).is_none());

        let genesis = Arc::new(create_genesis());
        store.put(genesis.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().hash(), genesis.hash());
        assert!(store.get(1).is_none());
    }
}
