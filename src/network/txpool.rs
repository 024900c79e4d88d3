//! Bounded mempool of pending transactions.
//!
//! Two views of the same transactions: `all` is the capacity-bounded working
//! set, `pending` is the subset seen since the validator last drained the
//! pool into a block. Iteration order is insertion order, which is the
//! tie-break used for block packing.

use crate::core::transaction::Transaction;
use crate::types::hash::Hash;
use crate::types::list::List;
use std::collections::HashMap;
use std::sync::RwLock;

/// Hash-indexed transaction map with stable insertion order.
///
/// A hash map for O(1) membership plus a parallel order list for
/// deterministic "first" and iteration, behind one reader/writer lock.
pub struct TxSortedMap {
    inner: RwLock<SortedInner>,
}

struct SortedInner {
    lookup: HashMap<Hash, Transaction>,
    order: List<Hash>,
}

impl TxSortedMap {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SortedInner {
                lookup: HashMap::new(),
                order: List::new(),
            }),
        }
    }

    /// The oldest transaction, if any.
    pub fn first(&self) -> Option<Transaction> {
        let inner = self.inner.read().unwrap();
        let hash = inner.order.first()?;
        inner.lookup.get(hash).cloned()
    }

    pub fn get(&self, hash: Hash) -> Option<Transaction> {
        self.inner.read().unwrap().lookup.get(&hash).cloned()
    }

    /// Inserts unless the hash is already present.
    pub fn add(&self, tx: Transaction) {
        let hash = tx.hash();
        let mut inner = self.inner.write().unwrap();
        if !inner.lookup.contains_key(&hash) {
            inner.order.insert(hash);
            inner.lookup.insert(hash, tx);
        }
    }

    /// Removes by hash; O(n) on the order list.
    pub fn remove(&self, hash: Hash) {
        let mut inner = self.inner.write().unwrap();
        if inner.lookup.remove(&hash).is_some() {
            inner.order.remove(&hash);
        }
    }

    pub fn contains(&self, hash: Hash) -> bool {
        self.inner.read().unwrap().lookup.contains_key(&hash)
    }

    pub fn count(&self) -> usize {
        self.inner.read().unwrap().lookup.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.lookup.clear();
        inner.order.clear();
    }

    /// All transactions in insertion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        let inner = self.inner.read().unwrap();
        inner
            .order
            .iter()
            .filter_map(|hash| inner.lookup.get(hash).cloned())
            .collect()
    }
}

impl Default for TxSortedMap {
    fn default() -> Self {
        Self::new()
    }
}

/// The mempool: every known transaction plus the not-yet-packed subset.
pub struct TxPool {
    all: TxSortedMap,
    pending: TxSortedMap,
    max_length: usize,
}

impl TxPool {
    /// Creates a pool holding at most `max_length` transactions in `all`.
    pub fn new(max_length: usize) -> Self {
        Self {
            all: TxSortedMap::new(),
            pending: TxSortedMap::new(),
            max_length,
        }
    }

    /// Inserts a transaction, evicting the oldest entry when full.
    ///
    /// Eviction touches `all` only: a transaction that fell out of the
    /// working set but was never packed stays pending. Re-adding a known
    /// hash is a no-op.
    pub fn add(&self, tx: Transaction) {
        if self.all.count() == self.max_length {
            if let Some(oldest) = self.all.first() {
                self.all.remove(oldest.hash());
            }
        }

        if !self.all.contains(tx.hash()) {
            self.all.add(tx.clone());
            self.pending.add(tx);
        }
    }

    /// Membership in the working set.
    pub fn contains(&self, hash: Hash) -> bool {
        self.all.contains(hash)
    }

    /// Pending transactions in insertion order.
    pub fn pending(&self) -> Vec<Transaction> {
        self.pending.transactions()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.count()
    }

    /// Empties the pending set; the working set keeps its entries.
    pub fn clear_pending(&self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.all.count()
    }

    pub fn is_empty(&self) -> bool {
        self.all.count() == 0
    }
}
