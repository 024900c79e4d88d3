//! Shared helpers for tests.

#[cfg(test)]
pub mod utils {
    use crate::core::block::{data_hash, Block, Header, PROTOCOL_VERSION};
    use crate::core::transaction::Transaction;
    use crate::crypto::key_pair::PrivateKey;
    use crate::types::hash::{Hash, HASH_LEN};
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(1);

    /// A unique (per process) hash, without touching the OS RNG.
    pub fn random_hash() -> Hash {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; HASH_LEN];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Hash(bytes)
    }

    /// A signed transaction with the given payload and a fresh key.
    pub fn signed_tx(data: &[u8]) -> Transaction {
        let mut tx = Transaction::new(data);
        tx.sign(&PrivateKey::generate()).unwrap();
        tx
    }

    /// The deterministic test genesis: height 0, zero predecessor.
    pub fn create_genesis() -> Block {
        let header = Header {
            version: PROTOCOL_VERSION,
            data_hash: Hash::zero(),
            prev_block_hash: Hash::zero(),
            height: 0,
            timestamp: 0,
        };
        Block::new(header, vec![])
    }

    /// A signed, internally consistent block at an arbitrary chain position.
    pub fn random_block(height: u32, prev_block_hash: Hash) -> Block {
        let txs = vec![signed_tx(b"foo")];
        let header = Header {
            version: PROTOCOL_VERSION,
            data_hash: data_hash(&txs),
            prev_block_hash,
            height,
            timestamp: random_hash().0[0] as i64,
        };
        let mut block = Block::new(header, txs);
        block.sign(&PrivateKey::generate()).unwrap();
        block
    }
}
