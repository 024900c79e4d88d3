//! Block and header structures, hashing and signing.

use crate::core::transaction::Transaction;
use crate::crypto::key_pair::{KeyError, PrivateKey, PublicKey, Signature};
use crate::types::bytes::Bytes;
use crate::types::encoding::Encode;
use crate::types::hash::{Hash, HashCache};
use solochain_derive::BinaryCodec;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Protocol version stamped into produced headers and status messages.
pub const PROTOCOL_VERSION: u32 = 1;

/// Errors from block verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    /// The block was never signed.
    #[error("block has no signature")]
    NoSignature,
    /// The recorded validator key does not decode.
    #[error("block validator key is invalid")]
    InvalidPublicKey,
    /// The signature does not verify against the validator key and header.
    #[error("invalid block signature")]
    InvalidSignature,
    /// The recomputed data hash differs from the header's.
    #[error("invalid block data hash")]
    InvalidDataHash,
}

/// Block metadata. The header's canonical encoding is what gets hashed and
/// signed, so the chain link (`prev_block_hash`) and the transaction
/// commitment (`data_hash`) are both sealed by the validator signature.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Header {
    /// Protocol version for forward compatibility.
    pub version: u32,
    /// SHA-256 over the concatenated canonical encodings of the transactions.
    pub data_hash: Hash,
    /// Hash of the predecessor's header; zero for genesis.
    pub prev_block_hash: Hash,
    /// Position in the chain; genesis is 0.
    pub height: u32,
    /// Creation time in Unix nanoseconds.
    pub timestamp: i64,
}

impl Header {
    /// Canonical header bytes, the message for hashing and signing.
    pub fn bytes(&self) -> Bytes {
        self.to_bytes()
    }

    /// SHA-256 over the canonical header bytes.
    pub fn hash(&self) -> Hash {
        let mut builder = Hash::builder();
        self.encode(&mut builder);
        builder.finalize()
    }
}

/// A block: header plus ordered transactions, signed by the validator.
///
/// Immutable once verified; the header hash is memoized on first use.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    /// Compressed public key of the signing validator; empty until signed.
    pub validator: Bytes,
    /// ECDSA signature over the canonical header bytes.
    pub signature: Option<Signature>,

    /// Lazily computed header hash; not part of value identity.
    cached_hash: HashCache,
}

impl Block {
    /// Creates an unsigned block from a header and transactions.
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
            validator: Bytes::default(),
            signature: None,
            cached_hash: HashCache::new(),
        }
    }

    /// Builds the successor of `prev` containing `transactions`.
    ///
    /// Links by header hash, bumps the height, and commits to the
    /// transactions via the data hash. The result still needs `sign`.
    pub fn from_prev_header(prev: &Header, transactions: Vec<Transaction>) -> Self {
        let header = Header {
            version: PROTOCOL_VERSION,
            data_hash: data_hash(&transactions),
            prev_block_hash: prev.hash(),
            height: prev.height + 1,
            timestamp: now_unix_nanos(),
        };
        Self::new(header, transactions)
    }

    /// Signs the canonical header bytes and records the validator key.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), KeyError> {
        self.signature = Some(key.sign(&self.header.bytes())?);
        self.validator = Bytes::from(key.public_key().to_compressed());
        Ok(())
    }

    /// Verifies signature and data hash, in that order.
    pub fn verify(&self) -> Result<(), BlockError> {
        let signature = self.signature.as_ref().ok_or(BlockError::NoSignature)?;

        let validator = PublicKey::from_compressed(&self.validator)
            .map_err(|_| BlockError::InvalidPublicKey)?;

        if !validator.verify(&self.header.bytes(), signature) {
            return Err(BlockError::InvalidSignature);
        }

        if data_hash(&self.transactions) != self.header.data_hash {
            return Err(BlockError::InvalidDataHash);
        }

        Ok(())
    }

    /// Returns the header hash, memoized on first call.
    pub fn hash(&self) -> Hash {
        self.cached_hash.get_or_compute(|| self.header.hash())
    }
}

/// SHA-256 over the concatenated canonical encodings of `transactions`.
///
/// A content hash, not a Merkle root: the transaction sequence is ordered,
/// so hashing the concatenation commits to both content and order.
pub fn data_hash(transactions: &[Transaction]) -> Hash {
    let mut builder = Hash::builder();
    for tx in transactions {
        tx.encode(&mut builder);
    }
    builder.finalize()
}

/// Current time in Unix nanoseconds.
pub(crate) fn now_unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::Decode;
    use crate::utils::test_utils::utils::{random_hash, signed_tx};

    fn test_header(height: u32) -> Header {
        Header {
            version: PROTOCOL_VERSION,
            data_hash: random_hash(),
            prev_block_hash: random_hash(),
            height,
            timestamp: now_unix_nanos(),
        }
    }

    fn signed_block(header: Header, transactions: Vec<Transaction>) -> Block {
        let mut block = Block::new(header, transactions);
        block.sign(&PrivateKey::generate()).unwrap();
        block
    }

    #[test]
    fn header_hash_covers_every_field() {
        let header = test_header(3);

        let mut changed = header.clone();
        changed.height += 1;
        assert_ne!(header.hash(), changed.hash());

        let mut changed = header.clone();
        changed.timestamp += 1;
        assert_ne!(header.hash(), changed.hash());
    }

    #[test]
    fn header_codec_roundtrip() {
        let header = test_header(7);
        let decoded = Header::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn sign_then_verify() {
        let txs = vec![signed_tx(b"foo")];
        let header = Header {
            data_hash: data_hash(&txs),
            ..test_header(1)
        };
        let block = signed_block(header, txs);
        assert!(block.verify().is_ok());
    }

    #[test]
    fn unsigned_block_fails_with_no_signature() {
        let block = Block::new(test_header(1), vec![]);
        assert_eq!(block.verify(), Err(BlockError::NoSignature));
    }

    #[test]
    fn foreign_validator_key_fails_verification() {
        let header = Header {
            data_hash: data_hash(&[]),
            ..test_header(1)
        };
        let mut block = signed_block(header, vec![]);
        block.validator = Bytes::from(PrivateKey::generate().public_key().to_compressed());
        assert_eq!(block.verify(), Err(BlockError::InvalidSignature));
    }

    #[test]
    fn garbage_validator_key_fails_decoding() {
        let header = Header {
            data_hash: data_hash(&[]),
            ..test_header(1)
        };
        let mut block = signed_block(header, vec![]);
        block.validator = Bytes::from(&[1u8, 2, 3]);
        assert_eq!(block.verify(), Err(BlockError::InvalidPublicKey));
    }

    #[test]
    fn tampered_data_hash_is_rejected() {
        let txs = vec![signed_tx(b"foo")];
        let mut block = Block::new(
            Header {
                data_hash: data_hash(&txs),
                ..test_header(1)
            },
            txs,
        );
        let key = PrivateKey::generate();

        // Corrupt the hash, then sign: the signature is fine but the
        // transaction commitment is not.
        block.header.data_hash = random_hash();
        block.sign(&key).unwrap();

        assert_eq!(block.verify(), Err(BlockError::InvalidDataHash));
    }

    #[test]
    fn swapped_transactions_break_the_data_hash() {
        let txs = vec![signed_tx(b"first"), signed_tx(b"second")];
        let mut block = signed_block(
            Header {
                data_hash: data_hash(&txs),
                ..test_header(1)
            },
            txs,
        );

        block.transactions.swap(0, 1);
        assert_eq!(block.verify(), Err(BlockError::InvalidDataHash));
    }

    #[test]
    fn from_prev_header_links_the_chain() {
        let prev = test_header(4);
        let txs = vec![signed_tx(b"foo")];
        let block = Block::from_prev_header(&prev, txs.clone());

        assert_eq!(block.header.version, PROTOCOL_VERSION);
        assert_eq!(block.header.height, 5);
        assert_eq!(block.header.prev_block_hash, prev.hash());
        assert_eq!(block.header.data_hash, data_hash(&txs));
    }

    #[test]
    fn data_hash_matches_concatenated_encodings() {
        let txs = vec![signed_tx(b"a"), signed_tx(b"b")];

        let mut concat = Vec::new();
        for tx in &txs {
            tx.encode(&mut concat);
        }

        assert_eq!(data_hash(&txs), Hash::sha256(&concat));
    }

    #[test]
    fn empty_data_hash_is_hash_of_nothing() {
        assert_eq!(data_hash(&[]), Hash::sha256(b""));
    }

    #[test]
    fn block_hash_is_header_hash_memoized() {
        let block = signed_block(test_header(9), vec![]);
        assert_eq!(block.hash(), block.header.hash());
        assert_eq!(block.hash(), block.hash());
    }

    #[test]
    fn codec_roundtrip_preserves_fields() {
        let txs = vec![signed_tx(b"roundtrip")];
        let block = signed_block(
            Header {
                data_hash: data_hash(&txs),
                ..test_header(2)
            },
            txs,
        );
        block.hash(); // warm the cache; it must not affect the encoding

        let decoded = Block::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(block, decoded);
        assert_eq!(decoded.hash(), block.hash());
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn encoding_is_deterministic() {
        let block = signed_block(test_header(1), vec![]);
        assert_eq!(block.to_bytes(), block.to_bytes());
    }

    #[test]
    fn decode_fails_on_truncated_input() {
        let encoded = signed_block(test_header(1), vec![signed_tx(b"x")]).to_bytes();
        for cut in [0, 4, encoded.len() / 2, encoded.len() - 1] {
            assert!(Block::from_bytes(&encoded[..cut]).is_err());
        }
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut encoded = signed_block(test_header(1), vec![]).to_bytes().to_vec();
        encoded.extend_from_slice(&[0xDE, 0xAD]);
        assert!(Block::from_bytes(&encoded).is_err());
    }
}
