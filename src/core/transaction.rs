//! Transactions: an arbitrary payload signed by its sender.

use crate::crypto::key_pair::{KeyError, PrivateKey, PublicKey, Signature};
use crate::types::bytes::Bytes;
use crate::types::hash::{Hash, HashCache};
use solochain_derive::BinaryCodec;
use thiserror::Error;

/// Errors from transaction verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxError {
    /// The transaction was never signed.
    #[error("transaction has no signature")]
    NoSignature,
    /// The `from` bytes do not decode to a public key.
    #[error("transaction sender key is invalid")]
    InvalidPublicKey,
    /// The signature does not verify against the sender key and data.
    #[error("invalid transaction signature")]
    InvalidSignature,
}

/// A transaction carrying an arbitrary byte payload.
///
/// The payload doubles as VM bytecode: every node executes it when the
/// containing block is accepted. `data` uses [`Bytes`] so gossip and block
/// packing share one buffer.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Transaction {
    /// Arbitrary payload; covered by the signature and the hash.
    pub data: Bytes,
    /// Compressed public key of the signer; empty until signed.
    pub from: Bytes,
    /// ECDSA signature over `data`.
    pub signature: Option<Signature>,

    /// When this node first saw the transaction, in Unix nanoseconds.
    /// Local bookkeeping only: not covered by hash or signature.
    first_seen: i64,

    /// Lazily computed transaction hash; not part of value identity.
    cached_hash: HashCache,
}

impl Transaction {
    /// Creates a new unsigned transaction.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            from: Bytes::default(),
            signature: None,
            first_seen: 0,
            cached_hash: HashCache::new(),
        }
    }

    /// Signs the payload and records the signer's compressed public key.
    ///
    /// Leaves `first_seen` and the cached hash untouched.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), KeyError> {
        self.signature = Some(key.sign(&self.data)?);
        self.from = Bytes::from(key.public_key().to_compressed());
        Ok(())
    }

    /// Verifies the signature against the recorded sender key.
    pub fn verify(&self) -> Result<(), TxError> {
        let signature = self.signature.as_ref().ok_or(TxError::NoSignature)?;

        let public_key =
            PublicKey::from_compressed(&self.from).map_err(|_| TxError::InvalidPublicKey)?;

        if !public_key.verify(&self.data, signature) {
            return Err(TxError::InvalidSignature);
        }

        Ok(())
    }

    /// Returns the transaction hash: SHA-256 over `data`, memoized.
    pub fn hash(&self) -> Hash {
        self.cached_hash.get_or_compute(|| Hash::sha256(&self.data))
    }

    /// When this node first saw the transaction (0 = never stamped).
    pub fn first_seen(&self) -> i64 {
        self.first_seen
    }

    pub fn set_first_seen(&mut self, timestamp: i64) {
        self.first_seen = timestamp;
    }
}
