//! Cryptographic primitives: P-256 ECDSA key pairs, signatures, addresses.

pub mod key_pair;
