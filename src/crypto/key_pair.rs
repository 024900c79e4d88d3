//! ECDSA key pairs on the NIST P-256 curve.
//!
//! Public keys travel as 33-byte SEC1 compressed points; signatures carry the
//! (r, s) pair as 64 bytes. Addresses are the last 20 bytes of SHA-256 over
//! the compressed public key.

use crate::types::address::{Address, ADDRESS_LEN};
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a SEC1 compressed P-256 public key.
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Length of a serialized signature (r || s).
pub const SIGNATURE_LEN: usize = 64;

/// Errors from key material handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Bytes are not a valid 33-byte compressed point on the curve.
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    /// The underlying signer failed, e.g. the entropy source.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Private signing key.
///
/// Generated from OS entropy. Never serialized or sent over the network.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    /// Generates a new random private key from OS entropy.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    /// Derives the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let key = self.key.verifying_key().clone();
        let address = derive_address(&compress(&key));
        PublicKey { key, address }
    }

    /// Signs arbitrary data, producing an ECDSA signature.
    pub fn sign(&self, data: &[u8]) -> Result<Signature, KeyError> {
        self.key
            .try_sign(data)
            .map(Signature)
            .map_err(|e| KeyError::SigningFailed(e.to_string()))
    }
}

/// Public key with its derived address.
#[derive(Clone, Debug)]
pub struct PublicKey {
    key: VerifyingKey,
    address: Address,
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_compressed() == other.to_compressed()
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    /// Reconstructs a public key from 33 compressed SEC1 bytes.
    ///
    /// Fails with [`KeyError::InvalidPublicKey`] when the length is wrong or
    /// the bytes are not a point on the curve.
    pub fn from_compressed(bytes: &[u8]) -> Result<PublicKey, KeyError> {
        if bytes.len() != COMPRESSED_KEY_LEN {
            return Err(KeyError::InvalidPublicKey);
        }
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(PublicKey {
            key,
            address: derive_address(bytes),
        })
    }

    /// Serializes to the 33-byte SEC1 compressed form.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_KEY_LEN] {
        compress(&self.key)
    }

    /// Verifies an ECDSA signature over `data`.
    pub fn verify(&self, data: &[u8], signature: &Signature) -> bool {
        self.key.verify(data, &signature.0).is_ok()
    }

    /// The 20-byte address derived from this key.
    pub fn address(&self) -> Address {
        self.address
    }
}

/// ECDSA signature over P-256, serialized as the 64-byte (r, s) pair.
#[derive(Clone, Debug)]
pub struct Signature(pub(crate) EcdsaSignature);

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(self.0.to_bytes().as_slice());
        out
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Signature {}

impl Encode for Signature {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.to_bytes());
    }
}

impl Decode for Signature {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = <[u8; SIGNATURE_LEN]>::decode(input)?;
        let signature =
            EcdsaSignature::from_slice(&bytes).map_err(|_| DecodeError::InvalidValue)?;
        Ok(Signature(signature))
    }
}

fn compress(key: &VerifyingKey) -> [u8; COMPRESSED_KEY_LEN] {
    let point = key.to_encoded_point(true);
    let mut out = [0u8; COMPRESSED_KEY_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

/// Address derivation: SHA-256(compressed_key)[12..32].
fn derive_address(compressed: &[u8]) -> Address {
    let digest: [u8; 32] = Sha256::digest(compressed).into();
    let mut addr = [0u8; ADDRESS_LEN];
    addr.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
    Address(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};

    #[test]
    fn sign_verify_roundtrip() {
        let private = PrivateKey::generate();
        let public = private.public_key();

        let data = b"Hello World";
        let signature = private.sign(data).unwrap();
        assert!(public.verify(data, &signature));
    }

    #[test]
    fn verify_fails_with_other_signer() {
        let public = PrivateKey::generate().public_key();
        let other = PrivateKey::generate();

        let data = b"Hello World";
        let signature = other.sign(data).unwrap();
        assert!(!public.verify(data, &signature));
    }

    #[test]
    fn verify_fails_with_tampered_data() {
        let private = PrivateKey::generate();
        let public = private.public_key();

        let signature = private.sign(b"Hello World").unwrap();
        assert!(!public.verify(b"Hello World!", &signature));
    }

    #[test]
    fn verify_empty_data() {
        let private = PrivateKey::generate();
        let signature = private.sign(b"").unwrap();
        assert!(private.public_key().verify(b"", &signature));
    }

    #[test]
    fn compressed_roundtrip() {
        let public = PrivateKey::generate().public_key();
        let compressed = public.to_compressed();

        let restored = PublicKey::from_compressed(&compressed).unwrap();
        assert_eq!(public, restored);
        assert_eq!(public.address(), restored.address());
    }

    #[test]
    fn compressed_key_has_sec1_prefix() {
        let compressed = PrivateKey::generate().public_key().to_compressed();
        assert!(compressed[0] == 0x02 || compressed[0] == 0x03);
    }

    #[test]
    fn from_compressed_rejects_wrong_length() {
        assert_eq!(
            PublicKey::from_compressed(&[0u8; 32]),
            Err(KeyError::InvalidPublicKey)
        );
        assert_eq!(
            PublicKey::from_compressed(&[0u8; 34]),
            Err(KeyError::InvalidPublicKey)
        );
    }

    #[test]
    fn from_compressed_rejects_off_curve_bytes() {
        let result = PublicKey::from_compressed(&[0xFFu8; COMPRESSED_KEY_LEN]);
        assert_eq!(result, Err(KeyError::InvalidPublicKey));
    }

    #[test]
    fn addresses_differ_between_keys() {
        let a = PrivateKey::generate().public_key();
        let b = PrivateKey::generate().public_key();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn address_is_stable_for_a_key() {
        let private = PrivateKey::generate();
        assert_eq!(
            private.public_key().address(),
            private.public_key().address()
        );
    }

    #[test]
    fn signature_codec_roundtrip() {
        let signature = PrivateKey::generate().sign(b"payload").unwrap();

        let mut encoded = Vec::new();
        signature.encode(&mut encoded);
        assert_eq!(encoded.len(), SIGNATURE_LEN);

        let decoded = Signature::from_bytes(&encoded).unwrap();
        assert_eq!(signature, decoded);
    }

    #[test]
    fn signature_decode_rejects_short_input() {
        assert!(Signature::from_bytes(&[0u8; 10]).is_err());
    }
}
