//! Reference-counted byte buffer with copy-on-write semantics.

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use std::ops::Deref;
use std::sync::Arc;

/// A reference-counted, effectively immutable byte buffer.
///
/// Wraps `Arc<Vec<u8>>` so transaction payloads and wire frames clone for
/// the price of a refcount bump. Mutation goes through `make_mut`, which
/// copies only when the buffer is shared.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Bytes(Arc<Vec<u8>>);

impl Bytes {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(data.into()))
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self(Arc::new(Vec::with_capacity(cap)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Mutable access; clones the backing storage if it is shared.
    pub fn make_mut(&mut self) -> &mut Vec<u8> {
        Arc::make_mut(&mut self.0)
    }

    pub fn extend_from_slice(&mut self, s: &[u8]) {
        self.make_mut().extend_from_slice(s);
    }
}

impl Clone for Bytes {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Deref for Bytes {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl Encode for Bytes {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        out.write(self.as_slice());
    }
}

impl Decode for Bytes {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let vec = Vec::<u8>::decode(input)?;
        Ok(Bytes::new(vec))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(s: &[u8]) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Bytes {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Bytes {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(arr: [u8; N]) -> Self {
        Self::new(arr)
    }
}

impl<const N: usize> From<&[u8; N]> for Bytes {
    fn from(arr: &[u8; N]) -> Self {
        Self::new(arr.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_storage() {
        let a = Bytes::from("shared");
        let b = a.clone();
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn make_mut_copies_when_shared() {
        let mut a = Bytes::from("data");
        let b = a.clone();
        a.extend_from_slice(b"!");

        assert_eq!(a.as_slice(), b"data!");
        assert_eq!(b.as_slice(), b"data");
    }

    #[test]
    fn codec_roundtrip() {
        let original = Bytes::from(&[0xDEu8, 0xAD, 0xBE, 0xEF]);
        let decoded = Bytes::from_bytes(&original.to_bytes()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn encoding_matches_vec_layout() {
        let buf = Bytes::from(&[1u8, 2, 3]);
        let vec: Vec<u8> = vec![1, 2, 3];
        assert_eq!(buf.to_bytes(), vec.to_bytes());
    }
}
