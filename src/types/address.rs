//! 20-byte account addresses derived from public keys.

use solochain_derive::BinaryCodec;
use std::fmt;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Fixed-size 20-byte address identifying a key holder.
///
/// Derived as the last 20 bytes of SHA-256 over the compressed public key.
/// `Copy` for cheap passing during validation and lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Builds an address from a slice; `None` unless it is exactly 20 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Address> {
        if slice.len() != ADDRESS_LEN {
            return None;
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(slice);
        Some(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_checks_length() {
        assert!(Address::from_slice(&[1u8; 19]).is_none());
        assert!(Address::from_slice(&[1u8; 21]).is_none());
        assert_eq!(
            Address::from_slice(&[1u8; 20]),
            Some(Address([1u8; 20]))
        );
    }

    #[test]
    fn display_is_hex() {
        let addr = Address([0xAB; 20]);
        assert_eq!(addr.to_string(), "ab".repeat(20));
    }
}
