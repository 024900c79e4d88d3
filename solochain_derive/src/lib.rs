//! Derive macros for the solochain crate.
//!
//! Provides `#[derive(BinaryCodec)]`, which implements the crate's `Encode`
//! and `Decode` traits for deterministic binary serialization.

mod binary_codec;

use proc_macro::TokenStream;

/// Implements `Encode` and `Decode` for a struct or enum.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}
