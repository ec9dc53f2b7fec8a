//! Bitstream primitives for the lossless encoder
//!
//! This crate provides the LSB-first bit writer, the hybrid-uint token
//! encodings, and the canonical prefix-code builder the modular entropy
//! coder is built on.

pub mod bitwriter;
pub mod hybrid_uint;
pub mod prefix;

pub use bitwriter::BitWriter;
pub use hybrid_uint::{
    encode_hybrid_uint000, encode_hybrid_uint_lz77, floor_log2, pack_signed, unpack_signed,
};
pub use prefix::PrefixCode;
