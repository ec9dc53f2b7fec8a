//! Core types and constants for the lossless JPEG XL encoder
//!
//! This crate provides the error type, the shared configuration surface, and
//! the numeric constants of the modular bitstream subset the encoder emits.

pub mod consts;
pub mod error;
pub mod types;

pub use error::{JxlsError, JxlsResult};
pub use types::*;
