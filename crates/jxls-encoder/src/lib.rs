//! Lossless JPEG XL encoder pipeline
//!
//! The frame lifecycle is `prepare` (sample, build prefix codes, write the
//! DC-global section), `process` (encode every AC group through a caller
//! supplied runner), `prepare_header` (image/frame header and TOC), then
//! repeated `write_output` calls to drain the stream.
//!
//! Pixel acquisition goes through [`ChunkedFrameInput`]; thread dispatch
//! through [`ParallelRunner`]. The encoder itself never spawns threads and
//! never assumes an input memory layout.

pub mod bit_depth;
pub mod chunk;
mod dc_global;
pub mod frame;
pub mod input;
pub mod runner;
mod rows;
mod stream;

pub use frame::FrameState;
pub use input::{BufferInput, ChunkedFrameInput, InputRegion};
pub use runner::{ParallelRunner, RayonRunner, SequentialRunner};
