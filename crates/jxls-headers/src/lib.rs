//! Header and layout emission for the lossless encoder
//!
//! Image header, frame header, TOC encoding, and the group-grid arithmetic
//! that decides how a frame is split into sections.

pub mod frame;
pub mod image;
pub mod layout;

pub use frame::{write_frame_header, write_toc};
pub use image::write_image_header;
pub use layout::{compute_ac_group_data_offset, group_counts, toc_bucket, AcGroupOffset};
