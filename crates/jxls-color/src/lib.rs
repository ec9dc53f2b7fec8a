//! Color transforms for the lossless encoder
//!
//! The reversible YCoCg transform applied to images with three or more
//! channels, and the palette detector used for small-color 8-bit images.

pub mod palette;
pub mod ycocg;

pub use palette::{pixel_hash, Palette, PaletteDetector};
pub use ycocg::forward_ycocg;
