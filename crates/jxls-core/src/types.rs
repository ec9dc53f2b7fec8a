//! Core types for the lossless encoder

use std::ops::{BitXor, Shr};

use num_traits::{WrappingAdd, WrappingSub};

/// Byte order of 16-bit input samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endianness {
    /// Little-endian samples (the common case for in-memory buffers)
    #[default]
    Little,
    /// Big-endian samples
    Big,
}

/// Color space signalled in the image header.
///
/// Only the encodings this encoder can declare without an ICC profile are
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    /// Non-linear sRGB (signalled as all-default)
    #[default]
    Srgb,
    /// Grayscale with the sRGB transfer function
    GraySrgb,
    /// HDR10: Rec.2100 primaries with the PQ transfer function
    Hdr10Pq,
    /// Extended-range linear sRGB, half-float samples
    LinearSrgb,
}

impl ColorSpace {
    /// Whether samples are signalled as 16-bit floats rather than integers
    pub fn is_float(&self) -> bool {
        matches!(self, ColorSpace::LinearSrgb)
    }
}

/// Encoder configuration, builder style.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncoderOptions {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
    /// Number of interleaved channels (1-4)
    pub channels: usize,
    /// Bits per sample (1-16)
    pub bit_depth: usize,
    /// Byte order of 16-bit input samples
    pub endianness: Endianness,
    /// Effort knob: higher samples more rows when building histograms and
    /// enables palette detection at >= 2. Does not change the stream format.
    pub effort: u32,
    /// Signalled color space
    pub color_space: ColorSpace,
    /// Whether the whole image is available for random access during
    /// `prepare`. Required for palette detection.
    pub oneshot: bool,
}

impl EncoderOptions {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            bit_depth: 8,
            endianness: Endianness::Little,
            effort: 2,
            color_space: ColorSpace::Srgb,
            oneshot: true,
        }
    }

    pub fn bit_depth(mut self, bit_depth: usize) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn effort(mut self, effort: u32) -> Self {
        self.effort = effort;
        self
    }

    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn oneshot(mut self, oneshot: bool) -> Self {
        self.oneshot = oneshot;
        self
    }

    /// Whether this channel layout carries an alpha channel
    pub fn has_alpha(&self) -> bool {
        self.channels == 2 || self.channels == 4
    }
}

/// Signed sample type the modular pipeline computes in.
///
/// The prediction and color transforms work in the pixel's own width with
/// wrapping arithmetic; residuals are widened to `i32` only at the point
/// where they are packed.
pub trait Sample:
    Copy
    + Default
    + Eq
    + Ord
    + std::fmt::Debug
    + WrappingAdd
    + WrappingSub
    + BitXor<Output = Self>
    + Shr<u32, Output = Self>
    + Send
    + Sync
{
    const ZERO: Self;

    /// Truncating conversion from a raw 16-bit sample
    fn from_u16(value: u16) -> Self;

    /// Widening conversion for residual computation
    fn to_i32(self) -> i32;

    fn is_negative(self) -> bool {
        self < Self::ZERO
    }
}

impl Sample for i16 {
    const ZERO: Self = 0;

    fn from_u16(value: u16) -> Self {
        value as i16
    }

    fn to_i32(self) -> i32 {
        self as i32
    }
}

impl Sample for i32 {
    const ZERO: Self = 0;

    fn from_u16(value: u16) -> Self {
        value as i32
    }

    fn to_i32(self) -> i32 {
        self
    }
}
