//! # jxls - lossless JPEG XL encoding
//!
//! A from-scratch lossless JPEG XL encoder for the modular subset: gradient
//! prediction, LZ77-augmented prefix coding, optional palette or YCoCg
//! transforms, and independent 256x256 group encoding.
//!
//! ## Quick start
//!
//! ```no_run
//! use jxls::{encode, EncoderOptions};
//!
//! let pixels = vec![0u8; 640 * 480 * 4];
//! let options = EncoderOptions::new(640, 480, 4).effort(2);
//! let encoded = encode(&pixels, 640 * 4, &options, None).unwrap();
//! std::fs::write("out.jxl", encoded).unwrap();
//! ```
//!
//! For streaming output or a custom input source, drive [`FrameState`]
//! directly: `prepare`, `process`, `prepare_header`, then `write_output`
//! until it returns 0.

pub use jxls_core::{ColorSpace, Endianness, EncoderOptions, JxlsError, JxlsResult};
pub use jxls_encoder::{
    BufferInput, ChunkedFrameInput, FrameState, InputRegion, ParallelRunner, RayonRunner,
    SequentialRunner,
};

/// Encodes an in-memory interleaved pixel buffer into a complete
/// single-frame codestream. `row_stride` is in bytes. Passing no runner
/// encodes groups sequentially.
pub fn encode(
    pixels: &[u8],
    row_stride: usize,
    options: &EncoderOptions,
    runner: Option<&dyn ParallelRunner>,
) -> JxlsResult<Vec<u8>> {
    if options.width == 0 || options.height == 0 {
        return Err(JxlsError::InvalidDimensions {
            width: options.width,
            height: options.height,
        });
    }
    let bytes_per_pixel = if options.bit_depth <= 8 {
        options.channels
    } else {
        2 * options.channels
    };
    let expected = (options.height - 1) * row_stride + options.width * bytes_per_pixel;
    if pixels.len() < expected {
        return Err(JxlsError::BufferTooSmall {
            expected,
            actual: pixels.len(),
        });
    }

    let input = BufferInput::new(pixels, row_stride, options.channels, options.bit_depth);
    let mut frame = FrameState::prepare(&input, options)?;
    frame.process(true, runner)?;
    frame.prepare_header(true, true);

    let mut output = vec![0u8; frame.max_required_output()];
    let mut total = 0;
    loop {
        let written = frame.write_output(&mut output[total..])?;
        if written == 0 {
            break;
        }
        total += written;
    }
    output.truncate(total);
    Ok(output)
}
