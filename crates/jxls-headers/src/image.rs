//! Image header emission
//!
//! The signature, size header, ImageMetadata, and color encoding are
//! hand-packed field by field; the subset this encoder emits never needs
//! an ICC profile or extension blocks.

use jxls_bitstream::BitWriter;
use jxls_core::ColorSpace;

/// Variable-width size field: a 2-bit tag selecting a 9/13/18/30-bit
/// payload holding `size - 1`.
fn write_size(output: &mut BitWriter, size: usize) {
    if size - 1 < (1 << 9) {
        output.write(2, 0b00);
        output.write(9, (size - 1) as u64);
    } else if size - 1 < (1 << 13) {
        output.write(2, 0b01);
        output.write(13, (size - 1) as u64);
    } else if size - 1 < (1 << 18) {
        output.write(2, 0b10);
        output.write(18, (size - 1) as u64);
    } else {
        output.write(2, 0b11);
        output.write(30, (size - 1) as u64);
    }
}

/// Sample bit depth block shared by the color channels and a non-default
/// alpha channel.
fn write_bit_depth(output: &mut BitWriter, bitdepth: usize, color_space: ColorSpace) {
    if color_space.is_float() {
        output.write(1, 1); // bit_depth.floating_point_sample
        output.write(2, 0b01); // bit_depth.bits_per_sample = 16
        output.write(4, 4); // bit_depth.exp_bits = 5
    } else {
        output.write(1, 0); // !bit_depth.floating_point_sample
        if bitdepth == 8 {
            output.write(2, 0b00); // bit_depth.bits_per_sample = 8
        } else if bitdepth == 10 {
            output.write(2, 0b01); // bit_depth.bits_per_sample = 10
        } else if bitdepth == 12 {
            output.write(2, 0b10); // bit_depth.bits_per_sample = 12
        } else {
            output.write(2, 0b11); // 1 + u(6)
            output.write(6, (bitdepth - 1) as u64);
        }
    }
}

/// Writes the codestream signature, size header, ImageMetadata, and color
/// encoding. The frame that follows starts at a byte boundary.
pub fn write_image_header(
    output: &mut BitWriter,
    width: usize,
    height: usize,
    nb_chans: usize,
    bitdepth: usize,
    color_space: ColorSpace,
) {
    let have_alpha = nb_chans == 2 || nb_chans == 4;

    // Signature
    output.write(16, 0x0AFF);

    // Size header; the small-size shortcut is never taken.
    output.write(1, 0);
    write_size(output, height);
    output.write(3, 0); // no special ratio
    write_size(output, width);

    // ImageMetadata
    output.write(1, 0); // all_default
    output.write(1, 0); // extra_fields
    write_bit_depth(output, bitdepth, color_space);
    if bitdepth <= 14 {
        output.write(1, 1); // 16-bit buffer sufficient
    } else {
        output.write(1, 0); // 16-bit buffer NOT sufficient
    }
    if have_alpha {
        output.write(2, 0b01); // one extra channel
        if bitdepth == 8 {
            output.write(1, 1); // all_default, i.e. 8-bit alpha
        } else {
            output.write(1, 0); // not d_alpha
            output.write(2, 0); // type = kAlpha
            write_bit_depth(output, bitdepth, color_space);
            output.write(2, 0); // dim_shift = 0
            output.write(2, 0); // name_len = 0
            output.write(1, 0); // alpha_associated = 0
        }
    } else {
        output.write(2, 0b00); // no extra channel
    }
    output.write(1, 0); // not XYB

    match color_space {
        ColorSpace::Hdr10Pq => {
            output.write(1, 0); // color_encoding.all_default false
            output.write(1, 0); // color_encoding.want_icc false
            output.write(2, 0); // RGB
            output.write(2, 1); // D65
            output.write(2, 0b10); // primaries: 2 + u(4)
            output.write(4, 7); // 2100
            output.write(1, 0); // no gamma transfer function
            output.write(2, 0b10); // tf: 2 + u(4)
            output.write(4, 14); // tf of PQ
            output.write(2, 1); // relative rendering intent
        }
        ColorSpace::LinearSrgb => {
            output.write(1, 0); // color_encoding.all_default false
            output.write(1, 0); // color_encoding.want_icc false
            output.write(2, 0); // RGB
            output.write(2, 1); // D65
            output.write(2, 1); // sRGB primaries
            output.write(1, 0); // no gamma transfer function
            output.write(2, 0b10); // tf: 2 + u(4)
            output.write(4, 6); // tf of linear
            output.write(2, 1); // relative rendering intent
        }
        _ if nb_chans <= 2 => {
            output.write(1, 0); // color_encoding.all_default false
            output.write(1, 0); // color_encoding.want_icc false
            output.write(2, 1); // grayscale
            output.write(2, 1); // D65
            output.write(1, 0); // no gamma transfer function
            output.write(2, 0b10); // tf: 2 + u(4)
            output.write(4, 11); // tf of sRGB
            output.write(2, 1); // relative rendering intent
        }
        _ => {
            // Anything else is signalled as plain sRGB.
            output.write(1, 1); // color_encoding.all_default
        }
    }
    output.write(2, 0b00); // no extensions

    output.write(1, 1); // all_default transform data

    // No ICC, no preview. The frame starts at a byte boundary.
    output.zero_pad_to_byte();
}
