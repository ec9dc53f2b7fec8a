//! DC-global section
//!
//! The first section of the frame declares the entropy-coding setup shared
//! by every group: hybrid-uint configurations, the LZ77 mode, a fixed tree
//! with one leaf per channel (all on the gradient predictor), and the four
//! per-channel prefix-code histograms. Depending on the mode it then
//! records either the YCoCg transform or the palette, and in one-group
//! framing it goes on to hold the image's own modular data.

use jxls_bitstream::{BitWriter, PrefixCode};
use jxls_color::Palette;
use jxls_core::consts::{LZ77_MIN_LENGTH, LZ77_OFFSET, MAX_CHANNELS};

use crate::chunk::{ChannelRowProcessor, ChunkEncoder};

fn prepare_dc_global_common(
    is_single_group: bool,
    width: usize,
    height: usize,
    max_encoded_bits_per_sample: usize,
    codes: &[PrefixCode; MAX_CHANNELS],
    output: &mut BitWriter,
) {
    output.allocate(
        100_000
            + if is_single_group {
                width * height * max_encoded_bits_per_sample
            } else {
                0
            },
    );
    // No patches, splines or noise.
    output.write(1, 1); // default DC dequantization factors
    output.write(1, 1); // use global tree / histograms
    output.write(1, 0); // no lz77 for the tree

    output.write(1, 1); // simple code for the tree's context map
    output.write(2, 0); // all contexts clustered together
    output.write(1, 1); // use prefix code for tree
    output.write(4, 0); // 000 hybrid uint
    output.write(6, 0b100011); // alphabet size is 4 (var16)
    output.write(2, 1); // simple prefix code
    output.write(2, 3); // with 4 symbols
    output.write(2, 0);
    output.write(2, 1);
    output.write(2, 2);
    output.write(2, 3);
    output.write(1, 0); // first tree encoding option

    // Huffman table + extra bits for the tree: a leaf per channel, with the
    // gradient predictor at every leaf.
    let symbol_bits: [u64; 6] = [0b00, 0b10, 0b001, 0b101, 0b0011, 0b0111];
    let symbol_nbits: [usize; 6] = [2, 2, 3, 3, 4, 4];
    for v in [
        1usize, 2, 1, 4, 1, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0,
    ] {
        output.write(symbol_nbits[v], symbol_bits[v]);
    }

    output.write(1, 1); // enable lz77 for the main bitstream
    output.write(2, 0b00); // lz77 offset 224
    const _: () = assert!(LZ77_OFFSET == 224);
    output.write(4, 0b1010); // lz77 min length 7
    const _: () = assert!(LZ77_MIN_LENGTH == 7);
    // 400 hybrid uint config for lz77
    output.write(4, 4);
    output.write(3, 0);
    output.write(3, 0);

    output.write(1, 1); // simple code for the context map
    output.write(2, 3); // 3 bits per entry
    output.write(3, 4); // channel 3
    output.write(3, 3); // channel 2
    output.write(3, 2); // channel 1
    output.write(3, 1); // channel 0
    output.write(3, 0); // distance histogram first

    output.write(1, 1); // use prefix codes
    output.write(4, 0); // 000 hybrid uint config for distances (only need 0)
    for _ in 0..MAX_CHANNELS {
        output.write(4, 0); // 000 hybrid uint config for symbols (only <= 10)
    }

    // Distance alphabet size:
    output.write(5, 0b00001); // 2: just need 1 for RLE (i.e. distance 1)
    // Symbol + LZ77 alphabet size: 1 + 2^8 + 0 = 257, covering 19 raw
    // symbols, 205 zero lengths and 33 LZ77 lengths.
    for _ in 0..MAX_CHANNELS {
        output.write(1, 1); // > 1
        output.write(4, 8);
        output.write(8, 0);
    }

    // Distance histogram:
    output.write(2, 1); // simple prefix code
    output.write(2, 0); // with one symbol
    output.write(1, 1); // 1

    // Symbol + lz77 histograms:
    for code in codes.iter() {
        code.write_to(output);
    }

    // Group header for the global modular image.
    output.write(1, 1); // global tree
    output.write(1, 1); // all default wp
}

/// DC-global section in the collided (non-palette) mode: for 3 or more
/// channels it declares the YCoCg RCT.
pub(crate) fn prepare_dc_global(
    is_single_group: bool,
    width: usize,
    height: usize,
    nb_chans: usize,
    max_encoded_bits_per_sample: usize,
    codes: &[PrefixCode; MAX_CHANNELS],
    output: &mut BitWriter,
) {
    prepare_dc_global_common(
        is_single_group,
        width,
        height,
        max_encoded_bits_per_sample,
        codes,
        output,
    );
    if nb_chans > 2 {
        output.write(2, 0b01); // 1 transform
        output.write(2, 0b00); // RCT
        output.write(5, 0b00000); // starting from ch 0
        output.write(2, 0b00); // YCoCg
    } else {
        output.write(2, 0b00); // no transforms
    }
    if !is_single_group {
        output.zero_pad_to_byte();
    }
}

/// DC-global section in palette mode: declares the palette transform and
/// entropy-codes the palette pixels themselves, one row per channel slot
/// with the chained left/top context the decoder expects.
pub(crate) fn prepare_dc_global_palette(
    is_single_group: bool,
    width: usize,
    height: usize,
    nb_chans: usize,
    max_encoded_bits_per_sample: usize,
    codes: &[PrefixCode; MAX_CHANNELS],
    palette: &Palette,
    output: &mut BitWriter,
) {
    prepare_dc_global_common(
        is_single_group,
        width,
        height,
        max_encoded_bits_per_sample,
        codes,
        output,
    );
    output.write(2, 0b01); // 1 transform
    output.write(2, 0b01); // palette
    output.write(5, 0b00000); // starting from ch 0
    if nb_chans == 1 {
        output.write(2, 0b00); // 1-channel palette (Gray)
    } else if nb_chans == 3 {
        output.write(2, 0b01); // 3-channel palette (RGB)
    } else if nb_chans == 4 {
        output.write(2, 0b10); // 4-channel palette (RGBA)
    } else {
        output.write(2, 0b11);
        output.write(13, (nb_chans - 1) as u64);
    }
    let pcolors = palette.num_colors;
    if pcolors < 256 {
        output.write(2, 0b00);
        output.write(8, pcolors as u64);
    } else {
        output.write(2, 0b01);
        output.write(10, (pcolors - 256) as u64);
    }

    output.write(2, 0b00); // nb_deltas == 0
    output.write(4, 0); // zero predictor for delta palette

    // The palette pixels, one row per channel slot. Row 0 starts from a
    // zero left context; each later row chains off the previous one as its
    // top row.
    let mut p: [Vec<i16>; 4] = std::array::from_fn(|_| vec![0i16; 32 + 1024]);
    for (i, &color) in palette.entries.iter().enumerate() {
        let bytes = color.to_le_bytes();
        // Slot 16 is the reserved all-zero color; entries follow it.
        p[0][16 + i + 1] = bytes[0] as i16;
        p[1][16 + i + 1] = bytes[1] as i16;
        p[2][16 + i + 1] = bytes[2] as i16;
        p[3][16 + i + 1] = bytes[3] as i16;
    }
    let [p0, p1, p2, p3] = &mut p;

    {
        let mut row_encoder = ChannelRowProcessor::new(ChunkEncoder {
            code: &codes[0],
            output: &mut *output,
        });
        p0[15] = 0;
        row_encoder.process_row(&p0[16..], &p0[15..], &p0[15..], &p0[15..], pcolors);
        p1[15] = p0[16];
        p0[15] = p0[16];
        if nb_chans > 1 {
            row_encoder.process_row(&p1[16..], &p1[15..], &p0[16..], &p0[15..], pcolors);
        }
        p2[15] = p1[16];
        p1[15] = p1[16];
        if nb_chans > 2 {
            row_encoder.process_row(&p2[16..], &p2[15..], &p1[16..], &p1[15..], pcolors);
        }
        p3[15] = p2[16];
        p2[15] = p2[16];
        if nb_chans > 3 {
            row_encoder.process_row(&p3[16..], &p3[15..], &p2[16..], &p2[15..], pcolors);
        }
        row_encoder.finalize();
    }

    if !is_single_group {
        output.zero_pad_to_byte();
    }
}
