//! Scanline front-end
//!
//! Fills two rolling padded scanlines per channel from the interleaved
//! input, applying YCoCg on the fly for 3- and 4-channel images, and runs
//! the row processors over them. The `x = -1` padding column replicates the
//! prior row's first sample so the predictor context is uniform.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use jxls_color::forward_ycocg;
use jxls_core::consts::GROUP_DIM;
use jxls_core::{Endianness, Sample};

use crate::bit_depth::BitDepth;
use crate::chunk::{ChannelRowProcessor, ChunkSink};

/// Padding on either side of a scanline; covers the `x = -1` column and the
/// chunk overread past the right edge.
pub(crate) const ROW_PADDING: usize = 32;

const ROW_LEN: usize = ROW_PADDING + GROUP_DIM + ROW_PADDING;

fn fill_row_g8<P: Sample>(row: &[u8], xs: usize, luma: &mut [P]) {
    for x in 0..xs {
        luma[x] = P::from_u16(row[x] as u16);
    }
}

fn fill_row_g16<E: ByteOrder, P: Sample>(row: &[u8], xs: usize, luma: &mut [P]) {
    for x in 0..xs {
        luma[x] = P::from_u16(E::read_u16(&row[2 * x..]));
    }
}

fn fill_row_ga8<P: Sample>(row: &[u8], xs: usize, luma: &mut [P], alpha: &mut [P]) {
    for x in 0..xs {
        luma[x] = P::from_u16(row[2 * x] as u16);
        alpha[x] = P::from_u16(row[2 * x + 1] as u16);
    }
}

fn fill_row_ga16<E: ByteOrder, P: Sample>(row: &[u8], xs: usize, luma: &mut [P], alpha: &mut [P]) {
    for x in 0..xs {
        luma[x] = P::from_u16(E::read_u16(&row[4 * x..]));
        alpha[x] = P::from_u16(E::read_u16(&row[4 * x + 2..]));
    }
}

fn fill_row_rgb8<P: Sample>(row: &[u8], xs: usize, y: &mut [P], co: &mut [P], cg: &mut [P]) {
    for x in 0..xs {
        let r = P::from_u16(row[3 * x] as u16);
        let g = P::from_u16(row[3 * x + 1] as u16);
        let b = P::from_u16(row[3 * x + 2] as u16);
        (y[x], co[x], cg[x]) = forward_ycocg(r, g, b);
    }
}

fn fill_row_rgb16<E: ByteOrder, P: Sample>(
    row: &[u8],
    xs: usize,
    y: &mut [P],
    co: &mut [P],
    cg: &mut [P],
) {
    for x in 0..xs {
        let r = P::from_u16(E::read_u16(&row[6 * x..]));
        let g = P::from_u16(E::read_u16(&row[6 * x + 2..]));
        let b = P::from_u16(E::read_u16(&row[6 * x + 4..]));
        (y[x], co[x], cg[x]) = forward_ycocg(r, g, b);
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_row_rgba8<P: Sample>(
    row: &[u8],
    xs: usize,
    y: &mut [P],
    co: &mut [P],
    cg: &mut [P],
    alpha: &mut [P],
) {
    for x in 0..xs {
        let r = P::from_u16(row[4 * x] as u16);
        let g = P::from_u16(row[4 * x + 1] as u16);
        let b = P::from_u16(row[4 * x + 2] as u16);
        (y[x], co[x], cg[x]) = forward_ycocg(r, g, b);
        alpha[x] = P::from_u16(row[4 * x + 3] as u16);
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_row_rgba16<E: ByteOrder, P: Sample>(
    row: &[u8],
    xs: usize,
    y: &mut [P],
    co: &mut [P],
    cg: &mut [P],
    alpha: &mut [P],
) {
    for x in 0..xs {
        let r = P::from_u16(E::read_u16(&row[8 * x..]));
        let g = P::from_u16(E::read_u16(&row[8 * x + 2..]));
        let b = P::from_u16(E::read_u16(&row[8 * x + 4..]));
        (y[x], co[x], cg[x]) = forward_ycocg(r, g, b);
        alpha[x] = P::from_u16(E::read_u16(&row[8 * x + 6..]));
    }
}

struct ChannelRows<'a, P> {
    cur: &'a mut [P],
    prev: &'a mut [P],
}

fn split_rows<P>(buf: &mut [P], y: usize) -> ChannelRows<'_, P> {
    let (a, b) = buf.split_at_mut(ROW_LEN);
    if y & 1 == 0 {
        ChannelRows { cur: a, prev: b }
    } else {
        ChannelRows { cur: b, prev: a }
    }
}

/// Runs the row processors over the region `(x0, y0, xs, ys)` of `rgba`.
/// Rows with `y < yskip` only feed the rolling context. The caller hands
/// one processor per channel.
#[allow(clippy::too_many_arguments)]
pub(crate) fn process_image_area<B: BitDepth, T: ChunkSink>(
    rgba: &[u8],
    x0: usize,
    y0: usize,
    xs: usize,
    yskip: usize,
    ys: usize,
    row_stride: usize,
    _bitdepth: B,
    nb_chans: usize,
    endianness: Endianness,
    processors: &mut [ChannelRowProcessor<T>],
) {
    debug_assert!(xs <= GROUP_DIM);
    let mut group_data: Vec<Vec<B::Pixel>> = (0..nb_chans)
        .map(|_| vec![B::Pixel::ZERO; 2 * ROW_LEN])
        .collect();

    for y in 0..ys {
        let row_offset = row_stride * (y0 + y) + x0 * nb_chans * B::INPUT_BYTES;
        let rgba_row = &rgba[row_offset..row_offset + xs * nb_chans * B::INPUT_BYTES];
        let mut rows: Vec<ChannelRows<'_, B::Pixel>> = group_data
            .iter_mut()
            .map(|buf| split_rows(buf, y))
            .collect();

        match (rows.as_mut_slice(), B::INPUT_BYTES, endianness) {
            ([c0], 1, _) => fill_row_g8(rgba_row, xs, &mut c0.cur[ROW_PADDING..]),
            ([c0], _, Endianness::Little) => {
                fill_row_g16::<LittleEndian, _>(rgba_row, xs, &mut c0.cur[ROW_PADDING..])
            }
            ([c0], _, Endianness::Big) => {
                fill_row_g16::<BigEndian, _>(rgba_row, xs, &mut c0.cur[ROW_PADDING..])
            }
            ([c0, c1], 1, _) => fill_row_ga8(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
            ),
            ([c0, c1], _, Endianness::Little) => fill_row_ga16::<LittleEndian, _>(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
            ),
            ([c0, c1], _, Endianness::Big) => fill_row_ga16::<BigEndian, _>(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
            ),
            ([c0, c1, c2], 1, _) => fill_row_rgb8(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
                &mut c2.cur[ROW_PADDING..],
            ),
            ([c0, c1, c2], _, Endianness::Little) => fill_row_rgb16::<LittleEndian, _>(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
                &mut c2.cur[ROW_PADDING..],
            ),
            ([c0, c1, c2], _, Endianness::Big) => fill_row_rgb16::<BigEndian, _>(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
                &mut c2.cur[ROW_PADDING..],
            ),
            ([c0, c1, c2, c3], 1, _) => fill_row_rgba8(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
                &mut c2.cur[ROW_PADDING..],
                &mut c3.cur[ROW_PADDING..],
            ),
            ([c0, c1, c2, c3], _, Endianness::Little) => fill_row_rgba16::<LittleEndian, _>(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
                &mut c2.cur[ROW_PADDING..],
                &mut c3.cur[ROW_PADDING..],
            ),
            ([c0, c1, c2, c3], _, Endianness::Big) => fill_row_rgba16::<BigEndian, _>(
                rgba_row,
                xs,
                &mut c0.cur[ROW_PADDING..],
                &mut c1.cur[ROW_PADDING..],
                &mut c2.cur[ROW_PADDING..],
                &mut c3.cur[ROW_PADDING..],
            ),
            _ => unreachable!("channel count is validated at prepare time"),
        }

        // Deal with x == 0, and fix the topleft context to match.
        for ch in rows.iter_mut() {
            let first_prev = if y > 0 { ch.prev[ROW_PADDING] } else { B::Pixel::ZERO };
            ch.cur[ROW_PADDING - 1] = first_prev;
            ch.prev[ROW_PADDING - 1] = first_prev;
        }

        if y < yskip {
            continue;
        }
        for (ch, processor) in rows.iter().zip(processors.iter_mut()) {
            let row = &ch.cur[ROW_PADDING..];
            let row_left = &ch.cur[ROW_PADDING - 1..];
            let (row_top, row_topleft) = if y == 0 {
                (&ch.cur[ROW_PADDING - 1..], &ch.cur[ROW_PADDING - 1..])
            } else {
                (&ch.prev[ROW_PADDING..], &ch.prev[ROW_PADDING - 1..])
            };
            processor.process_row(row, row_left, row_top, row_topleft, xs);
        }
    }
    for processor in processors.iter_mut() {
        processor.finalize();
    }
}

fn fill_row_palette<const N: usize>(inrow: &[u8], xs: usize, lookup: &[i16], out: &mut [i16]) {
    for x in 0..xs {
        let mut p = 0u32;
        for i in 0..N {
            p |= (inrow[x * N + i] as u32) << (8 * i);
        }
        out[x] = lookup[jxls_color::pixel_hash(p) as usize];
    }
}

/// Palette variant of [`process_image_area`]: a single index plane fed to
/// one processor.
#[allow(clippy::too_many_arguments)]
pub(crate) fn process_image_area_palette<T: ChunkSink>(
    rgba: &[u8],
    x0: usize,
    y0: usize,
    xs: usize,
    yskip: usize,
    ys: usize,
    row_stride: usize,
    lookup: &[i16],
    nb_chans: usize,
    row_encoder: &mut ChannelRowProcessor<T>,
) {
    debug_assert!(xs <= GROUP_DIM);
    let mut group_data = vec![0i16; 2 * ROW_LEN];

    for y in 0..ys {
        let row_offset = row_stride * (y0 + y) + x0 * nb_chans;
        let inrow = &rgba[row_offset..row_offset + xs * nb_chans];
        let mut rows = split_rows(&mut group_data, y);
        let outrow = &mut rows.cur[ROW_PADDING..];
        match nb_chans {
            1 => fill_row_palette::<1>(inrow, xs, lookup, outrow),
            2 => fill_row_palette::<2>(inrow, xs, lookup, outrow),
            3 => fill_row_palette::<3>(inrow, xs, lookup, outrow),
            _ => fill_row_palette::<4>(inrow, xs, lookup, outrow),
        }

        let first_prev = if y > 0 { rows.prev[ROW_PADDING] } else { 0 };
        rows.cur[ROW_PADDING - 1] = first_prev;
        rows.prev[ROW_PADDING - 1] = first_prev;

        if y < yskip {
            continue;
        }
        let row = &rows.cur[ROW_PADDING..];
        let row_left = &rows.cur[ROW_PADDING - 1..];
        let (row_top, row_topleft) = if y == 0 {
            (&rows.cur[ROW_PADDING - 1..], &rows.cur[ROW_PADDING - 1..])
        } else {
            (&rows.prev[ROW_PADDING..], &rows.prev[ROW_PADDING - 1..])
        };
        row_encoder.process_row(row, row_left, row_top, row_topleft, xs);
    }
    row_encoder.finalize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use jxls_core::consts::{CHUNK_SIZE, NUM_LZ77_SYMBOLS, NUM_RAW_SYMBOLS};

    use crate::bit_depth::{MoreThan14Bits, UpTo8Bits};
    use crate::chunk::ChunkSampleCollector;

    struct Capture {
        residuals: Vec<u32>,
    }

    impl ChunkSink for Capture {
        fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize) {
            for _ in 0..run {
                self.residuals.push(0);
            }
            self.residuals.extend_from_slice(&residuals[skip..n]);
        }

        fn finalize(&mut self, run: usize) {
            for _ in 0..run {
                self.residuals.push(0);
            }
        }
    }

    #[test]
    fn test_flat_gray_image_produces_zero_residuals() {
        let pixels = vec![42u8; 16 * 4];
        let mut processors = vec![ChannelRowProcessor::new(Capture {
            residuals: Vec::new(),
        })];
        process_image_area(
            &pixels,
            0,
            0,
            16,
            0,
            4,
            16,
            UpTo8Bits(8),
            1,
            Endianness::Little,
            &mut processors,
        );
        let residuals = &processors[0].sink.residuals;
        assert_eq!(residuals.len(), 16 * 4);
        // First sample predicts from the zero pad; everything after it is
        // flat.
        assert_eq!(residuals[0], jxls_bitstream::pack_signed(42));
        assert!(residuals[1..].iter().all(|&r| r == 0));
    }

    #[test]
    fn test_big_endian_16bit_samples() {
        // One row, two samples: 0x0102 and 0x0304 stored big-endian.
        let pixels = [0x01u8, 0x02, 0x03, 0x04];
        let mut processors = vec![ChannelRowProcessor::new(Capture {
            residuals: Vec::new(),
        })];
        process_image_area(
            &pixels,
            0,
            0,
            2,
            0,
            1,
            4,
            MoreThan14Bits(16),
            1,
            Endianness::Big,
            &mut processors,
        );
        let residuals = &processors[0].sink.residuals;
        assert_eq!(residuals[0], jxls_bitstream::pack_signed(0x0102));
        assert_eq!(residuals[1], jxls_bitstream::pack_signed(0x0304 - 0x0102));
    }

    #[test]
    fn test_rgb_rows_go_through_ycocg() {
        // A solid red row: Y/Co/Cg planes must carry the transformed
        // values, with zero residuals after the first column.
        let pixels: Vec<u8> = std::iter::repeat([255u8, 0, 0])
            .take(8)
            .flatten()
            .collect();
        let mut counts = [[0u64; NUM_RAW_SYMBOLS]; 3];
        let mut lz77 = [[0u64; NUM_LZ77_SYMBOLS]; 3];
        let mut processors: Vec<_> = counts
            .iter_mut()
            .zip(lz77.iter_mut())
            .map(|(raw_counts, lz77_counts)| {
                ChannelRowProcessor::new(ChunkSampleCollector {
                    raw_counts,
                    lz77_counts,
                })
            })
            .collect();
        process_image_area(
            &pixels,
            0,
            0,
            8,
            0,
            1,
            24,
            UpTo8Bits(8),
            3,
            Endianness::Little,
            &mut processors,
        );
        // Each plane sees one nonzero-context sample and seven flat ones.
        for c in 0..3 {
            assert!(counts[c].iter().sum::<u64>() == 8);
            assert_eq!(counts[c][0], 7, "channel {c}");
        }
    }

    #[test]
    fn test_palette_rows_map_through_lookup() {
        let mut lookup = vec![0i16; jxls_core::consts::PALETTE_HASH_SIZE];
        let color = [10u8, 20, 30, 255];
        let packed = u32::from_le_bytes(color);
        lookup[jxls_color::pixel_hash(packed) as usize] = 3;
        let pixels: Vec<u8> = std::iter::repeat(color).take(4).flatten().collect();
        let mut processor = ChannelRowProcessor::new(Capture {
            residuals: Vec::new(),
        });
        process_image_area_palette(&pixels, 0, 0, 4, 0, 1, 16, &lookup, 4, &mut processor);
        let residuals = &processor.sink.residuals;
        assert_eq!(residuals[0], jxls_bitstream::pack_signed(3));
        assert!(residuals[1..].iter().all(|&r| r == 0));
    }
}
