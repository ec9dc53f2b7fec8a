//! Frame header and TOC emission

use jxls_bitstream::BitWriter;
use jxls_core::consts::{GROUP_SIZE_OFFSET, TOC_BITS};

use crate::layout::toc_bucket;

/// Writes the hand-packed frame header for a single modular frame. The
/// header ends byte-aligned; the TOC follows immediately.
pub fn write_frame_header(output: &mut BitWriter, have_alpha: bool, is_last: bool) {
    output.write(1, 0); // all_default
    output.write(2, 0b00); // regular frame
    output.write(1, 1); // modular
    output.write(2, 0b00); // default flags
    output.write(1, 0); // not YCbCr
    output.write(2, 0b00); // no upsampling
    if have_alpha {
        output.write(2, 0b00); // no alpha upsampling
    }
    output.write(2, 0b01); // default group size
    output.write(2, 0b00); // exactly one pass
    output.write(1, 0); // no custom size or origin
    output.write(2, 0b00); // kReplace blending mode
    if have_alpha {
        output.write(2, 0b00); // kReplace blending mode for alpha channel
    }
    output.write(1, u64::from(is_last)); // is_last
    if !is_last {
        output.write(2, 0b00); // can not be saved as reference
    }
    output.write(2, 0b00); // a frame has no name
    output.write(1, 0); // loop filter is not all_default
    output.write(1, 0); // no gaborish
    output.write(2, 0); // 0 EPF iters
    output.write(2, 0b00); // no LF extensions
    output.write(2, 0b00); // no FH extensions

    output.write(1, 0); // no TOC permutation
    output.zero_pad_to_byte(); // TOC is byte-aligned
}

/// Writes one bucket-tagged size entry per section, then byte-aligns;
/// section payloads are byte-aligned on these boundaries.
pub fn write_toc(output: &mut BitWriter, group_sizes: &[usize]) {
    for &group_size in group_sizes {
        let bucket = toc_bucket(group_size);
        output.write(2, bucket as u64);
        output.write(
            TOC_BITS[bucket] - 2,
            (group_size - GROUP_SIZE_OFFSET[bucket]) as u64,
        );
    }
    output.zero_pad_to_byte();
}

#[cfg(test)]
mod tests {
    use super::*;
    use jxls_core::consts::MAX_FRAME_HEADER_SIZE;

    #[test]
    fn test_frame_header_fits_reserved_size() {
        for have_alpha in [false, true] {
            for is_last in [false, true] {
                let mut writer = BitWriter::new();
                writer.allocate(256);
                write_frame_header(&mut writer, have_alpha, is_last);
                assert!(writer.bytes_written() <= MAX_FRAME_HEADER_SIZE);
                assert_eq!(writer.bits_in_buffer(), 0);
            }
        }
    }

    #[test]
    fn test_toc_entry_widths() {
        // One entry per bucket: 12 + 16 + 24 + 32 bits, then byte-aligned.
        let mut writer = BitWriter::new();
        writer.allocate(256);
        write_toc(&mut writer, &[0, 2048, 20000, 5_000_000]);
        assert_eq!(writer.bytes_written(), (12 + 16 + 24 + 32 + 7) / 8);
        assert_eq!(writer.bits_in_buffer(), 0);
    }

    #[test]
    fn test_empty_sections_encode_in_smallest_bucket() {
        let mut writer = BitWriter::new();
        writer.allocate(256);
        write_toc(&mut writer, &[0, 0, 0]);
        // Three 12-bit entries pad to 5 bytes.
        assert_eq!(writer.bytes_written(), 5);
    }
}
