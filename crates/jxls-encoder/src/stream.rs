//! Output streaming
//!
//! Drains the header and every group's channel writers into caller
//! buffers. Sections are bit-concatenated: when the previous section ends
//! on a fractional byte, the next section's bytes are shifted by the
//! remaining bit count and OR'd in, eight bytes at a time with a scalar
//! tail. Group boundaries re-align to whole bytes, matching the TOC's
//! byte sizes.

use jxls_bitstream::BitWriter;

use crate::frame::{FrameState, OutputCursor};

#[inline]
fn load_le64(src: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&src[..8]);
    u64::from_le_bytes(bytes)
}

/// Appends `count <= 8` bits through the cursor's staging buffer, storing
/// the staged 8 bytes at the head of `out`. Returns the number of whole
/// bytes produced (0 or 1).
#[inline]
fn add_bits(count: usize, bits: u64, out: &mut [u8], cursor: &mut OutputCursor) -> usize {
    cursor.bit_buffer |= bits << cursor.bits_in_buffer;
    cursor.bits_in_buffer += count;
    out[..8].copy_from_slice(&cursor.bit_buffer.to_le_bytes());
    let bytes = cursor.bits_in_buffer / 8;
    cursor.bits_in_buffer -= bytes * 8;
    cursor.bit_buffer >>= bytes * 8;
    bytes
}

/// One streaming step: writes as much as fits into `output` and returns
/// the byte count; 0 once the frame has been fully emitted. The caller
/// guarantees `output.len() >= 32`; 9 bytes of headroom stay reserved for
/// the staging stores.
pub(crate) fn write_output_chunk(frame: &mut FrameState<'_>, output: &mut [u8]) -> usize {
    let nbc = frame.nb_chans;
    let FrameState {
        header,
        group_data,
        cursor,
        ..
    } = frame;

    let num_sections = 1 + group_data.len() * nbc;
    let mut out_pos = 0usize;
    loop {
        if cursor.current_bit_writer >= num_sections {
            return out_pos;
        }
        if output.len() - out_pos <= 9 {
            return out_pos;
        }
        let cur = cursor.current_bit_writer;
        let writer: &BitWriter = if cur == 0 {
            &*header
        } else {
            &group_data[(cur - 1) / nbc][(cur - 1) % nbc]
        };
        let full_byte_count =
            (output.len() - out_pos - 9).min(writer.bytes_written() - cursor.bit_writer_byte_pos);
        let src = &writer.data()[cursor.bit_writer_byte_pos..cursor.bit_writer_byte_pos + full_byte_count];
        if cursor.bits_in_buffer == 0 {
            output[out_pos..out_pos + full_byte_count].copy_from_slice(src);
        } else {
            let mut i = 0;
            // Merge eight source bytes per step; explicit little-endian
            // loads keep this correct on any host.
            while i + 8 < full_byte_count {
                let chunk = load_le64(&src[i..]);
                let merged = cursor.bit_buffer | (chunk << cursor.bits_in_buffer);
                output[out_pos + i..out_pos + i + 8].copy_from_slice(&merged.to_le_bytes());
                cursor.bit_buffer = chunk >> (64 - cursor.bits_in_buffer);
                i += 8;
            }
            // Scalar tail (and fallback path).
            while i < full_byte_count {
                add_bits(8, src[i] as u64, &mut output[out_pos + i..], cursor);
                i += 1;
            }
        }
        out_pos += full_byte_count;
        cursor.bit_writer_byte_pos += full_byte_count;
        if cursor.bit_writer_byte_pos == writer.bytes_written() {
            // Flush the section's partial byte through the shift path.
            if writer.bits_in_buffer() != 0 {
                let n = add_bits(
                    writer.bits_in_buffer(),
                    writer.pending_bits(),
                    &mut output[out_pos..],
                    cursor,
                );
                out_pos += n;
            }
            cursor.bit_writer_byte_pos = 0;
            cursor.current_bit_writer += 1;
            // Group boundaries (every nbc sections) re-align to a byte.
            if (cursor.current_bit_writer - 1) % nbc == 0 && cursor.bits_in_buffer != 0 {
                let n = add_bits(8 - cursor.bits_in_buffer, 0, &mut output[out_pos..], cursor);
                out_pos += n;
            }
        }
    }
}
