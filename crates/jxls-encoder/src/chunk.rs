//! Entropy chunk encoding
//!
//! Samples are processed eight at a time per channel row: predict with the
//! gradient predictor, zigzag-pack the residual, and either emit raw
//! symbols or collapse leading zero runs into LZ77 tokens. A run may span
//! chunks and rows; `ChannelRowProcessor` carries it until a nonzero
//! residual (or the end of the channel) breaks it.

use jxls_bitstream::hybrid_uint::{encode_hybrid_uint000, encode_hybrid_uint_lz77, pack_signed};
use jxls_bitstream::{BitWriter, PrefixCode};
use jxls_core::consts::{
    CHUNK_SIZE, LZ77_CACHE_SIZE, LZ77_MIN_LENGTH, NUM_LZ77_SYMBOLS, NUM_RAW_SYMBOLS,
};
use jxls_core::Sample;

/// Receives the per-chunk output of a row processor: either real bit
/// emission or histogram collection.
pub trait ChunkSink {
    /// Consumes a pending run of `run` zeros (0 for none), then the chunk's
    /// residuals from `skip` to `n`.
    fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize);

    /// Consumes the run left over at the end of the channel.
    fn finalize(&mut self, run: usize);
}

/// Emits tokens through a channel's prefix code.
pub struct ChunkEncoder<'a> {
    pub code: &'a PrefixCode,
    pub output: &'a mut BitWriter,
}

impl ChunkEncoder<'_> {
    #[inline]
    fn encode_rle(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let count = count - (LZ77_MIN_LENGTH + 1);
        if count < LZ77_CACHE_SIZE {
            self.output.write(
                self.code.lz77_cache_nbits[count] as usize,
                self.code.lz77_cache_bits[count],
            );
        } else {
            let (token, nbits, bits) = encode_hybrid_uint_lz77(count as u32);
            let token = token as usize;
            let mut wbits = bits as u64;
            wbits = (wbits << self.code.lz77_nbits[token]) | self.code.lz77_bits[token] as u64;
            wbits = (wbits << self.code.raw_nbits[0]) | self.code.raw_bits[0] as u64;
            self.output.write(
                self.code.lz77_nbits[token] as usize + nbits as usize + self.code.raw_nbits[0] as usize,
                wbits,
            );
        }
    }
}

impl ChunkSink for ChunkEncoder<'_> {
    #[inline]
    fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize) {
        self.encode_rle(run);
        for &residual in residuals.iter().take(n).skip(skip) {
            let (token, nbits, bits) = encode_hybrid_uint000(residual);
            let token = token as usize;
            self.output.write(
                self.code.raw_nbits[token] as usize + nbits as usize,
                self.code.raw_bits[token] as u64 | (bits as u64) << self.code.raw_nbits[token],
            );
        }
    }

    fn finalize(&mut self, run: usize) {
        self.encode_rle(run);
    }
}

/// Counts tokens into frequency histograms instead of emitting them; feeds
/// the prefix-code builder.
pub struct ChunkSampleCollector<'a> {
    pub raw_counts: &'a mut [u64; NUM_RAW_SYMBOLS],
    pub lz77_counts: &'a mut [u64; NUM_LZ77_SYMBOLS],
}

impl ChunkSink for ChunkSampleCollector<'_> {
    fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize) {
        if run != 0 {
            self.raw_counts[0] += 1;
            let (token, _, _) = encode_hybrid_uint_lz77((run - (LZ77_MIN_LENGTH + 1)) as u32);
            self.lz77_counts[token as usize] += 1;
        }
        for &residual in residuals.iter().take(n).skip(skip) {
            let (token, _, _) = encode_hybrid_uint000(residual);
            self.raw_counts[token as usize] += 1;
        }
    }

    fn finalize(&mut self, _run: usize) {
        // The final run's true length is unknown here; don't count it.
    }
}

/// Drives one channel's rows through prediction and run detection.
pub struct ChannelRowProcessor<T> {
    pub sink: T,
    // Invariant: run == 0 or run > LZ77_MIN_LENGTH.
    run: usize,
}

impl<T: ChunkSink> ChannelRowProcessor<T> {
    pub fn new(sink: T) -> Self {
        Self { sink, run: 0 }
    }

    #[inline]
    fn process_chunk<P: Sample>(
        &mut self,
        row: &[P],
        row_left: &[P],
        row_top: &[P],
        row_topleft: &[P],
        n: usize,
    ) {
        let mut residuals = [0u32; CHUNK_SIZE];
        let mut prefix_size = 0usize;
        let mut required_prefix_size = 0usize;
        for ix in 0..CHUNK_SIZE {
            let px = row[ix];
            let left = row_left[ix];
            let top = row_top[ix];
            let topleft = row_topleft[ix];
            let ac = left.wrapping_sub(&topleft);
            let ab = left.wrapping_sub(&top);
            let bc = top.wrapping_sub(&topleft);
            let grad = ac.wrapping_add(&top);
            let d = ab ^ bc;
            let clamp = if d.is_negative() { top } else { left };
            let s = ac ^ bc;
            let pred = if s.is_negative() { grad } else { clamp };
            residuals[ix] = pack_signed(px.to_i32() - pred.to_i32());
            prefix_size = if prefix_size == required_prefix_size {
                prefix_size + usize::from(residuals[ix] == 0)
            } else {
                prefix_size
            };
            required_prefix_size += 1;
        }

        let prefix_size = prefix_size.min(n);
        if prefix_size == n && (self.run > 0 || prefix_size > LZ77_MIN_LENGTH) {
            // The run continues through the whole chunk.
            self.run += prefix_size;
        } else if prefix_size + self.run > LZ77_MIN_LENGTH {
            // The run breaks inside this chunk.
            self.sink
                .chunk(self.run + prefix_size, &residuals, prefix_size, n);
            self.run = 0;
        } else {
            // There was no run to begin with.
            self.sink.chunk(0, &residuals, 0, n);
        }
    }

    /// Processes `xs` samples. The row slices must extend at least
    /// `CHUNK_SIZE` samples past the last one; padded scanlines provide
    /// that.
    pub fn process_row<P: Sample>(
        &mut self,
        row: &[P],
        row_left: &[P],
        row_top: &[P],
        row_topleft: &[P],
        xs: usize,
    ) {
        let mut x = 0;
        while x < xs {
            self.process_chunk(
                &row[x..],
                &row_left[x..],
                &row_top[x..],
                &row_topleft[x..],
                CHUNK_SIZE.min(xs - x),
            );
            x += CHUNK_SIZE;
        }
    }

    pub fn finalize(&mut self) {
        self.sink.finalize(self.run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP_TO_8_MIN: [u8; 12] = [0; 12];
    const UP_TO_8_MAX: [u8; 12] = [7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 10];

    fn test_code() -> PrefixCode {
        let mut raw = [0u64; NUM_RAW_SYMBOLS];
        for (i, f) in raw.iter_mut().enumerate().take(11) {
            *f = 1000 / (i as u64 + 1) + 1;
        }
        let lz77 = [5u64; NUM_LZ77_SYMBOLS];
        PrefixCode::new(&UP_TO_8_MIN, &UP_TO_8_MAX, &raw, &lz77)
    }

    fn padded(samples: &[i16]) -> Vec<i16> {
        let mut row = vec![0i16; 1 + samples.len() + CHUNK_SIZE];
        row[1..1 + samples.len()].copy_from_slice(samples);
        row
    }

    /// First-row context: left/top/topleft all alias the previous sample.
    fn run_first_row<T: ChunkSink>(processor: &mut ChannelRowProcessor<T>, samples: &[i16]) {
        let row = padded(samples);
        processor.process_row(&row[1..], &row[..], &row[..], &row[..], samples.len());
        processor.finalize();
    }

    #[test]
    fn test_all_zero_row_collapses_to_one_run() {
        let code = test_code();
        let mut output = BitWriter::new();
        output.allocate(1024);
        {
            let mut processor = ChannelRowProcessor::new(ChunkEncoder {
                code: &code,
                output: &mut output,
            });
            run_first_row(&mut processor, &[0i16; 32]);
        }
        // One cached run emission: zero literal + length token, nothing per
        // sample.
        let run_bits = code.lz77_cache_nbits[32 - LZ77_MIN_LENGTH - 1] as usize;
        assert_eq!(output.bit_count(), run_bits);
    }

    #[test]
    fn test_short_zero_prefix_stays_raw() {
        let code = test_code();
        let mut output = BitWriter::new();
        output.allocate(1024);
        {
            let mut processor = ChannelRowProcessor::new(ChunkEncoder {
                code: &code,
                output: &mut output,
            });
            // Six zeros then a step: under the minimum run length, so all
            // eight samples emit as raw symbols.
            run_first_row(&mut processor, &[0, 0, 0, 0, 0, 0, 9, 9]);
        }
        let zero_bits = code.raw_nbits[0] as usize;
        assert!(output.bit_count() >= 6 * zero_bits);
    }

    #[test]
    fn test_collector_counts_match_encoder_tokens() {
        let samples: Vec<i16> = (0..48).map(|i| (i * 7 % 23) as i16).collect();
        let mut raw_counts = [0u64; NUM_RAW_SYMBOLS];
        let mut lz77_counts = [0u64; NUM_LZ77_SYMBOLS];
        {
            let mut collector = ChannelRowProcessor::new(ChunkSampleCollector {
                raw_counts: &mut raw_counts,
                lz77_counts: &mut lz77_counts,
            });
            run_first_row(&mut collector, &samples);
        }
        // Non-trivial content: some raw symbol was counted.
        assert!(raw_counts.iter().sum::<u64>() > 0);
        // No run of zeros long enough for LZ77 in this input.
        assert_eq!(lz77_counts.iter().sum::<u64>(), 0);
    }

    #[test]
    fn test_run_carries_across_chunks_and_breaks_once() {
        // 20 zeros, then a ramp: the run must be emitted once with the
        // combined length, then the tail raw.
        let mut samples = vec![0i16; 20];
        samples.extend_from_slice(&[5, 6, 7, 8]);

        let mut raw_counts = [0u64; NUM_RAW_SYMBOLS];
        let mut lz77_counts = [0u64; NUM_LZ77_SYMBOLS];
        {
            let mut collector = ChannelRowProcessor::new(ChunkSampleCollector {
                raw_counts: &mut raw_counts,
                lz77_counts: &mut lz77_counts,
            });
            run_first_row(&mut collector, &samples);
        }
        // Exactly one run token (plus its zero literal).
        assert_eq!(lz77_counts.iter().sum::<u64>(), 1);
        assert_eq!(raw_counts[0], 1);
    }

    #[test]
    fn test_trailing_run_is_flushed_by_encoder() {
        let code = test_code();
        let mut with_tail = BitWriter::new();
        with_tail.allocate(1024);
        {
            let mut processor = ChannelRowProcessor::new(ChunkEncoder {
                code: &code,
                output: &mut with_tail,
            });
            // A nonzero sample, then 31 zeros running to the end.
            let mut samples = vec![3i16];
            samples.resize(32, 0);
            run_first_row(&mut processor, &samples);
        }
        assert!(with_tail.bit_count() > 0);
    }
}
