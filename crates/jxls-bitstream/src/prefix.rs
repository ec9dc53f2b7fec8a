//! Canonical prefix-code construction
//!
//! Each channel slot carries one two-level code: a level-1 code over the raw
//! residual symbols plus a single bucket standing in for all LZ77 length
//! symbols, and a level-2 code over the length symbols within the bucket's
//! remaining bit budget. Code lengths are chosen by a bounded-precision
//! dynamic program minimizing the weighted length subject to the Kraft
//! equality, then assigned canonically and bit-reversed for LSB-first
//! emission.

use jxls_core::consts::{LZ77_OFFSET, LZ77_CACHE_SIZE, NUM_LZ77_SYMBOLS, NUM_RAW_SYMBOLS};
use num_traits::{AsPrimitive, PrimInt};

use crate::bitwriter::BitWriter;
use crate::hybrid_uint::encode_hybrid_uint_lz77;

const MAX_NUM_SYMBOLS: usize = if NUM_RAW_SYMBOLS + 1 < NUM_LZ77_SYMBOLS {
    NUM_LZ77_SYMBOLS
} else {
    NUM_RAW_SYMBOLS + 1
};

/// Reverses the low `nbits` bits of `bits`.
fn bit_reverse(nbits: usize, bits: u16) -> u16 {
    const NIBBLE_LOOKUP: [u16; 16] = [
        0b0000, 0b1000, 0b0100, 0b1100, 0b0010, 0b1010, 0b0110, 0b1110,
        0b0001, 0b1001, 0b0101, 0b1101, 0b0011, 0b1011, 0b0111, 0b1111,
    ];
    let rev16 = (NIBBLE_LOOKUP[(bits & 0xF) as usize] << 12)
        | (NIBBLE_LOOKUP[((bits >> 4) & 0xF) as usize] << 8)
        | (NIBBLE_LOOKUP[((bits >> 8) & 0xF) as usize] << 4)
        | NIBBLE_LOOKUP[(bits >> 12) as usize];
    ((rev16 as u32) >> (16 - nbits)) as u16
}

/// Assigns canonical codewords given per-symbol lengths, split into two
/// halves so the raw and LZ77 symbol tables can use different storage
/// widths. Zero lengths are tolerated: their overshoot cancels out of the
/// low bits every real codeword keeps.
fn compute_canonical_code(
    first_nbits: &[u8],
    first_bits: &mut [u8],
    second_nbits: &[u8],
    second_bits: &mut [u16],
) {
    const MAX_CODE_LENGTH: usize = 15;
    let mut code_length_counts = [0u16; MAX_CODE_LENGTH + 1];
    for &nbits in first_nbits {
        debug_assert!(nbits > 0 && nbits <= 8);
        code_length_counts[nbits as usize] += 1;
    }
    for &nbits in second_nbits {
        debug_assert!(nbits as usize <= MAX_CODE_LENGTH);
        code_length_counts[nbits as usize] += 1;
    }

    let mut next_code = [0u16; MAX_CODE_LENGTH + 1];
    let mut code = 0u16;
    for i in 1..=MAX_CODE_LENGTH {
        code = code.wrapping_add(code_length_counts[i - 1]) << 1;
        next_code[i] = code;
    }

    for (i, &nbits) in first_nbits.iter().enumerate() {
        first_bits[i] = bit_reverse(nbits as usize, next_code[nbits as usize]) as u8;
        next_code[nbits as usize] = next_code[nbits as usize].wrapping_add(1);
    }
    for (i, &nbits) in second_nbits.iter().enumerate() {
        second_bits[i] = bit_reverse(nbits as usize, next_code[nbits as usize]);
        next_code[nbits as usize] = next_code[nbits as usize].wrapping_add(1);
    }
}

fn compute_code_lengths_non_zero_impl<T>(
    freqs: &[u64],
    n: usize,
    precision: usize,
    infty: T,
    min_limit: &[u8],
    max_limit: &[u8],
    nbits: &mut [u8],
) where
    T: PrimInt + 'static,
    u64: AsPrimitive<T>,
{
    debug_assert!(precision < 15);
    let stride = (1usize << precision) + 1;
    let mut dynp = vec![infty; stride * (n + 1)];
    dynp[0] = T::zero();
    for sym in 0..n {
        for bits in min_limit[sym]..=max_limit[sym] {
            let off_delta = 1usize << (precision - bits as usize);
            let cost: T = (freqs[sym] * u64::from(bits)).as_();
            for off in 0..=(stride - 1 - off_delta) {
                let candidate = dynp[sym * stride + off] + cost;
                let slot = &mut dynp[(sym + 1) * stride + off + off_delta];
                if candidate < *slot {
                    *slot = candidate;
                }
            }
        }
    }

    let mut off = 1usize << precision;
    debug_assert!(dynp[n * stride + off] != infty);

    let mut sym = n;
    while sym > 0 {
        sym -= 1;
        debug_assert!(off > 0);
        for bits in min_limit[sym]..=max_limit[sym] {
            let off_delta = 1usize << (precision - bits as usize);
            let cost: T = (freqs[sym] * u64::from(bits)).as_();
            if off_delta <= off && dynp[(sym + 1) * stride + off] == dynp[sym * stride + off - off_delta] + cost
            {
                off -= off_delta;
                nbits[sym] = bits;
                break;
            }
        }
    }
}

/// Computes `nbits[i]` subject to `min_limit[i] <= nbits[i] <= max_limit[i]`
/// and `sum 2^-nbits[i] == 1`, minimizing `sum(nbits[i] * freqs[i])`. All
/// frequencies must be nonzero and at least two symbols must be present.
fn compute_code_lengths_non_zero(
    freqs: &[u64],
    n: usize,
    min_limit: &mut [u8],
    max_limit: &[u8],
    nbits: &mut [u8],
) {
    let mut precision = 0usize;
    let mut shortest_length = 255usize;
    let mut freqsum = 0u64;
    for i in 0..n {
        debug_assert!(freqs[i] != 0);
        freqsum += freqs[i];
        if min_limit[i] < 1 {
            min_limit[i] = 1;
        }
        debug_assert!(min_limit[i] <= max_limit[i]);
        precision = precision.max(max_limit[i] as usize);
        shortest_length = shortest_length.min(min_limit[i] as usize);
    }
    // If all the minimum limits are greater than 1, shift precision so that
    // the DP behaves as if the shortest were 1.
    precision -= shortest_length - 1;
    let infty = freqsum * precision as u64;
    if infty < u64::from(u32::MAX / 2) {
        compute_code_lengths_non_zero_impl(
            freqs,
            n,
            precision,
            infty as u32,
            min_limit,
            max_limit,
            nbits,
        );
    } else {
        compute_code_lengths_non_zero_impl(freqs, n, precision, infty, min_limit, max_limit, nbits);
    }
}

/// Like [`compute_code_lengths_non_zero`], but tolerating zero frequencies:
/// symbols with zero frequency get length 0 and do not constrain the rest.
pub(crate) fn compute_code_lengths(
    freqs: &[u64],
    n: usize,
    min_limit_in: &[u8],
    max_limit_in: &[u8],
    nbits: &mut [u8],
) {
    debug_assert!(n <= MAX_NUM_SYMBOLS);
    let mut compact_freqs = [0u64; MAX_NUM_SYMBOLS];
    let mut min_limit = [0u8; MAX_NUM_SYMBOLS];
    let mut max_limit = [0u8; MAX_NUM_SYMBOLS];
    let mut ni = 0;
    for i in 0..n {
        if freqs[i] != 0 {
            compact_freqs[ni] = freqs[i];
            min_limit[ni] = min_limit_in[i];
            max_limit[ni] = max_limit_in[i];
            ni += 1;
        }
    }
    let mut num_bits = [0u8; MAX_NUM_SYMBOLS];
    compute_code_lengths_non_zero(
        &compact_freqs,
        ni,
        &mut min_limit,
        &max_limit,
        &mut num_bits,
    );
    let mut ni = 0;
    for i in 0..n {
        nbits[i] = 0;
        if freqs[i] != 0 {
            nbits[i] = num_bits[ni];
            ni += 1;
        }
    }
}

/// A channel slot's prefix code: canonical lengths and bit-reversed
/// codewords for the raw residual symbols and the LZ77 length symbols, plus
/// a precomputed emission for short runs.
pub struct PrefixCode {
    pub raw_nbits: [u8; NUM_RAW_SYMBOLS],
    pub raw_bits: [u8; NUM_RAW_SYMBOLS],

    pub lz77_nbits: [u8; NUM_LZ77_SYMBOLS],
    pub lz77_bits: [u16; NUM_LZ77_SYMBOLS],

    pub lz77_cache_nbits: [u8; LZ77_CACHE_SIZE],
    pub lz77_cache_bits: [u64; LZ77_CACHE_SIZE],

    pub num_raw: usize,
}

impl Default for PrefixCode {
    fn default() -> Self {
        Self {
            raw_nbits: [0; NUM_RAW_SYMBOLS],
            raw_bits: [0; NUM_RAW_SYMBOLS],
            lz77_nbits: [0; NUM_LZ77_SYMBOLS],
            lz77_bits: [0; NUM_LZ77_SYMBOLS],
            lz77_cache_nbits: [0; LZ77_CACHE_SIZE],
            lz77_cache_bits: [0; LZ77_CACHE_SIZE],
            num_raw: 0,
        }
    }
}

impl PrefixCode {
    /// Builds the code from raw-symbol and LZ77-length frequencies, subject
    /// to the per-symbol length bounds of the active bit-depth
    /// specialization (`min_raw_length`/`max_raw_length` cover the raw
    /// symbols plus the trailing LZ77 bucket slot).
    pub fn new(
        min_raw_length: &[u8],
        max_raw_length: &[u8],
        raw_counts: &[u64; NUM_RAW_SYMBOLS],
        lz77_counts: &[u64; NUM_LZ77_SYMBOLS],
    ) -> Self {
        let mut code = PrefixCode::default();

        // Merge all the LZ77 counts into a single bucket symbol appended to
        // the raw histogram for the level-1 code.
        let mut level1_counts = [0u64; NUM_RAW_SYMBOLS + 1];
        level1_counts[..NUM_RAW_SYMBOLS].copy_from_slice(raw_counts);
        let mut num_raw = NUM_RAW_SYMBOLS;
        while num_raw > 0 && level1_counts[num_raw - 1] == 0 {
            num_raw -= 1;
        }
        code.num_raw = num_raw;
        debug_assert!(num_raw + 1 <= min_raw_length.len());

        level1_counts[num_raw] = lz77_counts.iter().sum();
        let mut level1_nbits = [0u8; NUM_RAW_SYMBOLS + 1];
        compute_code_lengths(
            &level1_counts,
            num_raw + 1,
            min_raw_length,
            max_raw_length,
            &mut level1_nbits,
        );

        // The bucket's length budget bounds the level-2 code over the LZ77
        // length symbols alone.
        let mut level2_nbits = [0u8; NUM_LZ77_SYMBOLS];
        let min_lengths = [0u8; NUM_LZ77_SYMBOLS];
        let max_lengths = [15 - level1_nbits[num_raw]; NUM_LZ77_SYMBOLS];
        let mut num_lz77 = NUM_LZ77_SYMBOLS;
        while num_lz77 > 0 && lz77_counts[num_lz77 - 1] == 0 {
            num_lz77 -= 1;
        }
        compute_code_lengths(
            lz77_counts,
            num_lz77,
            &min_lengths,
            &max_lengths,
            &mut level2_nbits,
        );
        code.raw_nbits[..num_raw].copy_from_slice(&level1_nbits[..num_raw]);
        for i in 0..num_lz77 {
            code.lz77_nbits[i] = if level2_nbits[i] != 0 {
                level1_nbits[num_raw] + level2_nbits[i]
            } else {
                0
            };
        }

        compute_canonical_code(
            &code.raw_nbits[..num_raw],
            &mut code.raw_bits[..num_raw],
            &code.lz77_nbits,
            &mut code.lz77_bits,
        );

        // Precompute the full emission of a short run: zero literal, length
        // token, extra bits. Entry `i` stands for a run of
        // `LZ77_MIN_LENGTH + 1 + i` zeros.
        for count in 0..LZ77_CACHE_SIZE {
            let (token, nbits, bits) = encode_hybrid_uint_lz77(count as u32);
            let token = token as usize;
            code.lz77_cache_nbits[count] =
                code.lz77_nbits[token] + nbits as u8 + code.raw_nbits[0];
            code.lz77_cache_bits[count] = ((((bits as u64) << code.lz77_nbits[token])
                | code.lz77_bits[token] as u64)
                << code.raw_nbits[0])
                | code.raw_bits[0] as u64;
        }

        code
    }

    /// Emits the code in the meta-code format: lengths of code lengths in
    /// the fixed order, then the raw lengths, a run of 205 zero lengths up
    /// to the LZ77 alphabet offset, then the LZ77 lengths. Writes at most
    /// 286 bits.
    pub fn write_to(&self, writer: &mut BitWriter) {
        let mut code_length_counts = [0u64; 18];
        code_length_counts[17] = 3 + 2 * (NUM_LZ77_SYMBOLS as u64 - 1);
        for &nbits in &self.raw_nbits {
            code_length_counts[nbits as usize] += 1;
        }
        for &nbits in &self.lz77_nbits {
            code_length_counts[nbits as usize] += 1;
        }
        let mut code_length_nbits = [0u8; 18];
        let code_length_nbits_min = [0u8; 18];
        let code_length_nbits_max = [5u8; 18];
        compute_code_lengths(
            &code_length_counts,
            18,
            &code_length_nbits_min,
            &code_length_nbits_max,
            &mut code_length_nbits,
        );
        writer.write(2, 0b00); // HSKIP = 0, i.e. don't skip code lengths.

        // As per Brotli RFC.
        let code_length_order: [usize; 18] =
            [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];
        let code_length_length_nbits: [usize; 6] = [2, 4, 3, 2, 2, 4];
        let code_length_length_bits: [u64; 6] = [0, 7, 3, 2, 1, 15];

        // Encode lengths of code lengths.
        let mut num_code_lengths = 18;
        while code_length_nbits[code_length_order[num_code_lengths - 1]] == 0 {
            num_code_lengths -= 1;
        }
        for &ord in code_length_order.iter().take(num_code_lengths) {
            let symbol = code_length_nbits[ord] as usize;
            writer.write(code_length_length_nbits[symbol], code_length_length_bits[symbol]);
        }

        // Canonical codes for the codes that represent the lengths of the
        // actual data codes.
        let mut code_length_bits = [0u16; 18];
        compute_canonical_code(&[], &mut [], &code_length_nbits, &mut code_length_bits);

        // Raw symbol lengths.
        for &nbits in &self.raw_nbits {
            writer.write(
                code_length_nbits[nbits as usize] as usize,
                code_length_bits[nbits as usize] as u64,
            );
        }
        let mut num_lz77 = NUM_LZ77_SYMBOLS;
        while num_lz77 > 0 && self.lz77_nbits[num_lz77 - 1] == 0 {
            num_lz77 -= 1;
        }
        // Encode zero lengths up to the start of the LZ77 symbols at 224:
        // three code-17 runs of 5, (5-2)*8+3 = 27, and (27-2)*8+5 = 205.
        const _: () = assert!(LZ77_OFFSET == 224 && NUM_RAW_SYMBOLS == 19);
        writer.write(code_length_nbits[17] as usize, code_length_bits[17] as u64);
        writer.write(3, 0b010);
        writer.write(code_length_nbits[17] as usize, code_length_bits[17] as u64);
        writer.write(3, 0b000);
        writer.write(code_length_nbits[17] as usize, code_length_bits[17] as u64);
        writer.write(3, 0b010);
        // LZ77 symbol lengths, at alphabet values 224+i.
        for &nbits in self.lz77_nbits.iter().take(num_lz77) {
            writer.write(
                code_length_nbits[nbits as usize] as usize,
                code_length_bits[nbits as usize] as u64,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The raw length-limit tables of the 8-bit and 16-bit specializations.
    const UP_TO_8_MIN: [u8; 12] = [0; 12];
    const UP_TO_8_MAX: [u8; 12] = [7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 10];
    const MORE_THAN_14_MIN: [u8; 20] =
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 8, 8, 8, 8, 8, 7];
    const MORE_THAN_14_MAX: [u8; 20] =
        [7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 8, 8, 8, 8, 8, 8, 10];

    fn kraft_sum(code: &PrefixCode) -> f64 {
        let mut sum = 0.0;
        for &n in &code.raw_nbits[..code.num_raw] {
            if n > 0 {
                sum += (2.0f64).powi(-(n as i32));
            }
        }
        for &n in &code.lz77_nbits {
            if n > 0 {
                sum += (2.0f64).powi(-(n as i32));
            }
        }
        sum
    }

    fn sample_counts() -> ([u64; NUM_RAW_SYMBOLS], [u64; NUM_LZ77_SYMBOLS]) {
        let mut raw = [0u64; NUM_RAW_SYMBOLS];
        let mut lz77 = [0u64; NUM_LZ77_SYMBOLS];
        for (i, f) in raw.iter_mut().enumerate().take(11) {
            *f = 4000 / (i as u64 + 1) + 1;
        }
        for (i, f) in lz77.iter_mut().enumerate() {
            *f = 100 / (i as u64 + 1) + 1;
        }
        (raw, lz77)
    }

    #[test]
    fn test_kraft_equality_8bit() {
        let (raw, lz77) = sample_counts();
        let code = PrefixCode::new(&UP_TO_8_MIN, &UP_TO_8_MAX, &raw, &lz77);
        assert!((kraft_sum(&code) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_kraft_equality_16bit_pinned_symbols() {
        let mut raw = [1u64; NUM_RAW_SYMBOLS];
        for (i, f) in raw.iter_mut().enumerate() {
            *f = 10_000 / (i as u64 + 1);
        }
        let lz77 = [7u64; NUM_LZ77_SYMBOLS];
        let code = PrefixCode::new(&MORE_THAN_14_MIN, &MORE_THAN_14_MAX, &raw, &lz77);
        assert!((kraft_sum(&code) - 1.0).abs() < 1e-9);
        // Symbols 13..19 are pinned to 8 bits in three sibling pairs.
        for i in 13..19 {
            assert_eq!(code.raw_nbits[i], 8, "symbol {i}");
        }
        assert_eq!(code.raw_bits[13] & 0x7F, code.raw_bits[14] & 0x7F);
        assert_eq!(code.raw_bits[15] & 0x7F, code.raw_bits[16] & 0x7F);
        assert_eq!(code.raw_bits[17] & 0x7F, code.raw_bits[18] & 0x7F);
    }

    #[test]
    fn test_lengths_within_limits() {
        let (raw, lz77) = sample_counts();
        let code = PrefixCode::new(&UP_TO_8_MIN, &UP_TO_8_MAX, &raw, &lz77);
        for (i, &n) in code.raw_nbits[..code.num_raw].iter().enumerate() {
            assert!(n >= 1 && n <= UP_TO_8_MAX[i]);
        }
        for &n in &code.lz77_nbits {
            assert!(n <= 15);
        }
    }

    #[test]
    fn test_lz77_cache_matches_manual_emission() {
        let (raw, lz77) = sample_counts();
        let code = PrefixCode::new(&UP_TO_8_MIN, &UP_TO_8_MAX, &raw, &lz77);
        for count in 0..LZ77_CACHE_SIZE {
            let (token, nbits, bits) = encode_hybrid_uint_lz77(count as u32);
            let token = token as usize;
            let mut cached = BitWriter::new();
            cached.allocate(128);
            cached.write(
                code.lz77_cache_nbits[count] as usize,
                code.lz77_cache_bits[count],
            );
            let mut manual = BitWriter::new();
            manual.allocate(128);
            manual.write(code.raw_nbits[0] as usize, code.raw_bits[0] as u64);
            manual.write(code.lz77_nbits[token] as usize, code.lz77_bits[token] as u64);
            manual.write(nbits as usize, bits as u64);
            cached.zero_pad_to_byte();
            manual.zero_pad_to_byte();
            assert_eq!(cached.data(), manual.data(), "count {count}");
        }
    }

    #[test]
    fn test_write_to_stays_within_bit_budget() {
        let (raw, lz77) = sample_counts();
        let code = PrefixCode::new(&UP_TO_8_MIN, &UP_TO_8_MAX, &raw, &lz77);
        let mut writer = BitWriter::new();
        writer.allocate(512);
        code.write_to(&mut writer);
        assert!(writer.bit_count() <= 286);
    }

    #[test]
    fn test_compute_code_lengths_respects_bounds() {
        let freqs = [100u64, 50, 20, 10, 5, 1, 0, 3];
        let min = [0u8; 8];
        let max = [6u8; 8];
        let mut nbits = [0u8; 8];
        compute_code_lengths(&freqs, 8, &min, &max, &mut nbits);
        let mut kraft = 0.0f64;
        for (i, &n) in nbits.iter().enumerate() {
            if freqs[i] == 0 {
                assert_eq!(n, 0);
            } else {
                assert!(n >= 1 && n <= 6);
                kraft += (2.0f64).powi(-(n as i32));
            }
        }
        assert!((kraft - 1.0).abs() < 1e-9);
    }
}
