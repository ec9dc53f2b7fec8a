//! Group grid and TOC layout
//!
//! Section byte sizes are encoded in the TOC with one of four size-class
//! buckets. Because the AC-group sizes are only known after encoding, the
//! DC-global section reserves a size class wide enough that patching the
//! TOC afterwards can never push it into a larger bucket, which would shift
//! every byte offset after it.

use jxls_core::consts::{GROUP_SIZE_OFFSET, MAX_FRAME_HEADER_SIZE, TOC_BITS};

/// Per-axis group counts for the given group edge length.
pub fn group_counts(width: usize, height: usize, dim: usize) -> (usize, usize) {
    (width.div_ceil(dim), height.div_ceil(dim))
}

/// The TOC size-class bucket for a section of `group_size` bytes.
pub fn toc_bucket(group_size: usize) -> usize {
    let mut bucket = 0;
    while bucket < 3 && group_size >= GROUP_SIZE_OFFSET[bucket + 1] {
        bucket += 1;
    }
    bucket
}

/// The reserved DC-global size class and the byte offset where AC-group
/// data begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcGroupOffset {
    pub min_dc_global_size: usize,
    pub ac_group_data_offset: usize,
}

/// Widens the DC-global size class until later TOC growth cannot change its
/// bucket. The maximum AC group size is 768 kB, so an AC TOC entry spans 12
/// to 24 bits.
pub fn compute_ac_group_data_offset(
    dc_global_size: usize,
    num_dc_groups: usize,
    num_ac_groups: usize,
) -> AcGroupOffset {
    let ac_toc_max_bits = num_ac_groups * 24;
    let ac_toc_min_bits = num_ac_groups * 12;
    let max_padding = 1 + (ac_toc_max_bits - ac_toc_min_bits + 7) / 8;
    let mut min_dc_global_size = dc_global_size;
    let mut dc_global_bucket = toc_bucket(min_dc_global_size);
    while toc_bucket(min_dc_global_size + max_padding) > dc_global_bucket {
        dc_global_bucket = toc_bucket(min_dc_global_size + max_padding);
        min_dc_global_size = GROUP_SIZE_OFFSET[dc_global_bucket];
    }
    debug_assert_eq!(toc_bucket(min_dc_global_size), dc_global_bucket);
    debug_assert_eq!(
        toc_bucket(min_dc_global_size + max_padding),
        dc_global_bucket
    );
    let max_toc_bits =
        TOC_BITS[dc_global_bucket] + 12 * (1 + num_dc_groups) + ac_toc_max_bits;
    let max_toc_size = (max_toc_bits + 7) / 8;
    AcGroupOffset {
        min_dc_global_size,
        ac_group_data_offset: MAX_FRAME_HEADER_SIZE + max_toc_size + min_dc_global_size,
    }
}
