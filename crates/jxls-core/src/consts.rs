//! Constants shared across the encoder crates

/// Edge length of an AC group (encodes independently)
pub const GROUP_DIM: usize = 256;

/// Edge length of a DC group
pub const DC_GROUP_DIM: usize = 2048;

/// Maximum number of channels (color + alpha)
pub const MAX_CHANNELS: usize = 4;

/// Number of raw residual symbols in a channel's prefix code
pub const NUM_RAW_SYMBOLS: usize = 19;

/// Number of LZ77 length symbols in a channel's prefix code
pub const NUM_LZ77_SYMBOLS: usize = 33;

/// Number of precomputed short-run emissions per prefix code.
/// The cache entry for index `i` represents a run of `LZ77_MIN_LENGTH + 1 + i`
/// zeros, so the table size is part of the on-wire contract.
pub const LZ77_CACHE_SIZE: usize = 32;

/// Symbol offset of LZ77 lengths within the combined alphabet
pub const LZ77_OFFSET: usize = 224;

/// Minimum run length that is worth an LZ77 token
pub const LZ77_MIN_LENGTH: usize = 7;

/// log2 of the number of samples processed per chunk
pub const LOG_CHUNK_SIZE: usize = 3;

/// Number of samples processed per chunk
pub const CHUNK_SIZE: usize = 1 << LOG_CHUNK_SIZE;

/// Upper bound on the frame header size when no image header is written
pub const MAX_FRAME_HEADER_SIZE: usize = 5;

/// Byte-size offsets of the four TOC size-class buckets
pub const GROUP_SIZE_OFFSET: [usize; 4] = [0, 1024, 17408, 4_211_712];

/// Total TOC entry width per bucket, including the 2 bucket-tag bits
pub const TOC_BITS: [usize; 4] = [12, 16, 24, 32];

/// Maximum number of palette entries, including the reserved zero entry
pub const MAX_PALETTE_COLORS: usize = 512;

/// log2 of the palette hash table size
pub const PALETTE_HASH_BITS: u32 = 16;

/// Number of slots in the palette hash table
pub const PALETTE_HASH_SIZE: usize = 1 << PALETTE_HASH_BITS;

/// Fibonacci multiplier of the palette hash; maps pixel value 0 to slot 0,
/// which is reserved as the empty sentinel.
pub const PALETTE_HASH_MULTIPLIER: u32 = 2_654_435_761;
