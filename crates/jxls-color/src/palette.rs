//! Palette detection and construction
//!
//! An 8-bit image qualifies for palette coding when every distinct pixel
//! value lands in its own slot of a 65536-entry hash table. Slot 0 doubles
//! as the empty sentinel, so the hash must map pixel value 0 to slot 0.

use jxls_core::consts::{
    MAX_PALETTE_COLORS, PALETTE_HASH_BITS, PALETTE_HASH_MULTIPLIER, PALETTE_HASH_SIZE,
};

/// Maps a packed pixel value to a hash slot in `0..PALETTE_HASH_SIZE`.
/// Maps 0 to 0.
#[inline]
pub fn pixel_hash(p: u32) -> u32 {
    p.wrapping_mul(PALETTE_HASH_MULTIPLIER) >> (32 - PALETTE_HASH_BITS)
}

fn detect_row_impl<const N: usize>(row: &[u8], width: usize, table: &mut [u32]) -> bool {
    let mut collided = false;
    for x in 0..width {
        let mut p = 0u32;
        for i in 0..N {
            p |= (row[x * N + i] as u32) << (8 * i);
        }
        let index = pixel_hash(p) as usize;
        collided |= table[index] != 0 && p != table[index];
        table[index] = p;
    }
    collided
}

/// Accumulates distinct pixel values of an 8-bit image into the hash table
/// until a collision proves the image needs more than the table can
/// represent one-to-one.
pub struct PaletteDetector {
    table: Vec<u32>,
    collided: bool,
}

impl Default for PaletteDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteDetector {
    pub fn new() -> Self {
        Self {
            table: vec![0u32; PALETTE_HASH_SIZE],
            collided: false,
        }
    }

    /// Feeds one row of interleaved 8-bit samples. Returns true once any
    /// two distinct pixel values have collided; further rows may be
    /// skipped at that point.
    pub fn add_row(&mut self, row: &[u8], width: usize, nb_chans: usize) -> bool {
        self.collided |= match nb_chans {
            1 => detect_row_impl::<1>(row, width, &mut self.table),
            2 => detect_row_impl::<2>(row, width, &mut self.table),
            3 => detect_row_impl::<3>(row, width, &mut self.table),
            _ => detect_row_impl::<4>(row, width, &mut self.table),
        };
        self.collided
    }

    pub fn collided(&self) -> bool {
        self.collided
    }

    /// Compacts, filters, and sorts the collected entries. Returns `None`
    /// when palette coding is not applicable: a collision occurred, more
    /// than [`MAX_PALETTE_COLORS`] entries are needed, or the entries look
    /// like a dense grayscale ramp that the gradient predictor handles
    /// better on its own.
    pub fn build(mut self, nb_chans: usize) -> Option<Palette> {
        if self.collided {
            return None;
        }

        // Always keep the all-zero color in reserved index 0.
        let mut num_colors = 1usize;
        let mut have_color = false;
        let mut min_g = 255u8;
        let mut max_g = 0u8;
        let mut nb_entries = 0usize;
        for k in 0..PALETTE_HASH_SIZE {
            if self.table[k] == 0 {
                continue;
            }
            let p = self.table[k].to_le_bytes();
            // Move entries to the front so the sort has less work.
            self.table[nb_entries] = self.table[k];
            if p[0] != p[1] || p[0] != p[2] {
                have_color = true;
            }
            min_g = min_g.min(p[1]);
            max_g = max_g.max(p[1]);
            nb_entries += 1;
            if nb_entries + num_colors > MAX_PALETTE_COLORS {
                return None;
            }
        }
        if !have_color {
            // A grayscale palette without many holes compresses worse than
            // letting the predictor run over the samples directly.
            if ((max_g as i32 - min_g as i32) as f32) < nb_entries as f32 * 1.4 {
                return None;
            }
        }

        let mut entries = self.table;
        entries.truncate(nb_entries);
        entries.sort_unstable_by(|&ap, &bp| {
            if ap == 0 {
                return std::cmp::Ordering::Greater;
            }
            if bp == 0 {
                return std::cmp::Ordering::Less;
            }
            let a = ap.to_le_bytes();
            let b = bp.to_le_bytes();
            let mut ay = 0.299 * a[0] as f32 + 0.587 * a[1] as f32 + 0.114 * a[2] as f32 + 0.01;
            let mut by = 0.299 * b[0] as f32 + 0.587 * b[1] as f32 + 0.114 * b[2] as f32 + 0.01;
            if nb_chans == 4 {
                ay *= a[3] as f32;
                by *= b[3] as f32;
            }
            ay.partial_cmp(&by).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut lookup = vec![0i16; PALETTE_HASH_SIZE];
        for &entry in &entries {
            if entry == 0 {
                break;
            }
            lookup[pixel_hash(entry) as usize] = num_colors as i16;
            num_colors += 1;
        }

        Some(Palette {
            entries,
            lookup,
            num_colors,
        })
    }
}

/// An accepted palette: entries sorted by perceived luminance, the hash
/// lookup mapping pixel values to palette indices, and the color count
/// including the reserved zero entry.
pub struct Palette {
    pub entries: Vec<u32>,
    pub lookup: Vec<i16>,
    pub num_colors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_maps_zero_to_zero() {
        assert_eq!(pixel_hash(0), 0);
        assert!(pixel_hash(0x0102_0304) < PALETTE_HASH_SIZE as u32);
    }

    fn rgba_row(colors: &[[u8; 4]]) -> Vec<u8> {
        colors.iter().flatten().copied().collect()
    }

    #[test]
    fn test_small_rgba_palette_accepted() {
        let mut detector = PaletteDetector::new();
        let colors = [
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [255, 255, 0, 255],
        ];
        let row = rgba_row(&colors);
        assert!(!detector.add_row(&row, colors.len(), 4));
        let palette = detector.build(4).expect("palette should be accepted");
        // Four distinct colors plus the implicit zero slot.
        assert_eq!(palette.num_colors, 1 + colors.len());
        // Sorted by alpha-weighted luminance: blue < red < green-ish.
        let lumas: Vec<f32> = palette
            .entries
            .iter()
            .map(|&e| {
                let p = e.to_le_bytes();
                (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32 + 0.01)
                    * p[3] as f32
            })
            .collect();
        assert!(lumas.windows(2).all(|w| w[0] <= w[1]));
        // Lookup resolves every entry to its 1-based index.
        for (i, &entry) in palette.entries.iter().enumerate() {
            assert_eq!(palette.lookup[pixel_hash(entry) as usize], (i + 1) as i16);
        }
    }

    #[test]
    fn test_gray_ramp_rgb_rejected() {
        // A dense grayscale ramp in RGB form: every entry has r == g == b,
        // spread 127 < 128 * 1.4, so palette coding is refused.
        let mut detector = PaletteDetector::new();
        let colors: Vec<[u8; 4]> = (1..=128u8).map(|v| [v, v, v, 255]).collect();
        detector.add_row(&rgba_row(&colors), colors.len(), 4);
        assert!(detector.build(4).is_none());
    }

    #[test]
    fn test_gray_single_channel_ramp_accepted() {
        // Single-channel entries carry zeros in bytes 1-3, so the gray
        // heuristic sees them as colored and keeps the palette.
        let mut detector = PaletteDetector::new();
        let row: Vec<u8> = (0..=255u8).collect();
        detector.add_row(&row, row.len(), 1);
        let palette = detector.build(1).expect("gray ramp palette");
        assert_eq!(palette.num_colors, 256);
    }

    #[test]
    fn test_too_many_colors_rejected() {
        let mut detector = PaletteDetector::new();
        // 600 distinct colors exceeds the 512-entry cap (unless the hash
        // collides first, which also rejects).
        let colors: Vec<[u8; 4]> = (0..600u32)
            .map(|i| [(i % 256) as u8, (i / 256) as u8 + 1, 7, 255])
            .collect();
        detector.add_row(&rgba_row(&colors), colors.len(), 4);
        assert!(detector.build(4).is_none());
    }

    #[test]
    fn test_collision_detection() {
        let mut detector = PaletteDetector::new();
        // Two distinct pixel values that map to the same hash slot.
        let a = 1u32;
        let target = pixel_hash(a);
        let mut b = 2u32;
        while pixel_hash(b) != target {
            b += 1;
        }
        let row_a = a.to_le_bytes();
        let row_b = b.to_le_bytes();
        assert!(!detector.add_row(&row_a, 1, 4));
        assert!(detector.add_row(&row_b, 1, 4));
        assert!(detector.build(4).is_none());
    }
}
