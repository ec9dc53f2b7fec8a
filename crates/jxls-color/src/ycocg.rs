//! Forward YCoCg transform
//!
//! The integer YCoCg used by the reversible color transform record. The
//! decoder inverts it exactly; the shift placement below is part of that
//! contract and must not be rearranged.

use std::ops::Shr;

use num_traits::{WrappingAdd, WrappingSub};

/// Converts one RGB sample to (Y, Co, Cg) in the pixel's own width.
#[inline]
pub fn forward_ycocg<P>(r: P, g: P, b: P) -> (P, P, P)
where
    P: Copy + WrappingAdd + WrappingSub + Shr<u32, Output = P>,
{
    let co = r.wrapping_sub(&b);
    let tmp = b.wrapping_add(&(co >> 1));
    let cg = g.wrapping_sub(&tmp);
    let y = tmp.wrapping_add(&(cg >> 1));
    (y, co, cg)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The decoder-side inverse, for round-trip checking only.
    fn inverse_ycocg(y: i16, co: i16, cg: i16) -> (i16, i16, i16) {
        let tmp = y.wrapping_sub(cg >> 1);
        let g = cg.wrapping_add(tmp);
        let b = tmp.wrapping_sub(co >> 1);
        let r = co.wrapping_add(b);
        (r, g, b)
    }

    #[test]
    fn test_known_values() {
        assert_eq!(forward_ycocg(0i16, 0, 0), (0, 0, 0));
        assert_eq!(forward_ycocg(255i16, 255, 255), (255, 0, 0));
        // Pure red: Co = 255, tmp = 127, Cg = -127, Y = 127 + (-127 >> 1) = 63.
        assert_eq!(forward_ycocg(255i16, 0, 0), (63, 255, -127));
    }

    #[test]
    fn test_round_trip_8bit() {
        for r in (0..=255i16).step_by(5) {
            for g in (0..=255i16).step_by(7) {
                for b in (0..=255i16).step_by(11) {
                    let (y, co, cg) = forward_ycocg(r, g, b);
                    assert_eq!(inverse_ycocg(y, co, cg), (r, g, b));
                }
            }
        }
    }

    #[test]
    fn test_round_trip_16bit() {
        for r in (0..=65535i32).step_by(4099) {
            for g in (0..=65535i32).step_by(5101) {
                for b in (0..=65535i32).step_by(6007) {
                    let (y, co, cg) = forward_ycocg(r, g, b);
                    let tmp = y.wrapping_sub(cg >> 1);
                    let gd = cg.wrapping_add(tmp);
                    let bd = tmp.wrapping_sub(co >> 1);
                    let rd = co.wrapping_add(bd);
                    assert_eq!((rd, gd, bd), (r, g, b));
                }
            }
        }
    }
}
