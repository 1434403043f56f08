//! VAX G-float and D-float conversion to and from IEEE-754 binary64.
//!
//! A VAX double occupies eight bytes stored as four little-endian 16-bit words, most
//! significant word first. Once the words are reassembled into a `u64` the logical fields
//! are:
//!
//! ```text
//!            63  62 ........... 52 51 ................................ 0
//! G-float:  [ s |  exponent (11)   |          fraction (52)             ]
//!            63  62 ..... 55 54 ...................................... 0
//! D-float:  [ s | exp (8)    |             fraction (55)                ]
//! ```
//!
//! The value is `0.1f × 2^(e − bias)` (hidden bit *before* the fraction, bias 1024 for G,
//! 128 for D), while IEEE stores `1.f × 2^(e − 1023)`. Hence:
//!
//! * G → IEEE: same field widths, exponent shifted by 2; the two smallest G exponents land
//!   in the IEEE subnormal range.
//! * D → IEEE: exponent shifted by 894, three fraction bits dropped (rounded half to even).
//!
//! A zero exponent with a clear sign bit is zero whatever the fraction; with the sign bit set
//! it is a *reserved operand* and has no IEEE counterpart.

use nom::{number::complete::le_u16, sequence::tuple, IResult};

const SIGN_MASK: u64 = 1 << 63;

const IEEE_EXP_SHIFT: u32 = 52;
const IEEE_EXP_MASK: u64 = 0x7FF;
const IEEE_FRAC_MASK: u64 = (1 << 52) - 1;
const IEEE_HIDDEN_BIT: u64 = 1 << 52;

const G_EXP_SHIFT: u32 = 52;
const G_EXP_MASK: u64 = 0x7FF;
const G_FRAC_MASK: u64 = (1 << 52) - 1;
/// VAX G exponent minus IEEE exponent for the same value.
const G_EXP_OFFSET: i64 = 2;

const D_EXP_SHIFT: u32 = 55;
const D_EXP_MASK: u64 = 0xFF;
const D_FRAC_MASK: u64 = (1 << 55) - 1;
/// IEEE exponent minus VAX D exponent for the same value.
const D_EXP_OFFSET: i64 = 894;
/// Fraction bits D-float carries beyond IEEE.
const D_EXTRA_FRAC_BITS: u32 = 3;

/// Reassemble the four PDP-ordered words of a VAX double into its logical bit pattern.
pub(crate) fn vax_word_bits(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, (w0, w1, w2, w3)) = tuple((le_u16, le_u16, le_u16, le_u16))(input)?;
    let bits =
        (u64::from(w0) << 48) | (u64::from(w1) << 32) | (u64::from(w2) << 16) | u64::from(w3);
    Ok((input, bits))
}

/// Inverse of [`vax_word_bits`].
pub(crate) fn vax_bits_to_bytes(bits: u64) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, chunk) in out.chunks_exact_mut(2).enumerate() {
        let word = (bits >> (48 - 16 * i)) as u16;
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Shift `value` right by `shift` bits, rounding half to even.
fn round_shift_right(value: u64, shift: u32) -> u64 {
    if shift == 0 {
        return value;
    }
    let kept = value >> shift;
    let rem = value & ((1 << shift) - 1);
    let half = 1 << (shift - 1);
    if rem > half || (rem == half && kept & 1 == 1) {
        kept + 1
    } else {
        kept
    }
}

/// Convert a VAX G-float bit pattern to IEEE bits; `None` for a reserved operand.
pub(crate) fn gfloat_to_ieee(bits: u64) -> Option<u64> {
    let sign = bits & SIGN_MASK;
    let exp = (bits >> G_EXP_SHIFT) & G_EXP_MASK;
    let frac = bits & G_FRAC_MASK;

    if exp == 0 {
        return if sign == 0 { Some(0) } else { None };
    }

    let ieee_exp = exp as i64 - G_EXP_OFFSET;
    if ieee_exp >= 1 {
        return Some(sign | ((ieee_exp as u64) << IEEE_EXP_SHIFT) | frac);
    }

    // Subnormal result. A carry out of the rounding lands on the smallest normal number,
    // whose bit pattern is exactly the carried mantissa.
    let shift = (1 - ieee_exp) as u32;
    Some(sign | round_shift_right(IEEE_HIDDEN_BIT | frac, shift))
}

/// Convert IEEE bits to a VAX G-float bit pattern; `None` if the value has no G counterpart.
pub(crate) fn ieee_to_gfloat(bits: u64) -> Option<u64> {
    let sign = bits & SIGN_MASK;
    let exp = (bits >> IEEE_EXP_SHIFT) & IEEE_EXP_MASK;
    let frac = bits & IEEE_FRAC_MASK;

    if exp == IEEE_EXP_MASK {
        return None;
    }
    if exp == 0 {
        if frac == 0 {
            // VAX has no negative zero.
            return Some(0);
        }
        let top = 63 - frac.leading_zeros();
        let vax_exp = i64::from(top) - 49;
        if vax_exp < 1 {
            return None;
        }
        let normalized = (frac << (52 - top)) & G_FRAC_MASK;
        return Some(sign | ((vax_exp as u64) << G_EXP_SHIFT) | normalized);
    }

    let vax_exp = exp + G_EXP_OFFSET as u64;
    if vax_exp > G_EXP_MASK {
        return None;
    }
    Some(sign | (vax_exp << G_EXP_SHIFT) | frac)
}

/// Convert a VAX D-float bit pattern to IEEE bits; `None` for a reserved operand.
pub(crate) fn dfloat_to_ieee(bits: u64) -> Option<u64> {
    let sign = bits & SIGN_MASK;
    let exp = (bits >> D_EXP_SHIFT) & D_EXP_MASK;
    let frac = bits & D_FRAC_MASK;

    if exp == 0 {
        return if sign == 0 { Some(0) } else { None };
    }

    let mut ieee_exp = exp + D_EXP_OFFSET as u64;
    let mut mantissa = round_shift_right(frac, D_EXTRA_FRAC_BITS);
    if mantissa == IEEE_HIDDEN_BIT {
        mantissa = 0;
        ieee_exp += 1;
    }
    Some(sign | (ieee_exp << IEEE_EXP_SHIFT) | mantissa)
}

/// Convert IEEE bits to a VAX D-float bit pattern; `None` if the value has no D counterpart.
pub(crate) fn ieee_to_dfloat(bits: u64) -> Option<u64> {
    let sign = bits & SIGN_MASK;
    let exp = (bits >> IEEE_EXP_SHIFT) & IEEE_EXP_MASK;
    let frac = bits & IEEE_FRAC_MASK;

    if exp == IEEE_EXP_MASK {
        return None;
    }
    if exp == 0 {
        return if frac == 0 { Some(0) } else { None };
    }

    let vax_exp = exp as i64 - D_EXP_OFFSET;
    if !(1..=D_EXP_MASK as i64).contains(&vax_exp) {
        return None;
    }
    Some(sign | ((vax_exp as u64) << D_EXP_SHIFT) | (frac << D_EXTRA_FRAC_BITS))
}

#[cfg(test)]
mod test_vax {
    use super::*;

    #[test]
    fn test_word_order() {
        let bytes = [0x10, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let (_, bits) = vax_word_bits(&bytes).unwrap();
        assert_eq!(bits, 0x4010_0000_0000_0000);
        assert_eq!(vax_bits_to_bytes(bits), bytes);

        let (_, bits) = vax_word_bits(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(bits, 0x0201_0403_0605_0807);
        assert_eq!(vax_bits_to_bytes(bits), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_gfloat_known_values() {
        assert_eq!(ieee_to_gfloat(1.0f64.to_bits()), Some(0x4010_0000_0000_0000));
        assert_eq!(ieee_to_gfloat((-2.5f64).to_bits()), Some(0xC024_0000_0000_0000));
        assert_eq!(gfloat_to_ieee(0x4010_0000_0000_0000), Some(1.0f64.to_bits()));
    }

    #[test]
    fn test_dfloat_known_values() {
        assert_eq!(ieee_to_dfloat(1.0f64.to_bits()), Some(0x4080_0000_0000_0000));
        assert_eq!(ieee_to_dfloat((-2.5f64).to_bits()), Some(0xC120_0000_0000_0000));
        assert_eq!(dfloat_to_ieee(0xC120_0000_0000_0000), Some((-2.5f64).to_bits()));
    }

    #[test]
    fn test_dfloat_rounding_half_even() {
        let one = 0x4080_0000_0000_0000u64;
        // tie with an even kept fraction stays put
        assert_eq!(dfloat_to_ieee(one | 0b0100), Some(1.0f64.to_bits()));
        // above the tie rounds up
        assert_eq!(dfloat_to_ieee(one | 0b0101), Some(1.0f64.to_bits() + 1));
        // tie with an odd kept fraction rounds to even
        assert_eq!(dfloat_to_ieee(one | 0b1100), Some(1.0f64.to_bits() + 2));
        // carry out of the fraction bumps the exponent
        assert_eq!(dfloat_to_ieee(one | D_FRAC_MASK), Some(2.0f64.to_bits()));
    }

    #[test]
    fn test_gfloat_subnormal_range() {
        let tiny = f64::from_bits(1 << 51);
        let g = ieee_to_gfloat(tiny.to_bits()).unwrap();
        assert_eq!((g >> G_EXP_SHIFT) & G_EXP_MASK, 2);
        assert_eq!(gfloat_to_ieee(g), Some(tiny.to_bits()));

        let smaller = f64::from_bits((1 << 50) | 3);
        let g = ieee_to_gfloat(smaller.to_bits()).unwrap();
        assert_eq!((g >> G_EXP_SHIFT) & G_EXP_MASK, 1);
        assert_eq!(gfloat_to_ieee(g), Some(smaller.to_bits()));

        // below 2^-1025 there is no G-float
        assert_eq!(ieee_to_gfloat(f64::from_bits((1 << 49) | 1).to_bits()), None);
    }

    #[test]
    fn test_zero_and_reserved_operand() {
        assert_eq!(gfloat_to_ieee(0), Some(0));
        assert_eq!(dfloat_to_ieee(0x0000_1234_0000_0000), Some(0));
        assert_eq!(gfloat_to_ieee(SIGN_MASK), None);
        assert_eq!(dfloat_to_ieee(SIGN_MASK | 7), None);
        assert_eq!(ieee_to_gfloat((-0.0f64).to_bits()), Some(0));
        assert_eq!(ieee_to_dfloat((-0.0f64).to_bits()), Some(0));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(ieee_to_gfloat(f64::MAX.to_bits()), None);
        assert_eq!(ieee_to_gfloat(f64::INFINITY.to_bits()), None);
        assert_eq!(ieee_to_dfloat(f64::NAN.to_bits()), None);
        assert_eq!(ieee_to_dfloat(1e39f64.to_bits()), None);
        assert_eq!(ieee_to_dfloat(1e-40f64.to_bits()), None);
        assert!(ieee_to_dfloat(1e38f64.to_bits()).is_some());
        assert!(ieee_to_gfloat(1e300f64.to_bits()).is_some());
    }
}
