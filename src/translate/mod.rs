//! Byte translation between the supported binary file formats and native values.
//!
//! The functions in this module are pure: they read a caller-supplied byte buffer and fill a
//! caller-supplied output buffer. Two directions are provided:
//!
//! * **decode** ([`translate_integers`], [`translate_doubles`]): bytes in a file format →
//!   native `i32` / `f64`;
//! * **encode** ([`encode_integers`], [`encode_doubles`]): native values → bytes in a file
//!   format.
//!
//! # Supported conversions
//!
//! | Format     | Integers            | Doubles                               |
//! |------------|---------------------|---------------------------------------|
//! | `BIG-IEEE` | byte reversal / id. | byte reversal / identity              |
//! | `LTL-IEEE` | byte reversal / id. | byte reversal / identity              |
//! | `VAX-GFLT` | rejected            | bit-field conversion (module `vax`)  |
//! | `VAX-DFLT` | rejected            | bit-field conversion (module `vax`)  |
//!
//! # Failure atomicity
//!
//! Every argument and every value is validated before the output buffer is touched: when an
//! error is returned, the output holds exactly what it held before the call.
//!
//! # Example
//! ```rust
//! use dafdas::binary_format::BinaryFormat;
//! use dafdas::translate::{encode_doubles, translate_doubles};
//!
//! let mut bytes = [0u8; 16];
//! encode_doubles(BinaryFormat::VaxGfloat, &[1.0, -2.5], &mut bytes).unwrap();
//!
//! let mut values = [0.0f64; 2];
//! translate_doubles(BinaryFormat::VaxGfloat, &bytes, 2, &mut values).unwrap();
//! assert_eq!(values, [1.0, -2.5]);
//! ```

mod ieee;
mod vax;

use tracing::trace;

use crate::{
    binary_format::{BinaryFormat, FloatLayout},
    constants::{DOUBLE_WIDTH, INTEGER_WIDTH},
    dafdas_errors::{DafDasError, Result},
};

/// Number of bytes needed for `count` elements of `width` bytes.
fn required_bytes(count: usize, width: usize) -> Result<usize> {
    count
        .checked_mul(width)
        .ok_or(DafDasError::InsufficientInputBuffer {
            needed: usize::MAX,
            available: 0,
        })
}

fn check_input(input: &[u8], needed: usize) -> Result<()> {
    if input.len() < needed {
        return Err(DafDasError::InsufficientInputBuffer {
            needed,
            available: input.len(),
        });
    }
    Ok(())
}

fn check_output(available: usize, needed: usize) -> Result<()> {
    if available < needed {
        return Err(DafDasError::InsufficientOutputSpace { needed, available });
    }
    Ok(())
}

fn reject_vax_integers(format: BinaryFormat, operation: &'static str) -> Result<()> {
    if format.is_vax() {
        return Err(DafDasError::UnsupportedBinaryFormat { format, operation });
    }
    Ok(())
}

/// Decode `count` four-byte integers encoded in `source` into native values.
///
/// Arguments
/// -----------------
/// * `source`: Format the bytes are encoded in. Only `BIG-IEEE` and `LTL-IEEE` are accepted.
/// * `input`: Encoded bytes; at least `count * 4` long.
/// * `count`: Number of integers to translate.
/// * `output`: Destination; at least `count` long. Elements past `count` are left untouched.
///
/// Return
/// ----------
/// * `Ok(())` on success, or
///   [`DafDasError::UnsupportedBinaryFormat`] for VAX formats,
///   [`DafDasError::InsufficientInputBuffer`] when `input` is too short,
///   [`DafDasError::InsufficientOutputSpace`] when `output` is too short.
///
/// See also
/// ------------
/// * [`encode_integers`] – The write direction.
pub fn translate_integers(
    source: BinaryFormat,
    input: &[u8],
    count: usize,
    output: &mut [i32],
) -> Result<()> {
    reject_vax_integers(source, "integer translation")?;
    check_input(input, required_bytes(count, INTEGER_WIDTH)?)?;
    check_output(output.len(), count)?;

    trace!(%source, count, "translating integers");
    ieee::decode_integers(source, &input[..count * INTEGER_WIDTH], &mut output[..count]);
    Ok(())
}

/// Decode `count` doubles encoded in `source` into native values.
///
/// Arguments
/// -----------------
/// * `source`: Format the bytes are encoded in; any supported format.
/// * `input`: Encoded bytes; at least `count * 8` long.
/// * `count`: Number of doubles to translate.
/// * `output`: Destination; at least `count` long.
///
/// Return
/// ----------
/// * `Ok(())` on success, or
///   [`DafDasError::InsufficientInputBuffer`], [`DafDasError::InsufficientOutputSpace`],
///   [`DafDasError::ReservedOperand`] when VAX data holds a reserved operand.
///
/// See also
/// ------------
/// * [`encode_doubles`] – The write direction.
/// * Module `vax` – Field layouts of the VAX formats.
pub fn translate_doubles(
    source: BinaryFormat,
    input: &[u8],
    count: usize,
    output: &mut [f64],
) -> Result<()> {
    check_input(input, required_bytes(count, DOUBLE_WIDTH)?)?;
    check_output(output.len(), count)?;

    trace!(%source, count, "translating doubles");
    let input = &input[..count * DOUBLE_WIDTH];
    let converter: fn(u64) -> Option<u64> = match source.float_layout() {
        FloatLayout::Ieee754 => {
            ieee::decode_doubles(source, input, &mut output[..count]);
            return Ok(());
        }
        FloatLayout::VaxG => vax::gfloat_to_ieee,
        FloatLayout::VaxD => vax::dfloat_to_ieee,
    };

    let mut decoded = Vec::with_capacity(count);
    for (index, chunk) in input.chunks_exact(DOUBLE_WIDTH).enumerate() {
        let (_, bits) = vax::vax_word_bits(chunk)?;
        let ieee = converter(bits).ok_or(DafDasError::ReservedOperand {
            format: source,
            index,
        })?;
        decoded.push(f64::from_bits(ieee));
    }
    output[..count].copy_from_slice(&decoded);
    Ok(())
}

/// Encode native integers into `target` format.
///
/// Arguments
/// -----------------
/// * `target`: Destination format; `BIG-IEEE` or `LTL-IEEE`.
/// * `values`: Integers to encode.
/// * `output`: Destination bytes; at least `values.len() * 4` long.
///
/// Return
/// ----------
/// * `Ok(())`, or [`DafDasError::UnsupportedBinaryFormat`] /
///   [`DafDasError::InsufficientOutputSpace`].
pub fn encode_integers(target: BinaryFormat, values: &[i32], output: &mut [u8]) -> Result<()> {
    reject_vax_integers(target, "integer translation")?;
    check_output(output.len(), values.len() * INTEGER_WIDTH)?;

    ieee::encode_integers(target, values, output);
    Ok(())
}

/// Encode native doubles into `target` format.
///
/// Arguments
/// -----------------
/// * `target`: Destination format; any supported format.
/// * `values`: Doubles to encode.
/// * `output`: Destination bytes; at least `values.len() * 8` long.
///
/// Return
/// ----------
/// * `Ok(())`, or [`DafDasError::InsufficientOutputSpace`], or
///   [`DafDasError::NotRepresentable`] when a value (NaN, infinity, out of exponent range)
///   has no encoding in a VAX format.
pub fn encode_doubles(target: BinaryFormat, values: &[f64], output: &mut [u8]) -> Result<()> {
    check_output(output.len(), values.len() * DOUBLE_WIDTH)?;

    let converter: fn(u64) -> Option<u64> = match target.float_layout() {
        FloatLayout::Ieee754 => {
            ieee::encode_doubles(target, values, output);
            return Ok(());
        }
        FloatLayout::VaxG => vax::ieee_to_gfloat,
        FloatLayout::VaxD => vax::ieee_to_dfloat,
    };

    let encoded = values
        .iter()
        .map(|value| {
            converter(value.to_bits()).ok_or(DafDasError::NotRepresentable {
                value: *value,
                format: target,
            })
        })
        .collect::<Result<Vec<u64>>>()?;

    for (bits, chunk) in encoded.into_iter().zip(output.chunks_exact_mut(DOUBLE_WIDTH)) {
        chunk.copy_from_slice(&vax::vax_bits_to_bytes(bits));
    }
    Ok(())
}

#[cfg(test)]
mod test_translate {
    use super::*;

    const NATIVE: BinaryFormat = BinaryFormat::native();

    fn non_native() -> BinaryFormat {
        match NATIVE {
            BinaryFormat::BigIeee => BinaryFormat::LtlIeee,
            _ => BinaryFormat::BigIeee,
        }
    }

    #[test]
    fn test_integer_boundary_patterns() {
        let values = [1, i32::MAX, i32::MIN, 0, -1];

        let mut big = [0u8; 20];
        for (value, chunk) in values.iter().zip(big.chunks_exact_mut(4)) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        let mut out = [0i32; 5];
        translate_integers(BinaryFormat::BigIeee, &big, 5, &mut out).unwrap();
        assert_eq!(out, values);

        let mut little = [0u8; 20];
        for (value, chunk) in values.iter().zip(little.chunks_exact_mut(4)) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        let mut out = [0i32; 5];
        translate_integers(BinaryFormat::LtlIeee, &little, 5, &mut out).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn test_one_is_byte_reversed_between_formats() {
        let mut encoded = [0u8; 4];
        encode_integers(non_native(), &[1], &mut encoded).unwrap();
        assert_eq!(u32::from_ne_bytes(encoded), 1u32.swap_bytes());

        encode_integers(NATIVE, &[1], &mut encoded).unwrap();
        assert_eq!(u32::from_ne_bytes(encoded), 1);
    }

    #[test]
    fn test_vax_integers_rejected() {
        let mut out = [0i32; 1];
        for format in [BinaryFormat::VaxGfloat, BinaryFormat::VaxDfloat] {
            assert!(matches!(
                translate_integers(format, &[0; 4], 1, &mut out),
                Err(DafDasError::UnsupportedBinaryFormat { .. })
            ));
            assert!(matches!(
                encode_integers(format, &[7], &mut [0u8; 4]),
                Err(DafDasError::UnsupportedBinaryFormat { .. })
            ));
        }
    }

    #[test]
    fn test_short_buffers() {
        let mut out = [0i32; 2];
        assert!(matches!(
            translate_integers(BinaryFormat::BigIeee, &[0; 7], 2, &mut out),
            Err(DafDasError::InsufficientInputBuffer {
                needed: 8,
                available: 7
            })
        ));
        assert!(matches!(
            translate_integers(BinaryFormat::BigIeee, &[0; 8], 2, &mut out[..1]),
            Err(DafDasError::InsufficientOutputSpace {
                needed: 2,
                available: 1
            })
        ));

        let mut doubles = [0.0f64; 1];
        assert!(matches!(
            translate_doubles(BinaryFormat::VaxDfloat, &[0; 15], 2, &mut doubles),
            Err(DafDasError::InsufficientInputBuffer { .. })
        ));
        assert!(matches!(
            translate_doubles(BinaryFormat::LtlIeee, &[0; 16], 2, &mut doubles),
            Err(DafDasError::InsufficientOutputSpace { .. })
        ));
        assert!(matches!(
            encode_doubles(BinaryFormat::BigIeee, &[1.0, 2.0], &mut [0u8; 12]),
            Err(DafDasError::InsufficientOutputSpace { .. })
        ));
    }

    #[test]
    fn test_count_limits_work() {
        let mut out = [-9i32; 3];
        translate_integers(BinaryFormat::BigIeee, &[0, 0, 0, 4, 0, 0, 0, 5], 1, &mut out).unwrap();
        assert_eq!(out, [4, -9, -9]);
    }

    #[test]
    fn test_reserved_operand_leaves_output_untouched() {
        let mut input = [0u8; 16];
        input[..8].copy_from_slice(&vax::vax_bits_to_bytes(0x4080_0000_0000_0000));
        input[8..].copy_from_slice(&[0x00, 0x80, 0, 0, 0, 0, 0, 0]);

        let mut out = [7.0f64; 2];
        let err = translate_doubles(BinaryFormat::VaxDfloat, &input, 2, &mut out).unwrap_err();
        assert!(matches!(err, DafDasError::ReservedOperand { index: 1, .. }));
        assert_eq!(out, [7.0, 7.0]);
    }

    #[test]
    fn test_not_representable_leaves_output_untouched() {
        let mut out = [0xAAu8; 16];
        let err = encode_doubles(BinaryFormat::VaxGfloat, &[1.0, f64::NAN], &mut out).unwrap_err();
        assert!(matches!(err, DafDasError::NotRepresentable { .. }));
        assert_eq!(out, [0xAA; 16]);
    }

    #[test]
    fn test_vax_doubles_both_directions() {
        let values = [1.0, -2.5, 3.0e10, -1.0e-20, 0.0];
        for format in [BinaryFormat::VaxGfloat, BinaryFormat::VaxDfloat] {
            let mut bytes = [0u8; 40];
            encode_doubles(format, &values, &mut bytes).unwrap();
            let mut back = [0.0f64; 5];
            translate_doubles(format, &bytes, 5, &mut back).unwrap();
            assert_eq!(back, values, "round trip through {format}");
        }
    }

    #[test]
    fn test_known_vax_bytes() {
        let mut out = [0.0f64; 1];
        translate_doubles(
            BinaryFormat::VaxDfloat,
            &[0x80, 0x40, 0, 0, 0, 0, 0, 0],
            1,
            &mut out,
        )
        .unwrap();
        assert_eq!(out[0], 1.0);

        translate_doubles(
            BinaryFormat::VaxGfloat,
            &[0x24, 0xC0, 0, 0, 0, 0, 0, 0],
            1,
            &mut out,
        )
        .unwrap();
        assert_eq!(out[0], -2.5);
    }
}
