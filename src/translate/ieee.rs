//! Endian handling for the two IEEE formats.
//!
//! Integers are 4-byte two's complement words and doubles are IEEE-754 binary64 in both
//! `BIG-IEEE` and `LTL-IEEE`; the formats only differ in byte order. Translating between
//! them is therefore a byte reversal of every word, skipped entirely when the file format
//! already matches the platform.
//!
//! Callers are expected to have checked buffer lengths; every function here processes
//! `min(input, output)` elements.

use crate::{
    binary_format::BinaryFormat,
    constants::{DOUBLE_WIDTH, INTEGER_WIDTH},
};

pub(crate) fn decode_integers(source: BinaryFormat, input: &[u8], output: &mut [i32]) {
    let swap = !source.is_native();
    for (chunk, value) in input.chunks_exact(INTEGER_WIDTH).zip(output.iter_mut()) {
        let mut word = [0u8; INTEGER_WIDTH];
        word.copy_from_slice(chunk);
        let raw = u32::from_ne_bytes(word);
        *value = if swap { raw.swap_bytes() } else { raw } as i32;
    }
}

pub(crate) fn encode_integers(target: BinaryFormat, values: &[i32], output: &mut [u8]) {
    let swap = !target.is_native();
    for (value, chunk) in values.iter().zip(output.chunks_exact_mut(INTEGER_WIDTH)) {
        let raw = *value as u32;
        let raw = if swap { raw.swap_bytes() } else { raw };
        chunk.copy_from_slice(&raw.to_ne_bytes());
    }
}

pub(crate) fn decode_doubles(source: BinaryFormat, input: &[u8], output: &mut [f64]) {
    let swap = !source.is_native();
    for (chunk, value) in input.chunks_exact(DOUBLE_WIDTH).zip(output.iter_mut()) {
        let mut word = [0u8; DOUBLE_WIDTH];
        word.copy_from_slice(chunk);
        let raw = u64::from_ne_bytes(word);
        *value = f64::from_bits(if swap { raw.swap_bytes() } else { raw });
    }
}

pub(crate) fn encode_doubles(target: BinaryFormat, values: &[f64], output: &mut [u8]) {
    let swap = !target.is_native();
    for (value, chunk) in values.iter().zip(output.chunks_exact_mut(DOUBLE_WIDTH)) {
        let raw = value.to_bits();
        let raw = if swap { raw.swap_bytes() } else { raw };
        chunk.copy_from_slice(&raw.to_ne_bytes());
    }
}
