#![allow(dead_code)]

use std::fs;

use dafdas::{
    constants::{RawRecord, RECORD_BYTES},
    file_record::{set_daf_summary_sizes, FileRecord},
    translate::encode_doubles,
    Architecture, BinaryFormat,
};
use tempfile::TempDir;

/// VAX G-float encodings of 1.0 and -2.5.
pub const VAX_G_ONE: [u8; 8] = [0x10, 0x40, 0, 0, 0, 0, 0, 0];
pub const VAX_G_MINUS_2_5: [u8; 8] = [0x24, 0xC0, 0, 0, 0, 0, 0, 0];
/// VAX D-float encodings of 1.0 and -2.5.
pub const VAX_D_ONE: [u8; 8] = [0x80, 0x40, 0, 0, 0, 0, 0, 0];
pub const VAX_D_MINUS_2_5: [u8; 8] = [0x20, 0xC1, 0, 0, 0, 0, 0, 0];

/// Path of `file` inside `dir`, as the `&str` the manager takes.
pub fn path_in(dir: &TempDir, file: &str) -> String {
    dir.path()
        .join(file)
        .to_str()
        .expect("temporary paths are UTF-8")
        .to_string()
}

/// The IEEE format this machine does not use.
pub fn foreign_ieee() -> BinaryFormat {
    match BinaryFormat::native() {
        BinaryFormat::BigIeee => BinaryFormat::LtlIeee,
        _ => BinaryFormat::BigIeee,
    }
}

/// File record of a DAF or DAS file in `format`, with `ND = 2`, `NI = 6` for DAFs.
pub fn file_record(architecture: Architecture, format: BinaryFormat) -> RawRecord {
    let mut record = FileRecord::stamp(architecture, format, "SYNTHETIC");
    if architecture == Architecture::Daf && !format.is_vax() {
        set_daf_summary_sizes(&mut record, format, 2, 6).unwrap();
    }
    record
}

/// Write a file made of `first` followed by the `data` records.
pub fn write_file(path: &str, first: &RawRecord, data: &[RawRecord]) {
    let mut bytes = Vec::with_capacity(RECORD_BYTES * (data.len() + 1));
    bytes.extend_from_slice(first);
    for record in data {
        bytes.extend_from_slice(record);
    }
    fs::write(path, bytes).unwrap();
}

/// Synthetic file whose record 2 holds `values` encoded in `format`.
pub fn write_double_file(
    path: &str,
    architecture: Architecture,
    format: BinaryFormat,
    values: &[f64],
) {
    let mut data = [0u8; RECORD_BYTES];
    encode_doubles(format, values, &mut data[..values.len() * 8]).unwrap();
    write_file(path, &file_record(architecture, format), &[data]);
}

/// Record whose leading doubles are the given 8-byte words.
pub fn record_from_words(words: &[[u8; 8]]) -> RawRecord {
    let mut record = [0u8; RECORD_BYTES];
    for (chunk, word) in record.chunks_exact_mut(8).zip(words) {
        chunk.copy_from_slice(word);
    }
    record
}
