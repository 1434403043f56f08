//! File record (first 1024-byte record) parsing and stamping for DAF and DAS files.
//!
//! The first record of every managed file identifies it. This module reads the fields the
//! handle manager needs to accept a file, and writes them for files it creates.
//!
//! # What the file record contains
//!
//! * **ID word** (bytes 0..8): `"DAF/xxxx"` or `"DAS/xxxx"`, where `xxxx` names the kernel
//!   type (`SPK`, `CK`, `EK`, ...). Old files carry `"NAIF/DAF"` / `"NAIF/DAS"`.
//! * **Internal file name** (60 bytes, blank padded).
//! * Architecture-specific integer fields (DAF: `ND`, `NI`, `FWARD`, `BWARD`, `FREE`;
//!   DAS: reserved and comment record/character counts).
//! * **Format tag** (8 bytes): `"BIG-IEEE"`, `"LTL-IEEE"`, `"VAX-GFLT"`, `"VAX-DFLT"`, or
//!   blank in files written before the tag existed.
//! * **FTP validation string** (28 bytes): a fixed byte sequence mixing carriage returns,
//!   line feeds, NUL and 8-bit characters. A file moved by an ASCII-mode transfer no longer
//!   carries it intact.
//!
//! | Field         | DAF offset | DAS offset |
//! |---------------|------------|------------|
//! | ID word       | 0          | 0          |
//! | internal name | 16         | 8          |
//! | format tag    | 88         | 84         |
//! | FTP string    | 699        | 695        |
//!
//! # Blank format tags
//!
//! A DAF without a tag is read with whichever byte order makes `ND` and `NI` plausible
//! (`0 ≤ ND ≤ 124`, `2 ≤ NI ≤ 250`, summary no longer than 125 words), the native order
//! winning ties. A DAS without a tag is assumed native.
//!
//! # See also
//! ------------
//! * [`FileRecord::parse`] – Decoder used by the handle manager on every READ/WRITE open.
//! * [`FileRecord::stamp`] – Encoder used when a NEW file is created.

use std::fmt;

use camino::Utf8Path;
use nom::{bytes::complete::take, IResult};
use tracing::warn;

use crate::{
    binary_format::{Architecture, BinaryFormat},
    constants::{
        RawRecord, DAF_FORMAT_OFFSET, DAF_FTP_OFFSET, DAS_FORMAT_OFFSET, DAS_FTP_OFFSET,
        FORMAT_TAG_LEN, FTP_MARKER, FTP_STRING, ID_WORD_LEN, INTERNAL_NAME_LEN, RECORD_BYTES,
    },
    dafdas_errors::{DafDasError, Result},
    translate::{encode_integers, translate_integers},
};

/// Byte offset of the internal name in a DAF file record.
const DAF_NAME_OFFSET: usize = 16;
/// Largest `ND` a DAF summary may declare.
const DAF_MAX_ND: i32 = 124;
/// Smallest and largest `NI` a DAF summary may declare.
const DAF_MIN_NI: i32 = 2;
const DAF_MAX_NI: i32 = 250;
/// Longest summary, in double precision words.
const DAF_MAX_SUMMARY_WORDS: i32 = 125;

/// Outcome of the FTP validation string check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpStatus {
    /// The string is present and intact.
    Intact,
    /// The file predates the string.
    Absent,
}

/// Identification fields of a DAF or DAS file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// 8-byte identifier, trailing blanks removed (e.g. `"DAF/SPK"`).
    pub id_word: String,
    /// Architecture recognized from the ID word.
    pub architecture: Architecture,
    /// Internal file name, trailing blanks removed.
    pub internal_name: String,
    /// Binary format the file's numeric data is encoded in.
    pub format: BinaryFormat,
    /// `true` when the format tag was blank and `format` was inferred.
    pub format_inferred: bool,
    /// Result of the FTP validation string check.
    pub ftp: FtpStatus,
}

fn trimmed_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

fn field(input: &[u8], len: usize) -> IResult<&[u8], &[u8]> {
    take(len)(input)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == b' ' || *b == 0)
}

impl FileRecord {
    /// Parse the first record of a file.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: Name of the file, only used to label errors.
    /// * `input`: The first record; at least 1024 bytes.
    ///
    /// Return
    /// ----------
    /// * The decoded [`FileRecord`], or
    ///   [`DafDasError::NotRecognizedArchitecture`] when the ID word is not a DAF/DAS tag,
    ///   [`DafDasError::UnsupportedFormat`] for an unknown format tag,
    ///   [`DafDasError::FtpCorruption`] when the FTP validation string is damaged,
    ///   [`DafDasError::NomParsingError`] when the record is truncated.
    ///
    /// See also
    /// ------------
    /// * [`FileRecord::stamp`] – Produces records this function accepts.
    pub fn parse(name: &Utf8Path, input: &[u8]) -> Result<Self> {
        if input.len() < RECORD_BYTES {
            return Err(DafDasError::NomParsingError(format!(
                "file record of {name} holds {} bytes, expected {RECORD_BYTES}",
                input.len()
            )));
        }
        let record = &input[..RECORD_BYTES];

        let (rest, id_word) = field(record, ID_WORD_LEN)?;
        let id_word = trimmed_text(id_word);
        let architecture = Architecture::from_id_word(&id_word).ok_or_else(|| {
            DafDasError::NotRecognizedArchitecture {
                name: name.to_path_buf(),
                id_word: id_word.clone(),
            }
        })?;

        let (internal_name, summary_sizes, tag, (search_from, ftp_offset)) = match architecture {
            Architecture::Daf => {
                let (rest, nd_ni) = field(rest, 8)?; // ND, NI
                let (rest, ifname) = field(rest, INTERNAL_NAME_LEN)?;
                let (rest, _) = field(rest, 12)?; // FWARD, BWARD, FREE
                let (_, tag) = field(rest, FORMAT_TAG_LEN)?;
                let ftp = (DAF_NAME_OFFSET + INTERNAL_NAME_LEN, DAF_FTP_OFFSET);
                (ifname, Some(nd_ni), tag, ftp)
            }
            Architecture::Das => {
                let (rest, ifname) = field(rest, INTERNAL_NAME_LEN)?;
                let (rest, _) = field(rest, 16)?; // NRESVR..NCOMC
                let (_, tag) = field(rest, FORMAT_TAG_LEN)?;
                let ftp = (ID_WORD_LEN + INTERNAL_NAME_LEN, DAS_FTP_OFFSET);
                (ifname, None, tag, ftp)
            }
        };

        let (format, format_inferred) = if is_blank(tag) {
            let format = match summary_sizes {
                Some(nd_ni) => infer_daf_format(nd_ni),
                None => BinaryFormat::native(),
            };
            warn!(%name, %format, "blank format tag, format inferred");
            (format, true)
        } else {
            let tag = trimmed_text(tag);
            let format = BinaryFormat::from_name(&tag)
                .ok_or_else(|| DafDasError::UnsupportedFormat(tag.clone()))?;
            (format, false)
        };

        let ftp = check_ftp_string(name, record, search_from, ftp_offset)?;

        Ok(FileRecord {
            id_word,
            architecture,
            internal_name: trimmed_text(internal_name),
            format,
            format_inferred,
            ftp,
        })
    }

    /// Build the first record of a new file.
    ///
    /// The ID word is the architecture name followed by a slash and blanks; the internal
    /// name is blank padded; the format tag and FTP validation string are written at their
    /// offsets. DAF summary sizes and pointers, and DAS reserved/comment counts, are left zero
    /// for the layers above to fill in.
    ///
    /// Arguments
    /// -----------------
    /// * `architecture`: DAF or DAS.
    /// * `format`: Format tag to record.
    /// * `internal_name`: Internal file name; truncated to 60 bytes.
    ///
    /// Return
    /// ----------
    /// * One 1024-byte record.
    pub fn stamp(
        architecture: Architecture,
        format: BinaryFormat,
        internal_name: &str,
    ) -> RawRecord {
        let mut record = [0u8; RECORD_BYTES];

        let id_word = format!(
            "{:<width$}",
            format!("{}/", architecture.name()),
            width = ID_WORD_LEN
        );
        record[..ID_WORD_LEN].copy_from_slice(id_word.as_bytes());

        let name_offset = match architecture {
            Architecture::Daf => DAF_NAME_OFFSET,
            Architecture::Das => ID_WORD_LEN,
        };
        let name_field = &mut record[name_offset..name_offset + INTERNAL_NAME_LEN];
        name_field.fill(b' ');
        let name_bytes = internal_name.as_bytes();
        let len = name_bytes.len().min(INTERNAL_NAME_LEN);
        name_field[..len].copy_from_slice(&name_bytes[..len]);

        let (format_offset, ftp_offset) = match architecture {
            Architecture::Daf => (DAF_FORMAT_OFFSET, DAF_FTP_OFFSET),
            Architecture::Das => (DAS_FORMAT_OFFSET, DAS_FTP_OFFSET),
        };
        record[format_offset..format_offset + FORMAT_TAG_LEN]
            .copy_from_slice(format.name().as_bytes());
        record[ftp_offset..ftp_offset + FTP_STRING.len()].copy_from_slice(FTP_STRING);

        record
    }
}

/// Decode `ND` and `NI` with one byte order.
fn summary_sizes(format: BinaryFormat, nd_ni: &[u8]) -> Option<(i32, i32)> {
    let mut sizes = [0i32; 2];
    translate_integers(format, nd_ni, 2, &mut sizes).ok()?;
    Some((sizes[0], sizes[1]))
}

fn plausible_summary(nd: i32, ni: i32) -> bool {
    (0..=DAF_MAX_ND).contains(&nd)
        && (DAF_MIN_NI..=DAF_MAX_NI).contains(&ni)
        && nd + (ni + 1) / 2 <= DAF_MAX_SUMMARY_WORDS
}

fn infer_daf_format(nd_ni: &[u8]) -> BinaryFormat {
    let native = BinaryFormat::native();
    let other = match native {
        BinaryFormat::BigIeee => BinaryFormat::LtlIeee,
        _ => BinaryFormat::BigIeee,
    };
    [native, other]
        .into_iter()
        .find(|format| {
            summary_sizes(*format, nd_ni).is_some_and(|(nd, ni)| plausible_summary(nd, ni))
        })
        .unwrap_or(native)
}

/// Locate and verify the FTP validation string.
///
/// An intact string at `expected_offset` is accepted directly. Otherwise the string is
/// searched for from `search_from` on, past the internal name, since a damaging transfer
/// may have added or removed bytes ahead of it. Everything between the `FTPSTR` marker and
/// the closing `ENDFTP` must equal the reference sequence.
fn check_ftp_string(
    name: &Utf8Path,
    record: &[u8],
    search_from: usize,
    expected_offset: usize,
) -> Result<FtpStatus> {
    let expected = expected_offset..expected_offset + FTP_STRING.len();
    if record.get(expected) == Some(FTP_STRING.as_slice()) {
        return Ok(FtpStatus::Intact);
    }

    let start = record
        .get(search_from..)
        .unwrap_or_default()
        .windows(FTP_MARKER.len())
        .position(|window| window == FTP_MARKER)
        .map(|pos| search_from + pos);

    let Some(start) = start else {
        return Ok(FtpStatus::Absent);
    };

    let end_marker = &FTP_STRING[FTP_STRING.len() - 6..];
    let end = record[start..]
        .windows(end_marker.len())
        .position(|window| window == end_marker)
        .map(|pos| start + pos + end_marker.len());

    match end {
        Some(end) if &record[start..end] == FTP_STRING.as_slice() => {
            if start != expected_offset {
                warn!(
                    %name,
                    start,
                    expected_offset,
                    "FTP validation string found at unusual offset"
                );
            }
            Ok(FtpStatus::Intact)
        }
        _ => Err(DafDasError::FtpCorruption(name.to_path_buf())),
    }
}

/// Encode `ND` and `NI` into a stamped DAF record.
///
/// Used by tests and by callers building DAF files by hand.
pub fn set_daf_summary_sizes(
    record: &mut RawRecord,
    format: BinaryFormat,
    nd: i32,
    ni: i32,
) -> Result<()> {
    encode_integers(format, &[nd, ni], &mut record[ID_WORD_LEN..ID_WORD_LEN + 8])
}

impl fmt::Display for FileRecord {
    /// Render a fixed-width table summarizing the file record.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LABEL_WIDTH: usize = 18;
        const VALUE_WIDTH: usize = 50;

        let border = format!(
            "+{:-<label$}+{:-<value$}+",
            "",
            "",
            label = LABEL_WIDTH + 1,
            value = VALUE_WIDTH + 1
        );

        let format_value = if self.format_inferred {
            format!("{} (inferred, blank tag)", self.format)
        } else {
            self.format.to_string()
        };
        let ftp_value = match self.ftp {
            FtpStatus::Intact => "intact",
            FtpStatus::Absent => "absent (pre-FTP file)",
        };

        writeln!(f, "{border}")?;
        writeln!(
            f,
            "| {:<label$}| {:<value$}|",
            "File Record",
            "",
            label = LABEL_WIDTH,
            value = VALUE_WIDTH
        )?;
        writeln!(f, "{border}")?;

        let rows = [
            (
                "ID Word",
                format!("{} ({} architecture)", self.id_word, self.architecture),
            ),
            ("Internal Name", self.internal_name.clone()),
            ("Binary Format", format_value),
            ("FTP Check", ftp_value.to_string()),
        ];
        for (label, value) in rows {
            writeln!(
                f,
                "| {:<label$}| {:<value$}|",
                label,
                value,
                label = LABEL_WIDTH,
                value = VALUE_WIDTH
            )?;
        }

        writeln!(f, "{border}")
    }
}
