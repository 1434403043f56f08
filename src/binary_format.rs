//! Static vocabularies of the handle manager: binary formats, architectures, access modes.
//!
//! Every file managed by this crate is described by three enumerations:
//!
//! * [`BinaryFormat`]: how integers and doubles are encoded *inside the file*
//!   (`BIG-IEEE`, `LTL-IEEE`, `VAX-GFLT`, `VAX-DFLT`),
//! * [`Architecture`]: whether the file is a DAF or a DAS,
//! * [`AccessMode`]: how the file was opened (`READ`, `WRITE`, `SCRATCH`, `NEW`).
//!
//! Each enumeration maps to a stable integer code and a canonical upper-case name, and
//! can be parsed back from either. The lookups are pure: no state, no I/O.
//!
//! # Example
//! ```rust
//! use dafdas::binary_format::BinaryFormat;
//!
//! let bff: BinaryFormat = "ltl-ieee".parse().unwrap();
//! assert_eq!(bff.name(), "LTL-IEEE");
//! assert_eq!(BinaryFormat::try_from(1).unwrap(), BinaryFormat::BigIeee);
//! ```
//!
//! # See also
//! ------------
//! * [`crate::translate`] – Byte translation driven by [`BinaryFormat`].
//! * [`crate::file_record`] – Detection of architecture and format from the first record.

use std::{convert::TryFrom, fmt, str::FromStr};

use crate::dafdas_errors::DafDasError;

/// Byte order of multi-byte words in an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Bit layout of an encoded double.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatLayout {
    /// IEEE-754 binary64: 1 sign, 11 exponent (bias 1023), 52 fraction, hidden bit.
    Ieee754,
    /// VAX G-float: 1 sign, 11 exponent (bias 1024), 52 fraction, PDP word order.
    VaxG,
    /// VAX D-float: 1 sign, 8 exponent (bias 128), 55 fraction, PDP word order.
    VaxD,
}

/// Binary file format (BFF) of a managed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BinaryFormat {
    BigIeee = 1,
    LtlIeee = 2,
    VaxGfloat = 3,
    VaxDfloat = 4,
}

impl BinaryFormat {
    /// Every supported format, in code order.
    pub const ALL: [BinaryFormat; 4] = [
        BinaryFormat::BigIeee,
        BinaryFormat::LtlIeee,
        BinaryFormat::VaxGfloat,
        BinaryFormat::VaxDfloat,
    ];

    /// The encoding used by the platform this crate was compiled for.
    ///
    /// No supported platform is VAX-native, so this is always one of the IEEE variants.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            BinaryFormat::BigIeee
        } else {
            BinaryFormat::LtlIeee
        }
    }

    pub fn is_native(self) -> bool {
        self == Self::native()
    }

    pub fn from_i32(value: i32) -> Result<Self, DafDasError> {
        BinaryFormat::try_from(value)
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Canonical 8-character name, as stored in the file record.
    pub fn name(self) -> &'static str {
        match self {
            BinaryFormat::BigIeee => "BIG-IEEE",
            BinaryFormat::LtlIeee => "LTL-IEEE",
            BinaryFormat::VaxGfloat => "VAX-GFLT",
            BinaryFormat::VaxDfloat => "VAX-DFLT",
        }
    }

    /// Look up a format by name.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: Format name; surrounding blanks are ignored, case is not significant, and the
    ///   long spellings `VAX-GFLOAT` / `VAX-DFLOAT` are accepted next to the canonical ones.
    ///
    /// Return
    /// ----------
    /// * `Some(format)` if the name is known, `None` otherwise.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "BIG-IEEE" => Some(BinaryFormat::BigIeee),
            "LTL-IEEE" => Some(BinaryFormat::LtlIeee),
            "VAX-GFLT" | "VAX-GFLOAT" => Some(BinaryFormat::VaxGfloat),
            "VAX-DFLT" | "VAX-DFLOAT" => Some(BinaryFormat::VaxDfloat),
            _ => None,
        }
    }

    /// Byte order of the encoding.
    ///
    /// VAX data is stored as little-endian 16-bit words, most significant word first; for
    /// integers this is plain little-endian.
    pub fn byte_order(self) -> ByteOrder {
        match self {
            BinaryFormat::BigIeee => ByteOrder::BigEndian,
            _ => ByteOrder::LittleEndian,
        }
    }

    pub fn integer_width(self) -> usize {
        crate::constants::INTEGER_WIDTH
    }

    pub fn double_width(self) -> usize {
        crate::constants::DOUBLE_WIDTH
    }

    pub fn float_layout(self) -> FloatLayout {
        match self {
            BinaryFormat::BigIeee | BinaryFormat::LtlIeee => FloatLayout::Ieee754,
            BinaryFormat::VaxGfloat => FloatLayout::VaxG,
            BinaryFormat::VaxDfloat => FloatLayout::VaxD,
        }
    }

    pub fn is_vax(self) -> bool {
        matches!(self, BinaryFormat::VaxGfloat | BinaryFormat::VaxDfloat)
    }
}

impl From<BinaryFormat> for i32 {
    fn from(format: BinaryFormat) -> Self {
        format as i32
    }
}

impl TryFrom<i32> for BinaryFormat {
    type Error = DafDasError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use BinaryFormat::*;
        match value {
            1 => Ok(BigIeee),
            2 => Ok(LtlIeee),
            3 => Ok(VaxGfloat),
            4 => Ok(VaxDfloat),
            _ => Err(DafDasError::UnsupportedFormat(format!("code {value}"))),
        }
    }
}

impl FromStr for BinaryFormat {
    type Err = DafDasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BinaryFormat::from_name(s).ok_or_else(|| DafDasError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// File architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Architecture {
    /// Double precision Array File.
    Daf = 1,
    /// Direct Access, Segmented file.
    Das = 2,
}

impl Architecture {
    pub fn name(self) -> &'static str {
        match self {
            Architecture::Daf => "DAF",
            Architecture::Das => "DAS",
        }
    }

    /// Recognize the architecture from the identification word of a file.
    ///
    /// Current files start with `DAF/` or `DAS/` followed by a four-character type; files
    /// written by old toolkits carry `NAIF/DAF` or `NAIF/DAS` instead.
    ///
    /// Arguments
    /// -----------------
    /// * `id_word`: The first eight bytes of the file, already decoded as text.
    ///
    /// Return
    /// ----------
    /// * `Some(architecture)` when the word carries a known tag, `None` otherwise.
    pub fn from_id_word(id_word: &str) -> Option<Self> {
        let word = id_word.trim_end();
        if word.starts_with("DAF/") || word == "NAIF/DAF" {
            Some(Architecture::Daf)
        } else if word.starts_with("DAS/") || word == "NAIF/DAS" {
            Some(Architecture::Das)
        } else {
            None
        }
    }
}

impl TryFrom<i32> for Architecture {
    type Error = DafDasError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Architecture::Daf),
            2 => Ok(Architecture::Das),
            _ => Err(DafDasError::UnsupportedArchitecture(format!("code {value}"))),
        }
    }
}

impl FromStr for Architecture {
    type Err = DafDasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAF" => Ok(Architecture::Daf),
            "DAS" => Ok(Architecture::Das),
            _ => Err(DafDasError::UnsupportedArchitecture(s.to_string())),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AccessMode {
    /// Existing file, read only.
    Read = 1,
    /// Existing file, read and write.
    Write = 2,
    /// Anonymous temporary file, deleted when closed.
    Scratch = 3,
    /// File created by the open; must not exist beforehand.
    New = 4,
}

impl AccessMode {
    pub fn name(self) -> &'static str {
        match self {
            AccessMode::Read => "READ",
            AccessMode::Write => "WRITE",
            AccessMode::Scratch => "SCRATCH",
            AccessMode::New => "NEW",
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, AccessMode::Read)
    }
}

impl TryFrom<i32> for AccessMode {
    type Error = DafDasError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use AccessMode::*;
        match value {
            1 => Ok(Read),
            2 => Ok(Write),
            3 => Ok(Scratch),
            4 => Ok(New),
            _ => Err(DafDasError::UnsupportedAccessMode(format!("code {value}"))),
        }
    }
}

impl FromStr for AccessMode {
    type Err = DafDasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "READ" => Ok(AccessMode::Read),
            "WRITE" => Ok(AccessMode::Write),
            "SCRATCH" => Ok(AccessMode::Scratch),
            "NEW" => Ok(AccessMode::New),
            _ => Err(DafDasError::UnsupportedAccessMode(s.to_string())),
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test_binary_format {
    use super::*;

    #[test]
    fn test_format_codes_round_trip() {
        for format in BinaryFormat::ALL {
            assert_eq!(BinaryFormat::try_from(format.to_i32()).unwrap(), format);
            assert_eq!(format.name().parse::<BinaryFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_format_name_aliases() {
        assert_eq!(
            BinaryFormat::from_name("  vax-gfloat "),
            Some(BinaryFormat::VaxGfloat)
        );
        assert_eq!(
            BinaryFormat::from_name("VAX-DFLOAT"),
            Some(BinaryFormat::VaxDfloat)
        );
        assert_eq!(BinaryFormat::from_name("PC-IEEE"), None);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(matches!(
            BinaryFormat::try_from(0),
            Err(DafDasError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            BinaryFormat::try_from(5),
            Err(DafDasError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            "IBM-370".parse::<BinaryFormat>(),
            Err(DafDasError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_native_format() {
        let native = BinaryFormat::native();
        assert!(!native.is_vax());
        if cfg!(target_endian = "little") {
            assert_eq!(native, BinaryFormat::LtlIeee);
        } else {
            assert_eq!(native, BinaryFormat::BigIeee);
        }
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(BinaryFormat::BigIeee.byte_order(), ByteOrder::BigEndian);
        assert_eq!(BinaryFormat::VaxDfloat.byte_order(), ByteOrder::LittleEndian);
        assert_eq!(BinaryFormat::VaxGfloat.float_layout(), FloatLayout::VaxG);
        assert_eq!(BinaryFormat::LtlIeee.float_layout(), FloatLayout::Ieee754);
        assert_eq!(BinaryFormat::LtlIeee.integer_width(), 4);
        assert_eq!(BinaryFormat::VaxDfloat.double_width(), 8);
    }

    #[test]
    fn test_architecture_from_id_word() {
        assert_eq!(Architecture::from_id_word("DAF/SPK "), Some(Architecture::Daf));
        assert_eq!(Architecture::from_id_word("DAS/EK  "), Some(Architecture::Das));
        assert_eq!(Architecture::from_id_word("NAIF/DAF"), Some(Architecture::Daf));
        assert_eq!(Architecture::from_id_word("NAIF/DAS"), Some(Architecture::Das));
        assert_eq!(Architecture::from_id_word("KPL/FK  "), None);
        assert_eq!(Architecture::from_id_word(""), None);
    }

    #[test]
    fn test_access_mode_vocabulary() {
        assert_eq!("scratch".parse::<AccessMode>().unwrap(), AccessMode::Scratch);
        assert_eq!(AccessMode::try_from(4).unwrap(), AccessMode::New);
        assert_eq!(AccessMode::Write.to_string(), "WRITE");
        assert!(!AccessMode::Read.is_writable());
        assert!(AccessMode::New.is_writable());
        assert!("APPEND".parse::<AccessMode>().is_err());
        assert_eq!("das".parse::<Architecture>().unwrap(), Architecture::Das);
        assert!(Architecture::try_from(3).is_err());
    }
}
