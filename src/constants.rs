//! # Constants and type definitions for dafdas
//!
//! This module centralizes the **capacity limits**, **record geometry**, and **common type
//! aliases** used throughout the handle manager and the byte translator.
//!
//! ## Overview
//!
//! - File table and unit table capacities
//! - Reserved and scratch-only unit counts
//! - Physical record layout (bytes, doubles and integers per record)
//! - Offsets of the identification fields inside the first record of a file
//!
//! The capacities are only **defaults**: [`ManagerConfig`](crate::config::ManagerConfig) carries
//! the values actually enforced by a [`HandleManager`](crate::handle_manager::HandleManager).

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Opaque identifier of one open file. Valid handles are strictly positive.
pub type Handle = i32;

/// Logical unit number attached to an OS-level stream.
pub type LogicalUnit = i32;

/// One physical record viewed as double precision numbers.
pub type DoubleRecord = [f64; RECORD_DOUBLES];

/// One physical record viewed as four-byte integers.
pub type IntegerRecord = [i32; RECORD_INTEGERS];

/// One physical record as raw bytes.
pub type RawRecord = [u8; RECORD_BYTES];

// -------------------------------------------------------------------------------------------------
// Table capacities
// -------------------------------------------------------------------------------------------------

/// Maximum number of files simultaneously known to the handle manager.
pub const FTSIZE: usize = 5000;

/// Maximum number of logical units simultaneously connected to files.
pub const UTSIZE: usize = 23;

/// Number of logical unit numbers held back for the host program (the preconnected console units).
pub const RSVUNT: usize = 2;

/// Number of unit table rows that only scratch files may occupy.
pub const SCRUNT: usize = 1;

/// Default set of logical unit numbers that are never handed out; its length is [`RSVUNT`].
pub const RESERVED_UNITS: [LogicalUnit; RSVUNT] = [5, 6];

/// Largest logical unit number the pool may hand out.
pub const MAX_LOGICAL_UNIT: LogicalUnit = 99;

/// Maximum length of a file name, in bytes.
pub const FILE_NAME_LEN: usize = 255;

// -------------------------------------------------------------------------------------------------
// Record geometry
// -------------------------------------------------------------------------------------------------

/// Size of one physical record in bytes.
pub const RECORD_BYTES: usize = 1024;

/// Number of double precision values per record.
pub const RECORD_DOUBLES: usize = RECORD_BYTES / DOUBLE_WIDTH;

/// Number of four-byte integers per record.
pub const RECORD_INTEGERS: usize = RECORD_BYTES / INTEGER_WIDTH;

/// Width in bytes of an encoded integer, for every supported format.
pub const INTEGER_WIDTH: usize = 4;

/// Width in bytes of an encoded double, for every supported format.
pub const DOUBLE_WIDTH: usize = 8;

// -------------------------------------------------------------------------------------------------
// File record layout
// -------------------------------------------------------------------------------------------------

/// Length of the identification word at the start of every file.
pub const ID_WORD_LEN: usize = 8;

/// Length of the internal file name stored in the file record.
pub const INTERNAL_NAME_LEN: usize = 60;

/// Length of the binary format tag stored in the file record.
pub const FORMAT_TAG_LEN: usize = 8;

/// Byte offset of the format tag in a DAF file record.
pub const DAF_FORMAT_OFFSET: usize = 88;

/// Byte offset of the FTP validation string in a DAF file record.
pub const DAF_FTP_OFFSET: usize = 699;

/// Byte offset of the format tag in a DAS file record.
pub const DAS_FORMAT_OFFSET: usize = 84;

/// Byte offset of the FTP validation string in a DAS file record.
pub const DAS_FTP_OFFSET: usize = 695;

/// Sequence written into every file record; ASCII-mode transfers mangle some of its bytes.
pub const FTP_STRING: &[u8; 28] = b"FTPSTR:\r:\n:\r\n:\r\0:\x81:\x10\xce:ENDFTP";

/// Leading marker of [`FTP_STRING`], used to tell whether a file carries one at all.
pub const FTP_MARKER: &[u8; 7] = b"FTPSTR:";
