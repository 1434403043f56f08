use camino::Utf8PathBuf;
use thiserror::Error;

use crate::{
    binary_format::{AccessMode, Architecture, BinaryFormat},
    constants::{Handle, LogicalUnit},
};

pub type Result<T> = std::result::Result<T, DafDasError>;

#[derive(Error, Debug)]
pub enum DafDasError {
    // --- registry ---------------------------------------------------------------------------
    #[error("Unsupported binary format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Unsupported access mode: {0}")]
    UnsupportedAccessMode(String),

    // --- translation ------------------------------------------------------------------------
    #[error("Binary format {format} is not supported for {operation}")]
    UnsupportedBinaryFormat {
        format: BinaryFormat,
        operation: &'static str,
    },

    #[error("Input buffer holds {available} bytes but {needed} are required")]
    InsufficientInputBuffer { needed: usize, available: usize },

    #[error("Output buffer holds {available} elements but {needed} are required")]
    InsufficientOutputSpace { needed: usize, available: usize },

    #[error("Value {value:e} cannot be represented in {format}")]
    NotRepresentable { value: f64, format: BinaryFormat },

    #[error("Reserved operand found in {format} data at element {index}")]
    ReservedOperand { format: BinaryFormat, index: usize },

    // --- capacity ---------------------------------------------------------------------------
    #[error("File table is full ({capacity} files open)")]
    TooManyOpenFiles { capacity: usize },

    #[error("No logical unit available (unit table holds {in_use} rows, all in use)")]
    NoUnitsAvailable { in_use: usize },

    #[error("Handle counter exhausted; no new handle can be issued")]
    HandleSpaceExhausted,

    // --- units ------------------------------------------------------------------------------
    #[error("Logical unit {unit} is locked to handle {owner}, cannot lock it to {requested}")]
    UnitAlreadyLocked {
        unit: LogicalUnit,
        owner: Handle,
        requested: Handle,
    },

    #[error("Logical unit {unit} is held by handle {owner}, cannot lock it to {requested}")]
    UnitInUse {
        unit: LogicalUnit,
        owner: Handle,
        requested: Handle,
    },

    #[error("Logical unit {0} is not reserved by the handle manager")]
    NoSuchUnit(LogicalUnit),

    // --- files ------------------------------------------------------------------------------
    #[error("File name is blank")]
    BlankFileName,

    #[error("File name is {len} bytes long, the limit is {max}")]
    FileNameTooLong { len: usize, max: usize },

    #[error("File not found: {0}")]
    FileNotFound(Utf8PathBuf),

    #[error("File already exists: {0}")]
    FileAlreadyExists(Utf8PathBuf),

    #[error("File {name} is already open for {existing}, cannot open it for {requested}")]
    FileOpenConflict {
        name: Utf8PathBuf,
        existing: AccessMode,
        requested: AccessMode,
    },

    #[error("File {name} has unrecognized identification word '{id_word}'")]
    NotRecognizedArchitecture { name: Utf8PathBuf, id_word: String },

    #[error("File {name} is a {found} file, expected {expected}")]
    ArchitectureMismatch {
        name: Utf8PathBuf,
        expected: Architecture,
        found: Architecture,
    },

    #[error("File {0} was damaged by an ASCII-mode transfer (FTP validation string mismatch)")]
    FtpCorruption(Utf8PathBuf),

    #[error("Handle {0} does not belong to an open file")]
    UnknownHandle(Handle),

    #[error("Handle {0} refers to a file opened for READ access")]
    ReadOnlyFile(Handle),

    // --- records ----------------------------------------------------------------------------
    #[error("Record {record} is out of range for handle {handle} (file holds {records} records)")]
    RecordOutOfRange {
        handle: Handle,
        record: usize,
        records: u64,
    },

    #[error("Record 1 of handle {0} holds the file record and only takes raw writes")]
    FileRecordProtected(Handle),

    #[error("{count} values supplied but a record holds at most {max}")]
    RecordSizeMismatch { count: usize, max: usize },

    // --- misc -------------------------------------------------------------------------------
    #[error("Invalid handle manager configuration: {0}")]
    InvalidConfig(String),

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),

    #[error("I/O failure on {name}: {source}")]
    FileIo {
        name: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl DafDasError {
    /// Wrap an I/O error with the name of the file it happened on.
    pub(crate) fn file_io(name: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        DafDasError::FileIo {
            name: name.into(),
            source,
        }
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for DafDasError {
    fn from(err: nom::Err<E>) -> Self {
        DafDasError::NomParsingError(format!("{err:?}"))
    }
}
