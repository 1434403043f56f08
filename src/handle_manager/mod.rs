//! # Handle manager
//!
//! The [`HandleManager`] issues handles for DAF and DAS files and owns the two tables behind
//! them:
//!
//! * the **file table** ([`file_table`]), one row per open file, up to
//!   [`ManagerConfig::max_open_files`] rows;
//! * the **unit table** ([`unit_table`]), the logical units actually connected to an OS
//!   stream, up to [`ManagerConfig::unit_table_size`] rows.
//!
//! Far more files can be open than units exist. A file whose unit was taken by another file
//! is transparently reopened the next time its handle is used (see
//! [`HandleManager::unit_for_handle`]). The record reader/writer in `record_io` builds on
//! that to read and write 1024-byte records in the file's own binary format.
//!
//! ## Handles
//!
//! Handles are strictly positive and come from a counter that is never rewound: a closed
//! handle is never issued again by the same manager, so a stale handle can only ever be
//! "not found".
//!
//! ## Concurrency
//!
//! All state sits behind one [`parking_lot::Mutex`]. Every public method locks it for its
//! whole duration, so a manager can be shared by reference between threads.
//! [`HandleManager::global`] returns a lazily built process-wide instance.
//!
//! ## Typical usage
//!
//! ```rust,no_run
//! use dafdas::binary_format::{AccessMode, Architecture};
//! use dafdas::handle_manager::HandleManager;
//!
//! let manager = HandleManager::default();
//! let handle = manager.open("de440.bsp", AccessMode::Read, Architecture::Daf).unwrap();
//!
//! let record = manager.read_record(handle, 2).unwrap();
//! println!("first word of record 2: {}", record[0]);
//!
//! manager.close(handle).unwrap();
//! ```
//!
//! ## See also
//! ------------
//! * [`FileRecord`] – Identification record parsed on every READ/WRITE open.
//! * [`translate`](crate::translate) – Byte translation used for non-native files.

pub mod file_table;
mod record_io;
pub mod unit_table;

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Read, Write},
};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    binary_format::{AccessMode, Architecture, BinaryFormat},
    config::ManagerConfig,
    constants::{Handle, LogicalUnit, RECORD_BYTES},
    dafdas_errors::{DafDasError, Result},
    file_record::FileRecord,
};

use self::{
    file_table::{FileTable, FileTableRow},
    unit_table::UnitTable,
};

/// Label given to scratch files opened with a blank name.
const SCRATCH_LABEL: &str = "<scratch>";

/// Public view of a file table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub handle: Handle,
    pub name: Utf8PathBuf,
    pub access: AccessMode,
    pub architecture: Architecture,
    pub format: BinaryFormat,
    /// Logical unit connected to the file, `None` while detached.
    pub unit: Option<LogicalUnit>,
}

impl From<&FileTableRow> for FileInfo {
    fn from(row: &FileTableRow) -> Self {
        FileInfo {
            handle: row.handle,
            name: row.name.clone(),
            access: row.access,
            architecture: row.architecture,
            format: row.format,
            unit: row.unit,
        }
    }
}

/// Snapshot of a unit table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRowInfo {
    pub unit: LogicalUnit,
    pub handle: Option<Handle>,
    pub locked: bool,
    pub scratch: bool,
    pub cost: u64,
}

#[derive(Debug)]
struct ManagerState {
    config: ManagerConfig,
    files: FileTable,
    units: UnitTable,
    next_handle: Handle,
}

/// Registry of open DAF/DAS files, see the [module documentation](self).
#[derive(Debug)]
pub struct HandleManager {
    state: Mutex<ManagerState>,
}

impl Default for HandleManager {
    fn default() -> Self {
        HandleManager::with_valid_config(ManagerConfig::default())
    }
}

impl HandleManager {
    /// Build a manager with custom capacities.
    ///
    /// Return
    /// ----------
    /// * The manager, or [`DafDasError::InvalidConfig`] when the limits are inconsistent
    ///   (see [`ManagerConfig::validate`]).
    pub fn new(config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(HandleManager::with_valid_config(config))
    }

    fn with_valid_config(config: ManagerConfig) -> Self {
        HandleManager {
            state: Mutex::new(ManagerState {
                files: FileTable::new(config.max_open_files),
                units: UnitTable::new(&config),
                config,
                next_handle: 1,
            }),
        }
    }

    /// Process-wide manager with the default configuration, created on first use.
    pub fn global() -> &'static HandleManager {
        static GLOBAL: OnceCell<HandleManager> = OnceCell::new();
        GLOBAL.get_or_init(HandleManager::default)
    }

    pub fn config(&self) -> ManagerConfig {
        self.state.lock().config.clone()
    }

    /// Open a file and return its handle.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: Path of the file; leading and trailing blanks are ignored. For
    ///   [`AccessMode::Scratch`] it is only a label and may be blank.
    /// * `access`: READ and WRITE open an existing file, NEW creates one (native format),
    ///   SCRATCH creates an anonymous file removed by the OS when closed.
    /// * `architecture`: Expected architecture; an existing file of the other kind is refused.
    ///
    /// Return
    /// ----------
    /// * The new handle. Opening for READ a file that is already open for READ returns the
    ///   handle it already has.
    /// * Errors: [`DafDasError::BlankFileName`], [`DafDasError::FileNameTooLong`],
    ///   [`DafDasError::TooManyOpenFiles`], [`DafDasError::FileNotFound`],
    ///   [`DafDasError::FileAlreadyExists`], [`DafDasError::FileOpenConflict`],
    ///   [`DafDasError::NotRecognizedArchitecture`], [`DafDasError::ArchitectureMismatch`],
    ///   [`DafDasError::FtpCorruption`], [`DafDasError::UnsupportedBinaryFormat`] (WRITE on
    ///   a VAX file), [`DafDasError::NoUnitsAvailable`], [`DafDasError::HandleSpaceExhausted`].
    ///   The tables are unchanged when an error is returned.
    ///
    /// See also
    /// ------------
    /// * [`HandleManager::open_new_with_format`] – NEW file in a non-native IEEE format.
    /// * [`HandleManager::close`] – Release the handle.
    pub fn open(
        &self,
        name: &str,
        access: AccessMode,
        architecture: Architecture,
    ) -> Result<Handle> {
        self.state
            .lock()
            .open(name, access, architecture, BinaryFormat::native())
    }

    /// Create a file in `format` and open it with NEW access.
    ///
    /// Only IEEE formats can be written; VAX targets fail with
    /// [`DafDasError::UnsupportedBinaryFormat`].
    pub fn open_new_with_format(
        &self,
        name: &str,
        architecture: Architecture,
        format: BinaryFormat,
    ) -> Result<Handle> {
        self.state
            .lock()
            .open(name, AccessMode::New, architecture, format)
    }

    /// Close `handle`, releasing its logical unit and removing its file table row.
    pub fn close(&self, handle: Handle) -> Result<()> {
        self.state.lock().close(handle, false)
    }

    /// Close `handle` and delete the file from disk.
    pub fn close_and_delete(&self, handle: Handle) -> Result<()> {
        self.state.lock().close(handle, true)
    }

    pub fn lookup(&self, handle: Handle) -> Option<FileInfo> {
        self.state.lock().files.get(handle).map(FileInfo::from)
    }

    /// Name of the file behind `handle`.
    ///
    /// Never issued and already closed handles both fail with [`DafDasError::UnknownHandle`].
    pub fn file_name_for_handle(&self, handle: Handle) -> Result<Utf8PathBuf> {
        self.state
            .lock()
            .files
            .get(handle)
            .map(|row| row.name.clone())
            .ok_or(DafDasError::UnknownHandle(handle))
    }

    /// Handle of the open file called `name`, if any.
    ///
    /// The name is compared as given, then through its canonical path so that two spellings
    /// of the same file match.
    pub fn handle_for_file_name(&self, name: &str) -> Option<Handle> {
        let name = Utf8Path::new(name.trim());
        if name.as_str().is_empty() {
            return None;
        }
        let key = name.canonicalize_utf8().ok();
        let state = self.state.lock();
        state
            .files
            .find_by_name(name)
            .or_else(|| key.as_deref().and_then(|key| state.files.find_by_key(key)))
            .map(|row| row.handle)
    }

    /// Handle of the file attached to `unit`; `None` when the unit is free or unknown.
    pub fn handle_for_unit(&self, unit: LogicalUnit) -> Option<Handle> {
        self.state.lock().units.lookup_handle_for_unit(unit)
    }

    /// `Some(true)` when the file behind `handle` is in the native binary format.
    ///
    /// Zero, negative, unknown and closed handles give `None`.
    pub fn is_native_format(&self, handle: Handle) -> Option<bool> {
        self.state
            .lock()
            .files
            .get(handle)
            .map(|row| row.format.is_native())
    }

    /// Logical unit connected to `handle`, reattaching the file if its unit was taken.
    ///
    /// Arguments
    /// -----------------
    /// * `handle`: Handle of an open file.
    /// * `lock`: Lock the unit to the handle so it cannot be stolen until
    ///   [`HandleManager::unlock`] or [`HandleManager::close`].
    ///
    /// Return
    /// ----------
    /// * The unit, or [`DafDasError::UnknownHandle`], [`DafDasError::NoUnitsAvailable`] when
    ///   every unit is locked, or an I/O error when the file cannot be reopened.
    pub fn unit_for_handle(&self, handle: Handle, lock: bool) -> Result<LogicalUnit> {
        let mut state = self.state.lock();
        let index = state.ensure_attached(handle)?;
        let unit = state.units.rows()[index].unit;
        if lock {
            state.units.lock_unit(unit, handle)?;
        }
        Ok(unit)
    }

    /// Unlock the unit of `handle`, if it has one.
    pub fn unlock(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let unit = state
            .files
            .get(handle)
            .ok_or(DafDasError::UnknownHandle(handle))?
            .unit;
        match unit {
            Some(unit) => state.units.unlock_unit(unit),
            None => Ok(()),
        }
    }

    /// Number of open files, optionally restricted to one architecture.
    pub fn open_count(&self, architecture: Option<Architecture>) -> usize {
        self.state.lock().files.count(architecture)
    }

    /// Handles of the open files, in file table order.
    pub fn handles(&self) -> Vec<Handle> {
        self.state
            .lock()
            .files
            .rows()
            .iter()
            .map(|row| row.handle)
            .collect()
    }

    /// Unit table rows, in table order.
    pub fn unit_rows(&self) -> Vec<UnitRowInfo> {
        self.state
            .lock()
            .units
            .rows()
            .iter()
            .map(|row| UnitRowInfo {
                unit: row.unit,
                handle: row.handle,
                locked: row.locked,
                scratch: row.scratch,
                cost: row.cost,
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn set_next_handle(&self, handle: Handle) {
        self.state.lock().next_handle = handle;
    }
}

impl ManagerState {
    fn validate_name(&self, name: &str, access: AccessMode) -> Result<Utf8PathBuf> {
        let name = name.trim();
        if name.len() > self.config.max_file_name_len {
            return Err(DafDasError::FileNameTooLong {
                len: name.len(),
                max: self.config.max_file_name_len,
            });
        }
        match (name.is_empty(), access) {
            (true, AccessMode::Scratch) => Ok(Utf8PathBuf::from(SCRATCH_LABEL)),
            (true, _) => Err(DafDasError::BlankFileName),
            (false, _) => Ok(Utf8PathBuf::from(name)),
        }
    }

    fn open(
        &mut self,
        name: &str,
        access: AccessMode,
        architecture: Architecture,
        format: BinaryFormat,
    ) -> Result<Handle> {
        let name = self.validate_name(name, access)?;
        if self.files.is_full() {
            return Err(DafDasError::TooManyOpenFiles {
                capacity: self.files.capacity(),
            });
        }

        let key = match access {
            AccessMode::Read | AccessMode::Write => {
                let key = name.canonicalize_utf8().map_err(|err| match err.kind() {
                    io::ErrorKind::NotFound => DafDasError::FileNotFound(name.clone()),
                    _ => DafDasError::file_io(&name, err),
                })?;
                if let Some(existing) = self.files.find_by_key(&key) {
                    if existing.access == AccessMode::Read && access == AccessMode::Read {
                        if existing.architecture != architecture {
                            return Err(DafDasError::ArchitectureMismatch {
                                name,
                                expected: architecture,
                                found: existing.architecture,
                            });
                        }
                        debug!(handle = existing.handle, %name, "file already open for READ");
                        return Ok(existing.handle);
                    }
                    return Err(DafDasError::FileOpenConflict {
                        name,
                        existing: existing.access,
                        requested: access,
                    });
                }
                Some(key)
            }
            AccessMode::New => {
                if name.exists() {
                    return Err(DafDasError::FileAlreadyExists(name));
                }
                if format.is_vax() {
                    return Err(DafDasError::UnsupportedBinaryFormat {
                        format,
                        operation: "NEW files",
                    });
                }
                None
            }
            AccessMode::Scratch => None,
        };

        if self.next_handle == Handle::MAX {
            return Err(DafDasError::HandleSpaceExhausted);
        }
        let scratch = access == AccessMode::Scratch;
        if !self.units.has_room(scratch) && self.units.least_recently_used().is_none() {
            return Err(DafDasError::NoUnitsAvailable {
                in_use: self.units.len(),
            });
        }

        let (stream, format, key) = match access {
            AccessMode::Read | AccessMode::Write => {
                let path = key.unwrap_or_else(|| name.clone());
                let (stream, record) = open_existing(&name, &path, access)?;
                if record.architecture != architecture {
                    return Err(DafDasError::ArchitectureMismatch {
                        name,
                        expected: architecture,
                        found: record.architecture,
                    });
                }
                if access == AccessMode::Write && record.format.is_vax() {
                    return Err(DafDasError::UnsupportedBinaryFormat {
                        format: record.format,
                        operation: "WRITE access",
                    });
                }
                (stream, record.format, Some(path))
            }
            AccessMode::New => {
                let stream = create_new(&name, architecture, format)?;
                let key = name.canonicalize_utf8().ok();
                (stream, format, key)
            }
            AccessMode::Scratch => {
                let mut stream =
                    tempfile::tempfile().map_err(|err| DafDasError::file_io(&name, err))?;
                stamp(&mut stream, &name, architecture, BinaryFormat::native())?;
                (stream, BinaryFormat::native(), None)
            }
        };

        let handle = self.next_handle;
        let index = self.acquire_row(scratch)?;
        let unit = self.units.rows()[index].unit;
        self.files.insert(FileTableRow {
            handle,
            name: name.clone(),
            access,
            architecture,
            format,
            unit: Some(unit),
            key,
        })?;
        self.units.attach(index, handle, stream, scratch);
        self.units.touch(index);
        self.next_handle += 1;

        debug!(handle, unit, %name, %access, %architecture, %format, "file opened");
        Ok(handle)
    }

    /// Row for a new attachment: a fresh one when there is room, else the least recently
    /// used one, detached from its file.
    fn acquire_row(&mut self, scratch: bool) -> Result<usize> {
        if self.units.has_room(scratch) {
            return self.units.reserve_row(scratch);
        }
        let index = self
            .units
            .least_recently_used()
            .ok_or(DafDasError::NoUnitsAvailable {
                in_use: self.units.len(),
            })?;
        let unit = self.units.rows()[index].unit;
        if let Some(victim) = self.units.detach(index) {
            self.files.clear_unit(victim);
            warn!(unit, victim, "unit table full, unit taken from least recently used file");
        }
        Ok(index)
    }

    /// Index of the unit row attached to `handle`, reopening the file when needed.
    fn ensure_attached(&mut self, handle: Handle) -> Result<usize> {
        let row = self
            .files
            .get(handle)
            .ok_or(DafDasError::UnknownHandle(handle))?;

        if let Some(index) = row.unit.and_then(|unit| self.units.index_of(unit)) {
            self.units.touch(index);
            return Ok(index);
        }

        let name = row.name.clone();
        let path = row.key.clone().unwrap_or_else(|| name.clone());
        let stream = match row.access {
            AccessMode::Read => File::open(&path),
            AccessMode::Write | AccessMode::New => {
                OpenOptions::new().read(true).write(true).open(&path)
            }
            AccessMode::Scratch => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "scratch file is no longer attached",
            )),
        }
        .map_err(|err| DafDasError::file_io(&name, err))?;

        let index = self.acquire_row(false)?;
        let unit = self.units.rows()[index].unit;
        self.units.attach(index, handle, stream, false);
        self.units.touch(index);
        if let Some(row) = self.files.get_mut(handle) {
            row.unit = Some(unit);
        }
        debug!(handle, unit, %name, "file reattached");
        Ok(index)
    }

    fn close(&mut self, handle: Handle, delete: bool) -> Result<()> {
        let row = self
            .files
            .remove(handle)
            .ok_or(DafDasError::UnknownHandle(handle))?;
        if let Some(index) = self.units.index_for_handle(handle) {
            // dropping the row closes the stream
            self.units.remove_row(index);
        }
        debug!(handle, unit = ?row.unit, name = %row.name, "file closed");

        if delete && row.access != AccessMode::Scratch {
            let path = row.key.as_deref().unwrap_or(row.name.as_path());
            std::fs::remove_file(path).map_err(|err| DafDasError::file_io(&row.name, err))?;
            debug!(handle, name = %row.name, "file deleted");
        }
        Ok(())
    }
}

/// Open an existing file and parse its file record.
fn open_existing(
    name: &Utf8Path,
    path: &Utf8Path,
    access: AccessMode,
) -> Result<(File, FileRecord)> {
    let mut stream = match access {
        AccessMode::Write => OpenOptions::new().read(true).write(true).open(path),
        _ => File::open(path),
    }
    .map_err(|err| DafDasError::file_io(name, err))?;

    let mut record = Vec::with_capacity(RECORD_BYTES);
    (&mut stream)
        .take(RECORD_BYTES as u64)
        .read_to_end(&mut record)
        .map_err(|err| DafDasError::file_io(name, err))?;

    let file_record = FileRecord::parse(name, &record)?;
    Ok((stream, file_record))
}

fn create_new(name: &Utf8Path, architecture: Architecture, format: BinaryFormat) -> Result<File> {
    let mut stream = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(name)
        .map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => DafDasError::FileAlreadyExists(name.to_path_buf()),
            _ => DafDasError::file_io(name, err),
        })?;
    if let Err(err) = stamp(&mut stream, name, architecture, format) {
        drop(stream);
        let _ = std::fs::remove_file(name);
        return Err(err);
    }
    Ok(stream)
}

/// Write the file record of a freshly created file.
fn stamp(
    stream: &mut File,
    name: &Utf8Path,
    architecture: Architecture,
    format: BinaryFormat,
) -> Result<()> {
    let internal_name = name.file_name().unwrap_or(name.as_str());
    let record = FileRecord::stamp(architecture, format, internal_name);
    stream
        .write_all(&record)
        .map_err(|err| DafDasError::file_io(name, err))
}

impl fmt::Display for HandleManager {
    /// Render both tables.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        writeln!(
            f,
            "File table ({}/{}): [{}]",
            state.files.len(),
            state.files.capacity(),
            state.files.rows().iter().map(|row| row.handle).join(", ")
        )?;
        for row in state.files.rows() {
            let unit = row
                .unit
                .map_or_else(|| "-".to_string(), |unit| unit.to_string());
            writeln!(
                f,
                "  {:>6}  {:<3}  {:<7}  {:<8}  {:>4}  {}",
                row.handle,
                row.architecture.name(),
                row.access.name(),
                row.format.name(),
                unit,
                row.name
            )?;
        }

        writeln!(
            f,
            "Unit table ({}/{}):",
            state.units.len(),
            state.units.capacity()
        )?;
        for row in state.units.rows() {
            let handle = row
                .handle
                .map_or_else(|| "-".to_string(), |handle| handle.to_string());
            let flags = [(row.locked, "locked"), (row.scratch, "scratch")]
                .into_iter()
                .filter_map(|(set, flag)| set.then_some(flag))
                .join(",");
            writeln!(f, "  {:>4}  {:>6}  {:>8}  {}", row.unit, handle, row.cost, flags)?;
        }
        Ok(())
    }
}
