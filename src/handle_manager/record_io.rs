//! Record reader/writer.
//!
//! Files are sequences of 1024-byte records numbered from 1; record `n` occupies bytes
//! `(n - 1) * 1024 .. n * 1024`. Double and integer records are translated from the file's
//! binary format on the way in and encoded into it on the way out. Character records are
//! moved untouched.
//!
//! Reads require the whole record to be present. Writes may overwrite any record or append
//! the one right after the last. Record 1 holds the file record, so only raw writes reach it.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
};

use tracing::trace;

use crate::{
    binary_format::BinaryFormat,
    constants::{
        DoubleRecord, Handle, IntegerRecord, RawRecord, DOUBLE_WIDTH, INTEGER_WIDTH, RECORD_BYTES,
        RECORD_DOUBLES, RECORD_INTEGERS,
    },
    dafdas_errors::{DafDasError, Result},
    translate::{encode_doubles, encode_integers, translate_doubles, translate_integers},
};

use super::{file_table::FileTableRow, HandleManager, ManagerState};

fn record_offset(record: usize) -> u64 {
    (record as u64 - 1) * RECORD_BYTES as u64
}

fn complete_records(row: &FileTableRow, stream: &File) -> Result<u64> {
    let len = stream
        .metadata()
        .map_err(|err| DafDasError::file_io(&row.name, err))?
        .len();
    Ok(len / RECORD_BYTES as u64)
}

fn check_size(count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(DafDasError::RecordSizeMismatch { count, max });
    }
    Ok(())
}

impl HandleManager {
    /// Run `op` on the stream of `handle`, attaching the file first when needed.
    ///
    /// The manager stays locked for the duration of `op`.
    fn with_stream<T>(
        &self,
        handle: Handle,
        op: impl FnOnce(&FileTableRow, &mut File) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let index = state.ensure_attached(handle)?;
        let row = state
            .files
            .get(handle)
            .ok_or(DafDasError::UnknownHandle(handle))?;
        let stream = state
            .units
            .stream_mut(index)
            .ok_or(DafDasError::UnknownHandle(handle))?;
        op(row, stream)
    }

    /// Number of complete records in the file behind `handle`, the file record included.
    pub fn record_count(&self, handle: Handle) -> Result<u64> {
        self.with_stream(handle, |row, stream| complete_records(row, stream))
    }

    fn read_bytes(&self, handle: Handle, record: usize) -> Result<(BinaryFormat, RawRecord)> {
        self.with_stream(handle, |row, stream| {
            let records = complete_records(row, stream)?;
            if record == 0 || record as u64 > records {
                return Err(DafDasError::RecordOutOfRange {
                    handle,
                    record,
                    records,
                });
            }

            let mut buffer = [0u8; RECORD_BYTES];
            stream
                .seek(SeekFrom::Start(record_offset(record)))
                .and_then(|_| stream.read_exact(&mut buffer))
                .map_err(|err| DafDasError::file_io(&row.name, err))?;

            trace!(handle, record, format = %row.format, "record read");
            Ok((row.format, buffer))
        })
    }

    /// Check a write against the tables without attaching the file.
    ///
    /// A detached file is measured through its path, so a refused write never steals a unit.
    fn check_write(
        state: &ManagerState,
        handle: Handle,
        record: usize,
        allow_file_record: bool,
    ) -> Result<()> {
        let row = state
            .files
            .get(handle)
            .ok_or(DafDasError::UnknownHandle(handle))?;
        if !row.access.is_writable() {
            return Err(DafDasError::ReadOnlyFile(handle));
        }

        let attached = row
            .unit
            .and_then(|unit| state.units.index_of(unit))
            .and_then(|index| state.units.rows()[index].stream.as_ref());
        let records = match attached {
            Some(stream) => complete_records(row, stream)?,
            None => {
                let path = row.key.as_deref().unwrap_or(row.name.as_path());
                let len = std::fs::metadata(path)
                    .map_err(|err| DafDasError::file_io(&row.name, err))?
                    .len();
                len / RECORD_BYTES as u64
            }
        };
        if record == 0 || record as u64 > records + 1 {
            return Err(DafDasError::RecordOutOfRange {
                handle,
                record,
                records,
            });
        }
        if record == 1 && !allow_file_record {
            return Err(DafDasError::FileRecordProtected(handle));
        }
        Ok(())
    }

    fn write_bytes(
        &self,
        handle: Handle,
        record: usize,
        allow_file_record: bool,
        encode: impl FnOnce(BinaryFormat, &mut RawRecord) -> Result<()>,
    ) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        Self::check_write(state, handle, record, allow_file_record)?;

        let index = state.ensure_attached(handle)?;
        let row = state
            .files
            .get(handle)
            .ok_or(DafDasError::UnknownHandle(handle))?;
        let stream = state
            .units
            .stream_mut(index)
            .ok_or(DafDasError::UnknownHandle(handle))?;

        let mut buffer = [0u8; RECORD_BYTES];
        encode(row.format, &mut buffer)?;
        stream
            .seek(SeekFrom::Start(record_offset(record)))
            .and_then(|_| stream.write_all(&buffer))
            .map_err(|err| DafDasError::file_io(&row.name, err))?;

        trace!(handle, record, format = %row.format, "record written");
        Ok(())
    }

    /// Read record `record` of `handle` as 128 doubles.
    ///
    /// Arguments
    /// -----------------
    /// * `handle`: Handle of an open file.
    /// * `record`: 1-based record number.
    ///
    /// Return
    /// ----------
    /// * The decoded record, or [`DafDasError::UnknownHandle`],
    ///   [`DafDasError::RecordOutOfRange`] when the record is not fully present,
    ///   [`DafDasError::ReservedOperand`] for a VAX reserved operand.
    pub fn read_record(&self, handle: Handle, record: usize) -> Result<DoubleRecord> {
        let (format, bytes) = self.read_bytes(handle, record)?;
        let mut values = [0.0; RECORD_DOUBLES];
        translate_doubles(format, &bytes, RECORD_DOUBLES, &mut values)?;
        Ok(values)
    }

    /// Read record `record` of `handle` as 256 integers.
    ///
    /// VAX files fail with [`DafDasError::UnsupportedBinaryFormat`].
    pub fn read_integer_record(&self, handle: Handle, record: usize) -> Result<IntegerRecord> {
        let (format, bytes) = self.read_bytes(handle, record)?;
        let mut values = [0; RECORD_INTEGERS];
        translate_integers(format, &bytes, RECORD_INTEGERS, &mut values)?;
        Ok(values)
    }

    /// Read record `record` of `handle` without translation.
    pub fn read_raw_record(&self, handle: Handle, record: usize) -> Result<RawRecord> {
        self.read_bytes(handle, record).map(|(_, bytes)| bytes)
    }

    /// Write up to 128 doubles as record `record` of `handle`, zero padded.
    ///
    /// Arguments
    /// -----------------
    /// * `handle`: Handle of a file opened for WRITE, NEW or SCRATCH access.
    /// * `record`: 1-based record number from 2 up to one past the last record.
    /// * `values`: Record content in native format.
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, or [`DafDasError::RecordSizeMismatch`] for more than 128 values,
    ///   [`DafDasError::ReadOnlyFile`], [`DafDasError::RecordOutOfRange`],
    ///   [`DafDasError::FileRecordProtected`] for record 1,
    ///   [`DafDasError::UnknownHandle`].
    pub fn write_record(&self, handle: Handle, record: usize, values: &[f64]) -> Result<()> {
        check_size(values.len(), RECORD_DOUBLES)?;
        self.write_bytes(handle, record, false, |format, buffer| {
            encode_doubles(format, values, &mut buffer[..values.len() * DOUBLE_WIDTH])
        })
    }

    /// Write up to 256 integers as record `record` of `handle`, zero padded.
    ///
    /// Record 1 holds the file record and is refused like in [`HandleManager::write_record`].
    pub fn write_integer_record(
        &self,
        handle: Handle,
        record: usize,
        values: &[i32],
    ) -> Result<()> {
        check_size(values.len(), RECORD_INTEGERS)?;
        self.write_bytes(handle, record, false, |format, buffer| {
            encode_integers(format, values, &mut buffer[..values.len() * INTEGER_WIDTH])
        })
    }

    /// Write up to 1024 bytes as record `record` of `handle`, zero padded.
    ///
    /// Record 1 is accepted here, for maintenance of the file record itself.
    pub fn write_raw_record(&self, handle: Handle, record: usize, bytes: &[u8]) -> Result<()> {
        check_size(bytes.len(), RECORD_BYTES)?;
        self.write_bytes(handle, record, true, |_, buffer| {
            buffer[..bytes.len()].copy_from_slice(bytes);
            Ok(())
        })
    }
}
