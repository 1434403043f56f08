//! File table: one row per open file, kept dense and in opening order.
//!
//! Rows are appended when a file is opened and removed when it is closed. Removal shifts
//! every later row down by one, so the relative order of the surviving rows never changes.

use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    binary_format::{AccessMode, Architecture, BinaryFormat},
    constants::{Handle, LogicalUnit},
    dafdas_errors::{DafDasError, Result},
};

/// Bookkeeping for one open file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTableRow {
    pub handle: Handle,
    pub name: Utf8PathBuf,
    pub access: AccessMode,
    pub architecture: Architecture,
    pub format: BinaryFormat,
    /// Logical unit currently connected to the file; `None` while detached.
    pub unit: Option<LogicalUnit>,
    /// Canonical path, used to recognize a file opened twice. `None` for scratch files.
    pub(crate) key: Option<Utf8PathBuf>,
}

#[derive(Debug)]
pub struct FileTable {
    rows: Vec<FileTableRow>,
    capacity: usize,
}

impl FileTable {
    pub fn new(capacity: usize) -> Self {
        FileTable {
            rows: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn rows(&self) -> &[FileTableRow] {
        &self.rows
    }

    /// Append a row; fails with [`DafDasError::TooManyOpenFiles`] when the table is full.
    pub fn insert(&mut self, row: FileTableRow) -> Result<()> {
        if self.is_full() {
            return Err(DafDasError::TooManyOpenFiles {
                capacity: self.capacity,
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Position of `handle` in the table. Zero and negative handles are never present.
    pub fn index_of(&self, handle: Handle) -> Option<usize> {
        if handle <= 0 {
            return None;
        }
        self.rows.iter().position(|row| row.handle == handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&FileTableRow> {
        self.index_of(handle).map(|index| &self.rows[index])
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut FileTableRow> {
        self.index_of(handle).map(move |index| &mut self.rows[index])
    }

    /// Remove the row of `handle`, shifting later rows down.
    pub fn remove(&mut self, handle: Handle) -> Option<FileTableRow> {
        self.index_of(handle).map(|index| self.rows.remove(index))
    }

    pub fn find_by_key(&self, key: &Utf8Path) -> Option<&FileTableRow> {
        self.rows.iter().find(|row| row.key.as_deref() == Some(key))
    }

    pub fn find_by_name(&self, name: &Utf8Path) -> Option<&FileTableRow> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Mark the file of `handle` as detached from its logical unit.
    pub fn clear_unit(&mut self, handle: Handle) {
        if let Some(row) = self.get_mut(handle) {
            row.unit = None;
        }
    }

    pub fn count(&self, architecture: Option<Architecture>) -> usize {
        self.rows
            .iter()
            .filter(|row| architecture.map_or(true, |arch| row.architecture == arch))
            .count()
    }
}

#[cfg(test)]
mod test_file_table {
    use super::*;

    fn row(handle: Handle, name: &str, unit: Option<LogicalUnit>) -> FileTableRow {
        FileTableRow {
            handle,
            name: name.into(),
            access: AccessMode::Read,
            architecture: Architecture::Daf,
            format: BinaryFormat::native(),
            unit,
            key: Some(name.into()),
        }
    }

    #[test]
    fn test_capacity() {
        let mut table = FileTable::new(2);
        table.insert(row(1, "a", Some(1))).unwrap();
        table.insert(row(2, "b", Some(2))).unwrap();
        assert!(table.is_full());
        assert!(matches!(
            table.insert(row(3, "c", Some(3))),
            Err(DafDasError::TooManyOpenFiles { capacity: 2 })
        ));
        assert_eq!(table.len(), 2);
        assert!(table.get(1).is_some());
        assert!(table.get(2).is_some());
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut table = FileTable::new(10);
        for (handle, name) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            table.insert(row(handle, name, Some(handle + 10))).unwrap();
        }

        let removed = table.remove(2).unwrap();
        assert_eq!(removed.name, "b");

        let rows = table.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| (r.handle, r.unit)).collect::<Vec<_>>(),
            vec![(1, Some(11)), (3, Some(13)), (4, Some(14))]
        );
        assert_eq!(table.index_of(3), Some(1));
        assert!(table.remove(2).is_none());
    }

    #[test]
    fn test_invalid_handles_never_found() {
        let mut table = FileTable::new(3);
        table.insert(row(1, "a", None)).unwrap();
        assert_eq!(table.index_of(0), None);
        assert_eq!(table.index_of(-1), None);
        assert_eq!(table.index_of(1), Some(0));
    }

    #[test]
    fn test_lookup_by_name_and_count() {
        let mut table = FileTable::new(3);
        table.insert(row(1, "a", None)).unwrap();
        let mut das = row(2, "b", Some(4));
        das.architecture = Architecture::Das;
        table.insert(das).unwrap();

        assert_eq!(table.find_by_name(Utf8Path::new("b")).map(|r| r.handle), Some(2));
        assert_eq!(table.find_by_key(Utf8Path::new("a")).map(|r| r.handle), Some(1));
        assert_eq!(table.count(None), 2);
        assert_eq!(table.count(Some(Architecture::Das)), 1);

        table.clear_unit(2);
        assert_eq!(table.get(2).unwrap().unit, None);
    }
}
