//! # Unit table
//!
//! The unit table holds the logical units currently connected to open files. It is much
//! smaller than the file table: a file without a unit is re-attached on demand, either by
//! reserving a fresh row or by stealing the least recently used one.
//!
//! ## Rules
//!
//! * A row is either unattached (just reserved) or attached to exactly one handle.
//! * `scratch_units` rows are kept for scratch files: non-scratch requests may only grow
//!   the table to `capacity - scratch_units` rows.
//! * Logical unit numbers come from `1..=max_logical_unit` minus the reserved system units,
//!   lowest free number first.
//! * A locked row, or a row attached to a scratch file, is never picked as a victim.
//! * Every use of a row stamps it with the next request count ("cost"). When the counter
//!   would overflow, costs are renumbered `1..=n` keeping their order.
//!
//! Removing a row shifts the later rows down by one; positions are never left empty.

use std::{collections::BTreeSet, fs::File};

use tracing::trace;

use crate::{
    config::ManagerConfig,
    constants::{Handle, LogicalUnit},
    dafdas_errors::{DafDasError, Result},
};

/// One connected logical unit.
#[derive(Debug)]
pub struct UnitTableRow {
    pub unit: LogicalUnit,
    /// Handle of the file using the unit, `None` while only reserved.
    pub handle: Option<Handle>,
    pub locked: bool,
    /// Request count of the last use.
    pub cost: u64,
    /// Row attached to a scratch file.
    pub scratch: bool,
    pub(crate) stream: Option<File>,
}

#[derive(Debug)]
pub struct UnitTable {
    rows: Vec<UnitTableRow>,
    capacity: usize,
    scratch_units: usize,
    reserved: Vec<LogicalUnit>,
    free_units: BTreeSet<LogicalUnit>,
    request_count: u64,
}

impl UnitTable {
    pub fn new(config: &ManagerConfig) -> Self {
        let free_units = (1..=config.max_logical_unit)
            .filter(|unit| !config.reserved_units.contains(unit))
            .collect();
        UnitTable {
            rows: Vec::with_capacity(config.unit_table_size),
            capacity: config.unit_table_size,
            scratch_units: config.scratch_units,
            reserved: config.reserved_units.clone(),
            free_units,
            request_count: 0,
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

    pub fn rows(&self) -> &[UnitTableRow] {
        &self.rows
    }

    /// `true` when a request of this kind can add a row without stealing one.
    pub fn has_room(&self, scratch: bool) -> bool {
        let limit = if scratch {
            self.capacity
        } else {
            self.capacity.saturating_sub(self.scratch_units)
        };
        self.rows.len() < limit && !self.free_units.is_empty()
    }

    /// Reserve the lowest free logical unit and append an unattached row for it.
    ///
    /// Arguments
    /// -----------------
    /// * `scratch`: The unit is for a scratch file and may use the rows kept for them.
    ///
    /// Return
    /// ----------
    /// * The reserved unit number, or [`DafDasError::NoUnitsAvailable`] when the row limit
    ///   for this kind of request is reached or the number pool is empty.
    pub fn reserve_unit(&mut self, scratch: bool) -> Result<LogicalUnit> {
        let index = self.reserve_row(scratch)?;
        Ok(self.rows[index].unit)
    }

    pub(crate) fn reserve_row(&mut self, scratch: bool) -> Result<usize> {
        if !self.has_room(scratch) {
            return Err(DafDasError::NoUnitsAvailable {
                in_use: self.rows.len(),
            });
        }
        let unit = self
            .free_units
            .pop_first()
            .ok_or(DafDasError::NoUnitsAvailable {
                in_use: self.rows.len(),
            })?;
        self.rows.push(UnitTableRow {
            unit,
            handle: None,
            locked: false,
            cost: 0,
            scratch,
            stream: None,
        });
        trace!(unit, scratch, "unit reserved");
        Ok(self.rows.len() - 1)
    }

    pub fn index_of(&self, unit: LogicalUnit) -> Option<usize> {
        self.rows.iter().position(|row| row.unit == unit)
    }

    pub fn index_for_handle(&self, handle: Handle) -> Option<usize> {
        self.rows.iter().position(|row| row.handle == Some(handle))
    }

    /// Lock `unit` to `handle`, preventing it from being stolen.
    ///
    /// Locking a unit again for the handle that already holds the lock succeeds. A unit held by
    /// another handle is refused with [`DafDasError::UnitAlreadyLocked`] when that handle locked
    /// it, [`DafDasError::UnitInUse`] otherwise.
    pub fn lock_unit(&mut self, unit: LogicalUnit, handle: Handle) -> Result<()> {
        let index = self.index_of(unit).ok_or(DafDasError::NoSuchUnit(unit))?;
        let row = &mut self.rows[index];
        match row.handle {
            Some(owner) if owner != handle && row.locked => Err(DafDasError::UnitAlreadyLocked {
                unit,
                owner,
                requested: handle,
            }),
            Some(owner) if owner != handle => Err(DafDasError::UnitInUse {
                unit,
                owner,
                requested: handle,
            }),
            _ => {
                row.handle = Some(handle);
                row.locked = true;
                Ok(())
            }
        }
    }

    pub fn unlock_unit(&mut self, unit: LogicalUnit) -> Result<()> {
        let index = self.index_of(unit).ok_or(DafDasError::NoSuchUnit(unit))?;
        self.rows[index].locked = false;
        Ok(())
    }

    /// Close the stream of `unit`, remove its row and return the number to the pool.
    pub fn release_unit(&mut self, unit: LogicalUnit) -> Result<UnitTableRow> {
        let index = self.index_of(unit).ok_or(DafDasError::NoSuchUnit(unit))?;
        self.remove_row(index).ok_or(DafDasError::NoSuchUnit(unit))
    }

    pub fn lookup_handle_for_unit(&self, unit: LogicalUnit) -> Option<Handle> {
        self.index_of(unit).and_then(|index| self.rows[index].handle)
    }

    /// Remove the row at `index`, shifting the later rows down.
    ///
    /// The unit number goes back to the pool unless it is zero or a reserved system unit.
    /// The removed row is returned; dropping it closes its stream.
    pub fn remove_row(&mut self, index: usize) -> Option<UnitTableRow> {
        if index >= self.rows.len() {
            return None;
        }
        let row = self.rows.remove(index);
        if row.unit > 0 && !self.reserved.contains(&row.unit) {
            self.free_units.insert(row.unit);
        }
        trace!(unit = row.unit, index, "unit row removed");
        Some(row)
    }

    /// Stamp the row at `index` with the next request count.
    pub fn touch(&mut self, index: usize) {
        let next = match self.request_count.checked_add(1) {
            Some(next) => next,
            None => self.renormalise_costs() + 1,
        };
        self.request_count = next;
        if let Some(row) = self.rows.get_mut(index) {
            row.cost = next;
        }
    }

    /// Renumber costs `1..=n` keeping their order; returns `n`.
    fn renormalise_costs(&mut self) -> u64 {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by_key(|index| self.rows[*index].cost);
        for (rank, index) in order.into_iter().enumerate() {
            self.rows[index].cost = rank as u64 + 1;
        }
        self.rows.len() as u64
    }

    /// Position of the row to steal: the lowest cost among rows that are neither locked
    /// nor attached to a scratch file.
    pub fn least_recently_used(&self) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.locked && !(row.scratch && row.handle.is_some()))
            .min_by_key(|(_, row)| row.cost)
            .map(|(index, _)| index)
    }

    pub(crate) fn attach(&mut self, index: usize, handle: Handle, stream: File, scratch: bool) {
        let row = &mut self.rows[index];
        row.handle = Some(handle);
        row.stream = Some(stream);
        row.scratch = scratch;
        row.locked = false;
    }

    /// Close the stream of the row at `index` and forget its handle, keeping the row.
    pub(crate) fn detach(&mut self, index: usize) -> Option<Handle> {
        let row = self.rows.get_mut(index)?;
        row.stream = None;
        row.locked = false;
        row.scratch = false;
        row.handle.take()
    }

    pub(crate) fn stream_mut(&mut self, index: usize) -> Option<&mut File> {
        self.rows.get_mut(index).and_then(|row| row.stream.as_mut())
    }

    #[cfg(test)]
    pub(crate) fn set_request_count(&mut self, count: u64) {
        self.request_count = count;
    }
}
