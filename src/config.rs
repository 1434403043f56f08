//! # Handle manager configuration
//!
//! [`ManagerConfig`] carries the capacity limits a
//! [`HandleManager`](crate::handle_manager::HandleManager) enforces. The defaults reproduce
//! the classic toolkit values from [`crate::constants`]; smaller tables are mostly useful in
//! tests, larger ones for programs that keep thousands of kernels loaded.
//!
//! The structure derives `serde` traits so it can be embedded in an application's own
//! configuration file; missing fields take their default value.
//!
//! ```rust
//! use dafdas::config::ManagerConfig;
//!
//! let config = ManagerConfig::default()
//!     .with_max_open_files(8)
//!     .with_unit_table_size(3);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        LogicalUnit, FILE_NAME_LEN, FTSIZE, MAX_LOGICAL_UNIT, RESERVED_UNITS, SCRUNT, UTSIZE,
    },
    dafdas_errors::{DafDasError, Result},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Capacity of the file table.
    pub max_open_files: usize,
    /// Capacity of the unit table (simultaneously connected streams).
    pub unit_table_size: usize,
    /// Unit table rows only scratch files may occupy.
    pub scratch_units: usize,
    /// Logical unit numbers never handed out.
    pub reserved_units: Vec<LogicalUnit>,
    /// Largest logical unit number; the pool is `1..=max_logical_unit`.
    pub max_logical_unit: LogicalUnit,
    /// Longest accepted file name, in bytes.
    pub max_file_name_len: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            max_open_files: FTSIZE,
            unit_table_size: UTSIZE,
            scratch_units: SCRUNT,
            reserved_units: RESERVED_UNITS.to_vec(),
            max_logical_unit: MAX_LOGICAL_UNIT,
            max_file_name_len: FILE_NAME_LEN,
        }
    }
}

impl ManagerConfig {
    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files;
        self
    }

    pub fn with_unit_table_size(mut self, unit_table_size: usize) -> Self {
        self.unit_table_size = unit_table_size;
        self
    }

    pub fn with_scratch_units(mut self, scratch_units: usize) -> Self {
        self.scratch_units = scratch_units;
        self
    }

    pub fn with_reserved_units(mut self, reserved_units: Vec<LogicalUnit>) -> Self {
        self.reserved_units = reserved_units;
        self
    }

    pub fn with_max_logical_unit(mut self, max_logical_unit: LogicalUnit) -> Self {
        self.max_logical_unit = max_logical_unit;
        self
    }

    pub fn with_max_file_name_len(mut self, max_file_name_len: usize) -> Self {
        self.max_file_name_len = max_file_name_len;
        self
    }

    /// Number of logical unit numbers the pool can actually hand out.
    pub fn assignable_units(&self) -> usize {
        (1..=self.max_logical_unit)
            .filter(|unit| !self.reserved_units.contains(unit))
            .count()
    }

    /// Check the limits are consistent with each other.
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, or [`DafDasError::InvalidConfig`] naming the first inconsistency:
    ///   an empty file table, a unit table with no room for non-scratch files, or fewer
    ///   assignable logical unit numbers than unit table rows.
    pub fn validate(&self) -> Result<()> {
        if self.max_open_files == 0 {
            return Err(DafDasError::InvalidConfig(
                "max_open_files must be at least 1".into(),
            ));
        }
        if self.unit_table_size <= self.scratch_units {
            return Err(DafDasError::InvalidConfig(format!(
                "unit_table_size ({}) must exceed scratch_units ({})",
                self.unit_table_size, self.scratch_units
            )));
        }
        if self.max_logical_unit < 1 {
            return Err(DafDasError::InvalidConfig(
                "max_logical_unit must be positive".into(),
            ));
        }
        let assignable = self.assignable_units();
        if assignable < self.unit_table_size {
            return Err(DafDasError::InvalidConfig(format!(
                "{assignable} assignable logical units cannot back {} unit table rows",
                self.unit_table_size
            )));
        }
        if self.max_file_name_len == 0 {
            return Err(DafDasError::InvalidConfig(
                "max_file_name_len must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = ManagerConfig::default();
        assert_eq!(config.max_open_files, 5000);
        assert_eq!(config.unit_table_size, 23);
        assert_eq!(config.scratch_units, 1);
        assert_eq!(config.reserved_units, vec![5, 6]);
        assert_eq!(config.assignable_units(), 97);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let base = ManagerConfig::default();
        assert!(base.clone().with_max_open_files(0).validate().is_err());
        assert!(base.clone().with_unit_table_size(1).validate().is_err());
        assert!(base
            .clone()
            .with_max_logical_unit(10)
            .with_unit_table_size(9)
            .validate()
            .is_err());
        assert!(base
            .clone()
            .with_max_logical_unit(10)
            .with_unit_table_size(8)
            .validate()
            .is_ok());
        assert!(base.with_max_file_name_len(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{ "max_open_files": 16, "reserved_units": [1] }"#).unwrap();
        assert_eq!(config.max_open_files, 16);
        assert_eq!(config.reserved_units, vec![1]);
        assert_eq!(config.unit_table_size, 23);
        assert_eq!(config.max_file_name_len, 255);
    }
}
