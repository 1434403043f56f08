pub mod binary_format;
pub mod config;
pub mod constants;
pub mod dafdas_errors;
pub mod file_record;
pub mod handle_manager;
pub mod translate;

pub use binary_format::{AccessMode, Architecture, BinaryFormat};
pub use config::ManagerConfig;
pub use dafdas_errors::{DafDasError, Result};
pub use handle_manager::{FileInfo, HandleManager, UnitRowInfo};
