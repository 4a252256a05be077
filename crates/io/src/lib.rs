// File I/O for zone tables, lookups and run reports

pub mod csv;
pub mod error;
pub mod json;

pub use error::IoError;
