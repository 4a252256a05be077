//! `zonetool-engine`: zone disaggregation and re-aggregation.
//!
//! Pure engine crate: receives pre-loaded zone tables and a correspondence
//! lookup, returns the reconciled zone set. No CLI or IO dependencies.

pub mod aggregate;
pub mod config;
pub mod distribute;
pub mod error;
pub mod index;
pub mod model;
pub mod pipeline;
pub mod ratio;
pub mod reconcile;

pub use config::ZoneConfig;
pub use error::ZoneError;
pub use model::{LookupEntry, RatioPair, ZoneId, ZoneInput, ZoneOutput, ZoneRecord, ZoneTable};
pub use pipeline::run;
