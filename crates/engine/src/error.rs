use thiserror::Error;

use crate::model::ZoneId;

#[derive(Debug, Error)]
pub enum ZoneError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty names, clashing columns, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// A record lacks a field the pipeline needs.
    #[error("zone {zone}: missing field '{field}'")]
    SchemaMismatch { zone: ZoneId, field: String },

    /// A record carries a field outside its table's schema.
    #[error("{table} table: zone {zone} carries field '{field}' outside the table schema")]
    UnexpectedField {
        table: &'static str,
        zone: ZoneId,
        field: String,
    },

    /// A table schema lists the same field twice.
    #[error("{table} table: field '{field}' listed twice in the schema")]
    DuplicateField { table: &'static str, field: String },

    /// A ratio pair names a field the coarse schema does not carry.
    #[error("ratio pair '{code}': field '{field}' not in coarse schema")]
    UnpairedField { code: String, field: String },

    /// Two records in one table share an ID.
    #[error("{table} table: duplicate zone {zone}")]
    DuplicateInTable { table: &'static str, zone: ZoneId },

    /// A fine zone is listed with two different parents or targets.
    #[error("lookup conflict for fine zone {fine}: {detail}")]
    LookupConflict { fine: ZoneId, detail: String },

    /// A distributed fine record has no new-coarse target in the lookup.
    #[error("fine zone {0} has no new-coarse zone in the lookup")]
    UnmappedFineZone(ZoneId),

    /// Lookup retires zones but none of them exist in the coarse table.
    #[error("none of the {0} zone(s) to replace exist in the coarse table")]
    NoMatchingCoarseZones(usize),

    /// Reconciled output would contain the same zone twice.
    #[error("zone {zone} appears twice in reconciled output ({first} and {second})")]
    DuplicateZone {
        zone: ZoneId,
        first: &'static str,
        second: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ZoneError>;
