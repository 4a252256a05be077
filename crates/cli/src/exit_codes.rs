//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                   |
//! |------|-----------|-----------------------------------------------|
//! | 0    | Universal | Success                                       |
//! | 1    | Universal | General error (unspecified)                   |
//! | 2    | Universal | CLI usage error (bad args, output extension)  |
//! | 3    | io        | Cannot read or write a file                   |
//! | 4    | io        | Input table or lookup cannot be parsed        |
//! | 5    | config    | Config file invalid                           |
//! | 6    | pipeline  | Schema mismatch, lookup conflict, no matches  |
//! | 7    | reconcile | Duplicate zone ID in reconciled output        |

use zonetool_engine::ZoneError;
use zonetool_io::IoError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unsupported output extension.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// IO (3-4)
// =============================================================================

/// File missing, unreadable or unwritable.
pub const EXIT_IO: u8 = 3;

/// Malformed CSV, missing column, non-numeric cell, bad zone ID.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Config (5)
// =============================================================================

/// Config TOML does not parse or fails validation.
pub const EXIT_CONFIG: u8 = 5;

// =============================================================================
// Pipeline (6-7)
// =============================================================================

/// Pipeline error: schema mismatch, lookup conflict, unpaired ratio field,
/// no coarse zone matching the lookup.
pub const EXIT_PIPELINE: u8 = 6;

/// Reconciled output would contain a zone ID twice.
pub const EXIT_RECONCILE: u8 = 7;

// =============================================================================
// Mapping
// =============================================================================

pub fn zone_exit_code(err: &ZoneError) -> u8 {
    match err {
        ZoneError::ConfigParse(_) | ZoneError::ConfigValidation(_) => EXIT_CONFIG,
        ZoneError::DuplicateZone { .. } => EXIT_RECONCILE,
        ZoneError::DuplicateInTable { .. }
        | ZoneError::DuplicateField { .. }
        | ZoneError::UnexpectedField { .. } => EXIT_PARSE,
        ZoneError::SchemaMismatch { .. }
        | ZoneError::UnpairedField { .. }
        | ZoneError::LookupConflict { .. }
        | ZoneError::UnmappedFineZone(_)
        | ZoneError::NoMatchingCoarseZones(_) => EXIT_PIPELINE,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::File { source, .. } => io_exit_code(source),
        IoError::Os(_) => EXIT_IO,
        IoError::Csv(e) if e.is_io_error() => EXIT_IO,
        IoError::Csv(_)
        | IoError::MissingColumn(_)
        | IoError::DuplicateColumn(_)
        | IoError::Number { .. }
        | IoError::ZoneId { .. }
        | IoError::Json(_) => EXIT_PARSE,
        IoError::Table(e) => zone_exit_code(e),
    }
}
