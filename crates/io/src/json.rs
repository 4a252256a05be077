// Run report JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use zonetool_engine::ZoneOutput;

use crate::error::{IoError, Result};

/// Run metadata and summary as pretty JSON. Records are not included.
pub fn report_string(output: &ZoneOutput) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

pub fn export_report(output: &ZoneOutput, path: &Path) -> Result<()> {
    let write = || -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, output)?;
        Ok(())
    };
    write().map_err(|e: IoError| e.in_file(path))
}
