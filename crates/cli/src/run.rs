//! `zonetool run`: distribute coarse totals and write the reconciled table.

use std::path::{Path, PathBuf};

use tracing::info;
use zonetool_engine::ZoneInput;
use zonetool_io::csv::{read_lookup, read_zone_table, write_zone_table};
use zonetool_io::json::{export_report, report_string};

use crate::{load_config, CliError};

const OUTPUT_EXTENSIONS: &[&str] = &["csv", "tsv"];

pub fn cmd_run(
    coarse: PathBuf,
    fine: PathBuf,
    lookup: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    json_output: bool,
    summary_file: Option<PathBuf>,
) -> Result<(), CliError> {
    check_output_extension(&output)?;
    let cfg = load_config(config.as_deref())?;
    let zone_field = cfg.zones.field.as_str();

    let input = ZoneInput {
        coarse: read_zone_table(&coarse, "coarse", zone_field)?,
        fine: read_zone_table(&fine, "fine", zone_field)?,
        lookup: read_lookup(&lookup, &cfg.lookup)?,
    };

    let result = zonetool_engine::run(&cfg, &input)?;

    write_zone_table(&output, zone_field, &result.fields, &result.records)?;
    info!(path = %output.display(), zones = result.records.len(), "wrote output table");

    if let Some(ref path) = summary_file {
        export_report(&result, path)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{}", report_string(&result)?);
    }

    let s = &result.summary;
    eprintln!(
        "{} zones written to {}: {} derived from {} replaced, {} passed through, {} placeholders",
        s.total_zones,
        output.display(),
        s.new_zones_derived,
        s.coarse_zones_replaced,
        s.passthrough_zones,
        s.placeholder_zones,
    );
    if s.fine_zones_missing > 0 {
        eprintln!("note: {} lookup fine zone(s) not found in {}", s.fine_zones_missing, fine.display());
    }

    Ok(())
}

fn check_output_extension(path: &Path) -> Result<(), CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if OUTPUT_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(());
    }
    Err(CliError::usage(format!("unsupported output file: {}", path.display()))
        .with_hint("output must end in .csv or .tsv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE;

    #[test]
    fn accepts_csv_and_tsv() {
        assert!(check_output_extension(Path::new("out.csv")).is_ok());
        assert!(check_output_extension(Path::new("dir/out.TSV")).is_ok());
    }

    #[test]
    fn rejects_other_extensions() {
        for name in ["out.dbf", "out", "out.csv.bak"] {
            let err = check_output_extension(Path::new(name)).unwrap_err();
            assert_eq!(err.code, EXIT_USAGE);
            assert!(err.hint.is_some());
        }
    }
}
