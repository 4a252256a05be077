// Zone table and lookup CSV/TSV import/export

use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use zonetool_engine::config::LookupColumns;
use zonetool_engine::{LookupEntry, ZoneId, ZoneRecord, ZoneTable};

use crate::error::{IoError, Result};

/// Read a zone table. The header row gives the schema; `zone_field` must be
/// one of its columns and every other cell must be numeric.
pub fn read_zone_table(path: &Path, name: &'static str, zone_field: &str) -> Result<ZoneTable> {
    let content = read_text(path).map_err(|e| e.in_file(path))?;
    let delimiter = delimiter_for(path).unwrap_or_else(|| sniff_delimiter(&content));
    parse_zone_table(&content, delimiter, name, zone_field).map_err(|e| e.in_file(path))
}

/// Read the zone correspondence table. Columns other than the three named
/// in `columns` are ignored.
pub fn read_lookup(path: &Path, columns: &LookupColumns) -> Result<Vec<LookupEntry>> {
    let content = read_text(path).map_err(|e| e.in_file(path))?;
    let delimiter = delimiter_for(path).unwrap_or_else(|| sniff_delimiter(&content));
    parse_lookup(&content, delimiter, columns).map_err(|e| e.in_file(path))
}

/// Write records with `zone_field` first, then `fields` in order.
pub fn write_zone_table(path: &Path, zone_field: &str, fields: &[String], records: &[ZoneRecord]) -> Result<()> {
    let delimiter = delimiter_for(path).unwrap_or(b',');
    write_records(path, delimiter, zone_field, fields, records).map_err(|e| e.in_file(path))
}

/// Delimiter implied by the file extension, if any.
pub fn delimiter_for(path: &Path) -> Option<u8> {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "tsv" || ext == "tab" => Some(b'\t'),
        _ => None,
    }
}

/// Candidate delimiters. On equal scores the later entry wins, so comma is
/// the final word.
const DELIMITERS: [u8; 4] = [b'|', b'\t', b';', b','];

/// Non-blank lines looked at when guessing the delimiter.
const SNIFF_LINES: usize = 10;

/// Guess the delimiter from the header and the first rows.
///
/// A candidate must split the header into at least two columns. Among those,
/// the one with the most sampled rows matching the header width wins, then the
/// one giving the wider header. Comma when nothing splits.
fn sniff_delimiter(content: &str) -> u8 {
    let sample = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    DELIMITERS
        .iter()
        .filter_map(|&delim| {
            let widths: Vec<usize> = csv::ReaderBuilder::new()
                .delimiter(delim)
                .has_headers(false)
                .flexible(true)
                .from_reader(sample.as_bytes())
                .records()
                .map(|row| row.map(|r| r.len()).unwrap_or(0))
                .collect();
            let header = *widths.first()?;
            if header < 2 {
                return None;
            }
            let agreeing = widths.iter().filter(|&&w| w == header).count();
            Some((agreeing, header, delim))
        })
        .max_by_key(|&(agreeing, header, _)| (agreeing, header))
        .map_or(b',', |(_, _, delim)| delim)
}

/// Read a text file into a `String`.
///
/// A byte-order mark decides the encoding (UTF-8 or UTF-16) and is removed.
/// Without one, valid UTF-8 is taken as is and anything else is decoded as
/// Windows-1252, which is how older GIS exports tend to arrive.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let encoding = match Encoding::for_bom(&bytes) {
        Some((encoding, _)) => encoding,
        None if std::str::from_utf8(&bytes).is_ok() => UTF_8,
        None => WINDOWS_1252,
    };
    let (text, _) = encoding.decode_with_bom_removal(&bytes);
    Ok(text.into_owned())
}

fn reader(content: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes())
}

fn header_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| IoError::MissingColumn(name.to_string()))
}

/// Finite `f64`. `NaN` and the infinities parse in Rust but are rejected here.
fn parse_number(value: &str, line: usize, column: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IoError::Number {
            line,
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn parse_zone_id(value: &str, line: usize, column: &str) -> Result<ZoneId> {
    if let Ok(id) = value.parse::<i64>() {
        return Ok(ZoneId(id));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(ZoneId::from_f64)
        .ok_or_else(|| IoError::ZoneId {
            line,
            column: column.to_string(),
            value: value.to_string(),
        })
}

pub fn parse_zone_table(content: &str, delimiter: u8, name: &'static str, zone_field: &str) -> Result<ZoneTable> {
    let mut reader = reader(content, delimiter);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    for (i, h) in headers.iter().enumerate() {
        if headers[..i].contains(h) {
            return Err(IoError::DuplicateColumn(h.clone()));
        }
    }
    let zone_idx = header_index(&headers, zone_field)?;
    let fields: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != zone_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row = result?;
        // header is line 1
        let line = row_idx + 2;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let zone = parse_zone_id(row.get(zone_idx).unwrap_or(""), line, zone_field)?;
        let mut values = Vec::with_capacity(fields.len());
        for (col_idx, header) in headers.iter().enumerate() {
            if col_idx == zone_idx {
                continue;
            }
            values.push((header.as_str(), parse_number(row.get(col_idx).unwrap_or(""), line, header)?));
        }
        records.push(ZoneRecord::new(zone, values));
    }

    Ok(ZoneTable::new(name, fields, records)?)
}

pub fn parse_lookup(content: &str, delimiter: u8, columns: &LookupColumns) -> Result<Vec<LookupEntry>> {
    let mut reader = reader(content, delimiter);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let old_idx = header_index(&headers, &columns.old_coarse)?;
    let fine_idx = header_index(&headers, &columns.fine)?;
    let new_idx = header_index(&headers, &columns.new_coarse)?;

    let mut entries = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row = result?;
        let line = row_idx + 2;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let cell = |idx: usize| row.get(idx).unwrap_or("");
        entries.push(LookupEntry {
            old_coarse: parse_zone_id(cell(old_idx), line, &columns.old_coarse)?,
            fine: parse_zone_id(cell(fine_idx), line, &columns.fine)?,
            new_coarse: parse_zone_id(cell(new_idx), line, &columns.new_coarse)?,
        });
    }

    Ok(entries)
}

fn format_value(value: f64) -> String {
    // avoid "-0"
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn write_records(
    path: &Path,
    delimiter: u8,
    zone_field: &str,
    fields: &[String],
    records: &[ZoneRecord],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_path(path)?;

    let mut header = Vec::with_capacity(fields.len() + 1);
    header.push(zone_field.to_string());
    header.extend(fields.iter().cloned());
    writer.write_record(&header)?;

    for record in records {
        let mut row = Vec::with_capacity(fields.len() + 1);
        row.push(record.zone().to_string());
        for field in fields {
            row.push(format_value(record.require(field)?));
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
