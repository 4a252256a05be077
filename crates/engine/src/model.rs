use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::{Result, ZoneError};

// ---------------------------------------------------------------------------
// Zone identity
// ---------------------------------------------------------------------------

/// Integer zone identifier. Ordering is numeric, so sorted output reads
/// 9, 10, 101 rather than 10, 101, 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ZoneId(pub i64);

impl ZoneId {
    /// Accept integral floats (`101.0`) as zone IDs; tables exported from
    /// numeric columns often carry them that way.
    pub fn from_f64(value: f64) -> Option<Self> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Some(Self(value as i64))
        } else {
            None
        }
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ZoneId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One zone's attribute values.
///
/// Records are values: every pipeline stage builds new records instead of
/// editing the ones it was given. Transient synthetic totals live in their
/// own map keyed by ratio code, so they can never shadow a real field.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    zone: ZoneId,
    values: BTreeMap<String, f64>,
    synthetic: BTreeMap<String, f64>,
}

impl ZoneRecord {
    pub fn new<I, S>(zone: ZoneId, values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            zone,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            synthetic: BTreeMap::new(),
        }
    }

    /// Placeholder with every field set to zero.
    pub fn zeroed(zone: ZoneId, fields: &[String]) -> Self {
        Self::new(zone, fields.iter().map(|f| (f.clone(), 0.0)))
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    /// Field value, or a schema error naming this zone and the field.
    pub fn require(&self, field: &str) -> Result<f64> {
        self.get(field).ok_or_else(|| ZoneError::SchemaMismatch {
            zone: self.zone,
            field: field.to_string(),
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    pub fn synthetic(&self, code: &str) -> Option<f64> {
        self.synthetic.get(code).copied()
    }

    pub fn synthetic_totals(&self) -> impl Iterator<Item = (&str, f64)> {
        self.synthetic.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn has_synthetic(&self) -> bool {
        !self.synthetic.is_empty()
    }

    pub fn with_zone(mut self, zone: ZoneId) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_value(mut self, field: &str, value: f64) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    pub fn with_synthetic(mut self, code: &str, value: f64) -> Self {
        self.synthetic.insert(code.to_string(), value);
        self
    }

    pub fn without_synthetic(mut self, code: &str) -> Self {
        self.synthetic.remove(code);
        self
    }

    /// Restrict to exactly `schema`, failing if a schema field is absent.
    /// Synthetic totals are dropped.
    pub fn project(&self, schema: &[String]) -> Result<ZoneRecord> {
        let values = schema
            .iter()
            .map(|field| Ok((field.clone(), self.require(field)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(ZoneRecord {
            zone: self.zone,
            values,
            synthetic: BTreeMap::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// An ordered set of records sharing one field schema.
#[derive(Debug, Clone)]
pub struct ZoneTable {
    fields: Vec<String>,
    records: Vec<ZoneRecord>,
}

impl ZoneTable {
    /// Build a table, checking that every record carries exactly `fields`
    /// and that zone IDs are unique. `name` labels errors.
    pub fn new(name: &'static str, fields: Vec<String>, records: Vec<ZoneRecord>) -> Result<Self> {
        let mut names: FxHashSet<&str> = FxHashSet::default();
        if let Some(dup) = fields.iter().find(|f| !names.insert(f.as_str())) {
            return Err(ZoneError::DuplicateField {
                table: name,
                field: dup.clone(),
            });
        }

        let mut seen: FxHashSet<ZoneId> = FxHashSet::default();
        for record in &records {
            if !seen.insert(record.zone()) {
                return Err(ZoneError::DuplicateInTable {
                    table: name,
                    zone: record.zone(),
                });
            }
            for field in &fields {
                record.require(field)?;
            }
            if record.field_count() != fields.len() {
                let extra = record
                    .fields()
                    .map(|(k, _)| k)
                    .find(|k| !fields.iter().any(|f| f == k))
                    .map(str::to_string)
                    .unwrap_or_default();
                return Err(ZoneError::UnexpectedField {
                    table: name,
                    zone: record.zone(),
                    field: extra,
                });
            }
        }
        Ok(Self { fields, records })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn records(&self) -> &[ZoneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// One row of the zone correspondence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupEntry {
    pub old_coarse: ZoneId,
    pub fine: ZoneId,
    pub new_coarse: ZoneId,
}

impl LookupEntry {
    pub fn new(old_coarse: i64, fine: i64, new_coarse: i64) -> Self {
        Self {
            old_coarse: ZoneId(old_coarse),
            fine: ZoneId(fine),
            new_coarse: ZoneId(new_coarse),
        }
    }
}

/// Ratio metric carried as a count field over a total field, sharing `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatioPair {
    pub code: String,
    pub count_field: String,
    pub total_field: String,
}

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Pre-loaded tables for one run.
pub struct ZoneInput {
    pub coarse: ZoneTable,
    pub fine: ZoneTable,
    pub lookup: Vec<LookupEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub coarse_zones_replaced: usize,
    pub fine_zones_distributed: usize,
    pub fine_zones_missing: usize,
    pub new_zones_derived: usize,
    pub passthrough_zones: usize,
    pub placeholder_zones: usize,
    pub total_zones: usize,
    pub ratio_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneOutput {
    pub meta: RunMeta,
    pub summary: RunSummary,
    /// Output schema (coarse table order, zone field excluded).
    pub fields: Vec<String>,
    #[serde(skip)]
    pub records: Vec<ZoneRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zone_id_from_integral_float() {
        assert_eq!(ZoneId::from_f64(101.0), Some(ZoneId(101)));
        assert_eq!(ZoneId::from_f64(-3.0), Some(ZoneId(-3)));
        assert_eq!(ZoneId::from_f64(101.5), None);
        assert_eq!(ZoneId::from_f64(f64::NAN), None);
    }

    #[test]
    fn zone_ids_sort_numerically() {
        let mut ids = vec![ZoneId(101), ZoneId(9), ZoneId(10)];
        ids.sort();
        assert_eq!(ids, vec![ZoneId(9), ZoneId(10), ZoneId(101)]);
    }

    #[test]
    fn builders_leave_original_untouched() {
        let original = ZoneRecord::new(ZoneId(1), [("POP", 10.0)]);
        let changed = original.clone().with_value("POP", 20.0).with_synthetic("A", 5.0);
        assert_eq!(original.get("POP"), Some(10.0));
        assert!(!original.has_synthetic());
        assert_eq!(changed.get("POP"), Some(20.0));
        assert_eq!(changed.synthetic("A"), Some(5.0));
    }

    #[test]
    fn require_reports_zone_and_field() {
        let rec = ZoneRecord::new(ZoneId(7), [("POP", 1.0)]);
        let err = rec.require("EMP_A").unwrap_err();
        assert_eq!(err.to_string(), "zone 7: missing field 'EMP_A'");
    }

    #[test]
    fn project_drops_extra_fields_and_synthetics() {
        let rec = ZoneRecord::new(ZoneId(1), [("POP", 1.0), ("EXTRA", 2.0)]).with_synthetic("A", 3.0);
        let projected = rec.project(&fields(&["POP"])).unwrap();
        assert_eq!(projected.field_count(), 1);
        assert!(!projected.has_synthetic());
    }

    #[test]
    fn project_fails_on_missing_field() {
        let rec = ZoneRecord::new(ZoneId(1), [("POP", 1.0)]);
        assert!(matches!(
            rec.project(&fields(&["POP", "EMP_A"])),
            Err(ZoneError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn zeroed_sets_every_field() {
        let rec = ZoneRecord::zeroed(ZoneId(4), &fields(&["POP", "EMP_A"]));
        assert_eq!(rec.zone(), ZoneId(4));
        assert_eq!(rec.get("POP"), Some(0.0));
        assert_eq!(rec.get("EMP_A"), Some(0.0));
    }

    #[test]
    fn table_rejects_duplicate_zone() {
        let recs = vec![
            ZoneRecord::new(ZoneId(1), [("POP", 1.0)]),
            ZoneRecord::new(ZoneId(1), [("POP", 2.0)]),
        ];
        let err = ZoneTable::new("coarse", fields(&["POP"]), recs).unwrap_err();
        assert!(matches!(err, ZoneError::DuplicateInTable { table: "coarse", zone: ZoneId(1) }));
    }

    #[test]
    fn table_rejects_ragged_schema() {
        let recs = vec![
            ZoneRecord::new(ZoneId(1), [("POP", 1.0), ("EMP_A", 1.0)]),
            ZoneRecord::new(ZoneId(2), [("POP", 2.0)]),
        ];
        let err = ZoneTable::new("fine", fields(&["POP", "EMP_A"]), recs).unwrap_err();
        assert!(matches!(err, ZoneError::SchemaMismatch { zone: ZoneId(2), .. }));

        let recs = vec![ZoneRecord::new(ZoneId(1), [("POP", 1.0), ("STRAY", 1.0)])];
        let err = ZoneTable::new("fine", fields(&["POP"]), recs).unwrap_err();
        assert!(err.to_string().contains("STRAY"));
    }

    #[test]
    fn table_rejects_duplicate_schema_field() {
        let recs = vec![ZoneRecord::new(ZoneId(1), [("POP", 1.0)])];
        let err = ZoneTable::new("coarse", fields(&["POP", "POP"]), recs).unwrap_err();
        assert!(matches!(err, ZoneError::DuplicateField { table: "coarse", ref field } if field == "POP"));
    }
}
