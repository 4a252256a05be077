//! Final merge of derived zones, pass-through coarse zones and placeholders.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{Result, ZoneError};
use crate::model::{ZoneId, ZoneRecord, ZoneTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSource {
    Derived,
    Passthrough,
    Placeholder,
}

impl ZoneSource {
    fn label(self) -> &'static str {
        match self {
            Self::Derived => "derived",
            Self::Passthrough => "pass-through",
            Self::Placeholder => "placeholder",
        }
    }
}

#[derive(Debug, Default)]
pub struct Reconciled {
    /// Ascending by zone, every record in the coarse schema.
    pub records: Vec<ZoneRecord>,
    pub derived: usize,
    pub passthrough: usize,
    pub placeholders: usize,
}

/// Merge into one zone-sorted set:
/// - every derived zone, projected onto the coarse schema,
/// - every coarse zone that is neither retired nor a new zone ID,
/// - an all-zero record for every retired zone,
/// - an all-zero record for every new zone ID that nothing was derived for.
///
/// The output IDs are therefore the coarse, retired and new IDs, each once.
/// An empty `derived` list is fine. A zone arriving twice is an error.
pub fn reconcile(
    derived: Vec<ZoneRecord>,
    coarse: &ZoneTable,
    retired: &BTreeSet<ZoneId>,
    new_ids: &BTreeSet<ZoneId>,
) -> Result<Reconciled> {
    let schema = coarse.fields();
    let mut merged: BTreeMap<ZoneId, (ZoneSource, ZoneRecord)> = BTreeMap::new();
    let mut out = Reconciled::default();

    for record in &derived {
        insert_unique(&mut merged, ZoneSource::Derived, record.project(schema)?)?;
        out.derived += 1;
    }

    for record in coarse.records() {
        let zone = record.zone();
        if retired.contains(&zone) || new_ids.contains(&zone) {
            continue;
        }
        insert_unique(&mut merged, ZoneSource::Passthrough, record.clone())?;
        out.passthrough += 1;
    }

    for &zone in retired {
        insert_unique(&mut merged, ZoneSource::Placeholder, ZoneRecord::zeroed(zone, schema))?;
        out.placeholders += 1;
    }

    for &zone in new_ids {
        if let Entry::Vacant(slot) = merged.entry(zone) {
            warn!(%zone, "no fine records reached new zone; writing placeholder");
            slot.insert((ZoneSource::Placeholder, ZoneRecord::zeroed(zone, schema)));
            out.placeholders += 1;
        }
    }

    out.records = merged.into_values().map(|(_, rec)| rec).collect();
    Ok(out)
}

fn insert_unique(
    merged: &mut BTreeMap<ZoneId, (ZoneSource, ZoneRecord)>,
    source: ZoneSource,
    record: ZoneRecord,
) -> Result<()> {
    match merged.entry(record.zone()) {
        Entry::Occupied(existing) => Err(ZoneError::DuplicateZone {
            zone: record.zone(),
            first: existing.get().0.label(),
            second: source.label(),
        }),
        Entry::Vacant(slot) => {
            slot.insert((source, record));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<String> {
        vec!["POP".into(), "EMP_A".into()]
    }

    fn coarse() -> ZoneTable {
        ZoneTable::new(
            "coarse",
            schema(),
            vec![
                ZoneRecord::new(ZoneId(3), [("POP", 30.0), ("EMP_A", 3.0)]),
                ZoneRecord::new(ZoneId(1), [("POP", 10.0), ("EMP_A", 1.0)]),
                ZoneRecord::new(ZoneId(2), [("POP", 20.0), ("EMP_A", 2.0)]),
                ZoneRecord::new(ZoneId(9), [("POP", 90.0), ("EMP_A", 9.0)]),
            ],
        )
        .unwrap()
    }

    fn ids(zones: &[i64]) -> BTreeSet<ZoneId> {
        zones.iter().map(|&z| ZoneId(z)).collect()
    }

    fn zones(records: &[ZoneRecord]) -> Vec<i64> {
        records.iter().map(|r| r.zone().0).collect()
    }

    #[test]
    fn merges_sorted_with_placeholders() {
        let derived = vec![
            ZoneRecord::new(ZoneId(10), [("POP", 5.0), ("EMP_A", 1.0), ("AREA", 2.0)]),
            ZoneRecord::new(ZoneId(9), [("POP", 7.0), ("EMP_A", 1.5)]),
        ];
        let out = reconcile(derived, &coarse(), &ids(&[1]), &ids(&[9, 10])).unwrap();

        assert_eq!(zones(&out.records), vec![1, 2, 3, 9, 10]);
        assert_eq!(out.derived, 2);
        assert_eq!(out.passthrough, 2);
        assert_eq!(out.placeholders, 1);

        // retired zone is zeroed, new zone 9 replaces the original 9
        assert_eq!(out.records[0].get("POP"), Some(0.0));
        assert_eq!(out.records[3].get("POP"), Some(7.0));
        // projected onto coarse schema
        assert_eq!(out.records[4].get("AREA"), None);
        assert_eq!(out.records[4].field_count(), 2);
    }

    #[test]
    fn empty_derived_is_not_an_error() {
        let out = reconcile(Vec::new(), &coarse(), &ids(&[2]), &ids(&[])).unwrap();
        assert_eq!(zones(&out.records), vec![1, 2, 3, 9]);
        assert_eq!(out.derived, 0);
        assert_eq!(out.records[1].get("EMP_A"), Some(0.0));
    }

    #[test]
    fn passthrough_only_sorts() {
        let out = reconcile(Vec::new(), &coarse(), &ids(&[]), &ids(&[])).unwrap();
        assert_eq!(zones(&out.records), vec![1, 2, 3, 9]);
        assert_eq!(out.passthrough, 4);
    }

    #[test]
    fn retired_id_reused_as_new_zone_is_duplicate() {
        let derived = vec![ZoneRecord::new(ZoneId(1), [("POP", 5.0), ("EMP_A", 1.0)])];
        let err = reconcile(derived, &coarse(), &ids(&[1]), &ids(&[1])).unwrap_err();
        assert!(matches!(
            err,
            ZoneError::DuplicateZone { zone: ZoneId(1), first: "derived", second: "placeholder" }
        ));
    }

    #[test]
    fn new_zone_without_derived_record_is_zeroed() {
        // 9 is a coarse zone reused as a new ID, 12 is new to the table;
        // neither received any fine records
        let derived = vec![ZoneRecord::new(ZoneId(10), [("POP", 5.0), ("EMP_A", 1.0)])];
        let out = reconcile(derived, &coarse(), &ids(&[1]), &ids(&[9, 10, 12])).unwrap();

        assert_eq!(zones(&out.records), vec![1, 2, 3, 9, 10, 12]);
        assert_eq!(out.derived, 1);
        assert_eq!(out.passthrough, 2);
        assert_eq!(out.placeholders, 3);
        assert!(out.records[3].fields().all(|(_, v)| v == 0.0));
        assert_eq!(out.records[5].field_count(), 2);
    }

    #[test]
    fn retired_new_zone_without_derived_record_gets_one_placeholder() {
        let out = reconcile(Vec::new(), &coarse(), &ids(&[1]), &ids(&[1])).unwrap();
        assert_eq!(zones(&out.records), vec![1, 2, 3, 9]);
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn derived_missing_schema_field_is_fatal() {
        let derived = vec![ZoneRecord::new(ZoneId(10), [("POP", 5.0)])];
        let err = reconcile(derived, &coarse(), &ids(&[1]), &ids(&[10])).unwrap_err();
        assert!(matches!(err, ZoneError::SchemaMismatch { zone: ZoneId(10), .. }));
    }
}
