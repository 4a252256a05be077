use std::collections::BTreeMap;

use crate::error::{Result, ZoneError};
use crate::index::ZoneIndex;
use crate::model::{ZoneId, ZoneRecord};

/// Group distributed fine records by new coarse zone and sum every field,
/// synthetic totals included. One record per new zone that has members,
/// ascending by zone.
pub fn aggregate_zones(fine: &[ZoneRecord], index: &ZoneIndex) -> Result<Vec<ZoneRecord>> {
    let mut groups: BTreeMap<ZoneId, ZoneRecord> = BTreeMap::new();

    for record in fine {
        let new_zone = index
            .new_zone_of(record.zone())
            .ok_or(ZoneError::UnmappedFineZone(record.zone()))?;

        let merged = match groups.remove(&new_zone) {
            None => record.clone().with_zone(new_zone),
            Some(acc) => add_records(acc, record),
        };
        groups.insert(new_zone, merged);
    }

    Ok(groups.into_values().collect())
}

/// Field-wise sum; a field missing on one side counts as zero.
fn add_records(acc: ZoneRecord, other: &ZoneRecord) -> ZoneRecord {
    let mut out = acc;
    for (field, v) in other.fields() {
        let sum = out.get(field).unwrap_or(0.0) + v;
        out = out.with_value(field, sum);
    }
    for (code, v) in other.synthetic_totals() {
        let sum = out.synthetic(code).unwrap_or(0.0) + v;
        out = out.with_synthetic(code, sum);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LookupEntry;

    fn index() -> ZoneIndex {
        ZoneIndex::build(&[
            LookupEntry::new(1, 101, 9),
            LookupEntry::new(1, 102, 9),
            LookupEntry::new(2, 201, 9),
            LookupEntry::new(2, 202, 10),
            LookupEntry::new(2, 203, 11),
        ])
        .unwrap()
    }

    #[test]
    fn sums_by_new_zone() {
        let fine = vec![
            ZoneRecord::new(ZoneId(202), [("POP", 7.0)]),
            ZoneRecord::new(ZoneId(101), [("POP", 40.0)]).with_synthetic("A", 100.0),
            ZoneRecord::new(ZoneId(102), [("POP", 60.0)]).with_synthetic("A", 400.0),
            ZoneRecord::new(ZoneId(201), [("POP", 5.0)]).with_synthetic("A", 1.0),
        ];
        let out = aggregate_zones(&fine, &index()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].zone(), ZoneId(9));
        assert_eq!(out[0].get("POP"), Some(105.0));
        assert_eq!(out[0].synthetic("A"), Some(501.0));
        assert_eq!(out[1].zone(), ZoneId(10));
        assert_eq!(out[1].get("POP"), Some(7.0));
    }

    #[test]
    fn new_zone_without_members_is_not_emitted() {
        let fine = vec![ZoneRecord::new(ZoneId(101), [("POP", 1.0)])];
        let out = aggregate_zones(&fine, &index()).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|r| r.zone() != ZoneId(11)));
    }

    #[test]
    fn unmapped_fine_zone_is_fatal() {
        let fine = vec![ZoneRecord::new(ZoneId(999), [("POP", 1.0)])];
        let err = aggregate_zones(&fine, &index()).unwrap_err();
        assert!(matches!(err, ZoneError::UnmappedFineZone(ZoneId(999))));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(aggregate_zones(&[], &index()).unwrap().is_empty());
    }
}
