//! Zone correspondence index built from lookup rows.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::error::{Result, ZoneError};
use crate::model::{LookupEntry, ZoneId};

#[derive(Debug, Default)]
pub struct ZoneIndex {
    fine_by_old: BTreeMap<ZoneId, Vec<ZoneId>>,
    fine_by_new: BTreeMap<ZoneId, Vec<ZoneId>>,
    old_by_fine: FxHashMap<ZoneId, ZoneId>,
    new_by_fine: FxHashMap<ZoneId, ZoneId>,
}

impl ZoneIndex {
    /// Group lookup rows. Exact duplicate rows collapse; a fine zone that
    /// appears with a different parent or target is rejected.
    pub fn build(entries: &[LookupEntry]) -> Result<Self> {
        let mut index = Self::default();

        for entry in entries {
            if let Some(&old) = index.old_by_fine.get(&entry.fine) {
                if old != entry.old_coarse {
                    return Err(ZoneError::LookupConflict {
                        fine: entry.fine,
                        detail: format!("listed under old zones {old} and {}", entry.old_coarse),
                    });
                }
                let new = index.new_by_fine[&entry.fine];
                if new != entry.new_coarse {
                    return Err(ZoneError::LookupConflict {
                        fine: entry.fine,
                        detail: format!("mapped to new zones {new} and {}", entry.new_coarse),
                    });
                }
                continue;
            }

            index.old_by_fine.insert(entry.fine, entry.old_coarse);
            index.new_by_fine.insert(entry.fine, entry.new_coarse);
            index.fine_by_old.entry(entry.old_coarse).or_default().push(entry.fine);
            index.fine_by_new.entry(entry.new_coarse).or_default().push(entry.fine);
        }

        Ok(index)
    }

    pub fn is_empty(&self) -> bool {
        self.fine_by_old.is_empty()
    }

    /// Distinct old coarse zones, ascending.
    pub fn zones_to_replace(&self) -> BTreeSet<ZoneId> {
        self.fine_by_old.keys().copied().collect()
    }

    /// Distinct new coarse zones, ascending.
    pub fn new_zones(&self) -> BTreeSet<ZoneId> {
        self.fine_by_new.keys().copied().collect()
    }

    pub fn is_replaced(&self, zone: ZoneId) -> bool {
        self.fine_by_old.contains_key(&zone)
    }

    /// Fine zones composing `old`, in lookup order.
    pub fn fine_zones_of(&self, old: ZoneId) -> &[ZoneId] {
        self.fine_by_old.get(&old).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Fine zones feeding `new`, in lookup order.
    pub fn members_of(&self, new: ZoneId) -> &[ZoneId] {
        self.fine_by_new.get(&new).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn new_zone_of(&self, fine: ZoneId) -> Option<ZoneId> {
        self.new_by_fine.get(&fine).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> Vec<LookupEntry> {
        vec![
            LookupEntry::new(1, 101, 9),
            LookupEntry::new(1, 102, 9),
            LookupEntry::new(2, 201, 9),
            LookupEntry::new(2, 202, 10),
        ]
    }

    #[test]
    fn groups_by_old_and_new() {
        let index = ZoneIndex::build(&lookup()).unwrap();
        assert_eq!(index.zones_to_replace().into_iter().collect::<Vec<_>>(), vec![ZoneId(1), ZoneId(2)]);
        assert_eq!(index.new_zones().into_iter().collect::<Vec<_>>(), vec![ZoneId(9), ZoneId(10)]);
        assert_eq!(index.fine_zones_of(ZoneId(1)), &[ZoneId(101), ZoneId(102)]);
        assert_eq!(index.members_of(ZoneId(9)), &[ZoneId(101), ZoneId(102), ZoneId(201)]);
        assert_eq!(index.new_zone_of(ZoneId(202)), Some(ZoneId(10)));
        assert_eq!(index.new_zone_of(ZoneId(999)), None);
        assert!(index.fine_zones_of(ZoneId(3)).is_empty());
    }

    #[test]
    fn empty_lookup_replaces_nothing() {
        let index = ZoneIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.zones_to_replace().is_empty());
        assert!(index.new_zones().is_empty());
    }

    #[test]
    fn duplicate_rows_collapse() {
        let mut rows = lookup();
        rows.push(LookupEntry::new(1, 101, 9));
        let index = ZoneIndex::build(&rows).unwrap();
        assert_eq!(index.fine_zones_of(ZoneId(1)).len(), 2);
        assert_eq!(index.members_of(ZoneId(9)).len(), 3);
    }

    #[test]
    fn conflicting_target_rejected() {
        let mut rows = lookup();
        rows.push(LookupEntry::new(1, 101, 10));
        let err = ZoneIndex::build(&rows).unwrap_err();
        assert!(matches!(err, ZoneError::LookupConflict { fine: ZoneId(101), .. }));
        assert!(err.to_string().contains("new zones 9 and 10"));
    }

    #[test]
    fn conflicting_parent_rejected() {
        let mut rows = lookup();
        rows.push(LookupEntry::new(2, 101, 9));
        let err = ZoneIndex::build(&rows).unwrap_err();
        assert!(err.to_string().contains("old zones 1 and 2"));
    }
}
