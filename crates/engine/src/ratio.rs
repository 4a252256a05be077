use crate::error::Result;
use crate::model::{RatioPair, ZoneRecord};

/// Turn each synthetic total back into a ratio and drop it.
///
/// `count_field = synthetic / total_field`, where `total_field` is the
/// record's aggregated value. Zero numerator or zero denominator gives 0.
/// Records without synthetic totals come back unchanged, so deriving twice
/// is a no-op.
pub fn derive_ratios(record: ZoneRecord, pairs: &[RatioPair]) -> Result<ZoneRecord> {
    let mut out = record;
    for pair in pairs {
        let Some(proxy) = out.synthetic(&pair.code) else {
            continue;
        };
        let total = out.require(&pair.total_field)?;
        let ratio = if proxy == 0.0 || total == 0.0 { 0.0 } else { proxy / total };
        out = out
            .with_value(&pair.count_field, ratio)
            .without_synthetic(&pair.code);
    }
    Ok(out)
}

pub fn derive_all(records: Vec<ZoneRecord>, pairs: &[RatioPair]) -> Result<Vec<ZoneRecord>> {
    records.into_iter().map(|r| derive_ratios(r, pairs)).collect()
}
