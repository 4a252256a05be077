//! Proportional distribution of one coarse zone's totals over its fine zones.
//!
//! Each fine zone keeps its share of the fine-level sum while the group is
//! rescaled to the coarse total. Ratio pairs cannot be split linearly, so the
//! count is first turned into an absolute proxy (`count * total`) stored as a
//! synthetic total; that proxy is split like any other field and turned back
//! into a ratio after aggregation (see [`crate::ratio`]).

use tracing::trace;

use crate::error::Result;
use crate::model::{RatioPair, ZoneRecord};

/// `value`'s share of `sum`, rescaled to `total`. A zero sum yields zero.
pub fn share(value: f64, total: f64, sum: f64) -> f64 {
    if sum == 0.0 {
        0.0
    } else {
        value * total / sum
    }
}

/// Attach the `count * total` proxy for every pair, read from the record's
/// own (undistributed) values.
pub fn with_synthetic_totals(record: &ZoneRecord, pairs: &[RatioPair]) -> Result<ZoneRecord> {
    let mut out = record.clone();
    for pair in pairs {
        let proxy = record.require(&pair.count_field)? * record.require(&pair.total_field)?;
        out = out.with_synthetic(&pair.code, proxy);
    }
    Ok(out)
}

/// Split `coarse` over `fine`, returning new fine records in the same order.
///
/// Every coarse field except the pair count fields is distributed; fields
/// only the fine records carry are passed through. The inputs are left as
/// they were.
pub fn distribute(coarse: &ZoneRecord, fine: &[ZoneRecord], pairs: &[RatioPair]) -> Result<Vec<ZoneRecord>> {
    if fine.is_empty() {
        return Ok(Vec::new());
    }

    let coarse = with_synthetic_totals(coarse, pairs)?;
    let mut out = fine
        .iter()
        .map(|f| with_synthetic_totals(f, pairs))
        .collect::<Result<Vec<_>>>()?;

    let is_count_field = |field: &str| pairs.iter().any(|p| p.count_field == field);

    for (field, coarse_total) in coarse.fields().filter(|(f, _)| !is_count_field(*f)) {
        let values = out.iter().map(|f| f.require(field)).collect::<Result<Vec<_>>>()?;
        let sum: f64 = values.iter().sum();
        out = out
            .into_iter()
            .zip(values)
            .map(|(rec, v)| rec.with_value(field, share(v, coarse_total, sum)))
            .collect();
    }

    for (code, coarse_total) in coarse.synthetic_totals() {
        let sum: f64 = out.iter().filter_map(|f| f.synthetic(code)).sum();
        out = out
            .into_iter()
            .map(|rec| {
                let v = rec.synthetic(code).unwrap_or(0.0);
                rec.with_synthetic(code, share(v, coarse_total, sum))
            })
            .collect();
    }

    trace!(zone = %coarse.zone(), fine = out.len(), "distributed coarse zone");
    Ok(out)
}
