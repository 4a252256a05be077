use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate_zones;
use crate::config::ZoneConfig;
use crate::distribute::distribute;
use crate::error::{Result, ZoneError};
use crate::index::ZoneIndex;
use crate::model::{RunMeta, RunSummary, ZoneId, ZoneInput, ZoneOutput, ZoneRecord};
use crate::ratio::derive_all;
use crate::reconcile::reconcile;

/// One coarse zone being replaced, with the fine records found for it.
struct Group<'a> {
    coarse: &'a ZoneRecord,
    fine: Vec<ZoneRecord>,
}

/// Run the full disaggregation / re-aggregation per config.
///
/// Each replaced coarse zone is distributed over its fine zones on its own;
/// the distributed fine records of all groups are then aggregated, ratios
/// derived, and the result reconciled against the coarse table once.
pub fn run(config: &ZoneConfig, input: &ZoneInput) -> Result<ZoneOutput> {
    let pairs = config.resolve_pairs(input.coarse.fields())?;
    let index = ZoneIndex::build(&input.lookup)?;
    let retired = index.zones_to_replace();
    let new_ids = index.new_zones();

    info!(
        coarse = input.coarse.len(),
        fine = input.fine.len(),
        lookup = input.lookup.len(),
        ratios = pairs.len(),
        "loaded zone tables"
    );
    if index.is_empty() {
        info!("lookup is empty; coarse zones pass through unchanged");
    }

    let fine_by_zone: FxHashMap<ZoneId, &ZoneRecord> =
        input.fine.records().iter().map(|r| (r.zone(), r)).collect();

    let mut missing_fine = 0usize;
    let mut groups: Vec<Group<'_>> = Vec::new();
    for coarse in input.coarse.records().iter().filter(|r| index.is_replaced(r.zone())) {
        let mut fine = Vec::new();
        for &id in index.fine_zones_of(coarse.zone()) {
            match fine_by_zone.get(&id) {
                Some(rec) => fine.push((*rec).clone()),
                None => {
                    debug!(coarse = %coarse.zone(), fine = %id, "fine zone missing from fine table");
                    missing_fine += 1;
                }
            }
        }
        if fine.is_empty() {
            warn!(zone = %coarse.zone(), "replaced coarse zone has no fine records; its totals are dropped");
        }
        groups.push(Group { coarse, fine });
    }

    if !retired.is_empty() && groups.is_empty() {
        return Err(ZoneError::NoMatchingCoarseZones(retired.len()));
    }
    for zone in retired.iter().filter(|z| !groups.iter().any(|g| g.coarse.zone() == **z)) {
        warn!(%zone, "zone to replace is not in the coarse table; writing placeholder only");
    }

    let distribute_group = |g: &Group<'_>| distribute(g.coarse, &g.fine, &pairs);
    let distributed: Vec<Vec<ZoneRecord>> = if config.output.parallel {
        groups.par_iter().map(distribute_group).collect::<Result<_>>()?
    } else {
        groups.iter().map(distribute_group).collect::<Result<_>>()?
    };

    let fine_records: Vec<ZoneRecord> = distributed.into_iter().flatten().collect();
    let fine_zones_distributed = fine_records.len();
    info!(groups = groups.len(), fine = fine_zones_distributed, "distributed coarse totals");

    let aggregated = aggregate_zones(&fine_records, &index)?;
    let derived = derive_all(aggregated, &pairs)?;
    info!(new_zones = derived.len(), "aggregated new coarse zones");

    let reconciled = reconcile(derived, &input.coarse, &retired, &new_ids)?;

    let summary = RunSummary {
        coarse_zones_replaced: groups.len(),
        fine_zones_distributed,
        fine_zones_missing: missing_fine,
        new_zones_derived: reconciled.derived,
        passthrough_zones: reconciled.passthrough,
        placeholder_zones: reconciled.placeholders,
        total_zones: reconciled.records.len(),
        ratio_codes: pairs.iter().map(|p| p.code.clone()).collect(),
    };
    info!(total = summary.total_zones, "reconciled output zones");

    Ok(ZoneOutput {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        fields: input.coarse.fields().to_vec(),
        records: reconciled.records,
    })
}
