//! Stop-dwell durations between two snapshots.

use crate::analyzers::matcher::{
    ScanMode, departed_same_route, match_pairs, still_stopped_same_route,
};
use crate::analyzers::types::DwellEntry;
use crate::snapshot::{Snapshot, VehicleRecord};

/// Computes dwell entries for vehicles stopped in `earlier`.
///
/// A pair qualifies when the vehicle kept its route and either left the stop
/// (in transit in `later`) or, with `include_still_stopped`, is still stopped.
/// Each qualifying `later` record yields its own entry, in nested-scan order.
/// Durations are `later - earlier` and are not clamped.
pub fn dwell_entries(
    earlier: &Snapshot,
    later: &Snapshot,
    include_still_stopped: bool,
) -> Vec<DwellEntry> {
    let qualifies = |before: &VehicleRecord, after: &VehicleRecord| {
        departed_same_route(before, after)
            || (include_still_stopped && still_stopped_same_route(before, after))
    };

    match_pairs(earlier, later, ScanMode::EveryCandidate, qualifies)
        .into_iter()
        .map(|pair| DwellEntry {
            vehicle: pair.before.clone(),
            stop_duration_seconds: pair.elapsed_seconds(),
        })
        .collect()
}
