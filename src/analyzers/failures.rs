//! Flags vehicles that dwell at a stop for abnormally long.

use tracing::info;

use crate::analyzers::dwell::dwell_entries;
use crate::snapshot::{Snapshot, VehicleRecord};

/// Dwell above which a vehicle is assumed broken down.
pub const DEFAULT_FAILURE_THRESHOLD_SECS: i64 = 300;

/// Returns the earlier-snapshot record of every dwell entry (departed or still
/// stopped) lasting strictly longer than `threshold_secs`.
///
/// A vehicle appears once per qualifying entry.
pub fn detect_failures(
    earlier: &Snapshot,
    later: &Snapshot,
    threshold_secs: i64,
) -> Vec<VehicleRecord> {
    let failures: Vec<VehicleRecord> = dwell_entries(earlier, later, true)
        .into_iter()
        .filter(|entry| entry.stop_duration_seconds > threshold_secs)
        .map(|entry| entry.vehicle)
        .collect();

    info!(
        failures = failures.len(),
        threshold_secs, "Vehicles flagged as failed"
    );

    failures
}
