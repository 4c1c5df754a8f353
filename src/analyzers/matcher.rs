//! Pairs vehicle records of an earlier and a later snapshot.
//!
//! Matching is a nested scan: outer loop over the earlier snapshot, inner loop
//! over the later one, both in feed order. Two records pair up when their
//! vehicle ids are equal and the transition predicate holds.

use crate::snapshot::{Snapshot, VehicleRecord};

/// How many later records may pair with one earlier record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Stop scanning the later snapshot at the first satisfying record.
    FirstPerRecord,
    /// Keep every satisfying record; duplicated vehicle ids yield one pair each.
    EveryCandidate,
}

/// An earlier record and the later record it was matched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedPair<'a> {
    pub before: &'a VehicleRecord,
    pub after: &'a VehicleRecord,
}

impl MatchedPair<'_> {
    /// Seconds elapsed between the two observations. Negative when the feed
    /// timestamps go backwards.
    pub fn elapsed_seconds(&self) -> i64 {
        self.after.timestamp - self.before.timestamp
    }
}

/// Vehicle stopped in the earlier snapshot and in transit in the later one.
pub fn departed(before: &VehicleRecord, after: &VehicleRecord) -> bool {
    before.is_stopped() && after.is_in_transit()
}

/// [`departed`], restricted to a vehicle still serving the same route.
pub fn departed_same_route(before: &VehicleRecord, after: &VehicleRecord) -> bool {
    departed(before, after) && before.route_id == after.route_id
}

/// Vehicle stopped in both snapshots while serving the same route.
pub fn still_stopped_same_route(before: &VehicleRecord, after: &VehicleRecord) -> bool {
    before.is_stopped() && after.is_stopped() && before.route_id == after.route_id
}

/// Returns every pair satisfying `predicate`, in nested-scan order.
pub fn match_pairs<'a, P>(
    earlier: &'a Snapshot,
    later: &'a Snapshot,
    mode: ScanMode,
    predicate: P,
) -> Vec<MatchedPair<'a>>
where
    P: Fn(&VehicleRecord, &VehicleRecord) -> bool,
{
    let mut pairs = Vec::new();

    for before in &earlier.vehicles {
        for after in &later.vehicles {
            if before.vehicle_id == after.vehicle_id && predicate(before, after) {
                pairs.push(MatchedPair { before, after });
                if mode == ScanMode::FirstPerRecord {
                    break;
                }
            }
        }
    }

    pairs
}

/// Returns the first pair of the nested scan satisfying `predicate`.
pub fn first_pair<'a, P>(
    earlier: &'a Snapshot,
    later: &'a Snapshot,
    predicate: P,
) -> Option<MatchedPair<'a>>
where
    P: Fn(&VehicleRecord, &VehicleRecord) -> bool,
{
    earlier.vehicles.iter().find_map(|before| {
        later
            .vehicles
            .iter()
            .find(|after| before.vehicle_id == after.vehicle_id && predicate(before, after))
            .map(|after| MatchedPair { before, after })
    })
}
