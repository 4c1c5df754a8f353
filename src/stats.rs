use serde::Serialize;

use crate::snapshot::{Snapshot, VehicleStatus};

/// Status and coverage counts of one snapshot, logged alongside each capture.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub feed_timestamp: u64,
    pub vehicles: usize,

    // statuses
    pub stopped_at: usize,
    pub in_transit_to: usize,
    pub incoming_at: usize,
    pub other_status: usize,

    pub routes: usize,
    pub with_stop_id: usize,
    pub with_label: usize,
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut s = SnapshotStats {
            feed_timestamp: snapshot.timestamp,
            vehicles: snapshot.len(),
            ..Default::default()
        };

        let mut routes: Vec<&str> = Vec::new();

        for v in &snapshot.vehicles {
            match v.status {
                VehicleStatus::StoppedAt => s.stopped_at += 1,
                VehicleStatus::InTransitTo => s.in_transit_to += 1,
                VehicleStatus::IncomingAt => s.incoming_at += 1,
                VehicleStatus::Other(_) => s.other_status += 1,
            }

            if !v.stop_id.is_empty() {
                s.with_stop_id += 1;
            }

            if !v.label.is_empty() {
                s.with_label += 1;
            }

            if !routes.contains(&v.route_id.as_str()) {
                routes.push(&v.route_id);
            }
        }

        s.routes = routes.len();
        s
    }

    /// `part` as a percentage of `total`, 0 when `total` is 0.
    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn stopped_pct(&self) -> f64 {
        Self::pct(self.stopped_at, self.vehicles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::matcher::tests::{moving, record, stopped};

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(SnapshotStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(SnapshotStats::pct(50, 100), 50.0);
        assert_eq!(SnapshotStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_from_snapshot_empty() {
        let stats = SnapshotStats::from_snapshot(&Snapshot::new(42, vec![]));

        assert_eq!(stats.feed_timestamp, 42);
        assert_eq!(stats.vehicles, 0);
        assert_eq!(stats.routes, 0);
    }

    #[test]
    fn test_from_snapshot_counts_statuses_and_routes() {
        let mut unlabelled = moving("v3", "B", 0);
        unlabelled.label.clear();
        unlabelled.stop_id.clear();

        let snapshot = Snapshot::new(
            1,
            vec![
                stopped("v1", "A", 0),
                stopped("v2", "A", 0),
                unlabelled,
                record("v4", "C", VehicleStatus::Other("SKIPPED".to_string()), 0),
            ],
        );
        let stats = SnapshotStats::from_snapshot(&snapshot);

        assert_eq!(stats.vehicles, 4);
        assert_eq!(stats.stopped_at, 2);
        assert_eq!(stats.in_transit_to, 1);
        assert_eq!(stats.other_status, 1);
        assert_eq!(stats.routes, 3);
        assert_eq!(stats.with_stop_id, 3);
        assert_eq!(stats.with_label, 3);
        assert_eq!(stats.stopped_pct(), 50.0);
    }
}
