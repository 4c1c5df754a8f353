//! Typed view of one vehicle-position capture.
//!
//! A [`Snapshot`] is built once at the acquisition edge (from the protobuf
//! [`FeedMessage`] or its JSON rendering) and is read-only afterwards.

use std::fmt;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::gtfs_rt::{FeedMessage, VehiclePosition, vehicle_position::VehicleStopStatus};

/// Stop status of a vehicle, as reported by the feed.
///
/// Values outside the three GTFS-Realtime statuses are carried verbatim in
/// [`VehicleStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VehicleStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
    Other(String),
}

impl VehicleStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VehicleStatus::IncomingAt => "INCOMING_AT",
            VehicleStatus::StoppedAt => "STOPPED_AT",
            VehicleStatus::InTransitTo => "IN_TRANSIT_TO",
            VehicleStatus::Other(s) => s,
        }
    }

    fn from_proto(raw: i32) -> Self {
        match VehicleStopStatus::try_from(raw) {
            Ok(VehicleStopStatus::IncomingAt) => VehicleStatus::IncomingAt,
            Ok(VehicleStopStatus::StoppedAt) => VehicleStatus::StoppedAt,
            Ok(VehicleStopStatus::InTransitTo) => VehicleStatus::InTransitTo,
            Err(_) => VehicleStatus::Other(raw.to_string()),
        }
    }
}

impl From<String> for VehicleStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "INCOMING_AT" => VehicleStatus::IncomingAt,
            "STOPPED_AT" => VehicleStatus::StoppedAt,
            "IN_TRANSIT_TO" => VehicleStatus::InTransitTo,
            _ => VehicleStatus::Other(s),
        }
    }
}

impl From<VehicleStatus> for String {
    fn from(status: VehicleStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle kind, derived from the vehicle id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Bus,
    Tram,
}

/// One vehicle entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub vehicle_id: String,
    pub status: VehicleStatus,
    pub route_id: String,
    pub stop_id: String,
    pub direction_id: u32,
    pub timestamp: i64,
    pub label: String,
}

impl VehicleRecord {
    /// Bus ids carry a `bus` marker; everything else runs on rails.
    pub fn vehicle_type(&self) -> VehicleType {
        if self.vehicle_id.contains("bus") {
            VehicleType::Bus
        } else {
            VehicleType::Tram
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.status == VehicleStatus::StoppedAt
    }

    pub fn is_in_transit(&self) -> bool {
        self.status == VehicleStatus::InTransitTo
    }

    /// Builds a record from a decoded GTFS-RT vehicle position.
    ///
    /// # Errors
    ///
    /// Returns an error if the vehicle id, route id or timestamp is missing.
    pub fn from_position(entity_id: &str, v: &VehiclePosition) -> Result<Self> {
        let descriptor = v.vehicle.as_ref();
        let vehicle_id = descriptor
            .and_then(|d| d.id.clone())
            .ok_or_else(|| anyhow!("entity {entity_id}: vehicle id missing"))?;
        let route_id = v
            .trip
            .as_ref()
            .and_then(|t| t.route_id.clone())
            .ok_or_else(|| anyhow!("entity {entity_id}: route id missing"))?;
        let timestamp = v
            .timestamp
            .ok_or_else(|| anyhow!("entity {entity_id}: vehicle timestamp missing"))?;

        Ok(VehicleRecord {
            vehicle_id,
            status: VehicleStatus::from_proto(v.current_status.unwrap_or(VehicleStopStatus::InTransitTo as i32)),
            route_id,
            stop_id: v.stop_id.clone().unwrap_or_default(),
            direction_id: v.trip.as_ref().and_then(|t| t.direction_id).unwrap_or(0),
            timestamp: i64::try_from(timestamp)
                .with_context(|| format!("entity {entity_id}: timestamp out of range"))?,
            label: descriptor.and_then(|d| d.label.clone()).unwrap_or_default(),
        })
    }
}

/// One timestamped capture of every vehicle position in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Feed header timestamp (seconds since epoch).
    pub timestamp: u64,
    pub vehicles: Vec<VehicleRecord>,
}

impl Snapshot {
    pub fn new(timestamp: u64, vehicles: Vec<VehicleRecord>) -> Self {
        Self { timestamp, vehicles }
    }

    /// Converts a decoded feed, keeping only vehicle-position entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the header carries no timestamp or a vehicle entity
    /// is missing one of its required fields.
    pub fn from_feed(feed: &FeedMessage) -> Result<Self> {
        let timestamp = feed
            .header
            .timestamp
            .ok_or_else(|| anyhow!("feed header has no timestamp"))?;

        let vehicles = feed
            .entity
            .iter()
            .filter(|e| !e.is_deleted.unwrap_or(false))
            .filter_map(|e| e.vehicle.as_ref().map(|v| (e.id.as_str(), v)))
            .map(|(id, v)| VehicleRecord::from_position(id, v))
            .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot { timestamp, vehicles })
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// `true` when `self` was captured strictly after `earlier`.
    pub fn is_newer_than(&self, earlier: &Snapshot) -> bool {
        self.timestamp > earlier.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader, TripDescriptor, VehicleDescriptor};

    fn position(id: Option<&str>, route: Option<&str>, status: Option<i32>) -> VehiclePosition {
        VehiclePosition {
            trip: Some(TripDescriptor {
                route_id: route.map(str::to_string),
                direction_id: Some(1),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: id.map(str::to_string),
                label: Some("Gare Saint-Jean".to_string()),
                license_plate: None,
            }),
            stop_id: Some("3612".to_string()),
            current_status: status,
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }
    }

    fn feed(timestamp: Option<u64>, entity: Vec<FeedEntity>) -> FeedMessage {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                timestamp,
                incrementality: None,
                feed_version: None,
            },
            entity,
        }
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        assert_eq!(VehicleStatus::from("STOPPED_AT".to_string()), VehicleStatus::StoppedAt);
        assert_eq!(
            VehicleStatus::from("SKIPPED".to_string()),
            VehicleStatus::Other("SKIPPED".to_string())
        );
        assert_eq!(String::from(VehicleStatus::InTransitTo), "IN_TRANSIT_TO");
    }

    #[test]
    fn test_vehicle_type_from_id() {
        let mut record = VehicleRecord::from_position("e", &position(Some("bus_1234"), Some("R1"), None)).unwrap();
        assert_eq!(record.vehicle_type(), VehicleType::Bus);
        record.vehicle_id = "tram_0042".to_string();
        assert_eq!(record.vehicle_type(), VehicleType::Tram);
    }

    #[test]
    fn test_missing_status_defaults_to_in_transit() {
        let record = VehicleRecord::from_position("e", &position(Some("v1"), Some("R1"), None)).unwrap();
        assert_eq!(record.status, VehicleStatus::InTransitTo);
        assert_eq!(record.direction_id, 1);
        assert_eq!(record.stop_id, "3612");
    }

    #[test]
    fn test_unknown_proto_status_is_passed_through() {
        let record = VehicleRecord::from_position("e", &position(Some("v1"), Some("R1"), Some(7))).unwrap();
        assert_eq!(record.status, VehicleStatus::Other("7".to_string()));
    }

    #[test]
    fn test_from_feed_skips_non_vehicle_entities() {
        let feed = feed(
            Some(10),
            vec![
                FeedEntity {
                    id: "1".to_string(),
                    vehicle: Some(position(Some("v1"), Some("R1"), Some(1))),
                    ..Default::default()
                },
                FeedEntity {
                    id: "2".to_string(),
                    ..Default::default()
                },
            ],
        );

        let snapshot = Snapshot::from_feed(&feed).unwrap();
        assert_eq!(snapshot.timestamp, 10);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.vehicles[0].is_stopped());
    }

    #[test]
    fn test_from_feed_requires_header_timestamp() {
        assert!(Snapshot::from_feed(&feed(None, vec![])).is_err());
    }

    #[test]
    fn test_from_feed_rejects_vehicle_without_id() {
        let feed = feed(
            Some(10),
            vec![FeedEntity {
                id: "1".to_string(),
                vehicle: Some(position(None, Some("R1"), Some(1))),
                ..Default::default()
            }],
        );
        assert!(Snapshot::from_feed(&feed).is_err());
    }

    #[test]
    fn test_is_newer_than() {
        let a = Snapshot::new(100, vec![]);
        let b = Snapshot::new(101, vec![]);
        assert!(b.is_newer_than(&a));
        assert!(!a.is_newer_than(&b));
        assert!(!a.is_newer_than(&a.clone()));
    }
}
