//! Data types produced by the snapshot-pair analysis.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::services::publish::Message;
use crate::snapshot::{VehicleRecord, VehicleType};

/// Time a vehicle spent at a stop between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellEntry {
    /// The vehicle as seen in the earlier snapshot.
    pub vehicle: VehicleRecord,
    pub stop_duration_seconds: i64,
}

/// Vehicle count of one route, with its readable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRanking {
    pub route_id: String,
    pub vehicle_count: usize,
    pub route_name: String,
}

/// One vehicle observed leaving a stop, enriched with stop names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDeparture {
    pub route_id: String,
    pub stop_id: String,
    pub stop_duration: i64,
    /// Observation time of the departure (later snapshot).
    pub timestamp: i64,
    pub full_label: String,
    pub vehicle_type: VehicleType,
    pub stop_name: String,
    /// Vehicle label, which carries the headsign.
    pub direction: String,
    pub direction_id: u32,
}

/// Everything derived from one snapshot pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub averages: Option<StopDeparture>,
    pub failures: Vec<VehicleRecord>,
    pub top_routes: Vec<RouteRanking>,
    pub vehicle_stop_durations: Vec<DwellEntry>,
}

pub const AVERAGES_TOPIC: &str = "averages";
pub const FAILURES_TOPIC: &str = "failures";
pub const TOP_ROUTES_TOPIC: &str = "top-routes";
pub const STOP_DURATIONS_TOPIC: &str = "stop-durations";

impl PipelineResult {
    /// Splits the result into per-topic messages, one JSON value per entry,
    /// keyed by vehicle or route id. Topics with nothing to say are omitted.
    pub fn messages(&self) -> Result<Vec<(&'static str, Vec<Message>)>> {
        let mut out = Vec::new();

        if let Some(departure) = &self.averages {
            out.push((AVERAGES_TOPIC, vec![keyed(departure, &departure.route_id)?]));
        }

        let failures = self
            .failures
            .iter()
            .map(|v| keyed(v, &v.vehicle_id))
            .collect::<Result<Vec<_>>>()?;
        if !failures.is_empty() {
            out.push((FAILURES_TOPIC, failures));
        }

        let routes = self
            .top_routes
            .iter()
            .map(|r| keyed(r, &r.route_id))
            .collect::<Result<Vec<_>>>()?;
        if !routes.is_empty() {
            out.push((TOP_ROUTES_TOPIC, routes));
        }

        let durations = self
            .vehicle_stop_durations
            .iter()
            .map(|d| keyed(d, &d.vehicle.vehicle_id))
            .collect::<Result<Vec<_>>>()?;
        if !durations.is_empty() {
            out.push((STOP_DURATIONS_TOPIC, durations));
        }

        Ok(out)
    }
}

fn keyed<T: Serialize>(value: &T, key: &str) -> Result<Message> {
    Ok(Message::new(serde_json::to_string(value)?).with_key(key))
}
