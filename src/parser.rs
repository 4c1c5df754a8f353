//! Decoders for GTFS Realtime vehicle-position feeds.
//!
//! Feeds arrive either as protobuf or as the JSON rendering produced by
//! `gtfs-realtime`-style converters (camelCase keys, 64-bit integers often
//! encoded as strings). [`decode_snapshot`] sniffs the payload and picks one.

use anyhow::{Context, Result, anyhow};
use prost::Message;
use serde::Deserialize;

use crate::gtfs_rt::FeedMessage;
use crate::snapshot::{Snapshot, VehicleRecord, VehicleStatus};

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Decodes a feed payload into a [`Snapshot`], accepting protobuf or JSON.
///
/// A protobuf `FeedMessage` starts with `0x0A` (`\n`) followed by the header
/// length, which can itself be `{`. A payload that fails as JSON is therefore
/// retried as protobuf, and the JSON error is kept if that fails too.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    if !looks_like_json(bytes) {
        return Snapshot::from_feed(&parse_feed(bytes)?);
    }

    match parse_json_snapshot(bytes) {
        Ok(snapshot) => Ok(snapshot),
        Err(json_err) => match parse_feed(bytes) {
            Ok(feed) => Snapshot::from_feed(&feed),
            Err(_) => Err(json_err),
        },
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}

/// Integer that may be serialized as a JSON number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(i64),
    Text(String),
}

impl Lenient {
    fn to_i64(&self) -> Result<i64> {
        match self {
            Lenient::Number(n) => Ok(*n),
            Lenient::Text(s) => s
                .trim()
                .parse()
                .with_context(|| format!("not an integer: {s:?}")),
        }
    }
}

#[derive(Deserialize)]
struct JsonFeed {
    header: JsonHeader,
    #[serde(default)]
    entity: Vec<JsonEntity>,
}

#[derive(Deserialize)]
struct JsonHeader {
    timestamp: Option<Lenient>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntity {
    #[serde(default)]
    id: String,
    #[serde(default, alias = "is_deleted")]
    is_deleted: bool,
    vehicle: Option<JsonVehiclePosition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonVehiclePosition {
    trip: Option<JsonTrip>,
    vehicle: Option<JsonVehicleDescriptor>,
    #[serde(alias = "current_status")]
    current_status: Option<String>,
    #[serde(alias = "stop_id")]
    stop_id: Option<String>,
    timestamp: Option<Lenient>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTrip {
    #[serde(alias = "route_id")]
    route_id: Option<String>,
    #[serde(alias = "direction_id")]
    direction_id: Option<Lenient>,
}

#[derive(Deserialize)]
struct JsonVehicleDescriptor {
    id: Option<String>,
    label: Option<String>,
}

impl JsonVehiclePosition {
    fn into_record(self, entity_id: &str) -> Result<VehicleRecord> {
        let (vehicle_id, label) = match self.vehicle {
            Some(d) => (d.id, d.label),
            None => (None, None),
        };
        let vehicle_id = vehicle_id.ok_or_else(|| anyhow!("entity {entity_id}: vehicle id missing"))?;
        let (route_id, direction_id) = match self.trip {
            Some(t) => (t.route_id, t.direction_id),
            None => (None, None),
        };
        let route_id = route_id.ok_or_else(|| anyhow!("entity {entity_id}: route id missing"))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| anyhow!("entity {entity_id}: vehicle timestamp missing"))?
            .to_i64()?;
        let direction_id = match direction_id {
            Some(d) => u32::try_from(d.to_i64()?)
                .with_context(|| format!("entity {entity_id}: direction id out of range"))?,
            None => 0,
        };

        Ok(VehicleRecord {
            vehicle_id,
            status: self
                .current_status
                .map(VehicleStatus::from)
                .unwrap_or(VehicleStatus::InTransitTo),
            route_id,
            stop_id: self.stop_id.unwrap_or_default(),
            direction_id,
            timestamp,
            label: label.unwrap_or_default(),
        })
    }
}

/// Decodes the JSON rendering of a GTFS-RT feed into a [`Snapshot`].
///
/// # Errors
///
/// Returns an error on malformed JSON, a missing header timestamp, or a
/// vehicle entity lacking its id, route id or timestamp.
pub fn parse_json_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let feed: JsonFeed = serde_json::from_slice(bytes).context("invalid JSON feed")?;

    let timestamp = feed
        .header
        .timestamp
        .ok_or_else(|| anyhow!("feed header has no timestamp"))?
        .to_i64()?;
    let timestamp = u64::try_from(timestamp).context("negative feed header timestamp")?;

    let mut vehicles = Vec::with_capacity(feed.entity.len());
    for entity in feed.entity {
        if entity.is_deleted {
            continue;
        }
        if let Some(v) = entity.vehicle {
            vehicles.push(v.into_record(&entity.id)?);
        }
    }

    Ok(Snapshot::new(timestamp, vehicles))
}
