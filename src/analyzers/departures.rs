//! The single stop-departure sample published under the `averages` topic.

use anyhow::Result;
use tracing::debug;

use crate::analyzers::matcher::{departed, first_pair};
use crate::analyzers::types::StopDeparture;
use crate::services::enrichment::Enrichment;
use crate::snapshot::Snapshot;

/// Returns the first vehicle of the nested scan that left its stop between the
/// two snapshots, enriched with the stop names.
///
/// Only that first transition is considered: when the stop lookup comes back
/// empty the result is `None`, without trying later candidates. Lookup errors
/// are propagated.
pub async fn first_stop_departure<E: Enrichment + ?Sized>(
    earlier: &Snapshot,
    later: &Snapshot,
    enrichment: &E,
) -> Result<Option<StopDeparture>> {
    let Some(pair) = first_pair(earlier, later, departed) else {
        debug!("No vehicle left a stop between snapshots");
        return Ok(None);
    };
    let before = pair.before;

    let Some(stop) = enrichment
        .resolve_stop(&before.route_id, &before.stop_id)
        .await?
    else {
        debug!(
            route_id = %before.route_id,
            stop_id = %before.stop_id,
            "Stop not listed for route, dropping departure sample"
        );
        return Ok(None);
    };

    Ok(Some(StopDeparture {
        route_id: before.route_id.clone(),
        stop_id: before.stop_id.clone(),
        stop_duration: pair.elapsed_seconds(),
        timestamp: pair.after.timestamp,
        full_label: stop.full_label,
        vehicle_type: before.vehicle_type(),
        stop_name: stop.name,
        direction: before.label.clone(),
        direction_id: before.direction_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::matcher::tests::{moving, stopped};
    use crate::analyzers::routes::tests::StubEnrichment;
    use crate::snapshot::VehicleType;

    #[tokio::test]
    async fn test_departure_is_enriched() {
        let mut bus = stopped("bus_17", "R1", 1000);
        bus.direction_id = 1;
        let a = Snapshot::new(1, vec![bus]);
        let b = Snapshot::new(2, vec![moving("bus_17", "R9", 1120)]);
        let stub = StubEnrichment::default().with_route("R1", "Ligne 1", &[("S1", "Victoire")]);

        let departure = first_stop_departure(&a, &b, &stub).await.unwrap().unwrap();
        assert_eq!(departure.route_id, "R1");
        assert_eq!(departure.stop_id, "S1");
        assert_eq!(departure.stop_duration, 120);
        assert_eq!(departure.timestamp, 1120);
        assert_eq!(departure.stop_name, "Victoire");
        assert_eq!(departure.full_label, "Victoire (Bordeaux)");
        assert_eq!(departure.vehicle_type, VehicleType::Bus);
        assert_eq!(departure.direction, "bus_17 label");
        assert_eq!(departure.direction_id, 1);
    }

    #[tokio::test]
    async fn test_missing_stop_does_not_fall_through() {
        let mut first = stopped("v1", "R1", 0);
        first.stop_id = "UNKNOWN".to_string();
        let a = Snapshot::new(1, vec![first, stopped("v2", "R1", 0)]);
        let b = Snapshot::new(2, vec![moving("v1", "R1", 60), moving("v2", "R1", 90)]);
        let stub = StubEnrichment::default().with_route("R1", "Ligne 1", &[("S1", "Victoire")]);

        assert!(first_stop_departure(&a, &b, &stub).await.unwrap().is_none());
        assert_eq!(stub.lookups.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_error_propagates() {
        let a = Snapshot::new(1, vec![stopped("v1", "R1", 0)]);
        let b = Snapshot::new(2, vec![moving("v1", "R1", 60)]);
        let stub = StubEnrichment {
            broken: true,
            ..Default::default()
        };

        assert!(first_stop_departure(&a, &b, &stub).await.is_err());
    }

    #[tokio::test]
    async fn test_no_transition_skips_lookup() {
        let a = Snapshot::new(1, vec![moving("v1", "R1", 0)]);
        let b = Snapshot::new(2, vec![stopped("v1", "R1", 60)]);
        let stub = StubEnrichment::default();

        assert!(first_stop_departure(&a, &b, &stub).await.unwrap().is_none());
        assert!(stub.lookups.lock().unwrap().is_empty());
    }
}
