//! Busiest-route ranking for a single snapshot.

use anyhow::{Context, Result};
use tracing::debug;

use crate::analyzers::types::RouteRanking;
use crate::services::enrichment::Enrichment;
use crate::snapshot::Snapshot;

/// Number of vehicles per route, busiest first.
///
/// Routes are collected in first-appearance order and the sort is stable, so
/// equal counts keep that order. `top_n == 0` keeps every route.
pub fn count_routes(snapshot: &Snapshot, top_n: usize) -> Vec<(String, usize)> {
    let mut routes: Vec<&str> = Vec::new();
    for v in &snapshot.vehicles {
        if !routes.contains(&v.route_id.as_str()) {
            routes.push(&v.route_id);
        }
    }

    let mut counts: Vec<(String, usize)> = routes
        .into_iter()
        .map(|route| {
            let count = snapshot
                .vehicles
                .iter()
                .filter(|v| v.route_id == route)
                .count();
            (route.to_string(), count)
        })
        .collect();

    counts.sort_by(|a, b| b.1.cmp(&a.1));

    if top_n > 0 {
        counts.truncate(top_n);
    }

    counts
}

/// Ranks routes by vehicle count and resolves each route name.
///
/// Names are resolved one route at a time, in ranking order. The first
/// enrichment failure aborts the whole ranking.
#[tracing::instrument(skip(snapshot, enrichment), fields(vehicles = snapshot.len()))]
pub async fn rank_routes<E: Enrichment + ?Sized>(
    snapshot: &Snapshot,
    top_n: usize,
    enrichment: &E,
) -> Result<Vec<RouteRanking>> {
    let counts = count_routes(snapshot, top_n);
    let mut ranking = Vec::with_capacity(counts.len());

    for (route_id, vehicle_count) in counts {
        let info = enrichment
            .resolve_route(&route_id)
            .await
            .with_context(|| format!("resolving route {route_id}"))?;
        debug!(route_id = %route_id, vehicle_count, route_name = %info.name, "Route ranked");

        ranking.push(RouteRanking {
            route_id,
            vehicle_count,
            route_name: info.name,
        });
    }

    Ok(ranking)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analyzers::matcher::tests::{moving, stopped};
    use crate::services::enrichment::{RouteDirection, RouteInfo, StopPoint};
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory enrichment keyed by route id, recording every lookup.
    #[derive(Default)]
    pub(crate) struct StubEnrichment {
        pub routes: HashMap<String, RouteInfo>,
        pub lookups: Mutex<Vec<String>>,
        pub broken: bool,
    }

    impl StubEnrichment {
        pub(crate) fn with_route(mut self, route_id: &str, name: &str, stops: &[(&str, &str)]) -> Self {
            let stop_points = stops
                .iter()
                .map(|(code, stop_name)| StopPoint {
                    external_code: code.to_string(),
                    full_label: format!("{stop_name} (Bordeaux)"),
                    name: stop_name.to_string(),
                })
                .collect();
            self.routes.insert(
                route_id.to_string(),
                RouteInfo {
                    name: name.to_string(),
                    directions: vec![RouteDirection { stop_points }],
                },
            );
            self
        }
    }

    #[async_trait::async_trait]
    impl Enrichment for StubEnrichment {
        async fn resolve_route(&self, route_id: &str) -> Result<RouteInfo> {
            self.lookups.lock().unwrap().push(route_id.to_string());
            if self.broken {
                return Err(anyhow!("line-informations unavailable"));
            }
            self.routes
                .get(route_id)
                .cloned()
                .ok_or_else(|| anyhow!("unknown route {route_id}"))
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(
            1,
            vec![
                moving("v1", "R2", 0),
                stopped("v2", "R1", 0),
                moving("v3", "R3", 0),
                moving("v4", "R2", 0),
                moving("v5", "R1", 0),
                stopped("v6", "R2", 0),
                moving("v7", "R1", 0),
            ],
        )
    }

    fn enrichment() -> StubEnrichment {
        StubEnrichment::default()
            .with_route("R1", "Ligne 1", &[])
            .with_route("R2", "Ligne 2", &[])
            .with_route("R3", "Ligne 3", &[])
    }

    #[test]
    fn test_count_routes_breaks_ties_by_first_appearance() {
        let counts = count_routes(&snapshot(), 2);
        assert_eq!(
            counts,
            vec![("R2".to_string(), 3), ("R1".to_string(), 3)]
        );
    }

    #[test]
    fn test_count_routes_zero_keeps_all() {
        let counts = count_routes(&snapshot(), 0);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[2], ("R3".to_string(), 1));
    }

    #[test]
    fn test_count_routes_empty_snapshot() {
        assert!(count_routes(&Snapshot::new(1, vec![]), 5).is_empty());
    }

    #[tokio::test]
    async fn test_rank_routes_resolves_names_in_order() {
        let stub = enrichment();
        let ranking = rank_routes(&snapshot(), 0, &stub).await.unwrap();

        let names: Vec<_> = ranking.iter().map(|r| r.route_name.as_str()).collect();
        assert_eq!(names, vec!["Ligne 2", "Ligne 1", "Ligne 3"]);
        assert_eq!(*stub.lookups.lock().unwrap(), vec!["R2", "R1", "R3"]);
    }

    #[tokio::test]
    async fn test_rank_routes_is_idempotent() {
        let stub = enrichment();
        let first = rank_routes(&snapshot(), 2, &stub).await.unwrap();
        let second = rank_routes(&snapshot(), 2, &stub).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rank_routes_aborts_on_enrichment_failure() {
        let stub = StubEnrichment::default().with_route("R2", "Ligne 2", &[]);
        let result = rank_routes(&snapshot(), 0, &stub).await;

        assert!(result.is_err());
        // R2 resolved, R1 failed, R3 never attempted
        assert_eq!(*stub.lookups.lock().unwrap(), vec!["R2", "R1"]);
    }
}
