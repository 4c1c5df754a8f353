//! Trait and types for resolving route and stop identifiers to readable names.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A stop served by one direction of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    pub external_code: String,
    #[serde(default)]
    pub full_label: String,
    #[serde(default)]
    pub name: String,
}

/// One travel direction of a route and the stops it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDirection {
    #[serde(default)]
    pub stop_points: Vec<StopPoint>,
}

/// Route metadata as returned by the line-information service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub name: String,
    /// Published under the `routes` key by the upstream service.
    #[serde(rename = "routes", default)]
    pub directions: Vec<RouteDirection>,
}

/// Readable names of a stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInfo {
    pub name: String,
    pub full_label: String,
}

impl RouteInfo {
    /// Looks `stop_id` up in the route's first direction.
    ///
    /// Returns `None` when the route has no directions or the stop is not
    /// served by the first one.
    pub fn find_stop(&self, stop_id: &str) -> Option<StopInfo> {
        self.directions
            .first()?
            .stop_points
            .iter()
            .find(|sp| sp.external_code == stop_id)
            .map(|sp| StopInfo {
                name: sp.name.clone(),
                full_label: sp.full_label.clone(),
            })
    }
}

/// Abstraction over a route/stop metadata provider.
#[async_trait::async_trait]
pub trait Enrichment: Send + Sync {
    /// Fetches metadata for `route_id`.
    async fn resolve_route(&self, route_id: &str) -> Result<RouteInfo>;

    /// Resolves a stop of a route. `Ok(None)` means the route payload does not
    /// list the stop.
    async fn resolve_stop(&self, route_id: &str, stop_id: &str) -> Result<Option<StopInfo>> {
        Ok(self.resolve_route(route_id).await?.find_stop(stop_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> RouteInfo {
        serde_json::from_str(
            r#"{
                "name": "Tram A",
                "routes": [
                    { "stopPoints": [
                        { "externalCode": "3612", "fullLabel": "Hôtel de Ville (Bordeaux)", "name": "Hôtel de Ville" },
                        { "externalCode": "3613", "fullLabel": "Palais de Justice (Bordeaux)", "name": "Palais de Justice" }
                    ] },
                    { "stopPoints": [
                        { "externalCode": "9999", "fullLabel": "Retour", "name": "Retour" }
                    ] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_find_stop_in_first_direction() {
        let stop = route().find_stop("3613").unwrap();
        assert_eq!(stop.name, "Palais de Justice");
        assert_eq!(stop.full_label, "Palais de Justice (Bordeaux)");
    }

    #[test]
    fn test_find_stop_ignores_other_directions() {
        assert!(route().find_stop("9999").is_none());
    }

    #[test]
    fn test_find_stop_without_directions() {
        let info = RouteInfo {
            name: "Bus 1".to_string(),
            directions: vec![],
        };
        assert!(info.find_stop("3612").is_none());
    }
}
