use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::fetch::HttpClient;
use crate::services::enrichment::{Enrichment, RouteInfo};

pub const DEFAULT_BASE_URL: &str = "https://ws.infotbm.com/ws/1.0/network/line-informations";

/// Resolves routes against the TBM line-information service
/// (`GET {base_url}/{route_id}`).
pub struct LineInformationClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> LineInformationClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `route_id` becomes a single path segment, percent-encoded as needed.
    fn route_url(&self, route_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid line information URL {:?}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("line information URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .push(route_id);
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> Enrichment for LineInformationClient<C> {
    #[tracing::instrument(skip(self))]
    async fn resolve_route(&self, route_id: &str) -> Result<RouteInfo> {
        let req = reqwest::Request::new(reqwest::Method::GET, self.route_url(route_id)?);

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow!("Failed to send request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Line information returned status {}: {}", status, body));
        }

        let info: RouteInfo = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse line information: {}", e))?;

        debug!(route_name = %info.name, directions = info.directions.len(), "Route resolved");
        Ok(info)
    }
}
