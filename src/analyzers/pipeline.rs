//! Runs every analysis over one snapshot pair and assembles the result.

use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, error, info};

use crate::acquire::{SnapshotSource, capture_pair};
use crate::analyzers::departures::first_stop_departure;
use crate::analyzers::dwell::dwell_entries;
use crate::analyzers::failures::{DEFAULT_FAILURE_THRESHOLD_SECS, detect_failures};
use crate::analyzers::routes::rank_routes;
use crate::analyzers::types::PipelineResult;
use crate::services::enrichment::Enrichment;
use crate::snapshot::Snapshot;
use crate::stats::SnapshotStats;

pub const DEFAULT_TOP_ROUTES: usize = 5;

/// Tunables of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dwell, in seconds, above which a vehicle counts as failed.
    pub failure_threshold_secs: i64,
    /// Routes kept in the ranking; 0 keeps all.
    pub top_routes: usize,
    /// Upper bound for one whole analysis, enrichment lookups included.
    pub analysis_timeout: Duration,
    /// Delay between the two captures of [`Pipeline::process`].
    pub capture_interval: Duration,
    /// Upper bound for one capture.
    pub capture_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failure_threshold_secs: DEFAULT_FAILURE_THRESHOLD_SECS,
            top_routes: DEFAULT_TOP_ROUTES,
            analysis_timeout: Duration::from_secs(120),
            capture_interval: Duration::from_secs(1),
            capture_timeout: Duration::from_secs(60),
        }
    }
}

/// Snapshot-pair analysis bound to an enrichment provider.
pub struct Pipeline<E> {
    enrichment: E,
    config: PipelineConfig,
}

impl<E: Enrichment> Pipeline<E> {
    pub fn new(enrichment: E, config: PipelineConfig) -> Self {
        Self { enrichment, config }
    }

    pub fn enrichment(&self) -> &E {
        &self.enrichment
    }

    /// Analyzes `earlier` against `later`.
    ///
    /// Returns `None` when `later` is not strictly newer than `earlier`, or
    /// when any step fails; failures are logged here and nowhere else.
    #[tracing::instrument(
        skip_all,
        fields(earlier_ts = earlier.timestamp, later_ts = later.timestamp)
    )]
    pub async fn analyze(&self, earlier: &Snapshot, later: &Snapshot) -> Option<PipelineResult> {
        if !later.is_newer_than(earlier) {
            info!("Snapshots are not time-separated, skipping analysis");
            return None;
        }

        for (which, snapshot) in [("earlier", earlier), ("later", later)] {
            let stats = SnapshotStats::from_snapshot(snapshot);
            debug!(which, stopped_pct = stats.stopped_pct(), stats = ?stats, "Snapshot captured");
        }

        let timeout = self.config.analysis_timeout;
        let outcome = tokio::time::timeout(timeout, self.run_steps(earlier, later))
            .await
            .unwrap_or_else(|_| Err(anyhow!("analysis timed out after {timeout:?}")));

        match outcome {
            Ok(result) => {
                info!(
                    has_departure = result.averages.is_some(),
                    failures = result.failures.len(),
                    top_routes = result.top_routes.len(),
                    stop_durations = result.vehicle_stop_durations.len(),
                    "Snapshot pair analyzed"
                );
                Some(result)
            }
            Err(e) => {
                error!(error = %e, "Snapshot pair analysis failed");
                None
            }
        }
    }

    async fn run_steps(&self, earlier: &Snapshot, later: &Snapshot) -> Result<PipelineResult> {
        let averages = first_stop_departure(earlier, later, &self.enrichment).await?;
        let failures = detect_failures(earlier, later, self.config.failure_threshold_secs);
        let top_routes = rank_routes(later, self.config.top_routes, &self.enrichment).await?;
        let vehicle_stop_durations = dwell_entries(earlier, later, false);

        Ok(PipelineResult {
            averages,
            failures,
            top_routes,
            vehicle_stop_durations,
        })
    }

    /// Captures a snapshot pair from `source` and analyzes it.
    ///
    /// An acquisition failure is logged and yields `None`.
    pub async fn process<S: SnapshotSource + ?Sized>(&self, source: &S) -> Option<PipelineResult> {
        let pair = capture_pair(
            source,
            self.config.capture_interval,
            self.config.capture_timeout,
        )
        .await;

        match pair {
            Ok((earlier, later)) => self.analyze(&earlier, &later).await,
            Err(e) => {
                error!(error = %e, "Snapshot acquisition failed");
                None
            }
        }
    }
}
