//! Snapshot acquisition: where feed payloads come from and how a pair of
//! captures is taken.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::parser::decode_snapshot;
use crate::snapshot::Snapshot;

/// Produces one fresh [`Snapshot`] per call.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn capture(&self) -> Result<Snapshot>;
}

/// Fetches the feed over HTTP.
pub struct HttpSource<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpSource<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> SnapshotSource for HttpSource<C> {
    async fn capture(&self) -> Result<Snapshot> {
        let bytes = fetch_bytes(&self.client, &self.url)
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        debug!(bytes = bytes.len(), "Feed bytes received, decoding");
        decode_snapshot(&bytes)
    }
}

/// Reads the feed from a local file, re-read on every capture.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn capture(&self) -> Result<Snapshot> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        decode_snapshot(&bytes)
    }
}

#[async_trait]
impl SnapshotSource for Box<dyn SnapshotSource> {
    async fn capture(&self) -> Result<Snapshot> {
        (**self).capture().await
    }
}

/// Captures one snapshot, giving up after `timeout`.
pub async fn capture_with_timeout<S: SnapshotSource + ?Sized>(
    source: &S,
    timeout: Duration,
) -> Result<Snapshot> {
    tokio::time::timeout(timeout, source.capture())
        .await
        .map_err(|_| anyhow!("snapshot capture timed out after {timeout:?}"))?
}

/// Takes two captures `interval` apart. The second capture starts only once
/// the first has fully completed.
#[tracing::instrument(skip(source), fields(interval_ms = interval.as_millis() as u64))]
pub async fn capture_pair<S: SnapshotSource + ?Sized>(
    source: &S,
    interval: Duration,
    timeout: Duration,
) -> Result<(Snapshot, Snapshot)> {
    let earlier = capture_with_timeout(source, timeout).await?;
    tokio::time::sleep(interval).await;
    let later = capture_with_timeout(source, timeout).await?;

    info!(
        earlier_ts = earlier.timestamp,
        later_ts = later.timestamp,
        earlier_vehicles = earlier.len(),
        later_vehicles = later.len(),
        "Snapshot pair captured"
    );

    Ok((earlier, later))
}
