use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use tracing::info;

use crate::services::publish::{Message, PublishSink};

/// Publishes each batch as one JSON array object in S3.
///
/// Objects land under `{prefix}/{topic}/date=YYYY-MM-DD/{millis}.json`, with a
/// `.gz` suffix when compression is enabled.
pub struct S3Sink {
    bucket: String,
    prefix: String,
    gzip: bool,
    client: Option<aws_sdk_s3::Client>,
}

impl S3Sink {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, gzip: bool) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            gzip,
            client: None,
        }
    }

    fn object_key(&self, topic: &str, at: DateTime<Utc>) -> String {
        let mut key = format!(
            "{}/date={}/{}.json",
            topic,
            at.format("%Y-%m-%d"),
            at.timestamp_millis()
        );
        let prefix = self.prefix.trim_matches('/');
        if !prefix.is_empty() {
            key = format!("{prefix}/{key}");
        }
        if self.gzip {
            key.push_str(".gz");
        }
        key
    }

    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(messages)?;
        if !self.gzip {
            return Ok(body);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        Ok(encoder.finish()?)
    }
}

#[async_trait]
impl PublishSink for S3Sink {
    async fn connect(&mut self) -> Result<()> {
        let config = aws_config::load_from_env().await;
        self.client = Some(aws_sdk_s3::Client::new(&config));
        Ok(())
    }

    async fn send(&mut self, topic: &str, messages: &[Message]) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| anyhow!("S3 sink used before connect"))?;

        let key = self.object_key(topic, Utc::now());
        let body = self.encode(messages)?;
        let content_type = if self.gzip {
            "application/gzip"
        } else {
            "application/json"
        };

        client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await?;

        info!(bucket = %self.bucket, key = %key, count = messages.len(), "Batch uploaded to S3");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.client = None;
        Ok(())
    }
}
