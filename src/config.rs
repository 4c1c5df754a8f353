//! Environment-driven settings (a `.env` file is loaded by the binary first).

use anyhow::{Context, Result};
use std::time::Duration;

use crate::acquire::HttpSource;
use crate::fetch::auth::{ApiKey, UrlParam};
use crate::fetch::{BasicClient, HttpClient};
use crate::infra::infotbm::{DEFAULT_BASE_URL, LineInformationClient};

pub const DEFAULT_FEED_URL: &str = "https://bdx.mecatran.com/utw/ws/gtfsfeed/vehicles/bordeaux";

/// How the feed API key is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAuth {
    None,
    /// Appended as `?{param_name}={key}`.
    UrlParam { param_name: String, key: String },
    /// Sent in the `header_name` header.
    Header { header_name: String, key: String },
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub feed_url: String,
    pub feed_auth: FeedAuth,
    pub enrichment_base_url: String,
    pub http_timeout: Duration,
    pub capture_timeout: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_auth = match lookup("FEED_API_KEY") {
            None => FeedAuth::None,
            Some(key) => match lookup("FEED_API_KEY_HEADER") {
                Some(header_name) => FeedAuth::Header { header_name, key },
                None => FeedAuth::UrlParam {
                    param_name: lookup("FEED_API_KEY_PARAM").unwrap_or_else(|| "apiKey".to_string()),
                    key,
                },
            },
        };

        Ok(Self {
            feed_url: lookup("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_auth,
            enrichment_base_url: lookup("ENRICHMENT_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http_timeout: secs(&lookup, "HTTP_TIMEOUT_SECS", 30)?,
            capture_timeout: secs(&lookup, "CAPTURE_TIMEOUT_SECS", 60)?,
        })
    }

    /// HTTP client for the feed, wrapped with the configured authentication.
    pub fn feed_client(&self) -> Result<Box<dyn HttpClient>> {
        let basic = BasicClient::new(self.http_timeout)?;
        let client: Box<dyn HttpClient> = match &self.feed_auth {
            FeedAuth::None => Box::new(basic),
            FeedAuth::UrlParam { param_name, key } => Box::new(UrlParam {
                inner: basic,
                param_name: param_name.clone(),
                key: key.clone(),
            }),
            FeedAuth::Header { header_name, key } => {
                Box::new(ApiKey::new(basic, header_name, key)?)
            }
        };
        Ok(client)
    }

    /// Snapshot source for `url`, using the feed client.
    pub fn http_source(&self, url: &str) -> Result<HttpSource<Box<dyn HttpClient>>> {
        Ok(HttpSource::new(self.feed_client()?, url))
    }

    pub fn enrichment_client(&self) -> Result<LineInformationClient<BasicClient>> {
        Ok(LineInformationClient::new(
            BasicClient::new(self.http_timeout)?,
            self.enrichment_base_url.clone(),
        ))
    }
}

fn secs<F>(lookup: &F, name: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => {
            let value: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a number of seconds, got {raw:?}"))?;
            Ok(Duration::from_secs(value))
        }
        None => Ok(Duration::from_secs(default)),
    }
}
