//! Trait and helpers for publishing pipeline output to a message sink.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One message handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub key: Option<String>,
    pub value: String,
}

impl Message {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A destination for published messages with an explicit connection lifecycle.
#[async_trait::async_trait]
pub trait PublishSink: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn send(&mut self, topic: &str, messages: &[Message]) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
}

/// Connects, sends `messages` to `topic`, then disconnects.
///
/// The sink is disconnected on every path. A connect or send error is
/// returned after the disconnect; a disconnect error is only returned when
/// nothing failed before it.
#[tracing::instrument(skip(sink, messages), fields(count = messages.len()))]
pub async fn send_messages<S: PublishSink + ?Sized>(
    sink: &mut S,
    topic: &str,
    messages: &[Message],
) -> Result<()> {
    let outcome = match sink.connect().await {
        Ok(()) => sink.send(topic, messages).await,
        Err(e) => Err(e),
    };

    let released = sink.disconnect().await;

    match (outcome, released) {
        (Err(e), Err(release_err)) => {
            warn!(error = %release_err, "Sink disconnect failed after publish error");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), released) => {
            debug!("Messages published");
            released
        }
    }
}
