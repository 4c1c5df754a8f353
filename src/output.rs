//! Local output: JSON logging of results and a CSV-backed publish sink.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::services::publish::{Message, PublishSink};

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends records as rows to a CSV file.
///
/// Writes headers first when the file is missing or empty.
pub fn append_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let has_content = path.metadata().is_ok_and(|m| m.len() > 0);
    debug!(path = %path.display(), has_content, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!has_content) // IMPORTANT when appending
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    published_at: DateTime<Utc>,
    key: Option<&'a str>,
    value: &'a str,
}

/// Publish sink writing one CSV file per topic into a directory.
pub struct CsvSink {
    dir: PathBuf,
    connected: bool,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            connected: false,
        }
    }

    pub fn topic_path(&self, topic: &str) -> PathBuf {
        self.dir.join(format!("{topic}.csv"))
    }
}

#[async_trait]
impl PublishSink for CsvSink {
    async fn connect(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, topic: &str, messages: &[Message]) -> Result<()> {
        if !self.connected {
            return Err(anyhow!("CSV sink used before connect"));
        }

        let now = Utc::now();
        let rows: Vec<CsvRow<'_>> = messages
            .iter()
            .map(|m| CsvRow {
                published_at: now,
                key: m.key.as_deref(),
                value: &m.value,
            })
            .collect();

        append_records(&self.topic_path(topic), &rows)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::publish::send_messages;
    use std::fs;

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&vec!["a", "b"]).unwrap();
    }

    #[test]
    fn test_append_records_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");

        #[derive(Serialize)]
        struct Row {
            route_id: &'static str,
            vehicle_count: usize,
        }

        append_records(&path, &[Row { route_id: "A", vehicle_count: 3 }]).unwrap();
        append_records(&path, &[Row { route_id: "B", vehicle_count: 1 }]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["route_id,vehicle_count", "A,3", "B,1"]);
    }

    #[tokio::test]
    async fn test_csv_sink_one_file_per_topic() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("out"));

        send_messages(&mut sink, "failures", &[Message::new("{\"v\":1}").with_key("bus_1")])
            .await
            .unwrap();
        send_messages(&mut sink, "failures", &[Message::new("{\"v\":2}")])
            .await
            .unwrap();

        let content = fs::read_to_string(sink.topic_path("failures")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "published_at,key,value");
        assert!(lines[1].ends_with(",bus_1,\"{\"\"v\"\":1}\""));
        assert!(!sink.connected);
    }

    #[test]
    fn test_append_records_header_after_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        fs::write(&path, "").unwrap();

        #[derive(Serialize)]
        struct Row {
            route_id: &'static str,
        }

        append_records::<Row>(&path, &[]).unwrap();
        append_records(&path, &[Row { route_id: "A" }]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["route_id", "A"]);
    }

    #[tokio::test]
    async fn test_csv_sink_empty_batch_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());

        send_messages(&mut sink, "failures", &[]).await.unwrap();
        send_messages(&mut sink, "failures", &[Message::new("v")])
            .await
            .unwrap();

        let content = fs::read_to_string(sink.topic_path("failures")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "published_at,key,value");
        assert!(lines[1].ends_with(",,v"));
    }

    #[tokio::test]
    async fn test_csv_sink_requires_connect() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        assert!(sink.send("failures", &[]).await.is_err());
    }
}
