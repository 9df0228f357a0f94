//! StructuredLogger (C2): append-only JSONL event sink, one file per day per stream.
//!
//! Grounded on the donor codebase's logging setup (a `tracing-subscriber` layer paired
//! with a domain-level event sink), generalized to the per-stream file layout from §6.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Trades,
    Orders,
    HealthCheck,
    PerformanceAlerts,
    RiskManagement,
}

impl Stream {
    fn dir_name(self) -> &'static str {
        match self {
            Stream::Trades => "trades",
            Stream::Orders => "orders",
            Stream::HealthCheck => "health_check",
            Stream::PerformanceAlerts => "performance_alerts",
            Stream::RiskManagement => "risk_management",
        }
    }

    /// Level a given stream's events are forwarded to `tracing` at, absent an override.
    fn default_level(self) -> Level {
        match self {
            Stream::PerformanceAlerts => Level::Warn,
            _ => Level::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Append-only JSONL sink. One exclusive lock per stream name so concurrent writers
/// to distinct streams never block each other (§4.2).
pub struct StructuredLogger {
    root: PathBuf,
    locks: HashMap<Stream, Arc<Mutex<()>>>,
}

impl StructuredLogger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let locks = [
            Stream::Trades,
            Stream::Orders,
            Stream::HealthCheck,
            Stream::PerformanceAlerts,
            Stream::RiskManagement,
        ]
        .into_iter()
        .map(|s| (s, Arc::new(Mutex::new(()))))
        .collect();
        Self {
            root: root.into(),
            locks,
        }
    }

    fn path_for(&self, stream: Stream) -> PathBuf {
        let day = Utc::now().date_naive();
        self.root.join(stream.dir_name()).join(format!("{day}.jsonl"))
    }

    /// Append one record, tagged with `event` and a UTC timestamp, forwarding to
    /// `tracing` at the stream's default level. Disk-full / IO errors are caught and
    /// logged to stderr via `tracing::error!`; they never propagate (§4.2).
    pub async fn log(&self, stream: Stream, event: &str, fields: Value) {
        self.log_at(stream, event, fields, stream.default_level())
            .await;
    }

    pub async fn log_at(&self, stream: Stream, event: &str, fields: Value, level: Level) {
        let mut record = json!({
            "ts_utc": Utc::now(),
            "stream": stream.dir_name(),
            "event": event,
        });
        if let Value::Object(ref mut map) = record {
            if let Value::Object(extra) = fields {
                map.extend(extra);
            }
        }

        match level {
            Level::Info => info!(event, stream = stream.dir_name(), record = %record),
            Level::Warn => warn!(event, stream = stream.dir_name(), record = %record),
            Level::Error => error!(event, stream = stream.dir_name(), record = %record),
        }

        if let Err(err) = self.write_line(stream, &record).await {
            error!(?err, stream = stream.dir_name(), "failed to append log record");
        }
    }

    async fn write_line(&self, stream: Stream, record: &Value) -> std::io::Result<()> {
        let lock = self
            .locks
            .get(&stream)
            .cloned()
            .expect("every Stream variant has a lock");
        let _guard = lock.lock().await;

        let path = self.path_for(stream);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
        let mut line = serde_json::to_string(record).unwrap_or_default();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// Convenience for callers that want to serialize a typed record instead of building
/// `json!{}` by hand at the call site.
pub fn to_fields<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn is_jsonl_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn logs_append_as_jsonl_lines() {
        let dir = tempfile_dir();
        let logger = StructuredLogger::new(&dir);
        logger
            .log(Stream::Orders, "order.submitted", json!({"order_id": "abc123"}))
            .await;
        logger
            .log(Stream::Orders, "order.filled", json!({"order_id": "abc123"}))
            .await;

        let path = logger.path_for(Stream::Orders);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "order.submitted");
        assert_eq!(first["order_id"], "abc123");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn distinct_streams_write_to_distinct_files() {
        let dir = tempfile_dir();
        let logger = StructuredLogger::new(&dir);
        logger.log(Stream::Trades, "trade.executed", json!({})).await;
        logger.log(Stream::HealthCheck, "health.passed", json!({})).await;

        assert!(logger.path_for(Stream::Trades).exists());
        assert!(logger.path_for(Stream::HealthCheck).exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    fn tempfile_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tradewarden-logger-test-{}", uuid::Uuid::new_v4()))
    }
}
