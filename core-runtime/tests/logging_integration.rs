//! Integration tests for logging system
//!
//! Installs the global subscriber once with a capturing sink and checks what
//! the host actually receives.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CapturingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl CapturingSink {
    fn find(&self, message: &str) -> Option<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.message == message)
            .cloned()
    }
}

#[async_trait]
impl LoggerSink for CapturingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[test]
fn test_sink_receives_redacted_fields_through_global_subscriber() {
    let sink = Arc::new(CapturingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(
        target: "core_auth::manager",
        access_token = "at-secret",
        code_verifier = "v-secret",
        expires_at_ms = 1_700_000_000_000i64,
        "Token refreshed"
    );
    tracing::info!(
        target: "core_lyrics::resolver",
        track = "Éxito@Live.2020",
        artist = "The Band",
        tier = 2u64,
        "Resolved synced lyrics"
    );
    tracing::debug!(target: "hyper::proto", "connection pooled");

    let auth = sink.find("Token refreshed").unwrap();
    assert_eq!(auth.level, LogLevel::Info);
    assert_eq!(auth.target, "core_auth::manager");
    assert_eq!(auth.fields.get("access_token").unwrap(), "[REDACTED]");
    assert_eq!(auth.fields.get("code_verifier").unwrap(), "[REDACTED]");
    assert_eq!(auth.fields.get("expires_at_ms").unwrap(), "1700000000000");

    let lyrics = sink.find("Resolved synced lyrics").unwrap();
    assert_eq!(lyrics.fields.get("track").unwrap(), "É***@[REDACTED]");
    assert_eq!(lyrics.fields.get("artist").unwrap(), "The Band");
    assert_eq!(lyrics.fields.get("tier").unwrap(), "2");

    // Dependencies are filtered to warn by default.
    assert!(sink.find("connection pooled").is_none());

    // A second global install is refused.
    assert!(init_logging(LoggingConfig::default()).is_err());
}
