//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_url, url_basename, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Only one global subscriber can exist per process, so initialization and the
// double-init failure are exercised in a single test.
#[test]
fn test_init_logging_once_and_forward_to_sink() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::debug!(target: "core_playback", url = "https://cdn.example.com/t.dfpwm?sig=x", "chunk decoded");
    tracing::trace!(target: "core_playback", "filtered out");
    tracing::info!(target: "some_dependency", "not a workspace crate");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "chunk decoded");
        assert_eq!(
            entries[0].fields.get("url").map(String::as_str),
            Some("https://cdn.example.com/t.dfpwm")
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_url_redaction(false)
        .with_filter("core_playback=trace,bridge_desktop=debug");

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_urls);
    assert_eq!(
        config.filter.as_deref(),
        Some("core_playback=trace,bridge_desktop=debug")
    );
}

#[test]
fn test_url_helpers() {
    let signed = "https://cdn.example.com/albums/ost/03-theme.dfpwm?Expires=1&Signature=abc";
    assert_eq!(redact_url(signed), "https://cdn.example.com/albums/ost/03-theme.dfpwm");
    assert_eq!(url_basename(signed), "03-theme.dfpwm");
    assert_eq!(url_basename("file:///home/user/music/local.dfpwm"), "local.dfpwm");
}
