use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// JSON trace log location: `--log-file` (or `RSBAR_TRACE_LOG`), else the
/// temp dir.
pub fn tracing_log_path(config: &AppConfig) -> PathBuf {
    config
        .log_file
        .clone()
        .unwrap_or_else(|| env::temp_dir().join("rsbar_trace.jsonl"))
}

/// Install the global subscriber. Stdout carries the bar protocol, so logs
/// only ever go to stderr or the trace file.
pub fn init_tracing(config: &AppConfig) {
    if !config.logging_enabled() {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        if config.file_logging_enabled() {
            let path = tracing_log_path(config);
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(err) => {
                    eprintln!("rsbar: cannot open trace log {}: {err}", path.display());
                    return;
                }
            };
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_max_level(config.log_level)
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
            return;
        }

        let subscriber = tracing_subscriber::fmt()
            .with_timer(UtcTime::rfc_3339())
            .with_max_level(config.log_level)
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn log_file_flag_wins_over_default_path() {
        let cfg = AppConfig::parse_from(["rsbar", "--log-file", "/tmp/custom-rsbar.jsonl"]);
        assert_eq!(
            tracing_log_path(&cfg),
            PathBuf::from("/tmp/custom-rsbar.jsonl")
        );
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let cfg = AppConfig::parse_from(["rsbar", "--no-logs"]);
        init_tracing(&cfg);
        assert!(TRACING_INIT.get().is_none());
    }
}
