use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var("VOXGATE_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("voxgate_trace.jsonl"))
}

/// Install the global subscriber once.
///
/// `--logs` writes JSON lines to [`tracing_log_path`]; otherwise warnings (or
/// everything down to debug with `--verbose`) go to stderr. `--no-logs`
/// installs nothing.
pub fn init_tracing(config: &AppConfig) {
    if !config.logging_enabled() {
        return;
    }
    let level = if config.verbose {
        LevelFilter::DEBUG
    } else if config.logs {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };

    let _ = TRACING_INIT.get_or_init(|| {
        if config.logs {
            let path = tracing_log_path();
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    let subscriber = tracing_subscriber::fmt()
                        .json()
                        .with_max_level(level)
                        .with_timer(UtcTime::rfc_3339())
                        .with_writer(file)
                        .with_current_span(false)
                        .with_span_list(false)
                        .finish();
                    let _ = tracing::subscriber::set_global_default(subscriber);
                    return;
                }
                Err(err) => {
                    eprintln!("voxgate: cannot open trace log {}: {err}", path.display());
                }
            }
        }
        let subscriber = tracing_subscriber::fmt()
            .compact()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
