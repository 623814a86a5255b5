//! Logging Infrastructure
//!
//! Structured logging setup: `RUST_LOG` wins when set, otherwise the
//! configured level applies to this crate and `tower_http`.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Initialize the logger with optional daily-rolling file output
pub fn init_logger_with_file(log_level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ledger_server={level},shared={level},tower_http={level}",
            level = log_level
        ))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(dir, "ledger-server");
                subscriber
                    .with_writer(std::io::stdout.and(file_appender))
                    .init();
                return;
            }
            Err(e) => eprintln!("Log directory {} unavailable: {}", dir.display(), e),
        }
    }

    subscriber.init();
}
