use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging plus an optional daily-rolling JSON file log.
///
/// - `RUST_LOG` overrides the default `scan_transfer=info,info` filter
/// - `SCAN_TRANSFER_LOG_FORMAT=json` switches the console layer to JSON lines
/// - `SCAN_TRANSFER_LOG_DIR` enables the file layer in that directory
///
/// Keep the returned guard alive for the life of the process so buffered file
/// logs are flushed on exit.
pub fn init_logging() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scan_transfer=info,info"));

    let json_console = std::env::var("SCAN_TRANSFER_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (console_json, console_plain) = if json_console {
        (Some(fmt::layer().json().with_writer(std::io::stdout)), None)
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stdout);
        (None, Some(layer))
    };

    let mut guard = None;
    let file_layer = std::env::var("SCAN_TRANSFER_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .and_then(|dir| match fs::create_dir_all(&dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(&dir, "scan_transfer.log");
                let (non_blocking_writer, worker_guard) =
                    tracing_appender::non_blocking(file_appender);
                guard = Some(worker_guard);
                Some(fmt::layer().json().with_writer(non_blocking_writer))
            }
            Err(e) => {
                eprintln!("could not create log directory {}: {}", dir, e);
                None
            }
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_json)
        .with(console_plain)
        .with(file_layer)
        .init();

    guard
}
