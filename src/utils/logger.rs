use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the non-blocking writer flushing for the life of the process
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console logging always; a daily rolling file next to it when `to_file` is set.
/// `RUST_LOG`-style directives are accepted in `level`.
pub fn init_logger(level: &str, to_file: bool, file_path: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(true)
        .with_writer(std::io::stdout);

    let file_layer = to_file.then(|| {
        let path = Path::new(file_path);
        let dir = path.parent().unwrap_or_else(|| Path::new("./logs"));
        let name = path
            .file_name()
            .unwrap_or_else(|| OsStr::new("watcher.log"));

        let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, name));
        FILE_GUARD.set(guard).ok();

        // Targets help when grepping archived files per module
        fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
