use std::fs;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "locsync=info";

/// Initializes the logging system with both console and file output.
///
/// `RUST_LOG` refines the filter; without it only `locsync` info and above is shown.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Daily rotation, written from a background thread
    let file_appender = tracing_appender::rolling::daily("logs", "locsync.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    // Console output goes to stderr so command summaries on stdout stay clean
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter = match DEFAULT_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the worker alive for the whole process so logs are flushed on exit
    std::mem::forget(guard);
}
