use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sends enrichment progress to stdout and a JSON copy to `logs/`.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "county_geocoder.log");
    let (json_writer, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = fmt::layer().json().with_writer(json_writer);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    // RUST_LOG still applies to other targets; this crate logs at info or above
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "county_geocoder=info".parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(console_layer)
        .init();

    // Per-row lines are written until process exit, so the writer never shuts down
    std::mem::forget(guard);
}
