//! Core library for tunnelbar
//!
//! This crate runs and watches the OpenVPN process and turns its output into
//! a connection status the menu bar can show.

pub mod error;
pub mod log_sink;
pub mod presenter;

pub mod config;
pub mod vpn;

use log_sink::LogSink;

/// Tracing target of raw OpenVPN output
///
/// The file layer skips it because those lines already reach the log file
/// verbatim.
pub const OUTPUT_TARGET: &str = "openvpn";

/// File layer: everything except raw OpenVPN output, without colors
fn file_layer<S>(sink: &LogSink) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    use tracing_subscriber::filter::filter_fn;
    use tracing_subscriber::Layer;

    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(sink.clone())
        .with_filter(filter_fn(|metadata| metadata.target() != OUTPUT_TARGET))
}

/// Initialize logging infrastructure
///
/// Diagnostics go to the log file and to stderr, or to the systemd journal
/// instead of stderr when running under systemd.
pub fn init_logging(sink: &LogSink, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    // Try to use systemd journal logging if available
    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            // We're running under systemd, use journal logging
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(file_layer(sink))
                .with(level)
                .try_init()?;
            return Ok(());
        }
    }

    // Fallback to stderr logging with pretty formatting
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr),
        )
        .with(file_layer(sink))
        .with(level)
        .try_init()?;

    Ok(())
}
