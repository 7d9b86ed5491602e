//! Logging infrastructure for ovnci.
//!
//! Every workflow step runs inside a span carrying the cluster name and the
//! step name, so interleaved ansible/openstack output in the log can be tied
//! back to the step that produced it.

use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// the ovnci crates and prints span close events with their timing.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("ovnci=debug,ovnci_engine=debug,info")
            } else {
                EnvFilter::try_new("ovnci=info,ovnci_engine=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span for one lifecycle step.
pub fn step_span(cluster: &str, step: &str) -> tracing::Span {
    span!(Level::INFO, "cluster_step", cluster = %cluster, step = %step)
}

pub fn log_step_start(cluster: &str, step: &str) {
    info!(cluster = %cluster, step = %step, "Starting step");
}

pub fn log_step_complete(cluster: &str, step: &str, duration_ms: u128) {
    info!(
        cluster = %cluster,
        step = %step,
        duration_ms = %duration_ms,
        "Step completed"
    );
}

pub fn log_step_error(cluster: &str, step: &str, error: &str, duration_ms: u128) {
    error!(
        cluster = %cluster,
        step = %step,
        duration_ms = %duration_ms,
        error = %error,
        "Step failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_span_metadata() {
        let span = step_span("ci", "provision");
        // Without a subscriber the span is disabled; with one it must be named.
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "cluster_step");
        }
    }

    #[test]
    fn test_log_helpers_do_not_panic_without_subscriber() {
        log_step_start("ci", "deploy");
        log_step_complete("ci", "deploy", 42);
        log_step_error("ci", "deploy", "boom", 7);
    }
}
