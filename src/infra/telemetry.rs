use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "palaver_staging_drain_total",
            Unit::Count,
            "Total number of entries drained from the staging store, by namespace."
        );
        describe_counter!(
            "palaver_job_skipped_total",
            Unit::Count,
            "Total number of reconciliation ticks skipped because the previous pass was still running."
        );
        describe_counter!(
            "palaver_job_failed_total",
            Unit::Count,
            "Total number of reconciliation passes that ended in an error."
        );
        describe_histogram!(
            "palaver_job_duration_ms",
            Unit::Milliseconds,
            "Wall-clock duration of a successful reconciliation pass."
        );
        describe_histogram!(
            "palaver_rank_scan_ms",
            Unit::Milliseconds,
            "Latency of the rank candidate scan against the database."
        );
        describe_histogram!(
            "palaver_rank_select_ms",
            Unit::Milliseconds,
            "Latency of the in-memory top-K selection."
        );
    });
}
