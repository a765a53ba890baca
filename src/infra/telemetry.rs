use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber for a build run.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .without_time()
            .boxed(),
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
            "docweave_link_cache_hit_total",
            Unit::Count,
            "Total number of link lookups answered from the resolver cache."
        );
        describe_counter!(
            "docweave_link_cache_miss_total",
            Unit::Count,
            "Total number of link lookups that missed the resolver cache."
        );
        describe_counter!(
            "docweave_link_plural_retry_total",
            Unit::Count,
            "Total number of link lookups retried without a trailing `s`."
        );
        describe_counter!(
            "docweave_pages_written_total",
            Unit::Count,
            "Total number of pages written to the output directory."
        );
        describe_counter!(
            "docweave_diagnostics_total",
            Unit::Count,
            "Total number of diagnostics emitted, labelled by code."
        );
    });
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn second_install_is_an_error_not_a_panic() {
        let logging = LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        };

        // Another test may already have installed a subscriber; either way
        // the second call must fail cleanly.
        let _ = init(&logging);
        let err = init(&logging).expect_err("already installed");
        assert!(matches!(err, InfraError::Telemetry(_)));
    }
}
