use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::stream::{
        METRIC_SETUP_FAILURE_TOTAL, METRIC_SHELL_FAILURE_TOTAL, METRIC_STREAM_STARTED_TOTAL,
        METRIC_TAIL_FAILURE_TOTAL,
    },
    config::{LogFormat, LoggingSettings},
};

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
            METRIC_STREAM_STARTED_TOTAL,
            Unit::Count,
            "Total number of responses that started streaming a rendered body."
        );
        describe_counter!(
            METRIC_SHELL_FAILURE_TOTAL,
            Unit::Count,
            "Total number of renders whose shell failed before any byte was sent."
        );
        describe_counter!(
            METRIC_TAIL_FAILURE_TOTAL,
            Unit::Count,
            "Total number of streamed bodies truncated by a failure after the shell."
        );
        describe_counter!(
            METRIC_SETUP_FAILURE_TOTAL,
            Unit::Count,
            "Total number of responses replaced by a 500 due to an adapter setup fault."
        );
    });
}
