//! Metrics capture and Prometheus recorder.

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Sets up Prometheus buckets for matched metrics and installs recorder.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )?;

    let handle = builder.install_recorder()?;

    metrics::describe_counter!("otp_issued_total", "Verification codes issued");
    metrics::describe_counter!(
        "otp_verifications_total",
        "Verification attempts, by outcome"
    );
    metrics::describe_counter!("users_upserted_total", "Saved users, by outcome");

    Ok(handle)
}
