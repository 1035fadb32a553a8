//! # Operator Metrics
//!
//! Run counters and durations, labeled per resource so dashboards can slice
//! by run name and namespace.

use crate::crd::TerraformRunStatus;
use anyhow::Result;
use chrono::{DateTime, Utc};
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

/// Global Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terraform_operator_runs_total",
            "Total number of run submissions per Terraform object",
        ),
        &["name", "namespace"],
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_STATUS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terraform_operator_run_status_total",
            "Run status transitions per Terraform object",
        ),
        &["name", "namespace", "status"],
    )
    .expect("Failed to create RUN_STATUS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "terraform_operator_run_duration_seconds",
            "Duration of a run from start to terminal transition",
        )
        .buckets(vec![30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["name", "namespace"],
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "terraform_operator_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_STATUS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    Ok(())
}

/// Render the registry in the Prometheus text exposition format
pub fn gather() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Count a run submission
pub fn record_total(name: &str, namespace: &str) {
    RUNS_TOTAL.with_label_values(&[name, namespace]).inc();
}

/// Count a status transition
pub fn record_status(name: &str, namespace: &str, status: TerraformRunStatus) {
    RUN_STATUS_TOTAL
        .with_label_values(&[name, namespace, &status.to_string()])
        .inc();
}

/// Observe the elapsed time of a run since its recorded start
pub fn record_duration(name: &str, namespace: &str, started: DateTime<Utc>) {
    let elapsed = (Utc::now() - started).num_milliseconds().max(0) as f64 / 1000.0;
    RUN_DURATION
        .with_label_values(&[name, namespace])
        .observe(elapsed);
}

/// Count a reconciliation error
pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_total() {
        let before = RUNS_TOTAL.with_label_values(&["bar", "default"]).get();
        record_total("bar", "default");
        let after = RUNS_TOTAL.with_label_values(&["bar", "default"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_record_status() {
        let before = RUN_STATUS_TOTAL
            .with_label_values(&["bar", "default", "Completed"])
            .get();
        record_status("bar", "default", TerraformRunStatus::Completed);
        let after = RUN_STATUS_TOTAL
            .with_label_values(&["bar", "default", "Completed"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_record_duration() {
        record_duration("bar", "default", Utc::now() - chrono::Duration::seconds(90));
        // Histogram observation does not return a value; just verify no panic
    }

    #[test]
    fn test_register_metrics_once() {
        assert!(register_metrics().is_ok());
        // A second registration is a duplicate-collector error
        assert!(register_metrics().is_err());
    }
}
