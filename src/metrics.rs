//! Provisioning Metrics
//!
//! Prometheus collectors for provision and deprovision calls. Collectors are
//! created unregistered; the binary registers them with the default registry.

use crate::error::{Error, Result};
use crate::provisioner::bucket_store::EnsureOutcome;
use crate::provisioner::workflow::ProvisionStage;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Duration;

/// Collectors for the provisioning workflow
#[derive(Clone)]
pub struct ProvisionMetrics {
    /// Successful provisions by bucket outcome
    pub provisions: IntCounterVec,
    /// Failed provisions by the step that failed
    pub failures: IntCounterVec,
    /// Deprovision calls acknowledged
    pub deprovisions: IntCounter,
    /// Provision call latency
    pub duration: Histogram,
}

impl ProvisionMetrics {
    /// Create unregistered collectors
    pub fn new() -> Result<Self> {
        let provisions = IntCounterVec::new(
            Opts::new(
                "s3_provisioner_provisions_total",
                "Successful volume provisions",
            ),
            &["outcome"],
        )
        .map_err(metrics_error)?;

        let failures = IntCounterVec::new(
            Opts::new(
                "s3_provisioner_provision_failures_total",
                "Failed volume provisions by failing step",
            ),
            &["step"],
        )
        .map_err(metrics_error)?;

        let deprovisions = IntCounter::new(
            "s3_provisioner_deprovisions_total",
            "Deprovision calls acknowledged",
        )
        .map_err(metrics_error)?;

        let duration = Histogram::with_opts(HistogramOpts::new(
            "s3_provisioner_provision_duration_seconds",
            "Duration of provision calls",
        ))
        .map_err(metrics_error)?;

        Ok(Self {
            provisions,
            failures,
            deprovisions,
            duration,
        })
    }

    /// Register all collectors with `registry`
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry
            .register(Box::new(self.provisions.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.failures.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.deprovisions.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.duration.clone()))
            .map_err(metrics_error)?;
        Ok(())
    }

    pub(crate) fn record_success(&self, outcome: EnsureOutcome, elapsed: Duration) {
        self.provisions.with_label_values(&[outcome.as_str()]).inc();
        self.duration.observe(elapsed.as_secs_f64());
    }

    /// Count a failed attempt that stopped after `stage`
    pub(crate) fn record_failure(&self, stage: ProvisionStage, elapsed: Duration) {
        self.failures.with_label_values(&[stage.next_step()]).inc();
        self.duration.observe(elapsed.as_secs_f64());
    }

    pub(crate) fn record_deprovision(&self) {
        self.deprovisions.inc();
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("Metrics setup failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_record() {
        let registry = Registry::new();
        let metrics = ProvisionMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.record_success(EnsureOutcome::Created, Duration::from_millis(20));
        metrics.record_success(EnsureOutcome::AlreadyExists, Duration::from_millis(5));
        metrics.record_failure(ProvisionStage::NameRendered, Duration::from_millis(3));

        assert_eq!(metrics.provisions.with_label_values(&["created"]).get(), 1);
        assert_eq!(metrics.provisions.with_label_values(&["existing"]).get(), 1);
        assert_eq!(
            metrics.failures.with_label_values(&["ensure_bucket"]).get(),
            1
        );
        assert_eq!(metrics.duration.get_sample_count(), 3);
        assert!(!registry.gather().is_empty());
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        let metrics = ProvisionMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
