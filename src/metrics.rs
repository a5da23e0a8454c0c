//! Prometheus metrics collection for finrec
//!
//! Tracks which backend served each query, how often a pipeline stage had to
//! move past its first route, backend failures, and generation latency.
//!
//! A [`Metrics`] value owns its own registry and is passed explicitly to the
//! orchestration manager. Recording never fails a query: callers log errors
//! from the `record_*` methods and carry on.

use crate::providers::ProviderKind;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Pipeline stage label
///
/// Restricts the `stage` label to two values at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intent,
    Compose,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intent => "intent",
            Stage::Compose => "compose",
        }
    }
}

/// Who produced the final answer of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Provider(ProviderKind),
    /// The manager's canned error response
    Canned,
}

impl ServedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedBy::Provider(kind) => kind.as_str(),
            ServedBy::Canned => "canned",
        }
    }
}

/// Metrics collector for finrec
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    queries_total: IntCounterVec,
    stage_fallbacks: IntCounterVec,
    backend_failures: IntCounterVec,
    generation_latency: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 2 providers + canned = 3 time series
        let queries_total = IntCounterVec::new(
            Opts::new(
                "finrec_queries_total",
                "Total number of processed queries by the backend that served the answer",
            ),
            &["served_by"],
        )?;

        // Counted each time a stage moves past its first route
        let stage_fallbacks = IntCounterVec::new(
            Opts::new(
                "finrec_stage_fallbacks_total",
                "Total number of fallback transitions by pipeline stage",
            ),
            &["stage"],
        )?;

        // Cardinality: 2 providers x 2 stages = 4 time series
        let backend_failures = IntCounterVec::new(
            Opts::new(
                "finrec_backend_failures_total",
                "Total number of backend calls that failed after retries, by provider and stage",
            ),
            &["provider", "stage"],
        )?;

        let generation_latency = HistogramVec::new(
            HistogramOpts::new(
                "finrec_generation_latency_ms",
                "Generation latency in milliseconds across all attempts of one call",
            )
            .buckets(vec![
                100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 30000.0, 60000.0,
            ]),
            &["provider"],
        )?;

        registry.register(Box::new(queries_total.clone()))?;
        registry.register(Box::new(stage_fallbacks.clone()))?;
        registry.register(Box::new(backend_failures.clone()))?;
        registry.register(Box::new(generation_latency.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            queries_total,
            stage_fallbacks,
            backend_failures,
            generation_latency,
        })
    }

    /// Record a completed query
    pub fn record_query(&self, served_by: ServedBy) -> Result<(), prometheus::Error> {
        self.queries_total
            .get_metric_with_label_values(&[served_by.as_str()])?
            .inc();
        Ok(())
    }

    /// Record a stage moving on to its next route
    pub fn record_stage_fallback(&self, stage: Stage) -> Result<(), prometheus::Error> {
        self.stage_fallbacks
            .get_metric_with_label_values(&[stage.as_str()])?
            .inc();
        Ok(())
    }

    /// Record a backend failing a stage
    pub fn record_backend_failure(
        &self,
        provider: ProviderKind,
        stage: Stage,
    ) -> Result<(), prometheus::Error> {
        self.backend_failures
            .get_metric_with_label_values(&[provider.as_str(), stage.as_str()])?
            .inc();
        Ok(())
    }

    /// Record generation latency
    ///
    /// # Errors
    ///
    /// Returns an error if `latency_ms` is NaN, infinite or negative. Such
    /// values would corrupt every percentile of the histogram.
    pub fn record_generation_latency(
        &self,
        provider: ProviderKind,
        latency_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                latency_ms
            )));
        }

        self.generation_latency
            .get_metric_with_label_values(&[provider.as_str()])?
            .observe(latency_ms);
        Ok(())
    }

    /// Render all metrics in Prometheus text format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_count,
                    "Prometheus text encoder failed"
                );
                prometheus::Error::Msg(format!(
                    "Failed to encode {} metric families: {}",
                    metric_count, e
                ))
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }

    /// Current value of `finrec_queries_total` for one label
    pub fn queries_count(&self, served_by: ServedBy) -> u64 {
        self.queries_total
            .get_metric_with_label_values(&[served_by.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of `finrec_stage_fallbacks_total` for one stage
    pub fn stage_fallback_count(&self, stage: Stage) -> u64 {
        self.stage_fallbacks
            .get_metric_with_label_values(&[stage.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of `finrec_backend_failures_total` for one label pair
    pub fn backend_failure_count(&self, provider: ProviderKind, stage: Stage) -> u64 {
        self.backend_failures
            .get_metric_with_label_values(&[provider.as_str(), stage.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_creates_registry() {
        let metrics = Metrics::new().expect("Failed to create metrics");

        metrics
            .record_query(ServedBy::Provider(ProviderKind::Anthropic))
            .expect("Test operation should succeed");
        metrics
            .record_stage_fallback(Stage::Intent)
            .expect("Test operation should succeed");
        metrics
            .record_backend_failure(ProviderKind::OpenAi, Stage::Compose)
            .expect("Test operation should succeed");
        metrics
            .record_generation_latency(ProviderKind::Anthropic, 850.0)
            .expect("Test operation should succeed");

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names.len(), 4, "Expected 4 metric families");
        assert!(names.contains(&"finrec_queries_total".to_string()));
        assert!(names.contains(&"finrec_stage_fallbacks_total".to_string()));
        assert!(names.contains(&"finrec_backend_failures_total".to_string()));
        assert!(names.contains(&"finrec_generation_latency_ms".to_string()));
    }

    #[test]
    fn test_record_query_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.record_query(ServedBy::Canned).unwrap();
        metrics.record_query(ServedBy::Canned).unwrap();
        metrics
            .record_query(ServedBy::Provider(ProviderKind::OpenAi))
            .unwrap();

        assert_eq!(metrics.queries_count(ServedBy::Canned), 2);
        assert_eq!(
            metrics.queries_count(ServedBy::Provider(ProviderKind::OpenAi)),
            1
        );

        let output = metrics.gather_text().expect("Failed to gather test metrics");
        assert!(output.contains("served_by=\"canned\""));
        assert!(output.contains("served_by=\"openai\""));
    }

    #[test]
    fn test_backend_failures_by_provider_and_stage() {
        let metrics = Metrics::new().unwrap();
        metrics
            .record_backend_failure(ProviderKind::Anthropic, Stage::Intent)
            .unwrap();

        assert_eq!(
            metrics.backend_failure_count(ProviderKind::Anthropic, Stage::Intent),
            1
        );
        assert_eq!(
            metrics.backend_failure_count(ProviderKind::Anthropic, Stage::Compose),
            0
        );
    }

    #[test]
    fn test_latency_rejects_non_finite_and_negative() {
        let metrics = Metrics::new().unwrap();
        assert!(
            metrics
                .record_generation_latency(ProviderKind::OpenAi, f64::NAN)
                .is_err()
        );
        assert!(
            metrics
                .record_generation_latency(ProviderKind::OpenAi, f64::INFINITY)
                .is_err()
        );
        assert!(
            metrics
                .record_generation_latency(ProviderKind::OpenAi, -1.0)
                .is_err()
        );
        assert!(
            metrics
                .record_generation_latency(ProviderKind::OpenAi, 0.0)
                .is_ok()
        );
    }

    #[test]
    fn test_metrics_is_clonable_and_shares_registry() {
        let metrics = Metrics::new().unwrap();
        let clone = metrics.clone();
        clone.record_stage_fallback(Stage::Compose).unwrap();
        assert_eq!(metrics.stage_fallback_count(Stage::Compose), 1);
    }

    #[test]
    fn test_concurrent_metric_recording() {
        use std::thread;

        let metrics = Arc::new(Metrics::new().unwrap());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    m.record_query(ServedBy::Canned).unwrap();
                    m.record_generation_latency(ProviderKind::Anthropic, i as f64)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread should not panic");
        }

        assert_eq!(metrics.queries_count(ServedBy::Canned), 10);
    }
}
