//! Prometheus metrics for analysis-service.
//!
//! HTTP request metrics come from `service_core::middleware::metrics` through the
//! `metrics` recorder; analysis-specific collectors live in a `prometheus` registry.
//! Both are rendered by [`get_metrics`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static ANALYSIS_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static ANALYSIS_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static ANALYSIS_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Must be called once at startup.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    if METRICS_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics recorder already initialized");
    }

    let registry = Registry::new();

    // outcome: success, invalid_input, or a ProviderError kind
    let requests_total = IntCounterVec::new(
        Opts::new("analysis_requests_total", "Total analysis requests by outcome"),
        &["outcome"],
    )?;

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "analysis_provider_latency_seconds",
            "Completion API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0]),
        &["model"],
    )?;

    let tokens_total = IntCounterVec::new(
        Opts::new("analysis_tokens_total", "Tokens reported by the completion API"),
        &["model", "type"], // type: input, output
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(provider_latency.clone()))?;
    registry.register(Box::new(tokens_total.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = ANALYSIS_REQUESTS_TOTAL.set(requests_total);
    let _ = ANALYSIS_PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = ANALYSIS_TOKENS_TOTAL.set(tokens_total);

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
            output.push_str(&format!("# Failed to encode metrics: {}\n", e));
        } else if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_analysis(outcome: &str) {
    if let Some(counter) = ANALYSIS_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_provider_latency(model: &str, duration_secs: f64) {
    if let Some(histogram) = ANALYSIS_PROVIDER_LATENCY_SECONDS.get() {
        histogram.with_label_values(&[model]).observe(duration_secs);
    }
}

pub fn record_tokens(model: &str, input_tokens: Option<u32>, output_tokens: Option<u32>) {
    if let Some(counter) = ANALYSIS_TOKENS_TOTAL.get() {
        if let Some(input) = input_tokens {
            counter
                .with_label_values(&[model, "input"])
                .inc_by(u64::from(input));
        }
        if let Some(output) = output_tokens {
            counter
                .with_label_values(&[model, "output"])
                .inc_by(u64::from(output));
        }
    }
}
