//! Shannon Telemetry - logging/tracing bootstrap and the Prometheus metric
//! contract named in spec.md §6. The ambient-stack expansion in
//! SPEC_FULL.md calls for structured logging and metrics even though
//! observability backends themselves are out of scope (spec.md §1).

pub mod metrics_contract;

use tracing_subscriber::EnvFilter;

/// Initialize a process-wide `tracing` subscriber reading `RUST_LOG`
/// (default `info`), with optional JSON-formatted output.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Install the process-wide Prometheus recorder and return a handle whose
/// `render()` produces the text-exposition payload. Idempotent: a second
/// call returns an error that callers should ignore (mirrors
/// `metrics-exporter-prometheus`'s own `install` semantics).
pub fn install_prometheus_recorder()
-> anyhow::Result<metrics_exporter_prometheus::PrometheusHandle> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    Ok(handle)
}
