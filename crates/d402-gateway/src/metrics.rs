use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Admission outcomes
pub static ADMISSIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("d402_admissions_total", "Admitted tool calls by admission mode"),
        &["mode"],
    )
    .unwrap()
});

pub static DENIALS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("d402_denials_total", "Tool calls answered with 402, by reason"),
        &["reason"],
    )
    .unwrap()
});

/// Verifier-level cause behind invalid/expired proof denials
/// (`facilitator_unavailable` is the one to alert on).
pub static VERIFICATION_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "d402_verification_failures_total",
            "Refused payment proofs by verifier cause",
        ),
        &["cause"],
    )
    .unwrap()
});

pub static ADMISSION_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "d402_admission_latency_seconds",
            "Time spent deciding admission, facilitator round trip included",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

// Proxy metrics
pub static PROXY_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("d402_proxy_requests_total", "Upstream calls by tool and status"),
        &["tool", "status"],
    )
    .unwrap()
});

pub static PROXY_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("d402_proxy_latency_seconds", "Upstream request latency")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

/// Register all metrics with the registry
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(ADMISSIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DENIALS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VERIFICATION_FAILURES.clone()))?;
    REGISTRY.register(Box::new(ADMISSION_LATENCY.clone()))?;
    REGISTRY.register(Box::new(PROXY_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROXY_LATENCY.clone()))?;
    Ok(())
}
