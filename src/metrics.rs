//! Prometheus metrics collection for formsd.
//!
//! Tracks token issuance and validation outcomes and access-resolution
//! decisions, exposed on the `/metrics` endpoint for scraping.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Capability tokens generated.
pub static CAPABILITY_TOKENS_ISSUED: OnceLock<IntCounter> = OnceLock::new();

/// Capability-token validations by result (ok, invalid, expired).
pub static CAPABILITY_VALIDATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Continuation tokens issued.
pub static CONTINUATION_TOKENS_ISSUED: OnceLock<IntCounter> = OnceLock::new();

/// Continuation-token resolutions by result.
pub static CONTINUATION_RESOLUTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Access decisions by outcome (resolved, form_not_found).
pub static ACCESS_DECISIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize and register all metrics. Idempotent.
pub fn init_metrics() {
    let registry = registry();

    let issued = CAPABILITY_TOKENS_ISSUED.get_or_init(|| {
        IntCounter::with_opts(Opts::new(
            "formsd_capability_tokens_issued_total",
            "Capability tokens generated",
        ))
        .expect("metric opts are valid")
    });
    let _ = registry.register(Box::new(issued.clone()));

    let validations = CAPABILITY_VALIDATIONS.get_or_init(|| {
        IntCounterVec::new(
            Opts::new(
                "formsd_capability_validations_total",
                "Capability-token validations by result",
            ),
            &["result"],
        )
        .expect("metric opts are valid")
    });
    let _ = registry.register(Box::new(validations.clone()));

    let cont_issued = CONTINUATION_TOKENS_ISSUED.get_or_init(|| {
        IntCounter::with_opts(Opts::new(
            "formsd_continuation_tokens_issued_total",
            "Continuation tokens issued",
        ))
        .expect("metric opts are valid")
    });
    let _ = registry.register(Box::new(cont_issued.clone()));

    let resolutions = CONTINUATION_RESOLUTIONS.get_or_init(|| {
        IntCounterVec::new(
            Opts::new(
                "formsd_continuation_resolutions_total",
                "Continuation-token resolutions by result",
            ),
            &["result"],
        )
        .expect("metric opts are valid")
    });
    let _ = registry.register(Box::new(resolutions.clone()));

    let decisions = ACCESS_DECISIONS.get_or_init(|| {
        IntCounterVec::new(
            Opts::new(
                "formsd_access_decisions_total",
                "Access decisions by outcome",
            ),
            &["outcome"],
        )
        .expect("metric opts are valid")
    });
    let _ = registry.register(Box::new(decisions.clone()));
}

pub fn record_capability_issued() {
    if let Some(counter) = CAPABILITY_TOKENS_ISSUED.get() {
        counter.inc();
    }
}

pub fn record_capability_validation(result: &str) {
    if let Some(counter) = CAPABILITY_VALIDATIONS.get() {
        counter.with_label_values(&[result]).inc();
    }
}

pub fn record_continuation_issued() {
    if let Some(counter) = CONTINUATION_TOKENS_ISSUED.get() {
        counter.inc();
    }
}

pub fn record_continuation_resolution(result: &str) {
    if let Some(counter) = CONTINUATION_RESOLUTIONS.get() {
        counter.with_label_values(&[result]).inc();
    }
}

pub fn record_access_decision(outcome: &str) {
    if let Some(counter) = ACCESS_DECISIONS.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Gather all metrics in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_and_gather() {
        init_metrics();
        // Second init must not panic or double-register
        init_metrics();

        record_capability_issued();
        record_capability_validation("ok");
        record_continuation_resolution("invalid_or_expired");
        record_access_decision("resolved");

        let text = gather_metrics();
        assert!(text.contains("formsd_capability_tokens_issued_total"));
        assert!(text.contains("formsd_capability_validations_total"));
    }
}
