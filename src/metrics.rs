/// Prometheus counters for issuance, revocation, verification and did:web
/// resolution, rendered at `/metrics`

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // ========== Issuer Metrics ==========

    /// Credentials signed and stored
    pub static ref CREDENTIALS_ISSUED_TOTAL: IntCounter = register_int_counter!(
        "vc_credentials_issued_total",
        "Total number of credentials issued"
    )
    .unwrap();

    /// Credentials moved to the revoked status
    pub static ref CREDENTIALS_REVOKED_TOTAL: IntCounter = register_int_counter!(
        "vc_credentials_revoked_total",
        "Total number of credentials revoked"
    )
    .unwrap();

    // ========== Verifier Metrics ==========

    /// Trust checks by verdict and rejection reason
    pub static ref VERIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vc_verifications_total",
        "Total number of credential trust checks",
        &["result", "reason"]
    )
    .unwrap();

    /// did:web key resolutions by outcome
    pub static ref DID_WEB_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vc_did_web_resolutions_total",
        "Total number of did:web key resolutions",
        &["outcome"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_issued() {
    CREDENTIALS_ISSUED_TOTAL.inc();
}

pub fn record_revoked() {
    CREDENTIALS_REVOKED_TOTAL.inc();
}

/// Record a trust verdict; `reason` is empty for admitted tokens
pub fn record_verification(valid: bool, reason: &str) {
    VERIFICATIONS_TOTAL
        .with_label_values(&[if valid { "valid" } else { "invalid" }, reason])
        .inc();
}

/// Record a did:web resolution (`cache_hit`, `resolved` or `unresolved`)
pub fn record_did_web_resolution(outcome: &str) {
    DID_WEB_RESOLUTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_verification() {
        record_verification(false, "expired");
        record_verification(true, "");

        let metrics = render_metrics();
        assert!(metrics.contains("vc_verifications_total"));
        assert!(metrics.contains("reason=\"expired\""));
    }

    #[test]
    fn test_issue_and_revoke_counters() {
        let issued = CREDENTIALS_ISSUED_TOTAL.get();
        record_issued();
        record_revoked();

        assert!(CREDENTIALS_ISSUED_TOTAL.get() > issued);
        let metrics = render_metrics();
        assert!(metrics.contains("vc_credentials_issued_total"));
        assert!(metrics.contains("vc_credentials_revoked_total"));
    }

    #[test]
    fn test_did_web_resolution_counter() {
        record_did_web_resolution("cache_hit");
        assert!(render_metrics().contains("vc_did_web_resolutions_total"));
    }
}
