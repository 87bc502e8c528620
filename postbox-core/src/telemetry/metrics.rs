//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    // Upper buckets cover slow SMTP relays
    let buckets = vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit zero values so HELP/TYPE lines
/// show up before the first dispatch.
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!("postbox_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "postbox_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "postbox_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Dispatch metrics
    describe_counter!(
        "postbox_emails_sent_total",
        "Messages accepted by the SMTP server, by credential mode (live/test)"
    );
    describe_counter!(
        "postbox_emails_failed_total",
        "Dispatches answered with statusCode 400, by failure reason"
    );
    describe_counter!(
        "postbox_audit_uploads_total",
        "Audit archive uploads by result (uploaded/failed/skipped)"
    );

    counter!("postbox_emails_sent_total", "mode" => "live").absolute(0);
    counter!("postbox_emails_sent_total", "mode" => "test").absolute(0);
    counter!("postbox_emails_failed_total", "reason" => "transport").absolute(0);
    counter!("postbox_audit_uploads_total", "result" => "uploaded").absolute(0);
    gauge!("postbox_http_requests_in_flight").set(0.0);
}
