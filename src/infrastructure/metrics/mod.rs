//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Forum activity counters (threads, posts, notifications)
//! - Active realtime connection gauge
//! - Database pool gauges

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

const NAMESPACE: &str = "riverforo";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

pub static FORUM_THREADS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("forum_threads_created_total", "Threads created").namespace(NAMESPACE),
    )
    .expect("Failed to create FORUM_THREADS_CREATED metric")
});

pub static FORUM_POSTS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("forum_posts_created_total", "Posts created, opening posts included")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create FORUM_POSTS_CREATED metric")
});

pub static FORUM_NOTIFICATIONS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("forum_notifications_created_total", "Notifications created")
            .namespace(NAMESPACE),
        &["type"],
    )
    .expect("Failed to create FORUM_NOTIFICATIONS_CREATED metric")
});

/// Open realtime WebSocket connections
pub static REALTIME_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "realtime_connections_active",
            "Number of open realtime connections",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create REALTIME_CONNECTIONS_ACTIVE metric")
});

/// Database connection pool stats
pub static DB_POOL_CONNECTIONS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("db_pool_connections", "Database connection pool statistics")
            .namespace(NAMESPACE),
        &["state"], // "idle", "size"
    )
    .expect("Failed to create DB_POOL_CONNECTIONS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(FORUM_THREADS_CREATED.clone()))
        .expect("Failed to register FORUM_THREADS_CREATED");
    registry
        .register(Box::new(FORUM_POSTS_CREATED.clone()))
        .expect("Failed to register FORUM_POSTS_CREATED");
    registry
        .register(Box::new(FORUM_NOTIFICATIONS_CREATED.clone()))
        .expect("Failed to register FORUM_NOTIFICATIONS_CREATED");
    registry
        .register(Box::new(REALTIME_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register REALTIME_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(DB_POOL_CONNECTIONS.clone()))
        .expect("Failed to register DB_POOL_CONNECTIONS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// A thread and its opening post were created.
pub fn record_thread_created() {
    FORUM_THREADS_CREATED.inc();
    FORUM_POSTS_CREATED.inc();
}

pub fn record_post_created() {
    FORUM_POSTS_CREATED.inc();
}

pub fn record_notification_created(kind: &str) {
    FORUM_NOTIFICATIONS_CREATED.with_label_values(&[kind]).inc();
}

/// Helper to update database pool stats
pub fn update_db_pool_stats(idle: usize, size: u32) {
    DB_POOL_CONNECTIONS
        .with_label_values(&["idle"])
        .set(idle as f64);
    DB_POOL_CONNECTIONS
        .with_label_values(&["size"])
        .set(f64::from(size));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Force lazy initialization
        let _ = &*REGISTRY;
        let _ = &*HTTP_REQUESTS_TOTAL;
        let _ = &*REALTIME_CONNECTIONS_ACTIVE;
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("riverforo_http_requests_total"));
    }

    #[test]
    fn test_forum_counters() {
        let before = FORUM_POSTS_CREATED.get();
        record_thread_created();
        record_post_created();
        assert!(FORUM_POSTS_CREATED.get() >= before + 2);

        record_notification_created("mention");
        assert!(gather_metrics().contains("riverforo_forum_notifications_created_total"));
    }

    #[test]
    fn test_exported_names_are_namespaced() {
        record_http_request("GET", "/api/threads", 200, 0.002);
        record_thread_created();
        REALTIME_CONNECTIONS_ACTIVE.set(0);

        let metrics = gather_metrics();
        for name in [
            "riverforo_http_requests_total",
            "riverforo_http_request_duration_seconds_bucket",
            "riverforo_forum_threads_created_total",
            "riverforo_forum_posts_created_total",
            "riverforo_realtime_connections_active",
        ] {
            assert!(metrics.contains(name), "{}", name);
        }
        assert!(!metrics.contains("\nhttp_requests_total"));
    }
}
