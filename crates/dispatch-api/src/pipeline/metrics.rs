use std::time::Duration;

use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};
use tonic::Code;

/// Request metrics for the RPC surface. The registry is populated once
/// at construction and only emitted to afterwards; emission is
/// concurrency-safe.
pub struct ApiMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    in_flight: IntGaugeVec,
    request_duration_seconds: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new(
                "dispatch_requests_total",
                "Completed requests by method and terminal status code",
            ),
            &["method", "code"],
        )?;
        let in_flight = IntGaugeVec::new(
            Opts::new(
                "dispatch_requests_in_flight",
                "Requests currently being served, by method",
            ),
            &["method"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "dispatch_request_duration_seconds",
                "Request latency by method",
            )
            .buckets(exponential_buckets(0.001, 2.0, 14)?),
            &["method"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        Ok(ApiMetrics {
            registry,
            requests_total,
            in_flight,
            request_duration_seconds,
        })
    }

    /// Bump the in-flight gauge; the guard's drop decrements it exactly
    /// once whatever the exit path.
    pub fn track_in_flight(&self, method: &str) -> InFlightGuard {
        let gauge = self.in_flight.with_label_values(&[method]);
        gauge.inc();
        InFlightGuard { gauge }
    }

    pub fn observe(&self, method: &str, code: Code, elapsed: Duration) {
        self.request_duration_seconds
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
        self.requests_total
            .with_label_values(&[method, code_label(code)])
            .inc();
    }

    /// Prometheus text exposition of everything in the registry.
    pub fn encode_text(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::error!(error = %e, "failed to encode prometheus metrics");
        }
        buf
    }

    pub fn in_flight_value(&self, method: &str) -> i64 {
        self.in_flight.with_label_values(&[method]).get()
    }

    pub fn requests_value(&self, method: &str, code: Code) -> u64 {
        self.requests_total
            .with_label_values(&[method, code_label(code)])
            .get()
    }
}

pub struct InFlightGuard {
    gauge: IntGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

pub fn code_label(code: Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "cancelled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid_argument",
        Code::DeadlineExceeded => "deadline_exceeded",
        Code::NotFound => "not_found",
        Code::AlreadyExists => "already_exists",
        Code::PermissionDenied => "permission_denied",
        Code::ResourceExhausted => "resource_exhausted",
        Code::FailedPrecondition => "failed_precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out_of_range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data_loss",
        Code::Unauthenticated => "unauthenticated",
    }
}
