use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

const METER_NAME: &str = "gateway";

/// Request-level instruments for the detection pipeline.
///
/// Without an OTLP endpoint the global meter provider is a no-op, so these
/// are always safe to record into.
#[derive(Clone)]
pub struct PipelineMetrics {
    requests: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
    duration: Histogram<f64>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            requests: meter
                .u64_counter("detect_requests_total")
                .with_description("Total detection requests received")
                .build(),
            failures: meter
                .u64_counter("detect_failures_total")
                .with_description("Detection requests that ended in an error, by kind")
                .build(),
            detections: meter
                .u64_counter("detect_detections_total")
                .with_description("Total detections returned to clients")
                .build(),
            duration: meter
                .f64_histogram("detect_duration_seconds")
                .with_description("Time to decode, infer and format one upload")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
        }
    }

    pub fn record_request(&self) {
        self.requests.add(1, &[]);
    }

    pub fn record_success(&self, detections: usize, elapsed: Duration) {
        self.detections.add(detections as u64, &[]);
        self.duration.record(elapsed.as_secs_f64(), &[]);
    }

    pub fn record_failure(&self, kind: &'static str) {
        self.failures.add(1, &[KeyValue::new("kind", kind)]);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
