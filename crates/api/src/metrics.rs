use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::demos::Demo;

#[derive(Default)]
struct DemoCounters {
    actions: AtomicUsize,
    failures: AtomicUsize,
    total_time_us: AtomicU64,
}

/// Request counters and per-dashboard timings.
pub struct Metrics {
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Indexed by Demo::index()
    demos: [DemoCounters; Demo::ALL.len()],
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            demos: Default::default(),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// One dashboard action (run, ask, screen) and how long it took
    pub fn record_action(&self, demo: Demo, duration: Duration, success: bool) {
        let counters = &self.demos[demo.index()];
        counters.actions.fetch_add(1, Ordering::Relaxed);
        counters
            .total_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if !success {
            counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.record_request(success);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            demos: Demo::ALL
                .iter()
                .map(|demo| {
                    let counters = &self.demos[demo.index()];
                    DemoSnapshot {
                        slug: demo.slug(),
                        actions: counters.actions.load(Ordering::Relaxed),
                        failures: counters.failures.load(Ordering::Relaxed),
                        avg_time_ms: avg_time_ms(&counters.total_time_us, &counters.actions),
                    }
                })
                .collect(),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub demos: Vec<DemoSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct DemoSnapshot {
    pub slug: &'static str,
    pub actions: usize,
    pub failures: usize,
    pub avg_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_demo_averages() {
        let metrics = Metrics::new();
        metrics.record_action(Demo::Healthcare, Duration::from_millis(10), true);
        metrics.record_action(Demo::Healthcare, Duration::from_millis(30), false);
        metrics.record_request(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.failed_requests, 1);

        let healthcare = snapshot.demos.iter().find(|d| d.slug == "healthcare").unwrap();
        assert_eq!(healthcare.actions, 2);
        assert_eq!(healthcare.failures, 1);
        assert!((healthcare.avg_time_ms - 20.0).abs() < 1e-6);

        let underwriting = snapshot.demos.iter().find(|d| d.slug == "underwriting").unwrap();
        assert_eq!(underwriting.avg_time_ms, 0.0);
    }
}
