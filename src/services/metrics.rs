//! Metrics service for generation runs

use crate::services::streaming::RunReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub struct MetricsService {
    words_generated: AtomicUsize,
    runs_completed: AtomicUsize,
    runs_failed: AtomicUsize,
    runs_superseded: AtomicUsize,
    total_latency_ms: AtomicU64,
    total_first_output_ms: AtomicU64,
    runs_with_output: AtomicUsize,
    start_time: Instant,
}

impl MetricsService {
    pub fn new() -> Self {
        Self {
            words_generated: AtomicUsize::new(0),
            runs_completed: AtomicUsize::new(0),
            runs_failed: AtomicUsize::new(0),
            runs_superseded: AtomicUsize::new(0),
            total_latency_ms: AtomicU64::new(0),
            total_first_output_ms: AtomicU64::new(0),
            runs_with_output: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_run(&self, report: &RunReport) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.words_generated.fetch_add(report.word_count, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(report.elapsed.as_millis() as u64, Ordering::Relaxed);
        if let Some(first) = report.time_to_first_output {
            self.runs_with_output.fetch_add(1, Ordering::Relaxed);
            self.total_first_output_ms
                .fetch_add(first.as_millis() as u64, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.runs_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> MetricsStats {
        let completed = self.runs_completed.load(Ordering::Relaxed);
        let with_output = self.runs_with_output.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let total_first = self.total_first_output_ms.load(Ordering::Relaxed);

        MetricsStats {
            words_generated: self.words_generated.load(Ordering::Relaxed),
            runs_completed: completed,
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            runs_superseded: self.runs_superseded.load(Ordering::Relaxed),
            avg_latency_ms: if completed > 0 { total_latency / completed as u64 } else { 0 },
            avg_first_output_ms: if with_output > 0 { total_first / with_output as u64 } else { 0 },
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsStats {
    pub words_generated: usize,
    pub runs_completed: usize,
    pub runs_failed: usize,
    pub runs_superseded: usize,
    pub avg_latency_ms: u64,
    pub avg_first_output_ms: u64,
    pub uptime_seconds: u64,
}
