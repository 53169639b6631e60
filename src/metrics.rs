// src/metrics.rs
//
// Counters and last-run timings for the comparison pipeline. Shared by
// clone; logged as a summary by the CLI.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ComparisonMetrics {
    pub comparisons_started: Arc<AtomicU64>,
    pub comparisons_succeeded: Arc<AtomicU64>,
    pub media_failures: Arc<AtomicU64>,
    pub service_failures: Arc<AtomicU64>,
    pub frames_extracted: Arc<AtomicU64>,
    pub extraction_time_us: Arc<AtomicU64>,
    pub analysis_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for ComparisonMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonMetrics {
    pub fn new() -> Self {
        Self {
            comparisons_started: Arc::new(AtomicU64::new(0)),
            comparisons_succeeded: Arc::new(AtomicU64::new(0)),
            media_failures: Arc::new(AtomicU64::new(0)),
            service_failures: Arc::new(AtomicU64::new(0)),
            frames_extracted: Arc::new(AtomicU64::new(0)),
            extraction_time_us: Arc::new(AtomicU64::new(0)),
            analysis_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, elapsed: Duration) {
        counter.store(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            comparisons_started: self.comparisons_started.load(Ordering::Relaxed),
            comparisons_succeeded: self.comparisons_succeeded.load(Ordering::Relaxed),
            media_failures: self.media_failures.load(Ordering::Relaxed),
            service_failures: self.service_failures.load(Ordering::Relaxed),
            frames_extracted: self.frames_extracted.load(Ordering::Relaxed),
            last_extraction_us: self.extraction_time_us.load(Ordering::Relaxed),
            last_analysis_us: self.analysis_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub comparisons_started: u64,
    pub comparisons_succeeded: u64,
    pub media_failures: u64,
    pub service_failures: u64,
    pub frames_extracted: u64,
    pub last_extraction_us: u64,
    pub last_analysis_us: u64,
    pub elapsed_secs: f64,
}
