//! Performance counters and statistics for the scoring and aggregation paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by both processing paths.
pub struct PipelineMetrics {
    /// Transactions successfully scored
    pub events_scored: AtomicU64,
    /// Transactions dropped before a result was produced
    pub events_dropped: AtomicU64,
    /// Short-window records written by the aggregation path
    pub aggregates_written: AtomicU64,
    /// Events scored against a stale (zero-filled) short window
    stale_windows: AtomicU64,
    /// Drop counts keyed by reason (decode, store, scoring)
    drops_by_reason: RwLock<HashMap<String, u64>>,
    /// Per-event processing times (microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Prediction distribution buckets
    prediction_buckets: RwLock<[u64; 10]>,
    /// Start time for throughput calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            events_scored: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            aggregates_written: AtomicU64::new(0),
            stale_windows: AtomicU64::new(0),
            drops_by_reason: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            prediction_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one scored event.
    pub fn record_scored(&self, processing_time: Duration, prediction: f64) {
        self.events_scored.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the recent window for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (prediction * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.prediction_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record one dropped event with the stage that dropped it.
    pub fn record_dropped(&self, reason: &str) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_reason) = self.drops_by_reason.write() {
            *by_reason.entry(reason.to_string()).or_insert(0) += 1;
        }
    }

    /// Record an event whose short window was stale.
    pub fn record_stale_window(&self) {
        self.stale_windows.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one short-window aggregate write.
    pub fn record_aggregate_write(&self) {
        self.aggregates_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics.
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self.processing_times.read().unwrap();
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (events per second).
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.events_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get drop counts by reason.
    pub fn get_drops_by_reason(&self) -> HashMap<String, u64> {
        self.drops_by_reason.read().unwrap().clone()
    }

    /// Get the prediction distribution.
    pub fn get_prediction_distribution(&self) -> [u64; 10] {
        *self.prediction_buckets.read().unwrap()
    }

    /// Get the count of events scored against a stale window.
    pub fn get_stale_windows(&self) -> u64 {
        self.stale_windows.load(Ordering::Relaxed)
    }

    /// Print summary statistics.
    pub fn print_summary(&self) {
        let scored = self.events_scored.load(Ordering::Relaxed);
        let dropped = self.events_dropped.load(Ordering::Relaxed);
        let written = self.aggregates_written.load(Ordering::Relaxed);
        let stale = self.get_stale_windows();
        let stale_rate = if scored > 0 {
            (stale as f64 / scored as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let drops = self.get_drops_by_reason();
        let distribution = self.get_prediction_distribution();

        info!("=== fraud scoring pipeline: metrics summary ===");
        info!(
            scored = scored,
            dropped = dropped,
            aggregates_written = written,
            throughput = format!("{:.1} events/s", throughput),
            "Volume"
        );
        info!(
            stale_windows = stale,
            stale_rate = format!("{:.1}%", stale_rate),
            "Short-window freshness"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );
        for (reason, count) in &drops {
            info!(reason = %reason, count = count, "Drops");
        }
        let total: u64 = distribution.iter().sum();
        if total > 0 {
            for (i, &count) in distribution.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let pct = (count as f64 / total as f64) * 100.0;
                info!(
                    bucket = format!("{:.1}-{:.1}", i as f64 / 10.0, (i + 1) as f64 / 10.0),
                    count = count,
                    pct = format!("{pct:.1}%"),
                    "Prediction distribution"
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic reporter that prints the metrics summary on an interval.
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task.
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_scored(Duration::from_micros(100), 0.5);
        metrics.record_scored(Duration::from_micros(200), 0.95);
        metrics.record_dropped("decode");
        metrics.record_dropped("decode");
        metrics.record_dropped("store");
        metrics.record_aggregate_write();

        assert_eq!(metrics.events_scored.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.events_dropped.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.aggregates_written.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_drops_by_reason()["decode"], 2);

        let distribution = metrics.get_prediction_distribution();
        assert_eq!(distribution[5], 1);
        assert_eq!(distribution[9], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        for us in [100u64, 200, 300, 400] {
            metrics.record_scored(Duration::from_micros(us), 0.1);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }

    #[test]
    fn test_stale_window_counter() {
        let metrics = PipelineMetrics::new();
        metrics.record_stale_window();
        metrics.record_stale_window();
        assert_eq!(metrics.get_stale_windows(), 2);
    }
}
