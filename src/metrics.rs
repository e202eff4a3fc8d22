//! Prediction counters and latency statistics.

use crate::types::prediction::Prediction;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Processing-time samples kept before the oldest half is discarded
const MAX_TIME_SAMPLES: usize = 10_000;

/// Metrics collector for served predictions
pub struct PredictionMetrics {
    /// Predictions returned to callers
    pub predictions_served: AtomicU64,
    /// Of those, predictions labelled subscribe
    pub subscribe_predictions: AtomicU64,
    /// Records refused by the encoder's unknown-category policy
    pub rejected_records: AtomicU64,
    /// Shape mismatches and classifier failures
    pub internal_errors: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Subscribe-probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            subscribe_predictions: AtomicU64::new(0),
            rejected_records: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, processing_time: Duration, prediction: &Prediction) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if prediction.label.is_subscribe() {
            self.subscribe_predictions.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_TIME_SAMPLES {
                times.drain(0..MAX_TIME_SAMPLES / 2);
            }
        }

        let bucket = (prediction.probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_rejection(&self) {
        self.rejected_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Point-in-time copy of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            subscribe_predictions: self.subscribe_predictions.load(Ordering::Relaxed),
            rejected_records: self.rejected_records.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            throughput_per_sec: self.get_throughput(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            processing: self.get_processing_stats(),
            probability_distribution: self.get_probability_distribution(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let subscribe_rate = if snapshot.predictions_served > 0 {
            (snapshot.subscribe_predictions as f64 / snapshot.predictions_served as f64) * 100.0
        } else {
            0.0
        };
        let processing = &snapshot.processing;

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║        SUBSCRIPTION PREDICTOR - METRICS SUMMARY              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions Served:     {:>8}  │  Throughput: {:>6.2} req/s ║",
            snapshot.predictions_served, snapshot.throughput_per_sec
        );
        info!(
            "║ Subscribe Predictions:  {:>8}  │  Rate: {:>6.1}%           ║",
            snapshot.subscribe_predictions, subscribe_rate
        );
        info!(
            "║ Rejected Records:       {:>8}  │  Internal Errors: {:>6}  ║",
            snapshot.rejected_records, snapshot.internal_errors
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Subscribe Probability Distribution:                          ║");
        let total: u64 = snapshot.probability_distribution.iter().sum();
        for (i, &count) in snapshot.probability_distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "█".repeat(bar_len.min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view served at `/metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub predictions_served: u64,
    pub subscribe_predictions: u64,
    pub rejected_records: u64,
    pub internal_errors: u64,
    pub throughput_per_sec: f64,
    pub uptime_secs: u64,
    pub processing: ProcessingStats,
    pub probability_distribution: [u64; 10],
}

/// Periodic summary printer
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::Label;

    fn prediction(probability: f64) -> Prediction {
        let label = if probability > 0.5 {
            Label::Subscribe
        } else {
            Label::NotSubscribe
        };
        Prediction { label, probability }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PredictionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &prediction(0.2));
        metrics.record_prediction(Duration::from_micros(300), &prediction(0.8));
        metrics.record_rejection();
        metrics.record_internal_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions_served, 2);
        assert_eq!(snapshot.subscribe_predictions, 1);
        assert_eq!(snapshot.rejected_records, 1);
        assert_eq!(snapshot.internal_errors, 1);
        assert_eq!(snapshot.processing.count, 2);
        assert_eq!(snapshot.processing.mean_us, 200);
        assert_eq!(snapshot.processing.max_us, 300);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = PredictionMetrics::new();
        metrics.record_prediction(Duration::from_micros(1), &prediction(0.0));
        metrics.record_prediction(Duration::from_micros(1), &prediction(0.55));
        metrics.record_prediction(Duration::from_micros(1), &prediction(1.0));

        let dist = metrics.get_probability_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
        assert_eq!(dist.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = PredictionMetrics::new();
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.p99_us, 0);
    }
}
