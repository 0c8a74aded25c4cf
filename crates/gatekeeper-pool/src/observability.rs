//! Label-keyed counters, gauges, histograms and summaries, with an optional
//! periodic exporter callback. Unlike the optional `metrics` crate feature
//! carried by every other component, this aggregator is always available:
//! it underlies the pool statistics in this crate and gives applications a
//! dependency-free place to publish their own series.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::quantile::P2Quantile;

/// The quantiles tracked by every histogram and summary.
const TRACKED_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Identifies one series: a metric name plus a sorted label set. Two keys
/// built from the same name and label pairs (in any order) are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl LabelKey {
    /// Builds a key, sorting the label pairs so insertion order doesn't
    /// affect identity.
    pub fn new(name: impl Into<String>, labels: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut labels: Vec<(String, String)> = labels.into_iter().collect();
        labels.sort();
        Self {
            name: name.into(),
            labels,
        }
    }

    /// The metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sorted label pairs.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }
}

struct Distribution {
    count: AtomicU64,
    sum_bits: AtomicU64,
    quantiles: Mutex<Vec<(f64, P2Quantile)>>,
}

impl Distribution {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0.0_f64.to_bits()),
            quantiles: Mutex::new(
                TRACKED_QUANTILES
                    .iter()
                    .map(|&q| (q, P2Quantile::new(q)))
                    .collect(),
            ),
        }
    }

    fn record(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        // Single-writer-style CAS loop; contention here is no worse than a
        // mutexed running sum would be, and keeps `sum` lock-free to read.
        let mut current = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let new_sum = f64::from_bits(current) + value;
            match self.sum_bits.compare_exchange_weak(
                current,
                new_sum.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        let mut quantiles = self.quantiles.lock().unwrap();
        for (_, estimator) in quantiles.iter_mut() {
            estimator.observe(value);
        }
    }

    fn snapshot(&self) -> DistributionSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let sum = f64::from_bits(self.sum_bits.load(Ordering::Relaxed));
        let quantiles = self
            .quantiles
            .lock()
            .unwrap()
            .iter()
            .map(|(q, estimator)| (*q, estimator.estimate()))
            .collect();
        DistributionSnapshot { count, sum, quantiles }
    }
}

enum Series {
    Counter(AtomicU64),
    Gauge(AtomicU64),
    Histogram(Distribution),
    Summary(Distribution),
}

/// A snapshot of a histogram's or summary's aggregated observations.
#[derive(Debug, Clone)]
pub struct DistributionSnapshot {
    /// Number of observations recorded.
    pub count: u64,
    /// Sum of all observed values (for computing the mean).
    pub sum: f64,
    /// `(quantile, estimate)` pairs; the estimate is `None` until enough
    /// observations have accumulated to produce one.
    pub quantiles: Vec<(f64, Option<f64>)>,
}

/// A snapshot of one series' current value, tagged by its [`LabelKey`].
#[derive(Debug, Clone)]
pub enum MetricSnapshot {
    /// A monotonically increasing count.
    Counter { key: LabelKey, value: u64 },
    /// A point-in-time value that can move in either direction.
    Gauge { key: LabelKey, value: f64 },
    /// An aggregated distribution of observed values.
    Histogram {
        key: LabelKey,
        distribution: DistributionSnapshot,
    },
    /// As [`MetricSnapshot::Histogram`], tagged as a summary series.
    Summary {
        key: LabelKey,
        distribution: DistributionSnapshot,
    },
}

type Exporter = dyn Fn(&[MetricSnapshot]) + Send + Sync;

/// A process-wide (or application-scoped) aggregator of counters, gauges,
/// histograms and summaries, keyed by name and label set.
///
/// Cloning an `Observability` handle is cheap; clones share the same
/// underlying series.
#[derive(Clone)]
pub struct Observability {
    series: Arc<DashMap<LabelKey, Series>>,
    exporters: Arc<Mutex<Vec<Arc<Exporter>>>>,
}

impl Observability {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self {
            series: Arc::new(DashMap::new()),
            exporters: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Increments (or creates, starting from 0) the counter at `key`.
    pub fn increment_counter(&self, key: LabelKey, delta: u64) {
        let entry = self
            .series
            .entry(key)
            .or_insert_with(|| Series::Counter(AtomicU64::new(0)));
        if let Series::Counter(count) = entry.value() {
            count.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Sets the gauge at `key` to `value`.
    pub fn set_gauge(&self, key: LabelKey, value: f64) {
        let entry = self
            .series
            .entry(key)
            .or_insert_with(|| Series::Gauge(AtomicU64::new(0.0_f64.to_bits())));
        if let Series::Gauge(bits) = entry.value() {
            bits.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Records `value` into the histogram at `key`.
    pub fn record_histogram(&self, key: LabelKey, value: f64) {
        let entry = self
            .series
            .entry(key)
            .or_insert_with(|| Series::Histogram(Distribution::new()));
        if let Series::Histogram(distribution) = entry.value() {
            distribution.record(value);
        }
    }

    /// Records `value` into the summary at `key`.
    pub fn record_summary(&self, key: LabelKey, value: f64) {
        let entry = self
            .series
            .entry(key)
            .or_insert_with(|| Series::Summary(Distribution::new()));
        if let Series::Summary(distribution) = entry.value() {
            distribution.record(value);
        }
    }

    /// Registers a callback invoked with the full snapshot whenever
    /// [`Self::export`] runs.
    pub fn register_exporter<F>(&self, exporter: F)
    where
        F: Fn(&[MetricSnapshot]) + Send + Sync + 'static,
    {
        self.exporters.lock().unwrap().push(Arc::new(exporter));
    }

    /// Takes a snapshot of every series and runs it through every
    /// registered exporter. Exporter panics are caught and never propagate.
    pub fn export(&self) {
        let snapshot = self.snapshot();
        for exporter in self.exporters.lock().unwrap().iter() {
            let exporter = Arc::clone(exporter);
            let snapshot = snapshot.clone();
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                exporter(&snapshot);
            }));
        }
    }

    /// A snapshot of every currently tracked series.
    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        self.series
            .iter()
            .map(|entry| match entry.value() {
                Series::Counter(count) => MetricSnapshot::Counter {
                    key: entry.key().clone(),
                    value: count.load(Ordering::Relaxed),
                },
                Series::Gauge(bits) => MetricSnapshot::Gauge {
                    key: entry.key().clone(),
                    value: f64::from_bits(bits.load(Ordering::Relaxed)),
                },
                Series::Histogram(distribution) => MetricSnapshot::Histogram {
                    key: entry.key().clone(),
                    distribution: distribution.snapshot(),
                },
                Series::Summary(distribution) => MetricSnapshot::Summary {
                    key: entry.key().clone(),
                    distribution: distribution.snapshot(),
                },
            })
            .collect()
    }
}

impl Default for Observability {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn label_key_ignores_insertion_order() {
        let a = LabelKey::new("requests", [("route".to_string(), "/a".to_string()), ("method".to_string(), "GET".to_string())]);
        let b = LabelKey::new("requests", [("method".to_string(), "GET".to_string()), ("route".to_string(), "/a".to_string())]);
        assert_eq!(a, b);
    }

    #[test]
    fn counter_increments_and_is_visible_in_snapshot() {
        let obs = Observability::new();
        let key = LabelKey::new("requests_total", []);
        obs.increment_counter(key.clone(), 1);
        obs.increment_counter(key.clone(), 4);

        let snapshot = obs.snapshot();
        assert_eq!(snapshot.len(), 1);
        match &snapshot[0] {
            MetricSnapshot::Counter { value, .. } => assert_eq!(*value, 5),
            other => panic!("expected a counter, got {other:?}"),
        }
    }

    #[test]
    fn gauge_overwrites_rather_than_accumulates() {
        let obs = Observability::new();
        let key = LabelKey::new("queue_depth", []);
        obs.set_gauge(key.clone(), 3.0);
        obs.set_gauge(key.clone(), 7.0);

        match &obs.snapshot()[0] {
            MetricSnapshot::Gauge { value, .. } => assert_eq!(*value, 7.0),
            other => panic!("expected a gauge, got {other:?}"),
        }
    }

    #[test]
    fn histogram_aggregates_count_sum_and_quantiles() {
        let obs = Observability::new();
        let key = LabelKey::new("latency_ms", []);
        for i in 1..=10 {
            obs.record_histogram(key.clone(), i as f64);
        }

        match &obs.snapshot()[0] {
            MetricSnapshot::Histogram { distribution, .. } => {
                assert_eq!(distribution.count, 10);
                assert_eq!(distribution.sum, 55.0);
                assert_eq!(distribution.quantiles.len(), TRACKED_QUANTILES.len());
            }
            other => panic!("expected a histogram, got {other:?}"),
        }
    }

    #[test]
    fn distinct_label_sets_are_distinct_series() {
        let obs = Observability::new();
        obs.increment_counter(LabelKey::new("requests", [("route".to_string(), "/a".to_string())]), 1);
        obs.increment_counter(LabelKey::new("requests", [("route".to_string(), "/b".to_string())]), 1);
        assert_eq!(obs.snapshot().len(), 2);
    }

    #[test]
    fn export_runs_every_registered_exporter_and_survives_a_panic() {
        let obs = Observability::new();
        obs.increment_counter(LabelKey::new("requests", []), 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        obs.register_exporter(move |_snapshot| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        obs.register_exporter(|_snapshot| panic!("exporter blew up"));

        obs.export();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
