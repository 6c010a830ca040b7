//! Checker metrics using metrics-rs.
//!
//! Recording goes through the `metrics` facade and is a no-op unless a
//! recorder is installed. The CLI installs [`CliRecorder`] with `--metrics`
//! and prints a summary at exit.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, gauge,
};
use parking_lot::RwLock;

use crate::mmio::Direction;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "rvcheck_events_total",
        Unit::Count,
        "Trace events processed, by event kind"
    );
    describe_counter!(
        "rvcheck_commits_total",
        Unit::Count,
        "Commits verified against the reference, by hart"
    );
    describe_counter!(
        "rvcheck_mmio_matched_total",
        Unit::Count,
        "MMIO expectations consumed by the reference, by direction"
    );
    describe_counter!(
        "rvcheck_image_bytes_total",
        Unit::Bytes,
        "Bytes written to memory by image loads"
    );
    describe_gauge!(
        "rvcheck_check_time_seconds",
        Unit::Seconds,
        "Wall-clock time of the trace check"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

/// Record one trace event of the given kind.
pub fn record_event(kind: &'static str) {
    counter!("rvcheck_events_total", "kind" => kind).increment(1);
}

/// Record one verified commit.
pub fn record_commit(hart: u32) {
    let labels = [("hart", hart.to_string())];
    counter!("rvcheck_commits_total", &labels).increment(1);
}

/// Record one matched MMIO transaction.
pub fn record_mmio(direction: Direction) {
    counter!("rvcheck_mmio_matched_total", "dir" => direction.as_str()).increment(1);
}

/// Record bytes loaded from an image.
pub fn record_image_bytes(bytes: u64) {
    counter!("rvcheck_image_bytes_total").increment(bytes);
}

/// Record the duration of a check.
pub fn record_check_time(secs: f64) {
    gauge!("rvcheck_check_time_seconds").set(secs);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct GaugeStorage {
    values: RwLock<HashMap<String, f64>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliGauge {
    key: String,
    storage: Arc<GaugeStorage>,
}

impl metrics::GaugeFn for CliGauge {
    fn increment(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

/// In-memory recorder whose contents are printed after the run.
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Arc::new(CounterStorage::default()),
            gauges: Arc::new(GaugeStorage::default()),
        }
    }

    /// Install as the global recorder.
    ///
    /// Returns `None` if another recorder is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let counters = Arc::clone(&self.counters);
        let gauges = Arc::clone(&self.gauges);

        metrics::set_global_recorder(self).ok()?;

        Some(CliRecorderHandle { counters, gauges })
    }
}

impl Default for CliRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let labels = key.labels();
    if labels.len() == 0 {
        name.to_string()
    } else {
        let label_str: Vec<String> = labels
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        format!("{}{{{}}}", name, label_str.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CliGauge {
            key: key_to_string(key),
            storage: Arc::clone(&self.gauges),
        }))
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Read access to the values collected by an installed [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    #[must_use]
    pub fn get_gauge(&self, key: &str) -> Option<f64> {
        self.gauges.values.read().get(key).copied()
    }

    /// Print all collected metrics, sorted by key.
    pub fn print_summary(&self) {
        let counters = self.counters.values.read();
        let gauges = self.gauges.values.read();

        if counters.is_empty() && gauges.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        println!();

        if !counters.is_empty() {
            println!("### Counters");
            let mut entries: Vec<_> = counters.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in entries {
                println!("  {key}: {value}");
            }
            println!();
        }

        if !gauges.is_empty() {
            println!("### Gauges");
            let mut entries: Vec<_> = gauges.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in entries {
                println!("  {key}: {value:.6}");
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Label;

    #[test]
    fn test_key_to_string() {
        let key = Key::from_name("rvcheck_image_bytes_total");
        assert_eq!(key_to_string(&key), "rvcheck_image_bytes_total");

        let key = Key::from_parts("rvcheck_commits_total", vec![Label::new("hart", "0")]);
        assert_eq!(key_to_string(&key), "rvcheck_commits_total{hart=0}");
    }

    #[test]
    fn test_recorder_collects_checker_metrics() {
        let recorder = CliRecorder::new();
        let handle = CliRecorderHandle {
            counters: Arc::clone(&recorder.counters),
            gauges: Arc::clone(&recorder.gauges),
        };

        metrics::with_local_recorder(&recorder, || {
            record_commit(1);
            record_commit(1);
            record_mmio(Direction::Write);
            record_event("commit");
            record_image_bytes(16);
            record_image_bytes(4);
            record_check_time(0.5);
        });

        assert_eq!(handle.get_counter("rvcheck_commits_total{hart=1}"), Some(2));
        assert_eq!(
            handle.get_counter("rvcheck_mmio_matched_total{dir=write}"),
            Some(1)
        );
        assert_eq!(
            handle.get_counter("rvcheck_events_total{kind=commit}"),
            Some(1)
        );
        assert_eq!(handle.get_counter("rvcheck_image_bytes_total"), Some(20));
        let secs = handle.get_gauge("rvcheck_check_time_seconds").unwrap();
        assert!((secs - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counter_absolute_overrides() {
        let storage = Arc::new(CounterStorage::default());
        let counter = CliCounter {
            key: "rvcheck_events_total{kind=io}".to_string(),
            storage: Arc::clone(&storage),
        };
        metrics::CounterFn::increment(&counter, 5);
        metrics::CounterFn::absolute(&counter, 2);
        assert_eq!(
            storage.values.read().get("rvcheck_events_total{kind=io}"),
            Some(&2)
        );
    }
}
