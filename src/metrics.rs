//! Run metrics: named counters and wall-clock timing for one pipeline run.
//!
//! Every driver ([`crate::pipeline::run_clean`], [`crate::pipeline::run_analysis`],
//! [`crate::sample::sample`]) fills a [`RunMetrics`] as batches go by. At the end
//! of the run the counters can be printed or saved as pretty JSON next to the
//! artifacts.
//!
//! # Example
//!
//! ```
//! use scholarstream::metrics::{RunMetrics, ROWS_READ};
//!
//! let mut metrics = RunMetrics::new();
//! metrics.record_start();
//! metrics.increment(ROWS_READ, 10);
//! metrics.increment(ROWS_READ, 5);
//! metrics.record_end();
//! assert_eq!(metrics.get(ROWS_READ), 15);
//! assert!(metrics.elapsed().is_some());
//! ```

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

pub const BATCHES: &str = "batches";
pub const ROWS_READ: &str = "rows_read";
pub const ROWS_DROPPED: &str = "rows_dropped_missing_title";
pub const ROWS_WRITTEN: &str = "rows_written";
pub const DATE_PARSE_FAILURES: &str = "date_parse_failures";
pub const NUMBER_PARSE_FAILURES: &str = "number_parse_failures";
pub const ROWS_SAMPLED: &str = "rows_sampled";

/// Descriptions of the built-in counters, printed and saved with their values.
fn describe(name: &str) -> Option<&'static str> {
    Some(match name {
        BATCHES => "Windows processed",
        ROWS_READ => "Data rows read from the input",
        ROWS_DROPPED => "Rows removed because the title was missing or empty",
        ROWS_WRITTEN => "Rows appended to the cleaned artifact",
        DATE_PARSE_FAILURES => "Non-empty dates that could not be parsed",
        NUMBER_PARSE_FAILURES => "Non-empty numeric cells that could not be parsed",
        ROWS_SAMPLED => "Rows kept in the final sample",
        _ => return None,
    })
}

/// Counters of one run, single-owner and updated in batch order.
#[derive(Clone, Debug, Default)]
pub struct RunMetrics {
    counters: BTreeMap<String, u64>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl RunMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn record_end(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Elapsed time between start and end, once both are recorded.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Add `value` to the counter `name`, creating it at zero first.
    pub fn increment(&mut self, name: &str, value: u64) {
        match self.counters.get_mut(name) {
            Some(count) => *count += value,
            None => {
                self.counters.insert(name.to_string(), value);
            }
        }
    }

    pub fn set(&mut self, name: &str, value: u64) {
        self.counters.insert(name.to_string(), value);
    }

    /// Current value of `name`; unknown counters read as zero.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// All counters, in name order.
    pub fn counters(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Counters as a JSON object of `{ name: { value, description? } }`, plus
    /// `execution_time_ms` when the run was timed.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (name, count) in &self.counters {
            let mut metric = Map::new();
            metric.insert("value".to_string(), json!(count));
            if let Some(desc) = describe(name) {
                metric.insert("description".to_string(), json!(desc));
            }
            out.insert(name.clone(), Value::Object(metric));
        }
        if let Some(elapsed) = self.elapsed() {
            out.insert(
                "execution_time_ms".to_string(),
                json!({
                    "value": elapsed.as_millis(),
                    "description": "Total run time in milliseconds",
                }),
            );
        }
        Value::Object(out)
    }

    /// Print the counters to stdout.
    pub fn print(&self) {
        println!("\n========== Run Metrics ==========");
        if let Some(elapsed) = self.elapsed() {
            println!(
                "Execution Time: {:.3}s ({} ms)",
                elapsed.as_secs_f64(),
                elapsed.as_millis()
            );
            println!("---------------------------------");
        }
        for (name, count) in &self.counters {
            match describe(name) {
                Some(desc) => println!("{name}: {count} ({desc})"),
                None => println!("{name}: {count}"),
            }
        }
        println!("=================================\n");
    }

    /// Save [`Self::to_json`] as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path, &self.to_json())
    }
}

/// Write any serializable value as pretty JSON at `path`.
pub(crate) fn write_json<T: serde::Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let formatted = serde_json::to_string_pretty(value)?;
    file.write_all(formatted.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Summary statistics of a scalar distribution.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub min: u32,
    pub max: u32,
    pub p50: u32,
    pub p95: u32,
}

impl DistributionStats {
    /// Statistics of `values`; all zero when empty. Sorts `values` in place.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &mut [u32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_unstable();
        let sorted = &*values;
        let count = sorted.len();
        let sum: u64 = sorted.iter().map(|&v| u64::from(v)).sum();
        Self {
            count,
            mean: sum as f64 / count as f64,
            min: sorted[0],
            max: sorted[count - 1],
            p50: sorted[count / 2],
            p95: sorted[((count * 95) / 100).min(count - 1)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_serialize_with_descriptions() {
        let mut m = RunMetrics::new();
        m.increment(ROWS_READ, 3);
        m.increment(ROWS_READ, 4);
        m.set("custom", 9);
        let json = m.to_json();
        assert_eq!(json[ROWS_READ]["value"], 7);
        assert!(json[ROWS_READ]["description"].is_string());
        assert_eq!(json["custom"]["value"], 9);
        assert!(json["custom"].get("description").is_none());
        assert!(json.get("execution_time_ms").is_none());
    }

    #[test]
    fn distribution_stats() {
        let mut values = [5, 1, 3, 3];
        let s = DistributionStats::from_values(&mut values);
        assert_eq!(values, [1, 3, 3, 5]);
        assert_eq!(s.count, 4);
        assert_eq!((s.min, s.max, s.p50), (1, 5, 3));
        assert!((s.mean - 3.0).abs() < 1e-9);
        assert_eq!(DistributionStats::from_values(&mut []), DistributionStats::default());
    }
}
