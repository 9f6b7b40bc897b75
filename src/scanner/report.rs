//! Scan timing and counts

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one strategy within a scan
#[derive(Debug, Clone, Serialize)]
pub struct StrategyTiming {
    /// Strategy name
    pub name: &'static str,
    /// Wall time spent in the strategy
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Records it produced, before de-duplication
    pub produced: usize,
    /// True if the strategy panicked and its output was discarded
    pub panicked: bool,
}

/// Summary of one full scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Wall time from fan-out to merged result
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Per-strategy results, in registration order
    pub strategies: Vec<StrategyTiming>,
    /// Records left after de-duplication
    pub distinct: usize,
    /// Records dropped because an earlier one had the same id
    pub duplicates_dropped: usize,
    /// Threshold above which the scan counts as slow
    #[serde(serialize_with = "serialize_millis")]
    pub slow_threshold: Duration,
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

impl ScanReport {
    /// True when the scan took longer than the slow threshold
    pub fn is_slow(&self) -> bool {
        self.elapsed > self.slow_threshold
    }

    /// Records produced by all strategies before de-duplication
    pub fn total_produced(&self) -> usize {
        self.strategies.iter().map(|s| s.produced).sum()
    }

    /// Strategies that panicked
    pub fn panicked(&self) -> impl Iterator<Item = &StrategyTiming> {
        self.strategies.iter().filter(|s| s.panicked)
    }

    /// Log the scan summary
    ///
    /// Slow scans are logged at WARN with the slowest strategies listed.
    pub fn log_summary(&self) {
        let total_ms = self.elapsed.as_secs_f64() * 1000.0;
        info!(
            "Scan found {} applications ({} duplicates dropped) in {:.2}ms",
            self.distinct, self.duplicates_dropped, total_ms
        );
        for timing in &self.strategies {
            info!(
                "  {}: {} records in {:.2}ms{}",
                timing.name,
                timing.produced,
                timing.elapsed.as_secs_f64() * 1000.0,
                if timing.panicked { " (panicked)" } else { "" }
            );
        }

        if self.is_slow() {
            warn!(
                "Scan took {:.2}ms, above the {}ms threshold",
                total_ms,
                self.slow_threshold.as_millis()
            );

            let mut slowest = self.strategies.clone();
            slowest.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));
            for timing in slowest.iter().take(3) {
                warn!(
                    "  {}: {:.2}ms",
                    timing.name,
                    timing.elapsed.as_secs_f64() * 1000.0
                );
            }
        }
    }
}
