//! Scan orchestration and reporting
//!
//! [`AppScanner`] fans out to every registered discovery strategy and merges
//! the results; [`ScanReport`] records how long each part took.

pub mod orchestrator;
pub mod report;

pub use orchestrator::{AppScanner, ScanOutcome};
pub use report::{ScanReport, StrategyTiming};
