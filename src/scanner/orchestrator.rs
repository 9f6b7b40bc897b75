//! Scan orchestration
//!
//! Runs every registered strategy on its own scoped thread, joins them in
//! registration order and merges their output. A strategy that panics is
//! logged and contributes nothing; the others are unaffected.

use super::report::{ScanReport, StrategyTiming};
use crate::apps::{ApplicationRecord, deduplicate_by_id};
use crate::config::ScanConfig;
use crate::discovery::{
    CommonDirectoriesStrategy, DesktopShortcutStrategy, DiscoveryStrategy, PackagedAppStrategy,
    RegistryUninstallStrategy, ScanContext, StorePackageStrategy,
};
use crate::icon::IconDispatcher;
use std::any::Any;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Merged records plus timing data
#[derive(Debug)]
pub struct ScanOutcome {
    /// De-duplicated records, earlier strategies first
    pub records: Vec<ApplicationRecord>,
    /// What happened during the scan
    pub report: ScanReport,
}

/// Runs discovery strategies and merges their results
pub struct AppScanner {
    context: ScanContext,
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl AppScanner {
    /// Scanner with no strategies registered
    pub fn new(context: ScanContext) -> Self {
        Self {
            context,
            strategies: Vec::new(),
        }
    }

    /// Scanner with the default strategies enabled in `context.config`
    ///
    /// Registration order is Desktop/Shortcut, Common-Directories,
    /// Registry-Uninstall, Packaged-App, Store-Package-Directory.
    pub fn with_default_strategies(context: ScanContext) -> Self {
        let toggles = context.config.strategies;
        let mut scanner = Self::new(context);

        if toggles.desktop_shortcuts {
            scanner.register(Box::new(DesktopShortcutStrategy::default()));
        }
        if toggles.common_directories {
            scanner.register(Box::new(CommonDirectoriesStrategy));
        }
        if toggles.registry_uninstall {
            scanner.register(Box::new(RegistryUninstallStrategy));
        }
        if toggles.packaged_apps {
            scanner.register(Box::new(PackagedAppStrategy::default()));
        }
        if toggles.store_packages {
            scanner.register(Box::new(StorePackageStrategy));
        }
        scanner
    }

    /// Scanner for this machine
    pub fn from_config(config: ScanConfig, icons: IconDispatcher) -> Self {
        Self::with_default_strategies(ScanContext::system(config, icons))
    }

    /// Append a strategy; its output ranks below every earlier one
    pub fn register(&mut self, strategy: Box<dyn DiscoveryStrategy>) {
        self.strategies.push(strategy);
    }

    /// Builder form of [`AppScanner::register`]
    #[must_use]
    pub fn with_strategy(mut self, strategy: Box<dyn DiscoveryStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Names of the registered strategies, in order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Shared scan context
    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    /// Every installed application, de-duplicated by id
    pub fn scan_installed_applications(&self) -> Vec<ApplicationRecord> {
        self.scan_with_report().records
    }

    /// Scan and return the timing report alongside the records
    pub fn scan_with_report(&self) -> ScanOutcome {
        let started = Instant::now();
        let context = &self.context;

        let runs: Vec<(Vec<ApplicationRecord>, StrategyTiming)> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .strategies
                .iter()
                .map(|strategy| {
                    let handle = thread::Builder::new()
                        .name(format!("scan-{}", strategy.name()))
                        .spawn_scoped(scope, move || {
                            let strategy_started = Instant::now();
                            let records = strategy.scan(context);
                            (records, strategy_started.elapsed())
                        });
                    (strategy.name(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let joined = match handle {
                        Ok(handle) => handle.join().map_err(|payload| panic_message(&*payload)),
                        Err(e) => Err(format!("could not start thread: {e}")),
                    };
                    match joined {
                        Ok((records, elapsed)) => {
                            debug!("Strategy {name} produced {} records", records.len());
                            let timing = StrategyTiming {
                                name,
                                elapsed,
                                produced: records.len(),
                                panicked: false,
                            };
                            (records, timing)
                        }
                        Err(message) => {
                            error!("Strategy {name} failed, ignoring its output: {message}");
                            let timing = StrategyTiming {
                                name,
                                elapsed: Duration::ZERO,
                                produced: 0,
                                panicked: true,
                            };
                            (Vec::new(), timing)
                        }
                    }
                })
                .collect()
        });

        let mut combined = Vec::new();
        let mut strategies = Vec::with_capacity(runs.len());
        for (records, timing) in runs {
            combined.extend(records);
            strategies.push(timing);
        }

        let produced = combined.len();
        let records = deduplicate_by_id(combined);
        let report = ScanReport {
            elapsed: started.elapsed(),
            strategies,
            distinct: records.len(),
            duplicates_dropped: produced - records.len(),
            slow_threshold: context.config.slow_scan_threshold(),
        };
        report.log_summary();

        ScanOutcome { records, report }
    }
}

impl std::fmt::Debug for AppScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppScanner")
            .field("context", &self.context)
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
