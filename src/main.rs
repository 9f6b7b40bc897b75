//! `appscout` - list installed applications
//!
//! Runs one scan and prints the merged result as a table or as JSON.

use anyhow::{Context, Result, bail};
use appscout::{
    ApplicationRecord,
    config::ConfigManager,
    error::get_user_friendly_error,
    icon::{IconCollector, IconDispatcher, IconResolver, IconUpdate},
    scanner::{AppScanner, ScanReport},
    utils,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{info, warn};

const USAGE: &str = "\
appscout - list installed applications

USAGE:
    appscout [OPTIONS]

OPTIONS:
    --json                 Print records and scan report as JSON
    --wait-icons <MS>      Wait up to MS milliseconds for background icon fetches
    --export-icons <DIR>   Write each record's icon as PNG into DIR
    --init-config          Write the active configuration to %APPDATA%\\AppScout\\config.json
    -h, --help             Print this help
";

/// Parsed command line
#[derive(Debug)]
struct CliArgs {
    json: bool,
    wait_icons: Option<u64>,
    export_icons: Option<PathBuf>,
    init_config: bool,
}

fn parse_args() -> Result<Option<CliArgs>> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let cli = CliArgs {
        json: args.contains("--json"),
        init_config: args.contains("--init-config"),
        wait_icons: args
            .opt_value_from_str("--wait-icons")
            .context("--wait-icons expects a number of milliseconds")?,
        export_icons: args.opt_value_from_os_str("--export-icons", |s| {
            Ok::<_, std::convert::Infallible>(PathBuf::from(s))
        })?,
    };

    let remaining = args.finish();
    if !remaining.is_empty() {
        bail!("Unexpected arguments: {remaining:?}");
    }
    Ok(Some(cli))
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    applications: &'a [ApplicationRecord],
    report: &'a ScanReport,
    icons_resolved: usize,
}

fn main() -> Result<()> {
    let Some(cli) = parse_args()? else {
        print!("{USAGE}");
        return Ok(());
    };

    utils::init_logging().context("Failed to initialize logging system")?;

    let config = ConfigManager::load().unwrap_or_else(|e| {
        warn!("Using default configuration: {e}");
        appscout::config::ScanConfig::default()
    });

    if cli.init_config {
        ConfigManager::save(&config).context("Failed to write configuration")?;
        println!("Configuration written to {}", ConfigManager::get_config_path().display());
    }

    // Collect background icon completions as they arrive
    let (tx, rx) = mpsc::channel::<IconUpdate>();
    let collector = IconCollector::spawn(rx).context("Failed to start icon update collector")?;

    let icons = IconDispatcher::new(IconResolver::new()).with_updates(tx);
    let scanner = AppScanner::from_config(config, icons.clone());
    let outcome = scanner.scan_with_report();

    let all_fetched = match cli.wait_icons {
        Some(ms) => icons.wait_idle(Duration::from_millis(ms)),
        None => icons.pending() == 0,
    };
    let icons_resolved = if all_fetched {
        // Dropping the last senders lets the collector drain and stop
        drop(scanner);
        drop(icons);
        collector.finish().len()
    } else {
        warn!("{} icon fetches still running", icons.pending());
        collector.received_so_far()
    };
    info!("{icons_resolved} icons resolved in the background");

    if let Some(dir) = &cli.export_icons {
        export_icons(dir, &outcome.records)?;
    }

    if cli.json {
        let output = JsonOutput {
            applications: &outcome.records,
            report: &outcome.report,
            icons_resolved,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(&outcome.records, &outcome.report);
    }

    Ok(())
}

fn print_table(records: &[ApplicationRecord], report: &ScanReport) {
    for record in records {
        println!(
            "{:<40} {:<18} {}",
            record.display_name,
            record.source.label(),
            record.executable_path
        );
    }
    println!();
    println!(
        "{} applications in {:.2}s ({} duplicates dropped)",
        report.distinct,
        report.elapsed.as_secs_f64(),
        report.duplicates_dropped
    );
    for failed in report.panicked() {
        println!("warning: {} failed and was skipped", failed.name);
    }
}

/// File-system safe name for a record id
fn icon_file_name(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}.png")
}

fn export_icons(dir: &Path, records: &[ApplicationRecord]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = 0usize;
    for record in records {
        match record.icon().to_png() {
            Ok(png) => {
                std::fs::write(dir.join(icon_file_name(&record.id)), png)?;
                written += 1;
            }
            Err(e) => eprintln!("{}: {}", record.display_name, get_user_friendly_error(&e)),
        }
    }
    info!("Exported {written} icons to {}", dir.display());
    Ok(())
}
