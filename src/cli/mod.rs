//! Command-line interface for the biologging report pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ConfigError;
use crate::processors::{CleaningReport, DayNightInterval};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "shark-biologging")]
#[command(about = "Depth, temperature, ODBA and day/night report for a tagged shark", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and render all four charts
    Report {
        /// Tag export CSV
        csv_file: PathBuf,
        /// Output directory for PNG charts
        #[arg(short, long, default_value = "report")]
        output_dir: PathBuf,
        /// Also export the cleaned table and day/night table as CSV
        #[arg(long)]
        export: bool,
    },

    /// Clean a tag export and write it with the derived ODBA column
    Clean {
        /// Tag export CSV
        csv_file: PathBuf,
        /// Output CSV path
        output: PathBuf,
    },

    /// Print (or export) sunrise and sunset for each date in a tag export
    Daynight {
        /// Tag export CSV
        csv_file: PathBuf,
        /// Optional output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default configuration as YAML
    InitConfig {
        /// Output YAML path
        path: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn cleaning_items(report: &CleaningReport) -> Vec<(&'static str, String)> {
    vec![
        ("Rows read", report.rows_read.to_string()),
        ("Bad timestamp", report.dropped_bad_timestamp.to_string()),
        (
            "Bad pressure/temp",
            report.dropped_bad_pressure_temperature.to_string(),
        ),
        ("Rows remaining", report.rows_remaining.to_string()),
    ]
}

/// Load the config (defaults when absent or unreadable) and validate it.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let config = match path {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Report {
            csv_file,
            output_dir,
            export,
        } => {
            cmd_report(&csv_file, &output_dir, export, &config);
        }
        Commands::Clean { csv_file, output } => {
            cmd_clean(&csv_file, &output, &config);
        }
        Commands::Daynight { csv_file, output } => {
            cmd_daynight(&csv_file, output.as_deref(), &config);
        }
        Commands::InitConfig { path } => {
            cmd_init_config(&path);
        }
    }
}

fn cmd_report(csv_file: &Path, output_dir: &Path, export: bool, config: &PipelineConfig) {
    use crate::core::writers;
    use crate::processors::pipeline;
    use crate::visualization;

    let start = Instant::now();

    println!("Building biologging report...");
    println!("Input: {}", csv_file.display());
    println!("Output directory: {}", output_dir.display());

    let spinner = create_spinner("Loading and cleaning samples...");

    let analysis = match pipeline::analyze(csv_file, config) {
        Ok(a) => a,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Analysis failed: {:#}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Rendering charts...");

    let charts = match visualization::render_all(output_dir, &analysis, &config.plot) {
        Ok(paths) => paths,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Rendering failed: {}", e);
            std::process::exit(1);
        }
    };

    if export {
        spinner.set_message("Exporting tables...");
        let samples_path = output_dir.join("samples_clean.csv");
        let intervals_path = output_dir.join("daynight.csv");

        let result = writers::write_samples_csv(&samples_path, &analysis.table)
            .and_then(|_| writers::write_intervals_csv(&intervals_path, &analysis.intervals));
        if let Err(e) = result {
            spinner.finish_and_clear();
            error!("Export failed: {}", e);
            std::process::exit(1);
        }
    }

    spinner.finish_and_clear();

    let mut items = vec![("Input file", csv_file.display().to_string())];
    items.extend(cleaning_items(&analysis.report));
    items.push(("Dates", analysis.intervals.len().to_string()));
    items.push(("Charts written", charts.len().to_string()));
    items.push(("Output directory", output_dir.display().to_string()));
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Report Complete", &items);
}

fn cmd_clean(csv_file: &Path, output: &Path, config: &PipelineConfig) {
    use crate::core::writers;
    use crate::processors::{cleaning, odba};

    let start = Instant::now();

    println!("Cleaning tag export...");
    println!("Input: {}", csv_file.display());
    println!("Output: {}", output.display());

    let spinner = create_spinner("Loading and cleaning samples...");

    let (mut table, report) = match cleaning::load_tag_csv(csv_file, &config.tag) {
        Ok(loaded) => loaded,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load tag export: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = odba::attach_odba(&mut table, config.processing.odba_window) {
        spinner.finish_and_clear();
        error!("ODBA computation failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = writers::write_samples_csv(output, &table) {
        spinner.finish_and_clear();
        error!("Failed to write {}: {}", output.display(), e);
        std::process::exit(1);
    }

    spinner.finish_and_clear();

    let mut items = vec![("Input file", csv_file.display().to_string())];
    items.extend(cleaning_items(&report));
    items.push(("Sorted", report.sorted.to_string()));
    items.push(("Output file", output.display().to_string()));
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Cleaning Complete", &items);
}

fn print_intervals<'a>(intervals: impl Iterator<Item = &'a DayNightInterval>) {
    println!("{:<12} {:<10} {:<10} {:<8}", "Date", "Sunrise", "Sunset", "Daylight");
    for interval in intervals {
        let minutes = interval.day_length().num_minutes();
        println!(
            "{:<12} {:<10} {:<10} {:>2}h{:02}m",
            interval.date.format("%Y-%m-%d"),
            interval.sunrise.format("%H:%M:%S"),
            interval.sunset.format("%H:%M:%S"),
            minutes / 60,
            minutes % 60
        );
    }
}

fn cmd_daynight(csv_file: &Path, output: Option<&Path>, config: &PipelineConfig) {
    use crate::core::writers;
    use crate::processors::{cleaning, daynight};

    let start = Instant::now();

    let (table, _report) = match cleaning::load_tag_csv(csv_file, &config.tag) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Failed to load tag export: {}", e);
            std::process::exit(1);
        }
    };

    let intervals = match daynight::build_interval_table(table.dates(), &config.observer) {
        Ok(intervals) => intervals,
        Err(e) => {
            error!("Day/night computation failed: {}", e);
            std::process::exit(1);
        }
    };

    print_intervals(intervals.values());

    if let Some(path) = output {
        if let Err(e) = writers::write_intervals_csv(path, &intervals) {
            error!("Failed to write {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    print_summary(
        "Day/Night Table Complete",
        &[
            ("Input file", csv_file.display().to_string()),
            (
                "Observer",
                format!(
                    "{:.4}, {:.4}",
                    config.observer.latitude, config.observer.longitude
                ),
            ),
            ("Time zone", config.observer.timezone.clone()),
            ("Dates", intervals.len().to_string()),
            (
                "Output file",
                output
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_init_config(path: &Path) {
    let config = PipelineConfig::default();
    match config.to_yaml(path) {
        Ok(()) => println!("Wrote default configuration to {}", path.display()),
        Err(e) => {
            error!("Failed to write {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
