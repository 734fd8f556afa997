//! SiteAssay CLI - contamination assessment of site survey points

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use siteassay_algorithms::analysis::{run, AnalysisConfig};
use siteassay_algorithms::background::{ecdf, estimate_background, kmeans_centroids, BackgroundMethod};
use siteassay_algorithms::report::Report;
use siteassay_algorithms::selection::field_summaries;
use siteassay_core::io::{BoundarySource, GeoJsonDirectorySink, GeoJsonFile, JsonTableSink, PointSource};
use siteassay_core::{Numeric, SurveyDataset};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "siteassay")]
#[command(author, version, about = "Contamination assessment of site survey points", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the attribute fields of a point file
    Fields {
        /// Survey points (GeoJSON)
        points: PathBuf,
    },
    /// Estimate the background value of one field
    Background {
        /// Survey points (GeoJSON)
        points: PathBuf,
        /// Field to analyse
        #[arg(short, long)]
        field: String,
        /// Estimation method
        #[arg(short, long, value_enum, default_value = "kmeans")]
        method: Method,
        /// Percentile used by the percentile method
        #[arg(short, long, default_value = "50")]
        percentile: f64,
    },
    /// Run the full assessment and write every output
    Run {
        /// Survey points (GeoJSON)
        #[arg(long)]
        points: PathBuf,
        /// Site boundary (GeoJSON polygons)
        #[arg(long)]
        boundary: PathBuf,
        /// Run configuration (JSON); defaults apply to omitted sections
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        /// Property holding the point identifiers
        #[arg(long)]
        id_field: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Kmeans,
    Percentile,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_points(path: &Path, id_field: Option<String>) -> Result<SurveyDataset> {
    let pb = spinner("Reading points...");
    let dataset = GeoJsonFile::new(path)
        .with_id_field(id_field)
        .read_points()
        .with_context(|| format!("Failed to read points from {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} points", dataset.len());
    Ok(dataset)
}

fn read_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn write_outputs(report: &Report, out: &Path) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;
    let text = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(out.join("report.json"), text).context("Failed to write report.json")?;

    let mut tables = JsonTableSink::new(out);
    let mut layers = GeoJsonDirectorySink::new(out, report.crs().cloned());
    report
        .export(&mut tables, &mut layers)
        .context("Failed to export results")?;
    Ok(())
}

fn print_summary(report: &Report) {
    let summary = report.summary();
    println!(
        "Points: {} used, {} dropped; fields: {}",
        summary.n_points,
        summary.n_dropped,
        report.fields().join(", ")
    );
    for (i, ratio) in summary.variance_explained.iter().enumerate() {
        println!("  PC{}: {:.1}% of variance", i + 1, ratio * 100.0);
    }
    println!("Indicator {} against background {:.4}", summary.indicator, summary.background);
    print!("Surface: {} interpolation", summary.interpolation.as_str());
    match &summary.variogram {
        Some(v) => println!(" ({:?} variogram, sill {:.4}, range {:.2})", v.model, v.sill, v.range),
        None => println!(),
    }
    for level in &summary.levels {
        println!("  {:<18} {:>6} points {:>8} cells", level.level.as_str(), level.points, level.cells);
    }
    println!("Source clusters: {}", summary.source_clusters);
    for (class, count) in &summary.score_classes {
        println!("  score class {}: {}", class, count);
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Fields { points } => {
            let dataset = read_points(&points, None)?;
            println!("File: {}", points.display());
            println!("{:<20} {:>8} {:>8} {:>8}  selectable", "field", "numeric", "missing", "other");
            for s in field_summaries(&dataset) {
                println!(
                    "{:<20} {:>8} {:>8} {:>8}  {}",
                    s.name,
                    s.numeric,
                    s.missing,
                    s.non_numeric,
                    if s.is_selectable(dataset.len()) { "yes" } else { "no" }
                );
            }
        }

        Commands::Background { points, field, method, percentile } => {
            let dataset = read_points(&points, None)?;
            let values: Vec<f64> = dataset
                .points
                .iter()
                .filter_map(|p| match p.attribute(&field).map(|v| v.to_numeric()) {
                    Some(Numeric::Value(v)) => Some(v),
                    _ => None,
                })
                .collect();
            info!("{} numeric readings of {}", values.len(), field);

            let method = match method {
                Method::Kmeans => BackgroundMethod::KMeansCutoff,
                Method::Percentile => BackgroundMethod::Percentile(percentile),
            };
            let background = estimate_background(&values, method)
                .with_context(|| format!("Failed to estimate background of {}", field))?;

            println!("Field: {}", field);
            if let BackgroundMethod::KMeansCutoff = method {
                let (low, high) = kmeans_centroids(&values)?;
                println!("  Centroids: {:.4} / {:.4}", low, high);
            }
            println!("  Background: {:.4}", background);
            println!("  ECDF points: {}", ecdf(&values).len());
        }

        Commands::Run { points, boundary, config, out, id_field } => {
            let config = read_config(config.as_deref())?;
            let dataset = read_points(&points, id_field)?;
            let site = GeoJsonFile::new(&boundary)
                .read_boundary()
                .with_context(|| format!("Failed to read boundary from {}", boundary.display()))?;

            let start = Instant::now();
            let pb = spinner("Running assessment...");
            let report = run(&dataset, &site, &config);
            pb.finish_and_clear();
            let report = report.context("Assessment failed")?;
            let elapsed = start.elapsed();

            write_outputs(&report, &out)?;
            print_summary(&report);
            done("Assessment", &out, elapsed);
        }
    }

    Ok(())
}
