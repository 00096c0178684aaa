use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use enrolment_health::{
    executive_summary, load_csv, AnalyticsConfig, AnalyticsSnapshot, MetricsRepository, ReportKind,
};

#[derive(Parser)]
#[command(name = "enrolment-health", version, about = "State-level enrolment health analytics")]
struct Cli {
    /// JSON file with weights and thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the executive summary
    Summary { csv: PathBuf },
    /// Print states ranked by health score
    Rankings {
        csv: PathBuf,
        /// Only show the best N states
        #[arg(long)]
        top: Option<usize>,
    },
    /// Print one state's month series
    Timeseries { csv: PathBuf, state: String },
    /// Write every report into a directory
    Export { csv: PathBuf, out_dir: PathBuf },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalyticsConfig::from_file(path)?,
        None => AnalyticsConfig::default(),
    };

    match cli.command {
        Command::Summary { csv } => run_summary(&csv, config),
        Command::Rankings { csv, top } => run_rankings(&csv, config, top),
        Command::Timeseries { csv, state } => run_timeseries(&csv, config, &state),
        Command::Export { csv, out_dir } => run_export(&csv, config, &out_dir),
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_repository(csv: &Path, config: AnalyticsConfig) -> Result<MetricsRepository> {
    let records = load_csv(csv)?;
    Ok(MetricsRepository::with_config(records, config))
}

fn run_summary(csv: &Path, config: AnalyticsConfig) -> Result<()> {
    let repo = load_repository(csv, config)?;
    let snapshot = AnalyticsSnapshot::capture(&repo);

    print!("{}", executive_summary(&snapshot)?);
    Ok(())
}

fn run_rankings(csv: &Path, config: AnalyticsConfig, top: Option<usize>) -> Result<()> {
    let repo = load_repository(csv, config)?;
    let metrics = repo.list_state_metrics();
    let shown = top.unwrap_or(metrics.len());

    println!("🏛️  State Rankings");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (index, m) in metrics.iter().take(shown).enumerate() {
        println!(
            "{:>3}. {:<30} {:>6.2}  EQI {:.2}  Friction {:.4}  CER {:.2}",
            index + 1,
            m.state,
            m.health_score,
            m.eqi,
            m.friction_index,
            m.child_enrolment_ratio
        );
    }

    let stats = repo.aggregate_stats();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✓ {} states, average health {:.1}, {} critical",
        stats.state_count, stats.average_health_score, stats.critical_state_count
    );

    Ok(())
}

fn run_timeseries(csv: &Path, config: AnalyticsConfig, state: &str) -> Result<()> {
    let repo = load_repository(csv, config)?;
    let series = repo.time_series(state);

    if series.is_empty() {
        println!("⚠️  No records for state: {}", state);
        return Ok(());
    }

    println!("📈 {} - monthly activity", state.trim());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<12}{:>14}{:>14}{:>14}", "Month", "Enrolments", "Bio Updates", "Demo Updates");
    for point in &series {
        println!(
            "{:<12}{:>14}{:>14}{:>14}",
            point.month, point.total_enrolments, point.bio_updates, point.demo_updates
        );
    }

    Ok(())
}

fn run_export(csv: &Path, config: AnalyticsConfig, out_dir: &Path) -> Result<()> {
    println!("📦 Exporting reports");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let repo = load_repository(csv, config)?;
    // One snapshot for every file so they all agree
    let snapshot = AnalyticsSnapshot::capture(&repo);

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    let mut failed = 0;
    for kind in ReportKind::ALL {
        let path = out_dir.join(kind.file_name());
        let result = kind
            .render(&snapshot)
            .map_err(anyhow::Error::from)
            .and_then(|body| fs::write(&path, body).with_context(|| format!("Failed to write {:?}", path)));

        match result {
            Ok(()) => println!("✓ {}", path.display()),
            Err(e) => {
                failed += 1;
                tracing::error!(report = kind.file_name(), error = %e, "Export failed");
                eprintln!("❌ {}: {:#}", kind.file_name(), e);
            }
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed == 0 {
        println!("✅ {} reports written", ReportKind::ALL.len());
        Ok(())
    } else {
        anyhow::bail!("{} of {} reports failed", failed, ReportKind::ALL.len())
    }
}
