use std::path::{Component, Path, PathBuf};
use std::sync::Once;

static LOG_INIT: Once = Once::new();
const DEFAULT_LOG_FILTER: &str = "benchwatch_core=info,benchwatch=info";

use benchwatch_core::{
    compare::compare,
    config::{Config, DEFAULT_CONFIG_FILE},
    dashboard::write_dashboard,
    parse,
    report::render_summary,
    result::Tool,
    runner::{Orchestrator, RunOptions},
    schedule::Trigger,
    step::ShellRunner,
    store::DataStore,
    threshold::Threshold,
};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};


#[derive(Debug, Parser)]
#[command(
    name = "benchwatch",
    author,
    version,
    about = "Scheduled benchmark runs with baseline regression alerts",
    long_about = None
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TriggerArg {
    Schedule,
    Manual,
}

impl From<TriggerArg> for Trigger {
    fn from(value: TriggerArg) -> Self {
        match value {
            TriggerArg::Schedule => Trigger::Schedule,
            TriggerArg::Manual => Trigger::Manual,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch fixtures, install, benchmark and compare against the stored baseline.
    Run {
        #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE, value_parser = parse_sanitized_path)]
        config: PathBuf,
        /// Reuse fixtures already on disk
        #[arg(long)]
        skip_fetch: bool,
        /// Skip dependency installation
        #[arg(long)]
        skip_setup: bool,
        /// Read an existing results file instead of running the benchmark command
        #[arg(long)]
        skip_bench: bool,
        #[arg(long, value_enum, default_value_t = TriggerArg::Manual)]
        trigger: TriggerArg,
        /// Commit the run is recorded against (defaults to $GITHUB_SHA)
        #[arg(long)]
        commit: Option<String>,
        /// Record timestamp, RFC 3339 (defaults to now)
        #[arg(long, value_parser = parse_timestamp)]
        timestamp: Option<DateTime<Utc>>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Compare two results files without touching the store.
    Compare {
        #[arg(long, value_name = "FILE", value_parser = parse_sanitized_path)]
        baseline: PathBuf,
        #[arg(long, value_name = "FILE", value_parser = parse_sanitized_path)]
        current: PathBuf,
        #[arg(long, default_value_t = Tool::Pytest)]
        tool: Tool,
        #[arg(long, default_value_t = Threshold::default())]
        threshold: Threshold,
    },
    /// Validate the config and print the next scheduled runs.
    Check {
        #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE, value_parser = parse_sanitized_path)]
        config: PathBuf,
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=1000))]
        count: u16,
    },
    /// List stored runs, newest first.
    History {
        #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE, value_parser = parse_sanitized_path)]
        config: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Re-render the HTML dashboard from the store.
    Dashboard {
        #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE, value_parser = parse_sanitized_path)]
        config: PathBuf,
    },
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", raw, e))
}

/// `GITHUB_SHA` shortened the way commit links show it.
fn commit_from_env(raw: Option<String>) -> Option<String> {
    raw.map(|sha| sha.trim().chars().take(8).collect::<String>())
        .filter(|sha| !sha.is_empty())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn init_logging() {
    let raw = std::env::var("BENCHWATCH_LOG").ok();
    if let Some(value) = &raw
        && !env_toggle_enabled(value)
    {
        return;
    }

    LOG_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = raw
            .as_deref()
            .and_then(filter_expr_from)
            .or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_LOG_FILTER),
        };

        let _ = builder.try_init();
    });
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let CliArgs { command } = CliArgs::parse();

    match command {
        Commands::Run {
            config,
            skip_fetch,
            skip_setup,
            skip_bench,
            trigger,
            commit,
            timestamp,
            notes,
        } => {
            let path = config;
            let config = Config::load(&path)?;
            tracing::debug!(config = %path.display(), suite = %config.suite, "loaded config");
            let mut opts = RunOptions::new(trigger.into(), timestamp.unwrap_or_else(Utc::now));
            opts.skip_fetch = skip_fetch;
            opts.skip_setup = skip_setup;
            opts.skip_bench = skip_bench;
            opts.commit = commit.or_else(|| commit_from_env(std::env::var("GITHUB_SHA").ok()));
            opts.notes = notes;

            let outcome = Orchestrator::new(&config, &ShellRunner).run(&opts)?;
            print!("{}", render_summary(&config.suite, &outcome.comparison));
            for target in &outcome.published {
                println!("Alert comment published to {}", target);
            }
            if !outcome.saved {
                println!("Baseline unchanged; this run was not recorded.");
            }
            if outcome.failed {
                eprintln!(
                    "Error: {} benchmark(s) regressed beyond {}",
                    outcome.comparison.alerts.len(),
                    outcome.comparison.threshold
                );
                std::process::exit(1);
            }
        }
        Commands::Compare {
            baseline,
            current,
            tool,
            threshold,
        } => {
            let baseline_suite = parse::load_suite(tool, &baseline)?;
            let current_suite = parse::load_suite(tool, &current)?;
            let comparison = compare(&current_suite, Some(&baseline_suite), tool.direction(), threshold);
            let label = current.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            print!("{}", render_summary(&label, &comparison));
            if comparison.has_alerts() {
                eprintln!(
                    "Error: {} benchmark(s) regressed beyond {}",
                    comparison.alerts.len(),
                    comparison.threshold
                );
                std::process::exit(1);
            }
        }
        Commands::Check { config, count } => {
            let cfg = Config::load(&config)?;
            let cron = cfg.cron()?;
            println!("Config {} is valid.", config.display());
            println!("Suite: {}", cfg.suite);
            println!("Tool: {}", cfg.benchmark.tool);
            println!("Schedule: {} (UTC)", cron);
            println!(
                "Manual dispatch: {}",
                if cfg.schedule.manual { "enabled" } else { "disabled" }
            );
            println!("Alert threshold: {}", cfg.alert.threshold);
            for at in cron.upcoming(Utc::now(), usize::from(count)) {
                println!("  next: {}", at.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
        }
        Commands::History { config, limit } => {
            let cfg = Config::load(&config)?;
            let store = DataStore::load(&cfg.store_dir())?;
            let runs = store.runs(&cfg.suite);
            if runs.is_empty() {
                println!("No runs recorded for {}.", cfg.suite);
            }
            for run in runs.iter().rev().take(limit) {
                println!(
                    "{}  {:<8}  {}  {}  {} benchmark(s)",
                    run.generated_at,
                    run.commit.as_deref().unwrap_or("-"),
                    run.trigger,
                    run.tool,
                    run.benches.len()
                );
            }
        }
        Commands::Dashboard { config } => {
            let cfg = Config::load(&config)?;
            let dir = cfg.store_dir();
            let store = DataStore::load(&dir)?;
            let path = write_dashboard(&dir, &store)?;
            println!("Dashboard written to {}", path.display());
        }
    }

    Ok(())
}
