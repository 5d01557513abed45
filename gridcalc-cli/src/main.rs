mod constraints;
mod reports;

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use thiserror::Error;

use constraints::{apply_constraints, resolve_competitor, split_csv};
use gridcalc_engine::{
    ChampionshipEngine, SamplingMode, ScenarioSet, SeasonSnapshot, SimulationConfig,
    SnapshotError, SolverConfig, StandingsProvider,
};
use reports::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Every finishing order equally likely
    Uniform,
    /// Top of the standings tends to finish at the front
    Favored,
    /// Weighted by recent per-event points
    Form,
    /// Weighted by longer-horizon points with more upset noise
    Momentum,
}

impl From<ModeArg> for SamplingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Uniform => Self::Uniform,
            ModeArg::Favored => Self::Favored,
            ModeArg::Form => Self::FormWeighted,
            ModeArg::Momentum => Self::MomentumWeighted,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "gridcalc", version)]
#[command(about = "Championship title odds, points projections and path-to-victory analysis")]
struct Args {
    /// Season snapshot (JSON) with entrants, completed results and remaining events
    #[arg(long)]
    season: PathBuf,

    /// Scenario file (JSON) mapping 0-based remaining-event indices to constraints
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Constraint tokens: `E:A@P` locks A to position P, `E:A>B` puts A ahead of B
    /// (E is the 1-based remaining event; comma-separated or repeated)
    #[arg(long = "constraint")]
    constraints: Vec<String>,

    /// Number of simulated seasons
    #[arg(long, default_value_t = SimulationConfig::default_iterations())]
    iterations: u32,

    /// Finishing-order sampling mode
    #[arg(long, value_enum, default_value_t = ModeArg::Uniform)]
    mode: ModeArg,

    /// Upset noise for the weighted modes, 0 (form only) to 1 (pure noise)
    #[arg(long, default_value_t = SimulationConfig::default_unpredictability())]
    unpredictability: f64,

    /// Base seed; identical arguments reproduce identical reports
    #[arg(long, default_value_t = SimulationConfig::default_seed())]
    seed: u64,

    /// Parallel simulation workers
    #[arg(long, default_value_t = SimulationConfig::default_workers())]
    workers: usize,

    /// Attempts per event before constraints are dropped for that order
    #[arg(long, default_value_t = SimulationConfig::default_retry_budget())]
    retry_budget: u32,

    /// Competitor (number, full name or surname) to solve the path to victory for
    #[arg(long)]
    target: Option<String>,

    /// Simulated seasons for the points projection (omit to skip it)
    #[arg(long)]
    projection_runs: Option<u32>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Treat events dated after this day (YYYY-MM-DD) as not yet run
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Error)]
enum ProviderError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load {path}")]
    Snapshot {
        path: String,
        #[source]
        source: SnapshotError,
    },
}

/// Reads a season snapshot from disk.
#[derive(Debug, Clone)]
struct FileProvider {
    path: PathBuf,
    as_of: Option<NaiveDate>,
}

impl StandingsProvider for FileProvider {
    type Error = ProviderError;

    fn load_snapshot(&self) -> Result<SeasonSnapshot, Self::Error> {
        let path = self.path.display().to_string();
        let json = std::fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: path.clone(),
            source,
        })?;
        let snapshot = SeasonSnapshot::from_json(&json)
            .map_err(|source| ProviderError::Snapshot { path, source })?;
        Ok(match self.as_of {
            Some(as_of) => snapshot.rewind(as_of),
            None => snapshot,
        })
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("{} {err:#}", "❌ error:".red().bold());
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = simulation_config(args)?;
    let engine = ChampionshipEngine::new(FileProvider {
        path: args.season.clone(),
        as_of: args.as_of,
    });
    let snapshot = engine.snapshot()?;
    let field = snapshot
        .field()
        .context("season snapshot has no usable standings")?;
    log::info!(
        "{}: {} competitors, {} completed, {} remaining",
        snapshot.season,
        field.len(),
        snapshot.completed.len(),
        snapshot.remaining.len()
    );

    let scenarios = load_scenarios(args, &field)?;

    let simulation = snapshot
        .title_odds(scenarios.clone(), &config)
        .context("simulation failed")?;

    let victory = match &args.target {
        Some(token) => {
            let target = resolve_competitor(token, &field)
                .with_context(|| format!("unknown --target '{token}'"))?;
            Some(
                snapshot
                    .path_to_victory(target, &SolverConfig::default())
                    .context("path-to-victory analysis failed")?,
            )
        }
        None => None,
    };

    let projection = match args.projection_runs {
        Some(runs) => Some(
            snapshot
                .project(scenarios, &config, runs)
                .context("points projection failed")?,
        ),
        None => None,
    };

    let report = RunReport {
        season: snapshot.season,
        as_of: args.as_of,
        remaining_events: snapshot.remaining.len(),
        simulation,
        victory,
        projection,
    };
    write_report(args, &report)
}

fn simulation_config(args: &Args) -> Result<SimulationConfig> {
    ensure!(args.iterations > 0, "--iterations must be at least 1");
    ensure!(args.workers > 0, "--workers must be at least 1");
    let config = SimulationConfig {
        iterations: args.iterations,
        mode: args.mode.into(),
        unpredictability: args.unpredictability,
        seed: args.seed,
        workers: args.workers,
        retry_budget: args.retry_budget,
        ..SimulationConfig::default()
    };
    config.validate().context("invalid simulation settings")?;
    Ok(config)
}

fn load_scenarios(args: &Args, field: &gridcalc_engine::Field) -> Result<ScenarioSet> {
    let mut scenarios = match &args.scenario {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ScenarioSet::from_json(&json)
                .with_context(|| format!("failed to parse scenario file {}", path.display()))?
        }
        None => ScenarioSet::new(),
    };
    let tokens: Vec<String> = args
        .constraints
        .iter()
        .flat_map(|raw| split_csv(raw))
        .collect();
    apply_constraints(&mut scenarios, &tokens, field)?;
    Ok(scenarios)
}

fn write_report(args: &Args, report: &RunReport) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => reports::generate_console_report(&mut output_target, report)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
