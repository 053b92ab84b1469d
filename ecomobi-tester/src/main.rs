mod driver;
mod logic;
mod routing;
mod util;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use driver::{SharedSession, TripReport};
use ecomobi_game::{
    Catalog, EmbeddedCatalogLoader, GameEngine, Level, LevelId, RouteSource, TransportId,
};
use logic::{LogicTester, ScenarioResult, scenarios};
use routing::{OfflineRouter, OsrmRouter, RouteProvider};
use util::split_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Headless logic scenarios on a virtual clock (fast)
    Logic,
    /// Real-time trips with live routing lookups
    Live,
    /// Run both logic and live tests
    Both,
}

#[derive(Debug, Parser)]
#[command(name = "ecomobi-tester", version)]
#[command(about = "Automated QA for the Eco-Mobilite trip game: logic scenarios and live trips")]
struct Args {
    /// Test mode: logic (fast), live (real time and routing), or both
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed (logic mode only)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    // Live-mode options
    /// Level to drive in live mode (defaults to every level)
    #[arg(long)]
    level: Option<u32>,

    /// Transport for live trips (defaults to each level's recommendation)
    #[arg(long)]
    transport: Option<TransportId>,

    /// Base URL of an OSRM-compatible routing service
    #[arg(long, default_value = "https://router.project-osrm.org")]
    routing_url: String,

    /// Routing request timeout in seconds
    #[arg(long, default_value_t = 5)]
    routing_timeout_secs: u64,

    /// Skip routing lookups; every live trip uses the straight line
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = parse_seeds(&args.seeds)?;

    let mut all_results = run_logic_scenarios(&args, &scenarios, &seeds);
    all_results.extend(run_live_trips(&args).await?);

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for scenario in scenarios::all() {
        writeln!(
            output_target.writer(),
            "  {:25} - {}",
            scenario.key,
            scenario.description
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🚲 Eco-Mobilite Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for scenario in scenarios::all() {
            if !scenarios.iter().any(|s| s == scenario.key) {
                scenarios.push(scenario.key.to_string());
            }
        }
    }
    scenarios
}

fn parse_seeds(seeds_arg: &str) -> Result<Vec<u64>> {
    split_csv(seeds_arg)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{token}'"))
        })
        .collect()
}

fn run_logic_scenarios(args: &Args, scenarios: &[String], seeds: &[u64]) -> Vec<ScenarioResult> {
    let mut results: Vec<ScenarioResult> = Vec::new();
    if !matches!(args.mode, TestMode::Logic | TestMode::Both) {
        return results;
    }

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(args.verbose);

    for scenario_name in scenarios {
        if let Some(scenario) = scenarios::find(scenario_name) {
            results.extend(logic_tester.run_scenario(scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn build_provider(args: &Args) -> Result<Box<dyn RouteProvider>> {
    if args.offline {
        return Ok(Box::new(OfflineRouter));
    }
    let router = OsrmRouter::new(
        args.routing_url.clone(),
        Duration::from_secs(args.routing_timeout_secs),
    )?;
    Ok(Box::new(router))
}

fn live_targets(args: &Args, catalog: &Catalog) -> Result<Vec<(LevelId, TransportId)>> {
    let levels: Vec<&Level> = match args.level {
        Some(id) => {
            let level = catalog
                .level(LevelId(id))
                .ok_or_else(|| anyhow!("unknown level {id}"))?;
            vec![level]
        }
        None => catalog.levels().iter().collect(),
    };
    let fallback = catalog
        .eco_friendly()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("catalog lists no transports"))?;
    Ok(levels
        .into_iter()
        .map(|level| {
            let transport = args
                .transport
                .or(level.recommended_transport)
                .unwrap_or(fallback);
            (level.id, transport)
        })
        .collect())
}

fn live_result(
    level: LevelId,
    transport: TransportId,
    outcome: Result<TripReport, driver::DriverError>,
    started: Instant,
) -> ScenarioResult {
    let name = format!("live level {level} by {transport}");
    match outcome {
        Ok(report) => {
            let notes = vec![
                format!(
                    "route={} points={}",
                    match report.route_source {
                        RouteSource::Fetched => "fetched",
                        RouteSource::Fallback => "fallback",
                    },
                    report.route_points
                ),
                format!(
                    "frames={} verdict={} points={:+} eco_score={}",
                    report.frames, report.verdict, report.points, report.eco_score
                ),
            ];
            let error = (!report.arrived)
                .then(|| format!("trip stopped at {} before the destination", report.final_position));
            ScenarioResult::single(name, error, report.elapsed, notes)
        }
        Err(err) => ScenarioResult::single(name, Some(err.to_string()), started.elapsed(), Vec::new()),
    }
}

async fn run_live_trips(args: &Args) -> Result<Vec<ScenarioResult>> {
    let mut results = Vec::new();
    if !matches!(args.mode, TestMode::Live | TestMode::Both) {
        return Ok(results);
    }

    println!("{}", "🗺️  Running Live Trips".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let session = GameEngine::new(EmbeddedCatalogLoader)
        .create_session()
        .context("failed to create trip session")?;
    let targets = live_targets(args, session.catalog())?;
    let provider = build_provider(args)?;
    let shared: SharedSession = Arc::new(Mutex::new(session));

    for (level, transport) in targets {
        if args.verbose {
            println!("  ▶ level {level} by {transport} via {}", provider.label());
        }
        let started = Instant::now();
        let outcome = driver::run_level(&shared, provider.as_ref(), level, transport).await;
        results.push(live_result(level, transport, outcome, started));
    }

    Ok(results)
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, results)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
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
