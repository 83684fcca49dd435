use anyhow::{Context, Result};
use basin_sim_core::batch::{run_batch, seed_grid, summarize_sweep, CancelToken};
use basin_sim_core::config::{InteractionScope, PairScanMode, SimulationConfig};
use basin_sim_core::metrics::RunSummary;
use basin_sim_core::SimulationClock;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

const BENCHMARK_CYCLES: usize = 200;

#[derive(Parser)]
#[command(name = "basin-sim")]
#[command(about = "Multi-population basin simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for summary.json (prints to stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Override the config seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Replicate a config across spawn frequencies and seeds in parallel
    Sweep {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Spawn frequencies in percent
        #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 2.0, 5.0, 10.0])]
        frequencies: Vec<f64>,

        /// Replicates per frequency
        #[arg(long, default_value_t = 5)]
        replicates: usize,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare exhaustive and trait-index pair scans
    Benchmark {
        /// Agents per population
        #[arg(long, default_value_t = 400)]
        agents: usize,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let file = File::open(path).with_context(|| format!("failed to open config {path:?}"))?;
    let config: SimulationConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

fn write_json<T: serde::Serialize>(out: Option<&Path>, name: &str, value: &T) -> Result<()> {
    match out {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("failed to create output directory")?;
            let path = dir.join(name);
            let file = File::create(&path).context("failed to create output file")?;
            serde_json::to_writer_pretty(file, value).context("failed to write output")?;
            tracing::info!(path = %path.display(), "wrote results");
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn timed_run(config: SimulationConfig) -> Result<(RunSummary, f64)> {
    let mut clock = SimulationClock::new(config).context("benchmark config validation error")?;
    let start = Instant::now();
    let summary = clock.run().context("simulation failed")?;
    let per_cycle_us = start.elapsed().as_micros() as f64 / summary.cycles_completed.max(1) as f64;
    Ok((summary, per_cycle_us))
}

fn run_benchmark(agents: usize) -> Result<()> {
    let base = SimulationConfig {
        initial_agents_per_population: agents,
        cycles: BENCHMARK_CYCLES,
        sample_interval: BENCHMARK_CYCLES,
        spawn_frequency: 0.0,
        interaction_scope: InteractionScope::WithinPopulation,
        composition_threshold: 0.99,
        composition_cost: 0.0,
        ..SimulationConfig::default()
    };
    println!("--- {agents} agents, {BENCHMARK_CYCLES} cycles ---");
    let mut trajectories = Vec::new();
    for mode in [PairScanMode::Exhaustive, PairScanMode::TraitIndex] {
        let (summary, per_cycle_us) = timed_run(SimulationConfig {
            pair_scan: mode,
            ..base.clone()
        })?;
        println!(
            "  {mode:?}: {per_cycle_us:.0} us/cycle, compositions={}",
            summary.composition_total
        );
        trajectories.push(summary.samples);
    }
    if trajectories.windows(2).any(|w| w[0] != w[1]) {
        anyhow::bail!("pair scans disagree on the trajectory");
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimulationConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run { config, out, seed } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let mut clock = SimulationClock::new(config).context("config validation error")?;
            let summary = clock.run().context("simulation failed")?;
            tracing::info!(
                cycles = summary.cycles_completed,
                final_population = summary.final_population,
                basin = %summary.basin,
                reason = %summary.termination_reason,
                "run complete"
            );
            write_json(out.as_deref(), "summary.json", &summary)?;
        }
        Commands::Sweep {
            config,
            frequencies,
            replicates,
            out,
        } => {
            let base = load_config(config.as_deref())?;
            let grid = seed_grid(&base, &frequencies, replicates);
            let summaries = run_batch(&grid, &CancelToken::new())
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .context("sweep job failed")?;
            let points = summarize_sweep(&summaries);
            if let Some(dir) = out.as_deref() {
                write_json(Some(dir), "runs.json", &summaries)?;
            }
            write_json(out.as_deref(), "sweep.json", &points)?;
        }
        Commands::Benchmark { agents } => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p basin-sim-cli --release -- benchmark");
                eprintln!();
            }
            run_benchmark(agents)?;
        }
    }
    Ok(())
}
