//! Replication across (seed × parameter) grids.
//!
//! Each job builds its own `SimulationClock`, so jobs share nothing except the
//! cancellation flag and can run on any rayon worker in any order.

use crate::classifier::BasinLabel;
use crate::clock::SimulationClock;
use crate::config::{SimConfigError, SimulationConfig};
use crate::metrics::RunSummary;
use crate::rng::derive_seed;
use crate::store::StoreError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Cycle-granular cancellation shared between a caller and running clocks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid config: {0}")]
    Config(#[from] SimConfigError),
    #[error("simulation failed: {0}")]
    Store(#[from] StoreError),
}

/// Run one config to completion.
pub fn run_one(config: SimulationConfig, cancel: &CancelToken) -> Result<RunSummary, BatchError> {
    let mut clock = SimulationClock::new(config)?.with_cancel_token(cancel.clone());
    Ok(clock.run()?)
}

/// Run every config on the rayon pool. Results keep the input order.
pub fn run_batch(
    configs: &[SimulationConfig],
    cancel: &CancelToken,
) -> Vec<Result<RunSummary, BatchError>> {
    tracing::info!(jobs = configs.len(), "starting batch");
    let results: Vec<_> = configs
        .par_iter()
        .map(|config| run_one(config.clone(), cancel))
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::info!(
        jobs = results.len(),
        failed,
        cancelled = cancel.is_cancelled(),
        "batch finished"
    );
    results
}

/// Expand `base` into `frequencies.len() * replicates` configs, frequency-major.
pub fn seed_grid(
    base: &SimulationConfig,
    frequencies: &[f64],
    replicates: usize,
) -> Vec<SimulationConfig> {
    frequencies
        .iter()
        .flat_map(|&spawn_frequency| {
            (0..replicates).map(move |replicate| SimulationConfig {
                spawn_frequency,
                seed: derive_seed(base.seed, replicate),
                ..base.clone()
            })
        })
        .collect()
}

/// Aggregate of all runs sharing one spawn frequency.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SweepPoint {
    pub spawn_frequency: f64,
    pub runs: usize,
    pub mean_final_population: f64,
    pub mean_composition_events: f64,
    /// Mean η over runs that attempted at least one spawn.
    pub mean_spawn_success_rate: Option<f64>,
    pub basin_counts: BTreeMap<BasinLabel, usize>,
}

/// Group summaries by spawn frequency, ascending.
pub fn summarize_sweep(summaries: &[RunSummary]) -> Vec<SweepPoint> {
    let mut sorted: Vec<&RunSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| a.spawn_frequency.total_cmp(&b.spawn_frequency));

    sorted
        .chunk_by(|a, b| a.spawn_frequency == b.spawn_frequency)
        .map(|group| {
            let runs = group.len();
            let mean_final_population =
                group.iter().map(|s| s.final_population as f64).sum::<f64>() / runs as f64;
            let mean_composition_events =
                group.iter().map(|s| s.avg_composition_events).sum::<f64>() / runs as f64;
            let rates: Vec<f64> = group.iter().filter_map(|s| s.spawn_success_rate).collect();
            let mut basin_counts = BTreeMap::new();
            for s in group {
                *basin_counts.entry(s.basin).or_insert(0) += 1;
            }
            SweepPoint {
                spawn_frequency: group[0].spawn_frequency,
                runs,
                mean_final_population,
                mean_composition_events,
                mean_spawn_success_rate: (!rates.is_empty())
                    .then(|| rates.iter().sum::<f64>() / rates.len() as f64),
                basin_counts,
            }
        })
        .collect()
}
