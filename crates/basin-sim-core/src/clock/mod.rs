use crate::agent::PopulationId;
use crate::batch::CancelToken;
use crate::classifier::BasinClassifier;
use crate::config::{RechargeOrder, SimConfigError, SimulationConfig};
use crate::energy::EnergyLedger;
use crate::interaction::{CompositionGraph, InteractionEngine};
use crate::metrics::{IntervalCounters, MetricsSeries, RunSummary, TerminationReason};
use crate::migration::MigrationRouter;
use crate::spawn::{SpawnScheduler, SpawnStats};
use crate::store::{AgentStore, StoreError};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Initialized,
    Running,
    Terminated(TerminationReason),
}

impl ClockState {
    pub fn is_terminated(self) -> bool {
        matches!(self, ClockState::Terminated(_))
    }

    /// `None` until the clock has terminated.
    pub fn termination_reason(self) -> Option<TerminationReason> {
        match self {
            ClockState::Terminated(reason) => Some(reason),
            ClockState::Initialized | ClockState::Running => None,
        }
    }
}

/// Drives one simulation instance. Owns every piece of mutable state, including
/// the only RNG, so a `(config, seed)` pair fully determines the trajectory.
pub struct SimulationClock {
    config: SimulationConfig,
    store: AgentStore,
    ledger: EnergyLedger,
    interactions: InteractionEngine,
    spawner: SpawnScheduler,
    router: Option<MigrationRouter>,
    graph: Option<CompositionGraph>,
    classifier: BasinClassifier,
    rng: ChaCha12Rng,
    series: MetricsSeries,
    state: ClockState,
    cycle: usize,
    last_sample_cycle: usize,
    interval: IntervalCounters,
    totals: IntervalCounters,
    cancel: Option<CancelToken>,
}

impl std::fmt::Debug for SimulationClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationClock")
            .field("seed", &self.config.seed)
            .field("state", &self.state)
            .field("cycle", &self.cycle)
            .field("population", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl SimulationClock {
    /// Validate `config` and seed the initial populations. Nothing is built on error.
    pub fn new(config: SimulationConfig) -> Result<Self, SimConfigError> {
        config.validate()?;
        let mut rng = crate::rng::create_rng(config.seed);
        let mut store = AgentStore::new(config.num_populations);
        for idx in 0..config.num_populations {
            let population_id = PopulationId(idx as u16);
            for _ in 0..config.initial_agents_per_population {
                let trait_value = rng.random_range(0.0..config.trait_span);
                store
                    .create_agent(population_id, config.initial_energy, trait_value, 0)
                    .map_err(|_| SimConfigError::AgentCountOverflow)?;
            }
        }

        Ok(Self {
            ledger: EnergyLedger::from_config(&config),
            interactions: InteractionEngine::from_config(&config),
            spawner: SpawnScheduler::from_config(&config),
            router: MigrationRouter::from_config(&config),
            graph: config.track_composition_graph.then(CompositionGraph::new),
            classifier: BasinClassifier::from_config(&config),
            series: Vec::with_capacity(config.expected_samples()),
            state: ClockState::Initialized,
            cycle: 0,
            last_sample_cycle: 0,
            interval: IntervalCounters::default(),
            totals: IntervalCounters::default(),
            cancel: None,
            config,
            store,
            rng,
        })
    }

    /// Observe `token` at the top of every `step()`.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Cycles completed so far.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    pub fn series(&self) -> &MetricsSeries {
        &self.series
    }

    pub fn graph(&self) -> Option<&CompositionGraph> {
        self.graph.as_ref()
    }

    pub fn spawn_stats(&self) -> SpawnStats {
        self.spawner.stats()
    }

    pub fn migration_enabled(&self) -> bool {
        self.router.is_some()
    }

    /// Run one cycle of the pipeline. Calling it after termination is a no-op.
    pub fn step(&mut self) -> Result<ClockState, StoreError> {
        if self.state.is_terminated() {
            return Ok(self.state);
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            self.terminate(TerminationReason::Cancelled);
            return Ok(self.state);
        }

        self.state = ClockState::Running;
        self.cycle += 1;
        let cycle = self.cycle;

        if self.config.recharge_order == RechargeOrder::BeforeSpawn {
            self.step_recharge_phase();
        }
        self.step_spawn_phase(cycle)?;
        self.step_interaction_phase(cycle);
        self.step_death_phase()?;
        self.step_migration_phase(cycle)?;

        let finished = if self.store.is_empty() {
            Some(TerminationReason::Extinction)
        } else if self.store.len() > self.config.population_cap {
            tracing::trace!(
                cycle,
                population = self.store.len(),
                cap = self.config.population_cap,
                "population cap exceeded"
            );
            Some(TerminationReason::PopulationCap)
        } else if cycle >= self.config.cycles {
            Some(TerminationReason::CycleLimit)
        } else {
            None
        };

        match finished {
            Some(reason) => self.terminate(reason),
            None if cycle % self.config.sample_interval == 0 => self.record_sample(),
            None => {}
        }
        Ok(self.state)
    }

    /// Step until termination and summarize the run.
    pub fn run(&mut self) -> Result<RunSummary, StoreError> {
        let start = Instant::now();
        let termination_reason = loop {
            if let Some(reason) = self.step()?.termination_reason() {
                break reason;
            }
        };
        Ok(self.summary(termination_reason, start.elapsed().as_millis() as u64))
    }

    /// Summary of a terminated run. `basin` is classified from the recorded series.
    fn summary(&self, termination_reason: TerminationReason, runtime_ms: u64) -> RunSummary {
        let per_cycle = |total: u64| {
            if self.cycle == 0 {
                0.0
            } else {
                total as f64 / self.cycle as f64
            }
        };
        let stats = self.spawner.stats();
        RunSummary {
            schema_version: 1,
            spawn_frequency: self.config.spawn_frequency,
            seed: self.config.seed,
            cycles_completed: self.cycle,
            final_population: self.store.len(),
            avg_composition_events: per_cycle(self.totals.composition),
            avg_decomposition_events: per_cycle(self.totals.decomposition),
            basin: self.classifier.classify(&self.series),
            termination_reason,
            spawn_attempts: stats.attempts,
            spawn_successes: stats.successes,
            spawn_success_rate: stats.success_rate(),
            composition_total: self.totals.composition,
            decomposition_total: self.totals.decomposition,
            migrations_total: self.totals.migrations,
            deaths_total: self.totals.deaths,
            runtime_ms,
            samples: self.series.clone(),
        }
    }

    fn terminate(&mut self, reason: TerminationReason) {
        if self.cycle > self.last_sample_cycle {
            self.record_sample();
        }
        self.state = ClockState::Terminated(reason);
        tracing::debug!(
            seed = self.config.seed,
            cycle = self.cycle,
            population = self.store.len(),
            reason = %reason,
            "simulation terminated"
        );
    }

    fn record_sample(&mut self) {
        let graph_edges = self.graph.as_ref().map_or(0, CompositionGraph::edge_count);
        self.series.push(crate::metrics::collect_sample(
            self.cycle,
            self.cycle - self.last_sample_cycle,
            &self.store,
            &self.interval,
            graph_edges,
        ));
        self.last_sample_cycle = self.cycle;
        self.interval = IntervalCounters::default();
    }
}

mod phases;
