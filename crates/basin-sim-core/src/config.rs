use serde::{Deserialize, Serialize};

/// Where the per-cycle recharge runs relative to spawning and the death check.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RechargeOrder {
    /// Recharge at the top of the cycle, before spawning. Death is checked after consume only.
    #[default]
    BeforeSpawn,
    /// Recharge immediately before consume, inside the death phase.
    BeforeDeathCheck,
}

/// How a per-cycle trigger (spawn or migration) decides to fire.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Fire every `max(1, round(1/p))` cycles.
    #[default]
    Interval,
    /// Fire when one uniform draw falls below `p`.
    Probabilistic,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraitDomain {
    /// Traits live in `[0, trait_span]`; distance is `|a - b| / trait_span`.
    #[default]
    Linear,
    /// Traits are phases in `[0, trait_span)`; distance wraps around.
    Circular,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionScope {
    /// No composition or decomposition passes run.
    Off,
    /// Pairs are drawn from inside each population.
    WithinPopulation,
    /// Pairs must span two distinct populations. A single population sees no events.
    #[default]
    AcrossPopulations,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PairScanMode {
    /// Enumerate every `i < j` pair.
    #[default]
    Exhaustive,
    /// Query an R*-tree over trait values for near pairs.
    TraitIndex,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BasinMetric {
    #[default]
    PopulationSize,
    /// Composition events per cycle.
    CompositionRate,
    /// Mean energy per live agent.
    EnergyDensity,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Number of populations. Migration requires at least two.
    pub num_populations: usize,
    /// Agents created in every population at cycle 0.
    pub initial_agents_per_population: usize,
    /// Cycle count after which the run terminates.
    pub cycles: usize,
    /// Cycles between metrics samples. A final sample is always recorded.
    pub sample_interval: usize,
    /// Hard cap on live agents summed over all populations; exceeding it aborts the run.
    pub population_cap: usize,
    /// Upper clamp for any agent's energy.
    pub energy_cap: f64,
    /// Energy of agents created at initialization.
    pub initial_energy: f64,
    /// Agents whose energy drops below this after consume are removed.
    pub death_threshold: f64,
    /// Energy added to every agent once per cycle.
    pub recharge_rate: f64,
    /// Energy removed from every agent once per cycle.
    pub consume_rate: f64,
    /// Position of the recharge step within the cycle pipeline.
    pub recharge_order: RechargeOrder,
    /// Selects interval or probabilistic spawn triggering.
    pub spawn_policy: SchedulePolicy,
    /// Spawn frequency in percent (`f_pct`). 0 disables spawning.
    pub spawn_frequency: f64,
    /// Energy the parent pays for a successful spawn.
    pub spawn_cost: f64,
    /// Energy assigned to a newly spawned child.
    pub spawn_child_energy: f64,
    /// Child trait perturbation bound, as a fraction of `trait_span`.
    pub spawn_trait_jitter: f64,
    /// Linear depth or circular phase trait space.
    pub trait_domain: TraitDomain,
    /// Width of the trait space (e.g. 1.0 for depth, 2π for phase).
    pub trait_span: f64,
    /// Which pairs the interaction passes consider.
    pub interaction_scope: InteractionScope,
    /// Pair enumeration strategy used by the composition pass.
    pub pair_scan: PairScanMode,
    /// Minimum similarity for a composition event.
    pub composition_threshold: f64,
    /// Energy each partner pays for a composition event.
    pub composition_cost: f64,
    /// Minimum normalized distance for a decomposition event.
    pub decomposition_threshold: f64,
    /// Energy each partner gains from a decomposition event.
    pub decomposition_gain: f64,
    /// Maintain the composition edge set across cycles.
    pub track_composition_graph: bool,
    /// Selects interval or probabilistic migration triggering.
    pub migration_policy: SchedulePolicy,
    /// Migration frequency as a fraction in `[0, 1]` (`f_migrate`).
    pub migration_rate: f64,
    /// Maximum transfers per firing.
    pub migration_batch: usize,
    /// Series reduced by the basin classifier.
    pub basin_metric: BasinMetric,
    /// Trailing fraction of the recorded cycle span used by the classifier.
    pub basin_window_fraction: f64,
    /// Boundary between the low and high basins.
    pub basin_threshold: f64,
    /// Optional second boundary splitting off a high basin above a mid basin.
    pub basin_upper_threshold: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_populations: 1,
            initial_agents_per_population: 10,
            cycles: 3_000,
            sample_interval: 10,
            population_cap: 10_000,
            energy_cap: 100.0,
            initial_energy: 50.0,
            death_threshold: 20.0,
            recharge_rate: 1.0,
            consume_rate: 0.5,
            recharge_order: RechargeOrder::BeforeSpawn,
            spawn_policy: SchedulePolicy::Interval,
            spawn_frequency: 5.0,
            spawn_cost: 10.0,
            spawn_child_energy: 50.0,
            spawn_trait_jitter: 0.05,
            trait_domain: TraitDomain::Linear,
            trait_span: 1.0,
            interaction_scope: InteractionScope::AcrossPopulations,
            pair_scan: PairScanMode::Exhaustive,
            composition_threshold: 0.9,
            composition_cost: 1.0,
            decomposition_threshold: 0.5,
            decomposition_gain: 0.5,
            track_composition_graph: false,
            migration_policy: SchedulePolicy::Probabilistic,
            migration_rate: 0.0,
            migration_batch: 1,
            basin_metric: BasinMetric::PopulationSize,
            basin_window_fraction: 0.1,
            basin_threshold: 50.0,
            basin_upper_threshold: None,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidNumPopulations => "num_populations must be greater than 0";
    TooManyPopulations { max: usize, actual: usize } => "Too many populations: {} > max {}", actual, max;
    InvalidInitialAgents => "initial_agents_per_population must be greater than 0";
    AgentCountOverflow => "Total agent count overflow";
    InitialAgentsExceedCap { cap: usize, actual: usize } => "initial agent count ({actual}) exceeds population_cap ({cap})";
    InvalidCycles => "cycles must be greater than 0";
    TooManyCycles { max: usize, actual: usize } => "cycles ({actual}) exceed supported maximum ({max})";
    InvalidSampleInterval => "sample_interval must be greater than 0";
    TooManySamples { max: usize, actual: usize } => "sample count ({actual}) exceeds supported maximum ({max})";
    InvalidPopulationCap => "population_cap must be greater than 0";
    PopulationCapTooLarge { max: usize, actual: usize } => "population_cap ({actual}) exceeds supported maximum ({max})";
    InvalidEnergyCap => "energy_cap must be finite and positive";
    InvalidInitialEnergy => "initial_energy must be finite and within [0, energy_cap]";
    InvalidDeathThreshold => "death_threshold must be finite and within [0, energy_cap]";
    InvalidRechargeRate => "recharge_rate must be finite and non-negative";
    InvalidConsumeRate => "consume_rate must be finite and non-negative";
    InvalidSpawnFrequency => "spawn_frequency must be finite and within [0,100]";
    InvalidSpawnCost => "spawn_cost must be finite and non-negative";
    InvalidSpawnChildEnergy => "spawn_child_energy must be finite and within [0, energy_cap]";
    InvalidSpawnTraitJitter => "spawn_trait_jitter must be finite and within [0,1]";
    InvalidTraitSpan => "trait_span must be finite and positive";
    InvalidCompositionThreshold => "composition_threshold must be finite and within [0,1]";
    InvalidCompositionCost => "composition_cost must be finite and non-negative";
    InvalidDecompositionThreshold => "decomposition_threshold must be finite and within [0,1]";
    InvalidDecompositionGain => "decomposition_gain must be finite and non-negative";
    InvalidMigrationRate => "migration_rate must be finite and within [0,1]";
    MigrationRequiresMultiplePopulations => "migration_rate > 0 requires num_populations >= 2";
    InvalidMigrationBatch => "migration_batch must be greater than 0";
    InvalidBasinWindowFraction => "basin_window_fraction must be finite and within (0,1]";
    InvalidBasinThreshold => "basin_threshold must be finite and non-negative";
    InvalidBasinUpperThreshold => "basin_upper_threshold must be finite and greater than basin_threshold";
}

impl std::error::Error for SimConfigError {}

impl SimulationConfig {
    pub const MAX_CYCLES: usize = crate::constants::MAX_CYCLES;

    pub const MAX_POPULATIONS: usize = crate::constants::MAX_POPULATIONS;

    pub const MAX_TOTAL_AGENTS: usize = crate::constants::MAX_TOTAL_AGENTS;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_populations()?;
        self.validate_cycles()?;
        self.validate_energy()?;
        self.validate_spawn()?;
        self.validate_traits()?;
        self.validate_interaction()?;
        self.validate_migration()?;
        self.validate_basin()?;
        Ok(())
    }

    /// Number of metrics samples a full-length run records.
    pub fn expected_samples(&self) -> usize {
        if self.cycles == 0 || self.sample_interval == 0 {
            return 0;
        }
        let periodic = self.cycles / self.sample_interval;
        if self.cycles % self.sample_interval == 0 {
            periodic
        } else {
            periodic + 1
        }
    }

    fn validate_populations(&self) -> Result<(), SimConfigError> {
        if self.num_populations == 0 {
            return Err(SimConfigError::InvalidNumPopulations);
        }
        if self.num_populations > Self::MAX_POPULATIONS {
            return Err(SimConfigError::TooManyPopulations {
                max: Self::MAX_POPULATIONS,
                actual: self.num_populations,
            });
        }
        if self.initial_agents_per_population == 0 {
            return Err(SimConfigError::InvalidInitialAgents);
        }
        if self.population_cap == 0 {
            return Err(SimConfigError::InvalidPopulationCap);
        }
        if self.population_cap > Self::MAX_TOTAL_AGENTS {
            return Err(SimConfigError::PopulationCapTooLarge {
                max: Self::MAX_TOTAL_AGENTS,
                actual: self.population_cap,
            });
        }
        let initial_total = self
            .num_populations
            .checked_mul(self.initial_agents_per_population)
            .ok_or(SimConfigError::AgentCountOverflow)?;
        if initial_total > self.population_cap {
            return Err(SimConfigError::InitialAgentsExceedCap {
                cap: self.population_cap,
                actual: initial_total,
            });
        }
        Ok(())
    }

    fn validate_cycles(&self) -> Result<(), SimConfigError> {
        if self.cycles == 0 {
            return Err(SimConfigError::InvalidCycles);
        }
        if self.cycles > Self::MAX_CYCLES {
            return Err(SimConfigError::TooManyCycles {
                max: Self::MAX_CYCLES,
                actual: self.cycles,
            });
        }
        if self.sample_interval == 0 {
            return Err(SimConfigError::InvalidSampleInterval);
        }
        let samples = self.expected_samples();
        if samples > crate::constants::MAX_SAMPLES {
            return Err(SimConfigError::TooManySamples {
                max: crate::constants::MAX_SAMPLES,
                actual: samples,
            });
        }
        Ok(())
    }

    fn validate_energy(&self) -> Result<(), SimConfigError> {
        if !(self.energy_cap.is_finite() && self.energy_cap > 0.0) {
            return Err(SimConfigError::InvalidEnergyCap);
        }
        if !(self.initial_energy.is_finite()
            && (0.0..=self.energy_cap).contains(&self.initial_energy))
        {
            return Err(SimConfigError::InvalidInitialEnergy);
        }
        if !(self.death_threshold.is_finite()
            && (0.0..=self.energy_cap).contains(&self.death_threshold))
        {
            return Err(SimConfigError::InvalidDeathThreshold);
        }
        if !(self.recharge_rate.is_finite() && self.recharge_rate >= 0.0) {
            return Err(SimConfigError::InvalidRechargeRate);
        }
        if !(self.consume_rate.is_finite() && self.consume_rate >= 0.0) {
            return Err(SimConfigError::InvalidConsumeRate);
        }
        Ok(())
    }

    fn validate_spawn(&self) -> Result<(), SimConfigError> {
        if !(self.spawn_frequency.is_finite() && (0.0..=100.0).contains(&self.spawn_frequency)) {
            return Err(SimConfigError::InvalidSpawnFrequency);
        }
        if !(self.spawn_cost.is_finite() && self.spawn_cost >= 0.0) {
            return Err(SimConfigError::InvalidSpawnCost);
        }
        if !(self.spawn_child_energy.is_finite()
            && (0.0..=self.energy_cap).contains(&self.spawn_child_energy))
        {
            return Err(SimConfigError::InvalidSpawnChildEnergy);
        }
        if !(self.spawn_trait_jitter.is_finite() && (0.0..=1.0).contains(&self.spawn_trait_jitter))
        {
            return Err(SimConfigError::InvalidSpawnTraitJitter);
        }
        Ok(())
    }

    fn validate_traits(&self) -> Result<(), SimConfigError> {
        if !(self.trait_span.is_finite() && self.trait_span > 0.0) {
            return Err(SimConfigError::InvalidTraitSpan);
        }
        Ok(())
    }

    fn validate_interaction(&self) -> Result<(), SimConfigError> {
        if !(self.composition_threshold.is_finite()
            && (0.0..=1.0).contains(&self.composition_threshold))
        {
            return Err(SimConfigError::InvalidCompositionThreshold);
        }
        if !(self.composition_cost.is_finite() && self.composition_cost >= 0.0) {
            return Err(SimConfigError::InvalidCompositionCost);
        }
        if !(self.decomposition_threshold.is_finite()
            && (0.0..=1.0).contains(&self.decomposition_threshold))
        {
            return Err(SimConfigError::InvalidDecompositionThreshold);
        }
        if !(self.decomposition_gain.is_finite() && self.decomposition_gain >= 0.0) {
            return Err(SimConfigError::InvalidDecompositionGain);
        }
        Ok(())
    }

    fn validate_migration(&self) -> Result<(), SimConfigError> {
        if !(self.migration_rate.is_finite() && (0.0..=1.0).contains(&self.migration_rate)) {
            return Err(SimConfigError::InvalidMigrationRate);
        }
        if self.migration_rate > 0.0 && self.num_populations < 2 {
            return Err(SimConfigError::MigrationRequiresMultiplePopulations);
        }
        if self.migration_batch == 0 {
            return Err(SimConfigError::InvalidMigrationBatch);
        }
        Ok(())
    }

    fn validate_basin(&self) -> Result<(), SimConfigError> {
        if !(self.basin_window_fraction.is_finite()
            && self.basin_window_fraction > 0.0
            && self.basin_window_fraction <= 1.0)
        {
            return Err(SimConfigError::InvalidBasinWindowFraction);
        }
        if !(self.basin_threshold.is_finite() && self.basin_threshold >= 0.0) {
            return Err(SimConfigError::InvalidBasinThreshold);
        }
        if let Some(upper) = self.basin_upper_threshold {
            if !(upper.is_finite() && upper > self.basin_threshold) {
                return Err(SimConfigError::InvalidBasinUpperThreshold);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_default() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_migration_with_single_population() {
        let config = SimulationConfig {
            num_populations: 1,
            migration_rate: 0.1,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::MigrationRequiresMultiplePopulations)
        );
    }

    #[test]
    fn validate_accepts_zero_migration_with_many_populations() {
        let config = SimulationConfig {
            num_populations: 10,
            migration_rate: 0.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_rates() {
        let config = SimulationConfig {
            recharge_rate: -1.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidRechargeRate));

        let config = SimulationConfig {
            consume_rate: f64::NAN,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidConsumeRate));
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        let config = SimulationConfig {
            composition_threshold: 1.5,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidCompositionThreshold)
        );

        let config = SimulationConfig {
            death_threshold: 150.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidDeathThreshold));

        let config = SimulationConfig {
            basin_upper_threshold: Some(10.0),
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidBasinUpperThreshold)
        );
    }

    #[test]
    fn validate_rejects_invalid_counts() {
        let config = SimulationConfig {
            num_populations: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidNumPopulations));

        let config = SimulationConfig {
            num_populations: 4,
            initial_agents_per_population: 10,
            population_cap: 20,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InitialAgentsExceedCap { cap: 20, actual: 40 })
        ));

        let config = SimulationConfig {
            sample_interval: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidSampleInterval));
    }

    #[test]
    fn expected_samples_counts_trailing_partial_interval() {
        let config = SimulationConfig {
            cycles: 105,
            sample_interval: 10,
            ..SimulationConfig::default()
        };
        assert_eq!(config.expected_samples(), 11);

        let config = SimulationConfig {
            cycles: 100,
            sample_interval: 10,
            ..SimulationConfig::default()
        };
        assert_eq!(config.expected_samples(), 10);
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{
            "seed": 7,
            "num_populations": 3,
            "spawn_policy": "probabilistic",
            "interaction_scope": "within_population"
        }"#;
        let cfg: SimulationConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.num_populations, 3);
        assert_eq!(cfg.spawn_policy, SchedulePolicy::Probabilistic);
        assert_eq!(cfg.interaction_scope, InteractionScope::WithinPopulation);
        assert_eq!(cfg.recharge_order, RechargeOrder::BeforeSpawn);
        assert_eq!(cfg.pair_scan, PairScanMode::Exhaustive);
        assert_eq!(cfg.migration_rate, 0.0);
        assert!(cfg.basin_upper_threshold.is_none());
    }

    #[test]
    fn interactions_run_across_populations_by_default() {
        let cfg: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.interaction_scope, InteractionScope::AcrossPopulations);
        assert_eq!(
            SimulationConfig::default().interaction_scope,
            InteractionScope::AcrossPopulations
        );
    }

    #[test]
    fn deserialize_rejects_unknown_scope() {
        let json = r#"{ "interaction_scope": "everywhere" }"#;
        assert!(serde_json::from_str::<SimulationConfig>(json).is_err());
    }

    #[test]
    fn error_display_messages_are_preserved() {
        let cases = vec![
            (
                SimConfigError::InvalidNumPopulations,
                "num_populations must be greater than 0",
            ),
            (
                SimConfigError::TooManyPopulations {
                    max: 10,
                    actual: 20,
                },
                "Too many populations: 20 > max 10",
            ),
            (
                SimConfigError::InitialAgentsExceedCap {
                    cap: 5,
                    actual: 8,
                },
                "initial agent count (8) exceeds population_cap (5)",
            ),
            (
                SimConfigError::MigrationRequiresMultiplePopulations,
                "migration_rate > 0 requires num_populations >= 2",
            ),
            (
                SimConfigError::TooManyCycles {
                    max: 100,
                    actual: 200,
                },
                "cycles (200) exceed supported maximum (100)",
            ),
            (
                SimConfigError::InvalidSpawnFrequency,
                "spawn_frequency must be finite and within [0,100]",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
