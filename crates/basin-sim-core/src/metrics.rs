use crate::classifier::BasinLabel;
use crate::store::AgentStore;
use serde::{Deserialize, Serialize};

/// One record of the time series. Event counts cover the `interval_cycles`
/// cycles since the previous record.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MetricsSample {
    pub cycle: usize,
    pub interval_cycles: usize,
    pub population_size: usize,
    pub population_sizes: Vec<usize>,
    pub energy_total: f64,
    /// Mean energy per live agent; `None` with no live agents.
    pub energy_density: Option<f64>,
    pub composition_count: u64,
    pub decomposition_count: u64,
    pub spawn_attempts: u64,
    pub spawn_successes: u64,
    pub deaths: u64,
    pub migrations: u64,
    pub graph_edges: usize,
}

/// Append-only; one record per sampling interval plus one on termination.
pub type MetricsSeries = Vec<MetricsSample>;

/// Event counters accumulated by the clock between two samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntervalCounters {
    pub composition: u64,
    pub decomposition: u64,
    pub spawn_attempts: u64,
    pub spawn_successes: u64,
    pub deaths: u64,
    pub migrations: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    CycleLimit,
    PopulationCap,
    Extinction,
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminationReason::CycleLimit => "cycle_limit",
            TerminationReason::PopulationCap => "population_cap",
            TerminationReason::Extinction => "extinction",
            TerminationReason::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub spawn_frequency: f64,
    pub seed: u64,
    pub cycles_completed: usize,
    pub final_population: usize,
    /// Mean composition events per cycle over the whole run.
    pub avg_composition_events: f64,
    pub avg_decomposition_events: f64,
    pub basin: BasinLabel,
    pub termination_reason: TerminationReason,
    #[serde(default)]
    pub spawn_attempts: u64,
    #[serde(default)]
    pub spawn_successes: u64,
    /// η; `None` when no spawn was attempted.
    #[serde(default)]
    pub spawn_success_rate: Option<f64>,
    #[serde(default)]
    pub composition_total: u64,
    #[serde(default)]
    pub decomposition_total: u64,
    #[serde(default)]
    pub migrations_total: u64,
    #[serde(default)]
    pub deaths_total: u64,
    #[serde(default)]
    pub runtime_ms: u64,
    #[serde(default)]
    pub samples: MetricsSeries,
}

pub fn collect_sample(
    cycle: usize,
    interval_cycles: usize,
    store: &AgentStore,
    counters: &IntervalCounters,
    graph_edges: usize,
) -> MetricsSample {
    let population_size = store.len();
    let energy_total = store.total_energy();
    let energy_density = (population_size > 0).then(|| energy_total / population_size as f64);
    MetricsSample {
        cycle,
        interval_cycles,
        population_size,
        population_sizes: store.population_sizes(),
        energy_total,
        energy_density,
        composition_count: counters.composition,
        decomposition_count: counters.decomposition,
        spawn_attempts: counters.spawn_attempts,
        spawn_successes: counters.spawn_successes,
        deaths: counters.deaths,
        migrations: counters.migrations,
        graph_edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PopulationId;

    #[test]
    fn empty_store_has_no_energy_density() {
        let store = AgentStore::new(2);
        let sample = collect_sample(10, 10, &store, &IntervalCounters::default(), 0);
        assert_eq!(sample.population_size, 0);
        assert_eq!(sample.population_sizes, vec![0, 0]);
        assert_eq!(sample.energy_density, None);
    }

    #[test]
    fn sample_reports_per_population_sizes_and_density() {
        let mut store = AgentStore::new(2);
        store.create_agent(PopulationId(0), 30.0, 0.1, 0).unwrap();
        store.create_agent(PopulationId(1), 50.0, 0.2, 0).unwrap();
        store.create_agent(PopulationId(1), 40.0, 0.3, 0).unwrap();
        let counters = IntervalCounters {
            composition: 3,
            deaths: 1,
            ..IntervalCounters::default()
        };
        let sample = collect_sample(20, 10, &store, &counters, 2);
        assert_eq!(sample.population_sizes, vec![1, 2]);
        assert_eq!(sample.energy_total, 120.0);
        assert_eq!(sample.energy_density, Some(40.0));
        assert_eq!(sample.composition_count, 3);
        assert_eq!(sample.deaths, 1);
        assert_eq!(sample.graph_edges, 2);
    }

    #[test]
    fn termination_reason_serializes_snake_case() {
        let json = serde_json::to_string(&TerminationReason::PopulationCap).unwrap();
        assert_eq!(json, "\"population_cap\"");
        assert_eq!(TerminationReason::CycleLimit.to_string(), "cycle_limit");
    }

    #[test]
    fn sample_tolerates_missing_fields() {
        let sample: MetricsSample = serde_json::from_str(r#"{"cycle": 5}"#).unwrap();
        assert_eq!(sample.cycle, 5);
        assert_eq!(sample.energy_density, None);
    }
}
