use basin_sim_core::classifier::{classify, BasinCriteria};
use basin_sim_core::config::{BasinMetric, InteractionScope, SimulationConfig};
use basin_sim_core::metrics::{MetricsSample, TerminationReason};
use basin_sim_core::{BasinLabel, SimulationClock};

#[test]
fn single_population_growth_regime() {
    let config = SimulationConfig {
        num_populations: 1,
        spawn_frequency: 5.0,
        spawn_cost: 10.0,
        initial_energy: 50.0,
        death_threshold: 20.0,
        cycles: 3000,
        seed: 42,
        interaction_scope: InteractionScope::AcrossPopulations,
        ..SimulationConfig::default()
    };
    let initial = config.initial_agents_per_population;
    let summary = SimulationClock::new(config).unwrap().run().unwrap();

    assert_eq!(summary.termination_reason, TerminationReason::CycleLimit);
    assert_eq!(summary.cycles_completed, 3000);
    assert!(summary.final_population > initial);
    assert_eq!(summary.composition_total, 0);
    assert_eq!(summary.decomposition_total, 0);
    assert_eq!(summary.avg_composition_events, 0.0);
    assert_eq!(summary.migrations_total, 0);
    assert!(summary.spawn_successes > 0);
}

#[test]
fn ten_populations_without_migration_finish() {
    let config = SimulationConfig {
        num_populations: 10,
        migration_rate: 0.0,
        cycles: 1000,
        ..SimulationConfig::default()
    };
    let summary = SimulationClock::new(config).unwrap().run().unwrap();
    assert!(matches!(
        summary.termination_reason,
        TerminationReason::CycleLimit | TerminationReason::Extinction
    ));
    assert!(summary.cycles_completed <= 1000);
    assert_eq!(summary.migrations_total, 0);
    assert!(summary
        .samples
        .iter()
        .all(|s| s.migrations == 0 && s.population_sizes.len() == 10));
}

#[test]
fn all_zero_window_classifies_as_extinct() {
    let series: Vec<MetricsSample> = (1..=100)
        .map(|k| MetricsSample {
            cycle: k * 10,
            interval_cycles: 10,
            population_sizes: vec![0],
            ..MetricsSample::default()
        })
        .collect();
    let criteria = BasinCriteria {
        metric: BasinMetric::PopulationSize,
        window_fraction: 0.1,
        threshold: 5.0,
        upper_threshold: None,
    };
    assert_eq!(classify(&series, &criteria), BasinLabel::Extinct);
}

#[test]
fn growing_run_without_compositions_is_low_not_extinct() {
    let config = SimulationConfig {
        cycles: 1000,
        basin_metric: BasinMetric::CompositionRate,
        basin_threshold: 0.5,
        ..SimulationConfig::default()
    };
    let summary = SimulationClock::new(config).unwrap().run().unwrap();
    assert_eq!(summary.termination_reason, TerminationReason::CycleLimit);
    assert!(summary.final_population > 0);
    assert_eq!(summary.composition_total, 0);
    assert_eq!(summary.basin, BasinLabel::Low);
}

#[test]
fn summary_serializes_with_downstream_field_names() {
    let config = SimulationConfig {
        cycles: 50,
        ..SimulationConfig::default()
    };
    let summary = SimulationClock::new(config).unwrap().run().unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    for key in [
        "spawn_frequency",
        "seed",
        "final_population",
        "avg_composition_events",
        "basin",
        "termination_reason",
        "samples",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["termination_reason"], "cycle_limit");
}
