use crate::agent::{AgentId, PopulationId};
use crate::config::{SchedulePolicy, SimulationConfig};
use crate::energy::EnergyLedger;
use crate::interaction::TraitMetric;
use crate::store::{AgentStore, StoreError};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Per-cycle firing rule shared by spawning and migration.
pub trait Trigger: Send + Sync {
    fn fires(&self, cycle: usize, rng: &mut ChaCha12Rng) -> bool;
}

/// Deterministic: fires when `cycle % interval == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalTrigger {
    interval: usize,
}

impl IntervalTrigger {
    /// `interval = max(1, round(100 / percent))`.
    pub fn from_percent(percent: f64) -> Self {
        assert!(
            percent.is_finite() && percent > 0.0,
            "interval trigger needs a positive frequency"
        );
        let interval = (100.0 / percent).round().max(1.0) as usize;
        Self { interval }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

impl Trigger for IntervalTrigger {
    fn fires(&self, cycle: usize, _rng: &mut ChaCha12Rng) -> bool {
        cycle % self.interval == 0
    }
}

/// Stochastic: one uniform draw per call, fires when it falls below `probability`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbabilisticTrigger {
    probability: f64,
}

impl ProbabilisticTrigger {
    pub fn from_percent(percent: f64) -> Self {
        assert!(
            percent.is_finite() && (0.0..=100.0).contains(&percent),
            "probabilistic trigger needs a frequency within [0,100]"
        );
        Self {
            probability: percent / 100.0,
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Trigger for ProbabilisticTrigger {
    fn fires(&self, _cycle: usize, rng: &mut ChaCha12Rng) -> bool {
        rng.random::<f64>() < self.probability
    }
}

/// Build the trigger for a frequency given in percent. Zero disables it.
pub fn trigger_from_percent(policy: SchedulePolicy, percent: f64) -> Option<Box<dyn Trigger>> {
    if percent <= 0.0 {
        return None;
    }
    Some(match policy {
        SchedulePolicy::Interval => Box::new(IntervalTrigger::from_percent(percent)),
        SchedulePolicy::Probabilistic => Box::new(ProbabilisticTrigger::from_percent(percent)),
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnStats {
    pub attempts: u64,
    pub successes: u64,
}

impl SpawnStats {
    /// η = successes / attempts; `None` before the first attempt.
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.successes as f64 / self.attempts as f64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The trigger did not fire this cycle.
    NotScheduled,
    /// The trigger fired but the population had no parent to choose.
    NoParent,
    /// The chosen parent could not pay the spawn cost.
    Failed { parent: AgentId },
    Born { parent: AgentId, child: AgentId },
}

pub struct SpawnScheduler {
    trigger: Option<Box<dyn Trigger>>,
    cost: f64,
    child_energy: f64,
    trait_jitter: f64,
    stats: SpawnStats,
}

impl SpawnScheduler {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            trigger: trigger_from_percent(config.spawn_policy, config.spawn_frequency),
            cost: config.spawn_cost,
            child_energy: config.spawn_child_energy,
            trait_jitter: config.spawn_trait_jitter * config.trait_span,
            stats: SpawnStats::default(),
        }
    }

    pub fn stats(&self) -> SpawnStats {
        self.stats
    }

    pub fn is_enabled(&self) -> bool {
        self.trigger.is_some()
    }

    /// Run one birth attempt decision for `population_id`.
    pub fn attempt(
        &mut self,
        store: &mut AgentStore,
        population_id: PopulationId,
        ledger: &EnergyLedger,
        metric: &dyn TraitMetric,
        rng: &mut ChaCha12Rng,
        cycle: usize,
    ) -> Result<SpawnOutcome, StoreError> {
        let Some(trigger) = self.trigger.as_ref() else {
            return Ok(SpawnOutcome::NotScheduled);
        };
        if !trigger.fires(cycle, rng) {
            return Ok(SpawnOutcome::NotScheduled);
        }

        let population = store.population(population_id)?;
        if population.is_empty() {
            return Ok(SpawnOutcome::NoParent);
        }
        let pick = rng.random_range(0..population.len());
        let Some((parent, parent_trait)) = population.nth(pick).map(|a| (a.id, a.trait_value))
        else {
            return Ok(SpawnOutcome::NoParent);
        };

        self.stats.attempts += 1;
        let paid = store
            .get_mut(parent, population_id)
            .is_some_and(|agent| ledger.spend(agent, self.cost));
        if !paid {
            return Ok(SpawnOutcome::Failed { parent });
        }

        let jitter = if self.trait_jitter > 0.0 {
            rng.random_range(-self.trait_jitter..=self.trait_jitter)
        } else {
            0.0
        };
        let child_trait = metric.fold(parent_trait + jitter);
        let child = store.create_agent(population_id, self.child_energy, child_trait, cycle)?;
        self.stats.successes += 1;
        Ok(SpawnOutcome::Born {
            parent,
            child: child.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::LinearMetric;
    use crate::rng::create_rng;

    #[test]
    fn interval_matches_rounded_reciprocal() {
        assert_eq!(IntervalTrigger::from_percent(5.0).interval(), 20);
        assert_eq!(IntervalTrigger::from_percent(3.0).interval(), 33);
        assert_eq!(IntervalTrigger::from_percent(100.0).interval(), 1);
        assert_eq!(IntervalTrigger::from_percent(90.0).interval(), 1);
    }

    #[test]
    fn interval_trigger_is_deterministic() {
        let trigger = IntervalTrigger::from_percent(25.0);
        let mut rng = create_rng(0);
        let fired: Vec<usize> = (1..=12).filter(|&c| trigger.fires(c, &mut rng)).collect();
        assert_eq!(fired, vec![4, 8, 12]);
    }

    #[test]
    fn probabilistic_trigger_rate_tracks_frequency() {
        let trigger = ProbabilisticTrigger::from_percent(20.0);
        let mut rng = create_rng(11);
        let fired = (0..20_000).filter(|&c| trigger.fires(c, &mut rng)).count();
        let rate = fired as f64 / 20_000.0;
        assert!((rate - 0.2).abs() < 0.02, "observed rate {rate}");
    }

    #[test]
    fn zero_frequency_disables_trigger() {
        assert!(trigger_from_percent(SchedulePolicy::Interval, 0.0).is_none());
        assert!(trigger_from_percent(SchedulePolicy::Probabilistic, 0.0).is_none());
    }

    fn scheduler(cost: f64) -> SpawnScheduler {
        let config = SimulationConfig {
            spawn_frequency: 100.0,
            spawn_cost: cost,
            spawn_child_energy: 30.0,
            ..SimulationConfig::default()
        };
        SpawnScheduler::from_config(&config)
    }

    #[test]
    fn successful_spawn_charges_parent_and_inherits_population() {
        let mut scheduler = scheduler(10.0);
        let ledger = EnergyLedger::new(100.0, 20.0);
        let metric = LinearMetric::new(1.0);
        let mut store = AgentStore::new(1);
        let parent = store.create_agent(PopulationId(0), 50.0, 0.5, 0).unwrap();
        let mut rng = create_rng(3);

        let outcome = scheduler
            .attempt(&mut store, PopulationId(0), &ledger, &metric, &mut rng, 1)
            .unwrap();
        let SpawnOutcome::Born { parent: p, child } = outcome else {
            panic!("expected a birth, got {outcome:?}");
        };
        assert_eq!(p, parent.id);
        assert_eq!(store.get(parent.id, PopulationId(0)).unwrap().energy, 40.0);
        let child = store.get(child, PopulationId(0)).unwrap();
        assert_eq!(child.energy, 30.0);
        assert_eq!(child.birth_cycle, 1);
        assert!((child.trait_value - 0.5).abs() <= 0.05 + 1e-12);
        assert_eq!(scheduler.stats().successes, 1);
        assert_eq!(scheduler.stats().success_rate(), Some(1.0));
    }

    #[test]
    fn unaffordable_spawn_counts_failed_attempt() {
        let mut scheduler = scheduler(60.0);
        let ledger = EnergyLedger::new(100.0, 20.0);
        let metric = LinearMetric::new(1.0);
        let mut store = AgentStore::new(1);
        store.create_agent(PopulationId(0), 50.0, 0.5, 0).unwrap();
        let mut rng = create_rng(3);

        let outcome = scheduler
            .attempt(&mut store, PopulationId(0), &ledger, &metric, &mut rng, 1)
            .unwrap();
        assert!(matches!(outcome, SpawnOutcome::Failed { .. }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.populations()[0].nth(0).unwrap().energy, 50.0);
        assert_eq!(
            scheduler.stats(),
            SpawnStats {
                attempts: 1,
                successes: 0
            }
        );
        assert_eq!(scheduler.stats().success_rate(), Some(0.0));
    }

    #[test]
    fn empty_population_is_not_an_attempt() {
        let mut scheduler = scheduler(10.0);
        let ledger = EnergyLedger::new(100.0, 20.0);
        let metric = LinearMetric::new(1.0);
        let mut store = AgentStore::new(1);
        let mut rng = create_rng(3);
        let outcome = scheduler
            .attempt(&mut store, PopulationId(0), &ledger, &metric, &mut rng, 1)
            .unwrap();
        assert_eq!(outcome, SpawnOutcome::NoParent);
        assert_eq!(scheduler.stats().attempts, 0);
        assert_eq!(scheduler.stats().success_rate(), None);
    }
}
