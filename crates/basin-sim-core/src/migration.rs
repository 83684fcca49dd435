use crate::agent::PopulationId;
use crate::config::SimulationConfig;
use crate::spawn::{trigger_from_percent, Trigger};
use crate::store::{AgentStore, StoreError};
use rand::Rng;
use rand_chacha::ChaCha12Rng;

/// Moves agents between populations. Only constructed when there is somewhere to move to.
pub struct MigrationRouter {
    trigger: Box<dyn Trigger>,
    batch: usize,
}

impl MigrationRouter {
    /// `None` when fewer than two populations exist or the rate is zero.
    pub fn from_config(config: &SimulationConfig) -> Option<Self> {
        if config.num_populations < 2 {
            return None;
        }
        let trigger = trigger_from_percent(config.migration_policy, config.migration_rate * 100.0)?;
        Some(Self {
            trigger,
            batch: config.migration_batch,
        })
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Fire the trigger once for this cycle and perform up to `batch` transfers.
    /// Returns the number of agents moved.
    pub fn route(
        &self,
        store: &mut AgentStore,
        rng: &mut ChaCha12Rng,
        cycle: usize,
    ) -> Result<usize, StoreError> {
        if store.num_populations() < 2 || !self.trigger.fires(cycle, rng) {
            return Ok(0);
        }
        let mut moved = 0;
        for _ in 0..self.batch {
            let sources: Vec<PopulationId> = store
                .populations()
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| p.id())
                .collect();
            if sources.is_empty() {
                break;
            }
            let from = sources[rng.random_range(0..sources.len())];

            // Uniform over the other populations: draw from n - 1 slots and skip the source.
            let mut to_index = rng.random_range(0..store.num_populations() - 1);
            if to_index >= from.index() {
                to_index += 1;
            }
            let to = PopulationId(to_index as u16);

            let source = store.population(from)?;
            let pick = rng.random_range(0..source.len());
            let Some(agent_id) = source.nth(pick).map(|a| a.id) else {
                break;
            };
            store.transfer(agent_id, from, to)?;
            tracing::trace!(cycle, agent = %agent_id, %from, %to, "migrated agent");
            moved += 1;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulePolicy;
    use crate::rng::create_rng;

    fn config(num_populations: usize, rate: f64, batch: usize) -> SimulationConfig {
        SimulationConfig {
            num_populations,
            migration_policy: SchedulePolicy::Interval,
            migration_rate: rate,
            migration_batch: batch,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn router_absent_without_rate_or_partner_population() {
        assert!(MigrationRouter::from_config(&config(3, 0.0, 1)).is_none());
        assert!(MigrationRouter::from_config(&config(1, 0.5, 1)).is_none());
        assert!(MigrationRouter::from_config(&config(2, 0.5, 1)).is_some());
    }

    #[test]
    fn transfers_preserve_total_and_change_membership() {
        let router = MigrationRouter::from_config(&config(3, 1.0, 4)).unwrap();
        let mut store = AgentStore::new(3);
        for i in 0..6 {
            store
                .create_agent(PopulationId(0), 40.0, i as f64 / 6.0, 0)
                .unwrap();
        }
        let mut rng = create_rng(5);
        let moved = router.route(&mut store, &mut rng, 1).unwrap();
        assert_eq!(moved, 4);
        assert_eq!(store.len(), 6);
        assert_eq!(store.population_sizes().iter().sum::<usize>(), 6);
        for population in store.populations() {
            for agent in population.iter() {
                assert_eq!(agent.population_id, population.id());
            }
        }
    }

    #[test]
    fn single_transfer_moves_agent_to_the_other_population() {
        let router = MigrationRouter::from_config(&config(2, 1.0, 1)).unwrap();
        let mut store = AgentStore::new(2);
        for i in 0..6 {
            store
                .create_agent(PopulationId(0), 40.0, i as f64 / 6.0, 0)
                .unwrap();
        }
        let mut rng = create_rng(5);
        assert_eq!(router.route(&mut store, &mut rng, 1).unwrap(), 1);
        assert_eq!(store.population_len(PopulationId(0)), 5);
        assert_eq!(store.population_len(PopulationId(1)), 1);
        let moved = store.population(PopulationId(1)).unwrap().iter().next().unwrap();
        assert_eq!(moved.population_id, PopulationId(1));
    }

    #[test]
    fn interval_router_waits_for_its_cycle() {
        let router = MigrationRouter::from_config(&config(2, 0.25, 1)).unwrap();
        let mut store = AgentStore::new(2);
        store.create_agent(PopulationId(0), 40.0, 0.5, 0).unwrap();
        let mut rng = create_rng(1);
        assert_eq!(router.route(&mut store, &mut rng, 1).unwrap(), 0);
        assert_eq!(router.route(&mut store, &mut rng, 4).unwrap(), 1);
        assert_eq!(store.population_len(PopulationId(1)), 1);
    }

    #[test]
    fn empty_store_moves_nothing() {
        let router = MigrationRouter::from_config(&config(2, 1.0, 3)).unwrap();
        let mut store = AgentStore::new(2);
        let mut rng = create_rng(1);
        assert_eq!(router.route(&mut store, &mut rng, 1).unwrap(), 0);
    }
}
