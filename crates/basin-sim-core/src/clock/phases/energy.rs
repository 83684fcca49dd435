use super::super::SimulationClock;
use crate::config::RechargeOrder;
use crate::store::StoreError;

impl SimulationClock {
    /// Consume energy and remove every agent the ledger flags as depleted.
    pub(in crate::clock) fn step_death_phase(&mut self) -> Result<(), StoreError> {
        let recharge = match self.config.recharge_order {
            RechargeOrder::BeforeDeathCheck => Some(self.config.recharge_rate),
            RechargeOrder::BeforeSpawn => None,
        };
        let consume = self.config.consume_rate;

        let mut dead = Vec::new();
        for population in self.store.populations_mut() {
            let population_id = population.id();
            for agent in population.iter_mut() {
                if let Some(rate) = recharge {
                    self.ledger.recharge(agent, rate);
                }
                if self.ledger.consume(agent, consume) {
                    dead.push((agent.id, population_id));
                }
            }
        }

        for (agent_id, population_id) in &dead {
            self.store.remove_agent(*agent_id, *population_id)?;
            if let Some(graph) = self.graph.as_mut() {
                graph.remove_agent(*agent_id);
            }
        }
        self.interval.deaths += dead.len() as u64;
        self.totals.deaths += dead.len() as u64;
        Ok(())
    }
}
