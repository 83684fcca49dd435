use super::super::SimulationClock;
use crate::spawn::SpawnOutcome;
use crate::store::StoreError;

impl SimulationClock {
    /// One spawn decision per population, in ascending population id.
    pub(in crate::clock) fn step_spawn_phase(&mut self, cycle: usize) -> Result<(), StoreError> {
        if !self.spawner.is_enabled() {
            return Ok(());
        }
        let population_ids: Vec<_> = self.store.population_ids().collect();
        for population_id in population_ids {
            let outcome = self.spawner.attempt(
                &mut self.store,
                population_id,
                &self.ledger,
                self.interactions.metric(),
                &mut self.rng,
                cycle,
            )?;
            match outcome {
                SpawnOutcome::NotScheduled | SpawnOutcome::NoParent => {}
                SpawnOutcome::Failed { .. } => {
                    self.interval.spawn_attempts += 1;
                    self.totals.spawn_attempts += 1;
                }
                SpawnOutcome::Born { .. } => {
                    self.interval.spawn_attempts += 1;
                    self.interval.spawn_successes += 1;
                    self.totals.spawn_attempts += 1;
                    self.totals.spawn_successes += 1;
                }
            }
        }
        Ok(())
    }
}
