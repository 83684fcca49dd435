use super::super::SimulationClock;
use crate::store::StoreError;

impl SimulationClock {
    pub(in crate::clock) fn step_migration_phase(&mut self, cycle: usize) -> Result<(), StoreError> {
        let Some(router) = self.router.as_ref() else {
            return Ok(());
        };
        let moved = router.route(&mut self.store, &mut self.rng, cycle)? as u64;
        self.interval.migrations += moved;
        self.totals.migrations += moved;
        Ok(())
    }
}
