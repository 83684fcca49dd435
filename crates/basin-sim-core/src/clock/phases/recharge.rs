use super::super::SimulationClock;

impl SimulationClock {
    /// Add `recharge_rate` to every live agent, clamped to the energy cap.
    pub(in crate::clock) fn step_recharge_phase(&mut self) {
        let rate = self.config.recharge_rate;
        for population in self.store.populations_mut() {
            for agent in population.iter_mut() {
                self.ledger.recharge(agent, rate);
            }
        }
    }
}
