use super::super::SimulationClock;
use crate::config::InteractionScope;

impl SimulationClock {
    /// Composition over every group, then decomposition over every group.
    pub(in crate::clock) fn step_interaction_phase(&mut self, cycle: usize) {
        if self.interactions.scope() == InteractionScope::Off {
            return;
        }
        let groups = self.interactions.groups(&self.store);

        let mut composed = 0u64;
        for members in &groups {
            let events = self
                .interactions
                .compose(&mut self.store, members, &self.ledger, cycle);
            composed += events.len() as u64;
            if let Some(graph) = self.graph.as_mut() {
                graph.apply(&events);
            }
        }

        let mut decomposed = 0u64;
        for members in &groups {
            let events = self
                .interactions
                .decompose(&mut self.store, members, &self.ledger, cycle);
            decomposed += events.len() as u64;
            if let Some(graph) = self.graph.as_mut() {
                graph.apply(&events);
            }
        }

        self.interval.composition += composed;
        self.interval.decomposition += decomposed;
        self.totals.composition += composed;
        self.totals.decomposition += decomposed;
    }
}
