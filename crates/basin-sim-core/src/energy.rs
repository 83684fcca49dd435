use crate::agent::Agent;
use crate::config::SimulationConfig;

/// Per-agent energy bookkeeping. Holds only the bounds; every operation
/// mutates the agent it is handed and nothing else.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyLedger {
    cap: f64,
    death_threshold: f64,
}

impl EnergyLedger {
    pub fn new(cap: f64, death_threshold: f64) -> Self {
        assert!(cap.is_finite() && cap > 0.0, "energy cap must be positive");
        assert!(
            death_threshold.is_finite() && death_threshold >= 0.0,
            "death threshold must be non-negative"
        );
        Self {
            cap,
            death_threshold,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.energy_cap, config.death_threshold)
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    pub fn death_threshold(&self) -> f64 {
        self.death_threshold
    }

    /// Add `rate` to the agent's energy, clamped to the cap.
    pub fn recharge(&self, agent: &mut Agent, rate: f64) {
        assert!(
            rate.is_finite() && rate >= 0.0,
            "recharge rate must be finite and non-negative, got {rate}"
        );
        agent.energy = (agent.energy + rate).min(self.cap);
    }

    /// Subtract `rate` (flooring at zero) and report whether the agent must be removed.
    pub fn consume(&self, agent: &mut Agent, rate: f64) -> bool {
        assert!(
            rate.is_finite() && rate >= 0.0,
            "consume rate must be finite and non-negative, got {rate}"
        );
        agent.energy = (agent.energy - rate).max(0.0);
        self.is_depleted(agent)
    }

    /// Deduct `cost` if the agent can pay it in full. No mutation on failure.
    pub fn spend(&self, agent: &mut Agent, cost: f64) -> bool {
        assert!(
            cost.is_finite() && cost >= 0.0,
            "spend cost must be finite and non-negative, got {cost}"
        );
        if !self.can_afford(agent, cost) {
            return false;
        }
        agent.energy -= cost;
        true
    }

    pub fn can_afford(&self, agent: &Agent, cost: f64) -> bool {
        agent.energy >= cost
    }

    /// Below the death threshold, or fully exhausted.
    pub fn is_depleted(&self, agent: &Agent) -> bool {
        agent.energy < self.death_threshold || agent.energy <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, PopulationId};
    use proptest::prelude::*;

    fn agent_with(energy: f64) -> Agent {
        Agent::new(AgentId(0), PopulationId(0), energy, 0.5, 0)
    }

    #[test]
    fn recharge_clamps_to_cap() {
        let ledger = EnergyLedger::new(100.0, 20.0);
        let mut agent = agent_with(99.5);
        ledger.recharge(&mut agent, 1.0);
        assert_eq!(agent.energy, 100.0);
    }

    #[test]
    fn consume_flags_agent_below_threshold() {
        let ledger = EnergyLedger::new(100.0, 20.0);
        let mut agent = agent_with(20.4);
        assert!(!ledger.consume(&mut agent, 0.4));
        assert!((agent.energy - 20.0).abs() < 1e-12);
        assert!(ledger.consume(&mut agent, 0.5));
    }

    #[test]
    fn consume_floors_at_zero_and_flags_exhaustion() {
        let ledger = EnergyLedger::new(100.0, 0.0);
        let mut agent = agent_with(0.3);
        assert!(ledger.consume(&mut agent, 1.0));
        assert_eq!(agent.energy, 0.0);
    }

    #[test]
    fn spend_refuses_without_mutation() {
        let ledger = EnergyLedger::new(100.0, 20.0);
        let mut agent = agent_with(9.0);
        assert!(!ledger.spend(&mut agent, 10.0));
        assert_eq!(agent.energy, 9.0);
        assert!(ledger.spend(&mut agent, 9.0));
        assert_eq!(agent.energy, 0.0);
    }

    #[test]
    #[should_panic(expected = "recharge rate must be finite and non-negative")]
    fn recharge_panics_on_negative_rate() {
        let ledger = EnergyLedger::new(100.0, 20.0);
        let mut agent = agent_with(50.0);
        ledger.recharge(&mut agent, -1.0);
    }

    #[test]
    #[should_panic(expected = "consume rate must be finite and non-negative")]
    fn consume_panics_on_negative_rate() {
        let ledger = EnergyLedger::new(100.0, 20.0);
        let mut agent = agent_with(50.0);
        ledger.consume(&mut agent, -0.5);
    }

    proptest! {
        #[test]
        fn proptest_energy_stays_within_bounds(
            start in 0.0f64..100.0,
            ops in proptest::collection::vec((0u8..3, 0.0f64..40.0), 1..64),
        ) {
            let ledger = EnergyLedger::new(100.0, 0.0);
            let mut agent = agent_with(start);
            for (op, amount) in ops {
                match op {
                    0 => ledger.recharge(&mut agent, amount),
                    1 => {
                        let _ = ledger.consume(&mut agent, amount);
                    }
                    _ => {
                        let before = agent.energy;
                        let paid = ledger.spend(&mut agent, amount);
                        prop_assert_eq!(paid, before >= amount);
                    }
                }
                prop_assert!(agent.energy >= 0.0 && agent.energy <= 100.0);
            }
        }
    }
}
