use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, monotonically assigned agent identifier. Never reused within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a population within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationId(pub u16);

impl PopulationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PopulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Scalar energy balance; kept within `[0, energy_cap]` by the ledger.
    pub energy: f64,
    /// Depth/phase value compared by the interaction metric.
    pub trait_value: f64,
    /// Owning population. Rewritten only by a migration transfer.
    pub population_id: PopulationId,
    pub birth_cycle: usize,
}

impl Agent {
    pub fn new(
        id: AgentId,
        population_id: PopulationId,
        energy: f64,
        trait_value: f64,
        birth_cycle: usize,
    ) -> Self {
        Self {
            id,
            energy,
            trait_value,
            population_id,
            birth_cycle,
        }
    }

    pub fn age(&self, cycle: usize) -> usize {
        cycle.saturating_sub(self.birth_cycle)
    }
}
