use crate::agent::{Agent, AgentId, PopulationId};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("population {0} does not exist")]
    UnknownPopulation(PopulationId),
    #[error("agent {agent} is not a member of population {population}")]
    UnknownAgent {
        agent: AgentId,
        population: PopulationId,
    },
    #[error("source and destination population are both {0}")]
    SelfTransfer(PopulationId),
    #[error("agent id space exhausted")]
    IdExhausted,
}

/// A population owns its agents; membership is exclusive across populations.
#[derive(Clone, Debug)]
pub struct Population {
    id: PopulationId,
    // Ordered by id so iteration (and therefore every RNG-indexed pick) is deterministic.
    agents: BTreeMap<AgentId, Agent>,
}

impl Population {
    pub fn new(id: PopulationId) -> Self {
        Self {
            id,
            agents: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> PopulationId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Agent at position `index` in id order.
    pub fn nth(&self, index: usize) -> Option<&Agent> {
        self.agents.values().nth(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    pub fn total_energy(&self) -> f64 {
        self.agents.values().map(|a| a.energy).sum()
    }

    fn insert(&mut self, mut agent: Agent) {
        agent.population_id = self.id;
        self.agents.insert(agent.id, agent);
    }

    fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }
}

/// Owns every live agent of a run, grouped by population, and hands out ids.
#[derive(Clone, Debug)]
pub struct AgentStore {
    populations: Vec<Population>,
    next_agent_id: u64,
}

impl AgentStore {
    pub fn new(num_populations: usize) -> Self {
        assert!(
            num_populations <= crate::constants::MAX_POPULATIONS,
            "population count exceeds u16 id space"
        );
        let populations = (0..num_populations)
            .map(|idx| Population::new(PopulationId(idx as u16)))
            .collect();
        Self {
            populations,
            next_agent_id: 0,
        }
    }

    /// Allocate a fresh id and insert a new agent into `population_id`.
    pub fn create_agent(
        &mut self,
        population_id: PopulationId,
        initial_energy: f64,
        trait_value: f64,
        birth_cycle: usize,
    ) -> Result<Agent, StoreError> {
        if population_id.index() >= self.populations.len() {
            return Err(StoreError::UnknownPopulation(population_id));
        }
        let id = self.next_agent_id_checked()?;
        let agent = Agent::new(id, population_id, initial_energy, trait_value, birth_cycle);
        self.populations[population_id.index()].insert(agent.clone());
        Ok(agent)
    }

    /// Delete an agent. Removing an absent agent is an error, not a no-op.
    pub fn remove_agent(
        &mut self,
        agent_id: AgentId,
        population_id: PopulationId,
    ) -> Result<Agent, StoreError> {
        self.population_mut(population_id)?
            .remove(agent_id)
            .ok_or(StoreError::UnknownAgent {
                agent: agent_id,
                population: population_id,
            })
    }

    /// Snapshot of a population's agents in id order; safe to iterate while mutating the store.
    pub fn all_agents(&self, population_id: PopulationId) -> Result<Vec<Agent>, StoreError> {
        Ok(self.population(population_id)?.iter().cloned().collect())
    }

    /// Move an agent between populations. The agent is never present in both.
    pub fn transfer(
        &mut self,
        agent_id: AgentId,
        from: PopulationId,
        to: PopulationId,
    ) -> Result<(), StoreError> {
        if from == to {
            return Err(StoreError::SelfTransfer(from));
        }
        if to.index() >= self.populations.len() {
            return Err(StoreError::UnknownPopulation(to));
        }
        let agent = self.remove_agent(agent_id, from)?;
        self.populations[to.index()].insert(agent);
        Ok(())
    }

    pub fn contains(&self, agent_id: AgentId, population_id: PopulationId) -> bool {
        self.populations
            .get(population_id.index())
            .is_some_and(|p| p.contains(agent_id))
    }

    pub fn get(&self, agent_id: AgentId, population_id: PopulationId) -> Option<&Agent> {
        self.populations
            .get(population_id.index())
            .and_then(|p| p.get(agent_id))
    }

    pub fn get_mut(&mut self, agent_id: AgentId, population_id: PopulationId) -> Option<&mut Agent> {
        self.populations
            .get_mut(population_id.index())
            .and_then(|p| p.get_mut(agent_id))
    }

    pub fn population(&self, population_id: PopulationId) -> Result<&Population, StoreError> {
        self.populations
            .get(population_id.index())
            .ok_or(StoreError::UnknownPopulation(population_id))
    }

    pub fn population_mut(
        &mut self,
        population_id: PopulationId,
    ) -> Result<&mut Population, StoreError> {
        self.populations
            .get_mut(population_id.index())
            .ok_or(StoreError::UnknownPopulation(population_id))
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn populations_mut(&mut self) -> &mut [Population] {
        &mut self.populations
    }

    pub fn population_ids(&self) -> impl Iterator<Item = PopulationId> + '_ {
        self.populations.iter().map(|p| p.id())
    }

    pub fn num_populations(&self) -> usize {
        self.populations.len()
    }

    pub fn population_len(&self, population_id: PopulationId) -> usize {
        self.populations
            .get(population_id.index())
            .map_or(0, Population::len)
    }

    pub fn population_sizes(&self) -> Vec<usize> {
        self.populations.iter().map(Population::len).collect()
    }

    /// Live agents over all populations.
    pub fn len(&self) -> usize {
        self.populations.iter().map(Population::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.populations.iter().all(Population::is_empty)
    }

    pub fn total_energy(&self) -> f64 {
        self.populations.iter().map(Population::total_energy).sum()
    }

    /// Next id that `create_agent` would hand out.
    pub fn peek_next_id(&self) -> AgentId {
        AgentId(self.next_agent_id)
    }

    fn next_agent_id_checked(&mut self) -> Result<AgentId, StoreError> {
        if self.next_agent_id == u64::MAX {
            return Err(StoreError::IdExhausted);
        }
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        Ok(id)
    }
}
