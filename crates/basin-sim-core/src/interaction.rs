//! Pairwise composition/decomposition checks.
//!
//! A pass takes a group snapshot (id-ordered), asks a [`PairScan`] for candidate
//! `i < j` pairs, filters them with the exact metric predicate, and applies the
//! energy effects in canonical `(lower id, higher id)` order. Candidate order and
//! store iteration order therefore never change the outcome.

use crate::agent::{AgentId, PopulationId};
use crate::config::{InteractionScope, PairScanMode, SimulationConfig, TraitDomain};
use crate::energy::EnergyLedger;
use crate::store::AgentStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized distance between two trait values, in `[0, 1]`.
pub trait TraitMetric: Send + Sync {
    fn distance(&self, a: f64, b: f64) -> f64;

    fn similarity(&self, a: f64, b: f64) -> f64 {
        1.0 - self.distance(a, b)
    }

    /// Convert a normalized distance into trait units.
    fn raw_radius(&self, normalized: f64) -> f64;

    /// Wrap period for circular trait spaces.
    fn period(&self) -> Option<f64> {
        None
    }

    /// Fold an arbitrary value back into the trait space.
    fn fold(&self, value: f64) -> f64;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearMetric {
    span: f64,
}

impl LinearMetric {
    pub fn new(span: f64) -> Self {
        assert!(span.is_finite() && span > 0.0, "trait span must be positive");
        Self { span }
    }
}

impl TraitMetric for LinearMetric {
    fn distance(&self, a: f64, b: f64) -> f64 {
        ((a - b).abs() / self.span).min(1.0)
    }

    fn raw_radius(&self, normalized: f64) -> f64 {
        normalized * self.span
    }

    fn fold(&self, value: f64) -> f64 {
        value.clamp(0.0, self.span)
    }
}

/// Phase metric: distance is the shorter arc, normalized by half the period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularMetric {
    period: f64,
}

impl CircularMetric {
    pub fn new(period: f64) -> Self {
        assert!(
            period.is_finite() && period > 0.0,
            "trait period must be positive"
        );
        Self { period }
    }
}

impl TraitMetric for CircularMetric {
    fn distance(&self, a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(self.period);
        let arc = d.min(self.period - d);
        (arc / (self.period / 2.0)).min(1.0)
    }

    fn raw_radius(&self, normalized: f64) -> f64 {
        normalized * self.period / 2.0
    }

    fn period(&self) -> Option<f64> {
        Some(self.period)
    }

    fn fold(&self, value: f64) -> f64 {
        let folded = value.rem_euclid(self.period);
        // rem_euclid can round up to the period itself for tiny negative inputs.
        if folded >= self.period {
            0.0
        } else {
            folded
        }
    }
}

pub fn metric_from_config(config: &SimulationConfig) -> Box<dyn TraitMetric> {
    match config.trait_domain {
        TraitDomain::Linear => Box::new(LinearMetric::new(config.trait_span)),
        TraitDomain::Circular => Box::new(CircularMetric::new(config.trait_span)),
    }
}

/// Candidate pair enumeration. Implementations may return a superset of the
/// matching pairs but must never omit one; every pair satisfies `i < j`.
pub trait PairScan: Send + Sync {
    /// Pairs that may lie within normalized distance `max_distance`.
    fn near_candidates(
        &self,
        traits: &[f64],
        metric: &dyn TraitMetric,
        max_distance: f64,
    ) -> Vec<(usize, usize)>;

    /// Pairs that may lie at normalized distance `min_distance` or further.
    fn far_candidates(
        &self,
        traits: &[f64],
        _metric: &dyn TraitMetric,
        _min_distance: f64,
    ) -> Vec<(usize, usize)> {
        all_pairs(traits.len())
    }
}

fn all_pairs(n: usize) -> Vec<(usize, usize)> {
    if n < 2 {
        return Vec::new();
    }
    let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push((i, j));
        }
    }
    pairs
}

/// O(n²) enumeration of every unordered pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExhaustiveScan;

impl PairScan for ExhaustiveScan {
    fn near_candidates(
        &self,
        traits: &[f64],
        _metric: &dyn TraitMetric,
        _max_distance: f64,
    ) -> Vec<(usize, usize)> {
        all_pairs(traits.len())
    }
}

/// R*-tree range queries over trait values; near pairs cost O(n log n + k).
#[derive(Clone, Copy, Debug, Default)]
pub struct TraitIndexScan;

impl PairScan for TraitIndexScan {
    fn near_candidates(
        &self,
        traits: &[f64],
        metric: &dyn TraitMetric,
        max_distance: f64,
    ) -> Vec<(usize, usize)> {
        if traits.len() < 2 {
            return Vec::new();
        }
        let radius = metric.raw_radius(max_distance) * (1.0 + crate::constants::TRAIT_QUERY_SLACK)
            + crate::constants::TRAIT_QUERY_SLACK;
        let tree = crate::spatial::build_index(traits);
        let mut pairs = Vec::new();
        for (i, &value) in traits.iter().enumerate() {
            crate::spatial::for_each_within(&tree, value, radius, i, metric.period(), |j| {
                if i < j {
                    pairs.push((i, j));
                }
            });
        }
        pairs
    }
}

pub fn scan_from_config(config: &SimulationConfig) -> Box<dyn PairScan> {
    match config.pair_scan {
        PairScanMode::Exhaustive => Box::new(ExhaustiveScan),
        PairScanMode::TraitIndex => Box::new(TraitIndexScan),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Composition,
    Decomposition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub agent_a: AgentId,
    pub agent_b: AgentId,
    pub cycle: usize,
    /// Energy change applied to each partner (negative for composition).
    pub energy_delta: f64,
}

/// Group member as seen by a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Member {
    pub id: AgentId,
    pub population_id: PopulationId,
    pub trait_value: f64,
}

/// Undirected composition edges keyed by `(lower id, higher id)`; the value counts reinforcements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositionGraph {
    edges: BTreeMap<(AgentId, AgentId), u32>,
}

impl CompositionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Add an edge or bump its weight.
    pub fn reinforce(&mut self, a: AgentId, b: AgentId) {
        *self.edges.entry(Self::key(a, b)).or_insert(0) += 1;
    }

    pub fn remove_edge(&mut self, a: AgentId, b: AgentId) -> bool {
        self.edges.remove(&Self::key(a, b)).is_some()
    }

    /// Drop every edge touching `id`. Returns the number removed.
    pub fn remove_agent(&mut self, id: AgentId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|&(a, b), _| a != id && b != id);
        before - self.edges.len()
    }

    pub fn weight(&self, a: AgentId, b: AgentId) -> Option<u32> {
        self.edges.get(&Self::key(a, b)).copied()
    }

    pub fn degree(&self, id: AgentId) -> usize {
        self.edges
            .keys()
            .filter(|&&(a, b)| a == id || b == id)
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn apply(&mut self, events: &[InteractionEvent]) {
        for event in events {
            match event.kind {
                InteractionKind::Composition => self.reinforce(event.agent_a, event.agent_b),
                InteractionKind::Decomposition => {
                    self.remove_edge(event.agent_a, event.agent_b);
                }
            }
        }
    }
}

pub struct InteractionEngine {
    metric: Box<dyn TraitMetric>,
    scan: Box<dyn PairScan>,
    scope: InteractionScope,
    composition_threshold: f64,
    composition_cost: f64,
    decomposition_threshold: f64,
    decomposition_gain: f64,
}

impl InteractionEngine {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            metric: metric_from_config(config),
            scan: scan_from_config(config),
            scope: config.interaction_scope,
            composition_threshold: config.composition_threshold,
            composition_cost: config.composition_cost,
            decomposition_threshold: config.decomposition_threshold,
            decomposition_gain: config.decomposition_gain,
        }
    }

    /// Replace the pair enumeration strategy without touching callers.
    pub fn with_scan(mut self, scan: Box<dyn PairScan>) -> Self {
        self.scan = scan;
        self
    }

    pub fn scope(&self) -> InteractionScope {
        self.scope
    }

    pub fn metric(&self) -> &dyn TraitMetric {
        self.metric.as_ref()
    }

    /// Member lists the passes run over for the configured scope.
    pub fn groups(&self, store: &AgentStore) -> Vec<Vec<Member>> {
        let snapshot = |pop: &crate::store::Population| -> Vec<Member> {
            pop.iter()
                .map(|a| Member {
                    id: a.id,
                    population_id: a.population_id,
                    trait_value: a.trait_value,
                })
                .collect()
        };
        match self.scope {
            InteractionScope::Off => Vec::new(),
            InteractionScope::WithinPopulation => store.populations().iter().map(snapshot).collect(),
            InteractionScope::AcrossPopulations => {
                let mut all: Vec<Member> = store.populations().iter().flat_map(snapshot).collect();
                all.sort_by_key(|m| m.id);
                vec![all]
            }
        }
    }

    fn admits(&self, a: &Member, b: &Member) -> bool {
        match self.scope {
            InteractionScope::AcrossPopulations => a.population_id != b.population_id,
            _ => true,
        }
    }

    /// Matching pairs in canonical order, as indices into `members`.
    fn matching_pairs(
        &self,
        members: &[Member],
        kind: InteractionKind,
    ) -> Vec<(usize, usize)> {
        if members.len() < 2 {
            return Vec::new();
        }
        let traits: Vec<f64> = members.iter().map(|m| m.trait_value).collect();
        let metric = self.metric.as_ref();
        let candidates = match kind {
            InteractionKind::Composition => {
                self.scan
                    .near_candidates(&traits, metric, 1.0 - self.composition_threshold)
            }
            InteractionKind::Decomposition => {
                self.scan
                    .far_candidates(&traits, metric, self.decomposition_threshold)
            }
        };
        let mut pairs: Vec<(usize, usize)> = candidates
            .into_iter()
            .filter(|&(i, j)| {
                let (a, b) = (&members[i], &members[j]);
                if !self.admits(a, b) {
                    return false;
                }
                match kind {
                    InteractionKind::Composition => {
                        metric.similarity(a.trait_value, b.trait_value)
                            >= self.composition_threshold
                    }
                    InteractionKind::Decomposition => {
                        metric.distance(a.trait_value, b.trait_value)
                            >= self.decomposition_threshold
                    }
                }
            })
            .map(|(i, j)| {
                if members[i].id <= members[j].id {
                    (i, j)
                } else {
                    (j, i)
                }
            })
            .collect();
        pairs.sort_by_key(|&(i, j)| (members[i].id, members[j].id));
        pairs.dedup();
        pairs
    }

    /// Composition pass: similar pairs that can both pay `composition_cost` pay it.
    pub fn compose(
        &self,
        store: &mut AgentStore,
        members: &[Member],
        ledger: &EnergyLedger,
        cycle: usize,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        for (i, j) in self.matching_pairs(members, InteractionKind::Composition) {
            let (a, b) = (members[i], members[j]);
            let affordable = [a, b].iter().all(|m| {
                store
                    .get(m.id, m.population_id)
                    .is_some_and(|agent| ledger.can_afford(agent, self.composition_cost))
            });
            if !affordable {
                continue;
            }
            for m in [a, b] {
                if let Some(agent) = store.get_mut(m.id, m.population_id) {
                    let paid = ledger.spend(agent, self.composition_cost);
                    debug_assert!(
                        paid,
                        "agent {} could not pay after the affordability check",
                        m.id
                    );
                }
            }
            events.push(InteractionEvent {
                kind: InteractionKind::Composition,
                agent_a: a.id,
                agent_b: b.id,
                cycle,
                energy_delta: -self.composition_cost,
            });
        }
        events
    }

    /// Decomposition pass: dissimilar pairs each gain `decomposition_gain` (cap-clamped).
    pub fn decompose(
        &self,
        store: &mut AgentStore,
        members: &[Member],
        ledger: &EnergyLedger,
        cycle: usize,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        for (i, j) in self.matching_pairs(members, InteractionKind::Decomposition) {
            let (a, b) = (members[i], members[j]);
            if !(store.contains(a.id, a.population_id) && store.contains(b.id, b.population_id)) {
                continue;
            }
            for m in [a, b] {
                if let Some(agent) = store.get_mut(m.id, m.population_id) {
                    ledger.recharge(agent, self.decomposition_gain);
                }
            }
            events.push(InteractionEvent {
                kind: InteractionKind::Decomposition,
                agent_a: a.id,
                agent_b: b.id,
                cycle,
                energy_delta: self.decomposition_gain,
            });
        }
        events
    }
}
