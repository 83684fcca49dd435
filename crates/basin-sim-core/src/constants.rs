/// Prime multiplier used to derive replicate seeds from a base seed.
/// Chosen so streams for consecutive replicate indices have minimal overlap.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Upper bound on cycles for a single run.
pub const MAX_CYCLES: usize = 10_000_000;

/// Upper bound on recorded metrics samples for a single run.
pub const MAX_SAMPLES: usize = 1_000_000;

/// Population ids are stored as `u16`.
pub const MAX_POPULATIONS: usize = u16::MAX as usize;

/// Upper bound on the configured population cap (sum over all populations).
pub const MAX_TOTAL_AGENTS: usize = 1_000_000;

/// Slack applied to trait-index query radii so the index never misses a pair the
/// exact predicate would accept because of rounding.
pub const TRAIT_QUERY_SLACK: f64 = 1e-9;
