pub mod agent;
pub mod batch;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod constants;
pub mod energy;
pub mod interaction;
pub mod metrics;
pub mod migration;
pub mod rng;
pub mod spatial;
pub mod spawn;
pub mod store;

pub use agent::{Agent, AgentId, PopulationId};
pub use batch::{run_batch, seed_grid, summarize_sweep, CancelToken, SweepPoint};
pub use classifier::{classify, BasinClassifier, BasinCriteria, BasinLabel};
pub use clock::{ClockState, SimulationClock};
pub use config::{SimConfigError, SimulationConfig};
pub use metrics::{MetricsSample, MetricsSeries, RunSummary, TerminationReason};
