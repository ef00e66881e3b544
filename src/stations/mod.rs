//! Configured-station registry and per-station accumulated state

mod registry;
mod state;

pub use registry::{ConfigError, StationRegistry};
pub use state::{Snapshot, StationEntry, UpdateOutcome, KMH_PER_MS};
