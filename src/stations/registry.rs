//! Persistent station registry
//!
//! Built once at startup from the persisted configuration blob, then queried
//! for the lifetime of the process. Reconfiguration is an external operation
//! that rebuilds the registry; there is no runtime insert/remove API.

use std::collections::HashMap;

use thiserror::Error;

use super::state::StationEntry;
use crate::fineoffset::Format;

/// Startup configuration problems. Never fatal: the caller degrades to an
/// empty registry and keeps receiving (observe-only mode).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed station configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("duplicate station entry: {format} id {station_id}")]
    DuplicateStation { format: Format, station_id: u8 },
}

/// In-memory table of configured stations keyed by (format, station id)
#[derive(Debug, Default)]
pub struct StationRegistry {
    stations: HashMap<(Format, u8), StationEntry>,
}

impl StationRegistry {
    /// Empty registry (observe-only mode)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Deserialize a persisted configuration blob.
    ///
    /// The blob is a JSON array of station identities; accumulated runtime
    /// state never persists and starts fresh.
    pub fn load(bytes: &[u8]) -> Result<Self, ConfigError> {
        let entries: Vec<StationEntry> = serde_json::from_slice(bytes)?;

        let mut stations = HashMap::with_capacity(entries.len());
        for entry in entries {
            let key = (entry.format, entry.station_id);
            if stations.insert(key, entry).is_some() {
                return Err(ConfigError::DuplicateStation {
                    format: key.0,
                    station_id: key.1,
                });
            }
        }

        Ok(Self { stations })
    }

    /// Serialize the configured identities back to a blob. Inverse of
    /// [`load`](Self::load); used by external reconfiguration flows, not on
    /// the decode path.
    pub fn save(&self) -> Result<Vec<u8>, ConfigError> {
        let mut entries: Vec<&StationEntry> = self.stations.values().collect();
        entries.sort_by_key(|e| (e.format, e.station_id));
        Ok(serde_json::to_vec_pretty(&entries)?)
    }

    /// Exact-match lookup, read-only
    pub fn lookup(&self, format: Format, station_id: u8) -> Option<&StationEntry> {
        self.stations.get(&(format, station_id))
    }

    /// Exact-match lookup for the update path. Exclusive access to the entry
    /// serializes per-station mutation.
    pub fn lookup_mut(&mut self, format: Format, station_id: u8) -> Option<&mut StationEntry> {
        self.stations.get_mut(&(format, station_id))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
