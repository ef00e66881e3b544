//! Configuration loaded from environment variables

use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway URL for gRPC streaming
    pub gateway_url: String,

    /// Bridge ID string for identification
    pub bridge_id: String,

    /// Path to the persisted station configuration blob
    pub stations_path: PathBuf,

    /// Path to the external FSK receiver utility
    pub radio_rx_path: String,

    /// Receiver device index
    pub device_index: u32,

    /// Receive frequency in Hz
    pub frequency_hz: u64,

    /// Duplicate-suppression window in seconds. WH1080-class stations repeat
    /// each reading up to ~6 times within a few seconds.
    pub dedup_window_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            gateway_url: std::env::var("GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:30051".to_string()),

            bridge_id: std::env::var("BRIDGE_ID").unwrap_or_else(|_| "ws-bridge-0".to_string()),

            stations_path: std::env::var("STATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("stations.json")),

            radio_rx_path: std::env::var("RADIO_RX_PATH")
                .unwrap_or_else(|_| "sx1276-rx".to_string()),

            device_index: std::env::var("DEVICE_INDEX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),

            frequency_hz: std::env::var("FREQUENCY_HZ")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(868_300_000),

            dedup_window_secs: std::env::var("DEDUP_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}
