//! FineOffset Weather Station Internet Bridge
//!
//! Receives framed FSK packets from an external receiver utility, decodes
//! them into station readings, matches them against the configured station
//! registry, and streams accepted readings to the gateway.

mod config;
mod fineoffset;
mod grpc;
mod radio;
mod report;
mod stations;

use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::Config;
use grpc::wsgateway::{BridgeStatus, ReadingEvent};
use grpc::StreamingGatewayClient;
use radio::{RadioCapture, RadioConfig};
use report::Summary;
use stations::{StationRegistry, UpdateOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   FineOffset Weather Station Bridge");
    info!("   rtl_433-style FSK decoder");
    info!("===========================================");

    // Load configuration
    let config = Config::from_env();

    info!("Configuration:");
    info!("  Gateway URL: {}", config.gateway_url);
    info!("  Bridge ID: {}", config.bridge_id);
    info!("  Stations file: {}", config.stations_path.display());
    info!("  Receiver path: {}", config.radio_rx_path);
    info!("  Device index: {}", config.device_index);
    info!("  Frequency: {} Hz", config.frequency_hz);
    info!("  Duplicate window: {} s", config.dedup_window_secs);

    // Load the station registry. Malformed or missing configuration is not
    // fatal: the bridge runs in observe-only mode with an empty registry.
    let mut registry = match std::fs::read(&config.stations_path) {
        Ok(bytes) => match StationRegistry::load(&bytes) {
            Ok(registry) => {
                info!("Loaded {} configured station(s)", registry.len());
                registry
            }
            Err(e) => {
                warn!("Station configuration failed to load: {}", e);
                warn!("Running in observe-only mode (no configured stations)");
                StationRegistry::empty()
            }
        },
        Err(e) => {
            warn!(
                "Could not read {}: {}",
                config.stations_path.display(),
                e
            );
            warn!("Running in observe-only mode (no configured stations)");
            StationRegistry::empty()
        }
    };

    let dup_window = chrono::Duration::seconds(config.dedup_window_secs as i64);

    // Create channels for data flow to the gateway
    let (reading_tx, reading_rx) = mpsc::channel::<ReadingEvent>(1000);
    let (status_tx, status_rx) = mpsc::channel::<BridgeStatus>(10);

    // Start gRPC streaming to gateway
    let gateway_url = config.gateway_url.clone();
    let reading_handle = tokio::spawn(async move {
        let client = StreamingGatewayClient::new(&gateway_url);
        if let Err(e) = client.stream_readings(reading_rx).await {
            error!("Reading stream failed: {}", e);
        }
    });

    let gateway_url = config.gateway_url.clone();
    let status_handle = tokio::spawn(async move {
        let client = StreamingGatewayClient::new(&gateway_url);
        if let Err(e) = client.stream_status(status_rx).await {
            error!("Status stream failed: {}", e);
        }
    });

    // Start the receiver process
    let capture = RadioCapture::new(RadioConfig {
        device_index: config.device_index,
        frequency_hz: config.frequency_hz,
        rx_path: config.radio_rx_path.clone(),
    });
    let frame_rx = match capture.start() {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to start receiver: {}", e);
            return Err(e);
        }
    };

    // Send initial bridge status
    let _ = status_tx
        .send(BridgeStatus {
            bridge_id: config.bridge_id.clone(),
            connected: true,
            frequency_hz: config.frequency_hz,
            frames_received: 0,
            frames_decoded: 0,
            timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
            stations_configured: registry.len() as u32,
        })
        .await;

    info!("===========================================");
    info!("  Receiving...");
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    // Loop counters
    let mut frames_received = 0u64;
    let mut frames_decoded = 0u64;
    let mut matched = 0u64;
    let mut unmatched = 0u64;
    let mut duplicates = 0u64;

    let mut last_heartbeat = Instant::now();
    let mut last_stats_report = Instant::now();

    // Main processing loop - frames arrive in order and are handled one at a
    // time, so per-station updates are applied in arrival order
    loop {
        match frame_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(frame) => {
                frames_received += 1;

                // Failed decodes are noise/foreign traffic, a normal outcome
                if let Some(reading) = fineoffset::decode(&frame.data, frame.rx_at, frame.link) {
                    frames_decoded += 1;

                    match registry.lookup_mut(reading.format, reading.station_id) {
                        Some(entry) => {
                            let outcome = entry.update(&reading, &frame.data, dup_window);
                            match outcome {
                                UpdateOutcome::AcceptedDuplicate => {
                                    duplicates += 1;
                                    debug!(
                                        "{} station {} ({}): duplicate burst frame",
                                        reading.format, reading.station_id, entry.label
                                    );
                                }
                                UpdateOutcome::AcceptedNew | UpdateOutcome::MergedPartial => {
                                    matched += 1;
                                    info!(
                                        "{} station {} ({}): {} | rssi={:.1} snr={:.1}",
                                        reading.format,
                                        reading.station_id,
                                        entry.label,
                                        Summary::from_reading(&reading),
                                        reading.link.rssi_dbm,
                                        reading.link.snr_db
                                    );
                                    send_reading_event(&reading_tx, &config, &reading, true).await;
                                }
                            }
                        }
                        None => {
                            // Valid reading from an unprovisioned station:
                            // present it so an operator can configure it
                            unmatched += 1;
                            info!(
                                "Unconfigured {} station id {}",
                                reading.format, reading.station_id
                            );
                            info!("{}", Summary::from_reading(&reading));
                            send_reading_event(&reading_tx, &config, &reading, false).await;
                        }
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // No frame received, continue with periodic tasks
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                warn!("Receiver frame channel disconnected");
                break;
            }
        }

        // Periodic heartbeat (every 5 seconds)
        if last_heartbeat.elapsed() >= Duration::from_secs(5) {
            let status = BridgeStatus {
                bridge_id: config.bridge_id.clone(),
                connected: capture.is_running(),
                frequency_hz: config.frequency_hz,
                frames_received,
                frames_decoded,
                timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
                stations_configured: registry.len() as u32,
            };
            let _ = status_tx.send(status).await;
            last_heartbeat = Instant::now();
        }

        // Periodic counters (every 10 seconds)
        if last_stats_report.elapsed() >= Duration::from_secs(10) {
            let rx_stats = capture.stats();
            info!(
                "[Bridge] frames={} decoded={} matched={} unmatched={} duplicates={} rx_parse_errors={}",
                frames_received,
                frames_decoded,
                matched,
                unmatched,
                duplicates,
                rx_stats.parse_errors.load(std::sync::atomic::Ordering::Relaxed)
            );
            last_stats_report = Instant::now();
        }

        if !capture.is_running() {
            warn!("Receiver stopped unexpectedly");
            break;
        }
    }

    // Cleanup
    capture.stop();

    let _ = status_tx
        .send(BridgeStatus {
            bridge_id: config.bridge_id.clone(),
            connected: false,
            frequency_hz: config.frequency_hz,
            frames_received,
            frames_decoded,
            timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
            stations_configured: registry.len() as u32,
        })
        .await;

    reading_handle.abort();
    status_handle.abort();

    info!(
        "Shutdown complete. Frames: {} received, {} decoded, {} matched",
        frames_received, frames_decoded, matched
    );
    Ok(())
}

/// Build and enqueue the outbound event for one reading
async fn send_reading_event(
    tx: &mpsc::Sender<ReadingEvent>,
    config: &Config,
    reading: &fineoffset::Reading,
    matched: bool,
) {
    let payload_json = match report::payload_json(reading) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to format reading payload: {}", e);
            return;
        }
    };

    let event = ReadingEvent {
        bridge_id: config.bridge_id.clone(),
        timestamp_ms: reading.rx_at.timestamp_millis() as u64,
        format: reading.format.to_string(),
        station_id: reading.station_id as u32,
        matched,
        payload_json,
        rssi_dbm: reading.link.rssi_dbm,
        snr_db: reading.link.snr_db,
    };

    if tx.send(event).await.is_err() {
        warn!("Failed to send reading event: gateway channel closed");
    }
}
