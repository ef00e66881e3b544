//! Receiver process management and frame line parsing

use anyhow::{Context, Result};
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

use super::ReceivedFrame;
use crate::fineoffset::LinkQuality;

/// Longest frame line the receiver is expected to emit; anything beyond this
/// is foreign traffic and dropped at the parse step
const MAX_FRAME_BYTES: usize = 64;

/// Receiver process configuration
#[derive(Debug, Clone)]
pub struct RadioConfig {
    pub device_index: u32,
    pub frequency_hz: u64,
    pub rx_path: String,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frequency_hz: 868_300_000, // FineOffset FSK band
            rx_path: "sx1276-rx".to_string(),
        }
    }
}

/// Statistics for the capture thread (atomic for cross-thread access)
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub frames_received: AtomicU64,
    pub parse_errors: AtomicU64,
}

/// Receiver capture controller
pub struct RadioCapture {
    config: RadioConfig,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl RadioCapture {
    pub fn new(config: RadioConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(CaptureStats::default()),
        }
    }

    /// Start the receiver process and return the frame channel
    pub fn start(&self) -> Result<Receiver<ReceivedFrame>> {
        info!("Starting FSK receiver capture");
        info!("  Device index: {}", self.config.device_index);
        info!(
            "  Frequency: {:.1} MHz",
            self.config.frequency_hz as f64 / 1_000_000.0
        );
        info!("  Receiver path: {}", self.config.rx_path);

        let (frame_tx, frame_rx) = bounded::<ReceivedFrame>(1000);

        let config = self.config.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();

        running.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("radio-capture".to_string())
            .spawn(move || {
                if let Err(e) = run_capture(config, running, stats, frame_tx) {
                    error!("Radio capture error: {}", e);
                }
            })
            .context("Failed to spawn capture thread")?;

        Ok(frame_rx)
    }

    pub fn stop(&self) {
        info!("Stopping FSK receiver capture...");
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }
}

impl Drop for RadioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Main capture loop (runs in a dedicated thread)
fn run_capture(
    config: RadioConfig,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
    frame_tx: Sender<ReceivedFrame>,
) -> Result<()> {
    let mut cmd = Command::new(&config.rx_path);
    cmd.arg("-d")
        .arg(config.device_index.to_string())
        .arg("-f")
        .arg(config.frequency_hz.to_string());

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    info!("Executing: {:?}", cmd);

    let mut child = cmd
        .spawn()
        .context("Failed to spawn receiver. Make sure the receiver utility is installed and in PATH")?;

    let stdout = child
        .stdout
        .take()
        .context("Failed to capture receiver stdout")?;

    // Receiver utilities print tuning info to stderr, not just errors
    if let Some(stderr) = child.stderr.take() {
        thread::spawn(move || {
            let reader = std::io::BufReader::new(stderr);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if !line.trim().is_empty() {
                    info!("[receiver] {}", line.trim());
                }
            }
        });
    }

    let reader = std::io::BufReader::new(stdout);
    let mut first_frame = true;

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Error reading receiver output: {}", e);
                break;
            }
        };

        match parse_frame_line(&line) {
            Some((data, link)) => {
                if first_frame {
                    info!("First frame received! Receiver is working.");
                    first_frame = false;
                }
                stats.frames_received.fetch_add(1, Ordering::Relaxed);

                let frame = ReceivedFrame {
                    data,
                    rx_at: Utc::now(),
                    link,
                };
                if frame_tx.try_send(frame).is_err() {
                    debug!("Frame channel full, dropping frame");
                }
            }
            None => {
                if line.starts_with('*') {
                    stats.parse_errors.fetch_add(1, Ordering::Relaxed);
                    debug!("Failed to parse frame line: {}", line);
                }
                // Ignore non-frame chatter
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    let _ = child.kill();

    warn!(
        "Receiver stopped. Frames: {}, parse errors: {}",
        stats.frames_received.load(Ordering::Relaxed),
        stats.parse_errors.load(Ordering::Relaxed)
    );

    Ok(())
}

/// Parse one receiver output line: `*<hex>; key=value ...`
///
/// Metadata keys `rssi`, `snr`, `lna`, `fei` are optional; missing keys
/// default to zero. Returns None for non-frame or malformed lines.
fn parse_frame_line(line: &str) -> Option<(Vec<u8>, LinkQuality)> {
    let line = line.trim();

    if !line.starts_with('*') {
        return None;
    }

    let end_idx = line.find(';')?;
    let hex_str = &line[1..end_idx];

    if hex_str.is_empty() || hex_str.len() % 2 != 0 || hex_str.len() / 2 > MAX_FRAME_BYTES {
        return None;
    }

    let data = hex::decode(hex_str).ok()?;

    let mut link = LinkQuality::default();
    for token in line[end_idx + 1..].split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "rssi" => link.rssi_dbm = value.parse().ok()?,
            "snr" => link.snr_db = value.parse().ok()?,
            "lna" => link.lna = value.parse().ok()?,
            "fei" => link.freq_error_hz = value.parse().ok()?,
            _ => {}
        }
    }

    Some((data, link))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_line_with_metadata() {
        let line = "*A0715C43191F012C0B21; rssi=-78.5 snr=11.2 lna=2 fei=-1300";
        let (data, link) = parse_frame_line(line).unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(data[0], 0xA0);
        assert!((link.rssi_dbm + 78.5).abs() < 0.01);
        assert!((link.snr_db - 11.2).abs() < 0.01);
        assert_eq!(link.lna, 2);
        assert_eq!(link.freq_error_hz, -1300);
    }

    #[test]
    fn test_parse_frame_line_bare() {
        let line = "*2407E102164E1804007B00FA00C3503349;\r\n";
        let (data, link) = parse_frame_line(line).unwrap();
        assert_eq!(data.len(), 17);
        assert_eq!(link, LinkQuality::default());
    }

    #[test]
    fn test_parse_frame_line_unknown_keys_ignored() {
        let line = "*E3C2692D2794F6D6; rssi=-90 afc=12 mode=fsk";
        let (data, link) = parse_frame_line(line).unwrap();
        assert_eq!(data.len(), 8);
        assert!((link.rssi_dbm + 90.0).abs() < 0.01);
        assert_eq!(link.freq_error_hz, 0);
    }

    #[test]
    fn test_parse_frame_line_invalid() {
        assert!(parse_frame_line("receiver ready").is_none());
        assert!(parse_frame_line("*zz;").is_none());
        assert!(parse_frame_line("*ABC;").is_none()); // odd hex length
        assert!(parse_frame_line("*;").is_none());
        assert!(parse_frame_line("*A0715C43191F012C0B21").is_none()); // no terminator
        let oversized = format!("*{};", "AB".repeat(MAX_FRAME_BYTES + 1));
        assert!(parse_frame_line(&oversized).is_none());
    }

    #[test]
    fn test_parse_frame_line_bad_metadata_rejected() {
        assert!(parse_frame_line("*E3C2692D2794F6D6; rssi=loud").is_none());
    }
}
