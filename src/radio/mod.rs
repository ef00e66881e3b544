//! Radio collaborator: external FSK receiver process feeding framed packets
//!
//! The bridge does not own the radio. An external receiver utility (an
//! SX1276 FSK dump tool) strips preamble/sync and prints one line per frame:
//!
//! ```text
//! *<hex payload>; rssi=<dBm> snr=<dB> lna=<step> fei=<Hz>
//! ```
//!
//! This module spawns that process and turns its output into
//! [`ReceivedFrame`]s on a bounded channel. No acknowledgement or
//! retransmission request ever flows back to the radio.

mod capture;

pub use capture::{CaptureStats, RadioCapture, RadioConfig};

use chrono::{DateTime, Utc};

use crate::fineoffset::LinkQuality;

/// One frame as delivered by the receiver, with capture metadata
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub data: Vec<u8>,
    pub rx_at: DateTime<Utc>,
    pub link: LinkQuality,
}
