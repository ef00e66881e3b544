//! Decode dispatch across the supported wire formats
//!
//! A received buffer is tried against every registered decoder in a fixed
//! priority order; the first structurally- and checksum-valid decode wins.
//! Order matters: every valid WH24 frame carries a valid WH65B frame in its
//! first 16 bytes, so the more specific 17-byte format must be tried first.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::trace;

use super::types::{Format, LinkQuality, Reading};
use super::{wh1080, wh24, wh25};

/// Negative decode result for a single format attempt.
///
/// Malformed input is the common case on a shared band; none of these are
/// ever surfaced as user-visible errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    #[error("buffer shorter than frame ({got} < {needed})")]
    TooShort { needed: usize, got: usize },
    #[error("structural mismatch")]
    StructuralMismatch,
    #[error("checksum failed")]
    ChecksumFailed,
}

/// Decoder signature: raw frame bytes plus capture metadata in, validated
/// reading out. Decoders never panic on malformed input.
pub type DecodeFn = fn(&[u8], DateTime<Utc>, LinkQuality) -> Result<Reading, DecodeFailure>;

/// Registered decoders in priority order, most specific format first.
pub const DECODERS: [(Format, DecodeFn); 4] = [
    (Format::Wh24, wh24::decode),
    (Format::Wh65b, wh24::decode_wh65b),
    (Format::Wh1080, wh1080::decode),
    (Format::Wh25, wh25::decode),
];

/// Try every decoder against `buf` and return the first valid reading.
///
/// `None` is a normal, frequent outcome (noise, foreign transmitters,
/// corrupted frames). The buffer is only inspected, never retained.
pub fn decode(buf: &[u8], rx_at: DateTime<Utc>, link: LinkQuality) -> Option<Reading> {
    for (format, decoder) in DECODERS {
        match decoder(buf, rx_at, link) {
            Ok(reading) => return Some(reading),
            Err(failure) => {
                trace!("{} decode failed: {}", format, failure);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(s: &str) -> Option<Reading> {
        let buf = hex::decode(s).unwrap();
        decode(&buf, Utc::now(), LinkQuality::default())
    }

    #[test]
    fn test_short_buffers_decode_to_none() {
        // Shorter than every format's frame: no decoder may touch field extraction
        for len in 0..8 {
            let buf = vec![0xA5u8; len];
            assert!(decode(&buf, Utc::now(), LinkQuality::default()).is_none());
        }
    }

    #[test]
    fn test_noise_decodes_to_none() {
        let buf = hex::decode("0123456789ABCDEF0011223344556677").unwrap();
        assert!(decode(&buf, Utc::now(), LinkQuality::default()).is_none());
    }

    #[test]
    fn test_wh24_wins_over_wh65b_prefix() {
        // A fully valid WH24 frame; its 16-byte prefix is also a valid WH65B
        // frame, so priority order decides.
        let reading = decode_hex("2407E102164E1804007B00FA00C3503349").unwrap();
        assert_eq!(reading.format, Format::Wh24);
        assert_eq!(reading.station_id, 7);
    }

    #[test]
    fn test_wh65b_frame_decodes_as_wh65b() {
        // Same bytes, truncated to the 16-byte WH65B frame length
        let reading = decode_hex("2407E102164E1804007B00FA00C35033").unwrap();
        assert_eq!(reading.format, Format::Wh65b);
        assert_eq!(reading.station_id, 7);
    }

    #[test]
    fn test_wh1080_frame_dispatches() {
        let reading = decode_hex("A0715C43191F012C0B21").unwrap();
        assert_eq!(reading.format, Format::Wh1080);
        assert_eq!(reading.station_id, 7);
    }

    #[test]
    fn test_wh25_frame_dispatches() {
        let reading = decode_hex("E3C2692D2794F6D6").unwrap();
        assert_eq!(reading.format, Format::Wh25);
        assert_eq!(reading.station_id, 0x3C);
    }

    #[test]
    fn test_checksum_flip_yields_none() {
        // Flip one bit inside the checksum range of each known-good frame
        for hex_frame in [
            "2407E102164E1804007B00FA00C3503349",
            "A0715C43191F012C0B21",
            "E3C2692D2794F6D6",
        ] {
            let mut buf = hex::decode(hex_frame).unwrap();
            buf[2] ^= 0x04;
            assert!(
                decode(&buf, Utc::now(), LinkQuality::default()).is_none(),
                "corrupted {} still decoded",
                hex_frame
            );
        }
    }

    #[test]
    fn test_decode_stamps_capture_metadata() {
        let buf = hex::decode("A0715C43191F012C0B21").unwrap();
        let link = LinkQuality {
            rssi_dbm: -81.5,
            snr_db: 9.0,
            lna: 2,
            freq_error_hz: -650,
        };
        let at = Utc::now();
        let reading = decode(&buf, at, link).unwrap();
        assert_eq!(reading.rx_at, at);
        assert_eq!(reading.link, link);
    }
}
