//! WH1080 legacy outdoor station decoder
//!
//! 10-byte frame, nibble-packed:
//!
//! ```text
//! Nibble: 0 1  2 3  4 5 6  7 8  9 10  11 12  13 14 15 16  17 18  19
//!        [A T][I I][T T T][H H][S  S][G  G ][?  R  R  R ][B  D ][CRC]
//! ```
//!
//! - nibble 0: family 0xA (weather message; 0xB carries DCF time and is not
//!   decoded here)
//! - nibbles 2-3: station id
//! - nibbles 4-6: temperature, 12 bit, value = (raw - 400) * 0.1 degC
//! - byte 3: humidity %
//! - byte 4: average wind speed count, 1.224 km/h per count
//! - byte 5: gust count, same scale
//! - nibbles 13-15: rain accumulator, 0.3 mm per count
//! - nibble 17: battery (0 = ok)
//! - nibble 18: wind direction as 22.5 deg sector index, truncated to whole
//!   degrees
//! - byte 9: CRC-8 poly 0x31 over bytes 0-8
//!
//! Stations of this family retransmit each reading in a burst of up to ~6
//! identical frames; duplicate suppression happens downstream.

use chrono::{DateTime, Utc};

use super::crc::crc8;
use super::dispatch::DecodeFailure;
use super::types::{Format, LinkQuality, Reading};

/// km/h per anemometer count (0.34 m/s)
const WIND_KMH_PER_COUNT: f32 = 1.224;
/// mm per rain counter tip
const RAIN_MM_PER_COUNT: f32 = 0.3;

/// Decode a 10-byte WH1080 weather frame
pub fn decode(buf: &[u8], rx_at: DateTime<Utc>, link: LinkQuality) -> Result<Reading, DecodeFailure> {
    let len = Format::Wh1080.frame_len();
    if buf.len() < len {
        return Err(DecodeFailure::TooShort {
            needed: len,
            got: buf.len(),
        });
    }
    let b = &buf[..len];

    if b[0] >> 4 != 0xA {
        return Err(DecodeFailure::StructuralMismatch);
    }
    // Humidity above 100 %RH marks a foreign or garbled frame
    if b[3] > 100 {
        return Err(DecodeFailure::StructuralMismatch);
    }
    if crc8(&b[0..9]) != b[9] {
        return Err(DecodeFailure::ChecksumFailed);
    }

    let station_id = (b[0] & 0x0F) << 4 | b[1] >> 4;
    let mut reading = Reading::new(Format::Wh1080, station_id, rx_at, link);

    let temp_raw = ((b[1] & 0x0F) as u16) << 8 | b[2] as u16;
    reading.temperature_c = Some((temp_raw as f32 - 400.0) * 0.1);
    reading.humidity_pct = Some(b[3]);
    reading.wind_avg_kmh = Some(b[4] as f32 * WIND_KMH_PER_COUNT);
    reading.wind_gust_kmh = Some(b[5] as f32 * WIND_KMH_PER_COUNT);

    let rain_raw = ((b[6] & 0x0F) as u16) << 8 | b[7] as u16;
    reading.rain_mm = Some(rain_raw as f32 * RAIN_MM_PER_COUNT);

    reading.battery_low = Some(b[8] >> 4 != 0);
    reading.wind_dir_deg = Some((b[8] & 0x0F) as u16 * 45 / 2);

    Ok(reading)
}
