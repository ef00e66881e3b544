//! WH25 indoor temperature/humidity/pressure sensor decoder
//!
//! 8-byte frame:
//!
//! ```text
//! Byte:  0    1    2    3    4    5    6    7
//!      [E I][IBFT][TTTT][HHHH][PPPP PPPP][SUM][XOR]
//! ```
//!
//! - nibble 0: family 0xE
//! - nibbles 1-3: station id
//! - byte 1 bit 3: low battery; bits 0-1: temperature bits 8-9
//! - byte 2: temperature low byte, value = (raw - 400) * 0.1 degC
//! - byte 3: humidity %
//! - bytes 4-5: pressure (big endian), 0.1 hPa per count; 0xFFFF when the
//!   barometer is faulted
//! - byte 6: additive checksum over bytes 0-5
//! - byte 7: XOR bit-sum over bytes 0-5

use chrono::{DateTime, Utc};

use super::crc::{checksum8, xorsum8};
use super::dispatch::DecodeFailure;
use super::types::{Format, LinkQuality, Reading};

/// Decode an 8-byte WH25 frame
pub fn decode(buf: &[u8], rx_at: DateTime<Utc>, link: LinkQuality) -> Result<Reading, DecodeFailure> {
    let len = Format::Wh25.frame_len();
    if buf.len() < len {
        return Err(DecodeFailure::TooShort {
            needed: len,
            got: buf.len(),
        });
    }
    let b = &buf[..len];

    if b[0] >> 4 != 0xE {
        return Err(DecodeFailure::StructuralMismatch);
    }
    if checksum8(&b[0..6]) != b[6] {
        return Err(DecodeFailure::ChecksumFailed);
    }
    if xorsum8(&b[0..6]) != b[7] {
        return Err(DecodeFailure::ChecksumFailed);
    }

    let station_id = (b[0] & 0x0F) << 4 | b[1] >> 4;
    let mut reading = Reading::new(Format::Wh25, station_id, rx_at, link);

    reading.battery_low = Some(b[1] & 0x08 != 0);

    let temp_raw = ((b[1] & 0x03) as u16) << 8 | b[2] as u16;
    reading.temperature_c = Some((temp_raw as f32 - 400.0) * 0.1);

    if b[3] <= 100 {
        reading.humidity_pct = Some(b[3]);
    }

    let press_raw = (b[4] as u16) << 8 | b[5] as u16;
    if press_raw != 0xFFFF {
        reading.pressure_hpa = Some(press_raw as f32 * 0.1);
    }

    Ok(reading)
}
