//! WH24 / WH65B outdoor sensor suite decoder
//!
//! Frame layout (after the radio has stripped preamble and 0x2DD4 sync):
//!
//! ```text
//! Byte:  0    1    2    3    4    5    6    7    8    9   10   11   12 13 14  15   16
//!      [0x24] ID  DDDD GWBT TTTT HHHH WWWW GGGG RRRR RRRR UUUU UUUU LL LL LL [CRC][SUM]
//! ```
//!
//! - byte 0: family code 0x24
//! - byte 1: station id (changes on battery replacement)
//! - byte 2 + byte 3 bit 7: wind direction, 0-359 deg (9 bit)
//! - byte 3 bit 4: wind speed bit 8; bit 3: low battery; bits 0-2: temperature bits 8-10
//! - byte 4: temperature low byte; value = (raw - 400) * 0.1 degC
//! - byte 5: humidity %
//! - byte 6: wind speed low byte
//! - byte 7: wind gust raw
//! - bytes 8-9: rain accumulator (big endian)
//! - bytes 10-11: UV raw (big endian)
//! - bytes 12-14: ambient light raw (big endian), * 0.1 lux
//! - byte 15: CRC-8 poly 0x31 over bytes 0-14
//! - byte 16 (WH24 only): additive checksum over bytes 0-15
//!
//! All-ones raw values (0x7FF temperature, 0xFF humidity, 0x1FF wind, 0xFF
//! gust, 0xFFFF UV, 0xFFFFFF light) mean "sensor absent or faulted" and
//! decode to absent fields.
//!
//! WH65B transmits the same layout without the additive checksum byte
//! (16 bytes total) and uses different anemometer and rain-cup scale factors.

use chrono::{DateTime, Utc};

use super::crc::{checksum8, crc8};
use super::dispatch::DecodeFailure;
use super::types::{Format, LinkQuality, Reading};

/// km/h per wind-speed count: WH24 anemometer (0.125 * 1.12 m/s)
const WH24_WIND_KMH: f32 = 0.504;
/// km/h per gust count: WH24 (1.12 m/s)
const WH24_GUST_KMH: f32 = 4.032;
/// mm per rain counter tip: WH24 cup
const WH24_RAIN_MM: f32 = 0.3;

/// km/h per wind-speed count: WH65B anemometer (0.125 * 0.51 m/s)
const WH65B_WIND_KMH: f32 = 0.2295;
/// km/h per gust count: WH65B (0.51 m/s)
const WH65B_GUST_KMH: f32 = 1.836;
/// mm per rain counter tip: WH65B cup
const WH65B_RAIN_MM: f32 = 0.254;

/// Decode a 17-byte WH24 frame
pub fn decode(buf: &[u8], rx_at: DateTime<Utc>, link: LinkQuality) -> Result<Reading, DecodeFailure> {
    let len = Format::Wh24.frame_len();
    if buf.len() < len {
        return Err(DecodeFailure::TooShort {
            needed: len,
            got: buf.len(),
        });
    }
    let b = &buf[..len];

    if b[0] != 0x24 {
        return Err(DecodeFailure::StructuralMismatch);
    }
    if crc8(&b[0..15]) != b[15] {
        return Err(DecodeFailure::ChecksumFailed);
    }
    if checksum8(&b[0..16]) != b[16] {
        return Err(DecodeFailure::ChecksumFailed);
    }

    Ok(decode_suite(
        b,
        Format::Wh24,
        rx_at,
        link,
        WH24_WIND_KMH,
        WH24_GUST_KMH,
        WH24_RAIN_MM,
    ))
}

/// Decode a 16-byte WH65B frame (no additive checksum byte)
pub fn decode_wh65b(
    buf: &[u8],
    rx_at: DateTime<Utc>,
    link: LinkQuality,
) -> Result<Reading, DecodeFailure> {
    let len = Format::Wh65b.frame_len();
    if buf.len() < len {
        return Err(DecodeFailure::TooShort {
            needed: len,
            got: buf.len(),
        });
    }
    let b = &buf[..len];

    if b[0] != 0x24 {
        return Err(DecodeFailure::StructuralMismatch);
    }
    if crc8(&b[0..15]) != b[15] {
        return Err(DecodeFailure::ChecksumFailed);
    }

    Ok(decode_suite(
        b,
        Format::Wh65b,
        rx_at,
        link,
        WH65B_WIND_KMH,
        WH65B_GUST_KMH,
        WH65B_RAIN_MM,
    ))
}

/// Field extraction shared by WH24 and WH65B (validation already done)
fn decode_suite(
    b: &[u8],
    format: Format,
    rx_at: DateTime<Utc>,
    link: LinkQuality,
    wind_kmh_per_count: f32,
    gust_kmh_per_count: f32,
    rain_mm_per_count: f32,
) -> Reading {
    let mut reading = Reading::new(format, b[1], rx_at, link);

    let wind_dir = b[2] as u16 | ((b[3] & 0x80) as u16) << 1;
    if wind_dir <= 359 {
        reading.wind_dir_deg = Some(wind_dir);
    }

    reading.battery_low = Some(b[3] & 0x08 != 0);

    let temp_raw = ((b[3] & 0x07) as u16) << 8 | b[4] as u16;
    if temp_raw != 0x7FF {
        reading.temperature_c = Some((temp_raw as f32 - 400.0) * 0.1);
    }

    if b[5] != 0xFF {
        reading.humidity_pct = Some(b[5]);
    }

    let wind_raw = b[6] as u16 | ((b[3] & 0x10) as u16) << 4;
    if wind_raw != 0x1FF {
        reading.wind_avg_kmh = Some(wind_raw as f32 * wind_kmh_per_count);
    }

    if b[7] != 0xFF {
        reading.wind_gust_kmh = Some(b[7] as f32 * gust_kmh_per_count);
    }

    let rain_raw = (b[8] as u16) << 8 | b[9] as u16;
    reading.rain_mm = Some(rain_raw as f32 * rain_mm_per_count);

    let uv_raw = (b[10] as u16) << 8 | b[11] as u16;
    if uv_raw != 0xFFFF {
        reading.uv_raw = Some(uv_raw);
    }

    let light_raw = (b[12] as u32) << 16 | (b[13] as u32) << 8 | b[14] as u32;
    if light_raw != 0xFF_FFFF {
        reading.light_lux = Some(light_raw as f32 * 0.1);
    }

    reading
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(s: &str) -> Result<Reading, DecodeFailure> {
        decode(&hex::decode(s).unwrap(), Utc::now(), LinkQuality::default())
    }

    #[test]
    fn test_decode_known_frame() {
        // id=7, dir=225, battery ok, 13.4 degC, 78 %RH, wind raw 24, gust raw 4,
        // rain raw 123, uv 250, light raw 50000
        let r = decode_hex("2407E102164E1804007B00FA00C3503349").unwrap();
        assert_eq!(r.format, Format::Wh24);
        assert_eq!(r.station_id, 7);
        assert_eq!(r.wind_dir_deg, Some(225));
        assert_eq!(r.battery_low, Some(false));
        assert!((r.temperature_c.unwrap() - 13.4).abs() < 0.01);
        assert_eq!(r.humidity_pct, Some(78));
        assert!((r.wind_avg_kmh.unwrap() - 12.096).abs() < 0.001);
        assert!((r.wind_gust_kmh.unwrap() - 16.128).abs() < 0.001);
        assert!((r.rain_mm.unwrap() - 36.9).abs() < 0.01);
        assert_eq!(r.uv_raw, Some(250));
        assert!((r.light_lux.unwrap() - 5000.0).abs() < 0.01);
        assert_eq!(r.pressure_hpa, None);
    }

    #[test]
    fn test_sentinel_fields_stay_absent() {
        // Same station with faulted humidity/wind/gust/uv/light sensors
        let r = decode_hex("2407E11216FFFFFF007BFFFFFFFFFFF59C").unwrap();
        assert!((r.temperature_c.unwrap() - 13.4).abs() < 0.01);
        assert_eq!(r.humidity_pct, None);
        assert_eq!(r.wind_avg_kmh, None);
        assert_eq!(r.wind_gust_kmh, None);
        assert_eq!(r.uv_raw, None);
        assert_eq!(r.light_lux, None);
        assert!(r.rain_mm.is_some());
    }

    #[test]
    fn test_high_bits_and_battery() {
        // dir=359 (9th bit set), wind raw 287 (9th bit set), low battery, -10.0 degC
        let r = decode_hex("24C567992C371FC89C404E20FFFFFED24B").unwrap();
        assert_eq!(r.station_id, 0xC5);
        assert_eq!(r.wind_dir_deg, Some(359));
        assert_eq!(r.battery_low, Some(true));
        assert!((r.temperature_c.unwrap() + 10.0).abs() < 0.01);
        assert!((r.wind_avg_kmh.unwrap() - 287.0 * 0.504).abs() < 0.01);
    }

    #[test]
    fn test_too_short() {
        let err = decode_hex("2407E102164E1804007B00FA00C350").unwrap_err();
        assert_eq!(err, DecodeFailure::TooShort { needed: 17, got: 15 });
    }

    #[test]
    fn test_wrong_family_byte() {
        let err = decode_hex("2507E102164E1804007B00FA00C3503349").unwrap_err();
        assert_eq!(err, DecodeFailure::StructuralMismatch);
    }

    #[test]
    fn test_crc_bit_flip_rejected() {
        let mut buf = hex::decode("2407E102164E1804007B00FA00C3503349").unwrap();
        buf[4] ^= 0x80;
        let err = decode(&buf, Utc::now(), LinkQuality::default()).unwrap_err();
        assert_eq!(err, DecodeFailure::ChecksumFailed);
    }

    #[test]
    fn test_additive_checksum_rejected_independently() {
        // Corrupt only the final byte: CRC still passes, checksum must not
        let mut buf = hex::decode("2407E102164E1804007B00FA00C3503349").unwrap();
        buf[16] = buf[16].wrapping_add(1);
        let err = decode(&buf, Utc::now(), LinkQuality::default()).unwrap_err();
        assert_eq!(err, DecodeFailure::ChecksumFailed);
    }

    #[test]
    fn test_wh65b_scale_factors() {
        let buf = hex::decode("2407E102164E1804007B00FA00C35033").unwrap();
        let r = decode_wh65b(&buf, Utc::now(), LinkQuality::default()).unwrap();
        assert_eq!(r.format, Format::Wh65b);
        assert!((r.wind_avg_kmh.unwrap() - 5.508).abs() < 0.001);
        assert!((r.wind_gust_kmh.unwrap() - 7.344).abs() < 0.001);
        assert!((r.rain_mm.unwrap() - 31.242).abs() < 0.01);
    }
}
