//! FineOffset data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format identifiers for the supported station families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Wh24,
    Wh65b,
    Wh1080,
    Wh25,
}

impl Format {
    /// Exact frame length in bytes (all supported formats are fixed-length)
    pub fn frame_len(&self) -> usize {
        match self {
            Format::Wh24 => 17,
            Format::Wh65b => 16,
            Format::Wh1080 => 10,
            Format::Wh25 => 8,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Wh24 => write!(f, "WH24"),
            Format::Wh65b => write!(f, "WH65B"),
            Format::Wh1080 => write!(f, "WH1080"),
            Format::Wh25 => write!(f, "WH25"),
        }
    }
}

/// Radio-layer metadata attached to a received frame.
///
/// Passed through unmodified; the decoding core never interprets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LinkQuality {
    /// Received signal strength in dBm
    pub rssi_dbm: f32,
    /// Signal-to-noise ratio in dB
    pub snr_db: f32,
    /// LNA gain step reported by the receiver
    pub lna: u8,
    /// AFC frequency error estimate in Hz
    pub freq_error_hz: i32,
}

/// One decoded, checksum-validated weather-station transmission.
///
/// A `Reading` only comes out of a decoder whose structural and checksum
/// checks passed. Fields a format's frame does not carry (or marked invalid
/// by the sensor) stay `None` rather than defaulting to zero.
///
/// Wind speeds are in the station-native km/h; conversion to canonical m/s
/// happens at the station-state boundary, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub format: Format,
    pub station_id: u8,
    /// Capture time supplied by the radio collaborator, not decoded from the payload
    pub rx_at: DateTime<Utc>,
    pub link: LinkQuality,

    /// Temperature in °C (outdoor for WH24/WH65B/WH1080, indoor for WH25)
    pub temperature_c: Option<f32>,
    /// Relative humidity in %
    pub humidity_pct: Option<u8>,
    /// Barometric pressure in hPa (WH25 only)
    pub pressure_hpa: Option<f32>,
    /// Average wind speed in km/h (native unit)
    pub wind_avg_kmh: Option<f32>,
    /// Wind gust in km/h (native unit)
    pub wind_gust_kmh: Option<f32>,
    /// Wind direction in degrees, 0-359
    pub wind_dir_deg: Option<u16>,
    /// Cumulative rainfall in mm since the transmitter last reset
    pub rain_mm: Option<f32>,
    /// Raw UV sensor value (WH24/WH65B)
    pub uv_raw: Option<u16>,
    /// Ambient light in lux (WH24/WH65B)
    pub light_lux: Option<f32>,
    /// Transmitter low-battery indicator
    pub battery_low: Option<bool>,
}

impl Reading {
    /// New reading with all sensor fields absent
    pub fn new(format: Format, station_id: u8, rx_at: DateTime<Utc>, link: LinkQuality) -> Self {
        Self {
            format,
            station_id,
            rx_at,
            link,
            temperature_c: None,
            humidity_pct: None,
            pressure_hpa: None,
            wind_avg_kmh: None,
            wind_gust_kmh: None,
            wind_dir_deg: None,
            rain_mm: None,
            uv_raw: None,
            light_lux: None,
            battery_low: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frame_len() {
        assert_eq!(Format::Wh24.frame_len(), 17);
        assert_eq!(Format::Wh65b.frame_len(), 16);
        assert_eq!(Format::Wh1080.frame_len(), 10);
        assert_eq!(Format::Wh25.frame_len(), 8);
    }

    #[test]
    fn test_format_serde_round_trip() {
        let json = serde_json::to_string(&Format::Wh1080).unwrap();
        assert_eq!(json, "\"wh1080\"");
        let back: Format = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Format::Wh1080);
    }

    #[test]
    fn test_new_reading_has_no_fields() {
        let r = Reading::new(Format::Wh25, 9, Utc::now(), LinkQuality::default());
        assert!(r.temperature_c.is_none());
        assert!(r.wind_avg_kmh.is_none());
        assert!(r.battery_low.is_none());
    }
}
