//! Presentation of decoded readings for the display and messaging collaborators
//!
//! Both outputs are in canonical units (wind in m/s). A structurally valid
//! reading with no matching registry entry still gets a full summary and
//! payload so an operator can spot and provision new stations.

use serde::Serialize;

use crate::fineoffset::{LinkQuality, Reading};
use crate::stations::Snapshot;

/// Plain structured summary for the display collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub wind_avg_ms: Option<f32>,
    pub wind_gust_ms: Option<f32>,
    pub wind_dir_deg: Option<u16>,
    pub temperature_c: Option<f32>,
    pub battery_low: Option<bool>,
}

impl Summary {
    pub fn from_reading(reading: &Reading) -> Self {
        let snap = Snapshot::from_reading(reading);
        Self {
            wind_avg_ms: snap.wind_avg_ms,
            wind_gust_ms: snap.wind_gust_ms,
            wind_dir_deg: snap.wind_dir_deg,
            temperature_c: snap.temperature_c,
            battery_low: snap.battery_low,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn opt(v: Option<f32>) -> String {
            v.map(|x| format!("{:.1}", x)).unwrap_or_else(|| "-".into())
        }

        write!(
            f,
            "Wavg: {} m/s | Wgust: {} m/s | Wdir: {} | Temp: {} C | Bat: {}",
            opt(self.wind_avg_ms),
            opt(self.wind_gust_ms),
            self.wind_dir_deg
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            opt(self.temperature_c),
            match self.battery_low {
                Some(true) => "LOW",
                Some(false) => "OK",
                None => "-",
            }
        )
    }
}

/// Outbound payload for the messaging collaborator
#[derive(Debug, Serialize)]
struct ReadingPayload<'a> {
    format: String,
    station_id: u8,
    rx_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature_c: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pressure_hpa: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wind_avg_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wind_gust_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wind_dir_deg: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rain_mm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uv_raw: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    light_lux: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_low: Option<bool>,
    link: &'a LinkQuality,
}

/// Format the outbound message payload for one reading
pub fn payload_json(reading: &Reading) -> serde_json::Result<String> {
    let snap = Snapshot::from_reading(reading);
    serde_json::to_string(&ReadingPayload {
        format: reading.format.to_string(),
        station_id: reading.station_id,
        rx_at: reading.rx_at.to_rfc3339(),
        temperature_c: snap.temperature_c,
        humidity_pct: snap.humidity_pct,
        pressure_hpa: snap.pressure_hpa,
        wind_avg_ms: snap.wind_avg_ms,
        wind_gust_ms: snap.wind_gust_ms,
        wind_dir_deg: snap.wind_dir_deg,
        rain_mm: snap.rain_mm,
        uv_raw: snap.uv_raw,
        light_lux: snap.light_lux,
        battery_low: snap.battery_low,
        link: &reading.link,
    })
}
