//! Per-station state: duplicate suppression, field merge, unit normalization
//!
//! Decoders emit station-native units (wind in km/h); everything downstream
//! of this module sees canonical units (wind in m/s). The conversion happens
//! exactly once, when a reading is folded into a [`Snapshot`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::fineoffset::{Format, Reading};

/// km/h per m/s
pub const KMH_PER_MS: f32 = 3.6;

/// Largest frame among the supported formats, bounds retained raw copies
pub const MAX_FRAME_LEN: usize = 17;

/// Field tolerances for recognizing a retransmitted reading whose analog
/// values jittered by one count. Integer fields must match exactly.
const DUP_TEMP_TOLERANCE_C: f32 = 0.2;
const DUP_WIND_TOLERANCE_MS: f32 = 0.2;
const DUP_PRESSURE_TOLERANCE_HPA: f32 = 0.2;
const DUP_RAIN_TOLERANCE_MM: f32 = 0.05;
const DUP_LIGHT_TOLERANCE_LUX: f32 = 10.0;

/// Result of folding one reading into a station entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Fresh data; callers should refresh displays / publish
    AcceptedNew,
    /// Retransmission of the previous reading; liveness refreshed, no new-data event
    AcceptedDuplicate,
    /// Fresh data that left at least one previously retained field untouched
    MergedPartial,
}

/// Canonical-unit view of one or more merged readings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub wind_avg_ms: Option<f32>,
    pub wind_gust_ms: Option<f32>,
    pub wind_dir_deg: Option<u16>,
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<u8>,
    pub pressure_hpa: Option<f32>,
    pub rain_mm: Option<f32>,
    pub uv_raw: Option<u16>,
    pub light_lux: Option<f32>,
    pub battery_low: Option<bool>,
}

impl Snapshot {
    /// Convert a decoded reading from native to canonical units
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            wind_avg_ms: reading.wind_avg_kmh.map(|v| v / KMH_PER_MS),
            wind_gust_ms: reading.wind_gust_kmh.map(|v| v / KMH_PER_MS),
            wind_dir_deg: reading.wind_dir_deg,
            temperature_c: reading.temperature_c,
            humidity_pct: reading.humidity_pct,
            pressure_hpa: reading.pressure_hpa,
            rain_mm: reading.rain_mm,
            uv_raw: reading.uv_raw,
            light_lux: reading.light_lux,
            battery_low: reading.battery_low,
        }
    }

    /// Fold `incoming` into this snapshot. Present fields overwrite, absent
    /// fields leave the retained value in place. Returns true if at least one
    /// previously retained field survived an absent incoming field.
    pub fn merge_from(&mut self, incoming: &Snapshot) -> bool {
        let mut preserved = false;

        macro_rules! merge_field {
            ($field:ident) => {
                match incoming.$field {
                    Some(v) => self.$field = Some(v),
                    None => preserved |= self.$field.is_some(),
                }
            };
        }

        merge_field!(wind_avg_ms);
        merge_field!(wind_gust_ms);
        merge_field!(wind_dir_deg);
        merge_field!(temperature_c);
        merge_field!(humidity_pct);
        merge_field!(pressure_hpa);
        merge_field!(rain_mm);
        merge_field!(uv_raw);
        merge_field!(light_lux);
        merge_field!(battery_low);

        preserved
    }

    /// Whether `other` reports the same observation within sensor noise
    fn approx_eq(&self, other: &Snapshot) -> bool {
        fn close(a: Option<f32>, b: Option<f32>, tol: f32) -> bool {
            match (a, b) {
                (Some(x), Some(y)) => (x - y).abs() <= tol,
                (None, None) => true,
                _ => false,
            }
        }

        close(self.wind_avg_ms, other.wind_avg_ms, DUP_WIND_TOLERANCE_MS)
            && close(self.wind_gust_ms, other.wind_gust_ms, DUP_WIND_TOLERANCE_MS)
            && self.wind_dir_deg == other.wind_dir_deg
            && close(self.temperature_c, other.temperature_c, DUP_TEMP_TOLERANCE_C)
            && self.humidity_pct == other.humidity_pct
            && close(self.pressure_hpa, other.pressure_hpa, DUP_PRESSURE_TOLERANCE_HPA)
            && close(self.rain_mm, other.rain_mm, DUP_RAIN_TOLERANCE_MM)
            && self.uv_raw == other.uv_raw
            && close(self.light_lux, other.light_lux, DUP_LIGHT_TOLERANCE_LUX)
            && self.battery_low == other.battery_low
    }
}

/// A configured station's identity plus its accumulated runtime state.
///
/// Identity (format, id, label) round-trips through the persisted registry
/// blob; runtime state starts empty on every load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationEntry {
    pub format: Format,
    pub station_id: u8,
    #[serde(default)]
    pub label: String,

    /// Merged canonical-unit snapshot of everything accepted so far
    #[serde(skip)]
    pub snapshot: Snapshot,
    /// Canonical view of the last single accepted reading (pre-merge), used
    /// for duplicate comparison
    #[serde(skip)]
    last_obs: Option<Snapshot>,
    #[serde(skip)]
    last_raw: [u8; MAX_FRAME_LEN],
    #[serde(skip)]
    last_raw_len: u8,
    /// Capture time of the most recent accepted reading, duplicates included
    #[serde(skip)]
    pub last_rx: Option<DateTime<Utc>>,
    /// Total readings folded in, duplicates included
    #[serde(skip)]
    pub updates: u64,
}

impl StationEntry {
    pub fn new(format: Format, station_id: u8, label: impl Into<String>) -> Self {
        Self {
            format,
            station_id,
            label: label.into(),
            snapshot: Snapshot::default(),
            last_obs: None,
            last_raw: [0u8; MAX_FRAME_LEN],
            last_raw_len: 0,
            last_rx: None,
            updates: 0,
        }
    }

    fn last_frame(&self) -> &[u8] {
        &self.last_raw[..self.last_raw_len as usize]
    }

    /// Fold one accepted reading into this entry.
    ///
    /// A reading is a duplicate when it arrives within `dup_window` of the
    /// previous one and is either a byte-identical retransmission or matches
    /// the previous observation within sensor noise. Duplicates still refresh
    /// the retained snapshot and liveness timestamp; they just don't count as
    /// new data.
    pub fn update(&mut self, reading: &Reading, raw: &[u8], dup_window: Duration) -> UpdateOutcome {
        let obs = Snapshot::from_reading(reading);
        let frame_len = reading
            .format
            .frame_len()
            .min(raw.len())
            .min(MAX_FRAME_LEN);
        let frame = &raw[..frame_len];

        let is_duplicate = match (self.last_rx, &self.last_obs) {
            (Some(last_rx), Some(last_obs)) => {
                let age = reading.rx_at.signed_duration_since(last_rx);
                age >= Duration::zero()
                    && age <= dup_window
                    && (frame == self.last_frame() || last_obs.approx_eq(&obs))
            }
            _ => false,
        };

        let preserved = self.snapshot.merge_from(&obs);
        self.last_obs = Some(obs);
        self.last_raw[..frame_len].copy_from_slice(frame);
        self.last_raw_len = frame_len as u8;
        self.last_rx = Some(reading.rx_at);
        self.updates += 1;

        if is_duplicate {
            UpdateOutcome::AcceptedDuplicate
        } else if preserved {
            UpdateOutcome::MergedPartial
        } else {
            UpdateOutcome::AcceptedNew
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fineoffset::{decode, LinkQuality};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn wh1080_reading(secs: i64) -> (Reading, Vec<u8>) {
        let raw = hex::decode("A0715C43191F012C0B21").unwrap();
        let reading = decode(&raw, at(secs), LinkQuality::default()).unwrap();
        (reading, raw)
    }

    fn wh24_reading(hex_frame: &str, secs: i64) -> (Reading, Vec<u8>) {
        let raw = hex::decode(hex_frame).unwrap();
        let reading = decode(&raw, at(secs), LinkQuality::default()).unwrap();
        (reading, raw)
    }

    #[test]
    fn test_burst_dedup_is_idempotent() {
        let mut entry = StationEntry::new(Format::Wh1080, 7, "garden mast");
        let window = Duration::seconds(5);

        let mut outcomes = Vec::new();
        for i in 0..4 {
            let (reading, raw) = wh1080_reading(i);
            outcomes.push(entry.update(&reading, &raw, window));
        }

        assert_eq!(outcomes[0], UpdateOutcome::AcceptedNew);
        assert!(outcomes[1..]
            .iter()
            .all(|o| *o == UpdateOutcome::AcceptedDuplicate));
        // Liveness reflects the last repeat, not the first
        assert_eq!(entry.last_rx, Some(at(3)));
        assert_eq!(entry.updates, 4);
    }

    #[test]
    fn test_repeat_outside_window_is_new() {
        let mut entry = StationEntry::new(Format::Wh1080, 7, "");
        let window = Duration::seconds(5);

        let (r1, raw) = wh1080_reading(0);
        assert_eq!(entry.update(&r1, &raw, window), UpdateOutcome::AcceptedNew);
        let (r2, raw) = wh1080_reading(60);
        assert_eq!(entry.update(&r2, &raw, window), UpdateOutcome::AcceptedNew);
    }

    #[test]
    fn test_jittered_repeat_within_tolerance_is_duplicate() {
        let mut entry = StationEntry::new(Format::Wh24, 7, "");
        let window = Duration::seconds(5);

        let (r1, raw1) = wh24_reading("2407E102164E1804007B00FA00C3503349", 0);
        assert_eq!(entry.update(&r1, &raw1, window), UpdateOutcome::AcceptedNew);

        // One analog count of jitter, different raw bytes
        let mut r2 = r1.clone();
        r2.rx_at = at(2);
        r2.temperature_c = r1.temperature_c.map(|t| t + 0.1);
        let mut raw2 = raw1.clone();
        raw2[4] ^= 0x01;
        assert_eq!(
            entry.update(&r2, &raw2, window),
            UpdateOutcome::AcceptedDuplicate
        );
    }

    #[test]
    fn test_partial_frame_merges_without_blanking() {
        let mut entry = StationEntry::new(Format::Wh24, 7, "");
        let window = Duration::seconds(5);

        let (full, raw) = wh24_reading("2407E102164E1804007B00FA00C3503349", 0);
        entry.update(&full, &raw, window);
        assert_eq!(entry.snapshot.humidity_pct, Some(78));

        // Faulted-sensor frame: humidity/wind/gust/uv/light absent
        let (partial, raw) = wh24_reading("2407E11216FFFFFF007BFFFFFFFFFFF59C", 60);
        let outcome = entry.update(&partial, &raw, window);
        assert_eq!(outcome, UpdateOutcome::MergedPartial);
        // Retained fields survive, present fields refresh
        assert_eq!(entry.snapshot.humidity_pct, Some(78));
        assert!(entry.snapshot.wind_avg_ms.is_some());
        assert!((entry.snapshot.temperature_c.unwrap() - 13.4).abs() < 0.01);
    }

    #[test]
    fn test_wind_normalized_to_canonical_ms() {
        let mut entry = StationEntry::new(Format::Wh1080, 7, "");
        let (reading, raw) = wh1080_reading(0);
        // 25 counts * 1.224 km/h = 30.6 km/h native
        assert!((reading.wind_avg_kmh.unwrap() - 30.6).abs() < 0.01);

        entry.update(&reading, &raw, Duration::seconds(5));
        // 30.6 km/h -> 8.5 m/s canonical
        assert!((entry.snapshot.wind_avg_ms.unwrap() - 8.5).abs() < 0.001);
    }

    #[test]
    fn test_first_update_on_empty_entry_is_new() {
        // A WH25 frame carries no wind fields at all; with nothing retained
        // yet this is plain new data, not a partial merge
        let mut entry = StationEntry::new(Format::Wh25, 0x3C, "study");
        let raw = hex::decode("E3C2692D2794F6D6").unwrap();
        let reading = decode(&raw, at(0), LinkQuality::default()).unwrap();
        assert_eq!(
            entry.update(&reading, &raw, Duration::seconds(5)),
            UpdateOutcome::AcceptedNew
        );
        assert!((entry.snapshot.pressure_hpa.unwrap() - 1013.2).abs() < 0.01);
    }
}
