//! Display-ready view of a snapshot

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::metrics::{
    average_economy, average_liters_per_100km, average_moving_speed, instant_economy,
    instant_liters_per_100km, link_status, LinkStatus,
};
use crate::config::TripConfig;
use crate::integrator::fuel_rate_lph;
use crate::telemetry::{SelectedProgram, TelemetrySnapshot};

/// Settings that shape derived metrics
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    /// Live/stale boundary, ms
    pub staleness_threshold_ms: u64,
    /// Instantaneous economy clamp
    pub max_display_economy: f64,
    /// Fuel calibration multiplier
    pub fuel_calibration: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self::from(&TripConfig::default())
    }
}

impl From<&TripConfig> for DisplaySettings {
    fn from(config: &TripConfig) -> Self {
        Self {
            staleness_threshold_ms: config.staleness_threshold_ms,
            max_display_economy: config.max_display_economy,
            fuel_calibration: config.fuel_calibration,
        }
    }
}

/// Everything a renderer needs for one frame
///
/// `None` means "no data" and should be drawn as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    /// Program to render
    pub program: SelectedProgram,
    /// Link indicator
    pub link: LinkStatus,
    /// Vehicle speed, km/h
    pub speed_kph: Option<f64>,
    /// Mass air flow, g/s
    pub maf_grams_per_sec: Option<f64>,
    /// Engine speed, rev/min
    pub rpm: Option<f64>,
    /// Engine load, %
    pub engine_load_pct: Option<f64>,
    /// Fuel tank level, %
    pub fuel_level_pct: Option<f64>,
    /// Stored trouble code count
    pub diagnostic_codes: Option<u32>,
    /// Fuel flow, L/h
    pub fuel_rate_lph: Option<f64>,
    /// Instantaneous economy, mpg (clamped)
    pub instant_economy_mpg: Option<f64>,
    /// Trip economy, mpg
    pub average_economy_mpg: Option<f64>,
    /// Instantaneous consumption, L/100 km
    pub instant_l_per_100km: Option<f64>,
    /// Trip consumption, L/100 km
    pub average_l_per_100km: Option<f64>,
    /// Trip distance, km
    pub distance_km: f64,
    /// Trip fuel, liters
    pub fuel_liters: f64,
    /// Time spent moving
    pub moving_time: Duration,
    /// Average speed while moving, km/h
    pub average_speed_kph: Option<f64>,
}

impl DashboardView {
    /// Derive a view from a snapshot taken at `now_ms`
    pub fn from_snapshot(
        snapshot: &TelemetrySnapshot,
        now_ms: u64,
        settings: &DisplaySettings,
    ) -> Self {
        let speed = snapshot.speed_kph.value();
        let maf = snapshot.maf_grams_per_sec.value();
        let moving_pair = speed.zip(maf);

        Self {
            program: snapshot.selected_program,
            link: link_status(snapshot, now_ms, settings.staleness_threshold_ms),
            speed_kph: speed,
            maf_grams_per_sec: maf,
            rpm: snapshot.rpm.value(),
            engine_load_pct: snapshot.engine_load_pct.value(),
            fuel_level_pct: snapshot.fuel_level_pct.value(),
            diagnostic_codes: snapshot.diagnostic_codes.value().map(|n| n as u32),
            fuel_rate_lph: maf.map(|m| fuel_rate_lph(m, settings.fuel_calibration)),
            instant_economy_mpg: moving_pair
                .and_then(|(s, m)| instant_economy(s, m, settings.max_display_economy)),
            average_economy_mpg: average_economy(
                snapshot.cumulative_distance_km,
                snapshot.cumulative_fuel_liters,
            ),
            instant_l_per_100km: moving_pair
                .and_then(|(s, m)| instant_liters_per_100km(s, m, settings.fuel_calibration)),
            average_l_per_100km: average_liters_per_100km(
                snapshot.cumulative_distance_km,
                snapshot.cumulative_fuel_liters,
            ),
            distance_km: snapshot.cumulative_distance_km,
            fuel_liters: snapshot.cumulative_fuel_liters,
            moving_time: Duration::from_millis(snapshot.moving_time_ms),
            average_speed_kph: average_moving_speed(
                snapshot.cumulative_distance_km,
                snapshot.moving_time_ms,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ParameterId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_snapshot_is_all_placeholders() {
        let view = DashboardView::from_snapshot(
            &TelemetrySnapshot::default(),
            1000,
            &DisplaySettings::default(),
        );
        assert_eq!(view.link, LinkStatus::Down);
        assert_eq!(view.speed_kph, None);
        assert_eq!(view.instant_economy_mpg, None);
        assert_eq!(view.average_economy_mpg, None);
        assert_eq!(view.average_speed_kph, None);
    }

    #[test]
    fn test_view_from_live_snapshot() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.mark_link_up();
        snapshot.record(ParameterId::Speed, 100.0, 900);
        snapshot.record(ParameterId::MassAirFlow, 10.0, 950);
        snapshot.cumulative_distance_km = 80.0;
        snapshot.cumulative_fuel_liters = 5.0;
        snapshot.moving_time_ms = 3_600_000;

        let view = DashboardView::from_snapshot(&snapshot, 1000, &DisplaySettings::default());
        assert_eq!(view.link, LinkStatus::Live);
        assert_eq!(view.instant_economy_mpg, Some(71.07335739268333));
        assert_eq!(view.average_economy_mpg, Some(37.6336));
        assert_eq!(view.average_l_per_100km, Some(6.25));
        assert_eq!(view.average_speed_kph, Some(80.0));
        assert_eq!(view.moving_time, Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_maf_hides_instant_economy_only() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.mark_link_up();
        snapshot.record(ParameterId::Speed, 60.0, 0);
        snapshot.cumulative_distance_km = 10.0;
        snapshot.cumulative_fuel_liters = 1.0;

        let view = DashboardView::from_snapshot(&snapshot, 100, &DisplaySettings::default());
        assert_eq!(view.speed_kph, Some(60.0));
        assert_eq!(view.instant_economy_mpg, None);
        assert!(view.average_economy_mpg.is_some());
    }
}
