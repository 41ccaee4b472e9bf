//! Derived display metrics
//!
//! Computed from a snapshot copy, never from the live store. Economy figures
//! follow the trip computer's established formulas exactly, including the
//! order of operations.

use serde::{Deserialize, Serialize};

use crate::integrator::fuel_rate_lph;
use crate::telemetry::TelemetrySnapshot;

/// Minimum trip distance before an average is shown, km
pub const MIN_AVERAGE_DISTANCE_KM: f64 = 0.1;

/// Minimum fuel used before an average is shown, liters
pub const MIN_AVERAGE_FUEL_LITERS: f64 = 0.001;

/// Link health as shown to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Data is arriving
    Live,
    /// Link up but nothing new within the staleness threshold
    Stale,
    /// Transport reports no connection
    Down,
}

/// Instantaneous economy, mpg
///
/// Only defined while moving with air flowing; clamped to `max_display` so a
/// near-zero MAF (coasting) does not spike the display.
pub fn instant_economy(speed_kph: f64, maf_grams_per_sec: f64, max_display: f64) -> Option<f64> {
    if !(speed_kph > 0.0 && maf_grams_per_sec > 0.0) {
        return None;
    }
    let econ =
        (14.7 * 6.17 * 4.54 * speed_kph * 0.621371) / (3600.0 * maf_grams_per_sec / 100.0);
    Some(econ.min(max_display))
}

/// Average trip economy, mpg
pub fn average_economy(distance_km: f64, fuel_liters: f64) -> Option<f64> {
    if distance_km > MIN_AVERAGE_DISTANCE_KM && fuel_liters > MIN_AVERAGE_FUEL_LITERS {
        Some(235.21 / ((fuel_liters / distance_km) * 100.0))
    } else {
        None
    }
}

/// Instantaneous consumption, L/100 km
pub fn instant_liters_per_100km(
    speed_kph: f64,
    maf_grams_per_sec: f64,
    calibration: f64,
) -> Option<f64> {
    if !(speed_kph > 0.0 && maf_grams_per_sec > 0.0) {
        return None;
    }
    Some(fuel_rate_lph(maf_grams_per_sec, calibration) / speed_kph * 100.0)
}

/// Average consumption, L/100 km
pub fn average_liters_per_100km(distance_km: f64, fuel_liters: f64) -> Option<f64> {
    if distance_km > MIN_AVERAGE_DISTANCE_KM && fuel_liters > MIN_AVERAGE_FUEL_LITERS {
        Some(fuel_liters / distance_km * 100.0)
    } else {
        None
    }
}

/// Average speed over moving time, km/h
pub fn average_moving_speed(distance_km: f64, moving_time_ms: u64) -> Option<f64> {
    if moving_time_ms == 0 {
        return None;
    }
    Some(distance_km / (moving_time_ms as f64 / 3_600_000.0))
}

/// Classify link health from `link_up` and the age of the last update
pub fn link_status(snapshot: &TelemetrySnapshot, now_ms: u64, threshold_ms: u64) -> LinkStatus {
    if !snapshot.link_up {
        return LinkStatus::Down;
    }
    match snapshot.age_ms(now_ms) {
        Some(age) if age < threshold_ms => LinkStatus::Live,
        _ => LinkStatus::Stale,
    }
}
