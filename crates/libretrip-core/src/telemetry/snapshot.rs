//! Telemetry snapshot contents

use serde::{Deserialize, Serialize};

use super::{Reading, SelectedProgram};
use crate::integrator::TripDelta;
use crate::reader::ParameterId;

/// Every field of the telemetry store
///
/// Inside the store this is only reachable under the lock; outside it, it is
/// an owned point-in-time copy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Vehicle speed, km/h
    pub speed_kph: Reading,
    /// Mass air flow, g/s
    pub maf_grams_per_sec: Reading,
    /// Engine speed, rev/min
    pub rpm: Reading,
    /// Calculated engine load, %
    pub engine_load_pct: Reading,
    /// Fuel tank level, %
    pub fuel_level_pct: Reading,
    /// Stored trouble code count
    pub diagnostic_codes: Reading,
    /// Distance since process start, km; never decreases
    pub cumulative_distance_km: f64,
    /// Fuel since process start, liters; never decreases
    pub cumulative_fuel_liters: f64,
    /// Time spent with the vehicle moving, ms
    pub moving_time_ms: u64,
    /// Clock tick of the most recent successful poll of any parameter
    pub last_update_ms: Option<u64>,
    /// Whether the transport reports an active connection
    pub link_up: bool,
    /// Program chosen by the presentation layer
    pub selected_program: SelectedProgram,
}

impl TelemetrySnapshot {
    /// Reading slot for a parameter
    pub fn reading(&self, parameter: ParameterId) -> Reading {
        match parameter {
            ParameterId::Speed => self.speed_kph,
            ParameterId::MassAirFlow => self.maf_grams_per_sec,
            ParameterId::Rpm => self.rpm,
            ParameterId::EngineLoad => self.engine_load_pct,
            ParameterId::FuelLevel => self.fuel_level_pct,
            ParameterId::DiagnosticCodes => self.diagnostic_codes,
        }
    }

    fn reading_mut(&mut self, parameter: ParameterId) -> &mut Reading {
        match parameter {
            ParameterId::Speed => &mut self.speed_kph,
            ParameterId::MassAirFlow => &mut self.maf_grams_per_sec,
            ParameterId::Rpm => &mut self.rpm,
            ParameterId::EngineLoad => &mut self.engine_load_pct,
            ParameterId::FuelLevel => &mut self.fuel_level_pct,
            ParameterId::DiagnosticCodes => &mut self.diagnostic_codes,
        }
    }

    /// Store a successful poll and refresh the liveness timestamp
    pub fn record(&mut self, parameter: ParameterId, value: f64, now_ms: u64) {
        *self.reading_mut(parameter) = Reading::valid(value);
        self.last_update_ms = Some(now_ms);
    }

    /// Mark a parameter as having no data
    pub fn invalidate(&mut self, parameter: ParameterId) {
        *self.reading_mut(parameter) = Reading::INVALID;
    }

    /// Add a trip delta to the cumulative totals
    ///
    /// Negative or non-finite increments are ignored so the totals can only grow.
    pub fn accumulate(&mut self, delta: &TripDelta) {
        if delta.distance_km.is_finite() && delta.distance_km > 0.0 {
            self.cumulative_distance_km += delta.distance_km;
        }
        if delta.fuel_liters.is_finite() && delta.fuel_liters > 0.0 {
            self.cumulative_fuel_liters += delta.fuel_liters;
        }
        self.moving_time_ms += delta.moving_ms;
    }

    /// Link dropped: speed shows "no data", totals stay
    pub fn mark_link_down(&mut self) {
        self.link_up = false;
        self.speed_kph = Reading::INVALID;
    }

    /// Link re-established
    pub fn mark_link_up(&mut self) {
        self.link_up = true;
    }

    /// Milliseconds since the last successful poll, `None` if there never was one
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_update_ms.map(|t| now_ms.saturating_sub(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let snapshot = TelemetrySnapshot::default();
        assert!(!snapshot.speed_kph.valid);
        assert!(!snapshot.link_up);
        assert_eq!(snapshot.cumulative_distance_km, 0.0);
        assert_eq!(snapshot.last_update_ms, None);
        assert_eq!(snapshot.selected_program, SelectedProgram::Basic);
    }

    #[test]
    fn test_record_refreshes_timestamp_for_any_parameter() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.record(ParameterId::EngineLoad, 40.0, 1234);
        assert_eq!(snapshot.last_update_ms, Some(1234));
        assert_eq!(snapshot.engine_load_pct.value(), Some(40.0));
        assert_eq!(snapshot.age_ms(1500), Some(266));
    }

    #[test]
    fn test_accumulate_never_decreases() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.accumulate(&TripDelta {
            distance_km: 1.5,
            fuel_liters: 0.1,
            moving_ms: 500,
        });
        snapshot.accumulate(&TripDelta {
            distance_km: -3.0,
            fuel_liters: f64::NAN,
            moving_ms: 0,
        });
        assert_eq!(snapshot.cumulative_distance_km, 1.5);
        assert_eq!(snapshot.cumulative_fuel_liters, 0.1);
        assert_eq!(snapshot.moving_time_ms, 500);
    }

    #[test]
    fn test_link_down_keeps_totals() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.record(ParameterId::Speed, 50.0, 10);
        snapshot.cumulative_distance_km = 10.0;
        snapshot.mark_link_up();
        snapshot.mark_link_down();
        assert!(!snapshot.link_up);
        assert!(!snapshot.speed_kph.valid);
        assert_eq!(snapshot.cumulative_distance_km, 10.0);
    }
}
