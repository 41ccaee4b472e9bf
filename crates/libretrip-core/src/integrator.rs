//! Trip Integration
//!
//! Pure trapezoidal integration of distance and fuel from consecutive valid
//! samples. Nothing here touches shared state; the caller carries the previous
//! sample of each channel in a [`PreviousSamples`] cache.

/// Volumetric fuel rate per unit of mass air flow: `3600 / (14.7 * 740)`,
/// i.e. g/s of air to L/h of gasoline at stoichiometric AFR and 740 g/L.
pub const MAF_TO_LITERS_PER_HOUR: f64 = 0.33094;

/// Milliseconds per hour
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// A valid sample of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Physical value
    pub value: f64,
    /// Clock tick at which the value was read
    pub timestamp_ms: u64,
}

impl Sample {
    /// Create a sample
    pub fn new(value: f64, timestamp_ms: u64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }
}

/// Increments to add to the cumulative trip totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripDelta {
    /// Distance travelled, km
    pub distance_km: f64,
    /// Fuel consumed, liters
    pub fuel_liters: f64,
    /// Time spent moving, ms
    pub moving_ms: u64,
}

impl TripDelta {
    /// True when the delta adds nothing
    pub fn is_zero(&self) -> bool {
        self.distance_km == 0.0 && self.fuel_liters == 0.0 && self.moving_ms == 0
    }
}

/// Hours elapsed from `prev` to `curr`; zero when time did not advance
pub fn elapsed_hours(prev: &Sample, curr: &Sample) -> f64 {
    curr.timestamp_ms.saturating_sub(prev.timestamp_ms) as f64 / MS_PER_HOUR
}

/// Convert mass air flow (g/s) to fuel rate (L/h)
pub fn fuel_rate_lph(maf_grams_per_sec: f64, calibration: f64) -> f64 {
    maf_grams_per_sec * MAF_TO_LITERS_PER_HOUR * calibration
}

/// Distance and moving time between two speed samples (km/h)
///
/// The first sample after a reset (`prev == None`) contributes nothing.
pub fn distance_delta(prev: Option<&Sample>, curr: &Sample) -> TripDelta {
    let Some(prev) = prev else {
        return TripDelta::default();
    };

    if prev.value <= 0.0 && curr.value <= 0.0 {
        return TripDelta::default();
    }

    let hours = elapsed_hours(prev, curr);
    let avg_speed = (prev.value + curr.value) / 2.0;
    let distance_km = (avg_speed * hours).max(0.0);

    let moving_ms = if distance_km > 0.0 {
        curr.timestamp_ms.saturating_sub(prev.timestamp_ms)
    } else {
        0
    };

    TripDelta {
        distance_km,
        moving_ms,
        ..TripDelta::default()
    }
}

/// Fuel consumed between two MAF samples (g/s)
pub fn fuel_delta(prev: Option<&Sample>, curr: &Sample, calibration: f64) -> TripDelta {
    let Some(prev) = prev else {
        return TripDelta::default();
    };

    let hours = elapsed_hours(prev, curr);
    let avg_maf = (prev.value + curr.value) / 2.0;
    let fuel_liters = (fuel_rate_lph(avg_maf, calibration) * hours).max(0.0);

    TripDelta {
        fuel_liters,
        ..TripDelta::default()
    }
}

/// Previous valid sample of each integrated channel
///
/// Session scoped: cleared whenever a channel reads invalid or the link drops,
/// so no delta is ever computed across a gap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviousSamples {
    speed: Option<Sample>,
    maf: Option<Sample>,
}

impl PreviousSamples {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate a new speed sample and remember it
    pub fn push_speed(&mut self, sample: Sample) -> TripDelta {
        let delta = distance_delta(self.speed.as_ref(), &sample);
        self.speed = Some(sample);
        delta
    }

    /// Integrate a new MAF sample and remember it
    pub fn push_maf(&mut self, sample: Sample, calibration: f64) -> TripDelta {
        let delta = fuel_delta(self.maf.as_ref(), &sample, calibration);
        self.maf = Some(sample);
        delta
    }

    /// Forget the previous speed sample
    pub fn clear_speed(&mut self) {
        self.speed = None;
    }

    /// Forget the previous MAF sample
    pub fn clear_maf(&mut self) {
        self.maf = None;
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.speed = None;
        self.maf = None;
    }

    /// Previous speed sample
    pub fn speed(&self) -> Option<&Sample> {
        self.speed.as_ref()
    }

    /// Previous MAF sample
    pub fn maf(&self) -> Option<&Sample> {
        self.maf.as_ref()
    }
}
