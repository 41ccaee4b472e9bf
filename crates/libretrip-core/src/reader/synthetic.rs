//! Demo Mode - Synthetic vehicle data generator
//!
//! Generates a plausible stop-and-go drive cycle without a real adapter:
//! the car waits at a stop, accelerates to a random target speed, cruises,
//! then brakes back to a stop. Speed, MAF, rpm and load are correlated, and
//! the generator is seeded so the same seed always produces the same drive.
//!
//! Link outages and query latency can be scripted for exercising the
//! acquisition loop's recovery paths.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ParameterId, ParameterReader, QueryOutcome, TransportError};
use crate::clock::Clock;

/// Seed used by [`SyntheticReader::new`]
pub const DEFAULT_SEED: u64 = 0x0B_D2;

const IDLE_RPM: f64 = 800.0;
const IDLE_MAF: f64 = 2.5;
const START_FUEL_LEVEL_PCT: f64 = 75.0;

/// Scripted window during which the link is down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOutage {
    /// Clock tick at which the link drops
    pub start_ms: u64,
    /// How long the link stays down
    pub duration_ms: u64,
}

impl LinkOutage {
    /// Whether `now_ms` falls inside the outage
    pub fn contains(&self, now_ms: u64) -> bool {
        now_ms >= self.start_ms && now_ms < self.start_ms + self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DrivePhase {
    /// Waiting at a stop
    Stopped { until_ms: u64 },
    /// Speeding up towards a target
    Accelerating {
        start_ms: u64,
        from_kph: f64,
        target_kph: f64,
        rate_kph_s: f64,
    },
    /// Holding speed
    Cruising {
        start_ms: u64,
        until_ms: u64,
        speed_kph: f64,
    },
    /// Slowing to a stop
    Braking {
        start_ms: u64,
        from_kph: f64,
        rate_kph_s: f64,
    },
}

/// Synthetic [`ParameterReader`] driven by a [`Clock`]
pub struct SyntheticReader<C: Clock> {
    clock: C,
    rng: StdRng,
    phase: DrivePhase,
    outages: Vec<LinkOutage>,
    connected: bool,
    /// Pending polls reported before each query resolves
    latency_polls: u32,
    pending: Option<(ParameterId, u32)>,
    /// Probability that a single query fails transiently
    failure_rate: f64,
    diagnostic_codes: u8,
}

impl<C: Clock> SyntheticReader<C> {
    /// Create a generator with the default seed
    pub fn new(clock: C) -> Self {
        Self::with_seed(clock, DEFAULT_SEED)
    }

    /// Create a generator with a specific seed
    pub fn with_seed(clock: C, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let first_stop = clock.now_ms() + rng.gen_range(2000..5000);

        Self {
            clock,
            rng,
            phase: DrivePhase::Stopped {
                until_ms: first_stop,
            },
            outages: Vec::new(),
            connected: false,
            latency_polls: 0,
            pending: None,
            failure_rate: 0.0,
            diagnostic_codes: 0,
        }
    }

    /// Script a link outage
    pub fn with_outage(mut self, outage: LinkOutage) -> Self {
        self.outages.push(outage);
        self
    }

    /// Report `polls` pending results before each query resolves
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency_polls = polls;
        self
    }

    /// Fail each query with the given probability
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Number of stored trouble codes reported by the diagnostics query
    pub fn with_diagnostic_codes(mut self, count: u8) -> Self {
        self.diagnostic_codes = count.min(0x7F);
        self
    }

    fn in_outage(&self, now_ms: u64) -> bool {
        self.outages.iter().any(|o| o.contains(now_ms))
    }

    /// Advance the drive cycle to `now_ms`, stepping through every phase that
    /// ended in between
    fn advance(&mut self, now_ms: u64) {
        loop {
            let next = match self.phase {
                DrivePhase::Stopped { until_ms } if now_ms >= until_ms => {
                    DrivePhase::Accelerating {
                        start_ms: until_ms,
                        from_kph: 0.0,
                        target_kph: self.rng.gen_range(30.0..120.0),
                        rate_kph_s: self.rng.gen_range(5.0..12.0),
                    }
                }
                DrivePhase::Accelerating {
                    start_ms,
                    from_kph,
                    target_kph,
                    rate_kph_s,
                } => {
                    let end_ms = start_ms + ((target_kph - from_kph) / rate_kph_s * 1000.0) as u64;
                    if now_ms < end_ms {
                        break;
                    }
                    DrivePhase::Cruising {
                        start_ms: end_ms,
                        until_ms: end_ms + self.rng.gen_range(10_000..40_000),
                        speed_kph: target_kph,
                    }
                }
                DrivePhase::Cruising {
                    until_ms,
                    speed_kph,
                    ..
                } if now_ms >= until_ms => DrivePhase::Braking {
                    start_ms: until_ms,
                    from_kph: speed_kph,
                    rate_kph_s: self.rng.gen_range(6.0..10.0),
                },
                DrivePhase::Braking {
                    start_ms,
                    from_kph,
                    rate_kph_s,
                } => {
                    let end_ms = start_ms + (from_kph / rate_kph_s * 1000.0) as u64;
                    if now_ms < end_ms {
                        break;
                    }
                    DrivePhase::Stopped {
                        until_ms: end_ms + self.rng.gen_range(3000..8000),
                    }
                }
                _ => break,
            };
            self.phase = next;
        }
    }

    /// Current speed (km/h) and acceleration (km/h per second)
    fn kinematics(&self, now_ms: u64) -> (f64, f64) {
        match self.phase {
            DrivePhase::Stopped { .. } => (0.0, 0.0),
            DrivePhase::Accelerating {
                start_ms,
                from_kph,
                target_kph,
                rate_kph_s,
            } => {
                let t = now_ms.saturating_sub(start_ms) as f64 / 1000.0;
                ((from_kph + rate_kph_s * t).min(target_kph), rate_kph_s)
            }
            DrivePhase::Cruising {
                start_ms,
                speed_kph,
                ..
            } => {
                let t = now_ms.saturating_sub(start_ms) as f64 / 1000.0;
                let wobble = 1.5 * (t * 0.4).sin() + 0.5 * (t * 1.7).sin();
                ((speed_kph + wobble).max(0.0), 0.0)
            }
            DrivePhase::Braking {
                start_ms,
                from_kph,
                rate_kph_s,
            } => {
                let t = now_ms.saturating_sub(start_ms) as f64 / 1000.0;
                ((from_kph - rate_kph_s * t).max(0.0), -rate_kph_s)
            }
        }
    }

    /// Generate the current value of a parameter
    fn sample(&mut self, parameter: ParameterId, now_ms: u64) -> f64 {
        self.advance(now_ms);
        let (speed, accel) = self.kinematics(now_ms);

        // Fuel cut while braking leaves only idle air
        let maf = if accel < 0.0 {
            IDLE_MAF
        } else {
            IDLE_MAF + speed * 0.12 + accel * 1.5
        };
        let t = now_ms as f64 / 1000.0;

        let value = match parameter {
            ParameterId::Speed => speed.round(),
            ParameterId::MassAirFlow => maf + 0.2 * (t * 3.1).sin(),
            ParameterId::Rpm => IDLE_RPM + speed * 28.0 + 15.0 * (t * 2.5).sin(),
            ParameterId::EngineLoad => 18.0 + maf * 1.2,
            ParameterId::FuelLevel => START_FUEL_LEVEL_PCT - t / 3600.0 * 4.0,
            ParameterId::DiagnosticCodes => f64::from(self.diagnostic_codes),
        };

        let range = parameter.valid_range();
        value.clamp(*range.start(), *range.end())
    }
}

impl<C: Clock> ParameterReader for SyntheticReader<C> {
    async fn query(&mut self, parameter: ParameterId) -> QueryOutcome {
        let now_ms = self.clock.now_ms();
        if !self.connected || self.in_outage(now_ms) {
            self.connected = false;
            self.pending = None;
            return QueryOutcome::Failure;
        }

        if self.latency_polls > 0 {
            let polls = match self.pending {
                Some((p, n)) if p == parameter => n + 1,
                _ => 1,
            };
            if polls <= self.latency_polls {
                self.pending = Some((parameter, polls));
                return QueryOutcome::Pending;
            }
            self.pending = None;
        }

        if self.failure_rate > 0.0 && self.rng.gen_bool(self.failure_rate) {
            return QueryOutcome::Failure;
        }

        QueryOutcome::Success(self.sample(parameter, now_ms))
    }

    fn is_link_up(&self) -> bool {
        self.connected && !self.in_outage(self.clock.now_ms())
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        if self.in_outage(self.clock.now_ms()) {
            return Err(TransportError::SimulatedOutage);
        }
        self.connected = true;
        Ok(())
    }

    async fn initialize_protocol(&mut self) -> Result<(), TransportError> {
        if self.is_link_up() {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}
