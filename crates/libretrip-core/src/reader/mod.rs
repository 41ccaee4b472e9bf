//! Parameter Readers
//!
//! The acquisition loop talks to the vehicle through the [`ParameterReader`]
//! trait. Two implementations ship with the crate:
//!
//! - [`Elm327Reader`]: an ELM327-compatible adapter on a serial port or TCP
//! - [`SyntheticReader`]: a deterministic drive-cycle generator for demo mode
//!   and tests

mod codec;
pub mod elm327;
mod error;
pub mod pid;
pub mod serial;
pub mod stream;
pub mod synthetic;

pub use codec::{ElmCodec, ElmResponse};
pub use elm327::{Elm327Reader, SerialElm327, TcpElm327};
pub use error::TransportError;
pub use serial::{open_port, TransportSettings};
pub use stream::{Connector, SerialConnector, TcpConnector};
pub use synthetic::{LinkOutage, SyntheticReader};

use std::fmt;
use std::future::Future;
use std::ops::RangeInclusive;

/// Default baud rate for ELM327 adapters
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default time allowed for a complete adapter response, in milliseconds
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Parameters the acquisition loop knows how to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    /// Vehicle speed, km/h
    Speed,
    /// Mass air flow, g/s
    MassAirFlow,
    /// Engine speed, rev/min
    Rpm,
    /// Calculated engine load, %
    EngineLoad,
    /// Fuel tank level, %
    FuelLevel,
    /// Number of stored trouble codes
    DiagnosticCodes,
}

impl ParameterId {
    /// Mode 01 PID for this parameter
    pub fn pid(self) -> u8 {
        match self {
            ParameterId::Speed => 0x0D,
            ParameterId::MassAirFlow => 0x10,
            ParameterId::Rpm => 0x0C,
            ParameterId::EngineLoad => 0x04,
            ParameterId::FuelLevel => 0x2F,
            ParameterId::DiagnosticCodes => 0x01,
        }
    }

    /// Physically meaningful range; anything outside is a sentinel
    pub fn valid_range(self) -> RangeInclusive<f64> {
        match self {
            ParameterId::Speed => 0.0..=255.0,
            ParameterId::MassAirFlow => 0.0..=655.35,
            ParameterId::Rpm => 0.0..=16383.75,
            ParameterId::EngineLoad | ParameterId::FuelLevel => 0.0..=100.0,
            ParameterId::DiagnosticCodes => 0.0..=127.0,
        }
    }

    /// Whether `value` is a usable reading for this parameter
    pub fn accepts(self, value: f64) -> bool {
        value.is_finite() && self.valid_range().contains(&value)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterId::Speed => "speed",
            ParameterId::MassAirFlow => "maf",
            ParameterId::Rpm => "rpm",
            ParameterId::EngineLoad => "engine_load",
            ParameterId::FuelLevel => "fuel_level",
            ParameterId::DiagnosticCodes => "diagnostic_codes",
        };
        f.write_str(name)
    }
}

/// Result of one non-blocking parameter query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryOutcome {
    /// A decoded value
    Success(f64),
    /// The request is in flight; ask again
    Pending,
    /// The query failed, timed out or returned no data
    Failure,
}

/// Source of vehicle parameters
///
/// `query` must not block for longer than one short read window: a response
/// that is not complete yet is reported as [`QueryOutcome::Pending`], and a
/// pending request must eventually resolve to success or failure.
pub trait ParameterReader: Send {
    /// Poll a parameter
    fn query(&mut self, parameter: ParameterId) -> impl Future<Output = QueryOutcome> + Send;

    /// Whether the transport currently reports an active connection
    fn is_link_up(&self) -> bool;

    /// Re-establish the transport link
    fn reconnect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Run the adapter/protocol initialization sequence
    fn initialize_protocol(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_rejected() {
        assert!(ParameterId::Speed.accepts(0.0));
        assert!(ParameterId::Speed.accepts(255.0));
        assert!(!ParameterId::Speed.accepts(-1.0));
        assert!(!ParameterId::MassAirFlow.accepts(f64::NAN));
        assert!(!ParameterId::EngineLoad.accepts(100.5));
    }

    #[test]
    fn test_pid_codes() {
        assert_eq!(ParameterId::Speed.pid(), 0x0D);
        assert_eq!(ParameterId::MassAirFlow.pid(), 0x10);
        assert_eq!(ParameterId::FuelLevel.to_string(), "fuel_level");
    }
}
