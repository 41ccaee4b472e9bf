//! Shared Telemetry State
//!
//! The single lock-protected store the acquisition loop writes and the
//! presentation layer reads.
//!
//! Every field lives behind one `tokio::sync::Mutex`; callers only ever see it
//! through [`TelemetryStore::with_lock`] or an owned [`TelemetrySnapshot`] copy.

mod snapshot;
mod store;

pub use snapshot::TelemetrySnapshot;
pub use store::TelemetryStore;

use serde::{Deserialize, Serialize};

/// A single parameter sample tagged with validity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Physical value (meaningless when `valid` is false)
    pub value: f64,
    /// Whether the last query for this parameter succeeded
    pub valid: bool,
}

impl Reading {
    /// A reading with no data behind it
    pub const INVALID: Reading = Reading {
        value: 0.0,
        valid: false,
    };

    /// Create a valid reading
    pub fn valid(value: f64) -> Self {
        Self { value, valid: true }
    }

    /// The value, if the reading is valid
    pub fn value(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Display program chosen by the presentation layer
///
/// The program decides which optional parameters the acquisition loop polls
/// after the speed/MAF pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedProgram {
    /// Instantaneous and average economy only
    #[default]
    Basic,
    /// Trip distance, fuel used and moving time
    Trip,
    /// Trip statistics including fuel level
    Stats,
    /// Rpm, engine load and fuel level gauges
    Gauges,
    /// Acceleration timer; speed is polled as fast as possible
    DragTimer,
    /// Stored trouble code count
    Diagnostics,
}

impl SelectedProgram {
    /// All programs, in menu order
    pub const ALL: [SelectedProgram; 6] = [
        SelectedProgram::Basic,
        SelectedProgram::Trip,
        SelectedProgram::Stats,
        SelectedProgram::Gauges,
        SelectedProgram::DragTimer,
        SelectedProgram::Diagnostics,
    ];

    /// Whether rpm, load and fuel level are polled after MAF
    pub fn wants_gauges(self) -> bool {
        matches!(self, SelectedProgram::Gauges | SelectedProgram::Stats)
    }

    /// Whether the trouble code count is polled after MAF
    pub fn wants_diagnostics(self) -> bool {
        matches!(self, SelectedProgram::Diagnostics)
    }

    /// Next program in menu order, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_value_respects_validity() {
        assert_eq!(Reading::valid(42.0).value(), Some(42.0));
        assert_eq!(Reading::INVALID.value(), None);
        assert_eq!(Reading::default(), Reading::INVALID);
    }

    #[test]
    fn test_program_polling_sets() {
        assert!(SelectedProgram::Gauges.wants_gauges());
        assert!(SelectedProgram::Stats.wants_gauges());
        assert!(!SelectedProgram::Basic.wants_gauges());
        assert!(SelectedProgram::Diagnostics.wants_diagnostics());
        assert!(!SelectedProgram::Diagnostics.wants_gauges());
    }

    #[test]
    fn test_program_cycle_wraps() {
        let mut program = SelectedProgram::Basic;
        for _ in 0..SelectedProgram::ALL.len() {
            program = program.next();
        }
        assert_eq!(program, SelectedProgram::Basic);
        assert_eq!(SelectedProgram::Diagnostics.next(), SelectedProgram::Basic);
    }
}
