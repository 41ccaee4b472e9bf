//! Trip recorder
//!
//! Samples snapshots into a bounded in-memory buffer and exports them as CSV.
//! The recorder is just another consumer of the store: it only ever sees
//! owned snapshot copies.

use std::collections::VecDeque;
use std::io::{self, Write};

use crate::telemetry::{Reading, TelemetrySnapshot};

/// Maximum entries to keep in memory; the oldest are dropped first
const MAX_BUFFER_SIZE: usize = 36_000;

/// CSV column names, in row order
pub const CSV_COLUMNS: [&str; 11] = [
    "time_ms",
    "link_up",
    "speed_kph",
    "maf_gps",
    "rpm",
    "load_pct",
    "fuel_level_pct",
    "dtc_count",
    "distance_km",
    "fuel_l",
    "moving_ms",
];

/// One recorded row
#[derive(Debug, Clone, PartialEq)]
pub struct TripEntry {
    /// Clock tick the snapshot was taken at
    pub timestamp_ms: u64,
    /// Store contents at that tick
    pub snapshot: TelemetrySnapshot,
}

/// Rate-limited snapshot recorder
pub struct TripRecorder {
    buffer: VecDeque<TripEntry>,
    capacity: usize,
    is_recording: bool,
    /// Minimum spacing between samples, ms
    min_interval_ms: u64,
    last_sample_ms: Option<u64>,
}

impl TripRecorder {
    /// Create a recorder sampling at most `sample_rate` times per second
    pub fn new(sample_rate: f64) -> Self {
        let mut recorder = Self {
            buffer: VecDeque::new(),
            capacity: MAX_BUFFER_SIZE,
            is_recording: false,
            min_interval_ms: 0,
            last_sample_ms: None,
        };
        recorder.set_sample_rate(sample_rate);
        recorder
    }

    /// Limit the buffer to `capacity` entries
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Set the target sample rate in Hz, clamped to 0.1..=100
    pub fn set_sample_rate(&mut self, rate: f64) {
        let rate = if rate.is_finite() { rate.clamp(0.1, 100.0) } else { 1.0 };
        self.min_interval_ms = (1000.0 / rate).round() as u64;
    }

    /// Minimum spacing between samples, ms
    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }

    /// Start a fresh recording
    pub fn start(&mut self) {
        self.is_recording = true;
        self.last_sample_ms = None;
        self.buffer.clear();
    }

    /// Stop recording; the buffer is kept
    pub fn stop(&mut self) {
        self.is_recording = false;
    }

    /// Whether samples are being taken
    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Record a snapshot taken at `now_ms`
    ///
    /// Returns whether the snapshot was kept; samples closer together than
    /// the sample interval are dropped.
    pub fn record(&mut self, snapshot: &TelemetrySnapshot, now_ms: u64) -> bool {
        if !self.is_recording {
            return false;
        }
        if let Some(last) = self.last_sample_ms {
            if now_ms.saturating_sub(last) < self.min_interval_ms {
                return false;
            }
        }

        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(TripEntry {
            timestamp_ms: now_ms,
            snapshot: snapshot.clone(),
        });
        self.last_sample_ms = Some(now_ms);
        true
    }

    /// Number of buffered entries
    pub fn entry_count(&self) -> usize {
        self.buffer.len()
    }

    /// Buffered entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TripEntry> {
        self.buffer.iter()
    }

    /// Drop every buffered entry
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_sample_ms = None;
    }

    /// Write every buffered entry as CSV, header first
    ///
    /// Invalid readings are written as empty cells.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{}", CSV_COLUMNS.join(","))?;

        for entry in &self.buffer {
            let s = &entry.snapshot;
            write!(writer, "{},{}", entry.timestamp_ms, u8::from(s.link_up))?;
            for reading in [
                s.speed_kph,
                s.maf_grams_per_sec,
                s.rpm,
                s.engine_load_pct,
                s.fuel_level_pct,
                s.diagnostic_codes,
            ] {
                write!(writer, ",{}", cell(reading))?;
            }
            writeln!(
                writer,
                ",{:.4},{:.4},{}",
                s.cumulative_distance_km, s.cumulative_fuel_liters, s.moving_time_ms
            )?;
        }

        writer.flush()
    }
}

impl Default for TripRecorder {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn cell(reading: Reading) -> String {
    match reading.value() {
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ParameterId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recorder_rate_limit() {
        let mut recorder = TripRecorder::new(10.0);
        let snapshot = TelemetrySnapshot::default();

        assert!(!recorder.record(&snapshot, 0));
        recorder.start();
        assert!(recorder.record(&snapshot, 0));
        assert!(!recorder.record(&snapshot, 50));
        assert!(recorder.record(&snapshot, 100));
        assert_eq!(recorder.entry_count(), 2);

        recorder.stop();
        assert!(!recorder.record(&snapshot, 1000));
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let mut recorder = TripRecorder::new(100.0).with_capacity(3);
        recorder.start();
        for t in 0..5 {
            recorder.record(&TelemetrySnapshot::default(), t * 10);
        }
        let times: Vec<u64> = recorder.entries().map(|e| e.timestamp_ms).collect();
        assert_eq!(times, vec![20, 30, 40]);
    }

    #[test]
    fn test_write_csv() {
        let mut recorder = TripRecorder::default();
        recorder.start();

        let mut snapshot = TelemetrySnapshot::default();
        snapshot.mark_link_up();
        snapshot.record(ParameterId::Speed, 72.5, 1000);
        snapshot.cumulative_distance_km = 1.25;
        snapshot.cumulative_fuel_liters = 0.1;
        snapshot.moving_time_ms = 60_000;
        recorder.record(&snapshot, 1000);

        let mut out = Vec::new();
        recorder.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "time_ms,link_up,speed_kph,maf_gps,rpm,load_pct,fuel_level_pct,dtc_count,distance_km,fuel_l,moving_ms"
        );
        assert_eq!(lines[1], "1000,1,72.50,,,,,,1.2500,0.1000,60000");
    }
}
