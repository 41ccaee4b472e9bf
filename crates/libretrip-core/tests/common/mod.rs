//! Shared test helpers

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use libretrip_core::acquisition::{AcquisitionLoop, AcquisitionSettings};
use libretrip_core::clock::ManualClock;
use libretrip_core::reader::{ParameterId, ParameterReader, QueryOutcome, TransportError};
use libretrip_core::telemetry::TelemetryStore;

#[derive(Debug)]
struct Script {
    outcomes: HashMap<ParameterId, QueryOutcome>,
    link_up: bool,
    reconnect_ok: bool,
    /// Drop the link after this many more queries
    drop_after: Option<usize>,
    queries: Vec<ParameterId>,
    reconnect_attempts: u32,
}

/// Reader whose answers are set by the test
///
/// Clones share the same script, so a test keeps one handle while the loop
/// owns another.
#[derive(Debug, Clone)]
pub struct ScriptedReader {
    script: Arc<Mutex<Script>>,
}

impl ScriptedReader {
    /// Link down until the first reconnect; every parameter fails until set
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                outcomes: HashMap::new(),
                link_up: false,
                reconnect_ok: true,
                drop_after: None,
                queries: Vec::new(),
                reconnect_attempts: 0,
            })),
        }
    }

    pub fn set(&self, parameter: ParameterId, outcome: QueryOutcome) {
        self.script
            .lock()
            .unwrap()
            .outcomes
            .insert(parameter, outcome);
    }

    pub fn set_value(&self, parameter: ParameterId, value: f64) {
        self.set(parameter, QueryOutcome::Success(value));
    }

    pub fn drop_link(&self) {
        self.script.lock().unwrap().link_up = false;
    }

    pub fn allow_reconnect(&self, ok: bool) {
        self.script.lock().unwrap().reconnect_ok = ok;
    }

    pub fn drop_link_after(&self, queries: usize) {
        self.script.lock().unwrap().drop_after = Some(queries);
    }

    pub fn take_queries(&self) -> Vec<ParameterId> {
        std::mem::take(&mut self.script.lock().unwrap().queries)
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.script.lock().unwrap().reconnect_attempts
    }
}

impl ParameterReader for ScriptedReader {
    async fn query(&mut self, parameter: ParameterId) -> QueryOutcome {
        let mut script = self.script.lock().unwrap();
        if !script.link_up {
            return QueryOutcome::Failure;
        }
        script.queries.push(parameter);

        if let Some(left) = script.drop_after.as_mut() {
            if *left == 0 {
                script.link_up = false;
                script.drop_after = None;
                return QueryOutcome::Failure;
            }
            *left -= 1;
        }

        script
            .outcomes
            .get(&parameter)
            .copied()
            .unwrap_or(QueryOutcome::Failure)
    }

    fn is_link_up(&self) -> bool {
        self.script.lock().unwrap().link_up
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        let mut script = self.script.lock().unwrap();
        script.reconnect_attempts += 1;
        if script.reconnect_ok {
            script.link_up = true;
            Ok(())
        } else {
            Err(TransportError::SimulatedOutage)
        }
    }

    async fn initialize_protocol(&mut self) -> Result<(), TransportError> {
        if self.script.lock().unwrap().link_up {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

/// Loop settings used throughout the integration tests
pub fn settings() -> AcquisitionSettings {
    AcquisitionSettings {
        poll_interval: Duration::from_millis(10),
        query_timeout_ms: 1000,
        fuel_calibration: 1.0,
        reconnect_backoff: Duration::from_millis(2500),
    }
}

pub struct Harness {
    pub reader: ScriptedReader,
    pub clock: ManualClock,
    pub store: Arc<TelemetryStore>,
    pub acquisition: AcquisitionLoop<ScriptedReader, ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let reader = ScriptedReader::new();
        let clock = ManualClock::new(0);
        let store = Arc::new(TelemetryStore::new());
        let acquisition =
            AcquisitionLoop::new(reader.clone(), clock.clone(), store.clone(), settings());
        Self {
            reader,
            clock,
            store,
            acquisition,
        }
    }

    /// Advance the clock by `dt_ms`, then run one step
    pub async fn step_after(&mut self, dt_ms: u64) -> Duration {
        self.clock.advance(dt_ms);
        self.acquisition.step().await
    }
}
