//! Telemetry Acquisition
//!
//! The background producer: cycles through parameter queries, integrates
//! distance and fuel, and publishes into the [`TelemetryStore`].
//!
//! The loop is a thin driver around the pure [`transition`] function. Each
//! [`step`](AcquisitionLoop::step) turns one reader interaction into an
//! [`Event`], asks the state machine what to do, and carries out the
//! resulting [`Effect`] inside a single store critical section.

pub mod reconnect;
pub mod state;

pub use reconnect::ReconnectPolicy;
pub use state::{transition, Effect, Event, PollState, Transition};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::TripConfig;
use crate::integrator::{PreviousSamples, Sample, TripDelta};
use crate::reader::{ParameterId, ParameterReader, QueryOutcome};
use crate::telemetry::{SelectedProgram, TelemetryStore};

/// Tuning knobs of the acquisition loop
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSettings {
    /// Wait between completed queries
    pub poll_interval: Duration,
    /// Longest a query may stay pending before it counts as failed, ms
    pub query_timeout_ms: u64,
    /// Multiplier on the MAF-to-fuel constant
    pub fuel_calibration: f64,
    /// Fixed wait between reconnection attempts
    pub reconnect_backoff: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self::from(&TripConfig::default())
    }
}

impl From<&TripConfig> for AcquisitionSettings {
    fn from(config: &TripConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            query_timeout_ms: config.query_timeout_ms,
            fuel_calibration: config.fuel_calibration,
            reconnect_backoff: config.reconnect_backoff(),
        }
    }
}

/// Background acquisition loop
pub struct AcquisitionLoop<R, C> {
    reader: R,
    clock: C,
    store: Arc<TelemetryStore>,
    settings: AcquisitionSettings,
    state: PollState,
    previous: PreviousSamples,
    reconnect: ReconnectPolicy,
    /// Clock tick at which the current query first reported pending
    pending_since: Option<u64>,
}

impl<R: ParameterReader, C: Clock> AcquisitionLoop<R, C> {
    /// Create a loop; it starts in [`PollState::LinkDown`] so the first step
    /// connects and initializes the protocol
    pub fn new(
        reader: R,
        clock: C,
        store: Arc<TelemetryStore>,
        settings: AcquisitionSettings,
    ) -> Self {
        let reconnect = ReconnectPolicy::new(settings.reconnect_backoff);
        Self {
            reader,
            clock,
            store,
            settings,
            state: PollState::LinkDown,
            previous: PreviousSamples::new(),
            reconnect,
            pending_since: None,
        }
    }

    /// Current state
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Previous-sample caches used for delta computation
    pub fn previous_samples(&self) -> &PreviousSamples {
        &self.previous
    }

    /// Reconnection bookkeeping
    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.reconnect
    }

    /// The reader
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Mutable access to the reader
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Give the reader back
    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Run one interaction with the reader and apply its effect
    ///
    /// Returns how long to wait before the next step.
    pub async fn step(&mut self) -> Duration {
        let now_ms = self.clock.now_ms();

        let event = if self.state.is_polling() {
            if self.reader.is_link_up() {
                self.poll().await
            } else {
                Event::LinkLost
            }
        } else {
            let wait = self.reconnect.time_until_due(now_ms);
            if !wait.is_zero() {
                return wait;
            }
            match self.reconnect.attempt(&mut self.reader, now_ms).await {
                Ok(()) => Event::Reconnected,
                Err(_) => Event::ReconnectFailed,
            }
        };

        // Only the branch out of PollMaf depends on the program
        let program = if self.state == PollState::PollMaf {
            self.store.selected_program().await
        } else {
            SelectedProgram::default()
        };

        let Transition { next, effect } = transition(self.state, event, program);
        self.apply(effect).await;

        if next != self.state {
            tracing::trace!("{:?} -> {:?}", self.state, next);
        }
        self.state = next;

        match (event, effect) {
            (Event::Polled(QueryOutcome::Pending), _) => Duration::ZERO,
            (_, Effect::EnterLinkDown) => Duration::ZERO,
            (_, Effect::Backoff) => self.reconnect.backoff(),
            _ => self.settings.poll_interval,
        }
    }

    /// Query the current state's parameter
    async fn poll(&mut self) -> Event {
        let Some(parameter) = self.state.parameter() else {
            return Event::LinkLost;
        };

        let outcome = self.reader.query(parameter).await;
        let now_ms = self.clock.now_ms();

        let outcome = match outcome {
            QueryOutcome::Pending => {
                let since = *self.pending_since.get_or_insert(now_ms);
                if now_ms.saturating_sub(since) >= self.settings.query_timeout_ms {
                    tracing::debug!("{parameter} query still pending after {}ms", now_ms - since);
                    self.pending_since = None;
                    QueryOutcome::Failure
                } else {
                    QueryOutcome::Pending
                }
            }
            QueryOutcome::Success(value) if !parameter.accepts(value) => {
                tracing::debug!("{parameter} reading {value} out of range, discarded");
                self.pending_since = None;
                QueryOutcome::Failure
            }
            other => {
                self.pending_since = None;
                other
            }
        };

        // A link that dropped during the query wins over its result
        if outcome == QueryOutcome::Failure && !self.reader.is_link_up() {
            return Event::LinkLost;
        }
        Event::Polled(outcome)
    }

    /// Carry out a transition's effect
    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::None | Effect::Backoff => {}
            Effect::Record { parameter, value } => {
                let now_ms = self.clock.now_ms();
                let sample = Sample::new(value, now_ms);
                let delta = match parameter {
                    ParameterId::Speed => self.previous.push_speed(sample),
                    ParameterId::MassAirFlow => self
                        .previous
                        .push_maf(sample, self.settings.fuel_calibration),
                    _ => TripDelta::default(),
                };

                self.store
                    .with_lock(|s| {
                        s.record(parameter, value, now_ms);
                        s.accumulate(&delta);
                    })
                    .await;
            }
            Effect::Invalidate(parameter) => {
                tracing::debug!("{parameter} query failed");
                match parameter {
                    ParameterId::Speed => self.previous.clear_speed(),
                    ParameterId::MassAirFlow => self.previous.clear_maf(),
                    _ => {}
                }
                self.store.with_lock(|s| s.invalidate(parameter)).await;
            }
            Effect::EnterLinkDown => {
                tracing::info!("Link down, speed invalidated; reconnecting");
                self.previous.reset();
                self.pending_since = None;
                self.store.with_lock(|s| s.mark_link_down()).await;
            }
            Effect::ResumeSession => {
                self.previous.reset();
                self.store.with_lock(|s| s.mark_link_up()).await;
            }
        }
    }

    /// Step until `cancel` fires, then hand the loop back
    pub async fn run(mut self, cancel: CancellationToken) -> Self {
        tracing::info!("Acquisition loop started");
        loop {
            let delay = tokio::select! {
                _ = cancel.cancelled() => break,
                delay = self.step() => delay,
            };

            if delay.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        tracing::info!("Acquisition loop stopped");
        self
    }
}

impl<R, C> AcquisitionLoop<R, C>
where
    R: ParameterReader + 'static,
    C: Clock + 'static,
{
    /// Run the loop on its own tokio task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Self> {
        tokio::spawn(self.run(cancel))
    }
}
