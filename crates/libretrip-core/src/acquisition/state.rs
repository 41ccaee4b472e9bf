//! Acquisition state machine
//!
//! Pure transition function, independent of any reader or store:
//! `(PollState, Event, SelectedProgram) -> Transition`.
//!
//! ```text
//! PollSpeed -> PollMaf -+-> PollSpeed                       (basic programs)
//!                       +-> PollRpm -> PollLoad -> PollFuel -> PollSpeed
//!                       +-> PollDiagnostics -> PollSpeed
//! any poll state --link lost--> LinkDown --reconnected--> PollSpeed
//! ```

use crate::reader::{ParameterId, QueryOutcome};
use crate::telemetry::SelectedProgram;

/// Acquisition loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Query vehicle speed (retried until it succeeds)
    PollSpeed,
    /// Query mass air flow
    PollMaf,
    /// Query engine speed
    PollRpm,
    /// Query engine load
    PollLoad,
    /// Query fuel level
    PollFuel,
    /// Query stored trouble codes
    PollDiagnostics,
    /// Transport down, reconnecting
    LinkDown,
}

impl PollState {
    /// Parameter queried in this state
    pub fn parameter(self) -> Option<ParameterId> {
        match self {
            PollState::PollSpeed => Some(ParameterId::Speed),
            PollState::PollMaf => Some(ParameterId::MassAirFlow),
            PollState::PollRpm => Some(ParameterId::Rpm),
            PollState::PollLoad => Some(ParameterId::EngineLoad),
            PollState::PollFuel => Some(ParameterId::FuelLevel),
            PollState::PollDiagnostics => Some(ParameterId::DiagnosticCodes),
            PollState::LinkDown => None,
        }
    }

    /// Whether this is one of the polling states
    pub fn is_polling(self) -> bool {
        self != PollState::LinkDown
    }
}

/// Something that happened to the loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// The query for the current state's parameter returned
    Polled(QueryOutcome),
    /// The transport reported the link down
    LinkLost,
    /// Reconnect and protocol initialization both succeeded
    Reconnected,
    /// A reconnection attempt failed
    ReconnectFailed,
}

/// Side effect the driver must carry out for a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Nothing to do
    None,
    /// Store a valid reading (and integrate speed/MAF)
    Record {
        /// Parameter that was read
        parameter: ParameterId,
        /// Validated value in the parameter's unit
        value: f64,
    },
    /// Mark a reading invalid (and clear its integration cache)
    Invalidate(ParameterId),
    /// Invalidate speed, flag the link down, clear all integration caches
    EnterLinkDown,
    /// Flag the link up with fresh integration caches
    ResumeSession,
    /// Wait the reconnection backoff before the next attempt
    Backoff,
}

/// Result of one transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// State after the event
    pub next: PollState,
    /// What the driver must do
    pub effect: Effect,
}

impl Transition {
    fn new(next: PollState, effect: Effect) -> Self {
        Self { next, effect }
    }

    fn stay(state: PollState) -> Self {
        Self::new(state, Effect::None)
    }
}

/// State after `PollMaf` for the selected program
fn after_maf(program: SelectedProgram) -> PollState {
    if program.wants_gauges() {
        PollState::PollRpm
    } else if program.wants_diagnostics() {
        PollState::PollDiagnostics
    } else {
        PollState::PollSpeed
    }
}

/// Compute the next state and effect
pub fn transition(state: PollState, event: Event, program: SelectedProgram) -> Transition {
    use PollState::*;

    match (state, event) {
        (LinkDown, Event::Reconnected) => Transition::new(PollSpeed, Effect::ResumeSession),
        (LinkDown, Event::ReconnectFailed) => Transition::new(LinkDown, Effect::Backoff),
        (LinkDown, _) => Transition::stay(LinkDown),

        (_, Event::LinkLost) => Transition::new(LinkDown, Effect::EnterLinkDown),
        (_, Event::Reconnected | Event::ReconnectFailed) => Transition::stay(state),
        (_, Event::Polled(QueryOutcome::Pending)) => Transition::stay(state),

        (_, Event::Polled(outcome)) => {
            let Some(parameter) = state.parameter() else {
                return Transition::stay(state);
            };

            let effect = match outcome {
                QueryOutcome::Success(value) => Effect::Record { parameter, value },
                _ => Effect::Invalidate(parameter),
            };
            let succeeded = matches!(outcome, QueryOutcome::Success(_));

            let next = match state {
                PollSpeed if succeeded => PollMaf,
                PollSpeed => PollSpeed,
                PollMaf if succeeded => after_maf(program),
                PollMaf => PollSpeed,
                PollRpm => PollLoad,
                PollLoad => PollFuel,
                PollFuel | PollDiagnostics | LinkDown => PollSpeed,
            };
            Transition::new(next, effect)
        }
    }
}
