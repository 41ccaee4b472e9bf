//! Reconnection policy
//!
//! While the link is down the loop asks the policy whether an attempt is due.
//! An attempt re-opens the transport and re-runs protocol initialization;
//! attempts are spaced by a fixed backoff and never give up.

use std::time::Duration;

use crate::reader::{ParameterReader, TransportError};

/// Fixed-interval reconnection policy
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    backoff: Duration,
    /// Failed attempts since the link was last up
    failed_attempts: u64,
    /// Total successful reconnections
    reconnections: u64,
    last_attempt_ms: Option<u64>,
}

impl ReconnectPolicy {
    /// Create a policy waiting `backoff` between attempts
    pub fn new(backoff: Duration) -> Self {
        Self {
            backoff,
            failed_attempts: 0,
            reconnections: 0,
            last_attempt_ms: None,
        }
    }

    /// Wait between attempts
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Failed attempts since the link was last up
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts
    }

    /// Successful reconnections so far
    pub fn reconnections(&self) -> u64 {
        self.reconnections
    }

    /// Time left until the next attempt is allowed; zero when due
    pub fn time_until_due(&self, now_ms: u64) -> Duration {
        match self.last_attempt_ms {
            None => Duration::ZERO,
            Some(last) => {
                let elapsed = Duration::from_millis(now_ms.saturating_sub(last));
                self.backoff.saturating_sub(elapsed)
            }
        }
    }

    /// Whether an attempt may be made at `now_ms`
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.time_until_due(now_ms).is_zero()
    }

    /// Reconnect the transport and initialize the protocol
    ///
    /// An initialization failure counts as a failed attempt: the link is
    /// still down as far as the loop is concerned.
    pub async fn attempt<R: ParameterReader>(
        &mut self,
        reader: &mut R,
        now_ms: u64,
    ) -> Result<(), TransportError> {
        self.last_attempt_ms = Some(now_ms);

        let result = match reader.reconnect().await {
            Ok(()) => reader.initialize_protocol().await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                tracing::info!(
                    "Link re-established after {} failed attempt(s)",
                    self.failed_attempts
                );
                self.failed_attempts = 0;
                self.reconnections += 1;
                self.last_attempt_ms = None;
            }
            Err(e) => {
                self.failed_attempts += 1;
                tracing::warn!(
                    "Reconnect attempt {} failed: {e}; retrying in {:?}",
                    self.failed_attempts,
                    self.backoff
                );
            }
        }
        result
    }
}
