//! Lock-protected telemetry store

use std::time::Duration;
use tokio::sync::Mutex;

use super::{SelectedProgram, TelemetrySnapshot};

/// The single shared telemetry state
///
/// One writer (the acquisition loop) and any number of readers serialize
/// through one mutex. All fields of one publish are written inside a single
/// [`with_lock`](Self::with_lock) call, so readers never see a partial update.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    state: Mutex<TelemetrySnapshot>,
}

impl TelemetryStore {
    /// Create a store with every reading invalid and zero totals
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose presentation program is already chosen
    pub fn with_program(program: SelectedProgram) -> Self {
        Self {
            state: Mutex::new(TelemetrySnapshot {
                selected_program: program,
                ..TelemetrySnapshot::default()
            }),
        }
    }

    /// Run `f` with exclusive access to the state
    pub async fn with_lock<R>(&self, f: impl FnOnce(&mut TelemetrySnapshot) -> R) -> R {
        let mut guard = self.state.lock().await;
        f(&mut *guard)
    }

    /// Copy the whole state, waiting as long as necessary
    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.state.lock().await.clone()
    }

    /// Copy the whole state, giving up after `timeout`
    ///
    /// Returns `None` when the lock could not be taken in time; the caller
    /// skips that frame.
    pub async fn try_snapshot(&self, timeout: Duration) -> Option<TelemetrySnapshot> {
        match tokio::time::timeout(timeout, self.state.lock()).await {
            Ok(guard) => Some(guard.clone()),
            Err(_) => None,
        }
    }

    /// Currently selected program
    pub async fn selected_program(&self) -> SelectedProgram {
        self.state.lock().await.selected_program
    }

    /// Select the program, waiting as long as necessary
    pub async fn select_program(&self, program: SelectedProgram) {
        self.with_lock(|s| s.selected_program = program).await;
    }

    #[cfg(test)]
    pub(crate) async fn hold(&self) -> tokio::sync::MutexGuard<'_, TelemetrySnapshot> {
        self.state.lock().await
    }

    /// Select the program, giving up after `timeout`
    ///
    /// Returns whether the program was written.
    pub async fn try_select_program(&self, program: SelectedProgram, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.state.lock()).await {
            Ok(mut guard) => {
                guard.selected_program = program;
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ParameterId;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_with_lock_returns_closure_value() {
        let store = TelemetryStore::new();
        let link = store
            .with_lock(|s| {
                s.record(ParameterId::Speed, 42.0, 100);
                s.link_up
            })
            .await;
        assert!(!link);
        assert_eq!(store.snapshot().await.speed_kph.value(), Some(42.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_snapshot_times_out_while_locked() {
        let store = Arc::new(TelemetryStore::new());
        let guard = store.state.lock().await;

        assert!(store.try_snapshot(Duration::from_millis(20)).await.is_none());
        assert!(
            !store
                .try_select_program(SelectedProgram::Gauges, Duration::from_millis(20))
                .await
        );

        drop(guard);
        let snapshot = store.try_snapshot(Duration::from_millis(20)).await;
        assert!(snapshot.is_some());
        assert_eq!(store.selected_program().await, SelectedProgram::Basic);
    }

    #[tokio::test]
    async fn test_program_written_through_store() {
        let store = TelemetryStore::with_program(SelectedProgram::Trip);
        assert_eq!(store.selected_program().await, SelectedProgram::Trip);

        assert!(
            store
                .try_select_program(SelectedProgram::Diagnostics, Duration::from_millis(10))
                .await
        );
        assert_eq!(
            store.snapshot().await.selected_program,
            SelectedProgram::Diagnostics
        );
    }
}
