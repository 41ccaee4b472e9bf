//! Presentation-side store access
//!
//! The presenter never waits on the store for longer than its snapshot
//! timeout: if the acquisition loop holds the lock, the frame is skipped.

use std::sync::Arc;
use std::time::Duration;

use super::{DashboardView, DisplaySettings};
use crate::clock::Clock;
use crate::telemetry::{SelectedProgram, TelemetrySnapshot, TelemetryStore};

/// Consumer of the telemetry store
pub struct Presenter<C> {
    store: Arc<TelemetryStore>,
    clock: C,
    settings: DisplaySettings,
    snapshot_timeout: Duration,
    rendered_frames: u64,
    skipped_frames: u64,
}

impl<C: Clock> Presenter<C> {
    /// Create a presenter that waits at most `snapshot_timeout` for the lock
    pub fn new(
        store: Arc<TelemetryStore>,
        clock: C,
        settings: DisplaySettings,
        snapshot_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
            snapshot_timeout,
            rendered_frames: 0,
            skipped_frames: 0,
        }
    }

    /// Take a snapshot and derive this frame's view
    ///
    /// Returns `None` when the lock was not available in time.
    pub async fn frame(&mut self) -> Option<DashboardView> {
        self.frame_with_snapshot().await.map(|(_, view)| view)
    }

    /// Like [`Presenter::frame`], also handing back the snapshot the view was
    /// derived from
    pub async fn frame_with_snapshot(&mut self) -> Option<(TelemetrySnapshot, DashboardView)> {
        let Some(snapshot) = self.store.try_snapshot(self.snapshot_timeout).await else {
            self.skipped_frames += 1;
            tracing::trace!("Store busy, frame skipped ({} total)", self.skipped_frames);
            return None;
        };

        self.rendered_frames += 1;
        let view = DashboardView::from_snapshot(&snapshot, self.clock.now_ms(), &self.settings);
        Some((snapshot, view))
    }

    /// Write the program selection, giving up after the snapshot timeout
    pub async fn select_program(&self, program: SelectedProgram) -> bool {
        self.store
            .try_select_program(program, self.snapshot_timeout)
            .await
    }

    /// Frames produced so far
    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames
    }

    /// Frames skipped because the lock was busy
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }
}
