//! Dashboard presentation
//!
//! Everything the renderer needs is computed here from a [`TelemetrySnapshot`]
//! copy taken through the [`Presenter`]. Nothing in this module touches the
//! live store except through bounded-wait snapshot and program writes.
//!
//! [`TelemetrySnapshot`]: crate::telemetry::TelemetrySnapshot

pub mod metrics;
mod presenter;
mod view;

pub use metrics::{
    average_economy, average_liters_per_100km, average_moving_speed, instant_economy,
    instant_liters_per_100km, link_status, LinkStatus,
};
pub use presenter::Presenter;
pub use view::{DashboardView, DisplaySettings};
