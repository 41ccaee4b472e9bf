//! # LibreTrip Core Library
//!
//! Core functionality for the LibreTrip OBD-II trip computer.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A background acquisition loop polling vehicle parameters
//! - Trapezoidal integration of distance and fuel used
//! - A lock-protected telemetry store shared with the presentation layer
//! - Derived display metrics (economy, staleness, averages)
//! - ELM327 adapter and synthetic drive-cycle readers
//!
//! ## Example
//!
//! ```rust,ignore
//! use libretrip_core::prelude::*;
//! use std::sync::Arc;
//!
//! let config = TripConfig::load_or_default(TripConfig::default_path()?)?;
//! let store = Arc::new(TelemetryStore::with_program(config.program));
//!
//! let reader = SerialElm327::serial(config.transport.clone());
//! let cancel = CancellationToken::new();
//! let acquisition = AcquisitionLoop::new(
//!     reader,
//!     MonotonicClock::new(),
//!     store.clone(),
//!     AcquisitionSettings::from(&config),
//! )
//! .spawn(cancel.clone());
//!
//! let mut presenter = Presenter::new(
//!     store,
//!     MonotonicClock::new(),
//!     DisplaySettings::from(&config),
//!     config.snapshot_timeout(),
//! );
//! if let Some(view) = presenter.frame().await {
//!     println!("{:?} mpg", view.instant_economy_mpg);
//! }
//! ```

pub mod acquisition;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod integrator;
pub mod reader;
pub mod recorder;
pub mod telemetry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::acquisition::{AcquisitionLoop, AcquisitionSettings, PollState};
    pub use crate::clock::{Clock, ManualClock, MonotonicClock};
    pub use crate::config::{ConfigError, TripConfig};
    pub use crate::dashboard::{DashboardView, DisplaySettings, LinkStatus, Presenter};
    pub use crate::reader::{
        Elm327Reader, ParameterId, ParameterReader, QueryOutcome, SerialElm327,
        SyntheticReader, TcpElm327, TransportError, TransportSettings,
    };
    pub use crate::recorder::TripRecorder;
    pub use crate::telemetry::{Reading, SelectedProgram, TelemetrySnapshot, TelemetryStore};
    pub use tokio_util::sync::CancellationToken;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
