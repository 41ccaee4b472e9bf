//! Serial port handling
//!
//! Opens and configures the adapter's serial port for async use.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use super::{TransportError, DEFAULT_BAUD_RATE, DEFAULT_RESPONSE_TIMEOUT_MS};

/// Adapter transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Serial port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub port: Option<String>,

    /// TCP address of a WiFi adapter (e.g., "192.168.0.10:35000"), used when
    /// no serial port is set
    pub address: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Time allowed for a complete adapter response, in milliseconds
    pub response_timeout_ms: u64,

    /// How long one `query` call waits for bytes before reporting `Pending`
    pub read_window_ms: u64,

    /// Consecutive failed queries after which the link is considered down
    pub max_consecutive_failures: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            port: None,
            address: None,
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            read_window_ms: 5,
            max_consecutive_failures: 5,
        }
    }
}

impl TransportSettings {
    /// Response timeout as a duration
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Read window as a duration
    pub fn read_window(&self) -> Duration {
        Duration::from_millis(self.read_window_ms)
    }
}

/// Open the configured port 8N1 without flow control
pub fn open_port(settings: &TransportSettings) -> Result<SerialStream, TransportError> {
    let name = settings
        .port
        .as_deref()
        .ok_or(TransportError::NoPortConfigured)?;

    let mut stream = tokio_serial::new(name, settings.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(settings.response_timeout())
        .open_native_async()?;

    // Some Bluetooth/USB bridges only forward data with DTR asserted
    if let Err(e) = stream.write_data_terminal_ready(true) {
        tracing::debug!("open_port: failed to set DTR high on {name}: {e} (continuing)");
    }

    if let Err(e) = stream.clear(tokio_serial::ClearBuffer::All) {
        tracing::debug!("open_port: failed to clear buffers on {name}: {e} (continuing)");
    }

    tracing::info!("Opened {name} at {} baud", settings.baud_rate);
    Ok(stream)
}
