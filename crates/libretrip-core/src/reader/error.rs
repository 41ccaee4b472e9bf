//! Transport errors

use thiserror::Error;

/// Errors raised while talking to the diagnostic adapter
#[derive(Error, Debug)]
pub enum TransportError {
    /// The serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Neither a serial port nor a TCP address is set
    #[error("No port configured")]
    NoPortConfigured,

    /// A command was issued with no open stream
    #[error("Not connected to adapter")]
    NotConnected,

    /// The adapter did not send its prompt in time
    #[error("Response timeout")]
    Timeout,

    /// The stream reached end of file
    #[error("Adapter closed the connection")]
    Disconnected,

    /// An initialization command was answered with something other than `OK`
    #[error("Unexpected adapter response to '{command}': {response}")]
    UnexpectedResponse {
        /// Command that was sent
        command: String,
        /// Cleaned response text
        response: String,
    },

    /// The adapter reported a bus-level error such as `CAN ERROR`
    #[error("Vehicle bus unavailable: {0}")]
    BusUnavailable(String),

    /// No prompt arrived within the maximum response size
    #[error("Buffer overflow: response too large")]
    BufferOverflow,

    /// The synthetic reader is in a scripted outage
    #[error("Simulated link outage")]
    SimulatedOutage,

    /// Read or write on the stream failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<tokio_serial::Error> for TransportError {
    fn from(err: tokio_serial::Error) -> Self {
        TransportError::SerialError(err.to_string())
    }
}
