//! Adapter transports
//!
//! ELM327 adapters come as USB/Bluetooth serial devices or as WiFi devices
//! listening on TCP. A [`Connector`] opens a fresh byte stream to one of them;
//! the reader drops and re-opens it on every reconnect.

use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_serial::SerialStream;

use super::{open_port, TransportError, TransportSettings};

/// Opens byte streams to the adapter
pub trait Connector: Send {
    /// Stream type produced by this connector
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a new stream, replacing any previous one
    fn connect(&mut self) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;

    /// Human-readable endpoint, for logs
    fn describe(&self) -> String;
}

/// Serial (USB or Bluetooth SPP) adapter
#[derive(Debug, Clone)]
pub struct SerialConnector {
    settings: TransportSettings,
}

impl SerialConnector {
    /// Connector for the port named in `settings`
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }
}

impl Connector for SerialConnector {
    type Stream = SerialStream;

    async fn connect(&mut self) -> Result<SerialStream, TransportError> {
        open_port(&self.settings)
    }

    fn describe(&self) -> String {
        self.settings
            .port
            .clone()
            .unwrap_or_else(|| "<no port>".to_string())
    }
}

/// WiFi adapter reachable over TCP (typically `192.168.0.10:35000`)
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    /// Connector for `host:port`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect(&self.address).await?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to adapter at {}", self.address);
        Ok(stream)
    }

    fn describe(&self) -> String {
        self.address.clone()
    }
}
