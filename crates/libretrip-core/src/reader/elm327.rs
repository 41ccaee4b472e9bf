//! ELM327 adapter reader
//!
//! Implements [`ParameterReader`] on top of any [`Connector`] stream. Queries
//! are split across calls: the first call sends the request, each call then
//! reads for one short window and reports `Pending` until the adapter prompt
//! arrives or the response timeout expires.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::codec::{Decoder, Encoder};

use super::stream::{Connector, SerialConnector, TcpConnector};
use super::{
    pid, ElmCodec, ElmResponse, ParameterId, ParameterReader, QueryOutcome, TransportError,
    TransportSettings,
};
use std::time::Duration;

/// `ATZ` restarts the adapter firmware, which takes noticeably longer than a query
const RESET_TIMEOUT: Duration = Duration::from_secs(3);

/// Adapter setup after reset: echo off, linefeeds off, spaces off, headers off,
/// automatic protocol detection
const INIT_COMMANDS: [&str; 5] = ["ATE0", "ATL0", "ATS0", "ATH0", "ATSP0"];

/// ELM327 reader on a serial port
pub type SerialElm327 = Elm327Reader<SerialConnector>;

/// ELM327 reader on a WiFi adapter
pub type TcpElm327 = Elm327Reader<TcpConnector>;

/// A request that has been written but not answered yet
#[derive(Debug, Clone, Copy)]
struct InFlight {
    parameter: ParameterId,
    sent_at: Instant,
}

/// ELM327-compatible OBD-II adapter
pub struct Elm327Reader<C: Connector> {
    connector: C,
    settings: TransportSettings,
    stream: Option<C::Stream>,
    codec: ElmCodec,
    rx: BytesMut,
    in_flight: Option<InFlight>,
    link_up: bool,
    consecutive_failures: u32,
}

impl Elm327Reader<SerialConnector> {
    /// Reader for the serial port named in `settings`
    pub fn serial(settings: TransportSettings) -> Self {
        Self::new(SerialConnector::new(settings.clone()), settings)
    }
}

impl Elm327Reader<TcpConnector> {
    /// Reader for a WiFi adapter at `address`
    pub fn tcp(address: impl Into<String>, settings: TransportSettings) -> Self {
        Self::new(TcpConnector::new(address), settings)
    }
}

impl<C: Connector> Elm327Reader<C> {
    /// Create a reader; nothing is opened until [`ParameterReader::reconnect`]
    pub fn new(connector: C, settings: TransportSettings) -> Self {
        Self {
            connector,
            settings,
            stream: None,
            codec: ElmCodec,
            rx: BytesMut::with_capacity(256),
            in_flight: None,
            link_up: false,
            consecutive_failures: 0,
        }
    }

    /// Transport settings
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Failed queries since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    async fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut tx = BytesMut::with_capacity(command.len() + 1);
        self.codec.encode(command, &mut tx)?;
        stream.write_all(&tx).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read for at most `window`; `None` if the prompt has not arrived yet
    async fn poll_response(
        &mut self,
        window: Duration,
    ) -> Result<Option<ElmResponse>, TransportError> {
        if let Some(response) = self.codec.decode(&mut self.rx)? {
            return Ok(Some(response));
        }

        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        match tokio::time::timeout(window, stream.read_buf(&mut self.rx)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(TransportError::Disconnected),
            Ok(Ok(_)) => self.codec.decode(&mut self.rx),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    /// Send a command and wait for its complete response
    async fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<ElmResponse, TransportError> {
        self.rx.clear();
        self.in_flight = None;
        self.send(command).await?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout);
            }
            if let Some(response) = self.poll_response(remaining).await? {
                tracing::debug!("{command} -> {response}");
                return Ok(response);
            }
        }
    }

    async fn run_init_sequence(&mut self) -> Result<(), TransportError> {
        let banner = self.execute("ATZ", RESET_TIMEOUT).await?;
        tracing::info!("Adapter reset: {banner}");

        for command in INIT_COMMANDS {
            let response = self.execute(command, self.settings.response_timeout()).await?;
            if !response.is_ok() {
                return Err(TransportError::UnexpectedResponse {
                    command: command.to_string(),
                    response: response.to_string(),
                });
            }
        }

        // Protocol search happens on the first real request; give it the reset budget
        let supported = self.execute("0100", RESET_TIMEOUT).await?;
        if let Some(err) = supported.bus_error() {
            return Err(TransportError::BusUnavailable(err.to_string()));
        }
        if supported.mode01_data(0x00).is_none() {
            return Err(TransportError::UnexpectedResponse {
                command: "0100".to_string(),
                response: supported.to_string(),
            });
        }
        Ok(())
    }

    fn drop_link(&mut self, err: &TransportError) {
        if self.link_up {
            tracing::warn!("Adapter link lost ({}): {err}", self.connector.describe());
        }
        self.link_up = false;
        self.in_flight = None;
        self.rx.clear();
    }

    fn record_failure(&mut self, parameter: ParameterId) -> QueryOutcome {
        self.consecutive_failures += 1;
        tracing::debug!(
            "{parameter} query failed ({} in a row)",
            self.consecutive_failures
        );
        if self.consecutive_failures >= self.settings.max_consecutive_failures {
            self.drop_link(&TransportError::Timeout);
        }
        QueryOutcome::Failure
    }

    fn handle_response(&mut self, parameter: ParameterId, response: ElmResponse) -> QueryOutcome {
        if let Some(err) = response.bus_error() {
            let err = TransportError::BusUnavailable(err.to_string());
            self.drop_link(&err);
            return QueryOutcome::Failure;
        }

        let value = response
            .mode01_data(parameter.pid())
            .and_then(|data| pid::decode(parameter, &data));

        match value {
            Some(value) => {
                self.consecutive_failures = 0;
                QueryOutcome::Success(value)
            }
            None => {
                if !response.is_no_data() {
                    tracing::debug!("{parameter}: unparsable response '{response}'");
                }
                self.record_failure(parameter)
            }
        }
    }
}

impl<C: Connector> ParameterReader for Elm327Reader<C> {
    async fn query(&mut self, parameter: ParameterId) -> QueryOutcome {
        if !self.is_link_up() {
            return QueryOutcome::Failure;
        }

        // A request for another parameter abandons whatever was in flight
        if matches!(self.in_flight, Some(f) if f.parameter != parameter) {
            self.in_flight = None;
            self.rx.clear();
        }

        let sent_at = match self.in_flight {
            Some(in_flight) => in_flight.sent_at,
            None => {
                // Anything buffered now answers an earlier, abandoned request
                self.rx.clear();
                if let Err(e) = self.send(&pid::request(parameter)).await {
                    self.drop_link(&e);
                    return QueryOutcome::Failure;
                }
                let sent_at = Instant::now();
                self.in_flight = Some(InFlight { parameter, sent_at });
                sent_at
            }
        };

        let response = match self.poll_response(self.settings.read_window()).await {
            Ok(Some(response)) => match response.mode01_pid() {
                Some(pid) if pid != parameter.pid() => {
                    tracing::debug!("{parameter}: discarding late reply '{response}'");
                    None
                }
                _ => Some(response),
            },
            Ok(None) => None,
            Err(e) => {
                self.drop_link(&e);
                return QueryOutcome::Failure;
            }
        };

        match response {
            Some(response) => {
                self.in_flight = None;
                self.handle_response(parameter, response)
            }
            None if sent_at.elapsed() >= self.settings.response_timeout() => {
                self.in_flight = None;
                self.rx.clear();
                self.record_failure(parameter)
            }
            None => QueryOutcome::Pending,
        }
    }

    fn is_link_up(&self) -> bool {
        self.link_up && self.stream.is_some()
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        self.link_up = false;
        self.in_flight = None;
        self.rx.clear();

        let stream = self.connector.connect().await?;
        self.stream = Some(stream);
        self.link_up = true;
        self.consecutive_failures = 0;
        Ok(())
    }

    async fn initialize_protocol(&mut self) -> Result<(), TransportError> {
        let result = self.run_init_sequence().await;
        if let Err(e) = &result {
            self.drop_link(e);
        }
        result
    }
}
