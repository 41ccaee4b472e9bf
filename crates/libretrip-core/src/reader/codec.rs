//! ELM327 framing
//!
//! Requests are ASCII lines terminated by `\r`; every response ends with the
//! `>` prompt. The codec splits the byte stream on the prompt and cleans the
//! response into trimmed text lines.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::TransportError;

/// Prompt byte the adapter sends when it is ready for the next command
pub const PROMPT: u8 = b'>';

/// Largest response accepted before the buffer is considered corrupt
pub const MAX_RESPONSE_SIZE: usize = 1024;

/// Bus-level failures reported by the adapter in place of data
const BUS_ERRORS: [&str; 4] = ["UNABLE TO CONNECT", "CAN ERROR", "BUS ERROR", "STOPPED"];

/// One complete adapter response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElmResponse {
    lines: Vec<String>,
}

impl ElmResponse {
    /// Build a response from raw text (everything before the prompt)
    pub fn parse(raw: &str) -> Self {
        let lines = raw
            .split(['\r', '\n'])
            .map(|l| l.trim_matches(|c: char| c.is_whitespace() || c == '\0'))
            .filter(|l| !l.is_empty() && !l.starts_with("SEARCHING"))
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    /// Cleaned response lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether the adapter acknowledged an AT command
    pub fn is_ok(&self) -> bool {
        self.lines.iter().any(|l| l == "OK")
    }

    /// Whether the vehicle had no answer for the request
    pub fn is_no_data(&self) -> bool {
        self.lines.iter().any(|l| l == "NO DATA" || l == "?")
    }

    /// A bus-level error message, if the adapter reported one
    ///
    /// `BUS INIT: ...OK` is progress, only `BUS INIT: ...ERROR` is a failure.
    pub fn bus_error(&self) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| {
                BUS_ERRORS.iter().any(|e| l.contains(e))
                    || (l.starts_with("BUS INIT") && l.ends_with("ERROR"))
            })
            .map(String::as_str)
    }

    /// PID echoed by the first Mode 01 reply line, whatever was asked
    pub fn mode01_pid(&self) -> Option<u8> {
        self.lines.iter().find_map(|line| {
            let compact = compact(line);
            let payload = compact.strip_prefix("41")?;
            decode_hex(payload.get(..2)?)?.first().copied()
        })
    }

    /// Data bytes of a Mode 01 reply for `pid` (headers off)
    ///
    /// `41 0D 32` for PID 0x0D yields `[0x32]`.
    pub fn mode01_data(&self, pid: u8) -> Option<Vec<u8>> {
        let prefix = format!("41{:02X}", pid);
        self.lines.iter().find_map(|line| {
            let compact = compact(line);
            let payload = compact.strip_prefix(&prefix)?;
            decode_hex(payload)
        })
    }
}

impl std::fmt::Display for ElmResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lines.join(" | "))
    }
}

fn compact(line: &str) -> String {
    line.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Hex pairs to bytes; lossy-decoded garbage yields `None`
fn decode_hex(payload: &str) -> Option<Vec<u8>> {
    if !payload.is_ascii() || payload.len() % 2 != 0 {
        return None;
    }
    payload
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        })
        .collect()
}

/// Codec for the ELM327 command/prompt protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct ElmCodec;

impl Decoder for ElmCodec {
    type Item = ElmResponse;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| *b == PROMPT) {
            Some(pos) => {
                let frame = src.split_to(pos + 1);
                let text = String::from_utf8_lossy(&frame[..pos]);
                Ok(Some(ElmResponse::parse(&text)))
            }
            None if src.len() > MAX_RESPONSE_SIZE => {
                src.clear();
                Err(TransportError::BufferOverflow)
            }
            None => Ok(None),
        }
    }
}

impl Encoder<&str> for ElmCodec {
    type Error = TransportError;

    fn encode(&mut self, command: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(command.len() + 1);
        dst.put_slice(command.as_bytes());
        dst.put_u8(b'\r');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_waits_for_prompt() {
        let mut codec = ElmCodec;
        let mut buf = BytesMut::from(&b"41 0D 3"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"2\r\r>");
        let response = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.mode01_data(0x0D), Some(vec![0x32]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_keeps_trailing_bytes() {
        let mut codec = ElmCodec;
        let mut buf = BytesMut::from(&b"OK\r>41"[..]);
        let response = codec.decode(&mut buf).unwrap().unwrap();
        assert!(response.is_ok());
        assert_eq!(&buf[..], b"41");
    }

    #[test]
    fn test_decode_overflow() {
        let mut codec = ElmCodec;
        let mut buf = BytesMut::from(&vec![b'A'; MAX_RESPONSE_SIZE + 1][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::BufferOverflow)
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_appends_carriage_return() {
        let mut codec = ElmCodec;
        let mut buf = BytesMut::new();
        codec.encode("010D", &mut buf).unwrap();
        assert_eq!(&buf[..], b"010D\r");
    }

    #[test]
    fn test_response_classification() {
        let searching = ElmResponse::parse("SEARCHING...\r\nUNABLE TO CONNECT\r\n");
        assert_eq!(searching.bus_error(), Some("UNABLE TO CONNECT"));

        let no_data = ElmResponse::parse("NO DATA\r");
        assert!(no_data.is_no_data());
        assert_eq!(no_data.mode01_data(0x0D), None);
    }

    #[test]
    fn test_mode01_ignores_other_pids_and_odd_payloads() {
        let response = ElmResponse::parse("41 0C 1A F8\r41 0D 3\r");
        assert_eq!(response.mode01_data(0x0C), Some(vec![0x1A, 0xF8]));
        assert_eq!(response.mode01_data(0x0D), None);
        assert_eq!(response.mode01_data(0x10), None);
    }

    #[test]
    fn test_invalid_byte_in_reply_is_not_data() {
        let mut codec = ElmCodec;
        let mut buf = BytesMut::from(&b"41 0D \xFFA\r>"[..]);
        let response = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.mode01_data(0x0D), None);
        assert_eq!(response.mode01_pid(), Some(0x0D));

        let garbled = ElmResponse::parse("41 \u{FFFD}\r");
        assert_eq!(garbled.mode01_pid(), None);
        assert_eq!(garbled.mode01_data(0x0D), None);
    }

    #[test]
    fn test_bus_init_progress_is_not_an_error() {
        let ok = ElmResponse::parse("BUS INIT: ...OK\r41 00 BE 3E B8 11\r");
        assert_eq!(ok.bus_error(), None);
        assert_eq!(ok.mode01_data(0x00), Some(vec![0xBE, 0x3E, 0xB8, 0x11]));

        let failed = ElmResponse::parse("BUS INIT: ...ERROR\r");
        assert_eq!(failed.bus_error(), Some("BUS INIT: ...ERROR"));
        assert_eq!(
            ElmResponse::parse("BUS ERROR\r").bus_error(),
            Some("BUS ERROR")
        );
    }

    #[test]
    fn test_mode01_pid_reports_echoed_pid() {
        assert_eq!(ElmResponse::parse("41 10 01 F4\r").mode01_pid(), Some(0x10));
        assert_eq!(ElmResponse::parse("NO DATA\r").mode01_pid(), None);
    }
}
