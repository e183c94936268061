//! Minecraft server status (MOTD) query.
//!
//! Implements the client half of the Server List Ping exchange: a handshake
//! requesting the status state, a status request, and a single JSON status
//! response. Packets are length-prefixed with protocol varints.

use serde_json::Value;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

/// Port used when the endpoint does not name one.
pub const DEFAULT_PORT: u16 = 25565;

/// Connect, read, and write timeout for a status query.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Protocol version announced in the handshake.
const PROTOCOL_VERSION: u32 = 47;

/// Handshake `next state` value selecting the status exchange.
const NEXT_STATE_STATUS: u32 = 1;

/// Largest status response accepted.
const MAX_RESPONSE_LEN: u32 = 1 << 20;

/// A remote game server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    host: String,
    port: u16,
}

impl ServerEndpoint {
    /// Create an endpoint from a host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Errors raised while parsing a `host[:port]` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// The endpoint string is blank.
    #[error("server address is empty")]
    Empty,

    /// The port is not a number in `1..=65535`.
    #[error("invalid server port \"{value}\"")]
    InvalidPort {
        /// The rejected port text.
        value: String,
    },
}

impl FromStr for ServerEndpoint {
    type Err = EndpointError;

    /// Parse `host`, `host:port`, `[v6]`, or `[v6]:port`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtnh_updater::status::ServerEndpoint;
    ///
    /// let endpoint: ServerEndpoint = "play.example.net".parse().expect("valid endpoint");
    /// assert_eq!(endpoint.port(), 25565);
    /// let endpoint: ServerEndpoint = "10.0.0.2:25570".parse().expect("valid endpoint");
    /// assert_eq!(endpoint.port(), 25570);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EndpointError::Empty);
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            match rest.split_once(']') {
                Some((host, "")) => (host, None),
                Some((host, tail)) => (host, Some(tail.strip_prefix(':').unwrap_or(tail))),
                None => (s, None),
            }
        } else {
            match s.split_once(':') {
                Some((host, port)) if !port.contains(':') => (host, Some(port)),
                _ => (s, None),
            }
        };

        if host.is_empty() {
            return Err(EndpointError::Empty);
        }
        let port = match port {
            None => DEFAULT_PORT,
            Some(text) => parse_port(text)?,
        };
        Ok(Self::new(host, port))
    }
}

fn parse_port(text: &str) -> Result<u16, EndpointError> {
    let invalid = || EndpointError::InvalidPort {
        value: text.to_owned(),
    };
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match text.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(port) => Ok(port),
    }
}

/// Errors raised by a status query.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The host name did not resolve or no address accepted a connection.
    #[error("cannot reach server {endpoint}: {source}")]
    Unreachable {
        /// The endpoint that was queried.
        endpoint: String,
        /// The last connection error.
        source: io::Error,
    },

    /// Reading or writing the socket failed.
    #[error("status exchange failed: {0}")]
    Io(#[from] io::Error),

    /// The server sent something that is not a status response.
    #[error("unexpected status response: {0}")]
    Protocol(String),

    /// The status JSON could not be parsed.
    #[error("invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for querying a server's message of the day.
#[cfg_attr(test, mockall::automock)]
pub trait StatusQuery {
    /// Return the plain-text MOTD of the server at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a [`StatusError`] when the server cannot be reached or
    /// answers with something unexpected.
    fn motd(&self, endpoint: &ServerEndpoint) -> Result<String, StatusError>;
}

/// Blocking Server List Ping client.
#[derive(Debug, Clone, Copy)]
pub struct ServerListPing {
    timeout: Duration,
}

impl Default for ServerListPing {
    fn default() -> Self {
        Self {
            timeout: STATUS_TIMEOUT,
        }
    }
}

impl ServerListPing {
    /// Create a client with a custom timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn connect(&self, endpoint: &ServerEndpoint) -> Result<TcpStream, StatusError> {
        let unreachable = |source| StatusError::Unreachable {
            endpoint: endpoint.to_string(),
            source,
        };
        let addrs: Vec<SocketAddr> = (endpoint.host(), endpoint.port())
            .to_socket_addrs()
            .map_err(unreachable)?
            .collect();

        let mut last_error =
            io::Error::new(io::ErrorKind::NotFound, "host name resolved to no addresses");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_error = e,
            }
        }
        Err(unreachable(last_error))
    }
}

impl StatusQuery for ServerListPing {
    fn motd(&self, endpoint: &ServerEndpoint) -> Result<String, StatusError> {
        let mut stream = self.connect(endpoint)?;
        exchange_status(&mut stream, endpoint)
    }
}

/// Run the handshake and status request over `stream` and return the MOTD.
fn exchange_status<S: Read + Write>(
    stream: &mut S,
    endpoint: &ServerEndpoint,
) -> Result<String, StatusError> {
    let mut handshake = Vec::new();
    write_varint(&mut handshake, 0x00);
    write_varint(&mut handshake, PROTOCOL_VERSION);
    write_string(&mut handshake, endpoint.host())?;
    handshake.extend_from_slice(&endpoint.port().to_be_bytes());
    write_varint(&mut handshake, NEXT_STATE_STATUS);

    let mut request = Vec::new();
    write_packet(&mut request, &handshake)?;
    write_packet(&mut request, &[0x00])?;
    stream.write_all(&request)?;
    stream.flush()?;

    let length = read_varint(stream)?;
    if length == 0 || length > MAX_RESPONSE_LEN {
        return Err(StatusError::Protocol(format!("packet length {length}")));
    }
    let mut packet = vec![0_u8; usize_from(length)];
    stream.read_exact(&mut packet)?;

    let mut body = packet.as_slice();
    let packet_id = read_varint(&mut body)?;
    if packet_id != 0x00 {
        return Err(StatusError::Protocol(format!("packet id {packet_id:#04x}")));
    }
    let json_len = usize_from(read_varint(&mut body)?);
    let json = body
        .get(..json_len)
        .ok_or_else(|| StatusError::Protocol("truncated status string".to_owned()))?;
    let status: Value = serde_json::from_slice(json)?;

    Ok(status.get("description").map(flatten_text).unwrap_or_default())
}

/// Flatten a chat component (or plain string) to its visible text.
fn flatten_text(component: &Value) -> String {
    match component {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            let mut text = map
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            if let Some(Value::Array(extra)) = map.get("extra") {
                for part in extra {
                    text.push_str(&flatten_text(part));
                }
            }
            text
        }
        Value::Array(parts) => parts.iter().map(flatten_text).collect(),
        _ => String::new(),
    }
}

fn usize_from(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn write_packet(out: &mut Vec<u8>, payload: &[u8]) -> Result<(), StatusError> {
    let length = u32::try_from(payload.len())
        .map_err(|_| StatusError::Protocol("packet too large".to_owned()))?;
    write_varint(out, length);
    out.extend_from_slice(payload);
    Ok(())
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<(), StatusError> {
    write_packet(out, value.as_bytes())
}

/// Append `value` as a protocol varint (7 bits per byte, low group first).
fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let low = value.to_le_bytes()[0] & 0x7F;
        value >>= 7;
        if value == 0 {
            out.push(low);
            return;
        }
        out.push(low | 0x80);
    }
}

/// Read a protocol varint of at most five bytes.
fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<u32, StatusError> {
    let mut value = 0_u32;
    for shift in (0..35).step_by(7) {
        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte)?;
        value |= u32::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(StatusError::Protocol("varint longer than five bytes".to_owned()))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
