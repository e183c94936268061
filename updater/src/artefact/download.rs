//! HTTP transport for archive sources.
//!
//! Provides a trait-based abstraction over the three request shapes the
//! sources need (existence probe, text body, streamed body) so sources can
//! be tested without network access.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Connect and response timeout for every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on reading one response body.
///
/// Client archives are large, so this is far above [`REQUEST_TIMEOUT`]; it
/// turns a stalled transfer into a failure of that source.
pub const BODY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Buffer size used when streaming archive bodies to disk.
pub const CHUNK_SIZE: usize = 512 * 1024;

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// Extra request headers, in order.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a request with no extra headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

/// Trait for issuing HTTP requests.
#[cfg_attr(test, mockall::automock)]
pub trait HttpTransport {
    /// Issue a HEAD request and return the status code.
    ///
    /// Non-success statuses are returned, not raised.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be sent or times out.
    fn head(&self, request: &HttpRequest) -> Result<u16, DownloadError>;

    /// Issue a GET request and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    fn get_text(&self, request: &HttpRequest) -> Result<String, DownloadError>;

    /// Issue a GET request and stream the body into `dest`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// failed write.
    fn download_to_file(&self, request: &HttpRequest, dest: &Path) -> Result<u64, DownloadError>;
}

/// Errors arising from HTTP transfers.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed before a response was received.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The returned status code.
        status: u16,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] io::Error),
}

/// HTTP transport backed by `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqTransport;

impl HttpTransport for UreqTransport {
    fn head(&self, request: &HttpRequest) -> Result<u16, DownloadError> {
        let mut builder = http_agent().head(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .call()
            .map_err(|e| map_ureq_error(&request.url, &e))?;
        Ok(response.status().as_u16())
    }

    fn get_text(&self, request: &HttpRequest) -> Result<String, DownloadError> {
        let response = send_get(http_agent(), request)?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| map_ureq_error(&request.url, &e))
    }

    fn download_to_file(&self, request: &HttpRequest, dest: &Path) -> Result<u64, DownloadError> {
        stream_to_file(http_agent(), request, dest)
    }
}

fn stream_to_file(
    agent: &ureq::Agent,
    request: &HttpRequest,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let response = send_get(agent, request)?;
    let mut reader = response.into_body().into_reader();
    let mut file = BufWriter::new(File::create(dest)?);
    let written = copy_in_chunks(&mut reader, &mut file)?;
    file.flush()?;
    Ok(written)
}

fn send_get(
    agent: &ureq::Agent,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, DownloadError> {
    let mut builder = agent.get(&request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let response = builder
        .call()
        .map_err(|e| map_ureq_error(&request.url, &e))?;
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(DownloadError::Status {
            url: request.url.clone(),
            status,
        });
    }
    Ok(response)
}

/// Copy `reader` into `writer` through a fixed [`CHUNK_SIZE`] buffer.
///
/// Interrupted reads are retried; a zero-length read ends the stream.
///
/// # Errors
///
/// Returns the first read or write error.
pub fn copy_in_chunks(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<u64> {
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    let mut total = 0_u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        writer.write_all(chunk)?;
        total += read as u64;
    }
    Ok(total)
}

/// Shared `ureq` agent.
///
/// Status codes are returned to the caller rather than raised so the mirror
/// probe can report them.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| build_agent(REQUEST_TIMEOUT, BODY_TIMEOUT))
}

fn build_agent(request_timeout: Duration, body_timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_connect(Some(request_timeout))
        .timeout_recv_response(Some(request_timeout))
        .timeout_recv_body(Some(body_timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(status) => DownloadError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
