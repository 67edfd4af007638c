//! Row-append publishing to the remote tabular-data API.
//!
//! The wire format is a single-row append request:
//!
//! ```text
//! POST /apis/v1beta1/docs/{docId}/tables/{tableId}/rows
//! { "rows": [ { "cells": [
//!     {"column": "<tempColumnId>", "value": <fahrenheit>},
//!     {"column": "<humidityColumnId>", "value": <fraction>}
//! ] } ] }
//! ```
//!
//! Success is exactly HTTP 202 (the API's async-accept status); every
//! other status and every transport failure classifies as
//! [`PublishError`]. There is no retry, no backoff, and no queue: a
//! failed publish is dropped and the next cycle's fresh reading is the
//! de facto retry.
//!
//! Encoding and response classification are pure functions so they can
//! be tested without a network; [`RowApiClient`] composes them over any
//! `embedded-io-async` transport (the firmware hands it a TLS
//! connection with a pinned server certificate).

use core::fmt::Write as _;

use embedded_io_async::{Read, Write};
use heapless::String;
use thiserror_no_std::Error;

use crate::config::ApiConfig;
use crate::reading::Reading;

/// Fixed base path of the remote API.
pub const API_BASE_PATH: &str = "/apis/v1beta1";

/// Capacity for the JSON row body.
const BODY_CAPACITY: usize = 256;
/// Capacity for a full request (start line + headers + body).
const REQUEST_CAPACITY: usize = 1024;
/// Capacity for the buffered response.
const RESPONSE_CAPACITY: usize = 1024;

/// Why a publish (or a diagnostic row-count read) did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The server answered with a status other than 202.
    #[error("server returned status {0}")]
    Rejected(u16),
    /// The transport failed before a status could be read.
    #[error("transport failed during {0}")]
    Transport(&'static str),
    /// The response could not be parsed as HTTP, or a diagnostic
    /// response was missing the field it promised.
    #[error("malformed response")]
    MalformedResponse,
    /// The reading carried no valid fields, so there is nothing to send.
    #[error("reading has no valid fields")]
    EmptyReading,
    /// The request did not fit its fixed-size buffer.
    #[error("request overflowed its buffer")]
    Overflow,
}

/// Encode the one-row append body for a reading.
///
/// One cell is emitted per *valid* field, mapping the configured column
/// identifier to the converted value (°F for temperature, 0–1 fraction
/// for humidity). Values are formatted with `f32`'s shortest round-trip
/// display, so the payload reflects the conversions bit-for-bit.
pub fn encode_row_body(
    config: &ApiConfig<'_>,
    reading: &Reading,
) -> Result<String<BODY_CAPACITY>, PublishError> {
    if !reading.has_valid_field() {
        return Err(PublishError::EmptyReading);
    }

    let mut body: String<BODY_CAPACITY> = String::new();
    body.push_str("{\"rows\":[{\"cells\":[")
        .map_err(|_| PublishError::Overflow)?;

    let mut first = true;
    if let Some(fahrenheit) = reading.temperature_fahrenheit() {
        write!(
            body,
            "{{\"column\":\"{}\",\"value\":{}}}",
            config.temperature_column_id, fahrenheit
        )
        .map_err(|_| PublishError::Overflow)?;
        first = false;
    }
    if let Some(fraction) = reading.humidity_fraction() {
        if !first {
            body.push(',').map_err(|_| PublishError::Overflow)?;
        }
        write!(
            body,
            "{{\"column\":\"{}\",\"value\":{}}}",
            config.humidity_column_id, fraction
        )
        .map_err(|_| PublishError::Overflow)?;
    }

    body.push_str("]}]}").map_err(|_| PublishError::Overflow)?;
    Ok(body)
}

/// Encode the full append POST, headers and body.
fn encode_append_request(
    config: &ApiConfig<'_>,
    body: &str,
    reuse: bool,
) -> Result<String<REQUEST_CAPACITY>, PublishError> {
    let mut request: String<REQUEST_CAPACITY> = String::new();
    write!(
        request,
        "POST {base}/docs/{doc}/tables/{table}/rows HTTP/1.1\r\n\
         Host: {host}\r\n\
         Authorization: Bearer {token}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {len}\r\n\
         Connection: {conn}\r\n\
         \r\n\
         {body}",
        base = API_BASE_PATH,
        doc = config.doc_id,
        table = config.table_id,
        host = config.host,
        token = config.bearer_token,
        len = body.len(),
        conn = if reuse { "keep-alive" } else { "close" },
        body = body,
    )
    .map_err(|_| PublishError::Overflow)?;
    Ok(request)
}

/// Encode the diagnostic GET against the table resource.
///
/// Always `Connection: close` so the response is delimited by EOF and
/// the whole body can be buffered without chunked-transfer handling.
fn encode_row_count_request(
    config: &ApiConfig<'_>,
) -> Result<String<REQUEST_CAPACITY>, PublishError> {
    let mut request: String<REQUEST_CAPACITY> = String::new();
    write!(
        request,
        "GET {base}/docs/{doc}/tables/{table} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Authorization: Bearer {token}\r\n\
         Connection: close\r\n\
         \r\n",
        base = API_BASE_PATH,
        doc = config.doc_id,
        table = config.table_id,
        host = config.host,
        token = config.bearer_token,
    )
    .map_err(|_| PublishError::Overflow)?;
    Ok(request)
}

/// Parse the status code out of an HTTP/1.x status line.
pub fn parse_status_code(response: &[u8]) -> Result<u16, PublishError> {
    let line_end = response
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(response.len());
    let line =
        core::str::from_utf8(&response[..line_end]).map_err(|_| PublishError::MalformedResponse)?;

    let mut parts = line.split_whitespace();
    match parts.next() {
        Some(version) if version.starts_with("HTTP/") => {}
        _ => return Err(PublishError::MalformedResponse),
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(PublishError::MalformedResponse)
}

/// Classify a status code: 202 is the only success.
pub fn classify_status(code: u16) -> Result<(), PublishError> {
    if code == 202 {
        Ok(())
    } else {
        Err(PublishError::Rejected(code))
    }
}

/// Extract `rowCount` from a buffered GET response.
///
/// A response that parses as HTTP but is missing the field, or carries
/// a non-numeric value, is an error — never a sentinel.
pub fn parse_row_count(response: &[u8]) -> Result<u32, PublishError> {
    classify_get_status(response)?;

    let text = core::str::from_utf8(response).map_err(|_| PublishError::MalformedResponse)?;
    let field = text
        .find("\"rowCount\"")
        .ok_or(PublishError::MalformedResponse)?;
    let rest = &text[field + "\"rowCount\"".len()..];
    let rest = rest
        .trim_start()
        .strip_prefix(':')
        .ok_or(PublishError::MalformedResponse)?
        .trim_start();

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..digits_end]
        .parse::<u32>()
        .map_err(|_| PublishError::MalformedResponse)
}

/// The GET succeeds on any 2xx; the 202 contract is POST-specific.
fn classify_get_status(response: &[u8]) -> Result<(), PublishError> {
    let code = parse_status_code(response)?;
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(PublishError::Rejected(code))
    }
}

/// Client for the remote row API over a caller-supplied transport.
///
/// The client owns no connection: the firmware opens a fresh pinned TLS
/// session per call and hands it in, which keeps this type free of
/// platform details. `reuse` only selects the keep-alive header; it is
/// an efficiency knob, not a correctness requirement.
pub struct RowApiClient<'a> {
    config: &'a ApiConfig<'a>,
    reuse: bool,
}

impl<'a> RowApiClient<'a> {
    pub const fn new(config: &'a ApiConfig<'a>) -> Self {
        Self {
            config,
            reuse: false,
        }
    }

    /// Ask the server to hold connections open across calls.
    pub fn set_reuse(&mut self, reuse: bool) {
        self.reuse = reuse;
    }

    /// Append one row for `reading`. Success is exactly HTTP 202.
    pub async fn append_row<T: Read + Write>(
        &self,
        conn: &mut T,
        reading: &Reading,
    ) -> Result<(), PublishError> {
        let body = encode_row_body(self.config, reading)?;
        let request = encode_append_request(self.config, &body, self.reuse)?;

        conn.write_all(request.as_bytes())
            .await
            .map_err(|_| PublishError::Transport("request write"))?;
        conn.flush()
            .await
            .map_err(|_| PublishError::Transport("request flush"))?;

        let mut buf = [0u8; RESPONSE_CAPACITY];
        let filled = read_status_line(conn, &mut buf).await?;
        let code = parse_status_code(&buf[..filled])?;
        classify_status(code)
    }

    /// Diagnostic read of the table's reported row count.
    ///
    /// Not used by the steady-state loop; present for symmetry with the
    /// append contract and for bring-up checks.
    pub async fn row_count<T: Read + Write>(&self, conn: &mut T) -> Result<u32, PublishError> {
        let request = encode_row_count_request(self.config)?;

        conn.write_all(request.as_bytes())
            .await
            .map_err(|_| PublishError::Transport("request write"))?;
        conn.flush()
            .await
            .map_err(|_| PublishError::Transport("request flush"))?;

        let mut buf = [0u8; RESPONSE_CAPACITY];
        let filled = read_to_end(conn, &mut buf).await?;
        parse_row_count(&buf[..filled])
    }
}

/// Read until the buffer holds at least one complete line.
///
/// The append call only needs the status line; with keep-alive the
/// server may hold the connection open, so reading to EOF would stall.
async fn read_status_line<T: Read>(conn: &mut T, buf: &mut [u8]) -> Result<usize, PublishError> {
    let mut filled = 0usize;
    loop {
        let n = conn
            .read(&mut buf[filled..])
            .await
            .map_err(|_| PublishError::Transport("response read"))?;
        if n == 0 {
            return Ok(filled);
        }
        filled += n;
        if buf[..filled].windows(2).any(|w| w == b"\r\n") || filled == buf.len() {
            return Ok(filled);
        }
    }
}

/// Read until EOF or the buffer is full.
async fn read_to_end<T: Read>(conn: &mut T, buf: &mut [u8]) -> Result<usize, PublishError> {
    let mut filled = 0usize;
    while filled < buf.len() {
        let n = conn
            .read(&mut buf[filled..])
            .await
            .map_err(|_| PublishError::Transport("response read"))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    fn test_config() -> ApiConfig<'static> {
        ApiConfig {
            host: "coda.io",
            bearer_token: "test-token",
            doc_id: "d-doc",
            table_id: "grid-table",
            temperature_column_id: "c-temp",
            humidity_column_id: "c-hum",
            certificate_sha256: [0u8; 32],
        }
    }

    /// In-memory transport with a scripted response.
    struct ScriptedConn {
        response: &'static [u8],
        consumed: usize,
        written: Vec<u8>,
        fail_write: bool,
    }

    impl ScriptedConn {
        fn replying(response: &'static [u8]) -> Self {
            Self {
                response,
                consumed: 0,
                written: Vec::new(),
                fail_write: false,
            }
        }

        fn broken() -> Self {
            Self {
                response: b"",
                consumed: 0,
                written: Vec::new(),
                fail_write: true,
            }
        }
    }

    impl embedded_io_async::ErrorType for ScriptedConn {
        type Error = embedded_io_async::ErrorKind;
    }

    impl embedded_io_async::Read for ScriptedConn {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let remaining = &self.response[self.consumed..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.consumed += n;
            Ok(n)
        }
    }

    impl embedded_io_async::Write for ScriptedConn {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.fail_write {
                return Err(embedded_io_async::ErrorKind::Other);
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn body_reflects_conversions_exactly() {
        let config = test_config();
        let reading = Reading::new(21.5, 48.25, 0);
        let body = encode_row_body(&config, &reading).unwrap();
        let expected = format!(
            "{{\"rows\":[{{\"cells\":[{{\"column\":\"c-temp\",\"value\":{}}},{{\"column\":\"c-hum\",\"value\":{}}}]}}]}}",
            21.5f32 * 1.8 + 32.0,
            48.25f32 / 100.0,
        );
        assert_eq!(body.as_str(), expected);
    }

    #[test]
    fn body_skips_invalid_fields() {
        let config = test_config();
        let reading = Reading {
            temperature_celsius: None,
            relative_humidity_percent: Some(50.0),
            captured_at_ms: 0,
        };
        let body = encode_row_body(&config, &reading).unwrap();
        assert!(!body.contains("c-temp"));
        assert!(body.contains("\"column\":\"c-hum\",\"value\":0.5"));
    }

    #[test]
    fn empty_reading_is_rejected_before_any_io() {
        let config = test_config();
        assert_eq!(
            encode_row_body(&config, &Reading::invalid(0)),
            Err(PublishError::EmptyReading)
        );
    }

    #[test]
    fn append_request_has_expected_headers() {
        let config = test_config();
        let request = encode_append_request(&config, "{}", false).unwrap();
        assert!(request.starts_with("POST /apis/v1beta1/docs/d-doc/tables/grid-table/rows HTTP/1.1\r\n"));
        assert!(request.contains("Host: coda.io\r\n"));
        assert!(request.contains("Authorization: Bearer test-token\r\n"));
        assert!(request.contains("Content-Type: application/json\r\n"));
        assert!(request.contains("Content-Length: 2\r\n"));
        assert!(request.contains("Connection: close\r\n"));
        assert!(request.ends_with("\r\n\r\n{}"));

        let reused = encode_append_request(&config, "{}", true).unwrap();
        assert!(reused.contains("Connection: keep-alive\r\n"));
    }

    #[test]
    fn only_202_is_success() {
        assert_eq!(classify_status(202), Ok(()));
        for code in [200u16, 204, 400, 401, 404, 500, 502] {
            assert_eq!(classify_status(code), Err(PublishError::Rejected(code)));
        }
    }

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_code(b"HTTP/1.1 202 Accepted\r\n"), Ok(202));
        assert_eq!(parse_status_code(b"HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Bearer\r\n"), Ok(401));
        assert_eq!(
            parse_status_code(b"garbage in garbage out"),
            Err(PublishError::MalformedResponse)
        );
        assert_eq!(parse_status_code(b""), Err(PublishError::MalformedResponse));
    }

    #[test]
    fn row_count_parses_from_full_response() {
        let response: &[u8] =
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"id\":\"grid-table\",\"rowCount\": 1234,\"name\":\"Readings\"}";
        assert_eq!(parse_row_count(response), Ok(1234));
    }

    #[test]
    fn row_count_missing_or_malformed_is_an_error() {
        let missing: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n{\"id\":\"grid-table\"}";
        assert_eq!(parse_row_count(missing), Err(PublishError::MalformedResponse));

        let non_numeric: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n{\"rowCount\":\"many\"}";
        assert_eq!(
            parse_row_count(non_numeric),
            Err(PublishError::MalformedResponse)
        );

        let rejected: &[u8] = b"HTTP/1.1 404 Not Found\r\n\r\n{}";
        assert_eq!(parse_row_count(rejected), Err(PublishError::Rejected(404)));
    }

    #[test]
    fn append_row_accepts_202() {
        let config = test_config();
        let client = RowApiClient::new(&config);
        let mut conn = ScriptedConn::replying(b"HTTP/1.1 202 Accepted\r\n\r\n");
        let reading = Reading::new(20.0, 40.0, 42);

        block_on(client.append_row(&mut conn, &reading)).unwrap();

        let sent = core::str::from_utf8(&conn.written).unwrap();
        assert!(sent.contains("/docs/d-doc/tables/grid-table/rows"));
        assert!(sent.contains("\"column\":\"c-temp\""));
    }

    #[test]
    fn append_row_classifies_rejection_without_panicking() {
        let config = test_config();
        let client = RowApiClient::new(&config);
        for (response, expected) in [
            (b"HTTP/1.1 200 OK\r\n\r\n" as &[u8], PublishError::Rejected(200)),
            (b"HTTP/1.1 400 Bad Request\r\n\r\n", PublishError::Rejected(400)),
            (b"HTTP/1.1 500 Internal Server Error\r\n\r\n", PublishError::Rejected(500)),
        ] {
            let mut conn = ScriptedConn::replying(response);
            let reading = Reading::new(20.0, 40.0, 0);
            assert_eq!(
                block_on(client.append_row(&mut conn, &reading)),
                Err(expected)
            );
        }
    }

    #[test]
    fn transport_failure_classifies_as_publish_error() {
        let config = test_config();
        let client = RowApiClient::new(&config);
        let mut conn = ScriptedConn::broken();
        let reading = Reading::new(20.0, 40.0, 0);
        assert_eq!(
            block_on(client.append_row(&mut conn, &reading)),
            Err(PublishError::Transport("request write"))
        );
    }

    #[test]
    fn row_count_over_mock_transport() {
        let config = test_config();
        let client = RowApiClient::new(&config);
        let mut conn =
            ScriptedConn::replying(b"HTTP/1.1 200 OK\r\n\r\n{\"rowCount\":77}");
        assert_eq!(block_on(client.row_count(&mut conn)), Ok(77));
        let sent = core::str::from_utf8(&conn.written).unwrap();
        assert!(sent.starts_with("GET /apis/v1beta1/docs/d-doc/tables/grid-table HTTP/1.1\r\n"));
    }
}
