use crate::error::ApiError;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A fully collected HTTP response, as guaranteed by the transport contract:
/// the status code, the response headers in encounter order (each a raw
/// `Name: value` line), and the body with any transfer encoding already
/// removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<String>,
    pub body: String,
}

/// The low-level request/response seam.
///
/// The caller composes the complete request bytes (request line, `Host`,
/// `Content-Length` when a body is present, `Connection: close`, body); the
/// transport only moves them and collects the reply. No retries and no
/// timeouts live at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, host: &str, port: u16, request: &[u8]) -> Result<RawResponse, ApiError>;
}

/// Production transport: one blocking round-trip per request over TLS.
///
/// Every request carries `Connection: close`, so the response is simply read
/// to EOF and parsed afterwards.
pub struct TlsTransport {
    connector: tokio_native_tls::TlsConnector,
}

impl TlsTransport {
    pub fn new() -> Result<Self, ApiError> {
        let connector = native_tls::TlsConnector::new()?;
        Ok(Self {
            connector: tokio_native_tls::TlsConnector::from(connector),
        })
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn send(&self, host: &str, port: u16, request: &[u8]) -> Result<RawResponse, ApiError> {
        let stream = TcpStream::connect((host, port)).await?;
        let mut tls = self.connector.connect(host, stream).await?;

        tls.write_all(request).await?;

        let mut raw = Vec::new();
        tls.read_to_end(&mut raw).await?;

        let response = parse_response(&raw)?;
        tracing::debug!(
            host,
            status = response.status,
            body_len = response.body.len(),
            "response received"
        );
        Ok(response)
    }
}

/// Splits a raw HTTP/1.1 reply into status, header lines, and body, decoding
/// a chunked body if the server used `Transfer-Encoding: chunked`.
///
/// Chunk framing works on the raw bytes: chunk sizes are byte counts and the
/// server may split a multi-byte character across chunks, so the body is only
/// converted to a string after reassembly.
pub fn parse_response(raw: &[u8]) -> Result<RawResponse, ApiError> {
    let separator = find(raw, b"\r\n\r\n").ok_or_else(|| {
        ApiError::MalformedResponse("no header/body separator".to_string())
    })?;
    let head = String::from_utf8_lossy(&raw[..separator]);
    let body = &raw[separator + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| ApiError::MalformedResponse("empty response".to_string()))?;

    // Status line: `HTTP/1.1 200 OK`.
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ApiError::MalformedResponse(format!("bad status line: {status_line}")))?;

    let headers: Vec<String> = lines.map(|line| line.to_string()).collect();

    let chunked = headers.iter().any(|header| {
        let lower = header.to_ascii_lowercase();
        lower.starts_with("transfer-encoding:") && lower.contains("chunked")
    });

    let body = if chunked {
        String::from_utf8_lossy(&decode_chunked(body)?).into_owned()
    } else {
        String::from_utf8_lossy(body).into_owned()
    };

    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

/// First position of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reassembles a `Transfer-Encoding: chunked` body: hex size line, that many
/// bytes of payload, repeated until the zero-sized terminator chunk.
fn decode_chunked(body: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut decoded = Vec::new();
    let mut rest = body;

    loop {
        let Some(pos) = find(rest, b"\r\n") else {
            break; // truncated trailer; keep what we have
        };
        let size_line = String::from_utf8_lossy(&rest[..pos]);
        let after = &rest[pos + 2..];

        // Chunk extensions (`;...`) are ignored.
        let size_field = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| ApiError::MalformedResponse(format!("bad chunk size: {size_line}")))?;

        if size == 0 {
            break;
        }
        if after.len() < size {
            return Err(ApiError::MalformedResponse(
                "chunk shorter than declared size".to_string(),
            ));
        }

        decoded.extend_from_slice(&after[..size]);
        rest = &after[size..];
        while rest.starts_with(b"\r\n") {
            rest = &rest[2..];
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_headers_and_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nSet-Cookie: a=1; Path=/\r\n\r\n{\"ok\":true}";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            response.headers,
            vec![
                "Content-Type: application/json".to_string(),
                "Set-Cookie: a=1; Path=/".to_string(),
            ]
        );
        assert_eq!(response.body, "{\"ok\":true}");
    }

    #[test]
    fn decodes_chunked_bodies() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n7\r\n{\"id\":\"\r\n4\r\n42\"}\r\n0\r\n\r\n";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.body, "{\"id\":\"42\"}");
    }

    #[test]
    fn chunk_boundaries_may_split_multibyte_characters() {
        // Chunk sizes are byte counts; an "é" (0xC3 0xA9) arriving as two
        // one-byte chunks must reassemble cleanly.
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\n\xC3\r\n1\r\n\xA9\r\n0\r\n\r\n";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.body, "\u{e9}");
    }

    #[test]
    fn missing_separator_is_malformed() {
        assert!(matches!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain"),
            Err(ApiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_numeric_status_is_malformed() {
        assert!(matches!(
            parse_response(b"HTTP/1.1 abc\r\n\r\n"),
            Err(ApiError::MalformedResponse(_))
        ));
    }
}
