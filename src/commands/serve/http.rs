//! Minimal blocking HTTP/1.1 wire layer over any Read + Write stream.
//!
//! httparse-based parsing instead of a framework. Intentionally limited:
//! - One request per connection (no keep-alive)
//! - No chunked transfer encoding (rejected)
//! - POST requires Content-Length
//! - Header cap: 32 KiB, body cap: 1 MiB

use serde::Serialize;
use std::io::{Read, Write};

/// Maximum header section size (32 KiB)
const MAX_HEADER_BYTES: usize = 32 * 1024;

/// Maximum request body size (1 MiB)
const MAX_BODY_BYTES: usize = 1_048_576;

/// Parsed request, ready for routing.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response to write back.
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// JSON response with the right Content-Type.
    pub fn json(status: u16, value: &impl Serialize) -> Self {
        Response {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// What came off the wire.
pub enum ReadOutcome {
    /// Connection closed before any request arrived.
    Closed,
    /// Unusable request; the message belongs in a 400 response.
    Malformed(String),
    Request(Request),
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn wants_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

/// Read and parse one request. Bytes past the header section that arrive
/// in the same reads are kept as the start of the body.
pub fn read_request(stream: &mut impl Read) -> ReadOutcome {
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return ReadOutcome::Malformed("Headers too large".to_string());
        }
        match stream.read(&mut chunk) {
            Ok(0) => {
                if buf.is_empty() {
                    return ReadOutcome::Closed;
                }
                return ReadOutcome::Malformed("Connection closed mid-request".to_string());
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) if buf.is_empty() => return ReadOutcome::Closed,
            Err(e) => return ReadOutcome::Malformed(format!("Read error: {e}")),
        }
    };

    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut parsed = httparse::Request::new(&mut header_storage);
    match parsed.parse(&buf[..header_end]) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return ReadOutcome::Malformed("Incomplete HTTP request".to_string());
        }
        Err(e) => return ReadOutcome::Malformed(format!("HTTP parse error: {e}")),
    }

    let method = parsed.method.unwrap_or("").to_string();
    let path = parsed.path.unwrap_or("/").to_string();

    let mut headers = Vec::new();
    let mut content_length: Option<usize> = None;
    let mut chunked = false;
    for h in parsed.headers.iter() {
        let value = String::from_utf8_lossy(h.value).to_string();
        if h.name.eq_ignore_ascii_case("Content-Length") {
            content_length = value.trim().parse().ok();
        }
        if h.name.eq_ignore_ascii_case("Transfer-Encoding")
            && value.to_lowercase().contains("chunked")
        {
            chunked = true;
        }
        headers.push((h.name.to_string(), value));
    }
    if chunked {
        return ReadOutcome::Malformed("Chunked transfer encoding not supported".to_string());
    }

    let mut body = buf.split_off(header_end);
    let body = if !wants_body(&method) {
        Vec::new()
    } else {
        match content_length {
            None => {
                return ReadOutcome::Malformed(format!("{method} requires Content-Length"));
            }
            Some(len) if len > MAX_BODY_BYTES => {
                return ReadOutcome::Malformed("Request body too large".to_string());
            }
            Some(len) => {
                if body.len() < len {
                    let missing = (len - body.len()) as u64;
                    if stream.take(missing).read_to_end(&mut body).is_err() {
                        return ReadOutcome::Malformed("Connection closed mid-body".to_string());
                    }
                }
                if body.len() < len {
                    return ReadOutcome::Malformed("Connection closed mid-body".to_string());
                }
                body.truncate(len);
                body
            }
        }
    };

    ReadOutcome::Request(Request {
        method,
        path,
        headers,
        body,
    })
}

/// Write a response. Errors are ignored; the client may already be gone.
pub fn write_response(stream: &mut impl Write, response: &Response) {
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    head.push_str("Connection: close\r\n");
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    if !response.body.is_empty() {
        let _ = stream.write_all(&response.body);
    }
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn must_read(raw: impl Into<Vec<u8>>) -> Request {
        match read_request(&mut Cursor::new(raw.into())) {
            ReadOutcome::Request(req) => req,
            ReadOutcome::Malformed(msg) => panic!("malformed: {msg}"),
            ReadOutcome::Closed => panic!("closed"),
        }
    }

    fn must_fail(raw: impl Into<Vec<u8>>) -> String {
        match read_request(&mut Cursor::new(raw.into())) {
            ReadOutcome::Malformed(msg) => msg,
            _ => panic!("expected malformed"),
        }
    }

    #[test]
    fn test_parse_get_health_request() {
        let req = must_read(&b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/health");
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_parse_post_carves_body_from_buffer() {
        let body = r#"{"question":"how many students?"}"#;
        let raw = format!(
            "POST /api/ask HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let req = must_read(raw.into_bytes());
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/ask");
        assert_eq!(String::from_utf8_lossy(&req.body), body);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = must_read(&b"GET / HTTP/1.1\r\nAuthorization: Bearer abc\r\n\r\n"[..]);
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer abc"));
        assert_eq!(req.header("X-Missing"), None);
    }

    #[test]
    fn test_post_without_content_length_is_rejected() {
        let msg = must_fail(&b"POST /api/sql HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
        assert!(msg.contains("Content-Length"));
    }

    #[test]
    fn test_chunked_transfer_is_rejected() {
        let msg = must_fail(&b"POST /api/sql HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n"[..]);
        assert!(msg.contains("Chunked"));
    }

    #[test]
    fn test_reject_oversized_body() {
        let raw = format!(
            "POST /api/sql HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_BYTES + 1
        );
        let msg = must_fail(raw.into_bytes());
        assert!(msg.contains("too large"));
    }

    #[test]
    fn test_reject_truncated_body() {
        let msg = must_fail(&b"POST /api/sql HTTP/1.1\r\nContent-Length: 50\r\n\r\n{\"sql\""[..]);
        assert!(msg.contains("mid-body"));
    }

    #[test]
    fn test_reject_oversized_headers() {
        let raw = format!(
            "GET /health HTTP/1.1\r\nX-Padding: {}\r\n\r\n",
            "A".repeat(MAX_HEADER_BYTES)
        );
        let msg = must_fail(raw.into_bytes());
        assert!(msg.contains("too large"));
    }

    #[test]
    fn test_empty_stream_is_clean_close() {
        assert!(matches!(
            read_request(&mut Cursor::new(Vec::<u8>::new())),
            ReadOutcome::Closed
        ));
    }

    #[test]
    fn test_write_response_shape() {
        let response = Response::json(200, &serde_json::json!({"status": "ok"}));
        let mut out = Vec::new();
        write_response(&mut out, &response);
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.ends_with(r#"{"status":"ok"}"#));
    }
}
