//! In-memory response buffer (component G): captures a sub-request's
//! response without touching the network, so the discovery merger can invoke
//! the native discovery handler in-process and inspect what it wrote.

use http::{HeaderMap, HeaderValue};

/// A response writer that records status code, headers, and body bytes.
///
/// Defaults to status 200 if the first write happens without an explicit
/// [`ResponseBuffer::write_header`] call, matching a standard library
/// `http.ResponseWriter`'s behavior. Request-scoped: construct one per
/// sub-invocation and discard it when the request returns.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<u16>,
    headers: HeaderMap<HeaderValue>,
    body: Vec<u8>,
}

impl ResponseBuffer {
    /// An empty buffer, ready to receive a captured response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly set the status code. Must be called before any write to
    /// take effect; a write before this defaults the status to 200.
    pub fn write_header(&mut self, status: u16) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Insert a response header.
    pub fn set_header(&mut self, name: http::HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append body bytes, defaulting the status to 200 if unset.
    pub fn write(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(200);
        self.body.extend_from_slice(chunk);
    }

    /// The captured status code, defaulting to 200 if nothing was ever written.
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    /// The captured headers.
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.headers
    }

    /// The captured body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the captured status is a successful (2xx) response.
    pub fn is_success(&self) -> bool {
        self.status() == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_200_on_bare_write() {
        let mut buf = ResponseBuffer::new();
        buf.write(b"hello");
        assert_eq!(buf.status(), 200);
        assert_eq!(buf.body(), b"hello");
    }

    #[test]
    fn explicit_header_wins_over_default() {
        let mut buf = ResponseBuffer::new();
        buf.write_header(503);
        buf.write(b"unavailable");
        assert_eq!(buf.status(), 503);
        assert!(!buf.is_success());
    }

    #[test]
    fn first_write_header_call_sticks() {
        let mut buf = ResponseBuffer::new();
        buf.write_header(201);
        buf.write_header(404);
        assert_eq!(buf.status(), 201);
    }
}
