//! Staged HTTP response
//!
//! The context stages status, headers and body here while the handler chain
//! runs; the server driver translates the staged value onto the transport
//! once the chain finishes.

use smallvec::SmallVec;

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);

    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// Response under construction for one request.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code. Defaults to 200 when no handler writes one.
    pub status: StatusCode,
    /// Response headers (stack-allocated for small header counts)
    headers: SmallVec<[(String, String); 8]>,
    /// Response body
    pub body: bytes::Bytes,
    status_written: bool,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
            status_written: false,
        }
    }

    /// Write the status code. First write wins; later writes are ignored,
    /// matching the underlying transport's own header-write guarantee.
    pub fn write_status(&mut self, status: StatusCode) {
        if !self.status_written {
            self.status = status;
            self.status_written = true;
        }
    }

    pub fn status_written(&self) -> bool {
        self.status_written
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any previous value with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let name_lower = name.to_lowercase();
        self.headers.retain(|(k, _)| k.to_lowercase() != name_lower);
        self.headers.push((name, value.into()));
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_body(&mut self, body: impl Into<bytes::Bytes>) {
        self.body = body.into();
    }

    /// Reset to the pristine state for context reuse.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body = bytes::Bytes::new();
        self.status_written = false;
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_status_write_wins() {
        let mut res = Response::new();
        res.write_status(StatusCode::UNAUTHORIZED);
        res.write_status(StatusCode::OK);
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_default_status_is_ok() {
        let res = Response::new();
        assert_eq!(res.status, StatusCode::OK);
        assert!(!res.status_written());
    }

    #[test]
    fn test_set_header_replaces() {
        let mut res = Response::new();
        res.set_header("Content-Type", "text/plain");
        res.set_header("content-type", "application/json");
        assert_eq!(res.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(res.headers().count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut res = Response::new();
        res.write_status(StatusCode::NOT_FOUND);
        res.set_header("x-test", "1");
        res.set_body("body");
        res.reset();
        assert_eq!(res.status, StatusCode::OK);
        assert!(!res.status_written());
        assert_eq!(res.headers().count(), 0);
        assert!(res.body.is_empty());
    }
}
