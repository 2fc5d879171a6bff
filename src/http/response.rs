use serde::Serialize;

use crate::http::headers::Headers;
use crate::http::json;

/// `Content-Type` value for JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP status codes supported by the server.
///
/// - `Ok` (200): Request successful
/// - `NotFound` (404): No route matched
/// - `InternalServerError` (500): A handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 404 NOT FOUND
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// ```
    /// # use minihttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the reason phrase written on the status line.
    ///
    /// 404 goes out upper-case (`NOT FOUND`); existing clients match on it.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "NOT FOUND",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// Header order is preserved and is the order written on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in insertion order
    pub headers: Headers,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header. A replaced header keeps its position.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Appends a Content-Length header computed from the body if none was set.
    pub fn build(mut self) -> Response {
        if !self.headers.contains("Content-Length") {
            self.headers
                .insert("Content-Length", self.body.len().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .body(body.into())
            .build()
    }

    /// Creates a JSON response with the given status.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> serde_json::Result<Self> {
        let body = json::to_body(value)?;
        Ok(ResponseBuilder::new(status)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(body)
            .build())
    }

    /// Creates a 200 OK JSON response.
    pub fn ok_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        Self::json(StatusCode::Ok, value)
    }

    /// Creates a 404 JSON response.
    pub fn not_found_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        Self::json(StatusCode::NotFound, value)
    }

    /// Creates a 500 response carrying `{"error": message}`.
    pub fn internal_error(message: &str) -> Self {
        let body = json::to_body(&serde_json::json!({ "error": message }))
            .unwrap_or_else(|_| b"{}".to_vec());

        ResponseBuilder::new(StatusCode::InternalServerError)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(body)
            .build()
    }

    /// Sets the `Connection` header to `keep-alive` or `close`.
    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        let value = if keep_alive { "keep-alive" } else { "close" };
        self.headers.insert("Connection", value);
    }

    /// True unless the `Connection` header asks for the socket to be closed.
    pub fn keeps_alive(&self) -> bool {
        !self
            .headers
            .get("Connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }
}
