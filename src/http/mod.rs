//! HTTP protocol implementation.
//!
//! A minimal HTTP/1.1 server working directly on byte streams, with
//! content-length framing and keep-alive connections.
//!
//! # Architecture
//!
//! - **`connection`**: The per-socket request/response state machine
//! - **`framer`**: Splits the byte stream into header blocks and bodies
//! - **`headers`**: Ordered, case-sensitive header map
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`json`**: JSON body encoding
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │  AwaitingHeader  │ ← Read until \r\n\r\n
//!        └──────┬───────────┘
//!               │ Header block parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   AwaitingBody   │ ← Read Content-Length bytes
//!        └──────┬───────────┘
//!               │ Request complete
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Router picks a handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │     Writing      │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → AwaitingHeader (same connection)
//!               └─ Close → Closed
//! ```
//!
//! Idle timeouts, a peer closing between requests, protocol errors and
//! write failures all lead to `Closed`.

pub mod connection;
pub mod framer;
pub mod headers;
pub mod json;
pub mod mime;
pub mod request;
pub mod response;
pub mod writer;
