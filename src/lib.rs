//! minihttp - HTTP/1.1 on raw byte streams
//!
//! Request framing, keep-alive connections, prefix routing and a small
//! picture catalog built on top of it.

pub mod catalog;
pub mod config;
pub mod handlers;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
