//! Ready-made handlers: JSON transforms and static files.

pub mod json;
pub mod static_files;

pub use json::json_handler;
pub use static_files::{static_files, static_route};
