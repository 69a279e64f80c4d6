//! Command handlers.
//!
//! Each handler is a thin wrapper: turn arguments into a request, drive a
//! download session and format the result for the terminal.

pub mod check_deps;
pub mod download;
