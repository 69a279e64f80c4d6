//! Command-line interface for fdl.
//!
//! The binary in `main.rs` is the composition root: it loads `.env`, installs
//! the tracing subscriber, parses arguments and maps errors to exit codes.
//! Everything else lives here so it can be tested.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only.
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod utils;

pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
