//! Host tool library for analog dance pads
//!
//! Holds what the `adp` binary needs beyond the protocol crates: the tool
//! configuration file and opening a pad from a transport URL.

pub mod config;
pub mod connect;

pub use config::ToolConfig;
pub use connect::{Connection, TransportUrl, UrlError};
