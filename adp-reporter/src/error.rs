//! Reporter error types

use adp_transport::TransportError;
use thiserror::Error;

/// Errors from reporter operations
///
/// A device that answers with nothing usable is not an error; those calls
/// return `None` or `false`. This type is reserved for a binding that can no
/// longer be used and for invalid arguments.
#[derive(Error, Debug)]
pub enum ReporterError {
    /// Transport layer failure, typically a disconnect
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ReporterError {
    /// True when the pad must be reopened before further use
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_disconnect())
    }
}
