//! Transport error types

use thiserror::Error;

use crate::frame::{FailureReason, FrameError};
use crate::report::ParseError;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Connection closed, before or while a request was outstanding
    #[error("Device disconnected")]
    Disconnected,

    #[error("Communication timeout")]
    Timeout,

    /// Response did not answer the outstanding request
    #[error(
        "Unmatched response: expected cmd 0x{expected_cmd:02X} report 0x{expected_report:02X}, \
         got cmd 0x{actual_cmd:02X} report 0x{actual_report:02X}"
    )]
    UnmatchedResponse {
        expected_cmd: u8,
        expected_report: u8,
        actual_cmd: u8,
        actual_report: u8,
    },

    /// Peer answered with `CMD_FAILED`
    #[error("Request rejected: {0}")]
    Rejected(FailureReason),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("HID error: {0}")]
    Hid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransportError {
    /// True when the binding can no longer be used and must be reopened
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl From<FrameError> for TransportError {
    fn from(e: FrameError) -> Self {
        TransportError::Malformed(e.to_string())
    }
}

impl From<ParseError> for TransportError {
    fn from(e: ParseError) -> Self {
        TransportError::Malformed(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Disconnected,
            WsError::Io(io) => TransportError::Io(io),
            other => TransportError::WebSocket(other.to_string()),
        }
    }
}

#[cfg(feature = "hid")]
impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        TransportError::Hid(e.to_string())
    }
}
