//! Tunnel framing for the TCP and WebSocket bindings
//!
//! Every tunneled message is a 4-byte header `{cmd:u8, report_id:u8, length:u16 LE}`
//! followed by `length` payload bytes. The payload never repeats the report ID.
//!
//! Requests:
//! - `REPORT_SEND` carries the report payload; acknowledged by `REPORT_SEND_ACK`
//!   with an empty payload.
//! - `REPORT_GET` / `DATA_READ` carry no payload; acknowledged by the matching
//!   `_ACK` carrying the report payload.
//!
//! A rejected request is answered with `CMD_FAILED` whose 1-byte payload is a
//! [`FailureReason`].

use thiserror::Error;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::TransportError;
use crate::protocol::{report_id, MAX_REPORT_SIZE};
use crate::types::ReportRequest;

/// Tunnel command bytes
pub mod cmd {
    pub const CMD_FAILED: u8 = 0x00;
    pub const REPORT_SEND: u8 = 0x01;
    pub const REPORT_GET: u8 = 0x02;
    pub const DATA_READ: u8 = 0x03;
    pub const REPORT_SEND_ACK: u8 = 0x04;
    pub const REPORT_GET_ACK: u8 = 0x05;
    pub const DATA_READ_ACK: u8 = 0x06;

    /// Offset between a request command and its acknowledgement
    pub const ACK_OFFSET: u8 = 0x03;

    /// ACK command for a request command (`None` for non-requests)
    pub fn ack_for(request: u8) -> Option<u8> {
        match request {
            REPORT_SEND | REPORT_GET | DATA_READ => Some(request + ACK_OFFSET),
            _ => None,
        }
    }

    pub fn is_request(cmd: u8) -> bool {
        ack_for(cmd).is_some()
    }

    /// Get human-readable name for a tunnel command
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            CMD_FAILED => "CMD_FAILED",
            REPORT_SEND => "REPORT_SEND",
            REPORT_GET => "REPORT_GET",
            DATA_READ => "DATA_READ",
            REPORT_SEND_ACK => "REPORT_SEND_ACK",
            REPORT_GET_ACK => "REPORT_GET_ACK",
            DATA_READ_ACK => "DATA_READ_ACK",
            _ => "UNKNOWN",
        }
    }
}

/// Size of the tunnel header
pub const HEADER_SIZE: usize = 4;

/// Largest payload a frame may declare
pub const MAX_PAYLOAD_SIZE: usize = MAX_REPORT_SIZE;

/// Wire header
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Header {
    pub cmd: u8,
    pub report_id: u8,
    pub length: U16,
}

impl Header {
    pub fn new(cmd: u8, report_id: u8, length: u16) -> Self {
        Self {
            cmd,
            report_id,
            length: U16::new(length),
        }
    }

    /// Decode a header, validating the declared length
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (header, _) = Header::read_from_prefix(bytes).map_err(|_| FrameError::TooShort {
            expected: HEADER_SIZE,
            got: bytes.len(),
        })?;
        let length = usize::from(header.length.get());
        if length > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(length));
        }
        Ok(header)
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.length.get())
    }
}

/// Why a relay rejected a request (payload byte of `CMD_FAILED`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailureReason {
    /// Command byte is not a request
    UnknownCommand = 1,
    /// Text message on a binary-only WebSocket
    NotBinary = 2,
    /// Frame could not be decoded
    Malformed = 3,
    /// Device rejected or failed the report
    DeviceError = 4,
    /// Report ID has no handler for this direction
    UnsupportedReport = 5,
}

impl FailureReason {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::UnknownCommand),
            2 => Some(Self::NotBinary),
            3 => Some(Self::Malformed),
            4 => Some(Self::DeviceError),
            5 => Some(Self::UnsupportedReport),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnknownCommand => "unknown command",
            Self::NotBinary => "non-binary message",
            Self::Malformed => "malformed frame",
            Self::DeviceError => "device error",
            Self::UnsupportedReport => "unsupported report",
        };
        f.write_str(s)
    }
}

/// Frame decode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: expected {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },

    #[error("Frame length mismatch: header declares {declared} bytes, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Frame payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

/// One decoded tunnel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub cmd: u8,
    pub report_id: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(cmd: u8, report_id: u8, payload: Vec<u8>) -> Self {
        Self {
            cmd,
            report_id,
            payload,
        }
    }

    /// Request without payload (`REPORT_GET`, `DATA_READ`)
    pub fn request(cmd: u8, report_id: u8) -> Self {
        Self::new(cmd, report_id, Vec::new())
    }

    /// `CMD_FAILED` answer for `report_id`
    pub fn failed(report_id: u8, reason: FailureReason) -> Self {
        Self::new(cmd::CMD_FAILED, report_id, vec![reason as u8])
    }

    /// Failure reason carried by a `CMD_FAILED` frame
    pub fn failure_reason(&self) -> Option<FailureReason> {
        if self.cmd != cmd::CMD_FAILED {
            return None;
        }
        self.payload.first().copied().and_then(FailureReason::from_byte)
    }

    pub fn header(&self) -> Header {
        Header::new(self.cmd, self.report_id, self.payload.len() as u16)
    }

    /// Encode header + payload
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(self.payload.len()));
        }
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(self.header().as_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode a complete message; the declared length must match exactly
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let header = Header::decode(bytes)?;
        let declared = header.payload_len();
        let actual = bytes.len() - HEADER_SIZE;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }
        Ok(Self::from_parts(header, bytes[HEADER_SIZE..].to_vec()))
    }

    pub fn from_parts(header: Header, payload: Vec<u8>) -> Self {
        Self::new(header.cmd, header.report_id, payload)
    }

    /// Check whether this frame answers a request `(cmd, report_id)`
    pub fn answers(&self, request_cmd: u8, report_id: u8) -> bool {
        cmd::ack_for(request_cmd) == Some(self.cmd) && self.report_id == report_id
    }
}

// =============================================================================
// Request/response mapping
// =============================================================================

/// Tunnel frame carrying `request`
pub fn request_frame(request: &ReportRequest) -> Frame {
    match request {
        ReportRequest::SendFeature(data) | ReportRequest::Write(data) => Frame::new(
            cmd::REPORT_SEND,
            request.report_id(),
            data.get(1..).unwrap_or_default().to_vec(),
        ),
        ReportRequest::GetFeature { report_id } => Frame::request(cmd::REPORT_GET, *report_id),
        ReportRequest::Read { report_id } => Frame::request(cmd::DATA_READ, *report_id),
    }
}

/// Request carried by an incoming tunnel frame
///
/// `REPORT_SEND` is always delivered as a feature write, matching what a
/// relay does with a locally attached pad.
pub fn request_from_frame(frame: &Frame) -> Result<ReportRequest, FailureReason> {
    match frame.cmd {
        cmd::REPORT_SEND => {
            let mut data = Vec::with_capacity(1 + frame.payload.len());
            data.push(frame.report_id);
            data.extend_from_slice(&frame.payload);
            Ok(ReportRequest::SendFeature(data))
        }
        cmd::REPORT_GET => Ok(ReportRequest::GetFeature {
            report_id: frame.report_id,
        }),
        cmd::DATA_READ => Ok(ReportRequest::Read {
            report_id: frame.report_id,
        }),
        _ => Err(FailureReason::UnknownCommand),
    }
}

/// ACK frame answering `request` with the device's `response` report
pub fn ack_frame(request: &ReportRequest, response: &[u8]) -> Frame {
    let cmd = cmd::ack_for(request.tunnel_cmd()).unwrap_or(cmd::CMD_FAILED);
    let payload = if request.expects_data() {
        response.get(1..).unwrap_or_default().to_vec()
    } else {
        Vec::new()
    };
    Frame::new(cmd, request.report_id(), payload)
}

/// Interpret the peer's answer to `request`
///
/// Returns the full report (ID + payload) for reads; an ACK with an empty
/// payload yields an empty vector ("no data").
pub fn response_from_frame(
    request: &ReportRequest,
    frame: Frame,
) -> Result<Vec<u8>, TransportError> {
    let report_id = request.report_id();
    let request_cmd = request.tunnel_cmd();

    if frame.cmd == cmd::CMD_FAILED && frame.report_id == report_id {
        let reason = frame.failure_reason().unwrap_or(FailureReason::DeviceError);
        return Err(TransportError::Rejected(reason));
    }

    if !frame.answers(request_cmd, report_id) {
        return Err(TransportError::UnmatchedResponse {
            expected_cmd: cmd::ack_for(request_cmd).unwrap_or(cmd::CMD_FAILED),
            expected_report: report_id,
            actual_cmd: frame.cmd,
            actual_report: frame.report_id,
        });
    }

    if !request.expects_data() || frame.payload.is_empty() {
        return Ok(Vec::new());
    }

    // ID 0 reads Input; report it the way a local read does
    let mut report = Vec::with_capacity(1 + frame.payload.len());
    report.push(report_id::resolve_read(frame.report_id));
    report.extend_from_slice(&frame.payload);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_mapping() {
        assert_eq!(cmd::ack_for(cmd::REPORT_SEND), Some(cmd::REPORT_SEND_ACK));
        assert_eq!(cmd::ack_for(cmd::REPORT_GET), Some(cmd::REPORT_GET_ACK));
        assert_eq!(cmd::ack_for(cmd::DATA_READ), Some(cmd::DATA_READ_ACK));
        assert_eq!(cmd::ack_for(cmd::CMD_FAILED), None);
        assert_eq!(cmd::ack_for(cmd::REPORT_GET_ACK), None);
    }

    #[test]
    fn test_round_trip_boundary_lengths() {
        for len in [0usize, 1, MAX_PAYLOAD_SIZE] {
            let frame = Frame::new(cmd::REPORT_SEND, 0x0C, vec![0xA5; len]);
            let bytes = frame.encode().unwrap();
            assert_eq!(bytes.len(), HEADER_SIZE + len);
            assert_eq!(Frame::decode(&bytes).unwrap(), frame);
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = Frame::new(cmd::REPORT_GET_ACK, 0x09, vec![0; 0x0102])
            .encode()
            .unwrap();
        assert_eq!(&bytes[..4], &[0x05, 0x09, 0x02, 0x01]);
    }

    #[test]
    fn test_decode_rejects_bad_lengths() {
        assert_eq!(
            Frame::decode(&[1, 2, 3]),
            Err(FrameError::TooShort {
                expected: 4,
                got: 3
            })
        );
        assert_eq!(
            Frame::decode(&[1, 2, 2, 0, 9]),
            Err(FrameError::LengthMismatch {
                declared: 2,
                actual: 1
            })
        );
        assert_eq!(
            Frame::decode(&[1, 2, 0xE9, 0x03]),
            Err(FrameError::PayloadTooLarge(1001))
        );
        assert!(Frame::new(cmd::REPORT_SEND, 1, vec![0; MAX_PAYLOAD_SIZE + 1])
            .encode()
            .is_err());
    }

    #[test]
    fn test_failed_frame() {
        let frame = Frame::failed(0x0C, FailureReason::UnsupportedReport);
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(
            decoded.failure_reason(),
            Some(FailureReason::UnsupportedReport)
        );
        assert!(!decoded.answers(cmd::REPORT_GET, 0x0C));
    }

    #[test]
    fn test_request_mapping() {
        let send = ReportRequest::SendFeature(vec![0x05, 3, b'p', b'a', b'd']);
        let frame = request_frame(&send);
        assert_eq!(
            frame,
            Frame::new(cmd::REPORT_SEND, 0x05, vec![3, b'p', b'a', b'd'])
        );
        assert_eq!(request_from_frame(&frame), Ok(send.clone()));

        let ack = ack_frame(&send, &[]);
        assert_eq!(ack, Frame::new(cmd::REPORT_SEND_ACK, 0x05, vec![]));
        assert_eq!(response_from_frame(&send, ack).unwrap(), Vec::<u8>::new());

        let get = ReportRequest::GetFeature { report_id: 0x0C };
        let ack = ack_frame(&get, &[0x0C, 1, 2, 3]);
        assert_eq!(ack.payload, vec![1, 2, 3]);
        assert_eq!(response_from_frame(&get, ack).unwrap(), vec![0x0C, 1, 2, 3]);

        assert_eq!(
            request_from_frame(&Frame::request(cmd::REPORT_GET_ACK, 1)),
            Err(FailureReason::UnknownCommand)
        );
    }

    #[test]
    fn test_response_rejections() {
        let get = ReportRequest::GetFeature { report_id: 0x0C };
        let wrong_id = Frame::new(cmd::REPORT_GET_ACK, 0x0B, vec![1]);
        assert!(matches!(
            response_from_frame(&get, wrong_id),
            Err(TransportError::UnmatchedResponse {
                expected_cmd: cmd::REPORT_GET_ACK,
                expected_report: 0x0C,
                actual_cmd: cmd::REPORT_GET_ACK,
                actual_report: 0x0B,
            })
        ));
        let failed = Frame::failed(0x0C, FailureReason::DeviceError);
        assert!(matches!(
            response_from_frame(&get, failed),
            Err(TransportError::Rejected(FailureReason::DeviceError))
        ));
        let empty = Frame::new(cmd::REPORT_GET_ACK, 0x0C, vec![]);
        assert!(response_from_frame(&get, empty).unwrap().is_empty());
    }

    #[test]
    fn test_read_of_id_zero_reports_input() {
        let read = ReportRequest::Read { report_id: 0 };
        let ack = Frame::new(cmd::DATA_READ_ACK, 0, vec![0x05, 0x00]);
        assert_eq!(
            response_from_frame(&read, ack).unwrap(),
            vec![report_id::INPUT, 0x05, 0x00]
        );
    }

    #[test]
    fn test_answers_checks_report_id() {
        let ack = Frame::new(cmd::REPORT_GET_ACK, 0x09, vec![]);
        assert!(ack.answers(cmd::REPORT_GET, 0x09));
        assert!(!ack.answers(cmd::REPORT_GET, 0x0E));
        assert!(!ack.answers(cmd::DATA_READ, 0x09));
    }
}
