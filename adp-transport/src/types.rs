//! Common types for transport layer

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Direct HID access to an attached pad
    LocalHid,
    /// Framed tunnel over TCP
    Tcp,
    /// Framed tunnel over WebSocket binary messages
    WebSocket,
    /// In-process device model
    Emulated,
}

impl TransportType {
    /// Check if this transport goes through a tunnel relay
    pub fn is_tunnel(&self) -> bool {
        matches!(self, Self::Tcp | Self::WebSocket)
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LocalHid => "hid",
            Self::Tcp => "tcp",
            Self::WebSocket => "websocket",
            Self::Emulated => "emulated",
        };
        f.write_str(s)
    }
}

/// Device identification information
#[derive(Debug, Clone)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID (0 when unknown, e.g. behind a tunnel)
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    pub transport_type: TransportType,
    /// Device path, socket address or URL
    pub device_path: String,
    /// Product name if available
    pub product_name: Option<String>,
}

impl TransportDeviceInfo {
    /// Info for a tunnel endpoint with no USB identity
    pub fn remote(transport_type: TransportType, address: impl Into<String>) -> Self {
        Self {
            vid: 0,
            pid: 0,
            transport_type,
            device_path: address.into(),
            product_name: None,
        }
    }
}

/// One request issued through a [`Transport`](crate::Transport)
///
/// Outgoing reports are complete (report ID at byte 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRequest {
    /// Write a feature report
    SendFeature(Vec<u8>),
    /// Read a feature report
    GetFeature { report_id: u8 },
    /// Read an input report
    Read { report_id: u8 },
    /// Write an output report (tunneled as `REPORT_SEND`)
    Write(Vec<u8>),
}

impl ReportRequest {
    pub fn report_id(&self) -> u8 {
        match self {
            Self::SendFeature(data) | Self::Write(data) => data.first().copied().unwrap_or(0),
            Self::GetFeature { report_id } | Self::Read { report_id } => *report_id,
        }
    }

    /// Tunnel command carrying this request
    pub fn tunnel_cmd(&self) -> u8 {
        use crate::frame::cmd;
        match self {
            Self::SendFeature(_) | Self::Write(_) => cmd::REPORT_SEND,
            Self::GetFeature { .. } => cmd::REPORT_GET,
            Self::Read { .. } => cmd::DATA_READ,
        }
    }

    /// Get human-readable name for the request kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendFeature(_) => "SEND_FEATURE",
            Self::GetFeature { .. } => "GET_FEATURE",
            Self::Read { .. } => "READ",
            Self::Write(_) => "WRITE",
        }
    }

    /// True for requests whose response is a report
    pub fn expects_data(&self) -> bool {
        matches!(self, Self::GetFeature { .. } | Self::Read { .. })
    }
}
