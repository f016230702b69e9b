//! Transport abstraction layer for analog dance pad communication
//!
//! This crate provides the shared report vocabulary and a unified request
//! interface for talking to a pad across different bindings:
//!
//! - Local HID (pad attached to this machine)
//! - TCP tunnel (framed reports through a relay)
//! - WebSocket tunnel (framed reports as binary messages)
//!
//! Every binding implements [`Transport`]; [`TransportExt`] layers typed
//! report reads and writes on top.

pub mod descriptor;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod relay;
pub mod report;
pub mod types;

mod hid_local;
mod tcp;
mod websocket;

pub use descriptor::{parse_descriptor, DescriptorEntry, DescriptorWriter, ReportKind};
pub use error::TransportError;
pub use frame::{FailureReason, Frame, FrameError};
pub use hid_local::{HidBackend, LocalTransport};
pub use relay::{serve_tcp, serve_ws, RelayHandle};
pub use report::{
    DebugReport, FactoryResetReport, IdentificationReport, IdentificationV2Report, InputReport,
    LedMapping, LedMappingReport, LightRule, LightRuleReport, LightsReport, NameReport,
    PadConfigurationReport, ParseError, Report, ResetReport, Rgb, SaveConfigurationReport,
    SensorConfig, SensorReport, SetPropertyReport,
};
pub use tcp::TcpTransport;
pub use types::{ReportRequest, TransportDeviceInfo, TransportType};
pub use websocket::WebSocketTransport;

#[cfg(feature = "hid")]
pub use hid_local::{list_devices, open_hid, HidApiBackend};

use async_trait::async_trait;
use std::sync::Arc;

/// The core transport trait - all bindings implement this
///
/// Each binding carries at most one outstanding request per connection;
/// concurrent callers are serialized inside the binding.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and wait for its matched response
    ///
    /// # Returns
    /// The full response report (report ID at byte 0) for reads, an empty
    /// vector for writes. An empty vector from a read means "no data".
    async fn request(&self, request: ReportRequest) -> Result<Vec<u8>, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Check if transport is still connected
    async fn is_connected(&self) -> bool;

    /// Close the transport gracefully
    async fn close(&self) -> Result<(), TransportError>;
}

/// Type alias for a shared transport
pub type BoxedTransport = Arc<dyn Transport>;

/// Raw and typed report helpers for any [`Transport`]
#[async_trait]
pub trait TransportExt: Transport {
    /// Read a feature report (full report with ID)
    async fn get_feature_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        self.request(ReportRequest::GetFeature { report_id }).await
    }

    /// Write a feature report (report ID at byte 0)
    async fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
        self.request(ReportRequest::SendFeature(data.to_vec()))
            .await
            .map(|_| ())
    }

    /// Read an input report (full report with ID)
    async fn read_input(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        self.request(ReportRequest::Read { report_id }).await
    }

    /// Write an output report (report ID at byte 0)
    async fn write_output(&self, data: &[u8]) -> Result<(), TransportError> {
        self.request(ReportRequest::Write(data.to_vec()))
            .await
            .map(|_| ())
    }

    /// Read and parse a typed feature report
    async fn get_report<R: Report + Send>(&self) -> Result<R, TransportError> {
        let data = self.get_feature_report(R::ID).await?;
        Ok(R::parse(&data)?)
    }

    /// Serialize and write a typed feature report
    async fn send_report<R: Report + Sync>(&self, report: &R) -> Result<(), TransportError> {
        self.send_feature_report(&report.to_bytes()).await
    }

    /// Read and parse a typed input report
    async fn read_report<R: Report + Send>(&self) -> Result<R, TransportError> {
        let data = self.read_input(R::ID).await?;
        Ok(R::parse(&data)?)
    }

    /// Serialize and write a typed output report
    async fn write_report<R: Report + Sync>(&self, report: &R) -> Result<(), TransportError> {
        self.write_output(&report.to_bytes()).await
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}
