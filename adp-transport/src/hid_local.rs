//! Local HID binding for a pad attached to this machine
//!
//! Reports go straight to the platform's feature/input/output primitives,
//! addressed by the report ID in byte 0; no tunnel framing is involved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{report_id, timing, MAX_REPORT_SIZE};
use crate::types::{ReportRequest, TransportDeviceInfo};
use crate::Transport;

/// Raw HID device operations
///
/// Buffers follow hidapi conventions: byte 0 is the report ID, return values
/// count it.
pub trait HidBackend: Send {
    /// Read a feature report; `buf[0]` holds the requested ID on entry
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Read the next input report, 0 when none arrived within `timeout_ms`
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError>;

    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;
}

/// HID transport for a directly attached pad
///
/// Requests are serialized by the device mutex. A local request cannot be
/// cancelled once issued.
pub struct LocalTransport<B: HidBackend> {
    device: Mutex<B>,
    info: TransportDeviceInfo,
    connected: AtomicBool,
}

impl<B: HidBackend> LocalTransport<B> {
    pub fn new(backend: B, info: TransportDeviceInfo) -> Self {
        Self {
            device: Mutex::new(backend),
            info,
            connected: AtomicBool::new(true),
        }
    }

    fn execute(&self, request: &ReportRequest) -> Result<Vec<u8>, TransportError> {
        let device = self.device.lock();
        match request {
            ReportRequest::SendFeature(data) => {
                device.send_feature_report(data)?;
                Ok(Vec::new())
            }
            ReportRequest::GetFeature { report_id } => {
                let mut buf = vec![0u8; MAX_REPORT_SIZE];
                buf[0] = *report_id;
                let n = device.get_feature_report(&mut buf)?;
                buf.truncate(n);
                Ok(buf)
            }
            ReportRequest::Read { report_id } => {
                let mut buf = vec![0u8; MAX_REPORT_SIZE];
                buf[0] = *report_id;
                let n = device.read_timeout(&mut buf, timing::INPUT_READ_TIMEOUT_MS)?;
                buf.truncate(n);
                Ok(buf)
            }
            ReportRequest::Write(data) => {
                device.write(data)?;
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl<B: HidBackend + 'static> Transport for LocalTransport<B> {
    async fn request(&self, request: ReportRequest) -> Result<Vec<u8>, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        if matches!(request, ReportRequest::SendFeature(_)) {
            // Give the controller time to get into a ready state
            tokio::time::sleep(Duration::from_millis(timing::FEATURE_WRITE_DELAY_MS)).await;
        }

        let id = request.report_id();
        let result = self.execute(&request);
        match &result {
            Ok(data) => debug!(
                "Local {} 0x{:02X} ({}): {} bytes",
                request.name(),
                id,
                report_id::name(id),
                data.len()
            ),
            Err(TransportError::Disconnected) => {
                self.connected.store(false, Ordering::SeqCst);
            }
            Err(e) => debug!("Local request 0x{:02X} failed: {}", id, e),
        }
        result
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// hidapi backend
// =============================================================================

#[cfg(feature = "hid")]
mod hidapi_backend {
    use hidapi::{HidApi, HidDevice};
    use tracing::info;

    use super::*;
    use crate::protocol::usb;
    use crate::types::TransportType;

    /// hidapi device handle
    pub struct HidApiBackend(HidDevice);

    impl HidBackend for HidApiBackend {
        fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
            Ok(self.0.get_feature_report(buf)?)
        }

        fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
            Ok(self.0.send_feature_report(data)?)
        }

        fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
            Ok(self.0.read_timeout(buf, timeout_ms)?)
        }

        fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
            Ok(self.0.write(data)?)
        }
    }

    /// List attached pads with a supported vendor/product ID
    pub fn list_devices() -> Result<Vec<TransportDeviceInfo>, TransportError> {
        let api = HidApi::new()?;
        Ok(api
            .device_list()
            .filter(|d| usb::is_supported(d.vendor_id(), d.product_id()))
            .map(|d| TransportDeviceInfo {
                vid: d.vendor_id(),
                pid: d.product_id(),
                transport_type: TransportType::LocalHid,
                device_path: d.path().to_string_lossy().into_owned(),
                product_name: d.product_string().map(str::to_owned),
            })
            .collect())
    }

    /// Open the first pad matching `ids`, or any supported pad when `None`
    pub fn open_hid(
        ids: Option<(u16, u16)>,
    ) -> Result<LocalTransport<HidApiBackend>, TransportError> {
        let api = HidApi::new()?;
        let found = api.device_list().find(|d| match ids {
            Some((vid, pid)) => d.vendor_id() == vid && d.product_id() == pid,
            None => usb::is_supported(d.vendor_id(), d.product_id()),
        });
        let Some(dev) = found else {
            return Err(TransportError::DeviceNotFound(match ids {
                Some((vid, pid)) => format!("{vid:04x}:{pid:04x}"),
                None => "no supported pad attached".into(),
            }));
        };

        let info = TransportDeviceInfo {
            vid: dev.vendor_id(),
            pid: dev.product_id(),
            transport_type: TransportType::LocalHid,
            device_path: dev.path().to_string_lossy().into_owned(),
            product_name: dev.product_string().map(str::to_owned),
        };
        let device = dev.open_device(&api)?;
        info!(
            "Opened pad {:04x}:{:04x} at {}",
            info.vid, info.pid, info.device_path
        );
        Ok(LocalTransport::new(HidApiBackend(device), info))
    }
}

#[cfg(feature = "hid")]
pub use hidapi_backend::{list_devices, open_hid, HidApiBackend};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransportType;
    use crate::TransportExt;

    /// Backend that echoes feature writes back on reads
    #[derive(Default)]
    struct LoopbackBackend {
        last_feature: Mutex<Vec<u8>>,
        fail_disconnected: bool,
    }

    impl HidBackend for LoopbackBackend {
        fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
            if self.fail_disconnected {
                return Err(TransportError::Disconnected);
            }
            let last = self.last_feature.lock();
            if last.first() != Some(&buf[0]) {
                return Ok(0);
            }
            buf[..last.len()].copy_from_slice(&last);
            Ok(last.len())
        }

        fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
            *self.last_feature.lock() = data.to_vec();
            Ok(())
        }

        fn read_timeout(&self, _buf: &mut [u8], _timeout_ms: i32) -> Result<usize, TransportError> {
            Ok(0)
        }

        fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
            Ok(data.len())
        }
    }

    fn info() -> TransportDeviceInfo {
        TransportDeviceInfo::remote(TransportType::LocalHid, "loopback")
    }

    #[tokio::test]
    async fn test_feature_round_trip() {
        let transport = LocalTransport::new(LoopbackBackend::default(), info());
        transport
            .send_feature_report(&[0x05, 3, b'a', b'b', b'c'])
            .await
            .unwrap();
        let data = transport.get_feature_report(0x05).await.unwrap();
        assert_eq!(data, vec![0x05, 3, b'a', b'b', b'c']);
        // a report never written reads as "no data"
        assert!(transport.get_feature_report(0x09).await.unwrap().is_empty());
        assert!(transport.read_input(0x01).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_is_sticky() {
        let backend = LoopbackBackend {
            fail_disconnected: true,
            ..Default::default()
        };
        let transport = LocalTransport::new(backend, info());
        assert!(matches!(
            transport.get_feature_report(0x05).await,
            Err(TransportError::Disconnected)
        ));
        assert!(!transport.is_connected().await);
        assert!(matches!(
            transport.write_output(&[0x04]).await,
            Err(TransportError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects() {
        let transport = LocalTransport::new(LoopbackBackend::default(), info());
        transport.close().await.unwrap();
        assert!(matches!(
            transport.get_feature_report(0x05).await,
            Err(TransportError::Disconnected)
        ));
    }
}
