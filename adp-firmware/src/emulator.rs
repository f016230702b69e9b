//! In-process pad: a [`Device`] on simulated hardware behind a HID backend
//!
//! Lets the host stack and the relays run without hardware attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adp_transport::protocol::{report_id, usb};
use adp_transport::{
    BoxedTransport, HidBackend, LocalTransport, Rgb, TransportDeviceInfo, TransportError,
    TransportType,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::board::Board;
use crate::device::Device;
use crate::hal::SimHal;
use crate::registry::DispatchError;
use crate::store::StoreError;

/// Shared handle to an emulated pad
#[derive(Clone)]
pub struct EmulatedDevice {
    device: Arc<Mutex<Device<SimHal>>>,
    board: Board,
    connected: Arc<AtomicBool>,
}

impl EmulatedDevice {
    /// Boot a pad with blank storage
    pub fn new(board: Board) -> Self {
        Self::with_hal(board, SimHal::new(board.sensor_count(), board.led_count()))
    }

    pub fn with_hal(board: Board, hal: SimHal) -> Self {
        Self {
            device: Arc::new(Mutex::new(Device::new(board, hal))),
            board,
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn board(&self) -> Board {
        self.board
    }

    /// Run `f` with exclusive access to the device
    pub fn with_device<T>(&self, f: impl FnOnce(&mut Device<SimHal>) -> T) -> T {
        f(&mut self.device.lock())
    }

    pub fn set_sensor(&self, index: usize, value: u16) {
        self.device.lock().state_mut().hal_mut().set_sensor(index, value);
    }

    pub fn tick(&self) {
        self.device.lock().tick();
    }

    /// Tick the control loop every `period` until the handle is aborted
    pub fn spawn_control_loop(&self, period: Duration) -> JoinHandle<()> {
        let device = self.device.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                device.lock().tick();
            }
        })
    }

    /// Power-cycle the pad; storage survives
    pub fn reboot(&self) -> Result<(), StoreError> {
        self.device.lock().reboot()
    }

    /// LED strip as last committed to the hardware
    pub fn strip(&self) -> Vec<Rgb> {
        self.device.lock().state().hal().strip().to_vec()
    }

    pub fn descriptor(&self) -> Vec<u8> {
        self.device.lock().descriptor().to_vec()
    }

    /// Simulate unplugging: every further request fails with a disconnect
    pub fn unplug(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn check_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    /// Local binding to this pad
    pub fn transport(&self) -> BoxedTransport {
        let info = TransportDeviceInfo {
            vid: usb::VENDOR_ID,
            pid: usb::PRODUCT_ID,
            transport_type: TransportType::Emulated,
            device_path: format!("emu://{}", self.board),
            product_name: Some(self.board.default_name().to_string()),
        };
        Arc::new(LocalTransport::new(self.clone(), info))
    }
}

fn rejected(e: DispatchError) -> TransportError {
    TransportError::Rejected(e.failure_reason())
}

/// Copy `id` + `payload` into `buf`, returning the report length
fn fill(buf: &mut [u8], id: u8, payload: &[u8]) -> usize {
    let Some((first, rest)) = buf.split_first_mut() else {
        return 0;
    };
    *first = id;
    let n = payload.len().min(rest.len());
    rest[..n].copy_from_slice(&payload[..n]);
    1 + n
}

impl HidBackend for EmulatedDevice {
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.check_connected()?;
        let id = report_id::resolve_read(buf.first().copied().unwrap_or(0));
        let payload = self.device.lock().create_report(id).map_err(rejected)?;
        Ok(fill(buf, id, &payload))
    }

    fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
        self.check_connected()?;
        let (&id, payload) = data.split_first().ok_or(TransportError::Malformed(
            "empty feature report".to_string(),
        ))?;
        debug!("Emulated pad <- report 0x{:02X}, {} bytes", id, payload.len());
        self.device
            .lock()
            .process_report(id, payload)
            .map_err(rejected)
    }

    fn read_timeout(&self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize, TransportError> {
        self.get_feature_report(buf)
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        self.send_feature_report(data)?;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adp_transport::{FailureReason, InputReport, NameReport, TransportExt};

    #[tokio::test]
    async fn test_local_transport_round_trip() {
        let pad = EmulatedDevice::new(Board::FsrMiniPad);
        let transport = pad.transport();
        assert_eq!(transport.device_info().transport_type, TransportType::Emulated);

        transport.send_report(&NameReport::new("stage left")).await.unwrap();
        let name: NameReport = transport.get_report().await.unwrap();
        assert_eq!(name.name, "stage left");
    }

    #[tokio::test]
    async fn test_input_through_read() {
        let pad = EmulatedDevice::new(Board::FsrMiniPad);
        pad.set_sensor(1, 800);
        pad.tick();

        let input: InputReport = pad.transport().read_report().await.unwrap();
        assert!(input.is_pressed(1));
        assert_eq!(input.sensor_values[1], 800);

        // report 0 reads the Input report
        let raw = pad.transport().get_feature_report(0).await.unwrap();
        assert_eq!(raw[0], report_id::INPUT);
        assert_eq!(raw.len(), 1 + InputReport::payload_len(12));
    }

    #[tokio::test]
    async fn test_rejections_and_unplug() {
        let pad = EmulatedDevice::new(Board::Teensy2);
        let transport = pad.transport();
        let err = transport.get_feature_report(report_id::LIGHT_RULE).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Rejected(FailureReason::UnsupportedReport)
        ));

        pad.unplug();
        let err = transport.get_feature_report(report_id::NAME).await.unwrap_err();
        assert!(err.is_disconnect());
        assert!(!transport.is_connected().await);
    }

    #[tokio::test]
    async fn test_control_loop_lights_strip() {
        let pad = EmulatedDevice::new(Board::FsrIoV2);
        let handle = pad.spawn_control_loop(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();

        let rule = Board::FsrIoV2.default_config().light_rules[0];
        assert_eq!(pad.strip()[0], rule.off_color);
        assert_eq!(pad.strip()[8], Rgb::BLACK);
    }
}
