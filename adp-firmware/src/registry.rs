//! Report registry: per-ID read and write handlers plus descriptor assembly
//!
//! Each module registers only the reports it owns. A report is readable when
//! it has a write slot (state serialized into a buffer) and writable when it
//! has a process slot (buffer applied to state). The HID descriptor is derived
//! from whatever is registered, so adding a report touches nothing else.

use std::sync::OnceLock;

use adp_transport::protocol::report_id::{self, TABLE_SIZE};
use adp_transport::{DescriptorWriter, FailureReason, ParseError, Report};
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::StoreError;

/// Why a report could not be created or applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown report 0x{0:02X}")]
    UnknownReport(u8),

    #[error("Report 0x{0:02X} cannot be read")]
    NoWriteHandler(u8),

    #[error("Report 0x{0:02X} cannot be written")]
    NoProcessHandler(u8),

    #[error("Report 0x{id:02X} size mismatch: expected {expected}, got {got}")]
    SizeMismatch { id: u8, expected: usize, got: usize },

    #[error("Invalid report: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    /// Reason carried back to the host in a failure answer
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            DispatchError::UnknownReport(_)
            | DispatchError::NoWriteHandler(_)
            | DispatchError::NoProcessHandler(_) => FailureReason::UnsupportedReport,
            DispatchError::SizeMismatch { .. } | DispatchError::Parse(_) => {
                FailureReason::Malformed
            }
            DispatchError::Store(_) => FailureReason::DeviceError,
        }
    }
}

type WriteFn<S> = Box<dyn Fn(&mut S) -> Vec<u8> + Send + Sync>;
type ProcessFn<S> = Box<dyn Fn(&mut S, &[u8]) -> Result<(), DispatchError> + Send + Sync>;

struct Slot<S> {
    /// Payload size; 0 accepts any length on process
    size: usize,
    write: Option<WriteFn<S>>,
    process: Option<ProcessFn<S>>,
}

impl<S> Default for Slot<S> {
    fn default() -> Self {
        Self {
            size: 0,
            write: None,
            process: None,
        }
    }
}

impl<S> Slot<S> {
    fn is_registered(&self) -> bool {
        self.write.is_some() || self.process.is_some()
    }
}

/// Dispatch table for report IDs `0..TABLE_SIZE` over device state `S`
pub struct Registry<S> {
    slots: Vec<Slot<S>>,
    suppressed: Vec<u8>,
    button_count: usize,
    sensor_count: usize,
    descriptor: OnceLock<Vec<u8>>,
}

impl<S> Registry<S> {
    /// Empty registry; the counts shape the Input block of the descriptor
    pub fn new(button_count: usize, sensor_count: usize) -> Self {
        Self {
            slots: (0..TABLE_SIZE).map(|_| Slot::default()).collect(),
            suppressed: Vec::new(),
            button_count,
            sensor_count,
            descriptor: OnceLock::new(),
        }
    }

    fn slot_mut(&mut self, id: u8) -> Option<&mut Slot<S>> {
        self.descriptor = OnceLock::new();
        let slot = self.slots.get_mut(usize::from(id));
        if slot.is_none() {
            warn!("Report 0x{:02X} outside the dispatch table, ignored", id);
        }
        slot
    }

    /// Make `R` readable; the payload size defaults to `R::MIN_LEN`
    pub fn on_write<R, F>(&mut self, write: F) -> &mut Self
    where
        R: Report + 'static,
        F: Fn(&mut S) -> R + Send + Sync + 'static,
    {
        if let Some(slot) = self.slot_mut(R::ID) {
            slot.size = R::MIN_LEN;
            slot.write = Some(Box::new(move |state: &mut S| write(state).to_payload()));
        }
        self
    }

    /// Make `R` writable; the payload is decoded before `process` runs
    pub fn on_process<R, F>(&mut self, process: F) -> &mut Self
    where
        R: Report + 'static,
        F: Fn(&mut S, R) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        if let Some(slot) = self.slot_mut(R::ID) {
            slot.size = R::MIN_LEN;
            slot.process = Some(Box::new(move |state: &mut S, data: &[u8]| {
                process(state, R::from_payload(data)?)
            }));
        }
        self
    }

    /// Override the registered payload size of `id`
    pub fn set_size(&mut self, id: u8, size: usize) -> &mut Self {
        if let Some(slot) = self.slot_mut(id) {
            slot.size = size;
        }
        self
    }

    /// Keep `id` out of the descriptor while still dispatching it
    pub fn suppress(&mut self, id: u8) -> &mut Self {
        self.descriptor = OnceLock::new();
        if !self.suppressed.contains(&id) {
            self.suppressed.push(id);
        }
        self
    }

    pub fn is_registered(&self, id: u8) -> bool {
        self.slots
            .get(usize::from(id))
            .is_some_and(Slot::is_registered)
    }

    /// Registered payload size of `id`
    pub fn size(&self, id: u8) -> Option<usize> {
        self.slots
            .get(usize::from(id))
            .filter(|s| s.is_registered())
            .map(|s| s.size)
    }

    /// Report IDs with at least one handler
    pub fn registered_ids(&self) -> Vec<u8> {
        (0..TABLE_SIZE as u8).filter(|&id| self.is_registered(id)).collect()
    }

    /// Serialize report `id` from `state`
    ///
    /// Returns the payload without the report ID, padded or cut to the
    /// registered size.
    pub fn write_report(&self, state: &mut S, id: u8) -> Result<Vec<u8>, DispatchError> {
        let id = report_id::resolve_read(id);
        let slot = self
            .slots
            .get(usize::from(id))
            .ok_or(DispatchError::UnknownReport(id))?;
        let write = slot
            .write
            .as_ref()
            .ok_or(DispatchError::NoWriteHandler(id))?;

        let mut payload = write(state);
        if slot.size != 0 {
            payload.resize(slot.size, 0);
        }
        Ok(payload)
    }

    /// Apply payload `data` of report `id` to `state`
    pub fn process_report(&self, state: &mut S, id: u8, data: &[u8]) -> Result<(), DispatchError> {
        let slot = self
            .slots
            .get(usize::from(id))
            .ok_or(DispatchError::UnknownReport(id))?;
        let process = slot
            .process
            .as_ref()
            .ok_or(DispatchError::NoProcessHandler(id))?;

        if slot.size != 0 && data.len() != slot.size {
            return Err(DispatchError::SizeMismatch {
                id,
                expected: slot.size,
                got: data.len(),
            });
        }

        process(state, data)?;
        debug!(
            "Processed report 0x{:02X} ({}), {} bytes",
            id,
            report_id::name(id),
            data.len()
        );
        Ok(())
    }

    /// HID report descriptor covering every registered report
    ///
    /// Built on first use and cached until the next registration.
    pub fn descriptor(&self) -> &[u8] {
        self.descriptor.get_or_init(|| self.build_descriptor())
    }

    fn build_descriptor(&self) -> Vec<u8> {
        let mut writer = DescriptorWriter::new();
        for (id, slot) in self.slots.iter().enumerate().skip(1) {
            let id = id as u8;
            if !slot.is_registered() || self.suppressed.contains(&id) {
                continue;
            }
            if id == report_id::INPUT {
                writer.input_report(id, self.button_count, self.sensor_count);
            } else if slot.size == 0 {
                writer.output_report(id);
            } else {
                writer.feature_report(id, slot.size);
            }
        }
        writer.finish()
    }
}
