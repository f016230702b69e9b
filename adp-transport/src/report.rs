//! Typed report catalog
//!
//! Every report starts with its 1-byte report ID followed by a fixed-layout,
//! little-endian payload. The wire layouts are pinned with zerocopy structs
//! (`wire` module); the public types are plain Rust values that the host
//! Reporter and the firmware registry exchange.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zerocopy::byteorder::little_endian::{F32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::{
    self, led_mapping_flags, light_rule_flags, report_id, sensor_flags, BOARD_TYPE_LENGTH,
    DEBUG_PACKET_SIZE, MAX_LED_MAPPINGS, MAX_NAME_SIZE, SENSOR_COUNT_V1, UNMAPPED_BUTTON,
};

// =============================================================================
// Core Trait
// =============================================================================

/// Parse error for report payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Report too short: expected {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },

    #[error("Report ID mismatch: expected 0x{expected:02X}, got 0x{got:02X}")]
    ReportIdMismatch { expected: u8, got: u8 },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: u32 },
}

/// A report with a protocol-fixed ID and a serializable payload
pub trait Report: Sized {
    /// Report ID (first byte on the wire)
    const ID: u8;

    /// Minimum payload length (excluding report ID); the exact length for
    /// every report except Input, whose size depends on the sensor count
    const MIN_LEN: usize;

    /// Serialize payload (excluding report ID)
    fn to_payload(&self) -> Vec<u8>;

    /// Parse from payload bytes (excluding report ID)
    fn from_payload(data: &[u8]) -> Result<Self, ParseError>;

    /// Build the complete report (report ID + payload)
    fn to_bytes(&self) -> Vec<u8> {
        let payload = self.to_payload();
        let mut buf = Vec::with_capacity(1 + payload.len());
        buf.push(Self::ID);
        buf.extend_from_slice(&payload);
        buf
    }

    /// Parse a complete report with ID and length validation
    fn parse(report: &[u8]) -> Result<Self, ParseError> {
        let (&id, payload) = report
            .split_first()
            .ok_or(ParseError::TooShort { expected: 1, got: 0 })?;
        if id != Self::ID {
            return Err(ParseError::ReportIdMismatch {
                expected: Self::ID,
                got: id,
            });
        }
        if payload.len() < Self::MIN_LEN {
            return Err(ParseError::TooShort {
                expected: Self::MIN_LEN + 1,
                got: report.len(),
            });
        }
        Self::from_payload(payload)
    }
}

/// Read a fixed-layout wire struct from the front of `data`
fn read_wire<T: FromBytes + KnownLayout + Immutable>(data: &[u8]) -> Result<T, ParseError> {
    T::read_from_prefix(data)
        .map(|(value, _rest)| value)
        .map_err(|_| ParseError::TooShort {
            expected: std::mem::size_of::<T>(),
            got: data.len(),
        })
}

/// Copy a string into a NUL-padded fixed buffer, truncating on a char boundary
fn pack_str<const N: usize>(s: &str) -> ([u8; N], usize) {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut buf = [0u8; N];
    buf[..end].copy_from_slice(&s.as_bytes()[..end]);
    (buf, end)
}

fn unpack_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// =============================================================================
// Shared value types
// =============================================================================

/// RGB color, 3 bytes on the wire
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoBytes,
    FromBytes,
    KnownLayout,
    Immutable,
)]
#[repr(C)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Per-sensor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Reading above which an unpressed button becomes pressed
    pub threshold: u16,
    /// Reading above which a pressed button stays pressed
    pub release_threshold: u16,
    /// Button index, or [`UNMAPPED_BUTTON`]
    pub button_mapping: i8,
    /// Digital potentiometer setting (gain)
    pub resistor_value: u8,
    pub flags: u16,
    /// Calibration preload; persisted with the configuration but not carried
    /// by the Sensor report
    pub preload: u16,
}

impl SensorConfig {
    /// Button this sensor drives, if it is mapped
    pub fn mapped_button(&self) -> Option<usize> {
        usize::try_from(self.button_mapping).ok()
    }

    pub fn is_adc_disabled(&self) -> bool {
        self.flags & sensor_flags::ADC_DISABLED != 0
    }

    pub fn unmapped() -> Self {
        Self {
            button_mapping: UNMAPPED_BUTTON,
            ..Self::default()
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            threshold: 0,
            release_threshold: 0,
            button_mapping: UNMAPPED_BUTTON,
            resistor_value: 0,
            flags: 0,
            preload: 0,
        }
    }
}

/// Color state machine keyed by one boolean (sensor triggered)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightRule {
    pub enabled: bool,
    pub fade_on: bool,
    pub fade_off: bool,
    pub on_color: Rgb,
    pub off_color: Rgb,
    pub on_fade_color: Rgb,
    pub off_fade_color: Rgb,
}

impl LightRule {
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.enabled {
            flags |= light_rule_flags::ENABLED;
        }
        if self.fade_on {
            flags |= light_rule_flags::FADE_ON;
        }
        if self.fade_off {
            flags |= light_rule_flags::FADE_OFF;
        }
        flags
    }

    pub fn from_flags(flags: u8, on: Rgb, off: Rgb, on_fade: Rgb, off_fade: Rgb) -> Self {
        Self {
            enabled: flags & light_rule_flags::ENABLED != 0,
            fade_on: flags & light_rule_flags::FADE_ON != 0,
            fade_off: flags & light_rule_flags::FADE_OFF != 0,
            on_color: on,
            off_color: off,
            on_fade_color: on_fade,
            off_fade_color: off_fade,
        }
    }
}

/// Binds the LED range `[led_index_begin, led_index_end)` to one rule driven by one sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedMapping {
    pub enabled: bool,
    pub light_rule_index: u8,
    pub sensor_index: u8,
    pub led_index_begin: u8,
    pub led_index_end: u8,
}

impl LedMapping {
    pub fn new(light_rule_index: u8, sensor_index: u8, begin: u8, end: u8) -> Self {
        Self {
            enabled: true,
            light_rule_index,
            sensor_index,
            led_index_begin: begin,
            led_index_end: end,
        }
    }

    pub fn flags(&self) -> u8 {
        if self.enabled {
            led_mapping_flags::ENABLED
        } else {
            0
        }
    }
}

// =============================================================================
// Wire layouts (zerocopy)
// =============================================================================

pub(crate) mod wire {
    use super::*;

    /// PadConfiguration (0x02) legacy payload, 40 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct PadConfiguration {
        pub sensor_thresholds: [U16; SENSOR_COUNT_V1],
        pub release_multiplier: F32,
        pub sensor_to_button_mapping: [i8; SENSOR_COUNT_V1],
    }

    /// Name (0x05) payload, 51 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct Name {
        pub size: u8,
        pub name: [u8; MAX_NAME_SIZE],
    }

    /// LightRule (0x07) payload, 14 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct LightRule {
        pub index: u8,
        pub flags: u8,
        pub on_color: Rgb,
        pub off_color: Rgb,
        pub on_fade_color: Rgb,
        pub off_fade_color: Rgb,
    }

    /// Identification (0x09) payload, 41 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct Identification {
        pub firmware_version_major: U16,
        pub firmware_version_minor: U16,
        pub button_count: u8,
        pub sensor_count: u8,
        pub led_count: u8,
        pub max_sensor_value: U16,
        pub board_type: [u8; BOARD_TYPE_LENGTH],
    }

    /// Identification v2 (0x0E) payload, 43 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct IdentificationV2 {
        pub parent: Identification,
        pub features: U16,
    }

    /// LedMapping (0x0A) payload, 6 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct LedMapping {
        pub index: u8,
        pub flags: u8,
        pub light_rule_index: u8,
        pub sensor_index: u8,
        pub led_index_begin: u8,
        pub led_index_end: u8,
    }

    /// SetProperty (0x0B) payload, 8 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct SetProperty {
        pub property_id: U32,
        pub property_value: U32,
    }

    /// Sensor (0x0C) payload, 9 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct Sensor {
        pub index: u8,
        pub threshold: U16,
        pub release_threshold: U16,
        pub button_mapping: i8,
        pub resistor_value: u8,
        pub flags: U16,
    }

    /// Debug (0x0D) payload, 34 bytes
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct DebugPacket {
        pub message_size: U16,
        pub message_packet: [u8; DEBUG_PACKET_SIZE],
    }

    /// Lights (0x0F) payload, one color per LED mapping
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct Lights {
        pub lights: [Rgb; MAX_LED_MAPPINGS],
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Input (0x01): button bitmask + one reading per sensor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputReport {
    /// Bit `i` set when button `i` is pressed
    pub buttons: u16,
    pub sensor_values: Vec<u16>,
}

impl InputReport {
    /// Payload size for a board with `sensor_count` sensors
    pub fn payload_len(sensor_count: usize) -> usize {
        2 + sensor_count * 2
    }

    pub fn is_pressed(&self, button: usize) -> bool {
        button < protocol::BUTTON_COUNT && self.buttons & (1 << button) != 0
    }
}

impl Report for InputReport {
    const ID: u8 = report_id::INPUT;
    const MIN_LEN: usize = 2;

    fn to_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::payload_len(self.sensor_values.len()));
        buf.extend_from_slice(&self.buttons.to_le_bytes());
        for value in &self.sensor_values {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < Self::MIN_LEN {
            return Err(ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: data.len(),
            });
        }
        let buttons = u16::from_le_bytes([data[0], data[1]]);
        let sensor_values = data[2..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(Self {
            buttons,
            sensor_values,
        })
    }
}

/// PadConfiguration (0x02): legacy 12-sensor threshold block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadConfigurationReport {
    pub sensor_thresholds: [u16; SENSOR_COUNT_V1],
    /// `release_threshold = threshold * release_multiplier` on write
    pub release_multiplier: f32,
    pub sensor_to_button_mapping: [i8; SENSOR_COUNT_V1],
}

impl Report for PadConfigurationReport {
    const ID: u8 = report_id::PAD_CONFIGURATION;
    const MIN_LEN: usize = std::mem::size_of::<wire::PadConfiguration>();

    fn to_payload(&self) -> Vec<u8> {
        wire::PadConfiguration {
            sensor_thresholds: self.sensor_thresholds.map(U16::new),
            release_multiplier: F32::new(self.release_multiplier),
            sensor_to_button_mapping: self.sensor_to_button_mapping,
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::PadConfiguration = read_wire(data)?;
        Ok(Self {
            sensor_thresholds: w.sensor_thresholds.map(|t| t.get()),
            release_multiplier: w.release_multiplier.get(),
            sensor_to_button_mapping: w.sensor_to_button_mapping,
        })
    }
}

/// Name (0x05): length-prefixed device name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameReport {
    pub name: String,
}

impl NameReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Report for NameReport {
    const ID: u8 = report_id::NAME;
    const MIN_LEN: usize = std::mem::size_of::<wire::Name>();

    fn to_payload(&self) -> Vec<u8> {
        let (name, len) = pack_str::<MAX_NAME_SIZE>(&self.name);
        wire::Name {
            size: len as u8,
            name,
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::Name = read_wire(data)?;
        let size = usize::from(w.size);
        if size > MAX_NAME_SIZE {
            return Err(ParseError::InvalidValue {
                field: "name size",
                value: u32::from(w.size),
            });
        }
        Ok(Self {
            name: String::from_utf8_lossy(&w.name[..size]).into_owned(),
        })
    }
}

/// LightRule (0x07): rule at `index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightRuleReport {
    pub index: u8,
    pub rule: LightRule,
}

impl Report for LightRuleReport {
    const ID: u8 = report_id::LIGHT_RULE;
    const MIN_LEN: usize = std::mem::size_of::<wire::LightRule>();

    fn to_payload(&self) -> Vec<u8> {
        let r = &self.rule;
        wire::LightRule {
            index: self.index,
            flags: r.flags(),
            on_color: r.on_color,
            off_color: r.off_color,
            on_fade_color: r.on_fade_color,
            off_fade_color: r.off_fade_color,
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::LightRule = read_wire(data)?;
        Ok(Self {
            index: w.index,
            rule: LightRule::from_flags(
                w.flags,
                w.on_color,
                w.off_color,
                w.on_fade_color,
                w.off_fade_color,
            ),
        })
    }
}

/// Identification (0x09): firmware version, counts and board type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentificationReport {
    pub firmware_version_major: u16,
    pub firmware_version_minor: u16,
    pub button_count: u8,
    pub sensor_count: u8,
    pub led_count: u8,
    pub max_sensor_value: u16,
    pub board_type: String,
}

impl IdentificationReport {
    fn to_wire(&self) -> wire::Identification {
        let (board_type, _) = pack_str::<BOARD_TYPE_LENGTH>(&self.board_type);
        wire::Identification {
            firmware_version_major: U16::new(self.firmware_version_major),
            firmware_version_minor: U16::new(self.firmware_version_minor),
            button_count: self.button_count,
            sensor_count: self.sensor_count,
            led_count: self.led_count,
            max_sensor_value: U16::new(self.max_sensor_value),
            board_type,
        }
    }

    fn from_wire(w: &wire::Identification) -> Self {
        Self {
            firmware_version_major: w.firmware_version_major.get(),
            firmware_version_minor: w.firmware_version_minor.get(),
            button_count: w.button_count,
            sensor_count: w.sensor_count,
            led_count: w.led_count,
            max_sensor_value: w.max_sensor_value.get(),
            board_type: unpack_str(&w.board_type),
        }
    }

    /// Format version as "major.minor"
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}",
            self.firmware_version_major, self.firmware_version_minor
        )
    }
}

impl Report for IdentificationReport {
    const ID: u8 = report_id::IDENTIFICATION;
    const MIN_LEN: usize = std::mem::size_of::<wire::Identification>();

    fn to_payload(&self) -> Vec<u8> {
        self.to_wire().as_bytes().to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::Identification = read_wire(data)?;
        Ok(Self::from_wire(&w))
    }
}

/// Identification v2 (0x0E): v1 fields plus a feature bitmask
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentificationV2Report {
    pub identification: IdentificationReport,
    pub features: u16,
}

impl IdentificationV2Report {
    pub fn has_feature(&self, feature: u16) -> bool {
        self.features & feature != 0
    }
}

impl Report for IdentificationV2Report {
    const ID: u8 = report_id::IDENTIFICATION_V2;
    const MIN_LEN: usize = std::mem::size_of::<wire::IdentificationV2>();

    fn to_payload(&self) -> Vec<u8> {
        wire::IdentificationV2 {
            parent: self.identification.to_wire(),
            features: U16::new(self.features),
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::IdentificationV2 = read_wire(data)?;
        Ok(Self {
            identification: IdentificationReport::from_wire(&w.parent),
            features: w.features.get(),
        })
    }
}

/// LedMapping (0x0A): mapping at `index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedMappingReport {
    pub index: u8,
    pub mapping: LedMapping,
}

impl Report for LedMappingReport {
    const ID: u8 = report_id::LED_MAPPING;
    const MIN_LEN: usize = std::mem::size_of::<wire::LedMapping>();

    fn to_payload(&self) -> Vec<u8> {
        let m = &self.mapping;
        wire::LedMapping {
            index: self.index,
            flags: m.flags(),
            light_rule_index: m.light_rule_index,
            sensor_index: m.sensor_index,
            led_index_begin: m.led_index_begin,
            led_index_end: m.led_index_end,
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::LedMapping = read_wire(data)?;
        Ok(Self {
            index: w.index,
            mapping: LedMapping {
                enabled: w.flags & led_mapping_flags::ENABLED != 0,
                light_rule_index: w.light_rule_index,
                sensor_index: w.sensor_index,
                led_index_begin: w.led_index_begin,
                led_index_end: w.led_index_end,
            },
        })
    }
}

/// SetProperty (0x0B): selects the "current index" for 0x07/0x0A/0x0C
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPropertyReport {
    pub property_id: u32,
    pub property_value: u32,
}

impl SetPropertyReport {
    pub fn select_light_rule(index: u8) -> Self {
        Self {
            property_id: protocol::property::SELECTED_LIGHT_RULE_INDEX,
            property_value: u32::from(index),
        }
    }

    pub fn select_led_mapping(index: u8) -> Self {
        Self {
            property_id: protocol::property::SELECTED_LED_MAPPING_INDEX,
            property_value: u32::from(index),
        }
    }

    pub fn select_sensor(index: u8) -> Self {
        Self {
            property_id: protocol::property::SELECTED_SENSOR_INDEX,
            property_value: u32::from(index),
        }
    }
}

impl Report for SetPropertyReport {
    const ID: u8 = report_id::SET_PROPERTY;
    const MIN_LEN: usize = std::mem::size_of::<wire::SetProperty>();

    fn to_payload(&self) -> Vec<u8> {
        wire::SetProperty {
            property_id: U32::new(self.property_id),
            property_value: U32::new(self.property_value),
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::SetProperty = read_wire(data)?;
        Ok(Self {
            property_id: w.property_id.get(),
            property_value: w.property_value.get(),
        })
    }
}

/// Sensor (0x0C): configuration of the sensor at `index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorReport {
    pub index: u8,
    /// `preload` is not carried on the wire and parses as 0
    pub sensor: SensorConfig,
}

impl Report for SensorReport {
    const ID: u8 = report_id::SENSOR;
    const MIN_LEN: usize = std::mem::size_of::<wire::Sensor>();

    fn to_payload(&self) -> Vec<u8> {
        let s = &self.sensor;
        wire::Sensor {
            index: self.index,
            threshold: U16::new(s.threshold),
            release_threshold: U16::new(s.release_threshold),
            button_mapping: s.button_mapping,
            resistor_value: s.resistor_value,
            flags: U16::new(s.flags),
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::Sensor = read_wire(data)?;
        Ok(Self {
            index: w.index,
            sensor: SensorConfig {
                threshold: w.threshold.get(),
                release_threshold: w.release_threshold.get(),
                button_mapping: w.button_mapping,
                resistor_value: w.resistor_value,
                flags: w.flags.get(),
                preload: 0,
            },
        })
    }
}

/// Debug (0x0D): next chunk of the device's debug text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugReport {
    pub message: Vec<u8>,
}

impl DebugReport {
    /// This packet alone as text; use [`DebugReport::join`] for a drained
    /// sequence, since a character may straddle two packets
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }

    /// Text of consecutive packets, decoded once over the joined bytes
    pub fn join<'a>(packets: impl IntoIterator<Item = &'a DebugReport>) -> String {
        let bytes: Vec<u8> = packets
            .into_iter()
            .flat_map(|p| p.message.iter().copied())
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Report for DebugReport {
    const ID: u8 = report_id::DEBUG;
    const MIN_LEN: usize = std::mem::size_of::<wire::DebugPacket>();

    fn to_payload(&self) -> Vec<u8> {
        let len = self.message.len().min(DEBUG_PACKET_SIZE);
        let mut packet = [0u8; DEBUG_PACKET_SIZE];
        packet[..len].copy_from_slice(&self.message[..len]);
        wire::DebugPacket {
            message_size: U16::new(len as u16),
            message_packet: packet,
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::DebugPacket = read_wire(data)?;
        let size = usize::from(w.message_size.get());
        if size > DEBUG_PACKET_SIZE {
            return Err(ParseError::InvalidValue {
                field: "debug message size",
                value: u32::from(w.message_size.get()),
            });
        }
        Ok(Self {
            message: w.message_packet[..size].to_vec(),
        })
    }
}

/// Lights (0x0F): manual color per LED mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightsReport {
    pub colors: [Rgb; MAX_LED_MAPPINGS],
}

impl Report for LightsReport {
    const ID: u8 = report_id::LIGHTS;
    const MIN_LEN: usize = std::mem::size_of::<wire::Lights>();

    fn to_payload(&self) -> Vec<u8> {
        wire::Lights {
            lights: self.colors,
        }
        .as_bytes()
        .to_vec()
    }

    fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        let w: wire::Lights = read_wire(data)?;
        Ok(Self { colors: w.lights })
    }
}

macro_rules! output_report {
    ($(#[$meta:meta])* $name:ident, $id:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Report for $name {
            const ID: u8 = $id;
            const MIN_LEN: usize = 0;

            fn to_payload(&self) -> Vec<u8> {
                Vec::new()
            }

            fn from_payload(_data: &[u8]) -> Result<Self, ParseError> {
                Ok(Self)
            }
        }
    };
}

output_report!(
    /// Reset (0x03): reboot into the bootloader
    ResetReport,
    report_id::RESET
);
output_report!(
    /// SaveConfiguration (0x04): persist the live configuration
    SaveConfigurationReport,
    report_id::SAVE_CONFIGURATION
);
output_report!(
    /// FactoryReset (0x08): restore and persist compiled-in defaults
    FactoryResetReport,
    report_id::FACTORY_RESET
);
