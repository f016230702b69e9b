//! Live device configuration and its persisted byte layout
//!
//! Persisted block, little-endian, no padding:
//!
//! ```text
//! sensors[SENSOR_COUNT]  10 bytes each (threshold, release, button, resistor, flags, preload)
//! name                   51 bytes (size + 50 name bytes)
//! light_rules[16]        13 bytes each (flags + 4 colors)
//! led_mappings[16]        5 bytes each (flags, rule, sensor, begin, end)
//! ```

use std::mem::size_of;

use adp_transport::protocol::{
    led_mapping_flags, MAX_LED_MAPPINGS, MAX_LIGHT_RULES, MAX_NAME_SIZE,
};
use adp_transport::{LedMapping, LightRule, ParseError, Rgb, SensorConfig};
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

mod stored {
    use super::*;

    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct Sensor {
        pub threshold: U16,
        pub release_threshold: U16,
        pub button_mapping: i8,
        pub resistor_value: u8,
        pub flags: U16,
        pub preload: U16,
    }

    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct Name {
        pub size: u8,
        pub name: [u8; MAX_NAME_SIZE],
    }

    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct LightRule {
        pub flags: u8,
        pub on_color: Rgb,
        pub off_color: Rgb,
        pub on_fade_color: Rgb,
        pub off_fade_color: Rgb,
    }

    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
    #[repr(C)]
    pub struct LedMapping {
        pub flags: u8,
        pub light_rule_index: u8,
        pub sensor_index: u8,
        pub led_index_begin: u8,
        pub led_index_end: u8,
    }
}

/// Everything the user can configure on the pad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub sensors: Vec<SensorConfig>,
    pub name: String,
    pub light_rules: [LightRule; MAX_LIGHT_RULES],
    pub led_mappings: [LedMapping; MAX_LED_MAPPINGS],
}

impl Configuration {
    /// Persisted size for a board with `sensor_count` sensors
    pub fn encoded_len(sensor_count: usize) -> usize {
        sensor_count * size_of::<stored::Sensor>()
            + size_of::<stored::Name>()
            + MAX_LIGHT_RULES * size_of::<stored::LightRule>()
            + MAX_LED_MAPPINGS * size_of::<stored::LedMapping>()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::encoded_len(self.sensors.len()));

        for s in &self.sensors {
            let sensor = stored::Sensor {
                threshold: U16::new(s.threshold),
                release_threshold: U16::new(s.release_threshold),
                button_mapping: s.button_mapping,
                resistor_value: s.resistor_value,
                flags: U16::new(s.flags),
                preload: U16::new(s.preload),
            };
            buf.extend_from_slice(sensor.as_bytes());
        }

        let mut name = stored::Name {
            size: 0,
            name: [0; MAX_NAME_SIZE],
        };
        let mut len = self.name.len().min(MAX_NAME_SIZE);
        while !self.name.is_char_boundary(len) {
            len -= 1;
        }
        name.name[..len].copy_from_slice(&self.name.as_bytes()[..len]);
        name.size = len as u8;
        buf.extend_from_slice(name.as_bytes());

        for r in &self.light_rules {
            let rule = stored::LightRule {
                flags: r.flags(),
                on_color: r.on_color,
                off_color: r.off_color,
                on_fade_color: r.on_fade_color,
                off_fade_color: r.off_fade_color,
            };
            buf.extend_from_slice(rule.as_bytes());
        }

        for m in &self.led_mappings {
            let mapping = stored::LedMapping {
                flags: m.flags(),
                light_rule_index: m.light_rule_index,
                sensor_index: m.sensor_index,
                led_index_begin: m.led_index_begin,
                led_index_end: m.led_index_end,
            };
            buf.extend_from_slice(mapping.as_bytes());
        }

        buf
    }

    /// Decode a persisted block written for `sensor_count` sensors
    pub fn decode(bytes: &[u8], sensor_count: usize) -> Result<Self, ParseError> {
        let expected = Self::encoded_len(sensor_count);
        if bytes.len() < expected {
            return Err(ParseError::TooShort {
                expected,
                got: bytes.len(),
            });
        }

        let mut rest = bytes;
        let mut sensors = Vec::with_capacity(sensor_count);
        for _ in 0..sensor_count {
            let s: stored::Sensor = take(&mut rest)?;
            sensors.push(SensorConfig {
                threshold: s.threshold.get(),
                release_threshold: s.release_threshold.get(),
                button_mapping: s.button_mapping,
                resistor_value: s.resistor_value,
                flags: s.flags.get(),
                preload: s.preload.get(),
            });
        }

        let name: stored::Name = take(&mut rest)?;
        let size = usize::from(name.size);
        if size > MAX_NAME_SIZE {
            return Err(ParseError::InvalidValue {
                field: "name size",
                value: u32::from(name.size),
            });
        }
        let name = String::from_utf8_lossy(&name.name[..size]).into_owned();

        let mut light_rules = [LightRule::default(); MAX_LIGHT_RULES];
        for rule in light_rules.iter_mut() {
            let r: stored::LightRule = take(&mut rest)?;
            *rule = LightRule::from_flags(
                r.flags,
                r.on_color,
                r.off_color,
                r.on_fade_color,
                r.off_fade_color,
            );
        }

        let mut led_mappings = [LedMapping::default(); MAX_LED_MAPPINGS];
        for mapping in led_mappings.iter_mut() {
            let m: stored::LedMapping = take(&mut rest)?;
            *mapping = LedMapping {
                enabled: m.flags & led_mapping_flags::ENABLED != 0,
                light_rule_index: m.light_rule_index,
                sensor_index: m.sensor_index,
                led_index_begin: m.led_index_begin,
                led_index_end: m.led_index_end,
            };
        }

        Ok(Self {
            sensors,
            name,
            light_rules,
            led_mappings,
        })
    }
}

/// Read one stored record and advance past it
fn take<T: FromBytes + KnownLayout + Immutable>(rest: &mut &[u8]) -> Result<T, ParseError> {
    let (value, tail) = T::read_from_prefix(*rest).map_err(|_| ParseError::TooShort {
        expected: size_of::<T>(),
        got: rest.len(),
    })?;
    *rest = tail;
    Ok(value)
}
