//! HID report descriptor assembly and parsing
//!
//! The pad advertises its report catalog as a HID report descriptor built from
//! the firmware's registry. [`DescriptorWriter`] emits the blocks; the host
//! side recovers `(report_id, kind, size)` entries with [`parse_descriptor`].

use std::collections::BTreeMap;

/// Short item prefixes (tag | type | size code), without the size code bits
mod item {
    // Main
    pub const INPUT: u8 = 0x80;
    pub const OUTPUT: u8 = 0x90;
    pub const FEATURE: u8 = 0xB0;
    pub const COLLECTION: u8 = 0xA0;
    pub const END_COLLECTION: u8 = 0xC0;
    // Global
    pub const USAGE_PAGE: u8 = 0x04;
    pub const LOGICAL_MINIMUM: u8 = 0x14;
    pub const LOGICAL_MAXIMUM: u8 = 0x24;
    pub const REPORT_SIZE: u8 = 0x74;
    pub const REPORT_ID: u8 = 0x84;
    pub const REPORT_COUNT: u8 = 0x94;
    // Local
    pub const USAGE: u8 = 0x08;
    pub const USAGE_MINIMUM: u8 = 0x18;
    pub const USAGE_MAXIMUM: u8 = 0x28;

    /// Long item marker; never emitted, skipped by the parser
    pub const LONG: u8 = 0xFE;
}

mod usage_page {
    pub const GENERIC_DESKTOP: u16 = 0x01;
    pub const BUTTON: u16 = 0x09;
    pub const VENDOR: u16 = 0xFF00;
}

mod collection {
    pub const PHYSICAL: u8 = 0x00;
    pub const APPLICATION: u8 = 0x01;
}

/// Main item flags: Data, Variable, Absolute
const DATA_VAR_ABS: u8 = 0x02;
/// Main item flags: Constant (padding)
const CONSTANT: u8 = 0x01;

/// Generic desktop usage for joystick
const USAGE_JOYSTICK: u16 = 0x04;

/// Kind of report block in the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

/// One report recovered from a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub report_id: u8,
    pub kind: ReportKind,
    /// Payload size in bytes (excluding report ID)
    pub size: usize,
}

/// Builds a report descriptor block by block
#[derive(Debug, Clone)]
pub struct DescriptorWriter {
    buf: Vec<u8>,
}

impl Default for DescriptorWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorWriter {
    /// Start a descriptor: Generic Desktop / Joystick application collection
    pub fn new() -> Self {
        let mut w = Self { buf: Vec::new() };
        w.short(item::USAGE_PAGE, u32::from(usage_page::GENERIC_DESKTOP));
        w.short(item::USAGE, u32::from(USAGE_JOYSTICK));
        w.short(item::COLLECTION, u32::from(collection::APPLICATION));
        w
    }

    /// Emit a short item with the smallest data size that holds `value`
    fn short(&mut self, prefix: u8, value: u32) {
        if value <= 0xFF {
            self.buf.extend_from_slice(&[prefix | 1, value as u8]);
        } else if value <= 0xFFFF {
            self.buf.push(prefix | 2);
            self.buf.extend_from_slice(&(value as u16).to_le_bytes());
        } else {
            self.buf.push(prefix | 3);
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Logical extents are signed; widen so 0x80..=0xFF stay positive
    fn logical(&mut self, prefix: u8, value: i32) {
        if (-0x80..0x80).contains(&value) {
            self.buf.extend_from_slice(&[prefix | 1, value as u8]);
        } else if (-0x8000..0x8000).contains(&value) {
            self.buf.push(prefix | 2);
            self.buf.extend_from_slice(&(value as i16).to_le_bytes());
        } else {
            self.buf.push(prefix | 3);
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// `count` unsigned bytes
    fn byte_array(&mut self, count: usize) {
        self.logical(item::LOGICAL_MINIMUM, 0);
        self.logical(item::LOGICAL_MAXIMUM, 0xFF);
        self.short(item::REPORT_SIZE, 8);
        self.short(item::REPORT_COUNT, count as u32);
    }

    /// Input report: `button_count` one-bit buttons, byte padding, then
    /// `sensor_count` 16-bit readings as vendor bytes
    pub fn input_report(&mut self, report_id: u8, button_count: usize, sensor_count: usize) {
        self.short(item::REPORT_ID, u32::from(report_id));
        self.short(item::USAGE_PAGE, u32::from(usage_page::BUTTON));
        self.short(item::USAGE_MINIMUM, 1);
        self.short(item::USAGE_MAXIMUM, button_count as u32);
        self.logical(item::LOGICAL_MINIMUM, 0);
        self.logical(item::LOGICAL_MAXIMUM, 1);
        self.short(item::REPORT_SIZE, 1);
        self.short(item::REPORT_COUNT, button_count as u32);
        self.short(item::INPUT, u32::from(DATA_VAR_ABS));

        let padding = (8 - button_count % 8) % 8;
        if padding != 0 {
            self.short(item::REPORT_SIZE, padding as u32);
            self.short(item::REPORT_COUNT, 1);
            self.short(item::INPUT, u32::from(CONSTANT));
        }

        self.short(item::USAGE_PAGE, u32::from(usage_page::VENDOR));
        self.short(item::USAGE, 1);
        self.short(item::COLLECTION, u32::from(collection::PHYSICAL));
        self.short(item::USAGE, 1);
        self.byte_array(sensor_count * 2);
        self.short(item::INPUT, u32::from(DATA_VAR_ABS));
        self.buf.push(item::END_COLLECTION);
    }

    /// Feature report of `size` payload bytes
    pub fn feature_report(&mut self, report_id: u8, size: usize) {
        self.short(item::REPORT_ID, u32::from(report_id));
        self.short(item::USAGE_PAGE, u32::from(usage_page::VENDOR));
        self.short(item::USAGE, 2);
        self.short(item::COLLECTION, u32::from(collection::PHYSICAL));
        self.short(item::USAGE, 2);
        self.byte_array(size);
        self.short(item::FEATURE, u32::from(DATA_VAR_ABS));
        self.buf.push(item::END_COLLECTION);
    }

    /// Output report carrying a single vendor byte (command-style reports)
    pub fn output_report(&mut self, report_id: u8) {
        self.short(item::REPORT_ID, u32::from(report_id));
        self.short(item::USAGE_PAGE, u32::from(usage_page::VENDOR));
        self.short(item::USAGE, 2);
        self.short(item::REPORT_SIZE, 8);
        self.short(item::REPORT_COUNT, 1);
        self.short(item::OUTPUT, u32::from(DATA_VAR_ABS));
    }

    /// Close the application collection and return the descriptor bytes
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(item::END_COLLECTION);
        self.buf
    }
}

/// Parse a report descriptor into per-report entries, ordered by report ID
/// and kind
///
/// Only the items that shape report layout are interpreted (report ID, size,
/// count and the main items); malformed trailing bytes end the walk.
pub fn parse_descriptor(descriptor: &[u8]) -> Vec<DescriptorEntry> {
    let mut bits: BTreeMap<(u8, ReportKind), usize> = BTreeMap::new();
    let mut report_id = 0u8;
    let mut report_size = 0usize;
    let mut report_count = 0usize;

    let mut pos = 0;
    while pos < descriptor.len() {
        let prefix = descriptor[pos];
        pos += 1;

        if prefix == item::LONG {
            // bDataSize, bLongItemTag, data
            let Some(&len) = descriptor.get(pos) else {
                break;
            };
            pos += 2 + usize::from(len);
            continue;
        }

        let size = match prefix & 0x03 {
            3 => 4,
            n => usize::from(n),
        };
        let Some(data) = descriptor.get(pos..pos + size) else {
            break;
        };
        pos += size;
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)) as usize;

        let kind = match prefix & 0xFC {
            item::REPORT_ID => {
                report_id = value as u8;
                None
            }
            item::REPORT_SIZE => {
                report_size = value;
                None
            }
            item::REPORT_COUNT => {
                report_count = value;
                None
            }
            item::INPUT => Some(ReportKind::Input),
            item::OUTPUT => Some(ReportKind::Output),
            item::FEATURE => Some(ReportKind::Feature),
            _ => None,
        };

        if let Some(kind) = kind {
            let total = bits.entry((report_id, kind)).or_default();
            *total = total.saturating_add(report_size.saturating_mul(report_count));
        }
    }

    bits.into_iter()
        .map(|((report_id, kind), bits)| DescriptorEntry {
            report_id,
            kind,
            size: bits.div_ceil(8),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_fields_saturate() {
        let max4 = [0xFF; 4];
        let mut descriptor = vec![item::REPORT_ID | 1, 0x02];
        descriptor.push(item::REPORT_SIZE | 3);
        descriptor.extend_from_slice(&max4);
        descriptor.push(item::REPORT_COUNT | 3);
        descriptor.extend_from_slice(&max4);
        for _ in 0..3 {
            descriptor.extend_from_slice(&[item::FEATURE | 1, 0x02]);
        }

        let entries = parse_descriptor(&descriptor);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].report_id, 2);
        assert_eq!(entries[0].kind, ReportKind::Feature);
        assert_eq!(entries[0].size, usize::MAX.div_ceil(8));
    }

    #[test]
    fn test_header_and_footer() {
        let bytes = DescriptorWriter::new().finish();
        assert_eq!(bytes, vec![0x05, 0x01, 0x09, 0x04, 0xA1, 0x01, 0xC0]);
    }

    #[test]
    fn test_vendor_page_uses_two_bytes() {
        let mut w = DescriptorWriter::new();
        w.output_report(0x04);
        let bytes = w.finish();
        let vendor = [0x06, 0x00, 0xFF];
        assert!(bytes.windows(3).any(|win| win == vendor));
        // logical max 255 needs a 2-byte item to stay unsigned
        let mut w = DescriptorWriter::new();
        w.feature_report(0x05, 51);
        let bytes = w.finish();
        assert!(bytes.windows(3).any(|win| win == [0x26, 0xFF, 0x00]));
    }

    #[test]
    fn test_parse_mixed_descriptor() {
        let mut w = DescriptorWriter::new();
        w.input_report(0x01, 16, 12);
        w.feature_report(0x05, 51);
        w.output_report(0x04);
        w.feature_report(0x0C, 9);
        let entries = parse_descriptor(&w.finish());

        assert_eq!(
            entries,
            vec![
                DescriptorEntry {
                    report_id: 0x01,
                    kind: ReportKind::Input,
                    size: 2 + 24
                },
                DescriptorEntry {
                    report_id: 0x04,
                    kind: ReportKind::Output,
                    size: 1
                },
                DescriptorEntry {
                    report_id: 0x05,
                    kind: ReportKind::Feature,
                    size: 51
                },
                DescriptorEntry {
                    report_id: 0x0C,
                    kind: ReportKind::Feature,
                    size: 9
                },
            ]
        );
    }

    #[test]
    fn test_button_padding() {
        let mut w = DescriptorWriter::new();
        w.input_report(0x01, 12, 4);
        let entries = parse_descriptor(&w.finish());
        // 12 buttons + 4 bits padding + 8 sensor bytes
        assert_eq!(entries[0].size, 2 + 8);
    }

    #[test]
    fn test_parse_truncated() {
        let mut w = DescriptorWriter::new();
        w.feature_report(0x09, 41);
        let mut bytes = w.finish();
        bytes.truncate(bytes.len() - 4);
        // no main item survived the cut
        assert!(parse_descriptor(&bytes).is_empty());
    }
}
