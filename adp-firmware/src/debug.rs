//! Bounded debug text buffer drained through the Debug report

use std::collections::VecDeque;

use adp_transport::protocol::DEBUG_PACKET_SIZE;
use adp_transport::DebugReport;

/// Ring buffer capacity in bytes
pub const DEBUG_BUFFER_SIZE: usize = 1024;

/// Debug text waiting for the host; oldest bytes are dropped on overflow
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    buf: VecDeque<u8>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, message: &str) {
        let bytes = message.as_bytes();
        let bytes = &bytes[bytes.len().saturating_sub(DEBUG_BUFFER_SIZE)..];
        let overflow = (self.buf.len() + bytes.len()).saturating_sub(DEBUG_BUFFER_SIZE);
        self.buf.drain(..overflow);
        self.buf.extend(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take up to one packet of pending text
    pub fn drain_packet(&mut self) -> DebugReport {
        let n = self.buf.len().min(DEBUG_PACKET_SIZE);
        DebugReport {
            message: self.buf.drain(..n).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drains_in_packets() {
        let mut log = DebugLog::new();
        log.write(&"a".repeat(40));
        assert_eq!(log.drain_packet().message.len(), DEBUG_PACKET_SIZE);
        assert_eq!(log.drain_packet().text(), "a".repeat(8));
        assert!(log.drain_packet().message.is_empty());
    }

    #[test]
    fn test_character_split_across_packets() {
        let mut log = DebugLog::new();
        let message = format!("{}é!", "a".repeat(DEBUG_PACKET_SIZE - 1));
        log.write(&message);
        let first = log.drain_packet();
        let second = log.drain_packet();
        assert!(first.text().ends_with('\u{FFFD}'));
        assert_eq!(DebugReport::join([&first, &second]), message);
    }

    #[test]
    fn test_overflow_keeps_newest() {
        let mut log = DebugLog::new();
        log.write(&"x".repeat(DEBUG_BUFFER_SIZE));
        log.write("tail");
        assert_eq!(log.len(), DEBUG_BUFFER_SIZE);
        let mut text = String::new();
        while !log.is_empty() {
            text.push_str(&log.drain_packet().text());
        }
        assert!(text.ends_with("xtail"));
    }
}
