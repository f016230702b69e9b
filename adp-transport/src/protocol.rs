//! Protocol constants shared by the host tool and the pad firmware

/// Report IDs (fixed by the protocol, never renumbered)
pub mod report_id {
    pub const INPUT: u8 = 0x01;
    pub const PAD_CONFIGURATION: u8 = 0x02;
    pub const RESET: u8 = 0x03;
    pub const SAVE_CONFIGURATION: u8 = 0x04;
    pub const NAME: u8 = 0x05;
    /// Reserved by older firmware, never registered
    pub const UNUSED_ANALOG_JOYSTICK: u8 = 0x06;
    pub const LIGHT_RULE: u8 = 0x07;
    pub const FACTORY_RESET: u8 = 0x08;
    pub const IDENTIFICATION: u8 = 0x09;
    pub const LED_MAPPING: u8 = 0x0A;
    pub const SET_PROPERTY: u8 = 0x0B;
    pub const SENSOR: u8 = 0x0C;
    pub const DEBUG: u8 = 0x0D;
    pub const IDENTIFICATION_V2: u8 = 0x0E;
    pub const LIGHTS: u8 = 0x0F;

    /// Size of the device-side dispatch table (IDs 0..=17)
    pub const TABLE_SIZE: usize = 18;

    /// ID a read request actually addresses; 0 means Input
    pub fn resolve_read(id: u8) -> u8 {
        if id == 0 {
            INPUT
        } else {
            id
        }
    }

    /// Get human-readable name for a report ID
    pub fn name(id: u8) -> &'static str {
        match id {
            INPUT => "INPUT",
            PAD_CONFIGURATION => "PAD_CONFIGURATION",
            RESET => "RESET",
            SAVE_CONFIGURATION => "SAVE_CONFIGURATION",
            NAME => "NAME",
            UNUSED_ANALOG_JOYSTICK => "UNUSED_ANALOG_JOYSTICK",
            LIGHT_RULE => "LIGHT_RULE",
            FACTORY_RESET => "FACTORY_RESET",
            IDENTIFICATION => "IDENTIFICATION",
            LED_MAPPING => "LED_MAPPING",
            SET_PROPERTY => "SET_PROPERTY",
            SENSOR => "SENSOR",
            DEBUG => "DEBUG",
            IDENTIFICATION_V2 => "IDENTIFICATION_V2",
            LIGHTS => "LIGHTS",
            _ => "UNKNOWN",
        }
    }
}

/// Property IDs carried by the SetProperty report (0x0B)
pub mod property {
    pub const SELECTED_LIGHT_RULE_INDEX: u32 = 0;
    pub const SELECTED_LED_MAPPING_INDEX: u32 = 1;
    pub const SELECTED_SENSOR_INDEX: u32 = 2;
    /// Declared by the firmware but not acted upon
    pub const SENSOR_CAL_PRELOAD: u32 = 3;
}

/// Capability bits of the Identification v2 report
pub mod feature {
    pub const DEBUG: u16 = 1 << 0;
    pub const DIGIPOT: u16 = 1 << 1;
    pub const LIGHTS: u16 = 1 << 2;
    pub const WEBSERVER: u16 = 1 << 3;
    pub const RTOS: u16 = 1 << 4;
}

/// Per-sensor flag bits
pub mod sensor_flags {
    /// Analog channel is not sampled; the sensor reads as 0
    pub const ADC_DISABLED: u16 = 1 << 0;
}

/// LightRule flag bits
pub mod light_rule_flags {
    pub const ENABLED: u8 = 1 << 0;
    pub const FADE_ON: u8 = 1 << 1;
    pub const FADE_OFF: u8 = 1 << 2;
}

/// LedMapping flag bits
pub mod led_mapping_flags {
    pub const ENABLED: u8 = 1 << 0;
}

/// Number of buttons reported by every board (bitmask width of the Input report)
pub const BUTTON_COUNT: usize = 16;

/// Sensor count of the legacy PadConfiguration report (0x02)
pub const SENSOR_COUNT_V1: usize = 12;

/// Largest sensor count of any supported board
pub const MAX_SENSOR_COUNT: usize = 16;

/// Maximum device name length in bytes (without size prefix)
pub const MAX_NAME_SIZE: usize = 50;

pub const MAX_LIGHT_RULES: usize = 16;
pub const MAX_LED_MAPPINGS: usize = 16;

/// NUL-padded board type string length in the Identification report
pub const BOARD_TYPE_LENGTH: usize = 32;

/// Payload bytes carried by one Debug report
pub const DEBUG_PACKET_SIZE: usize = 32;

/// Largest report (ID + payload) any binding will move
pub const MAX_REPORT_SIZE: usize = 512;

/// Sentinel button mapping for a sensor that drives no button
pub const UNMAPPED_BUTTON: i8 = -1;

/// USB identifiers of supported pads
pub mod usb {
    /// pid.codes vendor ID used by current firmware
    pub const VENDOR_ID: u16 = 0x1209;
    pub const PRODUCT_ID: u16 = 0xB196;

    /// (vid, pid) pairs the host will open, including the legacy LUFA IDs
    pub const SUPPORTED_IDS: &[(u16, u16)] = &[(0x1209, 0xB196), (0x03EB, 0x204F)];

    /// Check whether a (vid, pid) pair belongs to a supported pad
    pub fn is_supported(vid: u16, pid: u16) -> bool {
        SUPPORTED_IDS.iter().any(|&(v, p)| v == vid && p == pid)
    }
}

/// Timing constants for the bindings
pub mod timing {
    /// Default per-request timeout for every binding (ms)
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;
    /// Settle time before a local feature write (ms)
    pub const FEATURE_WRITE_DELAY_MS: u64 = 2;
    /// Poll timeout for a local input read (ms)
    pub const INPUT_READ_TIMEOUT_MS: i32 = 10;
}
