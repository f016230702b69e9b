//! Compiled-in board variants and their factory defaults

use std::fmt;
use std::str::FromStr;

use adp_transport::protocol::{feature, BUTTON_COUNT, MAX_LED_MAPPINGS, MAX_LIGHT_RULES};
use adp_transport::{LedMapping, LightRule, Rgb, SensorConfig};
use serde::{Deserialize, Serialize};

use crate::config::Configuration;

pub const FIRMWARE_VERSION_MAJOR: u8 = 1;
pub const FIRMWARE_VERSION_MINOR: u8 = 5;

/// Full-scale ADC reading
pub const MAX_SENSOR_VALUE: u16 = 1024;

pub const DEFAULT_THRESHOLD: u16 = 400;
pub const DEFAULT_RELEASE_THRESHOLD: u16 = 380;
pub const DEFAULT_RESISTOR_VALUE: u8 = 150;

/// Hardware variant the firmware is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Board {
    #[serde(rename = "fsrminipad")]
    FsrMiniPad,
    #[serde(rename = "fsrminipad-v2")]
    FsrMiniPadV2,
    #[serde(rename = "fsrio-v2")]
    FsrIoV2,
    #[serde(rename = "fsrio-v3")]
    FsrIoV3,
    #[serde(rename = "teensy2")]
    Teensy2,
    #[serde(rename = "leonardo")]
    Leonardo,
}

/// How sensors, lights and LEDs are laid out by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// 4 panels, sensors 0-3 on buttons 0-3, red/blue rules
    FourPanel,
    /// 8 panels, sensors 0-7 on buttons 0-7, one blue rule
    EightPanel,
    /// Every sensor on its own button, one blue rule
    AllSensors,
    /// No button mapped
    Unmapped,
}

impl Board {
    pub const ALL: [Board; 6] = [
        Board::FsrMiniPad,
        Board::FsrMiniPadV2,
        Board::FsrIoV2,
        Board::FsrIoV3,
        Board::Teensy2,
        Board::Leonardo,
    ];

    /// Short name used on the command line and in config files
    pub fn id(self) -> &'static str {
        match self {
            Board::FsrMiniPad => "fsrminipad",
            Board::FsrMiniPadV2 => "fsrminipad-v2",
            Board::FsrIoV2 => "fsrio-v2",
            Board::FsrIoV3 => "fsrio-v3",
            Board::Teensy2 => "teensy2",
            Board::Leonardo => "leonardo",
        }
    }

    /// Board type string reported by Identification
    pub fn board_type(self) -> &'static str {
        match self {
            Board::FsrMiniPad => "fsrminipad",
            Board::FsrMiniPadV2 => "FSR Mini pad V2",
            Board::FsrIoV2 => "FSRio V2",
            Board::FsrIoV3 => "FSRio V3",
            Board::Teensy2 => "teensy2",
            Board::Leonardo => "leonardo",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Board::FsrMiniPad => "FSR Mini pad V1",
            other => other.board_type(),
        }
    }

    pub fn sensor_count(self) -> usize {
        match self {
            Board::FsrIoV3 => 16,
            _ => 12,
        }
    }

    pub fn button_count(self) -> usize {
        BUTTON_COUNT
    }

    pub fn led_count(self) -> usize {
        match self {
            Board::FsrMiniPad | Board::FsrMiniPadV2 => 32,
            Board::FsrIoV2 | Board::FsrIoV3 => 64,
            Board::Teensy2 | Board::Leonardo => 0,
        }
    }

    /// Identification v2 feature bitmask
    pub fn features(self) -> u16 {
        let mut features = 0;
        if self.led_count() > 0 {
            features |= feature::LIGHTS;
        }
        if matches!(
            self,
            Board::FsrMiniPadV2 | Board::FsrIoV2 | Board::FsrIoV3
        ) {
            features |= feature::DIGIPOT;
        }
        features
    }

    fn layout(self) -> Layout {
        match self {
            Board::FsrMiniPad | Board::FsrMiniPadV2 => Layout::FourPanel,
            Board::FsrIoV2 | Board::Leonardo => Layout::EightPanel,
            Board::FsrIoV3 => Layout::AllSensors,
            Board::Teensy2 => Layout::Unmapped,
        }
    }

    /// Factory defaults for this board
    pub fn default_config(self) -> Configuration {
        let sensor_count = self.sensor_count();
        let layout = self.layout();
        let mapped = match layout {
            Layout::FourPanel => 4,
            Layout::EightPanel => 8,
            Layout::AllSensors => sensor_count,
            Layout::Unmapped => 0,
        };

        let sensors = (0..sensor_count)
            .map(|i| SensorConfig {
                threshold: DEFAULT_THRESHOLD,
                release_threshold: DEFAULT_RELEASE_THRESHOLD,
                button_mapping: if i < mapped { i as i8 } else { -1 },
                resistor_value: DEFAULT_RESISTOR_VALUE,
                flags: 0,
                preload: 0,
            })
            .collect();

        let mut light_rules = [LightRule::default(); MAX_LIGHT_RULES];
        let mut led_mappings = [LedMapping::default(); MAX_LED_MAPPINGS];

        if self.led_count() > 0 {
            match layout {
                Layout::FourPanel => {
                    light_rules[0] = red_rule();
                    light_rules[1] = blue_rule();
                    led_mappings[0] = LedMapping::new(0, 5, 0, 8);
                    led_mappings[1] = LedMapping::new(1, 4, 8, 16);
                    led_mappings[2] = LedMapping::new(1, 2, 24, 32);
                    led_mappings[3] = LedMapping::new(0, 3, 16, 24);
                }
                Layout::EightPanel | Layout::AllSensors => {
                    light_rules[0] = blue_rule();
                    for (i, mapping) in led_mappings.iter_mut().take(8).enumerate() {
                        let i = i as u8;
                        *mapping = LedMapping::new(0, i, i, i + 1);
                    }
                }
                Layout::Unmapped => {}
            }
        }

        Configuration {
            sensors,
            name: self.default_name().to_string(),
            light_rules,
            led_mappings,
        }
    }
}

fn red_rule() -> LightRule {
    LightRule {
        enabled: true,
        fade_on: false,
        fade_off: true,
        on_color: Rgb::new(100, 100, 100),
        off_color: Rgb::new(2, 0, 0),
        on_fade_color: Rgb::new(0, 0, 0),
        off_fade_color: Rgb::new(255, 0, 0),
    }
}

fn blue_rule() -> LightRule {
    LightRule {
        enabled: true,
        fade_on: false,
        fade_off: true,
        on_color: Rgb::new(100, 100, 100),
        off_color: Rgb::new(0, 0, 2),
        on_fade_color: Rgb::new(0, 0, 0),
        off_fade_color: Rgb::new(0, 0, 255),
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Board {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::ALL
            .into_iter()
            .find(|b| b.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<_> = Board::ALL.iter().map(|b| b.id()).collect();
                format!("unknown board '{}' (known: {})", s, known.join(", "))
            })
    }
}
