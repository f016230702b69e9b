// CLI definitions using clap

use adp_transport::Rgb;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::set::parse_color;

#[derive(Parser)]
#[command(name = "adp")]
#[command(author, version, about = "Configure and relay force-sensing dance pads")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Pad to open: hid://, hid://VID:PID, tcp://host:port, ws://host:port/, emu://BOARD
    #[arg(short, long, global = true, value_name = "URL")]
    pub transport: Option<String>,

    /// Config file path (default: ~/.config/adp/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Query Commands ===
    /// Show identification, name and capabilities
    #[command(visible_aliases = ["version", "id"])]
    Info,

    /// List sensor thresholds and button mapping
    #[command(visible_alias = "s")]
    Sensors,

    /// Show light rules and LED mappings
    #[command(visible_alias = "l")]
    Lights,

    /// Read the input report (buttons and raw sensor values)
    #[command(visible_alias = "in")]
    Input {
        /// Keep polling until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Poll interval in milliseconds when watching
        #[arg(long, default_value = "100")]
        interval: u64,
    },

    /// Drain the pad's debug text buffer
    #[command(visible_alias = "dbg")]
    Debug,

    /// Dump the full pad state as JSON
    Dump,

    /// List attached pads
    List,

    // === Set Commands ===
    /// Change one sensor's thresholds or button
    #[command(visible_alias = "ss")]
    SetSensor {
        /// Sensor index
        index: u8,

        /// Press threshold
        #[arg(long)]
        threshold: Option<u16>,

        /// Release threshold
        #[arg(long)]
        release: Option<u16>,

        /// Button index, or -1 to unmap
        #[arg(long, allow_hyphen_values = true)]
        button: Option<i8>,

        /// Disable sampling of this sensor
        #[arg(long)]
        disable: Option<bool>,
    },

    /// Enable and edit a light rule, or disable it
    #[command(visible_alias = "slr")]
    SetLightRule {
        /// Light rule index (0-15)
        index: u8,

        /// Color while the sensor is pressed (#RRGGBB)
        #[arg(long, value_parser = parse_color)]
        on: Option<Rgb>,

        /// Color while released
        #[arg(long, value_parser = parse_color)]
        off: Option<Rgb>,

        /// Fade start color on press
        #[arg(long, value_parser = parse_color)]
        on_fade: Option<Rgb>,

        /// Fade start color on release
        #[arg(long, value_parser = parse_color)]
        off_fade: Option<Rgb>,

        /// Fade in on press
        #[arg(long)]
        fade_on: Option<bool>,

        /// Fade out on release
        #[arg(long)]
        fade_off: Option<bool>,

        /// Disable the rule instead
        #[arg(long)]
        disable: bool,
    },

    /// Enable and edit an LED mapping, or disable it
    #[command(visible_alias = "slm")]
    SetLedMapping {
        /// LED mapping index (0-15)
        index: u8,

        /// Light rule that colors the range
        #[arg(long)]
        rule: Option<u8>,

        /// Sensor that drives the range
        #[arg(long)]
        sensor: Option<u8>,

        /// First LED of the range
        #[arg(long)]
        begin: Option<u8>,

        /// One past the last LED of the range
        #[arg(long)]
        end: Option<u8>,

        /// Disable the mapping instead
        #[arg(long)]
        disable: bool,
    },

    /// Show or change the pad name
    Name {
        /// New name (at most 50 bytes)
        name: Option<String>,
    },

    /// Persist the current configuration on the pad
    Save,

    /// Restore factory defaults and persist them
    FactoryReset,

    /// Reboot the pad into its bootloader
    Bootloader,

    // === Utility Commands ===
    /// Expose the opened pad through the TCP and WebSocket tunnels
    #[command(visible_alias = "relay")]
    Serve {
        /// TCP listen address (default from config)
        #[arg(long)]
        tcp: Option<String>,

        /// WebSocket listen address (default from config)
        #[arg(long)]
        ws: Option<String>,

        /// Do not start the TCP relay
        #[arg(long)]
        no_tcp: bool,

        /// Do not start the WebSocket relay
        #[arg(long)]
        no_ws: bool,
    },

    /// Write the effective configuration to the config file
    InitConfig,
}
