//! Device-side control engine for analog dance pads
//!
//! The engine samples force sensors, turns readings into debounced button
//! states, drives the LED strip and serves configuration reports to the host.
//! Hardware is reached only through [`Hal`]; [`EmulatedDevice`] runs the whole
//! engine on [`SimHal`] so the host stack can be exercised without a pad.
//!
//! Control flow per tick: [`Pad::update`] then [`Lights::update`]. Reports are
//! dispatched by the [`Registry`] against the [`DeviceState`] between ticks.

pub mod board;
pub mod config;
pub mod debug;
pub mod device;
pub mod emulator;
pub mod hal;
pub mod lights;
pub mod pad;
pub mod registry;
pub mod reports;
pub mod store;

pub use board::Board;
pub use config::Configuration;
pub use debug::DebugLog;
pub use device::{Device, DeviceState};
pub use emulator::EmulatedDevice;
pub use hal::{Hal, HalError, HwLed, SimHal};
pub use lights::Lights;
pub use pad::Pad;
pub use registry::{DispatchError, Registry};
pub use store::{ConfigStore, StoreError};
