//! Hardware abstraction layer
//!
//! The control engine only reaches hardware through [`Hal`]: ADC sampling,
//! the LED strip, the two status LEDs, persistent storage and the bootloader
//! jump. [`SimHal`] backs the emulator and the tests.

use adp_transport::Rgb;
use thiserror::Error;

/// Status LEDs on the controller board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwLed {
    Power,
    Data,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    #[error("EEPROM access out of range: {len} bytes at 0x{addr:04X} (capacity {capacity})")]
    EepromOutOfRange {
        addr: usize,
        len: usize,
        capacity: usize,
    },
}

/// Narrow hardware interface consumed by the control engine
pub trait Hal: Send {
    /// Raw ADC reading of sensor `index`
    fn read_sensor(&mut self, index: usize) -> u16;

    /// Stage a color; nothing is visible until [`Hal::commit_leds`]
    fn set_led(&mut self, index: usize, color: Rgb);

    /// Push all staged colors to the strip at once
    fn commit_leds(&mut self);

    fn set_hw_led(&mut self, led: HwLed, on: bool);

    fn eeprom_read(&mut self, addr: usize, buf: &mut [u8]) -> Result<(), HalError>;

    fn eeprom_write(&mut self, addr: usize, data: &[u8]) -> Result<(), HalError>;

    /// Reboot into the bootloader
    fn enter_bootloader(&mut self);
}

/// Size of the simulated EEPROM (ATmega32u4)
pub const SIM_EEPROM_SIZE: usize = 1024;

/// In-memory hardware for the emulator and tests
#[derive(Debug, Clone)]
pub struct SimHal {
    sensors: Vec<u16>,
    staged: Vec<Rgb>,
    strip: Vec<Rgb>,
    commits: usize,
    power_led: bool,
    data_led: bool,
    eeprom: Vec<u8>,
    bootloader_requests: usize,
}

impl SimHal {
    /// Blank hardware; EEPROM reads as erased flash (0xFF)
    pub fn new(sensor_count: usize, led_count: usize) -> Self {
        Self {
            sensors: vec![0; sensor_count],
            staged: vec![Rgb::BLACK; led_count],
            strip: vec![Rgb::BLACK; led_count],
            commits: 0,
            power_led: false,
            data_led: false,
            eeprom: vec![0xFF; SIM_EEPROM_SIZE],
            bootloader_requests: 0,
        }
    }

    pub fn set_sensor(&mut self, index: usize, value: u16) {
        if let Some(slot) = self.sensors.get_mut(index) {
            *slot = value;
        }
    }

    /// Colors as last committed to the strip
    pub fn strip(&self) -> &[Rgb] {
        &self.strip
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn hw_led(&self, led: HwLed) -> bool {
        match led {
            HwLed::Power => self.power_led,
            HwLed::Data => self.data_led,
        }
    }

    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    pub fn eeprom_mut(&mut self) -> &mut [u8] {
        &mut self.eeprom
    }

    pub fn bootloader_requests(&self) -> usize {
        self.bootloader_requests
    }

    fn eeprom_range(&self, addr: usize, len: usize) -> Result<std::ops::Range<usize>, HalError> {
        let end = addr.checked_add(len).filter(|&end| end <= self.eeprom.len());
        end.map(|end| addr..end).ok_or(HalError::EepromOutOfRange {
            addr,
            len,
            capacity: self.eeprom.len(),
        })
    }
}

impl Hal for SimHal {
    fn read_sensor(&mut self, index: usize) -> u16 {
        self.sensors.get(index).copied().unwrap_or(0)
    }

    fn set_led(&mut self, index: usize, color: Rgb) {
        if let Some(slot) = self.staged.get_mut(index) {
            *slot = color;
        }
    }

    fn commit_leds(&mut self) {
        self.strip.clone_from(&self.staged);
        self.commits += 1;
    }

    fn set_hw_led(&mut self, led: HwLed, on: bool) {
        match led {
            HwLed::Power => self.power_led = on,
            HwLed::Data => self.data_led = on,
        }
    }

    fn eeprom_read(&mut self, addr: usize, buf: &mut [u8]) -> Result<(), HalError> {
        let range = self.eeprom_range(addr, buf.len())?;
        buf.copy_from_slice(&self.eeprom[range]);
        Ok(())
    }

    fn eeprom_write(&mut self, addr: usize, data: &[u8]) -> Result<(), HalError> {
        let range = self.eeprom_range(addr, data.len())?;
        self.eeprom[range].copy_from_slice(data);
        Ok(())
    }

    fn enter_bootloader(&mut self) {
        self.bootloader_requests += 1;
    }
}
