//! Versioned configuration store
//!
//! EEPROM layout: a magic marker at address 0 followed immediately by the
//! encoded [`Configuration`]. The marker carries the firmware version and the
//! sensor count, so a block written by another build is never trusted.
//!
//! A save first invalidates the marker, then writes the block, then writes
//! the marker. A save torn by power loss therefore loads as "incompatible"
//! and falls back to factory defaults.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board::{Board, FIRMWARE_VERSION_MAJOR, FIRMWARE_VERSION_MINOR};
use crate::config::Configuration;
use crate::hal::{Hal, HalError};

pub const MAGIC_ADDRESS: usize = 0;
pub const MAGIC_LEN: usize = 5;
pub const CONFIGURATION_ADDRESS: usize = MAGIC_ADDRESS + MAGIC_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Hal(#[from] HalError),
}

/// Loads and persists the configuration of one board
#[derive(Debug, Clone)]
pub struct ConfigStore {
    board: Board,
    magic: [u8; MAGIC_LEN],
}

impl ConfigStore {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            magic: [
                10,
                58,
                board.sensor_count() as u8,
                FIRMWARE_VERSION_MAJOR,
                FIRMWARE_VERSION_MINOR,
            ],
        }
    }

    /// Marker expected in front of a compatible block
    pub fn magic(&self) -> [u8; MAGIC_LEN] {
        self.magic
    }

    /// Check the marker without reading the block
    pub fn is_initialized<H: Hal>(&self, hal: &mut H) -> Result<bool, StoreError> {
        let mut marker = [0u8; MAGIC_LEN];
        hal.eeprom_read(MAGIC_ADDRESS, &mut marker)?;
        Ok(marker == self.magic)
    }

    /// Load the persisted configuration
    ///
    /// Missing or incompatible storage is replaced by factory defaults, which
    /// are written back before returning.
    pub fn load<H: Hal>(&self, hal: &mut H) -> Result<Configuration, StoreError> {
        if self.is_initialized(hal)? {
            let mut block = vec![0u8; Configuration::encoded_len(self.board.sensor_count())];
            hal.eeprom_read(CONFIGURATION_ADDRESS, &mut block)?;
            match Configuration::decode(&block, self.board.sensor_count()) {
                Ok(config) => {
                    debug!("Loaded configuration '{}'", config.name);
                    return Ok(config);
                }
                Err(e) => warn!("Stored configuration unreadable: {}", e),
            }
        } else {
            info!("No compatible configuration stored, writing defaults");
        }

        self.factory_reset(hal)
    }

    /// Persist `config`
    pub fn save<H: Hal>(&self, hal: &mut H, config: &Configuration) -> Result<(), StoreError> {
        hal.eeprom_write(MAGIC_ADDRESS, &[0u8; MAGIC_LEN])?;
        hal.eeprom_write(CONFIGURATION_ADDRESS, &config.encode())?;
        hal.eeprom_write(MAGIC_ADDRESS, &self.magic)?;
        debug!("Saved configuration '{}'", config.name);
        Ok(())
    }

    /// Overwrite storage with factory defaults and return them
    pub fn factory_reset<H: Hal>(&self, hal: &mut H) -> Result<Configuration, StoreError> {
        let defaults = self.board.default_config();
        self.save(hal, &defaults)?;
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SimHal;

    fn hal(board: Board) -> SimHal {
        SimHal::new(board.sensor_count(), board.led_count())
    }

    #[test]
    fn test_blank_storage_loads_defaults_and_persists_them() {
        let store = ConfigStore::new(Board::FsrMiniPad);
        let mut hal = hal(Board::FsrMiniPad);
        assert!(!store.is_initialized(&mut hal).unwrap());

        let config = store.load(&mut hal).unwrap();
        assert_eq!(config, Board::FsrMiniPad.default_config());
        assert!(store.is_initialized(&mut hal).unwrap());
        assert_eq!(&hal.eeprom()[..MAGIC_LEN], &[10, 58, 12, 1, 5]);
    }

    #[test]
    fn test_save_then_load() {
        let store = ConfigStore::new(Board::FsrIoV3);
        let mut hal = hal(Board::FsrIoV3);
        let mut config = store.load(&mut hal).unwrap();
        config.sensors[3].threshold = 612;
        config.name = "Left pad".into();
        config.led_mappings[9].enabled = true;
        store.save(&mut hal, &config).unwrap();

        assert_eq!(store.load(&mut hal).unwrap(), config);
    }

    #[test]
    fn test_corrupted_marker_restores_defaults() {
        let store = ConfigStore::new(Board::FsrMiniPad);
        let mut hal = hal(Board::FsrMiniPad);
        let mut config = store.load(&mut hal).unwrap();
        config.sensors[0].threshold = 900;
        store.save(&mut hal, &config).unwrap();

        hal.eeprom_mut()[1] ^= 0xFF;
        assert_eq!(store.load(&mut hal).unwrap(), Board::FsrMiniPad.default_config());
        // defaults were written back
        assert_eq!(store.load(&mut hal).unwrap().sensors[0].threshold, 400);
    }

    #[test]
    fn test_marker_discriminates_sensor_count() {
        let mut hal = hal(Board::FsrIoV3);
        ConfigStore::new(Board::FsrIoV3).load(&mut hal).unwrap();
        let other = ConfigStore::new(Board::FsrIoV2);
        assert!(!other.is_initialized(&mut hal).unwrap());
    }

    #[test]
    fn test_torn_save_is_detected() {
        let store = ConfigStore::new(Board::Leonardo);
        let mut hal = hal(Board::Leonardo);
        store.load(&mut hal).unwrap();

        // power lost after invalidating the marker
        hal.eeprom_write(MAGIC_ADDRESS, &[0; MAGIC_LEN]).unwrap();
        hal.eeprom_write(CONFIGURATION_ADDRESS, &[0xAB; 40]).unwrap();
        assert!(!store.is_initialized(&mut hal).unwrap());
        assert_eq!(store.load(&mut hal).unwrap(), Board::Leonardo.default_config());
    }
}
