//! Device state and the control loop that drives it

use tracing::{debug, info, warn};

use crate::board::Board;
use crate::config::Configuration;
use crate::debug::DebugLog;
use crate::hal::Hal;
use crate::lights::Lights;
use crate::pad::Pad;
use crate::registry::{DispatchError, Registry};
use crate::reports;
use crate::store::{ConfigStore, StoreError};

/// Everything the control loop and the report handlers share
///
/// Owned by [`Device`]; handlers borrow it mutably for the duration of one
/// report, so a tick never observes a half-applied configuration.
pub struct DeviceState<H: Hal> {
    hal: H,
    board: Board,
    store: ConfigStore,
    config: Configuration,
    pad: Pad,
    lights: Lights,
    debug: DebugLog,
    selected_light_rule: usize,
    selected_led_mapping: usize,
    selected_sensor: usize,
    reconnects: u32,
}

impl<H: Hal> DeviceState<H> {
    /// Load the stored configuration (or defaults) and bring up the engines
    pub fn boot(board: Board, mut hal: H) -> Self {
        let store = ConfigStore::new(board);
        let config = store.load(&mut hal).unwrap_or_else(|e| {
            warn!("Configuration storage unavailable, using defaults: {}", e);
            board.default_config()
        });

        let mut lights = Lights::new(board.led_count());
        lights.setup(&mut hal);
        info!(
            "Booted {} with configuration '{}'",
            board.board_type(),
            config.name
        );

        Self {
            hal,
            board,
            store,
            config,
            pad: Pad::new(board.sensor_count()),
            lights,
            debug: DebugLog::new(),
            selected_light_rule: 0,
            selected_led_mapping: 0,
            selected_sensor: 0,
            reconnects: 0,
        }
    }

    /// One control-loop iteration: sample, debounce, light
    pub fn tick(&mut self) {
        self.lights.data_cycle(&mut self.hal);
        self.pad.update(&mut self.hal, &self.config.sensors);
        self.lights.update(&mut self.hal, &self.config, &self.pad);
    }

    /// Replace the live configuration and reset derived state
    pub fn apply_config(&mut self, config: Configuration) {
        self.config = config;
        self.pad.reset();
        self.lights.clear_manual();
    }

    /// Re-read the configuration from storage, as after a power cycle
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let config = self.store.load(&mut self.hal)?;
        self.apply_config(config);
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), StoreError> {
        self.store.save(&mut self.hal, &self.config)
    }

    /// Restore and persist defaults, apply them and reconnect the host
    pub fn factory_reset(&mut self) -> Result<(), StoreError> {
        let defaults = self.store.factory_reset(&mut self.hal)?;
        self.apply_config(defaults);
        self.reconnect();
        Ok(())
    }

    /// Drop and re-enumerate the USB connection
    pub fn reconnect(&mut self) {
        self.reconnects += 1;
        info!("USB reconnect #{}", self.reconnects);
    }

    pub fn log(&mut self, message: &str) {
        self.debug.write(message);
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    pub fn pad(&self) -> &Pad {
        &self.pad
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut Lights {
        &mut self.lights
    }

    pub fn debug_log(&mut self) -> &mut DebugLog {
        &mut self.debug
    }

    pub fn selected_light_rule(&self) -> usize {
        self.selected_light_rule
    }

    pub fn selected_led_mapping(&self) -> usize {
        self.selected_led_mapping
    }

    pub fn selected_sensor(&self) -> usize {
        self.selected_sensor
    }

    pub(crate) fn select_light_rule(&mut self, index: usize) {
        self.selected_light_rule = index;
    }

    pub(crate) fn select_led_mapping(&mut self, index: usize) {
        self.selected_led_mapping = index;
    }

    pub(crate) fn select_sensor(&mut self, index: usize) {
        self.selected_sensor = index;
    }

    /// Times the host connection was dropped by a factory reset
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }
}

/// A booted pad: live state plus the report handlers that serve it
pub struct Device<H: Hal> {
    registry: Registry<DeviceState<H>>,
    state: DeviceState<H>,
}

impl<H: Hal + 'static> Device<H> {
    pub fn new(board: Board, hal: H) -> Self {
        Self {
            registry: reports::registry(board),
            state: DeviceState::boot(board, hal),
        }
    }

    /// Serialize report `id` for the host (payload without the ID byte)
    pub fn create_report(&mut self, id: u8) -> Result<Vec<u8>, DispatchError> {
        let result = self.registry.write_report(&mut self.state, id);
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    /// Apply a report payload received from the host
    pub fn process_report(&mut self, id: u8, data: &[u8]) -> Result<(), DispatchError> {
        let result = self.registry.process_report(&mut self.state, id, data);
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    fn record_failure(&mut self, error: &DispatchError) {
        warn!("Report dispatch failed: {}", error);
        self.state.log(&format!("{}\n", error));
    }

    pub fn descriptor(&self) -> &[u8] {
        self.registry.descriptor()
    }

    pub fn registry(&self) -> &Registry<DeviceState<H>> {
        &self.registry
    }

    pub fn tick(&mut self) {
        self.state.tick();
    }

    /// Power-cycle: keep the storage, forget everything live
    pub fn reboot(&mut self) -> Result<(), StoreError> {
        debug!("Rebooting {}", self.state.board.board_type());
        self.state.reload()?;
        self.state.lights.setup(&mut self.state.hal);
        self.state.selected_light_rule = 0;
        self.state.selected_led_mapping = 0;
        self.state.selected_sensor = 0;
        Ok(())
    }

    pub fn state(&self) -> &DeviceState<H> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DeviceState<H> {
        &mut self.state
    }
}
