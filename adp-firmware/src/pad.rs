//! Input state engine: raw sensor readings to debounced button states
//!
//! Each button is pressed when any sensor mapped to it satisfies its own
//! condition: `value > threshold` while the button is released,
//! `value > release_threshold` while it is held.

use adp_transport::protocol::BUTTON_COUNT;
use adp_transport::{InputReport, SensorConfig};

use crate::hal::Hal;

/// Live button and sensor state
#[derive(Debug, Clone)]
pub struct Pad {
    /// Bit `b` set while button `b` is pressed
    buttons: u16,
    sensor_values: Vec<u16>,
    /// Whether each sensor currently satisfies its own press/hold condition
    sensor_states: Vec<bool>,
}

impl Pad {
    pub fn new(sensor_count: usize) -> Self {
        Self {
            buttons: 0,
            sensor_values: vec![0; sensor_count],
            sensor_states: vec![false; sensor_count],
        }
    }

    /// Sample every sensor and recompute the button states
    pub fn update<H: Hal>(&mut self, hal: &mut H, sensors: &[SensorConfig]) {
        for (i, value) in self.sensor_values.iter_mut().enumerate() {
            let disabled = sensors.get(i).is_some_and(|s| s.is_adc_disabled());
            *value = if disabled { 0 } else { hal.read_sensor(i) };
        }
        self.apply(sensors);
    }

    /// Recompute button states from the current readings
    fn apply(&mut self, sensors: &[SensorConfig]) {
        let mut buttons = 0u16;

        for (i, config) in sensors.iter().enumerate().take(self.sensor_values.len()) {
            let Some(button) = config.mapped_button().filter(|&b| b < BUTTON_COUNT) else {
                self.sensor_states[i] = false;
                continue;
            };

            let value = self.sensor_values[i];
            let held = self.buttons & (1 << button) != 0;
            let triggered = if held {
                value > config.release_threshold
            } else {
                value > config.threshold
            };

            self.sensor_states[i] = triggered;
            if triggered {
                buttons |= 1 << button;
            }
        }

        self.buttons = buttons;
    }

    pub fn buttons(&self) -> u16 {
        self.buttons
    }

    pub fn is_pressed(&self, button: usize) -> bool {
        button < BUTTON_COUNT && self.buttons & (1 << button) != 0
    }

    pub fn sensor_values(&self) -> &[u16] {
        &self.sensor_values
    }

    pub fn sensor_value(&self, index: usize) -> u16 {
        self.sensor_values.get(index).copied().unwrap_or(0)
    }

    pub fn sensor_state(&self, index: usize) -> bool {
        self.sensor_states.get(index).copied().unwrap_or(false)
    }

    /// Snapshot for the Input report
    pub fn input_report(&self) -> InputReport {
        InputReport {
            buttons: self.buttons,
            sensor_values: self.sensor_values.clone(),
        }
    }

    /// Forget pressed state, e.g. after the configuration was replaced
    pub fn reset(&mut self) {
        self.buttons = 0;
        self.sensor_states.fill(false);
    }
}
