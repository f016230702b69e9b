//! Lighting engine: sensor state to LED strip colors
//!
//! Every enabled LED mapping paints its LED range from one light rule, driven
//! by one sensor. The frame buffer persists between passes, so ranges not
//! painted in a pass keep their previous color. The strip is committed once
//! per pass, only when something was painted.

use adp_transport::protocol::{MAX_LED_MAPPINGS, MAX_LIGHT_RULES};
use adp_transport::{LedMapping, LightRule, Rgb};
use tracing::debug;

use crate::config::Configuration;
use crate::hal::{Hal, HwLed};
use crate::pad::Pad;

/// Control ticks between two lighting passes (1: every tick)
pub const LED_UPDATE_INTERVAL: u16 = 1;

/// Ticks in one blink period of the data LED
const DATA_CYCLE_TICKS: u16 = 100;

/// Integer linear mapping, `out_min` when the input range is empty
pub fn map(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_min == in_max {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Per-channel interpolation between two colors, `x` clamped to the input range
fn fade(x: u32, in_min: u32, in_max: u32, from: Rgb, to: Rgb) -> Rgb {
    let x = x.clamp(in_min, in_max) as i32;
    let (lo, hi) = (in_min as i32, in_max as i32);
    let channel =
        |a: u8, b: u8| map(x, lo, hi, i32::from(a), i32::from(b)).clamp(0, 255) as u8;
    Rgb::new(
        channel(from.r, to.r),
        channel(from.g, to.g),
        channel(from.b, to.b),
    )
}

/// Color of a rule for one sensor reading
pub fn calc_color(rule: &LightRule, triggered: bool, value: u16, threshold: u16) -> Rgb {
    let value = u32::from(value);
    let threshold = u32::from(threshold);

    match (triggered, rule.fade_on, rule.fade_off) {
        (true, true, _) => {
            let full = threshold * 2;
            if value > full {
                rule.on_fade_color
            } else {
                fade(value, threshold, full, rule.on_color, rule.on_fade_color)
            }
        }
        (true, false, _) => rule.on_color,
        (false, _, true) => fade(value, 0, threshold, rule.off_color, rule.off_fade_color),
        (false, _, false) => rule.off_color,
    }
}

/// LED frame buffer plus the lighting timers
#[derive(Debug, Clone)]
pub struct Lights {
    leds: Vec<Rgb>,
    update_interval: u16,
    led_timer: u16,
    data_cycle: u16,
    /// Manual color per LED mapping, set by the Lights report
    manual: Option<[Rgb; MAX_LED_MAPPINGS]>,
}

impl Lights {
    pub fn new(led_count: usize) -> Self {
        Self::with_interval(led_count, LED_UPDATE_INTERVAL)
    }

    pub fn with_interval(led_count: usize, update_interval: u16) -> Self {
        Self {
            leds: vec![Rgb::BLACK; led_count],
            update_interval: update_interval.max(1),
            led_timer: 0,
            data_cycle: 0,
            manual: None,
        }
    }

    pub fn setup<H: Hal>(&mut self, hal: &mut H) {
        hal.set_hw_led(HwLed::Power, true);
    }

    /// Frame buffer as last painted
    pub fn leds(&self) -> &[Rgb] {
        &self.leds
    }

    pub fn is_manual(&self) -> bool {
        self.manual.is_some()
    }

    /// Override enabled mappings with fixed colors
    pub fn set_manual(&mut self, colors: [Rgb; MAX_LED_MAPPINGS]) {
        self.manual = Some(colors);
    }

    /// Return to rule-driven colors
    pub fn clear_manual(&mut self) {
        if self.manual.take().is_some() {
            debug!("Lights back to rule-driven mode");
        }
    }

    /// Blink the data LED: on for half of each cycle
    pub fn data_cycle<H: Hal>(&mut self, hal: &mut H) {
        if self.data_cycle == 0 {
            hal.set_hw_led(HwLed::Data, true);
            self.data_cycle = DATA_CYCLE_TICKS;
            return;
        }
        if self.data_cycle == DATA_CYCLE_TICKS / 2 {
            hal.set_hw_led(HwLed::Data, false);
        }
        self.data_cycle -= 1;
    }

    /// Run one lighting pass if the update interval elapsed
    ///
    /// Returns whether the strip was committed.
    pub fn update<H: Hal>(&mut self, hal: &mut H, config: &Configuration, pad: &Pad) -> bool {
        if self.led_timer > 0 {
            self.led_timer -= 1;
            return false;
        }
        self.led_timer = self.update_interval - 1;

        let mut painted = false;
        for (index, mapping) in config.led_mappings.iter().enumerate() {
            let Some(range) = self.paint_range(mapping, config.sensors.len()) else {
                continue;
            };

            let color = match &self.manual {
                Some(colors) => colors[index],
                None => {
                    let rule = &config.light_rules[usize::from(mapping.light_rule_index)];
                    if !rule.enabled {
                        continue;
                    }
                    let sensor = usize::from(mapping.sensor_index);
                    calc_color(
                        rule,
                        pad.sensor_state(sensor),
                        pad.sensor_value(sensor),
                        config.sensors[sensor].threshold,
                    )
                }
            };

            self.leds[range].fill(color);
            painted = true;
        }

        if painted {
            for (i, &color) in self.leds.iter().enumerate() {
                hal.set_led(i, color);
            }
            hal.commit_leds();
        }
        painted
    }

    /// LED range a mapping may paint, `None` for disabled or invalid mappings
    fn paint_range(
        &self,
        mapping: &LedMapping,
        sensor_count: usize,
    ) -> Option<std::ops::Range<usize>> {
        if !mapping.enabled
            || usize::from(mapping.light_rule_index) >= MAX_LIGHT_RULES
            || usize::from(mapping.sensor_index) >= sensor_count
        {
            return None;
        }
        let begin = usize::from(mapping.led_index_begin);
        let end = usize::from(mapping.led_index_end).min(self.leds.len());
        (begin < end).then_some(begin..end)
    }
}
