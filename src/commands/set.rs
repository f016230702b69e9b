//! Setting command handlers.

use adp_transport::protocol::sensor_flags;
use adp_transport::{LedMapping, LightRule, Rgb, SensorConfig};
use tracing::warn;

use super::{CommandResult, Context};

/// Requested changes to one sensor
#[derive(Debug, Default, Clone, Copy)]
pub struct SensorChange {
    pub threshold: Option<u16>,
    pub release: Option<u16>,
    pub button: Option<i8>,
    pub disable: Option<bool>,
}

impl SensorChange {
    fn is_empty(&self) -> bool {
        self.threshold.is_none()
            && self.release.is_none()
            && self.button.is_none()
            && self.disable.is_none()
    }

    fn apply(&self, sensor: &mut SensorConfig) {
        if let Some(threshold) = self.threshold {
            sensor.threshold = threshold;
        }
        if let Some(release) = self.release {
            sensor.release_threshold = release;
        }
        if let Some(button) = self.button {
            sensor.button_mapping = button;
        }
        match self.disable {
            Some(true) => sensor.flags |= sensor_flags::ADC_DISABLED,
            Some(false) => sensor.flags &= !sensor_flags::ADC_DISABLED,
            None => {}
        }
    }
}

/// Change one sensor's settings (not persisted until `save`)
pub async fn set_sensor(ctx: &Context, index: u8, change: SensorChange) -> CommandResult {
    if change.is_empty() {
        anyhow::bail!("nothing to change; pass --threshold, --release, --button or --disable");
    }
    let (_connection, reporter) = ctx.reporter().await?;
    let Some(mut sensor) = reporter.get_sensor(index).await? else {
        anyhow::bail!("sensor {index} is not available on this pad");
    };

    change.apply(&mut sensor);
    if sensor.release_threshold > sensor.threshold {
        warn!(
            "Release threshold {} above threshold {}: sensor {} will never release",
            sensor.release_threshold, sensor.threshold, index
        );
    }
    if !reporter.set_sensor(index, sensor).await? {
        anyhow::bail!("pad rejected the sensor update");
    }
    println!(
        "Sensor {index}: threshold {} release {} (run `adp save` to persist)",
        sensor.threshold, sensor.release_threshold
    );
    Ok(())
}

/// Parse `#RRGGBB` or `RRGGBB`
pub fn parse_color(s: &str) -> Result<Rgb, String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("invalid color '{s}' (expected #RRGGBB)"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| format!("invalid color '{s}' (expected #RRGGBB)"))
    };
    Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Requested changes to one light rule; the rule is enabled unless `disable`
#[derive(Debug, Default, Clone, Copy)]
pub struct LightRuleChange {
    pub on: Option<Rgb>,
    pub off: Option<Rgb>,
    pub on_fade: Option<Rgb>,
    pub off_fade: Option<Rgb>,
    pub fade_on: Option<bool>,
    pub fade_off: Option<bool>,
    pub disable: bool,
}

impl LightRuleChange {
    fn apply(&self, rule: &mut LightRule) {
        rule.enabled = !self.disable;
        if let Some(c) = self.on {
            rule.on_color = c;
        }
        if let Some(c) = self.off {
            rule.off_color = c;
        }
        if let Some(c) = self.on_fade {
            rule.on_fade_color = c;
        }
        if let Some(c) = self.off_fade {
            rule.off_fade_color = c;
        }
        if let Some(fade) = self.fade_on {
            rule.fade_on = fade;
        }
        if let Some(fade) = self.fade_off {
            rule.fade_off = fade;
        }
    }
}

/// Requested changes to one LED mapping; the mapping is enabled unless `disable`
#[derive(Debug, Default, Clone, Copy)]
pub struct LedMappingChange {
    pub rule: Option<u8>,
    pub sensor: Option<u8>,
    pub begin: Option<u8>,
    pub end: Option<u8>,
    pub disable: bool,
}

impl LedMappingChange {
    fn apply(&self, mapping: &mut LedMapping) {
        mapping.enabled = !self.disable;
        if let Some(rule) = self.rule {
            mapping.light_rule_index = rule;
        }
        if let Some(sensor) = self.sensor {
            mapping.sensor_index = sensor;
        }
        if let Some(begin) = self.begin {
            mapping.led_index_begin = begin;
        }
        if let Some(end) = self.end {
            mapping.led_index_end = end;
        }
    }
}

/// Enable, edit or disable one light rule (not persisted until `save`)
pub async fn set_light_rule(
    ctx: &Context,
    index: u8,
    change: LightRuleChange,
) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let Some(mut rule) = reporter.get_light_rule(index).await? else {
        anyhow::bail!("light rule {index} is not available on this pad");
    };

    change.apply(&mut rule);
    if !reporter.set_light_rule(index, rule).await? {
        anyhow::bail!("pad rejected the light rule update");
    }
    if rule.enabled {
        println!(
            "Light rule {index}: on {} off {} (run `adp save` to persist)",
            super::query::hex_color(rule.on_color),
            super::query::hex_color(rule.off_color)
        );
    } else {
        println!("Light rule {index} disabled (run `adp save` to persist)");
    }
    Ok(())
}

/// Enable, edit or disable one LED mapping (not persisted until `save`)
pub async fn set_led_mapping(
    ctx: &Context,
    index: u8,
    change: LedMappingChange,
) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let Some(mut mapping) = reporter.get_led_mapping(index).await? else {
        anyhow::bail!("LED mapping {index} is not available on this pad");
    };

    change.apply(&mut mapping);
    if mapping.enabled && mapping.led_index_begin >= mapping.led_index_end {
        warn!(
            "LED range {}..{} is empty: mapping {} lights nothing",
            mapping.led_index_begin, mapping.led_index_end, index
        );
    }
    if !reporter.set_led_mapping(index, mapping).await? {
        anyhow::bail!("pad rejected the LED mapping update");
    }
    if mapping.enabled {
        println!(
            "LED mapping {index}: sensor {} rule {} LEDs {}..{} (run `adp save` to persist)",
            mapping.sensor_index,
            mapping.light_rule_index,
            mapping.led_index_begin,
            mapping.led_index_end
        );
    } else {
        println!("LED mapping {index} disabled (run `adp save` to persist)");
    }
    Ok(())
}

/// Show or change the pad name
pub async fn name(ctx: &Context, name: Option<String>) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    match name {
        None => match reporter.get_name().await? {
            Some(name) => println!("{name}"),
            None => println!("(pad does not report a name)"),
        },
        Some(name) => {
            if !reporter.set_name(&name).await? {
                anyhow::bail!("pad rejected the name");
            }
            println!("Name set to {name:?} (run `adp save` to persist)");
        }
    }
    Ok(())
}

pub async fn save(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    if !reporter.save_configuration().await? {
        anyhow::bail!("pad rejected SaveConfiguration");
    }
    println!("Configuration saved");
    Ok(())
}

pub async fn factory_reset(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    if !reporter.factory_reset().await? {
        anyhow::bail!("pad rejected FactoryReset");
    }
    println!("Factory defaults restored and saved");
    Ok(())
}

/// Reboot into the bootloader
pub async fn bootloader(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    if !reporter.reset().await? {
        anyhow::bail!("pad rejected Reset");
    }
    println!("Pad is rebooting into its bootloader");
    Ok(())
}
