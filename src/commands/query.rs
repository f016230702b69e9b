//! Query (read-only) command handlers.

use std::time::Duration;

use adp_transport::protocol::{feature, MAX_LED_MAPPINGS, MAX_LIGHT_RULES};
use adp_transport::{Rgb, SensorConfig};
use serde_json::json;

use super::{CommandResult, Context};

const FEATURE_NAMES: &[(u16, &str)] = &[
    (feature::DEBUG, "debug"),
    (feature::DIGIPOT, "digipot"),
    (feature::LIGHTS, "lights"),
    (feature::WEBSERVER, "webserver"),
    (feature::RTOS, "rtos"),
];

fn feature_names(features: u16) -> Vec<&'static str> {
    FEATURE_NAMES
        .iter()
        .filter(|(bit, _)| features & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}

pub fn hex_color(c: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}

fn button_label(sensor: &SensorConfig) -> String {
    match sensor.mapped_button() {
        Some(button) => button.to_string(),
        None => "-".to_string(),
    }
}

/// Show identification, name and capabilities
pub async fn info(ctx: &Context) -> CommandResult {
    let (connection, reporter) = ctx.reporter().await?;
    let dev = connection.transport.device_info();
    println!(
        "Device: {} VID={:04X} PID={:04X} ({})",
        dev.transport_type, dev.vid, dev.pid, dev.device_path
    );

    let id = reporter.identify().await?;
    let v1 = &id.identification;
    let name = reporter.get_name().await?.unwrap_or_default();
    let features = feature_names(id.features);

    println!("Name:      {name}");
    println!("Board:     {}", v1.board_type);
    println!(
        "Firmware:  v{}.{}",
        v1.firmware_version_major, v1.firmware_version_minor
    );
    println!(
        "Buttons:   {}  Sensors: {}  LEDs: {}",
        v1.button_count, v1.sensor_count, v1.led_count
    );
    println!("Max value: {}", v1.max_sensor_value);
    if features.is_empty() {
        println!("Features:  none");
    } else {
        println!("Features:  {}", features.join(", "));
    }
    Ok(())
}

/// List sensor thresholds and button mapping
pub async fn sensors(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let id = reporter.identify().await?;
    let sensors = reporter
        .get_sensors(id.identification.sensor_count)
        .await?;

    println!(" #  threshold  release  button  resistor  adc");
    for (index, sensor) in sensors.iter().enumerate() {
        println!(
            "{:>2}  {:>9}  {:>7}  {:>6}  {:>8}  {}",
            index,
            sensor.threshold,
            sensor.release_threshold,
            button_label(sensor),
            sensor.resistor_value,
            if sensor.is_adc_disabled() { "off" } else { "on" }
        );
    }
    if sensors.is_empty() {
        println!("(pad does not answer Sensor reports)");
    }
    Ok(())
}

/// Show light rules and LED mappings
pub async fn lights(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let id = reporter.identify().await?;
    if id.identification.led_count == 0 && !id.has_feature(feature::LIGHTS) {
        println!("Pad has no lights");
        return Ok(());
    }

    println!("Light rules:");
    for index in 0..MAX_LIGHT_RULES as u8 {
        let Some(rule) = reporter.get_light_rule(index).await? else {
            continue;
        };
        if !rule.enabled {
            continue;
        }
        println!(
            "  {:>2}: on {} off {}{}{}",
            index,
            hex_color(rule.on_color),
            hex_color(rule.off_color),
            if rule.fade_on {
                format!(" fade-on {}", hex_color(rule.on_fade_color))
            } else {
                String::new()
            },
            if rule.fade_off {
                format!(" fade-off {}", hex_color(rule.off_fade_color))
            } else {
                String::new()
            },
        );
    }

    println!("LED mappings:");
    for index in 0..MAX_LED_MAPPINGS as u8 {
        let Some(mapping) = reporter.get_led_mapping(index).await? else {
            continue;
        };
        if mapping.enabled {
            println!(
                "  {:>2}: LEDs {}..{} follow sensor {} with rule {}",
                index,
                mapping.led_index_begin,
                mapping.led_index_end,
                mapping.sensor_index,
                mapping.light_rule_index
            );
        }
    }
    Ok(())
}

/// Read the input report once, or keep polling
pub async fn input(ctx: &Context, watch: bool, interval_ms: u64) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        match reporter.read_input().await? {
            Some(input) => {
                let pressed: String = (0..16)
                    .map(|b| if input.is_pressed(b) { '#' } else { '.' })
                    .collect();
                let values: Vec<String> = input
                    .sensor_values
                    .iter()
                    .map(|v| format!("{v:>4}"))
                    .collect();
                println!("[{pressed}] {}", values.join(" "));
            }
            None => println!("(no input report)"),
        }
        if !watch {
            break;
        }
    }
    Ok(())
}

/// Drain the pad's debug text buffer
pub async fn debug(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let text = reporter.read_debug().await?;
    if text.is_empty() {
        println!("(debug buffer empty)");
    } else {
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

/// Dump everything a configuration tool reads on connect as JSON
pub async fn dump(ctx: &Context) -> CommandResult {
    let (_connection, reporter) = ctx.reporter().await?;
    let Some(snapshot) = reporter.read_snapshot().await? else {
        anyhow::bail!("pad does not answer Name or PadConfiguration");
    };
    let id = &snapshot.identification.identification;

    let light_rules: Vec<_> = snapshot
        .light_rules
        .iter()
        .map(|(index, rule)| json!({ "index": index, "rule": rule }))
        .collect();
    let led_mappings: Vec<_> = snapshot
        .led_mappings
        .iter()
        .map(|(index, mapping)| json!({ "index": index, "mapping": mapping }))
        .collect();

    let value = json!({
        "name": snapshot.name,
        "board_type": id.board_type,
        "firmware": format!("{}.{}", id.firmware_version_major, id.firmware_version_minor),
        "button_count": id.button_count,
        "sensor_count": id.sensor_count,
        "led_count": id.led_count,
        "max_sensor_value": id.max_sensor_value,
        "features": feature_names(snapshot.identification.features),
        "release_multiplier": snapshot.pad_configuration.release_multiplier,
        "sensors": snapshot.sensors,
        "light_rules": light_rules,
        "led_mappings": led_mappings,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
