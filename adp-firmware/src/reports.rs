//! Report handlers of the pad, lighting and configuration modules

use adp_transport::protocol::{
    feature, property, report_id, MAX_LED_MAPPINGS, MAX_LIGHT_RULES, SENSOR_COUNT_V1,
    UNMAPPED_BUTTON,
};
use adp_transport::{
    DebugReport, FactoryResetReport, IdentificationReport, IdentificationV2Report, InputReport,
    LedMappingReport, LightRuleReport, LightsReport, NameReport, PadConfigurationReport,
    ResetReport, SaveConfigurationReport, SensorConfig, SensorReport, SetPropertyReport,
};
use tracing::{debug, info};

use crate::board::{Board, FIRMWARE_VERSION_MAJOR, FIRMWARE_VERSION_MINOR, MAX_SENSOR_VALUE};
use crate::device::DeviceState;
use crate::hal::Hal;
use crate::registry::{DispatchError, Registry};

/// Registry with every report the board supports
pub fn registry<H: Hal + 'static>(board: Board) -> Registry<DeviceState<H>> {
    let mut registry = Registry::new(board.button_count(), board.sensor_count());
    register_pad_reports(&mut registry, board);
    register_config_reports(&mut registry);
    if board.features() & feature::LIGHTS != 0 {
        register_light_reports(&mut registry);
    }
    registry
}

// =============================================================================
// Pad
// =============================================================================

pub fn register_pad_reports<H: Hal + 'static>(
    registry: &mut Registry<DeviceState<H>>,
    board: Board,
) {
    registry
        .on_write(|state: &mut DeviceState<H>| state.pad().input_report())
        .set_size(report_id::INPUT, InputReport::payload_len(board.sensor_count()))
        .on_write(pad_configuration::<H>)
        .on_process(|state: &mut DeviceState<H>, report: PadConfigurationReport| {
            let sensors = &mut state.config_mut().sensors;
            for (i, sensor) in sensors.iter_mut().take(SENSOR_COUNT_V1).enumerate() {
                let threshold = report.sensor_thresholds[i];
                sensor.threshold = threshold;
                sensor.release_threshold =
                    (f32::from(threshold) * report.release_multiplier) as u16;
                sensor.button_mapping = report.sensor_to_button_mapping[i];
            }
            Ok(())
        })
        .on_write(|state: &mut DeviceState<H>| {
            let index = state.selected_sensor();
            SensorReport {
                index: index as u8,
                sensor: state.config().sensors[index],
            }
        })
        .on_process(|state: &mut DeviceState<H>, report: SensorReport| {
            let index = usize::from(report.index);
            let Some(sensor) = state.config_mut().sensors.get_mut(index) else {
                debug!("Ignoring sensor {} out of range", index);
                return Ok(());
            };
            *sensor = SensorConfig {
                preload: sensor.preload,
                ..report.sensor
            };
            Ok(())
        });
}

/// Legacy view of the first 12 sensors
fn pad_configuration<H: Hal>(state: &mut DeviceState<H>) -> PadConfigurationReport {
    let sensors = &state.config().sensors;
    let mut report = PadConfigurationReport {
        sensor_thresholds: [0; SENSOR_COUNT_V1],
        release_multiplier: 0.0,
        sensor_to_button_mapping: [UNMAPPED_BUTTON; SENSOR_COUNT_V1],
    };
    for (i, sensor) in sensors.iter().take(SENSOR_COUNT_V1).enumerate() {
        report.sensor_thresholds[i] = sensor.threshold;
        report.sensor_to_button_mapping[i] = sensor.button_mapping;
    }
    if let Some(first) = sensors.first().filter(|s| s.threshold != 0) {
        report.release_multiplier =
            f32::from(first.release_threshold) / f32::from(first.threshold);
    }
    report
}

// =============================================================================
// Lights
// =============================================================================

pub fn register_light_reports<H: Hal + 'static>(registry: &mut Registry<DeviceState<H>>) {
    registry
        .on_write(|state: &mut DeviceState<H>| {
            let index = state.selected_light_rule();
            LightRuleReport {
                index: index as u8,
                rule: state.config().light_rules[index],
            }
        })
        .on_process(|state: &mut DeviceState<H>, report: LightRuleReport| {
            let index = usize::from(report.index);
            if index < MAX_LIGHT_RULES {
                state.config_mut().light_rules[index] = report.rule;
                state.lights_mut().clear_manual();
            }
            Ok(())
        })
        .on_write(|state: &mut DeviceState<H>| {
            let index = state.selected_led_mapping();
            LedMappingReport {
                index: index as u8,
                mapping: state.config().led_mappings[index],
            }
        })
        .on_process(|state: &mut DeviceState<H>, report: LedMappingReport| {
            let index = usize::from(report.index);
            if index < MAX_LED_MAPPINGS {
                state.config_mut().led_mappings[index] = report.mapping;
                state.lights_mut().clear_manual();
            }
            Ok(())
        })
        .on_process(|state: &mut DeviceState<H>, report: LightsReport| {
            state.lights_mut().set_manual(report.colors);
            Ok(())
        })
        .suppress(report_id::LIGHTS);
}

// =============================================================================
// Configuration
// =============================================================================

pub fn register_config_reports<H: Hal + 'static>(registry: &mut Registry<DeviceState<H>>) {
    registry
        .on_write(|state: &mut DeviceState<H>| NameReport::new(state.config().name.clone()))
        .on_process(|state: &mut DeviceState<H>, report: NameReport| {
            state.config_mut().name = report.name;
            Ok(())
        })
        .on_write(|state: &mut DeviceState<H>| identification(state.board()))
        .on_write(|state: &mut DeviceState<H>| IdentificationV2Report {
            identification: identification(state.board()),
            features: state.board().features(),
        })
        .on_write(|state: &mut DeviceState<H>| state.debug_log().drain_packet())
        .on_process(set_property::<H>)
        .on_process(|state: &mut DeviceState<H>, _: ResetReport| {
            info!("Entering bootloader");
            state.hal_mut().enter_bootloader();
            Ok(())
        })
        .on_process(|state: &mut DeviceState<H>, _: SaveConfigurationReport| {
            state.save()?;
            info!("Configuration saved");
            Ok(())
        })
        .on_process(|state: &mut DeviceState<H>, _: FactoryResetReport| {
            state.factory_reset()?;
            info!("Factory defaults restored");
            Ok(())
        });
}

fn identification(board: Board) -> IdentificationReport {
    IdentificationReport {
        firmware_version_major: u16::from(FIRMWARE_VERSION_MAJOR),
        firmware_version_minor: u16::from(FIRMWARE_VERSION_MINOR),
        button_count: board.button_count() as u8,
        sensor_count: board.sensor_count() as u8,
        led_count: board.led_count() as u8,
        max_sensor_value: MAX_SENSOR_VALUE,
        board_type: board.board_type().to_string(),
    }
}

/// Out-of-range selections are ignored
fn set_property<H: Hal>(
    state: &mut DeviceState<H>,
    report: SetPropertyReport,
) -> Result<(), DispatchError> {
    let value = report.property_value as usize;
    match report.property_id {
        property::SELECTED_LIGHT_RULE_INDEX if value < MAX_LIGHT_RULES => {
            state.select_light_rule(value)
        }
        property::SELECTED_LED_MAPPING_INDEX if value < MAX_LED_MAPPINGS => {
            state.select_led_mapping(value)
        }
        property::SELECTED_SENSOR_INDEX if value < state.board().sensor_count() => {
            state.select_sensor(value)
        }
        id => debug!("Ignoring property {} = {}", id, report.property_value),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::hal::SimHal;
    use adp_transport::{parse_descriptor, Report, ReportKind, Rgb};

    fn device(board: Board) -> Device<SimHal> {
        Device::new(board, SimHal::new(board.sensor_count(), board.led_count()))
    }

    fn get<R: Report>(dev: &mut Device<SimHal>) -> R {
        R::from_payload(&dev.create_report(R::ID).unwrap()).unwrap()
    }

    fn send<R: Report>(dev: &mut Device<SimHal>, report: &R) {
        dev.process_report(R::ID, &report.to_payload()).unwrap();
    }

    #[test]
    fn test_identification() {
        let mut dev = device(Board::FsrIoV3);
        let id: IdentificationV2Report = get(&mut dev);
        assert_eq!(id.identification.version_string(), "1.5");
        assert_eq!(id.identification.sensor_count, 16);
        assert_eq!(id.identification.led_count, 64);
        assert_eq!(id.identification.max_sensor_value, 1024);
        assert_eq!(id.identification.board_type, "FSRio V3");
        assert!(id.has_feature(feature::LIGHTS));

        let v1: IdentificationReport = get(&mut dev);
        assert_eq!(v1, id.identification);
    }

    #[test]
    fn test_sensor_select_and_write() {
        let mut dev = device(Board::FsrMiniPad);
        dev.state_mut().config_mut().sensors[3].preload = 42;

        send(&mut dev, &SetPropertyReport::select_sensor(3));
        let mut report: SensorReport = get(&mut dev);
        assert_eq!(report.index, 3);

        report.sensor.threshold = 612;
        report.sensor.button_mapping = 7;
        send(&mut dev, &report);

        let stored = dev.state().config().sensors[3];
        assert_eq!(stored.threshold, 612);
        assert_eq!(stored.button_mapping, 7);
        assert_eq!(stored.preload, 42);
    }

    #[test]
    fn test_sensor_write_uses_embedded_index() {
        let mut dev = device(Board::FsrMiniPad);
        send(&mut dev, &SetPropertyReport::select_sensor(1));
        send(
            &mut dev,
            &SensorReport {
                index: 5,
                sensor: SensorConfig {
                    threshold: 700,
                    ..SensorConfig::unmapped()
                },
            },
        );
        assert_eq!(dev.state().config().sensors[5].threshold, 700);
        assert_eq!(dev.state().config().sensors[1].threshold, 400);

        // out of range: accepted, nothing changes
        let before = dev.state().config().clone();
        send(&mut dev, &SensorReport { index: 12, ..SensorReport::default() });
        assert_eq!(dev.state().config(), &before);
    }

    #[test]
    fn test_out_of_range_selection_ignored() {
        let mut dev = device(Board::FsrMiniPad);
        send(&mut dev, &SetPropertyReport::select_sensor(2));
        send(&mut dev, &SetPropertyReport::select_sensor(12));
        send(&mut dev, &SetPropertyReport::select_light_rule(16));
        assert_eq!(dev.state().selected_sensor(), 2);
        assert_eq!(dev.state().selected_light_rule(), 0);
    }

    #[test]
    fn test_pad_configuration() {
        let mut dev = device(Board::FsrMiniPad);
        let report: PadConfigurationReport = get(&mut dev);
        assert_eq!(report.sensor_thresholds, [400; 12]);
        assert!((report.release_multiplier - 0.95).abs() < 1e-6);

        let mut update = report;
        update.sensor_thresholds[0] = 500;
        update.release_multiplier = 0.5;
        update.sensor_to_button_mapping[0] = 9;
        send(&mut dev, &update);

        let sensor = dev.state().config().sensors[0];
        assert_eq!(sensor.threshold, 500);
        assert_eq!(sensor.release_threshold, 250);
        assert_eq!(sensor.button_mapping, 9);
        assert_eq!(dev.state().config().sensors[1].release_threshold, 200);
    }

    #[test]
    fn test_light_rule_and_mapping() {
        let mut dev = device(Board::FsrIoV2);
        send(&mut dev, &SetPropertyReport::select_light_rule(0));
        let mut rule: LightRuleReport = get(&mut dev);
        assert!(rule.rule.enabled);
        rule.index = 4;
        rule.rule.on_color = Rgb::new(1, 2, 3);
        send(&mut dev, &rule);
        assert_eq!(dev.state().config().light_rules[4].on_color, Rgb::new(1, 2, 3));

        send(&mut dev, &SetPropertyReport::select_led_mapping(7));
        let mapping: LedMappingReport = get(&mut dev);
        assert_eq!(mapping.index, 7);
        assert_eq!(mapping.mapping.sensor_index, 7);
    }

    #[test]
    fn test_manual_lights_until_rule_write() {
        let mut dev = device(Board::FsrIoV2);
        let mut colors = LightsReport::default();
        colors.colors[0] = Rgb::new(9, 9, 9);
        send(&mut dev, &colors);
        dev.tick();
        assert_eq!(dev.state().hal().strip()[0], Rgb::new(9, 9, 9));

        let rule = dev.state().config().light_rules[0];
        send(&mut dev, &LightRuleReport { index: 0, rule });
        assert!(!dev.state().lights().is_manual());
        dev.tick();
        assert_eq!(dev.state().hal().strip()[0], rule.off_color);
    }

    #[test]
    fn test_output_reports() {
        let mut dev = device(Board::Leonardo);
        dev.state_mut().config_mut().name = "mine".into();
        send(&mut dev, &SaveConfigurationReport);
        dev.reboot().unwrap();
        assert_eq!(dev.state().config().name, "mine");

        send(&mut dev, &FactoryResetReport);
        assert_eq!(dev.state().config().name, "leonardo");
        assert_eq!(dev.state().reconnects(), 1);
        dev.reboot().unwrap();
        assert_eq!(dev.state().config().name, "leonardo");

        send(&mut dev, &ResetReport);
        assert_eq!(dev.state().hal().bootloader_requests(), 1);
    }

    #[test]
    fn test_debug_report_drains_failures() {
        let mut dev = device(Board::FsrMiniPad);
        assert_eq!(
            dev.process_report(report_id::NAME, &[0; 3]),
            Err(DispatchError::SizeMismatch {
                id: report_id::NAME,
                expected: NameReport::MIN_LEN,
                got: 3
            })
        );
        let packet: DebugReport = get(&mut dev);
        assert!(packet.text().starts_with("Report 0x05 size mismatch"));
    }

    #[test]
    fn test_descriptor_per_board() {
        let dev = device(Board::FsrMiniPad);
        let entries = parse_descriptor(dev.descriptor());
        let ids: Vec<u8> = entries.iter().map(|e| e.report_id).collect();
        assert_eq!(
            ids,
            [
                report_id::INPUT,
                report_id::PAD_CONFIGURATION,
                report_id::RESET,
                report_id::SAVE_CONFIGURATION,
                report_id::NAME,
                report_id::LIGHT_RULE,
                report_id::FACTORY_RESET,
                report_id::IDENTIFICATION,
                report_id::LED_MAPPING,
                report_id::SET_PROPERTY,
                report_id::SENSOR,
                report_id::DEBUG,
                report_id::IDENTIFICATION_V2,
            ]
        );
        assert_eq!(entries[0].kind, ReportKind::Input);
        assert_eq!(entries[0].size, InputReport::payload_len(12));
        // registered but kept out of the descriptor
        assert!(dev.registry().is_registered(report_id::LIGHTS));

        let dev = device(Board::Teensy2);
        let ids: Vec<u8> = parse_descriptor(dev.descriptor())
            .iter()
            .map(|e| e.report_id)
            .collect();
        assert!(!ids.contains(&report_id::LIGHT_RULE));
        assert!(!dev.registry().is_registered(report_id::LIGHTS));
    }
}
