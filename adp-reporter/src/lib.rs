//! Typed host-side access to a pad's reports
//!
//! [`Reporter`] wraps any [`Transport`](adp_transport::Transport) and issues
//! the report reads and writes a configuration tool needs. Answers the device
//! cannot give (timeouts, rejections, malformed or mismatched responses) come
//! back as `None` or `false`; only a dead binding is an error.

pub mod error;

pub use error::ReporterError;

use adp_transport::protocol::{
    feature, BUTTON_COUNT, MAX_LED_MAPPINGS, MAX_LIGHT_RULES, MAX_NAME_SIZE, SENSOR_COUNT_V1,
};
use adp_transport::{
    BoxedTransport, DebugReport, FactoryResetReport, IdentificationReport,
    IdentificationV2Report, InputReport, LedMapping, LedMappingReport, LightRule,
    LightRuleReport, LightsReport, NameReport, PadConfigurationReport, Report, ResetReport, Rgb,
    SaveConfigurationReport, SensorConfig, SensorReport, SetPropertyReport, TransportError,
    TransportExt,
};
use tracing::{debug, warn};

/// Max sensor value assumed for pads that predate the Identification report
pub const LEGACY_MAX_SENSOR_VALUE: u16 = 850;

/// First firmware that answers Identification v2
const IDENTIFICATION_V2_SINCE: (u16, u16) = (1, 3);

/// Upper bound on Debug reads per drain
const MAX_DEBUG_PACKETS: usize = 64;

/// Everything read from a pad when it connects
#[derive(Debug, Clone, PartialEq)]
pub struct PadSnapshot {
    pub identification: IdentificationV2Report,
    pub name: String,
    pub pad_configuration: PadConfigurationReport,
    pub sensors: Vec<SensorConfig>,
    /// Enabled rules only, with their index
    pub light_rules: Vec<(u8, LightRule)>,
    /// Enabled mappings only, with their index
    pub led_mappings: Vec<(u8, LedMapping)>,
}

/// Turn a transport result into "data or no data", keeping disconnects fatal
fn no_data_on_failure<T>(
    what: &str,
    result: Result<T, TransportError>,
) -> Result<Option<T>, ReporterError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(
            e @ (TransportError::Timeout
            | TransportError::UnmatchedResponse { .. }
            | TransportError::Rejected(_)
            | TransportError::Malformed(_)),
        ) => {
            debug!("{} :: no data ({})", what, e);
            Ok(None)
        }
        Err(e) => {
            warn!("{} :: failed ({})", what, e);
            Err(e.into())
        }
    }
}

/// High-level pad interface using any transport
pub struct Reporter {
    transport: BoxedTransport,
}

impl Reporter {
    pub fn new(transport: BoxedTransport) -> Self {
        Self { transport }
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    async fn get<R: Report + Send>(&self) -> Result<Option<R>, ReporterError> {
        let what = adp_transport::protocol::report_id::name(R::ID);
        no_data_on_failure(what, self.transport.get_report::<R>().await)
    }

    async fn send<R: Report + Sync>(&self, report: &R) -> Result<bool, ReporterError> {
        let what = adp_transport::protocol::report_id::name(R::ID);
        let sent = no_data_on_failure(what, self.transport.send_report(report).await)?;
        Ok(sent.is_some())
    }

    async fn write<R: Report + Sync>(&self, report: &R) -> Result<bool, ReporterError> {
        let what = adp_transport::protocol::report_id::name(R::ID);
        let sent = no_data_on_failure(what, self.transport.write_report(report).await)?;
        Ok(sent.is_some())
    }

    // === Identification ===

    pub async fn get_identification(&self) -> Result<Option<IdentificationReport>, ReporterError> {
        self.get().await
    }

    pub async fn get_identification_v2(
        &self,
    ) -> Result<Option<IdentificationV2Report>, ReporterError> {
        self.get().await
    }

    /// Identify the pad, falling back for older firmware
    ///
    /// Pads without an Identification report are assumed to be legacy
    /// 12-sensor boards; pads older than 1.3 report no features.
    pub async fn identify(&self) -> Result<IdentificationV2Report, ReporterError> {
        let Some(v1) = self.get_identification().await? else {
            return Ok(IdentificationV2Report {
                identification: IdentificationReport {
                    firmware_version_major: 0,
                    firmware_version_minor: 0,
                    button_count: BUTTON_COUNT as u8,
                    sensor_count: SENSOR_COUNT_V1 as u8,
                    led_count: 0,
                    max_sensor_value: LEGACY_MAX_SENSOR_VALUE,
                    board_type: "unknown".to_string(),
                },
                features: 0,
            });
        };

        let version = (v1.firmware_version_major, v1.firmware_version_minor);
        if version >= IDENTIFICATION_V2_SINCE {
            if let Some(v2) = self.get_identification_v2().await? {
                return Ok(v2);
            }
        }
        Ok(IdentificationV2Report {
            identification: v1,
            features: 0,
        })
    }

    // === Name ===

    pub async fn get_name(&self) -> Result<Option<String>, ReporterError> {
        Ok(self.get::<NameReport>().await?.map(|r| r.name))
    }

    pub async fn set_name(&self, name: &str) -> Result<bool, ReporterError> {
        if name.len() > MAX_NAME_SIZE {
            return Err(ReporterError::InvalidParameter(format!(
                "name is {} bytes, at most {} allowed",
                name.len(),
                MAX_NAME_SIZE
            )));
        }
        self.send(&NameReport::new(name)).await
    }

    // === Sensors ===

    pub async fn get_pad_configuration(
        &self,
    ) -> Result<Option<PadConfigurationReport>, ReporterError> {
        self.get().await
    }

    pub async fn set_pad_configuration(
        &self,
        report: &PadConfigurationReport,
    ) -> Result<bool, ReporterError> {
        self.send(report).await
    }

    /// Read the configuration of sensor `index`
    ///
    /// `None` when the pad did not accept the selection.
    pub async fn get_sensor(&self, index: u8) -> Result<Option<SensorConfig>, ReporterError> {
        if !self.send(&SetPropertyReport::select_sensor(index)).await? {
            return Ok(None);
        }
        let report = self.get::<SensorReport>().await?;
        Ok(report.filter(|r| r.index == index).map(|r| r.sensor))
    }

    /// Read sensors `0..count`, stopping at the first one the pad does not answer
    pub async fn get_sensors(&self, count: u8) -> Result<Vec<SensorConfig>, ReporterError> {
        let mut sensors = Vec::with_capacity(usize::from(count));
        for index in 0..count {
            match self.get_sensor(index).await? {
                Some(sensor) => sensors.push(sensor),
                None => break,
            }
        }
        Ok(sensors)
    }

    /// Write the configuration of sensor `index` (calibration preload is not sent)
    pub async fn set_sensor(&self, index: u8, sensor: SensorConfig) -> Result<bool, ReporterError> {
        self.send(&SensorReport { index, sensor }).await
    }

    /// Poll one Input report; `None` when nothing arrived
    pub async fn read_input(&self) -> Result<Option<InputReport>, ReporterError> {
        no_data_on_failure("INPUT", self.transport.read_report::<InputReport>().await)
    }

    // === Lights ===

    pub async fn get_light_rule(&self, index: u8) -> Result<Option<LightRule>, ReporterError> {
        check_index("light rule", index, MAX_LIGHT_RULES)?;
        if !self.send(&SetPropertyReport::select_light_rule(index)).await? {
            return Ok(None);
        }
        let report = self.get::<LightRuleReport>().await?;
        Ok(report.filter(|r| r.index == index).map(|r| r.rule))
    }

    pub async fn set_light_rule(&self, index: u8, rule: LightRule) -> Result<bool, ReporterError> {
        check_index("light rule", index, MAX_LIGHT_RULES)?;
        self.send(&LightRuleReport { index, rule }).await
    }

    pub async fn get_led_mapping(&self, index: u8) -> Result<Option<LedMapping>, ReporterError> {
        check_index("LED mapping", index, MAX_LED_MAPPINGS)?;
        if !self.send(&SetPropertyReport::select_led_mapping(index)).await? {
            return Ok(None);
        }
        let report = self.get::<LedMappingReport>().await?;
        Ok(report.filter(|r| r.index == index).map(|r| r.mapping))
    }

    pub async fn set_led_mapping(
        &self,
        index: u8,
        mapping: LedMapping,
    ) -> Result<bool, ReporterError> {
        check_index("LED mapping", index, MAX_LED_MAPPINGS)?;
        self.send(&LedMappingReport { index, mapping }).await
    }

    /// Override the colors of enabled LED mappings until the next rule change
    pub async fn set_lights(&self, colors: [Rgb; MAX_LED_MAPPINGS]) -> Result<bool, ReporterError> {
        self.send(&LightsReport { colors }).await
    }

    // === Device commands ===

    pub async fn save_configuration(&self) -> Result<bool, ReporterError> {
        self.write(&SaveConfigurationReport).await
    }

    /// Restore defaults; the pad reconnects afterwards
    pub async fn factory_reset(&self) -> Result<bool, ReporterError> {
        self.write(&FactoryResetReport).await
    }

    /// Reboot into the bootloader; the pad disappears afterwards
    pub async fn reset(&self) -> Result<bool, ReporterError> {
        self.write(&ResetReport).await
    }

    /// Drain the pad's debug text
    pub async fn read_debug(&self) -> Result<String, ReporterError> {
        let mut packets = Vec::new();
        for _ in 0..MAX_DEBUG_PACKETS {
            match self.get::<DebugReport>().await? {
                Some(packet) if !packet.message.is_empty() => packets.push(packet),
                _ => break,
            }
        }
        Ok(DebugReport::join(&packets))
    }

    // === Connect ===

    /// Read the full pad state the way a configuration tool does on connect
    ///
    /// `None` when the pad does not answer Name or PadConfiguration, which
    /// every supported firmware does.
    pub async fn read_snapshot(&self) -> Result<Option<PadSnapshot>, ReporterError> {
        let Some(name) = self.get_name().await? else {
            return Ok(None);
        };
        let Some(pad_configuration) = self.get_pad_configuration().await? else {
            return Ok(None);
        };
        let identification = self.identify().await?;
        let sensors = self
            .get_sensors(identification.identification.sensor_count)
            .await?;

        let mut light_rules = Vec::new();
        let mut led_mappings = Vec::new();
        let has_lights = identification.identification.led_count > 0
            || identification.has_feature(feature::LIGHTS);
        if has_lights {
            for index in 0..MAX_LIGHT_RULES as u8 {
                if let Some(rule) = self.get_light_rule(index).await? {
                    if rule.enabled {
                        light_rules.push((index, rule));
                    }
                }
            }
            for index in 0..MAX_LED_MAPPINGS as u8 {
                if let Some(mapping) = self.get_led_mapping(index).await? {
                    if mapping.enabled {
                        led_mappings.push((index, mapping));
                    }
                }
            }
        }

        Ok(Some(PadSnapshot {
            identification,
            name,
            pad_configuration,
            sensors,
            light_rules,
            led_mappings,
        }))
    }
}

fn check_index(what: &str, index: u8, count: usize) -> Result<(), ReporterError> {
    if usize::from(index) < count {
        Ok(())
    } else {
        Err(ReporterError::InvalidParameter(format!(
            "{} index {} out of range (0..{})",
            what, index, count
        )))
    }
}
