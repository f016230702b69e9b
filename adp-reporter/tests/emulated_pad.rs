//! Reporter against the emulated pad, directly and through both relays.

use std::sync::Arc;
use std::time::Duration;

use adp_firmware::{Board, EmulatedDevice};
use adp_reporter::Reporter;
use adp_transport::protocol::{feature, report_id};
use adp_transport::{
    serve_tcp, serve_ws, BoxedTransport, LedMapping, LightRule, RelayHandle, Rgb, TcpTransport,
    TransportExt, WebSocketTransport,
};

enum Binding {
    Local,
    Tcp,
    WebSocket,
}

/// Reporter plus whatever must stay alive for it to work
struct Harness {
    pad: EmulatedDevice,
    reporter: Reporter,
    _relay: Option<RelayHandle>,
}

async fn harness(board: Board, binding: Binding) -> Harness {
    let pad = EmulatedDevice::new(board);
    let (transport, relay): (BoxedTransport, _) = match binding {
        Binding::Local => (pad.transport(), None),
        Binding::Tcp => {
            let relay = serve_tcp("127.0.0.1:0", pad.transport()).await.unwrap();
            let transport = TcpTransport::connect(relay.local_addr()).await.unwrap();
            (Arc::new(transport) as BoxedTransport, Some(relay))
        }
        Binding::WebSocket => {
            let relay = serve_ws("127.0.0.1:0", pad.transport()).await.unwrap();
            let url = format!("ws://{}/", relay.local_addr());
            let transport = WebSocketTransport::connect(&url).await.unwrap();
            (Arc::new(transport) as BoxedTransport, Some(relay))
        }
    };
    Harness {
        pad,
        reporter: Reporter::new(transport),
        _relay: relay,
    }
}

async fn edit_save_reboot(h: &Harness) {
    let reporter = &h.reporter;
    let mut sensor = reporter.get_sensor(3).await.unwrap().unwrap();
    sensor.threshold = 612;
    sensor.release_threshold = 590;
    assert!(reporter.set_sensor(3, sensor).await.unwrap());
    assert_eq!(reporter.get_sensor(3).await.unwrap().unwrap().threshold, 612);

    assert!(reporter.set_name("Left pad").await.unwrap());
    assert!(reporter.save_configuration().await.unwrap());
    h.pad.reboot().unwrap();

    assert_eq!(reporter.get_sensor(3).await.unwrap(), Some(sensor));
    assert_eq!(reporter.get_name().await.unwrap().as_deref(), Some("Left pad"));
}

#[tokio::test]
async fn test_edit_save_reboot_local() {
    edit_save_reboot(&harness(Board::FsrMiniPad, Binding::Local).await).await;
}

#[tokio::test]
async fn test_edit_save_reboot_tcp() {
    edit_save_reboot(&harness(Board::FsrIoV2, Binding::Tcp).await).await;
}

#[tokio::test]
async fn test_edit_save_reboot_websocket() {
    edit_save_reboot(&harness(Board::FsrIoV3, Binding::WebSocket).await).await;
}

#[tokio::test]
async fn test_snapshot() {
    let h = harness(Board::FsrMiniPad, Binding::Tcp).await;
    let snapshot = h.reporter.read_snapshot().await.unwrap().unwrap();

    assert_eq!(snapshot.name, "FSR Mini pad V1");
    assert_eq!(snapshot.identification.identification.board_type, "fsrminipad");
    assert!(snapshot.identification.has_feature(feature::LIGHTS));
    assert_eq!(snapshot.sensors.len(), 12);
    assert_eq!(snapshot.light_rules.len(), 2);
    assert_eq!(snapshot.led_mappings.len(), 4);
    assert_eq!(snapshot.pad_configuration.sensor_thresholds[0], 400);
}

#[tokio::test]
async fn test_light_rule_write_and_disable() {
    let h = harness(Board::FsrMiniPad, Binding::WebSocket).await;
    let reporter = &h.reporter;
    let unused = reporter.get_light_rule(5).await.unwrap().unwrap();
    assert!(!unused.enabled);

    let rule = LightRule {
        enabled: true,
        fade_on: false,
        fade_off: true,
        on_color: Rgb::new(0x00, 0xFF, 0x40),
        off_color: Rgb::new(0x01, 0x02, 0x03),
        on_fade_color: Rgb::BLACK,
        off_fade_color: Rgb::new(0x00, 0x40, 0x10),
    };
    assert!(reporter.set_light_rule(5, rule).await.unwrap());
    assert_eq!(reporter.get_light_rule(5).await.unwrap(), Some(rule));

    assert!(reporter.save_configuration().await.unwrap());
    h.pad.reboot().unwrap();
    assert_eq!(reporter.get_light_rule(5).await.unwrap(), Some(rule));
    let snapshot = reporter.read_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.light_rules.len(), 3);
    assert!(snapshot.light_rules.contains(&(5, rule)));

    let disabled = LightRule {
        enabled: false,
        ..rule
    };
    assert!(reporter.set_light_rule(5, disabled).await.unwrap());
    assert_eq!(reporter.get_light_rule(5).await.unwrap(), Some(disabled));
    let snapshot = reporter.read_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.light_rules.len(), 2);
}

#[tokio::test]
async fn test_led_mapping_write_and_disable() {
    let h = harness(Board::FsrMiniPad, Binding::Tcp).await;
    let reporter = &h.reporter;

    let mapping = LedMapping::new(1, 7, 4, 12);
    assert!(reporter.set_led_mapping(6, mapping).await.unwrap());
    assert_eq!(reporter.get_led_mapping(6).await.unwrap(), Some(mapping));
    let snapshot = reporter.read_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.led_mappings.len(), 5);
    assert!(snapshot.led_mappings.contains(&(6, mapping)));

    // disabling an existing mapping keeps its range
    let mut first = reporter.get_led_mapping(0).await.unwrap().unwrap();
    first.enabled = false;
    assert!(reporter.set_led_mapping(0, first).await.unwrap());
    let read_back = reporter.get_led_mapping(0).await.unwrap().unwrap();
    assert!(!read_back.enabled);
    assert_eq!(read_back.led_index_end, 8);
    let snapshot = reporter.read_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.led_mappings.len(), 4);
    assert!(snapshot.led_mappings.iter().all(|&(index, _)| index != 0));

    // out-of-range index is refused before anything is sent
    assert!(reporter.set_led_mapping(16, mapping).await.is_err());
}

#[tokio::test]
async fn test_pad_without_lights() {
    let h = harness(Board::Teensy2, Binding::Local).await;
    let reporter = &h.reporter;

    let id = reporter.identify().await.unwrap();
    assert_eq!(id.identification.led_count, 0);
    assert_eq!(id.features, 0);
    assert_eq!(reporter.get_light_rule(0).await.unwrap(), None);
    assert!(!reporter.set_lights([Rgb::BLACK; 16]).await.unwrap());

    let snapshot = reporter.read_snapshot().await.unwrap().unwrap();
    assert!(snapshot.light_rules.is_empty());
    assert!(snapshot.led_mappings.is_empty());
}

#[tokio::test]
async fn test_out_of_range_sensor_is_no_data() {
    let h = harness(Board::FsrMiniPad, Binding::WebSocket).await;
    assert_eq!(h.reporter.get_sensor(12).await.unwrap(), None);
    assert_eq!(h.reporter.get_sensors(16).await.unwrap().len(), 12);
}

#[tokio::test]
async fn test_live_input_and_debug() {
    let h = harness(Board::FsrIoV2, Binding::Local).await;
    let control = h.pad.spawn_control_loop(Duration::from_millis(1));

    h.pad.set_sensor(5, 1000);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let input = h.reporter.read_input().await.unwrap().unwrap();
    assert!(input.is_pressed(5));

    control.abort();

    // a rejected write leaves a trace in the debug text
    let err = h
        .reporter
        .transport()
        .send_feature_report(&[report_id::NAME, 1])
        .await;
    assert!(err.is_err());
    let text = h.reporter.read_debug().await.unwrap();
    assert!(text.contains("size mismatch"), "{}", text);
    assert_eq!(h.reporter.read_debug().await.unwrap(), "");
}

#[tokio::test]
async fn test_debug_text_keeps_split_characters() {
    let h = harness(Board::FsrMiniPad, Binding::WebSocket).await;
    let message = format!("{}→ok\n", "-".repeat(30));
    h.pad.with_device(|dev| dev.state_mut().log(&message));
    assert_eq!(h.reporter.read_debug().await.unwrap(), message);
}

#[tokio::test]
async fn test_factory_reset_restores_defaults() {
    let h = harness(Board::Leonardo, Binding::Tcp).await;
    assert!(h.reporter.set_name("renamed").await.unwrap());
    assert!(h.reporter.save_configuration().await.unwrap());
    assert!(h.reporter.factory_reset().await.unwrap());

    assert_eq!(h.reporter.get_name().await.unwrap().as_deref(), Some("leonardo"));
    h.pad.reboot().unwrap();
    assert_eq!(h.reporter.get_name().await.unwrap().as_deref(), Some("leonardo"));
}

#[tokio::test]
async fn test_disconnect_is_an_error() {
    let h = harness(Board::FsrMiniPad, Binding::Local).await;
    h.pad.unplug();
    let err = h.reporter.get_name().await.unwrap_err();
    assert!(err.is_disconnect());
}
