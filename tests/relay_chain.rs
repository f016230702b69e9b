//! An emulated pad relayed twice, then configured through the outer relay.

use std::sync::Arc;
use std::time::Duration;

use adp_driver::{Connection, TransportUrl};
use adp_firmware::Board;
use adp_reporter::Reporter;
use adp_transport::{serve_tcp, serve_ws};

const TIMEOUT: Duration = Duration::from_millis(500);

#[tokio::test]
async fn test_tcp_behind_websocket() {
    let emu = Connection::open(
        &"emu://fsrio-v2".parse().unwrap(),
        TIMEOUT,
        Board::FsrMiniPad,
    )
    .await
    .unwrap();
    let inner = serve_ws("127.0.0.1:0", Arc::clone(&emu.transport))
        .await
        .unwrap();

    let ws_url: TransportUrl = format!("ws://{}/", inner.local_addr()).parse().unwrap();
    let hop = Connection::open(&ws_url, TIMEOUT, Board::FsrMiniPad)
        .await
        .unwrap();
    let outer = serve_tcp("127.0.0.1:0", Arc::clone(&hop.transport))
        .await
        .unwrap();

    let tcp_url: TransportUrl = format!("tcp://{}", outer.local_addr()).parse().unwrap();
    let client = Connection::open(&tcp_url, TIMEOUT, Board::FsrMiniPad)
        .await
        .unwrap();
    let reporter = Reporter::new(Arc::clone(&client.transport));

    let id = reporter.identify().await.unwrap();
    assert_eq!(id.identification.board_type, "FSRio V2");
    assert_eq!(id.identification.led_count, 64);

    let mut sensor = reporter.get_sensor(7).await.unwrap().unwrap();
    sensor.threshold = 700;
    assert!(reporter.set_sensor(7, sensor).await.unwrap());
    assert!(reporter.save_configuration().await.unwrap());

    let pad = emu.emulator().unwrap();
    assert_eq!(
        pad.with_device(|dev| dev.state().config().sensors[7].threshold),
        700
    );
    pad.reboot().unwrap();
    assert_eq!(reporter.get_sensor(7).await.unwrap(), Some(sensor));
}

#[tokio::test]
async fn test_emulator_control_loop_runs() {
    let emu = Connection::open(&TransportUrl::Emulator(None), TIMEOUT, Board::FsrMiniPad)
        .await
        .unwrap();
    let reporter = Reporter::new(Arc::clone(&emu.transport));
    emu.emulator().unwrap().set_sensor(0, 1000);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let input = reporter.read_input().await.unwrap().unwrap();
    assert!(input.is_pressed(0));
    assert_eq!(input.sensor_values[0], 1000);
}
