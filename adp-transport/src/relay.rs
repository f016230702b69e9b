//! Tunnel relay servers
//!
//! Expose any [`Transport`] (usually a locally attached pad or the emulator)
//! to remote clients over the TCP and WebSocket tunnels. Each accepted
//! connection is served by its own task; the wrapped transport serializes
//! requests coming from different connections.
//!
//! Protocol errors are answered with `CMD_FAILED` and a [`FailureReason`]
//! byte. A TCP connection is only closed when a header declares a length that
//! cannot be trusted, since the stream position is lost at that point.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::frame::{self, cmd, FailureReason, Frame, FrameError, Header, HEADER_SIZE};
use crate::protocol::report_id;
use crate::BoxedTransport;

/// Running relay listener
///
/// Dropping the handle stops accepting new connections.
pub struct RelayHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop; it only ends when aborted
    pub async fn wait(mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Answer one tunnel frame using `transport`
pub async fn answer_frame(transport: &BoxedTransport, request: &Frame) -> Frame {
    let report = match frame::request_from_frame(request) {
        Ok(report) => report,
        Err(reason) => {
            debug!(
                "Rejecting {} (0x{:02X}) for report 0x{:02X}",
                cmd::name(request.cmd),
                request.cmd,
                request.report_id
            );
            return Frame::failed(request.report_id, reason);
        }
    };

    debug!(
        "Relay {} 0x{:02X} ({})",
        cmd::name(request.cmd),
        request.report_id,
        report_id::name(request.report_id)
    );

    match transport.request(report.clone()).await {
        Ok(response) => frame::ack_frame(&report, &response),
        Err(TransportError::Rejected(reason)) => Frame::failed(request.report_id, reason),
        Err(e) => {
            warn!(
                "Device request 0x{:02X} failed: {}",
                request.report_id, e
            );
            Frame::failed(request.report_id, FailureReason::DeviceError)
        }
    }
}

/// Encode an answer, degrading to `CMD_FAILED` if it does not fit a frame
fn encode_answer(answer: &Frame) -> Vec<u8> {
    match answer.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot encode answer for 0x{:02X}: {}", answer.report_id, e);
            Frame::failed(answer.report_id, FailureReason::DeviceError)
                .encode()
                .unwrap_or_default()
        }
    }
}

// =============================================================================
// TCP
// =============================================================================

/// Serve `transport` over the TCP tunnel on `addr`
pub async fn serve_tcp(
    addr: impl ToSocketAddrs,
    transport: BoxedTransport,
) -> Result<RelayHandle, TransportError> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("TCP relay listening on {}", local_addr);

    let task = tokio::spawn(async move {
        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("TCP accept failed: {}", e);
                    continue;
                }
            };
            info!("TCP client connected: {}", peer);
            let transport = transport.clone();
            tokio::spawn(async move {
                match tcp_connection(socket, transport).await {
                    Ok(()) => info!("TCP client disconnected: {}", peer),
                    Err(e) => warn!("TCP client {} dropped: {}", peer, e),
                }
            });
        }
    });

    Ok(RelayHandle { local_addr, task })
}

async fn tcp_connection(
    mut socket: TcpStream,
    transport: BoxedTransport,
) -> Result<(), TransportError> {
    socket.set_nodelay(true)?;
    let mut header = [0u8; HEADER_SIZE];

    loop {
        match socket.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let decoded = match Header::decode(&header) {
            Ok(decoded) => decoded,
            Err(e @ FrameError::PayloadTooLarge(_)) => {
                warn!("Closing TCP connection: {}", e);
                let failed = Frame::failed(header[1], FailureReason::Malformed);
                socket.write_all(&encode_answer(&failed)).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut payload = vec![0u8; decoded.payload_len()];
        socket.read_exact(&mut payload).await?;
        let request = Frame::from_parts(decoded, payload);

        let answer = answer_frame(&transport, &request).await;
        socket.write_all(&encode_answer(&answer)).await?;
    }
}

// =============================================================================
// WebSocket
// =============================================================================

/// Serve `transport` over the WebSocket tunnel on `addr`
///
/// Any request path is accepted; frames travel as binary messages.
pub async fn serve_ws(
    addr: impl ToSocketAddrs,
    transport: BoxedTransport,
) -> Result<RelayHandle, TransportError> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("WebSocket relay listening on {}", local_addr);

    let task = tokio::spawn(async move {
        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("WebSocket accept failed: {}", e);
                    continue;
                }
            };
            let transport = transport.clone();
            tokio::spawn(async move {
                match ws_connection(socket, transport).await {
                    Ok(()) => info!("WebSocket client disconnected: {}", peer),
                    Err(e) => warn!("WebSocket client {} dropped: {}", peer, e),
                }
            });
        }
    });

    Ok(RelayHandle { local_addr, task })
}

async fn ws_connection(socket: TcpStream, transport: BoxedTransport) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(socket).await?;
    info!("WebSocket handshake complete");
    let (mut sink, mut stream) = ws.split();

    while let Some(message) = stream.next().await {
        let answer = match message? {
            Message::Binary(data) => match Frame::decode(&data) {
                Ok(request) => answer_frame(&transport, &request).await,
                Err(e) => {
                    debug!("Malformed WebSocket frame: {}", e);
                    let report = data.get(1).copied().unwrap_or(0);
                    Frame::failed(report, FailureReason::Malformed)
                }
            },
            Message::Text(_) => Frame::failed(0, FailureReason::NotBinary),
            Message::Close(_) => break,
            // Pings are answered by tungstenite
            _ => continue,
        };
        sink.send(Message::Binary(encode_answer(&answer))).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReportRequest, TransportDeviceInfo, TransportType};
    use crate::{Transport, TransportExt};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Answers every read with `[id, id]` and rejects report 0x0F
    struct EchoTransport {
        info: TransportDeviceInfo,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn request(&self, request: ReportRequest) -> Result<Vec<u8>, TransportError> {
            let id = request.report_id();
            if id == 0x0F {
                return Err(TransportError::Rejected(FailureReason::UnsupportedReport));
            }
            if id == 0x0E {
                return Err(TransportError::Disconnected);
            }
            Ok(if request.expects_data() {
                vec![id, id]
            } else {
                Vec::new()
            })
        }

        fn device_info(&self) -> &TransportDeviceInfo {
            &self.info
        }

        async fn is_connected(&self) -> bool {
            true
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn echo() -> BoxedTransport {
        Arc::new(EchoTransport {
            info: TransportDeviceInfo::remote(TransportType::Emulated, "echo"),
        })
    }

    #[tokio::test]
    async fn test_answer_frame() {
        let transport = echo();
        let ack = answer_frame(&transport, &Frame::request(cmd::REPORT_GET, 0x09)).await;
        assert_eq!(ack, Frame::new(cmd::REPORT_GET_ACK, 0x09, vec![0x09]));

        let ack = answer_frame(&transport, &Frame::new(cmd::REPORT_SEND, 0x05, vec![1])).await;
        assert_eq!(ack, Frame::new(cmd::REPORT_SEND_ACK, 0x05, vec![]));

        let failed = answer_frame(&transport, &Frame::request(cmd::REPORT_GET, 0x0F)).await;
        assert_eq!(failed.failure_reason(), Some(FailureReason::UnsupportedReport));

        let failed = answer_frame(&transport, &Frame::request(cmd::REPORT_GET, 0x0E)).await;
        assert_eq!(failed.failure_reason(), Some(FailureReason::DeviceError));

        let failed = answer_frame(&transport, &Frame::request(0x42, 0x01)).await;
        assert_eq!(failed.failure_reason(), Some(FailureReason::UnknownCommand));
    }

    #[tokio::test]
    async fn test_tcp_relay_survives_protocol_errors() {
        let relay = serve_tcp("127.0.0.1:0", echo()).await.unwrap();
        let mut socket = TcpStream::connect(relay.local_addr()).await.unwrap();

        // unknown command gets CMD_FAILED, the connection stays usable
        socket
            .write_all(&Frame::request(0x42, 0x07).encode().unwrap())
            .await
            .unwrap();
        let mut reply = [0u8; HEADER_SIZE + 1];
        socket.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [cmd::CMD_FAILED, 0x07, 1, 0, 1]);

        socket
            .write_all(&Frame::request(cmd::REPORT_GET, 0x0C).encode().unwrap())
            .await
            .unwrap();
        let mut reply = [0u8; HEADER_SIZE + 1];
        socket.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [cmd::REPORT_GET_ACK, 0x0C, 1, 0, 0x0C]);
    }

    #[tokio::test]
    async fn test_tcp_relay_closes_on_oversized_header() {
        let relay = serve_tcp("127.0.0.1:0", echo()).await.unwrap();
        let mut socket = TcpStream::connect(relay.local_addr()).await.unwrap();
        socket
            .write_all(&[cmd::REPORT_SEND, 0x05, 0xE9, 0x03])
            .await
            .unwrap();
        let mut reply = Vec::new();
        socket.read_to_end(&mut reply).await.unwrap();
        assert_eq!(
            reply,
            vec![cmd::CMD_FAILED, 0x05, 1, 0, FailureReason::Malformed as u8]
        );
    }

    #[tokio::test]
    async fn test_clients_through_relays() {
        let tcp = serve_tcp("127.0.0.1:0", echo()).await.unwrap();
        let ws = serve_ws("127.0.0.1:0", echo()).await.unwrap();

        let tcp_client = crate::TcpTransport::connect(tcp.local_addr()).await.unwrap();
        let url = format!("ws://{}/", ws.local_addr());
        let ws_client = crate::WebSocketTransport::connect(&url).await.unwrap();

        let clients: [&dyn Transport; 2] = [&tcp_client, &ws_client];
        for client in clients {
            assert_eq!(client.get_feature_report(0x0B).await.unwrap(), vec![0x0B, 0x0B]);
            client.send_feature_report(&[0x05, 0]).await.unwrap();
            assert!(matches!(
                client.get_feature_report(0x0F).await,
                Err(TransportError::Rejected(FailureReason::UnsupportedReport))
            ));
            // still usable after a rejection
            assert_eq!(client.read_input(0x01).await.unwrap(), vec![0x01, 0x01]);
        }
    }

    #[tokio::test]
    async fn test_ws_relay_rejects_text() {
        let ws = serve_ws("127.0.0.1:0", echo()).await.unwrap();
        let url = format!("ws://{}/", ws.local_addr());
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

        socket.send(Message::Text("hello".into())).await.unwrap();
        let reply = socket.next().await.unwrap().unwrap();
        let Message::Binary(bytes) = reply else {
            panic!("expected a binary reply");
        };
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.failure_reason(), Some(FailureReason::NotBinary));
    }

    #[tokio::test]
    async fn test_ws_client_disconnect_on_relay_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept the handshake, swallow one request, then hang up
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            let _ = ws.next().await;
            let _ = ws.close(None).await;
        });

        let client = crate::WebSocketTransport::connect(&format!("ws://{addr}/"))
            .await
            .unwrap();
        assert!(matches!(
            client.get_feature_report(0x09).await,
            Err(TransportError::Disconnected)
        ));
        assert!(!client.is_connected().await);
    }
}
