//! TCP tunnel binding
//!
//! One framed request/response exchange at a time over a single stream. A
//! timeout or an undecodable header leaves the stream position unknown, so
//! the connection is dropped and later requests fail with `Disconnected`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::frame::{self, cmd, Frame, Header, HEADER_SIZE};
use crate::protocol::{report_id, timing};
use crate::types::{ReportRequest, TransportDeviceInfo, TransportType};
use crate::Transport;

/// Client side of the TCP tunnel
pub struct TcpTransport {
    /// `None` once the connection failed or was closed
    stream: Mutex<Option<TcpStream>>,
    info: TransportDeviceInfo,
    timeout: Duration,
}

impl TcpTransport {
    /// Connect to a relay with the default request timeout
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        Self::connect_with_timeout(
            addr,
            Duration::from_millis(timing::DEFAULT_REQUEST_TIMEOUT_MS),
        )
        .await
    }

    pub async fn connect_with_timeout(
        addr: impl ToSocketAddrs,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout)??;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        info!("Connected to TCP relay at {}", peer);

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            info: TransportDeviceInfo::remote(TransportType::Tcp, peer.to_string()),
            timeout,
        })
    }

    async fn exchange(stream: &mut TcpStream, request: &Frame) -> Result<Frame, TransportError> {
        stream
            .write_all(&request.encode()?)
            .await
            .map_err(io_error)?;

        let mut header = [0u8; HEADER_SIZE];
        stream.read_exact(&mut header).await.map_err(io_error)?;
        let header = Header::decode(&header)?;

        let mut payload = vec![0u8; header.payload_len()];
        stream
            .read_exact(&mut payload)
            .await
            .map_err(io_error)?;
        Ok(Frame::from_parts(header, payload))
    }
}

/// Peer-closed conditions surface as `Disconnected`
fn io_error(e: std::io::Error) -> TransportError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => TransportError::Disconnected,
        _ => TransportError::Io(e),
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn request(&self, request: ReportRequest) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Disconnected);
        };

        let out = frame::request_frame(&request);
        debug!(
            "TCP {} 0x{:02X} ({}), {} bytes",
            cmd::name(out.cmd),
            out.report_id,
            report_id::name(out.report_id),
            out.payload.len()
        );

        let answer = match tokio::time::timeout(self.timeout, Self::exchange(stream, &out)).await
        {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                warn!("TCP exchange failed, dropping connection: {}", e);
                *guard = None;
                return Err(e);
            }
            Err(_) => {
                warn!("TCP request 0x{:02X} timed out, dropping connection", out.report_id);
                *guard = None;
                return Err(TransportError::Timeout);
            }
        };

        frame::response_from_frame(&request, answer)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.lock().await.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportExt;
    use tokio::net::TcpListener;

    /// Serve one connection with a scripted handler
    async fn scripted_peer<F>(handler: F) -> std::net::SocketAddr
    where
        F: Fn(Frame) -> Option<Vec<u8>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            loop {
                let mut header = [0u8; HEADER_SIZE];
                if socket.read_exact(&mut header).await.is_err() {
                    break;
                }
                let header = Header::decode(&header).unwrap();
                let mut payload = vec![0u8; header.payload_len()];
                socket.read_exact(&mut payload).await.unwrap();
                match handler(Frame::from_parts(header, payload)) {
                    Some(bytes) => socket.write_all(&bytes).await.unwrap(),
                    None => break,
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_get_and_send() {
        let addr = scripted_peer(|f| {
            let reply = match f.cmd {
                cmd::REPORT_GET => Frame::new(cmd::REPORT_GET_ACK, f.report_id, vec![1, b'x']),
                cmd::REPORT_SEND => Frame::new(cmd::REPORT_SEND_ACK, f.report_id, vec![]),
                _ => Frame::failed(f.report_id, crate::FailureReason::UnknownCommand),
            };
            Some(reply.encode().unwrap())
        })
        .await;

        let transport = TcpTransport::connect(addr).await.unwrap();
        assert_eq!(
            transport.get_feature_report(0x05).await.unwrap(),
            vec![0x05, 1, b'x']
        );
        transport.send_feature_report(&[0x05, 0, 0]).await.unwrap();
        assert!(transport.is_connected().await);
    }

    #[tokio::test]
    async fn test_mismatched_report_id_is_unmatched() {
        let addr = scripted_peer(|f| {
            Some(
                Frame::new(cmd::REPORT_GET_ACK, f.report_id.wrapping_add(1), vec![0])
                    .encode()
                    .unwrap(),
            )
        })
        .await;

        let transport = TcpTransport::connect(addr).await.unwrap();
        assert!(matches!(
            transport.get_feature_report(0x0C).await,
            Err(TransportError::UnmatchedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_then_disconnected() {
        let addr = scripted_peer(|_| Some(Vec::new())).await;
        let transport = TcpTransport::connect_with_timeout(addr, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(matches!(
            transport.get_feature_report(0x09).await,
            Err(TransportError::Timeout)
        ));
        assert!(!transport.is_connected().await);
        assert!(matches!(
            transport.get_feature_report(0x09).await,
            Err(TransportError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_peer_close_is_disconnect() {
        let addr = scripted_peer(|_| None).await;
        let transport = TcpTransport::connect(addr).await.unwrap();
        assert!(matches!(
            transport.get_feature_report(0x09).await,
            Err(TransportError::Disconnected)
        ));
    }
}
