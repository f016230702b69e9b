//! WebSocket tunnel binding
//!
//! Frames travel as binary messages. A reader task owns the receive half and
//! fulfils a single pending-response slot; the request path installs the slot,
//! sends, and awaits it.
//!
//! ```text
//! request() ── install Pending ── send Binary ──► relay
//!     ▲                                              │
//!     └──── oneshot ◄── reader task ◄── Binary ◄─────┘
//! ```
//!
//! Frames that do not answer the pending request are discarded. When the
//! connection closes the pending caller gets `Disconnected`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::frame::{self, cmd, Frame};
use crate::protocol::{report_id, timing};
use crate::types::{ReportRequest, TransportDeviceInfo, TransportType};
use crate::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The one outstanding request of a connection
struct Pending {
    cmd: u8,
    report_id: u8,
    tx: oneshot::Sender<Frame>,
}

/// State shared with the reader task
struct Shared {
    pending: Mutex<Option<Pending>>,
    /// Cleared under the `pending` lock so a request never installs a slot
    /// after the reader has exited
    connected: AtomicBool,
}

/// Client side of the WebSocket tunnel
pub struct WebSocketTransport {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    shared: Arc<Shared>,
    /// Serializes request/response cycles on this connection
    query_lock: tokio::sync::Mutex<()>,
    reader: JoinHandle<()>,
    info: TransportDeviceInfo,
    timeout: Duration,
}

impl WebSocketTransport {
    /// Connect to a relay (`ws://host:port/path`) with the default request timeout
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        Self::connect_with_timeout(
            url,
            Duration::from_millis(timing::DEFAULT_REQUEST_TIMEOUT_MS),
        )
        .await
    }

    pub async fn connect_with_timeout(
        url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let connect = tokio_tungstenite::connect_async(url);
        let (ws, _response) = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| TransportError::Timeout)??;
        info!("Connected to WebSocket relay at {}", url);

        let (sink, stream) = ws.split();
        let shared = Arc::new(Shared {
            pending: Mutex::new(None),
            connected: AtomicBool::new(true),
        });
        let reader = tokio::spawn(reader_loop(stream, Arc::clone(&shared)));

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            shared,
            query_lock: tokio::sync::Mutex::new(()),
            reader,
            info: TransportDeviceInfo::remote(TransportType::WebSocket, url),
            timeout,
        })
    }

    /// Install the pending slot, failing if the connection is already gone
    fn install(
        &self,
        cmd: u8,
        report_id: u8,
    ) -> Result<oneshot::Receiver<Frame>, TransportError> {
        let mut pending = self.shared.pending.lock();
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let (tx, rx) = oneshot::channel();
        *pending = Some(Pending { cmd, report_id, tx });
        Ok(rx)
    }

    fn clear_pending(&self) {
        self.shared.pending.lock().take();
    }
}

/// Receive loop: deliver matching frames to the pending slot
async fn reader_loop(mut stream: SplitStream<WsStream>, shared: Arc<Shared>) {
    while let Some(message) = stream.next().await {
        let data = match message {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket receive failed: {}", e);
                break;
            }
        };

        let frame = match Frame::decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Discarding malformed WebSocket frame: {}", e);
                continue;
            }
        };

        let mut pending = shared.pending.lock();
        let matches = pending.as_ref().is_some_and(|p| {
            frame.answers(p.cmd, p.report_id)
                || (frame.cmd == cmd::CMD_FAILED && frame.report_id == p.report_id)
        });
        if matches {
            if let Some(p) = pending.take() {
                // Receiver dropped means the caller timed out
                let _ = p.tx.send(frame);
            }
        } else {
            debug!(
                "Discarding unmatched frame {} report 0x{:02X}",
                cmd::name(frame.cmd),
                frame.report_id
            );
        }
    }

    let mut pending = shared.pending.lock();
    shared.connected.store(false, Ordering::SeqCst);
    // Dropping the sender wakes the waiting caller with Disconnected
    pending.take();
    info!("WebSocket relay connection closed");
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn request(&self, request: ReportRequest) -> Result<Vec<u8>, TransportError> {
        let _guard = self.query_lock.lock().await;

        let out = frame::request_frame(&request);
        debug!(
            "WS {} 0x{:02X} ({}), {} bytes",
            cmd::name(out.cmd),
            out.report_id,
            report_id::name(out.report_id),
            out.payload.len()
        );

        let rx = self.install(out.cmd, out.report_id)?;
        let bytes = out.encode()?;
        if let Err(e) = self.sink.lock().await.send(Message::Binary(bytes)).await {
            self.clear_pending();
            return Err(e.into());
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(answer)) => frame::response_from_frame(&request, answer),
            Ok(Err(_)) => Err(TransportError::Disconnected),
            Err(_) => {
                self.clear_pending();
                warn!("WS request 0x{:02X} timed out", out.report_id);
                Err(TransportError::Timeout)
            }
        }
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let result = self.sink.lock().await.close().await;
        {
            let mut pending = self.shared.pending.lock();
            self.shared.connected.store(false, Ordering::SeqCst);
            pending.take();
        }
        self.reader.abort();
        match result {
            Ok(()) => Ok(()),
            Err(e) => match TransportError::from(e) {
                TransportError::Disconnected => Ok(()),
                other => Err(other),
            },
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportExt;
    use tokio::net::TcpListener;

    /// Serve one WebSocket connection; the handler returns the messages to
    /// send back, or `None` to close
    async fn scripted_peer<F>(handler: F) -> String
    where
        F: Fn(Frame) -> Option<Vec<Frame>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                let Message::Binary(data) = message else {
                    continue;
                };
                match handler(Frame::decode(&data).unwrap()) {
                    Some(replies) => {
                        for reply in replies {
                            ws.send(Message::Binary(reply.encode().unwrap()))
                                .await
                                .unwrap();
                        }
                    }
                    None => {
                        let _ = ws.close(None).await;
                        break;
                    }
                }
            }
        });
        format!("ws://{addr}/")
    }

    #[tokio::test]
    async fn test_stale_ack_is_skipped() {
        let url = scripted_peer(|f| {
            Some(vec![
                Frame::new(cmd::REPORT_GET_ACK, f.report_id.wrapping_add(1), vec![9, 9]),
                Frame::new(cmd::REPORT_GET_ACK, f.report_id, vec![1, b'x']),
            ])
        })
        .await;

        let transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.get_feature_report(0x05).await.unwrap(),
            vec![0x05, 1, b'x']
        );
        assert!(transport.is_connected().await);
    }

    #[tokio::test]
    async fn test_only_wrong_id_times_out() {
        let url = scripted_peer(|f| {
            let mut replies = vec![Frame::new(
                cmd::REPORT_GET_ACK,
                f.report_id.wrapping_add(1),
                vec![0],
            )];
            if f.report_id != 0x0C {
                replies.push(Frame::new(cmd::REPORT_GET_ACK, f.report_id, vec![7]));
            }
            Some(replies)
        })
        .await;

        let transport = WebSocketTransport::connect_with_timeout(&url, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(matches!(
            transport.get_feature_report(0x0C).await,
            Err(TransportError::Timeout)
        ));

        // the connection survives a timeout
        assert!(transport.is_connected().await);
        assert_eq!(
            transport.get_feature_report(0x03).await.unwrap(),
            vec![0x03, 7]
        );
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let url = scripted_peer(|_| Some(Vec::new())).await;
        let transport = WebSocketTransport::connect_with_timeout(&url, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(matches!(
            transport.get_feature_report(0x09).await,
            Err(TransportError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_peer_close_fails_pending_request() {
        let url = scripted_peer(|_| None).await;
        let transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(matches!(
            transport.get_feature_report(0x09).await,
            Err(TransportError::Disconnected)
        ));
        assert!(!transport.is_connected().await);
        assert!(matches!(
            transport.get_feature_report(0x09).await,
            Err(TransportError::Disconnected)
        ));
    }
}
