//! Opening a pad from a transport URL

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use adp_firmware::{Board, EmulatedDevice};
use adp_transport::{BoxedTransport, TcpTransport, WebSocketTransport};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

/// Control loop period of an emulated pad
pub const EMULATOR_TICK: Duration = Duration::from_millis(1);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlError {
    #[error("Unsupported transport URL '{0}' (expected hid://, tcp://, ws:// or emu://)")]
    UnknownScheme(String),

    #[error("Invalid HID id '{0}' (expected VID:PID in hex)")]
    InvalidHidId(String),

    #[error("Missing address in '{0}'")]
    MissingAddress(String),

    #[error("{0}")]
    UnknownBoard(String),

    #[error("TLS WebSocket URL '{0}' not supported; relays speak plain ws://")]
    TlsUnsupported(String),
}

/// Where a pad lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportUrl {
    /// Local pad; `None` opens the first supported one
    Hid(Option<(u16, u16)>),
    /// TCP relay at `host:port`
    Tcp(String),
    /// WebSocket relay, full `ws://` URL
    WebSocket(String),
    /// In-process emulated pad; `None` uses the configured board
    Emulator(Option<Board>),
}

fn parse_hex_id(s: &str, url: &str) -> Result<u16, UrlError> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(s, 16).map_err(|_| UrlError::InvalidHidId(url.to_string()))
}

impl FromStr for TransportUrl {
    type Err = UrlError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| UrlError::UnknownScheme(url.to_string()))?;
        let rest = rest.trim_end_matches('/');

        match scheme.to_ascii_lowercase().as_str() {
            "hid" if rest.is_empty() => Ok(Self::Hid(None)),
            "hid" => {
                let (vid, pid) = rest
                    .split_once(':')
                    .ok_or_else(|| UrlError::InvalidHidId(url.to_string()))?;
                Ok(Self::Hid(Some((
                    parse_hex_id(vid, url)?,
                    parse_hex_id(pid, url)?,
                ))))
            }
            "tcp" if rest.is_empty() => Err(UrlError::MissingAddress(url.to_string())),
            "tcp" => Ok(Self::Tcp(rest.to_string())),
            "ws" if rest.is_empty() => Err(UrlError::MissingAddress(url.to_string())),
            "ws" => Ok(Self::WebSocket(url.to_string())),
            "wss" => Err(UrlError::TlsUnsupported(url.to_string())),
            "emu" if rest.is_empty() => Ok(Self::Emulator(None)),
            "emu" => rest
                .parse()
                .map(|board| Self::Emulator(Some(board)))
                .map_err(UrlError::UnknownBoard),
            _ => Err(UrlError::UnknownScheme(url.to_string())),
        }
    }
}

impl fmt::Display for TransportUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hid(None) => write!(f, "hid://"),
            Self::Hid(Some((vid, pid))) => write!(f, "hid://{vid:04x}:{pid:04x}"),
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::WebSocket(url) => f.write_str(url),
            Self::Emulator(None) => write!(f, "emu://"),
            Self::Emulator(Some(board)) => write!(f, "emu://{board}"),
        }
    }
}

/// An opened pad plus whatever keeps it running
pub struct Connection {
    pub transport: BoxedTransport,
    emulator: Option<(EmulatedDevice, JoinHandle<()>)>,
}

impl Connection {
    /// Open `url`; emulated pads get their control loop started here
    pub async fn open(
        url: &TransportUrl,
        timeout: Duration,
        default_board: Board,
    ) -> anyhow::Result<Self> {
        info!("Opening {}", url);
        let transport: BoxedTransport = match url {
            TransportUrl::Hid(ids) => open_local(*ids)?,
            TransportUrl::Tcp(addr) => {
                Arc::new(TcpTransport::connect_with_timeout(addr.as_str(), timeout).await?)
            }
            TransportUrl::WebSocket(url) => {
                Arc::new(WebSocketTransport::connect_with_timeout(url, timeout).await?)
            }
            TransportUrl::Emulator(board) => {
                let pad = EmulatedDevice::new(board.unwrap_or(default_board));
                let control = pad.spawn_control_loop(EMULATOR_TICK);
                let transport = pad.transport();
                return Ok(Self {
                    transport,
                    emulator: Some((pad, control)),
                });
            }
        };
        Ok(Self {
            transport,
            emulator: None,
        })
    }

    /// The emulated pad behind this connection, if any
    pub fn emulator(&self) -> Option<&EmulatedDevice> {
        self.emulator.as_ref().map(|(pad, _)| pad)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some((_, control)) = &self.emulator {
            control.abort();
        }
    }
}

#[cfg(feature = "hid")]
fn open_local(ids: Option<(u16, u16)>) -> anyhow::Result<BoxedTransport> {
    Ok(Arc::new(adp_transport::open_hid(ids)?))
}

#[cfg(not(feature = "hid"))]
fn open_local(_ids: Option<(u16, u16)>) -> anyhow::Result<BoxedTransport> {
    anyhow::bail!("built without HID support; use tcp://, ws:// or emu://")
}
