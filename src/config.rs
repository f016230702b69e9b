//! Tool configuration
//!
//! Stored as TOML under the user config directory. Every field has a
//! default, so a partial or missing file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use adp_firmware::Board;
use adp_transport::protocol::timing;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Pad to talk to: `hid://`, `hid://VID:PID`, `tcp://host:port`,
    /// `ws://host:port/path` or `emu://<board>`
    pub transport: String,

    /// How long one request may wait for its answer
    pub request_timeout_ms: u64,

    /// Listen address of the TCP relay
    pub tcp_listen: String,

    /// Listen address of the WebSocket relay
    pub ws_listen: String,

    /// Board emulated by `emu://` without an explicit variant
    pub emulator_board: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            transport: "hid://".to_string(),
            request_timeout_ms: timing::DEFAULT_REQUEST_TIMEOUT_MS,
            tcp_listen: "0.0.0.0:1234".to_string(),
            ws_listen: "0.0.0.0:8080".to_string(),
            emulator_board: Board::FsrMiniPad.id().to_string(),
        }
    }
}

impl ToolConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("adp")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ToolConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    /// Board used for `emu://` URLs that name none
    pub fn emulator_board(&self) -> anyhow::Result<Board> {
        self.emulator_board
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
    }
}
