//! Command handlers for the CLI application.
//!
//! - `query`: read-only commands (info, sensors, lights, input, debug, dump)
//! - `set`: commands that change the pad (set-sensor, set-light-rule,
//!   set-led-mapping, name, save, factory-reset)
//! - `utility`: list, serve, init-config

pub mod query;
pub mod set;
pub mod utility;

use std::path::PathBuf;
use std::sync::Arc;

use adp_driver::{Connection, ToolConfig, TransportUrl};
use adp_reporter::Reporter;
use anyhow::Context as _;
use tracing::debug;

use crate::cli::Cli;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Tool configuration with command-line overrides applied
pub struct Context {
    pub config: ToolConfig,
    pub config_path: PathBuf,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(ToolConfig::default_path);
        debug!("Loading config from {:?}", config_path);
        let mut config = ToolConfig::load(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;

        if let Some(transport) = &cli.transport {
            config.transport = transport.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.request_timeout_ms = timeout;
        }
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn url(&self) -> anyhow::Result<TransportUrl> {
        Ok(self.config.transport.parse::<TransportUrl>()?)
    }

    /// Open the configured pad
    pub async fn connect(&self) -> anyhow::Result<Connection> {
        let url = self.url()?;
        Connection::open(
            &url,
            self.config.request_timeout(),
            self.config.emulator_board()?,
        )
        .await
        .with_context(|| format!("opening {url}"))
    }

    /// Open the configured pad and wrap it in a [`Reporter`]
    ///
    /// The connection must outlive the reporter.
    pub async fn reporter(&self) -> anyhow::Result<(Connection, Reporter)> {
        let connection = self.connect().await?;
        let reporter = Reporter::new(Arc::clone(&connection.transport));
        Ok((connection, reporter))
    }
}
