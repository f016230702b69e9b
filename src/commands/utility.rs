//! Utility command handlers (list, serve, init-config).

use std::sync::Arc;

use adp_firmware::Board;
use adp_transport::{serve_tcp, serve_ws};
use anyhow::Context as _;
use tracing::info;

use super::{CommandResult, Context};

/// List attached pads and the boards the emulator offers
pub fn list() -> CommandResult {
    list_hid()?;
    println!("Emulated boards:");
    for board in Board::ALL {
        println!(
            "  emu://{:<14} {} sensors, {} LEDs",
            board.id(),
            board.sensor_count(),
            board.led_count()
        );
    }
    Ok(())
}

#[cfg(feature = "hid")]
fn list_hid() -> CommandResult {
    let devices = adp_transport::list_devices()?;
    if devices.is_empty() {
        println!("No pads attached");
    }
    for dev in devices {
        println!(
            "hid://{:04x}:{:04x}  {}  {}",
            dev.vid,
            dev.pid,
            dev.product_name.as_deref().unwrap_or("?"),
            dev.device_path
        );
    }
    Ok(())
}

#[cfg(not(feature = "hid"))]
fn list_hid() -> CommandResult {
    println!("Built without HID support");
    Ok(())
}

/// Relay options from the command line
#[derive(Debug, Default, Clone)]
pub struct ServeOptions {
    pub tcp: Option<String>,
    pub ws: Option<String>,
    pub no_tcp: bool,
    pub no_ws: bool,
}

/// Expose the opened pad through the tunnel relays until interrupted
pub async fn serve(ctx: &Context, opts: ServeOptions) -> CommandResult {
    if opts.no_tcp && opts.no_ws {
        anyhow::bail!("both relays disabled, nothing to serve");
    }
    let connection = ctx.connect().await?;
    let info = connection.transport.device_info();
    info!(
        "Serving {} pad {:04x}:{:04x} ({})",
        info.transport_type, info.vid, info.pid, info.device_path
    );

    let mut relays = Vec::new();
    if !opts.no_tcp {
        let addr = opts.tcp.unwrap_or_else(|| ctx.config.tcp_listen.clone());
        let relay = serve_tcp(addr.as_str(), Arc::clone(&connection.transport))
            .await
            .with_context(|| format!("binding TCP relay on {addr}"))?;
        println!("TCP relay:       tcp://{}", relay.local_addr());
        relays.push(relay);
    }
    if !opts.no_ws {
        let addr = opts.ws.unwrap_or_else(|| ctx.config.ws_listen.clone());
        let relay = serve_ws(addr.as_str(), Arc::clone(&connection.transport))
            .await
            .with_context(|| format!("binding WebSocket relay on {addr}"))?;
        println!("WebSocket relay: ws://{}/", relay.local_addr());
        relays.push(relay);
    }

    println!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down relays");
    drop(relays);
    Ok(())
}

/// Write the effective configuration to the config file
pub fn init_config(ctx: &Context) -> CommandResult {
    ctx.url()?;
    ctx.config.emulator_board()?;
    ctx.config.save(&ctx.config_path)?;
    println!("Wrote {}", ctx.config_path.display());
    Ok(())
}
