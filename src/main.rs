//! Dance pad configuration CLI
//!
//! Talks to a pad over local HID, a TCP or WebSocket relay, or an in-process
//! emulator, and can relay a local pad to remote tools.

use clap::Parser;
use tracing_subscriber::EnvFilter;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::set::{LedMappingChange, LightRuleChange, SensorChange};
use commands::utility::ServeOptions;
use commands::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        None | Some(Commands::Info) => commands::query::info(&ctx).await?,

        // === Query Commands ===
        Some(Commands::Sensors) => commands::query::sensors(&ctx).await?,
        Some(Commands::Lights) => commands::query::lights(&ctx).await?,
        Some(Commands::Input { watch, interval }) => {
            commands::query::input(&ctx, watch, interval).await?
        }
        Some(Commands::Debug) => commands::query::debug(&ctx).await?,
        Some(Commands::Dump) => commands::query::dump(&ctx).await?,
        Some(Commands::List) => commands::utility::list()?,

        // === Set Commands ===
        Some(Commands::SetSensor {
            index,
            threshold,
            release,
            button,
            disable,
        }) => {
            let change = SensorChange {
                threshold,
                release,
                button,
                disable,
            };
            commands::set::set_sensor(&ctx, index, change).await?
        }
        Some(Commands::SetLightRule {
            index,
            on,
            off,
            on_fade,
            off_fade,
            fade_on,
            fade_off,
            disable,
        }) => {
            let change = LightRuleChange {
                on,
                off,
                on_fade,
                off_fade,
                fade_on,
                fade_off,
                disable,
            };
            commands::set::set_light_rule(&ctx, index, change).await?
        }
        Some(Commands::SetLedMapping {
            index,
            rule,
            sensor,
            begin,
            end,
            disable,
        }) => {
            let change = LedMappingChange {
                rule,
                sensor,
                begin,
                end,
                disable,
            };
            commands::set::set_led_mapping(&ctx, index, change).await?
        }
        Some(Commands::Name { name }) => commands::set::name(&ctx, name).await?,
        Some(Commands::Save) => commands::set::save(&ctx).await?,
        Some(Commands::FactoryReset) => commands::set::factory_reset(&ctx).await?,
        Some(Commands::Bootloader) => commands::set::bootloader(&ctx).await?,

        // === Utility Commands ===
        Some(Commands::Serve {
            tcp,
            ws,
            no_tcp,
            no_ws,
        }) => {
            let opts = ServeOptions {
                tcp,
                ws,
                no_tcp,
                no_ws,
            };
            commands::utility::serve(&ctx, opts).await?
        }
        Some(Commands::InitConfig) => commands::utility::init_config(&ctx)?,
    }

    Ok(())
}
