//! ledctl - LED strip control from the command line
//!
//! Every subcommand maps to one `LedController` operation and prints its
//! result as JSON.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn};

use ledctl::cli::{Cli, Commands, EffectCommand};
use ledctl::effect::TokioPacer;
use ledctl::{LedController, OpResult, Settings};
use ledstrip_transport::{DriverBus, HttpTransport};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the operation succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    debug!("Loading settings from {:?}", config_path);
    let mut settings = Settings::load(&config_path)?;
    if let Some(url) = cli.driver_url {
        settings.driver_url = url;
    }

    let controller = connect(&settings)?;

    let ok = match cli.command {
        Commands::Status => print(controller.get_status().await)?,
        Commands::Config => print(controller.get_config().await)?,
        Commands::Pixel { index, color } => print(controller.set_pixel(index, color).await)?,
        Commands::Range { start, end, color } => {
            print(controller.set_range(start, end, color).await)?
        }
        Commands::Fill { color } => print(controller.fill(color).await)?,
        Commands::Clear => print(controller.clear().await)?,
        Commands::Brightness { value } => print(controller.set_brightness(value).await)?,
        Commands::Stop => print(controller.stop_animation().await)?,
        Commands::Effect { effect } => run_effect(&controller, effect).await?,
    };
    Ok(ok)
}

fn connect(settings: &Settings) -> Result<LedController> {
    let transport = HttpTransport::new(settings.driver_url.clone())?;
    let bus = DriverBus::from_transport(
        Arc::new(transport),
        settings.timeouts(),
        settings.queue_depth,
    );
    let controller = LedController::new(bus, Arc::new(TokioPacer))
        .preempt_on_direct(settings.preempt_on_direct);
    let client = controller.bus().client();
    let timeouts = client.timeouts();
    info!(
        "Using LED driver at {} (timeouts {:?} direct, {:?} effect)",
        client.endpoint(),
        timeouts.command,
        timeouts.effect
    );
    Ok(controller)
}

/// Start an effect and stay attached until it ends or the user interrupts.
async fn run_effect(controller: &LedController, effect: EffectCommand) -> Result<bool> {
    let effect = effect.to_effect();
    let kind = effect.kind();
    let started = controller.start_effect(effect).await;
    if !print(started)? {
        return Ok(false);
    }
    if !kind.is_finite() {
        info!("{kind} runs until interrupted, press Ctrl-C to stop");
    }

    tokio::select! {
        _ = controller.engine().wait_idle() => {
            info!("Effect finished");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Interrupted, stopping effect");
        }
    }

    let stats = controller.stats();
    debug!(
        "{} frames sent, {} failed",
        stats.frames_sent, stats.failed_frames
    );
    print(controller.stop_animation().await)
}

fn print<T: Serialize>(result: OpResult<T>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}
