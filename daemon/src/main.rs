mod config;
mod display;
mod error;
mod input;

use config::{Config, parse_config};
use error::DaemonError;
use filterpanel::buttons::{ButtonController, ProcessLauncher, run_button_controller};
use filterpanel::context::HardwareContext;
use filterpanel::render::Renderer;
use filterpanel::scheduler::StatusLoop;
use log::{error, info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

// Presses beyond this many queued are dropped while the controller catches up.
const PRESS_QUEUE_DEPTH: usize = 8;

/// Cancels `shutdown_token` on SIGINT or SIGTERM.
fn run_shutdown_listener(
    task_tracker: &TaskTracker,
    shutdown_token: CancellationToken,
) -> Result<(), DaemonError> {
    let mut sigterm = signal(SignalKind::terminate()).map_err(DaemonError::SignalHandlerError)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(DaemonError::SignalHandlerError)?;
    task_tracker.spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = shutdown_token.cancelled() => {}
        }
        shutdown_token.cancel();
    });
    Ok(())
}

async fn run(config: Config) -> Result<(), DaemonError> {
    let task_tracker = TaskTracker::new();
    let shutdown_token = CancellationToken::new();
    run_shutdown_listener(&task_tracker, shutdown_token.clone())?;

    let surface = display::open_surface(&config.display).await?;
    let mut context = HardwareContext::new(surface, &shutdown_token);

    let (press_tx, press_rx) = mpsc::channel(PRESS_QUEUE_DEPTH);
    input::run_input_readers(
        context.input_tracker(),
        context.input_token(),
        &config.buttons,
        press_tx,
    );

    let launcher = ProcessLauncher::new(
        task_tracker.clone(),
        config.buttons.command_timeout(),
        shutdown_token.clone(),
    );
    let controller = ButtonController::new(
        &config.buttons.block.command,
        &config.buttons.allow.command,
        config.buttons.debounce(),
        launcher,
    );
    run_button_controller(&task_tracker, controller, press_rx, shutdown_token.clone());

    let probe = config.probe.build();
    let renderer = Renderer::new(&config.title_prefix);
    let status_loop = StatusLoop::new(&probe, &renderer, config.poll_interval());
    let result = status_loop.run(context.surface_mut(), &shutdown_token).await;

    shutdown_token.cancel();
    context.shutdown().await;
    task_tracker.close();
    task_tracker.wait().await;
    info!("filterpanel stopped");

    result.map(|frames| info!("drew {frames} frames")).map_err(DaemonError::from)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = std::env::args().nth(1);

    let config = match parse_config(config_path.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            filterpanel::init_logging(log::LevelFilter::Info);
            error!("{e}");
            std::process::exit(1);
        }
    };

    let level = if config.debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    filterpanel::init_logging(level);
    if config_path.is_none() {
        warn!("no config file given, using default config");
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}
