use anyhow::{Context, Result};
use lib_common::{LoggerLocal, LoggerLocalOptions, get_process_info};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

mod gsi_logic;
use gsi_logic::engine::ColorEngine;
use gsi_logic::error::GsiError;
use gsi_logic::openrgb::OpenRgbClient;
use gsi_logic::output::LightingDriver;
use gsi_logic::{config, ingest, output, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = config::load_config()?;
    let logger = LoggerLocal::init(LoggerLocalOptions {
        log_dir: settings.log_dir.clone(),
        log_level: settings.log_level.clone(),
        keep_files: settings.log_keep_files,
        ..Default::default()
    })?;

    info!(
        app = logger.app_name(),
        log_dir = %logger.log_dir().display(),
        listen = %settings.listen,
        "Starting game state lighting bridge"
    );
    match get_process_info() {
        Ok(process) => info!("{}", process),
        Err(e) => warn!(error = %e, "Could not read process info"),
    }

    let mut driver = OpenRgbClient::connect(settings.openrgb.clone())
        .await
        .map_err(|e| GsiError::StartupFault(e.to_string()))
        .with_context(|| {
            format!(
                "OpenRGB SDK server at {}:{} is required",
                settings.openrgb.host, settings.openrgb.port
            )
        })?;

    let devices = driver.device_names();
    if devices.is_empty() {
        warn!("OpenRGB reports no controllers");
    }
    for (index, name) in devices.iter().enumerate() {
        info!(index, "Found device: {}", name);
    }

    if let Some(color) = settings.startup_color {
        match driver.set_all(color).await {
            Ok(()) => info!(color = %color, "Startup test color applied"),
            Err(e) => warn!(error = %e, "Failed to apply startup test color"),
        }
    }

    let (shutdown_tx, _) = broadcast::channel(1);
    let (decision_tx, decision_rx) = watch::channel(None);
    let app_state = state::AppState::new(
        ColorEngine::new(settings.engine.clone()),
        settings.secret.as_str(),
        decision_tx,
    );

    let output_handle = tokio::spawn(output::run(
        driver,
        settings.idle_color,
        decision_rx,
        shutdown_tx.subscribe(),
    ));

    let mut ingest_handle = tokio::spawn(ingest::run(
        settings.listen,
        app_state,
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    let mut listener_failed = None;
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {}
        finished = &mut ingest_handle => {
            let err = match finished {
                Ok(Ok(())) => anyhow::anyhow!("GSI listener stopped unexpectedly"),
                Ok(Err(e)) => anyhow::Error::new(e).context(format!("GSI listener on {} failed", settings.listen)),
                Err(e) => anyhow::Error::new(e).context("GSI listener task panicked"),
            };
            error!("{:#}", err);
            listener_failed = Some(err);
        }
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    if listener_failed.is_none() {
        match ingest_handle.await {
            Ok(Err(e)) => error!(error = %e, "GSI listener failed during shutdown"),
            Err(e) => error!(error = %e, "GSI listener task panicked"),
            Ok(Ok(())) => {}
        }
    }
    if let Err(e) = output_handle.await {
        error!(error = %e, "Lighting output task panicked");
    }

    info!("Shutdown complete.");
    match listener_failed {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
