use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use quakebridge::notify::fcm::FcmNotifier;
use quakebridge::notify::Notifier;
use quakebridge::pipeline::{run_pipeline, Dispatcher};
use quakebridge::reader;
use quakebridge::settings::Settings;
use quakebridge::web::{self, WebState};

#[derive(Parser, Debug)]
#[command(
    name = "quakebridge",
    about = "Bridges a serial earthquake sensor node to a live dashboard and FCM push alerts"
)]
struct Cli {
    /// Path to a settings file (default: ~/.quakebridge/settings.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read lines from stdin instead of the serial port (simulation mode)
    #[arg(long)]
    stdin: bool,

    /// Override the serial device path
    #[arg(long)]
    serial_port: Option<String>,

    /// Override the dashboard listen port
    #[arg(long)]
    web_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut settings = match Settings::new(cli.config.clone()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = cli.serial_port {
        settings.serial.port = port;
    }
    if let Some(port) = cli.web_port {
        settings.dashboard.port = port;
    }

    // Dashboard state + server
    let web_state = WebState::new(settings.dashboard.history_capacity);
    let app_state = web_state.clone();
    let web_port = settings.dashboard.port;
    tokio::spawn(async move {
        let router = web::routes::create_router(app_state);
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", web_port))
            .await
            .expect("failed to bind dashboard port");
        info!("Dashboard server listening on {}", listener.local_addr().unwrap());
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .unwrap();
    });

    // Notification publisher: one-time credential load at startup
    let notifier: Option<Arc<dyn Notifier>> = if settings.notify.enabled {
        match FcmNotifier::from_settings(&settings.notify).await {
            Ok(notifier) => Some(Arc::new(notifier)),
            Err(e) => {
                error!("Failed to initialize notification publisher: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("Push notifications disabled");
        None
    };

    // Intake channel to the pipeline
    let (line_tx, line_rx) = mpsc::channel(100);
    let dispatcher = Dispatcher::new(web_state, notifier);
    let pipeline_handle = tokio::spawn(run_pipeline(line_rx, dispatcher));

    if cli.stdin {
        // --- Simulation Mode ---
        info!("Simulation mode: reading lines from stdin");
        reader::start_stdin_reader(line_tx).await;
        let _ = pipeline_handle.await;
        info!("Simulation complete.");
    } else {
        // --- Serial Mode ---
        if let Err(e) = reader::start_reader(&settings.serial, line_tx).await {
            error!("Serial reader error: {}", e);
            std::process::exit(1);
        }
        let _ = pipeline_handle.await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
