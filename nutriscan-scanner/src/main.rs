//! nutriscan - Barcode scanner console
//!
//! Mounts one scanner screen and drives it from stdin: typed commands stand in
//! for the buttons, `scan <code>` stands in for the camera. Product lookups
//! and submissions go to the configured catalog service.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nutriscan_common::config::{resolve_backend_url, LoggingConfig, TomlConfig, BACKEND_URL_ENV};
use nutriscan_common::events::EventBus;
use nutriscan_scanner::console::{self, ConsoleCommand};
use nutriscan_scanner::services::{CameraCapability, CatalogClient, PresetCamera};
use nutriscan_scanner::{spawn_flow, FlowConfig};

/// Command-line arguments for nutriscan
#[derive(Parser, Debug)]
#[command(name = "nutriscan")]
#[command(about = "Barcode scanner console for the NutriScan catalog service")]
#[command(version)]
struct Args {
    /// Catalog service base URL (overrides NUTRISCAN_BACKEND_URL and config file)
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Path to config.toml
    #[arg(short, long, env = "NUTRISCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Delay in milliseconds before a result returns to scanning
    #[arg(long)]
    reset_delay_ms: Option<u64>,

    /// Answer given to the camera permission request
    #[arg(long, value_enum, default_value_t = CameraAccess::Granted)]
    camera: CameraAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CameraAccess {
    Granted,
    Denied,
    /// Permission request fails outright
    Error,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.logging)?;

    info!("Starting nutriscan v{}", env!("CARGO_PKG_VERSION"));

    let backend_url = resolve_backend_url(args.backend_url.as_deref(), BACKEND_URL_ENV, &config)
        .context("Set --backend-url, NUTRISCAN_BACKEND_URL or backend_url in config.toml")?;
    info!("Catalog service: {}", backend_url);

    let mut settings = config.scanner.clone();
    if let Some(delay) = args.reset_delay_ms {
        settings.reset_delay_ms = delay;
    }

    let client = Arc::new(
        CatalogClient::new(&backend_url, settings.request_timeout())
            .context("Failed to create catalog client")?,
    );

    let camera: Arc<dyn CameraCapability> = Arc::new(match args.camera {
        CameraAccess::Granted => PresetCamera::granted(),
        CameraAccess::Denied => PresetCamera::denied(),
        CameraAccess::Error => PresetCamera::failing("camera unavailable"),
    });

    let event_bus = EventBus::new(100);
    let mut notices = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = notices.recv().await {
            if let Some(line) = console::render_notice(&event) {
                println!("{}", line);
            }
        }
    });

    let handle = spawn_flow(
        FlowConfig::from_settings(&settings),
        client.clone(),
        camera,
        event_bus.clone(),
    );

    let mut screen = handle.subscribe();
    tokio::spawn(async move {
        while screen.changed().await.is_ok() {
            let lines = console::render_snapshot(&screen.borrow_and_update());
            for line in lines {
                println!("{}", line);
            }
        }
    });

    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match console::parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let sent = match command {
            ConsoleCommand::Start => handle.start_scan().await,
            ConsoleCommand::Scan(code) => handle.decoded(code),
            ConsoleCommand::Again => handle.scan_another().await,
            ConsoleCommand::Menu => handle.back_to_menu().await,
            ConsoleCommand::Add {
                barcode,
                front,
                back,
            } => {
                if let Err(e) =
                    console::add_product(&client, &event_bus, &barcode, &front, back.as_deref())
                        .await
                {
                    warn!(barcode = %barcode, error = %e, "Product submission failed");
                }
                Ok(())
            }
            ConsoleCommand::Status => {
                for line in console::render_snapshot(&handle.snapshot()) {
                    println!("{}", line);
                }
                Ok(())
            }
            ConsoleCommand::Help => {
                println!("{}", console::HELP);
                Ok(())
            }
            ConsoleCommand::Quit => break,
        };

        if sent.is_err() {
            warn!("Scan flow ended unexpectedly");
            break;
        }
    }

    let final_state = handle.leave().await;
    info!(mode = %final_state.mode, "Scanner screen closed");

    Ok(())
}

/// Initialize tracing
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr, or to the
/// configured file, so they never interleave with the console screen.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
