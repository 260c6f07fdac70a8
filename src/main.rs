//! InvoiceLens - OCR field overlay viewer
//!
//! Renders streamed invoice recognition results as positioned rectangles
//! over a document preview, with live progress and field inspection.

mod app;
mod config;
mod export;
mod fields;
mod geometry;
mod render;
mod state;
mod stream;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Sender;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::AppConfig;
use crate::stream::{client, ReconnectPolicy, StreamEvent};

/// InvoiceLens - field overlay viewer for streamed recognition results
#[derive(Parser, Debug)]
#[command(name = "invoice-lens")]
#[command(about = "Overlay viewer for streamed invoice recognition results")]
struct Args {
    /// Preview bitmap of the document page (PNG or JPEG)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Upload a PDF over plain HTTP instead of consuming the event stream
    #[arg(short, long)]
    upload: Option<PathBuf>,

    /// Backend base URL, overriding the configured one
    #[arg(long)]
    api_base: Option<String>,

    /// Path for exported JSON snapshots
    #[arg(long, default_value = "invoice-lens-export.json")]
    export: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("InvoiceLens starting...");

    // Load or create configuration
    let mut config = load_or_create_config();
    if let Some(base) = args.api_base {
        config.api.base_url = base;
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    info!("Session {}", session_id);

    let preview = match &args.document {
        Some(path) => Some(load_preview(path)?),
        None => None,
    };

    let (sender, receiver) = crossbeam_channel::unbounded();

    if let Some(pdf_path) = &args.upload {
        let bytes = std::fs::read(pdf_path)
            .with_context(|| format!("Failed to read {:?}", pdf_path))?;
        spawn_upload(config.clone(), session_id, bytes, sender);
    } else {
        spawn_stream(config.clone(), session_id, sender);
    }

    let viewer = app::ViewerApp::new(&config, receiver, preview, args.export);
    eframe::run_native(
        "InvoiceLens",
        app::ViewerApp::options(),
        Box::new(|_cc| Ok(Box::new(viewer))),
    )
    .map_err(|e| anyhow::anyhow!("Viewer window error: {}", e))?;

    info!("InvoiceLens shutdown complete");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        } else if config::save_config(&AppConfig::default(), &config_path).is_ok() {
            info!("Wrote default configuration to {:?}", config_path);
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Decode the preview bitmap into an egui-uploadable image
fn load_preview(path: &Path) -> Result<egui::ColorImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open document preview {:?}", path))?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    info!("Loaded document preview {:?} ({}x{})", path, size[0], size[1]);
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

/// Consume the backend event stream on a dedicated thread
fn spawn_stream(config: AppConfig, session_id: String, sender: Sender<StreamEvent>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to start async runtime: {}", e);
                return;
            }
        };

        let policy = ReconnectPolicy {
            max_attempts: config.stream.reconnect_attempts,
            base_delay: Duration::from_millis(config.stream.reconnect_base_delay_ms),
        };

        if let Err(e) = runtime.block_on(client::run_stream(
            &config.api.base_url,
            &session_id,
            &config.api.session_header,
            policy,
            sender,
        )) {
            error!("Event stream terminated: {}", e);
        }
    });
}

/// Upload a document over plain HTTP on a dedicated thread, replaying the
/// response through the same event channel the stream would use
fn spawn_upload(config: AppConfig, session_id: String, bytes: Vec<u8>, sender: Sender<StreamEvent>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to start async runtime: {}", e);
                return;
            }
        };

        let _ = sender.send(StreamEvent::ProcessingStart {});
        let _ = sender.send(StreamEvent::ProcessingStep {
            step: "received".to_string(),
            message: None,
        });

        match runtime.block_on(client::process_via_http(
            &config.api.base_url,
            &session_id,
            &config.api.session_header,
            bytes,
        )) {
            Ok(result) => {
                let _ = sender.send(StreamEvent::ProcessingComplete(result));
            }
            Err(e) => {
                error!("Upload failed: {}", e);
                let _ = sender.send(StreamEvent::Error {
                    message: Some(e.to_string()),
                });
            }
        }
    });
}
