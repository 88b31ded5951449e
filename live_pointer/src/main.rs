//! eye-mouse: steer the pointer with your right iris, click by closing your left eye.

mod camera;
mod convert;
mod face_mesh;
mod pointer;
mod window;

use anyhow::{Context, Result};
use camera::OpenCvCamera;
use clap::Parser;
use face_mesh::OpenCvFaceMesh;
use gaze_pointer::{
    PointerConfig, PointerSession, SessionSummary,
    devices::{DebugDisplay, NullDisplay, PointerDriver},
    pipeline::ClampPolicy,
};
use pointer::{DryRunPointer, EnigoPointer};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use window::HighGuiWindow;

#[derive(Parser, Debug)]
#[command(name = "eye-mouse")]
#[command(version, about = "Hands-free pointer control from a webcam", long_about = None)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Camera index (overrides the config file and EYE_MOUSE_CAMERA)
    #[arg(long)]
    pub camera: Option<i32>,

    /// Run without the debug window
    #[arg(long)]
    pub headless: bool,

    /// Log pointer commands instead of moving and clicking
    #[arg(long)]
    pub dry_run: bool,

    /// Let cursor targets run past the display edges
    #[arg(long)]
    pub unclamped: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (pretty|compact|json)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!("eye-mouse v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args)?;
    tracing::debug!(?config, "configuration loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping after the current frame");
            let _ = shutdown_tx.send(true);
        }
    });

    // highgui and the camera stay on this one blocking thread for their whole life.
    let dry_run = args.dry_run;
    let summary = tokio::task::spawn_blocking(move || run_session(config, dry_run, shutdown_rx))
        .await
        .context("session thread panicked")??;

    info!(
        frames = summary.frames,
        clicks = summary.clicks,
        "eye-mouse stopped"
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<PointerConfig> {
    let mut config = match &args.config {
        Some(path) => PointerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PointerConfig::default(),
    };

    config.apply_env().context("invalid environment override")?;

    if let Some(index) = args.camera {
        config.camera.index = index;
    }
    if args.headless {
        config.display.enabled = false;
    }
    if args.unclamped {
        config.mapping.clamp = ClampPolicy::Unclamped;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_session(config: PointerConfig, dry_run: bool, shutdown: watch::Receiver<bool>) -> Result<SessionSummary> {
    let camera = OpenCvCamera::open(&config.camera)
        .with_context(|| format!("failed to open camera {}", config.camera.index))?;
    let detector = OpenCvFaceMesh::load(&config.detector).context("failed to load face mesh models")?;

    let pointer: Box<dyn PointerDriver> = if dry_run {
        Box::new(DryRunPointer::new(config.screen.resolve(DryRunPointer::DEFAULT_SCREEN)))
    } else {
        Box::new(EnigoPointer::new().context("failed to connect to the OS input system")?)
    };

    let display: Box<dyn DebugDisplay> = if config.display.enabled {
        Box::new(HighGuiWindow::open(&config.display.window_title).context("failed to open debug window")?)
    } else {
        Box::new(NullDisplay)
    };

    let mut session = PointerSession::new(camera, detector, pointer, display, &config)?;
    let summary = session.run(&shutdown)?;
    // Dropping the session releases the camera and closes the window.
    drop(session);
    Ok(summary)
}

fn init_logging(args: &Args) {
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "gaze_pointer={level},eye_mouse={level},warn",
            level = log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    match args.log_format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        "compact" => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}
