//! CamGrid viewer, entry point.
//!
//! Loads the configuration, builds the media backend and the failure log,
//! then runs the camera wall in a desktop window until it is closed or
//! Ctrl+C is pressed.
//!
//! # Usage
//!
//! ```text
//! camgrid [OPTIONS]
//!
//! Options:
//!   --config   <PATH>   Configuration file [env: CAMGRID_CONFIG]
//!   --mode     <MODE>   Layout mode: grid or spanning
//!   --visible  <N>      Number of visible cameras in grid mode
//!   --category <AREA>   Only show cameras of this area ("all" for every area)
//!   --headless          Run without windows, on in-memory surfaces
//! ```
//!
//! The log level comes from `[viewer] log_level` in the config file; the
//! `RUST_LOG` environment variable overrides it.
//!
//! Built with the `gstreamer-backend` feature, streams are decoded with
//! GStreamer.  Without it streams are simulated by the recording backend,
//! which exercises layout, binding and health logic without decoding video.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::event_loop::{EventLoop, EventLoopProxy};

use camgrid_core::CameraDescriptor;
use camgrid_viewer::application::layout_manager::LayoutMode;
use camgrid_viewer::application::session_binder::MediaBackend;
use camgrid_viewer::application::viewer::{FailureSink, Viewer, ViewerEvent};
use camgrid_viewer::infrastructure::desktop::app::WallWindow;
use camgrid_viewer::infrastructure::desktop::DesktopApp;
use camgrid_viewer::infrastructure::event_loop;
use camgrid_viewer::infrastructure::failure_log::FileFailureLog;
use camgrid_viewer::infrastructure::storage::config::{load_config, load_config_from, AppConfig};
use camgrid_viewer::infrastructure::surface::HeadlessSurfaceProvider;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Multi-camera RTSP wall viewer.
#[derive(Debug, Parser)]
#[command(name = "camgrid", about = "Multi-camera RTSP wall viewer", version)]
struct Cli {
    /// Configuration file.  Defaults to `config.toml` in the platform config
    /// directory.
    #[arg(long, env = "CAMGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Layout mode: `grid` or `spanning`.
    #[arg(long)]
    mode: Option<LayoutMode>,

    /// Number of visible cameras in grid mode.
    #[arg(long)]
    visible: Option<usize>,

    /// Area filter; `all` shows every camera.
    #[arg(long)]
    category: Option<String>,

    /// Run without windows.  Tiles are kept in memory and video is not
    /// shown; useful for soak tests of the reconnect logic.
    #[arg(long)]
    headless: bool,
}

impl Cli {
    /// Applies the command-line overrides on top of the loaded config.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(mode) = self.mode {
            config.viewer.mode = mode;
        }
        if let Some(visible) = self.visible {
            config.layout.visible_count = visible;
        }
        if let Some(category) = &self.category {
            config.layout.category = category.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins over the configured level when it is set and valid.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.viewer.log_level)),
        )
        .init();

    let cameras = config.cameras_or_demo();
    info!(
        title = %config.viewer.title,
        cameras = cameras.len(),
        mode = %config.viewer.mode,
        headless = cli.headless,
        "CamGrid starting"
    );

    #[cfg(feature = "gstreamer-backend")]
    let backend = camgrid_viewer::infrastructure::media::gst_backend::GstMediaBackend::new()
        .context("failed to initialise GStreamer")?;
    #[cfg(not(feature = "gstreamer-backend"))]
    let backend = {
        tracing::warn!("built without a media backend, streams are simulated");
        camgrid_viewer::infrastructure::media::mock::RecordingMediaBackend::new()
    };

    let failures = Box::new(FileFailureLog::new(&config.viewer.failure_log_path));
    let runtime = Runtime::new().context("failed to start the async runtime")?;

    if cli.headless {
        run_headless(&runtime, &config, cameras, backend, failures);
    } else {
        run_desktop(&runtime, &config, cameras, backend, failures)?;
    }

    info!("CamGrid stopped");
    Ok(())
}

/// Runs the wall in winit windows on the main thread.
fn run_desktop<B: MediaBackend>(
    runtime: &Runtime,
    config: &AppConfig,
    cameras: Vec<CameraDescriptor>,
    backend: B,
    failures: Box<dyn FailureSink + Send>,
) -> anyhow::Result<()> {
    let mut builder = EventLoop::<ViewerEvent>::with_user_event();
    // Video overlays need X11 window ids; on Wayland desktops this runs
    // through XWayland.
    #[cfg(target_os = "linux")]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_x11();
    }
    let event_loop = builder
        .build()
        .context("failed to create the window event loop")?;
    spawn_ctrl_c(runtime, event_loop.create_proxy());

    let wall = WallWindow {
        title: config.viewer.title.clone(),
        width: config.viewer.window_width,
        height: config.viewer.window_height,
    };
    let mut app = DesktopApp::new(wall, cameras, config.viewer_config(), backend, failures);
    event_loop
        .run_app(&mut app)
        .context("window event loop failed")?;
    Ok(())
}

/// Runs the wall on in-memory surfaces until Ctrl+C.
fn run_headless<B: MediaBackend>(
    runtime: &Runtime,
    config: &AppConfig,
    cameras: Vec<CameraDescriptor>,
    backend: B,
    failures: Box<dyn FailureSink + Send>,
) {
    let surfaces = HeadlessSurfaceProvider::new(
        (config.viewer.window_width, config.viewer.window_height),
        (config.viewer.screen_width, config.viewer.screen_height),
    );
    let viewer = Viewer::new(cameras, config.viewer_config(), backend, surfaces, failures);

    let (events, receiver) = mpsc::channel(64);
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                let _ = events.send(ViewerEvent::Shutdown).await;
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    runtime.block_on(event_loop::run(viewer, receiver));
}

// ── Graceful shutdown ─────────────────────────────────────────────────────────

/// Forwards Ctrl+C into the window event loop as a shutdown.
fn spawn_ctrl_c(runtime: &Runtime, proxy: EventLoopProxy<ViewerEvent>) {
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                let _ = proxy.send_event(ViewerEvent::Shutdown);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_without_arguments_has_no_overrides() {
        // Arrange
        let cli = Cli::parse_from(["camgrid"]);
        let mut config = AppConfig::default();

        // Act
        cli.apply_overrides(&mut config);

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_cli_overrides_mode_visible_and_category() {
        let cli = Cli::parse_from([
            "camgrid",
            "--mode",
            "spanning",
            "--visible",
            "4",
            "--category",
            "Gate",
        ]);
        let mut config = AppConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.viewer.mode, LayoutMode::Spanning);
        assert_eq!(config.layout.visible_count, 4);
        assert_eq!(config.layout.category, "Gate");
    }

    #[test]
    fn test_cli_defaults_to_desktop_windows() {
        let cli = Cli::parse_from(["camgrid"]);

        assert!(!cli.headless);
    }

    #[test]
    fn test_cli_headless_flag() {
        let cli = Cli::parse_from(["camgrid", "--headless", "--visible", "2"]);

        assert!(cli.headless);
        assert_eq!(cli.visible, Some(2));
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let result = Cli::try_parse_from(["camgrid", "--mode", "mosaic"]);

        assert!(result.is_err());
    }
}
