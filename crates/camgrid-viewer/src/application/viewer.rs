//! The viewer state machine.
//!
//! [`Viewer`] owns everything the camera wall needs at runtime: the camera
//! list, the layout manager, the session binder, the health monitor and the
//! window system adapter.  It is strictly single-threaded and never sleeps or
//! spawns; time is passed in as an [`Instant`] on every call.
//!
//! # Driving the viewer (for beginners)
//!
//! The event loop does two things in a loop:
//!
//! 1. When a [`ViewerEvent`] arrives (resize, key press, menu choice) it calls
//!    [`Viewer::handle_event`].
//! 2. When the instant returned by [`Viewer::next_deadline`] passes it calls
//!    [`Viewer::tick`], which runs whatever timed work is due.
//!
//! Timed work replaces what a GUI would do with one-shot timers:
//!
//! - **Layout debounce** – a burst of resize events collapses into one layout
//!   pass a short settle delay after the last event.
//! - **Ratio samples** – the decoded video size is read a little after each
//!   start, once the first frames have arrived, so grid rows can match the
//!   camera's real aspect ratio.
//! - **Health polls** – every poll interval each stream's state is checked.
//!
//! Because nothing here depends on a real clock, tests can step the viewer
//! through seconds of behaviour instantly.
//!
//! # Failure reporting
//!
//! All playback failures end up in [`Viewer::report_failure`], which writes a
//! `tracing` error event and forwards the entry to the [`FailureSink`].  No
//! failure stops the viewer; the affected camera simply stays dark.

use std::time::{Duration, Instant};

use camgrid_core::{
    next_area, stall_reason, CameraDescriptor, CameraId, CategoryFilter, HealthPolicy, MediaOptions, Rect,
    SurfaceHandle,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::health_monitor::{HealthMonitor, StallFinding};
use super::keys::{
    map_camera_window_key, map_wall_key, zoom_size, CameraWindowCommand, KeyPress, WallCommand,
};
use super::layout_manager::{LayoutManager, LayoutMode, LayoutPlan, LayoutSettings};
use super::session_binder::{MediaBackend, SessionBinder, StartOutcome};

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Error type for window system operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// No surface exists for this camera.
    #[error("camera {0} has no surface")]
    UnknownCamera(CameraId),

    /// The window system rejected the request.
    #[error("window system error: {0}")]
    WindowSystem(String),
}

/// Abstraction over the window system that owns the real surfaces.
///
/// Each camera has one tile surface on the wall for its whole lifetime, and at
/// most one camera at a time has an extra fullscreen window.
pub trait SurfaceProvider {
    /// Returns the camera's tile surface, creating it (with its overlay label)
    /// on first use.
    fn tile_surface(&mut self, camera: &CameraDescriptor) -> Result<SurfaceHandle, SurfaceError>;

    /// Moves the camera's tile to `rect` and shows it.
    fn place_tile(&mut self, camera: CameraId, rect: Rect) -> Result<(), SurfaceError>;

    /// Hides the camera's tile.
    fn hide_tile(&mut self, camera: CameraId) -> Result<(), SurfaceError>;

    /// Opens a fullscreen window for the camera and returns its surface.
    fn open_fullscreen(&mut self, camera: &CameraDescriptor)
        -> Result<SurfaceHandle, SurfaceError>;

    /// Destroys the camera's fullscreen window.
    fn close_fullscreen(&mut self, camera: CameraId) -> Result<(), SurfaceError>;

    /// Switches the camera's window between fullscreen and windowed.
    fn set_camera_window_fullscreen(
        &mut self,
        camera: CameraId,
        fullscreen: bool,
    ) -> Result<(), SurfaceError>;

    /// Returns the camera window's current size.
    fn camera_window_size(&self, camera: CameraId) -> Option<(u32, u32)>;

    fn resize_camera_window(
        &mut self,
        camera: CameraId,
        width: u32,
        height: u32,
    ) -> Result<(), SurfaceError>;

    /// Switches the wall window between fullscreen and windowed.
    fn set_wall_fullscreen(&mut self, fullscreen: bool) -> Result<(), SurfaceError>;

    /// Returns the space available for tiles, in pixels.
    fn wall_extent(&self) -> (u32, u32);
}

/// Destination of camera failure entries.
pub trait FailureSink {
    /// Records one failure.  Implementations must not fail the caller.
    fn record(&mut self, url: &str, reason: &str);
}

// ── Events and configuration ──────────────────────────────────────────────────

/// Input to the viewer from the window system and the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The wall window changed size.
    Resized,
    /// The wall window moved to another screen.
    ScreenChanged,
    SetVisibleCount(usize),
    SetCategory(CategoryFilter),
    SetMode(LayoutMode),
    /// A tile was double-clicked.
    OpenFullscreen(CameraId),
    /// A camera window was closed by the window manager.
    CloseFullscreen(CameraId),
    /// A key was pressed in the wall window.
    WallKey(KeyPress),
    /// A key was pressed in a camera's fullscreen window.
    CameraWindowKey(CameraId, KeyPress),
    /// The wall window is closing.
    Shutdown,
}

/// Whether the event loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Static configuration of a [`Viewer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub layout: LayoutSettings,
    pub media: MediaOptions,
    pub health: HealthPolicy,
    /// Delay between the last layout trigger and the layout pass.
    pub settle_delay: Duration,
    /// When to sample the decoded video size after each start.
    pub ratio_sample_delays: Vec<Duration>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            layout: LayoutSettings::default(),
            media: MediaOptions::default(),
            health: HealthPolicy::default(),
            settle_delay: Duration::from_millis(50),
            ratio_sample_delays: vec![Duration::from_millis(1200), Duration::from_millis(2500)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FullscreenView {
    camera: CameraId,
    windowed: bool,
}

// ── Viewer ────────────────────────────────────────────────────────────────────

/// The camera wall.
pub struct Viewer<B, S> {
    cameras: Vec<CameraDescriptor>,
    layout: LayoutManager,
    binder: SessionBinder<B>,
    health: HealthMonitor,
    surfaces: S,
    failures: Box<dyn FailureSink + Send>,
    settle_delay: Duration,
    ratio_sample_delays: Vec<Duration>,
    pending_layout: Option<Instant>,
    ratio_samples: Vec<(Instant, CameraId)>,
    fullscreen: Option<FullscreenView>,
    wall_fullscreen: bool,
    last_plan: Option<LayoutPlan>,
    stopped: bool,
}

impl<B: MediaBackend, S: SurfaceProvider> Viewer<B, S> {
    pub fn new(
        cameras: Vec<CameraDescriptor>,
        config: ViewerConfig,
        backend: B,
        surfaces: S,
        failures: Box<dyn FailureSink + Send>,
    ) -> Self {
        Self {
            cameras,
            layout: LayoutManager::new(config.layout),
            binder: SessionBinder::new(backend, config.media, config.health),
            health: HealthMonitor::new(config.health),
            surfaces,
            failures,
            settle_delay: config.settle_delay,
            ratio_sample_delays: config.ratio_sample_delays,
            pending_layout: None,
            ratio_samples: Vec::new(),
            fullscreen: None,
            wall_fullscreen: false,
            last_plan: None,
            stopped: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn cameras(&self) -> &[CameraDescriptor] {
        &self.cameras
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn binder(&self) -> &SessionBinder<B> {
        &self.binder
    }

    pub fn surfaces(&self) -> &S {
        &self.surfaces
    }

    /// Gives the window system adapter access to its own state, e.g. to
    /// record a new window size before sending [`ViewerEvent::Resized`].
    pub fn surfaces_mut(&mut self) -> &mut S {
        &mut self.surfaces
    }

    /// Returns the plan of the most recent layout pass.
    pub fn last_plan(&self) -> Option<&LayoutPlan> {
        self.last_plan.as_ref()
    }

    /// Returns the camera currently shown in its own window.
    pub fn fullscreen_camera(&self) -> Option<CameraId> {
        self.fullscreen.map(|f| f.camera)
    }

    pub fn is_wall_fullscreen(&self) -> bool {
        self.wall_fullscreen
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Returns the earliest instant at which [`Viewer::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.stopped {
            return None;
        }
        [
            self.pending_layout,
            self.ratio_samples.iter().map(|(at, _)| *at).min(),
            self.health.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Creates every tile, starts every stream and arms the first layout pass
    /// and health poll.
    pub fn start(&mut self, now: Instant) {
        info!(cameras = self.cameras.len(), "starting camera wall");

        for index in 0..self.cameras.len() {
            let camera = self.cameras[index].clone();
            match self.surfaces.tile_surface(&camera) {
                Ok(surface) => self.start_camera(&camera, surface, now),
                Err(e) => warn!(camera = %camera.id, error = %e, "no tile surface, camera skipped"),
            }
        }

        self.health.schedule(now);
        self.request_layout(now);
    }

    /// Stops every stream and closes the fullscreen window, if any.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        if let Err(e) = self.binder.stop_all() {
            warn!(error = %e, "error while stopping playback");
        }
        // Nothing is bound any more, so the window can go without a rebind.
        if let Some(camera) = self.fullscreen_camera() {
            if let Err(e) = self.surfaces.close_fullscreen(camera) {
                warn!(camera = %camera, error = %e, "cannot close fullscreen window");
            }
            self.fullscreen = None;
        }
        self.health.cancel();
        self.pending_layout = None;
        self.ratio_samples.clear();
        self.stopped = true;
        info!("camera wall stopped");
    }

    /// Applies one event.
    pub fn handle_event(&mut self, event: ViewerEvent, now: Instant) -> Flow {
        if self.stopped {
            return Flow::Exit;
        }
        debug!(?event, "viewer event");

        match event {
            ViewerEvent::Resized | ViewerEvent::ScreenChanged => self.request_layout(now),
            ViewerEvent::SetVisibleCount(count) => {
                if self.layout.set_visible_count(count) {
                    self.request_layout(now);
                }
            }
            ViewerEvent::SetCategory(category) => {
                if self.layout.set_category(category) {
                    self.request_layout(now);
                }
            }
            ViewerEvent::SetMode(mode) => {
                if self.layout.set_mode(mode) {
                    self.request_layout(now);
                }
            }
            ViewerEvent::OpenFullscreen(camera) => self.open_fullscreen(camera, now),
            ViewerEvent::CloseFullscreen(camera) => self.close_fullscreen(camera, now),
            ViewerEvent::WallKey(press) => self.handle_wall_key(press, now),
            ViewerEvent::CameraWindowKey(camera, press) => {
                self.handle_camera_key(camera, press, now)
            }
            ViewerEvent::Shutdown => {
                self.shutdown();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// Runs all timed work that is due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.stopped {
            return;
        }

        if self.pending_layout.is_some_and(|due| now >= due) {
            self.pending_layout = None;
            self.run_layout_pass();
        }

        let (due, later): (Vec<_>, Vec<_>) =
            self.ratio_samples.drain(..).partition(|(at, _)| now >= *at);
        self.ratio_samples = later;
        for (_, camera) in due {
            self.sample_ratio(camera, now);
        }

        if self.health.is_due(now) {
            let findings = self.health.poll(&mut self.binder, &self.cameras, now);
            for finding in findings {
                self.handle_stall(finding, now);
            }
        }
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    /// Schedules a layout pass one settle delay from `now`, replacing any
    /// pass already pending.
    pub fn request_layout(&mut self, now: Instant) {
        self.pending_layout = Some(now + self.settle_delay);
    }

    fn run_layout_pass(&mut self) {
        let (width, height) = self.surfaces.wall_extent();
        let binder = &self.binder;
        let plan = match self
            .layout
            .compute(&self.cameras, width, height, |id| binder.ratio(id))
        {
            Ok(plan) => plan,
            Err(e) => {
                error!(error = %e, "layout pass failed");
                return;
            }
        };
        debug!(
            width,
            height,
            visible = plan.visible_indices().len(),
            "applying layout"
        );

        let fullscreen = self.fullscreen_camera();
        for (index, region) in plan.regions().iter().enumerate() {
            let id = self.cameras[index].id;
            let Some(rect) = region else {
                if let Err(e) = self.surfaces.hide_tile(id) {
                    warn!(camera = %id, error = %e, "cannot hide tile");
                }
                continue;
            };
            if let Err(e) = self.surfaces.place_tile(id, *rect) {
                warn!(camera = %id, error = %e, "cannot place tile");
                continue;
            }
            // A fullscreen camera keeps rendering into its own window.
            if fullscreen == Some(id) || !self.binder.tracks(id) {
                continue;
            }
            match self.surfaces.tile_surface(&self.cameras[index]) {
                Ok(surface) => match self.binder.rebind(id, surface) {
                    Ok(true) => debug!(camera = %id, %surface, "session rebound to tile"),
                    Ok(false) => {}
                    Err(e) => self.report_failure(id, &e.to_string()),
                },
                Err(e) => warn!(camera = %id, error = %e, "no tile surface"),
            }
        }

        self.last_plan = Some(plan);
    }

    // ── Playback ──────────────────────────────────────────────────────────────

    fn start_camera(&mut self, camera: &CameraDescriptor, surface: SurfaceHandle, now: Instant) {
        match self.binder.start(camera, surface, now) {
            Ok(StartOutcome::Started(session)) => {
                info!(camera = %camera.id, name = %camera.name, %session, "playback started");
                self.schedule_ratio_samples(camera.id, now);
            }
            Ok(StartOutcome::Placeholder) => {
                debug!(camera = %camera.id, "placeholder camera, no stream to start");
            }
            Ok(StartOutcome::Debounced) => {
                debug!(camera = %camera.id, "start ignored, previous attempt too recent");
            }
            Err(e) => {
                self.report_failure(camera.id, &e.to_string());
                if let Some(health) = self.binder.health_mut(camera.id) {
                    health.mark_reported();
                }
            }
        }
    }

    fn schedule_ratio_samples(&mut self, camera: CameraId, now: Instant) {
        for delay in &self.ratio_sample_delays {
            self.ratio_samples.push((now + *delay, camera));
        }
    }

    fn sample_ratio(&mut self, camera: CameraId, now: Instant) {
        match self.binder.sample_video_ratio(camera) {
            Ok(true) => {
                debug!(camera = %camera, ratio = ?self.binder.ratio(camera), "video ratio changed");
                if self.layout.mode() == LayoutMode::Grid {
                    self.request_layout(now);
                }
            }
            Ok(false) => {}
            Err(e) => debug!(camera = %camera, error = %e, "ratio sample skipped"),
        }
    }

    fn handle_stall(&mut self, finding: StallFinding, now: Instant) {
        if finding.log {
            self.report_failure(finding.camera, &stall_reason(finding.state));
        }
        if !finding.reconnect {
            return;
        }
        let Some(camera) = self.camera(finding.camera).cloned() else {
            return;
        };

        match self.binder.restart(&camera, now) {
            Ok(StartOutcome::Started(session)) => {
                info!(camera = %camera.id, %session, "stream restarted");
                self.schedule_ratio_samples(camera.id, now);
            }
            Ok(_) => {}
            Err(e) => {
                self.report_failure(camera.id, &e.to_string());
                if let Some(health) = self.binder.health_mut(camera.id) {
                    health.mark_reported();
                }
            }
        }
    }

    /// Logs a camera failure and forwards it to the failure sink.
    pub fn report_failure(&mut self, camera: CameraId, reason: &str) {
        let url = self
            .cameras
            .iter()
            .find(|c| c.id == camera)
            .map(|c| c.url.as_str())
            .unwrap_or_default();
        error!(camera = %camera, url, reason, "camera failure");
        self.failures.record(url, reason);
    }

    fn camera(&self, id: CameraId) -> Option<&CameraDescriptor> {
        self.cameras.iter().find(|c| c.id == id)
    }

    // ── Fullscreen ────────────────────────────────────────────────────────────

    fn open_fullscreen(&mut self, id: CameraId, now: Instant) {
        if self.fullscreen_camera() == Some(id) {
            return;
        }
        if let Some(current) = self.fullscreen_camera() {
            self.close_fullscreen(current, now);
        }
        let Some(camera) = self.camera(id).cloned() else {
            warn!(camera = %id, "fullscreen requested for unknown camera");
            return;
        };

        let surface = match self.surfaces.open_fullscreen(&camera) {
            Ok(surface) => surface,
            Err(e) => {
                warn!(camera = %id, error = %e, "cannot open fullscreen window");
                return;
            }
        };
        self.fullscreen = Some(FullscreenView {
            camera: id,
            windowed: false,
        });

        if self.binder.tracks(id) {
            if let Err(e) = self.binder.rebind(id, surface) {
                self.report_failure(id, &e.to_string());
            }
        }
        info!(camera = %id, %surface, "camera fullscreen opened");
    }

    /// Moves the session back to its tile, then destroys the fullscreen window.
    fn close_fullscreen(&mut self, id: CameraId, now: Instant) {
        if self.fullscreen_camera() != Some(id) {
            return;
        }
        let Some(camera) = self.camera(id).cloned() else {
            return;
        };

        if self.binder.tracks(id) {
            match self.surfaces.tile_surface(&camera) {
                Ok(tile) => {
                    if let Err(e) = self.binder.rebind(id, tile) {
                        self.report_failure(id, &e.to_string());
                        self.restart_on_tile(&camera, now);
                    }
                }
                Err(e) => {
                    warn!(camera = %id, error = %e, "no tile surface to return to");
                    self.binder.detach(id);
                }
            }
        }
        if let Err(e) = self.surfaces.close_fullscreen(id) {
            warn!(camera = %id, error = %e, "cannot close fullscreen window");
        }
        self.fullscreen = None;
        info!(camera = %id, "camera fullscreen closed");
    }

    /// Recovers a session whose move back to its tile failed.
    ///
    /// The session must not outlive the fullscreen window it is still bound
    /// to: it is restarted into the tile, or released when a restart is not
    /// allowed yet.  A released camera is picked up by the health monitor.
    fn restart_on_tile(&mut self, camera: &CameraDescriptor, now: Instant) {
        match self.binder.restart(camera, now) {
            Ok(StartOutcome::Started(session)) => {
                info!(camera = %camera.id, %session, "stream restarted on its tile");
                self.schedule_ratio_samples(camera.id, now);
                return;
            }
            Ok(_) => {}
            Err(e) => self.report_failure(camera.id, &e.to_string()),
        }
        self.binder.detach(camera.id);
        if let Some(health) = self.binder.health_mut(camera.id) {
            health.mark_reported();
        }
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    fn handle_wall_key(&mut self, press: KeyPress, now: Instant) {
        match map_wall_key(press, self.fullscreen.is_some()) {
            Some(WallCommand::ToggleWallFullscreen) => {
                self.wall_fullscreen = !self.wall_fullscreen;
                if let Err(e) = self.surfaces.set_wall_fullscreen(self.wall_fullscreen) {
                    warn!(error = %e, "cannot toggle wall fullscreen");
                }
                self.request_layout(now);
            }
            Some(WallCommand::CloseCameraFullscreen) => {
                if let Some(camera) = self.fullscreen_camera() {
                    self.close_fullscreen(camera, now);
                }
            }
            Some(WallCommand::NextArea) => {
                let next = next_area(&self.cameras, self.layout.category());
                info!(area = %next, "area selected");
                if self.layout.set_category(next) {
                    self.request_layout(now);
                }
            }
            Some(WallCommand::SetVisibleCount(count)) => {
                if self.layout.set_visible_count(count) {
                    self.request_layout(now);
                }
            }
            Some(WallCommand::ToggleMode) => {
                let mode = match self.layout.mode() {
                    LayoutMode::Grid => LayoutMode::Spanning,
                    LayoutMode::Spanning => LayoutMode::Grid,
                };
                if self.layout.set_mode(mode) {
                    self.request_layout(now);
                }
            }
            None => {}
        }
    }

    fn handle_camera_key(&mut self, id: CameraId, press: KeyPress, now: Instant) {
        let Some(view) = self.fullscreen.filter(|f| f.camera == id) else {
            return;
        };

        match map_camera_window_key(press, view.windowed) {
            Some(CameraWindowCommand::Close) => self.close_fullscreen(id, now),
            Some(CameraWindowCommand::ToggleFullscreen) => {
                let windowed = !view.windowed;
                match self.surfaces.set_camera_window_fullscreen(id, !windowed) {
                    Ok(()) => {
                        self.fullscreen = Some(FullscreenView { windowed, ..view });
                    }
                    Err(e) => warn!(camera = %id, error = %e, "cannot toggle camera fullscreen"),
                }
            }
            Some(CameraWindowCommand::Zoom(factor)) => {
                let Some((width, height)) = self.surfaces.camera_window_size(id) else {
                    return;
                };
                let (w, h) = zoom_size(width, height, factor);
                if let Err(e) = self.surfaces.resize_camera_window(id, w, h) {
                    warn!(camera = %id, error = %e, "cannot resize camera window");
                }
            }
            None => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
