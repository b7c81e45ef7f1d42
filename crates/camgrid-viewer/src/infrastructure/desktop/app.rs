//! `ApplicationHandler` driving a [`Viewer`] from the winit event loop.

use std::time::Instant;

use camgrid_core::{CameraDescriptor, CameraId};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::ModifiersState;
use winit::monitor::MonitorHandle;
use winit::raw_window_handle::HasWindowHandle;
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use super::input::{key_press, ClickTracker};
use super::surfaces::{WindowRole, WinitSurfaceProvider};
use crate::application::layout_manager::LayoutManager;
use crate::application::session_binder::MediaBackend;
use crate::application::viewer::{
    FailureSink, Flow, SurfaceError, Viewer, ViewerConfig, ViewerEvent,
};

/// Title and initial size of the wall window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallWindow {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Wall window title: the configured title followed by what the wall shows.
pub fn wall_title(base: &str, layout: &LayoutManager) -> String {
    format!(
        "{base} - {} - {} visible - {}",
        layout.category(),
        layout.effective_visible_count(),
        layout.mode()
    )
}

struct Parts<B> {
    cameras: Vec<CameraDescriptor>,
    config: ViewerConfig,
    backend: B,
    failures: Box<dyn FailureSink + Send>,
}

enum Stage<B: MediaBackend> {
    /// Waiting for the first `resumed`.
    Pending(Parts<B>),
    Running(Viewer<B, WinitSurfaceProvider>),
    Finished,
}

/// The desktop camera wall.
pub struct DesktopApp<B: MediaBackend> {
    wall: WallWindow,
    stage: Stage<B>,
    modifiers: ModifiersState,
    clicks: ClickTracker<CameraId>,
    monitor: Option<MonitorHandle>,
    title: String,
}

impl<B: MediaBackend> DesktopApp<B> {
    pub fn new(
        wall: WallWindow,
        cameras: Vec<CameraDescriptor>,
        config: ViewerConfig,
        backend: B,
        failures: Box<dyn FailureSink + Send>,
    ) -> Self {
        Self {
            wall,
            stage: Stage::Pending(Parts {
                cameras,
                config,
                backend,
                failures,
            }),
            modifiers: ModifiersState::empty(),
            clicks: ClickTracker::new(),
            monitor: None,
            title: String::new(),
        }
    }

    /// Returns `true` once the wall has shut down.
    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Finished)
    }

    fn viewer(&mut self) -> Option<&mut Viewer<B, WinitSurfaceProvider>> {
        match &mut self.stage {
            Stage::Running(viewer) => Some(viewer),
            _ => None,
        }
    }

    // ── Startup ───────────────────────────────────────────────────────────────

    /// Creates the wall and one hidden child window per camera.
    fn build_surfaces(
        &self,
        event_loop: &ActiveEventLoop,
        cameras: &[CameraDescriptor],
    ) -> Result<WinitSurfaceProvider, SurfaceError> {
        let attrs = WindowAttributes::default()
            .with_title(self.wall.title.clone())
            .with_inner_size(PhysicalSize::new(self.wall.width, self.wall.height));
        let wall = event_loop
            .create_window(attrs)
            .map_err(|e| SurfaceError::WindowSystem(e.to_string()))?;
        let parent = wall
            .window_handle()
            .map_err(|e| SurfaceError::WindowSystem(e.to_string()))?
            .as_raw();

        let mut surfaces = WinitSurfaceProvider::new(wall);
        for camera in cameras {
            let attrs = WindowAttributes::default()
                .with_title(camera.overlay_label())
                .with_decorations(false)
                .with_visible(false);
            // SAFETY: `parent` is the wall window, which the provider owns and
            // drops after every tile.
            let attrs = unsafe { attrs.with_parent_window(Some(parent)) };
            match event_loop.create_window(attrs) {
                Ok(tile) => surfaces.adopt_tile(camera.id, tile)?,
                Err(e) => warn!(camera = %camera.id, error = %e, "cannot create tile window"),
            }
        }
        Ok(surfaces)
    }

    fn create_camera_window(
        event_loop: &ActiveEventLoop,
        camera: &CameraDescriptor,
    ) -> Option<Window> {
        let attrs = WindowAttributes::default()
            .with_title(camera.overlay_label())
            .with_fullscreen(Some(Fullscreen::Borderless(None)));
        match event_loop.create_window(attrs) {
            Ok(window) => Some(window),
            Err(e) => {
                warn!(camera = %camera.id, error = %e, "cannot create camera window");
                None
            }
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        let Some(viewer) = self.viewer() else {
            return;
        };
        let flow = viewer.handle_event(event, Instant::now());
        viewer.surfaces_mut().discard_prepared();
        if flow == Flow::Exit {
            self.finish(event_loop);
        }
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop) {
        if let Stage::Running(mut viewer) = std::mem::replace(&mut self.stage, Stage::Finished) {
            viewer.shutdown();
        }
        event_loop.exit();
    }

    fn open_camera(&mut self, event_loop: &ActiveEventLoop, camera: CameraId) {
        let Some(viewer) = self.viewer() else {
            return;
        };
        let Some(descriptor) = viewer.cameras().iter().find(|c| c.id == camera).cloned() else {
            return;
        };
        if viewer.fullscreen_camera() != Some(camera) {
            if let Some(window) = Self::create_camera_window(event_loop, &descriptor) {
                viewer.surfaces_mut().prepare_camera_window(camera, window);
            }
        }
        self.dispatch(event_loop, ViewerEvent::OpenFullscreen(camera));
    }

    fn wall_moved(&mut self, event_loop: &ActiveEventLoop) {
        let Some(viewer) = self.viewer() else {
            return;
        };
        let monitor = viewer.surfaces().wall().current_monitor();
        if monitor != self.monitor {
            let first = self.monitor.is_none();
            self.monitor = monitor;
            if !first {
                self.dispatch(event_loop, ViewerEvent::ScreenChanged);
            }
        }
    }

    fn refresh_title(&mut self) {
        let base = self.wall.title.clone();
        let Stage::Running(viewer) = &self.stage else {
            return;
        };
        let title = wall_title(&base, viewer.layout());
        if title != self.title {
            viewer.surfaces().wall().set_title(&title);
            self.title = title;
        }
    }
}

impl<B: MediaBackend> ApplicationHandler<ViewerEvent> for DesktopApp<B> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Stage::Pending(_) = self.stage else {
            return;
        };
        let Stage::Pending(parts) = std::mem::replace(&mut self.stage, Stage::Finished) else {
            return;
        };

        let surfaces = match self.build_surfaces(event_loop, &parts.cameras) {
            Ok(surfaces) => surfaces,
            Err(e) => {
                error!(error = %e, "cannot create the wall window");
                event_loop.exit();
                return;
            }
        };
        self.monitor = surfaces.wall().current_monitor();

        let mut viewer = Viewer::new(
            parts.cameras,
            parts.config,
            parts.backend,
            surfaces,
            parts.failures,
        );
        viewer.start(Instant::now());
        self.stage = Stage::Running(viewer);
        self.refresh_title();
        info!("desktop wall ready");
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        self.dispatch(event_loop, event);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(viewer) = self.viewer() else {
            return;
        };
        let Some(role) = viewer.surfaces().role_of(window_id) else {
            return;
        };

        match (role, event) {
            (_, WindowEvent::ModifiersChanged(modifiers)) => {
                self.modifiers = modifiers.state();
            }
            (WindowRole::Wall, WindowEvent::CloseRequested) => {
                info!("wall window closed");
                self.dispatch(event_loop, ViewerEvent::Shutdown);
            }
            (WindowRole::Wall, WindowEvent::Resized(_)) => {
                self.dispatch(event_loop, ViewerEvent::Resized);
            }
            (WindowRole::Wall, WindowEvent::Moved(_) | WindowEvent::ScaleFactorChanged { .. }) => {
                self.wall_moved(event_loop);
            }
            (WindowRole::Camera(camera), WindowEvent::CloseRequested) => {
                self.dispatch(event_loop, ViewerEvent::CloseFullscreen(camera));
            }
            (role, WindowEvent::KeyboardInput { event, .. }) => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let Some(press) = key_press(&event.logical_key, self.modifiers) else {
                    return;
                };
                let event = match role {
                    WindowRole::Camera(camera) => ViewerEvent::CameraWindowKey(camera, press),
                    WindowRole::Wall | WindowRole::Tile(_) => ViewerEvent::WallKey(press),
                };
                self.dispatch(event_loop, event);
            }
            (
                WindowRole::Tile(camera),
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                },
            ) => {
                if self.clicks.press(camera, Instant::now()) {
                    self.open_camera(event_loop, camera);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.is_finished() {
            event_loop.exit();
            return;
        }
        let Some(viewer) = self.viewer() else {
            return;
        };
        viewer.tick(Instant::now());
        let flow = match viewer.next_deadline() {
            Some(deadline) => ControlFlow::WaitUntil(deadline),
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(flow);
        self.refresh_title();
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Stage::Running(mut viewer) = std::mem::replace(&mut self.stage, Stage::Finished) {
            viewer.shutdown();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
