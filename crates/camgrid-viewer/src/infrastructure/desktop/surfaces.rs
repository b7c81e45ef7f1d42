//! [`SurfaceProvider`] over real winit windows.
//!
//! Windows can only be created inside the winit event loop, so this provider
//! never creates them itself.  [`DesktopApp`](super::DesktopApp) adopts the
//! tile windows at resume and prepares a camera window just before it asks
//! the viewer to open it; the provider only positions, shows, hides,
//! resizes and drops them.

use std::collections::BTreeMap;

use camgrid_core::{CameraDescriptor, CameraId, Rect, SurfaceHandle};
use tracing::debug;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::{Fullscreen, Window, WindowId};

use crate::application::viewer::{SurfaceError, SurfaceProvider};
use crate::infrastructure::surface::wrap_native_surface;

/// Converts a raw winit handle into a [`SurfaceHandle`] a video overlay can
/// render into.
///
/// # Errors
///
/// Returns [`SurfaceError::WindowSystem`] for handle kinds that carry no
/// window id a video sink can draw into (Wayland surfaces, for example).
pub fn surface_from_raw(raw: RawWindowHandle) -> Result<SurfaceHandle, SurfaceError> {
    match raw {
        RawWindowHandle::Xlib(h) => Ok(wrap_native_surface(h.window as usize)),
        RawWindowHandle::Xcb(h) => Ok(wrap_native_surface(h.window.get() as usize)),
        RawWindowHandle::Win32(h) => Ok(wrap_native_surface(h.hwnd.get() as usize)),
        RawWindowHandle::AppKit(h) => Ok(wrap_native_surface(h.ns_view.as_ptr() as usize)),
        other => Err(SurfaceError::WindowSystem(format!(
            "{other:?} windows cannot host a video overlay"
        ))),
    }
}

/// Reads the native surface of `window`.
pub fn window_surface(window: &Window) -> Result<SurfaceHandle, SurfaceError> {
    let handle = window
        .window_handle()
        .map_err(|e| SurfaceError::WindowSystem(e.to_string()))?;
    surface_from_raw(handle.as_raw())
}

/// Which part of the wall a window is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    Wall,
    Tile(CameraId),
    Camera(CameraId),
}

struct NativeWindow {
    window: Window,
    surface: SurfaceHandle,
}

impl NativeWindow {
    fn new(window: Window) -> Result<Self, SurfaceError> {
        let surface = window_surface(&window)?;
        Ok(Self { window, surface })
    }
}

/// Winit-backed [`SurfaceProvider`].
///
/// Tiles and camera windows are declared before the wall so they are
/// dropped first; the tiles are child windows of the wall.
pub struct WinitSurfaceProvider {
    tiles: BTreeMap<CameraId, NativeWindow>,
    camera_windows: BTreeMap<CameraId, NativeWindow>,
    prepared: Option<(CameraId, Window)>,
    wall: Window,
}

impl WinitSurfaceProvider {
    pub fn new(wall: Window) -> Self {
        Self {
            tiles: BTreeMap::new(),
            camera_windows: BTreeMap::new(),
            prepared: None,
            wall,
        }
    }

    pub fn wall(&self) -> &Window {
        &self.wall
    }

    /// Takes ownership of `camera`'s tile window.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::WindowSystem`] if the window has no usable
    /// native handle.
    pub fn adopt_tile(&mut self, camera: CameraId, window: Window) -> Result<(), SurfaceError> {
        let tile = NativeWindow::new(window)?;
        debug!(camera = %camera, surface = %tile.surface, "tile window adopted");
        self.tiles.insert(camera, tile);
        Ok(())
    }

    /// Parks a freshly created camera window until the viewer opens it.
    pub fn prepare_camera_window(&mut self, camera: CameraId, window: Window) {
        self.prepared = Some((camera, window));
    }

    /// Drops a prepared camera window the viewer did not take.
    pub fn discard_prepared(&mut self) {
        self.prepared = None;
    }

    /// Returns what `id` is, if it belongs to the wall.
    pub fn role_of(&self, id: WindowId) -> Option<WindowRole> {
        if self.wall.id() == id {
            return Some(WindowRole::Wall);
        }
        let find = |windows: &BTreeMap<CameraId, NativeWindow>| {
            windows
                .iter()
                .find(|(_, w)| w.window.id() == id)
                .map(|(camera, _)| *camera)
        };
        find(&self.tiles)
            .map(WindowRole::Tile)
            .or_else(|| find(&self.camera_windows).map(WindowRole::Camera))
    }

    fn tile_window(&self, camera: CameraId) -> Result<&NativeWindow, SurfaceError> {
        self.tiles.get(&camera).ok_or(SurfaceError::UnknownCamera(camera))
    }

    fn camera_window(&self, camera: CameraId) -> Result<&NativeWindow, SurfaceError> {
        self.camera_windows
            .get(&camera)
            .ok_or(SurfaceError::UnknownCamera(camera))
    }

    /// Offset of the wall's client area in the coordinates child windows are
    /// positioned in.
    fn tile_origin(&self) -> PhysicalPosition<i32> {
        // AppKit child windows are placed in screen coordinates.
        #[cfg(target_os = "macos")]
        {
            self.wall.inner_position().unwrap_or_default()
        }
        #[cfg(not(target_os = "macos"))]
        {
            PhysicalPosition::new(0, 0)
        }
    }
}

impl SurfaceProvider for WinitSurfaceProvider {
    fn tile_surface(&mut self, camera: &CameraDescriptor) -> Result<SurfaceHandle, SurfaceError> {
        Ok(self.tile_window(camera.id)?.surface)
    }

    fn place_tile(&mut self, camera: CameraId, rect: Rect) -> Result<(), SurfaceError> {
        let origin = self.tile_origin();
        let tile = self.tile_window(camera)?;
        tile.window.set_outer_position(PhysicalPosition::new(
            origin.x + rect.x as i32,
            origin.y + rect.y as i32,
        ));
        let _ = tile
            .window
            .request_inner_size(PhysicalSize::new(rect.width.max(1), rect.height.max(1)));
        tile.window.set_visible(true);
        Ok(())
    }

    fn hide_tile(&mut self, camera: CameraId) -> Result<(), SurfaceError> {
        self.tile_window(camera)?.window.set_visible(false);
        Ok(())
    }

    fn open_fullscreen(
        &mut self,
        camera: &CameraDescriptor,
    ) -> Result<SurfaceHandle, SurfaceError> {
        if let Some(window) = self.camera_windows.get(&camera.id) {
            return Ok(window.surface);
        }
        let window = match self.prepared.take() {
            Some((id, window)) if id == camera.id => window,
            other => {
                self.prepared = other;
                return Err(SurfaceError::WindowSystem(format!(
                    "no window prepared for camera {}",
                    camera.id
                )));
            }
        };
        let native = NativeWindow::new(window)?;
        let surface = native.surface;
        self.camera_windows.insert(camera.id, native);
        Ok(surface)
    }

    fn close_fullscreen(&mut self, camera: CameraId) -> Result<(), SurfaceError> {
        // Dropping the window destroys it.
        self.camera_windows
            .remove(&camera)
            .map(drop)
            .ok_or(SurfaceError::UnknownCamera(camera))
    }

    fn set_camera_window_fullscreen(
        &mut self,
        camera: CameraId,
        fullscreen: bool,
    ) -> Result<(), SurfaceError> {
        let window = &self.camera_window(camera)?.window;
        if fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            window.set_fullscreen(None);
            if let Some(monitor) = window.current_monitor() {
                let screen = monitor.size();
                let _ = window
                    .request_inner_size(PhysicalSize::new(screen.width / 2, screen.height / 2));
            }
        }
        Ok(())
    }

    fn camera_window_size(&self, camera: CameraId) -> Option<(u32, u32)> {
        let size = self.camera_windows.get(&camera)?.window.inner_size();
        Some((size.width, size.height))
    }

    fn resize_camera_window(
        &mut self,
        camera: CameraId,
        width: u32,
        height: u32,
    ) -> Result<(), SurfaceError> {
        let window = &self.camera_window(camera)?.window;
        let _ = window.request_inner_size(PhysicalSize::new(width, height));
        Ok(())
    }

    fn set_wall_fullscreen(&mut self, fullscreen: bool) -> Result<(), SurfaceError> {
        self.wall
            .set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
        Ok(())
    }

    fn wall_extent(&self) -> (u32, u32) {
        let size = self.wall.inner_size();
        (size.width, size.height)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::num::NonZeroIsize;
    use std::ptr::NonNull;

    use winit::raw_window_handle::{
        WaylandWindowHandle, Win32WindowHandle, XlibWindowHandle,
    };

    use super::*;

    #[test]
    fn test_xlib_handle_becomes_native_surface() {
        let raw = RawWindowHandle::Xlib(XlibWindowHandle::new(0x4a0_0007));

        let surface = surface_from_raw(raw).unwrap();

        assert!(surface.is_native());
        assert_eq!(surface.as_raw(), 0x4a0_0007);
    }

    #[test]
    fn test_win32_handle_keeps_its_value() {
        let hwnd = NonZeroIsize::new(0x1234).unwrap();
        let raw = RawWindowHandle::Win32(Win32WindowHandle::new(hwnd));

        let surface = surface_from_raw(raw).unwrap();

        assert_eq!(surface.as_raw(), 0x1234);
    }

    #[test]
    fn test_wayland_handle_is_rejected() {
        let raw = RawWindowHandle::Wayland(WaylandWindowHandle::new(NonNull::dangling()));

        let result = surface_from_raw(raw);

        assert!(matches!(result, Err(SurfaceError::WindowSystem(_))));
    }
}
