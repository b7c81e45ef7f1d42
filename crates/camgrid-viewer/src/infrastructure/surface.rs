//! Surface provider adapters.
//!
//! [`HeadlessSurfaceProvider`] keeps every tile and camera window in memory
//! and hands out virtual [`SurfaceHandle::Headless`] handles.  It backs
//! `camgrid --headless` and the tests; the desktop front end hands out native
//! handles built with [`wrap_native_surface`] instead.

use std::collections::BTreeMap;

use camgrid_core::{CameraDescriptor, CameraId, Rect, SurfaceHandle};
use tracing::debug;

use crate::application::viewer::{SurfaceError, SurfaceProvider};

/// How many destroyed surfaces are remembered.
pub const DESTROYED_HISTORY: usize = 64;

/// Wraps a raw native window handle in the variant for the target platform.
#[cfg(target_os = "windows")]
pub fn wrap_native_surface(raw: usize) -> SurfaceHandle {
    SurfaceHandle::Win32(raw as isize)
}

/// Wraps a raw native window handle in the variant for the target platform.
#[cfg(target_os = "macos")]
pub fn wrap_native_surface(raw: usize) -> SurfaceHandle {
    SurfaceHandle::AppKit(raw)
}

/// Wraps a raw native window handle in the variant for the target platform.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn wrap_native_surface(raw: usize) -> SurfaceHandle {
    SurfaceHandle::Xlib(raw as u64)
}

/// A tile on the headless wall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTile {
    pub surface: SurfaceHandle,
    /// Text of the name/area overlay.
    pub label: String,
    /// Last placement; `None` until the first layout pass.
    pub rect: Option<Rect>,
    pub visible: bool,
}

/// A camera's own window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessWindow {
    pub surface: SurfaceHandle,
    pub fullscreen: bool,
    pub size: (u32, u32),
}

/// In-memory [`SurfaceProvider`].
#[derive(Debug, Clone)]
pub struct HeadlessSurfaceProvider {
    next_surface: u64,
    window_size: (u32, u32),
    screen_size: (u32, u32),
    wall_fullscreen: bool,
    tiles: BTreeMap<CameraId, HeadlessTile>,
    camera_windows: BTreeMap<CameraId, HeadlessWindow>,
    destroyed: Vec<SurfaceHandle>,
}

impl HeadlessSurfaceProvider {
    /// Creates a provider whose wall window is `window_size` on a screen of
    /// `screen_size`.
    pub fn new(window_size: (u32, u32), screen_size: (u32, u32)) -> Self {
        Self {
            next_surface: 1,
            window_size,
            screen_size,
            wall_fullscreen: false,
            tiles: BTreeMap::new(),
            camera_windows: BTreeMap::new(),
            destroyed: Vec::new(),
        }
    }

    fn allocate(&mut self) -> SurfaceHandle {
        let handle = SurfaceHandle::Headless(self.next_surface);
        self.next_surface += 1;
        handle
    }

    /// Size of a camera window when it leaves fullscreen.
    fn windowed_size(&self) -> (u32, u32) {
        (self.screen_size.0 / 2, self.screen_size.1 / 2)
    }

    /// Simulates the user resizing the wall window.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Simulates the wall moving to a screen of a different size.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_size = (width, height);
    }

    pub fn tile(&self, camera: CameraId) -> Option<&HeadlessTile> {
        self.tiles.get(&camera)
    }

    pub fn camera_window(&self, camera: CameraId) -> Option<&HeadlessWindow> {
        self.camera_windows.get(&camera)
    }

    /// Returns the most recently destroyed surfaces, oldest first, at most
    /// [`DESTROYED_HISTORY`] of them.
    pub fn destroyed_surfaces(&self) -> &[SurfaceHandle] {
        &self.destroyed
    }

    pub fn is_destroyed(&self, surface: SurfaceHandle) -> bool {
        self.destroyed.contains(&surface)
    }
}

impl SurfaceProvider for HeadlessSurfaceProvider {
    fn tile_surface(&mut self, camera: &CameraDescriptor) -> Result<SurfaceHandle, SurfaceError> {
        if let Some(tile) = self.tiles.get(&camera.id) {
            return Ok(tile.surface);
        }
        let surface = self.allocate();
        self.tiles.insert(
            camera.id,
            HeadlessTile {
                surface,
                label: camera.overlay_label(),
                rect: None,
                visible: false,
            },
        );
        debug!(camera = %camera.id, %surface, "tile created");
        Ok(surface)
    }

    fn place_tile(&mut self, camera: CameraId, rect: Rect) -> Result<(), SurfaceError> {
        let tile = self
            .tiles
            .get_mut(&camera)
            .ok_or(SurfaceError::UnknownCamera(camera))?;
        tile.rect = Some(rect);
        tile.visible = true;
        Ok(())
    }

    fn hide_tile(&mut self, camera: CameraId) -> Result<(), SurfaceError> {
        let tile = self
            .tiles
            .get_mut(&camera)
            .ok_or(SurfaceError::UnknownCamera(camera))?;
        tile.visible = false;
        Ok(())
    }

    fn open_fullscreen(
        &mut self,
        camera: &CameraDescriptor,
    ) -> Result<SurfaceHandle, SurfaceError> {
        if let Some(window) = self.camera_windows.get(&camera.id) {
            return Ok(window.surface);
        }
        let surface = self.allocate();
        self.camera_windows.insert(
            camera.id,
            HeadlessWindow {
                surface,
                fullscreen: true,
                size: self.screen_size,
            },
        );
        Ok(surface)
    }

    fn close_fullscreen(&mut self, camera: CameraId) -> Result<(), SurfaceError> {
        let window = self
            .camera_windows
            .remove(&camera)
            .ok_or(SurfaceError::UnknownCamera(camera))?;
        if self.destroyed.len() == DESTROYED_HISTORY {
            self.destroyed.remove(0);
        }
        self.destroyed.push(window.surface);
        Ok(())
    }

    fn set_camera_window_fullscreen(
        &mut self,
        camera: CameraId,
        fullscreen: bool,
    ) -> Result<(), SurfaceError> {
        let size = if fullscreen {
            self.screen_size
        } else {
            self.windowed_size()
        };
        let window = self
            .camera_windows
            .get_mut(&camera)
            .ok_or(SurfaceError::UnknownCamera(camera))?;
        window.fullscreen = fullscreen;
        window.size = size;
        Ok(())
    }

    fn camera_window_size(&self, camera: CameraId) -> Option<(u32, u32)> {
        self.camera_windows.get(&camera).map(|w| w.size)
    }

    fn resize_camera_window(
        &mut self,
        camera: CameraId,
        width: u32,
        height: u32,
    ) -> Result<(), SurfaceError> {
        let window = self
            .camera_windows
            .get_mut(&camera)
            .ok_or(SurfaceError::UnknownCamera(camera))?;
        window.size = (width, height);
        Ok(())
    }

    fn set_wall_fullscreen(&mut self, fullscreen: bool) -> Result<(), SurfaceError> {
        self.wall_fullscreen = fullscreen;
        Ok(())
    }

    fn wall_extent(&self) -> (u32, u32) {
        if self.wall_fullscreen {
            self.screen_size
        } else {
            self.window_size
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(id: u32) -> CameraDescriptor {
        CameraDescriptor::new(id, format!("Cam {id}"), "rtsp://x/", "Gate")
    }

    #[test]
    fn test_tile_surface_is_stable_per_camera() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));

        let first = provider.tile_surface(&camera(1)).unwrap();
        let again = provider.tile_surface(&camera(1)).unwrap();
        let other = provider.tile_surface(&camera(2)).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(provider.tile(CameraId(1)).unwrap().label, camera(1).overlay_label());
    }

    #[test]
    fn test_place_and_hide_tile() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));
        provider.tile_surface(&camera(1)).unwrap();
        let rect = Rect::new(0, 0, 800, 450);

        provider.place_tile(CameraId(1), rect).unwrap();
        assert!(provider.tile(CameraId(1)).unwrap().visible);

        provider.hide_tile(CameraId(1)).unwrap();
        let tile = provider.tile(CameraId(1)).unwrap();
        assert!(!tile.visible);
        assert_eq!(tile.rect, Some(rect));
    }

    #[test]
    fn test_place_unknown_tile_fails() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));

        let result = provider.place_tile(CameraId(9), Rect::new(0, 0, 1, 1));

        assert_eq!(result, Err(SurfaceError::UnknownCamera(CameraId(9))));
    }

    #[test]
    fn test_close_fullscreen_destroys_surface() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));
        let surface = provider.open_fullscreen(&camera(1)).unwrap();

        provider.close_fullscreen(CameraId(1)).unwrap();

        assert!(provider.is_destroyed(surface));
        assert!(provider.camera_window(CameraId(1)).is_none());
    }

    #[test]
    fn test_destroyed_history_keeps_only_recent_surfaces() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));
        let mut last = None;

        for _ in 0..DESTROYED_HISTORY + 6 {
            last = Some(provider.open_fullscreen(&camera(1)).unwrap());
            provider.close_fullscreen(CameraId(1)).unwrap();
        }

        assert_eq!(provider.destroyed_surfaces().len(), DESTROYED_HISTORY);
        assert_eq!(provider.destroyed_surfaces().last().copied(), last);
        assert!(!provider.is_destroyed(SurfaceHandle::Headless(1)));
    }

    #[test]
    fn test_camera_window_leaves_fullscreen_at_half_screen() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));
        provider.open_fullscreen(&camera(1)).unwrap();
        assert_eq!(provider.camera_window_size(CameraId(1)), Some((1920, 1080)));

        provider.set_camera_window_fullscreen(CameraId(1), false).unwrap();

        assert_eq!(provider.camera_window_size(CameraId(1)), Some((960, 540)));
    }

    #[test]
    fn test_wall_extent_follows_fullscreen() {
        let mut provider = HeadlessSurfaceProvider::new((1600, 900), (1920, 1080));
        assert_eq!(provider.wall_extent(), (1600, 900));

        provider.set_wall_fullscreen(true).unwrap();

        assert_eq!(provider.wall_extent(), (1920, 1080));
    }

    #[test]
    fn test_wrap_native_surface_is_native() {
        assert!(wrap_native_surface(0x1234).is_native());
        assert_eq!(wrap_native_surface(0x1234).as_raw(), 0x1234);
    }
}
