//! Keyboard command mapping.
//!
//! Key handling is split in two: the camera wall and a camera's own
//! fullscreen window react to different keys.  The mapping functions here
//! are pure; the viewer applies the commands they return.
//!
//! | Window            | Key            | Command                           |
//! |-------------------|----------------|-----------------------------------|
//! | camera window     | `Esc`, `Q`     | close the window                  |
//! | camera window     | `F`            | toggle fullscreen / windowed      |
//! | camera (windowed) | `+`, `=`       | zoom in ×1.2                      |
//! | camera (windowed) | `-`            | zoom out ×0.8 (min 200×150)       |
//! | wall              | `Ctrl+F`       | toggle wall fullscreen            |
//! | wall              | `Esc`          | close the fullscreen camera       |
//! | wall              | `A`            | next area in the selector         |
//! | wall              | `1`..`9`       | number of visible cameras         |
//! | wall              | `M`            | switch grid / spanning layout     |

/// Growth factor of one zoom-in step.
pub const ZOOM_IN_FACTOR: f64 = 1.2;
/// Shrink factor of one zoom-out step.
pub const ZOOM_OUT_FACTOR: f64 = 0.8;
/// Smallest size a camera window can be zoomed down to.
pub const MIN_WINDOW_SIZE: (u32, u32) = (200, 150);

/// A key as delivered by the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Char(char),
}

/// A key press with the modifier state the mapping cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn ctrl(key: Key) -> Self {
        Self { key, ctrl: true }
    }
}

/// Commands for a camera's fullscreen window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraWindowCommand {
    Close,
    ToggleFullscreen,
    Zoom(f64),
}

/// Commands for the camera wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallCommand {
    ToggleWallFullscreen,
    CloseCameraFullscreen,
    NextArea,
    SetVisibleCount(usize),
    ToggleMode,
}

/// Maps a key pressed in a camera window.  Zoom keys only apply when the
/// window is not fullscreen.
pub fn map_camera_window_key(press: KeyPress, windowed: bool) -> Option<CameraWindowCommand> {
    match press.key {
        Key::Escape => Some(CameraWindowCommand::Close),
        Key::Char(c) => match c.to_ascii_lowercase() {
            'q' => Some(CameraWindowCommand::Close),
            'f' => Some(CameraWindowCommand::ToggleFullscreen),
            '+' | '=' if windowed => Some(CameraWindowCommand::Zoom(ZOOM_IN_FACTOR)),
            '-' if windowed => Some(CameraWindowCommand::Zoom(ZOOM_OUT_FACTOR)),
            _ => None,
        },
    }
}

/// Maps a key pressed in the wall window.
pub fn map_wall_key(press: KeyPress, camera_fullscreen: bool) -> Option<WallCommand> {
    match press.key {
        Key::Char(c) if press.ctrl && c.eq_ignore_ascii_case(&'f') => {
            Some(WallCommand::ToggleWallFullscreen)
        }
        Key::Escape if camera_fullscreen => Some(WallCommand::CloseCameraFullscreen),
        Key::Char(c) if !press.ctrl => match c.to_ascii_lowercase() {
            'a' => Some(WallCommand::NextArea),
            'm' => Some(WallCommand::ToggleMode),
            digit => match digit.to_digit(10) {
                Some(n @ 1..=9) => Some(WallCommand::SetVisibleCount(n as usize)),
                _ => None,
            },
        },
        _ => None,
    }
}

/// Scales a window size by `factor`, truncating, and never below
/// [`MIN_WINDOW_SIZE`].
pub fn zoom_size(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |v: u32, min: u32| ((f64::from(v) * factor) as u32).max(min);
    (
        scale(width, MIN_WINDOW_SIZE.0),
        scale(height, MIN_WINDOW_SIZE.1),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_and_q_close_camera_window() {
        assert_eq!(
            map_camera_window_key(KeyPress::plain(Key::Escape), false),
            Some(CameraWindowCommand::Close)
        );
        assert_eq!(
            map_camera_window_key(KeyPress::plain(Key::Char('Q')), true),
            Some(CameraWindowCommand::Close)
        );
    }

    #[test]
    fn test_f_toggles_camera_fullscreen() {
        assert_eq!(
            map_camera_window_key(KeyPress::plain(Key::Char('f')), false),
            Some(CameraWindowCommand::ToggleFullscreen)
        );
    }

    #[test]
    fn test_zoom_keys_only_when_windowed() {
        assert_eq!(
            map_camera_window_key(KeyPress::plain(Key::Char('+')), true),
            Some(CameraWindowCommand::Zoom(ZOOM_IN_FACTOR))
        );
        assert_eq!(
            map_camera_window_key(KeyPress::plain(Key::Char('=')), true),
            Some(CameraWindowCommand::Zoom(ZOOM_IN_FACTOR))
        );
        assert_eq!(
            map_camera_window_key(KeyPress::plain(Key::Char('-')), true),
            Some(CameraWindowCommand::Zoom(ZOOM_OUT_FACTOR))
        );
        assert_eq!(map_camera_window_key(KeyPress::plain(Key::Char('+')), false), None);
        assert_eq!(map_camera_window_key(KeyPress::plain(Key::Char('-')), false), None);
    }

    #[test]
    fn test_ctrl_f_toggles_wall_fullscreen() {
        assert_eq!(
            map_wall_key(KeyPress::ctrl(Key::Char('F')), false),
            Some(WallCommand::ToggleWallFullscreen)
        );
        assert_eq!(map_wall_key(KeyPress::plain(Key::Char('f')), false), None);
    }

    #[test]
    fn test_wall_escape_closes_camera_fullscreen_only_when_open() {
        assert_eq!(
            map_wall_key(KeyPress::plain(Key::Escape), true),
            Some(WallCommand::CloseCameraFullscreen)
        );
        assert_eq!(map_wall_key(KeyPress::plain(Key::Escape), false), None);
    }

    #[test]
    fn test_wall_selector_keys() {
        assert_eq!(
            map_wall_key(KeyPress::plain(Key::Char('A')), false),
            Some(WallCommand::NextArea)
        );
        assert_eq!(
            map_wall_key(KeyPress::plain(Key::Char('m')), false),
            Some(WallCommand::ToggleMode)
        );
        assert_eq!(
            map_wall_key(KeyPress::plain(Key::Char('4')), true),
            Some(WallCommand::SetVisibleCount(4))
        );
        assert_eq!(map_wall_key(KeyPress::plain(Key::Char('0')), false), None);
        assert_eq!(map_wall_key(KeyPress::ctrl(Key::Char('a')), false), None);
    }

    #[test]
    fn test_zoom_size_truncates() {
        assert_eq!(zoom_size(800, 450, ZOOM_IN_FACTOR), (960, 540));
        assert_eq!(zoom_size(801, 451, ZOOM_OUT_FACTOR), (640, 360));
    }

    #[test]
    fn test_zoom_out_stops_at_minimum_size() {
        assert_eq!(zoom_size(220, 160, ZOOM_OUT_FACTOR), (200, 150));
        assert_eq!(zoom_size(200, 150, ZOOM_OUT_FACTOR), MIN_WINDOW_SIZE);
    }
}
