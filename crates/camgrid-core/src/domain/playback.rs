//! Value types shared with the media-playback boundary.
//!
//! The media library itself lives behind a trait in the viewer crate.  The
//! types here are what crosses that boundary: the state a session reports,
//! the surface a session renders into, and the options a session is opened
//! with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State reported by a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Created but never started.
    Idle,
    /// Connecting to the stream.
    Opening,
    /// Connected and filling the jitter buffer.
    Buffering,
    /// Frames are being rendered.
    Playing,
    Paused,
    Stopped,
    /// The stream reached its end (the camera closed the session).
    Ended,
    /// The library gave up on the stream.
    Error,
}

impl PlaybackState {
    /// Returns `true` for the states that count as a working stream.
    ///
    /// Buffering is live: RTSP sources re-buffer briefly on network jitter
    /// and recover on their own.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Playing | Self::Buffering)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Opening => "Opening",
            Self::Buffering => "Buffering",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
            Self::Ended => "Ended",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

/// A native drawing surface a session can render into.
///
/// The handle is opaque to CamGrid; only the media backend interprets it.
/// The variant records which windowing system the id belongs to so the
/// backend never has to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceHandle {
    /// A Win32 `HWND`.
    Win32(isize),
    /// An X11 window id.
    Xlib(u64),
    /// An AppKit `NSView*`.
    AppKit(usize),
    /// A virtual surface with no native window behind it.
    Headless(u64),
}

impl SurfaceHandle {
    /// Returns the handle as a raw integer, in the width the video overlay
    /// APIs take.
    pub fn as_raw(&self) -> usize {
        match *self {
            Self::Win32(hwnd) => hwnd as usize,
            Self::Xlib(window) => window as usize,
            Self::AppKit(view) => view,
            Self::Headless(id) => id as usize,
        }
    }

    /// Returns `true` if the handle has a real native window behind it.
    pub fn is_native(&self) -> bool {
        !matches!(self, Self::Headless(_))
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win32(h) => write!(f, "hwnd:{h:#x}"),
            Self::Xlib(w) => write!(f, "xid:{w:#x}"),
            Self::AppKit(v) => write!(f, "nsview:{v:#x}"),
            Self::Headless(id) => write!(f, "headless:{id}"),
        }
    }
}

// ── Media options ─────────────────────────────────────────────────────────────

fn default_network_caching_ms() -> u32 {
    300
}

fn default_true() -> bool {
    true
}

/// Options every playback session is opened with.
///
/// The media backend maps each field onto its own knobs (for GStreamer: the
/// `rtspsrc` latency and protocols, and the `playbin` flags).  All fields have
/// defaults, so a missing `[media]` section or a partial one is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaOptions {
    /// Jitter-buffer length in milliseconds.
    #[serde(default = "default_network_caching_ms")]
    pub network_caching_ms: u32,

    /// Ask for RTP over the RTSP TCP connection instead of UDP.
    #[serde(default = "default_true")]
    pub force_tcp: bool,

    /// Suppress the library's own on-video UI (title, OSD, subtitles).
    #[serde(default = "default_true")]
    pub suppress_overlays: bool,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            network_caching_ms: default_network_caching_ms(),
            force_tcp: true,
            suppress_overlays: true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
