//! Media playback backends implementing
//! [`MediaBackend`](crate::application::session_binder::MediaBackend).
//!
//! - [`mock::RecordingMediaBackend`] records every call and lets tests script
//!   session states and video sizes.  It is always compiled and doubles as the
//!   backend of headless builds.
//! - `gst_backend::GstMediaBackend` drives one GStreamer `playbin` per session.
//!   It is only compiled with the `gstreamer-backend` feature.

pub mod mock;

#[cfg(feature = "gstreamer-backend")]
pub mod gst_backend;
