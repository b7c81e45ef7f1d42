//! GStreamer playback backend.
//!
//! Each session is one `playbin` element.  The RTSP source it creates is
//! tuned from [`MediaOptions`] in the `source-setup` signal (TCP transport,
//! jitter-buffer latency), and its video sink is an overlay-capable sink
//! whose `VideoOverlay` interface is pointed at the camera's surface.  A
//! `textoverlay` video filter draws the camera's name and area in the
//! top-left corner.
//!
//! States are not pushed to CamGrid.  [`MediaBackend::state`] drains the
//! pipeline bus and combines the error/end-of-stream/buffering messages seen
//! so far with the pipeline's current state.

use std::collections::BTreeMap;

use camgrid_core::{CameraDescriptor, CameraId, MediaOptions, PlaybackState, SurfaceHandle};
use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;
use tracing::{debug, info, warn};

use crate::application::session_binder::{MediaBackend, PlaybackError, SessionId};

/// Overlay-capable sinks, best first.
const OVERLAY_SINKS: [&str; 5] = [
    "glimagesink",
    "d3d11videosink",
    "xvimagesink",
    "ximagesink",
    "osxvideosink",
];

/// Playbin flags without subtitles, so no text is drawn over the video.
const FLAGS_WITHOUT_TEXT: &str = "video+audio+soft-volume+deinterlace";

/// Builds the name/area label drawn over a camera's video.
fn label_filter(text: &str) -> Result<gst::Element, glib::BoolError> {
    gst::ElementFactory::make("textoverlay")
        .property("text", text)
        .property_from_str("valignment", "top")
        .property_from_str("halignment", "left")
        .property("shaded-background", true)
        .build()
}

struct GstSession {
    camera: CameraId,
    playbin: gst::Element,
    sink: Option<gst::Element>,
    buffering: bool,
    failed: bool,
    ended: bool,
}

/// A [`MediaBackend`] built on GStreamer `playbin`.
pub struct GstMediaBackend {
    video_sink: Option<&'static str>,
    sessions: BTreeMap<SessionId, GstSession>,
}

impl GstMediaBackend {
    /// Initialises GStreamer and picks the video sink.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::BackendUnavailable`] if GStreamer cannot be
    /// initialised.
    pub fn new() -> Result<Self, PlaybackError> {
        gst::init().map_err(|e| PlaybackError::BackendUnavailable(e.to_string()))?;

        let video_sink = OVERLAY_SINKS
            .iter()
            .copied()
            .find(|name| gst::ElementFactory::find(name).is_some());
        match video_sink {
            Some(name) => info!(sink = name, "GStreamer backend ready"),
            None => warn!("no overlay-capable video sink found, streams open in their own windows"),
        }

        Ok(Self {
            video_sink,
            sessions: BTreeMap::new(),
        })
    }

    fn session(&self, id: SessionId) -> Result<&GstSession, PlaybackError> {
        self.sessions.get(&id).ok_or(PlaybackError::UnknownSession(id))
    }
}

impl MediaBackend for GstMediaBackend {
    fn create_session(
        &mut self,
        camera: &CameraDescriptor,
        options: &MediaOptions,
    ) -> Result<SessionId, PlaybackError> {
        let playbin = gst::ElementFactory::make("playbin")
            .name(format!("camera-{}", camera.id))
            .property("uri", camera.url.as_str())
            .build()
            .map_err(|e| PlaybackError::OpenFailed(e.to_string()))?;

        let latency = options.network_caching_ms;
        let force_tcp = options.force_tcp;
        playbin.connect("source-setup", false, move |values| {
            let source = values.get(1).and_then(|v| v.get::<gst::Element>().ok())?;
            if source.has_property("latency", None) {
                source.set_property("latency", latency);
            }
            if force_tcp && source.has_property("protocols", None) {
                source.set_property_from_str("protocols", "tcp");
            }
            None
        });

        if options.suppress_overlays {
            playbin.set_property_from_str("flags", FLAGS_WITHOUT_TEXT);
        }

        match label_filter(&camera.overlay_label()) {
            Ok(filter) => playbin.set_property("video-filter", &filter),
            Err(e) => debug!(camera = %camera.id, error = %e, "tile label unavailable"),
        }

        let sink = match self.video_sink {
            Some(name) => {
                let sink = gst::ElementFactory::make(name)
                    .build()
                    .map_err(|e| PlaybackError::OpenFailed(e.to_string()))?;
                if sink.has_property("force-aspect-ratio", None) {
                    sink.set_property("force-aspect-ratio", true);
                }
                playbin.set_property("video-sink", &sink);
                Some(sink)
            }
            None => None,
        };

        let id = SessionId::new();
        self.sessions.insert(
            id,
            GstSession {
                camera: camera.id,
                playbin,
                sink,
                buffering: false,
                failed: false,
                ended: false,
            },
        );
        debug!(camera = %camera.id, session = %id, "playbin created");
        Ok(id)
    }

    fn bind_surface(
        &mut self,
        session: SessionId,
        surface: SurfaceHandle,
    ) -> Result<(), PlaybackError> {
        let s = self.session(session)?;
        // Headless surfaces have no window to draw into.
        if !surface.is_native() {
            return Ok(());
        }
        let sink = s.sink.as_ref().ok_or_else(|| PlaybackError::BindFailed {
            surface,
            reason: "no overlay-capable video sink installed".to_string(),
        })?;
        let overlay = sink
            .dynamic_cast_ref::<gst_video::VideoOverlay>()
            .ok_or_else(|| PlaybackError::BindFailed {
                surface,
                reason: "video sink does not implement VideoOverlay".to_string(),
            })?;

        // SAFETY: the handle names a live native window owned by the surface
        // provider; the viewer moves the session to another surface before
        // that window is destroyed.
        unsafe {
            overlay.set_window_handle(surface.as_raw());
        }
        overlay.expose();
        Ok(())
    }

    fn play(&mut self, session: SessionId) -> Result<(), PlaybackError> {
        let s = self
            .sessions
            .get_mut(&session)
            .ok_or(PlaybackError::UnknownSession(session))?;
        s.failed = false;
        s.ended = false;
        s.playbin
            .set_state(gst::State::Playing)
            .map_err(|e| PlaybackError::ControlFailed(format!("cannot start pipeline: {e}")))?;
        Ok(())
    }

    fn stop(&mut self, session: SessionId) -> Result<(), PlaybackError> {
        let s = self.session(session)?;
        s.playbin
            .set_state(gst::State::Null)
            .map_err(|e| PlaybackError::ControlFailed(format!("cannot stop pipeline: {e}")))?;
        Ok(())
    }

    fn state(&mut self, session: SessionId) -> Result<PlaybackState, PlaybackError> {
        let s = self
            .sessions
            .get_mut(&session)
            .ok_or(PlaybackError::UnknownSession(session))?;

        if let Some(bus) = s.playbin.bus() {
            while let Some(msg) = bus.pop() {
                use gst::MessageView;

                match msg.view() {
                    MessageView::Error(err) => {
                        warn!(
                            camera = %s.camera,
                            error = %err.error(),
                            debug = ?err.debug(),
                            "pipeline error"
                        );
                        s.failed = true;
                    }
                    MessageView::Eos(..) => s.ended = true,
                    MessageView::Buffering(b) => s.buffering = b.percent() < 100,
                    _ => {}
                }
            }
        }

        if s.failed {
            return Ok(PlaybackState::Error);
        }
        if s.ended {
            return Ok(PlaybackState::Ended);
        }

        let (_, current, pending) = s.playbin.state(gst::ClockTime::ZERO);
        let state = match current {
            gst::State::Playing if s.buffering => PlaybackState::Buffering,
            gst::State::Playing => PlaybackState::Playing,
            gst::State::Paused if pending == gst::State::Playing => PlaybackState::Opening,
            gst::State::Paused => PlaybackState::Paused,
            gst::State::Ready => PlaybackState::Opening,
            gst::State::Null => PlaybackState::Stopped,
            _ => PlaybackState::Idle,
        };
        Ok(state)
    }

    fn video_size(&mut self, session: SessionId) -> Option<(u32, u32)> {
        let s = self.sessions.get(&session)?;
        let sink = match &s.sink {
            Some(sink) => sink.clone(),
            None => s.playbin.property::<Option<gst::Element>>("video-sink")?,
        };
        let caps = sink.static_pad("sink")?.current_caps()?;
        let info = gst_video::VideoInfo::from_caps(&caps).ok()?;
        Some((info.width(), info.height()))
    }

    fn release(&mut self, session: SessionId) {
        if let Some(s) = self.sessions.remove(&session) {
            if let Err(e) = s.playbin.set_state(gst::State::Null) {
                warn!(camera = %s.camera, error = %e, "pipeline did not shut down cleanly");
            }
        }
    }
}

impl Drop for GstMediaBackend {
    fn drop(&mut self) {
        for s in self.sessions.values() {
            let _ = s.playbin.set_state(gst::State::Null);
        }
    }
}
