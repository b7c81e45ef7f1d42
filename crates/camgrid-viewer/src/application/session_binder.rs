//! Playback session binder.
//!
//! Every camera with a stream gets exactly one playback session for the life
//! of the viewer.  The session is created once and then only *moved*: when a
//! layout pass gives the camera a new tile, or the user opens it fullscreen,
//! the binder points the existing session at the new surface instead of
//! tearing the stream down and reconnecting.
//!
//! # Why a trait for the media library? (for beginners)
//!
//! [`MediaBackend`] is the only door to the real decoder.  Production builds
//! plug in a GStreamer implementation; tests plug in a recording fake or a
//! `mockall` mock.  The binder's rules (one binding per session, restart
//! debounce, ratio sampling) are therefore testable without a network or a
//! display.
//!
//! The binder never logs failures itself.  Every operation returns a
//! [`PlaybackError`] and the caller decides what to write to the failure log.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use camgrid_core::{
    AspectRatio, CameraDescriptor, CameraId, HealthPolicy, MediaOptions, PlaybackState,
    StreamHealth, SurfaceHandle, DEFAULT_VIDEO_RATIO,
};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of one playback session, minted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for playback operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The backend could not open the stream.
    #[error("cannot open stream: {0}")]
    OpenFailed(String),

    /// The session could not be attached to a surface.
    #[error("cannot bind surface {surface}: {reason}")]
    BindFailed {
        surface: SurfaceHandle,
        reason: String,
    },

    /// Starting or stopping playback failed.
    #[error("playback control failed: {0}")]
    ControlFailed(String),

    /// The backend does not know this session.
    #[error("unknown playback session {0}")]
    UnknownSession(SessionId),

    /// The binder has never seen this camera.
    #[error("camera {0} has no playback entry")]
    UnknownCamera(CameraId),

    /// A restart was requested before any surface was assigned.
    #[error("camera {0} has no surface to render into")]
    NoSurface(CameraId),

    /// The media library itself could not be initialised.
    #[error("media backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Abstraction over the media-playback library.
///
/// Implementations own the decoder sessions; the binder only holds their ids.
#[cfg_attr(test, mockall::automock)]
pub trait MediaBackend {
    /// Opens a session for `camera`'s stream.  The session starts idle.
    fn create_session(
        &mut self,
        camera: &CameraDescriptor,
        options: &MediaOptions,
    ) -> Result<SessionId, PlaybackError>;

    /// Points the session's video output at `surface`, replacing any previous
    /// surface.
    fn bind_surface(&mut self, session: SessionId, surface: SurfaceHandle)
        -> Result<(), PlaybackError>;

    fn play(&mut self, session: SessionId) -> Result<(), PlaybackError>;

    fn stop(&mut self, session: SessionId) -> Result<(), PlaybackError>;

    /// Returns the session's current state.
    fn state(&mut self, session: SessionId) -> Result<PlaybackState, PlaybackError>;

    /// Returns the decoded video size, or `None` before the first frame.
    fn video_size(&mut self, session: SessionId) -> Option<(u32, u32)>;

    /// Frees the session.  The id is invalid afterwards.
    fn release(&mut self, session: SessionId);
}

/// What [`SessionBinder::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Playback was started on this session.
    Started(SessionId),
    /// The camera has no stream URL; nothing to play.
    Placeholder,
    /// The previous attempt was too recent; this one was ignored.
    Debounced,
}

#[derive(Debug, Default)]
struct SessionEntry {
    session: Option<SessionId>,
    /// Surface the camera should render into.
    target: Option<SurfaceHandle>,
    /// Surface the backend was last told to render into.
    bound: Option<SurfaceHandle>,
    ratio: Option<AspectRatio>,
    health: StreamHealth,
}

/// Owns the playback session of every camera.
pub struct SessionBinder<B> {
    backend: B,
    options: MediaOptions,
    policy: HealthPolicy,
    entries: BTreeMap<CameraId, SessionEntry>,
}

impl<B: MediaBackend> SessionBinder<B> {
    pub fn new(backend: B, options: MediaOptions, policy: HealthPolicy) -> Self {
        Self {
            backend,
            options,
            policy,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the media backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Starts playback of `camera` into `surface`.
    ///
    /// The session is created on first use and reused afterwards.  Attempts
    /// closer than the policy's minimum gap to the previous one are ignored.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if creating, binding or playing fails.  The
    /// attempt still counts for the debounce.
    pub fn start(
        &mut self,
        camera: &CameraDescriptor,
        surface: SurfaceHandle,
        now: Instant,
    ) -> Result<StartOutcome, PlaybackError> {
        if !camera.has_stream() {
            return Ok(StartOutcome::Placeholder);
        }

        let entry = self.entries.entry(camera.id).or_default();
        entry.target = Some(surface);
        if !entry.health.can_attempt(now, &self.policy) {
            return Ok(StartOutcome::Debounced);
        }
        entry.health.record_attempt(now);

        let session = match entry.session {
            Some(session) => session,
            None => {
                let session = self.backend.create_session(camera, &self.options)?;
                entry.session = Some(session);
                session
            }
        };
        if entry.bound != Some(surface) {
            self.backend.bind_surface(session, surface)?;
            entry.bound = Some(surface);
        }
        self.backend.play(session)?;
        Ok(StartOutcome::Started(session))
    }

    /// Moves `camera`'s video output to `surface` without restarting it.
    ///
    /// Returns `Ok(true)` if the backend was rebound, `Ok(false)` if the
    /// session was already bound there or has not been created yet (the
    /// surface is remembered for the next start).
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::UnknownCamera`] if the camera was never
    /// started, or the backend's bind error.
    pub fn rebind(
        &mut self,
        camera: CameraId,
        surface: SurfaceHandle,
    ) -> Result<bool, PlaybackError> {
        let entry = self
            .entries
            .get_mut(&camera)
            .ok_or(PlaybackError::UnknownCamera(camera))?;
        entry.target = Some(surface);

        let Some(session) = entry.session else {
            return Ok(false);
        };
        if entry.bound == Some(surface) {
            return Ok(false);
        }
        self.backend.bind_surface(session, surface)?;
        entry.bound = Some(surface);
        Ok(true)
    }

    /// Reconnects `camera`: the old session is stopped and released, a new
    /// one is created, bound to the current target surface and played.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::UnknownCamera`] / [`PlaybackError::NoSurface`]
    /// if there is nothing to restart, or the backend's error.
    pub fn restart(
        &mut self,
        camera: &CameraDescriptor,
        now: Instant,
    ) -> Result<StartOutcome, PlaybackError> {
        if !camera.has_stream() {
            return Ok(StartOutcome::Placeholder);
        }

        let entry = self
            .entries
            .get_mut(&camera.id)
            .ok_or(PlaybackError::UnknownCamera(camera.id))?;
        let surface = entry.target.ok_or(PlaybackError::NoSurface(camera.id))?;
        if !entry.health.can_attempt(now, &self.policy) {
            return Ok(StartOutcome::Debounced);
        }
        entry.health.record_attempt(now);

        if let Some(old) = entry.session.take() {
            // A stalled session may refuse to stop; it is released regardless.
            let _ = self.backend.stop(old);
            self.backend.release(old);
        }
        entry.bound = None;

        let session = self.backend.create_session(camera, &self.options)?;
        entry.session = Some(session);
        self.backend.bind_surface(session, surface)?;
        entry.bound = Some(surface);
        self.backend.play(session)?;
        Ok(StartOutcome::Started(session))
    }

    /// Stops and releases `camera`'s session but keeps its entry and target
    /// surface, so the next [`SessionBinder::restart`] renders there again.
    pub fn detach(&mut self, camera: CameraId) {
        let Some(entry) = self.entries.get_mut(&camera) else {
            return;
        };
        if let Some(session) = entry.session.take() {
            let _ = self.backend.stop(session);
            self.backend.release(session);
        }
        entry.bound = None;
    }

    /// Reads the decoded video size and updates the camera's aspect ratio.
    ///
    /// Returns `Ok(true)` if the ratio changed.  A size with a zero dimension
    /// (no frame decoded yet) is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::UnknownCamera`] if the camera was never started.
    pub fn sample_video_ratio(&mut self, camera: CameraId) -> Result<bool, PlaybackError> {
        let entry = self
            .entries
            .get_mut(&camera)
            .ok_or(PlaybackError::UnknownCamera(camera))?;
        let Some(session) = entry.session else {
            return Ok(false);
        };
        let Some(ratio) = self
            .backend
            .video_size(session)
            .and_then(|(w, h)| AspectRatio::new(w, h))
        else {
            return Ok(false);
        };

        let previous = entry.ratio.unwrap_or(DEFAULT_VIDEO_RATIO);
        entry.ratio = Some(ratio);
        Ok(!ratio.same_proportion(&previous))
    }

    /// Returns the last sampled aspect ratio, or the default 16:9.
    pub fn ratio(&self, camera: CameraId) -> AspectRatio {
        self.entries
            .get(&camera)
            .and_then(|e| e.ratio)
            .unwrap_or(DEFAULT_VIDEO_RATIO)
    }

    /// Returns the session's state, or `None` if the camera has no session.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the state query fails.
    pub fn state(&mut self, camera: CameraId) -> Result<Option<PlaybackState>, PlaybackError> {
        match self.entries.get(&camera).and_then(|e| e.session) {
            Some(session) => self.backend.state(session).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the surface the session is currently bound to.
    pub fn bound_surface(&self, camera: CameraId) -> Option<SurfaceHandle> {
        self.entries.get(&camera).and_then(|e| e.bound)
    }

    pub fn session_id(&self, camera: CameraId) -> Option<SessionId> {
        self.entries.get(&camera).and_then(|e| e.session)
    }

    /// Returns `true` if the binder has an entry for `camera`.
    pub fn tracks(&self, camera: CameraId) -> bool {
        self.entries.contains_key(&camera)
    }

    pub(crate) fn health_mut(&mut self, camera: CameraId) -> Option<&mut StreamHealth> {
        self.entries.get_mut(&camera).map(|e| &mut e.health)
    }

    /// Stops and releases every session.
    ///
    /// Every session is released even if stopping one of them fails.
    ///
    /// # Errors
    ///
    /// Returns the first stop error encountered.
    pub fn stop_all(&mut self) -> Result<(), PlaybackError> {
        let mut first_error = None;
        for entry in self.entries.values_mut() {
            if let Some(session) = entry.session.take() {
                if let Err(e) = self.backend.stop(session) {
                    first_error.get_or_insert(e);
                }
                self.backend.release(session);
            }
            entry.bound = None;
        }
        first_error.map_or(Ok(()), Err)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
