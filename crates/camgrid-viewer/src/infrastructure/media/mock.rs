//! Recording media backend.
//!
//! Behaves like a media library that connects instantly: `play` puts a
//! session in [`PlaybackState::Playing`].  Tests can script open failures,
//! one-shot bind failures, later state changes and decoded video sizes per
//! camera, and inspect the full call history afterwards.
//!
//! Clones share the same state, so a test can hand one clone to the viewer
//! and keep another to look inside.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use camgrid_core::{CameraDescriptor, CameraId, MediaOptions, PlaybackState, SurfaceHandle};

use crate::application::session_binder::{MediaBackend, PlaybackError, SessionId};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Create { camera: CameraId, url: String },
    Bind { camera: CameraId, surface: SurfaceHandle },
    Play(CameraId),
    Stop(CameraId),
    Release(CameraId),
}

#[derive(Debug)]
struct FakeSession {
    camera: CameraId,
    state: PlaybackState,
    surface: Option<SurfaceHandle>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<MediaCall>,
    sessions: BTreeMap<SessionId, FakeSession>,
    open_failures: BTreeMap<String, String>,
    bind_failures: Vec<(SurfaceHandle, String)>,
    video_sizes: BTreeMap<CameraId, (u32, u32)>,
}

impl Inner {
    fn session_mut(&mut self, id: SessionId) -> Result<&mut FakeSession, PlaybackError> {
        self.sessions
            .get_mut(&id)
            .ok_or(PlaybackError::UnknownSession(id))
    }

    fn live_session_of(&mut self, camera: CameraId) -> Option<&mut FakeSession> {
        self.sessions.values_mut().find(|s| s.camera == camera)
    }
}

/// A [`MediaBackend`] that records calls instead of decoding video.
#[derive(Debug, Clone, Default)]
pub struct RecordingMediaBackend {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("lock poisoned")
    }

    /// Makes every future `create_session` for `url` fail with `reason`.
    pub fn fail_open(&self, url: &str, reason: &str) {
        self.lock()
            .open_failures
            .insert(url.to_string(), reason.to_string());
    }

    /// Lets sessions for `url` open again.
    pub fn clear_failure(&self, url: &str) {
        self.lock().open_failures.remove(url);
    }

    /// Makes the next `bind_surface` to `surface` fail with `reason`.
    pub fn fail_next_bind(&self, surface: SurfaceHandle, reason: &str) {
        self.lock()
            .bind_failures
            .push((surface, reason.to_string()));
    }

    /// Forces the state of `camera`'s live session.
    pub fn set_state(&self, camera: CameraId, state: PlaybackState) {
        if let Some(session) = self.lock().live_session_of(camera) {
            session.state = state;
        }
    }

    /// Sets the decoded video size reported for `camera`.
    pub fn set_video_size(&self, camera: CameraId, width: u32, height: u32) {
        self.lock().video_sizes.insert(camera, (width, height));
    }

    /// Returns the state of `camera`'s live session.
    pub fn state_of(&self, camera: CameraId) -> Option<PlaybackState> {
        self.lock().live_session_of(camera).map(|s| s.state)
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<MediaCall> {
        self.lock().calls.clone()
    }

    /// Returns `(camera, surface)` for every live session bound to a surface.
    pub fn live_bindings(&self) -> Vec<(CameraId, SurfaceHandle)> {
        self.lock()
            .sessions
            .values()
            .filter_map(|s| s.surface.map(|surface| (s.camera, surface)))
            .collect()
    }

    /// Returns how many times `camera` was bound to any surface.
    pub fn bind_count(&self, camera: CameraId) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MediaCall::Bind { camera: cam, .. } if *cam == camera))
            .count()
    }
}

impl MediaBackend for RecordingMediaBackend {
    fn create_session(
        &mut self,
        camera: &CameraDescriptor,
        _options: &MediaOptions,
    ) -> Result<SessionId, PlaybackError> {
        let mut inner = self.lock();
        inner.calls.push(MediaCall::Create {
            camera: camera.id,
            url: camera.url.clone(),
        });
        if let Some(reason) = inner.open_failures.get(&camera.url) {
            return Err(PlaybackError::OpenFailed(reason.clone()));
        }

        let id = SessionId::new();
        inner.sessions.insert(
            id,
            FakeSession {
                camera: camera.id,
                state: PlaybackState::Idle,
                surface: None,
            },
        );
        Ok(id)
    }

    fn bind_surface(
        &mut self,
        session: SessionId,
        surface: SurfaceHandle,
    ) -> Result<(), PlaybackError> {
        let mut inner = self.lock();
        inner.session_mut(session)?;
        if let Some(pos) = inner.bind_failures.iter().position(|(s, _)| *s == surface) {
            let (_, reason) = inner.bind_failures.remove(pos);
            return Err(PlaybackError::BindFailed { surface, reason });
        }
        let s = inner.session_mut(session)?;
        s.surface = Some(surface);
        let camera = s.camera;
        inner.calls.push(MediaCall::Bind { camera, surface });
        Ok(())
    }

    fn play(&mut self, session: SessionId) -> Result<(), PlaybackError> {
        let mut inner = self.lock();
        let s = inner.session_mut(session)?;
        s.state = PlaybackState::Playing;
        let camera = s.camera;
        inner.calls.push(MediaCall::Play(camera));
        Ok(())
    }

    fn stop(&mut self, session: SessionId) -> Result<(), PlaybackError> {
        let mut inner = self.lock();
        let s = inner.session_mut(session)?;
        s.state = PlaybackState::Stopped;
        let camera = s.camera;
        inner.calls.push(MediaCall::Stop(camera));
        Ok(())
    }

    fn state(&mut self, session: SessionId) -> Result<PlaybackState, PlaybackError> {
        let mut inner = self.lock();
        Ok(inner.session_mut(session)?.state)
    }

    fn video_size(&mut self, session: SessionId) -> Option<(u32, u32)> {
        let inner = self.lock();
        let camera = inner.sessions.get(&session)?.camera;
        inner.video_sizes.get(&camera).copied()
    }

    fn release(&mut self, session: SessionId) {
        let mut inner = self.lock();
        if let Some(s) = inner.sessions.remove(&session) {
            inner.calls.push(MediaCall::Release(s.camera));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraDescriptor {
        CameraDescriptor::new(1, "Gate", "rtsp://10.0.0.1/", "Gate")
    }

    #[test]
    fn test_recording_backend_plays_and_records_calls() {
        // Arrange
        let mut backend = RecordingMediaBackend::new();
        let observer = backend.clone();

        // Act
        let id = backend
            .create_session(&camera(), &MediaOptions::default())
            .unwrap();
        backend.bind_surface(id, SurfaceHandle::Headless(5)).unwrap();
        backend.play(id).unwrap();

        // Assert
        assert_eq!(observer.state_of(CameraId(1)), Some(PlaybackState::Playing));
        assert_eq!(
            observer.calls(),
            vec![
                MediaCall::Create {
                    camera: CameraId(1),
                    url: "rtsp://10.0.0.1/".into()
                },
                MediaCall::Bind {
                    camera: CameraId(1),
                    surface: SurfaceHandle::Headless(5)
                },
                MediaCall::Play(CameraId(1)),
            ]
        );
    }

    #[test]
    fn test_recording_backend_scripted_open_failure() {
        let mut backend = RecordingMediaBackend::new();
        backend.fail_open("rtsp://10.0.0.1/", "401 Unauthorized");

        let result = backend.create_session(&camera(), &MediaOptions::default());

        assert_eq!(result, Err(PlaybackError::OpenFailed("401 Unauthorized".into())));
    }

    #[test]
    fn test_recording_backend_bind_failure_fires_once() {
        let mut backend = RecordingMediaBackend::new();
        let id = backend
            .create_session(&camera(), &MediaOptions::default())
            .unwrap();
        backend.fail_next_bind(SurfaceHandle::Headless(5), "window gone");

        let first = backend.bind_surface(id, SurfaceHandle::Headless(5));
        let second = backend.bind_surface(id, SurfaceHandle::Headless(5));

        assert!(matches!(first, Err(PlaybackError::BindFailed { .. })));
        assert_eq!(second, Ok(()));
        assert_eq!(backend.bind_count(CameraId(1)), 1);
    }

    #[test]
    fn test_recording_backend_release_drops_binding() {
        let mut backend = RecordingMediaBackend::new();
        let id = backend
            .create_session(&camera(), &MediaOptions::default())
            .unwrap();
        backend.bind_surface(id, SurfaceHandle::Headless(5)).unwrap();

        backend.release(id);

        assert!(backend.live_bindings().is_empty());
        assert_eq!(backend.state(id), Err(PlaybackError::UnknownSession(id)));
    }
}
