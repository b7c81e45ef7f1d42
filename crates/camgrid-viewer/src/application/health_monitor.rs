//! Periodic stream health polling.
//!
//! Every poll interval the monitor asks the binder for each camera's playback
//! state and runs it through the camera's [`camgrid_core::StreamHealth`].  It
//! returns findings rather than acting on them: the viewer decides how to log
//! a stall and when to restart.

use std::time::Instant;

use camgrid_core::{CameraDescriptor, CameraId, HealthPolicy, HealthVerdict, PlaybackState};
use tracing::trace;

use super::session_binder::{MediaBackend, SessionBinder};

/// A stalled stream found by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallFinding {
    pub camera: CameraId,
    pub state: PlaybackState,
    /// Write this stall to the failure log.
    pub log: bool,
    /// Restart the stream now.
    pub reconnect: bool,
}

/// Schedules health polls and assesses stream states.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    policy: HealthPolicy,
    next_poll: Option<Instant>,
}

impl HealthMonitor {
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            policy,
            next_poll: None,
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Arms the first poll one interval after `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.next_poll = Some(now + self.policy.poll_interval);
    }

    /// Returns when the next poll is due, if polling is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_poll
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_poll.is_some_and(|due| now >= due)
    }

    /// Disarms polling.
    pub fn cancel(&mut self) {
        self.next_poll = None;
    }

    /// Polls every camera with a stream and re-arms the next poll.
    ///
    /// Placeholders and cameras the binder has never started are skipped.  A
    /// camera whose session could not be created, or whose state query fails,
    /// is assessed as [`PlaybackState::Error`].
    pub fn poll<B: MediaBackend>(
        &mut self,
        binder: &mut SessionBinder<B>,
        cameras: &[CameraDescriptor],
        now: Instant,
    ) -> Vec<StallFinding> {
        self.next_poll = Some(now + self.policy.poll_interval);

        let mut findings = Vec::new();
        for camera in cameras.iter().filter(|c| c.has_stream()) {
            if !binder.tracks(camera.id) {
                continue;
            }
            let state = binder
                .state(camera.id)
                .ok()
                .flatten()
                .unwrap_or(PlaybackState::Error);
            let Some(health) = binder.health_mut(camera.id) else {
                continue;
            };

            match health.assess(state, now, &self.policy) {
                HealthVerdict::Healthy | HealthVerdict::Warming => {
                    trace!(camera = %camera.id, %state, "stream ok");
                }
                HealthVerdict::Stalled {
                    state,
                    log,
                    reconnect,
                } => findings.push(StallFinding {
                    camera: camera.id,
                    state,
                    log,
                    reconnect,
                }),
            }
        }
        findings
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
