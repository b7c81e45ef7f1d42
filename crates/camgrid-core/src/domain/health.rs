//! Stream health assessment.
//!
//! The media library reconnects at the transport level on its own, but a
//! camera that has been unplugged or has crashed leaves its session sitting
//! in `Error`, `Ended` or `Opening` forever.  The viewer polls each session's
//! state on a fixed interval and feeds it through [`StreamHealth::assess`],
//! which decides:
//!
//! - whether the state is a stall at all (a session that was started moments
//!   ago is allowed to still be opening);
//! - whether this stall should be written to the failure log (once per stall
//!   episode, not once per poll);
//! - whether the stream may be restarted now (at most once per retry interval).
//!
//! All clock readings are passed in, so the rules can be tested without
//! waiting.

use std::time::{Duration, Instant};

use super::playback::PlaybackState;

/// Timing rules for health polling and reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// How often session states are polled.
    pub poll_interval: Duration,
    /// How long after a start attempt a non-live state is tolerated.
    pub grace_period: Duration,
    /// Minimum time between two automatic restarts of the same stream.
    pub retry_interval: Duration,
    /// Start attempts closer together than this are ignored.
    pub min_attempt_gap: Duration,
    /// Whether stalled streams are restarted automatically.
    pub auto_reconnect: bool,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            grace_period: Duration::from_secs(2),
            retry_interval: Duration::from_secs(5),
            min_attempt_gap: Duration::from_secs(1),
            auto_reconnect: true,
        }
    }
}

/// Outcome of one health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// The stream is live.
    Healthy,
    /// Not live yet, but still inside the grace period after a start.
    Warming,
    /// Not live after the grace period.
    Stalled {
        state: PlaybackState,
        /// First poll of this stall episode: write it to the failure log.
        log: bool,
        /// The retry interval has elapsed: restart the stream now.
        reconnect: bool,
    },
}

/// Failure-log reason text for a stalled stream, e.g. `stream state: Error`.
pub fn stall_reason(state: PlaybackState) -> String {
    format!("stream state: {state}")
}

/// Per-stream health bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct StreamHealth {
    last_attempt: Option<Instant>,
    stall_reported: bool,
}

impl StreamHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the time of the last start or restart attempt.
    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Returns `true` if a start attempt at `now` is far enough from the
    /// previous one.
    pub fn can_attempt(&self, now: Instant, policy: &HealthPolicy) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= policy.min_attempt_gap,
        }
    }

    /// Records a start or restart attempt at `now`.
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Marks the current episode as already reported, e.g. after a start
    /// failure has been logged with its own reason.
    pub fn mark_reported(&mut self) {
        self.stall_reported = true;
    }

    /// Assesses a polled `state` at `now`.
    ///
    /// A live state ends the current stall episode, so the next stall is
    /// logged again.
    pub fn assess(
        &mut self,
        state: PlaybackState,
        now: Instant,
        policy: &HealthPolicy,
    ) -> HealthVerdict {
        if state.is_live() {
            self.stall_reported = false;
            return HealthVerdict::Healthy;
        }

        let since_attempt = self
            .last_attempt
            .map(|last| now.saturating_duration_since(last));

        if matches!(since_attempt, Some(elapsed) if elapsed < policy.grace_period) {
            return HealthVerdict::Warming;
        }

        let log = !self.stall_reported;
        self.stall_reported = true;
        let reconnect = policy.auto_reconnect
            && since_attempt.map_or(true, |elapsed| elapsed >= policy.retry_interval);

        HealthVerdict::Stalled {
            state,
            log,
            reconnect,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
