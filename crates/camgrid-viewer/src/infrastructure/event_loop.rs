//! Tokio event loop driving a [`Viewer`].
//!
//! The loop waits on two things at once: the next [`ViewerEvent`] from the
//! channel, and the viewer's next deadline.  Whichever comes first is handed
//! to the viewer.  Only one sleep is ever pending, and the deadline is read
//! again on every iteration, so a layout trigger that moves the deadline
//! takes effect immediately.
//!
//! The loop ends when a [`ViewerEvent::Shutdown`] arrives or when every
//! sender of the channel has been dropped.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tracing::info;

use crate::application::session_binder::MediaBackend;
use crate::application::viewer::{Flow, SurfaceProvider, Viewer, ViewerEvent};

/// Starts the wall and runs it until shutdown, then returns the stopped
/// viewer.
pub async fn run<B, S>(mut viewer: Viewer<B, S>, mut events: mpsc::Receiver<ViewerEvent>) -> Viewer<B, S>
where
    B: MediaBackend,
    S: SurfaceProvider,
{
    viewer.start(Instant::now());

    loop {
        let deadline = viewer.next_deadline();

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    info!("event channel closed, stopping camera wall");
                    viewer.shutdown();
                    break;
                };
                if viewer.handle_event(event, Instant::now()) == Flow::Exit {
                    break;
                }
            }
            () = wait_for(deadline) => viewer.tick(Instant::now()),
        }
    }

    viewer
}

/// Sleeps until `deadline`, or forever when there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use camgrid_core::{CameraDescriptor, CameraId, PlaybackState};

    use super::*;
    use crate::application::viewer::ViewerConfig;
    use crate::infrastructure::failure_log::MemoryFailureLog;
    use crate::infrastructure::media::mock::RecordingMediaBackend;
    use crate::infrastructure::surface::HeadlessSurfaceProvider;

    fn cameras() -> Vec<CameraDescriptor> {
        vec![
            CameraDescriptor::new(1, "Gate", "rtsp://10.0.0.1/", "Gate"),
            CameraDescriptor::new(2, "Lobby", "rtsp://10.0.0.2/", "Lobby"),
        ]
    }

    fn fast_config() -> ViewerConfig {
        ViewerConfig {
            settle_delay: Duration::from_millis(5),
            ratio_sample_delays: vec![Duration::from_millis(10)],
            ..ViewerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_lays_out_and_stops_on_shutdown_event() {
        // Arrange
        let backend = RecordingMediaBackend::new();
        let viewer = Viewer::new(
            cameras(),
            fast_config(),
            backend.clone(),
            HeadlessSurfaceProvider::new((1600, 900), (1920, 1080)),
            Box::new(MemoryFailureLog::new()),
        );
        let (tx, rx) = mpsc::channel(8);

        // Act
        let handle = tokio::spawn(run(viewer, rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.state_of(CameraId(1)), Some(PlaybackState::Playing));
        tx.send(ViewerEvent::Shutdown).await.unwrap();
        let viewer = handle.await.unwrap();

        // Assert
        assert!(viewer.is_stopped());
        assert!(viewer.last_plan().is_some());
        assert!(backend.live_bindings().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let backend = RecordingMediaBackend::new();
        let viewer = Viewer::new(
            cameras(),
            fast_config(),
            backend.clone(),
            HeadlessSurfaceProvider::new((1600, 900), (1920, 1080)),
            Box::new(MemoryFailureLog::new()),
        );
        let (tx, rx) = mpsc::channel(8);
        drop(tx);

        let viewer = run(viewer, rx).await;

        assert!(viewer.is_stopped());
        assert!(backend.live_bindings().is_empty());
    }
}
