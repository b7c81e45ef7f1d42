//! Infrastructure layer of the viewer.
//!
//! Contains the adapters behind the application layer's traits: media
//! playback backends, the winit desktop front end and the headless surface
//! provider, the failure log file, configuration storage and the tokio event
//! loop used by headless runs.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `camgrid_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod desktop;
pub mod event_loop;
pub mod failure_log;
pub mod media;
pub mod storage;
pub mod surface;
