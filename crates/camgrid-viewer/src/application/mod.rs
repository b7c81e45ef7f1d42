//! Application layer of the viewer.
//!
//! # What lives here? (for beginners)
//!
//! The domain crate (`camgrid-core`) knows how to compute rectangles and when
//! a stream counts as stalled.  This layer turns those rules into behaviour:
//! it decides which cameras are shown, keeps each playback session pointed at
//! the right surface, reacts to keys and drives all of it from a single
//! synchronous state machine.
//!
//! Like the domain it performs no OS calls itself.  The media library and the
//! window system are reached through traits ([`session_binder::MediaBackend`]
//! and [`viewer::SurfaceProvider`]) that the infrastructure layer implements.
//!
//! # Sub-modules
//!
//! - **`layout_manager`** – Grid and spanning layout passes producing a
//!   [`layout_manager::LayoutPlan`].
//! - **`session_binder`** – Owns one playback session per camera and moves it
//!   between surfaces without restarting the stream.
//! - **`health_monitor`** – Periodic state polling and stall detection.
//! - **`keys`** – Keyboard command mapping for the wall and fullscreen windows.
//! - **`viewer`** – The [`viewer::Viewer`] state machine tying it together.

pub mod health_monitor;
pub mod keys;
pub mod layout_manager;
pub mod session_binder;
pub mod viewer;
