//! Desktop front end built on winit.
//!
//! The wall is one top-level window.  Every camera gets a child window of
//! the wall as its tile, so the media backend can render into it through the
//! tile's native handle.  A double click on a tile opens the camera in its
//! own fullscreen window.
//!
//! # Event flow
//!
//! ```text
//!  winit event loop ──► DesktopApp ──► ViewerEvent ──► Viewer
//!        ▲                                   │
//!        └──── ControlFlow::WaitUntil(next_deadline) ◄──┘
//! ```
//!
//! winit only lets windows be created while the event loop is running, so
//! [`DesktopApp`] creates them (tiles at resume, camera windows on double
//! click) and hands them to [`WinitSurfaceProvider`] before the viewer asks
//! for them.

pub mod app;
pub mod input;
pub mod surfaces;

pub use app::DesktopApp;
pub use surfaces::WinitSurfaceProvider;
