//! # camgrid-core
//!
//! Shared library for CamGrid containing the tile geometry, grid arrangement
//! policy, camera descriptors and stream-health rules.
//!
//! This crate has zero dependencies on OS APIs, UI frameworks or the media
//! playback library.  Everything in it is plain arithmetic over values handed
//! in by the viewer, so it can be tested on any machine without a display.
//!
//! # Architecture overview
//!
//! CamGrid shows several live RTSP camera streams on one screen.  Decoding and
//! rendering are done by an external media library; what CamGrid owns is the
//! decision of *where* each stream is drawn and *when* a stream is considered
//! broken.  This crate holds that decision logic:
//!
//! - **`domain::partition`** – Splits one axis of the screen into N integer
//!   segments whose widths add up to the full extent, pixel for pixel.
//!
//! - **`domain::tiles`** – Tile specifications (which grid cells each camera
//!   covers) and the resolver that turns cells into screen rectangles.
//!
//! - **`domain::grid`** – The auto-arrangement policy: how many rows and
//!   columns to use for a given number of visible cameras, and how tall each
//!   row is given the cameras' aspect ratios.
//!
//! - **`domain::camera`** – Camera descriptors and the area filter.
//!
//! - **`domain::playback`** – Value types shared with the media boundary:
//!   playback state, surface handles and media options.
//!
//! - **`domain::health`** – When a stream counts as stalled and when it may be
//!   retried.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `camgrid_core::partition` instead of `camgrid_core::domain::partition::partition`.
pub use domain::camera::{
    available_areas, next_area, select_visible, CameraDescriptor, CameraId, CategoryFilter,
};
pub use domain::grid::{arrange_grid, AspectRatio, GridPolicy, GridRule, GridShape, DEFAULT_VIDEO_RATIO};
pub use domain::health::{stall_reason, HealthPolicy, HealthVerdict, StreamHealth};
pub use domain::partition::{partition, Boundaries, PartitionError};
pub use domain::playback::{MediaOptions, PlaybackState, SurfaceHandle};
pub use domain::tiles::{layout_tiles, resolve_regions, Rect, TileError, TileSpan, TileSpec};
