//! Domain entities for CamGrid.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! Code in outer layers (the viewer's application and infrastructure layers)
//! depends on the domain, but the domain never depends on them.  Nothing here
//! opens a window, touches a socket or talks to the media library; all inputs
//! (screen extents, playback states, clock readings) are passed in explicitly.

/// Camera descriptors and the area filter.
pub mod camera;

/// Grid auto-arrangement policy and row-height computation.
pub mod grid;

/// Stream stall detection and retry gating.
pub mod health;

/// Gapless integer partitioning of one screen axis.
///
/// See [`partition::partition`] for the main entry point.
pub mod partition;

/// Playback state, surface handles and media options.
pub mod playback;

/// Tile specifications and the tile-to-region resolver.
pub mod tiles;
