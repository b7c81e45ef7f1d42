//! Layout passes: which camera is drawn where.
//!
//! A layout pass takes the camera list, the wall's current extent and the
//! per-camera aspect ratios sampled so far, and produces a [`LayoutPlan`]:
//! one optional rectangle per camera, indexed like the camera list.
//!
//! Two modes are supported:
//!
//! - [`LayoutMode::Grid`] filters the cameras by area, truncates them to the
//!   visible count and arranges them with the [`GridPolicy`].
//! - [`LayoutMode::Spanning`] places camera slot `i` on span `i` of a fixed
//!   [`TileSpec`]; cameras without a span are hidden.
//!
//! Hidden cameras keep their playback session running.  A pass never starts
//! or stops a stream; it only moves and hides tiles.

use std::fmt;
use std::str::FromStr;

use camgrid_core::{
    arrange_grid, layout_tiles, select_visible, AspectRatio, CameraDescriptor, CameraId,
    CategoryFilter, GridPolicy, PartitionError, Rect, TileError, TileSpec,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Upper bound on the visible count, whatever the configuration says.
pub const MAX_VISIBLE_CEILING: usize = 16;

/// Error type for layout passes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("grid arrangement failed: {0}")]
    Grid(#[from] PartitionError),
    #[error("spanning layout failed: {0}")]
    Tiles(#[from] TileError),
}

/// How the wall is arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Rows and columns chosen from the visible-camera count.
    #[default]
    Grid,
    /// A fixed tile specification with spanning tiles.
    Spanning,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid => f.write_str("grid"),
            Self::Spanning => f.write_str("spanning"),
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "spanning" | "span" => Ok(Self::Spanning),
            other => Err(format!("unknown layout mode '{other}' (expected grid or spanning)")),
        }
    }
}

/// The result of one layout pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    regions: Vec<Option<Rect>>,
}

impl LayoutPlan {
    /// A plan that hides all `camera_count` cameras.
    pub fn hidden(camera_count: usize) -> Self {
        Self {
            regions: vec![None; camera_count],
        }
    }

    /// Returns the rectangle for camera `index`, or `None` if it is hidden.
    pub fn region(&self, index: usize) -> Option<Rect> {
        self.regions.get(index).copied().flatten()
    }

    /// Returns every camera's region in camera-list order.
    pub fn regions(&self) -> &[Option<Rect>] {
        &self.regions
    }

    /// Returns the indices of the visible cameras.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.regions
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.map(|_| i))
            .collect()
    }

    /// Returns `true` if no camera is visible.
    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(Option::is_none)
    }
}

/// Tunable inputs of the layout manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSettings {
    pub mode: LayoutMode,
    /// Requested number of visible cameras in grid mode.
    pub visible_count: usize,
    /// Largest accepted visible count (itself capped at [`MAX_VISIBLE_CEILING`]).
    pub max_visible: usize,
    pub category: CategoryFilter,
    pub grid_policy: GridPolicy,
    pub spanning: TileSpec,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Grid,
            visible_count: 6,
            max_visible: 6,
            category: CategoryFilter::All,
            grid_policy: GridPolicy::default(),
            spanning: TileSpec::featured_six(),
        }
    }
}

/// Computes layout plans and tracks the user's layout choices.
#[derive(Debug, Clone)]
pub struct LayoutManager {
    settings: LayoutSettings,
}

impl LayoutManager {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn mode(&self) -> LayoutMode {
        self.settings.mode
    }

    /// Switches the layout mode.  Returns `true` if it changed.
    pub fn set_mode(&mut self, mode: LayoutMode) -> bool {
        let changed = self.settings.mode != mode;
        self.settings.mode = mode;
        changed
    }

    /// Returns the visible count actually used: the request clamped to
    /// `[1, max_visible]`.
    pub fn effective_visible_count(&self) -> usize {
        let max = self.settings.max_visible.clamp(1, MAX_VISIBLE_CEILING);
        self.settings.visible_count.clamp(1, max)
    }

    /// Sets the requested visible count.  Returns `true` if the effective
    /// count changed.
    pub fn set_visible_count(&mut self, count: usize) -> bool {
        let before = self.effective_visible_count();
        self.settings.visible_count = count;
        before != self.effective_visible_count()
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.settings.category
    }

    /// Sets the area filter.  Returns `true` if it changed.
    pub fn set_category(&mut self, category: CategoryFilter) -> bool {
        let changed = self.settings.category != category;
        self.settings.category = category;
        changed
    }

    /// Runs one layout pass over a `width × height` container.
    ///
    /// `ratio_of` returns the last sampled aspect ratio of a camera; it is only
    /// consulted in grid mode.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the configured grid policy or tile
    /// specification cannot be resolved (zero columns, for example).  An empty
    /// selection is not an error: it yields a plan with every camera hidden.
    pub fn compute<F>(
        &self,
        cameras: &[CameraDescriptor],
        width: u32,
        height: u32,
        ratio_of: F,
    ) -> Result<LayoutPlan, LayoutError>
    where
        F: Fn(CameraId) -> AspectRatio,
    {
        let mut plan = LayoutPlan::hidden(cameras.len());

        match self.settings.mode {
            LayoutMode::Grid => {
                let visible = select_visible(
                    cameras,
                    &self.settings.category,
                    self.effective_visible_count(),
                );
                let Some(shape) = self.settings.grid_policy.shape_for(visible.len()) else {
                    debug!(category = %self.settings.category, "no camera matches, hiding all tiles");
                    return Ok(plan);
                };

                let ratios: Vec<AspectRatio> =
                    visible.iter().map(|&i| ratio_of(cameras[i].id)).collect();
                let rects = arrange_grid(width, shape, &ratios)?;
                debug!(
                    visible = visible.len(),
                    rows = shape.rows,
                    columns = shape.columns,
                    width,
                    "grid layout pass"
                );

                for (&index, rect) in visible.iter().zip(rects) {
                    plan.regions[index] = Some(rect);
                }
            }
            LayoutMode::Spanning => {
                let rects = layout_tiles(&self.settings.spanning, width, height)?;
                debug!(
                    tiles = rects.len(),
                    columns = self.settings.spanning.columns(),
                    rows = self.settings.spanning.rows(),
                    width,
                    height,
                    "spanning layout pass"
                );

                for (slot, rect) in plan.regions.iter_mut().zip(rects) {
                    *slot = Some(rect);
                }
            }
        }

        Ok(plan)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
