//! Grid auto-arrangement policy.
//!
//! In grid mode the viewer does not use a fixed tile specification.  It picks
//! a `rows × columns` shape from the number of visible cameras and then sizes
//! each row from the aspect ratios of the cameras in it:
//!
//! - every column gets an x-offset from the gapless partitioner, so the row
//!   spans the full container width;
//! - every tile in a row shares one height, derived from the *widest* aspect
//!   ratio in that row: `height = column_width × h / w`;
//! - rows are stacked from the top with no gap.
//!
//! Aspect ratios are kept as integer `width:height` pairs taken straight from
//! the decoded video size, so row heights are exact integer arithmetic.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::partition::{partition, PartitionError};
use super::tiles::Rect;

/// A video aspect ratio as an integer `width:height` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

/// Ratio assumed for a camera until its decoded video size is known.
pub const DEFAULT_VIDEO_RATIO: AspectRatio = AspectRatio {
    width: 16,
    height: 9,
};

impl AspectRatio {
    /// Builds a ratio from a decoded video size.
    ///
    /// Returns `None` if either dimension is zero (the decoder has not
    /// reported a size yet).
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `true` if `self` is strictly wider (larger width ÷ height)
    /// than `other`.
    pub fn is_wider_than(&self, other: &AspectRatio) -> bool {
        u64::from(self.width) * u64::from(other.height)
            > u64::from(other.width) * u64::from(self.height)
    }

    /// Returns `true` if both ratios describe the same proportion.
    pub fn same_proportion(&self, other: &AspectRatio) -> bool {
        u64::from(self.width) * u64::from(other.height)
            == u64::from(other.width) * u64::from(self.height)
    }

    /// Height of a tile `width` pixels wide at this ratio, rounded down.
    pub fn fit_height(&self, width: u32) -> u32 {
        (u64::from(width) * u64::from(self.height) / u64::from(self.width)) as u32
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        DEFAULT_VIDEO_RATIO
    }
}

/// A grid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: u32,
    pub columns: u32,
}

impl GridShape {
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Number of cells in the grid.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.columns as usize
    }
}

/// One entry of the policy table: counts up to and including `max_count` use
/// this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRule {
    pub max_count: usize,
    pub rows: u32,
    pub columns: u32,
}

impl GridRule {
    pub const fn new(max_count: usize, rows: u32, columns: u32) -> Self {
        Self {
            max_count,
            rows,
            columns,
        }
    }
}

/// Maps a visible-camera count to a grid shape.
///
/// Rules are checked in order; the first rule whose `max_count` is at least
/// the count wins, otherwise `fallback` is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPolicy {
    pub rules: Vec<GridRule>,
    pub fallback: GridShape,
}

impl Default for GridPolicy {
    /// 1 → 1×1, 2 → 1×2, 3–4 → 2×2, 5–6 → 2×3, anything larger → 2×4.
    fn default() -> Self {
        Self {
            rules: vec![
                GridRule::new(1, 1, 1),
                GridRule::new(2, 1, 2),
                GridRule::new(4, 2, 2),
                GridRule::new(6, 2, 3),
            ],
            fallback: GridShape::new(2, 4),
        }
    }
}

impl GridPolicy {
    /// Returns the shape for `count` visible cameras, or `None` when nothing is
    /// visible.
    pub fn shape_for(&self, count: usize) -> Option<GridShape> {
        if count == 0 {
            return None;
        }
        let shape = self
            .rules
            .iter()
            .find(|rule| count <= rule.max_count)
            .map(|rule| GridShape::new(rule.rows, rule.columns))
            .unwrap_or(self.fallback);
        Some(shape)
    }
}

/// Arranges tiles for the given per-camera aspect ratios in `shape`.
///
/// `ratios` is in display order; the result has one rectangle per ratio, up to
/// the shape's capacity (later cameras do not fit and get no rectangle).
///
/// # Errors
///
/// Returns [`PartitionError::ZeroSegments`] if the shape has zero columns.
pub fn arrange_grid(
    width: u32,
    shape: GridShape,
    ratios: &[AspectRatio],
) -> Result<Vec<Rect>, PartitionError> {
    let xs = partition(width, shape.columns)?;
    let column_width = width / shape.columns;
    let columns = shape.columns as usize;
    let count = ratios.len().min(shape.capacity());

    let mut rects = Vec::with_capacity(count);
    let mut y = 0u32;
    for row in ratios[..count].chunks(columns) {
        let widest = row
            .iter()
            .copied()
            .reduce(|a, b| if b.is_wider_than(&a) { b } else { a })
            .unwrap_or(DEFAULT_VIDEO_RATIO);
        let row_height = widest.fit_height(column_width);
        trace!(y, row_height, ?widest, "grid row");

        for col in 0..row.len() {
            // `col < columns`, so both boundary lookups are in range.
            let (x, w) = xs.span(col, col + 1).unwrap_or((0, 0));
            rects.push(Rect::new(x, y, w, row_height));
        }
        y += row_height;
    }
    Ok(rects)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(w: u32, h: u32) -> AspectRatio {
        AspectRatio::new(w, h).unwrap()
    }

    // ── GridPolicy ────────────────────────────────────────────────────────────

    #[test]
    fn test_default_policy_table() {
        let policy = GridPolicy::default();
        assert_eq!(policy.shape_for(1), Some(GridShape::new(1, 1)));
        assert_eq!(policy.shape_for(2), Some(GridShape::new(1, 2)));
        assert_eq!(policy.shape_for(3), Some(GridShape::new(2, 2)));
        assert_eq!(policy.shape_for(4), Some(GridShape::new(2, 2)));
        assert_eq!(policy.shape_for(5), Some(GridShape::new(2, 3)));
        assert_eq!(policy.shape_for(6), Some(GridShape::new(2, 3)));
        assert_eq!(policy.shape_for(7), Some(GridShape::new(2, 4)));
        assert_eq!(policy.shape_for(16), Some(GridShape::new(2, 4)));
    }

    #[test]
    fn test_policy_returns_none_for_zero_cameras() {
        assert_eq!(GridPolicy::default().shape_for(0), None);
    }

    #[test]
    fn test_custom_policy_rules_are_checked_in_order() {
        let policy = GridPolicy {
            rules: vec![GridRule::new(9, 3, 3)],
            fallback: GridShape::new(4, 4),
        };
        assert_eq!(policy.shape_for(2), Some(GridShape::new(3, 3)));
        assert_eq!(policy.shape_for(10), Some(GridShape::new(4, 4)));
    }

    // ── AspectRatio ───────────────────────────────────────────────────────────

    #[test]
    fn test_aspect_ratio_rejects_zero_dimensions() {
        assert!(AspectRatio::new(0, 1080).is_none());
        assert!(AspectRatio::new(1920, 0).is_none());
    }

    #[test]
    fn test_aspect_ratio_wider_comparison() {
        assert!(ratio(16, 9).is_wider_than(&ratio(4, 3)));
        assert!(!ratio(4, 3).is_wider_than(&ratio(16, 9)));
        assert!(!ratio(1920, 1080).is_wider_than(&ratio(16, 9)));
        assert!(ratio(1920, 1080).same_proportion(&ratio(16, 9)));
    }

    #[test]
    fn test_fit_height_rounds_down() {
        assert_eq!(ratio(16, 9).fit_height(640), 360);
        assert_eq!(ratio(16, 9).fit_height(533), 299);
    }

    // ── arrange_grid ──────────────────────────────────────────────────────────

    #[test]
    fn test_arrange_six_default_ratios_in_two_by_three() {
        let rects = arrange_grid(1920, GridShape::new(2, 3), &[DEFAULT_VIDEO_RATIO; 6]).unwrap();
        assert_eq!(rects.len(), 6);
        assert_eq!(rects[0], Rect::new(0, 0, 640, 360));
        assert_eq!(rects[2], Rect::new(1280, 0, 640, 360));
        assert_eq!(rects[3], Rect::new(0, 360, 640, 360));
        assert_eq!(rects[5], Rect::new(1280, 360, 640, 360));
    }

    #[test]
    fn test_arrange_row_height_follows_widest_ratio_in_row() {
        // Row 0 has a 4:3 and a 21:9 camera; the 21:9 one sets the height.
        let ratios = [ratio(4, 3), ratio(21, 9), ratio(4, 3)];
        let rects = arrange_grid(1680, GridShape::new(2, 2), &ratios).unwrap();
        // column width 840; 840 * 9 / 21 = 360
        assert_eq!(rects[0].height, 360);
        assert_eq!(rects[1].height, 360);
        // Row 1 holds only the 4:3 camera: 840 * 3 / 4 = 630
        assert_eq!(rects[2], Rect::new(0, 360, 840, 630));
    }

    #[test]
    fn test_arrange_three_cameras_in_two_by_two_leaves_last_cell_empty() {
        let rects = arrange_grid(1600, GridShape::new(2, 2), &[DEFAULT_VIDEO_RATIO; 3]).unwrap();
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[2].x, 0);
        assert_eq!(rects[2].y, rects[0].height);
    }

    #[test]
    fn test_arrange_columns_cover_full_width_without_gaps() {
        let rects = arrange_grid(1601, GridShape::new(1, 3), &[DEFAULT_VIDEO_RATIO; 3]).unwrap();
        assert_eq!(rects[0].x, 0);
        assert_eq!(rects[0].right(), rects[1].x);
        assert_eq!(rects[1].right(), rects[2].x);
        assert_eq!(rects[2].right(), 1601);
    }

    #[test]
    fn test_arrange_drops_cameras_beyond_capacity() {
        let rects = arrange_grid(800, GridShape::new(1, 2), &[DEFAULT_VIDEO_RATIO; 5]).unwrap();
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn test_arrange_rejects_zero_columns() {
        let result = arrange_grid(800, GridShape::new(1, 0), &[DEFAULT_VIDEO_RATIO]);
        assert_eq!(result, Err(PartitionError::ZeroSegments));
    }
}
