//! Tile specifications and the tile-to-region resolver.
//!
//! A tile specification describes a camera wall in *grid-cell* coordinates:
//! the screen is divided into `columns × rows` cells and every camera slot is
//! given a rectangular run of cells.  Most tiles are a single cell, but a
//! feature camera may span several (e.g. one 2×2 tile among 1×1 tiles).
//!
//! The resolver turns cell coordinates into pixels by indexing the
//! [`Boundaries`] of each axis, so tiles that touch in cell space touch exactly
//! in pixel space as well.
//!
//! ```text
//!   featured_six() on a 3×3 grid:
//!
//!   +-------+-------+---+
//!   |               | 1 |
//!   |       0       +---+
//!   |               | 2 |
//!   +-------+-------+---+
//!   |   4   |   5   | 3 |
//!   +-------+-------+---+
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::partition::{partition, Boundaries, PartitionError};

/// Errors produced while building or resolving tile specifications.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileError {
    /// The grid has zero columns or zero rows.
    #[error("grid must have at least one column and one row (got {columns}x{rows})")]
    EmptyGrid { columns: u32, rows: u32 },

    /// A span is empty or reaches outside the grid.
    #[error("tile {index} span {span:?} does not fit a {columns}x{rows} grid")]
    SpanOutOfGrid {
        index: usize,
        span: TileSpan,
        columns: u32,
        rows: u32,
    },

    /// The boundary vectors do not match the grid dimensions.
    #[error("boundary vectors have {x_segments}x{y_segments} segments, grid is {columns}x{rows}")]
    BoundaryMismatch {
        x_segments: usize,
        y_segments: usize,
        columns: u32,
        rows: u32,
    },

    /// Partitioning an axis failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),
}

/// A rectangle in screen pixels, relative to the top-left of the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns the rightmost X coordinate (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Returns the number of pixels covered.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if this rectangle shares any pixel with `other`.
    ///
    /// Rectangles that merely touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Returns `true` if the pixel at `(px, py)` lies inside this rectangle.
    pub fn contains_point(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}

/// A run of grid cells covered by one tile.
///
/// `end_col` and `end_row` are *exclusive*, so a single cell at column 2,
/// row 0 is `TileSpan { start_col: 2, start_row: 0, end_col: 3, end_row: 1 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSpan {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl TileSpan {
    pub const fn new(start_col: u32, start_row: u32, end_col: u32, end_row: u32) -> Self {
        Self {
            start_col,
            start_row,
            end_col,
            end_row,
        }
    }

    /// A 1×1 span at `(col, row)`.
    pub const fn cell(col: u32, row: u32) -> Self {
        Self::new(col, row, col + 1, row + 1)
    }

    fn fits(&self, columns: u32, rows: u32) -> bool {
        self.start_col < self.end_col
            && self.start_row < self.end_row
            && self.end_col <= columns
            && self.end_row <= rows
    }

    fn contains_cell(&self, col: u32, row: u32) -> bool {
        col >= self.start_col && col < self.end_col && row >= self.start_row && row < self.end_row
    }
}

/// A fixed tile layout: grid dimensions plus one span per camera slot.
///
/// Spans are indexed by camera slot (the camera's position in the camera
/// list).  Overlapping spans are accepted; whoever authors the specification
/// is responsible for keeping tiles apart.
///
/// Deserialization goes through [`TileSpec::new`], so a spec read from a
/// config file is validated the same way as one built in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTileSpec")]
pub struct TileSpec {
    columns: u32,
    rows: u32,
    spans: Vec<TileSpan>,
}

impl TileSpec {
    /// Builds a specification, checking that every span is non-empty and
    /// inside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::EmptyGrid`] for a zero-sized grid and
    /// [`TileError::SpanOutOfGrid`] for the first span that does not fit.
    pub fn new(columns: u32, rows: u32, spans: Vec<TileSpan>) -> Result<Self, TileError> {
        if columns == 0 || rows == 0 {
            return Err(TileError::EmptyGrid { columns, rows });
        }
        if let Some((index, span)) = spans
            .iter()
            .enumerate()
            .find(|(_, s)| !s.fits(columns, rows))
        {
            return Err(TileError::SpanOutOfGrid {
                index,
                span: *span,
                columns,
                rows,
            });
        }
        Ok(Self {
            columns,
            rows,
            spans,
        })
    }

    /// A plain grid with one 1×1 tile per cell, filled row by row.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::EmptyGrid`] for a zero-sized grid.
    pub fn uniform(columns: u32, rows: u32) -> Result<Self, TileError> {
        let spans = (0..rows)
            .flat_map(|r| (0..columns).map(move |c| TileSpan::cell(c, r)))
            .collect();
        Self::new(columns, rows, spans)
    }

    /// The six-camera wall: a 3×3 grid where camera 0 takes the top-left 2×2
    /// block, cameras 1–3 fill the right column top to bottom and cameras 4–5
    /// fill the rest of the bottom row.
    pub fn featured_six() -> Self {
        Self {
            columns: 3,
            rows: 3,
            spans: vec![
                TileSpan::new(0, 0, 2, 2),
                TileSpan::cell(2, 0),
                TileSpan::cell(2, 1),
                TileSpan::cell(2, 2),
                TileSpan::cell(0, 2),
                TileSpan::cell(1, 2),
            ],
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn spans(&self) -> &[TileSpan] {
        &self.spans
    }

    /// Returns the span for camera slot `index`, if the spec has one.
    pub fn span(&self, index: usize) -> Option<&TileSpan> {
        self.spans.get(index)
    }

    /// Returns `true` if every grid cell is covered by exactly one span.
    pub fn covers_grid_exactly(&self) -> bool {
        (0..self.rows).all(|r| {
            (0..self.columns).all(|c| self.spans.iter().filter(|s| s.contains_cell(c, r)).count() == 1)
        })
    }
}

#[derive(Deserialize)]
struct RawTileSpec {
    columns: u32,
    rows: u32,
    spans: Vec<TileSpan>,
}

impl TryFrom<RawTileSpec> for TileSpec {
    type Error = TileError;

    fn try_from(raw: RawTileSpec) -> Result<Self, Self::Error> {
        TileSpec::new(raw.columns, raw.rows, raw.spans)
    }
}

/// Resolves every span of `spec` into a pixel rectangle.
///
/// `xs` must partition the width into `spec.columns()` segments and `ys` the
/// height into `spec.rows()` segments.  The returned vector is indexed like
/// `spec.spans()`.
///
/// # Errors
///
/// Returns [`TileError::BoundaryMismatch`] if the boundary vectors do not match
/// the grid dimensions.
pub fn resolve_regions(
    spec: &TileSpec,
    xs: &Boundaries,
    ys: &Boundaries,
) -> Result<Vec<Rect>, TileError> {
    if xs.segments() != spec.columns as usize || ys.segments() != spec.rows as usize {
        return Err(TileError::BoundaryMismatch {
            x_segments: xs.segments(),
            y_segments: ys.segments(),
            columns: spec.columns,
            rows: spec.rows,
        });
    }

    let mut regions = Vec::with_capacity(spec.spans.len());
    for (index, s) in spec.spans.iter().enumerate() {
        // Spans were validated against the grid, so the lookups cannot miss
        // once the segment counts agree.
        let out_of_grid = || TileError::SpanOutOfGrid {
            index,
            span: *s,
            columns: spec.columns,
            rows: spec.rows,
        };
        let (x, width) = xs
            .span(s.start_col as usize, s.end_col as usize)
            .ok_or_else(out_of_grid)?;
        let (y, height) = ys
            .span(s.start_row as usize, s.end_row as usize)
            .ok_or_else(out_of_grid)?;
        regions.push(Rect::new(x, y, width, height));
    }
    Ok(regions)
}

/// Partitions a `width × height` area for `spec` and resolves all tiles.
///
/// # Errors
///
/// Propagates [`resolve_regions`] errors.
pub fn layout_tiles(spec: &TileSpec, width: u32, height: u32) -> Result<Vec<Rect>, TileError> {
    let xs = partition(width, spec.columns)?;
    let ys = partition(height, spec.rows)?;
    resolve_regions(spec, &xs, &ys)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
