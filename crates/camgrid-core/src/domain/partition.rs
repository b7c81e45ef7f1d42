//! Gapless integer partitioning of one screen axis.
//!
//! A camera wall must cover the screen without a single-pixel seam.  Dividing
//! 1600 pixels into three columns cannot give three equal integer widths, and
//! rounding each width separately leaks or gains a pixel.  Instead every
//! boundary is rounded independently from the total:
//!
//! ```text
//! B[i] = round(i * T / S)        for i in 0..=S
//! ```
//!
//! so `B[0] = 0` and `B[S] = T` hold exactly, and the widths `B[i+1] - B[i]`
//! always add up to `T`.
//!
//! # Rounding rule
//!
//! Ties round half up.  The computation is done in exact integer arithmetic as
//! `(2·i·T + S) / (2·S)` on `u64`, so no floating point is involved and the
//! result is identical on every platform.

use thiserror::Error;

/// Errors returned by [`partition`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// The segment count was zero.  This is a caller bug, not a runtime condition.
    #[error("invalid argument: segment count must be at least 1")]
    ZeroSegments,
}

/// An ordered boundary vector for one axis.
///
/// Holds `segments + 1` non-decreasing pixel offsets.  The first is always 0
/// and the last is always the total extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundaries {
    offsets: Vec<u32>,
}

impl Boundaries {
    /// Returns the raw offsets (`segments + 1` entries).
    pub fn as_slice(&self) -> &[u32] {
        &self.offsets
    }

    /// Returns the number of segments.
    pub fn segments(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the total extent (the last offset).
    pub fn extent(&self) -> u32 {
        self.offsets[self.offsets.len() - 1]
    }

    /// Returns the offset at boundary index `i`, or `None` if out of range.
    pub fn offset(&self, i: usize) -> Option<u32> {
        self.offsets.get(i).copied()
    }

    /// Returns `(start_offset, length)` covering boundary indices `start..end`.
    ///
    /// Returns `None` if either index is out of range or `end < start`.
    pub fn span(&self, start: usize, end: usize) -> Option<(u32, u32)> {
        if end < start {
            return None;
        }
        let a = self.offset(start)?;
        let b = self.offset(end)?;
        Some((a, b - a))
    }

    /// Returns the width of every segment, in order.
    pub fn widths(&self) -> Vec<u32> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Partitions `total` pixels into `segments` contiguous integer segments.
///
/// # Errors
///
/// Returns [`PartitionError::ZeroSegments`] when `segments` is 0.
///
/// # Example
///
/// ```
/// use camgrid_core::partition;
///
/// let b = partition(1600, 3).unwrap();
/// assert_eq!(b.as_slice(), &[0, 533, 1067, 1600]);
/// ```
pub fn partition(total: u32, segments: u32) -> Result<Boundaries, PartitionError> {
    if segments == 0 {
        return Err(PartitionError::ZeroSegments);
    }

    let offsets = (0..=segments)
        .map(|i| boundary(i, total, segments))
        .collect();

    Ok(Boundaries { offsets })
}

/// Round-half-up of `index * total / segments`, exact in integers:
/// `floor((2*i*t + s) / (2*s))`.  `2*i*t` needs 66 bits when both operands
/// are near `u32::MAX`; the result never exceeds `total`.
fn boundary(index: u32, total: u32, segments: u32) -> u32 {
    let (i, t, s) = (u128::from(index), u128::from(total), u128::from(segments));
    ((2 * i * t + s) / (2 * s)) as u32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
