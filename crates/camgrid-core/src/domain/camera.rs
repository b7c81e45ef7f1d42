//! Camera descriptors and the area filter.
//!
//! The camera list is loaded once at startup and never changes while the
//! viewer runs.  Its order matters: it is the slot order used by tile
//! specifications and the order in which the grid fills its cells.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label that selects every camera regardless of area.
pub const ALL_AREAS_LABEL: &str = "all";

/// Stable identifier of a camera, as configured by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(pub u32);

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One configured camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Stable identifier.
    pub id: CameraId,
    /// Display name shown in the tile overlay.
    pub name: String,
    /// Stream address, usually `rtsp://…`.  Empty for a placeholder slot.
    #[serde(default)]
    pub url: String,
    /// Zone tag used by the area filter (e.g. "Gate", "Lobby").
    #[serde(default)]
    pub area: String,
}

impl CameraDescriptor {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        url: impl Into<String>,
        area: impl Into<String>,
    ) -> Self {
        Self {
            id: CameraId(id),
            name: name.into(),
            url: url.into(),
            area: area.into(),
        }
    }

    /// Returns `true` if this camera has a stream to play.
    ///
    /// Placeholder cameras (empty URL) still get a tile but playback is never
    /// started for them.
    pub fn has_stream(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Text drawn in the tile's overlay label, e.g. `[3] Lobby east`.
    pub fn overlay_label(&self) -> String {
        format!("[{}] {}", self.id, self.name)
    }
}

/// Which cameras the grid should consider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    /// Every camera, in list order.
    #[default]
    All,
    /// Only cameras whose area matches exactly.
    Area(String),
}

impl CategoryFilter {
    /// Parses a selector label.  [`ALL_AREAS_LABEL`] (any case) and the empty
    /// string mean [`CategoryFilter::All`]; anything else is an exact area name.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_AREAS_LABEL) {
            Self::All
        } else {
            Self::Area(trimmed.to_string())
        }
    }

    /// Returns `true` if `camera` passes this filter.
    pub fn matches(&self, camera: &CameraDescriptor) -> bool {
        match self {
            Self::All => true,
            Self::Area(area) => camera.area == *area,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_AREAS_LABEL),
            Self::Area(area) => f.write_str(area),
        }
    }
}

/// Returns the list indices of the cameras to show, in list order.
///
/// Cameras are filtered by `filter` and the result is truncated to `count`.
pub fn select_visible(
    cameras: &[CameraDescriptor],
    filter: &CategoryFilter,
    count: usize,
) -> Vec<usize> {
    cameras
        .iter()
        .enumerate()
        .filter(|(_, cam)| filter.matches(cam))
        .map(|(i, _)| i)
        .take(count)
        .collect()
}

/// Returns the selector entries: [`CategoryFilter::All`] followed by every
/// distinct area name in sorted order.
pub fn available_areas(cameras: &[CameraDescriptor]) -> Vec<CategoryFilter> {
    let areas: BTreeSet<&str> = cameras
        .iter()
        .map(|c| c.area.as_str())
        .filter(|a| !a.is_empty())
        .collect();
    std::iter::once(CategoryFilter::All)
        .chain(areas.into_iter().map(|a| CategoryFilter::Area(a.to_string())))
        .collect()
}

/// Returns the selector entry after `current`, wrapping to
/// [`CategoryFilter::All`].  An area no camera has also restarts at `All`.
pub fn next_area(cameras: &[CameraDescriptor], current: &CategoryFilter) -> CategoryFilter {
    let areas = available_areas(cameras);
    let next = areas
        .iter()
        .position(|a| a == current)
        .map_or(0, |i| (i + 1) % areas.len());
    areas[next].clone()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cameras() -> Vec<CameraDescriptor> {
        vec![
            CameraDescriptor::new(1, "Gate 1", "rtsp://10.0.0.1/ch1", "Gate"),
            CameraDescriptor::new(2, "Lobby 1", "rtsp://10.0.0.2/ch1", "Lobby"),
            CameraDescriptor::new(3, "Fence", "rtsp://10.0.0.3/ch1", "Fence"),
            CameraDescriptor::new(4, "Gate 2", "rtsp://10.0.0.4/ch1", "Gate"),
            CameraDescriptor::new(5, "Lobby 2", "", "Lobby"),
            CameraDescriptor::new(6, "Gate 3", "rtsp://10.0.0.6/ch1", "Gate"),
        ]
    }

    #[test]
    fn test_filter_all_returns_every_camera_in_order() {
        let cams = cameras();
        assert_eq!(select_visible(&cams, &CategoryFilter::All, 16), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_filter_area_returns_matching_cameras_preserving_order() {
        let cams = cameras();
        let gate = CategoryFilter::Area("Gate".to_string());
        assert_eq!(select_visible(&cams, &gate, 16), vec![0, 3, 5]);
    }

    #[test]
    fn test_filter_truncates_to_requested_count() {
        let cams = cameras();
        let gate = CategoryFilter::Area("Gate".to_string());
        assert_eq!(select_visible(&cams, &gate, 2), vec![0, 3]);
        assert_eq!(select_visible(&cams, &CategoryFilter::All, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_filter_unknown_area_returns_nothing() {
        let cams = cameras();
        let none = CategoryFilter::Area("Parking".to_string());
        assert!(select_visible(&cams, &none, 16).is_empty());
    }

    #[test]
    fn test_filter_area_match_is_exact() {
        let cams = cameras();
        let lower = CategoryFilter::Area("gate".to_string());
        assert!(select_visible(&cams, &lower, 16).is_empty());
    }

    #[test]
    fn test_from_label_recognises_all_sentinel() {
        assert_eq!(CategoryFilter::from_label("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_label("ALL"), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_label("  "), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::from_label("Lobby"),
            CategoryFilter::Area("Lobby".to_string())
        );
    }

    #[test]
    fn test_available_areas_starts_with_all_then_sorted_unique() {
        let areas = available_areas(&cameras());
        let labels: Vec<String> = areas.iter().map(|a| a.to_string()).collect();
        assert_eq!(labels, vec!["all", "Fence", "Gate", "Lobby"]);
    }

    #[test]
    fn test_next_area_cycles_and_wraps() {
        let cams = cameras();

        let first = next_area(&cams, &CategoryFilter::All);
        let last = next_area(&cams, &CategoryFilter::Area("Lobby".into()));
        let unknown = next_area(&cams, &CategoryFilter::Area("Roof".into()));

        assert_eq!(first, CategoryFilter::Area("Fence".into()));
        assert_eq!(last, CategoryFilter::All);
        assert_eq!(unknown, CategoryFilter::All);
    }

    #[test]
    fn test_placeholder_camera_has_no_stream() {
        let cams = cameras();
        assert!(cams[0].has_stream());
        assert!(!cams[4].has_stream());
    }

    #[test]
    fn test_overlay_label_includes_id_and_name() {
        let cam = CameraDescriptor::new(7, "Back door", "rtsp://x", "Rear");
        assert_eq!(cam.overlay_label(), "[7] Back door");
    }
}
