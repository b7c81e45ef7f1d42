//! Integration tests for the layout geometry.
//!
//! These tests sweep ranges of screen sizes and grid shapes through the public
//! API and check the properties a camera wall depends on: no seams, no
//! overlaps and nothing drawn outside the screen.

use camgrid_core::{
    arrange_grid, layout_tiles, partition, select_visible, CameraDescriptor, CategoryFilter,
    GridPolicy, GridShape, PartitionError, Rect, TileSpan, TileSpec, DEFAULT_VIDEO_RATIO,
};

// ── partition ─────────────────────────────────────────────────────────────────

#[test]
fn test_partition_endpoints_monotonic_and_exact_sum_over_ranges() {
    for total in (0..=2000u32).step_by(7) {
        for segments in 1..=16u32 {
            let b = partition(total, segments).expect("segments >= 1");
            let offsets = b.as_slice();

            assert_eq!(offsets.len(), segments as usize + 1);
            assert_eq!(offsets[0], 0);
            assert_eq!(offsets[segments as usize], total);
            assert!(
                offsets.windows(2).all(|w| w[0] <= w[1]),
                "offsets must be non-decreasing for {total}/{segments}: {offsets:?}"
            );
            assert_eq!(b.widths().iter().sum::<u32>(), total);
        }
    }
}

#[test]
fn test_partition_has_no_equal_neighbours_when_total_at_least_segments() {
    for segments in 1..=16u32 {
        for total in segments..=segments * 50 {
            let b = partition(total, segments).expect("segments >= 1");
            assert!(
                b.as_slice().windows(2).all(|w| w[0] < w[1]),
                "zero-width segment for {total}/{segments}"
            );
        }
    }
}

#[test]
fn test_partition_widths_differ_by_at_most_one() {
    for total in [1366u32, 1600, 1920, 2560, 3840] {
        for segments in 1..=12u32 {
            let widths = partition(total, segments).unwrap().widths();
            let min = *widths.iter().min().unwrap();
            let max = *widths.iter().max().unwrap();
            assert!(max - min <= 1, "{total}/{segments}: {widths:?}");
        }
    }
}

#[test]
fn test_partition_reference_value() {
    assert_eq!(partition(1600, 3).unwrap().as_slice(), &[0, 533, 1067, 1600]);
    assert_eq!(partition(100, 0), Err(PartitionError::ZeroSegments));
}

// ── tiles ─────────────────────────────────────────────────────────────────────

fn assert_tiles_screen_exactly(rects: &[Rect], width: u32, height: u32) {
    let total: u64 = rects.iter().map(Rect::area).sum();
    assert_eq!(total, u64::from(width) * u64::from(height), "areas must sum to the screen");

    for (i, a) in rects.iter().enumerate() {
        assert!(a.right() <= width && a.bottom() <= height, "tile {i} leaves the screen");
        for (j, b) in rects.iter().enumerate().skip(i + 1) {
            assert!(!a.overlaps(b), "tiles {i} and {j} overlap: {a:?} {b:?}");
        }
    }
}

#[test]
fn test_uniform_specs_tile_the_screen_exactly() {
    for (w, h) in [(1600u32, 900u32), (1366, 768), (1921, 1081), (7, 5)] {
        for cols in 1..=5 {
            for rows in 1..=4 {
                let spec = TileSpec::uniform(cols, rows).unwrap();
                let rects = layout_tiles(&spec, w, h).unwrap();
                assert_eq!(rects.len(), (cols * rows) as usize);
                assert_tiles_screen_exactly(&rects, w, h);
            }
        }
    }
}

#[test]
fn test_featured_six_tiles_the_screen_exactly_at_any_size() {
    let spec = TileSpec::featured_six();
    assert!(spec.covers_grid_exactly());

    for (w, h) in [(1600u32, 900u32), (1601, 901), (1280, 720), (3840, 2160), (10, 10)] {
        let rects = layout_tiles(&spec, w, h).unwrap();
        assert_tiles_screen_exactly(&rects, w, h);
    }
}

#[test]
fn test_overlapping_spec_is_resolved_without_error() {
    // Overlap is allowed and not detected.
    let spec = TileSpec::new(2, 2, vec![TileSpan::new(0, 0, 2, 2), TileSpan::cell(1, 1)]).unwrap();
    let rects = layout_tiles(&spec, 800, 600).unwrap();
    assert!(rects[0].overlaps(&rects[1]));
    assert!(!spec.covers_grid_exactly());
}

// ── grid ──────────────────────────────────────────────────────────────────────

#[test]
fn test_grid_policy_capacity_covers_count_up_to_eight() {
    let policy = GridPolicy::default();
    for count in 1..=8usize {
        let shape = policy.shape_for(count).unwrap();
        assert!(shape.capacity() >= count, "{count} cameras do not fit {shape:?}");
    }
}

#[test]
fn test_grid_arrangement_stays_inside_width_and_rows_do_not_overlap() {
    let policy = GridPolicy::default();
    for count in 1..=8usize {
        let shape = policy.shape_for(count).unwrap();
        let rects = arrange_grid(1600, shape, &vec![DEFAULT_VIDEO_RATIO; count]).unwrap();

        assert_eq!(rects.len(), count);
        for (i, a) in rects.iter().enumerate() {
            assert!(a.right() <= 1600);
            for b in rects.iter().skip(i + 1) {
                assert!(!a.overlaps(b));
            }
        }
    }
}

#[test]
fn test_grid_of_filtered_cameras_follows_policy() {
    // Arrange
    let cameras: Vec<CameraDescriptor> = (1..=10)
        .map(|i| {
            let area = if i % 2 == 0 { "Gate" } else { "Lobby" };
            CameraDescriptor::new(i, format!("Cam {i}"), format!("rtsp://10.0.0.{i}/"), area)
        })
        .collect();

    // Act
    let visible = select_visible(&cameras, &CategoryFilter::Area("Gate".into()), 6);
    let shape = GridPolicy::default().shape_for(visible.len()).unwrap();

    // Assert
    assert_eq!(visible, vec![1, 3, 5, 7, 9]);
    assert_eq!(shape, GridShape::new(2, 3));
}
