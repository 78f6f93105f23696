//! Stage 3: connected-region flood fill, boundary tracing, bad-region filtering, and polyline
//! simplification.
//!
//! Grounded on the teacher's `regions.rs` watershed flood fill (`flood_region`,
//! `sort_cells_by_level`) for the region-growing half, and on the original `TileGenerator.cpp`'s
//! tracer state machine for boundary walking; simplification follows a Douglas-Peucker-style
//! perpendicular-distance reduction, matching the base spec's `SimplifyContours` description.

use super::filter::{index, WalkableCell};

/// A single boundary vertex, still in voxel-grid coordinates (not yet converted to tile-local
/// fixed point — that conversion happens in [`super::triangulate`]).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ContourPoint {
    pub x: u16,
    pub z: u16,
    pub height: u16,
}

/// A single region's outer boundary, in region-local winding order (CCW).
#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<ContourPoint>,
    pub region_id: u16,
    pub area: u32,
}

/// Flood-fill connected, same-paint walkable cells into regions, then trace each region's outer
/// boundary. `paint` carries one value per cell from [`super::distance::calc_paint_values`]:
/// two adjacent walkable cells only join the same region when their paint matches, so distinct
/// walkable areas that happen to touch (e.g. a ledge flush against a lower floor) come out as
/// separate regions rather than merging into one, mirroring the original's
/// `paintcontinuation`/`TraceContour`-on-paint-change behaviour.
pub fn extract_contours(width: u16, depth: u16, cells: &[WalkableCell], paint: &[u8]) -> Vec<Contour> {
    let mut region_of = vec![0u16; cells.len()];
    let mut next_region: u16 = 1;

    for start_z in 0..depth {
        for start_x in 0..width {
            let start_idx = index(width, start_x, start_z);
            if !cells[start_idx].walkable || region_of[start_idx] != 0 {
                continue;
            }
            let region_id = next_region;
            next_region += 1;
            flood_fill(width, depth, cells, paint, &mut region_of, start_x, start_z, region_id);
        }
    }

    let mut contours = Vec::new();
    for region_id in 1..next_region {
        if let Some((points, area)) = trace_region_boundary(width, depth, &region_of, region_id) {
            contours.push(Contour { points, region_id, area });
        }
    }
    contours
}

fn flood_fill(
    width: u16,
    depth: u16,
    cells: &[WalkableCell],
    paint: &[u8],
    region_of: &mut [u16],
    start_x: u16,
    start_z: u16,
    region_id: u16,
) {
    let mut stack = vec![(start_x, start_z)];
    let start_idx = index(width, start_x, start_z);
    region_of[start_idx] = region_id;
    let region_paint = paint.get(start_idx).copied().unwrap_or(0);

    while let Some((x, z)) = stack.pop() {
        for (dx, dz) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
            let nx = x as i32 + dx;
            let nz = z as i32 + dz;
            if nx < 0 || nz < 0 || nx >= width as i32 || nz >= depth as i32 {
                continue;
            }
            let (nx, nz) = (nx as u16, nz as u16);
            let idx = index(width, nx, nz);
            let same_paint = paint.get(idx).copied().unwrap_or(0) == region_paint;
            if cells[idx].walkable && region_of[idx] == 0 && same_paint {
                region_of[idx] = region_id;
                stack.push((nx, nz));
            }
        }
    }
}

/// Walk the outer edge of a region using a Moore-neighbour-style boundary trace over cell
/// corners, returning the polyline and the region's cell-count area (used by
/// [`filter_bad_regions`]).
fn trace_region_boundary(
    width: u16,
    depth: u16,
    region_of: &[u16],
    region_id: u16,
) -> Option<(Vec<ContourPoint>, u32)> {
    let in_region = |x: i32, z: i32| -> bool {
        if x < 0 || z < 0 || x >= width as i32 || z >= depth as i32 {
            return false;
        }
        region_of[index(width, x as u16, z as u16)] == region_id
    };

    let area = region_of.iter().filter(|&&r| r == region_id).count() as u32;

    // Find the starting cell: the lowest (z, then x) cell in the region — guarantees its
    // top-left corner lies on the outer boundary.
    let mut start = None;
    'search: for z in 0..depth {
        for x in 0..width {
            if in_region(x as i32, z as i32) {
                start = Some((x, z));
                break 'search;
            }
        }
    }
    let (sx, sz) = start?;

    // Walk the boundary corners clockwise-in-grid-space (which is CCW in the x/z plane because z
    // increases downward in row order), using the four corner offsets of the starting cell and a
    // right-hand-rule edge follow.
    let mut points = Vec::new();
    let mut cx = sx as i32;
    let mut cz = sz as i32;
    // direction: 0 = +x, 1 = +z, 2 = -x, 3 = -z
    let mut dir = 0u8;
    let start_corner = (cx, cz);
    let mut guard = 0usize;
    let max_steps = (width as usize + 1) * (depth as usize + 1) * 4 + 8;

    loop {
        points.push(ContourPoint { x: cx as u16, z: cz as u16, height: 0 });

        // Check the two cells ahead-left/ahead-right of travel direction to decide the next turn,
        // classic boundary-following over a binary occupancy grid.
        let ahead_right = match dir {
            0 => in_region(cx, cz - 1),
            1 => in_region(cx, cz),
            2 => in_region(cx - 1, cz),
            _ => in_region(cx - 1, cz - 1),
        };
        let ahead_left = match dir {
            0 => in_region(cx, cz),
            1 => in_region(cx - 1, cz),
            2 => in_region(cx - 1, cz - 1),
            _ => in_region(cx, cz - 1),
        };

        if ahead_right && !ahead_left {
            // straight
        } else if !ahead_right {
            dir = (dir + 1) % 4;
        } else {
            dir = (dir + 3) % 4;
        }

        let (dx, dz) = if ahead_right && !ahead_left {
            (dx, dz)
        } else {
            match dir {
                0 => (1, 0),
                1 => (0, 1),
                2 => (-1, 0),
                _ => (0, -1),
            }
        };

        cx += dx;
        cz += dz;

        guard += 1;
        if (cx, cz) == start_corner || guard > max_steps {
            break;
        }
    }

    if points.len() < 3 {
        return None;
    }
    Some((points, area))
}

/// Discard regions whose cell-count area is below `min_region_area`.
pub fn filter_bad_regions(contours: Vec<Contour>, min_region_area: u32) -> Vec<Contour> {
    contours.into_iter().filter(|c| c.area >= min_region_area).collect()
}

/// Reduce a contour's point count via iterative perpendicular-distance simplification
/// (Douglas-Peucker) in the (x, z) plane, keeping any point whose deviation from the straight line
/// between its neighbours exceeds `max_error_sq`.
pub fn simplify_contour(contour: Contour, max_error_sq: f32) -> Contour {
    if contour.points.len() < 3 {
        return contour;
    }
    let mut keep = vec![false; contour.points.len()];
    keep[0] = true;
    keep[contour.points.len() - 1] = true;
    simplify_range(&contour.points, 0, contour.points.len() - 1, max_error_sq, &mut keep);

    let points = contour
        .points
        .iter()
        .zip(keep.iter())
        .filter(|(_, &k)| k)
        .map(|(p, _)| *p)
        .collect();

    Contour { points, region_id: contour.region_id, area: contour.area }
}

fn simplify_range(points: &[ContourPoint], start: usize, end: usize, max_error_sq: f32, keep: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let a = points[start];
    let b = points[end];
    let mut max_dist = 0.0f32;
    let mut max_index = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance_sq(points[i], a, b);
        if d > max_dist {
            max_dist = d;
            max_index = i;
        }
    }

    if max_dist > max_error_sq {
        keep[max_index] = true;
        simplify_range(points, start, max_index, max_error_sq, keep);
        simplify_range(points, max_index, end, max_error_sq, keep);
    }
}

fn perpendicular_distance_sq(p: ContourPoint, a: ContourPoint, b: ContourPoint) -> f32 {
    let (ax, az) = (a.x as f32, a.z as f32);
    let (bx, bz) = (b.x as f32, b.z as f32);
    let (px, pz) = (p.x as f32, p.z as f32);

    let dx = bx - ax;
    let dz = bz - az;
    let len_sq = dx * dx + dz * dz;
    if len_sq < f32::EPSILON {
        return (px - ax).powi(2) + (pz - az).powi(2);
    }

    let cross = (px - ax) * dz - (pz - az) * dx;
    (cross * cross) / len_sq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_block(width: u16, depth: u16) -> Vec<WalkableCell> {
        vec![WalkableCell { walkable: true, surface_height: 0, distance: 0 }; width as usize * depth as usize]
    }

    #[test]
    fn single_block_produces_one_region() {
        let cells = solid_block(6, 6);
        let contours = extract_contours(6, 6, &cells, &[]);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area, 36);
    }

    #[test]
    fn disconnected_blocks_produce_separate_regions() {
        let mut cells = solid_block(6, 1);
        cells[2].walkable = false;
        let contours = extract_contours(6, 1, &cells, &[]);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn differing_paint_splits_an_otherwise_contiguous_block() {
        let cells = solid_block(6, 1);
        let mut paint = vec![0u8; 6];
        paint[3] = 1;
        paint[4] = 1;
        paint[5] = 1;
        let contours = extract_contours(6, 1, &cells, &paint);
        assert_eq!(contours.len(), 2, "a paint change should force a new region even though cells are contiguous");
    }

    #[test]
    fn filter_bad_regions_drops_small_areas() {
        let contours = vec![
            Contour { points: vec![], region_id: 1, area: 1 },
            Contour { points: vec![], region_id: 2, area: 100 },
        ];
        let kept = filter_bad_regions(contours, 4);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].region_id, 2);
    }

    #[test]
    fn simplify_reduces_colinear_points() {
        let points = vec![
            ContourPoint { x: 0, z: 0, height: 0 },
            ContourPoint { x: 1, z: 0, height: 0 },
            ContourPoint { x: 2, z: 0, height: 0 },
            ContourPoint { x: 2, z: 2, height: 0 },
        ];
        let contour = Contour { points, region_id: 1, area: 4 };
        let simplified = simplify_contour(contour, 0.01);
        assert!(simplified.points.len() < 4);
    }
}
