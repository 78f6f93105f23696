//! Stage 2: classify every column's walkable span, accounting for backface/water rejection, agent
//! clearance, and a climbable-step/slope probe over the four axial neighbours. Grounded on
//! `TileGenerator::FilterWalkable` (`TileGenerator.cpp:323`), which rejects backface and
//! over-deep-water spans outright, then walks each of the four axial neighbours checking both
//! that a matching span exists within `walkableClimb` and that any step up to it is shallow enough
//! (`climbableStepRatio`/`climbableIncineGradient`) to be a ramp rather than a wall. Inclusion and
//! exclusion [`BoundingVolume`] prisms are applied last, same as the original's `aabb`/
//! `fullyContained` parameters.

use crate::bounding_volume::BoundingVolume;
use crate::fixed::Real;
use crate::generator::GeneratorParams;
use crate::span_grid::{Span, SpanGridProvider};

/// The walkable-surface classification of one `(x, z)` column after stage 2.
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkableCell {
    pub walkable: bool,
    /// Height, in voxel units, of the top of the walkable span this column rests on.
    pub surface_height: u16,
    /// Eroded distance in voxel units to the nearest non-walkable neighbour, filled in once
    /// [`crate::generator::distance`] runs; `0` until then.
    pub distance: u16,
}

/// Select, per column, the lowest-qualifying span with enough clearance above it and no
/// backface/water rejection, then drop any column whose axial neighbourhood can't support a
/// climbable step or ramp onto it, then apply inclusion/exclusion volumes.
pub fn filter_walkable(grid: &dyn SpanGridProvider, params: &GeneratorParams) -> Vec<WalkableCell> {
    let width = grid.width();
    let depth = grid.depth();
    let mut cells = vec![WalkableCell::default(); width as usize * depth as usize];

    for z in 0..depth {
        for x in 0..width {
            if let Some((top, _)) = pick_walkable_span(grid.column(x, z), params) {
                let idx = index(width, x, z);
                cells[idx] = WalkableCell { walkable: true, surface_height: top, distance: 0 };
            }
        }
    }

    let snapshot = cells.clone();
    for z in 0..depth {
        for x in 0..width {
            let idx = index(width, x, z);
            if !snapshot[idx].walkable {
                continue;
            }
            if !has_climbable_neighbourhood(grid, &snapshot, width, depth, x, z, params) {
                cells[idx].walkable = false;
            }
        }
    }

    apply_volumes(grid, &mut cells, width, depth, params);

    cells
}

/// First span (bottom to top) that is neither a backface nor too deep underwater and has enough
/// clearance above it for the agent's height. Returns its top height and index.
fn pick_walkable_span(spans: &[Span], params: &GeneratorParams) -> Option<(u16, usize)> {
    for (i, span) in spans.iter().enumerate() {
        if !span.walkable || span.is_backface || span.water_depth > params.max_water_depth {
            continue;
        }
        let clearance = match spans.get(i + 1) {
            Some(next) => next.min.saturating_sub(span.max),
            None => u16::MAX,
        };
        if clearance >= params.walkable_height {
            return Some((span.max, i));
        }
    }
    None
}

const NEIGHBOUR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A span only stays walkable if all four axial neighbours offer a climbable foothold: either
/// flush with this span's height, or reachable via a step shallow enough to pass the incline/step
/// ratio test. Any single failing neighbour rejects the whole cell, matching the original's
/// `neighbourTest = false; break` short-circuit.
fn has_climbable_neighbourhood(
    grid: &dyn SpanGridProvider,
    cells: &[WalkableCell],
    width: u16,
    depth: u16,
    x: u16,
    z: u16,
    params: &GeneratorParams,
) -> bool {
    let origin_height = cells[index(width, x, z)].surface_height;
    for &(dx, dz) in &NEIGHBOUR_OFFSETS {
        if !probe_direction(grid, width, depth, x, z, dx, dz, origin_height, params) {
            return false;
        }
    }
    true
}

/// Walks outward along one axial direction looking for a span within `walkable_climb` of
/// `origin_height`, then (if it's a step rather than flush ground) probes further out to confirm
/// the climb is gentle enough to be a ramp: the wider `climbable_step_ratio` allows the step to
/// be, the more consecutive probe steps are required to stay within climb range of the last one.
fn probe_direction(
    grid: &dyn SpanGridProvider,
    width: u16,
    depth: u16,
    x: u16,
    z: u16,
    dx: i32,
    dz: i32,
    origin_height: u16,
    params: &GeneratorParams,
) -> bool {
    let nx = x as i32 + dx;
    let nz = z as i32 + dz;
    if nx < 0 || nz < 0 || nx >= width as i32 || nz >= depth as i32 {
        return false;
    }

    let (mut last_top, step) = match matching_span(grid, nx as u16, nz as u16, origin_height, params) {
        Some(v) => v,
        None => return false,
    };

    if step == 0 {
        return true;
    }
    if step > params.walkable_climb {
        return false;
    }

    let gradient = step as f32 / params.climbable_step_ratio.max(1.0);
    if gradient * gradient > params.climbable_incline_gradient * params.climbable_incline_gradient {
        return false;
    }

    let step_test_count = (step as f32 * params.climbable_step_ratio).ceil() as i32;
    for k in 2..=step_test_count.max(1) {
        let px = x as i32 + dx * k;
        let pz = z as i32 + dz * k;
        if px < 0 || pz < 0 || px >= width as i32 || pz >= depth as i32 {
            break;
        }
        match matching_span(grid, px as u16, pz as u16, last_top, params) {
            Some((top, _)) => last_top = top,
            None => break,
        }
    }

    true
}

/// Closest-height walkable span in the neighbour column within `walkable_climb` of `reference`,
/// returning its height and absolute step from `reference`.
fn matching_span(
    grid: &dyn SpanGridProvider,
    x: u16,
    z: u16,
    reference: u16,
    params: &GeneratorParams,
) -> Option<(u16, u16)> {
    let spans = grid.column(x, z);
    let mut best: Option<(u16, u16)> = None;
    for (i, span) in spans.iter().enumerate() {
        if !span.walkable || span.is_backface || span.water_depth > params.max_water_depth {
            continue;
        }
        let clearance = match spans.get(i + 1) {
            Some(next) => next.min.saturating_sub(span.max),
            None => u16::MAX,
        };
        if clearance < params.walkable_height {
            continue;
        }
        let step = (span.max as i32 - reference as i32).unsigned_abs() as u16;
        if step > params.walkable_climb {
            continue;
        }
        if best.map(|(_, s)| step < s).unwrap_or(true) {
            best = Some((span.max, step));
        }
    }
    best
}

/// A walkable column must fall inside at least one inclusion volume (if any were given) and
/// outside every exclusion volume.
fn apply_volumes(
    grid: &dyn SpanGridProvider,
    cells: &mut [WalkableCell],
    width: u16,
    depth: u16,
    params: &GeneratorParams,
) {
    if params.inclusion_volumes.is_empty() && params.exclusion_volumes.is_empty() {
        return;
    }

    let voxel_size = grid.voxel_size();
    for z in 0..depth {
        for x in 0..width {
            let idx = index(width, x, z);
            if !cells[idx].walkable {
                continue;
            }
            let point = crate::fixed::Vector3::new(
                Real::from_f32(x as f32) * voxel_size.x,
                Real::from_f32(cells[idx].surface_height as f32) * voxel_size.y,
                Real::from_f32(z as f32) * voxel_size.z,
            );

            if !params.inclusion_volumes.is_empty()
                && !contained_in_any(&params.inclusion_volumes, point)
            {
                cells[idx].walkable = false;
                continue;
            }
            if contained_in_any(&params.exclusion_volumes, point) {
                cells[idx].walkable = false;
            }
        }
    }
}

fn contained_in_any(volumes: &[BoundingVolume], point: crate::fixed::Vector3) -> bool {
    volumes.iter().any(|v| v.contains_point(point))
}

pub(crate) fn index(width: u16, x: u16, z: u16) -> usize {
    z as usize * width as usize + x as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Real, Vector2, Vector3};
    use crate::span_grid::CompactSpanGrid;

    #[test]
    fn picks_span_with_enough_clearance() {
        let mut grid = CompactSpanGrid::new(1, 1, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        grid.set_column(
            0,
            0,
            vec![
                Span { min: 0, max: 2, walkable: true, ..Default::default() },
                Span { min: 2, max: 4, walkable: false, ..Default::default() },
                Span { min: 4, max: 6, walkable: true, ..Default::default() },
            ],
        );
        let params = GeneratorParams { walkable_height: 4, walkable_radius: 0, ..GeneratorParams::default() };
        let cells = filter_walkable(&grid, &params);
        assert!(cells[0].walkable);
        assert_eq!(cells[0].surface_height, 6);
    }

    #[test]
    fn backface_span_is_rejected() {
        let mut grid = CompactSpanGrid::new(1, 1, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        grid.set_column(
            0,
            0,
            vec![Span { min: 0, max: 2, walkable: true, is_backface: true, ..Default::default() }],
        );
        let params = GeneratorParams::default();
        let cells = filter_walkable(&grid, &params);
        assert!(!cells[0].walkable);
    }

    #[test]
    fn deep_water_span_is_rejected() {
        let mut grid = CompactSpanGrid::new(1, 1, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        grid.set_column(
            0,
            0,
            vec![Span { min: 0, max: 2, walkable: true, water_depth: 5, ..Default::default() }],
        );
        let params = GeneratorParams { max_water_depth: 1, ..GeneratorParams::default() };
        let cells = filter_walkable(&grid, &params);
        assert!(!cells[0].walkable);
    }

    #[test]
    fn isolated_column_with_no_neighbours_is_rejected() {
        let mut grid = CompactSpanGrid::new(3, 3, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        grid.set_column(1, 1, vec![Span { min: 0, max: 4, walkable: true, ..Default::default() }]);
        let params = GeneratorParams::default();
        let cells = filter_walkable(&grid, &params);
        assert!(!cells[index(3, 1, 1)].walkable);
    }

    #[test]
    fn flat_neighbourhood_stays_walkable() {
        let mut grid = CompactSpanGrid::new(3, 3, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        for z in 0..3 {
            for x in 0..3 {
                grid.set_column(x, z, vec![Span { min: 0, max: 4, walkable: true, ..Default::default() }]);
            }
        }
        let params = GeneratorParams { walkable_height: 1, ..GeneratorParams::default() };
        let cells = filter_walkable(&grid, &params);
        assert!(cells[index(3, 1, 1)].walkable);
    }

    #[test]
    fn tall_unclimbable_step_is_rejected() {
        let mut grid = CompactSpanGrid::new(3, 1, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        for x in 0..3 {
            let height = if x == 1 { 40 } else { 4 };
            grid.set_column(x, 0, vec![Span { min: 0, max: height, walkable: true, ..Default::default() }]);
        }
        let params = GeneratorParams { walkable_height: 1, walkable_climb: 2, ..GeneratorParams::default() };
        let cells = filter_walkable(&grid, &params);
        assert!(!cells[index(3, 1, 0)].walkable);
    }

    #[test]
    fn exclusion_volume_removes_walkable_column() {
        let mut grid = CompactSpanGrid::new(3, 3, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        for z in 0..3 {
            for x in 0..3 {
                grid.set_column(x, z, vec![Span { min: 0, max: 4, walkable: true, ..Default::default() }]);
            }
        }
        let exclusion = BoundingVolume::new(
            vec![
                Vector2::new(Real::from_f32(-1.0), Real::from_f32(-1.0)),
                Vector2::new(Real::from_f32(2.0), Real::from_f32(-1.0)),
                Vector2::new(Real::from_f32(2.0), Real::from_f32(2.0)),
                Vector2::new(Real::from_f32(-1.0), Real::from_f32(2.0)),
            ],
            Real::from_f32(-10.0),
            Real::from_f32(10.0),
        );
        let params = GeneratorParams {
            walkable_height: 1,
            exclusion_volumes: vec![exclusion],
            ..GeneratorParams::default()
        };
        let cells = filter_walkable(&grid, &params);
        assert!(!cells[index(3, 1, 1)].walkable);
    }
}
