//! Resumable A* pathfinding over [`crate::tile::Triangle`]s, with off-mesh link traversal and
//! additive danger-area costs.
//!
//! Grounded on `MeshGrid.cpp::FindWay` (open-list management, internal/external/off-mesh link
//! branching, entry-position prediction, and the `mesh::FindWay`-style ability to spread a search
//! over multiple calls rather than blocking a frame) and on the teacher's `query.rs::find_path` for
//! the Rust-side open-list/closed-set shape.
//!
//! The open-list search itself (triangle costs, heuristic, step distance) is carried out entirely
//! in fixed-point [`Real`]/[`Vector3`] so two hosts running the same query converge on identical
//! results; `glam::Vec3` only reappears at the edges, where `NavigationContext`/`DangerArea`/
//! `OffMeshNavigation` speak world-space floats and where the final waypoint list is produced for
//! the caller.

use std::collections::HashMap;

use glam::Vec3;
use smallvec::SmallVec;

use crate::danger::{accumulate_danger_cost, DangerArea};
use crate::error::FindWayError;
use crate::fixed::{Real, Vector3};
use crate::navigation::{NavigationContext, OffMeshNavigation};
use crate::tile::{Link, TriangleId};

use super::MeshGrid;

/// How to estimate the point at which a path crosses from one triangle into the next, used both
/// to accumulate step cost and to produce the final waypoint list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PredictionStrategy {
    /// Use the midpoint of the shared edge — cheap, slightly less direct paths.
    Centre,
    /// Intersect the straight line from the path's start to its goal against the shared edge,
    /// clamped into `[kMinPullingThreshold, kMaxPullingThreshold]`; falls back to the nearer
    /// endpoint when the line doesn't cross the edge at all.
    Advanced,
}

impl Default for PredictionStrategy {
    fn default() -> PredictionStrategy {
        PredictionStrategy::Advanced
    }
}

const MIN_PULLING_THRESHOLD: f32 = 0.05;
const MAX_PULLING_THRESHOLD: f32 = 0.95;

/// Vertical probe distance used to resolve `start`/`end` onto a triangle. Generous enough to find
/// the ground under an agent standing a reasonable step above or below the mesh surface.
const VERTICAL_PROBE_TOLERANCE: f32 = 2.0;

/// Open-list nodes expanded per [`find_way_resumable`] call before yielding
/// [`FindWayOutcome::Continuing`]; [`find_way`] keeps calling it at this quantum until done.
const DEFAULT_QUANTUM: u32 = 256;

#[derive(Clone)]
struct OpenEntry {
    triangle: TriangleId,
    g: Real,
    f: Real,
}

#[derive(Clone, Copy)]
struct ActiveQuery {
    start: Vec3,
    end: Vec3,
    end_tri: TriangleId,
}

/// Caller-owned scratch state for [`find_way`]/[`find_way_resumable`], so a single query can be
/// resumed across multiple calls (e.g. to spread an expensive search over several frames) instead
/// of being torn down and rebuilt from scratch.
#[derive(Default)]
pub struct WayQueryWorkingSet {
    open: Vec<OpenEntry>,
    best_g: HashMap<TriangleId, Real>,
    came_from: HashMap<TriangleId, TriangleId>,
    visited: std::collections::HashSet<TriangleId>,
    prediction: PredictionStrategy,
    query: Option<ActiveQuery>,
}

impl WayQueryWorkingSet {
    pub fn new(prediction: PredictionStrategy) -> WayQueryWorkingSet {
        WayQueryWorkingSet { prediction, ..Default::default() }
    }

    /// Whether a query is currently in flight (i.e. the last call returned
    /// [`FindWayOutcome::Continuing`]).
    pub fn is_in_progress(&self) -> bool {
        self.query.is_some()
    }

    fn reset(&mut self) {
        self.open.clear();
        self.best_g.clear();
        self.came_from.clear();
        self.visited.clear();
        self.query = None;
    }

    fn push_open(&mut self, triangle: TriangleId, g: Real, f: Real) {
        self.open.push(OpenEntry { triangle, g, f });
    }

    fn pop_best(&mut self) -> Option<OpenEntry> {
        if self.open.is_empty() {
            return None;
        }
        let mut best_index = 0;
        for i in 1..self.open.len() {
            if self.open[i].f < self.open[best_index].f {
                best_index = i;
            }
        }
        Some(self.open.swap_remove(best_index))
    }
}

/// Result of a single [`find_way_resumable`] call.
#[derive(Debug)]
pub enum FindWayOutcome {
    /// The search finished; here is the full waypoint list.
    Done(Vec<Vec3>),
    /// The quantum was exhausted with the open list still non-empty. Call
    /// [`find_way_resumable`] again with the same `working_set` to keep going.
    Continuing,
}

fn heuristic(a: Vector3, b: Vector3) -> Real {
    (b - a).length()
}

/// Run a full A* search from `start` to `end` to completion, returning a sequence of world-space
/// waypoints (one per triangle crossed, plus the exact start and end points). A convenience
/// wrapper over [`find_way_resumable`] for callers that don't need to spread the search across
/// multiple calls.
pub fn find_way(
    grid: &MeshGrid,
    start: Vec3,
    end: Vec3,
    context: &dyn NavigationContext,
    off_mesh: &dyn OffMeshNavigation,
    dangers: &[DangerArea],
    working_set: &mut WayQueryWorkingSet,
) -> Result<Vec<Vec3>, FindWayError> {
    loop {
        match find_way_resumable(grid, start, end, context, off_mesh, dangers, working_set, DEFAULT_QUANTUM)? {
            FindWayOutcome::Done(path) => return Ok(path),
            FindWayOutcome::Continuing => continue,
        }
    }
}

/// Run up to `quantum` open-list expansions of an A* search from `start` to `end`, resuming a
/// query already in flight in `working_set` rather than starting over. A fresh query begins
/// automatically the first time this is called (or after a prior query finished/failed).
pub fn find_way_resumable(
    grid: &MeshGrid,
    start: Vec3,
    end: Vec3,
    context: &dyn NavigationContext,
    off_mesh: &dyn OffMeshNavigation,
    dangers: &[DangerArea],
    working_set: &mut WayQueryWorkingSet,
    quantum: u32,
) -> Result<FindWayOutcome, FindWayError> {
    let active = match working_set.query {
        Some(active) => active,
        None => {
            working_set.reset();

            let start_tri = grid
                .get_triangle_at(start, VERTICAL_PROBE_TOLERANCE, VERTICAL_PROBE_TOLERANCE)
                .ok_or(FindWayError::InvalidStart)?;
            let end_tri = grid
                .get_triangle_at(end, VERTICAL_PROBE_TOLERANCE, VERTICAL_PROBE_TOLERANCE)
                .ok_or(FindWayError::InvalidEnd)?;

            if start_tri == end_tri {
                return Ok(FindWayOutcome::Done(vec![start, end]));
            }

            let start_fixed = Vector3::from_glam(start);
            let end_fixed = Vector3::from_glam(end);

            working_set.best_g.insert(start_tri, Real::ZERO);
            working_set.push_open(start_tri, Real::ZERO, heuristic(start_fixed, end_fixed));

            let active = ActiveQuery { start, end, end_tri };
            working_set.query = Some(active);
            active
        }
    };

    let end_fixed = Vector3::from_glam(active.end);

    for _ in 0..quantum {
        let Some(current) = working_set.pop_best() else {
            working_set.query = None;
            return Err(FindWayError::Unreachable);
        };
        if working_set.visited.contains(&current.triangle) {
            continue;
        }
        working_set.visited.insert(current.triangle);

        if current.triangle == active.end_tri {
            let path = reconstruct_path(grid, working_set, active.start, active.end, current.triangle, working_set.prediction);
            working_set.query = None;
            return Ok(FindWayOutcome::Done(path));
        }

        for neighbour in enumerate_neighbours(grid, current.triangle, off_mesh) {
            if working_set.visited.contains(&neighbour.triangle) {
                continue;
            }
            let Some(centroid) = grid.triangle_centroid_fixed(neighbour.triangle) else { continue };
            if !context.is_point_valid_for_agent(centroid.to_glam()) {
                continue;
            }

            let Some(current_centroid) = grid.triangle_centroid_fixed(current.triangle) else { continue };
            let step_distance = (centroid - current_centroid).length();
            let danger_cost = Real::from_f32(accumulate_danger_cost(dangers, centroid.to_glam()));
            let extra_cost = Real::from_f32(context.extra_triangle_cost(neighbour.triangle));
            let link_cost = Real::from_f32(neighbour.extra_link_cost);

            let tentative_g = current.g + step_distance + danger_cost + extra_cost + link_cost;

            let better =
                working_set.best_g.get(&neighbour.triangle).map_or(true, |&existing| tentative_g < existing);

            if better {
                working_set.best_g.insert(neighbour.triangle, tentative_g);
                working_set.came_from.insert(neighbour.triangle, current.triangle);
                let f = tentative_g + heuristic(centroid, end_fixed);
                working_set.push_open(neighbour.triangle, tentative_g, f);
            }
        }
    }

    Ok(FindWayOutcome::Continuing)
}

struct Neighbour {
    triangle: TriangleId,
    extra_link_cost: f32,
}

fn enumerate_neighbours(
    grid: &MeshGrid,
    triangle: TriangleId,
    off_mesh: &dyn OffMeshNavigation,
) -> SmallVec<[Neighbour; 8]> {
    let mut result = SmallVec::new();
    let Some(tile) = grid.tile(triangle.tile()) else { return result };
    let Some(tri) = tile.triangle(triangle.triangle_index()) else { return result };

    for link in &tile.links()[tri.links_range()] {
        match link_destination(grid, triangle, *link, off_mesh) {
            Some((dest, cost)) => result.push(Neighbour { triangle: dest, extra_link_cost: cost }),
            None => continue,
        }
    }
    result
}

fn link_destination(
    grid: &MeshGrid,
    from: TriangleId,
    link: Link,
    off_mesh: &dyn OffMeshNavigation,
) -> Option<(TriangleId, f32)> {
    if link.is_internal() {
        return Some((TriangleId::new(from.tile(), link.triangle), 0.0));
    }
    if link.is_off_mesh() {
        if !off_mesh.can_use_link(link.triangle) {
            return None;
        }
        let dest = off_mesh.link_destination(link.triangle)?;
        return Some((dest, off_mesh.link_cost(link.triangle)));
    }
    // External cross-tile link: `link.side` names the neighbour tile direction.
    let coord = grid.coord_of_public(from.tile())?;
    let neighbour_coord = super::adjacency::neighbour_coord(coord, link.side)?;
    let neighbour_tile = grid.tile_id_at(neighbour_coord)?;
    Some((TriangleId::new(neighbour_tile, link.triangle), 0.0))
}

fn reconstruct_path(
    grid: &MeshGrid,
    working_set: &WayQueryWorkingSet,
    start: Vec3,
    end: Vec3,
    mut current: TriangleId,
    prediction: PredictionStrategy,
) -> Vec<Vec3> {
    let mut triangles = vec![current];
    while let Some(&prev) = working_set.came_from.get(&current) {
        triangles.push(prev);
        current = prev;
    }
    triangles.reverse();

    let mut waypoints = vec![start];
    for pair in triangles.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if let Some(point) = predict_entry_position(grid, a, b, start, end, prediction) {
            waypoints.push(point);
        }
    }
    waypoints.push(end);
    waypoints
}

/// Predicted crossing point from triangle `a` into triangle `b`.
fn predict_entry_position(
    grid: &MeshGrid,
    a: TriangleId,
    b: TriangleId,
    start: Vec3,
    end: Vec3,
    strategy: PredictionStrategy,
) -> Option<Vec3> {
    let shared_edge = shared_edge_between(grid, a, b)?;

    match strategy {
        PredictionStrategy::Centre => Some((shared_edge.0 + shared_edge.1) * 0.5),
        PredictionStrategy::Advanced => {
            match segment_intersection(start, end, shared_edge.0, shared_edge.1) {
                Some(t) => {
                    let clamped = t.clamp(MIN_PULLING_THRESHOLD, MAX_PULLING_THRESHOLD);
                    Some(shared_edge.0.lerp(shared_edge.1, clamped))
                }
                None => {
                    let centroid_a = grid.triangle_centroid(a)?;
                    let d0 = centroid_a.distance_squared(shared_edge.0);
                    let d1 = centroid_a.distance_squared(shared_edge.1);
                    Some(if d0 < d1 { shared_edge.0 } else { shared_edge.1 })
                }
            }
        }
    }
}

fn shared_edge_between(grid: &MeshGrid, a: TriangleId, b: TriangleId) -> Option<(Vec3, Vec3)> {
    let verts_a = grid.triangle_world_vertices(a)?;
    let verts_b = grid.triangle_world_vertices(b)?;

    const TOL_SQ: f32 = 0.02 * 0.02;
    for i in 0..3 {
        let a0 = verts_a[i];
        let a1 = verts_a[(i + 1) % 3];
        for j in 0..3 {
            let b0 = verts_b[j];
            let b1 = verts_b[(j + 1) % 3];
            if (a0.distance_squared(b0) <= TOL_SQ && a1.distance_squared(b1) <= TOL_SQ)
                || (a0.distance_squared(b1) <= TOL_SQ && a1.distance_squared(b0) <= TOL_SQ)
            {
                return Some((a0, a1));
            }
        }
    }
    None
}

/// Parametric `t` along segment `(e0, e1)` where the infinite line through `(start, end)` crosses
/// it, or `None` if the segments are parallel / don't cross within their extents.
fn segment_intersection(start: Vec3, end: Vec3, e0: Vec3, e1: Vec3) -> Option<f32> {
    let d1 = (end - start).xz();
    let d2 = (e1 - e0).xz();
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-6 {
        return None;
    }
    let diff = (e0 - start).xz();
    let t_line = (diff.x * d2.y - diff.y * d2.x) / denom;
    let t_edge = (diff.x * d1.y - diff.y * d1.x) / denom;
    if !(0.0..=1.0).contains(&t_line) || !(0.0..=1.0).contains(&t_edge) {
        return None;
    }
    Some(t_edge)
}

trait Xz {
    fn xz(self) -> glam::Vec2;
}
impl Xz for Vec3 {
    fn xz(self) -> glam::Vec2 {
        glam::Vec2::new(self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_grid::MeshGridParams;
    use crate::navigation::{NoOffMeshLinks, UnrestrictedContext};
    use crate::tile::{BvNode, GridCoord, Tile, TileVertex, Triangle};

    fn two_triangle_tile() -> Tile {
        // Two triangles sharing the edge (1,0)-(0,1) in a unit square, tile-local voxel units.
        let verts = vec![
            TileVertex { x: 0, y: 0, z: 0 },
            TileVertex { x: 320, y: 0, z: 0 },
            TileVertex { x: 320, y: 0, z: 320 },
            TileVertex { x: 0, y: 0, z: 320 },
        ];
        let triangles = vec![
            Triangle { vertices: [0, 1, 2], first_link: 0, link_count: 1, island_id: 0 },
            Triangle { vertices: [0, 2, 3], first_link: 1, link_count: 1, island_id: 0 },
        ];
        let links = vec![Link::internal(1, 1), Link::internal(2, 0)];
        Tile::new(verts, triangles, links, Vec::<BvNode>::new())
    }

    #[test]
    fn find_way_crosses_internal_link() {
        let mut grid = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
        grid.set_tile(GridCoord::new(0, 0, 0), two_triangle_tile());

        let mut working_set = WayQueryWorkingSet::new(PredictionStrategy::Advanced);
        let path = find_way(
            &grid,
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(9.0, 0.0, 9.0),
            &UnrestrictedContext,
            &NoOffMeshLinks,
            &[],
            &mut working_set,
        );
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.len() >= 2);
    }

    #[test]
    fn find_way_fails_for_point_outside_mesh() {
        let mut grid = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
        grid.set_tile(GridCoord::new(0, 0, 0), two_triangle_tile());

        let mut working_set = WayQueryWorkingSet::new(PredictionStrategy::Advanced);
        let result = find_way(
            &grid,
            Vec3::new(-50.0, 0.0, -50.0),
            Vec3::new(1.0, 0.0, 1.0),
            &UnrestrictedContext,
            &NoOffMeshLinks,
            &[],
            &mut working_set,
        );
        assert_eq!(result.unwrap_err(), FindWayError::InvalidStart);
    }

    #[test]
    fn find_way_resumable_reports_continuing_with_a_tiny_quantum() {
        let mut grid = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
        grid.set_tile(GridCoord::new(0, 0, 0), two_triangle_tile());

        let mut working_set = WayQueryWorkingSet::new(PredictionStrategy::Advanced);
        let outcome = find_way_resumable(
            &grid,
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(9.0, 0.0, 9.0),
            &UnrestrictedContext,
            &NoOffMeshLinks,
            &[],
            &mut working_set,
            0,
        )
        .unwrap();
        assert!(matches!(outcome, FindWayOutcome::Continuing));
        assert!(working_set.is_in_progress());

        let outcome = find_way_resumable(
            &grid,
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(9.0, 0.0, 9.0),
            &UnrestrictedContext,
            &NoOffMeshLinks,
            &[],
            &mut working_set,
            64,
        )
        .unwrap();
        assert!(matches!(outcome, FindWayOutcome::Done(_)));
        assert!(!working_set.is_in_progress());
    }
}
