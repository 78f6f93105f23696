//! Deterministic ray-cast across tile boundaries: at each triangle the ray is intersected against
//! each of the triangle's three edges and crosses through whichever one it actually exits by,
//! rather than hopping toward whichever neighbour's centroid looks closest to the goal.
//!
//! Grounded on `MeshGrid.cpp`'s `RayCast`/`RayHit` family: at every step, intersect the ray segment
//! against the current triangle's edges (skipping the edge just entered through), take the
//! furthest-forward valid crossing, and follow that edge's link. Termination is either reaching a
//! triangle that already contains `end` (a clean hit), or finding no link on the exit edge (an
//! obstruction).

use glam::{Vec2, Vec3};

use crate::error::RayCastError;
use crate::tile::{Link, TriangleId};

use super::MeshGrid;

/// Outcome of a successful ray cast: either it reached `end` cleanly, or it was obstructed and
/// stopped at `point` on `last_triangle`'s `edge`-th edge.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RayHit {
    Clear,
    Obstructed { point: Vec3, last_triangle: TriangleId, edge: u8 },
}

const VERTICAL_TOLERANCE: f32 = 2.0;

/// Cast a ray from `start` to `end`, walking triangle-to-triangle (possibly across tiles) via true
/// edge crossings and stopping the moment an exit edge carries no link.
pub fn ray_cast(grid: &MeshGrid, start: Vec3, end: Vec3, max_length: f32) -> Result<RayHit, RayCastError> {
    let length = start.distance(end);
    if length > max_length {
        return Err(RayCastError::RayTooLong);
    }

    let mut current =
        grid.get_triangle_at(start, VERTICAL_TOLERANCE, VERTICAL_TOLERANCE).ok_or(RayCastError::InvalidStart)?;
    let mut entry_edge: Option<(Vec3, Vec3)> = None;

    let mut guard = 0usize;
    let guard_limit = 4096;

    loop {
        guard += 1;
        if guard > guard_limit {
            return Err(RayCastError::Unacceptable);
        }

        if grid.is_triangle_acceptable_for_location(current, end, VERTICAL_TOLERANCE) {
            return Ok(RayHit::Clear);
        }

        let Some(verts) = grid.get_vertices(current) else {
            return Ok(RayHit::Obstructed { point: start, last_triangle: current, edge: 0 });
        };
        let edges = [(verts[0], verts[1]), (verts[1], verts[2]), (verts[2], verts[0])];

        let mut best: Option<(u8, f32, Vec3)> = None;
        for (idx, &(e0, e1)) in edges.iter().enumerate() {
            if let Some((f0, f1)) = entry_edge {
                if edges_close(e0, e1, f0, f1) {
                    continue;
                }
            }
            let Some((s, u)) = ray_edge_intersection(start.xz(), end.xz(), e0.xz(), e1.xz()) else { continue };
            if best.map_or(true, |(_, best_s, _)| s > best_s) {
                best = Some((idx as u8, s, e0.lerp(e1, u)));
            }
        }

        let Some((edge_idx, _s, point)) = best else {
            return Ok(RayHit::Obstructed { point: grid.triangle_centroid(current).unwrap_or(start), last_triangle: current, edge: 0 });
        };

        let Some(tile) = grid.tile(current.tile()) else {
            return Ok(RayHit::Obstructed { point, last_triangle: current, edge: edge_idx });
        };
        let Some(tri) = tile.triangle(current.triangle_index()) else {
            return Ok(RayHit::Obstructed { point, last_triangle: current, edge: edge_idx });
        };

        let link =
            tile.links()[tri.links_range()].iter().find(|l| l.edge == edge_idx && !l.is_off_mesh()).copied();

        let Some(link) = link else {
            return Ok(RayHit::Obstructed { point, last_triangle: current, edge: edge_idx });
        };

        let Some(dest) = resolve_link(grid, current, link) else {
            return Ok(RayHit::Obstructed { point, last_triangle: current, edge: edge_idx });
        };

        entry_edge = Some(edges[edge_idx as usize]);
        current = dest;
    }
}

/// `(s, u)` where `s` is the ray's own `[0, 1]` parameter and `u` the edge's, or `None` if the
/// segments are parallel or don't cross within both extents.
fn ray_edge_intersection(start: Vec2, end: Vec2, e0: Vec2, e1: Vec2) -> Option<(f32, f32)> {
    let d1 = end - start;
    let d2 = e1 - e0;
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-9 {
        return None;
    }
    let diff = e0 - start;
    let s = (diff.x * d2.y - diff.y * d2.x) / denom;
    let u = (diff.x * d1.y - diff.y * d1.x) / denom;
    if (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&u) {
        Some((s, u))
    } else {
        None
    }
}

fn edges_close(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> bool {
    const TOL_SQ: f32 = 0.02 * 0.02;
    (a0.distance_squared(b0) <= TOL_SQ && a1.distance_squared(b1) <= TOL_SQ)
        || (a0.distance_squared(b1) <= TOL_SQ && a1.distance_squared(b0) <= TOL_SQ)
}

trait Xz {
    fn xz(self) -> Vec2;
}
impl Xz for Vec3 {
    fn xz(self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

fn resolve_link(grid: &MeshGrid, from: TriangleId, link: Link) -> Option<TriangleId> {
    if link.is_internal() {
        return Some(TriangleId::new(from.tile(), link.triangle));
    }
    if link.is_off_mesh() {
        return None;
    }
    let coord = grid.coord_of_public(from.tile())?;
    let neighbour_coord = super::adjacency::neighbour_coord(coord, link.side)?;
    let neighbour_tile = grid.tile_id_at(neighbour_coord)?;
    Some(TriangleId::new(neighbour_tile, link.triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_grid::MeshGridParams;
    use crate::tile::{BvNode, GridCoord, Tile, TileVertex, Triangle};

    fn two_triangle_tile() -> Tile {
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
    fn ray_cast_reaches_goal_when_clear() {
        let mut grid = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
        grid.set_tile(GridCoord::new(0, 0, 0), two_triangle_tile());

        let result = ray_cast(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(9.0, 0.0, 9.0), 100.0);
        assert_eq!(result, Ok(RayHit::Clear));
    }

    #[test]
    fn ray_cast_rejects_overlong_rays() {
        let mut grid = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
        grid.set_tile(GridCoord::new(0, 0, 0), two_triangle_tile());

        let result = ray_cast(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(9.0, 0.0, 9.0), 1.0);
        assert_eq!(result.unwrap_err(), RayCastError::RayTooLong);
    }

    #[test]
    fn ray_cast_stops_at_mesh_boundary_with_no_link() {
        let mut grid = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
        grid.set_tile(GridCoord::new(0, 0, 0), two_triangle_tile());

        // Straight out through the mesh's outer boundary rather than the shared internal edge.
        let result = ray_cast(&grid, Vec3::new(1.0, 0.0, 0.1), Vec3::new(1.0, 0.0, -5.0), 100.0);
        assert!(matches!(result, Ok(RayHit::Obstructed { .. })));
    }
}
