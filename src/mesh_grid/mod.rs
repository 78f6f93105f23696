//! The runtime query layer: a sparse 3-D grid of [`crate::tile::Tile`]s stitched together by
//! adjacency links, queried by world-space pathfinding, ray-casting, and static-island clients.
//!
//! Grounded on `MeshGrid.h`/`.cpp`'s `TileContainer` slab + free-list + hashmap layout, and on the
//! teacher's `query.rs` for the shape of the Rust-side query API (`find_path`,
//! `perform_string_pulling_on_path`).

pub mod adjacency;
pub mod islands;
pub mod pathfinding;
pub mod raycast;

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, warn};

use crate::error::{BadNavmeshData, FindWayError};
use crate::fixed::{Real, Vector3};
use crate::navigation::{NavigationContext, OffMeshNavigation};
use crate::tile::{GridCoord, Link, StaticIslandId, Tile, TileId, Triangle, TriangleId};

pub use pathfinding::{FindWayOutcome, PredictionStrategy, WayQueryWorkingSet};
pub use raycast::RayHit;

/// World-space size of one tile along each axis; tile-local fixed-point coordinates are offset by
/// `coord * tile_size` to produce world positions.
#[derive(Clone, Copy, Debug)]
pub struct MeshGridParams {
    pub tile_size: Vec3,
}

struct Slot {
    coord: GridCoord,
    tile: Tile,
}

/// The sparse runtime tile grid. Tiles are owned in a dense slab with a free-list for O(1) reuse
/// of ids after removal; `TileId`/`TriangleId` values handed out to callers stay valid until the
/// owning tile is cleared.
pub struct MeshGrid {
    params: MeshGridParams,
    slots: Vec<Option<Slot>>,
    free_list: Vec<u32>,
    coord_to_id: HashMap<u32, TileId>,
    islands: Vec<islands::Island>,
}

impl MeshGrid {
    pub fn new(params: MeshGridParams) -> MeshGrid {
        MeshGrid {
            params,
            slots: Vec::new(),
            free_list: Vec::new(),
            coord_to_id: HashMap::new(),
            islands: Vec::new(),
        }
    }

    /// Static islands computed by the most recent [`Self::compute_static_islands`] call.
    pub fn islands(&self) -> &[islands::Island] {
        &self.islands
    }

    /// Clears every triangle's `island_id` back to the unassigned sentinel, matching the
    /// original's `ResetConnectedIslandsIDs` before a full recompute.
    pub fn reset_island_ids(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            for t in 0..slot.tile.triangle_count() as u16 {
                slot.tile.set_triangle_island(t, 0);
            }
        }
        self.islands.clear();
    }

    pub fn tile_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn slot_index(id: TileId) -> usize {
        (id.0 - 1) as usize
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.slots.get(Self::slot_index(id))?.as_ref().map(|s| &s.tile)
    }

    pub fn tile_id_at(&self, coord: GridCoord) -> Option<TileId> {
        self.coord_to_id.get(&coord.packed()).copied()
    }

    pub fn tile_origin(&self, coord: GridCoord) -> Vec3 {
        Vec3::new(
            coord.x as f32 * self.params.tile_size.x,
            coord.y as f32 * self.params.tile_size.y,
            coord.z as f32 * self.params.tile_size.z,
        )
    }

    /// Insert or replace the tile at `coord`, then connect it (and any existing neighbours) via
    /// [`adjacency`]. Returns the tile's stable id.
    pub fn set_tile(&mut self, coord: GridCoord, mut tile: Tile) -> TileId {
        let _span = tracing::info_span!("set_tile", x = coord.x, y = coord.y, z = coord.z).entered();

        let id = if let Some(existing) = self.tile_id_at(coord) {
            let slot = self.slots[Self::slot_index(existing)].as_mut().unwrap();
            std::mem::swap(&mut slot.tile, &mut tile);
            existing
        } else if let Some(reused) = self.free_list.pop() {
            let id = TileId(reused + 1);
            self.slots[reused as usize] = Some(Slot { coord, tile });
            self.coord_to_id.insert(coord.packed(), id);
            id
        } else {
            let id = TileId(self.slots.len() as u32 + 1);
            self.slots.push(Some(Slot { coord, tile }));
            self.coord_to_id.insert(coord.packed(), id);
            id
        };

        self.connect_to_network(coord, id);
        id
    }

    /// Remove the tile at `coord`, recycle its id, and drop any neighbour links pointing at it.
    pub fn clear_tile(&mut self, coord: GridCoord) {
        let Some(id) = self.tile_id_at(coord) else { return };
        self.coord_to_id.remove(&coord.packed());
        let idx = Self::slot_index(id);
        self.slots[idx] = None;
        self.free_list.push(idx as u32);

        for side in 0..14u8 {
            if let Some(neighbour_coord) = adjacency::neighbour_coord(coord, side) {
                if let Some(neighbour_id) = self.tile_id_at(neighbour_coord) {
                    self.drop_links_to(neighbour_id, adjacency::opposite_side(side));
                }
            }
        }
    }

    fn drop_links_to(&mut self, tile_id: TileId, side_from_neighbour: u8) {
        let idx = Self::slot_index(tile_id);
        let Some(slot) = self.slots[idx].as_mut() else { return };
        let triangle_count = slot.tile.triangle_count() as u16;
        for t in 0..triangle_count {
            slot.tile.set_external_links(t, side_from_neighbour, &[]);
        }
    }

    /// Stitch cross-tile links between the tile at `coord` and each of its 14 potential
    /// neighbours, in both directions, by matching boundary edges within tolerance.
    fn connect_to_network(&mut self, coord: GridCoord, id: TileId) {
        for side in 0..14u8 {
            let Some(neighbour_coord) = adjacency::neighbour_coord(coord, side) else { continue };
            let Some(neighbour_id) = self.tile_id_at(neighbour_coord) else { continue };
            self.stitch_pair(id, coord, side, neighbour_id, neighbour_coord);
        }
    }

    fn stitch_pair(
        &mut self,
        a_id: TileId,
        a_coord: GridCoord,
        side_a_to_b: u8,
        b_id: TileId,
        b_coord: GridCoord,
    ) {
        const TOLERANCE_SQ: f32 = 0.02 * 0.02;
        let side_b_to_a = adjacency::opposite_side(side_a_to_b);

        let a_origin = self.tile_origin(a_coord);
        let b_origin = self.tile_origin(b_coord);

        let Some(a_tile) = self.tile(a_id) else { return };
        let Some(b_tile) = self.tile(b_id) else { return };

        let mut new_links_a: Vec<(u16, Link)> = Vec::new();
        let mut new_links_b: Vec<(u16, Link)> = Vec::new();

        for at in 0..a_tile.triangle_count() as u16 {
            for ae in 0..3u8 {
                let (a0, a1) = boundary_edge_world(a_tile, at, ae, a_origin);
                for bt in 0..b_tile.triangle_count() as u16 {
                    for be in 0..3u8 {
                        let (b0, b1) = boundary_edge_world(b_tile, bt, be, b_origin);
                        if edges_match(a0, a1, b0, b1, TOLERANCE_SQ) {
                            new_links_a.push((at, Link::external(side_a_to_b, ae, bt)));
                            new_links_b.push((bt, Link::external(side_b_to_a, be, at)));
                        }
                    }
                }
            }
        }

        if let Some(slot) = self.slots[Self::slot_index(a_id)].as_mut() {
            for (tri, link) in new_links_a {
                append_external_link(&mut slot.tile, tri, link);
            }
        }
        if let Some(slot) = self.slots[Self::slot_index(b_id)].as_mut() {
            for (tri, link) in new_links_b {
                append_external_link(&mut slot.tile, tri, link);
            }
        }
    }

    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.tile(id.tile())?.triangle(id.triangle_index())
    }

    pub fn triangle_world_vertices(&self, id: TriangleId) -> Option<[Vec3; 3]> {
        let tile = self.tile(id.tile())?;
        let origin = self.tile_origin(self.coord_of(id.tile())?);
        let verts = tile.triangle_vertices(id.triangle_index());
        Some(verts.map(|v| v.to_local().to_glam() + origin))
    }

    pub fn triangle_centroid(&self, id: TriangleId) -> Option<Vec3> {
        let verts = self.triangle_world_vertices(id)?;
        Some((verts[0] + verts[1] + verts[2]) / 3.0)
    }

    fn coord_of(&self, id: TileId) -> Option<GridCoord> {
        self.slots.get(Self::slot_index(id))?.as_ref().map(|s| s.coord)
    }

    /// Fixed-point tile origin, used by [`pathfinding`]/[`raycast`] so their inner loops never
    /// touch `f32`.
    pub(crate) fn tile_origin_fixed(&self, coord: GridCoord) -> Vector3 {
        Vector3::new(
            Real::from_f32(coord.x as f32) * Real::from_f32(self.params.tile_size.x),
            Real::from_f32(coord.y as f32) * Real::from_f32(self.params.tile_size.y),
            Real::from_f32(coord.z as f32) * Real::from_f32(self.params.tile_size.z),
        )
    }

    pub(crate) fn triangle_world_vertices_fixed(&self, id: TriangleId) -> Option<[Vector3; 3]> {
        let tile = self.tile(id.tile())?;
        let origin = self.tile_origin_fixed(self.coord_of(id.tile())?);
        let verts = tile.triangle_vertices(id.triangle_index());
        Some(verts.map(|v| v.to_local() + origin))
    }

    pub(crate) fn triangle_centroid_fixed(&self, id: TriangleId) -> Option<Vector3> {
        let verts = self.triangle_world_vertices_fixed(id)?;
        let third = Real::ONE / Real::from_f32(3.0);
        Some(Vector3::new(
            (verts[0].x + verts[1].x + verts[2].x) * third,
            (verts[0].y + verts[1].y + verts[2].y) * third,
            (verts[0].z + verts[1].z + verts[2].z) * third,
        ))
    }

    /// Grid coordinate owning `id`, exposed to sibling query modules ([`pathfinding`],
    /// [`raycast`]) that need to resolve cross-tile links without duplicating the slot lookup.
    pub(crate) fn coord_of_public(&self, id: TileId) -> Option<GridCoord> {
        self.coord_of(id)
    }

    /// All triangles in `coord`'s tile whose AABB overlaps `aabb` (world-space), found by
    /// descending the tile's BV tree and skipping subtrees whose bound doesn't overlap rather than
    /// scanning every triangle. Falls back to a full scan if the tile has no BV tree (e.g. one
    /// built by hand for tests).
    pub fn get_triangles(&self, coord: GridCoord, aabb: crate::fixed::Aabb3) -> Vec<TriangleId> {
        let Some(tile_id) = self.tile_id_at(coord) else { return Vec::new() };
        let Some(tile) = self.tile(tile_id) else { return Vec::new() };

        let nodes = tile.nodes();
        if nodes.is_empty() {
            return (0..tile.triangle_count() as u16).map(|t| TriangleId::new(tile_id, t)).collect();
        }

        let mut out = Vec::new();
        let mut i = 0usize;
        while i < nodes.len() {
            let node = nodes[i];
            if node.aabb.overlaps(aabb) {
                if node.leaf {
                    out.push(TriangleId::new(tile_id, node.offset));
                }
                i += 1;
            } else if node.leaf {
                i += 1;
            } else {
                i = node.offset as usize;
            }
        }
        out
    }

    /// Find the triangle containing `(point.x, point.z)`, probing `down` below and `up` above
    /// `point.y` and picking whichever candidate surface is closest in height. Returns `None` if
    /// no tile covers the point or nothing in range contains it.
    pub fn get_triangle_at(&self, point: Vec3, down: f32, up: f32) -> Option<TriangleId> {
        let coord = self.world_to_grid_coord(point);
        let tile_id = self.tile_id_at(coord)?;
        let tile = self.tile(tile_id)?;
        let origin = self.tile_origin(coord);

        let local_min = point - Vec3::new(0.0, down, 0.0) - origin;
        let local_max = point + Vec3::new(0.0, up, 0.0) - origin;
        let probe = crate::fixed::Aabb3::new(Vector3::from_glam(local_min), Vector3::from_glam(local_max));

        let mut best: Option<(u16, f32)> = None;
        for id in self.get_triangles(coord, probe) {
            let t = id.triangle_index();
            let verts = tile.triangle_vertices(t).map(|v| v.to_local().to_glam() + origin);
            if !point_in_triangle_xz(point, verts) {
                continue;
            }
            let height = (verts[0].y + verts[1].y + verts[2].y) / 3.0;
            if height < point.y - down || height > point.y + up {
                continue;
            }
            let dist = (height - point.y).abs();
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((t, dist));
            }
        }
        best.map(|(t, _)| TriangleId::new(tile_id, t))
    }

    /// Find the nearest triangle to `point` within `max_distance`, measured by distance to the
    /// closest point on each candidate triangle rather than to its centroid.
    pub fn get_closest_triangle(&self, point: Vec3, max_distance: f32) -> Option<TriangleId> {
        if let Some(hit) = self.get_triangle_at(point, max_distance, max_distance) {
            return Some(hit);
        }
        let coord = self.world_to_grid_coord(point);
        let tile_id = self.tile_id_at(coord)?;
        let tile = self.tile(tile_id)?;
        let origin = self.tile_origin(coord);

        let probe = crate::fixed::Aabb3::new(
            Vector3::from_glam(point - Vec3::splat(max_distance) - origin),
            Vector3::from_glam(point + Vec3::splat(max_distance) - origin),
        );

        let mut best: Option<(u16, f32)> = None;
        for id in self.get_triangles(coord, probe) {
            let t = id.triangle_index();
            let verts = tile.triangle_vertices(t).map(|v| v.to_local().to_glam() + origin);
            let dist = closest_point_on_triangle(point, verts).distance(point);
            if dist <= max_distance && best.map_or(true, |(_, d)| dist < d) {
                best = Some((t, dist));
            }
        }
        best.map(|(t, _)| TriangleId::new(tile_id, t))
    }

    /// World-space vertices of a triangle, in winding order.
    pub fn get_vertices(&self, id: TriangleId) -> Option<[Vec3; 3]> {
        self.triangle_world_vertices(id)
    }

    /// Nudges `point` onto `triangle`'s surface in the (x, z) plane (the closest point on the
    /// triangle to `point`, keeping world height from the triangle rather than `point`), for
    /// callers that resolved a triangle via [`Self::get_closest_triangle`] and need a position
    /// that's actually on it.
    pub fn push_point_inside_triangle(&self, triangle: TriangleId, point: Vec3) -> Option<Vec3> {
        let verts = self.triangle_world_vertices(triangle)?;
        Some(closest_point_on_triangle(point, verts))
    }

    /// Whether `triangle` is acceptable ground for an agent at `point`: the triangle must actually
    /// contain `point` in the (x, z) plane and its surface height must fall within `height_tolerance`
    /// of `point.y`.
    pub fn is_triangle_acceptable_for_location(&self, triangle: TriangleId, point: Vec3, height_tolerance: f32) -> bool {
        let Some(verts) = self.triangle_world_vertices(triangle) else { return false };
        if !point_in_triangle_xz(point, verts) {
            return false;
        }
        let height = (verts[0].y + verts[1].y + verts[2].y) / 3.0;
        (height - point.y).abs() <= height_tolerance
    }

    fn world_to_grid_coord(&self, point: Vec3) -> GridCoord {
        GridCoord::new(
            (point.x / self.params.tile_size.x).floor().max(0.0) as u16,
            (point.y / self.params.tile_size.y).floor().max(0.0) as u16,
            (point.z / self.params.tile_size.z).floor().max(0.0) as u16,
        )
    }

    /// Resumable A* path search, following [`pathfinding::find_way`].
    pub fn find_way(
        &self,
        start: Vec3,
        end: Vec3,
        context: &dyn NavigationContext,
        off_mesh: &dyn OffMeshNavigation,
        dangers: &[crate::danger::DangerArea],
        working_set: &mut WayQueryWorkingSet,
    ) -> Result<Vec<Vec3>, FindWayError> {
        pathfinding::find_way(self, start, end, context, off_mesh, dangers, working_set)
    }

    /// Resumable A* path search that yields after `quantum` open-list expansions instead of
    /// running to completion, so a host can spread an expensive search over several frames. See
    /// [`pathfinding::find_way_resumable`].
    #[allow(clippy::too_many_arguments)]
    pub fn find_way_resumable(
        &self,
        start: Vec3,
        end: Vec3,
        context: &dyn NavigationContext,
        off_mesh: &dyn OffMeshNavigation,
        dangers: &[crate::danger::DangerArea],
        working_set: &mut WayQueryWorkingSet,
        quantum: u32,
    ) -> Result<FindWayOutcome, FindWayError> {
        pathfinding::find_way_resumable(self, start, end, context, off_mesh, dangers, working_set, quantum)
    }

    /// Deterministic, tile-crossing ray cast. See [`raycast::ray_cast`].
    pub fn ray_cast(&self, start: Vec3, end: Vec3, max_length: f32) -> Result<RayHit, crate::error::RayCastError> {
        raycast::ray_cast(self, start, end, max_length)
    }

    /// Recompute static islands across the whole grid, returning any off-mesh link requests that
    /// still need host-side resolution.
    pub fn compute_static_islands(&mut self, off_mesh: &dyn OffMeshNavigation) -> Vec<islands::IslandConnectionRequest> {
        let mut merger = islands::IslandMerger::new();
        let mut all_pending = Vec::new();
        let mut local_results: HashMap<TileId, islands::IslandFloodResult> = HashMap::new();

        let ids: Vec<TileId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| TileId(i as u32 + 1)))
            .collect();

        for id in &ids {
            let Some(tile) = self.tile(*id) else { continue };
            let result = islands::flood_tile_islands(*id, tile.triangles(), tile.links());
            local_results.insert(*id, result);
        }

        // Merge across cross-tile links.
        for id in &ids {
            let Some(tile) = self.tile(*id) else { continue };
            let Some(result) = local_results.get(id) else { continue };
            for (t, tri) in tile.triangles().iter().enumerate() {
                for link in &tile.links()[tri.links_range()] {
                    if !link.is_external() {
                        continue;
                    }
                    let Some(coord) = self.coord_of(*id) else { continue };
                    let Some(neighbour_coord) = adjacency::neighbour_coord(coord, link.side) else { continue };
                    let Some(neighbour_id) = self.tile_id_at(neighbour_coord) else { continue };
                    let local_island = result.island_of_triangle[t];
                    let Some(neighbour_result) = local_results.get(&neighbour_id) else { continue };
                    let Some(&neighbour_island) = neighbour_result.island_of_triangle.get(link.triangle as usize) else { continue };
                    merger.union((*id, local_island), (neighbour_id, neighbour_island));
                }
            }
        }

        for id in &ids {
            let Some(result) = local_results.get(id) else { continue };
            for req in &result.pending_off_mesh {
                if off_mesh.can_use_link(req.off_mesh_link_index) {
                    if let Some(dest) = off_mesh.link_destination(req.off_mesh_link_index) {
                        let from_island = result.island_of_triangle[req.from.triangle_index() as usize];
                        if let Some(dest_result) = local_results.get(&dest.tile()) {
                            if let Some(&dest_island) = dest_result.island_of_triangle.get(dest.triangle_index() as usize) {
                                merger.union((*id, from_island), (dest.tile(), dest_island));
                                continue;
                            }
                        }
                    }
                }
                all_pending.push(*req);
            }
        }

        // `IslandMerger::root_of` returns a `(TileId, StaticIslandId)` key, not a globally unique
        // numeric id: two unrelated roots can carry the same local island number under different
        // tiles. Remap each distinct root to its own contiguous global id before writing anything
        // back, and accumulate each island's Heron area as we go.
        let mut root_to_global: HashMap<(TileId, StaticIslandId), StaticIslandId> = HashMap::new();
        let mut areas: Vec<Real> = Vec::new();

        for id in &ids {
            let Some(result) = local_results.get(id).cloned() else { continue };
            let idx = Self::slot_index(*id);
            let Some(slot) = self.slots[idx].as_mut() else { continue };
            for (t, &local_island) in result.island_of_triangle.iter().enumerate() {
                if local_island == 0 {
                    continue;
                }
                let root = merger.root_of((*id, local_island));
                let global = *root_to_global.entry(root).or_insert_with(|| {
                    areas.push(Real::ZERO);
                    areas.len() as StaticIslandId
                });
                areas[(global - 1) as usize] += slot.tile.triangle_area(t as u16);
                slot.tile.set_triangle_island(t as u16, global);
            }
        }

        self.islands =
            areas.into_iter().enumerate().map(|(i, area)| islands::Island { id: (i + 1) as StaticIslandId, area }).collect();

        debug!(pending = all_pending.len(), islands = self.islands.len(), "recomputed static islands");
        all_pending
    }

    pub fn validate(&self, id: TileId) -> Vec<BadNavmeshData> {
        let mut problems = Vec::new();
        let Some(tile) = self.tile(id) else { return problems };
        for (t, tri) in tile.triangles().iter().enumerate() {
            for &v in &tri.vertices {
                if v as usize >= tile.vertex_count() {
                    problems.push(BadNavmeshData::VertexOutOfRange { tile: id, triangle: t as u16, vertex: v });
                }
            }
            for link in &tile.links()[tri.links_range()] {
                if link.is_internal() && tile.triangle(link.triangle).is_none() {
                    problems.push(BadNavmeshData::DanglingLink { tile: id, triangle: t as u16 });
                }
            }
        }
        if !problems.is_empty() {
            warn!(count = problems.len(), "found bad navmesh data during validation");
        }
        problems
    }
}

fn append_external_link(tile: &mut Tile, triangle_index: u16, link: Link) {
    let mut same_side: Vec<Link> =
        tile.triangle_links(triangle_index).iter().copied().filter(|l| l.side == link.side).collect();
    if same_side.contains(&link) {
        return;
    }
    same_side.push(link);
    tile.set_external_links(triangle_index, link.side, &same_side);
}

fn boundary_edge_world(tile: &Tile, triangle: u16, edge: u8, origin: Vec3) -> (Vec3, Vec3) {
    let verts = tile.triangle_vertices(triangle).map(|v| v.to_local().to_glam() + origin);
    match edge {
        0 => (verts[0], verts[1]),
        1 => (verts[1], verts[2]),
        _ => (verts[2], verts[0]),
    }
}

fn edges_match(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3, tol_sq: f32) -> bool {
    let same_order = a0.distance_squared(b0) <= tol_sq && a1.distance_squared(b1) <= tol_sq;
    let reversed = a0.distance_squared(b1) <= tol_sq && a1.distance_squared(b0) <= tol_sq;
    same_order || reversed
}

/// Closest point on triangle `(a, b, c)` to `p`, via the standard vertex/edge/face-region test
/// (Ericson, *Real-Time Collision Detection* §5.1.5).
fn closest_point_on_triangle(p: Vec3, [a, b, c]: [Vec3; 3]) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

fn point_in_triangle_xz(p: Vec3, tri: [Vec3; 3]) -> bool {
    let sign = |a: Vec3, b: Vec3, c: Vec3| (b.x - a.x) * (c.z - a.z) - (c.x - a.x) * (b.z - a.z);

    let d1 = sign(p, tri[0], tri[1]);
    let d2 = sign(p, tri[1], tri[2]);
    let d3 = sign(p, tri[2], tri[0]);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{BvNode, TileVertex, Triangle};

    fn single_triangle_tile() -> Tile {
        let verts = vec![
            TileVertex { x: 0, y: 0, z: 0 },
            TileVertex { x: 320, y: 0, z: 0 },
            TileVertex { x: 0, y: 0, z: 320 },
        ];
        let tris = vec![Triangle { vertices: [0, 1, 2], first_link: 0, link_count: 0, island_id: 0 }];
        Tile::new(verts, tris, vec![], Vec::<BvNode>::new())
    }

    fn grid() -> MeshGrid {
        MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) })
    }

    #[test]
    fn set_tile_then_get_triangle_at_hits() {
        let mut grid = grid();
        grid.set_tile(GridCoord::new(0, 0, 0), single_triangle_tile());
        let hit = grid.get_triangle_at(Vec3::new(2.0, 0.0, 2.0), 5.0, 5.0);
        assert!(hit.is_some());
    }

    #[test]
    fn clear_tile_removes_lookup() {
        let mut grid = grid();
        let coord = GridCoord::new(0, 0, 0);
        grid.set_tile(coord, single_triangle_tile());
        grid.clear_tile(coord);
        assert!(grid.tile_id_at(coord).is_none());
    }

    #[test]
    fn tile_ids_are_reused_after_clear() {
        let mut grid = grid();
        let coord_a = GridCoord::new(0, 0, 0);
        let coord_b = GridCoord::new(5, 0, 0);
        let id_a = grid.set_tile(coord_a, single_triangle_tile());
        grid.clear_tile(coord_a);
        let id_b = grid.set_tile(coord_b, single_triangle_tile());
        assert_eq!(id_a, id_b);
    }
}
