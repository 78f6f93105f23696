//! The compact, bit-packed mesh record produced by [`crate::generator`] and consumed by
//! [`crate::mesh_grid`]: vertices, triangles, links between triangles, and a bounding-volume tree
//! for spatial queries within the tile.

use smallvec::SmallVec;

use crate::fixed::{Aabb3, TileVertex};
use crate::hash::HashComputer;

/// 1-based index of a tile within a [`crate::mesh_grid::MeshGrid`]'s slot array. `0` is invalid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TileId(pub u32);

impl TileId {
    pub const INVALID: TileId = TileId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// A tile's position within a [`crate::mesh_grid::MeshGrid`]'s 3-D grid: `x`/`y` carry 11 bits,
/// `z` carries 10, matching the original's `TileContainer` packing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GridCoord {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl GridCoord {
    pub fn new(x: u16, y: u16, z: u16) -> GridCoord {
        debug_assert!(x < (1 << 11) && y < (1 << 11) && z < (1 << 10));
        GridCoord { x, y, z }
    }

    /// Packs into a single key, following the original's `tileName = x | y<<11 | z<<22` scheme,
    /// for use as a hash-map key.
    pub fn packed(self) -> u32 {
        self.x as u32 | (self.y as u32) << 11 | (self.z as u32) << 22
    }
}

const TRIANGLE_INDEX_BITS: u32 = 10;
const TRIANGLE_INDEX_MASK: u32 = (1 << TRIANGLE_INDEX_BITS) - 1;

/// Composite triangle identifier: packs a tile id and a triangle index within that tile.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TriangleId(pub u32);

impl TriangleId {
    pub const INVALID: TriangleId = TriangleId(0);

    pub fn new(tile: TileId, triangle_index: u16) -> TriangleId {
        debug_assert!((triangle_index as u32) <= TRIANGLE_INDEX_MASK);
        TriangleId((tile.0 << TRIANGLE_INDEX_BITS) | (triangle_index as u32 & TRIANGLE_INDEX_MASK))
    }

    pub fn tile(self) -> TileId {
        TileId(self.0 >> TRIANGLE_INDEX_BITS)
    }

    pub fn triangle_index(self) -> u16 {
        (self.0 & TRIANGLE_INDEX_MASK) as u16
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Sentinel values for [`Link::side`]: anything `< 14` is a real neighbour-tile direction (see
/// [`crate::mesh_grid::adjacency`]).
pub const LINK_SIDE_INTERNAL: u8 = 0xF;
pub const LINK_SIDE_OFFMESH: u8 = 0xE;

/// A single outgoing link from a triangle: either to another triangle in the same tile
/// (`side == LINK_SIDE_INTERNAL`), to a triangle in an adjacent tile (`side` is the neighbour
/// direction, `0..14`), or into the external off-mesh link graph (`side == LINK_SIDE_OFFMESH`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Link {
    pub side: u8,
    pub edge: u8,
    pub triangle: u16,
}

impl Link {
    pub fn internal(edge: u8, triangle: u16) -> Link {
        debug_assert!(edge < 3);
        Link { side: LINK_SIDE_INTERNAL, edge, triangle }
    }

    pub fn external(side: u8, edge: u8, triangle: u16) -> Link {
        debug_assert!(side < 14);
        debug_assert!(edge < 3);
        Link { side, edge, triangle }
    }

    pub fn off_mesh(off_mesh_link_index: u16) -> Link {
        Link { side: LINK_SIDE_OFFMESH, edge: 0, triangle: off_mesh_link_index }
    }

    pub fn is_internal(self) -> bool {
        self.side == LINK_SIDE_INTERNAL
    }

    pub fn is_off_mesh(self) -> bool {
        self.side == LINK_SIDE_OFFMESH
    }

    pub fn is_external(self) -> bool {
        self.side < 14
    }
}

/// `0` means "no island assigned" (the default for freshly generated triangles before
/// [`crate::mesh_grid::islands`] runs a flood-fill over the grid).
pub type StaticIslandId = u16;

/// A single mesh triangle: three vertex indices and the run of [`Link`]s describing how its edges
/// connect elsewhere.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Triangle {
    pub vertices: [u16; 3],
    pub first_link: u16,
    pub link_count: u8,
    pub island_id: StaticIslandId,
}

impl Triangle {
    pub fn links_range(self) -> std::ops::Range<usize> {
        self.first_link as usize..(self.first_link as usize + self.link_count as usize)
    }
}

/// A node of the per-tile bounding-volume tree over triangles.
///
/// `offset` for a leaf node is the triangle index it bounds; for an internal node it is the index
/// to skip to in order to bypass this node's whole subtree (a classic flattened BVH layout, which
/// lets traversal be branch-light array walking rather than pointer chasing).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BvNode {
    pub leaf: bool,
    pub offset: u16,
    pub aabb: Aabb3,
}

/// The compact mesh record for one spatial cell of a [`crate::mesh_grid::MeshGrid`].
#[derive(Clone, Debug, Default)]
pub struct Tile {
    vertices: Vec<TileVertex>,
    triangles: Vec<Triangle>,
    links: Vec<Link>,
    nodes: Vec<BvNode>,
    hash_value: u32,
}

impl Tile {
    pub fn new(
        vertices: Vec<TileVertex>,
        triangles: Vec<Triangle>,
        links: Vec<Link>,
        nodes: Vec<BvNode>,
    ) -> Tile {
        let mut tile = Tile { vertices, triangles, links, nodes, hash_value: 0 };
        tile.hash_value = tile.compute_hash();
        tile
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn vertices(&self) -> &[TileVertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn nodes(&self) -> &[BvNode] {
        &self.nodes
    }

    pub fn hash(&self) -> u32 {
        self.hash_value
    }

    pub fn triangle(&self, index: u16) -> Option<&Triangle> {
        self.triangles.get(index as usize)
    }

    pub fn triangle_links(&self, index: u16) -> &[Link] {
        match self.triangle(index) {
            Some(tri) => &self.links[tri.links_range()],
            None => &[],
        }
    }

    pub fn vertex(&self, index: u16) -> TileVertex {
        self.vertices[index as usize]
    }

    pub fn triangle_vertices(&self, index: u16) -> [TileVertex; 3] {
        let tri = &self.triangles[index as usize];
        [self.vertex(tri.vertices[0]), self.vertex(tri.vertices[1]), self.vertex(tri.vertices[2])]
    }

    /// Area of a triangle in tile-local fixed-point units via Heron's formula, used by island
    /// bookkeeping and region merge heuristics.
    pub fn triangle_area(&self, index: u16) -> crate::fixed::Real {
        let [a, b, c] = self.triangle_vertices(index);
        let a = a.to_local();
        let b = b.to_local();
        let c = c.to_local();

        let ab = (b - a).length();
        let bc = (c - b).length();
        let ca = (a - c).length();

        let half = crate::fixed::Real::from_f32(0.5);
        let s = (ab + bc + ca) * half;
        let term = s * (s - ab) * (s - bc) * (s - ca);
        term.max(crate::fixed::Real::ZERO).sqrt()
    }

    fn compute_hash(&self) -> u32 {
        let mut hasher = HashComputer::new();
        for v in &self.vertices {
            hasher.add_u16(v.x);
            hasher.add_u16(v.y);
            hasher.add_u16(v.z);
        }
        for t in &self.triangles {
            hasher.add_u16(t.vertices[0]);
            hasher.add_u16(t.vertices[1]);
            hasher.add_u16(t.vertices[2]);
        }
        hasher.finish()
    }

    /// Append an off-mesh link to the given triangle. Off-mesh links are kept first in a
    /// triangle's link run, so this shifts existing links of the triangle (and re-bases every
    /// later triangle's `first_link`) to make room at the front rather than the back.
    pub fn add_off_mesh_link(&mut self, triangle_index: u16, off_mesh_link_index: u16) {
        let tri = self.triangles[triangle_index as usize];
        let insert_at = tri.first_link as usize;
        self.links.insert(insert_at, Link::off_mesh(off_mesh_link_index));

        for t in &mut self.triangles {
            if t.first_link as usize > insert_at
                || (t.first_link as usize == insert_at && *t != tri)
            {
                t.first_link += 1;
            }
        }
        let tri_mut = &mut self.triangles[triangle_index as usize];
        tri_mut.link_count += 1;
        self.hash_value = self.compute_hash();
    }

    pub fn remove_off_mesh_link(&mut self, triangle_index: u16, off_mesh_link_index: u16) {
        let tri = self.triangles[triangle_index as usize];
        let range = tri.links_range();
        let Some(pos) = self.links[range.clone()]
            .iter()
            .position(|l| l.is_off_mesh() && l.triangle == off_mesh_link_index)
        else {
            return;
        };
        let absolute = range.start + pos;
        self.links.remove(absolute);

        for t in &mut self.triangles {
            if t.first_link as usize > absolute {
                t.first_link -= 1;
            }
        }
        let tri_mut = &mut self.triangles[triangle_index as usize];
        tri_mut.link_count -= 1;
        self.hash_value = self.compute_hash();
    }

    /// Overwrite the triangle/edge target of an existing link, used when a neighbour tile is
    /// rebuilt and link targets must be repointed without reallocating the whole run.
    pub fn update_link(&mut self, triangle_index: u16, link_slot: usize, new_link: Link) {
        let tri = self.triangles[triangle_index as usize];
        let absolute = tri.first_link as usize + link_slot;
        self.links[absolute] = new_link;
    }

    /// Replace all external links (`side < 14`) pointing at a given neighbour side with the
    /// supplied replacement set for that triangle; used by adjacency recomputation.
    pub fn set_external_links(&mut self, triangle_index: u16, side: u8, new_links: &[Link]) {
        let tri = self.triangles[triangle_index as usize];
        let range = tri.links_range();
        let mut kept: SmallVec<[Link; 8]> = SmallVec::new();
        for &l in &self.links[range.clone()] {
            if l.side != side {
                kept.push(l);
            }
        }
        kept.extend_from_slice(new_links);

        let old_count = range.len();
        let new_count = kept.len();
        self.links.splice(range.clone(), kept.iter().copied());

        let delta = new_count as i64 - old_count as i64;
        if delta != 0 {
            for t in &mut self.triangles {
                if t.first_link as usize > range.start {
                    t.first_link = (t.first_link as i64 + delta) as u16;
                }
            }
        }
        self.triangles[triangle_index as usize].link_count = new_count as u8;
    }

    pub fn set_triangle_island(&mut self, triangle_index: u16, island: StaticIslandId) {
        self.triangles[triangle_index as usize].island_id = island;
    }

    /// Swap contents with another tile in O(1) (the `Tile::Swap` pattern used to hand ownership
    /// of freshly generated content into a [`crate::mesh_grid::MeshGrid`] slot without a copy).
    pub fn swap(&mut self, other: &mut Tile) {
        std::mem::swap(self, other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Real;

    fn unit_tile() -> Tile {
        let verts = vec![
            TileVertex { x: 0, y: 0, z: 0 },
            TileVertex { x: 32, y: 0, z: 0 },
            TileVertex { x: 0, y: 0, z: 32 },
        ];
        let tris = vec![Triangle { vertices: [0, 1, 2], first_link: 0, link_count: 0, island_id: 0 }];
        Tile::new(verts, tris, vec![], vec![])
    }

    #[test]
    fn triangle_id_roundtrips() {
        let tid = TileId(7);
        let tri = TriangleId::new(tid, 3);
        assert_eq!(tri.tile(), tid);
        assert_eq!(tri.triangle_index(), 3);
    }

    #[test]
    fn add_off_mesh_link_shifts_later_triangles() {
        let mut tile = unit_tile();
        tile.triangles.push(Triangle { vertices: [0, 1, 2], first_link: 0, link_count: 0, island_id: 0 });

        tile.add_off_mesh_link(0, 5);
        assert_eq!(tile.triangles[0].link_count, 1);
        assert_eq!(tile.triangles[0].first_link, 0);
        assert_eq!(tile.triangles[1].first_link, 1);
        assert!(tile.links[0].is_off_mesh());
    }

    #[test]
    fn triangle_area_matches_right_triangle() {
        let tile = unit_tile();
        let area = tile.triangle_area(0).to_f32();
        // (32/32) * (32/32) / 2 in world units == 0.5
        assert!((area - 0.5).abs() < 1e-3, "area = {area}");
        let _ = Real::ZERO;
    }

    #[test]
    fn hash_changes_when_vertices_change() {
        let mut tile = unit_tile();
        let before = tile.hash();
        tile.vertices[0].x = 99;
        tile.hash_value = tile.compute_hash();
        assert_ne!(before, tile.hash());
    }
}
