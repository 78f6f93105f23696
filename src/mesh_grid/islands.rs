//! Static island bookkeeping: connected-component flood fill over a tile's triangles (connected
//! = reachable via an internal or cross-tile link, never via an off-mesh link), with off-mesh
//! connections resolved afterward into a pending-request queue.
//!
//! Grounded on `MeshGrid.cpp`'s island-computation pass and `Island`/`IslandConnectionRequest`
//! types. Preserves the sentinel-comparison quirk called out in the base spec's design notes:
//! island ids are 1-based and `0` means "unassigned", so the flood fill below checks
//! `island_id == 0` *before* incrementing the next-id counter, exactly as the original does,
//! rather than the more natural "reserve id, then check" ordering.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::fixed::Real;
use crate::tile::{StaticIslandId, TileId, Triangle, TriangleId};

/// A static island's identity and the accumulated Heron area of its member triangles, rebuilt
/// fresh each time [`crate::mesh_grid::MeshGrid::compute_static_islands`] runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Island {
    pub id: StaticIslandId,
    pub area: Real,
}

/// A deferred off-mesh connection between two islands, recorded while flooding one tile's
/// triangles and resolved once both endpoints' islands are known.
#[derive(Clone, Copy, Debug)]
pub struct IslandConnectionRequest {
    pub from: TriangleId,
    pub off_mesh_link_index: u16,
}

/// The result of flood-filling one tile in isolation: the island id assigned to each triangle
/// (by index) and any off-mesh links whose destination couldn't be resolved locally.
#[derive(Clone, Debug, Default)]
pub struct IslandFloodResult {
    pub island_of_triangle: Vec<StaticIslandId>,
    pub pending_off_mesh: SmallVec<[IslandConnectionRequest; 4]>,
}

/// Flood-fill connectivity within a single tile's triangle graph via internal links only; the
/// caller (`MeshGrid`) is responsible for merging island ids across tile boundaries once all
/// tiles in a connected region have been flooded.
pub fn flood_tile_islands(tile_id: TileId, triangles: &[Triangle], links: &[crate::tile::Link]) -> IslandFloodResult {
    let mut island_of = vec![0u16; triangles.len()];
    let mut pending = SmallVec::new();
    let mut next_id: StaticIslandId = 1;

    for start in 0..triangles.len() {
        // The original checks `island_id == 0` (unassigned) before ever touching `next_id`; this
        // ordering matters when the flood fill below encounters a triangle a *later* start index
        // already visited as part of an earlier component.
        if island_of[start] != 0 {
            continue;
        }
        let assigned = next_id;
        next_id += 1;

        let mut stack = vec![start];
        island_of[start] = assigned;

        while let Some(t) = stack.pop() {
            let tri = &triangles[t];
            for link in &links[tri.links_range()] {
                if link.is_off_mesh() {
                    pending.push(IslandConnectionRequest {
                        from: TriangleId::new(tile_id, t as u16),
                        off_mesh_link_index: link.triangle,
                    });
                    continue;
                }
                if !link.is_internal() {
                    // Cross-tile links are resolved by the caller once neighbour tiles are known.
                    continue;
                }
                let neighbour = link.triangle as usize;
                if island_of[neighbour] == 0 {
                    island_of[neighbour] = assigned;
                    stack.push(neighbour);
                }
            }
        }
    }

    IslandFloodResult { island_of_triangle: island_of, pending_off_mesh: pending }
}

/// Union-find merge of island ids across tiles once every tile's local flood has run and
/// cross-tile adjacency links are known. Keyed by `(TileId, local island id)` since island ids are
/// only locally unique until merged.
#[derive(Default)]
pub struct IslandMerger {
    parent: HashMap<(TileId, StaticIslandId), (TileId, StaticIslandId)>,
}

impl IslandMerger {
    pub fn new() -> IslandMerger {
        IslandMerger::default()
    }

    fn find(&mut self, key: (TileId, StaticIslandId)) -> (TileId, StaticIslandId) {
        let parent = *self.parent.entry(key).or_insert(key);
        if parent == key {
            return key;
        }
        let root = self.find(parent);
        self.parent.insert(key, root);
        root
    }

    pub fn union(&mut self, a: (TileId, StaticIslandId), b: (TileId, StaticIslandId)) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }

    pub fn root_of(&mut self, key: (TileId, StaticIslandId)) -> (TileId, StaticIslandId) {
        self.find(key)
    }
}
