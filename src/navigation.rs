//! Consumed collaborator interfaces: the surrounding AI system and off-mesh link authority are
//! external to this crate. [`crate::mesh_grid::MeshGrid`] reaches them only through these traits.

use glam::Vec3;

use crate::tile::TriangleId;

/// Per-query policy hooks the pathfinder consults while expanding the open list. Implemented by
/// the host application (typically backed by a live agent/entity lookup), never by this crate.
pub trait NavigationContext {
    /// Is `point` acceptable as a path endpoint/intermediate waypoint for this query (e.g. not
    /// inside another agent's exclusion zone)?
    fn is_point_valid_for_agent(&self, point: Vec3) -> bool {
        let _ = point;
        true
    }

    /// Additional scalar cost applied when stepping onto `triangle`, on top of geometric distance
    /// and danger-area cost. Defaults to zero (no extra cost).
    fn extra_triangle_cost(&self, triangle: TriangleId) -> f32 {
        let _ = triangle;
        0.0
    }
}

/// A host-owned off-mesh link graph: special connections between triangles that aren't adjacency
/// in the mesh itself (ladders, jump links, teleporters). [`crate::mesh_grid::MeshGrid`] defers to
/// this trait whenever pathfinding or island flood-fill reaches a [`crate::tile::Link`] whose
/// `side` is [`crate::tile::LINK_SIDE_OFFMESH`].
pub trait OffMeshNavigation {
    /// Can this link currently be traversed (e.g. is a door open, is a ladder intact)?
    fn can_use_link(&self, off_mesh_link_index: u16) -> bool;

    /// The triangle this link lands on, if still valid.
    fn link_destination(&self, off_mesh_link_index: u16) -> Option<TriangleId>;

    /// Extra traversal cost for using this link, added on top of its geometric distance.
    fn link_cost(&self, off_mesh_link_index: u16) -> f32 {
        let _ = off_mesh_link_index;
        0.0
    }
}

/// A [`NavigationContext`] that imposes no restrictions, useful for tests and for callers with no
/// surrounding AI system to consult.
#[derive(Clone, Copy, Default, Debug)]
pub struct UnrestrictedContext;

impl NavigationContext for UnrestrictedContext {}

/// An [`OffMeshNavigation`] with no links, useful when a mesh has no off-mesh connections at all.
#[derive(Clone, Copy, Default, Debug)]
pub struct NoOffMeshLinks;

impl OffMeshNavigation for NoOffMeshLinks {
    fn can_use_link(&self, _off_mesh_link_index: u16) -> bool {
        false
    }

    fn link_destination(&self, _off_mesh_link_index: u16) -> Option<TriangleId> {
        None
    }
}
