//! A tiled navigation-mesh generator and runtime pathfinder.
//!
//! Two halves: [`generator`] turns a voxel span grid into a compact [`tile::Tile`], and
//! [`mesh_grid`] stitches tiles into a sparse grid that answers world-space pathfinding, ray-cast,
//! and static-island queries. Voxelisation, rendering, and the surrounding AI/agent system are
//! external collaborators reached only through [`span_grid::SpanGridProvider`],
//! [`navigation::NavigationContext`] and [`navigation::OffMeshNavigation`].

pub mod bounding_volume;
pub mod danger;
pub mod error;
pub mod fixed;
pub mod generator;
pub mod hash;
pub mod mesh_grid;
pub mod navigation;
pub mod span_grid;
pub mod tile;

pub use bounding_volume::{BoundingVolume, Overlap};
pub use danger::{DangerArea, DangerousAreasList, MAX_DANGER_AMOUNT};
pub use error::{BadNavmeshData, FindWayError, GenerateError, RayCastError};
pub use generator::{GeneratorParams, TileGenerator};
pub use mesh_grid::{FindWayOutcome, MeshGrid, MeshGridParams, PredictionStrategy, RayHit, WayQueryWorkingSet};
pub use navigation::{NavigationContext, NoOffMeshLinks, OffMeshNavigation, UnrestrictedContext};
pub use span_grid::{CompactSpanGrid, Span, SpanGridProvider};
pub use tile::{GridCoord, Tile, TileId, TriangleId};
