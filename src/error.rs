//! Explicit, per-surface error enums. Nothing in this crate panics on bad *input*; invariant
//! violations in already-generated tile data are still `debug_assert`-checked the way the teacher
//! guards its heightfield invariants, but are logged and skipped at runtime rather than unwound.

use thiserror::Error;

/// Failures from [`crate::generator`]'s tile-building pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("input shape exceeds the maximum representable tile-local bounds")]
    ShapeTooLarge,
    #[error("voxelisation produced no walkable geometry in this tile")]
    EmptyResult,
    #[error("content hash matches the previous build; generation skipped")]
    HashMatch,
    #[error("triangle count would exceed the per-tile cap of 1024 and was truncated")]
    TriangleCapExceeded,
}

/// Failures from [`crate::mesh_grid::pathfinding`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FindWayError {
    #[error("start position is not on or near any triangle")]
    InvalidStart,
    #[error("end position is not on or near any triangle")]
    InvalidEnd,
    #[error("no path exists between start and end")]
    Unreachable,
}

/// Outcome of [`crate::mesh_grid::raycast`]'s tile-crossing ray cast.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RayCastError {
    #[error("ray start position is not on or near any triangle")]
    InvalidStart,
    #[error("ray end position is not on or near any triangle")]
    InvalidEnd,
    #[error("ray length exceeds the configured maximum")]
    RayTooLong,
    #[error("ray start/end are not acceptable for this agent")]
    Unacceptable,
}

/// Non-fatal structural problems found in already-built tile data (dangling links, mismatched
/// reciprocal edges). These are logged via `tracing` and the offending data is skipped, never
/// propagated as a hard error, matching the base spec's "log and skip" policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BadNavmeshData {
    #[error("triangle {triangle} in tile {tile:?} has a link with no reciprocal edge")]
    DanglingLink { tile: crate::tile::TileId, triangle: u16 },
    #[error("triangle {triangle} in tile {tile:?} references out-of-range vertex {vertex}")]
    VertexOutOfRange { tile: crate::tile::TileId, triangle: u16, vertex: u16 },
}
