//! The read-only view of voxelized geometry that [`crate::generator`] consumes.
//!
//! Voxelisation itself — turning world triangles/colliders into spans — is an external
//! collaborator's job; this module only defines the shape the generator needs to see. A host
//! application backs [`SpanGridProvider`] however it likes (a dense 3-D array, a compressed
//! column format, or a bridge into a physics engine's heightfield).

use crate::fixed::Vector3;

/// One walkable (or non-walkable) vertical span within a single `(x, z)` voxel column.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Span {
    /// Inclusive voxel-unit bottom of the span.
    pub min: u16,
    /// Exclusive voxel-unit top of the span.
    pub max: u16,
    pub walkable: bool,
    /// Set when the span's surface faces away from the voxelizer (a ceiling underside, say).
    /// Backface spans are always rejected in Stage 2 regardless of clearance.
    pub is_backface: bool,
    /// Voxel-unit depth of standing water covering this span's surface, if any.
    pub water_depth: u16,
}

impl Span {
    pub fn height(self) -> u16 {
        self.max.saturating_sub(self.min)
    }
}

/// A read-only, per-tile compacted span grid: for every `(x, z)` column within the tile, an
/// ordered, non-overlapping run of [`Span`]s from the ground up.
///
/// This is the adapter's contract, not an owned representation — implementors may store spans
/// however is convenient for the voxelizer and only need to answer these three questions.
pub trait SpanGridProvider {
    /// Voxel-unit width of the tile along x.
    fn width(&self) -> u16;
    /// Voxel-unit depth of the tile along z.
    fn depth(&self) -> u16;
    /// Size of one voxel in world units, used to convert voxel-unit spans back to local space.
    fn voxel_size(&self) -> Vector3;

    /// Spans in a single column, bottom to top, non-overlapping.
    fn column(&self, x: u16, z: u16) -> &[Span];
}

/// A simple, dense, owned [`SpanGridProvider`] implementation: a flat `Vec` of per-column span
/// lists. Grounded on the teacher's `VoxelizedTile`/`OpenTile` dense-array layout, which stores
/// one `Vec<HeightSpan>`/`Vec<OpenSpan>` per column rather than a true sparse structure.
#[derive(Clone, Debug)]
pub struct CompactSpanGrid {
    width: u16,
    depth: u16,
    voxel_size: Vector3,
    columns: Vec<Vec<Span>>,
}

impl CompactSpanGrid {
    pub fn new(width: u16, depth: u16, voxel_size: Vector3) -> CompactSpanGrid {
        CompactSpanGrid {
            width,
            depth,
            voxel_size,
            columns: vec![Vec::new(); width as usize * depth as usize],
        }
    }

    fn index(&self, x: u16, z: u16) -> usize {
        z as usize * self.width as usize + x as usize
    }

    pub fn set_column(&mut self, x: u16, z: u16, spans: Vec<Span>) {
        let idx = self.index(x, z);
        self.columns[idx] = spans;
    }

    pub fn push_span(&mut self, x: u16, z: u16, span: Span) {
        let idx = self.index(x, z);
        self.columns[idx].push(span);
    }
}

impl SpanGridProvider for CompactSpanGrid {
    fn width(&self) -> u16 {
        self.width
    }

    fn depth(&self) -> u16 {
        self.depth
    }

    fn voxel_size(&self) -> Vector3 {
        self.voxel_size
    }

    fn column(&self, x: u16, z: u16) -> &[Span] {
        &self.columns[self.index(x, z)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Real;

    #[test]
    fn set_and_get_column() {
        let mut grid = CompactSpanGrid::new(4, 4, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        grid.push_span(1, 2, Span { min: 0, max: 4, walkable: true, ..Default::default() });
        grid.push_span(1, 2, Span { min: 4, max: 6, walkable: false, ..Default::default() });

        let col = grid.column(1, 2);
        assert_eq!(col.len(), 2);
        assert!(col[0].walkable);
        assert!(!col[1].walkable);
        assert_eq!(col[0].height(), 4);
    }

    #[test]
    fn empty_column_is_empty() {
        let grid = CompactSpanGrid::new(2, 2, Vector3::ZERO);
        assert!(grid.column(0, 0).is_empty());
    }
}
