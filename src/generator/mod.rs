//! Voxel span grid → [`crate::tile::Tile`] pipeline.
//!
//! Mirrors the teacher's `build_tile_sync` stage ordering (`heightfields.rs`/`regions.rs`/
//! `mesher.rs` in spirit), grounded on the original `TileGenerator.cpp` for the exact algorithm at
//! each stage: voxelise (external, see [`crate::span_grid`]) → filter walkable → distance
//! transform → paint values → extract contours → filter bad regions → simplify contours →
//! triangulate → build BV tree.

mod bvh;
mod contour;
mod distance;
mod filter;
mod triangulate;

use tracing::{info_span, warn};

use crate::bounding_volume::BoundingVolume;
use crate::error::GenerateError;
use crate::hash::HashComputer;
use crate::span_grid::SpanGridProvider;
use crate::tile::{BvNode, Link, Tile, Triangle};

pub use contour::{Contour, ContourPoint};
pub use filter::WalkableCell;

/// Parameters controlling how a tile is generated from its span grid, following the teacher's
/// `NavMeshSettings` naming and builder-style construction.
#[derive(Clone, Debug)]
pub struct GeneratorParams {
    /// Minimum clear height above a walkable span, in voxel units, for an agent to stand there.
    pub walkable_height: u16,
    /// Maximum step an agent can climb between adjacent columns, in voxel units.
    pub walkable_climb: u16,
    /// Agent radius, in voxel units; spans within this distance of an obstacle are eroded away.
    pub walkable_radius: u16,
    /// Spans deeper underwater than this, in voxel units, are never walkable.
    pub max_water_depth: u16,
    /// The bigger the step height between neighbouring columns, the more step width (in probe
    /// steps) is required before it's accepted as climbable rather than a wall.
    pub climbable_step_ratio: f32,
    /// Maximum tangent-of-incline, squared, an agent can walk up rather than treat as a wall.
    pub climbable_incline_gradient: f32,
    /// Prisms a walkable span must fall inside at least one of (empty means "no restriction").
    pub inclusion_volumes: Vec<BoundingVolume>,
    /// Prisms a walkable span must fall outside all of.
    pub exclusion_volumes: Vec<BoundingVolume>,
    /// Regions smaller than this triangle-area threshold are discarded as noise.
    pub min_region_area: u32,
    /// Regions up to this area may be merged into a larger neighbour rather than discarded.
    pub max_region_area_to_merge_into: u32,
    /// Maximum length, in voxel units, of a single contour edge before it's subdivided.
    pub max_edge_length: u16,
    /// Maximum deviation, squared, allowed when simplifying a contour polyline.
    pub max_simplification_error_sq: f32,
}

impl Default for GeneratorParams {
    fn default() -> GeneratorParams {
        GeneratorParams {
            walkable_height: 4,
            walkable_climb: 2,
            walkable_radius: 1,
            max_water_depth: 0,
            climbable_step_ratio: 1.6,
            climbable_incline_gradient: 0.7,
            inclusion_volumes: Vec::new(),
            exclusion_volumes: Vec::new(),
            min_region_area: 4,
            max_region_area_to_merge_into: 20,
            max_edge_length: 24,
            max_simplification_error_sq: 1.5 * 1.5,
        }
    }
}

/// Drives the full generation pipeline for one tile.
pub struct TileGenerator {
    params: GeneratorParams,
}

impl TileGenerator {
    pub fn new(params: GeneratorParams) -> TileGenerator {
        TileGenerator { params }
    }

    /// Build a [`Tile`] from a span grid, or return a [`GenerateError`] describing why none could
    /// be built. `previous_hash`, if given, lets the caller skip regeneration when nothing in the
    /// span grid actually changed.
    pub fn generate(
        &self,
        grid: &dyn SpanGridProvider,
        previous_hash: Option<u32>,
    ) -> Result<Tile, GenerateError> {
        let _span = info_span!("tile_generate").entered();

        if grid.width() == 0 || grid.depth() == 0 {
            return Err(GenerateError::ShapeTooLarge);
        }

        let content_hash = hash_span_grid(grid);
        if previous_hash == Some(content_hash) {
            return Err(GenerateError::HashMatch);
        }

        let walkable = filter::filter_walkable(grid, &self.params);
        if walkable.iter().all(|c| !c.walkable) {
            return Err(GenerateError::EmptyResult);
        }

        let distances = distance::distance_transform(grid.width(), grid.depth(), &walkable);
        let paint = distance::calc_paint_values(&distances);

        let contours = contour::extract_contours(grid.width(), grid.depth(), &walkable, &paint);
        let contours = contour::filter_bad_regions(contours, self.params.min_region_area);
        let simplified: Vec<Contour> = contours
            .into_iter()
            .map(|c| contour::simplify_contour(c, self.params.max_simplification_error_sq))
            .collect();

        if simplified.is_empty() {
            return Err(GenerateError::EmptyResult);
        }

        let (mut vertices, mut triangles, truncated) =
            triangulate::triangulate_contours(&simplified, grid.voxel_size());

        if truncated {
            warn!("triangle cap exceeded for tile, output truncated to 1024 triangles");
        }

        let links = stitch_internal_links(&mut triangles);
        let nodes = bvh::build_bv_tree(&vertices, &triangles);

        // Keep vertex order stable, dedupe pass already folded by triangulate.
        vertices.shrink_to_fit();

        let tile = Tile::new(vertices, triangles, links, nodes);

        Ok(tile)
    }

    /// Same as [`Self::generate`] but turns truncation into a hard error instead of a warning.
    pub fn generate_strict(
        &self,
        grid: &dyn SpanGridProvider,
        previous_hash: Option<u32>,
    ) -> Result<Tile, GenerateError> {
        let walkable_before_truncation_cap = 1024usize;
        let tile = self.generate(grid, previous_hash)?;
        if tile.triangle_count() >= walkable_before_truncation_cap {
            return Err(GenerateError::TriangleCapExceeded);
        }
        Ok(tile)
    }
}

fn hash_span_grid(grid: &dyn SpanGridProvider) -> u32 {
    let mut hasher = HashComputer::new();
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            for span in grid.column(x, z) {
                hasher.add_u16(span.min);
                hasher.add_u16(span.max);
                hasher.add_bool(span.walkable);
            }
        }
    }
    hasher.finish()
}

/// Derive internal (same-tile) links between triangles that share an edge. Cross-tile and
/// off-mesh links are added later by [`crate::mesh_grid::adjacency`] once the tile is inserted
/// into a grid.
fn stitch_internal_links(triangles: &mut [Triangle]) -> Vec<Link> {
    let mut links = Vec::new();
    let mut per_triangle: Vec<Vec<Link>> = vec![Vec::new(); triangles.len()];

    for i in 0..triangles.len() {
        for edge in 0..3u8 {
            let (a, b) = triangle_edge(&triangles[i], edge);
            for j in 0..triangles.len() {
                if i == j {
                    continue;
                }
                for other_edge in 0..3u8 {
                    let (oa, ob) = triangle_edge(&triangles[j], other_edge);
                    if (a == oa && b == ob) || (a == ob && b == oa) {
                        per_triangle[i].push(Link::internal(edge, j as u16));
                    }
                }
            }
        }
    }

    for (i, tri) in triangles.iter_mut().enumerate() {
        tri.first_link = links.len() as u16;
        tri.link_count = per_triangle[i].len() as u8;
        links.extend_from_slice(&per_triangle[i]);
    }

    links
}

fn triangle_edge(tri: &Triangle, edge: u8) -> (u16, u16) {
    match edge {
        0 => (tri.vertices[0], tri.vertices[1]),
        1 => (tri.vertices[1], tri.vertices[2]),
        _ => (tri.vertices[2], tri.vertices[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Real, Vector3};
    use crate::span_grid::{CompactSpanGrid, Span};

    fn flat_floor_grid(size: u16) -> CompactSpanGrid {
        let mut grid = CompactSpanGrid::new(size, size, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        for z in 0..size {
            for x in 0..size {
                grid.set_column(
                    x,
                    z,
                    vec![
                        Span { min: 0, max: 4, walkable: true, ..Default::default() },
                        Span { min: 4, max: 64, walkable: false, ..Default::default() },
                    ],
                );
            }
        }
        grid
    }

    #[test]
    fn generate_produces_nonempty_tile_for_flat_floor() {
        let grid = flat_floor_grid(16);
        let gen = TileGenerator::new(GeneratorParams::default());
        let tile = gen.generate(&grid, None).expect("should generate a tile");
        assert!(!tile.is_empty());
        assert!(tile.triangle_count() > 0);
    }

    #[test]
    fn hash_match_short_circuits_regeneration() {
        let grid = flat_floor_grid(8);
        let gen = TileGenerator::new(GeneratorParams::default());
        let tile = gen.generate(&grid, None).unwrap();
        let result = gen.generate(&grid, Some(tile.hash()));
        assert_eq!(result.unwrap_err(), GenerateError::HashMatch);
    }

    #[test]
    fn empty_grid_reports_empty_result() {
        let grid = CompactSpanGrid::new(4, 4, Vector3::ZERO);
        let gen = TileGenerator::new(GeneratorParams::default());
        let result = gen.generate(&grid, None);
        assert_eq!(result.unwrap_err(), GenerateError::EmptyResult);
    }

    #[test]
    fn zero_size_grid_reports_shape_too_large() {
        let grid = CompactSpanGrid::new(0, 0, Vector3::ZERO);
        let gen = TileGenerator::new(GeneratorParams::default());
        let result = gen.generate(&grid, None);
        assert_eq!(result.unwrap_err(), GenerateError::ShapeTooLarge);
    }
}
