//! Stage 4: convert simplified contours into tile-local vertices and ear-clipped triangles,
//! merging any hole contours into their enclosing outer contour first.
//!
//! Ear-clipping helpers (`diagonal`, `in_cone`) are grounded on the teacher's
//! `mesher.rs::{diagonal_loose, in_cone_loose, diagonalie_loose}`.

use crate::fixed::{Real, Vector3};
use crate::tile::{Triangle, TileVertex};

use super::contour::{Contour, ContourPoint};

const MAX_TRIANGLES_PER_TILE: usize = 1024;

/// Build a welded vertex buffer and a triangle list from a set of already-simplified contours.
/// Returns `(vertices, triangles, truncated)`, where `truncated` is `true` if the per-tile
/// triangle cap was hit and the remainder silently dropped.
pub fn triangulate_contours(
    contours: &[Contour],
    voxel_size: Vector3,
) -> (Vec<TileVertex>, Vec<Triangle>, bool) {
    let contours = merge_holes(contours.to_vec());

    let mut vertices: Vec<TileVertex> = Vec::new();
    let mut triangles: Vec<Triangle> = Vec::new();
    let mut truncated = false;

    for contour in &contours {
        if contour.points.len() < 3 {
            continue;
        }
        let indices = weld_contour_vertices(contour, voxel_size, &mut vertices);
        let ears = ear_clip(&indices, &vertices);

        for tri in ears {
            if triangles.len() >= MAX_TRIANGLES_PER_TILE {
                truncated = true;
                break;
            }
            triangles.push(Triangle { vertices: tri, first_link: 0, link_count: 0, island_id: 0 });
        }
        if truncated {
            break;
        }
    }

    (vertices, triangles, truncated)
}

/// Splice any contour fully enclosed by a larger one into its host as a zero-width bridge, so
/// ear-clipping downstream sees a single simple polygon instead of an outer loop plus separate
/// hole loops. Grounded on the original's `MergeHole`: find the closest vertex pair between hole
/// and host and duplicate it on both sides of the bridge.
fn merge_holes(contours: Vec<Contour>) -> Vec<Contour> {
    if contours.len() < 2 {
        return contours;
    }

    let mut hole_of: Vec<Option<usize>> = vec![None; contours.len()];
    for i in 0..contours.len() {
        let mut host: Option<usize> = None;
        for j in 0..contours.len() {
            if i == j || contours[j].points.is_empty() {
                continue;
            }
            if contour_area(&contours[j]) <= contour_area(&contours[i]) {
                continue;
            }
            if !point_in_polygon(contours[i].points[0], &contours[j].points) {
                continue;
            }
            if host.map_or(true, |h| contour_area(&contours[j]) < contour_area(&contours[h])) {
                host = Some(j);
            }
        }
        hole_of[i] = host;
    }

    let mut merged: Vec<Option<Contour>> = contours.into_iter().map(Some).collect();
    for i in 0..hole_of.len() {
        let Some(host) = hole_of[i] else { continue };
        let Some(hole) = merged[i].take() else { continue };
        let Some(outer) = merged[host].take() else { continue };
        merged[host] = Some(splice_hole(outer, hole));
    }

    merged.into_iter().flatten().collect()
}

fn contour_area(c: &Contour) -> f32 {
    if c.points.len() < 3 {
        return 0.0;
    }
    let n = c.points.len();
    let mut sum = 0.0f32;
    for i in 0..n {
        let a = c.points[i];
        let b = c.points[(i + 1) % n];
        sum += a.x as f32 * b.z as f32 - b.x as f32 * a.z as f32;
    }
    (sum * 0.5).abs()
}

fn point_in_polygon(p: ContourPoint, polygon: &[ContourPoint]) -> bool {
    let (px, pz) = (p.x as f32, p.z as f32);
    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, zi) = (polygon[i].x as f32, polygon[i].z as f32);
        let (xj, zj) = (polygon[j].x as f32, polygon[j].z as f32);
        if ((zi > pz) != (zj > pz)) && (px < (xj - xi) * (pz - zi) / (zj - zi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn splice_hole(outer: Contour, hole: Contour) -> Contour {
    let (oi, hi) = closest_vertex_pair(&outer.points, &hole.points);

    let mut points = Vec::with_capacity(outer.points.len() + hole.points.len() + 2);
    points.extend_from_slice(&outer.points[..=oi]);
    points.extend(hole.points[hi..].iter().copied());
    points.extend(hole.points[..=hi].iter().copied());
    points.extend_from_slice(&outer.points[oi..]);

    Contour { points, region_id: outer.region_id, area: outer.area }
}

fn closest_vertex_pair(a: &[ContourPoint], b: &[ContourPoint]) -> (usize, usize) {
    let mut best = (0usize, 0usize);
    let mut best_dist = f32::MAX;
    for (i, pa) in a.iter().enumerate() {
        for (j, pb) in b.iter().enumerate() {
            let dx = pa.x as f32 - pb.x as f32;
            let dz = pa.z as f32 - pb.z as f32;
            let d = dx * dx + dz * dz;
            if d < best_dist {
                best_dist = d;
                best = (i, j);
            }
        }
    }
    best
}

fn weld_contour_vertices(
    contour: &Contour,
    voxel_size: Vector3,
    vertices: &mut Vec<TileVertex>,
) -> Vec<u16> {
    contour
        .points
        .iter()
        .map(|p| weld_point(*p, voxel_size, vertices))
        .collect()
}

fn weld_point(point: ContourPoint, voxel_size: Vector3, vertices: &mut Vec<TileVertex>) -> u16 {
    let local = Vector3::new(
        Real::from_f32(point.x as f32) * voxel_size.x,
        Real::from_f32(point.height as f32) * voxel_size.y,
        Real::from_f32(point.z as f32) * voxel_size.z,
    );
    let packed = TileVertex::from_local(local);

    if let Some(pos) = vertices.iter().position(|v| *v == packed) {
        return pos as u16;
    }
    vertices.push(packed);
    (vertices.len() - 1) as u16
}

/// Simple ear-clipping triangulation over a simple polygon given as a loop of already-welded
/// vertex indices. Biased toward producing well-shaped triangles by preferring the ear with the
/// largest interior angle among valid candidates (a Delaunay-ish tie-break), matching the base
/// spec's "Delaunay-biased ear clipping" description.
fn ear_clip(loop_indices: &[u16], vertices: &[TileVertex]) -> Vec<[u16; 3]> {
    let mut remaining: Vec<u16> = loop_indices.to_vec();
    let mut triangles = Vec::new();

    if remaining.len() < 3 {
        return triangles;
    }

    let mut guard = 0usize;
    let guard_limit = remaining.len() * remaining.len() + 8;

    while remaining.len() > 3 && guard < guard_limit {
        guard += 1;
        let n = remaining.len();
        let mut best: Option<(usize, f32)> = None;

        for i in 0..n {
            let prev = remaining[(i + n - 1) % n];
            let curr = remaining[i];
            let next = remaining[(i + 1) % n];

            if !is_ear(prev, curr, next, &remaining, vertices) {
                continue;
            }

            let score = ear_quality(prev, curr, next, &remaining, vertices);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((i, score));
            }
        }

        let Some((ear_index, _)) = best else {
            break;
        };
        let n2 = remaining.len();
        let prev = remaining[(ear_index + n2 - 1) % n2];
        let curr = remaining[ear_index];
        let next = remaining[(ear_index + 1) % n2];
        triangles.push([prev, curr, next]);
        remaining.remove(ear_index);
    }

    if remaining.len() == 3 {
        triangles.push([remaining[0], remaining[1], remaining[2]]);
    }

    triangles
}

fn is_ear(prev: u16, curr: u16, next: u16, polygon: &[u16], vertices: &[TileVertex]) -> bool {
    if !in_cone(prev, curr, next, vertices) {
        return false;
    }
    for &p in polygon {
        if p == prev || p == curr || p == next {
            continue;
        }
        if point_in_triangle(p, prev, curr, next, vertices) {
            return false;
        }
    }
    true
}

fn in_cone(prev: u16, curr: u16, next: u16, vertices: &[TileVertex]) -> bool {
    let a = vertices[prev as usize].to_local().xz();
    let b = vertices[curr as usize].to_local().xz();
    let c = vertices[next as usize].to_local().xz();

    let cross = (b - a).cross(c - a);
    cross.to_f32() > 0.0
}

fn point_in_triangle(p: u16, a: u16, b: u16, c: u16, vertices: &[TileVertex]) -> bool {
    let p = vertices[p as usize].to_local().xz();
    let a = vertices[a as usize].to_local().xz();
    let b = vertices[b as usize].to_local().xz();
    let c = vertices[c as usize].to_local().xz();

    let d1 = (b - a).cross(p - a).to_f32();
    let d2 = (c - b).cross(p - b).to_f32();
    let d3 = (a - c).cross(p - c).to_f32();

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Score a candidate ear for [`ear_clip`]'s tie-break: an ear whose circumcircle encloses none of
/// the polygon's other remaining vertices is a true Delaunay ear and always wins; among ears tied
/// on that count, prefer the one closer to equilateral.
fn ear_quality(prev: u16, curr: u16, next: u16, remaining: &[u16], vertices: &[TileVertex]) -> f32 {
    let a = vertices[prev as usize].to_local().xz();
    let b = vertices[curr as usize].to_local().xz();
    let c = vertices[next as usize].to_local().xz();
    let af = (a.x.to_f32(), a.y.to_f32());
    let bf = (b.x.to_f32(), b.y.to_f32());
    let cf = (c.x.to_f32(), c.y.to_f32());

    let mut enclosed = 0u32;
    for &v in remaining {
        if v == prev || v == curr || v == next {
            continue;
        }
        let p = vertices[v as usize].to_local().xz();
        if in_circumcircle((p.x.to_f32(), p.y.to_f32()), af, bf, cf) {
            enclosed += 1;
        }
    }

    let ab = (b - a).length_sq().to_f32();
    let bc = (c - b).length_sq().to_f32();
    let ca = (a - c).length_sq().to_f32();
    let max_edge = ab.max(bc).max(ca);
    let min_edge = ab.min(bc).min(ca).max(1e-6);
    let shape_score = min_edge / max_edge;

    -(enclosed as f32) * 10.0 + shape_score
}

/// Standard in-circumcircle determinant test (assumes `a`, `b`, `c` are wound consistently, as
/// [`in_cone`] already enforces for any candidate ear).
fn in_circumcircle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let (ax, az) = (a.0 - p.0, a.1 - p.1);
    let (bx, bz) = (b.0 - p.0, b.1 - p.1);
    let (cx, cz) = (c.0 - p.0, c.1 - p.1);
    let det = (ax * ax + az * az) * (bx * cz - cx * bz) - (bx * bx + bz * bz) * (ax * cz - cx * az)
        + (cx * cx + cz * cz) * (ax * bz - bx * az);
    det > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::contour::ContourPoint;

    fn unit_voxel() -> Vector3 {
        Vector3::new(Real::ONE, Real::ONE, Real::ONE)
    }

    #[test]
    fn triangulates_a_square_into_two_triangles() {
        let points = vec![
            ContourPoint { x: 0, z: 0, height: 0 },
            ContourPoint { x: 4, z: 0, height: 0 },
            ContourPoint { x: 4, z: 4, height: 0 },
            ContourPoint { x: 0, z: 4, height: 0 },
        ];
        let contour = Contour { points, region_id: 1, area: 16 };
        let (vertices, triangles, truncated) = triangulate_contours(&[contour], unit_voxel());

        assert!(!truncated);
        assert_eq!(vertices.len(), 4);
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn merge_holes_splices_an_interior_contour_into_its_host() {
        let outer = Contour {
            points: vec![
                ContourPoint { x: 0, z: 0, height: 0 },
                ContourPoint { x: 10, z: 0, height: 0 },
                ContourPoint { x: 10, z: 10, height: 0 },
                ContourPoint { x: 0, z: 10, height: 0 },
            ],
            region_id: 1,
            area: 100,
        };
        let hole = Contour {
            points: vec![
                ContourPoint { x: 3, z: 3, height: 0 },
                ContourPoint { x: 6, z: 3, height: 0 },
                ContourPoint { x: 6, z: 6, height: 0 },
                ContourPoint { x: 3, z: 6, height: 0 },
            ],
            region_id: 2,
            area: 9,
        };
        let merged = merge_holes(vec![outer, hole]);

        assert_eq!(merged.len(), 1, "the hole should be spliced into its enclosing outer contour");
        assert_eq!(merged[0].points.len(), 4 + 4 + 2, "splice duplicates one vertex from each side of the bridge");

        let (vertices, triangles, truncated) = triangulate_contours(&merged, unit_voxel());
        assert!(!truncated);
        assert!(!triangles.is_empty());
        assert!(!vertices.is_empty());
    }

    #[test]
    fn ear_quality_penalizes_ears_with_an_enclosed_vertex() {
        let vertices = vec![
            TileVertex::from_local(Vector3::new(Real::from_f32(0.0), Real::ZERO, Real::from_f32(0.0))),
            TileVertex::from_local(Vector3::new(Real::from_f32(4.0), Real::ZERO, Real::from_f32(0.0))),
            TileVertex::from_local(Vector3::new(Real::from_f32(2.0), Real::ZERO, Real::from_f32(4.0))),
            TileVertex::from_local(Vector3::new(Real::from_f32(2.0), Real::ZERO, Real::from_f32(1.0))),
        ];
        // Vertex 3 sits inside the triangle formed by 0, 1, 2 and so inside its circumcircle too.
        let remaining = vec![0u16, 1, 2, 3];

        let with_enclosed_vertex = ear_quality(0, 1, 2, &remaining, &vertices);
        let without_enclosed_vertex = ear_quality(0, 1, 2, &[0, 1, 2], &vertices);

        assert!(
            with_enclosed_vertex < without_enclosed_vertex,
            "an ear whose circumcircle contains another polygon vertex must score lower"
        );
    }

    #[test]
    fn welds_shared_vertices_across_contours() {
        let points_a = vec![
            ContourPoint { x: 0, z: 0, height: 0 },
            ContourPoint { x: 2, z: 0, height: 0 },
            ContourPoint { x: 2, z: 2, height: 0 },
        ];
        let points_b = vec![
            ContourPoint { x: 0, z: 0, height: 0 },
            ContourPoint { x: 2, z: 2, height: 0 },
            ContourPoint { x: 0, z: 2, height: 0 },
        ];
        let contours = vec![
            Contour { points: points_a, region_id: 1, area: 4 },
            Contour { points: points_b, region_id: 2, area: 4 },
        ];
        let (vertices, _triangles, _truncated) = triangulate_contours(&contours, unit_voxel());
        assert_eq!(vertices.len(), 4);
    }
}
