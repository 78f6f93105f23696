//! A navigation bounding volume: a vertical prism formed by extruding a convex-or-concave CCW 2-D
//! polygon (in the `x`/`z` ground plane) from `min_y` to `max_y`. Used to scope which triangles a
//! generated tile is allowed to produce, and to cull candidate tiles/triangles against a query
//! shape before doing exact geometry.

use crate::fixed::{Aabb3, Real, Vector2, Vector3};

/// Result of [`BoundingVolume::contains_aabb`]: how thoroughly the volume covers an AABB.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Overlap {
    NoOverlap,
    PartialOverlap,
    FullOverlap,
}

#[derive(Clone, Debug)]
pub struct BoundingVolume {
    /// CCW polygon in the ground plane, at least 3 points.
    points: Vec<Vector2>,
    aabb: Aabb3,
    min_y: Real,
    max_y: Real,
}

impl BoundingVolume {
    pub fn new(points: Vec<Vector2>, min_y: Real, max_y: Real) -> BoundingVolume {
        debug_assert!(points.len() >= 3, "bounding volume needs at least 3 points");

        let mut min_x = points[0].x;
        let mut max_x = points[0].x;
        let mut min_z = points[0].y;
        let mut max_z = points[0].y;
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_z = min_z.min(p.y);
            max_z = max_z.max(p.y);
        }

        let aabb = Aabb3::new(Vector3::new(min_x, min_y, min_z), Vector3::new(max_x, max_y, max_z));

        BoundingVolume { points, min_y, max_y, aabb }
    }

    pub fn aabb(&self) -> Aabb3 {
        self.aabb
    }

    /// Point-in-polygon via ray-crossing parity on the ground plane, plus a height band check.
    pub fn contains_point(&self, point: Vector3) -> bool {
        if !self.aabb.contains_point(point) {
            return false;
        }
        if point.y < self.min_y || point.y > self.max_y {
            return false;
        }
        self.contains_xz(point.xz())
    }

    fn contains_xz(&self, p: Vector2) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            let crosses_y = (pi.y > p.y) != (pj.y > p.y);
            if crosses_y {
                let x_at_y = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
                if p.x < x_at_y {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn intersects_segment_xz(&self, a: Vector2, b: Vector2) -> bool {
        let n = self.points.len();
        for i in 0..n {
            let p0 = self.points[i];
            let p1 = self.points[(i + 1) % n];
            if segments_intersect(a, b, p0, p1) {
                return true;
            }
        }
        false
    }

    /// Does this volume overlap the given AABB at all (not full containment)?
    ///
    /// Order of tests mirrors the original: first any AABB corner inside the polygon, then any
    /// polygon vertex inside the AABB (tested at the AABB's mid-height), then edge/edge segment
    /// intersection in the ground plane.
    pub fn overlaps_aabb(&self, aabb: Aabb3) -> bool {
        if !self.aabb.overlaps(aabb) {
            return false;
        }

        for corner in aabb.corners() {
            if self.contains_point(corner) {
                return true;
            }
        }

        let mid_y = (aabb.min.y.raw() as i64 + aabb.max.y.raw() as i64) / 2;
        let mid_y = Real::from_raw(mid_y as i32);
        for &p in &self.points {
            let candidate = Vector3::new(p.x, mid_y, p.y);
            if aabb.contains_point(candidate) {
                return true;
            }
        }

        let corners_xz = [
            Vector2::new(aabb.min.x, aabb.min.z),
            Vector2::new(aabb.max.x, aabb.min.z),
            Vector2::new(aabb.max.x, aabb.max.z),
            Vector2::new(aabb.min.x, aabb.max.z),
        ];
        for i in 0..4 {
            let a = corners_xz[i];
            let b = corners_xz[(i + 1) % 4];
            if self.intersects_segment_xz(a, b) {
                return true;
            }
        }

        false
    }

    /// Classifies how this volume relates to the given AABB: no overlap at all, partial overlap
    /// (some but not all corners inside, or an edge crosses the footprint), or full containment.
    ///
    /// The corner enumeration reproduces the original `ExtendedOverlap` bit-for-bit: it tests the
    /// corner `(max.x, min.y, max.z)` twice and never tests `(max.x, min.y, min.z)`. This is a
    /// known defect in the source this was ported from; it is preserved rather than fixed so that
    /// behaviour matches exactly (see DESIGN.md open questions). Once all (duplicated) corners
    /// test inside, an edge/edge crossing test against the AABB footprint distinguishes full
    /// containment from a polygon edge slicing through the box.
    pub fn contains_aabb(&self, aabb: Aabb3) -> Overlap {
        if !self.overlaps_aabb(aabb) {
            return Overlap::NoOverlap;
        }

        let corners = [
            Vector3::new(aabb.min.x, aabb.min.y, aabb.min.z),
            Vector3::new(aabb.max.x, aabb.min.y, aabb.max.z), // duplicated corner (bug, preserved)
            Vector3::new(aabb.min.x, aabb.min.y, aabb.max.z),
            Vector3::new(aabb.max.x, aabb.min.y, aabb.max.z), // (max.x, min.y, min.z) never tested
            Vector3::new(aabb.min.x, aabb.max.y, aabb.min.z),
            Vector3::new(aabb.max.x, aabb.max.y, aabb.min.z),
            Vector3::new(aabb.min.x, aabb.max.y, aabb.max.z),
            Vector3::new(aabb.max.x, aabb.max.y, aabb.max.z),
        ];

        for corner in corners {
            if !self.contains_point(corner) {
                return Overlap::PartialOverlap;
            }
        }

        let corners_xz = [
            Vector2::new(aabb.min.x, aabb.min.z),
            Vector2::new(aabb.max.x, aabb.min.z),
            Vector2::new(aabb.max.x, aabb.max.z),
            Vector2::new(aabb.min.x, aabb.max.z),
        ];
        for i in 0..4 {
            let a = corners_xz[i];
            let b = corners_xz[(i + 1) % 4];
            if self.intersects_segment_xz(a, b) {
                return Overlap::PartialOverlap;
            }
        }

        Overlap::FullOverlap
    }

    /// Slab-style 2-D segment/AABB overlap test in the ground plane, accumulating `t0`/`t1` along
    /// the way. Reproduces the original's quirk of mutating the accumulators even when the axis
    /// test is about to reject the segment (the mutation is harmless because the caller discards
    /// `t0`/`t1` on rejection, but is kept to match behaviour precisely).
    pub fn does_axis_overlap(
        &self,
        seg_min: Real,
        seg_max: Real,
        slab_min: Real,
        slab_max: Real,
        t0: &mut Real,
        t1: &mut Real,
    ) -> bool {
        if seg_min == seg_max {
            if seg_min < slab_min || seg_min > slab_max {
                *t0 = Real::ONE;
                *t1 = Real::ZERO;
                return false;
            }
            return true;
        }

        let inv = (seg_max - seg_min).recip();
        let mut tmin = (slab_min - seg_min) * inv;
        let mut tmax = (slab_max - seg_min) * inv;
        if tmin > tmax {
            std::mem::swap(&mut tmin, &mut tmax);
        }

        *t0 = t0.max(tmin);
        *t1 = t1.min(tmax);

        *t0 <= *t1
    }

    /// Clipped line-segment intersection against the ground-plane polygon edges via slab tests on
    /// x and z, following the same `t0`/`t1` accumulation as [`Self::does_axis_overlap`].
    pub fn intersect_line_segment(&self, start: Vector3, end: Vector3) -> Option<(Real, Real)> {
        let mut t0 = Real::ZERO;
        let mut t1 = Real::ONE;

        if !self.does_axis_overlap(start.x, end.x, self.aabb.min.x, self.aabb.max.x, &mut t0, &mut t1) {
            return None;
        }
        if !self.does_axis_overlap(start.z, end.z, self.aabb.min.z, self.aabb.max.z, &mut t0, &mut t1) {
            return None;
        }
        if !self.does_axis_overlap(start.y, end.y, self.aabb.min.y, self.aabb.max.y, &mut t0, &mut t1) {
            return None;
        }

        Some((t0, t1))
    }
}

fn segments_intersect(a0: Vector2, a1: Vector2, b0: Vector2, b1: Vector2) -> bool {
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);

    if ((d1 > Real::ZERO) != (d2 > Real::ZERO)) && ((d3 > Real::ZERO) != (d4 > Real::ZERO)) {
        return true;
    }
    false
}

fn orient(a: Vector2, b: Vector2, c: Vector2) -> Real {
    (b - a).cross(c - a)
}
