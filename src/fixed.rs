//! Deterministic fixed-point arithmetic and tile-local vector types.
//!
//! Tile-local geometry is stored and combined in fixed point so that two machines processing the
//! same tile content arrive at bit-identical results; world-space interchange at the query surface
//! still uses `glam`'s floating point vectors.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Number of fractional bits carried by [`Real`].
pub const FRACTION_BITS: u32 = 16;
const FRACTION_SCALE: i64 = 1 << FRACTION_BITS;

/// A deterministic fixed-point scalar: a signed 32-bit integer with 16 fractional bits.
///
/// Arithmetic is performed by widening to `i64`, so intermediate products cannot silently wrap;
/// results are truncated back to `i32` and panic in debug builds on overflow, matching the
/// original's `debug_assert`-guarded saturation checks.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Real(i32);

impl Real {
    pub const ZERO: Real = Real(0);
    pub const ONE: Real = Real(FRACTION_SCALE as i32);
    /// Saturation value returned by divide-by-zero and sqrt-of-negative instead of panicking.
    pub const MAX: Real = Real(i32::MAX);

    pub fn from_f32(value: f32) -> Real {
        Real((value * FRACTION_SCALE as f32).round() as i32)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / FRACTION_SCALE as f32
    }

    pub fn from_raw(raw: i32) -> Real {
        Real(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn abs(self) -> Real {
        Real(self.0.abs())
    }

    /// Reciprocal scalar `1 / self`, used by normalization code. Returns [`Real::MAX`] for a zero
    /// input rather than panicking, per the fail-mode the fixed-point contract specifies.
    pub fn recip(self) -> Real {
        if self.0 == 0 {
            return Real::MAX;
        }
        let wide = (FRACTION_SCALE * FRACTION_SCALE) / self.0 as i64;
        Real(wide as i32)
    }

    pub fn min(self, other: Real) -> Real {
        Real(self.0.min(other.0))
    }

    pub fn max(self, other: Real) -> Real {
        Real(self.0.max(other.0))
    }

    /// Integer square root in fixed point. Negative inputs saturate to [`Real::MAX`] instead of
    /// panicking, matching the division fail-mode.
    pub fn sqrt(self) -> Real {
        if self.0 < 0 {
            return Real::MAX;
        }
        Real(isqrt_u64((self.0 as u64) << FRACTION_BITS) as i32)
    }
}

/// Binary-search integer square root, used by [`Real::sqrt`] and [`UnsignedOverflow::sqrt`] to
/// keep the whole pipeline free of floating point.
fn isqrt_u64(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }
    let mut lo: u64 = 0;
    let mut hi: u64 = 1u64 << 32;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if mid.checked_mul(mid).map(|sq| sq <= value).unwrap_or(false) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

impl Add for Real {
    type Output = Real;
    fn add(self, rhs: Real) -> Real {
        Real(self.0 + rhs.0)
    }
}
impl AddAssign for Real {
    fn add_assign(&mut self, rhs: Real) {
        self.0 += rhs.0;
    }
}
impl Sub for Real {
    type Output = Real;
    fn sub(self, rhs: Real) -> Real {
        Real(self.0 - rhs.0)
    }
}
impl SubAssign for Real {
    fn sub_assign(&mut self, rhs: Real) {
        self.0 -= rhs.0;
    }
}
impl Neg for Real {
    type Output = Real;
    fn neg(self) -> Real {
        Real(-self.0)
    }
}
impl Mul for Real {
    type Output = Real;
    fn mul(self, rhs: Real) -> Real {
        let wide = (self.0 as i64 * rhs.0 as i64) >> FRACTION_BITS;
        Real(wide as i32)
    }
}
impl Div for Real {
    type Output = Real;
    fn div(self, rhs: Real) -> Real {
        if rhs.0 == 0 {
            return Real::MAX;
        }
        let wide = ((self.0 as i64) << FRACTION_BITS) / rhs.0 as i64;
        Real(wide as i32)
    }
}

/// An unsigned widened accumulator for squared-length computations, mirroring the original's
/// `unsigned_overflow_type`: the square of a `Real` can exceed what `Real` itself can represent,
/// so distance comparisons accumulate in this wider type instead of re-truncating every add.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct UnsignedOverflow(u64);

impl UnsignedOverflow {
    pub const ZERO: UnsignedOverflow = UnsignedOverflow(0);

    pub fn from_real_squared(value: Real) -> UnsignedOverflow {
        let v = value.0 as i64;
        UnsignedOverflow(((v * v) >> FRACTION_BITS) as u64)
    }

    pub fn add(self, other: UnsignedOverflow) -> UnsignedOverflow {
        UnsignedOverflow(self.0 + other.0)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / FRACTION_SCALE as f32
    }

    /// Square root back down into a [`Real`] scalar, e.g. turning a squared length into a length.
    pub fn sqrt(self) -> Real {
        Real(isqrt_u64(self.0 << FRACTION_BITS) as i32)
    }
}

/// A 2-component tile-local vector in fixed point.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct Vector2 {
    pub x: Real,
    pub y: Real,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: Real::ZERO, y: Real::ZERO };

    pub fn new(x: Real, y: Real) -> Vector2 {
        Vector2 { x, y }
    }

    pub fn dot(self, other: Vector2) -> Real {
        self.x * other.x + self.y * other.y
    }

    /// 2-D cross product (the z component of the 3-D cross), used throughout contour tracing and
    /// triangulation for orientation tests.
    pub fn cross(self, other: Vector2) -> Real {
        self.x * other.y - self.y * other.x
    }

    pub fn length_sq(self) -> UnsignedOverflow {
        UnsignedOverflow::from_real_squared(self.x).add(UnsignedOverflow::from_real_squared(self.y))
    }

    pub fn length(self) -> Real {
        self.length_sq().sqrt()
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}
impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// A 3-component tile-local vector in fixed point. The y axis is "up" (matching the teacher's
/// Bevy/glam convention); the ground plane spanned by contour tracing is (x, z).
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct Vector3 {
    pub x: Real,
    pub y: Real,
    pub z: Real,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: Real::ZERO, y: Real::ZERO, z: Real::ZERO };

    pub fn new(x: Real, y: Real, z: Real) -> Vector3 {
        Vector3 { x, y, z }
    }

    pub fn from_glam(v: glam::Vec3) -> Vector3 {
        Vector3::new(Real::from_f32(v.x), Real::from_f32(v.y), Real::from_f32(v.z))
    }

    pub fn to_glam(self) -> glam::Vec3 {
        glam::Vec3::new(self.x.to_f32(), self.y.to_f32(), self.z.to_f32())
    }

    pub fn xz(self) -> Vector2 {
        Vector2::new(self.x, self.z)
    }

    pub fn dot(self, other: Vector3) -> Real {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_sq(self) -> UnsignedOverflow {
        UnsignedOverflow::from_real_squared(self.x)
            .add(UnsignedOverflow::from_real_squared(self.y))
            .add(UnsignedOverflow::from_real_squared(self.z))
    }

    pub fn length(self) -> Real {
        self.length_sq().sqrt()
    }

    pub fn min(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}
impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// An axis-aligned bounding box in tile-local or world fixed-point space.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Aabb3 {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb3 {
    pub fn new(min: Vector3, max: Vector3) -> Aabb3 {
        Aabb3 { min, max }
    }

    pub fn from_point(point: Vector3) -> Aabb3 {
        Aabb3 { min: point, max: point }
    }

    pub fn union(self, other: Aabb3) -> Aabb3 {
        Aabb3::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn expand(self, point: Vector3) -> Aabb3 {
        Aabb3::new(self.min.min(point), self.max.max(point))
    }

    pub fn contains_point(self, point: Vector3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn overlaps(self, other: Aabb3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// The eight corners in a fixed order: used by [`crate::bounding_volume`] tests so that the
    /// original corner-indexing bug can be reproduced exactly.
    pub fn corners(self) -> [Vector3; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
        ]
    }
}

/// Tile-local vertex storage format: unsigned 16-bit components with 5 fractional bits, giving a
/// representable range of `[0, 2048)` voxel units per axis.
pub const VERTEX_FRACTION_BITS: u32 = 5;
const VERTEX_SCALE: f32 = (1 << VERTEX_FRACTION_BITS) as f32;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct TileVertex {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl TileVertex {
    pub fn from_local(local: Vector3) -> TileVertex {
        TileVertex {
            x: (local.x.to_f32() * VERTEX_SCALE).round() as u16,
            y: (local.y.to_f32() * VERTEX_SCALE).round() as u16,
            z: (local.z.to_f32() * VERTEX_SCALE).round() as u16,
        }
    }

    pub fn to_local(self) -> Vector3 {
        Vector3::new(
            Real::from_f32(self.x as f32 / VERTEX_SCALE),
            Real::from_f32(self.y as f32 / VERTEX_SCALE),
            Real::from_f32(self.z as f32 / VERTEX_SCALE),
        )
    }
}

impl PartialOrd for TileVertex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some((self.x, self.y, self.z).cmp(&(other.x, other.y, other.z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_roundtrips_through_f32() {
        let r = Real::from_f32(3.25);
        assert!((r.to_f32() - 3.25).abs() < 1e-4);
    }

    #[test]
    fn real_multiplication_matches_float() {
        let a = Real::from_f32(2.5);
        let b = Real::from_f32(4.0);
        assert!(((a * b).to_f32() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn vertex_roundtrips_within_quantization() {
        let v = Vector3::new(Real::from_f32(10.0), Real::from_f32(0.0), Real::from_f32(20.5));
        let packed = TileVertex::from_local(v);
        let back = packed.to_local();
        assert!((back.x.to_f32() - 10.0).abs() < 0.05);
        assert!((back.z.to_f32() - 20.5).abs() < 0.05);
    }

    #[test]
    fn aabb_union_expands_bounds() {
        let a = Aabb3::from_point(Vector3::new(Real::ZERO, Real::ZERO, Real::ZERO));
        let b = Aabb3::from_point(Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        let u = a.union(b);
        assert_eq!(u.min, Vector3::ZERO);
        assert_eq!(u.max, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
    }

    #[test]
    fn sqrt_matches_float_sqrt() {
        let r = Real::from_f32(9.0);
        assert!((r.sqrt().to_f32() - 3.0).abs() < 1e-2);
    }

    #[test]
    fn sqrt_of_negative_saturates() {
        assert_eq!(Real::from_f32(-4.0).sqrt(), Real::MAX);
    }

    #[test]
    fn div_by_zero_saturates_instead_of_panicking() {
        assert_eq!(Real::ONE / Real::ZERO, Real::MAX);
        assert_eq!(Real::ZERO.recip(), Real::MAX);
    }

    #[test]
    fn vector_length_matches_pythagoras() {
        let v = Vector3::new(Real::from_f32(3.0), Real::ZERO, Real::from_f32(4.0));
        assert!((v.length().to_f32() - 5.0).abs() < 1e-2);
    }

    #[test]
    fn corner_order_is_fixed() {
        let b = Aabb3::new(Vector3::ZERO, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
        let c = b.corners();
        assert_eq!(c[0], Vector3::ZERO);
        assert_eq!(c[6], Vector3::new(Real::ONE, Real::ONE, Real::ONE));
    }
}
