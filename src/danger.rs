//! Danger areas: world-space cost modifiers applied during pathfinding so agents prefer routes
//! that avoid threats (explosions, enemy sightlines, etc.) without making them fully impassable.
//!
//! The original expressed this as a small virtual class hierarchy (`CDangerArea_Range`,
//! `CDangerArea_InverseDistance`, `CDangerArea_Direction`). Per the base spec's redesign flags,
//! this is reformulated as a closed sum type, which is the idiomatic Rust shape for a small,
//! fixed, non-extensible set of cost-function variants.

use glam::Vec3;
use smallvec::SmallVec;

/// Hard cap on the number of danger areas considered for a single pathfinding query, matching the
/// original's `max_danger_amount`.
pub const MAX_DANGER_AMOUNT: usize = 5;

/// A bounded, usually-stack-allocated list of active danger areas for one query.
pub type DangerousAreasList = SmallVec<[DangerArea; MAX_DANGER_AMOUNT]>;

#[derive(Clone, Copy, Debug)]
pub enum DangerArea {
    /// Flat extra cost within `radius` of `center`, zero beyond it.
    Range { center: Vec3, radius: f32, cost: f32 },
    /// Cost falls off linearly from `cost` at `center` to zero at `radius`.
    InverseDistance { center: Vec3, radius: f32, cost: f32 },
    /// Cost applies to points within `radius` that lie roughly ahead of `center` along
    /// `direction` (dot-product gating), used for cone-shaped threats like gunfire.
    Direction { center: Vec3, direction: Vec3, radius: f32, cost: f32 },
}

impl DangerArea {
    /// Extra path cost contributed by this danger area at `point`, or `0.0` if the point is
    /// unaffected. Mirrors the original's `DangerWeightCalculation` specializations.
    pub fn weight_at(&self, point: Vec3) -> f32 {
        match *self {
            DangerArea::Range { center, radius, cost } => {
                if point.distance_squared(center) <= radius * radius {
                    cost
                } else {
                    0.0
                }
            }
            DangerArea::InverseDistance { center, radius, cost } => {
                let dist = point.distance(center);
                if dist >= radius {
                    0.0
                } else {
                    cost * (1.0 - dist / radius)
                }
            }
            DangerArea::Direction { center, direction, radius, cost } => {
                let to_point = point - center;
                let dist = to_point.length();
                if dist >= radius || dist <= f32::EPSILON {
                    return 0.0;
                }
                let dot = to_point.normalize().dot(direction.normalize_or_zero());
                if dot <= 0.0 {
                    0.0
                } else {
                    cost * dot * (1.0 - dist / radius)
                }
            }
        }
    }
}

/// Sum of the weights of every active danger area at `point`, used by
/// [`crate::mesh_grid::pathfinding`] as an additive heuristic-cost term.
pub fn accumulate_danger_cost(areas: &[DangerArea], point: Vec3) -> f32 {
    areas.iter().map(|a| a.weight_at(point)).sum()
}
