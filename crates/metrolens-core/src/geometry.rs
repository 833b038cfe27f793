//! Planar geometry for pixel-space measurements.
//!
//! All functions are pure and stateless. Coordinates follow the image
//! convention: origin at the top-left corner with y increasing downward,
//! which is why screen-facing angles negate dy before the `atan2` call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Point, Vec2};

/// Squared-length threshold below which geometry is considered degenerate.
pub const DEGENERACY_EPSILON: f64 = 1e-9;

/// Error types for geometric computations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Two of the defining points (nearly) coincide.
    #[error("points coincide; no direction is defined")]
    DegeneratePoints,

    /// A line segment is too short to define a direction.
    #[error("line segment is too short to define a direction")]
    DegenerateLine,
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    a.vector_to(b).length()
}

/// Angle of the vector `a -> b` against the positive x-axis, in degrees.
///
/// dy is negated because the pixel origin is top-left with y growing
/// downward, so a vector pointing "up" on screen reads as a positive angle.
/// The result is normalized into `[0, 360)`.
pub fn signed_angle_deg(a: Point, b: Point) -> f64 {
    let v = a.vector_to(b);
    let mut deg = (-v.y).atan2(v.x).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    // A tiny negative angle can round back up to exactly 360
    if deg >= 360.0 {
        deg -= 360.0;
    }
    deg
}

/// Interior angle at `vertex` between the rays toward `arm1` and `arm2`.
///
/// Computed as the `atan2` difference of the two ray directions, normalized
/// into `(-180, 180]` and reported as a magnitude in `[0, 180]`.
///
/// Fails with [`GeometryError::DegeneratePoints`] when either ray is shorter
/// than the degeneracy threshold.
pub fn angle_between(arm1: Point, vertex: Point, arm2: Point) -> Result<f64, GeometryError> {
    let v1 = vertex.vector_to(arm1);
    let v2 = vertex.vector_to(arm2);
    if v1.length_squared() < DEGENERACY_EPSILON || v2.length_squared() < DEGENERACY_EPSILON {
        return Err(GeometryError::DegeneratePoints);
    }

    let mut rad = v2.y.atan2(v2.x) - v1.y.atan2(v1.x);
    while rad > std::f64::consts::PI {
        rad -= std::f64::consts::TAU;
    }
    while rad <= -std::f64::consts::PI {
        rad += std::f64::consts::TAU;
    }

    let mut deg = rad.to_degrees().abs();
    if deg > 180.0 {
        deg = 360.0 - deg;
    }
    Ok(deg)
}

/// Deviation angle between two direction vectors, in degrees.
///
/// Uses the dot-product formula `acos(dot / (|v1| |v2|))` and folds the
/// result into `[0, 90]`, so 0 means the directions are parallel regardless
/// of orientation sign.
///
/// Fails with [`GeometryError::DegenerateLine`] when either vector is shorter
/// than the degeneracy threshold.
pub fn angle_between_vectors(v1: Vec2, v2: Vec2) -> Result<f64, GeometryError> {
    let mag1_sq = v1.length_squared();
    let mag2_sq = v2.length_squared();
    if mag1_sq < DEGENERACY_EPSILON || mag2_sq < DEGENERACY_EPSILON {
        return Err(GeometryError::DegenerateLine);
    }

    let cos = (v1.dot(v2) / (mag1_sq.sqrt() * mag2_sq.sqrt())).clamp(-1.0, 1.0);
    let mut deg = cos.acos().to_degrees();
    if deg > 90.0 {
        deg = 180.0 - deg;
    }
    Ok(deg)
}

/// One projected separation sample between two near-parallel segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSample {
    /// Sampled point on the first segment.
    pub anchor: Point,
    /// Orthogonal projection of `anchor` onto the infinite line through the
    /// second segment.
    pub foot: Point,
    /// Euclidean distance between the two.
    pub distance_px: f64,
}

/// Sample the separation between two segments at `n + 1` evenly spaced points.
///
/// Walks `line1` parametrically (`t = i / n`), projects each sample onto the
/// infinite line through `line2` (scalar projection over the squared
/// magnitude), and records the distance together with both endpoints for
/// later visualization.
///
/// Fails with [`GeometryError::DegenerateLine`] if `line2` is shorter than
/// the degeneracy threshold.
pub fn sample_parallel_distances(
    line1: (Point, Point),
    line2: (Point, Point),
    n: usize,
) -> Result<Vec<TickSample>, GeometryError> {
    let dir1 = line1.0.vector_to(line1.1);
    let dir2 = line2.0.vector_to(line2.1);
    let mag2_sq = dir2.length_squared();
    if mag2_sq < DEGENERACY_EPSILON {
        return Err(GeometryError::DegenerateLine);
    }

    let n = n.max(1);
    let mut samples = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let anchor = line1.0.offset(dir1.scale(t));
        let t_proj = line2.0.vector_to(anchor).dot(dir2) / mag2_sq;
        let foot = line2.0.offset(dir2.scale(t_proj));
        samples.push(TickSample {
            anchor,
            foot,
            distance_px: distance(anchor, foot),
        });
    }
    Ok(samples)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for finite pixel coordinates in a generous canvas range.
    fn coord_strategy() -> impl Strategy<Value = f64> {
        -10_000.0f64..=10_000.0
    }

    fn point_strategy() -> impl Strategy<Value = Point> {
        (coord_strategy(), coord_strategy()).prop_map(|(x, y)| Point::new(x, y))
    }

    proptest! {
        /// Property: distance is symmetric.
        #[test]
        fn prop_distance_symmetric(a in point_strategy(), b in point_strategy()) {
            prop_assert_eq!(distance(a, b), distance(b, a));
        }

        /// Property: distance from a point to itself is zero.
        #[test]
        fn prop_distance_identity(a in point_strategy()) {
            prop_assert_eq!(distance(a, a), 0.0);
        }

        /// Property: distance is never negative.
        #[test]
        fn prop_distance_non_negative(a in point_strategy(), b in point_strategy()) {
            prop_assert!(distance(a, b) >= 0.0);
        }

        /// Property: signed angles always land in [0, 360).
        #[test]
        fn prop_signed_angle_range(a in point_strategy(), b in point_strategy()) {
            let angle = signed_angle_deg(a, b);
            prop_assert!((0.0..360.0).contains(&angle), "angle out of range: {}", angle);
        }

        /// Property: vertex angles always land in [0, 180].
        #[test]
        fn prop_vertex_angle_range(
            arm1 in point_strategy(),
            vertex in point_strategy(),
            arm2 in point_strategy(),
        ) {
            if let Ok(angle) = angle_between(arm1, vertex, arm2) {
                prop_assert!((0.0..=180.0).contains(&angle), "angle out of range: {}", angle);
            }
        }

        /// Property: vertex angles are symmetric in their arms.
        #[test]
        fn prop_vertex_angle_arm_symmetry(
            arm1 in point_strategy(),
            vertex in point_strategy(),
            arm2 in point_strategy(),
        ) {
            let forward = angle_between(arm1, vertex, arm2);
            let reverse = angle_between(arm2, vertex, arm1);
            match (forward, reverse) {
                (Ok(a), Ok(b)) => prop_assert!((a - b).abs() < 1e-6),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                other => prop_assert!(false, "asymmetric results: {:?}", other),
            }
        }

        /// Property: deviation angles always land in [0, 90].
        #[test]
        fn prop_deviation_angle_range(
            v1 in (coord_strategy(), coord_strategy()),
            v2 in (coord_strategy(), coord_strategy()),
        ) {
            let v1 = Vec2::new(v1.0, v1.1);
            let v2 = Vec2::new(v2.0, v2.1);
            if let Ok(angle) = angle_between_vectors(v1, v2) {
                prop_assert!((0.0..=90.0).contains(&angle), "angle out of range: {}", angle);
            }
        }

        /// Property: sampling yields exactly n + 1 ticks with non-negative
        /// distances.
        #[test]
        fn prop_sample_count_and_sign(
            p1 in point_strategy(),
            p2 in point_strategy(),
            p3 in point_strategy(),
            p4 in point_strategy(),
            n in 1usize..=32,
        ) {
            if let Ok(samples) = sample_parallel_distances((p1, p2), (p3, p4), n) {
                prop_assert_eq!(samples.len(), n + 1);
                for sample in &samples {
                    prop_assert!(sample.distance_px >= 0.0);
                }
            }
        }
    }
}
