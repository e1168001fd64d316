//! Landmark quality scoring for makeup rendering decisions.
//!
//! The scores are reported, never enforced: consumers decide what to do with
//! an unsuitable mesh.

use crate::geometry::distance;
use crate::types::{Landmark3D, FACE_MESH_LEN};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_COVERAGE: f64 = 0.95;
pub const DEFAULT_MIN_SYMMETRY: f64 = 0.8;
pub const DEFAULT_MIN_VALID_LANDMARKS: usize = 460;

// --- Symmetry reference landmarks ---
pub const NOSE_TIP: usize = 1;
pub const LEFT_EYE_OUTER_CORNER: usize = 33;
pub const RIGHT_EYE_OUTER_CORNER: usize = 263;

/// Policy thresholds for [`QualityMetrics::is_suitable_for_makeup`].
///
/// Coverage and symmetry must strictly exceed their minimum; the landmark
/// count must reach its minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub min_coverage: f64,
    pub min_symmetry: f64,
    pub min_valid_landmarks: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            min_symmetry: DEFAULT_MIN_SYMMETRY,
            min_valid_landmarks: DEFAULT_MIN_VALID_LANDMARKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_landmarks: usize,
    pub valid_landmarks: usize,
    /// `valid_landmarks / FACE_MESH_LEN`.
    pub coverage_score: f64,
    /// Shorter over longer nose-to-eye-corner distance, in [0, 1].
    pub symmetry_score: f64,
    pub is_suitable_for_makeup: bool,
}

/// Score any landmark slice, including ones that would fail mesh validation.
pub fn assess(points: &[Landmark3D], thresholds: &QualityThresholds) -> QualityMetrics {
    let valid_landmarks = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .count();
    let coverage_score = valid_landmarks as f64 / FACE_MESH_LEN as f64;
    let symmetry_score = symmetry_score(points);

    let is_suitable_for_makeup = coverage_score > thresholds.min_coverage
        && symmetry_score > thresholds.min_symmetry
        && valid_landmarks >= thresholds.min_valid_landmarks;

    QualityMetrics {
        total_landmarks: points.len(),
        valid_landmarks,
        coverage_score,
        symmetry_score,
        is_suitable_for_makeup,
    }
}

/// Left/right balance from the nose tip to each outer eye corner.
///
/// Returns 0 when a reference landmark is missing or unusable, or when both
/// corners sit on the nose tip.
pub fn symmetry_score(points: &[Landmark3D]) -> f64 {
    let reference = |i: usize| points.get(i).filter(|p| p.is_finite());
    let (Some(nose), Some(left), Some(right)) = (
        reference(NOSE_TIP),
        reference(LEFT_EYE_OUTER_CORNER),
        reference(RIGHT_EYE_OUTER_CORNER),
    ) else {
        return 0.0;
    };

    let l = distance(nose, left);
    let r = distance(nose, right);
    let longer = l.max(r);
    if !longer.is_finite() || longer <= 0.0 {
        return 0.0;
    }
    let score = l.min(r) / longer;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Mean detector visibility over finite landmarks; absent visibility counts as 1.
///
/// Returns 0 for a slice with no usable landmark.
pub fn mean_visibility(points: &[Landmark3D]) -> f64 {
    let (sum, count) = points
        .iter()
        .filter(|p| p.is_finite())
        .map(Landmark3D::visibility_or_default)
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every point on the origin except the symmetry references.
    fn points(left_x: f64, right_x: f64) -> Vec<Landmark3D> {
        let mut pts = vec![Landmark3D::planar(0.0, 0.0); FACE_MESH_LEN];
        pts[NOSE_TIP] = Landmark3D::planar(0.0, 0.0);
        pts[LEFT_EYE_OUTER_CORNER] = Landmark3D::planar(left_x, -10.0);
        pts[RIGHT_EYE_OUTER_CORNER] = Landmark3D::planar(right_x, -10.0);
        pts
    }

    #[test]
    fn test_symmetric_corners_score_one() {
        assert!((symmetry_score(&points(-30.0, 30.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetry_is_order_independent() {
        let a = symmetry_score(&points(-10.0, 40.0));
        let b = symmetry_score(&points(-40.0, 10.0));
        assert!((a - b).abs() < 1e-12);
        assert!(a > 0.0 && a < 1.0);
    }

    #[test]
    fn test_symmetry_missing_reference_is_zero() {
        assert_eq!(symmetry_score(&[]), 0.0);
        let mut pts = points(-30.0, 30.0);
        pts[RIGHT_EYE_OUTER_CORNER].x = f64::NAN;
        assert_eq!(symmetry_score(&pts), 0.0);
    }

    #[test]
    fn test_symmetry_collapsed_corners_is_zero() {
        let mut pts = points(0.0, 0.0);
        pts[LEFT_EYE_OUTER_CORNER].y = 0.0;
        pts[RIGHT_EYE_OUTER_CORNER].y = 0.0;
        assert_eq!(symmetry_score(&pts), 0.0);
    }

    #[test]
    fn test_symmetry_of_extreme_coordinates_stays_in_range() {
        let mut pts = points(0.0, 0.0);
        pts[NOSE_TIP] = Landmark3D::planar(0.0, 1e200);
        pts[LEFT_EYE_OUTER_CORNER] = Landmark3D::planar(-1e200, -1e200);
        pts[RIGHT_EYE_OUTER_CORNER] = Landmark3D::planar(1e200, -1e200);
        assert!((symmetry_score(&pts) - 1.0).abs() < 1e-12);

        pts[NOSE_TIP] = Landmark3D::planar(0.0, f64::MAX);
        pts[LEFT_EYE_OUTER_CORNER] = Landmark3D::planar(-f64::MAX, -f64::MAX);
        pts[RIGHT_EYE_OUTER_CORNER] = Landmark3D::planar(f64::MAX / 2.0, -f64::MAX);
        let s = symmetry_score(&pts);
        assert!((0.0..=1.0).contains(&s), "{s}");
    }

    #[test]
    fn test_mean_visibility_defaults_absent_to_visible() {
        let mut pts = points(-30.0, 30.0);
        assert_eq!(mean_visibility(&pts), 1.0);

        pts.truncate(4);
        pts[0].visibility = Some(0.2);
        pts[1].visibility = Some(0.6);
        pts[2].x = f64::NAN;
        assert!((mean_visibility(&pts) - 0.6).abs() < 1e-12);
        assert_eq!(mean_visibility(&[]), 0.0);
    }

    #[test]
    fn test_full_mesh_is_suitable() {
        let m = assess(&points(-30.0, 30.0), &QualityThresholds::default());
        assert_eq!(m.total_landmarks, FACE_MESH_LEN);
        assert_eq!(m.valid_landmarks, FACE_MESH_LEN);
        assert_eq!(m.coverage_score, 1.0);
        assert!(m.is_suitable_for_makeup);
    }

    #[test]
    fn test_asymmetric_mesh_is_not_suitable() {
        let m = assess(&points(-10.0, 60.0), &QualityThresholds::default());
        assert!(m.symmetry_score < DEFAULT_MIN_SYMMETRY);
        assert!(!m.is_suitable_for_makeup);
    }

    #[test]
    fn test_symmetry_threshold_is_strict() {
        let pts = points(-30.0, 30.0);
        let thresholds = QualityThresholds { min_symmetry: 1.0, ..Default::default() };
        assert!(!assess(&pts, &thresholds).is_suitable_for_makeup);
    }

    #[test]
    fn test_thresholds_are_overridable() {
        let pts = points(-10.0, 60.0);
        let lenient = QualityThresholds { min_symmetry: 0.1, ..Default::default() };
        assert!(assess(&pts, &lenient).is_suitable_for_makeup);
    }

    #[test]
    fn test_only_xy_count_towards_validity() {
        let mut pts = points(-30.0, 30.0);
        pts[400].z = Some(f64::NAN);
        pts[401].y = f64::NAN;
        let m = assess(&pts, &QualityThresholds::default());
        assert_eq!(m.valid_landmarks, FACE_MESH_LEN - 1);
    }
}
