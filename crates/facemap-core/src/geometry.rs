//! Face measurements, zone bounds and simplified masks.
//!
//! Distances are Euclidean in 3D with a missing `z` treated as 0. Bounds and
//! masks live in the image plane and ignore depth.

use crate::types::{BoundingBox, FaceMesh, Landmark3D, MaskData, Point3};
use serde::{Deserialize, Serialize};

/// Divisors at or below this are treated as zero when forming ratios.
pub const RATIO_EPSILON: f64 = 1e-9;

/// Pair of mesh indices whose distance is one measurement.
pub type IndexPair = (usize, usize);

// --- Measurement landmarks (MediaPipe face mesh indices) ---
/// Left and right extremes of the face oval.
pub const FACE_WIDTH: IndexPair = (234, 454);
/// Forehead top to chin bottom.
pub const FACE_HEIGHT: IndexPair = (10, 152);
pub const LEFT_EYE_WIDTH: IndexPair = (33, 133);
pub const RIGHT_EYE_WIDTH: IndexPair = (362, 263);
/// Inner corners of both eyes.
pub const EYE_DISTANCE: IndexPair = (133, 362);
pub const NOSE_WIDTH: IndexPair = (79, 308);
/// Bridge top to tip.
pub const NOSE_LENGTH: IndexPair = (6, 2);
/// Mouth corners.
pub const LIP_WIDTH: IndexPair = (61, 291);
pub const LIP_HEIGHT: IndexPair = (13, 14);

/// Every index pair used by [`FaceGeometry::measure`].
pub const MEASUREMENT_PAIRS: [IndexPair; 9] = [
    FACE_WIDTH,
    FACE_HEIGHT,
    LEFT_EYE_WIDTH,
    RIGHT_EYE_WIDTH,
    EYE_DISTANCE,
    NOSE_WIDTH,
    NOSE_LENGTH,
    LIP_WIDTH,
    LIP_HEIGHT,
];

/// Scalar face measurements in the mesh's coordinate units.
///
/// Ratios are computed independently: a degenerate divisor nulls only the
/// ratios that depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub face_width: f64,
    pub face_height: f64,
    pub left_eye_width: f64,
    pub right_eye_width: f64,
    pub eye_distance: f64,
    pub nose_width: f64,
    pub nose_length: f64,
    pub lip_width: f64,
    pub lip_height: f64,
    /// face width : face height
    pub face_ratio: Option<f64>,
    /// eye distance : face width
    pub eye_ratio: Option<f64>,
    /// lip width : face width
    pub lip_ratio: Option<f64>,
}

impl FaceGeometry {
    pub fn measure(mesh: &FaceMesh) -> Self {
        let span = |(a, b): IndexPair| distance(&mesh[a], &mesh[b]);

        let face_width = span(FACE_WIDTH);
        let face_height = span(FACE_HEIGHT);
        let eye_distance = span(EYE_DISTANCE);
        let lip_width = span(LIP_WIDTH);

        let geometry = Self {
            face_width,
            face_height,
            left_eye_width: span(LEFT_EYE_WIDTH),
            right_eye_width: span(RIGHT_EYE_WIDTH),
            eye_distance,
            nose_width: span(NOSE_WIDTH),
            nose_length: span(NOSE_LENGTH),
            lip_width,
            lip_height: span(LIP_HEIGHT),
            face_ratio: ratio(face_width, face_height),
            eye_ratio: ratio(eye_distance, face_width),
            lip_ratio: ratio(lip_width, face_width),
        };

        if geometry.face_ratio.is_none() || geometry.eye_ratio.is_none() {
            tracing::debug!(face_width, face_height, "degenerate face span, ratio omitted");
        }

        geometry
    }
}

/// `numerator / divisor`, or `None` when the divisor is effectively zero.
pub fn ratio(numerator: f64, divisor: f64) -> Option<f64> {
    if divisor <= RATIO_EPSILON {
        return None;
    }
    let r = numerator / divisor;
    r.is_finite().then_some(r)
}

/// Euclidean distance in 3D.
///
/// Finite for any finite input: components are halved before subtracting and
/// the result saturates at `f64::MAX`.
pub fn distance(a: &Landmark3D, b: &Landmark3D) -> f64 {
    let dx = a.x / 2.0 - b.x / 2.0;
    let dy = a.y / 2.0 - b.y / 2.0;
    let dz = a.depth() / 2.0 - b.depth() / 2.0;
    (dx.hypot(dy).hypot(dz) * 2.0).min(f64::MAX)
}

/// Image-plane bounding box, or `None` for an empty set.
pub fn bounds(points: &[Landmark3D]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox::from_extents(min_x, min_y, max_x, max_y))
}

/// Landmarks as a 2D polygon, in the order given.
pub fn polygon(points: &[Landmark3D]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

/// Corners of the bounding box, clockwise from top-left in image coordinates.
///
/// Stands in for a convex hull; consumers rely on exactly these four points.
pub fn approximate_hull(b: &BoundingBox) -> Vec<[f64; 2]> {
    vec![
        [b.x, b.y],
        [b.right(), b.y],
        [b.right(), b.bottom()],
        [b.x, b.bottom()],
    ]
}

/// Mask outline for a zone, or `None` for an empty zone.
pub fn mask_data(points: &[Landmark3D]) -> Option<MaskData> {
    let b = bounds(points)?;
    Some(MaskData {
        points: points.iter().map(Point3::from).collect(),
        polygon: polygon(points),
        approximate_hull: approximate_hull(&b),
    })
}

/// Map points into the unit square of `b`. Depth passes through (0 when absent).
///
/// Returns `None` for a box with zero width or height.
pub fn normalize_to_bounds(points: &[Landmark3D], b: &BoundingBox) -> Option<Vec<Landmark3D>> {
    if b.width.abs() <= RATIO_EPSILON || b.height.abs() <= RATIO_EPSILON {
        return None;
    }
    Some(
        points
            .iter()
            .map(|p| Landmark3D {
                x: (p.x - b.x) / b.width,
                y: (p.y - b.y) / b.height,
                z: Some(p.depth()),
                visibility: p.visibility,
            })
            .collect(),
    )
}
