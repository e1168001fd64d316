use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of landmarks in a MediaPipe face mesh without iris refinement.
pub const FACE_MESH_LEN: usize = 468;

/// How many individual faults a [`MeshError`] message spells out before eliding.
const MAX_REPORTED_FAULTS: usize = 8;

/// One face-mesh point as delivered by the detector.
///
/// `x`/`y` share the source image's coordinate space (pixels or 0–1, never
/// mixed within one mesh). `z` is relative depth and `visibility` a
/// confidence in [0, 1]; both are optional on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark3D {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z), visibility: None }
    }

    /// A point with only image-plane coordinates.
    pub fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: None, visibility: None }
    }

    /// Depth used for distance math; a missing `z` counts as 0.
    pub fn depth(&self) -> f64 {
        self.z.unwrap_or(0.0)
    }

    /// Visibility with absence treated as fully visible.
    pub fn visibility_or_default(&self) -> f64 {
        self.visibility.unwrap_or(1.0)
    }

    /// True when `x`, `y` and any supplied `z` are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// 2D point, used for box centres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// 3D point with depth always materialised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<&Landmark3D> for Point3 {
    fn from(p: &Landmark3D) -> Self {
        Self { x: p.x, y: p.y, z: p.depth() }
    }
}

/// Axis-aligned box around a set of landmarks in the image plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center: Point2,
}

impl BoundingBox {
    /// Extents spanning more than `f64::MAX` saturate rather than overflow.
    pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).min(f64::MAX),
            height: (max_y - min_y).min(f64::MAX),
            center: Point2 {
                x: min_x / 2.0 + max_x / 2.0,
                y: min_y / 2.0 + max_y / 2.0,
            },
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Face size in squared coordinate units.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Simplified zone outline handed to downstream masking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskData {
    pub points: Vec<Point3>,
    /// Landmark order, unsorted; may self-intersect.
    pub polygon: Vec<[f64; 2]>,
    /// Four corners of the bounding box (TL, TR, BR, BL), not a true convex hull.
    /// Kept under its historical wire name.
    #[serde(rename = "convex_hull")]
    pub approximate_hull: Vec<[f64; 2]>,
}

/// Which coordinate of a landmark failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        })
    }
}

/// A single non-finite coordinate found while validating a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFault {
    pub index: usize,
    pub axis: Axis,
    pub value: f64,
}

/// Rejected face-mesh input. This is the only way processing can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("face mesh has {actual} landmarks, expected exactly {expected}")]
    WrongLength { expected: usize, actual: usize },
    #[error("{} non-finite coordinate(s): {}", .faults.len(), describe_faults(.faults))]
    NonFiniteCoordinates { faults: Vec<CoordinateFault> },
}

fn describe_faults(faults: &[CoordinateFault]) -> String {
    let mut parts: Vec<String> = faults
        .iter()
        .take(MAX_REPORTED_FAULTS)
        .map(|f| format!("#{}.{}={}", f.index, f.axis, f.value))
        .collect();
    if faults.len() > MAX_REPORTED_FAULTS {
        parts.push(format!("… and {} more", faults.len() - MAX_REPORTED_FAULTS));
    }
    parts.join(", ")
}

/// Exactly [`FACE_MESH_LEN`] validated landmarks from one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark3D>", into = "Vec<Landmark3D>")]
pub struct FaceMesh {
    points: Vec<Landmark3D>,
}

impl FaceMesh {
    /// Validate length and finiteness; every bad coordinate is reported, not just the first.
    pub fn new(points: Vec<Landmark3D>) -> Result<Self, MeshError> {
        Self::check(&points)?;
        Ok(Self { points })
    }

    /// Run validation without taking ownership.
    pub fn check(points: &[Landmark3D]) -> Result<(), MeshError> {
        if points.len() != FACE_MESH_LEN {
            return Err(MeshError::WrongLength {
                expected: FACE_MESH_LEN,
                actual: points.len(),
            });
        }

        let mut faults = Vec::new();
        for (index, p) in points.iter().enumerate() {
            let coords = [(Axis::X, Some(p.x)), (Axis::Y, Some(p.y)), (Axis::Z, p.z)];
            for (axis, value) in coords {
                if let Some(value) = value.filter(|v| !v.is_finite()) {
                    faults.push(CoordinateFault { index, axis, value });
                }
            }
        }

        if faults.is_empty() {
            Ok(())
        } else {
            Err(MeshError::NonFiniteCoordinates { faults })
        }
    }

    pub fn points(&self) -> &[Landmark3D] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Landmark3D> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_inner(self) -> Vec<Landmark3D> {
        self.points
    }
}

impl std::ops::Index<usize> for FaceMesh {
    type Output = Landmark3D;

    fn index(&self, index: usize) -> &Landmark3D {
        &self.points[index]
    }
}

impl TryFrom<Vec<Landmark3D>> for FaceMesh {
    type Error = MeshError;

    fn try_from(points: Vec<Landmark3D>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<FaceMesh> for Vec<Landmark3D> {
    fn from(mesh: FaceMesh) -> Self {
        mesh.points
    }
}
