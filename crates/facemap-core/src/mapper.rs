//! Face mesh to makeup zone mapping.
//!
//! [`LandmarkZoneMapper::process`] is a pure function of its input and the
//! mapper's immutable tables: no I/O, no shared mutable state, identical
//! output for identical input. One mapper can serve any number of threads.

use crate::geometry::{self, FaceGeometry};
use crate::quality::{self, QualityMetrics, QualityThresholds};
use crate::topology::{RegionNode, Topology, TopologyError};
use crate::types::{BoundingBox, FaceMesh, Landmark3D, MaskData, MeshError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Landmarks gathered for one region, mirroring the region's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureGroup {
    Points(Vec<Landmark3D>),
    Group(IndexMap<String, Vec<Landmark3D>>),
}

/// Per-zone output. `bounds` and `mask` are both `None` exactly when the zone is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneResult {
    pub landmarks: Vec<Landmark3D>,
    pub bounds: Option<BoundingBox>,
    #[serde(rename = "mask_data")]
    pub mask: Option<MaskData>,
}

impl ZoneResult {
    fn from_landmarks(landmarks: Vec<Landmark3D>) -> Self {
        let bounds = geometry::bounds(&landmarks);
        let mask = geometry::mask_data(&landmarks);
        Self { landmarks, bounds, mask }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedLandmarks {
    pub facial_features: IndexMap<String, FeatureGroup>,
    pub makeup_zones: IndexMap<String, ZoneResult>,
    pub face_geometry: FaceGeometry,
    pub quality_metrics: QualityMetrics,
    pub raw_landmarks: FaceMesh,
}

impl ProcessedLandmarks {
    /// Image-plane box around the whole mesh.
    pub fn face_bounds(&self) -> Option<BoundingBox> {
        geometry::bounds(self.raw_landmarks.points())
    }

    /// Raw mesh mapped into the unit square of [`Self::face_bounds`].
    ///
    /// `None` when the face has no width or height.
    pub fn normalized_landmarks(&self) -> Option<Vec<Landmark3D>> {
        let b = self.face_bounds()?;
        geometry::normalize_to_bounds(self.raw_landmarks.points(), &b)
    }
}

/// The minimal shape the image-generation step consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownstreamPayload {
    pub face_mesh: FaceMesh,
    pub makeup_masks: IndexMap<String, Option<MaskData>>,
    pub geometry: FaceGeometry,
    pub quality: QualityMetrics,
}

impl From<ProcessedLandmarks> for DownstreamPayload {
    fn from(p: ProcessedLandmarks) -> Self {
        Self {
            face_mesh: p.raw_landmarks,
            makeup_masks: p
                .makeup_zones
                .into_iter()
                .map(|(zone, result)| (zone, result.mask))
                .collect(),
            geometry: p.face_geometry,
            quality: p.quality_metrics,
        }
    }
}

/// Repackage a result for the downstream masking/generation step.
pub fn export_for_downstream(processed: &ProcessedLandmarks) -> DownstreamPayload {
    DownstreamPayload {
        face_mesh: processed.raw_landmarks.clone(),
        makeup_masks: processed
            .makeup_zones
            .iter()
            .map(|(zone, result)| (zone.clone(), result.mask.clone()))
            .collect(),
        geometry: processed.face_geometry.clone(),
        quality: processed.quality_metrics.clone(),
    }
}

/// Maps validated face meshes onto regions and makeup zones.
#[derive(Debug, Clone)]
pub struct LandmarkZoneMapper {
    topology: Arc<Topology>,
    thresholds: QualityThresholds,
}

impl LandmarkZoneMapper {
    /// Mapper over the embedded MediaPipe topology with default thresholds.
    pub fn new() -> Result<Self, TopologyError> {
        Ok(Self::with_topology(Topology::embedded()?))
    }

    pub fn with_topology(topology: Arc<Topology>) -> Self {
        Self {
            topology,
            thresholds: QualityThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: QualityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Validate a landmark slice and run the full mapping.
    ///
    /// Fails only on invalid input, and never returns a partial result.
    pub fn process(&self, landmarks: &[Landmark3D]) -> Result<ProcessedLandmarks, MeshError> {
        let mesh = FaceMesh::new(landmarks.to_vec()).map_err(|e| {
            tracing::warn!(error = %e, "rejecting face mesh");
            e
        })?;
        Ok(self.process_mesh(mesh))
    }

    /// Map an already validated mesh. Infallible.
    pub fn process_mesh(&self, mesh: FaceMesh) -> ProcessedLandmarks {
        let facial_features = self.extract_features(&mesh);
        let makeup_zones = self.extract_zones(&mesh);
        let face_geometry = FaceGeometry::measure(&mesh);
        let quality_metrics = quality::assess(mesh.points(), &self.thresholds);

        tracing::debug!(
            regions = facial_features.len(),
            zones = makeup_zones.len(),
            empty_zones = makeup_zones.values().filter(|z| z.is_empty()).count(),
            symmetry = quality_metrics.symmetry_score,
            suitable = quality_metrics.is_suitable_for_makeup,
            "face mesh processed"
        );

        ProcessedLandmarks {
            facial_features,
            makeup_zones,
            face_geometry,
            quality_metrics,
            raw_landmarks: mesh,
        }
    }

    fn extract_features(&self, mesh: &FaceMesh) -> IndexMap<String, FeatureGroup> {
        self.topology
            .regions()
            .iter()
            .map(|(name, node)| {
                let group = match node {
                    RegionNode::Leaf(indices) => FeatureGroup::Points(gather(mesh, indices)),
                    RegionNode::Group(children) => FeatureGroup::Group(
                        children
                            .iter()
                            .map(|(sub, indices)| (sub.clone(), gather(mesh, indices)))
                            .collect(),
                    ),
                };
                (name.clone(), group)
            })
            .collect()
    }

    fn extract_zones(&self, mesh: &FaceMesh) -> IndexMap<String, ZoneResult> {
        self.topology
            .zones()
            .iter()
            .map(|(zone, def)| (zone.clone(), ZoneResult::from_landmarks(gather(mesh, &def.indices))))
            .collect()
    }
}

/// Topology indices are validated against the mesh length at load time.
fn gather(mesh: &FaceMesh, indices: &[usize]) -> Vec<Landmark3D> {
    indices.iter().map(|&i| mesh[i]).collect()
}
