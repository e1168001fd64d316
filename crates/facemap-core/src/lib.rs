//! facemap-core — Face mesh landmark to makeup zone mapping.
//!
//! Takes the 468-point MediaPipe face mesh produced by an external detector
//! and derives facial feature groupings, per-zone bounds and masks, face
//! geometry and a quality score for downstream makeup rendering.

pub mod geometry;
pub mod mapper;
pub mod quality;
pub mod raster;
pub mod readiness;
pub mod topology;
pub mod types;

pub use geometry::FaceGeometry;
pub use mapper::{
    export_for_downstream, DownstreamPayload, FeatureGroup, LandmarkZoneMapper, ProcessedLandmarks,
    ZoneResult,
};
pub use quality::{QualityMetrics, QualityThresholds};
pub use topology::{Topology, TopologyError};
pub use types::{BoundingBox, FaceMesh, Landmark3D, MaskData, MeshError, FACE_MESH_LEN};
