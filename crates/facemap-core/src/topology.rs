//! Region and makeup-zone tables over the face-mesh index space.
//!
//! The default table is embedded at compile time from
//! `contrib/topology/mediapipe-468.toml`, parsed and validated once per
//! process. Alternative tables go through the same validation, so any
//! [`Topology`] in hand only references indices in `[0, FACE_MESH_LEN)`.

use crate::types::FACE_MESH_LEN;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

const EMBEDDED_TOPOLOGY: &str = include_str!("../../../contrib/topology/mediapipe-468.toml");

/// Separator between a group and one of its sub-regions in zone references.
pub const PATH_SEPARATOR: char = '.';

static EMBEDDED: OnceLock<Result<Arc<Topology>, TopologyError>> = OnceLock::new();

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("failed to read topology file {path}: {message}")]
    Io { path: String, message: String },
    #[error("bad topology TOML: {0}")]
    Parse(String),
    #[error("region `{region}` references landmark {index}, valid range is 0..{limit}")]
    IndexOutOfRange {
        region: String,
        index: usize,
        limit: usize,
    },
    #[error("zone `{zone}` references unknown region `{reference}`")]
    UnresolvedReference { zone: String, reference: String },
    #[error("zone `{zone}` has malformed reference `{reference}`")]
    MalformedReference { zone: String, reference: String },
    #[error("region name `{0}` may not contain `.`")]
    InvalidRegionName(String),
}

/// A named region: a flat index list, or one level of named sub-regions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RegionNode {
    Leaf(Vec<usize>),
    Group(IndexMap<String, Vec<usize>>),
}

impl RegionNode {
    /// All indices under this node; groups concatenate sub-regions in definition order.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            RegionNode::Leaf(indices) => indices.clone(),
            RegionNode::Group(children) => children.values().flatten().copied().collect(),
        }
    }

    fn for_each_leaf(&self, name: &str, mut f: impl FnMut(String, &[usize])) {
        match self {
            RegionNode::Leaf(indices) => f(name.to_string(), indices),
            RegionNode::Group(children) => {
                for (sub, indices) in children {
                    f(format!("{name}{PATH_SEPARATOR}{sub}"), indices);
                }
            }
        }
    }
}

/// A makeup zone: its region references and the indices they resolve to.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDefinition {
    pub references: Vec<String>,
    /// Concatenation of every reference in order; overlaps are kept.
    pub indices: Vec<usize>,
}

/// On-disk layout of a topology file.
#[derive(Debug, Deserialize)]
struct TopologyFile {
    #[serde(default)]
    topology: TopologyHeader,
    regions: IndexMap<String, RegionNode>,
    #[serde(default)]
    zones: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct TopologyHeader {
    #[serde(default)]
    name: Option<String>,
}

/// Validated region and zone tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    name: String,
    regions: IndexMap<String, RegionNode>,
    zones: IndexMap<String, ZoneDefinition>,
}

impl Topology {
    /// The built-in MediaPipe table, parsed once and shared.
    pub fn embedded() -> Result<Arc<Topology>, TopologyError> {
        EMBEDDED
            .get_or_init(|| {
                let parsed = Topology::from_toml_str(EMBEDDED_TOPOLOGY).map(Arc::new);
                match &parsed {
                    Ok(t) => tracing::debug!(
                        name = %t.name,
                        regions = t.regions.len(),
                        zones = t.zones.len(),
                        "embedded topology loaded"
                    ),
                    Err(e) => tracing::error!(error = %e, "embedded topology is invalid"),
                }
                parsed
            })
            .clone()
    }

    /// Load and validate a topology file.
    pub fn load(path: impl AsRef<Path>) -> Result<Topology, TopologyError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|e| TopologyError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let topology = Self::from_toml_str(&src)?;
        tracing::info!(
            path = %path.display(),
            name = %topology.name,
            zones = topology.zones.len(),
            "loaded topology"
        );
        Ok(topology)
    }

    pub fn from_toml_str(src: &str) -> Result<Topology, TopologyError> {
        let file: TopologyFile =
            toml::from_str(src).map_err(|e| TopologyError::Parse(e.to_string()))?;

        for (name, node) in &file.regions {
            if name.contains(PATH_SEPARATOR) {
                return Err(TopologyError::InvalidRegionName(name.clone()));
            }
            if let RegionNode::Group(children) = node {
                if let Some(sub) = children.keys().find(|k| k.contains(PATH_SEPARATOR)) {
                    return Err(TopologyError::InvalidRegionName(format!("{name}.{sub}")));
                }
            }
            check_indices(name, node)?;
        }

        let mut topology = Topology {
            name: file
                .topology
                .name
                .unwrap_or_else(|| "unnamed".to_string()),
            regions: file.regions,
            zones: IndexMap::with_capacity(file.zones.len()),
        };

        for (zone, references) in file.zones {
            let mut indices = Vec::new();
            for reference in &references {
                let resolved = topology.resolve_reference(&zone, reference)?;
                indices.extend(resolved);
            }
            topology
                .zones
                .insert(zone, ZoneDefinition { references, indices });
        }

        Ok(topology)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regions(&self) -> &IndexMap<String, RegionNode> {
        &self.regions
    }

    pub fn zones(&self) -> &IndexMap<String, ZoneDefinition> {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&ZoneDefinition> {
        self.zones.get(name)
    }

    /// Walk a region path (`"lips"` or `"lips.outer_upper"`) to its indices.
    ///
    /// A bare group name yields all of its sub-regions concatenated.
    pub fn resolve(&self, path: &str) -> Option<Vec<usize>> {
        let mut parts = path.split(PATH_SEPARATOR);
        let head = parts.next()?;
        let node = self.regions.get(head)?;
        match (parts.next(), parts.next()) {
            (None, _) => Some(node.indices()),
            (Some(sub), None) => match node {
                RegionNode::Group(children) => children.get(sub).cloned(),
                RegionNode::Leaf(_) => None,
            },
            (Some(_), Some(_)) => None,
        }
    }

    /// Every index referenced by any region, with the leaf path that holds it.
    pub fn referenced_indices(&self) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        for (name, node) in &self.regions {
            node.for_each_leaf(name, |path, indices| {
                out.extend(indices.iter().map(|&i| (path.clone(), i)));
            });
        }
        out
    }

    fn resolve_reference(&self, zone: &str, reference: &str) -> Result<Vec<usize>, TopologyError> {
        let malformed = reference.is_empty()
            || reference
                .split(PATH_SEPARATOR)
                .any(|segment| segment.is_empty());
        if malformed {
            return Err(TopologyError::MalformedReference {
                zone: zone.to_string(),
                reference: reference.to_string(),
            });
        }
        self.resolve(reference)
            .ok_or_else(|| TopologyError::UnresolvedReference {
                zone: zone.to_string(),
                reference: reference.to_string(),
            })
    }
}

fn check_indices(name: &str, node: &RegionNode) -> Result<(), TopologyError> {
    let mut result = Ok(());
    node.for_each_leaf(name, |path, indices| {
        if result.is_err() {
            return;
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= FACE_MESH_LEN) {
            result = Err(TopologyError::IndexOutOfRange {
                region: path,
                index,
                limit: FACE_MESH_LEN,
            });
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        [topology]
        name = "small"

        [regions]
        brow = [1, 2, 3]

        [regions.eye]
        lid = [10, 11]
        iris = []
        corners = [12]

        [zones]
        whole_eye = ["eye"]
        lid_and_brow = ["eye.lid", "brow", "eye.lid"]
        nothing = ["eye.iris"]
    "#;

    #[test]
    fn test_embedded_topology_loads() {
        let t = Topology::embedded().unwrap();
        assert_eq!(t.name(), "mediapipe-face-mesh-468");
        for zone in [
            "foundation", "concealer", "eyeshadow", "eyeliner", "mascara", "eyebrows",
            "blush", "contour", "highlight", "lipstick", "lip_liner",
        ] {
            let def = t.zone(zone).unwrap_or_else(|| panic!("missing zone {zone}"));
            assert!(!def.indices.is_empty(), "zone {zone} resolved to nothing");
        }
    }

    #[test]
    fn test_embedded_region_order() {
        let t = Topology::embedded().unwrap();
        let names: Vec<&str> = t.regions().keys().map(String::as_str).collect();
        assert_eq!(
            names,
            [
                "face_oval", "left_eyebrow", "right_eyebrow", "left_eye", "right_eye", "nose",
                "lips", "cheeks", "forehead", "jawline", "chin",
            ]
        );
        let RegionNode::Group(eye) = &t.regions()["left_eye"] else {
            panic!("left_eye should be nested");
        };
        assert_eq!(
            eye.keys().map(String::as_str).collect::<Vec<_>>(),
            ["upper_lid", "lower_lid", "iris", "corners", "pupil"]
        );
    }

    #[test]
    fn test_embedded_topology_is_shared() {
        let a = Topology::embedded().unwrap();
        let b = Topology::embedded().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_embedded_indices_in_range() {
        let t = Topology::embedded().unwrap();
        let refs = t.referenced_indices();
        assert!(!refs.is_empty());
        for (path, index) in refs {
            assert!(index < FACE_MESH_LEN, "{path} references {index}");
        }
        for (zone, def) in t.zones() {
            assert!(def.indices.iter().all(|&i| i < FACE_MESH_LEN), "zone {zone}");
        }
    }

    #[test]
    fn test_group_reference_keeps_definition_order() {
        let t = Topology::from_toml_str(SMALL).unwrap();
        assert_eq!(t.zone("whole_eye").unwrap().indices, vec![10, 11, 12]);
    }

    #[test]
    fn test_zone_keeps_duplicates() {
        let t = Topology::from_toml_str(SMALL).unwrap();
        assert_eq!(
            t.zone("lid_and_brow").unwrap().indices,
            vec![10, 11, 1, 2, 3, 10, 11]
        );
    }

    #[test]
    fn test_empty_sub_region_resolves_to_nothing() {
        let t = Topology::from_toml_str(SMALL).unwrap();
        assert!(t.zone("nothing").unwrap().indices.is_empty());
    }

    #[test]
    fn test_resolve_paths() {
        let t = Topology::from_toml_str(SMALL).unwrap();
        assert_eq!(t.resolve("brow"), Some(vec![1, 2, 3]));
        assert_eq!(t.resolve("eye.corners"), Some(vec![12]));
        assert_eq!(t.resolve("eye.missing"), None);
        assert_eq!(t.resolve("brow.sub"), None);
        assert_eq!(t.resolve("eye.lid.extra"), None);
        assert_eq!(t.resolve("nose"), None);
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let err = Topology::from_toml_str(
            r#"
            [regions.eye]
            iris = [468, 469]
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::IndexOutOfRange {
                region: "eye.iris".into(),
                index: 468,
                limit: FACE_MESH_LEN,
            }
        );
    }

    #[test]
    fn test_rejects_unknown_reference() {
        let err = Topology::from_toml_str(
            r#"
            [regions]
            brow = [1]
            [zones]
            blush = ["cheeks.left"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::UnresolvedReference { ref reference, .. } if reference == "cheeks.left"));
    }

    #[test]
    fn test_rejects_malformed_reference() {
        let err = Topology::from_toml_str(
            r#"
            [regions]
            brow = [1]
            [zones]
            bad = ["brow."]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::MalformedReference { .. }));
    }

    #[test]
    fn test_rejects_negative_index() {
        let err = Topology::from_toml_str("[regions]\nbrow = [-1]\n").unwrap_err();
        assert!(matches!(err, TopologyError::Parse(_)));
    }

    #[test]
    fn test_rejects_dotted_region_name() {
        let err = Topology::from_toml_str("[regions]\n\"a.b\" = [1]\n").unwrap_err();
        assert_eq!(err, TopologyError::InvalidRegionName("a.b".into()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Topology::load("/nonexistent/facemap/topology.toml").unwrap_err();
        assert!(matches!(err, TopologyError::Io { .. }));
    }
}
