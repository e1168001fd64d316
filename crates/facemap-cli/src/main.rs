use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use facemap_core::raster::{self, CoordinateSpace, MaskShape};
use facemap_core::readiness::{self, DetectionMeta, ReadinessThresholds};
use facemap_core::quality;
use facemap_core::{
    export_for_downstream, DownstreamPayload, Landmark3D, LandmarkZoneMapper, Topology,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facemap", about = "Map face-mesh landmarks to makeup zones")]
struct Cli {
    /// Topology TOML to use instead of the embedded MediaPipe table
    #[arg(long, global = true)]
    topology: Option<PathBuf>,

    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Write output to this file instead of stdout
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a face mesh into features, zones, geometry and quality
    Process {
        /// Face mesh JSON (array of landmarks, or {"landmarks": [...]})
        mesh: PathBuf,
    },
    /// Emit the payload consumed by the image-generation step
    Export {
        mesh: PathBuf,
        /// Also emit the mesh normalised to the face bounds (0–1)
        #[arg(long)]
        normalized_landmarks: bool,
    },
    /// Show quality metrics and geometry ratios
    Quality { mesh: PathBuf },
    /// List makeup zones of the active topology
    Zones,
    /// Load and validate a topology file
    ValidateTopology { file: PathBuf },
    /// Render one zone's mask as a grayscale PNG
    Mask {
        mesh: PathBuf,
        /// Zone name, e.g. "lipstick"
        #[arg(short, long)]
        zone: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, value_enum, default_value_t = ShapeArg::Hull)]
        shape: ShapeArg,
        /// Landmarks are 0–1 relative to the image
        #[arg(long)]
        normalized: bool,
    },
    /// Check detector metadata against the capture gate
    Readiness {
        /// Detection metadata JSON
        meta: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Hull,
    Polygon,
}

impl From<ShapeArg> for MaskShape {
    fn from(s: ShapeArg) -> Self {
        match s {
            ShapeArg::Hull => MaskShape::Hull,
            ShapeArg::Polygon => MaskShape::Polygon,
        }
    }
}

/// Accepted face-mesh file layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum MeshFile {
    Bare(Vec<Landmark3D>),
    Wrapped { landmarks: Vec<Landmark3D> },
}

impl MeshFile {
    fn into_landmarks(self) -> Vec<Landmark3D> {
        match self {
            MeshFile::Bare(points) | MeshFile::Wrapped { landmarks: points } => points,
        }
    }
}

#[derive(Serialize)]
struct ExportOutput {
    #[serde(flatten)]
    payload: DownstreamPayload,
    /// `Some(None)` is written as `null` for a face with no extent.
    #[serde(skip_serializing_if = "Option::is_none")]
    normalized_landmarks: Option<Option<Vec<Landmark3D>>>,
}

#[derive(Serialize)]
struct ZoneSummary<'a> {
    zone: &'a str,
    references: &'a [String],
    landmarks: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let topology_path = cli.topology.clone().or_else(|| config.topology_path.clone());

    match &cli.command {
        Commands::Process { mesh } => {
            let mapper = build_mapper(topology_path.as_deref(), &config)?;
            let processed = mapper.process(&read_mesh(mesh)?)?;
            emit_json(&cli, &processed)?;
        }
        Commands::Export { mesh, normalized_landmarks } => {
            let mapper = build_mapper(topology_path.as_deref(), &config)?;
            let processed = mapper.process(&read_mesh(mesh)?)?;
            let output = ExportOutput {
                payload: export_for_downstream(&processed),
                normalized_landmarks: normalized_landmarks.then(|| processed.normalized_landmarks()),
            };
            emit_json(&cli, &output)?;
        }
        Commands::Quality { mesh } => {
            let mapper = build_mapper(topology_path.as_deref(), &config)?;
            let processed = mapper.process(&read_mesh(mesh)?)?;
            let q = &processed.quality_metrics;
            let g = &processed.face_geometry;
            let face_size = processed.face_bounds().map(|b| b.area());
            let text = format!(
                "landmarks: {}/{} valid\ncoverage: {:.3}\nsymmetry: {:.3}\nvisibility: {:.3}\n\
                 suitable for makeup: {}\nface size: {}\n\
                 face ratio: {}\neye ratio: {}\nlip ratio: {}\n",
                q.valid_landmarks,
                q.total_landmarks,
                q.coverage_score,
                q.symmetry_score,
                quality::mean_visibility(processed.raw_landmarks.points()),
                if q.is_suitable_for_makeup { "yes" } else { "no" },
                fmt_ratio(face_size),
                fmt_ratio(g.face_ratio),
                fmt_ratio(g.eye_ratio),
                fmt_ratio(g.lip_ratio),
            );
            emit_text(&cli, &text)?;
        }
        Commands::Zones => {
            let topology = load_topology(topology_path.as_deref())?;
            let zones: Vec<ZoneSummary> = topology
                .zones()
                .iter()
                .map(|(zone, def)| ZoneSummary {
                    zone,
                    references: &def.references,
                    landmarks: def.indices.len(),
                })
                .collect();
            emit_json(&cli, &zones)?;
        }
        Commands::ValidateTopology { file } => {
            let topology = Topology::load(file)
                .with_context(|| format!("invalid topology {}", file.display()))?;
            emit_text(
                &cli,
                &format!(
                    "{}: ok ({} regions, {} zones)\n",
                    topology.name(),
                    topology.regions().len(),
                    topology.zones().len()
                ),
            )?;
        }
        Commands::Mask { mesh, zone, width, height, shape, normalized } => {
            let Some(out) = cli.out.as_deref() else {
                bail!("mask needs --out <file.png>");
            };
            let mapper = build_mapper(topology_path.as_deref(), &config)?;
            let processed = mapper.process(&read_mesh(mesh)?)?;
            let result = processed
                .makeup_zones
                .get(zone.as_str())
                .with_context(|| format!("unknown zone `{zone}`"))?;
            let space = if *normalized {
                CoordinateSpace::Normalized
            } else {
                CoordinateSpace::Pixels
            };
            let img = raster::render_mask(result.mask.as_ref(), *width, *height, (*shape).into(), space)?;
            img.save(out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(zone = %zone, path = %out.display(), "mask written");
        }
        Commands::Readiness { meta } => {
            let raw = std::fs::read_to_string(meta)
                .with_context(|| format!("failed to read {}", meta.display()))?;
            let meta: DetectionMeta = serde_json::from_str(&raw)
                .with_context(|| format!("bad detection metadata in {}", meta.display()))?;
            let report = readiness::assess_readiness(&meta, &ReadinessThresholds::default());
            emit_json(&cli, &report)?;
        }
    }

    Ok(())
}

fn load_topology(path: Option<&Path>) -> Result<Arc<Topology>> {
    match path {
        Some(p) => Ok(Arc::new(
            Topology::load(p).with_context(|| format!("invalid topology {}", p.display()))?,
        )),
        None => Ok(Topology::embedded()?),
    }
}

fn build_mapper(topology: Option<&Path>, config: &Config) -> Result<LandmarkZoneMapper> {
    Ok(LandmarkZoneMapper::with_topology(load_topology(topology)?).with_thresholds(config.thresholds))
}

fn read_mesh(path: &Path) -> Result<Vec<Landmark3D>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: MeshFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a landmark array", path.display()))?;
    let landmarks = file.into_landmarks();
    tracing::debug!(path = %path.display(), count = landmarks.len(), "mesh loaded");
    Ok(landmarks)
}

fn emit_json<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let mut text = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    emit_text(cli, &text)
}

fn emit_text(cli: &Cli, text: &str) -> Result<()> {
    match &cli.out {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn fmt_ratio(r: Option<f64>) -> String {
    r.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemap_core::FACE_MESH_LEN;

    fn processed() -> facemap_core::ProcessedLandmarks {
        let face: Vec<Landmark3D> = (0..FACE_MESH_LEN)
            .map(|i| Landmark3D::planar((i % 26) as f64 * 10.0, (i / 26) as f64 * 10.0))
            .collect();
        LandmarkZoneMapper::new().unwrap().process(&face).unwrap()
    }

    #[test]
    fn test_export_normalized_landmarks_flag() {
        let processed = processed();
        let with = ExportOutput {
            payload: export_for_downstream(&processed),
            normalized_landmarks: Some(processed.normalized_landmarks()),
        };
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["face_mesh"].as_array().unwrap().len(), FACE_MESH_LEN);
        assert_eq!(json["normalized_landmarks"].as_array().unwrap().len(), FACE_MESH_LEN);
        assert_eq!(json["normalized_landmarks"][25]["x"], 1.0);

        let without = ExportOutput {
            payload: export_for_downstream(&processed),
            normalized_landmarks: None,
        };
        let json = serde_json::to_value(&without).unwrap();
        assert!(json.get("normalized_landmarks").is_none());
        assert!(json["makeup_masks"].is_object());
    }
}
