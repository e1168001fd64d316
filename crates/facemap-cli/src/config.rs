use facemap_core::quality::{
    QualityThresholds, DEFAULT_MIN_COVERAGE, DEFAULT_MIN_SYMMETRY, DEFAULT_MIN_VALID_LANDMARKS,
};
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Topology TOML to use instead of the embedded MediaPipe table.
    pub topology_path: Option<PathBuf>,
    /// Suitability thresholds applied to every processed mesh.
    pub thresholds: QualityThresholds,
}

impl Config {
    /// Load configuration from `FACEMAP_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            topology_path: lookup("FACEMAP_TOPOLOGY")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            thresholds: QualityThresholds {
                min_coverage: parse_or(&lookup, "FACEMAP_MIN_COVERAGE", DEFAULT_MIN_COVERAGE),
                min_symmetry: parse_or(&lookup, "FACEMAP_MIN_SYMMETRY", DEFAULT_MIN_SYMMETRY),
                min_valid_landmarks: parse_or(
                    &lookup,
                    "FACEMAP_MIN_VALID_LANDMARKS",
                    DEFAULT_MIN_VALID_LANDMARKS,
                ),
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}
