//! Capture readiness from detector metadata.
//!
//! Decides whether a detection is worth sending for landmark processing,
//! before any mesh work happens. Like [`crate::quality`], it only reports.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;
pub const DEFAULT_MAX_ABS_YAW_DEG: f64 = 30.0;
pub const DEFAULT_MAX_ABS_PITCH_DEG: f64 = 20.0;
pub const DEFAULT_MIN_EYE_OPEN: f64 = 0.5;
pub const DEFAULT_MIN_LANDMARK_COUNT: usize = 400;

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub roll: f64,
}

/// What a face detector reports alongside a mesh. Absent fields read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionMeta {
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub head_pose: HeadPose,
    #[serde(default)]
    pub left_eye_open: f64,
    #[serde(default)]
    pub right_eye_open: f64,
    #[serde(default)]
    pub landmark_count: usize,
}

/// All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessThresholds {
    pub min_confidence: f64,
    pub max_abs_yaw_deg: f64,
    pub max_abs_pitch_deg: f64,
    pub min_eye_open: f64,
    pub min_landmark_count: usize,
}

impl Default for ReadinessThresholds {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_abs_yaw_deg: DEFAULT_MAX_ABS_YAW_DEG,
            max_abs_pitch_deg: DEFAULT_MAX_ABS_PITCH_DEG,
            min_eye_open: DEFAULT_MIN_EYE_OPEN,
            min_landmark_count: DEFAULT_MIN_LANDMARK_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub confident: bool,
    pub facing_camera: bool,
    pub eyes_open: bool,
    pub sufficient_landmarks: bool,
    pub ready: bool,
}

impl ReadinessReport {
    /// Names of the checks that failed, for user-facing hints.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        [
            ("confidence", self.confident),
            ("head_pose", self.facing_camera),
            ("eyes_open", self.eyes_open),
            ("landmarks", self.sufficient_landmarks),
        ]
        .into_iter()
        .filter(|&(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect()
    }
}

pub fn assess_readiness(meta: &DetectionMeta, thresholds: &ReadinessThresholds) -> ReadinessReport {
    let confident = meta.confidence > thresholds.min_confidence;
    let facing_camera = meta.head_pose.yaw.abs() < thresholds.max_abs_yaw_deg
        && meta.head_pose.pitch.abs() < thresholds.max_abs_pitch_deg;
    let eyes_open =
        meta.left_eye_open > thresholds.min_eye_open && meta.right_eye_open > thresholds.min_eye_open;
    let sufficient_landmarks = meta.landmark_count > thresholds.min_landmark_count;

    ReadinessReport {
        confident,
        facing_camera,
        eyes_open,
        sufficient_landmarks,
        ready: confident && facing_camera && eyes_open && sufficient_landmarks,
    }
}
