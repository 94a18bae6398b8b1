//! Per-exercise rule tolerances, enumerated in one place.
//!
//! Horizontal-displacement limits are ratios of a body-width reference
//! (hip width for lower-body rules, shoulder width for arm rules), so the
//! same thresholds hold regardless of the delivered frame resolution.
//! Angular limits are degrees. All values are tunable configuration, not
//! scattered magic numbers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquatThresholds {
    /// Max inward knee displacement from the hip-ankle line, per hip width
    pub knee_valgus_ratio: f32,
    /// Max left/right ankle height asymmetry, per hip width
    pub heel_lift_ratio: f32,
}

impl Default for SquatThresholds {
    fn default() -> Self {
        Self {
            knee_valgus_ratio: 0.12,
            heel_lift_ratio: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadliftThresholds {
    /// Neutral-spine reference for the shoulder-hip-knee angle
    pub neutral_angle_deg: f32,
    /// Max deviation from the neutral reference before flagging flexion
    pub tolerance_deg: f32,
}

impl Default for DeadliftThresholds {
    fn default() -> Self {
        Self {
            neutral_angle_deg: 180.0,
            tolerance_deg: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushupThresholds {
    /// Max hip drop below the shoulder-ankle line, per torso length
    pub hip_sag_ratio: f32,
}

impl Default for PushupThresholds {
    fn default() -> Self {
        Self { hip_sag_ratio: 0.15 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchPressThresholds {
    /// Max left/right wrist height difference, per shoulder width
    pub wrist_level_ratio: f32,
}

impl Default for BenchPressThresholds {
    fn default() -> Self {
        Self {
            wrist_level_ratio: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BicepCurlThresholds {
    /// Max horizontal elbow drift from the shoulder, per shoulder width
    pub elbow_drift_ratio: f32,
}

impl Default for BicepCurlThresholds {
    fn default() -> Self {
        Self {
            elbow_drift_ratio: 0.30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarriorThresholds {
    /// Max left/right hip height difference, per hip width
    pub hip_level_ratio: f32,
    /// Max horizontal knee offset from the ankle, per hip width
    pub knee_over_ankle_ratio: f32,
}

impl Default for WarriorThresholds {
    fn default() -> Self {
        Self {
            hip_level_ratio: 0.12,
            knee_over_ankle_ratio: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DowndogThresholds {
    /// Inverted-V window for the shoulder-hip-knee angle
    pub hip_angle_min_deg: f32,
    pub hip_angle_max_deg: f32,
}

impl Default for DowndogThresholds {
    fn default() -> Self {
        Self {
            hip_angle_min_deg: 50.0,
            hip_angle_max_deg: 110.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceThresholds {
    /// Max horizontal lean of the shoulder midpoint over the hip midpoint,
    /// per hip width. Also used for the tree-pose nose-over-hip check.
    pub lean_ratio: f32,
}

impl Default for BalanceThresholds {
    fn default() -> Self {
        Self { lean_ratio: 0.20 }
    }
}

/// Full threshold table for the rule engine, one entry per specific rule
/// set plus the generic balance fallback.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub squat: SquatThresholds,
    pub deadlift: DeadliftThresholds,
    pub pushup: PushupThresholds,
    pub bench_press: BenchPressThresholds,
    pub bicep_curl: BicepCurlThresholds,
    pub warrior: WarriorThresholds,
    pub downdog: DowndogThresholds,
    pub balance: BalanceThresholds,
}
