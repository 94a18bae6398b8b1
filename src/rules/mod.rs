//! Posture rule engine: pure, stateless mapping from joint geometry to a
//! form verdict, score, and coaching feedback.
//!
//! Each exercise with a specific rule set gets a deterministic geometric
//! check built from the angle/alignment primitives in [`geometry`], with
//! tolerances from [`thresholds`]. Exercises without a specific rule set
//! fall back to the generic balance check. A rule whose required joints
//! are absent from the pose cannot assert a fault and simply passes.

pub mod geometry;
pub mod thresholds;

use crate::exercise::ExerciseType;
use crate::pose::{JointName, JointPoint, Pose};
use geometry::{angle_deg, horizontal_offset_from_line, span_x, vertical_offset_from_line};
use serde::{Deserialize, Serialize};
use thresholds::RuleThresholds;
use tracing::trace;

/// Score reported when every rule is within tolerance.
pub const CORRECT_SCORE: u8 = 85;

/// Poses scoring below this overall confidence are treated as not detected.
pub const DEFAULT_MIN_POSE_SCORE: f32 = 0.3;

const CORRECT_FEEDBACK: &str = "Your form looks good!";
const NO_POSE_FEEDBACK: &str = "No pose detected. Please ensure you are visible in the frame.";
const NO_POSE_ISSUE: &str = "No pose detected";

/// Verdict for one analyzed frame.
///
/// Invariant: `is_correct == true` iff `main_issue == None`; `feedback` is
/// non-empty whenever `is_correct == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureAnalysisResult {
    pub is_correct: bool,
    /// Posture score, 0..=100
    pub score: u8,
    pub feedback: Vec<String>,
    /// Short label for the single most salient problem
    pub main_issue: Option<String>,
}

/// One failed rule, drawn from the fixed per-exercise catalogue.
struct Violation {
    score: u8,
    main_issue: &'static str,
    feedback: &'static [&'static str],
}

/// Stateless per-exercise rule evaluation over a threshold table.
#[derive(Debug, Clone)]
pub struct PostureRuleEngine {
    thresholds: RuleThresholds,
    min_pose_score: f32,
}

impl Default for PostureRuleEngine {
    fn default() -> Self {
        Self::new(RuleThresholds::default(), DEFAULT_MIN_POSE_SCORE)
    }
}

impl PostureRuleEngine {
    pub fn new(thresholds: RuleThresholds, min_pose_score: f32) -> Self {
        Self {
            thresholds,
            min_pose_score,
        }
    }

    pub fn thresholds(&self) -> &RuleThresholds {
        &self.thresholds
    }

    /// Analyze one pose against the rule set for the given exercise.
    ///
    /// `None` (or a pose below the minimum overall confidence) always maps
    /// to the no-pose-detected result regardless of exercise type.
    pub fn analyze(&self, pose: Option<&Pose>, exercise: ExerciseType) -> PostureAnalysisResult {
        let pose = match pose {
            Some(p) if p.score >= self.min_pose_score => p,
            Some(p) => {
                trace!(
                    pose_score = p.score,
                    min = self.min_pose_score,
                    "pose below confidence gate, treating as not detected"
                );
                return Self::no_pose_result();
            }
            None => return Self::no_pose_result(),
        };

        let violations = match exercise {
            ExerciseType::Squat => self.check_squat(pose),
            ExerciseType::Deadlift => self.check_deadlift(pose),
            ExerciseType::Pushup => self.check_pushup(pose),
            ExerciseType::BenchPress => self.check_bench_press(pose),
            ExerciseType::BicepCurl => self.check_bicep_curl(pose),
            ExerciseType::YogaWarrior => self.check_warrior(pose),
            ExerciseType::YogaDowndog => self.check_downdog(pose),
            ExerciseType::YogaTree => self.check_tree(pose),
            // No specific rule set: generic balance / weight distribution
            ExerciseType::Plank
            | ExerciseType::Lunge
            | ExerciseType::ShoulderPress
            | ExerciseType::YogaChair => self.check_balance(pose),
        };

        Self::compose(violations)
    }

    fn no_pose_result() -> PostureAnalysisResult {
        PostureAnalysisResult {
            is_correct: false,
            score: 0,
            feedback: vec![NO_POSE_FEEDBACK.to_string()],
            main_issue: Some(NO_POSE_ISSUE.to_string()),
        }
    }

    /// Fold violations into one result: the first violation is the most
    /// salient, the score is the minimum across violations, and all
    /// feedback lines accumulate.
    fn compose(violations: Vec<Violation>) -> PostureAnalysisResult {
        if violations.is_empty() {
            return PostureAnalysisResult {
                is_correct: true,
                score: CORRECT_SCORE,
                feedback: vec![CORRECT_FEEDBACK.to_string()],
                main_issue: None,
            };
        }

        let score = violations.iter().map(|v| v.score).min().unwrap_or(0);
        let main_issue = violations[0].main_issue.to_string();
        let feedback = violations
            .iter()
            .flat_map(|v| v.feedback.iter().map(|s| s.to_string()))
            .collect();

        PostureAnalysisResult {
            is_correct: false,
            score,
            feedback,
            main_issue: Some(main_issue),
        }
    }

    /// Knee valgus: knee keypoint displaced inward of the hip-ankle line
    /// beyond tolerance. Heel lift: left/right ankle height asymmetry.
    fn check_squat(&self, pose: &Pose) -> Vec<Violation> {
        let mut violations = Vec::new();
        let t = self.thresholds.squat;

        let (Some(l_hip), Some(r_hip)) = (
            pose.joint(JointName::LeftHip),
            pose.joint(JointName::RightHip),
        ) else {
            return violations;
        };
        let hip_width = span_x(l_hip, r_hip);
        let mid_x = (l_hip.x + r_hip.x) / 2.0;

        let sides = [
            (JointName::LeftHip, JointName::LeftKnee, JointName::LeftAnkle),
            (
                JointName::RightHip,
                JointName::RightKnee,
                JointName::RightAnkle,
            ),
        ];

        let valgus = sides.iter().any(|&(hip, knee, ankle)| {
            let (Some(hip), Some(knee), Some(ankle)) =
                (pose.joint(hip), pose.joint(knee), pose.joint(ankle))
            else {
                return false;
            };
            let offset = horizontal_offset_from_line(knee, hip, ankle);
            // Inward means toward the body midline
            let inward = if hip.x >= mid_x { -offset } else { offset };
            inward > t.knee_valgus_ratio * hip_width
        });
        if valgus {
            violations.push(Violation {
                score: 65,
                main_issue: "Knee valgus detected",
                feedback: &["Knees caving inward", "Maintain knee alignment with toes"],
            });
        }

        if let (Some(l_ankle), Some(r_ankle)) = (
            pose.joint(JointName::LeftAnkle),
            pose.joint(JointName::RightAnkle),
        ) {
            if (l_ankle.y - r_ankle.y).abs() > t.heel_lift_ratio * hip_width {
                violations.push(Violation {
                    score: 70,
                    main_issue: "Heel lift detected",
                    feedback: &[
                        "Heels lifting off the ground",
                        "Keep your weight in your heels",
                    ],
                });
            }
        }

        violations
    }

    /// Spinal flexion: shoulder-hip-knee angle deviating from the
    /// neutral-spine reference beyond tolerance.
    fn check_deadlift(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.deadlift;
        let Some(angle) = spine_angle(pose) else {
            return Vec::new();
        };

        if (angle - t.neutral_angle_deg).abs() > t.tolerance_deg {
            vec![Violation {
                score: 70,
                main_issue: "Spinal flexion detected",
                feedback: &[
                    "Back is rounding",
                    "Keep your spine neutral throughout the movement",
                ],
            }]
        } else {
            Vec::new()
        }
    }

    /// Hip sag: hip midpoint dropping below the shoulder-ankle line by
    /// more than a fraction of the torso length.
    fn check_pushup(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.pushup;
        let (Some(shoulder), Some(hip), Some(ankle)) = (
            mid(pose, JointName::LeftShoulder, JointName::RightShoulder),
            mid(pose, JointName::LeftHip, JointName::RightHip),
            mid(pose, JointName::LeftAnkle, JointName::RightAnkle),
        ) else {
            return Vec::new();
        };

        let torso_len =
            ((ankle.x - shoulder.x).powi(2) + (ankle.y - shoulder.y).powi(2)).sqrt();
        if torso_len < 1.0 {
            return Vec::new();
        }

        let sag = vertical_offset_from_line(hip, shoulder, ankle);
        if sag > t.hip_sag_ratio * torso_len {
            vec![Violation {
                score: 75,
                main_issue: "Core not engaged",
                feedback: &["Hips sagging", "Engage your core to maintain a straight line"],
            }]
        } else {
            Vec::new()
        }
    }

    /// Bar path symmetry: left/right wrist height difference beyond a
    /// fraction of shoulder width.
    fn check_bench_press(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.bench_press;
        let (Some(l_wrist), Some(r_wrist), Some(l_shoulder), Some(r_shoulder)) = (
            pose.joint(JointName::LeftWrist),
            pose.joint(JointName::RightWrist),
            pose.joint(JointName::LeftShoulder),
            pose.joint(JointName::RightShoulder),
        ) else {
            return Vec::new();
        };

        let shoulder_width = span_x(l_shoulder, r_shoulder);
        if (l_wrist.y - r_wrist.y).abs() > t.wrist_level_ratio * shoulder_width {
            vec![Violation {
                score: 75,
                main_issue: "Inconsistent bar path",
                feedback: &["Uneven bar path", "Keep the bar moving in a straight line"],
            }]
        } else {
            Vec::new()
        }
    }

    /// Momentum use: elbow drifting horizontally away from the shoulder
    /// beyond a fraction of shoulder width.
    fn check_bicep_curl(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.bicep_curl;
        let (Some(l_shoulder), Some(r_shoulder)) = (
            pose.joint(JointName::LeftShoulder),
            pose.joint(JointName::RightShoulder),
        ) else {
            return Vec::new();
        };
        let shoulder_width = span_x(l_shoulder, r_shoulder);

        let sides = [
            (l_shoulder, pose.joint(JointName::LeftElbow)),
            (r_shoulder, pose.joint(JointName::RightElbow)),
        ];
        let drifting = sides.iter().any(|&(shoulder, elbow)| {
            elbow.is_some_and(|e| (e.x - shoulder.x).abs() > t.elbow_drift_ratio * shoulder_width)
        });

        if drifting {
            vec![Violation {
                score: 70,
                main_issue: "Using body swing",
                feedback: &["Using momentum", "Slow down and focus on the contraction"],
            }]
        } else {
            Vec::new()
        }
    }

    /// Hip squareness plus front-knee-over-ankle alignment. The front leg
    /// is the more bent one (smaller hip-knee-ankle angle).
    fn check_warrior(&self, pose: &Pose) -> Vec<Violation> {
        let mut violations = Vec::new();
        let t = self.thresholds.warrior;

        let (Some(l_hip), Some(r_hip)) = (
            pose.joint(JointName::LeftHip),
            pose.joint(JointName::RightHip),
        ) else {
            return violations;
        };
        let hip_width = span_x(l_hip, r_hip);

        if (l_hip.y - r_hip.y).abs() > t.hip_level_ratio * hip_width {
            violations.push(Violation {
                score: 68,
                main_issue: "Hip alignment needs adjustment",
                feedback: &[
                    "Hip not fully opened",
                    "Try to square your hips more to the side",
                ],
            });
        }

        let left = leg_bend(pose, l_hip, JointName::LeftKnee, JointName::LeftAnkle);
        let right = leg_bend(pose, r_hip, JointName::RightKnee, JointName::RightAnkle);
        let front = match (left, right) {
            (Some(l), Some(r)) => Some(if l.0 <= r.0 { l } else { r }),
            (side, None) | (None, side) => side,
        };
        if let Some((_, knee, ankle)) = front {
            if (knee.x - ankle.x).abs() > t.knee_over_ankle_ratio * hip_width {
                violations.push(Violation {
                    score: 68,
                    main_issue: "Front knee not aligned with ankle",
                    feedback: &[
                        "Front knee drifting off your ankle",
                        "Keep your front knee directly above your ankle",
                    ],
                });
            }
        }

        violations
    }

    /// Inverted-V shape: shoulder-hip-knee angle within the downdog window.
    fn check_downdog(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.downdog;
        let Some(angle) = spine_angle(pose) else {
            return Vec::new();
        };

        if angle < t.hip_angle_min_deg || angle > t.hip_angle_max_deg {
            vec![Violation {
                score: 72,
                main_issue: "Heels lifting too high",
                feedback: &[
                    "Heels not reaching toward the ground",
                    "Try to lengthen your spine more",
                ],
            }]
        } else {
            Vec::new()
        }
    }

    /// Balance lean: nose drifting horizontally off the hip midpoint.
    fn check_tree(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.balance;
        let (Some(nose), Some(l_hip), Some(r_hip)) = (
            pose.joint(JointName::Nose),
            pose.joint(JointName::LeftHip),
            pose.joint(JointName::RightHip),
        ) else {
            return Vec::new();
        };
        let hip_width = span_x(l_hip, r_hip);
        let mid_x = (l_hip.x + r_hip.x) / 2.0;

        if (nose.x - mid_x).abs() > t.lean_ratio * hip_width {
            vec![Violation {
                score: 70,
                main_issue: "Balance issue detected",
                feedback: &[
                    "Body is leaning",
                    "Focus on keeping your standing leg straight",
                ],
            }]
        } else {
            Vec::new()
        }
    }

    /// Generic weight-distribution check: shoulder midpoint leaning
    /// horizontally off the hip midpoint.
    fn check_balance(&self, pose: &Pose) -> Vec<Violation> {
        let t = self.thresholds.balance;
        let (Some(shoulder), Some(l_hip), Some(r_hip)) = (
            mid(pose, JointName::LeftShoulder, JointName::RightShoulder),
            pose.joint(JointName::LeftHip),
            pose.joint(JointName::RightHip),
        ) else {
            return Vec::new();
        };
        let hip_width = span_x(l_hip, r_hip);
        let mid_x = (l_hip.x + r_hip.x) / 2.0;

        if (shoulder.x - mid_x).abs() > t.lean_ratio * hip_width {
            vec![Violation {
                score: 60,
                main_issue: "Balance issue detected",
                feedback: &[
                    "Uneven weight distribution",
                    "Try to balance your posture better",
                ],
            }]
        } else {
            Vec::new()
        }
    }
}

/// Shoulder-hip-knee angle at the hip, using left/right midpoints.
fn spine_angle(pose: &Pose) -> Option<f32> {
    let shoulder = mid(pose, JointName::LeftShoulder, JointName::RightShoulder)?;
    let hip = mid(pose, JointName::LeftHip, JointName::RightHip)?;
    let knee = mid(pose, JointName::LeftKnee, JointName::RightKnee)?;
    angle_deg(shoulder, hip, knee)
}

fn mid(pose: &Pose, a: JointName, b: JointName) -> Option<JointPoint> {
    let (x, y) = pose.midpoint(a, b)?;
    Some(JointPoint::new(x, y, 1.0))
}

/// Hip-knee-ankle bend angle for one leg, with the joints used to compute
/// it. Smaller angle means a more bent leg.
fn leg_bend(
    pose: &Pose,
    hip: JointPoint,
    knee: JointName,
    ankle: JointName,
) -> Option<(f32, JointPoint, JointPoint)> {
    let knee = pose.joint(knee)?;
    let ankle = pose.joint(ankle)?;
    let angle = angle_deg(hip, knee, ankle)?;
    Some((angle, knee, ankle))
}
