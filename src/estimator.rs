use crate::error::EstimationError;
use crate::frame::FrameData;
use crate::pose::{JointName, JointPoint, Keypoint, Pose};
use async_trait::async_trait;
use tracing::trace;

/// Pose inference boundary. A real backend wraps an actual model; the
/// estimators in this module cover the synthetic pipeline and tests.
#[async_trait]
pub trait PoseEstimator: Send + Sync {
    /// Infer a pose from one frame. `Ok(None)` means no person detected,
    /// which is a normal outcome and not an error.
    async fn estimate(&self, frame: &FrameData) -> Result<Option<Pose>, EstimationError>;
}

/// Canonical upright keypoints on a 640x480 reference frame.
///
/// Joint coordinates scale 1:1 with the delivered frame dimensions, so
/// downstream ratios stay resolution independent.
const BASE_WIDTH: f32 = 640.0;
const BASE_HEIGHT: f32 = 480.0;

const CANONICAL_KEYPOINTS: [(JointName, f32, f32, f32); 17] = [
    (JointName::Nose, 320.0, 60.0, 0.95),
    (JointName::LeftEye, 308.0, 52.0, 0.92),
    (JointName::RightEye, 332.0, 52.0, 0.92),
    (JointName::LeftEar, 296.0, 58.0, 0.85),
    (JointName::RightEar, 344.0, 58.0, 0.85),
    (JointName::LeftShoulder, 270.0, 130.0, 0.94),
    (JointName::RightShoulder, 370.0, 130.0, 0.94),
    (JointName::LeftElbow, 250.0, 200.0, 0.90),
    (JointName::RightElbow, 390.0, 200.0, 0.90),
    (JointName::LeftWrist, 240.0, 265.0, 0.88),
    (JointName::RightWrist, 400.0, 265.0, 0.88),
    (JointName::LeftHip, 285.0, 270.0, 0.93),
    (JointName::RightHip, 355.0, 270.0, 0.93),
    (JointName::LeftKnee, 280.0, 360.0, 0.91),
    (JointName::RightKnee, 360.0, 360.0, 0.91),
    (JointName::LeftAnkle, 278.0, 450.0, 0.87),
    (JointName::RightAnkle, 362.0, 450.0, 0.87),
];

/// Deterministic estimator that reports the canonical upright pose,
/// scaled to whatever resolution the device actually delivered.
pub struct FixedPoseEstimator {
    score: f32,
}

impl FixedPoseEstimator {
    pub fn new() -> Self {
        Self { score: 0.9 }
    }

    /// Override the whole-pose confidence score, for exercising the
    /// low-confidence gate.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

impl Default for FixedPoseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PoseEstimator for FixedPoseEstimator {
    async fn estimate(&self, frame: &FrameData) -> Result<Option<Pose>, EstimationError> {
        if !frame.validate_size() {
            return Err(EstimationError::Decode {
                details: format!(
                    "frame {} payload does not match {}x{} {:?}",
                    frame.id, frame.width, frame.height, frame.format
                ),
            });
        }

        let sx = frame.width as f32 / BASE_WIDTH;
        let sy = frame.height as f32 / BASE_HEIGHT;
        let keypoints = CANONICAL_KEYPOINTS
            .iter()
            .map(|&(name, x, y, confidence)| Keypoint {
                name,
                point: JointPoint {
                    x: x * sx,
                    y: y * sy,
                    confidence,
                },
            })
            .collect();

        trace!(frame_id = frame.id, "estimated canonical pose");
        Ok(Some(Pose::new(keypoints, self.score)))
    }
}

/// Estimator that never detects a person. Drives the no-pose path.
pub struct NullEstimator;

#[async_trait]
impl PoseEstimator for NullEstimator {
    async fn estimate(&self, _frame: &FrameData) -> Result<Option<Pose>, EstimationError> {
        Ok(None)
    }
}

/// Estimator that fails every frame with a backend error. Drives the
/// skip-cycle path.
pub struct FailingEstimator;

#[async_trait]
impl PoseEstimator for FailingEstimator {
    async fn estimate(&self, frame: &FrameData) -> Result<Option<Pose>, EstimationError> {
        Err(EstimationError::Backend {
            details: format!("inference unavailable for frame {}", frame.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;
    use std::time::SystemTime;

    fn rgb_frame(id: u64, width: u32, height: u32) -> FrameData {
        let data = vec![0u8; (width * height * 3) as usize];
        FrameData::new(id, SystemTime::now(), data, width, height, FrameFormat::Rgb24)
    }

    #[tokio::test]
    async fn test_fixed_estimator_scales_to_delivered_resolution() {
        let estimator = FixedPoseEstimator::new();

        let full = estimator.estimate(&rgb_frame(0, 640, 480)).await.unwrap().unwrap();
        let half = estimator.estimate(&rgb_frame(1, 320, 240)).await.unwrap().unwrap();

        let nose_full = full.joint(JointName::Nose).unwrap();
        let nose_half = half.joint(JointName::Nose).unwrap();
        assert!((nose_half.x - nose_full.x / 2.0).abs() < f32::EPSILON);
        assert!((nose_half.y - nose_full.y / 2.0).abs() < f32::EPSILON);
        assert_eq!(nose_half.confidence, nose_full.confidence);
    }

    #[tokio::test]
    async fn test_fixed_estimator_reports_all_joints() {
        let estimator = FixedPoseEstimator::new();
        let pose = estimator.estimate(&rgb_frame(0, 640, 480)).await.unwrap().unwrap();

        for name in JointName::ALL {
            assert!(pose.joint(name).is_some(), "{name:?} missing");
        }
        assert!((pose.score - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_fixed_estimator_rejects_truncated_frame() {
        let estimator = FixedPoseEstimator::new();
        let frame = FrameData::new(
            7,
            SystemTime::now(),
            vec![0u8; 10],
            640,
            480,
            FrameFormat::Rgb24,
        );

        let err = estimator.estimate(&frame).await.unwrap_err();
        assert!(matches!(err, EstimationError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_null_estimator_detects_nothing() {
        let result = NullEstimator.estimate(&rgb_frame(0, 64, 48)).await.unwrap();
        assert!(result.is_none());
    }
}
