use crate::pose::{JointName, JointPoint, Pose};
use crate::state::FeedbackType;

/// Minimum per-joint confidence for a keypoint or edge to be drawn.
pub const DRAW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Skeleton connectivity for the overlay, as (from, to) joint pairs.
pub const SKELETON_EDGES: [(JointName, JointName); 16] = [
    (JointName::Nose, JointName::LeftEye),
    (JointName::Nose, JointName::RightEye),
    (JointName::LeftEye, JointName::LeftEar),
    (JointName::RightEye, JointName::RightEar),
    (JointName::LeftShoulder, JointName::RightShoulder),
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftWrist),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightWrist),
    (JointName::LeftShoulder, JointName::LeftHip),
    (JointName::RightShoulder, JointName::RightHip),
    (JointName::LeftHip, JointName::RightHip),
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftAnkle),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightAnkle),
];

/// A skeleton segment with both endpoints above the draw threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayEdge {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

/// RGB hex color for the skeleton, keyed off the current feedback level.
pub fn overlay_color(feedback_type: FeedbackType) -> &'static str {
    match feedback_type {
        FeedbackType::Correct => "#34C759",
        FeedbackType::Warning => "#FF9500",
        FeedbackType::Incorrect => "#FF3B30",
    }
}

/// Keypoints confident enough to draw.
pub fn renderable_joints(pose: &Pose) -> Vec<(JointName, JointPoint)> {
    pose.keypoints()
        .iter()
        .filter(|kp| kp.point.confidence > DRAW_CONFIDENCE_THRESHOLD)
        .map(|kp| (kp.name, kp.point))
        .collect()
}

/// Skeleton edges whose endpoints are both present and both above the
/// draw threshold. An edge with one weak endpoint is dropped entirely.
pub fn renderable_edges(pose: &Pose) -> Vec<OverlayEdge> {
    SKELETON_EDGES
        .iter()
        .filter_map(|&(a, b)| {
            let pa = pose.joint(a)?;
            let pb = pose.joint(b)?;
            if pa.confidence > DRAW_CONFIDENCE_THRESHOLD
                && pb.confidence > DRAW_CONFIDENCE_THRESHOLD
            {
                Some(OverlayEdge {
                    from: (pa.x, pa.y),
                    to: (pb.x, pb.y),
                })
            } else {
                None
            }
        })
        .collect()
}
