use serde::{Deserialize, Serialize};

/// Fixed anatomical vocabulary for keypoint names.
///
/// Wire names use the camelCase form (`leftShoulder`, `rightAnkle`, ...)
/// shared with the overlay renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    /// All joint names in canonical order (nose first, right ankle last).
    pub const ALL: [JointName; 17] = [
        JointName::Nose,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEar,
        JointName::RightEar,
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftWrist,
        JointName::RightWrist,
        JointName::LeftHip,
        JointName::RightHip,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::LeftAnkle,
        JointName::RightAnkle,
    ];
}

/// A 2D image-space location estimate with detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointPoint {
    pub x: f32,
    pub y: f32,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

impl JointPoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// A named keypoint within a pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: JointName,
    #[serde(flatten)]
    pub point: JointPoint,
}

/// Full set of keypoints for one detected person in one frame.
///
/// Invariant: each `JointName` appears at most once. `score` is the overall
/// pose-detection confidence, independent of per-joint confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    keypoints: Vec<Keypoint>,
    pub score: f32,
}

impl Pose {
    /// Build a pose from keypoints, dropping duplicate joint names
    /// (first occurrence wins).
    pub fn new(keypoints: Vec<Keypoint>, score: f32) -> Self {
        let mut seen = std::collections::HashSet::new();
        let keypoints = keypoints
            .into_iter()
            .filter(|kp| seen.insert(kp.name))
            .collect();
        Self { keypoints, score }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Look up a joint by name.
    pub fn joint(&self, name: JointName) -> Option<JointPoint> {
        self.keypoints
            .iter()
            .find(|kp| kp.name == name)
            .map(|kp| kp.point)
    }

    /// Midpoint of two joints, if both are present.
    pub fn midpoint(&self, a: JointName, b: JointName) -> Option<(f32, f32)> {
        let pa = self.joint(a)?;
        let pb = self.joint(b)?;
        Some(((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0))
    }
}
