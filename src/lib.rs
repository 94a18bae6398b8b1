pub mod analysis;
pub mod camera;
pub mod config;
pub mod error;
pub mod estimator;
pub mod exercise;
pub mod frame;
pub mod overlay;
pub mod pose;
pub mod rules;
pub mod session;
pub mod state;

pub use analysis::{AnalysisLoop, AnalysisUpdate};
pub use camera::{CaptureDevice, CaptureStream, FrameSource, SourceStatus, SyntheticDevice};
pub use config::{AnalysisConfig, CameraConfig, FormcoachConfig};
pub use error::{DeviceError, EstimationError, FormcoachError, Result};
pub use estimator::{FixedPoseEstimator, NullEstimator, PoseEstimator};
pub use exercise::{ExerciseInfo, ExerciseType};
pub use frame::{FrameData, FrameFormat};
pub use overlay::{overlay_color, renderable_edges, renderable_joints, OverlayEdge, SKELETON_EDGES};
pub use pose::{JointName, JointPoint, Keypoint, Pose};
pub use rules::{PostureAnalysisResult, PostureRuleEngine};
pub use session::{InMemorySessionStore, SessionStore, SessionSummary};
pub use state::{AnalysisState, FeedbackType};
