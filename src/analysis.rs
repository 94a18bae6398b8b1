//! Analysis loop: pulls the latest frame, runs pose estimation, evaluates
//! the rule set for the active exercise, and publishes the resulting
//! feedback state.
//!
//! The loop owns the state exclusively. Each cycle replaces it whole
//! through a watch channel, so readers never observe a partially updated
//! state. Cycles run strictly one at a time at the configured cadence; a
//! slow inference never stacks a second cycle behind itself.

use crate::camera::FrameSource;
use crate::config::AnalysisConfig;
use crate::error::DeviceError;
use crate::estimator::PoseEstimator;
use crate::exercise::ExerciseType;
use crate::pose::Pose;
use crate::rules::PostureRuleEngine;
use crate::state::AnalysisState;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// One published analysis cycle: the pose that was evaluated (for the
/// skeleton overlay) and the feedback state derived from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisUpdate {
    pub pose: Option<Pose>,
    pub state: AnalysisState,
}

struct LoopCore {
    source: Arc<FrameSource>,
    estimator: Arc<dyn PoseEstimator>,
    engine: PostureRuleEngine,
    exercise: RwLock<ExerciseType>,
    tx: watch::Sender<AnalysisUpdate>,
    cancel: RwLock<CancellationToken>,
    last_frame_id: AtomicU64,
}

impl LoopCore {
    /// Run one analysis cycle. Checked against cancellation first, so a
    /// stopped loop never publishes a stale state.
    async fn tick(&self) {
        let cancel = self.cancel.read().clone();
        if cancel.is_cancelled() {
            return;
        }

        let Some(frame) = self.source.current_frame() else {
            trace!("no frame available, skipping cycle");
            return;
        };

        // Re-analyzing the same frame cannot change the verdict
        let prev = self.last_frame_id.swap(frame.id, Ordering::AcqRel);
        if prev == frame.id {
            trace!(frame_id = frame.id, "frame already analyzed, skipping cycle");
            return;
        }

        let pose = match self.estimator.estimate(&frame).await {
            Ok(pose) => pose,
            Err(e) => {
                // Transient inference failure: keep the previous state
                warn!(frame_id = frame.id, error = %e, "estimation failed, skipping cycle");
                return;
            }
        };

        let exercise = *self.exercise.read();
        let result = self.engine.analyze(pose.as_ref(), exercise);
        let state = AnalysisState::from_result(&result);

        if cancel.is_cancelled() {
            return;
        }
        trace!(
            frame_id = frame.id,
            frame_age_ms = frame.age_ms(),
            score = state.score,
            ?exercise,
            "publishing analysis state"
        );
        self.tx.send_replace(AnalysisUpdate { pose, state });
    }
}

/// Drives the capture-estimate-analyze-publish pipeline for one session.
pub struct AnalysisLoop {
    core: Arc<LoopCore>,
    config: AnalysisConfig,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl AnalysisLoop {
    pub fn new(
        source: Arc<FrameSource>,
        estimator: Arc<dyn PoseEstimator>,
        engine: PostureRuleEngine,
        config: AnalysisConfig,
    ) -> Self {
        let (tx, _) = watch::channel(AnalysisUpdate::default());
        Self {
            core: Arc::new(LoopCore {
                source,
                estimator,
                engine,
                exercise: RwLock::new(ExerciseType::Squat),
                tx,
                cancel: RwLock::new(CancellationToken::new()),
                last_frame_id: AtomicU64::new(u64::MAX),
            }),
            config,
            driver: Mutex::new(None),
        }
    }

    /// Open the camera and begin analyzing for the given exercise.
    ///
    /// A device failure is terminal: the error message is published as the
    /// feedback state, no driver task is spawned, and the error is
    /// returned so the host can offer a retry.
    pub async fn start(&self, exercise: ExerciseType) -> Result<(), DeviceError> {
        // A restart must not orphan the running driver: exactly one driver
        // may exist, or two cycles could be in flight at once
        self.halt_driver().await;
        *self.core.exercise.write() = exercise;
        info!(?exercise, "starting analysis loop");

        if let Err(e) = self.core.source.open().await {
            error!(error = %e, "camera unavailable, analysis loop not started");
            self.core.tx.send_replace(AnalysisUpdate {
                pose: None,
                state: AnalysisState::from_device_error(&e.to_string()),
            });
            return Err(e);
        }

        self.spawn_driver();
        Ok(())
    }

    /// Clear a prior device failure and attempt to start again.
    pub async fn retry(&self, exercise: ExerciseType) -> Result<(), DeviceError> {
        self.halt_driver().await;
        *self.core.exercise.write() = exercise;
        info!(?exercise, "retrying camera after device failure");

        if let Err(e) = self.core.source.retry().await {
            self.core.tx.send_replace(AnalysisUpdate {
                pose: None,
                state: AnalysisState::from_device_error(&e.to_string()),
            });
            return Err(e);
        }

        self.spawn_driver();
        Ok(())
    }

    fn spawn_driver(&self) {
        let token = CancellationToken::new();
        *self.core.cancel.write() = token.clone();

        let core = Arc::clone(&self.core);
        // from_secs_f64 keeps the period nonzero at any fps; interval
        // panics on a zero period
        let period = Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            // A long cycle absorbs missed ticks instead of replaying them
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            debug!(period_ms = period.as_millis() as u64, "analysis driver started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => core.tick().await,
                }
            }
            debug!("analysis driver stopped");
        });

        *self.driver.lock() = Some(handle);
    }

    /// Stop the loop and release the camera. Waits for the in-flight
    /// cycle to finish, so no publish happens after this returns.
    pub async fn stop(&self) {
        self.core.cancel.read().cancel();
        self.halt_driver().await;
        self.core.source.close();
        info!("analysis loop stopped");
    }

    /// Cancel and join the current driver task, if any.
    async fn halt_driver(&self) {
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            self.core.cancel.read().cancel();
            if let Err(e) = handle.await {
                error!(error = %e, "analysis driver task failed");
            }
        }
    }

    /// Switch the active exercise. Takes effect on the next cycle.
    pub fn set_exercise(&self, exercise: ExerciseType) {
        info!(?exercise, "switching exercise");
        *self.core.exercise.write() = exercise;
        // Force re-analysis of the current frame under the new rules
        self.last_frame_reset();
    }

    fn last_frame_reset(&self) {
        self.core.last_frame_id.store(u64::MAX, Ordering::Release);
    }

    /// Run one cycle immediately, outside the driver cadence.
    pub async fn tick(&self) {
        self.core.tick().await;
    }

    /// Snapshot of the latest published feedback state.
    pub fn current_state(&self) -> AnalysisState {
        self.core.tx.borrow().state.clone()
    }

    /// Subscribe to published analysis cycles.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisUpdate> {
        self.core.tx.subscribe()
    }

    pub fn exercise(&self) -> ExerciseType {
        *self.core.exercise.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CaptureDevice, SyntheticDevice};
    use crate::config::CameraConfig;
    use crate::estimator::{FailingEstimator, FixedPoseEstimator, NullEstimator};
    use crate::state::FeedbackType;
    use tokio::time::timeout;

    fn build_loop(device: Arc<dyn CaptureDevice>, estimator: Arc<dyn PoseEstimator>) -> AnalysisLoop {
        let source = Arc::new(FrameSource::new(device, CameraConfig::default()));
        AnalysisLoop::new(
            source,
            estimator,
            PostureRuleEngine::default(),
            AnalysisConfig::default(),
        )
    }

    /// Drive cycles until something different from `baseline` is published.
    /// Comparing against a baseline (not against the default) matters when
    /// an error state has already been published before the wait.
    async fn wait_for_change(analysis: &AnalysisLoop, baseline: &AnalysisUpdate) -> AnalysisUpdate {
        timeout(Duration::from_secs(2), async {
            loop {
                analysis.tick().await;
                let update = analysis.core.tx.borrow().clone();
                if &update != baseline {
                    return update;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("analysis state should be published within timeout")
    }

    async fn wait_for_publish(analysis: &AnalysisLoop) -> AnalysisUpdate {
        wait_for_change(analysis, &AnalysisUpdate::default()).await
    }

    fn fast_device() -> Arc<SyntheticDevice> {
        Arc::new(SyntheticDevice::new().with_resolution(64, 48).with_fps(120))
    }

    #[tokio::test]
    async fn test_upright_pose_scores_correct_for_squat() {
        let analysis = build_loop(fast_device(), Arc::new(FixedPoseEstimator::new()));
        analysis.start(ExerciseType::Squat).await.unwrap();

        let update = wait_for_publish(&analysis).await;
        assert_eq!(update.state.score, 85);
        assert_eq!(update.state.feedback_type, FeedbackType::Correct);
        assert_eq!(update.state.feedback.as_deref(), Some("Good form!"));
        assert!(update.pose.is_some());

        analysis.stop().await;
    }

    #[tokio::test]
    async fn test_no_detection_publishes_no_pose_state() {
        let analysis = build_loop(fast_device(), Arc::new(NullEstimator));
        analysis.start(ExerciseType::Pushup).await.unwrap();

        let update = wait_for_publish(&analysis).await;
        assert_eq!(update.state.score, 0);
        assert_eq!(update.state.feedback_type, FeedbackType::Incorrect);
        assert_eq!(
            update.state.feedback.as_deref(),
            Some("No pose detected")
        );
        assert!(update.pose.is_none());

        analysis.stop().await;
    }

    #[tokio::test]
    async fn test_estimation_failure_keeps_previous_state() {
        let analysis = build_loop(fast_device(), Arc::new(FailingEstimator));
        analysis.start(ExerciseType::Squat).await.unwrap();

        // Give frames time to arrive, then drive cycles manually
        tokio::time::sleep(Duration::from_millis(50)).await;
        for _ in 0..5 {
            analysis.tick().await;
        }

        assert_eq!(analysis.current_state(), AnalysisState::default());
        analysis.stop().await;
    }

    #[tokio::test]
    async fn test_device_failure_is_terminal_and_user_facing() {
        let device = Arc::new(
            SyntheticDevice::new().fail_first(u32::MAX, DeviceError::PermissionDenied),
        );
        let analysis = build_loop(device, Arc::new(FixedPoseEstimator::new()));

        let err = analysis.start(ExerciseType::Squat).await.unwrap_err();
        assert_eq!(err, DeviceError::PermissionDenied);

        let state = analysis.current_state();
        assert_eq!(
            state.feedback.as_deref(),
            Some("Camera access denied. Please allow camera permissions.")
        );
        assert_eq!(state.feedback_type, FeedbackType::Incorrect);

        // No driver was spawned; ticks are inert without a stream
        analysis.tick().await;
        assert_eq!(analysis.current_state().score, 0);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let device = Arc::new(
            SyntheticDevice::new()
                .with_resolution(64, 48)
                .with_fps(120)
                .fail_first(1, DeviceError::Busy),
        );
        let analysis = build_loop(device, Arc::new(FixedPoseEstimator::new()));

        assert!(analysis.start(ExerciseType::Squat).await.is_err());
        let error_update = analysis.core.tx.borrow().clone();
        assert_eq!(
            error_update.state.feedback.as_deref(),
            Some("Camera is already in use by another application.")
        );

        // The published error state is the baseline; wait for the publish
        // that supersedes it, not just for any non-default value
        analysis.retry(ExerciseType::Squat).await.unwrap();
        let update = wait_for_change(&analysis, &error_update).await;
        assert_eq!(update.state.score, 85);

        analysis.stop().await;
    }

    #[tokio::test]
    async fn test_restart_replaces_the_driver() {
        let analysis = build_loop(fast_device(), Arc::new(FixedPoseEstimator::new()));
        analysis.start(ExerciseType::Squat).await.unwrap();
        wait_for_publish(&analysis).await;

        // A second start hands the cadence to a single fresh driver; the
        // old one is joined, not orphaned
        analysis.start(ExerciseType::YogaDowndog).await.unwrap();
        let flipped = timeout(Duration::from_secs(2), async {
            loop {
                let state = analysis.current_state();
                if state.feedback_type != FeedbackType::Correct {
                    return state;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("restarted driver should analyze under the new exercise");
        assert_eq!(flipped.feedback.as_deref(), Some("Heels lifting too high"));

        analysis.stop().await;

        // Every driver is joined by stop, so nothing publishes afterwards
        let settled = analysis.core.tx.borrow().clone();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*analysis.core.tx.borrow(), settled);
    }

    #[tokio::test]
    async fn test_cadence_above_one_khz_still_analyzes() {
        let device = Arc::new(SyntheticDevice::new().with_resolution(64, 48).with_fps(1500));
        let config = AnalysisConfig {
            fps: 1500,
            min_pose_score: 0.3,
        };
        let source = Arc::new(FrameSource::new(device, CameraConfig::default()));
        let analysis = AnalysisLoop::new(
            source,
            Arc::new(FixedPoseEstimator::new()),
            PostureRuleEngine::default(),
            config,
        );

        analysis.start(ExerciseType::Squat).await.unwrap();

        // Driven purely by the spawned driver: a sub-millisecond period
        // must tick, not panic inside the task
        let mut updates = analysis.subscribe();
        timeout(Duration::from_secs(2), updates.changed())
            .await
            .expect("driver should publish within timeout")
            .unwrap();
        assert_eq!(analysis.current_state().score, 85);

        analysis.stop().await;
    }

    #[tokio::test]
    async fn test_stop_immediately_after_start_keeps_defaults() {
        let analysis = build_loop(fast_device(), Arc::new(FixedPoseEstimator::new()));
        analysis.start(ExerciseType::Squat).await.unwrap();

        // No cycle has run yet; stopping first means nothing is ever published
        analysis.stop().await;
        assert_eq!(analysis.current_state(), AnalysisState::default());

        analysis.tick().await;
        assert_eq!(analysis.current_state(), AnalysisState::default());
    }

    #[tokio::test]
    async fn test_stop_prevents_further_publishes() {
        let analysis = build_loop(fast_device(), Arc::new(FixedPoseEstimator::new()));
        analysis.start(ExerciseType::Squat).await.unwrap();
        let update = wait_for_publish(&analysis).await;
        analysis.stop().await;

        // Ticks after stop are no-ops even though the loop object lives on
        analysis.tick().await;
        assert_eq!(analysis.current_state(), update.state);
    }

    #[tokio::test]
    async fn test_set_exercise_reanalyzes_current_frame() {
        let analysis = build_loop(fast_device(), Arc::new(FixedPoseEstimator::new()));
        analysis.start(ExerciseType::Squat).await.unwrap();
        let update = wait_for_publish(&analysis).await;
        assert!(update.state.feedback_type == FeedbackType::Correct);

        // Upright is not a valid downdog; the verdict flips on the same frame
        analysis.set_exercise(ExerciseType::YogaDowndog);
        assert_eq!(analysis.exercise(), ExerciseType::YogaDowndog);

        let flipped = timeout(Duration::from_secs(2), async {
            loop {
                analysis.tick().await;
                let state = analysis.current_state();
                if state.feedback_type != FeedbackType::Correct {
                    return state;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("verdict should flip after exercise switch");
        assert_eq!(flipped.feedback.as_deref(), Some("Heels lifting too high"));

        analysis.stop().await;
    }
}
