use crate::config::CameraConfig;
use crate::error::DeviceError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Camera device boundary. A real platform backend implements `open`
/// against the actual capture stack; [`SyntheticDevice`] is the built-in
/// stand-in.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire a live stream. The device may grant a different resolution
    /// than the requested ideal; callers must adapt to the delivered one.
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn CaptureStream>, DeviceError>;
}

/// An acquired capture stream. `close` must release the underlying
/// hardware resource unconditionally and idempotently.
pub trait CaptureStream: Send + Sync {
    /// Latest delivered frame, `None` before the first frame arrives.
    fn latest_frame(&self) -> Option<FrameData>;

    /// The resolution the device actually granted.
    fn resolution(&self) -> (u32, u32);

    fn close(&mut self);
}

/// Lifecycle state of a [`FrameSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Closed,
    Opening,
    Ready,
    Failed(DeviceError),
}

struct SourceInner {
    status: SourceStatus,
    stream: Option<Box<dyn CaptureStream>>,
}

/// Exclusive owner of the camera device handle.
///
/// State machine: Closed -> Opening -> Ready | Failed; Failed -> Opening
/// on `retry`; Ready -> Closed on `close` or drop. The device handle is
/// released on every exit path, including errors during `open`.
pub struct FrameSource {
    device: Arc<dyn CaptureDevice>,
    config: CameraConfig,
    inner: Mutex<SourceInner>,
}

impl FrameSource {
    pub fn new(device: Arc<dyn CaptureDevice>, config: CameraConfig) -> Self {
        Self {
            device,
            config,
            inner: Mutex::new(SourceInner {
                status: SourceStatus::Closed,
                stream: None,
            }),
        }
    }

    pub fn status(&self) -> SourceStatus {
        self.inner.lock().status.clone()
    }

    /// Acquire the camera stream. No-op when already `Ready`.
    pub async fn open(&self) -> Result<(), DeviceError> {
        {
            let mut inner = self.inner.lock();
            if inner.status == SourceStatus::Ready {
                debug!("frame source already open");
                return Ok(());
            }
            inner.status = SourceStatus::Opening;
        }

        info!(
            requested_width = self.config.resolution.0,
            requested_height = self.config.resolution.1,
            fps = self.config.fps,
            facing = %self.config.facing,
            "opening camera stream"
        );

        match self.device.open(&self.config).await {
            Ok(stream) => {
                let granted = stream.resolution();
                if granted != self.config.resolution {
                    warn!(
                        granted_width = granted.0,
                        granted_height = granted.1,
                        "camera granted a different resolution than requested"
                    );
                }

                let mut inner = self.inner.lock();
                if inner.status != SourceStatus::Opening {
                    // Torn down while opening: release the fresh handle
                    // instead of leaking an active capture device.
                    let mut stream = stream;
                    stream.close();
                    debug!("frame source closed during open, released new stream");
                    return Ok(());
                }
                inner.stream = Some(stream);
                inner.status = SourceStatus::Ready;
                info!("camera stream ready");
                Ok(())
            }
            Err(e) => {
                let mut inner = self.inner.lock();
                inner.status = SourceStatus::Failed(e.clone());
                warn!(error = %e, "camera open failed");
                Err(e)
            }
        }
    }

    /// Re-attempt `open` after a prior failure, clearing the failed state
    /// first. Invokes `open` exactly once per call.
    pub async fn retry(&self) -> Result<(), DeviceError> {
        {
            let mut inner = self.inner.lock();
            if let SourceStatus::Failed(ref e) = inner.status {
                debug!(error = %e, "clearing previous device error before retry");
            }
            inner.status = SourceStatus::Closed;
        }
        self.open().await
    }

    /// Latest frame from the stream, `None` before the first frame or
    /// when the source is not `Ready`.
    pub fn current_frame(&self) -> Option<FrameData> {
        let inner = self.inner.lock();
        match inner.status {
            SourceStatus::Ready => inner.stream.as_ref().and_then(|s| s.latest_frame()),
            _ => None,
        }
    }

    /// Resolution the device actually granted, once `Ready`.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        let inner = self.inner.lock();
        inner.stream.as_ref().map(|s| s.resolution())
    }

    /// Release the underlying device. Idempotent; safe on every exit path.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let Some(mut stream) = inner.stream.take() {
            stream.close();
            info!("camera stream released");
        }
        inner.status = SourceStatus::Closed;
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Stand-in capture device generating synthetic frames at a fixed cadence.
///
/// Grants its own native resolution regardless of the requested ideal,
/// which exercises the delivered-vs-requested adaptation path. Can be
/// configured to fail its first N opens, for recovery testing.
pub struct SyntheticDevice {
    native_resolution: (u32, u32),
    fps: u32,
    fail_first: u32,
    fail_error: DeviceError,
    opens: AtomicU32,
}

impl SyntheticDevice {
    pub fn new() -> Self {
        Self {
            native_resolution: (640, 480),
            fps: 30,
            fail_first: 0,
            fail_error: DeviceError::NotFound,
            opens: AtomicU32::new(0),
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.native_resolution = (width, height);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// Fail the first `n` open attempts with the given error.
    pub fn fail_first(mut self, n: u32, error: DeviceError) -> Self {
        self.fail_first = n;
        self.fail_error = error;
        self
    }

    /// Number of open attempts made against this device.
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::Relaxed)
    }
}

impl Default for SyntheticDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for SyntheticDevice {
    async fn open(&self, _config: &CameraConfig) -> Result<Box<dyn CaptureStream>, DeviceError> {
        let attempt = self.opens.fetch_add(1, Ordering::Relaxed);
        if attempt < self.fail_first {
            debug!(attempt, "synthetic device failing open as configured");
            return Err(self.fail_error.clone());
        }

        Ok(Box::new(SyntheticStream::start(
            self.native_resolution,
            self.fps,
        )))
    }
}

struct SyntheticStream {
    resolution: (u32, u32),
    latest: Arc<Mutex<Option<FrameData>>>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl SyntheticStream {
    fn start(resolution: (u32, u32), fps: u32) -> Self {
        let latest = Arc::new(Mutex::new(None));
        let cancel = CancellationToken::new();

        let slot = Arc::clone(&latest);
        let token = cancel.clone();
        let (width, height) = resolution;
        tokio::spawn(async move {
            let counter = AtomicU64::new(0);
            // Nonzero at any fps; interval panics on a zero period
            let mut ticker = interval(Duration::from_secs_f64(1.0 / fps.max(1) as f64));

            debug!(width, height, fps, "synthetic frame producer started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let id = counter.fetch_add(1, Ordering::Relaxed);
                        let frame = synthetic_frame(id, width, height);
                        trace!(id, "generated synthetic frame");
                        *slot.lock() = Some(frame);
                    }
                }
            }
            debug!("synthetic frame producer stopped");
        });

        Self {
            resolution,
            latest,
            cancel,
            closed: AtomicBool::new(false),
        }
    }
}

impl CaptureStream for SyntheticStream {
    fn latest_frame(&self) -> Option<FrameData> {
        self.latest.lock().clone()
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Solid-color RGB24 frame, pattern keyed off the frame id.
fn synthetic_frame(id: u64, width: u32, height: u32) -> FrameData {
    let size = (width * height * 3) as usize;
    let mut data = vec![0u8; size];
    let color = ((id % 256) as u8, 128u8, (255 - id % 256) as u8);
    for chunk in data.chunks_mut(3) {
        chunk[0] = color.0;
        chunk[1] = color.1;
        chunk[2] = color.2;
    }
    FrameData::new(id, SystemTime::now(), data, width, height, FrameFormat::Rgb24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use tokio::time::timeout;

    fn test_config() -> CameraConfig {
        CameraConfig {
            resolution: (1280, 720),
            fps: 60,
            facing: "user".to_string(),
        }
    }

    fn small_device() -> Arc<SyntheticDevice> {
        Arc::new(SyntheticDevice::new().with_resolution(64, 48).with_fps(120))
    }

    #[tokio::test]
    async fn test_open_transitions_to_ready_and_delivers_frames() {
        let source = FrameSource::new(small_device(), test_config());
        assert_eq!(source.status(), SourceStatus::Closed);

        source.open().await.unwrap();
        assert_eq!(source.status(), SourceStatus::Ready);

        timeout(Duration::from_millis(500), async {
            while source.current_frame().is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("frames should arrive within timeout");

        let frame = source.current_frame().unwrap();
        // Keypoints map 1:1 onto delivered, not requested, dimensions
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(source.resolution(), Some((64, 48)));
    }

    #[tokio::test]
    async fn test_device_fps_above_one_khz_delivers_frames() {
        let device = Arc::new(SyntheticDevice::new().with_resolution(64, 48).with_fps(2000));
        let source = FrameSource::new(device, test_config());
        source.open().await.unwrap();

        // A sub-millisecond frame period must produce, not panic
        timeout(Duration::from_millis(500), async {
            while source.current_frame().is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("frames should arrive within timeout");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let source = FrameSource::new(small_device(), test_config());
        source.open().await.unwrap();

        source.close();
        assert_eq!(source.status(), SourceStatus::Closed);
        assert!(source.current_frame().is_none());

        // Second close is a no-op
        source.close();
        assert_eq!(source.status(), SourceStatus::Closed);
    }

    #[tokio::test]
    async fn test_failed_open_surfaces_device_error() {
        let device = Arc::new(
            SyntheticDevice::new().fail_first(u32::MAX, DeviceError::PermissionDenied),
        );
        let source = FrameSource::new(Arc::clone(&device) as Arc<dyn CaptureDevice>, test_config());

        let err = source.open().await.unwrap_err();
        assert_eq!(err, DeviceError::PermissionDenied);
        assert_eq!(
            source.status(),
            SourceStatus::Failed(DeviceError::PermissionDenied)
        );
        assert!(source.current_frame().is_none());
    }

    #[tokio::test]
    async fn test_retry_reattempts_open_exactly_once_per_call() {
        let device = Arc::new(
            SyntheticDevice::new()
                .with_resolution(64, 48)
                .fail_first(2, DeviceError::Busy),
        );
        let source = FrameSource::new(Arc::clone(&device) as Arc<dyn CaptureDevice>, test_config());

        assert!(source.open().await.is_err());
        assert_eq!(device.open_count(), 1);

        // First retry clears the error but the device still fails
        assert!(source.retry().await.is_err());
        assert_eq!(device.open_count(), 2);
        assert_eq!(source.status(), SourceStatus::Failed(DeviceError::Busy));

        // Second retry succeeds
        source.retry().await.unwrap();
        assert_eq!(device.open_count(), 3);
        assert_eq!(source.status(), SourceStatus::Ready);
    }

    #[tokio::test]
    async fn test_open_when_ready_is_a_noop() {
        let device = small_device();
        let source = FrameSource::new(Arc::clone(&device) as Arc<dyn CaptureDevice>, test_config());

        source.open().await.unwrap();
        source.open().await.unwrap();
        assert_eq!(device.open_count(), 1);
    }
}
