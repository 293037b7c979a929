mod webcam;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub use webcam::{WebcamSource, PROBE_INDICES};

const CAPTURE_INTERVAL: Duration = Duration::from_millis(33);
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);
const JPEG_QUALITY: u8 = 80;

/// One captured frame, RGB8, already mirrored.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Flips each pixel row in place so the image reads like a mirror.
    pub fn mirror_horizontal(&mut self) {
        if self.width == 0 {
            return;
        }
        let row_len = self.width as usize * 3;
        for row in self.data.chunks_exact_mut(row_len) {
            let mut left = 0usize;
            let mut right = self.width as usize - 1;
            while left < right {
                for channel in 0..3 {
                    row.swap(left * 3 + channel, right * 3 + channel);
                }
                left += 1;
                right -= 1;
            }
        }
    }

    /// Scales to the given dimensions when the device delivered something
    /// else. Consumers rely on every frame having the same resolution.
    pub fn resized(self, width: u32, height: u32) -> Result<Frame, CameraError> {
        if self.width == width && self.height == height {
            return Ok(self);
        }
        let image = image::RgbImage::from_raw(self.width, self.height, self.data).ok_or_else(
            || CameraError::Read("frame buffer does not match its dimensions".to_string()),
        )?;
        let scaled =
            image::imageops::resize(&image, width, height, image::imageops::FilterType::Triangle);
        Ok(Frame::new(scaled.into_raw(), width, height))
    }

    pub fn to_jpeg(&self) -> Result<Bytes, CameraError> {
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder
            .encode(
                &self.data,
                self.width,
                self.height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(Bytes::from(out))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("no camera could be opened (tried indices {0:?})")]
    NoCamera(Vec<u32>),
    #[error("camera read failed: {0}")]
    Read(String),
    #[error("frame encode failed: {0}")]
    Encode(String),
}

/// A blocking frame producer. Implementations do not need to be thread-safe;
/// the hub below gives each source a dedicated thread.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Owns the capture device on a dedicated thread and shares the most recent
/// frame. Platform camera handles are not shareable across threads, so both
/// the orchestration loop and the presentation surfaces read through this
/// hub instead of touching the device.
#[derive(Clone)]
pub struct CameraHub {
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
}

impl CameraHub {
    /// Opens the source on the capture thread and returns once the open
    /// outcome is known, so a missing camera is still a startup failure.
    pub fn spawn<S, F>(open: F) -> Result<CameraHub, CameraError>
    where
        S: FrameSource + 'static,
        F: FnOnce() -> Result<S, CameraError> + Send + 'static,
    {
        let latest: Arc<Mutex<Option<Frame>>> = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread_latest = latest.clone();
        let thread_stop = stop.clone();
        std::thread::spawn(move || {
            let mut source = match open() {
                Ok(source) => {
                    let _ = ready_tx.send(Ok(()));
                    source
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            info!("capture thread started");
            while !thread_stop.load(Ordering::Relaxed) {
                match source.read_frame() {
                    Ok(frame) => {
                        if let Ok(mut slot) = thread_latest.lock() {
                            *slot = Some(frame);
                        }
                        std::thread::sleep(CAPTURE_INTERVAL);
                    }
                    Err(e) => {
                        warn!(error = %e, "frame read failed, retrying");
                        std::thread::sleep(READ_RETRY_DELAY);
                    }
                }
            }
            info!("capture thread stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(CameraHub { latest, stop }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CameraError::Read(
                "capture thread exited before opening".to_string(),
            )),
        }
    }

    /// Snapshot of the most recent frame, if one has been captured yet.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    /// Signals the capture thread to exit and release the device.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) struct SolidFrames {
        pub value: u8,
    }

    impl FrameSource for SolidFrames {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            Ok(Frame::new(vec![self.value; 2 * 2 * 3], 2, 2))
        }
    }

    #[test]
    fn mirror_swaps_pixels_within_rows() {
        // 2x2 frame: row 0 = red, green; row 1 = blue, white.
        let mut frame = Frame::new(
            vec![
                255, 0, 0, 0, 255, 0, //
                0, 0, 255, 255, 255, 255,
            ],
            2,
            2,
        );
        frame.mirror_horizontal();
        assert_eq!(
            frame.data,
            vec![
                0, 255, 0, 255, 0, 0, //
                255, 255, 255, 0, 0, 255,
            ]
        );
    }

    #[test]
    fn frames_are_scaled_to_the_shared_resolution() {
        let frame = Frame::new(vec![90; 8 * 6 * 3], 8, 6);
        let resized = frame.resized(4, 3).expect("resizes");
        assert_eq!((resized.width, resized.height), (4, 3));
        // Uniform input stays uniform through the filter.
        assert_eq!(resized.data, vec![90; 4 * 3 * 3]);
    }

    #[test]
    fn resize_is_a_noop_at_the_target_resolution() {
        let frame = Frame::new((0..12).collect(), 2, 2);
        let resized = frame.clone().resized(2, 2).expect("passes through");
        assert_eq!(resized.data, frame.data);
    }

    #[test]
    fn resize_rejects_a_buffer_that_does_not_match_its_dimensions() {
        let frame = Frame::new(vec![0; 5], 2, 2);
        assert!(matches!(frame.resized(4, 4), Err(CameraError::Read(_))));
    }

    #[test]
    fn jpeg_encoding_produces_a_jpeg() {
        let frame = Frame::new(vec![128; 4 * 4 * 3], 4, 4);
        let jpeg = frame.to_jpeg().expect("encodes");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn hub_reports_open_failure() {
        let result = CameraHub::spawn(|| -> Result<SolidFrames, CameraError> {
            Err(CameraError::NoCamera(vec![0, 1]))
        });
        assert!(matches!(result, Err(CameraError::NoCamera(_))));
    }

    #[test]
    fn hub_serves_latest_frame_and_stops() {
        let hub = CameraHub::spawn(|| Ok(SolidFrames { value: 7 })).expect("opens");
        let mut frame = None;
        for _ in 0..50 {
            frame = hub.latest_frame();
            if frame.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let frame = frame.expect("a frame arrives");
        assert_eq!(frame.data, vec![7; 12]);
        hub.stop();
    }
}
