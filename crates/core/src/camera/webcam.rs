use crate::camera::{CameraError, Frame, FrameSource};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::{info, warn};

/// Indices probed, in order, when no camera index is configured.
pub const PROBE_INDICES: [u32; 5] = [0, 1, 2, 3, 4];

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;
const FRAME_RATE: u32 = 30;

/// Webcam-backed frame source. Construction probes the configured index, or
/// the ordered default list, and stops at the first device that opens.
pub struct WebcamSource {
    camera: Camera,
}

impl WebcamSource {
    pub fn open(index: Option<u32>) -> Result<Self, CameraError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(FRAME_WIDTH, FRAME_HEIGHT),
                FrameFormat::YUYV,
                FRAME_RATE,
            ),
        ));

        let indices: Vec<u32> = match index {
            Some(i) => vec![i],
            None => PROBE_INDICES.to_vec(),
        };

        for &idx in &indices {
            match Camera::new(CameraIndex::Index(idx), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => {
                        info!(index = idx, "camera opened");
                        return Ok(Self { camera });
                    }
                    Err(e) => warn!(index = idx, error = %e, "camera opened but stream failed"),
                },
                Err(e) => warn!(index = idx, error = %e, "camera probe failed"),
            }
        }

        Err(CameraError::NoCamera(indices))
    }
}

impl FrameSource for WebcamSource {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let raw = self
            .camera
            .frame()
            .map_err(|e| CameraError::Read(e.to_string()))?;
        let buffer = raw
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::Read(e.to_string()))?;
        let (width, height) = (buffer.width(), buffer.height());
        // The format request is only a hint; normalize whatever arrived.
        let mut frame =
            Frame::new(buffer.into_raw(), width, height).resized(FRAME_WIDTH, FRAME_HEIGHT)?;
        frame.mirror_horizontal();
        Ok(frame)
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!(error = %e, "error stopping camera stream");
        }
    }
}
