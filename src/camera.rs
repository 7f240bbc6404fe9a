// Takes a single still photo from a camera, to practice on instead of a file.
// Visual expectation: the window stays closed for a moment while the camera warms up,
// then opens showing the captured photo.

use makeup_canvas::{Error, RasterBuffer};
use tracing::{debug, info};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};

/// Frames dropped before the still, so auto exposure / white balance can settle.
const WARMUP_FRAMES: usize = 10;

// A small wrapper around nokhwa::Camera so main stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index` near the requested resolution (the driver may pick another).
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req).map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;
        cam.open_stream().map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The stream might choose a slightly different resolution.
        let actual = cam.resolution();
        info!(index, width = actual.width(), height = actual.height(), "camera opened");

        Ok(Self { cam, width: actual.width(), height: actual.height() })
    }

    /// Grab one decoded frame as an opaque RGBA photo.
    fn grab(&mut self) -> Result<RasterBuffer, Error> {
        let frame = self.cam.frame().map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;
        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb_img.dimensions();
        let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for pixel in rgb_img.pixels() {
            data.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]);
        }
        RasterBuffer::from_rgba(w as usize, h as usize, data)
            .ok_or_else(|| Error::CameraFrame("frame size does not match its pixels".into()))
    }

    /// Warm up, then keep the next frame as the practice photo. Closes the stream afterwards.
    pub fn capture_still(mut self) -> Result<RasterBuffer, Error> {
        for i in 0..WARMUP_FRAMES {
            self.grab()?;
            debug!(frame = i, "camera warm-up");
        }
        let photo = self.grab()?;
        if let Err(e) = self.cam.stop_stream() {
            debug!(error = %e, "camera stream did not stop cleanly");
        }
        info!(width = photo.width, height = photo.height, "still captured");
        Ok(photo)
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
