//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame, PixelLayout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Device node of the system's default camera.
pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Time to let auto-exposure settle before keeping a frame; shorter
/// waits produce underexposed images on most webcams.
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("failed to write {}: {source}", path.display())]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: frame::FrameError,
    },
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    /// YUYV 4:2:2 packed, converted to RGB.
    Yuyv,
    /// Motion-JPEG, one JPEG image per buffer.
    Mjpg,
    /// 8-bit grayscale.
    Grey,
}

/// V4L2 camera device handle. The device is released on drop.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV at VGA; accept whatever of MJPG/GREY the driver falls back to.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = 640;
        fmt.height = 480;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = if fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpg
        } else if fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, or GREY)"
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
        })
    }

    /// Stream for `warmup`, discarding frames, then decode the next one.
    pub fn capture_after_warmup(&self, warmup: Duration) -> Result<Frame, CameraError> {
        let mut stream =
            MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4).map_err(|e| {
                CameraError::CaptureFailed(format!("failed to create mmap stream: {e}"))
            })?;

        let started = Instant::now();
        let mut discarded = 0usize;
        while started.elapsed() < warmup {
            stream
                .next()
                .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
            discarded += 1;
        }
        tracing::debug!(discarded, "warmup frames discarded");

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let payload = if used > 0 { &buf[..used] } else { buf };
        self.decode(payload, meta.sequence)
    }

    /// Convert a raw buffer to a `Frame` based on the negotiated format.
    fn decode(&self, buf: &[u8], sequence: u32) -> Result<Frame, CameraError> {
        match self.pixel_format {
            PixelFormat::Yuyv => {
                let data = frame::yuyv_to_rgb(buf, self.width, self.height).map_err(|e| {
                    CameraError::CaptureFailed(format!("YUYV conversion failed: {e}"))
                })?;
                Ok(Frame {
                    data,
                    width: self.width,
                    height: self.height,
                    layout: PixelLayout::Rgb,
                    sequence,
                })
            }
            PixelFormat::Mjpg => {
                let (data, width, height) = frame::mjpg_to_rgb(buf)
                    .map_err(|e| CameraError::CaptureFailed(format!("MJPG decode failed: {e}")))?;
                Ok(Frame {
                    data,
                    width,
                    height,
                    layout: PixelLayout::Rgb,
                    sequence,
                })
            }
            PixelFormat::Grey => {
                let pixels = (self.width * self.height) as usize;
                if buf.len() < pixels {
                    return Err(CameraError::CaptureFailed(format!(
                        "GREY buffer too short: expected {pixels}, got {}",
                        buf.len()
                    )));
                }
                Ok(Frame {
                    data: buf[..pixels].to_vec(),
                    width: self.width,
                    height: self.height,
                    layout: PixelLayout::Luma,
                    sequence,
                })
            }
        }
    }
}

/// One-shot still capture: open, warm up, keep one frame, release, write PNG.
#[derive(Debug, Clone)]
pub struct StillCapture {
    pub device_path: String,
    pub warmup: Duration,
}

impl Default for StillCapture {
    fn default() -> Self {
        Self {
            device_path: DEFAULT_DEVICE.to_string(),
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl StillCapture {
    pub fn new(device_path: impl Into<String>, warmup: Duration) -> Self {
        Self {
            device_path: device_path.into(),
            warmup,
        }
    }

    /// Capture a single frame and write it to `path`, overwriting any previous capture.
    pub fn capture_to(&self, path: &Path) -> Result<Frame, CameraError> {
        let frame = {
            let camera = Camera::open(&self.device_path)?;
            camera.capture_after_warmup(self.warmup)?
        };

        if frame.is_dark() {
            tracing::warn!(
                device = %self.device_path,
                brightness = frame.avg_brightness(),
                "captured frame is mostly dark; consider a longer warmup"
            );
        }

        frame.save_png(path).map_err(|source| CameraError::SaveFailed {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            width = frame.width,
            height = frame.height,
            seq = frame.sequence,
            "still captured"
        );
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let result = Camera::open("/dev/facer-no-such-video");
        assert!(matches!(result, Err(CameraError::DeviceNotFound(_))));
    }

    #[test]
    fn test_still_capture_missing_device_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfie.png");
        let capture = StillCapture::new("/dev/facer-no-such-video", Duration::ZERO);
        assert!(capture.capture_to(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_still_capture_defaults() {
        let capture = StillCapture::default();
        assert_eq!(capture.device_path, DEFAULT_DEVICE);
        assert_eq!(capture.warmup, Duration::from_millis(200));
    }
}
