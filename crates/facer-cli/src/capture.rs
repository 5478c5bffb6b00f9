//! Camera-backed [`ImageSource`] for the add/capture commands.

use crate::config::Config;
use async_trait::async_trait;
use facer_core::{CaptureError, CapturedImage, ImageSource};
use facer_hw::StillCapture;
use std::path::PathBuf;

pub struct CameraSource {
    still: StillCapture,
    path: PathBuf,
}

impl CameraSource {
    pub fn from_config(config: &Config) -> Self {
        Self {
            still: StillCapture::new(config.camera_device.clone(), config.warmup()),
            path: config.capture_path.clone(),
        }
    }
}

#[async_trait]
impl ImageSource for CameraSource {
    /// Capture on a blocking thread, then hand back the written file's bytes.
    async fn capture(&self) -> Result<CapturedImage, CaptureError> {
        let still = self.still.clone();
        let path = self.path.clone();

        let path = tokio::task::spawn_blocking(move || still.capture_to(&path).map(|_| path))
            .await
            .map_err(|e| CaptureError(Box::new(e)))?
            .map_err(|e| CaptureError(Box::new(e)))?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CaptureError(Box::new(e)))?;
        Ok(CapturedImage { path, bytes })
    }
}
