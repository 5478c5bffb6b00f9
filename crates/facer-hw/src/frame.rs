//! Frame type and pixel conversion — YUYV/MJPG to RGB, dark detection, PNG output.

use std::path::Path;

/// Channel layout of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// 3 bytes per pixel, R G B.
    Rgb,
    /// 1 byte per pixel (native output of monochrome/IR sensors).
    Luma,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Luma => 1,
        }
    }
}

/// A single decoded camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed pixel data (width * height * bytes_per_pixel bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub sequence: u32,
}

impl Frame {
    /// Grayscale view of the frame (BT.601 luma weights for RGB).
    pub fn luma(&self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Luma => self.data.clone(),
            PixelLayout::Rgb => self
                .data
                .chunks_exact(3)
                .map(|p| ((p[0] as u32 * 77 + p[1] as u32 * 150 + p[2] as u32 * 29) >> 8) as u8)
                .collect(),
        }
    }

    /// Average luma (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        let luma = self.luma();
        if luma.is_empty() {
            return 0.0;
        }
        luma.iter().map(|&b| b as f32).sum::<f32>() / luma.len() as f32
    }

    /// True if the frame is almost entirely black (camera not yet exposed).
    pub fn is_dark(&self) -> bool {
        is_dark_frame(&self.luma(), 0.95)
    }

    /// Encode the frame as PNG at `path`, replacing any existing file.
    pub fn save_png(&self, path: &Path) -> Result<(), FrameError> {
        let expected = self.width as usize * self.height as usize * self.layout.bytes_per_pixel();
        if self.data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: self.data.len(),
            });
        }
        let color = match self.layout {
            PixelLayout::Rgb => image::ColorType::Rgb8,
            PixelLayout::Luma => image::ColorType::L8,
        };
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            color,
            image::ImageFormat::Png,
        )?;
        Ok(())
    }
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 integer coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let u = chunk[1] as i32 - 128;
        let v = chunk[3] as i32 - 128;
        for y in [chunk[0], chunk[2]] {
            let c = 298 * (y as i32 - 16);
            rgb.push(clamp_u8((c + 409 * v + 128) >> 8));
            rgb.push(clamp_u8((c - 100 * u - 208 * v + 128) >> 8));
            rgb.push(clamp_u8((c + 516 * u + 128) >> 8));
        }
    }
    Ok(rgb)
}

/// Decode an MJPG buffer into RGB24, returning (data, width, height).
pub fn mjpg_to_rgb(jpeg: &[u8]) -> Result<(Vec<u8>, u32, u32), FrameError> {
    let img = image::load_from_memory_with_format(jpeg, image::ImageFormat::Jpeg)?.to_rgb8();
    let (w, h) = img.dimensions();
    Ok((img.into_raw(), w, h))
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Check if a grayscale frame is dark.
///
/// Returns true if more than `threshold_pct` of pixels fall in the darkest
/// bucket (0–31).
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < 32).count();
    (dark_count as f32 / gray.len() as f32) > threshold_pct
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("image codec: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_to_rgb_neutral_chroma() {
        // 2x1 image, U=V=128: channels equal, black and white limits of BT.601 range
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_to_rgb_mid_gray() {
        let yuyv = vec![126, 128, 126, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![128; 6]);
    }

    #[test]
    fn test_yuyv_to_rgb_red_chroma() {
        // High V pushes red up and green down
        let yuyv = vec![126, 128, 126, 240];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert!(rgb[0] > rgb[1]);
        assert!(rgb[0] > rgb[2]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        assert!(yuyv_to_rgb(&yuyv, 2, 1).is_err());
    }

    #[test]
    fn test_dark_frame_all_black() {
        assert!(is_dark_frame(&[0u8; 1000], 0.95));
    }

    #[test]
    fn test_dark_frame_normal() {
        assert!(!is_dark_frame(&[128u8; 1000], 0.95));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], 0.95));
    }

    #[test]
    fn test_dark_frame_borderline_bright() {
        // 94% dark, 6% bright → should NOT be dark
        let mut gray = vec![10u8; 940];
        gray.extend(vec![128u8; 60]);
        assert!(!is_dark_frame(&gray, 0.95));
    }

    #[test]
    fn test_rgb_luma_and_brightness() {
        let frame = Frame {
            data: vec![255, 255, 255, 0, 0, 0],
            width: 2,
            height: 1,
            layout: PixelLayout::Rgb,
            sequence: 0,
        };
        assert_eq!(frame.luma(), vec![255, 0]);
        assert!((frame.avg_brightness() - 127.5).abs() < 1e-3);
    }

    #[test]
    fn test_save_png_overwrites_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfie.png");
        std::fs::write(&path, b"stale").unwrap();

        let frame = Frame {
            data: vec![10, 20, 30, 40, 50, 60],
            width: 2,
            height: 1,
            layout: PixelLayout::Rgb,
            sequence: 7,
        };
        frame.save_png(&path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.into_raw(), vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_save_png_rejects_short_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame {
            data: vec![0; 5],
            width: 2,
            height: 1,
            layout: PixelLayout::Rgb,
            sequence: 0,
        };
        assert!(matches!(
            frame.save_png(&dir.path().join("x.png")),
            Err(FrameError::InvalidLength { expected: 6, actual: 5 })
        ));
    }
}
