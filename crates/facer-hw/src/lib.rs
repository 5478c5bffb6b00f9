//! facer-hw — Hardware abstraction for still-image capture.
//!
//! Opens a V4L2 camera, lets auto-exposure settle, keeps one frame and
//! writes it to disk as PNG. The device is released as soon as the frame
//! has been read.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, StillCapture, DEFAULT_DEVICE, DEFAULT_WARMUP};
pub use frame::{Frame, FrameError, PixelLayout};
