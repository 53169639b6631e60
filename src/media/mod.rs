// src/media/mod.rs

pub mod encode;
pub mod ffmpeg;
#[cfg(feature = "opencv")]
pub mod opencv_source;
pub mod source;

pub use encode::FrameEncoding;
pub use ffmpeg::{FfmpegSource, FfmpegTools};
#[cfg(feature = "opencv")]
pub use opencv_source::OpenCvSource;
pub use source::{CapturedFrame, FrameSet, MediaSource, RenderSurface};
