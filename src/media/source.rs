// src/media/source.rs
//
// MediaSource is the only thing the pipeline knows about a recording:
// a label, a duration that becomes available at some point, and the
// ability to open a rendering surface that can seek and capture stills.
//
// A surface is a scoped resource. Backends release whatever they
// allocated for it (decoder handles, scratch directories) in Drop, so
// every exit path of an extraction gives it back.

use crate::error::MediaError;
use async_trait::async_trait;
use base64::Engine;

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Human-readable name used in logs and errors (file name, URL).
    fn label(&self) -> &str;

    /// Resolve the recording's duration, waiting for metadata if needed.
    async fn duration_seconds(&self) -> Result<f64, MediaError>;

    /// Allocate a temporary rendering surface for this source.
    async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, MediaError>;
}

#[async_trait]
pub trait RenderSurface: Send {
    /// Move the surface to `seconds` and return once the seek has settled.
    async fn seek(&mut self, seconds: f64) -> Result<(), MediaError>;

    /// Capture the still currently shown by the surface.
    async fn capture(&mut self) -> Result<CapturedFrame, MediaError>;
}

/// Decoders return nothing for the exact end of a stream, so seeks at or
/// past the end are pulled back by this much.
pub const END_MARGIN_SECS: f64 = 0.05;

/// Position a backend should actually decode for a requested second.
/// The captured frame still reports the requested second.
pub fn decode_position(seconds: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if seconds > d - END_MARGIN_SECS => (d - END_MARGIN_SECS).max(0.0),
        _ => seconds,
    }
}

/// A JPEG still taken at an absolute position in a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub timestamp_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub jpeg_data: Vec<u8>,
}

impl CapturedFrame {
    /// `data:image/jpeg;base64,...` form used on the wire.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.jpeg_data)
        )
    }
}

/// Frames taken at the points of one TimestampSet, in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSet {
    frames: Vec<CapturedFrame>,
}

impl FrameSet {
    pub fn new(frames: Vec<CapturedFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.timestamp_seconds).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.frames.iter().map(|f| f.jpeg_data.len()).sum()
    }
}
