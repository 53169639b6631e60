// src/error.rs
//
// Error taxonomy for the comparison pipeline.
//
//   MediaError            a source could not be read (metadata, seek, capture)
//   AnalysisServiceError  the motion-analysis service failed or answered badly
//   ComparisonError       what callers of the orchestrator/session see
//
// There is no aggregate "both sides failed" error: the orchestrator joins
// fail-fast and reports the first failure it observes.

use crate::types::Side;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("metadata unavailable for {label}: {reason}")]
    MetadataUnavailable { label: String, reason: String },

    #[error("metadata did not become available within {timeout:?}")]
    MetadataTimeout { timeout: Duration },

    #[error("invalid duration {0}s")]
    InvalidDuration(f64),

    #[error("seek to {seconds:.2}s failed: {reason}")]
    SeekFailed { seconds: f64, reason: String },

    #[error("seek to {seconds:.2}s did not settle within {timeout:?}")]
    SeekTimeout { seconds: f64, timeout: Duration },

    #[error("frame capture at {seconds:.2}s failed: {reason}")]
    CaptureFailed { seconds: f64, reason: String },

    #[error("media i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AnalysisServiceError {
    #[error("could not reach analysis service: {0}")]
    Network(String),

    #[error("analysis service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed analysis response: {0}")]
    MalformedResponse(String),

    #[error("analysis response is missing required field `{0}`")]
    MissingField(&'static str),
}

impl AnalysisServiceError {
    /// The underlying service/transport text, for diagnostics.
    pub fn raw_message(&self) -> Option<&str> {
        match self {
            Self::Network(msg) | Self::MalformedResponse(msg) => Some(msg),
            Self::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AnalysisServiceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("could not load the {side} video: {source}")]
    MediaUnreadable {
        side: Side,
        #[source]
        source: MediaError,
    },

    #[error("comparison failed: {0}")]
    AnalysisService(#[from] AnalysisServiceError),

    #[error("no {0} video selected")]
    MissingSource(Side),

    #[error("comparison cancelled")]
    Cancelled,

    #[error("no comparison result available")]
    NoResult,

    #[error("phase `{0}` not present in the comparison result")]
    UnknownPhase(String),
}

impl ComparisonError {
    pub fn media(side: Side, source: MediaError) -> Self {
        Self::MediaUnreadable { side, source }
    }

    /// Side that failed, when the failure is tied to one recording.
    pub fn side(&self) -> Option<Side> {
        match self {
            Self::MediaUnreadable { side, .. } | Self::MissingSource(side) => Some(*side),
            _ => None,
        }
    }

    /// Short message for the reviewer, distinguishing media from service failures.
    pub fn user_message(&self) -> String {
        match self {
            Self::MediaUnreadable { .. } | Self::MissingSource(_) => {
                "Could not load one of the videos".to_string()
            }
            Self::AnalysisService(e) => match e.raw_message() {
                Some(raw) => format!("Comparison failed: {}", raw),
                None => "Comparison failed".to_string(),
            },
            other => other.to_string(),
        }
    }
}
