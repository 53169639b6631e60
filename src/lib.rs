// src/lib.rs
//
// Side-by-side technique comparison: sample stills from a reference and a
// subject recording, have a remote motion-analysis service compare them
// phase by phase, and replay both recordings from any phase.

pub mod analysis_client;
pub mod comparison;
pub mod config;
pub mod error;
pub mod frame_extractor;
pub mod media;
pub mod metrics;
pub mod normalizer;
pub mod orchestrator;
pub mod playback;
pub mod session;
pub mod timestamps;
pub mod types;

pub use analysis_client::{AnalysisClient, ComparisonRequest, HttpAnalysisClient};
pub use comparison::{ComparisonResult, Phase, PhaseComparison};
pub use error::{AnalysisServiceError, ComparisonError, MediaError};
pub use frame_extractor::FrameExtractor;
pub use orchestrator::ComparisonOrchestrator;
pub use playback::{PlaybackState, PlaybackSynchronizer, VideoController, ViewScroller};
pub use session::ComparisonSession;
pub use timestamps::TimestampSet;
pub use types::{Config, Side};
