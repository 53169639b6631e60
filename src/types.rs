// src/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub extraction: ExtractionConfig,
    pub media: MediaConfig,
    pub playback: PlaybackConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub server_url: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Dump every outgoing request body into `output.dir`
    pub save_requests: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            endpoint: "/api/compare".to_string(),
            timeout_secs: 120,
            save_requests: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub fractions: Vec<f64>,
    pub metadata_timeout_ms: u64,
    pub seek_timeout_ms: u64,
    pub max_frame_width: u32,
    pub jpeg_quality: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fractions: vec![0.25, 0.5, 0.75],
            metadata_timeout_ms: 10_000,
            seek_timeout_ms: 5_000,
            max_frame_width: 640,
            jpeg_quality: 85,
        }
    }
}

impl ExtractionConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    Ffmpeg,
    Opencv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub backend: MediaBackend,
    /// Resolved from PATH when unset
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub fetch_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: MediaBackend::Ffmpeg,
            ffmpeg_path: None,
            ffprobe_path: None,
            fetch_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub auto_pause_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            auto_pause_ms: 3_000,
        }
    }
}

impl PlaybackConfig {
    pub fn auto_pause_delay(&self) -> Duration {
        Duration::from_millis(self.auto_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub save_results: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            save_results: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which of the two recordings a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The coach's recording
    Reference,
    /// The learner's submission
    Subject,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Subject => "subject",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
