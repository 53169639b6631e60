// src/media/ffmpeg.rs
//
// Default media backend: shells out to ffprobe/ffmpeg.
//
//   duration  → ffprobe -show_entries format=duration
//   surface   → a scratch directory, deleted when the surface drops
//   seek      → ffmpeg -ss <t> -frames:v 1 into the scratch directory
//   capture   → read the decoded still, downscale, JPEG-encode
//
// Child processes are killed if the extraction future is dropped
// mid-seek (fail-fast join, session teardown).

use super::encode::{fit_encoded, FrameEncoding};
use super::source::{decode_position, CapturedFrame, MediaSource, RenderSurface};
use crate::error::MediaError;
use crate::types::MediaConfig;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const SURFACE_FRAME_NAME: &str = "frame.png";

#[derive(Debug, Clone)]
pub struct FfmpegTools {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTools {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Use configured paths, falling back to a PATH lookup.
    pub async fn locate(config: &MediaConfig) -> Result<Self, MediaError> {
        let ffmpeg_path = match &config.ffmpeg_path {
            Some(path) => path.clone(),
            None => which_command("ffmpeg").await?,
        };
        let ffprobe_path = match &config.ffprobe_path {
            Some(path) => path.clone(),
            None => which_command("ffprobe").await?,
        };
        Ok(Self::new(ffmpeg_path, ffprobe_path))
    }

    pub async fn probe_duration(&self, input: &Path) -> Result<f64, MediaError> {
        let label = input.display().to_string();
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::MetadataUnavailable {
                label,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_duration(&output.stdout).map_err(|reason| MediaError::MetadataUnavailable {
            label,
            reason,
        })
    }

    pub async fn decode_frame(
        &self,
        input: &Path,
        seconds: f64,
        output_path: &Path,
    ) -> Result<(), MediaError> {
        let position = format!("{:.3}", seconds);
        let output = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-ss", &position, "-i"])
            .arg(input)
            .args(["-frames:v", "1", "-y"])
            .arg(output_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::SeekFailed {
                seconds,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // ffmpeg exits 0 without writing anything when seeking past the end
        match tokio::fs::metadata(output_path).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(MediaError::SeekFailed {
                seconds,
                reason: "no frame decoded at this position".to_string(),
            }),
        }
    }
}

fn parse_probe_duration(stdout: &[u8]) -> Result<f64, String> {
    let json: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|e| format!("unreadable ffprobe output: {}", e))?;

    json["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| json["format"]["duration"].as_f64())
        .ok_or_else(|| "container reports no duration".to_string())
}

async fn which_command(name: &str) -> Result<String, MediaError> {
    let output = Command::new("which").arg(name).output().await?;

    if !output.status.success() {
        return Err(MediaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found in PATH", name),
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A recording on disk, or a downloaded blob kept alive in a temp file.
pub struct FfmpegSource {
    label: String,
    path: PathBuf,
    tools: FfmpegTools,
    encoding: FrameEncoding,
    duration: OnceCell<f64>,
    /// Backing file for fetched sources; deleted when the source drops.
    blob: Option<NamedTempFile>,
}

impl FfmpegSource {
    pub fn open(path: impl Into<PathBuf>, tools: FfmpegTools, encoding: FrameEncoding) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            path,
            tools,
            encoding,
            duration: OnceCell::new(),
            blob: None,
        }
    }

    /// Download `url` into a temp file owned by the returned source.
    pub async fn fetch(
        client: &reqwest::Client,
        url: &str,
        tools: FfmpegTools,
        encoding: FrameEncoding,
    ) -> Result<Self, MediaError> {
        info!("📥 Fetching video {}", url);

        let fetch_error = |reason: String| MediaError::MetadataUnavailable {
            label: url.to_string(),
            reason,
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let suffix = Path::new(url.split('?').next().unwrap_or(url))
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_else(|| ".mp4".to_string());

        let size = bytes.len();
        let blob = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut blob = tempfile::Builder::new()
                .prefix("tc-blob-")
                .suffix(&suffix)
                .tempfile()?;
            blob.write_all(&bytes)?;
            blob.flush()?;
            Ok(blob)
        })
        .await
        .map_err(|e| fetch_error(e.to_string()))??;

        debug!("Fetched {} bytes into {}", size, blob.path().display());

        Ok(Self {
            label: url.to_string(),
            path: blob.path().to_path_buf(),
            tools,
            encoding,
            duration: OnceCell::new(),
            blob: Some(blob),
        })
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if self.blob.is_some() {
            debug!("Releasing fetched blob for {}", self.label);
        }
    }
}

#[async_trait]
impl MediaSource for FfmpegSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn duration_seconds(&self) -> Result<f64, MediaError> {
        self.duration
            .get_or_try_init(|| self.tools.probe_duration(&self.path))
            .await
            .copied()
    }

    async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, MediaError> {
        let dir = tempfile::Builder::new().prefix("tc-surface-").tempdir()?;
        debug!("Opened surface {} for {}", dir.path().display(), self.label);

        Ok(Box::new(FfmpegSurface {
            tools: self.tools.clone(),
            input: self.path.clone(),
            encoding: self.encoding,
            duration: self.duration.get().copied(),
            dir,
            position: None,
        }))
    }
}

struct FfmpegSurface {
    tools: FfmpegTools,
    input: PathBuf,
    encoding: FrameEncoding,
    /// Known once the extractor has resolved it, which precedes every surface
    duration: Option<f64>,
    dir: TempDir,
    position: Option<f64>,
}

impl FfmpegSurface {
    fn frame_path(&self) -> PathBuf {
        self.dir.path().join(SURFACE_FRAME_NAME)
    }
}

#[async_trait]
impl RenderSurface for FfmpegSurface {
    async fn seek(&mut self, seconds: f64) -> Result<(), MediaError> {
        self.position = None;
        let frame_path = self.frame_path();
        // A stale still from the previous seek must not satisfy this one
        let _ = tokio::fs::remove_file(&frame_path).await;

        let at = decode_position(seconds, self.duration);
        self.tools.decode_frame(&self.input, at, &frame_path).await?;
        self.position = Some(seconds);
        Ok(())
    }

    async fn capture(&mut self) -> Result<CapturedFrame, MediaError> {
        let seconds = self.position.ok_or_else(|| MediaError::CaptureFailed {
            seconds: 0.0,
            reason: "surface has not been positioned".to_string(),
        })?;

        let bytes = tokio::fs::read(self.frame_path()).await?;
        let (jpeg_data, width, height) = fit_encoded(&bytes, self.encoding)
            .map_err(|reason| MediaError::CaptureFailed { seconds, reason })?;

        Ok(CapturedFrame {
            timestamp_seconds: seconds,
            width,
            height,
            jpeg_data,
        })
    }
}

impl Drop for FfmpegSurface {
    fn drop(&mut self) {
        debug!("Released surface {}", self.dir.path().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration_string() {
        let out = br#"{"format": {"duration": "40.040000"}}"#;
        assert_eq!(parse_probe_duration(out).unwrap(), 40.04);
    }

    #[test]
    fn test_parse_probe_duration_missing() {
        let out = br#"{"format": {}}"#;
        assert!(parse_probe_duration(out).is_err());
        assert!(parse_probe_duration(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_locate_reports_missing_tool() {
        let config = MediaConfig {
            ffmpeg_path: Some("/opt/ffmpeg/bin/ffmpeg".to_string()),
            ffprobe_path: None,
            ..MediaConfig::default()
        };
        assert!(which_command("tc-no-such-tool").await.is_err());

        let configured = MediaConfig {
            ffprobe_path: Some("/opt/ffmpeg/bin/ffprobe".to_string()),
            ..config
        };
        let tools = FfmpegTools::locate(&configured).await.unwrap();
        assert_eq!(tools.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(tools.ffprobe_path, "/opt/ffmpeg/bin/ffprobe");
    }

    #[tokio::test]
    async fn test_surface_directory_removed_on_drop() {
        let source = FfmpegSource::open(
            "/nonexistent/clip.mp4",
            FfmpegTools::new("ffmpeg", "ffprobe"),
            FrameEncoding::default(),
        );

        let surface = source.open_surface().await.unwrap();
        let dir = std::env::temp_dir();
        let before: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("tc-surface-"))
            .map(|e| e.path())
            .collect();
        assert!(!before.is_empty());

        drop(surface);
        assert!(before.iter().any(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_capture_before_seek_fails() {
        let source = FfmpegSource::open(
            "/nonexistent/clip.mp4",
            FfmpegTools::new("ffmpeg", "ffprobe"),
            FrameEncoding::default(),
        );
        let mut surface = source.open_surface().await.unwrap();
        assert!(matches!(
            surface.capture().await,
            Err(MediaError::CaptureFailed { .. })
        ));
    }
}
