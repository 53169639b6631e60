// src/media/opencv_source.rs
//
// VideoCapture-backed media source (cargo feature `opencv`).
//
// Each surface owns its own VideoCapture, so two extractions over the
// same file never share decoder state. OpenCV calls block, so they run
// on the blocking pool and the capture is handed back and forth.

use super::encode::{fit_rgb, FrameEncoding};
use super::source::{decode_position, CapturedFrame, MediaSource, RenderSurface};
use crate::error::MediaError;
use async_trait::async_trait;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::debug;

fn cv_err(e: opencv::Error) -> String {
    e.to_string()
}

fn open_capture(path: &PathBuf) -> Result<VideoCapture, String> {
    let path_str = path
        .to_str()
        .ok_or_else(|| format!("non-UTF-8 path {}", path.display()))?;
    let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(cv_err)?;
    if !cap.is_opened().map_err(cv_err)? {
        return Err("failed to open video file".to_string());
    }
    Ok(cap)
}

pub struct OpenCvSource {
    label: String,
    path: PathBuf,
    encoding: FrameEncoding,
    duration: OnceCell<f64>,
}

impl OpenCvSource {
    pub fn open(path: impl Into<PathBuf>, encoding: FrameEncoding) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            path,
            encoding,
            duration: OnceCell::new(),
        }
    }

    async fn probe_duration(&self) -> Result<f64, MediaError> {
        let path = self.path.clone();
        let probed = tokio::task::spawn_blocking(move || -> Result<f64, String> {
            let cap = open_capture(&path)?;
            let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS).map_err(cv_err)?;
            let frames =
                VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT).map_err(cv_err)?;
            if fps <= 0.0 {
                return Err(format!("container reports {} FPS", fps));
            }
            Ok(frames / fps)
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r);

        probed.map_err(|reason| MediaError::MetadataUnavailable {
            label: self.label.clone(),
            reason,
        })
    }
}

#[async_trait]
impl MediaSource for OpenCvSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn duration_seconds(&self) -> Result<f64, MediaError> {
        self.duration
            .get_or_try_init(|| self.probe_duration())
            .await
            .copied()
    }

    async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, MediaError> {
        let path = self.path.clone();
        let cap = tokio::task::spawn_blocking(move || open_capture(&path))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r)
            .map_err(|reason| MediaError::MetadataUnavailable {
                label: self.label.clone(),
                reason,
            })?;

        debug!("Opened VideoCapture surface for {}", self.label);
        Ok(Box::new(OpenCvSurface {
            cap: Some(cap),
            encoding: self.encoding,
            duration: self.duration.get().copied(),
            current: None,
        }))
    }
}

struct OpenCvSurface {
    cap: Option<VideoCapture>,
    encoding: FrameEncoding,
    duration: Option<f64>,
    /// (seconds, RGB bytes, width, height) of the frame decoded by the last seek
    current: Option<(f64, Vec<u8>, u32, u32)>,
}

#[async_trait]
impl RenderSurface for OpenCvSurface {
    async fn seek(&mut self, seconds: f64) -> Result<(), MediaError> {
        self.current = None;
        let mut cap = self.cap.take().ok_or_else(|| MediaError::SeekFailed {
            seconds,
            reason: "capture lost by an earlier failure".to_string(),
        })?;

        let at = decode_position(seconds, self.duration);
        let (cap, decoded) = tokio::task::spawn_blocking(move || {
            let decoded = (|| -> Result<(Vec<u8>, u32, u32), String> {
                cap.set(videoio::CAP_PROP_POS_MSEC, at * 1000.0)
                    .map_err(cv_err)?;
                let mut mat = Mat::default();
                if !VideoCaptureTrait::read(&mut cap, &mut mat).map_err(cv_err)? || mat.empty() {
                    return Err("no frame decoded at this position".to_string());
                }
                let mut rgb = Mat::default();
                imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(cv_err)?;
                let data = rgb.data_bytes().map_err(cv_err)?.to_vec();
                Ok((data, rgb.cols() as u32, rgb.rows() as u32))
            })();
            (cap, decoded)
        })
        .await
        .map_err(|e| MediaError::SeekFailed {
            seconds,
            reason: e.to_string(),
        })?;

        self.cap = Some(cap);
        let (data, width, height) =
            decoded.map_err(|reason| MediaError::SeekFailed { seconds, reason })?;
        self.current = Some((seconds, data, width, height));
        Ok(())
    }

    async fn capture(&mut self) -> Result<CapturedFrame, MediaError> {
        let (seconds, data, width, height) =
            self.current.as_ref().ok_or_else(|| MediaError::CaptureFailed {
                seconds: 0.0,
                reason: "surface has not been positioned".to_string(),
            })?;

        let (jpeg_data, w, h) = fit_rgb(data, *width, *height, self.encoding).ok_or_else(|| {
            MediaError::CaptureFailed {
                seconds: *seconds,
                reason: "JPEG encoding failed".to_string(),
            }
        })?;

        Ok(CapturedFrame {
            timestamp_seconds: *seconds,
            width: w,
            height: h,
            jpeg_data,
        })
    }
}

impl Drop for OpenCvSurface {
    fn drop(&mut self) {
        if let Some(mut cap) = self.cap.take() {
            let _ = VideoCaptureTrait::release(&mut cap);
        }
    }
}
