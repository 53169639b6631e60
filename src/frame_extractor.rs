// src/frame_extractor.rs
//
// Pulls one still per fraction out of a MediaSource.
//
// Extraction is all-or-nothing: the phases downstream are aligned by
// index, so a FrameSet is either complete or not returned at all. The
// rendering surface lives for exactly one call and is dropped on every
// exit path.

use crate::error::MediaError;
use crate::media::{FrameSet, MediaSource};
use crate::timestamps::TimestampSet;
use crate::types::ExtractionConfig;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FrameExtractor {
    metadata_timeout: Duration,
    seek_timeout: Duration,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl FrameExtractor {
    pub fn new(metadata_timeout: Duration, seek_timeout: Duration) -> Self {
        Self {
            metadata_timeout,
            seek_timeout,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.metadata_timeout(), config.seek_timeout())
    }

    /// Wait for the source's duration, bounded by the metadata timeout.
    pub async fn resolve_duration(&self, source: &dyn MediaSource) -> Result<f64, MediaError> {
        let duration = timeout(self.metadata_timeout, source.duration_seconds())
            .await
            .map_err(|_| MediaError::MetadataTimeout {
                timeout: self.metadata_timeout,
            })??;

        if !duration.is_finite() || duration <= 0.0 {
            return Err(MediaError::InvalidDuration(duration));
        }
        Ok(duration)
    }

    pub async fn extract(
        &self,
        source: &dyn MediaSource,
        fractions: &TimestampSet,
    ) -> Result<FrameSet, MediaError> {
        let started = Instant::now();
        let duration = self.resolve_duration(source).await?;
        let seconds = fractions.absolute_seconds(duration);

        debug!(
            "Extracting {} frames from {} ({:.2}s): {:?}",
            seconds.len(),
            source.label(),
            duration,
            seconds
        );

        let mut surface = source.open_surface().await?;
        let mut frames = Vec::with_capacity(seconds.len());

        for &at in &seconds {
            timeout(self.seek_timeout, surface.seek(at))
                .await
                .map_err(|_| MediaError::SeekTimeout {
                    seconds: at,
                    timeout: self.seek_timeout,
                })??;
            frames.push(surface.capture().await?);
        }

        drop(surface);

        info!(
            "📸 Extracted {} frames from {} in {:.0}ms",
            frames.len(),
            source.label(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(FrameSet::new(frames))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory MediaSource used across the crate's tests.

    use crate::error::MediaError;
    use crate::media::{CapturedFrame, MediaSource, RenderSurface};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    pub struct SurfaceCounter {
        pub opened: Arc<AtomicUsize>,
        pub live: Arc<AtomicUsize>,
    }

    impl SurfaceCounter {
        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }
    }

    pub struct FakeSource {
        pub label: String,
        /// None → metadata never arrives
        pub duration: Option<f64>,
        pub metadata_delay: Duration,
        pub seek_delay: Duration,
        /// Zero-based index of the seek that fails
        pub fail_seek_at: Option<usize>,
        /// Zero-based index of the seek that never settles
        pub hang_seek_at: Option<usize>,
        pub surfaces: SurfaceCounter,
        /// Set once the source itself is dropped
        pub released: Arc<AtomicBool>,
    }

    impl FakeSource {
        pub fn new(label: &str, duration: f64) -> Self {
            Self {
                label: label.to_string(),
                duration: Some(duration),
                metadata_delay: Duration::ZERO,
                seek_delay: Duration::ZERO,
                fail_seek_at: None,
                hang_seek_at: None,
                surfaces: SurfaceCounter::default(),
                released: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl Drop for FakeSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        fn label(&self) -> &str {
            &self.label
        }

        async fn duration_seconds(&self) -> Result<f64, MediaError> {
            match self.duration {
                Some(d) => {
                    tokio::time::sleep(self.metadata_delay).await;
                    Ok(d)
                }
                None => std::future::pending().await,
            }
        }

        async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, MediaError> {
            self.surfaces.opened.fetch_add(1, Ordering::SeqCst);
            self.surfaces.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSurface {
                live: self.surfaces.live.clone(),
                seek_delay: self.seek_delay,
                fail_seek_at: self.fail_seek_at,
                hang_seek_at: self.hang_seek_at,
                seeks: 0,
                position: None,
            }))
        }
    }

    struct FakeSurface {
        live: Arc<AtomicUsize>,
        seek_delay: Duration,
        fail_seek_at: Option<usize>,
        hang_seek_at: Option<usize>,
        seeks: usize,
        position: Option<f64>,
    }

    #[async_trait]
    impl RenderSurface for FakeSurface {
        async fn seek(&mut self, seconds: f64) -> Result<(), MediaError> {
            let index = self.seeks;
            self.seeks += 1;
            tokio::time::sleep(self.seek_delay).await;
            if self.hang_seek_at == Some(index) {
                std::future::pending::<()>().await;
            }
            if self.fail_seek_at == Some(index) {
                return Err(MediaError::SeekFailed {
                    seconds,
                    reason: "decoder error".to_string(),
                });
            }
            self.position = Some(seconds);
            Ok(())
        }

        async fn capture(&mut self) -> Result<CapturedFrame, MediaError> {
            let seconds = self.position.ok_or_else(|| MediaError::CaptureFailed {
                seconds: 0.0,
                reason: "not positioned".to_string(),
            })?;
            Ok(CapturedFrame {
                timestamp_seconds: seconds,
                width: 2,
                height: 2,
                jpeg_data: vec![0xff, 0xd8, 0xff, 0xd9],
            })
        }
    }

    impl Drop for FakeSurface {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeSource;
    use super::*;

    fn extractor() -> FrameExtractor {
        FrameExtractor::new(Duration::from_secs(10), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_three_frames_at_rounded_seconds() {
        let set = TimestampSet::standard();
        for duration in [1.0, 7.77, 30.0, 40.0, 123.456, 3600.0] {
            let source = FakeSource::new("clip", duration);
            let frames = extractor().extract(&source, &set).await.unwrap();

            assert_eq!(frames.len(), 3);
            let expected: Vec<f64> = [0.25, 0.5, 0.75]
                .iter()
                .map(|f| (f * duration * 100.0_f64).round() / 100.0)
                .collect();
            assert_eq!(frames.timestamps(), expected);
            assert_eq!(source.surfaces.live(), 0);
        }
    }

    #[tokio::test]
    async fn test_second_seek_failure_returns_no_frames() {
        let mut source = FakeSource::new("clip", 30.0);
        source.fail_seek_at = Some(1);

        let result = extractor().extract(&source, &TimestampSet::standard()).await;

        assert!(matches!(result, Err(MediaError::SeekFailed { seconds, .. }) if seconds == 15.0));
        assert_eq!(source.surfaces.opened(), 1);
        assert_eq!(source.surfaces.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_never_ready_times_out() {
        let mut source = FakeSource::new("clip", 30.0);
        source.duration = None;

        let result = extractor().extract(&source, &TimestampSet::standard()).await;

        assert!(matches!(result, Err(MediaError::MetadataTimeout { .. })));
        assert_eq!(source.surfaces.opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_seek_times_out_and_releases_surface() {
        let mut source = FakeSource::new("clip", 30.0);
        source.hang_seek_at = Some(2);

        let result = extractor().extract(&source, &TimestampSet::standard()).await;

        assert!(
            matches!(result, Err(MediaError::SeekTimeout { seconds, .. }) if seconds == 22.5)
        );
        assert_eq!(source.surfaces.live(), 0);
    }

    #[tokio::test]
    async fn test_rejects_zero_duration() {
        let source = FakeSource::new("clip", 0.0);
        let result = extractor().extract(&source, &TimestampSet::standard()).await;
        assert!(matches!(result, Err(MediaError::InvalidDuration(d)) if d == 0.0));
    }
}
