// src/orchestrator.rs
//
// Runs one technique comparison end to end:
//
//   reference ─ extract ─┐
//                        ├─ (both ok) → ComparisonRequest → AnalysisClient → normalize
//   subject   ─ extract ─┘
//
// Both recordings are sampled at the same fractions, so the absolute
// seconds differ whenever the durations do. The join is fail-fast: the
// first extraction error is returned at once and the other extraction
// is dropped, which releases its surface. Nothing is cached; calling
// compare twice does the work twice.

use crate::analysis_client::{AnalysisClient, ComparisonRequest};
use crate::comparison::{ComparisonResult, Phase};
use crate::error::ComparisonError;
use crate::frame_extractor::FrameExtractor;
use crate::media::MediaSource;
use crate::metrics::ComparisonMetrics;
use crate::normalizer::{normalize, PhaseAnchors};
use crate::timestamps::{TimestampSet, TimestampSetError};
use crate::types::Side;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ComparisonOrchestrator<C> {
    extractor: FrameExtractor,
    client: C,
    fractions: TimestampSet,
    metrics: ComparisonMetrics,
}

impl<C: AnalysisClient> ComparisonOrchestrator<C> {
    /// Phases are anchored to sample points by index, so `fractions` must
    /// hold exactly one fraction per phase.
    pub fn new(
        extractor: FrameExtractor,
        client: C,
        fractions: TimestampSet,
    ) -> Result<Self, TimestampSetError> {
        if fractions.len() != Phase::CANONICAL.len() {
            return Err(TimestampSetError::PhaseCount {
                expected: Phase::CANONICAL.len(),
                actual: fractions.len(),
            });
        }
        Ok(Self {
            extractor,
            client,
            fractions,
            metrics: ComparisonMetrics::new(),
        })
    }

    pub fn with_metrics(mut self, metrics: ComparisonMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &ComparisonMetrics {
        &self.metrics
    }

    pub fn fractions(&self) -> &TimestampSet {
        &self.fractions
    }

    pub async fn compare(
        &self,
        reference: &dyn MediaSource,
        subject: &dyn MediaSource,
    ) -> Result<ComparisonResult, ComparisonError> {
        self.metrics.inc(&self.metrics.comparisons_started);
        info!(
            "🎾 Comparing {} (reference) with {} (subject) at {:?}",
            reference.label(),
            subject.label(),
            self.fractions.fractions()
        );

        let extraction_started = Instant::now();
        let reference_frames = async {
            self.extractor
                .extract(reference, &self.fractions)
                .await
                .map_err(|e| ComparisonError::media(Side::Reference, e))
        };
        let subject_frames = async {
            self.extractor
                .extract(subject, &self.fractions)
                .await
                .map_err(|e| ComparisonError::media(Side::Subject, e))
        };

        let (reference_frames, subject_frames) =
            match tokio::try_join!(reference_frames, subject_frames) {
                Ok(frames) => frames,
                Err(e) => {
                    warn!("❌ Frame extraction failed: {}", e);
                    self.metrics.inc(&self.metrics.media_failures);
                    return Err(e);
                }
            };
        self.metrics
            .set_timing(&self.metrics.extraction_time_us, extraction_started.elapsed());
        self.metrics.add(
            &self.metrics.frames_extracted,
            (reference_frames.len() + subject_frames.len()) as u64,
        );

        let request = ComparisonRequest::new(&reference_frames, &subject_frames);
        debug!(
            "Request carries {} + {} frames ({} bytes of JPEG)",
            reference_frames.len(),
            subject_frames.len(),
            reference_frames.total_bytes() + subject_frames.total_bytes()
        );

        let analysis_started = Instant::now();
        let raw = match self.client.analyze(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("❌ Analysis service failed: {}", e);
                self.metrics.inc(&self.metrics.service_failures);
                return Err(e.into());
            }
        };
        self.metrics
            .set_timing(&self.metrics.analysis_time_us, analysis_started.elapsed());

        let result = normalize(
            raw,
            PhaseAnchors {
                reference: &request.reference_timestamps,
                subject: &request.subject_timestamps,
            },
        );

        self.metrics.inc(&self.metrics.comparisons_succeeded);
        info!(
            "✓ Comparison complete: {} phases, {} recommendations, overall score {:?}",
            result.phases.len(),
            result.recommendations.len(),
            result.overall_score
        );
        Ok(result)
    }
}
