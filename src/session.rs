// src/session.rs
//
// One review screen: the two selected recordings, the last comparison
// result and the players that replay it.
//
// The session owns both media sources. Selecting a new recording releases
// the one it replaces; teardown cancels any in-flight comparison, clears
// the auto-pause timer and releases both sources. A cancelled comparison
// never stores its result.

use crate::analysis_client::AnalysisClient;
use crate::comparison::{ComparisonResult, Phase};
use crate::error::ComparisonError;
use crate::media::MediaSource;
use crate::orchestrator::ComparisonOrchestrator;
use crate::playback::PlaybackSynchronizer;
use crate::types::Side;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ComparisonSession {
    reference: Option<Box<dyn MediaSource>>,
    subject: Option<Box<dyn MediaSource>>,
    cancel: CancellationToken,
    last_result: Option<ComparisonResult>,
    playback: Option<PlaybackSynchronizer>,
}

impl Default for ComparisonSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonSession {
    pub fn new() -> Self {
        Self {
            reference: None,
            subject: None,
            cancel: CancellationToken::new(),
            last_result: None,
            playback: None,
        }
    }

    pub fn set_reference(&mut self, source: Box<dyn MediaSource>) {
        self.replace_source(Side::Reference, source);
    }

    pub fn set_subject(&mut self, source: Box<dyn MediaSource>) {
        self.replace_source(Side::Subject, source);
    }

    fn replace_source(&mut self, side: Side, source: Box<dyn MediaSource>) {
        info!("📼 Selected {} video: {}", side, source.label());
        let slot = match side {
            Side::Reference => &mut self.reference,
            Side::Subject => &mut self.subject,
        };
        if let Some(previous) = slot.replace(source) {
            debug!("Releasing previous {} video {}", side, previous.label());
        }
        // Timestamps of the old recording no longer apply
        self.last_result = None;
    }

    pub fn attach_playback(&mut self, synchronizer: PlaybackSynchronizer) {
        if let Some(mut previous) = self.playback.replace(synchronizer) {
            previous.cancel_pending();
        }
    }

    pub fn playback(&self) -> Option<&PlaybackSynchronizer> {
        self.playback.as_ref()
    }

    /// Token that aborts the running comparison when cancelled. Once
    /// cancelled the session accepts no further comparisons.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn last_result(&self) -> Option<&ComparisonResult> {
        self.last_result.as_ref()
    }

    pub async fn run_comparison<C: AnalysisClient>(
        &mut self,
        orchestrator: &ComparisonOrchestrator<C>,
    ) -> Result<&ComparisonResult, ComparisonError> {
        let reference = self
            .reference
            .as_deref()
            .ok_or(ComparisonError::MissingSource(Side::Reference))?;
        let subject = self
            .subject
            .as_deref()
            .ok_or(ComparisonError::MissingSource(Side::Subject))?;

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ComparisonError::Cancelled),
            result = orchestrator.compare(reference, subject) => result,
        };

        match outcome {
            Ok(result) => Ok(&*self.last_result.insert(result)),
            Err(ComparisonError::Cancelled) => {
                warn!("Comparison cancelled, discarding result");
                Err(ComparisonError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    /// Replay both recordings from the given phase. Returns the
    /// `(subject, reference)` seconds that were jumped to.
    pub fn jump_to(&mut self, phase: Phase) -> Result<(f64, f64), ComparisonError> {
        let result = self.last_result.as_ref().ok_or(ComparisonError::NoResult)?;
        let entry = result
            .phase(phase)
            .ok_or_else(|| ComparisonError::UnknownPhase(phase.as_str().to_string()))?;

        let seconds = (
            entry.subject.timestamp_seconds,
            entry.reference.timestamp_seconds,
        );

        match self.playback.as_mut() {
            Some(playback) => playback.jump_to_phase(seconds.0, seconds.1),
            None => debug!("No players attached, {} jump not played", phase),
        }
        Ok(seconds)
    }

    pub fn teardown(mut self) {
        self.cancel.cancel();
        if let Some(playback) = self.playback.as_mut() {
            playback.cancel_pending();
        }
        for (side, source) in [
            (Side::Reference, self.reference.take()),
            (Side::Subject, self.subject.take()),
        ] {
            if let Some(source) = source {
                debug!("Releasing {} video {}", side, source.label());
            }
        }
        info!("Session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_extractor::testing::FakeSource;
    use crate::frame_extractor::FrameExtractor;
    use crate::orchestrator::testing::{FakeClient, PHASES_WITHOUT_TIMESTAMPS};
    use crate::playback::testing::{Command, CountingScroller, RecordingPlayer};
    use crate::playback::PlaybackState;
    use crate::timestamps::TimestampSet;
    use crate::types::PlaybackConfig;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator(client: Arc<FakeClient>) -> ComparisonOrchestrator<Arc<FakeClient>> {
        ComparisonOrchestrator::new(
            FrameExtractor::new(Duration::from_secs(10), Duration::from_secs(5)),
            client,
            TimestampSet::standard(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_source_is_reported_by_side() {
        let orch = orchestrator(Arc::new(FakeClient::new(PHASES_WITHOUT_TIMESTAMPS)));
        let mut session = ComparisonSession::new();
        session.set_reference(Box::new(FakeSource::new("coach.mp4", 40.0)));

        let err = session.run_comparison(&orch).await.unwrap_err();

        assert!(matches!(err, ComparisonError::MissingSource(Side::Subject)));
    }

    #[tokio::test]
    async fn test_superseded_source_is_released() {
        let mut session = ComparisonSession::new();
        let first = FakeSource::new("take1.mp4", 30.0);
        let first_released = first.released.clone();
        let second = FakeSource::new("take2.mp4", 31.0);
        let second_released = second.released.clone();

        session.set_subject(Box::new(first));
        assert!(!first_released.load(Ordering::SeqCst));

        session.set_subject(Box::new(second));
        assert!(first_released.load(Ordering::SeqCst));
        assert!(!second_released.load(Ordering::SeqCst));

        session.teardown();
        assert!(second_released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_after_comparison_drives_both_players() {
        let orch = orchestrator(Arc::new(FakeClient::new(PHASES_WITHOUT_TIMESTAMPS)));
        let mut session = ComparisonSession::new();
        session.set_reference(Box::new(FakeSource::new("coach.mp4", 40.0)));
        session.set_subject(Box::new(FakeSource::new("learner.mp4", 30.0)));

        let reference = RecordingPlayer::default();
        let subject = RecordingPlayer::default();
        session.attach_playback(PlaybackSynchronizer::new(
            Box::new(reference.clone()),
            Box::new(subject.clone()),
            Box::new(CountingScroller::default()),
            &PlaybackConfig::default(),
        ));

        assert!(matches!(
            session.jump_to(Phase::Preparation),
            Err(ComparisonError::NoResult)
        ));

        session.run_comparison(&orch).await.unwrap();
        let seconds = session.jump_to(Phase::SwingAndContact).unwrap();

        assert_eq!(seconds, (15.0, 20.0));
        assert_eq!(
            subject.commands(),
            vec![Command::SetPosition(15.0), Command::Play]
        );
        assert_eq!(
            reference.commands(),
            vec![Command::SetPosition(20.0), Command::Play]
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(
            session.playback().map(|p| p.state()),
            Some(PlaybackState::Idle)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_comparison() {
        let client = Arc::new(FakeClient::new(PHASES_WITHOUT_TIMESTAMPS));
        let orch = orchestrator(client.clone());
        let mut session = ComparisonSession::new();

        let mut reference = FakeSource::new("coach.mp4", 40.0);
        reference.seek_delay = Duration::from_secs(2);
        let surfaces = reference.surfaces.clone();
        session.set_reference(Box::new(reference));
        session.set_subject(Box::new(FakeSource::new("learner.mp4", 30.0)));

        let handle = session.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });

        let err = session.run_comparison(&orch).await.unwrap_err();

        assert!(matches!(err, ComparisonError::Cancelled));
        assert!(session.last_result().is_none());
        assert_eq!(surfaces.opened(), 1);
        assert_eq!(surfaces.live(), 0);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_clears_pending_auto_pause() {
        let orch = orchestrator(Arc::new(FakeClient::new(PHASES_WITHOUT_TIMESTAMPS)));
        let mut session = ComparisonSession::new();
        session.set_reference(Box::new(FakeSource::new("coach.mp4", 40.0)));
        session.set_subject(Box::new(FakeSource::new("learner.mp4", 30.0)));

        let subject = RecordingPlayer::default();
        session.attach_playback(PlaybackSynchronizer::new(
            Box::new(RecordingPlayer::default()),
            Box::new(subject.clone()),
            Box::new(CountingScroller::default()),
            &PlaybackConfig::default(),
        ));

        session.run_comparison(&orch).await.unwrap();
        session.jump_to(Phase::FollowThrough).unwrap();
        session.teardown();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(subject.pauses(), 0);
    }
}
