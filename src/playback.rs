// src/playback.rs
//
// Side-by-side playback for the review screen.
//
// A phase jump positions both players, starts them together, scrolls them
// into view and arms a single auto-pause timer. A later jump supersedes
// the earlier one: its timer task is aborted, and the generation check in
// the task covers a timer that already woke up.
//
// This is a visual cue only. The two players are started in the same
// turn but are not kept frame-aligned while they play.

use crate::types::PlaybackConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub trait VideoController: Send {
    fn set_position(&mut self, seconds: f64);
    fn play(&mut self);
    fn pause(&mut self);
}

pub trait ViewScroller: Send {
    fn scroll_players_into_view(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Seeking,
    Playing,
    AutoPausing,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Seeking => "seeking",
            Self::Playing => "playing",
            Self::AutoPausing => "auto-pausing",
        }
    }
}

struct Players {
    reference: Box<dyn VideoController>,
    subject: Box<dyn VideoController>,
    state: PlaybackState,
    generation: u64,
}

pub struct PlaybackSynchronizer {
    players: Arc<Mutex<Players>>,
    scroller: Box<dyn ViewScroller>,
    auto_pause_delay: Duration,
    auto_pause: Option<JoinHandle<()>>,
}

fn lock(players: &Mutex<Players>) -> MutexGuard<'_, Players> {
    players.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlaybackSynchronizer {
    pub fn new(
        reference: Box<dyn VideoController>,
        subject: Box<dyn VideoController>,
        scroller: Box<dyn ViewScroller>,
        config: &PlaybackConfig,
    ) -> Self {
        Self {
            players: Arc::new(Mutex::new(Players {
                reference,
                subject,
                state: PlaybackState::Idle,
                generation: 0,
            })),
            scroller,
            auto_pause_delay: config.auto_pause_delay(),
            auto_pause: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.players).state
    }

    pub fn auto_pause_delay(&self) -> Duration {
        self.auto_pause_delay
    }

    /// Play both recordings from the given seconds, pausing them after
    /// the auto-pause delay. Must be called from within a tokio runtime.
    pub fn jump_to_phase(&mut self, subject_seconds: f64, reference_seconds: f64) {
        self.abort_timer();

        let generation = {
            let mut players = lock(&self.players);
            players.generation += 1;

            players.state = PlaybackState::Seeking;
            players.subject.set_position(subject_seconds);
            players.reference.set_position(reference_seconds);

            players.subject.play();
            players.reference.play();
            players.state = PlaybackState::Playing;

            players.generation
        };

        self.scroller.scroll_players_into_view();

        info!(
            "▶️ Jumped to subject {:.2}s / reference {:.2}s, pausing in {:?}",
            subject_seconds, reference_seconds, self.auto_pause_delay
        );

        lock(&self.players).state = PlaybackState::AutoPausing;

        let players = Arc::clone(&self.players);
        let delay = self.auto_pause_delay;
        self.auto_pause = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut players = lock(&players);
            if players.generation != generation {
                debug!("Auto-pause for jump #{} superseded", generation);
                return;
            }
            players.subject.pause();
            players.reference.pause();
            players.state = PlaybackState::Idle;
            debug!("⏸️ Auto-paused after jump #{}", generation);
        }));
    }

    /// Drop the pending auto-pause, leaving the players as they are.
    pub fn cancel_pending(&mut self) {
        if self.abort_timer() {
            let mut players = lock(&self.players);
            players.generation += 1;
            players.state = PlaybackState::Idle;
            debug!("Auto-pause cancelled");
        }
    }

    fn abort_timer(&mut self) -> bool {
        match self.auto_pause.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PlaybackSynchronizer {
    fn drop(&mut self) {
        self.abort_timer();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Command, CountingScroller, RecordingPlayer};
    use super::*;
    use pretty_assertions::assert_eq;

    fn synchronizer() -> (
        PlaybackSynchronizer,
        RecordingPlayer,
        RecordingPlayer,
        CountingScroller,
    ) {
        let reference = RecordingPlayer::default();
        let subject = RecordingPlayer::default();
        let scroller = CountingScroller::default();
        let sync = PlaybackSynchronizer::new(
            Box::new(reference.clone()),
            Box::new(subject.clone()),
            Box::new(scroller.clone()),
            &PlaybackConfig::default(),
        );
        (sync, reference, subject, scroller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_plays_then_pauses_after_delay() {
        let (mut sync, reference, subject, scroller) = synchronizer();

        sync.jump_to_phase(7.5, 10.0);

        assert_eq!(sync.state(), PlaybackState::AutoPausing);
        assert_eq!(
            subject.commands(),
            vec![Command::SetPosition(7.5), Command::Play]
        );
        assert_eq!(
            reference.commands(),
            vec![Command::SetPosition(10.0), Command::Play]
        );
        assert_eq!(*scroller.scrolls.lock().unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(subject.pauses(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(subject.pauses(), 1);
        assert_eq!(reference.pauses(), 1);
        assert_eq!(sync.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_jump_supersedes_first_timer() {
        let (mut sync, reference, subject, _scroller) = synchronizer();

        sync.jump_to_phase(7.5, 10.0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        sync.jump_to_phase(15.0, 20.0);

        // Past the first timer's deadline (3 s), before the second's (4 s)
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(subject.pauses(), 0);
        assert_eq!(reference.pauses(), 0);
        assert_eq!(sync.state(), PlaybackState::AutoPausing);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(subject.pauses(), 1);
        assert_eq!(reference.pauses(), 1);
        assert_eq!(
            subject.commands(),
            vec![
                Command::SetPosition(7.5),
                Command::Play,
                Command::SetPosition(15.0),
                Command::Play,
                Command::Pause,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_never_pauses() {
        let (mut sync, reference, subject, _scroller) = synchronizer();

        sync.jump_to_phase(22.5, 30.0);
        sync.cancel_pending();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(subject.pauses(), 0);
        assert_eq!(reference.pauses(), 0);
        assert_eq!(sync.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_synchronizer_aborts_timer() {
        let (mut sync, reference, _subject, _scroller) = synchronizer();

        sync.jump_to_phase(22.5, 30.0);
        drop(sync);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(reference.pauses(), 0);
    }
}
