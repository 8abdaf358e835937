//! Sequence playback.
//!
//! [`Playback`] is the pure state machine (visible index, playing flag,
//! rate). [`PlaybackDriver`] owns one and runs the advancing timer as a
//! tokio task, publishing every state change on a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use motion_models::{Sequence, SequenceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Slowest supported rate (frames per second).
pub const MIN_FPS: u32 = 1;
/// Fastest supported rate (frames per second).
pub const MAX_FPS: u32 = 30;
/// Rate used until one is chosen.
pub const DEFAULT_FPS: u32 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Frame index {index} is out of range for a sequence of {len} frames")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Playback rate {0} is outside {MIN_FPS}..={MAX_FPS} frames per second")]
    InvalidRate(u32),
}

/// Observable playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Sequence being played, if any
    pub sequence_id: Option<SequenceId>,
    /// Number of frames in the sequence
    pub len: usize,
    /// Visible frame
    pub index: usize,
    pub playing: bool,
    /// Frames per second
    pub fps: u32,
}

/// Playback state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    sequence_id: Option<SequenceId>,
    len: usize,
    index: usize,
    playing: bool,
    fps: u32,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl Playback {
    /// Empty, paused playback at the given rate (clamped to the supported range).
    pub fn new(fps: u32) -> Self {
        Self {
            sequence_id: None,
            len: 0,
            index: 0,
            playing: false,
            fps: fps.clamp(MIN_FPS, MAX_FPS),
        }
    }

    /// Load a sequence: index resets to 0 and playback pauses.
    pub fn load(&mut self, sequence_id: Option<SequenceId>, len: usize) {
        self.sequence_id = sequence_id;
        self.len = len;
        self.index = 0;
        self.playing = false;
    }

    /// Drop the current sequence.
    pub fn clear(&mut self) {
        self.load(None, 0);
    }

    /// Start advancing. Has no effect without frames.
    pub fn play(&mut self) -> bool {
        if self.len == 0 {
            return false;
        }
        self.playing = true;
        true
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Step forward one frame, wrapping to the first. Pauses first.
    pub fn next(&mut self) {
        self.playing = false;
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    /// Step back one frame, wrapping to the last. Pauses first.
    pub fn previous(&mut self) {
        self.playing = false;
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    /// Jump to a frame. Pauses first, even when the index is rejected.
    pub fn select(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.playing = false;
        if index >= self.len {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.index = index;
        Ok(())
    }

    pub fn set_rate(&mut self, fps: u32) -> Result<(), PlaybackError> {
        if !(MIN_FPS..=MAX_FPS).contains(&fps) {
            return Err(PlaybackError::InvalidRate(fps));
        }
        self.fps = fps;
        Ok(())
    }

    /// Apply one timer tick created for `sequence_id`.
    ///
    /// Returns whether the index moved. Ticks for another sequence, or
    /// arriving while paused, are ignored.
    pub fn tick(&mut self, sequence_id: Option<SequenceId>) -> bool {
        if !self.playing || self.len == 0 || sequence_id != self.sequence_id {
            return false;
        }
        self.index = (self.index + 1) % self.len;
        true
    }

    /// Interval between ticks at the current rate.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn sequence_id(&self) -> Option<SequenceId> {
        self.sequence_id
    }

    pub fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            sequence_id: self.sequence_id,
            len: self.len,
            index: self.index,
            playing: self.playing,
            fps: self.fps,
        }
    }

    /// Identity of the timer this state needs, if any.
    fn timer_key(&self) -> Option<(Option<SequenceId>, u32)> {
        self.playing.then_some((self.sequence_id, self.fps))
    }
}

struct Shared {
    playback: Mutex<Playback>,
    tx: watch::Sender<PlaybackState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Playback> {
        self.playback.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, snapshot: PlaybackState) {
        self.tx.send_replace(snapshot);
    }
}

struct Timer {
    key: (Option<SequenceId>, u32),
    handle: JoinHandle<()>,
}

/// Runs playback against the tokio clock.
///
/// The timer is recreated whenever the sequence or the rate changes while
/// playing, and aborted on pause, on [`PlaybackDriver::stop`] and on drop.
/// Methods that may start a timer must be called within a tokio runtime.
pub struct PlaybackDriver {
    shared: Arc<Shared>,
    timer: Mutex<Option<Timer>>,
}

impl PlaybackDriver {
    pub fn new(fps: u32) -> Self {
        let playback = Playback::new(fps);
        let (tx, _rx) = watch::channel(playback.snapshot());
        Self {
            shared: Arc::new(Shared {
                playback: Mutex::new(playback),
                tx,
            }),
            timer: Mutex::new(None),
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.tx.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().snapshot()
    }

    /// Load a sequence (index 0, paused).
    pub fn load(&self, sequence: &Sequence) {
        self.update(|p| p.load(Some(sequence.id()), sequence.len()));
    }

    /// Unload the sequence.
    pub fn clear(&self) {
        self.update(Playback::clear);
    }

    pub fn play(&self) -> PlaybackState {
        self.update(|p| {
            p.play();
        })
    }

    pub fn pause(&self) -> PlaybackState {
        self.update(Playback::pause)
    }

    pub fn toggle(&self) -> PlaybackState {
        self.update(Playback::toggle)
    }

    pub fn next(&self) -> PlaybackState {
        self.update(Playback::next)
    }

    pub fn previous(&self) -> PlaybackState {
        self.update(Playback::previous)
    }

    pub fn select(&self, index: usize) -> Result<PlaybackState, PlaybackError> {
        let mut result = Ok(());
        let snapshot = self.update(|p| result = p.select(index));
        result.map(|_| snapshot)
    }

    pub fn set_rate(&self, fps: u32) -> Result<PlaybackState, PlaybackError> {
        let mut result = Ok(());
        let snapshot = self.update(|p| result = p.set_rate(fps));
        result.map(|_| snapshot)
    }

    /// Pause and tear down the timer.
    pub fn stop(&self) {
        self.pause();
    }

    /// Apply a state change, publish it and reconcile the timer.
    ///
    /// The timer lock is held throughout and always taken before the
    /// playback lock, so the running timer matches the last published state.
    fn update<F>(&self, change: F) -> PlaybackState
    where
        F: FnOnce(&mut Playback),
    {
        let mut timer = self.lock_timer();
        let (snapshot, key) = {
            let mut playback = self.shared.lock();
            change(&mut playback);
            (playback.snapshot(), playback.timer_key())
        };
        self.shared.publish(snapshot);
        self.sync_timer(&mut timer, key, snapshot);
        snapshot
    }

    fn sync_timer(
        &self,
        timer: &mut Option<Timer>,
        key: Option<(Option<SequenceId>, u32)>,
        snapshot: PlaybackState,
    ) {
        let running = timer.as_ref().filter(|t| !t.handle.is_finished());
        if key.is_some() && running.map(|t| t.key) == key {
            return;
        }

        if let Some(old) = timer.take() {
            old.handle.abort();
            debug!(sequence_id = ?old.key.0, fps = old.key.1, "Playback timer stopped");
        }

        if let Some(key) = key {
            let period = Duration::from_secs_f64(1.0 / snapshot.fps as f64);
            let handle = tokio::spawn(run_timer(Arc::clone(&self.shared), key.0, period));
            debug!(sequence_id = ?key.0, fps = key.1, "Playback timer started");
            *timer = Some(Timer { key, handle });
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<Timer>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        if let Some(old) = self.lock_timer().take() {
            old.handle.abort();
        }
    }
}

async fn run_timer(shared: Arc<Shared>, sequence_id: Option<SequenceId>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);

    loop {
        interval.tick().await;
        let snapshot = {
            let mut playback = shared.lock();
            if !playback.tick(sequence_id) {
                // Stale timer: a newer one (or none) owns playback now
                if !playback.is_playing() || playback.sequence_id() != sequence_id {
                    return;
                }
                continue;
            }
            playback.snapshot()
        };
        shared.publish(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_models::InlineImage;

    fn sequence(len: usize) -> Sequence {
        Sequence::from_images((0..len).map(|_| InlineImage::png("AA==")).collect())
    }

    #[test]
    fn test_navigation_wraps_both_ends() {
        let mut playback = Playback::default();
        playback.load(Some(SequenceId::new()), 3);

        playback.previous();
        assert_eq!(playback.index(), 2);
        playback.next();
        assert_eq!(playback.index(), 0);
        playback.next();
        playback.next();
        playback.next();
        assert_eq!(playback.index(), 0);
    }

    #[test]
    fn test_manual_navigation_pauses() {
        let mut playback = Playback::default();
        playback.load(Some(SequenceId::new()), 5);

        assert!(playback.play());
        playback.next();
        assert!(!playback.is_playing());

        playback.play();
        playback.previous();
        assert!(!playback.is_playing());

        playback.play();
        playback.select(3).unwrap();
        assert!(!playback.is_playing());
        assert_eq!(playback.index(), 3);

        playback.play();
        assert!(playback.select(9).is_err());
        assert!(!playback.is_playing());
        assert_eq!(playback.index(), 3);
    }

    #[test]
    fn test_empty_sequence() {
        let mut playback = Playback::default();
        assert!(!playback.play());
        playback.next();
        playback.previous();
        assert_eq!(playback.index(), 0);
        assert!(!playback.tick(None));
        assert_eq!(
            playback.select(0),
            Err(PlaybackError::IndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_load_resets_index_and_pauses() {
        let mut playback = Playback::default();
        playback.load(Some(SequenceId::new()), 4);
        playback.select(2).unwrap();
        playback.play();

        playback.load(Some(SequenceId::new()), 4);
        assert_eq!(playback.index(), 0);
        assert!(!playback.is_playing());
    }

    #[test]
    fn test_stale_ticks_are_ignored() {
        let old = SequenceId::new();
        let mut playback = Playback::default();
        playback.load(Some(old), 3);
        playback.play();
        assert!(playback.tick(Some(old)));

        let new = SequenceId::new();
        playback.load(Some(new), 3);
        playback.play();
        assert!(!playback.tick(Some(old)));
        assert_eq!(playback.index(), 0);
    }

    #[test]
    fn test_rate_bounds() {
        let mut playback = Playback::default();
        assert_eq!(playback.fps(), 4);
        assert_eq!(playback.period(), Duration::from_millis(250));
        assert_eq!(playback.set_rate(0), Err(PlaybackError::InvalidRate(0)));
        assert_eq!(playback.set_rate(31), Err(PlaybackError::InvalidRate(31)));
        playback.set_rate(30).unwrap();
        assert_eq!(Playback::new(100).fps(), MAX_FPS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_advances_while_playing() {
        let driver = PlaybackDriver::new(4);
        driver.load(&sequence(3));
        driver.play();

        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(driver.state().index, 1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(driver.state().index, 0);

        driver.pause();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(driver.state().index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_manual_step_stops_timer() {
        let driver = PlaybackDriver::new(10);
        driver.load(&sequence(4));
        driver.play();

        let state = driver.next();
        assert!(!state.playing);
        assert_eq!(state.index, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(driver.state().index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_rate_change_restarts_timer() {
        let driver = PlaybackDriver::new(1);
        driver.load(&sequence(10));
        driver.play();

        driver.set_rate(10).unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(driver.state().index, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_new_sequence_resets_and_pauses() {
        let driver = PlaybackDriver::new(4);
        driver.load(&sequence(3));
        driver.play();
        tokio::time::sleep(Duration::from_millis(260)).await;

        let next = sequence(5);
        driver.load(&next);
        let state = driver.state();
        assert_eq!(state.index, 0);
        assert!(!state.playing);
        assert_eq!(state.sequence_id, Some(next.id()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(driver.state().index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_publishes_changes() {
        let driver = PlaybackDriver::new(4);
        let mut rx = driver.subscribe();
        driver.load(&sequence(2));
        driver.select(1).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().index, 1);
    }

    fn timer_running(driver: &PlaybackDriver) -> bool {
        driver
            .lock_timer()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_play_pause_keeps_timer_in_step() {
        let driver = Arc::new(PlaybackDriver::new(30));
        driver.load(&sequence(6));

        for _ in 0..20 {
            let tasks: Vec<_> = (0..8)
                .map(|i| {
                    let driver = Arc::clone(&driver);
                    tokio::spawn(async move {
                        for _ in 0..25 {
                            if i % 2 == 0 {
                                driver.play();
                            } else {
                                driver.pause();
                            }
                            tokio::task::yield_now().await;
                        }
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            assert_eq!(timer_running(&driver), driver.state().playing);
        }

        driver.play();
        assert!(timer_running(&driver));
        let mut rx = driver.subscribe();
        rx.borrow_and_update();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(rx.borrow().playing);

        driver.pause();
        assert!(!timer_running(&driver));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_stop_tears_down_timer() {
        let driver = PlaybackDriver::new(4);
        driver.load(&sequence(3));
        driver.play();
        driver.stop();
        assert!(!timer_running(&driver));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let state = driver.state();
        assert!(!state.playing);
        assert_eq!(state.index, 0);
    }
}
