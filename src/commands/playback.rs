// Playback session: the player state machine plus its progress timer
//
// The timer is a spawned tokio task ticking the shared `Player`. It is armed
// when playback starts, re-armed when the selected song changes, and aborted
// when playback stops or the session is dropped. The player, the ticker slot
// and the generation counter sit behind one mutex, so a transition and its
// timer adjustment happen atomically. A task checks its generation under that
// same lock before ticking, so a superseded task never ticks the new song.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::PlaybackConfig;
use crate::player::{PlaybackSnapshot, Player, Playlist};
use crate::song::Song;

/// Handle to the running progress task. Dropping it stops the task.
struct Ticker {
    handle: JoinHandle<()>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct SessionState {
    player: Player,
    ticker: Option<Ticker>,
    generation: u64,
}

impl SessionState {
    fn has_live_timer(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    fn cancel_timer(&mut self) {
        self.generation += 1;
        if self.ticker.take().is_some() {
            debug!("[playback] progress timer cancelled");
        }
    }

    fn arm_timer(&mut self, state: Weak<Mutex<SessionState>>, period: Duration) {
        self.generation += 1;
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(state) = state.upgrade() else {
                    break;
                };
                let keep_going = {
                    let mut guard = lock(&state);
                    if guard.generation != generation {
                        debug!("[playback] timer superseded (generation {})", generation);
                        false
                    } else {
                        guard.player.tick();
                        guard.player.is_playing()
                    }
                };
                if !keep_going {
                    break;
                }
            }
        });

        // Replacing the old ticker drops it, which aborts its task.
        self.ticker = Some(Ticker { handle });
        debug!("[playback] progress timer armed (generation {})", generation);
    }
}

/// Playback state shared across requests
pub struct PlaybackSession {
    state: Arc<Mutex<SessionState>>,
    tick_period: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PlaybackSession {
    pub fn new(playlist: Playlist, config: &PlaybackConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                player: Player::new(playlist, config.step),
                ticker: None,
                generation: 0,
            })),
            tick_period: Duration::from_millis(config.tick_ms.max(1)),
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        lock(&self.state).player.snapshot()
    }

    pub fn playlist(&self) -> Playlist {
        lock(&self.state).player.playlist().clone()
    }

    pub fn select(&self, index: usize) -> PlaybackSnapshot {
        self.apply(|p| p.select_song(index))
    }

    pub fn toggle(&self) -> PlaybackSnapshot {
        self.apply(Player::toggle_play_pause)
    }

    pub fn next(&self) -> PlaybackSnapshot {
        self.apply(Player::next)
    }

    pub fn prev(&self) -> PlaybackSnapshot {
        self.apply(Player::prev)
    }

    pub fn replace_playlist(&self, playlist: Playlist) -> PlaybackSnapshot {
        self.apply(move |p| p.replace_playlist(playlist))
    }

    /// Whether a progress task is currently scheduled.
    pub fn has_live_timer(&self) -> bool {
        lock(&self.state).has_live_timer()
    }

    /// Run one transition and bring the timer in line with the new state,
    /// all under the session lock.
    fn apply(&self, transition: impl FnOnce(&mut Player)) -> PlaybackSnapshot {
        let mut state = lock(&self.state);

        let was_playing = state.player.is_playing();
        let before = current_track(&state.player);
        transition(&mut state.player);
        let snapshot = state.player.snapshot();

        let song_changed = snapshot.current_index != before.0
            || !same_song(snapshot.current_song.as_ref(), before.1.as_ref());

        if !snapshot.is_playing {
            state.cancel_timer();
        } else if !was_playing || song_changed || !state.has_live_timer() {
            state.arm_timer(Arc::downgrade(&self.state), self.tick_period);
        }

        snapshot
    }
}

fn current_track(player: &Player) -> (Option<usize>, Option<Song>) {
    let state = player.state();
    (state.current_index, state.current_song.clone())
}

fn same_song(a: Option<&Song>, b: Option<&Song>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_track(b),
        (None, None) => true,
        _ => false,
    }
}
