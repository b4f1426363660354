// Playlist/playback controller
//
// Pure state machine over the current playlist: which song is selected,
// whether it is playing, and how far the simulated preview has progressed.
// No timers live here; `commands::playback` drives `tick` on a schedule.

use serde::Serialize;

use crate::song::{starter_playlist, Song, STARTER_DESCRIPTION};

pub const PROGRESS_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Paused,
    Playing,
}

/// Invariant: `is_playing` implies `current_song.is_some()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_song: Option<Song>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub progress: u8,
}

impl PlaybackState {
    pub fn status(&self) -> PlaybackStatus {
        match (&self.current_song, self.is_playing) {
            (None, _) => PlaybackStatus::Idle,
            (Some(_), false) => PlaybackStatus::Paused,
            (Some(_), true) => PlaybackStatus::Playing,
        }
    }
}

/// An ordered list of songs plus the blurb that came with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub songs: Vec<Song>,
    pub description: String,
}

impl Playlist {
    /// The curated set shown before the first recommendation.
    pub fn starter() -> Self {
        Self {
            songs: starter_playlist(),
            description: STARTER_DESCRIPTION.to_string(),
        }
    }
}

/// Playback state returned to the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub current_song: Option<Song>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub progress: u8,
    pub playlist_length: usize,
}

#[derive(Debug, Clone)]
pub struct Player {
    playlist: Playlist,
    state: PlaybackState,
    step: u8,
}

impl Player {
    pub fn new(playlist: Playlist, step: u8) -> Self {
        Self {
            playlist,
            state: PlaybackState::default(),
            step: step.clamp(1, PROGRESS_MAX),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.state.status(),
            current_song: self.state.current_song.clone(),
            current_index: self.state.current_index,
            is_playing: self.state.is_playing,
            progress: self.state.progress,
            playlist_length: self.playlist.songs.len(),
        }
    }

    /// Swap in a new playlist. Playback always returns to idle, even if the
    /// new list contains the song that was playing.
    pub fn replace_playlist(&mut self, playlist: Playlist) {
        self.playlist = playlist;
        self.state = PlaybackState::default();
    }

    /// Select the song at `index`. Selecting the current song toggles
    /// play/pause; any other song starts playing from the beginning.
    /// Out-of-range indices are ignored.
    pub fn select_song(&mut self, index: usize) {
        let Some(song) = self.playlist.songs.get(index) else {
            return;
        };

        let is_current = self
            .state
            .current_song
            .as_ref()
            .is_some_and(|current| current.same_track(song));

        if is_current {
            self.state.is_playing = !self.state.is_playing;
        } else {
            self.state.current_song = Some(song.clone());
            self.state.current_index = Some(index);
            self.state.is_playing = true;
            self.state.progress = 0;
        }
    }

    /// Play/pause button: starts the first song when nothing is selected.
    pub fn toggle_play_pause(&mut self) {
        if self.state.current_song.is_some() {
            self.state.is_playing = !self.state.is_playing;
        } else if !self.playlist.songs.is_empty() {
            self.select_song(0);
        }
    }

    pub fn next(&mut self) {
        let len = self.playlist.songs.len();
        if let Some(index) = self.state.current_index.filter(|_| len > 0) {
            self.select_song((index + 1) % len);
        }
    }

    pub fn prev(&mut self) {
        let len = self.playlist.songs.len();
        if let Some(index) = self.state.current_index.filter(|_| len > 0) {
            self.select_song((index + len - 1) % len);
        }
    }

    /// Advance the simulated preview by one step. Reaching the end moves on
    /// to the next song and starts its progress from zero.
    pub fn tick(&mut self) {
        if !self.state.is_playing {
            return;
        }

        self.state.progress = self.state.progress.saturating_add(self.step).min(PROGRESS_MAX);
        if self.state.progress >= PROGRESS_MAX {
            self.next();
            self.state.progress = 0;
        }
    }
}
