// Song records and the "Title by Artist" result parser
//
// The model returns recommendations as flat strings. This module turns them
// into structured songs, drops the ones that cannot be parsed, and assigns
// placeholder artwork deterministically by position.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const SEPARATOR: &str = " by ";

/// Artwork shown for a song. Generated songs never have real covers, so this
/// always points at one of the placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumArt {
    pub image_url: String,
    pub image_hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub album_art: AlbumArt,
}

impl Song {
    /// Playback matches songs on title + artist, not on position.
    pub fn same_track(&self, other: &Song) -> bool {
        self.title == other.title && self.artist == other.artist
    }

    pub fn is_parsed(&self) -> bool {
        self.title != UNKNOWN_TITLE
    }

    pub fn song_ref(&self) -> SongRef<'_> {
        SongRef {
            title: &self.title,
            artist: &self.artist,
        }
    }
}

/// Title/artist pair handed to the playlist describer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SongRef<'a> {
    pub title: &'a str,
    pub artist: &'a str,
}

/// (image_url, image_hint)
const PLACEHOLDERS: &[(&str, &str)] = &[
    ("https://picsum.photos/seed/tune1/400/400", "vinyl record"),
    ("https://picsum.photos/seed/tune2/400/400", "concert lights"),
    ("https://picsum.photos/seed/tune3/400/400", "retro cassette"),
    ("https://picsum.photos/seed/tune4/400/400", "neon city"),
    ("https://picsum.photos/seed/tune5/400/400", "acoustic guitar"),
    ("https://picsum.photos/seed/tune6/400/400", "headphones sunset"),
];

pub fn placeholder_count() -> usize {
    PLACEHOLDERS.len()
}

/// Placeholder art for the song at `index`, cycling through the pool.
pub fn placeholder_art(index: usize) -> AlbumArt {
    let (image_url, image_hint) = PLACEHOLDERS[index % PLACEHOLDERS.len()];
    AlbumArt {
        image_url: image_url.to_string(),
        image_hint: image_hint.to_string(),
    }
}

/// Parse one `"Title" by Artist` string.
///
/// Missing halves fall back to the unknown sentinels; callers filter on
/// [`Song::is_parsed`].
pub fn parse_song_string(raw: &str, index: usize) -> Song {
    let mut parts = raw.split(SEPARATOR);

    let title = parts
        .next()
        .map(|t| t.trim().replace('"', ""))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let artist = parts
        .next()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    // No separator at all means the whole string is noise, not a title.
    let title = if raw.contains(SEPARATOR) {
        title
    } else {
        UNKNOWN_TITLE.to_string()
    };

    Song {
        title,
        artist,
        album_art: placeholder_art(index),
    }
}

/// Parse every recommendation, keeping the original index for artwork and
/// dropping entries that did not yield a title.
pub fn parse_recommendations<S: AsRef<str>>(raw: &[S]) -> Vec<Song> {
    raw.iter()
        .enumerate()
        .map(|(index, s)| parse_song_string(s.as_ref(), index))
        .filter(Song::is_parsed)
        .collect()
}

pub const STARTER_DESCRIPTION: &str =
    "A curated selection to get you started. Discover your next favorite song!";

/// Playlist shown before the first recommendation comes back.
pub fn starter_playlist() -> Vec<Song> {
    [
        "\"Bohemian Rhapsody\" by Queen",
        "\"Blinding Lights\" by The Weeknd",
        "\"Dreams\" by Fleetwood Mac",
        "\"Smells Like Teen Spirit\" by Nirvana",
        "\"Levitating\" by Dua Lipa",
        "\"Superstition\" by Stevie Wonder",
    ]
    .iter()
    .enumerate()
    .map(|(index, s)| parse_song_string(s, index))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_title() {
        let song = parse_song_string("\"Bohemian Rhapsody\" by Queen", 0);
        assert_eq!(song.title, "Bohemian Rhapsody");
        assert_eq!(song.artist, "Queen");
        assert_eq!(song.album_art, placeholder_art(0));
    }

    #[test]
    fn test_parse_without_separator_is_filtered() {
        let song = parse_song_string("Just some text from the model", 2);
        assert_eq!(song.title, UNKNOWN_TITLE);
        assert!(!song.is_parsed());

        let songs = parse_recommendations(&["Just some text from the model"]);
        assert!(songs.is_empty());
    }

    #[test]
    fn test_missing_artist_uses_sentinel() {
        let song = parse_song_string("Intro by ", 0);
        assert_eq!(song.title, "Intro");
        assert_eq!(song.artist, UNKNOWN_ARTIST);
        assert!(song.is_parsed());
    }

    #[test]
    fn test_extra_separators_use_first_two_parts() {
        let song = parse_song_string("Stand by Me by Ben E. King", 0);
        assert_eq!(song.title, "Stand");
        assert_eq!(song.artist, "Me");
    }

    #[test]
    fn test_placeholder_cycles() {
        let n = placeholder_count();
        for i in 0..(n * 3) {
            assert_eq!(placeholder_art(i), placeholder_art(i % n));
        }
        assert_ne!(placeholder_art(0), placeholder_art(1));
    }

    #[test]
    fn test_artwork_keeps_original_index_after_filtering() {
        let raw = vec![
            "garbage".to_string(),
            "\"Hey Jude\" by The Beatles".to_string(),
        ];
        let songs = parse_recommendations(&raw);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].album_art, placeholder_art(1));

        // Same input, same output
        assert_eq!(parse_recommendations(&raw), songs);
    }

    #[test]
    fn test_same_track_ignores_artwork() {
        let a = parse_song_string("\"Dreams\" by Fleetwood Mac", 0);
        let b = parse_song_string("\"Dreams\" by Fleetwood Mac", 4);
        assert!(a.same_track(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_starter_playlist_is_fully_parsed() {
        let songs = starter_playlist();
        assert!(!songs.is_empty());
        assert!(songs.iter().all(Song::is_parsed));
    }

    #[test]
    fn test_song_serializes_camel_case() {
        let song = parse_song_string("\"Dreams\" by Fleetwood Mac", 0);
        let json = serde_json::to_string(&song).unwrap();
        assert!(json.contains("\"albumArt\""));
        assert!(json.contains("\"imageUrl\""));
        assert!(json.contains("\"imageHint\""));
    }
}
