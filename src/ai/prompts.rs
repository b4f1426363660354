// Prompt templates for TuneDetective's model capabilities
//
// Each template ends by pinning the exact JSON object the caller decodes, so
// any backend that can follow instructions can sit behind `PromptedModel`.

use crate::song::SongRef;

/// Number of songs asked for per recommendation.
pub const RECOMMENDATION_COUNT: usize = 10;

pub fn recommend_songs(preferences: &str) -> String {
    format!(
        r#"You are a music recommendation expert. Based on the user's description of their music preferences, recommend a list of {count} songs.
The format of each recommendation must be "Song Title" by Artist.

User preferences: {preferences}

Respond with only a JSON object of the form:
{{"recommendations": ["\"Song Title\" by Artist", ...]}}"#,
        count = RECOMMENDATION_COUNT,
        preferences = preferences,
    )
}

pub fn describe_playlist(songs: &[SongRef<'_>], theme: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a music expert. Generate a short description for a playlist.\n\
         The description should be no more than 2 sentences long and capture the overall theme or mood of the playlist.\n",
    );

    if let Some(theme) = theme.filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!(
            "The playlist was generated based on the following theme: {}\n",
            theme
        ));
    }

    prompt.push_str("\nHere are the songs in the playlist:\n");
    for song in songs {
        prompt.push_str(&format!("- {} by {}\n", song.title, song.artist));
    }

    prompt.push_str("\nRespond with only a JSON object of the form:\n{\"description\": \"...\"}");
    prompt
}

pub const EXTRACT_SONG_METADATA: &str = r#"You are a music identification expert. Listen to the attached audio clip and identify the song.

If you cannot identify the song, leave the fields empty.

Respond with only a JSON object of the form:
{"artist": "Artist Name", "title": "Song Title"}"#;

pub const EXTRACT_TEXT_FROM_IMAGE: &str = r#"You are an OCR expert. Extract all text visible in the attached image, preserving its reading order.

If the image contains no text, return an empty string.

Respond with only a JSON object of the form:
{"text": "..."}"#;

pub fn detect_emotion(text: &str) -> String {
    format!(
        r#"You are an expert emotion detector. Analyze the following text and determine the dominant emotion.

Choose one of the following emotions: "happy", "sad", "angry", "neutral", "fear", "surprise".

Text: {text}

Respond with only a JSON object of the form:
{{"emotion": "happy"}}"#,
        text = text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_prompt_mentions_input_and_count() {
        let p = recommend_songs("rainy day jazz");
        assert!(p.contains("User preferences: rainy day jazz"));
        assert!(p.contains("recommend a list of 10 songs"));
        assert!(p.contains("{\"recommendations\""));
    }

    #[test]
    fn test_describe_prompt_lists_songs() {
        let songs = [
            SongRef { title: "Hey Jude", artist: "The Beatles" },
            SongRef { title: "Dreams", artist: "Fleetwood Mac" },
        ];
        let p = describe_playlist(&songs, Some("sad"));
        assert!(p.contains("following theme: sad"));
        assert!(p.contains("- Hey Jude by The Beatles\n"));
        assert!(p.contains("- Dreams by Fleetwood Mac\n"));
    }

    #[test]
    fn test_describe_prompt_without_theme() {
        let p = describe_playlist(&[], None);
        assert!(!p.contains("following theme"));
        let p = describe_playlist(&[], Some("   "));
        assert!(!p.contains("following theme"));
    }

    #[test]
    fn test_emotion_prompt_lists_labels() {
        let p = detect_emotion("I can't stop smiling");
        assert!(p.contains("Text: I can't stop smiling"));
        for label in ["happy", "sad", "angry", "neutral", "fear", "surprise"] {
            assert!(p.contains(label));
        }
    }
}
