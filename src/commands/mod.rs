// UI-facing command modules

pub mod ai;
pub mod playback;

// Re-export commonly used items
pub use ai::{AnalysisState, EmotionState, RecommendationState};
pub use playback::PlaybackSession;
