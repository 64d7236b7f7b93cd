//! Story prompt library: content generation, favorites, settings and modes.

pub mod content;
pub mod modes;
pub mod store;

pub use content::{Category, Combo, ComboItem, ContentGenerator, DailySeed};
pub use modes::{
    ChallengeSession, ChallengeState, FavoriteFilter, FavoritesBrowser, MixSession,
    ShuffleSession, StorySession,
};
pub use store::{DailyReveal, Favorite, FavoriteToggle, LibraryStore};
