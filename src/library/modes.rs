//! Play modes: shuffle, story, mix, timed challenge and favorites browsing.
//!
//! Each session owns its current combo and talks to the [`LibraryStore`] for
//! settings and favorites. Rendering and animation are left to the host.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::LibraryError;
use crate::library::content::{Category, Combo, ComboItem, ContentGenerator};
use crate::library::store::{Favorite, FavoriteToggle, LibraryStore};

pub const SHARE_FOOTER: &str = "Created with Brainstorm Dice 🐔";

pub const MIX_EMPTY_MESSAGE: &str = "At least one category must be selected";

/// Categories a story always contains.
pub const STORY_CATEGORIES: [Category; 3] = [Category::Character, Category::Setting, Category::Goal];

fn share_block(header: &str, combo: &Combo) -> String {
    format!("{}\n\n{}\n\n{}", header, combo.share_text(), SHARE_FOOTER)
}

/// Keep `selected` in display order.
fn ordered(selected: &BTreeSet<Category>) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|c| selected.contains(c))
        .collect()
}

fn toggle_saved(store: &LibraryStore, combo: Option<&Combo>) -> Result<Option<FavoriteToggle>, LibraryError> {
    match combo {
        Some(combo) => store.toggle_favorite(combo).map(Some),
        None => Ok(None),
    }
}

/// Free roll over the enabled categories.
pub struct ShuffleSession {
    store: LibraryStore,
    generator: ContentGenerator,
    current: Option<Combo>,
}

impl ShuffleSession {
    pub fn new(store: LibraryStore, generator: ContentGenerator) -> Self {
        Self {
            store,
            generator,
            current: None,
        }
    }

    pub fn roll(&mut self) -> &Combo {
        let categories = ordered(&self.store.enabled_categories());
        self.current
            .insert(self.generator.generate_combo(&categories))
    }

    pub fn current(&self) -> Option<&Combo> {
        self.current.as_ref()
    }

    /// Save the current combo, or unsave it if already saved.
    pub fn save(&self) -> Result<Option<FavoriteToggle>, LibraryError> {
        toggle_saved(&self.store, self.current.as_ref())
    }

    pub fn is_favorite(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| self.store.is_favorite(c))
    }

    pub fn share_text(&self) -> Option<String> {
        self.current
            .as_ref()
            .map(|c| share_block("Brainstorm Dice Roll:", c))
    }
}

/// Character, setting and goal, plus an optional twist.
pub struct StorySession {
    store: LibraryStore,
    generator: ContentGenerator,
    combo: Option<Combo>,
    include_twist: bool,
}

impl StorySession {
    pub fn new(store: LibraryStore, generator: ContentGenerator) -> Self {
        let include_twist = store.include_twist_in_story();
        Self {
            store,
            generator,
            combo: None,
            include_twist,
        }
    }

    pub fn include_twist(&self) -> bool {
        self.include_twist
    }

    pub fn combo(&self) -> Option<&Combo> {
        self.combo.as_ref()
    }

    pub fn rebuild(&mut self) -> &Combo {
        let mut categories = STORY_CATEGORIES.to_vec();
        if self.include_twist {
            categories.push(Category::Twist);
        }
        self.combo
            .insert(self.generator.generate_combo(&categories))
    }

    /// Flip and persist the twist setting. An existing story gains or loses
    /// its twist item and becomes a new combo.
    pub fn toggle_twist(&mut self) -> Result<bool, LibraryError> {
        self.include_twist = self.store.toggle_twist_in_story()?;

        if let Some(current) = &self.combo {
            let mut items: Vec<ComboItem> = current
                .items
                .iter()
                .filter(|item| item.category != Category::Twist)
                .cloned()
                .collect();
            if self.include_twist {
                if let Some(value) = self.generator.generate_value(Category::Twist) {
                    items.push(ComboItem::new(Category::Twist, value));
                }
            }
            self.combo = Some(Combo::new(items));
        }
        Ok(self.include_twist)
    }

    pub fn save(&self) -> Result<Option<FavoriteToggle>, LibraryError> {
        toggle_saved(&self.store, self.combo.as_ref())
    }

    pub fn is_favorite(&self) -> bool {
        self.combo
            .as_ref()
            .is_some_and(|c| self.store.is_favorite(c))
    }

    pub fn share_text(&self) -> Option<String> {
        self.combo
            .as_ref()
            .map(|c| share_block("Story Mode Combo:", c))
    }
}

/// Roll over a hand-picked set of categories.
pub struct MixSession {
    store: LibraryStore,
    generator: ContentGenerator,
    selected: BTreeSet<Category>,
    last: Option<Combo>,
}

impl MixSession {
    pub fn new(store: LibraryStore, generator: ContentGenerator) -> Self {
        Self {
            store,
            generator,
            selected: STORY_CATEGORIES.into_iter().collect(),
            last: None,
        }
    }

    pub fn toggle_category(&mut self, category: Category) {
        if !self.selected.remove(&category) {
            self.selected.insert(category);
        }
    }

    pub fn is_selected(&self, category: Category) -> bool {
        self.selected.contains(&category)
    }

    pub fn can_roll(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn validation_message(&self) -> Option<&'static str> {
        if self.can_roll() {
            None
        } else {
            Some(MIX_EMPTY_MESSAGE)
        }
    }

    /// `None` when nothing is selected; the previous combo is kept.
    pub fn roll(&mut self) -> Option<&Combo> {
        if !self.can_roll() {
            return None;
        }
        let combo = self.generator.generate_combo(&ordered(&self.selected));
        Some(&*self.last.insert(combo))
    }

    pub fn last(&self) -> Option<&Combo> {
        self.last.as_ref()
    }

    pub fn save(&self) -> Result<Option<FavoriteToggle>, LibraryError> {
        toggle_saved(&self.store, self.last.as_ref())
    }

    pub fn is_favorite(&self) -> bool {
        self.last
            .as_ref()
            .is_some_and(|c| self.store.is_favorite(c))
    }

    /// e.g. "Character, Goal"
    pub fn selected_text(&self) -> String {
        ordered(&self.selected)
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn share_text(&self) -> Option<String> {
        self.last.as_ref().map(|c| share_block("Mix Mode Combo:", c))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Setup,
    Running,
    Completed,
    GaveUp,
}

impl ChallengeState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::GaveUp)
    }
}

/// Timed writing prompt over all four categories.
pub struct ChallengeSession {
    store: LibraryStore,
    generator: ContentGenerator,
    combo: Combo,
    selected_duration: u32,
    state: ChallengeState,
    time_remaining: u32,
}

impl ChallengeSession {
    /// Timer period.
    pub const TICK: Duration = Duration::from_secs(1);

    pub const DEFAULT_DURATION: u32 = 60;

    pub fn new(store: LibraryStore, generator: ContentGenerator) -> Self {
        let combo = generator.generate_combo(&Category::ALL);
        Self {
            store,
            generator,
            combo,
            selected_duration: Self::DEFAULT_DURATION,
            state: ChallengeState::Setup,
            time_remaining: 0,
        }
    }

    pub fn combo(&self) -> &Combo {
        &self.combo
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn selected_duration(&self) -> u32 {
        self.selected_duration
    }

    pub fn available_durations(&self) -> Vec<u32> {
        self.store.challenge_durations()
    }

    /// Takes effect on the next start.
    pub fn select_duration(&mut self, seconds: u32) {
        self.selected_duration = seconds;
    }

    /// Only valid from setup. Returns whether the challenge started.
    pub fn start(&mut self) -> bool {
        if self.state != ChallengeState::Setup {
            return false;
        }
        self.time_remaining = self.selected_duration;
        self.state = ChallengeState::Running;
        tracing::debug!(seconds = self.selected_duration, "Challenge started");
        true
    }

    /// Advance one second. Reaching zero completes the challenge.
    pub fn tick(&mut self) -> ChallengeState {
        if self.state == ChallengeState::Running {
            self.time_remaining = self.time_remaining.saturating_sub(1);
            if self.time_remaining == 0 {
                self.complete();
            }
        }
        self.state
    }

    pub fn complete(&mut self) {
        if self.state == ChallengeState::Running {
            self.state = ChallengeState::Completed;
        }
    }

    pub fn give_up(&mut self) {
        if self.state == ChallengeState::Running {
            self.state = ChallengeState::GaveUp;
        }
    }

    /// Fresh combo, back to setup.
    pub fn try_another(&mut self) -> &Combo {
        self.combo = self.generator.generate_combo(&Category::ALL);
        self.back_to_setup();
        &self.combo
    }

    pub fn back_to_setup(&mut self) {
        self.state = ChallengeState::Setup;
        self.time_remaining = 0;
    }

    /// Remaining time as `MM:SS`.
    pub fn time_string(&self) -> String {
        format!("{:02}:{:02}", self.time_remaining / 60, self.time_remaining % 60)
    }

    pub fn result_message(&self) -> &'static str {
        match self.state {
            ChallengeState::Completed => "Challenge finished.",
            ChallengeState::GaveUp => "Maybe next time.",
            ChallengeState::Setup | ChallengeState::Running => "",
        }
    }

    pub fn save(&self) -> Result<Option<FavoriteToggle>, LibraryError> {
        toggle_saved(&self.store, Some(&self.combo))
    }

    pub fn is_favorite(&self) -> bool {
        self.store.is_favorite(&self.combo)
    }

    pub fn share_text(&self) -> String {
        let header = format!("Challenge Mode:\nDuration: {}s", self.selected_duration);
        share_block(&header, &self.combo)
    }
}

/// Drive a running challenge once per [`ChallengeSession::TICK`] until it
/// leaves the running state. Resolves to the final state.
pub fn spawn_ticker(session: Arc<Mutex<ChallengeSession>>) -> JoinHandle<ChallengeState> {
    tokio::spawn(async move {
        let period = ChallengeSession::TICK;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            {
                let session = session.lock().await;
                if session.state() != ChallengeState::Running {
                    return session.state();
                }
            }
            interval.tick().await;
            let state = session.lock().await.tick();
            if state != ChallengeState::Running {
                tracing::debug!(?state, "Challenge ended");
                return state;
            }
        }
    })
}

/// Category filter on the favorites list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteFilter {
    #[default]
    All,
    Only(Category),
}

impl FavoriteFilter {
    /// Filter chips in display order.
    pub fn options() -> Vec<FavoriteFilter> {
        std::iter::once(FavoriteFilter::All)
            .chain(Category::ALL.into_iter().map(FavoriteFilter::Only))
            .collect()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(category) => category.name(),
        }
    }

    pub fn matches(self, favorite: &Favorite) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => favorite.combo.has_category(category),
        }
    }
}

/// Apply the category filter and a case-insensitive search over item values
/// and the note. Newest first.
pub fn filter_favorites(favorites: &[Favorite], filter: FavoriteFilter, search: &str) -> Vec<Favorite> {
    let needle = search.to_lowercase();
    let mut matched: Vec<Favorite> = favorites
        .iter()
        .filter(|f| filter.matches(f))
        .filter(|f| {
            if needle.is_empty() {
                return true;
            }
            let values = f
                .combo
                .items
                .iter()
                .map(|item| item.value.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            values.contains(&needle) || f.note.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    matched
}

/// Share text for a saved favorite, with its note and save date.
pub fn favorite_share_text(favorite: &Favorite) -> String {
    let note = if favorite.note.is_empty() {
        String::new()
    } else {
        format!("\n\nNote: {}", favorite.note)
    };
    format!(
        "{}{}\n\nSaved on {}\n{}",
        favorite.combo.share_text(),
        note,
        favorite.date_string(),
        SHARE_FOOTER
    )
}

/// Favorites list state: filter chip plus search text.
pub struct FavoritesBrowser {
    store: LibraryStore,
    pub filter: FavoriteFilter,
    pub search: String,
}

impl FavoritesBrowser {
    pub fn new(store: LibraryStore) -> Self {
        Self {
            store,
            filter: FavoriteFilter::All,
            search: String::new(),
        }
    }

    pub fn visible(&self) -> Vec<Favorite> {
        filter_favorites(&self.store.favorites(), self.filter, &self.search)
    }

    pub fn has_no_favorites(&self) -> bool {
        self.store.favorites().is_empty()
    }

    pub fn has_no_filtered_results(&self) -> bool {
        !self.has_no_favorites() && self.visible().is_empty()
    }

    pub fn update_note(&self, favorite: &Favorite, note: &str) -> Result<(), LibraryError> {
        self.store.update_favorite_note(favorite.id, note)
    }

    pub fn delete(&self, favorite: &Favorite) -> Result<bool, LibraryError> {
        self.store.delete_favorite(favorite.id)
    }
}
