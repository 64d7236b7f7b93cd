//! Favorites and user settings for the prompt library.
//!
//! Everything lives in the shared [`Preferences`] backend under `brd_*` keys.
//! Unreadable values fall back to defaults instead of failing the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::LibraryError;
use crate::library::content::{Category, Combo, ContentGenerator};
use crate::prefs::Preferences;

pub const FAVORITES_KEY: &str = "brd_favorites";
pub const ONBOARDING_KEY: &str = "brd_onboarding_completed";
pub const ENABLED_CATEGORIES_KEY: &str = "brd_enabled_categories";
pub const CHALLENGE_DURATIONS_KEY: &str = "brd_challenge_durations";
pub const INCLUDE_TWIST_KEY: &str = "brd_include_twist_story";
pub const LAST_DAILY_DATE_KEY: &str = "brd_last_daily_date";
pub const DAILY_COMBO_KEY: &str = "brd_daily_combo";
pub const DAILY_REVEALED_KEY: &str = "brd_daily_revealed_date";

/// Challenge lengths in seconds offered on first run.
pub const DEFAULT_CHALLENGE_DURATIONS: [u32; 4] = [15, 30, 60, 120];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A saved combo with an editable note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub combo: Combo,
    pub note: String,
    pub saved_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(combo: Combo, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            combo,
            note: note.into(),
            saved_at: Utc::now(),
        }
    }

    /// Short save date such as "Oct 17".
    pub fn date_string(&self) -> String {
        self.saved_at.format("%b %-d").to_string()
    }
}

/// Outcome of [`LibraryStore::toggle_favorite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteToggle {
    Saved(Favorite),
    Removed,
}

#[derive(Clone)]
pub struct LibraryStore {
    prefs: Arc<dyn Preferences>,
}

impl LibraryStore {
    pub fn new(prefs: Arc<dyn Preferences>) -> Self {
        Self { prefs }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.prefs.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LibraryError> {
        let value = serde_json::to_value(value).map_err(crate::error::StoreError::from)?;
        self.prefs.set(key, value)?;
        Ok(())
    }

    // Favorites

    /// Saved favorites in insertion order.
    pub fn favorites(&self) -> Vec<Favorite> {
        self.read(FAVORITES_KEY).unwrap_or_default()
    }

    pub fn save_favorite(
        &self,
        combo: Combo,
        note: impl Into<String>,
    ) -> Result<Favorite, LibraryError> {
        let favorite = Favorite::new(combo, note);
        let mut favorites = self.favorites();
        favorites.push(favorite.clone());
        self.write(FAVORITES_KEY, &favorites)?;
        tracing::debug!(id = %favorite.id, "Saved favorite");
        Ok(favorite)
    }

    pub fn update_favorite_note(&self, id: Uuid, note: impl Into<String>) -> Result<(), LibraryError> {
        let mut favorites = self.favorites();
        let favorite = favorites
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(LibraryError::FavoriteNotFound { id })?;
        favorite.note = note.into();
        self.write(FAVORITES_KEY, &favorites)
    }

    /// Returns whether anything was deleted.
    pub fn delete_favorite(&self, id: Uuid) -> Result<bool, LibraryError> {
        self.retain_favorites(|f| f.id != id)
    }

    /// Remove every favorite holding `combo`.
    pub fn remove_favorite(&self, combo: &Combo) -> Result<bool, LibraryError> {
        self.retain_favorites(|f| f.combo.id != combo.id)
    }

    pub fn is_favorite(&self, combo: &Combo) -> bool {
        self.favorites().iter().any(|f| f.combo.id == combo.id)
    }

    pub fn toggle_favorite(&self, combo: &Combo) -> Result<FavoriteToggle, LibraryError> {
        if self.is_favorite(combo) {
            self.remove_favorite(combo)?;
            Ok(FavoriteToggle::Removed)
        } else {
            self.save_favorite(combo.clone(), "").map(FavoriteToggle::Saved)
        }
    }

    fn retain_favorites(&self, keep: impl Fn(&Favorite) -> bool) -> Result<bool, LibraryError> {
        let mut favorites = self.favorites();
        let before = favorites.len();
        favorites.retain(|f| keep(f));
        if favorites.len() == before {
            return Ok(false);
        }
        self.write(FAVORITES_KEY, &favorites)?;
        Ok(true)
    }

    // Onboarding

    pub fn has_completed_onboarding(&self) -> bool {
        self.prefs.get_bool(ONBOARDING_KEY)
    }

    pub fn complete_onboarding(&self) -> Result<(), LibraryError> {
        self.prefs.set(ONBOARDING_KEY, Value::Bool(true))?;
        Ok(())
    }

    // Categories

    /// Enabled categories; all of them when nothing usable is stored.
    pub fn enabled_categories(&self) -> BTreeSet<Category> {
        let stored: Option<Vec<String>> = self.read(ENABLED_CATEGORIES_KEY);
        let enabled: BTreeSet<Category> = stored
            .unwrap_or_default()
            .iter()
            .filter_map(|name| Category::parse(name))
            .collect();
        if enabled.is_empty() {
            Category::ALL.into_iter().collect()
        } else {
            enabled
        }
    }

    pub fn is_category_enabled(&self, category: Category) -> bool {
        self.enabled_categories().contains(&category)
    }

    /// Flip one category. The last enabled category stays on.
    pub fn toggle_category(&self, category: Category) -> Result<BTreeSet<Category>, LibraryError> {
        let mut enabled = self.enabled_categories();
        if enabled.contains(&category) {
            if enabled.len() == 1 {
                return Ok(enabled);
            }
            enabled.remove(&category);
        } else {
            enabled.insert(category);
        }
        let names: Vec<&str> = enabled.iter().map(|c| c.name()).collect();
        self.write(ENABLED_CATEGORIES_KEY, &names)?;
        Ok(enabled)
    }

    // Challenge durations

    pub fn challenge_durations(&self) -> Vec<u32> {
        self.read::<Vec<u32>>(CHALLENGE_DURATIONS_KEY)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_CHALLENGE_DURATIONS.to_vec())
    }

    pub fn save_challenge_durations(&self, durations: Vec<u32>) -> Result<(), LibraryError> {
        if durations.is_empty() {
            return Err(LibraryError::InvalidDurations {
                reason: "at least one duration is required".to_string(),
            });
        }
        if durations.contains(&0) {
            return Err(LibraryError::InvalidDurations {
                reason: "durations must be positive".to_string(),
            });
        }
        self.write(CHALLENGE_DURATIONS_KEY, &durations)
    }

    // Story settings

    pub fn include_twist_in_story(&self) -> bool {
        self.prefs.get_bool(INCLUDE_TWIST_KEY)
    }

    /// Returns the new value.
    pub fn toggle_twist_in_story(&self) -> Result<bool, LibraryError> {
        let next = !self.include_twist_in_story();
        self.prefs.set(INCLUDE_TWIST_KEY, Value::Bool(next))?;
        Ok(next)
    }

    // Daily combo

    /// The combo of the day, generated on the first call for `today` and
    /// replayed from storage afterwards.
    pub fn daily_combo(
        &self,
        today: NaiveDate,
        generator: &ContentGenerator,
    ) -> Result<Combo, LibraryError> {
        if self.read_date(LAST_DAILY_DATE_KEY) == Some(today) {
            if let Some(combo) = self.read::<Combo>(DAILY_COMBO_KEY) {
                return Ok(combo);
            }
        }

        let combo = generator.generate_daily_combo(today);
        let encoded = serde_json::to_value(&combo).map_err(crate::error::StoreError::from)?;
        self.prefs.apply(vec![
            (DAILY_COMBO_KEY.to_string(), Some(encoded)),
            (
                LAST_DAILY_DATE_KEY.to_string(),
                Some(Value::String(today.format(DATE_FORMAT).to_string())),
            ),
        ])?;
        tracing::debug!(%today, "Generated daily combo");
        Ok(combo)
    }

    fn read_date(&self, key: &str) -> Option<NaiveDate> {
        let raw = self.prefs.get_string(key)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok()
    }
}

/// Once-per-day reveal of the daily combo.
#[derive(Clone)]
pub struct DailyReveal {
    store: LibraryStore,
    generator: ContentGenerator,
}

impl DailyReveal {
    pub fn new(store: LibraryStore, generator: ContentGenerator) -> Self {
        Self { store, generator }
    }

    pub fn is_revealed(&self, today: NaiveDate) -> bool {
        self.store.read_date(DAILY_REVEALED_KEY) == Some(today)
    }

    /// The revealed combo, or `None` while today's combo is still hidden.
    pub fn current(&self, today: NaiveDate) -> Result<Option<Combo>, LibraryError> {
        if !self.is_revealed(today) {
            return Ok(None);
        }
        self.store.daily_combo(today, &self.generator).map(Some)
    }

    /// Reveal today's combo. Repeated calls return the same combo.
    pub fn reveal(&self, today: NaiveDate) -> Result<Combo, LibraryError> {
        let combo = self.store.daily_combo(today, &self.generator)?;
        if !self.is_revealed(today) {
            self.store.prefs.set(
                DAILY_REVEALED_KEY,
                Value::String(today.format(DATE_FORMAT).to_string()),
            )?;
        }
        Ok(combo)
    }

    /// Banner heading such as "October 17".
    pub fn date_label(today: NaiveDate) -> String {
        today.format("%B %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::content::ComboItem;
    use crate::prefs::MemoryPreferences;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> (Arc<MemoryPreferences>, LibraryStore) {
        let prefs = Arc::new(MemoryPreferences::new());
        (prefs.clone(), LibraryStore::new(prefs))
    }

    fn combo() -> Combo {
        Combo::new(vec![ComboItem::new(Category::Character, "a shy robot")])
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn favorites_save_update_delete() {
        let (_, store) = store();
        let saved = store.save_favorite(combo(), "first draft").unwrap();
        assert_eq!(store.favorites().len(), 1);

        store.update_favorite_note(saved.id, "revised").unwrap();
        assert_eq!(store.favorites()[0].note, "revised");

        assert!(store.delete_favorite(saved.id).unwrap());
        assert!(!store.delete_favorite(saved.id).unwrap());
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn updating_unknown_favorite_fails() {
        let (_, store) = store();
        let id = Uuid::new_v4();
        let err = store.update_favorite_note(id, "x").unwrap_err();
        assert!(matches!(err, LibraryError::FavoriteNotFound { id: missing } if missing == id));
    }

    #[test]
    fn toggle_favorite_round_trips() {
        let (_, store) = store();
        let combo = combo();

        assert!(matches!(
            store.toggle_favorite(&combo).unwrap(),
            FavoriteToggle::Saved(_)
        ));
        assert!(store.is_favorite(&combo));

        assert_eq!(store.toggle_favorite(&combo).unwrap(), FavoriteToggle::Removed);
        assert!(!store.is_favorite(&combo));
    }

    #[test]
    fn unreadable_favorites_read_as_empty() {
        let (prefs, store) = store();
        prefs.set(FAVORITES_KEY, json!("garbage")).unwrap();
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn onboarding_flag_persists() {
        let (prefs, store) = store();
        assert!(!store.has_completed_onboarding());
        store.complete_onboarding().unwrap();
        assert!(LibraryStore::new(prefs).has_completed_onboarding());
    }

    #[test]
    fn last_category_cannot_be_disabled() {
        let (_, store) = store();
        assert_eq!(store.enabled_categories().len(), 4);

        store.toggle_category(Category::Character).unwrap();
        store.toggle_category(Category::Setting).unwrap();
        store.toggle_category(Category::Goal).unwrap();
        let remaining = store.toggle_category(Category::Twist).unwrap();

        assert_eq!(remaining.into_iter().collect::<Vec<_>>(), vec![Category::Twist]);
        assert!(store.is_category_enabled(Category::Twist));

        store.toggle_category(Category::Goal).unwrap();
        assert!(store.is_category_enabled(Category::Goal));
    }

    #[test]
    fn categories_persist_by_name() {
        let (prefs, store) = store();
        store.toggle_category(Category::Twist).unwrap();
        assert_eq!(
            prefs.get(ENABLED_CATEGORIES_KEY),
            Some(json!(["Character", "Setting", "Goal"]))
        );
    }

    #[test]
    fn durations_default_and_validate() {
        let (_, store) = store();
        assert_eq!(store.challenge_durations(), vec![15, 30, 60, 120]);

        store.save_challenge_durations(vec![45, 90]).unwrap();
        assert_eq!(store.challenge_durations(), vec![45, 90]);

        assert!(store.save_challenge_durations(vec![]).is_err());
        assert!(store.save_challenge_durations(vec![30, 0]).is_err());
        assert_eq!(store.challenge_durations(), vec![45, 90]);
    }

    #[test]
    fn twist_toggle_flips_flag() {
        let (_, store) = store();
        assert!(!store.include_twist_in_story());
        assert!(store.toggle_twist_in_story().unwrap());
        assert!(store.include_twist_in_story());
        assert!(!store.toggle_twist_in_story().unwrap());
    }

    #[test]
    fn daily_combo_is_generated_once_per_day() {
        let (prefs, store) = store();
        let generator = ContentGenerator::new();

        let first = store.daily_combo(day(17), &generator).unwrap();
        let again = store.daily_combo(day(17), &generator).unwrap();
        assert_eq!(first, again);
        assert_eq!(prefs.get_string(LAST_DAILY_DATE_KEY).as_deref(), Some("2026-10-17"));

        let tomorrow = store.daily_combo(day(18), &generator).unwrap();
        assert_ne!(first.id, tomorrow.id);
    }

    #[test]
    fn reveal_is_tracked_per_day() {
        let (prefs, store) = store();
        let daily = DailyReveal::new(store, ContentGenerator::new());

        assert!(!daily.is_revealed(day(17)));
        assert_eq!(daily.current(day(17)).unwrap(), None);

        let combo = daily.reveal(day(17)).unwrap();
        assert!(daily.is_revealed(day(17)));
        assert_eq!(daily.current(day(17)).unwrap(), Some(combo.clone()));
        assert_eq!(daily.reveal(day(17)).unwrap(), combo);
        assert_eq!(
            prefs.get_string(DAILY_REVEALED_KEY).as_deref(),
            Some("2026-10-17")
        );

        assert!(!daily.is_revealed(day(18)));
    }

    #[test]
    fn labels_use_short_month_names() {
        assert_eq!(DailyReveal::date_label(day(7)), "October 7");

        let mut favorite = Favorite::new(combo(), "");
        favorite.saved_at = day(7).and_hms_opt(12, 0, 0).unwrap().and_utc();
        assert_eq!(favorite.date_string(), "Oct 7");
    }
}
