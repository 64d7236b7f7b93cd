//! Story elements and the combination generator.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of story element.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Category {
    Character,
    Setting,
    Goal,
    Twist,
}

impl Category {
    /// Every category in display order.
    pub const ALL: [Category; 4] = [
        Category::Character,
        Category::Setting,
        Category::Goal,
        Category::Twist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Character => "Character",
            Self::Setting => "Setting",
            Self::Goal => "Goal",
            Self::Twist => "Twist",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Character => "🐔",
            Self::Setting => "🏰",
            Self::Goal => "🎯",
            Self::Twist => "⚡",
        }
    }

    pub fn color_name(self) -> &'static str {
        match self {
            Self::Character => "gold",
            Self::Setting => "ember",
            Self::Goal => "fire",
            Self::Twist => "magic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboItem {
    pub category: Category,
    pub value: String,
}

impl ComboItem {
    pub fn new(category: Category, value: impl Into<String>) -> Self {
        Self {
            category,
            value: value.into(),
        }
    }
}

/// One generated set of story elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combo {
    pub id: Uuid,
    pub items: Vec<ComboItem>,
    pub created_at: DateTime<Utc>,
}

impl Combo {
    pub fn new(items: Vec<ComboItem>) -> Self {
        Self::with_created_at(items, Utc::now())
    }

    pub fn with_created_at(items: Vec<ComboItem>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            items,
            created_at,
        }
    }

    /// One `"<icon> <Category>: <value>"` line per item.
    pub fn share_text(&self) -> String {
        self.items
            .iter()
            .map(|item| {
                format!(
                    "{} {}: {}",
                    item.category.icon(),
                    item.category.name(),
                    item.value
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn short_description(&self) -> String {
        self.items
            .iter()
            .map(|item| item.value.as_str())
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.items.iter().any(|item| item.category == category)
    }
}

const CHARACTERS: [&str; 25] = [
    "a torch-bearing chicken",
    "a shy robot",
    "an introvert pirate",
    "a singing skeleton",
    "a philosophical goblin",
    "a time-traveling baker",
    "a nervous dragon",
    "a vegetarian vampire",
    "a forgetful wizard",
    "an ambitious mushroom",
    "a diplomatic orc",
    "a melancholic phoenix",
    "a curious gargoyle",
    "an optimistic ghost",
    "a rebellious knight",
    "a scholarly barbarian",
    "a peaceful necromancer",
    "a clumsy assassin",
    "a romantic zombie",
    "a methodical chaos demon",
    "a cheerful banshee",
    "a minimalist treasure hunter",
    "a vegan werewolf",
    "an anxious oracle",
    "a perfectionistic imp",
];

const SETTINGS: [&str; 25] = [
    "an ember-lit dungeon",
    "a rainy desert",
    "a moon library",
    "a floating tavern",
    "an underwater volcano",
    "a crystalline forest",
    "a clockwork castle",
    "a living maze",
    "a frozen lighthouse",
    "a singing swamp",
    "an inverted tower",
    "a mirror dimension",
    "a cloud prison",
    "a bone garden",
    "a magnetic mountain",
    "a dreamscape battlefield",
    "a pocket universe",
    "an endless staircase",
    "a memory palace",
    "a shadow market",
    "a time-locked village",
    "a glass ocean",
    "a gravity well",
    "an echo chamber",
    "a probability storm",
];

const GOALS: [&str; 25] = [
    "to relight the last torch",
    "to unite rivals",
    "to decode a song",
    "to break an ancient curse",
    "to find the missing piece",
    "to restore balance",
    "to wake the sleeping",
    "to silence the echoes",
    "to mend what was broken",
    "to remember the forgotten",
    "to prove their worth",
    "to escape the loop",
    "to solve the riddle",
    "to calm the storm",
    "to bridge two worlds",
    "to steal the unstealable",
    "to tame the wild",
    "to reveal the truth",
    "to prevent the prophecy",
    "to win an impossible game",
    "to grow the ungrowable",
    "to catch the uncatchable",
    "to heal the unhealable",
    "to build the unbuildable",
    "to find home",
];

const TWISTS: [&str; 25] = [
    "under flickering torchlight",
    "with only echoes as clues",
    "no electricity allowed",
    "while time runs backward",
    "everything is upside down",
    "magic doesn't work here",
    "everyone speaks in riddles",
    "gravity is optional",
    "memories fade every hour",
    "shadows have their own agenda",
    "music controls reality",
    "emotions are visible",
    "lies become truth",
    "silence is deadly",
    "colors have meaning",
    "dreams are currency",
    "names have power",
    "mirrors show the future",
    "touch reveals secrets",
    "laughter is forbidden",
    "questions cost memories",
    "walking changes the past",
    "breathing controls time",
    "thoughts become real",
    "darkness brings wisdom",
];

/// Random picks over the built-in word lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentGenerator;

impl ContentGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn values(&self, category: Category) -> &'static [&'static str] {
        match category {
            Category::Character => &CHARACTERS,
            Category::Setting => &SETTINGS,
            Category::Goal => &GOALS,
            Category::Twist => &TWISTS,
        }
    }

    /// One item per requested category, in the order given.
    pub fn generate_combo(&self, categories: &[Category]) -> Combo {
        self.generate_combo_with(categories, &mut rand::thread_rng())
    }

    pub fn generate_combo_with<R: Rng + ?Sized>(
        &self,
        categories: &[Category],
        rng: &mut R,
    ) -> Combo {
        let items = categories
            .iter()
            .filter_map(|&category| {
                self.generate_value_with(category, rng)
                    .map(|value| ComboItem::new(category, value))
            })
            .collect();
        Combo::new(items)
    }

    pub fn generate_value(&self, category: Category) -> Option<&'static str> {
        self.generate_value_with(category, &mut rand::thread_rng())
    }

    pub fn generate_value_with<R: Rng + ?Sized>(
        &self,
        category: Category,
        rng: &mut R,
    ) -> Option<&'static str> {
        self.values(category).choose(rng).copied()
    }

    /// Deterministic all-category combo for a calendar day.
    pub fn generate_daily_combo(&self, date: NaiveDate) -> Combo {
        let mut seed = DailySeed::for_date(date);
        let items = Category::ALL
            .into_iter()
            .map(|category| ComboItem::new(category, seed.pick(self.values(category))))
            .collect();
        let created_at = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Combo::with_created_at(items, created_at)
    }
}

/// 32-bit linear congruential generator seeded from a date.
#[derive(Debug, Clone)]
pub struct DailySeed {
    state: u64,
}

impl DailySeed {
    pub fn new(seed: i64) -> Self {
        Self {
            state: seed.unsigned_abs(),
        }
    }

    /// Seed `year * 10000 + month * 100 + day`.
    pub fn for_date(date: NaiveDate) -> Self {
        let seed =
            i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day());
        Self::new(seed)
    }

    pub fn next_value(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223)
            & 0xffff_ffff;
        self.state
    }

    pub fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        if values.is_empty() {
            return "";
        }
        let index = (self.next_value() % values.len() as u64) as usize;
        values[index]
    }
}
