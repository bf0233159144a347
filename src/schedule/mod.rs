pub mod analysis;
pub mod fallback;
pub mod normalizer;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Upper bound for any single block or day allocation
pub const MAX_DAY_MINUTES: u32 = 24 * 60;

/// Subject tracks. Wire names match the plan document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "DSA")]
    Dsa,
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Android Development")]
    AndroidDevelopment,
    #[serde(rename = "AI-ML")]
    AiMl,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Dsa => "DSA",
            Subject::WebDevelopment => "Web Development",
            Subject::AndroidDevelopment => "Android Development",
            Subject::AiMl => "AI-ML",
        }
    }

    /// Map free-form subject text to a track by keyword; unknown text is DSA.
    pub fn from_keywords(text: &str) -> Subject {
        let low = text.to_lowercase();
        let has_word = |word: &str| {
            low.split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == word)
        };
        if ["web", "html", "css"].iter().any(|k| low.contains(k)) {
            Subject::WebDevelopment
        } else if low.contains("android") {
            Subject::AndroidDevelopment
        } else if has_word("ai")
            || has_word("ml")
            || low.contains("machine learning")
            || low.contains("artificial intelligence")
        {
            Subject::AiMl
        } else {
            Subject::Dsa
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Canonical order used by every schedule
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Case-insensitive, whitespace-tolerant lookup
    pub fn parse_loose(name: &str) -> Option<Weekday> {
        let name = name.trim();
        Weekday::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::parse_loose(s).ok_or_else(|| format!("unknown weekday '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyBlock {
    pub subject: Subject,
    pub topic: String,
    pub duration: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub mcq_passed: bool,
}

impl StudyBlock {
    pub fn new<S: Into<String>>(subject: Subject, topic: S, duration: u32) -> Self {
        StudyBlock {
            subject,
            topic: topic.into(),
            duration,
            completed: false,
            mcq_passed: false,
        }
    }
}

/// One day of a schedule. `total_minutes` is derived from the blocks and
/// cannot be set directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: Weekday,
    study_blocks: Vec<StudyBlock>,
    total_minutes: u32,
}

impl DaySchedule {
    pub fn new(day: Weekday, study_blocks: Vec<StudyBlock>) -> Self {
        let total_minutes = study_blocks
            .iter()
            .fold(0u32, |total, b| total.saturating_add(b.duration));
        DaySchedule {
            day,
            study_blocks,
            total_minutes,
        }
    }

    pub fn study_blocks(&self) -> &[StudyBlock] {
        &self.study_blocks
    }

    pub fn total_minutes(&self) -> u32 {
        self.total_minutes
    }

    pub fn has_subject(&self, subject: Subject) -> bool {
        self.study_blocks.iter().any(|b| b.subject == subject)
    }

    /// Set both completion flags on one block. Returns false for an unknown index.
    pub fn set_block_completion(&mut self, index: usize, passed: bool) -> bool {
        match self.study_blocks.get_mut(index) {
            Some(block) => {
                block.completed = passed;
                block.mcq_passed = passed;
                true
            }
            None => false,
        }
    }
}

/// Exactly seven days, Monday through Sunday.
///
/// Only the normalizer and the fallback synthesizer build these, and
/// deserialization goes through the normalizer, so the invariants hold for
/// every value of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSchedule {
    days: Vec<DaySchedule>,
}

impl WeekSchedule {
    /// Caller guarantees one entry per weekday in canonical order.
    pub(crate) fn from_ordered_days(days: Vec<DaySchedule>) -> Self {
        debug_assert_eq!(days.len(), 7);
        debug_assert!(days.iter().zip(Weekday::ALL.iter()).all(|(d, w)| d.day == *w));
        WeekSchedule { days }
    }

    pub fn days(&self) -> &[DaySchedule] {
        &self.days
    }

    pub fn day(&self, day: Weekday) -> &DaySchedule {
        &self.days[day.index()]
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut DaySchedule {
        &mut self.days[day.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = &StudyBlock> {
        self.days.iter().flat_map(|d| d.study_blocks.iter())
    }

    pub fn total_minutes(&self) -> u32 {
        self.days
            .iter()
            .fold(0u32, |total, d| total.saturating_add(d.total_minutes))
    }

    /// `{ "schedule": [...] }`, the shape prompts and handlers exchange
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({ "schedule": self })
    }
}

impl Serialize for WeekSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.days)
    }
}

impl<'de> Deserialize<'de> for WeekSchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(normalizer::normalize(&value))
    }
}

/// A learning path such as `"DSA + Web Development"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearningPath(String);

impl LearningPath {
    /// Paths accepted verbatim by the plan store
    pub const KNOWN: [&'static str; 7] = [
        "DSA only",
        "DSA + Web Development",
        "DSA + Android Development",
        "DSA + AI/ML",
        "Full Stack Developer",
        "Mobile App Developer",
        "AI/ML Engineer",
    ];

    pub fn new<S: Into<String>>(path: S) -> Self {
        LearningPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Known path, or one that names DSA together with a recognisable track
    pub fn is_recognised(&self) -> bool {
        if Self::KNOWN.contains(&self.0.as_str()) {
            return true;
        }
        let low = self.0.to_lowercase();
        low.contains("dsa")
            && (low.contains("web")
                || low.contains("android")
                || low.contains("ai")
                || low.contains("ml")
                || low.contains("only"))
    }

    /// Name of the track after `" + "`, if any
    pub fn secondary_name(&self) -> Option<&str> {
        if !self.0.contains('+') {
            return None;
        }
        self.0
            .split(" + ")
            .nth(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Secondary track as a subject; a name that maps back to DSA counts as none.
    pub fn secondary_subject(&self) -> Option<Subject> {
        self.secondary_name()
            .map(Subject::from_keywords)
            .filter(|s| *s != Subject::Dsa)
    }
}

impl fmt::Display for LearningPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub learning_path: LearningPath,
    pub weekly_hours: f64,
    pub preferred_days: Vec<Weekday>,
}

impl GenerationRequest {
    /// Preferred days are deduplicated and put in canonical order.
    pub fn new(learning_path: LearningPath, weekly_hours: f64, preferred_days: &[Weekday]) -> Self {
        let preferred_days = Weekday::ALL
            .iter()
            .copied()
            .filter(|d| preferred_days.contains(d))
            .collect();
        GenerationRequest {
            learning_path,
            weekly_hours,
            preferred_days,
        }
    }

    pub fn preferred_day_names(&self) -> String {
        self.preferred_days
            .iter()
            .map(Weekday::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Week,
    Month,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}
