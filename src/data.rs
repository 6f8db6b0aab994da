use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type ProfileId = String;
pub type RoomLabel = String;

// Free-text entries that mean "no preference" rather than naming a person.
// Matched exactly after trimming and lowercasing; stay intent is matched by
// containment because collaborators send phrasings like "stay put" or
// "wants to stay in current room".
const NEUTRAL_MARKERS: [&str; 5] = ["random", "neutral", "none", "no preference", "any"];

/// Normalized gender partition key. Profiles never cross partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Normalizes free-text roster gender. Tolerates English words, single
    /// letters, and the CJK markers some roster uploads carry.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Gender::Unknown;
        };
        let upper = raw.trim().to_uppercase();
        if upper.starts_with('M') || upper.contains('男') {
            Gender::Male
        } else if upper.starts_with('F') || upper.contains('女') {
            Gender::Female
        } else {
            Gender::Unknown
        }
    }
}

/// Sleep schedule ordinal derived from the descriptive bedtime string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SleepPhase {
    Early = 1,
    Mid = 2,
    Late = 3,
}

impl SleepPhase {
    /// Absolute distance between two phases, 0..=2.
    pub fn gap(self, other: SleepPhase) -> u8 {
        (self as i8 - other as i8).unsigned_abs()
    }
}

/// Self-reported lifestyle metrics from the questionnaire.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Habits {
    pub sleep_time: String,
    pub cleanliness: u8,
    pub social_energy: u8,
    pub noise_tolerance: u8,
    /// 1 = cold-sensitive .. 3 = heat-sensitive.
    #[serde(default = "default_temperature")]
    pub temperature: u8,
}

fn default_temperature() -> u8 {
    2
}

impl Habits {
    /// A "PM" bedtime (or the 10:30 early marker) reads as Early, the 02:30
    /// night-owl marker as Late, everything else as Mid.
    pub fn sleep_phase(&self) -> SleepPhase {
        if self.sleep_time.contains("PM") || self.sleep_time.contains("10:30") {
            SleepPhase::Early
        } else if self.sleep_time.contains("02:30") {
            SleepPhase::Late
        } else {
            SleepPhase::Mid
        }
    }
}

/// A single roommate preference, classified from collaborator free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preference {
    Neutral,
    StayInPlace,
    Named(String),
}

impl Preference {
    pub fn from_raw(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Preference::Neutral;
        }
        let lowered = text.to_lowercase();
        if lowered.contains("stay") {
            return Preference::StayInPlace;
        }
        if NEUTRAL_MARKERS.contains(&lowered.as_str()) {
            return Preference::Neutral;
        }
        Preference::Named(text.to_string())
    }

    /// Canonical string form written back to collaborators.
    pub fn as_wire(&self) -> &str {
        match self {
            Preference::Neutral => "no preference",
            Preference::StayInPlace => "stay in current room",
            Preference::Named(name) => name,
        }
    }
}

impl Serialize for Preference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Preference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Preference::from_raw(&raw))
    }
}

/// One individual's roster identity, habits, and stated preferences.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    /// Room label the student currently lives in, from the roster.
    #[serde(default)]
    pub prior_room: Option<RoomLabel>,
    /// Manually authored final placement, consumed by the validator only.
    #[serde(default)]
    pub final_room: Option<RoomLabel>,
    pub habits: Habits,
    #[serde(default)]
    pub preferences: Vec<Preference>,
}

impl Profile {
    pub fn gender_key(&self) -> Gender {
        Gender::from_raw(self.gender.as_deref())
    }

    /// True when every stated preference is neutral, or none were stated.
    pub fn is_neutral(&self) -> bool {
        self.preferences
            .iter()
            .all(|p| matches!(p, Preference::Neutral))
    }

    pub fn wants_to_stay(&self) -> bool {
        self.preferences
            .iter()
            .any(|p| matches!(p, Preference::StayInPlace))
    }

    /// Preference entries that name a person, sentinels excluded.
    pub fn named_targets(&self) -> impl Iterator<Item = &str> + '_ {
        self.preferences.iter().filter_map(|p| match p {
            Preference::Named(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// A finalized room assignment, the unit of output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: RoomLabel,
    pub members: Vec<Profile>,
    pub compatibility_score: u8,
    pub rationale: String,
    pub conflict_notes: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} member(s), score {}",
            self.id,
            self.members.len(),
            self.compatibility_score
        )
    }
}

/// The complete input snapshot for an assignment run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    pub profiles: Vec<Profile>,
}

/// The final output of the assignment pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutput {
    pub groups: Vec<Group>,
}
