use crate::data::{Gender, Profile, ProfileId};
use serde::Serialize;

// Penalty weights. Sleep schedule dominates, tidiness and social energy
// scale linearly over the 1-10 span, temperature is a smaller ordinal signal.
const SLEEP_OPPOSITE_PENALTY: f64 = 40.0;
const SLEEP_ADJACENT_PENALTY: f64 = 15.0;
const HABIT_GAP_MAX_PENALTY: f64 = 20.0;
const HABIT_GAP_SPAN: f64 = 9.0;
const TEMPERATURE_OPPOSITE_PENALTY: f64 = 20.0;
const TEMPERATURE_ADJACENT_PENALTY: f64 = 5.0;
const TIDINESS_NOTE_GAP: u8 = 4;

/// How many top candidates a per-student preview returns.
const PREVIEW_BEST_COUNT: usize = 3;

// Factor strings surfaced to reviewers. The grouping pass picks clash
// factors out of these by identity, so they live here as constants.
pub const FACTOR_SLEEP_OPPOSITE: &str = "opposite sleep schedules (early bird vs night owl)";
pub const FACTOR_SLEEP_SIMILAR: &str = "similar sleep schedules";
pub const FACTOR_TIDINESS_GAP: &str = "noticeable gap in tidiness standards";
pub const FACTOR_TEMPERATURE_CONFLICT: &str =
    "thermal comfort conflict (cold-sensitive vs heat-sensitive)";
pub const FACTOR_FAVORED: &str = "mutually favored roommates";

/// Strips all whitespace and lowercases, so spacing or casing quirks in a
/// typed name do not break roster lookups.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<String>().to_lowercase()
}

/// Single point of truth for resolving a typed preference against a roster
/// name. Containment in either direction tolerates nicknames and partial
/// entries, at the cost of false positives on very short names.
/// TODO: switch to exact normalized equality once rosters carry student ids
/// in the preference field.
pub fn names_match(typed: &str, roster: &str) -> bool {
    let a = normalize_name(typed);
    let b = normalize_name(roster);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Directed preference relation derived on demand from the flat profile
/// list. Never materialized as an object graph; every query walks the stated
/// preference entries through the matching policy above.
pub struct PreferenceGraph<'a> {
    population: &'a [Profile],
}

impl<'a> PreferenceGraph<'a> {
    pub fn new(population: &'a [Profile]) -> Self {
        Self { population }
    }

    /// True iff `a` named `b` as a desired roommate.
    pub fn has_preference(&self, a: &Profile, b: &Profile) -> bool {
        a.named_targets().any(|target| names_match(target, &b.name))
    }

    pub fn is_mutual(&self, a: &Profile, b: &Profile) -> bool {
        self.has_preference(a, b) && self.has_preference(b, a)
    }

    /// Resolves a typed target to the first matching roster profile, if any.
    pub fn resolve(&self, typed: &str) -> Option<&'a Profile> {
        self.population.iter().find(|p| names_match(typed, &p.name))
    }

    /// Preference entries of `a` that match nobody on the roster. These are
    /// never dropped; callers surface them as conflict notes.
    pub fn dangling_targets(&self, a: &Profile) -> Vec<String> {
        a.named_targets()
            .filter(|target| self.resolve(target).is_none())
            .map(str::to_string)
            .collect()
    }
}

/// A scored pairing with the factors behind the number.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub score: u8,
    pub factors: Vec<String>,
}

/// Weighted compatibility between two profiles, 0-100.
///
/// Starts at 100 and deducts: sleep schedule mismatch (max 40), tidiness gap
/// (max 20), social energy gap (max 20), temperature mismatch (max 20). A
/// stated roommate request in either direction overrides the habit math
/// entirely. Symmetric by construction: every term depends on absolute
/// differences only.
pub fn compatibility(a: &Profile, b: &Profile, graph: &PreferenceGraph) -> MatchResult {
    // stated preference trumps any computed habit mismatch
    if graph.has_preference(a, b) || graph.has_preference(b, a) {
        return MatchResult {
            score: 100,
            factors: vec![FACTOR_FAVORED.to_string()],
        };
    }

    let mut score = 100.0;
    let mut factors = Vec::new();

    let sleep_gap = a.habits.sleep_phase().gap(b.habits.sleep_phase());
    if sleep_gap == 2 {
        score -= SLEEP_OPPOSITE_PENALTY;
        factors.push(FACTOR_SLEEP_OPPOSITE.to_string());
    } else if sleep_gap == 1 {
        score -= SLEEP_ADJACENT_PENALTY;
    } else {
        factors.push(FACTOR_SLEEP_SIMILAR.to_string());
    }

    let clean_gap = a.habits.cleanliness.abs_diff(b.habits.cleanliness);
    score -= f64::from(clean_gap) / HABIT_GAP_SPAN * HABIT_GAP_MAX_PENALTY;
    if clean_gap > TIDINESS_NOTE_GAP {
        factors.push(FACTOR_TIDINESS_GAP.to_string());
    }

    let social_gap = a.habits.social_energy.abs_diff(b.habits.social_energy);
    score -= f64::from(social_gap) / HABIT_GAP_SPAN * HABIT_GAP_MAX_PENALTY;

    let temperature_gap = a.habits.temperature.abs_diff(b.habits.temperature);
    if temperature_gap == 2 {
        score -= TEMPERATURE_OPPOSITE_PENALTY;
        factors.push(FACTOR_TEMPERATURE_CONFLICT.to_string());
    } else if temperature_gap == 1 {
        score -= TEMPERATURE_ADJACENT_PENALTY;
    }

    MatchResult {
        score: score.round().clamp(0.0, 100.0) as u8,
        factors,
    }
}

/// One ranked candidate in a per-student preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMatch {
    pub id: ProfileId,
    pub name: String,
    pub score: u8,
    pub factors: Vec<String>,
}

/// Top and bottom pairings for one student.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPreview {
    pub best: Vec<RankedMatch>,
    pub worst: Option<RankedMatch>,
}

/// Ranks every same-partition candidate against `target` and returns the top
/// three plus the single worst pairing.
///
/// An Unknown gender on either side does not block the preview; the preview
/// is advisory, the hard isolation happens in the assignment pipeline.
pub fn preview_matches(target: &Profile, population: &[Profile]) -> MatchPreview {
    let graph = PreferenceGraph::new(population);
    let target_gender = target.gender_key();

    let mut ranked: Vec<RankedMatch> = population
        .iter()
        .filter(|p| p.id != target.id)
        .filter(|p| {
            let gender = p.gender_key();
            gender == Gender::Unknown || target_gender == Gender::Unknown || gender == target_gender
        })
        .map(|p| {
            let result = compatibility(target, p, &graph);
            RankedMatch {
                id: p.id.clone(),
                name: p.name.clone(),
                score: result.score,
                factors: result.factors,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    let worst = ranked.last().cloned();
    ranked.truncate(PREVIEW_BEST_COUNT);
    MatchPreview {
        best: ranked,
        worst,
    }
}
