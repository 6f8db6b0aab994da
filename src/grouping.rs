use crate::data::{Group, Profile, ProfileId, RoomLabel};
use crate::matching::{
    FACTOR_FAVORED, FACTOR_SLEEP_OPPOSITE, FACTOR_TEMPERATURE_CONFLICT, FACTOR_TIDINESS_GAP,
    PreferenceGraph, compatibility,
};
use itertools::Itertools;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Rooms fill to four unless the size table says otherwise.
const TARGET_ROOM_SIZE: usize = 4;
/// Candidates inspected per best-fit step. Keeps the fill loop bounded on
/// large pools.
const BEST_FIT_WINDOW: usize = 10;
/// Averages below this get a mediation note attached.
const MEDIATION_THRESHOLD: u8 = 60;

/// Everything a reviewer needs to judge one room.
#[derive(Debug, Clone)]
pub struct GroupAnalysis {
    pub score: u8,
    pub rationale: String,
    pub conflict_notes: String,
}

/// Scores a set of members and writes the reviewer-facing rationale and
/// conflict text.
///
/// `population` is the full roster, not just the partition, so ghost
/// references to people outside the working subset still resolve.
pub fn analyze_group(
    members: &[Profile],
    is_preserved: bool,
    population: &[Profile],
) -> GroupAnalysis {
    if members.len() < 2 {
        return GroupAnalysis {
            score: 100,
            rationale: "single occupant".to_string(),
            conflict_notes: String::new(),
        };
    }

    let graph = PreferenceGraph::new(population);
    let mut conflicts: Vec<String> = Vec::new();

    let mut total = 0u32;
    let mut pair_count = 0u32;
    let mut has_mutual = false;
    let mut has_favored = false;
    for (a, b) in members.iter().tuple_combinations() {
        let result = compatibility(a, b, &graph);
        total += u32::from(result.score);
        pair_count += 1;
        for factor in &result.factors {
            if is_clash_factor(factor) && !conflicts.contains(factor) {
                conflicts.push(factor.clone());
            }
        }
        if result.factors.iter().any(|f| f == FACTOR_FAVORED) {
            has_favored = true;
        }
        if graph.is_mutual(a, b) {
            has_mutual = true;
        }
    }
    let score = (f64::from(total) / f64::from(pair_count)).round().min(100.0) as u8;

    // unresolved name references are surfaced, never dropped
    for member in members {
        for target in graph.dangling_targets(member) {
            conflicts.push(format!(
                "{} requested \"{}\" who is not on the roster",
                member.name, target
            ));
        }
    }

    let mut rationale = vec![room_character(members)];
    if is_preserved {
        if members.iter().any(Profile::wants_to_stay) {
            rationale.push("explicit stay request honored".to_string());
        } else {
            rationale.push("no objection raised, preserved by default".to_string());
        }
    }
    if has_mutual {
        rationale.push("includes a mutual roommate request".to_string());
    } else if has_favored {
        rationale.push("includes an honored roommate request".to_string());
    }

    if score < MEDIATION_THRESHOLD {
        if has_favored {
            conflicts.push(
                "kept together despite low habit compatibility, by explicit request".to_string(),
            );
        } else {
            conflicts.push("low overall compatibility, needs further mediation".to_string());
        }
    }

    GroupAnalysis {
        score,
        rationale: rationale.join("; "),
        conflict_notes: conflicts.join("; "),
    }
}

fn is_clash_factor(factor: &str) -> bool {
    factor == FACTOR_SLEEP_OPPOSITE
        || factor == FACTOR_TIDINESS_GAP
        || factor == FACTOR_TEMPERATURE_CONFLICT
}

/// Leading rationale line: the room's dominant sleep character plus its
/// average tidiness.
fn room_character(members: &[Profile]) -> String {
    let count = members.len() as f64;
    let avg_sleep = members
        .iter()
        .map(|m| f64::from(m.habits.sleep_phase() as u8))
        .sum::<f64>()
        / count;
    let label = if avg_sleep < 1.5 {
        "early-riser room"
    } else if avg_sleep > 2.5 {
        "night-owl room"
    } else {
        "mixed-schedule room"
    };
    let avg_clean = members
        .iter()
        .map(|m| f64::from(m.habits.cleanliness))
        .sum::<f64>()
        / count;
    format!("{label}; average tidiness {avg_clean:.1}/10")
}

/// Output of the prior-room preservation pass.
#[derive(Debug)]
pub struct PreservationOutcome {
    pub preserved: Vec<Group>,
    pub remaining: Vec<Profile>,
}

/// Keeps prior rooms together when at least one occupant anchors them.
///
/// A single stayer is enough to lock a room: an explicit stay request, a
/// neutral occupant with no objection, or someone who named a roommate from
/// the same room. Occupants who named people elsewhere flow back into the
/// general pool for re-clustering.
pub fn preserve_rooms(partition: Vec<Profile>, population: &[Profile]) -> PreservationOutcome {
    let graph = PreferenceGraph::new(population);

    let clusters: HashMap<RoomLabel, Vec<Profile>> = partition
        .iter()
        .filter_map(|p| p.prior_room.clone().map(|room| (room, p.clone())))
        .into_group_map();
    let mut rooms: Vec<(RoomLabel, Vec<Profile>)> = clusters.into_iter().collect();
    rooms.sort_by(|a, b| a.0.cmp(&b.0));

    let mut preserved_ids: HashSet<ProfileId> = HashSet::new();
    let mut preserved = Vec::new();
    for (label, occupants) in rooms {
        let stayers: Vec<Profile> = occupants
            .iter()
            .filter(|p| is_stayer(p, &occupants, &graph))
            .cloned()
            .collect();
        if stayers.is_empty() {
            continue;
        }
        debug!(
            "preserving room {} with {} of {} occupant(s)",
            label,
            stayers.len(),
            occupants.len()
        );
        let analysis = analyze_group(&stayers, true, population);
        preserved_ids.extend(stayers.iter().map(|p| p.id.clone()));
        preserved.push(Group {
            id: label,
            members: stayers,
            compatibility_score: analysis.score,
            rationale: analysis.rationale,
            conflict_notes: analysis.conflict_notes,
        });
    }

    let remaining = partition
        .into_iter()
        .filter(|p| !preserved_ids.contains(&p.id))
        .collect();
    PreservationOutcome {
        preserved,
        remaining,
    }
}

// A stay request, no stated objection, or a named roommate inside the same
// room all anchor the occupant to it.
fn is_stayer(profile: &Profile, occupants: &[Profile], graph: &PreferenceGraph) -> bool {
    if profile.wants_to_stay() || profile.is_neutral() {
        return true;
    }
    occupants
        .iter()
        .any(|other| other.id != profile.id && graph.has_preference(profile, other))
}

/// Fills rooms greedily from a sleep-sorted pool: mutual requests first,
/// then one-way requests, then the best habit fit from a bounded lookahead.
/// Consumes every profile exactly once.
pub fn cluster_remaining(
    remaining: Vec<Profile>,
    start_counter: u32,
    prefix: &str,
    population: &[Profile],
) -> Vec<Group> {
    let graph = PreferenceGraph::new(population);
    let mut pool = remaining;
    // seed order only; best-fit does the actual phase matching
    pool.sort_by_key(|p| p.habits.sleep_phase());

    let mut groups = Vec::new();
    let mut counter = start_counter;
    while !pool.is_empty() {
        let target = room_size_for(pool.len());
        let mut members = vec![pool.remove(0)];

        while members.len() < target && !pool.is_empty() {
            // mutual bonds are exhausted before weaker signals
            if let Some(idx) = find_mutual_candidate(&members, &pool, &graph) {
                members.push(pool.remove(idx));
                continue;
            }
            if let Some(idx) = find_requested_candidate(&members, &pool, &graph) {
                members.push(pool.remove(idx));
                continue;
            }
            let idx = best_fit_candidate(&members, &pool, &graph).unwrap_or(0);
            members.push(pool.remove(idx));
        }

        let analysis = analyze_group(&members, false, population);
        let label = format!("{prefix}-{counter}");
        debug!(
            "formed room {} with {} member(s), score {}",
            label,
            members.len(),
            analysis.score
        );
        groups.push(Group {
            id: label,
            members,
            compatibility_score: analysis.score,
            rationale: analysis.rationale,
            conflict_notes: analysis.conflict_notes,
        });
        counter += 1;
    }

    groups
}

/// Room size for the current pool: pairs stay pairs, five or six split into
/// threes so nobody is left alone, everything else fills rooms of four.
fn room_size_for(pool_len: usize) -> usize {
    match pool_len {
        2 => 2,
        5 | 6 => 3,
        _ => TARGET_ROOM_SIZE,
    }
}

fn find_mutual_candidate(
    members: &[Profile],
    pool: &[Profile],
    graph: &PreferenceGraph,
) -> Option<usize> {
    pool.iter()
        .position(|candidate| members.iter().any(|m| graph.is_mutual(m, candidate)))
}

fn find_requested_candidate(
    members: &[Profile],
    pool: &[Profile],
    graph: &PreferenceGraph,
) -> Option<usize> {
    pool.iter()
        .position(|candidate| members.iter().any(|m| graph.has_preference(m, candidate)))
}

/// Highest total pairwise score against the current members, evaluated over
/// a fixed window. Every candidate faces the same member count, so the raw
/// sum ranks exactly like the average.
fn best_fit_candidate(
    members: &[Profile],
    pool: &[Profile],
    graph: &PreferenceGraph,
) -> Option<usize> {
    pool.iter()
        .take(BEST_FIT_WINDOW)
        .enumerate()
        .map(|(idx, candidate)| {
            let total: u32 = members
                .iter()
                .map(|m| u32::from(compatibility(m, candidate, graph).score))
                .sum();
            (idx, total)
        })
        .max_by_key(|&(idx, total)| (total, std::cmp::Reverse(idx)))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Habits, Preference};

    fn profile(id: &str, name: &str, sleep: &str) -> Profile {
        Profile {
            id: id.to_string(),
            name: name.to_string(),
            gender: Some("M".to_string()),
            prior_room: None,
            final_room: None,
            habits: Habits {
                sleep_time: sleep.to_string(),
                cleanliness: 5,
                social_energy: 5,
                noise_tolerance: 5,
                temperature: 2,
            },
            preferences: Vec::new(),
        }
    }

    fn names(group: &Group) -> Vec<&str> {
        group.members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn single_occupant_is_trivially_fine() {
        let a = profile("a", "Ada", "10:30 PM");
        let population = vec![a.clone()];
        let analysis = analyze_group(&[a], false, &population);
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.rationale, "single occupant");
        assert!(analysis.conflict_notes.is_empty());
    }

    #[test]
    fn ghost_reference_lands_in_conflict_notes() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.preferences = vec![Preference::Named("Ghostname".to_string())];
        let b = profile("b", "Grace", "10:30 PM");
        let population = vec![a.clone(), b.clone()];
        let analysis = analyze_group(&[a, b], false, &population);
        assert!(analysis.conflict_notes.contains("Ghostname"));
    }

    #[test]
    fn low_scoring_room_gets_a_mediation_note() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.habits.cleanliness = 10;
        a.habits.temperature = 1;
        let mut b = profile("b", "Grace", "02:30 AM");
        b.habits.cleanliness = 1;
        b.habits.temperature = 3;
        let population = vec![a.clone(), b.clone()];
        let analysis = analyze_group(&[a, b], false, &population);
        assert!(analysis.score < 60);
        assert!(analysis.conflict_notes.contains("needs further mediation"));
    }

    #[test]
    fn low_score_with_mutual_request_is_flagged_differently() {
        let extreme = |id: &str, name: &str, sleep: &str, clean: u8, social: u8, temp: u8| {
            let mut p = profile(id, name, sleep);
            p.habits.cleanliness = clean;
            p.habits.social_energy = social;
            p.habits.temperature = temp;
            p
        };
        let mut a = extreme("a", "Ada", "10:30 PM", 10, 10, 1);
        a.preferences = vec![Preference::Named("Grace".to_string())];
        let mut b = extreme("b", "Grace", "02:30 AM", 1, 1, 3);
        b.preferences = vec![Preference::Named("Ada".to_string())];
        let c = extreme("c", "Joan", "02:30 AM", 1, 1, 3);
        let d = extreme("d", "Mary", "10:30 PM", 10, 10, 1);

        let members = vec![a, b, c, d];
        let analysis = analyze_group(&members, false, &members);
        // pairs: ab=100 (override), ad=bc=100, ac=bd=cd=0 -> average 50
        assert_eq!(analysis.score, 50);
        assert!(analysis.conflict_notes.contains("by explicit request"));
        assert!(analysis.rationale.contains("mutual roommate request"));
    }

    #[test]
    fn preserved_room_rationale_distinguishes_stay_from_default() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.prior_room = Some("203".to_string());
        a.preferences = vec![Preference::StayInPlace];
        let mut b = profile("b", "Grace", "10:30 PM");
        b.prior_room = Some("203".to_string());

        let population = vec![a.clone(), b.clone()];
        let outcome = preserve_rooms(population.clone(), &population);
        assert_eq!(outcome.preserved.len(), 1);
        let group = &outcome.preserved[0];
        assert_eq!(group.id, "203");
        assert!(group.rationale.contains("explicit stay request honored"));
        assert!(outcome.remaining.is_empty());
    }

    #[test]
    fn neutral_occupants_preserve_by_default() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.prior_room = Some("118".to_string());
        let mut b = profile("b", "Grace", "10:30 PM");
        b.prior_room = Some("118".to_string());

        let population = vec![a, b];
        let outcome = preserve_rooms(population.clone(), &population);
        assert_eq!(outcome.preserved.len(), 1);
        assert!(
            outcome.preserved[0]
                .rationale
                .contains("preserved by default")
        );
    }

    #[test]
    fn occupant_naming_someone_elsewhere_leaves_the_room() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.prior_room = Some("301".to_string());
        let mut b = profile("b", "Grace", "10:30 PM");
        b.prior_room = Some("301".to_string());
        b.preferences = vec![Preference::Named("Joan".to_string())];
        let joan = profile("c", "Joan", "10:30 PM");

        let population = vec![a.clone(), b.clone(), joan.clone()];
        let outcome = preserve_rooms(population.clone(), &population);

        assert_eq!(outcome.preserved.len(), 1);
        assert_eq!(names(&outcome.preserved[0]), vec!["Ada"]);
        // Grace rejoins the pool alongside Joan
        let remaining: Vec<&str> = outcome.remaining.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(remaining, vec!["Grace", "Joan"]);
    }

    #[test]
    fn in_room_designation_counts_as_anchoring() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.prior_room = Some("117".to_string());
        a.preferences = vec![Preference::Named("Grace".to_string())];
        let mut b = profile("b", "Grace", "02:30 AM");
        b.prior_room = Some("117".to_string());
        b.preferences = vec![Preference::Named("Ada".to_string())];

        let population = vec![a, b];
        let outcome = preserve_rooms(population.clone(), &population);
        assert_eq!(outcome.preserved.len(), 1);
        assert_eq!(outcome.preserved[0].members.len(), 2);
    }

    #[test]
    fn room_size_table() {
        assert_eq!(room_size_for(2), 2);
        assert_eq!(room_size_for(5), 3);
        assert_eq!(room_size_for(6), 3);
        assert_eq!(room_size_for(4), 4);
        assert_eq!(room_size_for(1), 4);
        assert_eq!(room_size_for(12), 4);
    }

    #[test]
    fn every_profile_placed_exactly_once() {
        let pool: Vec<Profile> = (0..11)
            .map(|i| {
                let sleep = match i % 3 {
                    0 => "10:30 PM",
                    1 => "12:00 AM",
                    _ => "02:30 AM",
                };
                profile(&format!("s{i}"), &format!("Student {i}"), sleep)
            })
            .collect();

        let groups = cluster_remaining(pool.clone(), 1, "M", &pool);
        let mut placed: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| m.id.as_str()))
            .collect();
        placed.sort();
        let mut expected: Vec<String> = (0..11).map(|i| format!("s{i}")).collect();
        expected.sort();
        assert_eq!(placed, expected.iter().map(String::as_str).collect::<Vec<_>>());

        for group in &groups {
            assert!(matches!(group.members.len(), 1..=4));
        }
    }

    #[test]
    fn mutual_pair_is_pulled_into_the_seed_room() {
        let mut a = profile("a", "Ada", "10:30 PM");
        a.preferences = vec![Preference::Named("Mary".to_string())];
        let b = profile("b", "Grace", "10:30 PM");
        let c = profile("c", "Joan", "12:00 AM");
        let mut d = profile("d", "Mary", "02:30 AM");
        d.preferences = vec![Preference::Named("Ada".to_string())];

        let pool = vec![a, b, c, d];
        let groups = cluster_remaining(pool.clone(), 1, "F", &pool);
        assert_eq!(groups.len(), 1);
        // Mary joins right after the seed despite sorting last on sleep
        assert_eq!(names(&groups[0])[0], "Ada");
        assert_eq!(names(&groups[0])[1], "Mary");
    }

    #[test]
    fn six_profiles_split_by_sleep_phase() {
        let pool = vec![
            profile("e1", "Ada", "10:30 PM"),
            profile("e2", "Grace", "10:30 PM"),
            profile("e3", "Joan", "10:30 PM"),
            profile("l1", "Mary", "02:30 AM"),
            profile("l2", "Rosa", "02:30 AM"),
            profile("l3", "Lynn", "02:30 AM"),
        ];
        let groups = cluster_remaining(pool.clone(), 1, "F", &pool);
        assert_eq!(groups.len(), 2);
        for group in &groups {
            assert_eq!(group.members.len(), 3);
            assert!(!group.conflict_notes.contains(FACTOR_SLEEP_OPPOSITE));
        }
    }

    #[test]
    fn four_profiles_forced_together_flag_the_sleep_mismatch() {
        let pool = vec![
            profile("e1", "Ada", "10:30 PM"),
            profile("e2", "Grace", "10:30 PM"),
            profile("l1", "Mary", "02:30 AM"),
            profile("l2", "Rosa", "02:30 AM"),
        ];
        let groups = cluster_remaining(pool.clone(), 1, "F", &pool);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 4);
        assert!(groups[0].conflict_notes.contains(FACTOR_SLEEP_OPPOSITE));
    }

    #[test]
    fn labels_run_sequentially_from_the_start_counter() {
        let pool: Vec<Profile> = (0..8)
            .map(|i| profile(&format!("s{i}"), &format!("Student {i}"), "12:00 AM"))
            .collect();
        let groups = cluster_remaining(pool.clone(), 3, "M", &pool);
        let labels: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(labels, vec!["M-3", "M-4"]);
    }
}
