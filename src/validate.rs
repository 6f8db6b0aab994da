use crate::data::{Group, Profile, RoomLabel};
use crate::grouping::analyze_group;
use itertools::Itertools;
use log::info;
use std::collections::HashMap;

/// Label for profiles that never received a manual room tag.
const UNASSIGNED_LABEL: &str = "unassigned";

/// Diagnoses a manually authored assignment without moving anyone.
///
/// Groups strictly by the final-room tag and runs the same scoring and
/// conflict annotation as the assignment pipeline, but makes no placement
/// or preservation decisions. Untagged profiles collect into one
/// zero-scored bucket so the gap is impossible to miss. Pure over its
/// input: repeated runs yield identical output.
pub fn validate(profiles: &[Profile]) -> Vec<Group> {
    let clusters: HashMap<RoomLabel, Vec<Profile>> = profiles
        .iter()
        .filter_map(|p| p.final_room.clone().map(|room| (room, p.clone())))
        .into_group_map();
    let mut tagged: Vec<(RoomLabel, Vec<Profile>)> = clusters.into_iter().collect();
    tagged.sort_by(|a, b| a.0.cmp(&b.0));

    let mut groups = Vec::new();
    for (label, members) in tagged {
        let analysis = analyze_group(&members, false, profiles);
        groups.push(Group {
            id: label,
            members,
            compatibility_score: analysis.score,
            rationale: analysis.rationale,
            conflict_notes: analysis.conflict_notes,
        });
    }

    let untagged: Vec<Profile> = profiles
        .iter()
        .filter(|p| p.final_room.is_none())
        .cloned()
        .collect();
    if !untagged.is_empty() {
        let analysis = analyze_group(&untagged, false, profiles);
        groups.push(Group {
            id: UNASSIGNED_LABEL.to_string(),
            members: untagged,
            compatibility_score: 0,
            rationale: "no final room tag; awaiting manual assignment".to_string(),
            conflict_notes: analysis.conflict_notes,
        });
    }

    info!("validated {} room(s) from manual tags", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Habits, Preference};

    fn profile(id: &str, name: &str, final_room: Option<&str>) -> Profile {
        Profile {
            id: id.to_string(),
            name: name.to_string(),
            gender: Some("M".to_string()),
            prior_room: None,
            final_room: final_room.map(str::to_string),
            habits: Habits {
                sleep_time: "12:00 AM".to_string(),
                cleanliness: 5,
                social_energy: 5,
                noise_tolerance: 5,
                temperature: 2,
            },
            preferences: Vec::new(),
        }
    }

    #[test]
    fn groups_strictly_by_final_room_tag() {
        let profiles = vec![
            profile("a", "Ada", Some("305")),
            profile("b", "Grace", Some("101")),
            profile("c", "Joan", Some("305")),
            profile("d", "Mary", None),
        ];
        let groups = validate(&profiles);

        let labels: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(labels, vec!["101", "305", "unassigned"]);
        assert_eq!(groups[1].members.len(), 2);
        assert_eq!(groups[2].compatibility_score, 0);
    }

    #[test]
    fn ghost_reference_survives_validation() {
        let mut a = profile("a", "Ada", Some("305"));
        a.preferences = vec![Preference::Named("Ghostname".to_string())];
        let b = profile("b", "Grace", Some("305"));
        let groups = validate(&[a, b]);
        assert!(groups[0].conflict_notes.contains("Ghostname"));
    }

    #[test]
    fn validation_is_idempotent() {
        let mut a = profile("a", "Ada", Some("204"));
        a.preferences = vec![Preference::Named("Grace".to_string())];
        let profiles = vec![
            a,
            profile("b", "Grace", Some("204")),
            profile("c", "Joan", Some("207")),
            profile("d", "Mary", None),
            profile("e", "Rosa", None),
        ];

        let first = serde_json::to_value(validate(&profiles)).unwrap();
        let second = serde_json::to_value(validate(&profiles)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(validate(&[]).is_empty());
    }
}
