use crate::data::{Group, Profile, ProfileId, RoomLabel};
use crate::matching::PreferenceGraph;
use log::info;
use std::collections::HashMap;

/// Cross-room consistency check over the complete run output.
///
/// Clustering runs per partition and per pass, so it cannot see a mutual
/// pair split across separately processed clusters, e.g. one half preserved
/// in an old room while the other was clustered fresh. This pass walks every
/// stated preference against the final placement of its target and annotates
/// the splits.
pub fn audit_groups(groups: &mut [Group], population: &[Profile]) {
    let graph = PreferenceGraph::new(population);

    let placement: HashMap<ProfileId, RoomLabel> = groups
        .iter()
        .flat_map(|g| g.members.iter().map(|m| (m.id.clone(), g.id.clone())))
        .collect();

    let mut split_count = 0u32;
    for group in groups.iter_mut() {
        let mut notes: Vec<String> = Vec::new();
        for member in &group.members {
            for target in member.named_targets() {
                let Some(resolved) = graph.resolve(target) else {
                    // ghost references were already annotated during analysis
                    continue;
                };
                if resolved.id == member.id {
                    continue;
                }
                let Some(room) = placement.get(&resolved.id) else {
                    continue;
                };
                if *room == group.id {
                    continue;
                }
                if graph.is_mutual(member, resolved) {
                    notes.push(format!(
                        "{} and {} asked for each other but {} was placed in room {}",
                        member.name, resolved.name, resolved.name, room
                    ));
                    split_count += 1;
                }
            }
        }
        if !notes.is_empty() {
            append_notes(&mut group.conflict_notes, &notes);
        }
    }

    if split_count > 0 {
        info!("audit flagged {} split mutual request(s)", split_count);
    }
}

fn append_notes(existing: &mut String, notes: &[String]) {
    let joined = notes.join("; ");
    if existing.is_empty() {
        *existing = joined;
    } else {
        existing.push_str("; ");
        existing.push_str(&joined);
    }
}
