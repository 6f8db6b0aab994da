use crate::audit::audit_groups;
use crate::data::{AssignmentInput, AssignmentOutput, Gender, Group, Profile};
use crate::grouping::{cluster_remaining, preserve_rooms};
use itertools::Itertools;
use log::{info, trace};
use std::collections::HashMap;
use std::time::Instant;

/// Label for the bucket of profiles whose roster data is incomplete.
const MISSING_DATA_LABEL: &str = "missing-data";

/// Runs the full assignment pipeline over one roster snapshot: gender
/// partition, prior-room preservation, greedy clustering, then a global
/// audit across everything.
///
/// Always produces an answer. Anomalies come back as conflict notes on the
/// groups, never as errors; the algorithm recommends, a human approves.
pub fn assign(input: &AssignmentInput) -> AssignmentOutput {
    let start_time = Instant::now();
    info!(
        "Assigning rooms for {} profile(s)...",
        input.profiles.len()
    );

    let mut partitions: HashMap<Gender, Vec<Profile>> = input
        .profiles
        .iter()
        .map(|p| (p.gender_key(), p.clone()))
        .into_group_map();

    let mut groups: Vec<Group> = Vec::new();

    // incomplete roster data is quarantined before any matching runs
    if let Some(unknown) = partitions.remove(&Gender::Unknown) {
        info!("{} profile(s) lack usable gender data", unknown.len());
        groups.push(missing_data_group(unknown));
    }

    for (gender, prefix) in [(Gender::Male, "M"), (Gender::Female, "F")] {
        let Some(partition) = partitions.remove(&gender) else {
            continue;
        };
        info!("Partition {}: {} profile(s)", prefix, partition.len());

        let outcome = preserve_rooms(partition, &input.profiles);
        trace!(
            "Partition {}: preserved {} room(s), {} back in the pool",
            prefix,
            outcome.preserved.len(),
            outcome.remaining.len()
        );
        groups.extend(outcome.preserved);
        groups.extend(cluster_remaining(outcome.remaining, 1, prefix, &input.profiles));
    }

    audit_groups(&mut groups, &input.profiles);
    groups.sort_by(|a, b| a.id.cmp(&b.id));
    for group in &groups {
        trace!("{}", group);
    }

    info!(
        "Assignment finished in {:.2?}: {} group(s)",
        start_time.elapsed(),
        groups.len()
    );
    AssignmentOutput { groups }
}

fn missing_data_group(members: Vec<Profile>) -> Group {
    let names = members.iter().map(|m| m.name.as_str()).join(", ");
    Group {
        id: MISSING_DATA_LABEL.to_string(),
        members,
        compatibility_score: 0,
        rationale: "gender missing or unrecognized on the roster".to_string(),
        conflict_notes: format!("needs manual review before placement: {names}"),
    }
}
