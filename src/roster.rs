//! Identifier reconciliation at the data-loading boundary.
//!
//! Rosters may mix current UUID ids with legacy stringified identifiers, both
//! as student ids and inside separation lists. Everything is normalised to one
//! canonical scheme here so the engine only ever compares canonical ids.

use crate::data::{StudentId, StudentRecord};
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// A roster the engine can consume directly.
#[derive(Debug, Clone, Default)]
pub struct ReconciledRoster {
    pub students: Vec<StudentRecord>,
    /// Records folded into an earlier record with the same canonical id.
    pub merged_duplicates: usize,
    /// Separation entries dropped as self references or unknown ids.
    pub dropped_separations: usize,
}

/// Trims the id and rewrites anything that parses as a UUID (hyphenated,
/// simple, braced or URN form) as lowercase hyphenated.
pub fn canonical_id(raw: &str) -> StudentId {
    let trimmed = raw.trim();
    match Uuid::parse_str(trimmed) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Canonicalises every id, resolves legacy aliases, merges duplicate records
/// and drops separations that point at nobody on the roster.
pub fn reconcile(
    students: Vec<StudentRecord>,
    aliases: &BTreeMap<String, StudentId>,
) -> ReconciledRoster {
    let aliases: HashMap<StudentId, StudentId> = aliases
        .iter()
        .map(|(legacy, current)| (canonical_id(legacy), canonical_id(current)))
        .collect();
    let resolve = |raw: &str| {
        let id = canonical_id(raw);
        aliases.get(&id).cloned().unwrap_or(id)
    };

    let mut roster = ReconciledRoster::default();
    let mut positions: HashMap<StudentId, usize> = HashMap::with_capacity(students.len());

    for mut student in students {
        student.id = resolve(student.id.as_str());
        let separations: BTreeSet<StudentId> =
            student.separation_ids.iter().map(|raw| resolve(raw.as_str())).collect();

        match positions.get(&student.id) {
            Some(&pos) => {
                trace!("Merging duplicate record for {}", student.id);
                roster.students[pos].separation_ids.extend(separations);
                roster.merged_duplicates += 1;
            }
            None => {
                student.separation_ids = separations;
                positions.insert(student.id.clone(), roster.students.len());
                roster.students.push(student);
            }
        }
    }

    for student in &mut roster.students {
        let before = student.separation_ids.len();
        let own_id = student.id.clone();
        student
            .separation_ids
            .retain(|other| *other != own_id && positions.contains_key(other));
        roster.dropped_separations += before - student.separation_ids.len();
    }

    debug!(
        "Reconciled roster: {} students, {} duplicates merged, {} separations dropped",
        roster.students.len(),
        roster.merged_duplicates,
        roster.dropped_separations
    );
    roster
}
