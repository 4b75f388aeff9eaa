//! Pairwise separation constraints: lookup, conflict counting and local repair.

use crate::data::StudentRecord;
use itertools::Itertools;
use log::{trace, warn};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

/// Symmetric "must not share a group" relation over roster positions.
///
/// Built as the union of both directions, so a separation listed by only one
/// of the two students still applies to both.
#[derive(Debug, Clone, Default)]
pub struct SeparationIndex {
    pairs: Vec<BTreeSet<usize>>,
}

impl SeparationIndex {
    pub fn build(students: &[StudentRecord]) -> Self {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(students.len());
        for (i, student) in students.iter().enumerate() {
            if positions.contains_key(student.id.as_str()) {
                warn!("Duplicate student id {} at position {}", student.id, i);
                continue;
            }
            positions.insert(student.id.as_str(), i);
        }

        let mut pairs = vec![BTreeSet::new(); students.len()];
        for (i, student) in students.iter().enumerate() {
            for other in &student.separation_ids {
                match positions.get(other.as_str()) {
                    Some(&j) if j != i => {
                        pairs[i].insert(j);
                        pairs[j].insert(i);
                    }
                    Some(_) => trace!("Ignoring self separation on {}", student.id),
                    None => trace!(
                        "Ignoring separation {} -> {}: not on roster",
                        student.id, other
                    ),
                }
            }
        }
        SeparationIndex { pairs }
    }

    /// An index with no separations, used when the rule is switched off.
    pub fn disabled(student_count: usize) -> Self {
        SeparationIndex {
            pairs: vec![BTreeSet::new(); student_count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.iter().all(BTreeSet::is_empty)
    }

    pub fn separated(&self, a: usize, b: usize) -> bool {
        self.pairs.get(a).is_some_and(|set| set.contains(&b))
    }

    /// How many of `members` the student must be kept apart from.
    pub fn conflicts_with(&self, student: usize, members: &[usize]) -> usize {
        members
            .iter()
            .filter(|&&other| other != student && self.separated(student, other))
            .count()
    }

    /// Every separated pair sharing a bucket, as `(bucket, a, b)` with `a < b`.
    pub fn conflicting_pairs(&self, buckets: &[Vec<usize>]) -> Vec<(usize, usize, usize)> {
        buckets
            .iter()
            .enumerate()
            .flat_map(move |(bucket, members)| {
                members
                    .iter()
                    .copied()
                    .tuple_combinations()
                    .filter(move |&(a, b)| self.separated(a, b))
                    .map(move |(a, b)| (bucket, a.min(b), a.max(b)))
            })
            .collect()
    }

    pub fn count_conflicts(&self, buckets: &[Vec<usize>]) -> usize {
        buckets
            .iter()
            .map(|members| {
                members
                    .iter()
                    .tuple_combinations()
                    .filter(|&(&a, &b)| self.separated(a, b))
                    .count()
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Swap {
    from: usize,
    from_pos: usize,
    to: usize,
    to_pos: usize,
}

/// Best-effort swap repair. Returns the number of swaps performed.
///
/// Every accepted swap moves one member of a conflicting pair into a bucket
/// where it has no separation, in exchange for a student who has none in the
/// source bucket, so the conflict count strictly decreases. Swaps between
/// students of the same role and gender are preferred to keep balance intact.
pub fn repair(
    buckets: &mut [Vec<usize>],
    index: &SeparationIndex,
    students: &[StudentRecord],
    max_swaps: usize,
) -> usize {
    let mut swaps = 0;
    while swaps < max_swaps {
        let Some(swap) = find_swap(buckets, index, students) else {
            break;
        };
        let mover = buckets[swap.from][swap.from_pos];
        let partner = buckets[swap.to][swap.to_pos];
        trace!(
            "Swapping {} (group {}) with {} (group {})",
            students[mover].id,
            swap.from + 1,
            students[partner].id,
            swap.to + 1
        );
        buckets[swap.from][swap.from_pos] = partner;
        buckets[swap.to][swap.to_pos] = mover;
        swaps += 1;
    }
    swaps
}

fn find_swap(
    buckets: &[Vec<usize>],
    index: &SeparationIndex,
    students: &[StudentRecord],
) -> Option<Swap> {
    for (from, members) in buckets.iter().enumerate() {
        for (a, b) in members.iter().copied().tuple_combinations() {
            if !index.separated(a, b) {
                continue;
            }
            // try the more entangled student first
            let mut movers = [a, b];
            movers.sort_by_key(|&m| Reverse(index.conflicts_with(m, members)));
            for mover in movers {
                if let Some(swap) = best_exchange(buckets, from, mover, index, students) {
                    return Some(swap);
                }
            }
        }
    }
    None
}

fn best_exchange(
    buckets: &[Vec<usize>],
    from: usize,
    mover: usize,
    index: &SeparationIndex,
    students: &[StudentRecord],
) -> Option<Swap> {
    let source = &buckets[from];
    let from_pos = source.iter().position(|&m| m == mover)?;
    let mut best: Option<(u8, Swap)> = None;

    for (to, dest) in buckets.iter().enumerate() {
        if to == from {
            continue;
        }
        for (to_pos, &candidate) in dest.iter().enumerate() {
            if dest
                .iter()
                .any(|&o| o != candidate && index.separated(mover, o))
            {
                continue;
            }
            if source
                .iter()
                .any(|&o| o != mover && index.separated(candidate, o))
            {
                continue;
            }
            let cost = profile_distance(&students[mover], &students[candidate]);
            if best.as_ref().is_none_or(|(c, _)| cost < *c) {
                let swap = Swap {
                    from,
                    from_pos,
                    to,
                    to_pos,
                };
                if cost == 0 {
                    return Some(swap);
                }
                best = Some((cost, swap));
            }
        }
    }
    best.map(|(_, swap)| swap)
}

fn profile_distance(a: &StudentRecord, b: &StudentRecord) -> u8 {
    let role = if a.role() == b.role() { 0 } else { 2 };
    let gender = if a.gender == b.gender { 0 } else { 1 };
    role + gender
}
