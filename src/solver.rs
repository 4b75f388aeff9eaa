use crate::balancer::{self, BalanceScore};
use crate::data::{
    Gender, GroupingOptions, GroupingResult, Role, StudentId, StudentRecord, Strategy,
    UnmetObjective,
};
use crate::partition;
use crate::separation::{self, SeparationIndex};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;
use std::time::Instant;

/// One generated grouping, scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub attempt: u32,
    pub buckets: Vec<Vec<usize>>,
    pub conflicts: usize,
    pub balance: BalanceScore,
    pub unassigned: usize,
}

impl Candidate {
    fn rank_key(&self) -> (usize, usize, BalanceScore, u32) {
        (self.unassigned, self.conflicts, self.balance, self.attempt)
    }
}

/// Orders candidates best first: everyone placed, fewest separation
/// conflicts, best balance, earliest attempt.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.rank_key().cmp(&b.rank_key())
}

pub fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().min_by(|a, b| compare_candidates(a, b))
}

/// Tags the selected candidate with the relaxation it needed, relative to the
/// first (strict) attempt.
pub fn classify(strict: &Candidate, best: &Candidate) -> Strategy {
    if best.unassigned > 0 {
        Strategy::Failed
    } else if best.conflicts == 0 {
        if best.attempt == 0 {
            Strategy::Strict
        } else {
            Strategy::RelaxedConstraints
        }
    } else if best.conflicts < strict.conflicts {
        Strategy::RelaxedConstraints
    } else {
        Strategy::ForcedPlacement
    }
}

/// Splits `students` into groups of roughly `preferred_group_size`.
///
/// Never fails: the group size is clamped, separations that cannot be honoured
/// are reported in the result, and the same input with the same options
/// always yields the same result.
pub fn generate_groups(
    students: &[StudentRecord],
    preferred_group_size: usize,
    options: &GroupingOptions,
) -> GroupingResult {
    if students.is_empty() {
        debug!("No students to group.");
        return GroupingResult::empty();
    }
    let start_time = Instant::now();

    let capacities = partition::plan(students.len(), preferred_group_size);
    let index = if options.respect_separations {
        SeparationIndex::build(students)
    } else {
        SeparationIndex::disabled(students.len())
    };
    let max_attempts = options.effective_attempts();
    info!(
        "Generating {} groups for {} students (preferred size {}, up to {} attempts)...",
        capacities.len(),
        students.len(),
        preferred_group_size,
        max_attempts
    );

    let mut candidates = Vec::new();
    for attempt in 0..max_attempts {
        let candidate = build_candidate(students, &capacities, options, &index, attempt);
        debug!(
            "Attempt {}: {} separation conflicts, balance {:?}",
            attempt, candidate.conflicts, candidate.balance
        );
        let accepted = candidate.conflicts == 0 && candidate.unassigned == 0;
        candidates.push(candidate);
        if accepted {
            break;
        }
    }

    let (Some(strict), Some(best)) = (candidates.first(), best_candidate(&candidates)) else {
        return GroupingResult::empty();
    };
    let strategy = classify(strict, best);
    if strategy == Strategy::Failed {
        warn!(
            "{} of {} students could not be placed in any group",
            best.unassigned,
            students.len()
        );
    }

    let groups: Vec<Vec<StudentId>> = best
        .buckets
        .iter()
        .map(|members| members.iter().map(|&i| students[i].id.clone()).collect())
        .collect();
    let unmet_objectives = describe_unmet_objectives(best, students, options, &index);

    info!(
        "Selected attempt {} of {} ({}): {} separation conflicts, found in {:.2?}",
        best.attempt + 1,
        candidates.len(),
        strategy,
        best.conflicts,
        start_time.elapsed()
    );

    GroupingResult {
        groups,
        strategy,
        separation_conflicts: best.conflicts,
        unassigned_count: best.unassigned,
        attempts: candidates.len() as u32,
        unmet_objectives,
    }
}

fn build_candidate(
    students: &[StudentRecord],
    capacities: &[usize],
    options: &GroupingOptions,
    index: &SeparationIndex,
    attempt: u32,
) -> Candidate {
    // one independent stream per attempt keeps every attempt reproducible
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    rng.set_stream(u64::from(attempt));

    let mut buckets = balancer::assign(students, capacities, options, &mut rng);
    if !index.is_empty() {
        let swaps = separation::repair(&mut buckets, index, students, students.len() * 2);
        trace!("Attempt {}: {} repair swaps", attempt, swaps);
    }
    for members in &mut buckets {
        members.sort_unstable();
    }

    let placed = buckets.iter().flatten().unique().count();
    Candidate {
        attempt,
        conflicts: index.count_conflicts(&buckets),
        balance: BalanceScore::measure(&buckets, students, options),
        unassigned: students.len().saturating_sub(placed),
        buckets,
    }
}

fn describe_unmet_objectives(
    candidate: &Candidate,
    students: &[StudentRecord],
    options: &GroupingOptions,
    index: &SeparationIndex,
) -> Vec<UnmetObjective> {
    let mut unmet = Vec::new();
    let buckets = &candidate.buckets;

    for (bucket, a, b) in index.conflicting_pairs(buckets) {
        unmet.push(UnmetObjective {
            objective_type: "Separation".to_string(),
            description: format!(
                "{} and {} must be kept apart but share group {}.",
                students[a].display_name(),
                students[b].display_name(),
                bucket + 1
            ),
        });
    }

    if options.pair_support_partners {
        for (bucket, members) in buckets.iter().enumerate() {
            let helpers = count_role(members, students, Role::NeedsHelp);
            if helpers > 0 && count_role(members, students, Role::SupportPartner) == 0 {
                unmet.push(UnmetObjective {
                    objective_type: "Support Pairing".to_string(),
                    description: format!(
                        "Group {} has {} student(s) needing help but no support partner.",
                        bucket + 1,
                        helpers
                    ),
                });
            }
        }
    }

    if options.balance_ability {
        let counts = buckets
            .iter()
            .map(|members| count_role(members, students, Role::NeedsHelp));
        if let Some((min, max)) = counts.minmax().into_option().filter(|(min, max)| max - min > 1) {
            unmet.push(UnmetObjective {
                objective_type: "Ability Balance".to_string(),
                description: format!(
                    "Groups hold between {} and {} students needing help.",
                    min, max
                ),
            });
        }
    }

    if options.balance_gender {
        let genders: Vec<Gender> = students.iter().map(|s| s.gender).unique().sorted().collect();
        for gender in genders {
            let counts = buckets.iter().map(|members| {
                members
                    .iter()
                    .filter(|&&i| students[i].gender == gender)
                    .count()
            });
            if let Some((min, max)) = counts
                .minmax()
                .into_option()
                .filter(|(min, max)| max - min > 1)
            {
                unmet.push(UnmetObjective {
                    objective_type: "Gender Balance".to_string(),
                    description: format!(
                        "Groups hold between {} and {} {} students.",
                        min, max, gender
                    ),
                });
            }
        }
    }

    unmet
}

fn count_role(members: &[usize], students: &[StudentRecord], role: Role) -> usize {
    members.iter().filter(|&&i| students[i].role() == role).count()
}
