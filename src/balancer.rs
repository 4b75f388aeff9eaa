//! Greedy, seeded placement of students into capacity-bounded buckets.
//!
//! Students are shuffled once, then placed in role order: help-needers,
//! one support partner per bucket holding help-needers, then everyone else.
//! Each placement picks the open bucket with the smallest objective key,
//! ties going to a rotated bucket rank drawn from the same generator. With
//! gender balancing on, the remaining students are dealt category by category
//! over the open slots instead.

use crate::data::{Gender, GroupingOptions, Role, StudentRecord};
use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Reverse;

/// Soft-objective penalties of a grouping, compared field by field in
/// priority order: pairing, then ability, then gender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BalanceScore {
    /// Help-needing students sharing a group with no support partner.
    pub uncovered_helpers: usize,
    /// How far the help-needer spread exceeds one.
    pub ability_excess: usize,
    /// Sum over gender categories of how far each spread exceeds one.
    pub gender_excess: usize,
}

impl BalanceScore {
    pub fn measure(
        buckets: &[Vec<usize>],
        students: &[StudentRecord],
        options: &GroupingOptions,
    ) -> Self {
        let mut score = BalanceScore::default();
        if buckets.is_empty() {
            return score;
        }

        if options.pair_support_partners {
            score.uncovered_helpers = buckets
                .iter()
                .filter(|members| !members.iter().any(|&i| is_partner(&students[i])))
                .map(|members| count_role(members, students, Role::NeedsHelp))
                .sum();
        }

        if options.balance_ability {
            let counts = buckets
                .iter()
                .map(|members| count_role(members, students, Role::NeedsHelp));
            score.ability_excess = spread(counts).saturating_sub(1);
        }

        if options.balance_gender {
            score.gender_excess = students
                .iter()
                .map(|s| s.gender)
                .unique()
                .map(|gender| {
                    let counts = buckets
                        .iter()
                        .map(|members| count_gender(members, students, gender));
                    spread(counts).saturating_sub(1)
                })
                .sum();
        }
        score
    }

    pub fn is_perfect(&self) -> bool {
        *self == BalanceScore::default()
    }
}

/// Places every student into a bucket. Buckets are filled up to their
/// capacity, never beyond; a student that finds no open bucket is left out.
pub fn assign<R: Rng>(
    students: &[StudentRecord],
    capacities: &[usize],
    options: &GroupingOptions,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let group_count = capacities.len();
    if group_count == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..students.len()).collect();
    order.shuffle(rng);
    let start = rng.gen_range(0..group_count);
    let mut buckets = Buckets::new(students, capacities, start);

    let split_roles = options.balance_ability || options.pair_support_partners;
    let mut helpers = Vec::new();
    let mut partners = Vec::new();
    let mut others = Vec::new();
    for i in order {
        match students[i].role() {
            Role::NeedsHelp if split_roles => helpers.push(i),
            Role::SupportPartner if options.pair_support_partners => partners.push(i),
            _ => others.push(i),
        }
    }

    let pairing = options.pair_support_partners && !helpers.is_empty() && !partners.is_empty();
    // with fewer partners than groups, keep help-needers where partners can reach them
    let targets: Vec<usize> = if pairing {
        buckets.by_capacity().take(partners.len()).collect()
    } else {
        (0..group_count).collect()
    };
    let reserve = usize::from(pairing);

    for &h in &helpers {
        let gender = students[h].gender;
        let key = |b: usize| {
            (
                if options.balance_ability { buckets.helpers(b) } else { 0 },
                if options.balance_gender { buckets.gender_count(b, gender) } else { 0 },
                buckets.len(b),
            )
        };
        let choice = buckets
            .pick(targets.iter().copied().filter(|&b| buckets.room(b) > reserve), key)
            .or_else(|| buckets.pick(buckets.open(), key));
        if let Some(b) = choice {
            buckets.place(b, h);
        }
    }

    if pairing {
        let mut needy: Vec<usize> = (0..group_count).filter(|&b| buckets.helpers(b) > 0).collect();
        needy.sort_by_key(|&b| (Reverse(buckets.helpers(b)), buckets.rank[b]));
        for b in needy {
            if partners.is_empty() {
                break;
            }
            if buckets.room(b) == 0 {
                continue;
            }
            let pos = if options.balance_gender {
                partners
                    .iter()
                    .position_min_by_key(|&&p| buckets.gender_count(b, students[p].gender))
                    .unwrap_or(0)
            } else {
                0
            };
            let partner = partners.remove(pos);
            buckets.place(b, partner);
        }
    }
    others.extend(partners);

    if options.balance_gender {
        let mut categories: Vec<(Gender, Vec<usize>)> = others
            .iter()
            .copied()
            .into_group_map_by(|&i| students[i].gender)
            .into_iter()
            .collect();
        categories.sort_by_key(|(gender, members)| (Reverse(members.len()), *gender));
        // dealing each category's run over the slots cycle by cycle spreads it
        // across buckets with at most one more in any bucket
        let slots = buckets.slots();
        let dealt = categories.into_iter().flat_map(|(_, members)| members);
        for (s, b) in dealt.zip(slots) {
            buckets.place(b, s);
        }
    } else {
        for &s in &others {
            if let Some(b) = buckets.pick(buckets.open(), |b| buckets.len(b)) {
                buckets.place(b, s);
            }
        }
    }

    buckets.members
}

struct Buckets<'a> {
    students: &'a [StudentRecord],
    capacities: &'a [usize],
    members: Vec<Vec<usize>>,
    rank: Vec<usize>,
}

impl<'a> Buckets<'a> {
    fn new(students: &'a [StudentRecord], capacities: &'a [usize], start: usize) -> Self {
        let count = capacities.len();
        Buckets {
            students,
            capacities,
            members: capacities.iter().map(|&c| Vec::with_capacity(c)).collect(),
            rank: (0..count).map(|b| (b + count - start) % count).collect(),
        }
    }

    fn len(&self, b: usize) -> usize {
        self.members[b].len()
    }

    fn room(&self, b: usize) -> usize {
        self.capacities[b].saturating_sub(self.members[b].len())
    }

    fn open(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.members.len()).filter(|&b| self.room(b) > 0)
    }

    fn by_capacity(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.members.len()).sorted_by_key(|&b| (Reverse(self.capacities[b]), self.rank[b]))
    }

    /// Open slots in dealing order: each round visits every bucket that still
    /// has room, roomiest first.
    fn slots(&self) -> Vec<usize> {
        let order: Vec<usize> = (0..self.members.len())
            .sorted_by_key(|&b| (Reverse(self.room(b)), self.rank[b]))
            .collect();
        let rounds = order.first().map_or(0, |&b| self.room(b));
        let mut slots = Vec::new();
        for round in 0..rounds {
            for &b in &order {
                if self.room(b) > round {
                    slots.push(b);
                }
            }
        }
        slots
    }

    fn helpers(&self, b: usize) -> usize {
        count_role(&self.members[b], self.students, Role::NeedsHelp)
    }

    fn gender_count(&self, b: usize, gender: Gender) -> usize {
        count_gender(&self.members[b], self.students, gender)
    }

    fn pick<K: Ord>(
        &self,
        candidates: impl IntoIterator<Item = usize>,
        key: impl Fn(usize) -> K,
    ) -> Option<usize> {
        candidates
            .into_iter()
            .min_by_key(|&b| (key(b), self.rank[b]))
    }

    fn place(&mut self, b: usize, student: usize) {
        self.members[b].push(student);
    }
}

fn is_partner(student: &StudentRecord) -> bool {
    student.role() == Role::SupportPartner
}

fn count_role(members: &[usize], students: &[StudentRecord], role: Role) -> usize {
    members.iter().filter(|&&i| students[i].role() == role).count()
}

fn count_gender(members: &[usize], students: &[StudentRecord], gender: Gender) -> usize {
    members.iter().filter(|&&i| students[i].gender == gender).count()
}

fn spread(counts: impl Iterator<Item = usize>) -> usize {
    counts
        .minmax()
        .into_option()
        .map_or(0, |(min, max)| max - min)
}
