//! Two-member grouping by deferred acceptance followed by local swaps.
//!
//! Members are dense indices into a [`PreferenceMatrix`]. Half of them seed
//! one slot each; the rest propose to slots in order of how much they like the
//! occupants until every slot holds two members. The result is a good pairing,
//! not a provably stable one.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense square matrix of directed preferences. `get(a, b)` is how much `a`
/// wants to be grouped with `b`; the diagonal is never read.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceMatrix {
    size: usize,
    scores: Vec<f64>,
}

impl PreferenceMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            scores: vec![0.0; size * size],
        }
    }

    /// Builds a matrix by evaluating `score(from, to)` for every off-diagonal cell.
    pub fn from_fn(size: usize, mut score: impl FnMut(usize, usize) -> f64) -> Self {
        let mut matrix = Self::new(size);
        for from in 0..size {
            for to in (0..size).filter(|to| *to != from) {
                matrix.set(from, to, score(from, to));
            }
        }
        matrix
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.scores[from * self.size + to]
    }

    pub fn set(&mut self, from: usize, to: usize, score: f64) {
        self.scores[from * self.size + to] = score;
    }

    /// Mean of both directions.
    pub fn mutual(&self, a: usize, b: usize) -> f64 {
        (self.get(a, b) + self.get(b, a)) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Swap passes over the still-open slots after each admission round.
    pub swap_passes: usize,
    /// Swap passes over every slot once grouping is complete.
    pub final_swap_passes: usize,
    /// Upper bound on proposal passes within one admission round.
    pub max_proposal_passes: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            swap_passes: 2,
            final_swap_passes: 4,
            max_proposal_passes: 4096,
        }
    }
}

/// Groups found by [`PairMatcher::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    /// Each pair in ascending member order.
    pub pairs: Vec<[usize; 2]>,
    /// The member left without a partner when the member count is odd.
    pub leftover: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    ProposalDeadlock { passes: usize },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::ProposalDeadlock { passes } => {
                write!(f, "proposals did not settle within {passes} passes")
            }
        }
    }
}

impl std::error::Error for MatchError {}

#[derive(Debug, Clone)]
struct Slot {
    members: Vec<usize>,
}

impl Slot {
    fn is_full(&self) -> bool {
        self.members.len() == 2
    }
}

pub struct PairMatcher<'a> {
    preferences: &'a PreferenceMatrix,
    config: MatcherConfig,
}

impl<'a> PairMatcher<'a> {
    pub fn new(preferences: &'a PreferenceMatrix, config: MatcherConfig) -> Self {
        Self {
            preferences,
            config,
        }
    }

    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Pairing, MatchError> {
        let total = self.preferences.len();
        let mut order: Vec<usize> = (0..total).collect();
        order.shuffle(rng);

        let slot_count = total / 2;
        let mut slots: Vec<Slot> = order[..slot_count]
            .iter()
            .map(|member| Slot {
                members: vec![*member],
            })
            .collect();
        let mut ungrouped: Vec<usize> = order[slot_count..].to_vec();
        let mut open: Vec<usize> = (0..slot_count).collect();
        let mut closed: Vec<usize> = Vec::with_capacity(slot_count);

        while !ungrouped.is_empty() && !open.is_empty() {
            self.admit(&mut slots, &open, &mut ungrouped)?;
            self.swap(&mut slots, &open, self.config.swap_passes);

            let nobody_left = ungrouped.is_empty();
            open.retain(|index| {
                let done = slots[*index].is_full() || nobody_left;
                if done {
                    closed.push(*index);
                }
                !done
            });
        }
        closed.append(&mut open);

        self.swap(&mut slots, &closed, self.config.final_swap_passes);

        let mut leftover = ungrouped.pop();
        let mut pairs = Vec::with_capacity(closed.len());
        for index in closed {
            match slots[index].members.as_slice() {
                [a, b] => pairs.push(if a < b { [*a, *b] } else { [*b, *a] }),
                [single] if leftover.is_none() => leftover = Some(*single),
                _ => {}
            }
        }

        Ok(Pairing { pairs, leftover })
    }

    /// One round of deferred acceptance: every ungrouped member proposes to
    /// open slots until each is either held by a slot or has tried them all.
    /// Holders are then committed to their slots.
    fn admit(
        &self,
        slots: &mut [Slot],
        open: &[usize],
        ungrouped: &mut Vec<usize>,
    ) -> Result<(), MatchError> {
        let proposers = ungrouped.clone();
        let width = open.len();

        let rankings: Vec<Vec<usize>> = proposers
            .iter()
            .map(|member| {
                let mut ranked: Vec<(usize, f64)> = open
                    .iter()
                    .enumerate()
                    .map(|(position, slot)| {
                        (position, self.one_sided(*member, &slots[*slot].members))
                    })
                    .collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                ranked.into_iter().map(|(position, _)| position).collect()
            })
            .collect();

        let mut tried = vec![false; proposers.len() * width];
        let mut settled = vec![false; proposers.len()];
        let mut held: Vec<Option<(usize, f64)>> = vec![None; width];
        let mut passes = 0;

        while settled.iter().any(|done| !done) {
            passes += 1;
            if passes > self.config.max_proposal_passes {
                return Err(MatchError::ProposalDeadlock {
                    passes: self.config.max_proposal_passes,
                });
            }

            for proposer in 0..proposers.len() {
                if settled[proposer] {
                    continue;
                }
                let row = &mut tried[proposer * width..(proposer + 1) * width];
                if row.iter().all(|done| *done) {
                    settled[proposer] = true;
                    continue;
                }

                for &position in &rankings[proposer] {
                    if row[position] {
                        continue;
                    }
                    row[position] = true;

                    let score = self.combined(proposers[proposer], &slots[open[position]].members);
                    let accept = match held[position] {
                        None => true,
                        Some((holder, held_score)) if score > held_score => {
                            settled[holder] = false;
                            true
                        }
                        Some(_) => false,
                    };
                    if accept {
                        held[position] = Some((proposer, score));
                        settled[proposer] = true;
                        break;
                    }
                }
            }
        }

        for (position, holder) in held.into_iter().enumerate() {
            if let Some((proposer, _)) = holder {
                let member = proposers[proposer];
                slots[open[position]].members.push(member);
                ungrouped.retain(|candidate| *candidate != member);
            }
        }

        Ok(())
    }

    /// Swaps members between slots whenever that raises the combined score of
    /// both slots. Each member moves at most once per pass.
    fn swap(&self, slots: &mut [Slot], scope: &[usize], passes: usize) {
        for _ in 0..passes {
            for (i, &left) in scope.iter().enumerate() {
                for seat in 0..slots[left].members.len() {
                    'search: for (j, &right) in scope.iter().enumerate() {
                        if i == j {
                            continue;
                        }
                        for other_seat in 0..slots[right].members.len() {
                            let member = slots[left].members[seat];
                            let other = slots[right].members[other_seat];
                            let before = self.slot_score(&slots[left].members)
                                + self.slot_score(&slots[right].members);

                            let mut left_after = slots[left].members.clone();
                            left_after[seat] = other;
                            let mut right_after = slots[right].members.clone();
                            right_after[other_seat] = member;
                            let after =
                                self.slot_score(&left_after) + self.slot_score(&right_after);

                            if after > before {
                                slots[left].members = left_after;
                                slots[right].members = right_after;
                                break 'search;
                            }
                        }
                    }
                }
            }
        }
    }

    fn slot_score(&self, members: &[usize]) -> f64 {
        match members {
            [a, b] => self.preferences.mutual(*a, *b),
            _ => 0.0,
        }
    }

    /// How much `member` wants the occupants of a slot.
    fn one_sided(&self, member: usize, occupants: &[usize]) -> f64 {
        mean(occupants.iter().map(|other| self.preferences.get(member, *other)))
    }

    fn combined(&self, member: usize, occupants: &[usize]) -> f64 {
        mean(occupants.iter().map(|other| self.preferences.mutual(member, *other)))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn favoring(size: usize, liked: &[(usize, usize)]) -> PreferenceMatrix {
        PreferenceMatrix::from_fn(size, |from, to| {
            if liked.contains(&(from, to)) || liked.contains(&(to, from)) {
                10.0
            } else {
                1.0
            }
        })
    }

    fn covered(pairing: &Pairing) -> Vec<usize> {
        let mut members: Vec<usize> = pairing.pairs.iter().flatten().copied().collect();
        members.extend(pairing.leftover);
        members.sort_unstable();
        members
    }

    #[test]
    fn finds_obvious_pairs_for_any_seed() {
        let matrix = favoring(4, &[(0, 3), (1, 2)]);
        for seed in 0..32 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut pairing = PairMatcher::new(&matrix, MatcherConfig::default())
                .solve(&mut rng)
                .unwrap();
            pairing.pairs.sort_unstable();
            assert_eq!(pairing.pairs, vec![[0, 3], [1, 2]], "seed {seed}");
            assert_eq!(pairing.leftover, None);
        }
    }

    #[test]
    fn larger_groups_cover_everyone_once() {
        let matrix = PreferenceMatrix::from_fn(12, |from, to| ((from * 7 + to * 3) % 11) as f64);
        let mut rng = SmallRng::seed_from_u64(9);
        let pairing = PairMatcher::new(&matrix, MatcherConfig::default())
            .solve(&mut rng)
            .unwrap();
        assert_eq!(pairing.pairs.len(), 6);
        assert_eq!(covered(&pairing), (0..12).collect::<Vec<_>>());
        assert!(pairing.pairs.iter().all(|[a, b]| a < b));
    }

    #[test]
    fn odd_count_leaves_one_member() {
        let matrix = favoring(5, &[(0, 1), (2, 3)]);
        let mut rng = SmallRng::seed_from_u64(3);
        let pairing = PairMatcher::new(&matrix, MatcherConfig::default())
            .solve(&mut rng)
            .unwrap();
        assert_eq!(pairing.pairs.len(), 2);
        assert!(pairing.leftover.is_some());
        assert_eq!(covered(&pairing), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn degenerate_sizes() {
        let mut rng = SmallRng::seed_from_u64(1);
        let empty = PreferenceMatrix::new(0);
        let pairing = PairMatcher::new(&empty, MatcherConfig::default())
            .solve(&mut rng)
            .unwrap();
        assert!(pairing.pairs.is_empty());
        assert_eq!(pairing.leftover, None);

        let single = PreferenceMatrix::new(1);
        let pairing = PairMatcher::new(&single, MatcherConfig::default())
            .solve(&mut rng)
            .unwrap();
        assert_eq!(pairing.leftover, Some(0));

        let two = PreferenceMatrix::new(2);
        let pairing = PairMatcher::new(&two, MatcherConfig::default())
            .solve(&mut rng)
            .unwrap();
        assert_eq!(pairing.pairs, vec![[0, 1]]);
    }

    #[test]
    fn zero_proposal_budget_deadlocks() {
        let matrix = PreferenceMatrix::new(4);
        let config = MatcherConfig {
            max_proposal_passes: 0,
            ..MatcherConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let result = PairMatcher::new(&matrix, config).solve(&mut rng);
        assert_eq!(result, Err(MatchError::ProposalDeadlock { passes: 0 }));
    }
}
