use crate::heuristics::{HeuristicsMap, INFINITY};
use crate::model::player::PlayerId;
use crate::model::round::required_sit_outs;
use rand::Rng;
use rand::seq::SliceRandom;

/// Probability that the first candidate is drawn on a visit.
pub const DEFAULT_BASE_CHANCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitOutSelection {
    /// Players sitting out, sorted by id.
    pub sit_outs: Vec<PlayerId>,
    /// Players left to form teams, in random order.
    pub remaining: Vec<PlayerId>,
}

fn sit_out_stats(heuristics: &HeuristicsMap, player: &PlayerId) -> (u32, u32) {
    heuristics
        .get(player)
        .map_or((INFINITY, 0), |stats| (stats.rounds_since_sit_out, stats.sit_out_count))
}

/// Chooses who sits out this round.
///
/// Volunteers on the roster always sit out. Of the others, enough sit out to
/// fit the courts (or make the count divisible by four), drawn first from the
/// players with the fewest sit-outs and biased towards those who sat out
/// longest ago.
pub fn select_sit_outs<R: Rng + ?Sized>(
    heuristics: &HeuristicsMap,
    roster: &[PlayerId],
    courts: usize,
    volunteers: &[PlayerId],
    base_chance: f64,
    rng: &mut R,
) -> SitOutSelection {
    let mut sitting: Vec<PlayerId> = Vec::new();
    for volunteer in volunteers {
        if roster.contains(volunteer) && !sitting.contains(volunteer) {
            sitting.push(volunteer.clone());
        }
    }

    let mut candidates: Vec<PlayerId> = roster
        .iter()
        .filter(|player| !sitting.contains(player))
        .cloned()
        .collect();
    let needed = required_sit_outs(candidates.len(), courts);

    // Everyone starts level, so shuffle before the stable sort.
    candidates.shuffle(rng);
    candidates.sort_by(|a, b| sit_out_stats(heuristics, b).0.cmp(&sit_out_stats(heuristics, a).0));

    let fewest = candidates
        .iter()
        .map(|player| sit_out_stats(heuristics, player).1)
        .min()
        .unwrap_or(0);
    let (eligible, already): (Vec<PlayerId>, Vec<PlayerId>) = candidates
        .into_iter()
        .partition(|player| sit_out_stats(heuristics, player).1 == fewest);

    let mut remaining = if needed >= eligible.len() {
        let shortfall = needed - eligible.len();
        sitting.extend(eligible);
        let (picked, rest) = pick_biased(already, shortfall, base_chance, rng);
        sitting.extend(picked);
        rest
    } else {
        let (picked, mut rest) = pick_biased(eligible, needed, base_chance, rng);
        sitting.extend(picked);
        rest.extend(already);
        rest
    };

    sitting.sort();
    remaining.shuffle(rng);
    SitOutSelection {
        sit_outs: sitting,
        remaining,
    }
}

/// Draws `count` items, favouring the front of `list`.
///
/// Walks the list repeatedly; the item at position `i` of the `len` still
/// available is taken with probability `(len - i) / len * base_chance`.
/// Returns the picked items and the rest in their original order.
pub fn pick_biased<T, R: Rng + ?Sized>(
    list: Vec<T>,
    count: usize,
    base_chance: f64,
    rng: &mut R,
) -> (Vec<T>, Vec<T>) {
    if count == 0 {
        return (Vec::new(), list);
    }
    if count >= list.len() {
        return (list, Vec::new());
    }

    let base = if base_chance.is_nan() || base_chance <= 0.0 {
        DEFAULT_BASE_CHANCE
    } else {
        base_chance.min(1.0)
    };

    let mut remaining = list;
    let mut picked = Vec::with_capacity(count);
    let mut index = 0;
    while picked.len() < count {
        let len = remaining.len() as f64;
        let chance = (len - index as f64) / len * base;
        if rng.gen_range(0.0..1.0) < chance {
            picked.push(remaining.remove(index));
        } else {
            index += 1;
        }
        index %= remaining.len();
    }
    (picked, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::compute_heuristics;
    use crate::model::player::roster;
    use crate::model::round::Round;
    use crate::model::team::{Match, Team};
    use rand::SeedableRng;
    use rand::rngs::{SmallRng, StdRng};

    fn id(value: &str) -> PlayerId {
        PlayerId::from(value)
    }

    #[test]
    fn volunteers_always_sit_out() {
        let players = roster(["a", "b", "c", "d", "e", "f"]);
        let heuristics = compute_heuristics(&[], &players, None);
        let volunteers = vec![id("f"), id("zed"), id("f")];
        for seed in 0..16 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let selection = select_sit_outs(&heuristics, &players, 1, &volunteers, 0.6, &mut rng);
            assert!(selection.sit_outs.contains(&id("f")));
            assert!(!selection.sit_outs.contains(&id("zed")));
            assert_eq!(selection.sit_outs.len(), 2);
            assert_eq!(selection.remaining.len(), 4);
        }
    }

    #[test]
    fn fewest_sit_outs_are_mandatory() {
        let players = roster(["a", "b", "c", "d", "e"]);
        let rounds = vec![
            Round::new(vec![Match::new(Team::new("a", "b"), Team::new("c", "d"))], vec![id("e")]),
            Round::new(vec![Match::new(Team::new("a", "e"), Team::new("c", "d"))], vec![id("b")]),
            Round::new(vec![Match::new(Team::new("b", "e"), Team::new("a", "d"))], vec![id("c")]),
            Round::new(vec![Match::new(Team::new("b", "e"), Team::new("a", "c"))], vec![id("d")]),
        ];
        let heuristics = compute_heuristics(&rounds, &players, None);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select_sit_outs(&heuristics, &players, 1, &[], 0.6, &mut rng);
            assert_eq!(selection.sit_outs, vec![id("a")]);
            let mut rest = selection.remaining.clone();
            rest.sort();
            assert_eq!(rest, roster(["b", "c", "d", "e"]));
        }
    }

    #[test]
    fn shortfall_comes_from_longest_rested() {
        let players = roster(["a", "b", "c", "d", "e", "f"]);
        let rounds = vec![Round::new(
            vec![Match::new(Team::new("a", "b"), Team::new("c", "d"))],
            vec![id("e")],
        )];
        // f is treated as a late arrival with one sit-out, so only a..d are level.
        let heuristics = compute_heuristics(&rounds, &players, None);
        let mut rng = SmallRng::seed_from_u64(11);
        let selection = select_sit_outs(&heuristics, &players, 1, &[], 0.6, &mut rng);
        assert_eq!(selection.sit_outs.len(), 2);
        assert!(!selection.sit_outs.contains(&id("e")));
        assert!(!selection.sit_outs.contains(&id("f")));
    }

    #[test]
    fn biased_pick_returns_exact_counts() {
        let mut rng = SmallRng::seed_from_u64(2);
        let (picked, rest) = pick_biased((0..7).collect::<Vec<_>>(), 3, 0.6, &mut rng);
        assert_eq!(picked.len(), 3);
        assert_eq!(rest.len(), 4);
        let mut all: Vec<_> = picked.iter().chain(rest.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..7).collect::<Vec<_>>());

        let (picked, rest) = pick_biased(vec![1, 2], 5, 0.6, &mut rng);
        assert_eq!((picked, rest), (vec![1, 2], vec![]));
        let (picked, rest) = pick_biased(vec![1, 2], 0, 0.0, &mut rng);
        assert_eq!((picked, rest), (vec![], vec![1, 2]));
    }

    #[test]
    fn biased_pick_prefers_front() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut first = 0;
        let mut last = 0;
        for _ in 0..2000 {
            let (picked, _) = pick_biased((0..5).collect::<Vec<_>>(), 1, 0.6, &mut rng);
            match picked[0] {
                0 => first += 1,
                4 => last += 1,
                _ => {}
            }
        }
        assert!(first > last * 2, "first {first} last {last}");
    }
}
