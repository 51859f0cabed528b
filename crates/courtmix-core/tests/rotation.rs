use courtmix_core::heuristics::compute_heuristics;
use courtmix_core::model::player::{PlayerId, roster};
use courtmix_core::model::round::Round;
use courtmix_core::pairing::{PlannerConfig, RoundRequest, plan_next_round};
use courtmix_core::session::Session;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

fn players(count: usize) -> Vec<PlayerId> {
    roster((0..count).map(|index| format!("p{index}")))
}

fn play(count: usize, courts: usize, rounds: usize, config: &PlannerConfig, seed: u64) -> Session {
    let mut session = Session::new(players(count), courts).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    for _ in 0..rounds {
        session.next_round(&[], config, &mut rng).unwrap();
    }
    session
}

fn max_partner_repeats(session: &Session) -> u32 {
    session
        .heuristics()
        .values()
        .map(|stats| stats.played_with_count.max)
        .max()
        .unwrap_or(0)
}

#[test]
fn generated_rounds_partition_the_roster() {
    let mut rng = SmallRng::seed_from_u64(99);
    let config = PlannerConfig {
        attempts: 4,
        lookahead: 2,
        ..PlannerConfig::default()
    };

    for _ in 0..12 {
        let count = rng.gen_range(6..=14);
        let courts = rng.gen_range(1..=3);
        let roster = players(count);
        let volunteers: Vec<PlayerId> = roster
            .iter()
            .filter(|_| rng.gen_range(0.0..1.0) < 0.15)
            .take(2)
            .cloned()
            .collect();

        let mut history: Vec<Round> = Vec::new();
        for _ in 0..3 {
            let request = RoundRequest::new(&history, &roster, courts).with_volunteers(&volunteers);
            let round = plan_next_round(request, &config, &mut rng).unwrap();

            assert_eq!(round.validate_against(&roster, courts), Ok(()));
            assert!(volunteers.iter().all(|player| round.is_sitting_out(player)));
            assert_eq!(round.matches.len(), (count - round.sit_outs.len()) / 4);
            assert!(round.matches.len() <= courts);
            history.push(round);
        }
    }
}

#[test]
fn four_players_rotate_through_every_partner() {
    for seed in 0..4 {
        let session = play(4, 1, 3, &PlannerConfig::default(), seed);
        let heuristics = session.heuristics();
        for stats in heuristics.values() {
            assert_eq!(stats.played_with_count.max, 1, "seed {seed}");
            assert_eq!(stats.played_with_count.min, 1, "seed {seed}");
        }
    }
}

#[test]
fn eight_players_partner_everyone_once_in_seven_rounds() {
    for seed in [12, 19] {
        let session = play(8, 2, 7, &PlannerConfig::default(), seed);
        for stats in session.heuristics().values() {
            assert_eq!(stats.played_with_count.max, 1, "seed {seed}");
            assert_eq!(stats.played_with_count.min, 1, "seed {seed}");
        }
    }
}

#[test]
fn heuristics_are_stable_across_calls() {
    let session = play(7, 1, 4, &PlannerConfig::default(), 3);
    let rounds = session.rounds().to_vec();
    let first = compute_heuristics(&rounds, session.roster(), None);
    let second = compute_heuristics(&rounds, session.roster(), None);
    assert_eq!(first, second);
    assert_eq!(rounds, session.rounds());
}

#[test]
fn nine_players_three_courts_never_repeat_partners() {
    let config = PlannerConfig {
        attempts: 40,
        lookahead: 3,
        ..PlannerConfig::default()
    };
    let session = play(9, 3, 9, &config, 2024);
    assert_eq!(max_partner_repeats(&session), 1);
}

#[test]
fn five_players_cover_every_team_in_five_rounds() {
    let session = play(5, 1, 5, &PlannerConfig::default(), 5);
    let mut teams = BTreeSet::new();
    let mut benched = BTreeSet::new();
    for round in session.rounds() {
        for game in &round.matches {
            teams.extend(game.teams().iter().cloned());
        }
        benched.extend(round.sit_outs.iter().cloned());
    }
    assert_eq!(benched.len(), 5);
    assert_eq!(teams.len(), 10);
}
