use courtmix_core::model::player::{PlayerId, roster};
use courtmix_core::pairing::{PlannerConfig, RoundRequest, plan_next_round};
use courtmix_core::session::Session;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn players(count: usize) -> Vec<PlayerId> {
    roster((0..count).map(|index| format!("p{index:02}")))
}

/// Session with `rounds` already played, so heuristics are non-trivial.
fn warmed_session(count: usize, courts: usize, rounds: usize) -> Session {
    let mut session = Session::new(players(count), courts).expect("valid roster");
    let mut rng = SmallRng::seed_from_u64(20);
    let config = PlannerConfig {
        attempts: 4,
        ..PlannerConfig::default()
    };
    for _ in 0..rounds {
        session.next_round(&[], &config, &mut rng).expect("round");
    }
    session
}

fn bench_plan_next_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_next_round");

    for (count, courts) in [(9usize, 2usize), (14, 3), (24, 6)] {
        let session = warmed_session(count, courts, 6);
        let config = PlannerConfig::default();
        group.bench_function(format!("players{count}_courts{courts}"), |b| {
            b.iter_batched(
                || SmallRng::seed_from_u64(7),
                |mut rng| {
                    let request = RoundRequest::new(session.rounds(), session.roster(), courts);
                    black_box(plan_next_round(request, &config, &mut rng).expect("plan"))
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan_next_round);
criterion_main!(benches);
