//! Scalability benchmarks for the KOTH server tick
//!
//! Player ids are u8, so counts top out at 255.
//!
//! Run with: cargo bench --bench scalability

use std::cell::Cell;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use koth_sync::config::KothConfig;
use koth_sync::game::level::LevelDefinition;
use koth_sync::game::state::{Roster, RosterPlayer, Team};
use koth_sync::game::systems::presence::sample_presence;
use koth_sync::metrics::KothMetrics;
use koth_sync::net::session::{KothSession, MultiplayerEnv, ProcessRole};
use koth_sync::util::vec3::Vec3;
use rand::Rng;

const PLAYER_COUNTS: [u8; 4] = [16, 64, 128, 255];

struct BenchEnv {
    now: Cell<u64>,
}

impl MultiplayerEnv for BenchEnv {
    fn is_multiplayer_active(&self) -> bool {
        true
    }
    fn is_authoritative_server(&self) -> bool {
        true
    }
    fn is_listen_server(&self) -> bool {
        false
    }
    fn gameplay_is_active(&self) -> bool {
        true
    }
    fn now_ms(&self) -> u64 {
        let now = self.now.get() + 16;
        self.now.set(now);
        now
    }
}

/// Roster with players spread across the demo level
fn create_roster(count: u8) -> Roster {
    let mut roster = Roster::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let id = i + 1;
        let team = if i % 2 == 0 { Team::Red } else { Team::Blue };
        roster.add_player(RosterPlayer::new(id, format!("Player{}", id), Some(team)));
        let position = Vec3::new(
            rng.gen_range(-60.0..60.0),
            rng.gen_range(0.0..8.0),
            rng.gen_range(-20.0..20.0),
        );
        roster.spawn_at(id, position);
    }
    roster
}

/// Benchmark presence sampling for a single hill
fn bench_presence(c: &mut Criterion) {
    let mut group = c.benchmark_group("presence");
    group.sample_size(50);

    let mut session = KothSession::new(KothConfig::default(), ProcessRole::Server, Arc::new(KothMetrics::new()));
    session.load_level_definition(&LevelDefinition::demo());

    for count in PLAYER_COUNTS {
        let roster = create_roster(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("all_hills", count), &count, |b, _| {
            b.iter(|| {
                for hill in &session.state().hills {
                    black_box(sample_presence(&hill.volume, &roster));
                }
            })
        });
    }
    group.finish();
}

/// Benchmark a full server frame (tick, scoring, broadcast decision)
fn bench_server_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("server_frame");
    group.sample_size(50);

    for count in PLAYER_COUNTS {
        let mut roster = create_roster(count);
        let env = BenchEnv { now: Cell::new(0) };
        let mut session = KothSession::new(KothConfig::default(), ProcessRole::Server, Arc::new(KothMetrics::new()));
        session.load_level_definition(&LevelDefinition::demo());

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("frame", count), &count, |b, _| {
            b.iter(|| {
                black_box(session.frame(&env, &mut roster, &[]));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_presence, bench_server_frame);
criterion_main!(benches);
