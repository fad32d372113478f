//! AI frame benchmarks
//!
//! Measures a full manager tick and its heaviest pieces against the
//! 2ms-per-frame AI budget.
//!
//! Run with: cargo bench --bench race_tick

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kart_rivals_ai::config::{AiConfig, DifficultyLevel, PathfindingConfig};
use kart_rivals_ai::race::state::{GameState, PlayerState, PowerUpKind, PowerUpPickup};
use kart_rivals_ai::race::systems::manager::AiManager;
use kart_rivals_ai::race::systems::pathfinding::{LineType, PathFinding, PathOptions};
use kart_rivals_ai::race::track::Track;
use kart_rivals_ai::util::vec3::Vec3;
use rand::Rng;

const DT: f32 = 1.0 / 60.0;

/// Manager with a seeded race and a player sitting on the start line
fn create_race(opponents: usize, adaptive: bool) -> (AiManager, PlayerState, GameState) {
    let mut config = AiConfig::default();
    config.manager.seed = Some(42);
    config.manager.adaptive_budget = adaptive;
    let mut manager = AiManager::new(config);
    manager.initialize_race(opponents, DifficultyLevel::Medium, None);

    let line = manager.pathfinding().racing_line();
    let player = PlayerState::new(line[0].position, line[0].direction.heading());

    let mut rng = rand::thread_rng();
    let mut game = GameState::new(0);
    for _ in 0..6 {
        let lp = line[rng.gen_range(0..line.len())];
        game.power_ups.push(PowerUpPickup {
            kind: PowerUpKind::SpeedBoost,
            position: lp.position,
        });
    }
    (manager, player, game)
}

/// Benchmark a full manager tick at various field sizes
fn bench_manager_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_tick");
    group.sample_size(50);

    for count in [1, 4, 7] {
        let (mut manager, player, mut game) = create_race(count, false);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("opponents", count), &count, |b, _| {
            b.iter(|| {
                game.time_ms += 16;
                black_box(manager.update(DT, &game, &player));
            })
        });
    }
    group.finish();
}

/// Benchmark path queries with and without the cache
fn bench_path_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_queries");
    group.sample_size(50);

    let mut pf = PathFinding::new(Track::default_circuit(), PathfindingConfig::default());
    let line: Vec<Vec3> = pf.racing_line().iter().map(|p| p.position).collect();
    for i in (0..line.len()).step_by(4) {
        pf.add_static_obstacle(line[i] + Vec3::ground(1.0, 1.0), 2.0);
    }
    let options = PathOptions {
        avoid_obstacles: true,
        ..PathOptions::with_line(LineType::Aggressive)
    };

    group.bench_function("uncached", |b| {
        b.iter(|| black_box(pf.calculate_path(line[0], line[line.len() / 2], &options)))
    });

    group.bench_function("cached", |b| {
        b.iter(|| black_box(pf.find_optimal_path(line[0], line[line.len() / 2], &options)))
    });
    group.finish();
}

/// Benchmark racing line construction for different track resolutions
fn bench_line_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_analysis");
    group.sample_size(30);

    for segments in [32, 128, 512] {
        let track = Track::circular(segments, 400.0, 30.0);
        group.throughput(Throughput::Elements(segments as u64));
        group.bench_with_input(BenchmarkId::new("segments", segments), &segments, |b, _| {
            b.iter(|| black_box(PathFinding::new(track.clone(), PathfindingConfig::default())))
        });
    }
    group.finish();
}

/// Frame budget check: a full field should stay well under 2ms per tick
fn bench_frame_budget(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_budget");
    group.sample_size(100);
    group.measurement_time(std::time::Duration::from_secs(10));

    let (mut manager, player, mut game) = create_race(7, true);
    group.bench_function("adaptive_7", |b| {
        b.iter(|| {
            game.time_ms += 16;
            black_box(manager.update(DT, &game, &player));
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_manager_tick,
    bench_path_queries,
    bench_line_analysis,
    bench_frame_budget,
);
criterion_main!(benches);
