use kart_rivals_ai::config::{AiConfig, DifficultyLevel};
use kart_rivals_ai::race::state::{DebrisItem, GameState, PlayerState, PowerUpKind, PowerUpPickup};
use kart_rivals_ai::race::systems::manager::AiManager;
use kart_rivals_ai::race::systems::pathfinding::RacingLinePoint;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Simulation tick rate
const TICK_RATE: u64 = 60;
/// Scripted player speed (units/second)
const PLAYER_SPEED: f32 = 70.0;
/// Seconds between standings reports
const REPORT_INTERVAL: u64 = 5;

/// Scripted player that drives the racing line at constant speed
struct ScriptedPlayer {
    state: PlayerState,
    /// Distance travelled along the current lap
    distance: f32,
}

impl ScriptedPlayer {
    fn new(line: &[RacingLinePoint]) -> Self {
        let start = line.first().map(|p| (p.position, p.direction.heading())).unwrap_or_default();
        Self {
            state: PlayerState::new(start.0, start.1),
            distance: 0.0,
        }
    }

    fn drive(&mut self, line: &[RacingLinePoint], dt: f32) {
        let n = line.len();
        if n < 2 {
            return;
        }
        let lap_length: f32 = (0..n)
            .map(|i| line[i].position.distance_to(line[(i + 1) % n].position))
            .sum();

        self.distance += PLAYER_SPEED * dt;
        if self.distance >= lap_length {
            self.distance -= lap_length;
            self.state.lap += 1;
            info!(lap = self.state.lap, "Player completed a lap");
        }

        // Walk the line to the segment holding our distance
        let mut remaining = self.distance;
        for i in 0..n {
            let a = line[i].position;
            let b = line[(i + 1) % n].position;
            let segment = a.distance_to(b);
            if remaining <= segment || i == n - 1 {
                let t = if segment > 0.0 { (remaining / segment).min(1.0) } else { 0.0 };
                let position = a.lerp(b, t);
                let direction = (b - a).normalize();
                self.state.velocity = direction * PLAYER_SPEED;
                self.state.heading = direction.heading();
                self.state.position = position;
                return;
            }
            remaining -= segment;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Kart Rivals AI simulator v{}", env!("CARGO_PKG_VERSION"));

    let config = AiConfig::load_or_default();
    config.validate()?;

    let difficulty: DifficultyLevel = match std::env::var("AI_DIFFICULTY") {
        Ok(val) => val.parse()?,
        Err(_) => DifficultyLevel::Medium,
    };
    let seconds: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 60,
    };

    info!(
        "Configuration loaded: opponents={}, active={}, budget={}ms",
        config.manager.max_opponents, config.manager.max_active, config.manager.frame_budget_ms
    );

    let opponents = config.manager.max_opponents;
    let mut manager = AiManager::new(config);
    manager.initialize_race(opponents, difficulty, None);

    let line = manager.pathfinding().racing_line().to_vec();
    let mut player = ScriptedPlayer::new(&line);

    // A few pickups around the lap and one patch of debris
    let mut game = GameState::new(0);
    for (i, kind) in [PowerUpKind::SpeedBoost, PowerUpKind::Turbo, PowerUpKind::Invincibility]
        .into_iter()
        .enumerate()
    {
        if let Some(lp) = line.get((i + 1) * line.len() / 4) {
            game.power_ups.push(PowerUpPickup {
                kind,
                position: lp.position,
            });
        }
    }
    if let Some(lp) = line.get(line.len() / 2 + 2) {
        game.debris.push(DebrisItem {
            position: lp.position + lp.normal * 3.0,
            radius: 1.5,
        });
    }

    let dt = 1.0 / TICK_RATE as f32;
    let mut collected = 0usize;
    for tick in 0..seconds * TICK_RATE {
        game.time_ms = tick * 1000 / TICK_RATE;
        player.drive(&line, dt);

        let summary = manager.update(dt, &game, &player.state);
        let mut taken = summary.collected_power_ups.clone();
        taken.sort_unstable_by(|a, b| b.cmp(a));
        for index in taken {
            game.power_ups.remove(index);
            collected += 1;
        }

        if tick % (REPORT_INTERVAL * TICK_RATE) == 0 {
            let leader = manager
                .rankings()
                .first()
                .map(|r| if r.is_player { "player".to_string() } else { short_name(&manager, r.id) });
            info!(
                t = tick / TICK_RATE,
                player_position = manager.player_position(),
                leader = leader.as_deref().unwrap_or("-"),
                full = summary.full_updates,
                simplified = summary.simplified_updates,
                "Standings"
            );
        }
    }

    info!("Final order:");
    for entry in manager.rankings() {
        let name = if entry.is_player {
            "player".to_string()
        } else {
            short_name(&manager, entry.id)
        };
        info!("  P{} {} (lap {}, {:.1}%)", entry.position, name, entry.lap, entry.progress.max(0.0) * 100.0);
    }
    info!(collected, budget = %manager.budget().status_message(), "Simulation finished");

    manager.end_race();
    Ok(())
}

fn short_name(manager: &AiManager, id: uuid::Uuid) -> String {
    manager
        .opponent(id)
        .map(|o| o.name.clone())
        .unwrap_or_else(|| id.to_string())
}
