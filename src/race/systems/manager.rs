//! Opponent roster and per-tick orchestration
//!
//! The manager owns every opponent, the shared path finder and the AI budget
//! monitor. Each tick the opponents nearest the player get full
//! perception, behavior and control processing; the rest are extrapolated.
//! Rankings and rubber-banding are recomputed once all opponents have moved.

use bitvec::prelude::*;
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::config::{AiConfig, DifficultyLevel, DifficultySettings};
use crate::race::constants::manager::*;
use crate::race::performance::{AiBudgetMonitor, BudgetStatus};
use crate::race::state::{GameState, PlayerState, PowerUpPickup, RacerId, RacerSnapshot, VehicleState};
use crate::race::systems::behavior::AiBehavior;
use crate::race::systems::controller::{extrapolate, AiController, ControlInputs};
use crate::race::systems::pathfinding::PathFinding;
use crate::race::systems::perception::Perception;
use crate::race::track::Track;

/// Roster errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManagerError {
    #[error("Unknown opponent {0}")]
    UnknownOpponent(RacerId),
}

/// One AI-driven racer
#[derive(Debug, Clone)]
pub struct Opponent {
    pub id: RacerId,
    pub name: String,
    pub difficulty: DifficultyLevel,
    pub settings: DifficultySettings,
    pub vehicle: VehicleState,
    /// Completed laps
    pub lap: u32,
    /// Lap fraction in [0, 1)
    pub progress: f32,
    pub race_position: u32,
    /// Retired opponents stay in the roster but are skipped by updates and rankings
    pub alive: bool,
    pub behavior: AiBehavior,
    pub controller: AiController,
    /// Rubber-band multiplier applied to the next control tick
    pub speed_multiplier: f32,
    /// False until the start line is crossed for the first time
    started: bool,
}

impl Opponent {
    pub fn snapshot(&self) -> RacerSnapshot {
        RacerSnapshot {
            id: self.id,
            position: self.vehicle.position,
            velocity: self.vehicle.velocity,
            heading: self.vehicle.heading,
            is_player: false,
        }
    }

    /// Progress used for ranking; negative while still behind the start line
    pub fn race_progress(&self) -> f32 {
        if self.started {
            self.progress
        } else {
            self.progress - 1.0
        }
    }

    fn track_progress(&mut self, progress: f32) {
        let previous = self.progress;
        if previous > 0.75 && progress < 0.25 {
            if self.started {
                self.lap += 1;
                tracing::debug!(opponent = %self.name, lap = self.lap, "Lap completed");
            } else {
                self.started = true;
            }
        } else if previous < 0.25 && progress > 0.75 && self.started {
            // Backed over the line
            if self.lap > 0 {
                self.lap -= 1;
            } else {
                self.started = false;
            }
        }
        self.progress = progress;
    }
}

/// Start-line crossing state of the human player
#[derive(Debug, Clone, Copy, Default)]
struct PlayerLap {
    /// Lap fraction seen on the previous tick
    progress: Option<f32>,
    started: bool,
}

impl PlayerLap {
    /// Ranking progress for this tick; negative until the line is first crossed
    fn advance(&mut self, lap: u32, progress: f32) -> f32 {
        match self.progress {
            // First sighting: only a player on the grid behind the line has not started
            None => self.started = progress < 1.0 - GRID_ZONE_SHARE,
            Some(previous) if previous > 0.75 && progress < 0.25 => self.started = true,
            Some(previous) if previous < 0.25 && progress > 0.75 && lap == 0 => self.started = false,
            Some(_) => {}
        }
        if lap > 0 {
            self.started = true;
        }
        self.progress = Some(progress);

        if self.started {
            progress
        } else {
            progress - 1.0
        }
    }
}

/// One row of the race order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankEntry {
    pub id: RacerId,
    pub is_player: bool,
    pub lap: u32,
    pub progress: f32,
    /// 1-based race position
    pub position: u32,
}

/// What the manager did during one tick
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    pub full_updates: usize,
    pub simplified_updates: usize,
    /// Indices into `GameState::power_ups` picked up this tick
    pub collected_power_ups: SmallVec<[usize; 4]>,
    pub activations: usize,
    pub emergency_brakes: usize,
    pub budget_status: Option<BudgetStatus>,
}

pub struct AiManager {
    config: AiConfig,
    pathfinding: PathFinding,
    /// Roster arena
    opponents: Vec<Opponent>,
    /// id -> arena index
    index: HashMap<RacerId, usize>,
    /// Opponents getting full processing this tick
    full_update: BitVec,
    monitor: AiBudgetMonitor,
    rankings: Vec<RankEntry>,
    player_rank: u32,
    player_lap: PlayerLap,
    rng: StdRng,
}

impl AiManager {
    pub fn new(config: AiConfig) -> Self {
        let rng = match config.manager.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            pathfinding: PathFinding::new(Track::default_circuit(), config.pathfinding.clone()),
            monitor: AiBudgetMonitor::new(config.manager.frame_budget_ms),
            config,
            opponents: Vec::new(),
            index: HashMap::new(),
            full_update: BitVec::new(),
            rankings: Vec::new(),
            player_rank: 1,
            player_lap: PlayerLap::default(),
            rng,
        }
    }

    /// Spawn a fresh field of opponents behind the start line
    pub fn initialize_race(&mut self, count: usize, difficulty: DifficultyLevel, track: Option<Track>) -> Vec<RacerId> {
        self.end_race();
        if let Some(track) = track {
            self.pathfinding.set_track(track);
        }

        let cap = self.config.manager.max_opponents.min(MAX_OPPONENTS);
        if count > cap {
            tracing::warn!(requested = count, cap, "Opponent count capped");
        }
        let count = count.min(cap);

        let (start, direction, normal) = match self.pathfinding.racing_line().first() {
            Some(lp) => (lp.position, lp.direction, lp.normal),
            None => return Vec::new(),
        };
        let heading = direction.heading();

        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let level = self.vary_difficulty(difficulty);
            let settings = *self.config.difficulty.get(level);

            let row = (i / 2 + 1) as f32;
            let lane = if i % 2 == 0 { 1.0 } else { -1.0 };
            let position = start - direction * (row * GRID_ROW_SPACING) + normal * (lane * GRID_LANE_OFFSET);

            let progress = self.pathfinding.progress_of(position).unwrap_or(0.0);
            let id = Uuid::new_v4();
            let opponent = Opponent {
                id,
                name: generate_driver_name(&mut self.rng),
                difficulty: level,
                settings,
                vehicle: VehicleState::new(position, heading),
                lap: 0,
                progress,
                race_position: i as u32 + 2,
                alive: true,
                behavior: AiBehavior::new(&settings, self.rng.gen()),
                controller: AiController::new(&settings),
                speed_multiplier: 1.0,
                started: progress < 0.5,
            };
            tracing::debug!(name = %opponent.name, difficulty = ?level, grid = i + 1, "Opponent spawned");

            self.index.insert(id, self.opponents.len());
            self.opponents.push(opponent);
            self.full_update.push(false);
            ids.push(id);
        }

        tracing::info!(opponents = count, difficulty = ?difficulty, "Race initialized");
        ids
    }

    /// 60% base level, 20% one easier, 20% one harder
    fn vary_difficulty(&mut self, base: DifficultyLevel) -> DifficultyLevel {
        let roll: f64 = self.rng.gen();
        if roll < BASE_DIFFICULTY_SHARE {
            base
        } else if roll < BASE_DIFFICULTY_SHARE + EASIER_DIFFICULTY_SHARE {
            base.easier()
        } else {
            base.harder()
        }
    }

    /// Run one AI frame
    pub fn update(&mut self, dt: f32, game: &GameState, player: &PlayerState) -> TickSummary {
        self.monitor.frame_start();
        let mut summary = TickSummary::default();

        self.pathfinding.set_clock(game.time_ms);
        let mut racers: Vec<RacerSnapshot> = self
            .opponents
            .iter()
            .filter(|o| o.alive)
            .map(Opponent::snapshot)
            .collect();
        racers.extend(game.other_racers.iter().copied());
        racers.push(player.snapshot());
        self.pathfinding
            .update_dynamic_obstacles(&racers, &game.power_ups, &game.debris);

        self.select_full_updates(player);

        // Pickups still on the track, with their index in the host's list
        let mut pickups: Vec<PowerUpPickup> = game.power_ups.clone();
        let mut origin: Vec<usize> = (0..pickups.len()).collect();

        for i in 0..self.opponents.len() {
            let full = self.full_update.get(i).map(|b| *b).unwrap_or(false);
            let opponent = &mut self.opponents[i];
            if !opponent.alive {
                continue;
            }

            if full {
                let ctx = Perception::new(&self.pathfinding, &racers, player).context(
                    opponent.id,
                    &opponent.vehicle,
                    opponent.race_position,
                    opponent.controller.power_ups().has_item(),
                );
                let decision = opponent.behavior.update(dt, &ctx);
                let inputs = ControlInputs {
                    id: opponent.id,
                    racers: &racers,
                    power_ups: &pickups,
                    player_position: Some(player.position),
                    rubber_band: opponent.speed_multiplier,
                };
                let output = opponent.controller.update(
                    dt,
                    decision,
                    &mut opponent.vehicle,
                    &mut self.pathfinding,
                    &inputs,
                );

                for &collected in output.collected.iter().rev() {
                    summary.collected_power_ups.push(origin.remove(collected));
                    pickups.remove(collected);
                }
                if output.activated.is_some() {
                    summary.activations += 1;
                }
                if output.emergency_brake {
                    summary.emergency_brakes += 1;
                }
                summary.full_updates += 1;
            } else {
                opponent.behavior.advance_timers(dt);
                opponent.controller.advance_timers(dt);
                let cruise = opponent.settings.max_speed * opponent.speed_multiplier;
                extrapolate(&mut opponent.vehicle, &self.pathfinding, cruise, dt);
                summary.simplified_updates += 1;
            }

            if let Some(progress) = self.pathfinding.progress_of(opponent.vehicle.position) {
                opponent.track_progress(progress);
            }
        }

        self.update_rankings(player);
        self.apply_rubber_banding();

        let previous = self.monitor.status();
        self.monitor.frame_end(summary.full_updates);
        let status = self.monitor.status();
        if status != previous && status.is_degraded() {
            tracing::warn!(status = %self.monitor.status_message(), "AI over frame budget");
        }
        summary.budget_status = Some(status);
        summary
    }

    /// Mark the nearest opponents inside the culling distance for full processing
    fn select_full_updates(&mut self, player: &PlayerState) {
        let configured = self.config.manager.max_active;
        let limit = if self.config.manager.adaptive_budget {
            self.monitor.active_limit(configured)
        } else {
            configured
        };
        let culling = self.config.manager.culling_distance;

        let mut by_distance: SmallVec<[(usize, f32); MAX_OPPONENTS]> = self
            .opponents
            .iter()
            .enumerate()
            .filter(|(_, o)| o.alive)
            .map(|(i, o)| (i, o.vehicle.position.distance_to(player.position)))
            .filter(|(_, d)| *d <= culling)
            .collect();
        by_distance.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        self.full_update.fill(false);
        for &(i, _) in by_distance.iter().take(limit) {
            self.full_update.set(i, true);
        }
    }

    /// Sort every racer by lap, then progress
    fn update_rankings(&mut self, player: &PlayerState) {
        let progress = self
            .pathfinding
            .progress_of(player.position)
            .or(self.player_lap.progress)
            .unwrap_or(0.0);
        let player_progress = self.player_lap.advance(player.lap, progress);

        self.rankings.clear();
        self.rankings.extend(self.opponents.iter().filter(|o| o.alive).map(|o| RankEntry {
            id: o.id,
            is_player: false,
            lap: o.lap,
            progress: o.race_progress(),
            position: 0,
        }));
        self.rankings.push(RankEntry {
            id: player.id,
            is_player: true,
            lap: player.lap,
            progress: player_progress,
            position: 0,
        });

        self.rankings.sort_by(|a, b| {
            b.lap
                .cmp(&a.lap)
                .then(b.progress.partial_cmp(&a.progress).unwrap_or(std::cmp::Ordering::Equal))
        });

        for (rank, entry) in self.rankings.iter_mut().enumerate() {
            entry.position = rank as u32 + 1;
            if entry.is_player {
                self.player_rank = entry.position;
            } else if let Some(&i) = self.index.get(&entry.id) {
                self.opponents[i].race_position = entry.position;
            }
        }
    }

    fn apply_rubber_banding(&mut self) {
        let player_rank = self.player_rank;
        for opponent in self.opponents.iter_mut() {
            let strength = opponent.settings.rubberband_strength;
            opponent.speed_multiplier = if opponent.race_position > player_rank {
                1.0 - BEHIND_RUBBERBAND_SHARE * strength
            } else {
                1.0 + strength
            };
        }
    }

    /// Take an opponent out of the race, dropping all of its timed state
    pub fn remove_opponent(&mut self, id: RacerId) -> Result<Opponent, ManagerError> {
        let idx = self.index.remove(&id).ok_or(ManagerError::UnknownOpponent(id))?;
        let last_idx = self.opponents.len() - 1;

        if idx != last_idx {
            let last_id = self.opponents[last_idx].id;
            self.index.insert(last_id, idx);
            let last_full = self.full_update.get(last_idx).map(|b| *b).unwrap_or(false);
            self.full_update.set(idx, last_full);
        }
        self.full_update.pop();
        let mut removed = self.opponents.swap_remove(idx);
        removed.alive = false;
        self.rankings.retain(|r| r.id != id);

        tracing::info!(name = %removed.name, remaining = self.opponents.len(), "Opponent removed");
        Ok(removed)
    }

    /// Drop the whole roster
    pub fn end_race(&mut self) {
        if !self.opponents.is_empty() {
            tracing::info!(opponents = self.opponents.len(), "Race ended");
        }
        self.opponents.clear();
        self.index.clear();
        self.full_update.clear();
        self.rankings.clear();
        self.player_rank = 1;
        self.player_lap = PlayerLap::default();
        self.pathfinding.clear_cache();
    }

    /// Retire or reinstate an opponent without dropping its state
    pub fn set_alive(&mut self, id: RacerId, alive: bool) -> Result<(), ManagerError> {
        let &i = self.index.get(&id).ok_or(ManagerError::UnknownOpponent(id))?;
        let opponent = &mut self.opponents[i];
        if opponent.alive != alive {
            tracing::info!(name = %opponent.name, alive, "Opponent status changed");
        }
        opponent.alive = alive;
        Ok(())
    }

    pub fn opponent(&self, id: RacerId) -> Option<&Opponent> {
        self.index.get(&id).map(|&i| &self.opponents[i])
    }

    pub fn opponents(&self) -> &[Opponent] {
        &self.opponents
    }

    pub fn len(&self) -> usize {
        self.opponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opponents.is_empty()
    }

    /// Race order from the last update, player included
    pub fn rankings(&self) -> &[RankEntry] {
        &self.rankings
    }

    pub fn player_position(&self) -> u32 {
        self.player_rank
    }

    pub fn aggressiveness(&self, id: RacerId) -> Result<f32, ManagerError> {
        self.opponent(id)
            .map(|o| o.behavior.aggressiveness())
            .ok_or(ManagerError::UnknownOpponent(id))
    }

    pub fn set_aggressiveness(&mut self, id: RacerId, value: f32) -> Result<(), ManagerError> {
        let &i = self.index.get(&id).ok_or(ManagerError::UnknownOpponent(id))?;
        self.opponents[i].behavior.set_aggressiveness(value);
        Ok(())
    }

    pub fn pathfinding(&self) -> &PathFinding {
        &self.pathfinding
    }

    pub fn pathfinding_mut(&mut self) -> &mut PathFinding {
        &mut self.pathfinding
    }

    pub fn budget(&self) -> &AiBudgetMonitor {
        &self.monitor
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }
}

/// Generate driver names
pub fn generate_driver_name(rng: &mut impl Rng) -> String {
    let prefixes = ["Turbo", "Drift", "Nitro", "Apex", "Blaze", "Rocket", "Slick", "Vortex"];
    let suffixes = ["Rex", "Ace", "Kid", "Max", "Jet", "Fox", "Bolt", "Zed"];

    format!(
        "{} {}",
        prefixes[rng.gen_range(0..prefixes.len())],
        suffixes[rng.gen_range(0..suffixes.len())]
    )
}
