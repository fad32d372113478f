//! Vehicle control for one opponent
//!
//! Turns behavior decisions into throttle, brake and steering, then integrates
//! the vehicle. Decisions reach the controls only after the difficulty's
//! reaction time. Collision avoidance, power-ups, drift boosts and slipstream
//! are layered on the decision before integration.

use smallvec::SmallVec;
use std::collections::VecDeque;

use crate::config::DifficultySettings;
use crate::race::constants::controller::*;
use crate::race::constants::pathfinding::LINE_TOP_SPEED;
use crate::race::constants::perception::WAYPOINT_LOOK_AHEAD;
use crate::race::constants::power_ups::{
    COLLECT_RADIUS, DEFENSIVE_THREAT_RANGE, STRATEGIC_SPEED_FRACTION, STRATEGIC_TARGET_RANGE,
};
use crate::race::state::{PowerUpKind, PowerUpPickup, RacerId, RacerSnapshot, VehicleState};
use crate::race::systems::decision::{Decision, PowerUpUsage};
use crate::race::systems::obstacles::ObstacleKind;
use crate::race::systems::pathfinding::{LineType, PathFinding, PathOptions};
use crate::race::systems::perception::{in_slipstream, racers_ahead, steering_toward};
use crate::race::systems::power_ups::PowerUpState;
use crate::util::vec3::{wrap_angle, Vec3};

/// Something the opponent may collide with soon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threat {
    pub position: Vec3,
    pub distance: f32,
    /// Seconds to collision; None when not closing at all
    pub time_to_collision: Option<f32>,
    pub severity: f32,
    /// Lateral offset relative to the vehicle (+ left)
    pub lateral: f32,
}

/// World inputs for one controller tick
#[derive(Debug, Clone, Copy)]
pub struct ControlInputs<'a> {
    pub id: RacerId,
    pub racers: &'a [RacerSnapshot],
    pub power_ups: &'a [PowerUpPickup],
    pub player_position: Option<Vec3>,
    /// Rubber-band speed multiplier from the manager
    pub rubber_band: f32,
}

/// What happened during a controller tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerOutput {
    /// Indices into the pickup list that were collected
    pub collected: SmallVec<[usize; 2]>,
    pub activated: Option<PowerUpKind>,
    pub emergency_brake: bool,
}

#[derive(Debug, Clone)]
pub struct AiController {
    throttle: f32,
    brake: f32,
    steering: f32,
    target_steering: f32,
    max_speed: f32,
    reaction_time: f32,
    /// Decisions waiting out the reaction time
    pending: VecDeque<(Decision, f32)>,
    active: Decision,
    power_ups: PowerUpState,
    /// Countdown before a delayed brake request is honored
    brake_hold: Option<f32>,
    drifting: bool,
    drift_charge: f32,
    mini_turbo: f32,
    mini_turbo_multiplier: f32,
    slipstream: f32,
}

impl AiController {
    pub fn new(settings: &DifficultySettings) -> Self {
        Self {
            throttle: 0.0,
            brake: 0.0,
            steering: 0.0,
            target_steering: 0.0,
            max_speed: settings.max_speed,
            reaction_time: settings.reaction_time.max(0.0),
            pending: VecDeque::new(),
            active: Decision::default(),
            power_ups: PowerUpState::new(),
            brake_hold: None,
            drifting: false,
            drift_charge: 0.0,
            mini_turbo: 0.0,
            mini_turbo_multiplier: 1.0,
            slipstream: 1.0,
        }
    }

    /// Map a target speed onto throttle and brake
    pub fn set_target_speed(&mut self, target: f32, current: f32) {
        let diff = target - current;
        if diff > SPEED_DEAD_BAND {
            self.throttle = (diff / THROTTLE_RANGE).min(1.0);
            self.brake = 0.0;
        } else if diff < -SPEED_DEAD_BAND {
            self.throttle = 0.0;
            self.brake = (-diff / BRAKE_RANGE).min(1.0);
        } else {
            self.throttle = CRUISE_THROTTLE;
            self.brake = 0.0;
        }
    }

    pub fn set_target_steering(&mut self, target: f32) {
        self.target_steering = if target.is_finite() { target.clamp(-1.0, 1.0) } else { 0.0 };
    }

    /// Full tick: release decisions, control, integrate
    pub fn update(
        &mut self,
        dt: f32,
        decision: Decision,
        vehicle: &mut VehicleState,
        pathfinding: &mut PathFinding,
        inputs: &ControlInputs<'_>,
    ) -> ControllerOutput {
        let mut output = ControllerOutput::default();

        self.queue_decision(decision, dt);
        self.advance_timers(dt);
        let d = self.active;

        self.slipstream = if in_slipstream(vehicle, inputs.racers, inputs.id) {
            SLIPSTREAM_MULTIPLIER
        } else {
            (self.slipstream - SLIPSTREAM_DECAY * dt).max(1.0)
        };
        let boost = self.boost_multiplier(inputs.rubber_band);

        // Speed and steering from the decision and the requested line
        let (line_speed, path_steering) = self.follow_line(&d, vehicle, pathfinding, inputs.player_position);
        let target_speed = d.target_speed * line_speed * boost;
        self.set_target_speed(target_speed, vehicle.speed);
        let steering = match path_steering {
            Some(path) => d.effective_steering() * (1.0 - PATH_STEER_WEIGHT) + path * PATH_STEER_WEIGHT,
            None => d.effective_steering(),
        };
        self.set_target_steering(steering);

        // Brake requests, possibly held back by a late-braking mistake
        if d.should_brake {
            let hold = *self.brake_hold.get_or_insert(d.braking_delay.max(0.0));
            if hold <= 0.0 {
                self.throttle = 0.0;
                self.brake = self.brake.max(DECISION_BRAKE);
            }
        } else {
            self.brake_hold = None;
        }

        self.handle_power_ups(&d, vehicle, inputs, target_speed, &mut output);
        self.handle_drift(&d, vehicle, dt);

        let threats = detect_threats(vehicle, inputs.racers, inputs.id, pathfinding);
        if let Some(nearest) = nearest_threat(&threats) {
            if nearest.distance < EMERGENCY_BRAKE_DISTANCE && !self.power_ups.is_invincible() {
                self.throttle = 0.0;
                self.brake = 1.0;
                output.emergency_brake = true;
            }
            if nearest.distance < DETECTION_RADIUS {
                let away = if nearest.lateral >= 0.0 { -1.0 } else { 1.0 };
                self.set_target_steering(self.target_steering + away * AVOIDANCE_STRENGTH * dt);
            }
        }

        self.steering += (self.target_steering - self.steering) * STEERING_SMOOTHING;
        self.throttle = self.throttle.clamp(0.0, 1.0);
        self.brake = self.brake.clamp(0.0, 1.0);
        self.steering = self.steering.clamp(-1.0, 1.0);

        self.integrate(dt, vehicle, boost);
        output
    }

    fn queue_decision(&mut self, decision: Decision, dt: f32) {
        self.pending.push_back((decision, self.reaction_time));
        for (_, remaining) in self.pending.iter_mut() {
            *remaining -= dt;
        }
        while let Some((ready, _)) = self.pending.front().filter(|(_, r)| *r <= 0.0).copied() {
            self.active = ready;
            self.pending.pop_front();
        }
    }

    /// Advance countdowns only. Used directly for simplified opponents.
    pub fn advance_timers(&mut self, dt: f32) {
        self.power_ups.advance(dt);
        if self.mini_turbo > 0.0 {
            self.mini_turbo = (self.mini_turbo - dt).max(0.0);
            if self.mini_turbo == 0.0 {
                self.mini_turbo_multiplier = 1.0;
            }
        }
        if let Some(hold) = self.brake_hold.as_mut() {
            *hold -= dt;
        }
    }

    /// Line speed factor and, for non-optimal lines, a steering command toward the path
    fn follow_line(
        &self,
        d: &Decision,
        vehicle: &VehicleState,
        pathfinding: &mut PathFinding,
        player_position: Option<Vec3>,
    ) -> (f32, Option<f32>) {
        let Some(waypoint) = pathfinding.get_next_waypoint(vehicle.position, vehicle.velocity, WAYPOINT_LOOK_AHEAD)
        else {
            return (1.0, None);
        };
        if d.line_type == LineType::Optimal {
            return (line_speed_factor(waypoint.target_speed), None);
        }

        let options = PathOptions {
            line_type: d.line_type,
            avoid_obstacles: true,
            avoidance_distance: pathfinding.config().avoidance_distance,
            player_position,
            exclude_position: Some(vehicle.position),
        };
        let path = pathfinding.find_optimal_path(vehicle.position, waypoint.position, &options);
        let aim = path
            .iter()
            .find(|p| p.position.ground_distance_to(vehicle.position) >= WAYPOINT_LOOK_AHEAD * 0.5)
            .or(path.last());
        match aim {
            Some(point) => (
                line_speed_factor(point.target_speed),
                Some(steering_toward(vehicle, point.position)),
            ),
            None => (line_speed_factor(waypoint.target_speed), None),
        }
    }

    fn handle_power_ups(
        &mut self,
        d: &Decision,
        vehicle: &VehicleState,
        inputs: &ControlInputs<'_>,
        target_speed: f32,
        output: &mut ControllerOutput,
    ) {
        if !d.ignore_power_up {
            for (i, pickup) in inputs.power_ups.iter().enumerate() {
                if self.power_ups.is_full() {
                    break;
                }
                if pickup.position.ground_distance_to(vehicle.position) <= COLLECT_RADIUS
                    && self.power_ups.collect(pickup.kind)
                {
                    tracing::trace!(kind = ?pickup.kind, "Power-up collected");
                    output.collected.push(i);
                }
            }
        }

        if !d.use_power_up || d.ignore_power_up || !self.power_ups.can_activate() {
            return;
        }
        let fire = match d.power_up_usage {
            PowerUpUsage::Immediate => true,
            PowerUpUsage::Strategic => {
                racers_ahead(vehicle, inputs.racers, inputs.id, STRATEGIC_TARGET_RANGE)
                    .next()
                    .is_some()
                    || vehicle.speed < target_speed * STRATEGIC_SPEED_FRACTION
            }
            PowerUpUsage::Defensive => under_threat(vehicle, inputs.racers, inputs.id),
        };
        if fire {
            output.activated = self.power_ups.activate();
        }
    }

    fn handle_drift(&mut self, d: &Decision, vehicle: &VehicleState, dt: f32) {
        if d.should_drift && vehicle.speed.abs() > DRIFT_SPEED_THRESHOLD {
            self.drifting = true;
            self.drift_charge = (self.drift_charge + DRIFT_CHARGE_RATE * dt).min(DRIFT_MAX_CHARGE);
        } else if self.drifting {
            self.release_drift();
        }
    }

    fn release_drift(&mut self) {
        let level = (self.drift_charge.floor() as usize).min(DRIFT_BOOST_TABLE.len() - 1);
        let multiplier = DRIFT_BOOST_TABLE[level];
        if multiplier > 1.0 {
            tracing::debug!(charge = self.drift_charge, multiplier, "Mini-turbo");
            self.mini_turbo = MINI_TURBO_DURATION;
            self.mini_turbo_multiplier = multiplier;
        }
        self.drifting = false;
        self.drift_charge = 0.0;
    }

    fn boost_multiplier(&self, rubber_band: f32) -> f32 {
        let rubber_band = if rubber_band.is_finite() { rubber_band.max(0.0) } else { 1.0 };
        self.power_ups.speed_multiplier() * self.mini_turbo_multiplier * self.slipstream * rubber_band
    }

    fn integrate(&self, dt: f32, vehicle: &mut VehicleState, boost: f32) {
        let top_speed = self.max_speed * TOP_SPEED_HEADROOM * boost;
        let accel = self.throttle * ENGINE_FORCE * boost - self.brake * BRAKE_FORCE;
        let mut speed = (vehicle.speed + accel * dt).clamp(-MAX_REVERSE_SPEED, top_speed.max(0.0));

        let speed_ratio = if self.max_speed > 0.0 {
            (speed.abs() / self.max_speed).min(1.0)
        } else {
            0.0
        };
        let turn_bonus = if self.drifting { DRIFT_TURN_BONUS } else { 1.0 };
        vehicle.heading = wrap_angle(vehicle.heading + self.steering * TURN_RATE * speed_ratio * turn_bonus * dt);

        speed *= FRICTION;
        speed *= (1.0 - AIR_RESISTANCE * speed.abs() * dt).max(0.0);

        vehicle.speed = speed;
        vehicle.velocity = vehicle.forward() * speed;
        vehicle.position += vehicle.velocity * dt;
    }

    /// (throttle, brake, steering)
    pub fn controls(&self) -> (f32, f32, f32) {
        (self.throttle, self.brake, self.steering)
    }

    pub fn target_steering(&self) -> f32 {
        self.target_steering
    }

    /// Decision currently driving the controls
    pub fn active_decision(&self) -> &Decision {
        &self.active
    }

    pub fn power_ups(&self) -> &PowerUpState {
        &self.power_ups
    }

    pub fn power_ups_mut(&mut self) -> &mut PowerUpState {
        &mut self.power_ups
    }

    pub fn drift_charge(&self) -> f32 {
        self.drift_charge
    }

    pub fn is_drifting(&self) -> bool {
        self.drifting
    }

    pub fn mini_turbo_multiplier(&self) -> f32 {
        self.mini_turbo_multiplier
    }

    pub fn slipstream_multiplier(&self) -> f32 {
        self.slipstream
    }
}

/// Racers and static obstacles likely to be hit within two seconds, most severe first
pub fn detect_threats(
    vehicle: &VehicleState,
    racers: &[RacerSnapshot],
    id: RacerId,
    pathfinding: &PathFinding,
) -> SmallVec<[Threat; 4]> {
    let position = vehicle.position;
    let left = vehicle.forward().left_normal();

    let candidates = racers
        .iter()
        .filter(|r| r.id != id)
        .map(|r| (r.position, r.velocity))
        .chain(
            pathfinding
                .obstacles()
                .of_kind(ObstacleKind::Static, pathfinding.now_ms())
                .map(|o| (o.position, Vec3::ZERO)),
        );

    let mut threats: SmallVec<[Threat; 4]> = candidates
        .filter_map(|(other, other_velocity)| {
            let offset = (other - position).flat();
            let distance = offset.length();
            if distance > DETECTION_RADIUS {
                return None;
            }
            let time_to_collision = time_to_collision(distance, other_velocity - vehicle.velocity);
            let ttc = time_to_collision.filter(|t| *t > 0.0 && *t < MAX_TIME_TO_COLLISION)?;
            Some(Threat {
                position: other,
                distance,
                time_to_collision,
                severity: 1.0 / ttc.max(MIN_SEVERITY_TTC),
                lateral: offset.dot(left),
            })
        })
        .collect();

    threats.sort_by(|a, b| b.severity.partial_cmp(&a.severity).unwrap_or(std::cmp::Ordering::Equal));
    threats
}

/// Closest threat regardless of severity
pub fn nearest_threat(threats: &[Threat]) -> Option<&Threat> {
    threats
        .iter()
        .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
}

/// Distance over relative speed; None when the relative speed is zero
pub fn time_to_collision(distance: f32, relative_velocity: Vec3) -> Option<f32> {
    let relative_speed = relative_velocity.flat().length();
    if relative_speed <= f32::EPSILON {
        None
    } else {
        Some(distance / relative_speed)
    }
}

/// Cheap update for opponents without full processing.
///
/// Heads for the next racing-line point and eases toward `cruise_speed`
/// scaled by the line's target speed there. Off the line the vehicle keeps its
/// heading and speed.
pub fn extrapolate(vehicle: &mut VehicleState, pathfinding: &PathFinding, cruise_speed: f32, dt: f32) {
    let line = pathfinding.racing_line();
    if let Some(i) = pathfinding.nearest_index(vehicle.position) {
        let next = line[(i + 1) % line.len()].position;
        let to_next = (next - vehicle.position).flat();
        if to_next.length_sq() > f32::EPSILON {
            vehicle.heading = to_next.heading();
        }
        let target = cruise_speed.max(0.0) * line_speed_factor(line[i].target_speed);
        let change = (target - vehicle.speed).clamp(-BRAKE_FORCE * dt, ENGINE_FORCE * dt);
        vehicle.speed += change;
    }
    vehicle.velocity = vehicle.forward() * vehicle.speed;
    vehicle.position += vehicle.velocity * dt;
}

fn under_threat(vehicle: &VehicleState, racers: &[RacerSnapshot], id: RacerId) -> bool {
    let forward = vehicle.forward();
    racers.iter().any(|r| {
        let offset = (r.position - vehicle.position).flat();
        r.id != id && offset.length() <= DEFENSIVE_THREAT_RANGE && offset.dot(forward) < 0.0
    })
}

#[inline]
fn line_speed_factor(line_speed: f32) -> f32 {
    (line_speed / LINE_TOP_SPEED).clamp(0.0, TOP_SPEED_HEADROOM)
}
