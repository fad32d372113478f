//! Opponent racing behavior
//!
//! A seven-state machine chooses what the opponent is trying to do this tick
//! and emits a [`Decision`] for the controller. Mistakes and aggressiveness
//! adaptation are layered on top. All timing is countdown-based and all
//! randomness comes from the behavior's own seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DifficultySettings;
use crate::race::constants::behavior::*;
use crate::race::systems::decision::{
    BehaviorState, Decision, MistakeKind, PlayerInteraction, PowerUpUsage, StrategicFocus,
};
use crate::race::systems::pathfinding::LineType;
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftStyle {
    Aggressive,
    Conservative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpTiming {
    Immediate,
    Strategic,
}

/// Driver personality traits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Personality {
    /// How eager to attack (0.0-1.0), adapts over the race
    pub aggressiveness: f32,
    /// Risk-takers accept tighter gaps
    pub risk_taking: bool,
    pub drift_style: DriftStyle,
    pub power_up_timing: PowerUpTiming,
}

impl Personality {
    /// Random traits around a difficulty's base aggressiveness
    pub fn random(rng: &mut impl Rng, aggressiveness: f32) -> Self {
        let aggressiveness = aggressiveness.clamp(0.0, 1.0);
        Self {
            aggressiveness,
            risk_taking: rng.gen_bool(aggressiveness as f64),
            drift_style: if rng.gen_bool(aggressiveness as f64) {
                DriftStyle::Aggressive
            } else {
                DriftStyle::Conservative
            },
            power_up_timing: if rng.gen_bool(0.5) {
                PowerUpTiming::Immediate
            } else {
                PowerUpTiming::Strategic
            },
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            aggressiveness: 0.5,
            risk_taking: false,
            drift_style: DriftStyle::Conservative,
            power_up_timing: PowerUpTiming::Immediate,
        }
    }
}

/// What the opponent perceives this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorContext {
    pub race_position: u32,
    pub ai_position: Vec3,
    pub ai_speed: f32,
    pub player_position: Vec3,
    pub player_speed: f32,
    pub player_race_position: u32,
    pub power_up_available: bool,
    pub obstacle_ahead: bool,
    /// Lateral side of the blocking obstacle (+1 left, -1 right)
    pub obstacle_side: f32,
    pub overtaking_opportunity: bool,
    /// Lateral side with room to pass (+1 left, -1 right)
    pub overtake_side: f32,
    pub in_corner: bool,
    pub corner_radius: Option<f32>,
    /// Steering toward the next waypoint, in [-1, 1]
    pub steering_hint: f32,
    pub drafting_opportunity: bool,
}

impl Default for BehaviorContext {
    fn default() -> Self {
        Self {
            race_position: 1,
            ai_position: Vec3::ZERO,
            ai_speed: 0.0,
            player_position: Vec3::ZERO,
            player_speed: 0.0,
            player_race_position: 1,
            power_up_available: false,
            obstacle_ahead: false,
            obstacle_side: 0.0,
            overtaking_opportunity: false,
            overtake_side: 0.0,
            in_corner: false,
            corner_radius: None,
            steering_hint: 0.0,
            drafting_opportunity: false,
        }
    }
}

/// Factors the state machine reasons on, recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionFactors {
    pub race_position: u32,
    /// 1.0 on top of the player, 0.0 at 100 units or more
    pub proximity_to_player: f32,
    /// Positive when faster than the player, in [-1, 1]
    pub speed_advantage: f32,
    pub power_up_available: bool,
    pub obstacle_ahead: bool,
    pub overtaking_opportunity: bool,
    pub strategic_focus: StrategicFocus,
    pub player_interaction: PlayerInteraction,
}

impl DecisionFactors {
    pub fn from_context(ctx: &BehaviorContext) -> Self {
        let distance = ctx.ai_position.distance_to(ctx.player_position);
        let proximity_to_player = (1.0 - distance / PROXIMITY_RANGE).max(0.0);
        let speed_advantage =
            (ctx.ai_speed - ctx.player_speed) / ctx.ai_speed.max(ctx.player_speed).max(1.0);

        let strategic_focus = if ctx.race_position <= MAINTAIN_LEAD_MAX_POSITION {
            StrategicFocus::MaintainLead
        } else if ctx.race_position <= ADVANCE_POSITION_MAX_POSITION {
            StrategicFocus::AdvancePosition
        } else {
            StrategicFocus::CatchUp
        };

        let player_interaction = if proximity_to_player < INTERACTION_PROXIMITY {
            PlayerInteraction::Ignore
        } else if ctx.race_position < ctx.player_race_position {
            PlayerInteraction::Defend
        } else {
            PlayerInteraction::Pursue
        };

        Self {
            race_position: ctx.race_position,
            proximity_to_player,
            speed_advantage,
            power_up_available: ctx.power_up_available,
            obstacle_ahead: ctx.obstacle_ahead,
            overtaking_opportunity: ctx.overtaking_opportunity,
            strategic_focus,
            player_interaction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveMistake {
    kind: MistakeKind,
    /// Seconds until the mistake clears
    remaining: f32,
    /// Oversteer direction
    sign: f32,
}

/// Behavior state for one opponent
#[derive(Debug, Clone)]
pub struct AiBehavior {
    personality: Personality,
    state: BehaviorState,
    state_timer: f32,
    base_max_speed: f32,
    mistake_frequency: f32,
    mistake: Option<ActiveMistake>,
    since_last_mistake: f32,
    /// Smoothed estimate of how aggressively the player is driving
    player_aggression_estimate: f32,
    last_factors: Option<DecisionFactors>,
    rng: StdRng,
}

impl AiBehavior {
    pub fn new(settings: &DifficultySettings, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let personality = Personality::random(&mut rng, settings.aggressiveness);
        Self::from_parts(settings, personality, rng)
    }

    pub fn with_personality(settings: &DifficultySettings, personality: Personality, seed: u64) -> Self {
        Self::from_parts(settings, personality, StdRng::seed_from_u64(seed))
    }

    fn from_parts(settings: &DifficultySettings, personality: Personality, rng: StdRng) -> Self {
        Self {
            player_aggression_estimate: personality.aggressiveness,
            personality,
            state: BehaviorState::Racing,
            state_timer: 0.0,
            base_max_speed: settings.max_speed,
            mistake_frequency: settings.mistake_frequency,
            mistake: None,
            since_last_mistake: 0.0,
            last_factors: None,
            rng,
        }
    }

    /// Run one behavior tick
    pub fn update(&mut self, dt: f32, ctx: &BehaviorContext) -> Decision {
        self.advance_timers(dt);

        let factors = DecisionFactors::from_context(ctx);
        if let Some(next) = self.next_state(&factors, ctx) {
            self.transition(next);
        }

        let mut decision = self.build_decision(&factors, ctx);
        self.maybe_inject_mistake(dt);
        self.apply_mistake(&mut decision);
        self.adapt_aggressiveness(&factors, ctx);

        self.last_factors = Some(factors);
        decision
    }

    /// Advance countdowns without deciding anything
    pub fn advance_timers(&mut self, dt: f32) {
        self.state_timer += dt;
        self.since_last_mistake += dt;
        if let Some(mistake) = self.mistake.as_mut() {
            mistake.remaining -= dt;
            if mistake.remaining <= 0.0 {
                tracing::trace!(kind = ?mistake.kind, "Mistake cleared");
                self.mistake = None;
            }
        }
    }

    fn next_state(&self, f: &DecisionFactors, ctx: &BehaviorContext) -> Option<BehaviorState> {
        use BehaviorState::*;

        let t = self.state_timer;
        match self.state {
            Racing => {
                if f.overtaking_opportunity && self.personality.aggressiveness > OVERTAKE_AGGRESSION {
                    Some(Overtaking)
                } else if f.power_up_available && self.usage_gate(f) {
                    Some(PowerUp)
                } else if f.obstacle_ahead {
                    Some(Recovering)
                } else if ctx.in_corner {
                    Some(Cornering)
                } else if f.player_interaction == PlayerInteraction::Defend
                    && f.proximity_to_player >= DEFEND_MIN_PROXIMITY
                {
                    Some(Defending)
                } else if ctx.drafting_opportunity && f.proximity_to_player >= DRAFT_MIN_PROXIMITY {
                    Some(Drafting)
                } else {
                    None
                }
            }
            Overtaking => {
                if t > OVERTAKE_MAX_TIME || !f.overtaking_opportunity {
                    Some(Racing)
                } else if f.obstacle_ahead {
                    Some(Recovering)
                } else {
                    None
                }
            }
            Defending => (t > DEFEND_MAX_TIME || f.proximity_to_player < DEFEND_MIN_PROXIMITY).then_some(Racing),
            PowerUp => (t > POWER_UP_MAX_TIME).then_some(Racing),
            Cornering => (!ctx.in_corner).then_some(Racing),
            Recovering => (t > RECOVER_MAX_TIME || !f.obstacle_ahead).then_some(Racing),
            Drafting => (f.proximity_to_player < DRAFT_MIN_PROXIMITY || t > DRAFT_MAX_TIME).then_some(Racing),
        }
    }

    fn transition(&mut self, next: BehaviorState) {
        tracing::debug!(from = ?self.state, to = ?next, after = self.state_timer, "Behavior transition");
        self.state = next;
        self.state_timer = 0.0;
    }

    /// Whether the personality is willing to fire a power-up now
    fn usage_gate(&self, f: &DecisionFactors) -> bool {
        match self.personality.power_up_timing {
            PowerUpTiming::Immediate => true,
            PowerUpTiming::Strategic => {
                f.proximity_to_player > INTERACTION_PROXIMITY
                    || f.race_position > MAINTAIN_LEAD_MAX_POSITION
                    || f.strategic_focus == StrategicFocus::CatchUp
            }
        }
    }

    fn build_decision(&self, f: &DecisionFactors, ctx: &BehaviorContext) -> Decision {
        let speed_scale = match self.state {
            BehaviorState::Overtaking => OVERTAKE_SPEED_SCALE,
            BehaviorState::Cornering => CORNER_SPEED_SCALE,
            BehaviorState::Recovering => RECOVER_SPEED_SCALE,
            _ => 1.0,
        };

        let steering = match self.state {
            BehaviorState::Overtaking => ctx.steering_hint + ctx.overtake_side * OVERTAKE_STEER_BIAS,
            BehaviorState::Recovering => ctx.steering_hint - ctx.obstacle_side * RECOVER_STEER_BIAS,
            _ => ctx.steering_hint,
        };

        let tight_corner = ctx.in_corner && ctx.corner_radius.is_some_and(|r| r < TIGHT_CORNER_RADIUS);

        let power_up_usage = match (self.state, self.personality.power_up_timing) {
            (BehaviorState::Defending, _) => PowerUpUsage::Defensive,
            (_, PowerUpTiming::Immediate) => PowerUpUsage::Immediate,
            (_, PowerUpTiming::Strategic) => PowerUpUsage::Strategic,
        };

        let mut aggression_level = self.personality.aggressiveness;
        if f.race_position > AGGRESSION_BOOST_POSITION {
            aggression_level = (aggression_level + AGGRESSION_BOOST).min(1.0);
        }

        let line_type = match self.state {
            BehaviorState::Overtaking => LineType::Aggressive,
            BehaviorState::Defending => LineType::Defensive,
            BehaviorState::Recovering => LineType::Safe,
            _ => LineType::Optimal,
        };

        Decision {
            target_speed: self.base_max_speed * speed_scale,
            steering_direction: steering.clamp(-1.0, 1.0),
            should_brake: f.obstacle_ahead || tight_corner,
            should_drift: self.state == BehaviorState::Cornering
                && self.personality.drift_style == DriftStyle::Aggressive,
            power_up_usage,
            use_power_up: f.power_up_available
                && matches!(self.state, BehaviorState::PowerUp | BehaviorState::Defending),
            aggression_level,
            risk_tolerance: if self.personality.risk_taking {
                HIGH_RISK_TOLERANCE
            } else {
                LOW_RISK_TOLERANCE
            },
            line_type,
            state: self.state,
            ..Default::default()
        }
    }

    fn maybe_inject_mistake(&mut self, dt: f32) {
        if self.mistake.is_some() || self.since_last_mistake < MISTAKE_COOLDOWN {
            return;
        }
        let probability = self.mistake_probability(dt);
        if probability <= 0.0 || !self.rng.gen_bool(probability as f64) {
            return;
        }

        let kind = MistakeKind::ALL[self.rng.gen_range(0..MistakeKind::ALL.len())];
        let remaining = self.rng.gen_range(MISTAKE_MIN_DURATION..=MISTAKE_MAX_DURATION);
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        tracing::debug!(?kind, duration = remaining, "Mistake injected");

        self.mistake = Some(ActiveMistake { kind, remaining, sign });
        self.since_last_mistake = 0.0;
    }

    /// Per-tick mistake chance, always within [0, 1]
    fn mistake_probability(&self, dt: f32) -> f32 {
        let p = self.mistake_frequency * dt;
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn apply_mistake(&self, decision: &mut Decision) {
        let Some(mistake) = self.mistake else {
            return;
        };
        match mistake.kind {
            MistakeKind::Oversteer => decision.steering_error = OVERSTEER_ERROR * mistake.sign,
            MistakeKind::BrakeLate => decision.braking_delay = BRAKE_LATE_DELAY,
            MistakeKind::MissPowerUp => {
                decision.ignore_power_up = true;
                decision.use_power_up = false;
            }
            MistakeKind::PoorLine => {
                decision.suboptimal_path = true;
                decision.line_type = LineType::Safe;
            }
        }
    }

    fn adapt_aggressiveness(&mut self, f: &DecisionFactors, ctx: &BehaviorContext) {
        let speed_ratio = if self.base_max_speed > 0.0 {
            (ctx.player_speed / self.base_max_speed).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let observed = 0.6 * speed_ratio + 0.4 * f.proximity_to_player;
        self.player_aggression_estimate +=
            PLAYER_ESTIMATE_SMOOTHING * (observed - self.player_aggression_estimate);

        let gap = self.player_aggression_estimate - self.personality.aggressiveness;
        if gap.abs() > ADAPTATION_DEAD_ZONE {
            let step = ADAPTATION_STEP.copysign(gap);
            self.personality.aggressiveness = (self.personality.aggressiveness + step).clamp(0.0, 1.0);
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn state_timer(&self) -> f32 {
        self.state_timer
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn aggressiveness(&self) -> f32 {
        self.personality.aggressiveness
    }

    /// Balance-layer override, clamped to [0, 1]
    pub fn set_aggressiveness(&mut self, value: f32) {
        self.personality.aggressiveness = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.5 };
    }

    pub fn active_mistake(&self) -> Option<MistakeKind> {
        self.mistake.map(|m| m.kind)
    }

    pub fn last_factors(&self) -> Option<&DecisionFactors> {
        self.last_factors.as_ref()
    }
}
