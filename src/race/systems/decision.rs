//! Per-tick decision handed from behavior to controller

use crate::race::systems::pathfinding::LineType;

/// Behavior state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BehaviorState {
    /// Following the racing line
    #[default]
    Racing,
    /// Passing the racer ahead
    Overtaking,
    /// Blocking a racer behind
    Defending,
    /// Using a held power-up
    PowerUp,
    /// Taking a corner
    Cornering,
    /// Getting around or recovering from an obstacle
    Recovering,
    /// Sitting in a slipstream
    Drafting,
}

/// When a held power-up should be fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerUpUsage {
    #[default]
    Immediate,
    Strategic,
    Defensive,
}

/// Long-term goal derived from race position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategicFocus {
    MaintainLead,
    AdvancePosition,
    CatchUp,
}

/// Stance toward the human player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInteraction {
    Pursue,
    Defend,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MistakeKind {
    Oversteer,
    BrakeLate,
    MissPowerUp,
    PoorLine,
}

impl MistakeKind {
    pub const ALL: [MistakeKind; 4] = [
        Self::Oversteer,
        Self::BrakeLate,
        Self::MissPowerUp,
        Self::PoorLine,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub target_speed: f32,
    /// Steering request in [-1, 1]
    pub steering_direction: f32,
    pub should_brake: bool,
    pub should_drift: bool,
    pub power_up_usage: PowerUpUsage,
    /// Whether a held power-up may be fired this tick
    pub use_power_up: bool,
    pub aggression_level: f32,
    pub risk_tolerance: f32,
    pub line_type: LineType,
    pub state: BehaviorState,

    // Mistake effects
    pub steering_error: f32,
    /// Seconds the brake response is held back
    pub braking_delay: f32,
    pub ignore_power_up: bool,
    pub suboptimal_path: bool,
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            target_speed: 0.0,
            steering_direction: 0.0,
            should_brake: false,
            should_drift: false,
            power_up_usage: PowerUpUsage::Immediate,
            use_power_up: false,
            aggression_level: 0.5,
            risk_tolerance: 0.4,
            line_type: LineType::Optimal,
            state: BehaviorState::Racing,
            steering_error: 0.0,
            braking_delay: 0.0,
            ignore_power_up: false,
            suboptimal_path: false,
        }
    }
}

impl Decision {
    /// Steering request with any oversteer error applied, clamped
    pub fn effective_steering(&self) -> f32 {
        (self.steering_direction + self.steering_error).clamp(-1.0, 1.0)
    }

    pub fn has_mistake(&self) -> bool {
        self.steering_error != 0.0 || self.braking_delay > 0.0 || self.ignore_power_up || self.suboptimal_path
    }
}
