//! Host-facing race state
//!
//! Snapshots the game loop hands to the AI each tick, and the vehicle state the
//! AI exposes back for drawing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::vec3::Vec3;

/// Unique racer identifier
pub type RacerId = Uuid;

/// Kinematic state of one vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading on the ground plane (radians)
    pub heading: f32,
    /// Signed speed along the heading
    pub speed: f32,
}

impl VehicleState {
    pub fn new(position: Vec3, heading: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            heading,
            speed: 0.0,
        }
    }

    /// Unit vector along the heading
    #[inline]
    pub fn forward(&self) -> Vec3 {
        Vec3::from_heading(self.heading)
    }
}

/// Position/velocity of any racer, as seen by other racers this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RacerSnapshot {
    pub id: RacerId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading: f32,
    pub is_player: bool,
}

/// Human player's state, supplied by the host each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: RacerId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading: f32,
    pub lap: u32,
    /// Race position as last reported by the host
    pub race_position: u32,
}

impl PlayerState {
    pub fn new(position: Vec3, heading: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            velocity: Vec3::ZERO,
            heading,
            lap: 0,
            race_position: 1,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn snapshot(&self) -> RacerSnapshot {
        RacerSnapshot {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            heading: self.heading,
            is_player: true,
        }
    }
}

/// Power-up item kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    SpeedBoost,
    Invincibility,
    Turbo,
}

/// Power-up lying on the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpPickup {
    pub kind: PowerUpKind,
    pub position: Vec3,
}

/// Loose debris on the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebrisItem {
    pub position: Vec3,
    pub radius: f32,
}

/// Per-tick world snapshot from the game loop
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Race clock in milliseconds
    pub time_ms: u64,
    /// Racers not managed by the AI (other than the player)
    pub other_racers: Vec<RacerSnapshot>,
    pub power_ups: Vec<PowerUpPickup>,
    pub debris: Vec<DebrisItem>,
}

impl GameState {
    pub fn new(time_ms: u64) -> Self {
        Self {
            time_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_forward_follows_heading() {
        let v = VehicleState::new(Vec3::ZERO, std::f32::consts::FRAC_PI_2);
        assert!(v.forward().approx_eq(Vec3::ground(0.0, 1.0), 1e-5));
    }

    #[test]
    fn test_player_snapshot() {
        let mut player = PlayerState::new(Vec3::ground(5.0, 5.0), 0.0);
        player.velocity = Vec3::ground(3.0, 4.0);
        let snap = player.snapshot();
        assert!(snap.is_player);
        assert_eq!(snap.id, player.id);
        assert!((player.speed() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_power_up_kind_serde() {
        let json = serde_json::to_string(&PowerUpKind::SpeedBoost).unwrap();
        assert_eq!(json, "\"speed_boost\"");
    }
}
