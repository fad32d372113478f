//! Obstacle bookkeeping for path queries
//!
//! Static obstacles live for the race. Dynamic ones (racers, pickups, debris)
//! are re-inserted every obstacle update and go stale after a second without
//! a refresh. Temporary ones expire at a fixed time.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::race::constants::obstacles::{DYNAMIC_TTL_MS, POWER_UP_RADIUS, RACER_RADIUS};
use crate::race::state::{DebrisItem, PowerUpPickup, RacerSnapshot};
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Static,
    Dynamic,
    Temporary,
}

/// Key for the obstacle map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKey {
    Racer(usize),
    PowerUp(usize),
    Debris(usize),
    Static(u32),
    Temporary(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    pub created_at_ms: u64,
    /// Pickups are worth driving into
    pub beneficial: bool,
    /// Expiry for temporary obstacles
    pub expires_at_ms: Option<u64>,
}

impl Obstacle {
    /// Whether the obstacle should still be reported at `now_ms`
    pub fn is_live(&self, now_ms: u64) -> bool {
        match self.kind {
            ObstacleKind::Static => true,
            ObstacleKind::Dynamic => now_ms.saturating_sub(self.created_at_ms) <= DYNAMIC_TTL_MS,
            ObstacleKind::Temporary => self.expires_at_ms.map_or(true, |t| now_ms < t),
        }
    }
}

/// All obstacles known to the path finder
#[derive(Debug, Default)]
pub struct ObstacleMap {
    obstacles: HashMap<ObstacleKey, Obstacle>,
    next_static: u32,
    next_temporary: u32,
}

impl ObstacleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(&mut self, position: Vec3, radius: f32, now_ms: u64) -> ObstacleKey {
        let key = ObstacleKey::Static(self.next_static);
        self.next_static += 1;
        self.obstacles.insert(
            key,
            Obstacle {
                kind: ObstacleKind::Static,
                position,
                velocity: Vec3::ZERO,
                radius,
                created_at_ms: now_ms,
                beneficial: false,
                expires_at_ms: None,
            },
        );
        key
    }

    pub fn add_temporary(
        &mut self,
        position: Vec3,
        radius: f32,
        now_ms: u64,
        lifetime_ms: u64,
    ) -> ObstacleKey {
        let key = ObstacleKey::Temporary(self.next_temporary);
        self.next_temporary += 1;
        self.obstacles.insert(
            key,
            Obstacle {
                kind: ObstacleKind::Temporary,
                position,
                velocity: Vec3::ZERO,
                radius,
                created_at_ms: now_ms,
                beneficial: false,
                expires_at_ms: Some(now_ms + lifetime_ms),
            },
        );
        key
    }

    pub fn remove(&mut self, key: ObstacleKey) -> Option<Obstacle> {
        self.obstacles.remove(&key)
    }

    /// Drop stale dynamic and expired temporary obstacles, then refresh one
    /// dynamic entry per racer, pickup and debris item.
    pub fn update_dynamic(
        &mut self,
        racers: &[RacerSnapshot],
        power_ups: &[PowerUpPickup],
        debris: &[DebrisItem],
        now_ms: u64,
    ) {
        let before = self.obstacles.len();
        self.obstacles.retain(|_, o| o.is_live(now_ms));
        let purged = before - self.obstacles.len();
        if purged > 0 {
            tracing::trace!(purged, "Purged stale obstacles");
        }

        let dynamic = |position: Vec3, velocity: Vec3, radius: f32, beneficial: bool| Obstacle {
            kind: ObstacleKind::Dynamic,
            position,
            velocity,
            radius,
            created_at_ms: now_ms,
            beneficial,
            expires_at_ms: None,
        };

        for (i, racer) in racers.iter().enumerate() {
            self.obstacles.insert(
                ObstacleKey::Racer(i),
                dynamic(racer.position, racer.velocity, RACER_RADIUS, false),
            );
        }
        for (i, pickup) in power_ups.iter().enumerate() {
            self.obstacles.insert(
                ObstacleKey::PowerUp(i),
                dynamic(pickup.position, Vec3::ZERO, POWER_UP_RADIUS, true),
            );
        }
        for (i, item) in debris.iter().enumerate() {
            self.obstacles.insert(
                ObstacleKey::Debris(i),
                dynamic(item.position, Vec3::ZERO, item.radius, false),
            );
        }
    }

    pub fn get(&self, key: ObstacleKey, now_ms: u64) -> Option<&Obstacle> {
        self.obstacles.get(&key).filter(|o| o.is_live(now_ms))
    }

    /// Live obstacles within `radius` of `position` (edge distance)
    pub fn near(&self, position: Vec3, radius: f32, now_ms: u64) -> SmallVec<[Obstacle; 8]> {
        self.obstacles
            .values()
            .filter(|o| o.is_live(now_ms))
            .filter(|o| o.position.ground_distance_to(position) - o.radius <= radius)
            .copied()
            .collect()
    }

    /// Live obstacles of one kind
    pub fn of_kind(&self, kind: ObstacleKind, now_ms: u64) -> impl Iterator<Item = &Obstacle> + '_ {
        self.obstacles
            .values()
            .filter(move |o| o.kind == kind && o.is_live(now_ms))
    }

    pub fn live_count(&self, now_ms: u64) -> usize {
        self.obstacles.values().filter(|o| o.is_live(now_ms)).count()
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn racer_at(position: Vec3) -> RacerSnapshot {
        RacerSnapshot {
            id: Uuid::new_v4(),
            position,
            velocity: Vec3::ZERO,
            heading: 0.0,
            is_player: false,
        }
    }

    #[test]
    fn test_dynamic_obstacle_expires_without_refresh() {
        let mut map = ObstacleMap::new();
        map.update_dynamic(&[racer_at(Vec3::ground(5.0, 0.0))], &[], &[], 1_000);
        assert!(map.get(ObstacleKey::Racer(0), 1_000).is_some());
        assert!(map.get(ObstacleKey::Racer(0), 2_000).is_some());
        // Query alone no longer reports it
        assert!(map.get(ObstacleKey::Racer(0), 2_001).is_none());

        map.update_dynamic(&[], &[], &[], 2_001);
        assert_eq!(map.live_count(2_001), 0);
        assert!(map.obstacles.is_empty());
    }

    #[test]
    fn test_refresh_keeps_dynamic_alive() {
        let mut map = ObstacleMap::new();
        map.update_dynamic(&[racer_at(Vec3::ZERO)], &[], &[], 0);
        map.update_dynamic(&[racer_at(Vec3::ground(1.0, 0.0))], &[], &[], 900);
        let obstacle = map.get(ObstacleKey::Racer(0), 1_800).unwrap();
        assert_eq!(obstacle.position, Vec3::ground(1.0, 0.0));
    }

    #[test]
    fn test_power_ups_are_beneficial() {
        let mut map = ObstacleMap::new();
        let pickup = PowerUpPickup {
            kind: crate::race::state::PowerUpKind::Turbo,
            position: Vec3::ground(3.0, 3.0),
        };
        let debris = DebrisItem {
            position: Vec3::ground(-3.0, 0.0),
            radius: 1.5,
        };
        map.update_dynamic(&[], &[pickup], &[debris], 0);
        assert!(map.get(ObstacleKey::PowerUp(0), 0).unwrap().beneficial);
        assert!(!map.get(ObstacleKey::Debris(0), 0).unwrap().beneficial);
    }

    #[test]
    fn test_static_survives_updates() {
        let mut map = ObstacleMap::new();
        let key = map.add_static(Vec3::ZERO, 4.0, 0);
        map.update_dynamic(&[], &[], &[], 1_000_000);
        assert!(map.get(key, 1_000_000).is_some());
        assert_eq!(map.of_kind(ObstacleKind::Static, 1_000_000).count(), 1);
    }

    #[test]
    fn test_temporary_expires() {
        let mut map = ObstacleMap::new();
        let key = map.add_temporary(Vec3::ZERO, 2.0, 100, 500);
        assert!(map.get(key, 599).is_some());
        map.update_dynamic(&[], &[], &[], 600);
        assert!(map.get(key, 600).is_none());
    }

    #[test]
    fn test_near_uses_edge_distance() {
        let mut map = ObstacleMap::new();
        map.add_static(Vec3::ground(12.0, 0.0), 3.0, 0);
        assert_eq!(map.near(Vec3::ZERO, 10.0, 0).len(), 1);
        assert_eq!(map.near(Vec3::ZERO, 8.0, 0).len(), 0);
    }
}
