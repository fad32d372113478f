//! Builds each opponent's view of the race for the behavior layer

use crate::race::constants::angle_to_steering;
use crate::race::constants::controller::{SLIPSTREAM_ALIGNMENT, SLIPSTREAM_RANGE};
use crate::race::constants::perception::*;
use crate::race::state::{PlayerState, RacerId, RacerSnapshot, VehicleState};
use crate::race::systems::behavior::BehaviorContext;
use crate::race::systems::pathfinding::PathFinding;
use crate::util::vec3::{wrap_angle, Vec3};

/// Obstacles closer than this to the racer are the racer itself
const SELF_MATCH_DISTANCE: f32 = 0.01;

/// Read-only world view shared by every opponent in a tick
pub struct Perception<'a> {
    pub pathfinding: &'a PathFinding,
    /// Every racer on track, player included
    pub racers: &'a [RacerSnapshot],
    pub player: &'a PlayerState,
}

impl<'a> Perception<'a> {
    pub fn new(pathfinding: &'a PathFinding, racers: &'a [RacerSnapshot], player: &'a PlayerState) -> Self {
        Self {
            pathfinding,
            racers,
            player,
        }
    }

    pub fn context(
        &self,
        id: RacerId,
        vehicle: &VehicleState,
        race_position: u32,
        power_up_available: bool,
    ) -> BehaviorContext {
        let position = vehicle.position;
        let forward = vehicle.forward();
        let left = forward.left_normal();

        let waypoint = self
            .pathfinding
            .get_next_waypoint(position, vehicle.velocity, WAYPOINT_LOOK_AHEAD);
        let steering_hint = waypoint
            .map(|wp| steering_toward(vehicle, wp.position))
            .unwrap_or(0.0);

        let here = self
            .pathfinding
            .nearest_index(position)
            .and_then(|i| self.pathfinding.racing_line()[i].corner);
        let corner = here.or(waypoint.and_then(|wp| wp.corner));

        // Nearest non-beneficial obstacle inside the forward cone
        let blocking = self
            .pathfinding
            .obstacles_near(position, OBSTACLE_LOOK_AHEAD)
            .into_iter()
            .filter(|o| !o.beneficial)
            .map(|o| (o.position - position).flat())
            .filter(|offset| offset.length() > SELF_MATCH_DISTANCE)
            .filter(|offset| offset.normalize().dot(forward) >= AHEAD_CONE_COS)
            .min_by(|a, b| a.length_sq().partial_cmp(&b.length_sq()).unwrap_or(std::cmp::Ordering::Equal));

        let passing = racers_ahead(vehicle, self.racers, id, OVERTAKE_RANGE)
            .min_by(|a, b| {
                a.position
                    .distance_sq_to(position)
                    .partial_cmp(&b.position.distance_sq_to(position))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .filter(|_| self.pathfinding.can_overtake_at(position, forward));

        BehaviorContext {
            race_position,
            ai_position: position,
            ai_speed: vehicle.speed.abs(),
            player_position: self.player.position,
            player_speed: self.player.speed(),
            player_race_position: self.player.race_position,
            power_up_available,
            obstacle_ahead: blocking.is_some(),
            obstacle_side: blocking.map(|o| side_of(o.dot(left))).unwrap_or(0.0),
            overtaking_opportunity: passing.is_some(),
            // Pass on the side away from the racer being overtaken
            overtake_side: passing
                .map(|r| -side_of((r.position - position).dot(left)))
                .unwrap_or(0.0),
            in_corner: corner.is_some(),
            corner_radius: corner.map(|c| c.radius),
            steering_hint,
            drafting_opportunity: in_slipstream(vehicle, self.racers, id),
        }
    }
}

/// Steering in [-1, 1] that points the vehicle at `target`
pub fn steering_toward(vehicle: &VehicleState, target: Vec3) -> f32 {
    let to_target = (target - vehicle.position).flat();
    if to_target.length_sq() <= f32::EPSILON {
        return 0.0;
    }
    angle_to_steering(wrap_angle(to_target.heading() - vehicle.heading))
}

/// Racers other than `id` within `range` and inside the forward cone
pub fn racers_ahead<'r>(
    vehicle: &VehicleState,
    racers: &'r [RacerSnapshot],
    id: RacerId,
    range: f32,
) -> impl Iterator<Item = &'r RacerSnapshot> + 'r {
    let position = vehicle.position;
    let forward = vehicle.forward();
    racers.iter().filter(move |r| {
        if r.id == id {
            return false;
        }
        let offset = (r.position - position).flat();
        let distance = offset.length();
        distance > f32::EPSILON && distance <= range && offset.normalize().dot(forward) >= AHEAD_CONE_COS
    })
}

/// Directly behind another racer travelling the same way
pub fn in_slipstream(vehicle: &VehicleState, racers: &[RacerSnapshot], id: RacerId) -> bool {
    let position = vehicle.position;
    let forward = vehicle.forward();
    racers.iter().any(|r| {
        if r.id == id {
            return false;
        }
        let offset = (r.position - position).flat();
        let distance = offset.length();
        distance > f32::EPSILON
            && distance <= SLIPSTREAM_RANGE
            && offset.normalize().dot(forward) >= SLIPSTREAM_ALIGNMENT
            && Vec3::from_heading(r.heading).dot(forward) >= SLIPSTREAM_ALIGNMENT
    })
}

#[inline]
fn side_of(lateral: f32) -> f32 {
    if lateral >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathfindingConfig;
    use crate::race::track::Track;
    use uuid::Uuid;

    fn open_track() -> PathFinding {
        PathFinding::new(Track::circular(32, 200.0, 30.0), PathfindingConfig::default())
    }

    /// Vehicle on line point `i`, facing along the line
    fn vehicle_on(pf: &PathFinding, i: usize) -> VehicleState {
        let lp = pf.racing_line()[i];
        VehicleState::new(lp.position, lp.direction.heading())
    }

    fn snapshot(position: Vec3, heading: f32) -> RacerSnapshot {
        RacerSnapshot {
            id: Uuid::new_v4(),
            position,
            velocity: Vec3::ZERO,
            heading,
            is_player: false,
        }
    }

    fn far_player() -> PlayerState {
        PlayerState::new(Vec3::ground(-200.0, 0.0), 0.0)
    }

    #[test]
    fn test_steering_hint_follows_line() {
        let pf = open_track();
        let player = far_player();
        let vehicle = vehicle_on(&pf, 0);
        let ctx = Perception::new(&pf, &[], &player).context(Uuid::new_v4(), &vehicle, 2, false);
        // Counter-clockwise circle bends left
        assert!(ctx.steering_hint > 0.0);
        assert!(!ctx.in_corner);
        assert!(!ctx.obstacle_ahead);
    }

    #[test]
    fn test_steering_toward_sign() {
        let v = VehicleState::new(Vec3::ZERO, 0.0);
        assert!(steering_toward(&v, Vec3::ground(10.0, 5.0)) > 0.0);
        assert!(steering_toward(&v, Vec3::ground(10.0, -5.0)) < 0.0);
        assert_eq!(steering_toward(&v, Vec3::ground(-10.0, 0.1)), 1.0);
        assert_eq!(steering_toward(&v, Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_racer_ahead_is_overtaking_opportunity() {
        let pf = open_track();
        let player = far_player();
        let vehicle = vehicle_on(&pf, 4);
        let id = Uuid::new_v4();
        let forward = vehicle.forward();
        let rival = snapshot(vehicle.position + forward * 15.0 + forward.left_normal() * 2.0, vehicle.heading);
        let me = RacerSnapshot {
            id,
            ..snapshot(vehicle.position, vehicle.heading)
        };

        let ctx = Perception::new(&pf, &[me, rival], &player).context(id, &vehicle, 3, false);
        assert!(ctx.overtaking_opportunity);
        // Rival is slightly left, so pass on the right
        assert_eq!(ctx.overtake_side, -1.0);
        assert!(ctx.drafting_opportunity);
    }

    #[test]
    fn test_racer_behind_is_ignored() {
        let pf = open_track();
        let player = far_player();
        let vehicle = vehicle_on(&pf, 4);
        let behind = snapshot(vehicle.position - vehicle.forward() * 10.0, vehicle.heading);
        let ctx = Perception::new(&pf, &[behind], &player).context(Uuid::new_v4(), &vehicle, 3, false);
        assert!(!ctx.overtaking_opportunity);
        assert!(!ctx.drafting_opportunity);
    }

    #[test]
    fn test_obstacle_ahead_and_side() {
        let mut pf = open_track();
        let vehicle = vehicle_on(&pf, 4);
        let forward = vehicle.forward();
        pf.add_static_obstacle(vehicle.position + forward * 20.0 - forward.left_normal() * 3.0, 2.0);

        let player = far_player();
        let ctx = Perception::new(&pf, &[], &player).context(Uuid::new_v4(), &vehicle, 3, false);
        assert!(ctx.obstacle_ahead);
        assert_eq!(ctx.obstacle_side, -1.0);
    }

    #[test]
    fn test_own_racer_obstacle_ignored() {
        let mut pf = open_track();
        let vehicle = vehicle_on(&pf, 4);
        let id = Uuid::new_v4();
        let me = RacerSnapshot {
            id,
            ..snapshot(vehicle.position, vehicle.heading)
        };
        pf.update_dynamic_obstacles(&[me], &[], &[]);
        let player = far_player();
        let ctx = Perception::new(&pf, &[me], &player).context(id, &vehicle, 3, false);
        assert!(!ctx.obstacle_ahead);
    }

    #[test]
    fn test_corner_detected_on_tight_track() {
        let pf = PathFinding::new(Track::circular(16, 8.0, 40.0), PathfindingConfig::default());
        let vehicle = vehicle_on(&pf, 0);
        let player = far_player();
        let ctx = Perception::new(&pf, &[], &player).context(Uuid::new_v4(), &vehicle, 3, true);
        assert!(ctx.in_corner);
        assert!(ctx.corner_radius.unwrap() < 15.0);
        assert!(ctx.power_up_available);
    }
}
