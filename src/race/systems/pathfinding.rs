//! Racing line analysis and path queries
//!
//! The racing line is computed once per track: one line-point per waypoint,
//! classified as corner or straight from the curvature of its neighbours.
//! Path queries walk the line between two positions and then reshape the walk
//! for the requested line type and nearby obstacles. Results are cached for a
//! short time so every opponent asking the same question in the same second
//! shares one computation.

use smallvec::SmallVec;
use std::sync::Arc;

use crate::config::PathfindingConfig;
use crate::race::constants::obstacles::{RACER_RADIUS, TEMPORARY_LIFETIME_MS};
use crate::race::constants::pathfinding::*;
use crate::race::state::{DebrisItem, PowerUpPickup, RacerSnapshot};
use crate::race::systems::obstacles::{Obstacle, ObstacleKey, ObstacleMap};
use crate::race::systems::path_cache::{PathCache, PathKey, SharedPath};
use crate::race::track::Track;
use crate::util::vec3::Vec3;

/// Which way a corner turns, relative to the line's left normal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerInfo {
    pub radius: f32,
    pub direction: TurnDirection,
    /// |curvature| * 10
    pub difficulty: f32,
}

/// Classification of one waypoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentKind {
    Corner(CornerInfo),
    Straight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentAnalysis {
    /// Signed curvature (positive turns left)
    pub curvature: f32,
    pub kind: SegmentKind,
}

impl SegmentAnalysis {
    /// Classify a signed curvature
    pub fn from_curvature(curvature: f32) -> Self {
        let magnitude = curvature.abs();
        let kind = if magnitude > CORNER_CURVATURE_THRESHOLD {
            SegmentKind::Corner(CornerInfo {
                radius: 1.0 / magnitude,
                direction: if curvature > 0.0 {
                    TurnDirection::Left
                } else {
                    TurnDirection::Right
                },
                difficulty: magnitude * CORNER_DIFFICULTY_SCALE,
            })
        } else {
            SegmentKind::Straight
        };
        Self { curvature, kind }
    }

    pub fn corner(&self) -> Option<CornerInfo> {
        match self.kind {
            SegmentKind::Corner(info) => Some(info),
            SegmentKind::Straight => None,
        }
    }
}

/// Signed Menger curvature of the triangle (a, b, c) on the ground plane.
/// Degenerate or colinear triangles have zero curvature.
pub fn curvature(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let ab = (b - a).flat();
    let bc = (c - b).flat();
    let ca = (a - c).flat();
    let product = ab.length() * bc.length() * ca.length();
    if product <= f32::EPSILON {
        return 0.0;
    }
    // ground_cross is twice the signed triangle area
    2.0 * ab.ground_cross(bc) / product
}

/// One point of the precomputed racing line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RacingLinePoint {
    pub position: Vec3,
    pub target_speed: f32,
    pub sector: usize,
    pub is_corner: bool,
    pub is_straight: bool,
    pub corner: Option<CornerInfo>,
    /// Unit direction of travel
    pub direction: Vec3,
    /// Unit ground normal to the left of travel
    pub normal: Vec3,
    /// Unit ground direction toward the inside of this (or the next) corner
    pub inside: Vec3,
    pub width: f32,
}

/// Path variants requested by the behavior layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineType {
    #[default]
    Optimal,
    Aggressive,
    Defensive,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub position: Vec3,
    pub target_speed: f32,
    /// Racing line index this point came from (None for direct paths)
    pub line_index: Option<usize>,
    pub is_corner: bool,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOptions {
    pub line_type: LineType,
    pub avoid_obstacles: bool,
    pub avoidance_distance: f32,
    /// Player position, used by the defensive line
    pub player_position: Option<Vec3>,
    /// Position of the querying racer; obstacles on top of it are its own
    pub exclude_position: Option<Vec3>,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            line_type: LineType::Optimal,
            avoid_obstacles: false,
            avoidance_distance: DEFAULT_AVOIDANCE_DISTANCE,
            player_position: None,
            exclude_position: None,
        }
    }
}

impl PathOptions {
    pub fn with_line(line_type: LineType) -> Self {
        Self {
            line_type,
            ..Default::default()
        }
    }
}

/// Result of a look-ahead query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub target_speed: f32,
    pub sector: usize,
    pub is_corner: bool,
    pub is_straight: bool,
    pub corner: Option<CornerInfo>,
    pub index: usize,
    /// Distance walked along the line to reach this waypoint
    pub distance: f32,
}

/// Racing line, obstacle map and path cache for one track
pub struct PathFinding {
    track: Track,
    segments: Vec<SegmentAnalysis>,
    line: Vec<RacingLinePoint>,
    obstacles: ObstacleMap,
    cache: PathCache,
    config: PathfindingConfig,
    now_ms: u64,
}

impl PathFinding {
    pub fn new(track: Track, config: PathfindingConfig) -> Self {
        let cache = PathCache::new(config.cache_ttl_ms);
        let mut pf = Self {
            track,
            segments: Vec::new(),
            line: Vec::new(),
            obstacles: ObstacleMap::new(),
            cache,
            config,
            now_ms: 0,
        };
        pf.analyze_track();
        pf.calculate_optimal_racing_line();
        pf
    }

    /// Build from raw waypoints; unusable data yields the default circuit
    pub fn from_waypoints(waypoints: Vec<Vec3>, width: f32) -> Self {
        Self::new(Track::new(waypoints, width), PathfindingConfig::default())
    }

    /// Replace the track geometry and rebuild the line
    pub fn set_track(&mut self, track: Track) {
        self.track = track;
        self.cache.clear();
        self.analyze_track();
        self.calculate_optimal_racing_line();
    }

    /// Classify every waypoint as corner or straight
    pub fn analyze_track(&mut self) -> &[SegmentAnalysis] {
        if self.track.is_empty() {
            tracing::warn!("Empty track, synthesizing default circuit");
            self.track = Track::default_circuit();
        }

        self.segments = (0..self.track.len())
            .map(|i| {
                let (prev, cur, next) = self.track.neighbors(i);
                SegmentAnalysis::from_curvature(curvature(prev, cur, next))
            })
            .collect();

        let corners = self.segments.iter().filter(|s| s.corner().is_some()).count();
        tracing::debug!(
            waypoints = self.segments.len(),
            corners,
            "Track analyzed"
        );
        &self.segments
    }

    /// Derive one line-point per waypoint, then smooth the sequence
    pub fn calculate_optimal_racing_line(&mut self) -> &[RacingLinePoint] {
        if self.segments.len() != self.track.len() {
            self.analyze_track();
        }
        let n = self.track.len();

        let mut line: Vec<RacingLinePoint> = (0..n)
            .map(|i| {
                let (prev, cur, next) = self.track.neighbors(i);
                let direction = (next - prev).flat().normalize();
                let normal = direction.left_normal();
                let corner = self.segments[i].corner();
                let target_speed = match corner {
                    Some(c) => corner_speed(c.radius),
                    None => LINE_TOP_SPEED,
                };
                RacingLinePoint {
                    position: cur,
                    target_speed,
                    sector: i * SECTOR_COUNT / n,
                    is_corner: corner.is_some(),
                    is_straight: corner.is_none(),
                    corner,
                    direction,
                    normal,
                    inside: normal,
                    width: self.track.width_at(i),
                }
            })
            .collect();

        for i in 0..n {
            let turn = (0..n)
                .map(|k| (i + k) % n)
                .find_map(|j| line[j].corner.map(|c| c.direction));
            line[i].inside = match turn {
                Some(TurnDirection::Right) => -line[i].normal,
                _ => line[i].normal,
            };
        }

        smooth_racing_line(&mut line);
        self.line = line;
        &self.line
    }

    pub fn racing_line(&self) -> &[RacingLinePoint] {
        &self.line
    }

    pub fn segments(&self) -> &[SegmentAnalysis] {
        &self.segments
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn config(&self) -> &PathfindingConfig {
        &self.config
    }

    /// Advance the clock used for cache and obstacle expiry
    pub fn set_clock(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Nearest racing-line index, or None when nothing is within reach
    pub fn nearest_index(&self, position: Vec3) -> Option<usize> {
        self.line
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.position.ground_distance_to(position)))
            .filter(|(_, d)| *d <= NEAREST_MAX_DISTANCE)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Lap fraction in [0, 1) for a position, projected onto the line
    pub fn progress_of(&self, position: Vec3) -> Option<f32> {
        let i = self.nearest_index(position)?;
        let n = self.line.len();
        let prev = self.line[(i + n - 1) % n].position;
        let cur = self.line[i].position;
        let next = self.line[(i + 1) % n].position;

        // Project onto the segment ahead, or the one behind if we are past it
        let ahead = (next - cur).flat();
        let t_ahead = if ahead.length_sq() > 0.0 {
            (position - cur).flat().dot(ahead) / ahead.length_sq()
        } else {
            0.0
        };
        let progress = if t_ahead >= 0.0 {
            i as f32 + t_ahead.min(1.0)
        } else {
            let behind = (cur - prev).flat();
            let t_behind = if behind.length_sq() > 0.0 {
                (position - prev).flat().dot(behind) / behind.length_sq()
            } else {
                1.0
            };
            (i + n - 1) as f32 + t_behind.clamp(0.0, 1.0)
        };
        Some((progress / n as f32).rem_euclid(1.0))
    }

    /// Cached path query
    pub fn find_optimal_path(&mut self, start: Vec3, target: Vec3, options: &PathOptions) -> SharedPath {
        let key = PathKey::new(start, target, options.line_type);
        if let Some(path) = self.cache.get(&key, self.now_ms) {
            return path;
        }
        let path: SharedPath = Arc::from(self.calculate_path(start, target, options));
        self.cache.insert(key, Arc::clone(&path), self.now_ms);
        path
    }

    /// Uncached path computation
    pub fn calculate_path(&self, start: Vec3, target: Vec3, options: &PathOptions) -> Vec<PathPoint> {
        let (start_index, target_index) = match (self.nearest_index(start), self.nearest_index(target)) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                tracing::trace!("Path endpoints off the racing line, using direct path");
                return direct_path(start, target);
            }
        };

        let n = self.line.len();
        let mut path = Vec::with_capacity(n.min(64));
        let mut i = start_index;
        // Bounded by the line length so a bad index can never loop forever
        for _ in 0..n {
            let lp = &self.line[i];
            path.push(PathPoint {
                position: lp.position,
                target_speed: lp.target_speed,
                line_index: Some(i),
                is_corner: lp.is_corner,
                risk: RiskLevel::Medium,
            });
            if i == target_index {
                break;
            }
            i = (i + 1) % n;
        }

        if options.avoid_obstacles {
            self.apply_obstacle_avoidance(&mut path, options);
        }
        self.apply_line_type(&mut path, options);
        path
    }

    fn apply_obstacle_avoidance(&self, path: &mut [PathPoint], options: &PathOptions) {
        let distance = options.avoidance_distance;
        let mut displaced = false;

        for point in path.iter_mut() {
            let nearby: SmallVec<[Obstacle; 8]> = self.obstacles.near(point.position, distance, self.now_ms);
            for obstacle in nearby.iter().filter(|o| !o.beneficial) {
                if let Some(own) = options.exclude_position {
                    if obstacle.position.ground_distance_to(own) <= RACER_RADIUS {
                        continue;
                    }
                }
                let clearance = distance + obstacle.radius;
                let offset = (point.position - obstacle.position).flat();
                let d = offset.length();
                if d >= clearance {
                    continue;
                }
                let away = if d > f32::EPSILON {
                    offset * (1.0 / d)
                } else {
                    point
                        .line_index
                        .map(|i| self.line[i].normal)
                        .unwrap_or(Vec3::from_heading(0.0).left_normal())
                };
                point.position += away * (clearance - d);
                displaced = true;
            }
        }

        if displaced {
            smooth_path(path);
        }
    }

    fn apply_line_type(&self, path: &mut [PathPoint], options: &PathOptions) {
        for point in path.iter_mut() {
            let Some(lp) = point.line_index.map(|i| &self.line[i]) else {
                continue;
            };
            let half_width = lp.width * 0.5;

            match options.line_type {
                LineType::Optimal => {}
                LineType::Aggressive => {
                    if lp.is_corner {
                        point.position += lp.inside * half_width * AGGRESSIVE_CORNER_SHIFT;
                        point.target_speed *= AGGRESSIVE_CORNER_SPEED;
                        point.risk = RiskLevel::High;
                    } else {
                        point.position += lp.inside * half_width * AGGRESSIVE_STRAIGHT_SHIFT;
                        point.target_speed *= AGGRESSIVE_STRAIGHT_SPEED;
                    }
                }
                LineType::Defensive => {
                    if let Some(player) = options.player_position {
                        if player.ground_distance_to(point.position) < DEFENSIVE_THREAT_DISTANCE {
                            let lateral = (player - point.position).flat().dot(lp.normal);
                            let shift = (lateral * DEFENSIVE_BLOCK_FACTOR).clamp(-half_width, half_width);
                            point.position += lp.normal * shift;
                            point.target_speed *= DEFENSIVE_SPEED;
                            point.risk = RiskLevel::Low;
                        }
                    }
                }
                LineType::Safe => {
                    if lp.is_corner {
                        point.position -= lp.inside * half_width * SAFE_CORNER_SHIFT;
                        point.target_speed *= SAFE_CORNER_SPEED;
                    }
                    point.risk = RiskLevel::Low;
                }
            }
        }
    }

    /// Refresh racer, pickup and debris obstacles at the current clock
    pub fn update_dynamic_obstacles(
        &mut self,
        racers: &[RacerSnapshot],
        power_ups: &[PowerUpPickup],
        debris: &[DebrisItem],
    ) {
        self.obstacles.update_dynamic(racers, power_ups, debris, self.now_ms);
    }

    pub fn add_static_obstacle(&mut self, position: Vec3, radius: f32) -> ObstacleKey {
        self.obstacles.add_static(position, radius, self.now_ms)
    }

    /// Obstacle that disappears after `lifetime_ms` (default when None)
    pub fn add_temporary_obstacle(&mut self, position: Vec3, radius: f32, lifetime_ms: Option<u64>) -> ObstacleKey {
        self.obstacles.add_temporary(
            position,
            radius,
            self.now_ms,
            lifetime_ms.unwrap_or(TEMPORARY_LIFETIME_MS),
        )
    }

    pub fn obstacles(&self) -> &ObstacleMap {
        &self.obstacles
    }

    pub fn obstacles_near(&self, position: Vec3, radius: f32) -> SmallVec<[Obstacle; 8]> {
        self.obstacles.near(position, radius, self.now_ms)
    }

    /// Waypoint at least `max(look_ahead, 2 * speed)` along the line
    pub fn get_next_waypoint(&self, position: Vec3, velocity: Vec3, look_ahead: f32) -> Option<Waypoint> {
        let start = self.nearest_index(position)?;
        let n = self.line.len();
        let wanted = look_ahead.max(2.0 * velocity.length());

        let mut index = start;
        let mut distance = 0.0;
        for _ in 0..n {
            let next = (index + 1) % n;
            distance += self.line[index].position.distance_to(self.line[next].position);
            index = next;
            if distance >= wanted {
                break;
            }
        }

        let lp = &self.line[index];
        Some(Waypoint {
            position: lp.position,
            target_speed: lp.target_speed,
            sector: lp.sector,
            is_corner: lp.is_corner,
            is_straight: lp.is_straight,
            corner: lp.corner,
            index,
            distance,
        })
    }

    /// Whether there is room to pass at `position` while travelling along `direction`
    pub fn can_overtake_at(&self, position: Vec3, direction: Vec3) -> bool {
        let Some(index) = self.nearest_index(position) else {
            return false;
        };
        if !self.point_allows_overtake(index) {
            return false;
        }
        let travel = direction.flat();
        if travel.length_sq() <= f32::EPSILON {
            return true;
        }
        let n = self.line.len();
        let neighbor = if travel.dot(self.line[index].direction) >= 0.0 {
            (index + 1) % n
        } else {
            (index + n - 1) % n
        };
        self.point_allows_overtake(neighbor)
    }

    fn point_allows_overtake(&self, index: usize) -> bool {
        let lp = &self.line[index];
        if let Some(corner) = lp.corner {
            if corner.radius < self.config.overtake_min_corner_radius {
                return false;
            }
        }
        lp.width > self.config.overtake_min_width
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// (hits, misses) of the path cache
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }
}

#[inline]
fn corner_speed(radius: f32) -> f32 {
    (radius * CORNER_GRIP).sqrt().clamp(MIN_CORNER_SPEED, LINE_TOP_SPEED)
}

fn direct_path(start: Vec3, target: Vec3) -> Vec<PathPoint> {
    [start, target]
        .into_iter()
        .map(|position| PathPoint {
            position,
            target_speed: LINE_TOP_SPEED,
            line_index: None,
            is_corner: false,
            risk: RiskLevel::Medium,
        })
        .collect()
}

/// Cyclic smoothing of positions; speeds ease down ahead of slower points
fn smooth_racing_line(line: &mut [RacingLinePoint]) {
    let n = line.len();
    if n < 3 {
        return;
    }
    let edge = (1.0 - SMOOTHING_CENTER_WEIGHT) * 0.5;
    let positions: Vec<Vec3> = line.iter().map(|p| p.position).collect();
    let speeds: Vec<f32> = line.iter().map(|p| p.target_speed).collect();
    for i in 0..n {
        let prev = positions[(i + n - 1) % n];
        let next = positions[(i + 1) % n];
        line[i].position = positions[i] * SMOOTHING_CENTER_WEIGHT + (prev + next) * edge;
        let upcoming = speeds[(i + 1) % n];
        line[i].target_speed = speeds[i].min((speeds[i] + upcoming) * 0.5);
    }
}

/// Open-path smoothing; endpoints stay fixed
fn smooth_path(path: &mut [PathPoint]) {
    if path.len() < 3 {
        return;
    }
    let edge = (1.0 - SMOOTHING_CENTER_WEIGHT) * 0.5;
    let positions: Vec<Vec3> = path.iter().map(|p| p.position).collect();
    for i in 1..path.len() - 1 {
        path[i].position = positions[i] * SMOOTHING_CENTER_WEIGHT + (positions[i - 1] + positions[i + 1]) * edge;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::constants::track::DEFAULT_SEGMENTS;
    use uuid::Uuid;

    const EPSILON: f32 = 1e-3;

    /// Large circle: every waypoint is a straight
    fn open_track(width: f32) -> PathFinding {
        PathFinding::new(Track::circular(32, 200.0, width), PathfindingConfig::default())
    }

    /// Small circle: every waypoint is a corner of radius ~8
    fn tight_track(width: f32) -> PathFinding {
        PathFinding::new(Track::circular(16, 8.0, width), PathfindingConfig::default())
    }

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
    fn test_colinear_points_are_straight() {
        let c = curvature(Vec3::ZERO, Vec3::ground(5.0, 0.0), Vec3::ground(10.0, 0.0));
        assert_eq!(c, 0.0);
        assert_eq!(SegmentAnalysis::from_curvature(c).kind, SegmentKind::Straight);
    }

    #[test]
    fn test_circle_points_give_inverse_radius() {
        let r = 5.0;
        let p = |a: f32| Vec3::ground(a.cos() * r, a.sin() * r);
        let c = curvature(p(0.0), p(0.5), p(1.0));
        assert!((c.abs() - 1.0 / r).abs() < EPSILON);

        let analysis = SegmentAnalysis::from_curvature(c);
        let corner = analysis.corner().expect("tight arc should be a corner");
        assert!((corner.radius - r).abs() < 0.01);
        assert!((corner.difficulty - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(SegmentAnalysis::from_curvature(0.1).kind, SegmentKind::Straight);
        assert_eq!(SegmentAnalysis::from_curvature(-0.1).kind, SegmentKind::Straight);
        assert!(SegmentAnalysis::from_curvature(0.11).corner().is_some());
        let right = SegmentAnalysis::from_curvature(-0.5).corner().unwrap();
        assert_eq!(right.direction, TurnDirection::Right);
        assert!((right.radius - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_turn_sign() {
        // Heading +x, turning toward +z (the left normal of +x)
        let c = curvature(Vec3::ZERO, Vec3::ground(1.0, 0.0), Vec3::ground(2.0, 1.0));
        assert!(c > 0.0);
        let c = curvature(Vec3::ZERO, Vec3::ground(1.0, 0.0), Vec3::ground(2.0, -1.0));
        assert!(c < 0.0);
    }

    #[test]
    fn test_racing_line_matches_waypoint_count() {
        let pf = open_track(30.0);
        assert_eq!(pf.racing_line().len(), pf.track().len());
        assert!(pf.racing_line().iter().all(|p| p.is_straight && !p.is_corner));
        assert_eq!(pf.racing_line()[0].sector, 0);
        assert_eq!(pf.racing_line()[31].sector, SECTOR_COUNT - 1);
    }

    #[test]
    fn test_missing_track_synthesizes_default() {
        let pf = PathFinding::from_waypoints(Vec::new(), 30.0);
        assert_eq!(pf.racing_line().len(), DEFAULT_SEGMENTS);
    }

    #[test]
    fn test_corner_speed_below_straight_speed() {
        let pf = tight_track(40.0);
        let lp = pf.racing_line()[0];
        assert!(lp.is_corner);
        assert!(lp.target_speed < LINE_TOP_SPEED);
        assert!(lp.target_speed >= MIN_CORNER_SPEED);
    }

    #[test]
    fn test_path_cache_returns_same_path_within_ttl() {
        let mut pf = open_track(30.0);
        pf.set_clock(10_000);
        let start = pf.racing_line()[0].position;
        let target = pf.racing_line()[5].position;
        let options = PathOptions::default();

        let first = pf.find_optimal_path(start, target, &options);
        pf.set_clock(10_999);
        let second = pf.find_optimal_path(start, target, &options);
        assert!(Arc::ptr_eq(&first, &second));

        pf.set_clock(11_000);
        let third = pf.find_optimal_path(start, target, &options);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first.len(), third.len());
    }

    #[test]
    fn test_path_walks_line_forward() {
        let pf = open_track(30.0);
        let line = pf.racing_line();
        let path = pf.calculate_path(line[30].position, line[2].position, &PathOptions::default());
        let indices: Vec<_> = path.iter().map(|p| p.line_index.unwrap()).collect();
        assert_eq!(indices, vec![30, 31, 0, 1, 2]);
    }

    #[test]
    fn test_path_same_start_and_target() {
        let pf = open_track(30.0);
        let p = pf.racing_line()[4].position;
        let path = pf.calculate_path(p, p, &PathOptions::default());
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_off_line_endpoints_fall_back_to_direct_path() {
        let pf = open_track(30.0);
        let far = Vec3::ground(5_000.0, 5_000.0);
        let path = pf.calculate_path(far, pf.racing_line()[3].position, &PathOptions::default());
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].position, far);
        assert!(path.iter().all(|p| p.line_index.is_none()));
    }

    #[test]
    fn test_aggressive_and_safe_corner_modifiers() {
        let pf = tight_track(40.0);
        let line = pf.racing_line();
        let (start, target) = (line[0].position, line[3].position);
        let optimal = pf.calculate_path(start, target, &PathOptions::default());
        let aggressive = pf.calculate_path(start, target, &PathOptions::with_line(LineType::Aggressive));
        let safe = pf.calculate_path(start, target, &PathOptions::with_line(LineType::Safe));

        for ((o, a), s) in optimal.iter().zip(&aggressive).zip(&safe) {
            assert!((a.target_speed - o.target_speed * 0.95).abs() < EPSILON);
            assert!((s.target_speed - o.target_speed * 0.85).abs() < EPSILON);
            assert_eq!(a.risk, RiskLevel::High);
            assert_eq!(s.risk, RiskLevel::Low);
        }
        // Aggressive moves toward the centre of the circle, safe away from it
        assert!(aggressive[1].position.length() < optimal[1].position.length());
        assert!(safe[1].position.length() > optimal[1].position.length());
    }

    #[test]
    fn test_aggressive_straights_are_faster() {
        let pf = open_track(30.0);
        let line = pf.racing_line();
        let optimal = pf.calculate_path(line[0].position, line[2].position, &PathOptions::default());
        let aggressive =
            pf.calculate_path(line[0].position, line[2].position, &PathOptions::with_line(LineType::Aggressive));
        assert!((aggressive[0].target_speed - optimal[0].target_speed * 1.05).abs() < EPSILON);
    }

    #[test]
    fn test_defensive_blocks_threatening_player() {
        let pf = open_track(30.0);
        let lp = pf.racing_line()[4];
        let player = lp.position + lp.normal * 8.0 - lp.direction * 10.0;
        let options = PathOptions {
            line_type: LineType::Defensive,
            player_position: Some(player),
            ..Default::default()
        };
        let path = pf.calculate_path(lp.position, pf.racing_line()[5].position, &options);
        let shifted = (path[0].position - lp.position).dot(lp.normal);
        assert!(shifted > 0.0, "should move toward the player's side");
        assert!((path[0].target_speed - lp.target_speed * 0.9).abs() < EPSILON);
        assert_eq!(path[0].risk, RiskLevel::Low);

        // No player nearby: line untouched
        let calm = pf.calculate_path(
            lp.position,
            pf.racing_line()[5].position,
            &PathOptions::with_line(LineType::Defensive),
        );
        assert!(calm[0].position.approx_eq(lp.position, EPSILON));
    }

    #[test]
    fn test_obstacle_avoidance_displaces_points() {
        let mut pf = open_track(30.0);
        let line = pf.racing_line().to_vec();
        pf.add_static_obstacle(line[2].position, 2.0);
        let options = PathOptions {
            avoid_obstacles: true,
            ..Default::default()
        };
        let path = pf.calculate_path(line[0].position, line[4].position, &options);
        assert!(path[2].position.ground_distance_to(line[2].position) > 1.0);
    }

    #[test]
    fn test_avoidance_ignores_beneficial_and_own_obstacles() {
        let mut pf = open_track(30.0);
        let line = pf.racing_line().to_vec();
        let pickup = PowerUpPickup {
            kind: crate::race::state::PowerUpKind::Turbo,
            position: line[2].position,
        };
        pf.update_dynamic_obstacles(&[racer_at(line[0].position)], &[pickup], &[]);
        let options = PathOptions {
            avoid_obstacles: true,
            exclude_position: Some(line[0].position),
            ..Default::default()
        };
        let path = pf.calculate_path(line[0].position, line[4].position, &options);
        for (p, i) in path.iter().zip(0..) {
            assert!(p.position.approx_eq(line[i].position, EPSILON));
        }
    }

    #[test]
    fn test_next_waypoint_respects_speed_look_ahead() {
        let pf = open_track(30.0);
        let start = pf.racing_line()[0].position;
        let slow = pf.get_next_waypoint(start, Vec3::ZERO, 20.0).unwrap();
        assert!(slow.distance >= 20.0);

        let fast = pf.get_next_waypoint(start, Vec3::ground(50.0, 0.0), 20.0).unwrap();
        assert!(fast.distance >= 100.0);
        assert!(fast.index != slow.index);
        assert!(fast.is_straight);
    }

    #[test]
    fn test_next_waypoint_missing_when_off_line() {
        let pf = open_track(30.0);
        assert!(pf.get_next_waypoint(Vec3::ground(9_000.0, 0.0), Vec3::ZERO, 20.0).is_none());
    }

    #[test]
    fn test_can_overtake_requires_width() {
        let narrow = open_track(20.0);
        let p = narrow.racing_line()[3];
        assert!(!narrow.can_overtake_at(p.position, p.direction));

        let wide = open_track(25.0);
        let p = wide.racing_line()[3];
        assert!(wide.can_overtake_at(p.position, p.direction));
        assert!(wide.can_overtake_at(p.position, Vec3::ZERO));
    }

    #[test]
    fn test_can_overtake_refused_in_tight_corner() {
        let pf = tight_track(40.0);
        let p = pf.racing_line()[0];
        assert!(p.width > 20.0);
        assert!(!pf.can_overtake_at(p.position, p.direction));
    }

    #[test]
    fn test_overtake_thresholds_configurable() {
        let config = PathfindingConfig {
            overtake_min_width: 10.0,
            ..Default::default()
        };
        let pf = PathFinding::new(Track::circular(32, 200.0, 15.0), config);
        let p = pf.racing_line()[0];
        assert!(pf.can_overtake_at(p.position, p.direction));
    }

    #[test]
    fn test_dynamic_obstacle_gone_after_ttl() {
        let mut pf = open_track(30.0);
        pf.set_clock(5_000);
        pf.update_dynamic_obstacles(&[racer_at(Vec3::ground(200.0, 0.0))], &[], &[]);
        assert_eq!(pf.obstacles_near(Vec3::ground(200.0, 0.0), 5.0).len(), 1);

        pf.set_clock(6_001);
        assert!(pf.obstacles_near(Vec3::ground(200.0, 0.0), 5.0).is_empty());
        pf.update_dynamic_obstacles(&[], &[], &[]);
        assert_eq!(pf.obstacles().live_count(6_001), 0);
    }

    #[test]
    fn test_progress_wraps_around_lap() {
        let pf = open_track(30.0);
        let line = pf.racing_line();
        let p0 = pf.progress_of(line[0].position).unwrap();
        let p16 = pf.progress_of(line[16].position).unwrap();
        assert!(p0 < 0.01 || p0 > 0.99);
        assert!((p16 - 0.5).abs() < 0.02);
        let mid = line[8].position.lerp(line[9].position, 0.5);
        let p_mid = pf.progress_of(mid).unwrap();
        assert!((p_mid - 8.5 / 32.0).abs() < 0.01);
    }

    #[test]
    fn test_set_track_clears_cache() {
        let mut pf = open_track(30.0);
        let line = pf.racing_line().to_vec();
        pf.find_optimal_path(line[0].position, line[3].position, &PathOptions::default());
        assert_eq!(pf.cache_len(), 1);
        pf.set_track(Track::circular(24, 150.0, 30.0));
        assert_eq!(pf.cache_len(), 0);
        assert_eq!(pf.racing_line().len(), 24);
    }
}
