//! Track geometry
//!
//! A track is a closed loop of waypoints with a driveable width at each one.
//! Anything that cannot form a loop falls back to a synthetic circuit.

use crate::race::constants::track::{DEFAULT_RADIUS, DEFAULT_SEGMENTS, DEFAULT_WIDTH, MIN_WAYPOINTS};
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    waypoints: Vec<Vec3>,
    widths: Vec<f32>,
}

impl Track {
    /// Build a track with a uniform width.
    /// Returns the default circuit when the data cannot form a loop.
    pub fn new(waypoints: Vec<Vec3>, width: f32) -> Self {
        let widths = vec![width; waypoints.len()];
        Self::with_widths(waypoints, widths)
    }

    /// Build a track with one width per waypoint.
    /// Missing widths are filled with the default width.
    pub fn with_widths(waypoints: Vec<Vec3>, mut widths: Vec<f32>) -> Self {
        if !Self::is_usable(&waypoints) {
            tracing::warn!(
                waypoints = waypoints.len(),
                "Track data unusable, synthesizing default circuit"
            );
            return Self::default_circuit();
        }
        widths.resize(waypoints.len(), DEFAULT_WIDTH);
        for w in widths.iter_mut() {
            if !(w.is_finite() && *w > 0.0) {
                *w = DEFAULT_WIDTH;
            }
        }
        Self { waypoints, widths }
    }

    /// Circular track on the ground plane, centred on the origin
    pub fn circular(segments: usize, radius: f32, width: f32) -> Self {
        let segments = segments.max(MIN_WAYPOINTS);
        let waypoints = (0..segments)
            .map(|i| {
                let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
                Vec3::ground(angle.cos() * radius, angle.sin() * radius)
            })
            .collect::<Vec<_>>();
        Self {
            widths: vec![width; waypoints.len()],
            waypoints,
        }
    }

    /// Fallback circuit used when no usable track data exists
    pub fn default_circuit() -> Self {
        Self::circular(DEFAULT_SEGMENTS, DEFAULT_RADIUS, DEFAULT_WIDTH)
    }

    fn is_usable(waypoints: &[Vec3]) -> bool {
        waypoints.len() >= MIN_WAYPOINTS && waypoints.iter().all(|p| p.is_finite())
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint at a cyclic index
    pub fn waypoint(&self, index: usize) -> Vec3 {
        self.waypoints[index % self.waypoints.len()]
    }

    /// Width at a cyclic index
    pub fn width_at(&self, index: usize) -> f32 {
        self.widths[index % self.widths.len()]
    }

    /// Waypoints before and after `index`, wrapping around the loop
    pub fn neighbors(&self, index: usize) -> (Vec3, Vec3, Vec3) {
        let n = self.waypoints.len();
        let i = index % n;
        (
            self.waypoints[(i + n - 1) % n],
            self.waypoints[i],
            self.waypoints[(i + 1) % n],
        )
    }

    /// Total length of the closed loop
    pub fn lap_length(&self) -> f32 {
        let n = self.waypoints.len();
        (0..n)
            .map(|i| self.waypoints[i].distance_to(self.waypoints[(i + 1) % n]))
            .sum()
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::default_circuit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_track_falls_back_to_circuit() {
        let track = Track::new(Vec::new(), 25.0);
        assert_eq!(track.len(), DEFAULT_SEGMENTS);
        assert_eq!(track.width_at(0), DEFAULT_WIDTH);
    }

    #[test]
    fn test_non_finite_track_falls_back() {
        let track = Track::new(
            vec![Vec3::ZERO, Vec3::ground(f32::NAN, 0.0), Vec3::ground(1.0, 1.0)],
            25.0,
        );
        assert_eq!(track.len(), DEFAULT_SEGMENTS);
    }

    #[test]
    fn test_with_widths_fills_missing() {
        let track = Track::with_widths(
            vec![Vec3::ZERO, Vec3::ground(10.0, 0.0), Vec3::ground(10.0, 10.0)],
            vec![12.0],
        );
        assert_eq!(track.width_at(0), 12.0);
        assert_eq!(track.width_at(2), DEFAULT_WIDTH);
        // Cyclic indexing
        assert_eq!(track.width_at(3), 12.0);
    }

    #[test]
    fn test_circular_lap_length() {
        let track = Track::circular(64, 100.0, 30.0);
        let circumference = std::f32::consts::TAU * 100.0;
        // Inscribed polygon is slightly shorter than the circle
        assert!(track.lap_length() < circumference);
        assert!(track.lap_length() > circumference * 0.99);
    }

    #[test]
    fn test_neighbors_wrap() {
        let track = Track::circular(4, 10.0, 30.0);
        let (prev, cur, next) = track.neighbors(0);
        assert!(prev.approx_eq(track.waypoint(3), 1e-5));
        assert!(cur.approx_eq(track.waypoint(0), 1e-5));
        assert!(next.approx_eq(track.waypoint(1), 1e-5));
    }
}
