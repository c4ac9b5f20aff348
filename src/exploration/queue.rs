//! Ordered queue of accessible waypoints.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::types::WorldPoint;

use super::waypoints::Waypoint;

/// Default distance of the fallback waypoints from the map origin (meters).
pub const DEFAULT_FALLBACK_OFFSET: f32 = 1.5;

/// Accessible waypoints, best (lowest score) first.
///
/// Rebuilt in full on every map update. When a rebuild finds nothing
/// accessible, the queue is seeded with four points around the map origin
/// so the robot always has somewhere to go.
#[derive(Clone, Debug, Default)]
pub struct WaypointQueue {
    waypoints: VecDeque<Waypoint>,
    origin: WorldPoint,
    fallback: bool,
}

impl WaypointQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with the accessible subset of `candidates`.
    pub fn rebuild(&mut self, candidates: &[Waypoint], origin: WorldPoint, fallback_offset: f32) {
        let mut accessible: Vec<Waypoint> = candidates
            .iter()
            .filter(|wp| wp.accessible && wp.score.is_finite())
            .copied()
            .collect();
        // sort_by is stable: equal scores keep generation order
        accessible.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));

        self.origin = origin;
        self.fallback = accessible.is_empty();
        self.waypoints = if self.fallback {
            tracing::warn!(
                "No accessible waypoints, using fallback offsets around ({:.2}, {:.2})",
                origin.x,
                origin.y
            );
            fallback_waypoints(fallback_offset).into()
        } else {
            accessible.into()
        };
    }

    /// Remove and return the best waypoint.
    pub fn pop_front(&mut self) -> Option<Waypoint> {
        self.waypoints.pop_front()
    }

    pub fn peek(&self) -> Option<&Waypoint> {
        self.waypoints.front()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Map origin the queue was built against.
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    /// True if the last rebuild fell back to the fixed offsets.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }
}

/// The four fixed fallback waypoints, relative to the map origin.
pub fn fallback_waypoints(offset: f32) -> Vec<Waypoint> {
    vec![
        Waypoint::fallback(offset, 0.0),
        Waypoint::fallback(0.0, offset),
        Waypoint::fallback(-offset, 0.0),
        Waypoint::fallback(0.0, -offset),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(x: f32, score: f32, accessible: bool) -> Waypoint {
        Waypoint {
            x,
            y: 0.0,
            score,
            accessible,
        }
    }

    #[test]
    fn test_rebuild_sorts_ascending_and_filters() {
        let mut queue = WaypointQueue::new();
        let candidates = [
            wp(1.0, 30.0, true),
            wp(2.0, f32::INFINITY, false),
            wp(3.0, 10.0, true),
            wp(4.0, 20.0, true),
        ];
        queue.rebuild(&candidates, WorldPoint::ZERO, DEFAULT_FALLBACK_OFFSET);

        assert!(!queue.is_fallback());
        let scores: Vec<f32> = queue.iter().map(|w| w.score).collect();
        assert_eq!(scores, vec![10.0, 20.0, 30.0]);
        assert!(queue.iter().all(|w| w.accessible && w.score.is_finite()));

        // pop_front always yields the minimum remaining score
        let mut last = f32::NEG_INFINITY;
        while let Some(w) = queue.pop_front() {
            assert!(w.score >= last);
            last = w.score;
        }
    }

    #[test]
    fn test_equal_scores_keep_order() {
        let mut queue = WaypointQueue::new();
        let candidates = [wp(1.0, 5.0, true), wp(2.0, 5.0, true), wp(3.0, 1.0, true)];
        queue.rebuild(&candidates, WorldPoint::ZERO, DEFAULT_FALLBACK_OFFSET);
        let xs: Vec<f32> = queue.iter().map(|w| w.x).collect();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_fallback_when_nothing_accessible() {
        let mut queue = WaypointQueue::new();
        let origin = WorldPoint::new(-2.0, 3.0);
        queue.rebuild(&[wp(1.0, f32::INFINITY, false)], origin, 1.5);

        assert!(queue.is_fallback());
        assert_eq!(queue.origin(), origin);
        let points: Vec<WorldPoint> = queue.iter().map(|w| w.position()).collect();
        assert_eq!(
            points,
            vec![
                WorldPoint::new(1.5, 0.0),
                WorldPoint::new(0.0, 1.5),
                WorldPoint::new(-1.5, 0.0),
                WorldPoint::new(0.0, -1.5),
            ]
        );
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut queue = WaypointQueue::new();
        queue.rebuild(&[wp(1.0, 1.0, true), wp(2.0, 2.0, true)], WorldPoint::ZERO, 1.5);
        queue.rebuild(&[wp(9.0, 4.0, true)], WorldPoint::ZERO, 1.5);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek().map(|w| w.x), Some(9.0));
    }
}
