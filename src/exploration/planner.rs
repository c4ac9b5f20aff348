//! Waypoint planning: lattice generation, scoring and queueing.
//!
//! The planner keeps the waypoint queue in step with the latest occupancy
//! snapshot. A rebuild happens when a newer occupancy revision is seen or
//! when the queue runs dry.

use crate::shared::WorldState;
use crate::types::WorldPoint;

use super::observer::{LoggingObserver, WaypointObserver, WaypointSet};
use super::queue::{DEFAULT_FALLBACK_OFFSET, WaypointQueue};
use super::scorer::{AccessibilityScorer, ScoringConfig};
use super::waypoints::{GridGenerator, Waypoint};

/// Planner configuration.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Lattice spacing (meters).
    pub step: f32,
    /// Side of the synthetic lattice used before any map arrives.
    pub synthetic_count: usize,
    pub scoring: ScoringConfig,
    pub fallback_offset: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            step: 0.2,
            synthetic_count: 100,
            scoring: ScoringConfig::default(),
            fallback_offset: DEFAULT_FALLBACK_OFFSET,
        }
    }
}

/// Builds and serves the waypoint queue.
pub struct WaypointPlanner {
    generator: GridGenerator,
    scorer: AccessibilityScorer,
    synthetic_count: usize,
    fallback_offset: f32,
    queue: WaypointQueue,
    candidates: Vec<Waypoint>,
    built_revision: Option<u64>,
    rebuilds: u32,
    observer: Box<dyn WaypointObserver>,
}

impl WaypointPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            generator: GridGenerator::new(config.step),
            scorer: AccessibilityScorer::new(config.scoring),
            synthetic_count: config.synthetic_count,
            fallback_offset: config.fallback_offset,
            queue: WaypointQueue::new(),
            candidates: Vec::new(),
            built_revision: None,
            rebuilds: 0,
            observer: Box::new(LoggingObserver),
        }
    }

    /// Replace the rebuild observer.
    pub fn set_observer(&mut self, observer: Box<dyn WaypointObserver>) {
        self.observer = observer;
    }

    pub fn queue(&self) -> &WaypointQueue {
        &self.queue
    }

    /// Candidates scored by the last rebuild.
    pub fn candidates(&self) -> &[Waypoint] {
        &self.candidates
    }

    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    /// Rebuild if a newer occupancy snapshot has arrived. Returns `true`
    /// when a rebuild happened.
    pub fn refresh(&mut self, world: &WorldState) -> bool {
        if self.built_revision == Some(world.occupancy_revision()) {
            return false;
        }
        self.rebuild(world);
        true
    }

    /// Rebuild the queue from the current snapshots.
    pub fn rebuild(&mut self, world: &WorldState) {
        let revision = world.occupancy_revision();
        let origin = match world.occupancy() {
            Some(occupancy) => {
                let points =
                    self.generator
                        .from_map(occupancy.width(), occupancy.height(), occupancy.resolution());
                self.candidates = self.scorer.score_all(&points, occupancy, world.coverage());
                occupancy.origin()
            }
            None => {
                // Nothing to score against yet: every synthetic point is unknown
                self.candidates = self
                    .generator
                    .synthetic(self.synthetic_count)
                    .into_iter()
                    .map(|p| Waypoint {
                        x: p.x,
                        y: p.y,
                        score: f32::INFINITY,
                        accessible: false,
                    })
                    .collect();
                WorldPoint::ZERO
            }
        };

        self.queue
            .rebuild(&self.candidates, origin, self.fallback_offset);
        self.built_revision = Some(revision);
        self.rebuilds += 1;

        self.observer.on_rebuild(&WaypointSet {
            revision,
            origin,
            candidates: &self.candidates,
            selected: self.queue.peek().copied(),
            queue_len: self.queue.len(),
            fallback: self.queue.is_fallback(),
        });
    }

    /// Pop the best waypoint along with the map origin it is relative to.
    pub fn next_waypoint(&mut self, world: &WorldState) -> Option<(Waypoint, WorldPoint)> {
        if self.queue.is_empty() {
            tracing::debug!("Waypoint queue drained, rebuilding");
            self.rebuild(world);
        }
        let origin = self.queue.origin();
        self.queue.pop_front().map(|wp| (wp, origin))
    }
}

impl Default for WaypointPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::OccupancyGrid;
    use crate::shared::InputEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        sizes: Rc<RefCell<Vec<usize>>>,
    }

    impl WaypointObserver for Recorder {
        fn on_rebuild(&mut self, set: &WaypointSet<'_>) {
            self.sizes.borrow_mut().push(set.queue_len);
        }
    }

    fn free_map(origin: WorldPoint) -> OccupancyGrid {
        OccupancyGrid::new(20, 20, 0.1, origin, vec![0; 400]).unwrap()
    }

    #[test]
    fn test_no_map_uses_fallback_at_zero() {
        let world = WorldState::new();
        let mut planner = WaypointPlanner::default();

        assert!(planner.refresh(&world));
        assert!(planner.queue().is_fallback());
        assert_eq!(planner.candidates().len(), 100 * 100);

        let (wp, origin) = planner.next_waypoint(&world).unwrap();
        assert_eq!(origin, WorldPoint::ZERO);
        assert_eq!(wp.position(), WorldPoint::new(1.5, 0.0));
    }

    #[test]
    fn test_refresh_only_on_new_revision() {
        let mut world = WorldState::new();
        world.apply(InputEvent::Occupancy(free_map(WorldPoint::ZERO)));

        let mut planner = WaypointPlanner::default();
        assert!(planner.refresh(&world));
        assert!(!planner.refresh(&world));

        world.apply(InputEvent::Occupancy(free_map(WorldPoint::ZERO)));
        assert!(planner.refresh(&world));
        assert_eq!(planner.rebuilds(), 2);
    }

    #[test]
    fn test_next_waypoint_carries_map_origin() {
        let origin = WorldPoint::new(-1.0, -1.0);
        let mut world = WorldState::new();
        world.apply(InputEvent::Occupancy(free_map(origin)));

        let mut planner = WaypointPlanner::default();
        planner.refresh(&world);
        assert!(!planner.queue().is_fallback());

        let (wp, got_origin) = planner.next_waypoint(&world).unwrap();
        assert_eq!(got_origin, origin);
        assert!(wp.accessible);
    }

    #[test]
    fn test_drained_queue_rebuilds() {
        let mut world = WorldState::new();
        world.apply(InputEvent::Occupancy(
            OccupancyGrid::new(10, 10, 0.1, WorldPoint::ZERO, vec![100; 100]).unwrap(),
        ));
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let mut planner = WaypointPlanner::default();
        planner.set_observer(Box::new(Recorder {
            sizes: Rc::clone(&sizes),
        }));

        planner.refresh(&world);
        for _ in 0..4 {
            planner.next_waypoint(&world).unwrap();
        }
        // fifth pop triggers a rebuild back to the four fallbacks
        planner.next_waypoint(&world).unwrap();
        assert_eq!(*sizes.borrow(), vec![4, 4]);
        assert_eq!(planner.queue().len(), 3);
    }
}
