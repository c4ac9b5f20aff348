//! World state owned by the control thread.
//!
//! Map snapshots, the pose history, the detection latch and the last
//! velocity command all live here. Input sources turn transport messages
//! into [`InputEvent`]s; `apply` is the only way state changes.

use std::collections::VecDeque;

use crate::detection::DetectionLatch;
use crate::map::{CoverageGrid, OccupancyGrid};
use crate::types::{Pose, Twist, WorldPoint};

/// Poses kept in the rolling history.
pub const POSE_HISTORY_LEN: usize = 10;

/// Bounded rolling buffer of pose observations. Newest wins.
#[derive(Clone, Debug)]
pub struct PoseHistory {
    poses: VecDeque<Pose>,
    capacity: usize,
}

impl PoseHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            poses: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, pose: Pose) {
        if self.poses.len() == self.capacity {
            self.poses.pop_front();
        }
        self.poses.push_back(pose);
    }

    pub fn latest(&self) -> Option<Pose> {
        self.poses.back().copied()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Pose> {
        self.poses.iter()
    }
}

impl Default for PoseHistory {
    fn default() -> Self {
        Self::new(POSE_HISTORY_LEN)
    }
}

/// One update from an input source.
#[derive(Clone, Debug)]
pub enum InputEvent {
    Occupancy(OccupancyGrid),
    Coverage(CoverageGrid),
    Pose(Pose),
    /// Raw detector output; `(0, 0)` means nothing seen.
    Detection { x: f32, y: f32 },
}

/// Everything the controller knows about the world.
#[derive(Debug, Default)]
pub struct WorldState {
    occupancy: Option<OccupancyGrid>,
    occupancy_revision: u64,
    coverage: Option<CoverageGrid>,
    poses: PoseHistory,
    detection: DetectionLatch,
    last_command: Twist,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Occupancy(grid) => {
                self.occupancy_revision += 1;
                tracing::debug!(
                    "Occupancy update r{}: {}x{} @ {:.3}m",
                    self.occupancy_revision,
                    grid.width(),
                    grid.height(),
                    grid.resolution()
                );
                self.occupancy = Some(grid);
            }
            InputEvent::Coverage(grid) => {
                self.coverage = Some(grid);
            }
            InputEvent::Pose(pose) => self.poses.push(pose),
            InputEvent::Detection { x, y } => {
                self.detection.observe(x, y);
            }
        }
    }

    pub fn occupancy(&self) -> Option<&OccupancyGrid> {
        self.occupancy.as_ref()
    }

    /// Incremented on every occupancy update; 0 before the first one.
    pub fn occupancy_revision(&self) -> u64 {
        self.occupancy_revision
    }

    pub fn coverage(&self) -> Option<&CoverageGrid> {
        self.coverage.as_ref()
    }

    /// Latest robot pose, if any has been received.
    pub fn pose(&self) -> Option<Pose> {
        self.poses.latest()
    }

    pub fn pose_history(&self) -> &PoseHistory {
        &self.poses
    }

    pub fn detection(&self) -> &DetectionLatch {
        &self.detection
    }

    pub fn target(&self) -> Option<WorldPoint> {
        self.detection.position()
    }

    pub fn target_found(&self) -> bool {
        self.detection.found()
    }

    pub fn last_command(&self) -> Twist {
        self.last_command
    }

    pub(crate) fn record_command(&mut self, command: Twist) {
        self.last_command = command;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_history_bounded() {
        let mut history = PoseHistory::default();
        for i in 0..25 {
            history.push(Pose::new(i as f32, 0.0, 0.0));
        }
        assert_eq!(history.len(), POSE_HISTORY_LEN);
        assert_eq!(history.latest(), Some(Pose::new(24.0, 0.0, 0.0)));
        assert_eq!(history.iter().next(), Some(&Pose::new(15.0, 0.0, 0.0)));
    }

    #[test]
    fn test_occupancy_revision_counts_updates() {
        let mut world = WorldState::new();
        assert_eq!(world.occupancy_revision(), 0);
        assert!(world.occupancy().is_none());

        let grid = OccupancyGrid::unknown(4, 4, 0.1, WorldPoint::ZERO).unwrap();
        world.apply(InputEvent::Occupancy(grid.clone()));
        world.apply(InputEvent::Occupancy(grid));
        assert_eq!(world.occupancy_revision(), 2);

        // Coverage does not bump the revision
        let cov = CoverageGrid::unseen(4, 4, 0.1, WorldPoint::ZERO).unwrap();
        world.apply(InputEvent::Coverage(cov));
        assert_eq!(world.occupancy_revision(), 2);
        assert!(world.coverage().is_some());
    }

    #[test]
    fn test_detection_flows_into_latch() {
        let mut world = WorldState::new();
        world.apply(InputEvent::Detection { x: 0.0, y: 0.0 });
        assert!(!world.target_found());

        world.apply(InputEvent::Detection { x: 1.0, y: -2.0 });
        assert!(world.target_found());
        assert_eq!(world.target(), Some(WorldPoint::new(1.0, -2.0)));
    }

    #[test]
    fn test_pose_latest_wins() {
        let mut world = WorldState::new();
        assert_eq!(world.pose(), None);
        world.apply(InputEvent::Pose(Pose::new(1.0, 1.0, 0.0)));
        world.apply(InputEvent::Pose(Pose::new(2.0, 3.0, 0.0)));
        assert_eq!(world.pose(), Some(Pose::new(2.0, 3.0, 0.0)));
    }
}
