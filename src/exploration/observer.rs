//! Hooks for watching waypoint rebuilds.
//!
//! Observers sit off the decision path: they see each rebuilt candidate
//! set but cannot influence which waypoint is chosen.

use crate::types::WorldPoint;

use super::waypoints::Waypoint;

/// Snapshot of one rebuild.
#[derive(Clone, Debug)]
pub struct WaypointSet<'a> {
    /// Occupancy revision the set was built from (0 = no map yet).
    pub revision: u64,
    pub origin: WorldPoint,
    /// Every scored candidate, accessible or not.
    pub candidates: &'a [Waypoint],
    /// Head of the rebuilt queue.
    pub selected: Option<Waypoint>,
    pub queue_len: usize,
    pub fallback: bool,
}

impl WaypointSet<'_> {
    pub fn accessible(&self) -> impl Iterator<Item = &Waypoint> {
        self.candidates.iter().filter(|w| w.accessible)
    }

    pub fn inaccessible(&self) -> impl Iterator<Item = &Waypoint> {
        self.candidates.iter().filter(|w| !w.accessible)
    }
}

pub trait WaypointObserver {
    fn on_rebuild(&mut self, set: &WaypointSet<'_>);
}

/// Default observer: one debug line per rebuild.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl WaypointObserver for LoggingObserver {
    fn on_rebuild(&mut self, set: &WaypointSet<'_>) {
        let accessible = set.accessible().count();
        match set.selected {
            Some(head) => tracing::debug!(
                "Waypoints r{}: {} candidates, {} accessible, queue {}{}, head ({:.2}, {:.2}) score {:.1}",
                set.revision,
                set.candidates.len(),
                accessible,
                set.queue_len,
                if set.fallback { " (fallback)" } else { "" },
                head.x,
                head.y,
                head.score
            ),
            None => tracing::debug!(
                "Waypoints r{}: {} candidates, queue empty",
                set.revision,
                set.candidates.len()
            ),
        }
    }
}
