//! Latch for the most recent ball sighting.
//!
//! The detector publishes `(0, 0)` when it sees nothing, so an observation is
//! stored only when both coordinates are non-zero. A real target lying on
//! either axis is therefore dropped as well; this limitation is kept as-is.
//! The latch is never cleared once set.

use crate::types::WorldPoint;

/// What an observation did to the latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatchUpdate {
    /// First position stored.
    Initial,
    /// Replaced a different stored position.
    Updated,
    /// Same position as already stored.
    Unchanged,
    /// Sentinel observation, not stored.
    Ignored,
}

/// Holds the latest target position reported by the detector.
#[derive(Clone, Debug, Default)]
pub struct DetectionLatch {
    position: Option<WorldPoint>,
}

impl DetectionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one detector observation.
    pub fn observe(&mut self, x: f32, y: f32) -> LatchUpdate {
        if x == 0.0 || y == 0.0 {
            tracing::debug!("Ignoring detector observation ({:.2}, {:.2})", x, y);
            return LatchUpdate::Ignored;
        }

        let observed = WorldPoint::new(x, y);
        match self.position {
            None => {
                self.position = Some(observed);
                tracing::info!("Initial target position set: ({:.2}, {:.2})", x, y);
                LatchUpdate::Initial
            }
            Some(current) if current == observed => LatchUpdate::Unchanged,
            Some(current) => {
                self.position = Some(observed);
                tracing::info!(
                    "Target position updated: ({:.2}, {:.2}) -> ({:.2}, {:.2})",
                    current.x,
                    current.y,
                    x,
                    y
                );
                LatchUpdate::Updated
            }
        }
    }

    /// Latest stored target position.
    pub fn position(&self) -> Option<WorldPoint> {
        self.position
    }

    pub fn found(&self) -> bool {
        self.position.is_some()
    }
}
