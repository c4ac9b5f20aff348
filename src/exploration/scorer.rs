//! Accessibility scoring of candidate waypoints.
//!
//! A square window around the candidate's cell is averaged over both grids.
//! Unknown cells carry a fixed penalty and any obstacle cell carries a
//! penalty large enough to veto the window on its own. Among accessible
//! candidates, the score blends occupancy with how little of the area the
//! camera has seen.

use crate::map::{CoverageGrid, OccupancyGrid, UNKNOWN};
use crate::types::WorldPoint;

use super::waypoints::Waypoint;

/// Scoring parameters.
#[derive(Clone, Debug)]
pub struct ScoringConfig {
    /// Side length of the inspected window (cells).
    pub window_size: usize,
    /// Accessible iff the window's mean occupancy is below this.
    pub occupancy_threshold: f32,
    /// Weight of the unseen-area term, in [0, 1].
    pub coverage_weight: f32,
    /// Contribution of an unknown cell.
    pub unknown_penalty: f32,
    /// Cells strictly above this are obstacles.
    pub obstacle_threshold: i8,
    /// Contribution of an obstacle cell.
    pub obstacle_penalty: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            occupancy_threshold: 40.0,
            coverage_weight: 0.5,
            unknown_penalty: 100.0,
            obstacle_threshold: 50,
            obstacle_penalty: 1.0e6,
        }
    }
}

/// Classifies and ranks candidate waypoints.
#[derive(Clone, Debug, Default)]
pub struct AccessibilityScorer {
    config: ScoringConfig,
}

impl AccessibilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one candidate (map-frame meters).
    ///
    /// Returns `None` when the window leaves either grid; the candidate is
    /// then dropped rather than treated as an error. Without a coverage
    /// snapshot every cell counts as unseen.
    pub fn score(
        &self,
        point: WorldPoint,
        occupancy: &OccupancyGrid,
        coverage: Option<&CoverageGrid>,
    ) -> Option<Waypoint> {
        let size = self.config.window_size;
        if size == 0 || point.x < 0.0 || point.y < 0.0 {
            return None;
        }

        let col = to_cell(point.x, occupancy.resolution());
        let row = to_cell(point.y, occupancy.resolution());
        let start_row = row - (size / 2) as isize;
        let start_col = col - (size / 2) as isize;

        let mut occ_sum = 0.0f64;
        let mut unseen_sum = 0.0f64;
        for dr in 0..size as isize {
            for dc in 0..size as isize {
                let (r, c) = (start_row + dr, start_col + dc);

                let occ = occupancy.get(r, c)?;
                occ_sum += self.occupancy_cost(occ) as f64;

                let seen = match coverage {
                    Some(cov) => cov.get(r, c)?,
                    None => 0.0,
                };
                unseen_sum += (1.0 - seen) as f64;
            }
        }

        let area = (size * size) as f64;
        let occ_avg = (occ_sum / area) as f32;
        let coverage_avg = (unseen_sum / area) as f32;

        let accessible = occ_avg < self.config.occupancy_threshold;
        let score = if accessible {
            let w = self.config.coverage_weight;
            (1.0 - w) * occ_avg + w * (100.0 * coverage_avg)
        } else {
            f32::INFINITY
        };

        Some(Waypoint {
            x: point.x,
            y: point.y,
            score,
            accessible,
        })
    }

    /// Score every candidate, dropping the ones whose window leaves the grids.
    pub fn score_all(
        &self,
        points: &[WorldPoint],
        occupancy: &OccupancyGrid,
        coverage: Option<&CoverageGrid>,
    ) -> Vec<Waypoint> {
        points
            .iter()
            .filter_map(|&p| self.score(p, occupancy, coverage))
            .collect()
    }

    #[inline]
    fn occupancy_cost(&self, value: i8) -> f32 {
        if value == UNKNOWN {
            self.config.unknown_penalty
        } else if value > self.config.obstacle_threshold {
            self.config.obstacle_penalty
        } else {
            value as f32
        }
    }
}

// Truncating conversion; the epsilon keeps lattice points that sit exactly on
// a cell boundary (0.2 / 0.05) from falling into the previous cell.
#[inline]
fn to_cell(meters: f32, resolution: f32) -> isize {
    (meters / resolution + 1e-4).floor() as isize
}
