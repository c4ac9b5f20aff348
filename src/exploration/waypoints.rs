//! Candidate waypoint lattice.

use crate::types::WorldPoint;

/// A candidate destination in map-frame coordinates (meters from the map
/// origin). Lower score is better.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
    pub accessible: bool,
}

impl Waypoint {
    /// Fallback destination. Always accessible, neutral score.
    pub fn fallback(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            score: 0.0,
            accessible: true,
        }
    }

    pub fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }
}

/// Produces dense lattices of candidate points.
#[derive(Clone, Copy, Debug)]
pub struct GridGenerator {
    step: f32,
}

impl Default for GridGenerator {
    fn default() -> Self {
        Self { step: 0.2 }
    }
}

impl GridGenerator {
    pub fn new(step: f32) -> Self {
        Self { step }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Every lattice point inside `[0, width·res) × [0, height·res)`.
    ///
    /// x-major: for each x, every y. No filtering.
    pub fn from_map(&self, width: usize, height: usize, resolution: f32) -> Vec<WorldPoint> {
        let xs = self.axis(width as f32 * resolution);
        let ys = self.axis(height as f32 * resolution);

        let mut points = Vec::with_capacity(xs.len() * ys.len());
        for &x in &xs {
            for &y in &ys {
                points.push(WorldPoint::new(x, y));
            }
        }
        points
    }

    /// Fixed `n × n` lattice, used before any map has arrived.
    ///
    /// y-major: for each y, every x.
    pub fn synthetic(&self, n: usize) -> Vec<WorldPoint> {
        if !(self.step > 0.0) {
            return Vec::new();
        }
        let mut points = Vec::with_capacity(n * n);
        for j in 0..n {
            for i in 0..n {
                points.push(WorldPoint::new(i as f32 * self.step, j as f32 * self.step));
            }
        }
        points
    }

    // index·step, never accumulated, so long axes do not drift
    fn axis(&self, extent: f32) -> Vec<f32> {
        if !(self.step > 0.0) {
            return Vec::new();
        }
        (0..)
            .map(|i| i as f32 * self.step)
            .take_while(|&v| v < extent)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_map_within_bounds() {
        let generator = GridGenerator::new(0.2);
        let (w, h, res) = (37, 23, 0.05);
        let points = generator.from_map(w, h, res);

        assert!(!points.is_empty());
        for p in &points {
            assert!(p.x >= 0.0 && p.x < w as f32 * res);
            assert!(p.y >= 0.0 && p.y < h as f32 * res);
        }
    }

    #[test]
    fn test_from_map_x_major_order() {
        // 1.0m x 0.6m at step 0.5: x in {0, 0.5}, y in {0, 0.5}
        let points = GridGenerator::new(0.5).from_map(10, 6, 0.1);
        assert_eq!(
            points,
            vec![
                WorldPoint::new(0.0, 0.0),
                WorldPoint::new(0.0, 0.5),
                WorldPoint::new(0.5, 0.0),
                WorldPoint::new(0.5, 0.5),
            ]
        );
    }

    #[test]
    fn test_synthetic_y_major_order() {
        let points = GridGenerator::new(0.2).synthetic(3);
        assert_eq!(points.len(), 9);
        assert_eq!(points[1], WorldPoint::new(0.2, 0.0));
        assert_eq!(points[3], WorldPoint::new(0.0, 0.2));
    }

    #[test]
    fn test_lattice_not_accumulated() {
        let points = GridGenerator::new(0.1).synthetic(100);
        let last = points[points.len() - 1];
        assert_eq!(last.x, 99.0 * 0.1);
    }

    #[test]
    fn test_non_positive_step_is_empty() {
        assert!(GridGenerator::new(0.0).from_map(10, 10, 0.1).is_empty());
        assert!(GridGenerator::new(-0.2).synthetic(10).is_empty());
    }
}
