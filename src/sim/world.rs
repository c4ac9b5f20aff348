//! Ground-truth room for the simulator.

use crate::config::SimulationSettings;
use crate::error::{KhojError, Result};
use crate::types::WorldPoint;

/// Rectangular room with walls on every border cell, interior obstacle
/// blocks and a ball.
#[derive(Clone, Debug)]
pub struct SimWorld {
    width: usize,
    height: usize,
    resolution: f32,
    origin: WorldPoint,
    occupied: Vec<bool>,
    ball: WorldPoint,
}

impl SimWorld {
    pub fn new(settings: &SimulationSettings) -> Result<Self> {
        let resolution = settings.resolution;
        if !(resolution > 0.0) {
            return Err(KhojError::Config(
                "simulation.resolution must be positive".into(),
            ));
        }
        let width = (settings.room_width / resolution).round() as usize;
        let height = (settings.room_height / resolution).round() as usize;
        if width < 3 || height < 3 {
            return Err(KhojError::Config(format!(
                "simulated room of {}x{} cells is too small",
                width, height
            )));
        }

        let mut world = Self {
            width,
            height,
            resolution,
            origin: WorldPoint::new(settings.origin_x, settings.origin_y),
            occupied: vec![false; width * height],
            ball: WorldPoint::new(settings.ball_x, settings.ball_y),
        };

        for row in 0..height {
            for col in 0..width {
                let border = row == 0 || col == 0 || row == height - 1 || col == width - 1;
                let center = world.cell_center(row, col);
                let inside_block = settings.obstacles.iter().any(|b| {
                    center.x >= b.min_x
                        && center.x <= b.max_x
                        && center.y >= b.min_y
                        && center.y <= b.max_y
                });
                world.occupied[row * width + col] = border || inside_block;
            }
        }
        Ok(world)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    pub fn ball(&self) -> WorldPoint {
        self.ball
    }

    /// (row, col) of the cell containing `p`.
    pub fn cell_of(&self, p: WorldPoint) -> Option<(usize, usize)> {
        let col = ((p.x - self.origin.x) / self.resolution).floor();
        let row = ((p.y - self.origin.y) / self.resolution).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.height && col < self.width).then_some((row, col))
    }

    pub fn cell_center(&self, row: usize, col: usize) -> WorldPoint {
        WorldPoint::new(
            self.origin.x + (col as f32 + 0.5) * self.resolution,
            self.origin.y + (row as f32 + 0.5) * self.resolution,
        )
    }

    #[inline]
    pub fn is_occupied_cell(&self, row: usize, col: usize) -> bool {
        self.occupied[row * self.width + col]
    }

    /// Outside the room counts as occupied.
    pub fn is_occupied(&self, p: WorldPoint) -> bool {
        match self.cell_of(p) {
            Some((row, col)) => self.is_occupied_cell(row, col),
            None => true,
        }
    }

    /// Whether a straight drive from `a` to `b` stays in free cells.
    pub fn segment_clear(&self, a: WorldPoint, b: WorldPoint) -> bool {
        let length = a.distance(&b);
        let samples = ((length / (self.resolution * 0.5)).ceil() as usize).max(1);
        (0..=samples).all(|i| {
            let t = i as f32 / samples as f32;
            let p = WorldPoint::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
            !self.is_occupied(p)
        })
    }
}
