//! Occupancy and visual-coverage grid snapshots.
//!
//! Both grids share the ROS `nav_msgs/OccupancyGrid` layout: row-major,
//! row = y cell, column = x cell, cell (0, 0) sits at `origin`.
//! Snapshots are immutable once built and replaced wholesale on update.

use crate::error::{KhojError, Result};
use crate::types::WorldPoint;

/// Occupancy value for a cell the mapper has never observed.
pub const UNKNOWN: i8 = -1;

/// Occupancy grid snapshot from the mapping service.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    resolution: f32,
    origin: WorldPoint,
    cells: Vec<i8>,
}

impl OccupancyGrid {
    /// Build a snapshot, validating that `cells` covers `width * height`.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f32,
        origin: WorldPoint,
        cells: Vec<i8>,
    ) -> Result<Self> {
        validate_shape(width, height, resolution, cells.len())?;
        if let Some(bad) = cells.iter().find(|&&v| v < UNKNOWN || v > 100) {
            return Err(KhojError::InvalidMap(format!(
                "occupancy value {} outside -1..=100",
                bad
            )));
        }
        Ok(Self {
            width,
            height,
            resolution,
            origin,
            cells,
        })
    }

    /// Grid with every cell unknown.
    pub fn unknown(width: usize, height: usize, resolution: f32, origin: WorldPoint) -> Result<Self> {
        Self::new(width, height, resolution, origin, vec![UNKNOWN; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Meters per cell.
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// World position of cell (0, 0).
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Cell value at (row, col), or `None` outside the grid.
    #[inline]
    pub fn get(&self, row: isize, col: isize) -> Option<i8> {
        cell_index(self.width, self.height, row, col).map(|i| self.cells[i])
    }
}

/// Visual coverage snapshot. 0.0 = never seen, 1.0 = fully seen.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageGrid {
    width: usize,
    height: usize,
    resolution: f32,
    origin: WorldPoint,
    cells: Vec<f32>,
}

impl CoverageGrid {
    /// Build a snapshot. Values are clamped into [0, 1]; NaN is rejected.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f32,
        origin: WorldPoint,
        cells: Vec<f32>,
    ) -> Result<Self> {
        validate_shape(width, height, resolution, cells.len())?;
        if cells.iter().any(|v| v.is_nan()) {
            return Err(KhojError::InvalidMap("coverage value is NaN".into()));
        }
        Ok(Self {
            width,
            height,
            resolution,
            origin,
            cells: cells.into_iter().map(|v| v.clamp(0.0, 1.0)).collect(),
        })
    }

    /// Coverage grid where nothing has been seen yet.
    pub fn unseen(width: usize, height: usize, resolution: f32, origin: WorldPoint) -> Result<Self> {
        Self::new(width, height, resolution, origin, vec![0.0; width * height])
    }

    /// Decode a coverage map published as an occupancy-style message
    /// (percent seen, `-1` for never observed).
    pub fn from_percent(
        width: usize,
        height: usize,
        resolution: f32,
        origin: WorldPoint,
        percent: &[i8],
    ) -> Result<Self> {
        let cells = percent
            .iter()
            .map(|&p| if p < 0 { 0.0 } else { p as f32 / 100.0 })
            .collect();
        Self::new(width, height, resolution, origin, cells)
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

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Coverage at (row, col), or `None` outside the grid.
    #[inline]
    pub fn get(&self, row: isize, col: isize) -> Option<f32> {
        cell_index(self.width, self.height, row, col).map(|i| self.cells[i])
    }
}

fn validate_shape(width: usize, height: usize, resolution: f32, len: usize) -> Result<()> {
    if !(resolution > 0.0) {
        return Err(KhojError::InvalidMap(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }
    if len != width * height {
        return Err(KhojError::InvalidMap(format!(
            "expected {}x{} = {} cells, got {}",
            width,
            height,
            width * height,
            len
        )));
    }
    Ok(())
}

#[inline]
fn cell_index(width: usize, height: usize, row: isize, col: isize) -> Option<usize> {
    if row < 0 || col < 0 {
        return None;
    }
    let (row, col) = (row as usize, col as usize);
    if row >= height || col >= width {
        return None;
    }
    Some(row * width + col)
}
