//! Configuration loading for KhojNav

use std::f32::consts::PI;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{KhojError, Result};
use crate::exploration::{
    MissionConfig, PlannerConfig, ScanConfig, ScoringConfig, SupervisorConfig,
};

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct KhojConfig {
    pub waypoints: WaypointSettings,
    pub scoring: ScoringSettings,
    pub queue: QueueSettings,
    pub supervisor: SupervisorSettings,
    pub scan: ScanSettings,
    pub mission: MissionSettings,
    pub simulation: SimulationSettings,
}

/// Candidate lattice
#[derive(Clone, Debug, Deserialize)]
pub struct WaypointSettings {
    /// Lattice spacing in meters (default: 0.2)
    #[serde(default = "default_step")]
    pub step: f32,

    /// Side of the synthetic lattice used before the first map (default: 100)
    #[serde(default = "default_synthetic_count")]
    pub synthetic_count: usize,
}

/// Accessibility scoring
#[derive(Clone, Debug, Deserialize)]
pub struct ScoringSettings {
    /// Window side in cells (default: 5)
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Mean occupancy at or above which a waypoint is inaccessible (default: 40)
    #[serde(default = "default_occupancy_threshold")]
    pub occupancy_threshold: f32,

    /// Weight of the unseen-area term, 0..1 (default: 0.5)
    #[serde(default = "default_coverage_weight")]
    pub coverage_weight: f32,

    /// Cost of an unknown cell (default: 100)
    #[serde(default = "default_unknown_penalty")]
    pub unknown_penalty: f32,

    /// Occupancy above which a cell is an obstacle (default: 50)
    #[serde(default = "default_obstacle_threshold")]
    pub obstacle_threshold: i8,

    /// Cost of an obstacle cell (default: 1e6)
    #[serde(default = "default_obstacle_penalty")]
    pub obstacle_penalty: f32,
}

/// Waypoint queue
#[derive(Clone, Debug, Deserialize)]
pub struct QueueSettings {
    /// Distance of the fallback waypoints from the map origin (default: 1.5)
    #[serde(default = "default_fallback_offset")]
    pub fallback_offset: f32,
}

/// Goal supervision
#[derive(Clone, Debug, Deserialize)]
pub struct SupervisorSettings {
    /// Travel since the last scan that triggers a new one, meters (default: 3.0)
    #[serde(default = "default_interrupt_distance")]
    pub interrupt_distance: f32,

    /// Monitoring tick in milliseconds (default: 100)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Cancel acknowledgement timeout in milliseconds (default: 10000)
    #[serde(default = "default_cancel_timeout_ms")]
    pub cancel_timeout_ms: u64,

    /// Navigation server readiness timeout in milliseconds (default: 10000)
    #[serde(default = "default_server_timeout_ms")]
    pub server_timeout_ms: u64,

    /// Frame of submitted goals (default: "odom")
    #[serde(default = "default_frame_id")]
    pub frame_id: String,

    /// Cancel the in-flight goal on a sighting (default: true)
    #[serde(default = "default_cancel_on_sighting")]
    pub cancel_on_sighting: bool,
}

/// Rotational scan
#[derive(Clone, Debug, Deserialize)]
pub struct ScanSettings {
    /// Number of steps (default: 6)
    #[serde(default = "default_scan_steps")]
    pub steps: usize,

    /// Nominal rotation per step in degrees (default: 60)
    #[serde(default = "default_step_angle_deg")]
    pub step_angle_deg: f32,

    /// Yaw rate in rad/s (default: 2.0)
    #[serde(default = "default_angular_speed")]
    pub angular_speed: f32,

    /// Hold multiplier on the nominal rotate time (default: 2.0)
    #[serde(default = "default_overshoot_factor")]
    pub overshoot_factor: f32,

    /// Pause after each step in milliseconds (default: 1000)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Mission loop
#[derive(Clone, Debug, Deserialize)]
pub struct MissionSettings {
    /// Scan after every exploration goal while nothing is found (default: true)
    #[serde(default = "default_scan_after_goal")]
    pub scan_after_goal: bool,

    /// Optional cap on submitted goals (default: unlimited)
    #[serde(default)]
    pub max_goals: Option<u32>,
}

/// Axis-aligned obstacle in the simulated room (world meters).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ObstacleBlock {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

/// Simulated robot and room
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationSettings {
    /// Room width in meters (default: 6.0)
    #[serde(default = "default_room_width")]
    pub room_width: f32,

    /// Room height in meters (default: 5.0)
    #[serde(default = "default_room_height")]
    pub room_height: f32,

    /// Map resolution in meters per cell (default: 0.05)
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// World position of the room's lower-left corner (default: -1.0, -1.0)
    #[serde(default = "default_origin")]
    pub origin_x: f32,
    #[serde(default = "default_origin")]
    pub origin_y: f32,

    /// Interior obstacles
    #[serde(default = "default_obstacles")]
    pub obstacles: Vec<ObstacleBlock>,

    /// Ball position (default: 3.5, 2.5)
    #[serde(default = "default_ball_x")]
    pub ball_x: f32,
    #[serde(default = "default_ball_y")]
    pub ball_y: f32,

    /// Start pose (default: origin, facing +x)
    #[serde(default)]
    pub start_x: f32,
    #[serde(default)]
    pub start_y: f32,
    #[serde(default)]
    pub start_theta: f32,

    /// Drive speed toward goals in m/s (default: 0.3)
    #[serde(default = "default_linear_speed")]
    pub linear_speed: f32,

    /// Range-sensor reveal radius in meters (default: 2.5)
    #[serde(default = "default_sensor_range")]
    pub sensor_range: f32,

    /// Camera range in meters (default: 2.0)
    #[serde(default = "default_camera_range")]
    pub camera_range: f32,

    /// Camera field of view in degrees (default: 120)
    #[serde(default = "default_camera_fov_deg")]
    pub camera_fov_deg: f32,

    /// Arrival tolerance in meters (default: 0.1)
    #[serde(default = "default_goal_tolerance")]
    pub goal_tolerance: f32,
}

impl Default for WaypointSettings {
    fn default() -> Self {
        Self {
            step: default_step(),
            synthetic_count: default_synthetic_count(),
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            occupancy_threshold: default_occupancy_threshold(),
            coverage_weight: default_coverage_weight(),
            unknown_penalty: default_unknown_penalty(),
            obstacle_threshold: default_obstacle_threshold(),
            obstacle_penalty: default_obstacle_penalty(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            fallback_offset: default_fallback_offset(),
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            interrupt_distance: default_interrupt_distance(),
            poll_interval_ms: default_poll_interval_ms(),
            cancel_timeout_ms: default_cancel_timeout_ms(),
            server_timeout_ms: default_server_timeout_ms(),
            frame_id: default_frame_id(),
            cancel_on_sighting: default_cancel_on_sighting(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            steps: default_scan_steps(),
            step_angle_deg: default_step_angle_deg(),
            angular_speed: default_angular_speed(),
            overshoot_factor: default_overshoot_factor(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            scan_after_goal: default_scan_after_goal(),
            max_goals: None,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            room_width: default_room_width(),
            room_height: default_room_height(),
            resolution: default_resolution(),
            origin_x: default_origin(),
            origin_y: default_origin(),
            obstacles: default_obstacles(),
            ball_x: default_ball_x(),
            ball_y: default_ball_y(),
            start_x: 0.0,
            start_y: 0.0,
            start_theta: 0.0,
            linear_speed: default_linear_speed(),
            sensor_range: default_sensor_range(),
            camera_range: default_camera_range(),
            camera_fov_deg: default_camera_fov_deg(),
            goal_tolerance: default_goal_tolerance(),
        }
    }
}

// Default value functions
fn default_step() -> f32 {
    0.2
}
fn default_synthetic_count() -> usize {
    100
}
fn default_window_size() -> usize {
    5
}
fn default_occupancy_threshold() -> f32 {
    40.0
}
fn default_coverage_weight() -> f32 {
    0.5
}
fn default_unknown_penalty() -> f32 {
    100.0
}
fn default_obstacle_threshold() -> i8 {
    50
}
fn default_obstacle_penalty() -> f32 {
    1.0e6
}
fn default_fallback_offset() -> f32 {
    1.5
}
fn default_interrupt_distance() -> f32 {
    3.0
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_cancel_timeout_ms() -> u64 {
    10_000
}
fn default_server_timeout_ms() -> u64 {
    10_000
}
fn default_frame_id() -> String {
    "odom".to_string()
}
fn default_cancel_on_sighting() -> bool {
    true
}
fn default_scan_steps() -> usize {
    6
}
fn default_step_angle_deg() -> f32 {
    60.0
}
fn default_angular_speed() -> f32 {
    2.0
}
fn default_overshoot_factor() -> f32 {
    2.0
}
fn default_settle_ms() -> u64 {
    1000
}
fn default_scan_after_goal() -> bool {
    true
}

// Simulation defaults
fn default_room_width() -> f32 {
    6.0
}
fn default_room_height() -> f32 {
    5.0
}
fn default_resolution() -> f32 {
    0.05
}
fn default_origin() -> f32 {
    -1.0
}
fn default_obstacles() -> Vec<ObstacleBlock> {
    vec![ObstacleBlock {
        min_x: 1.6,
        min_y: 0.6,
        max_x: 2.2,
        max_y: 1.4,
    }]
}
fn default_ball_x() -> f32 {
    3.5
}
fn default_ball_y() -> f32 {
    2.5
}
fn default_linear_speed() -> f32 {
    0.3
}
fn default_sensor_range() -> f32 {
    2.5
}
fn default_camera_range() -> f32 {
    2.0
}
fn default_camera_fov_deg() -> f32 {
    120.0
}
fn default_goal_tolerance() -> f32 {
    0.1
}

impl KhojConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KhojError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: KhojConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: &str) -> Result<()> {
            if ok { Ok(()) } else { Err(KhojError::Config(msg.to_string())) }
        }

        check(self.waypoints.step > 0.0, "waypoints.step must be positive")?;
        check(self.scoring.window_size > 0, "scoring.window_size must be at least 1")?;
        check(
            (0.0..=1.0).contains(&self.scoring.coverage_weight),
            "scoring.coverage_weight must be within [0, 1]",
        )?;
        check(
            self.supervisor.interrupt_distance > 0.0,
            "supervisor.interrupt_distance must be positive",
        )?;
        check(self.scan.steps > 0, "scan.steps must be at least 1")?;
        check(self.scan.angular_speed > 0.0, "scan.angular_speed must be positive")?;
        check(self.scan.overshoot_factor > 0.0, "scan.overshoot_factor must be positive")?;

        let sim = &self.simulation;
        check(sim.resolution > 0.0, "simulation.resolution must be positive")?;
        check(
            sim.room_width > 2.0 * sim.resolution && sim.room_height > 2.0 * sim.resolution,
            "simulation room must be larger than its walls",
        )?;
        check(sim.linear_speed > 0.0, "simulation.linear_speed must be positive")?;
        check(
            sim.camera_fov_deg > 0.0 && sim.camera_fov_deg <= 360.0,
            "simulation.camera_fov_deg must be within (0, 360]",
        )?;
        for block in &sim.obstacles {
            check(
                block.min_x <= block.max_x && block.min_y <= block.max_y,
                "simulation obstacle has inverted bounds",
            )?;
        }
        Ok(())
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            step: self.waypoints.step,
            synthetic_count: self.waypoints.synthetic_count,
            scoring: ScoringConfig {
                window_size: self.scoring.window_size,
                occupancy_threshold: self.scoring.occupancy_threshold,
                coverage_weight: self.scoring.coverage_weight,
                unknown_penalty: self.scoring.unknown_penalty,
                obstacle_threshold: self.scoring.obstacle_threshold,
                obstacle_penalty: self.scoring.obstacle_penalty,
            },
            fallback_offset: self.queue.fallback_offset,
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            interrupt_distance: self.supervisor.interrupt_distance,
            poll_interval: Duration::from_millis(self.supervisor.poll_interval_ms),
            cancel_timeout: Duration::from_millis(self.supervisor.cancel_timeout_ms),
            frame_id: self.supervisor.frame_id.clone(),
            cancel_on_sighting: self.supervisor.cancel_on_sighting,
        }
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            steps: self.scan.steps,
            step_angle: self.scan.step_angle_deg * PI / 180.0,
            angular_speed: self.scan.angular_speed,
            overshoot_factor: self.scan.overshoot_factor,
            settle: Duration::from_millis(self.scan.settle_ms),
            poll_interval: Duration::from_millis(self.supervisor.poll_interval_ms),
        }
    }

    pub fn mission_config(&self) -> MissionConfig {
        MissionConfig {
            scan_after_goal: self.mission.scan_after_goal,
            max_goals: self.mission.max_goals,
            server_timeout: Duration::from_millis(self.supervisor.server_timeout_ms),
            poll_interval: Duration::from_millis(self.supervisor.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = KhojConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scoring.window_size, 5);
        assert_eq!(config.supervisor.frame_id, "odom");
        assert_eq!(config.mission.max_goals, None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = KhojConfig::from_toml("").unwrap();
        assert_relative_eq!(config.waypoints.step, 0.2);
        assert_eq!(config.scan.steps, 6);
        assert_eq!(config.simulation.obstacles.len(), 1);
    }

    #[test]
    fn test_partial_section_override() {
        let config = KhojConfig::from_toml(
            r#"
            [scoring]
            coverage_weight = 0.25

            [mission]
            max_goals = 12
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.scoring.coverage_weight, 0.25);
        assert_relative_eq!(config.scoring.occupancy_threshold, 40.0);
        assert_eq!(config.mission.max_goals, Some(12));
    }

    #[test]
    fn test_scan_config_conversion() {
        let scan = KhojConfig::default().scan_config();
        assert_relative_eq!(scan.step_angle, PI / 3.0, epsilon = 1e-6);
        assert_eq!(scan.settle, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for toml in [
            "[waypoints]\nstep = 0.0",
            "[scoring]\nwindow_size = 0",
            "[scoring]\ncoverage_weight = 1.5",
            "[scan]\nsteps = 0",
        ] {
            assert!(
                matches!(KhojConfig::from_toml(toml), Err(KhojError::Config(_))),
                "accepted: {}",
                toml
            );
        }
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            KhojConfig::from_toml("[scoring\nwindow_size = 5"),
            Err(KhojError::Config(_))
        ));
    }
}
