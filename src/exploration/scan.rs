//! In-place rotational scan.
//!
//! The robot turns in fixed angular steps, stopping after each one to let the
//! platform settle before the detection latch is checked. Each rotate command
//! is held for `overshoot_factor` times the nominal time to cover one step,
//! so with the defaults every step physically turns about twice the nominal
//! angle.

use std::f32::consts::PI;
use std::time::Duration;

use crate::error::Result;
use crate::ports::Ports;
use crate::shared::WorldState;
use crate::types::Twist;

/// Scan protocol parameters.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub steps: usize,
    /// Nominal rotation per step (radians).
    pub step_angle: f32,
    /// Commanded yaw rate (rad/s).
    pub angular_speed: f32,
    pub overshoot_factor: f32,
    /// Pause after each stop before checking for a detection.
    pub settle: Duration,
    /// Input pumping interval during holds.
    pub poll_interval: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            steps: 6,
            step_angle: PI / 3.0,
            angular_speed: 2.0,
            overshoot_factor: 2.0,
            settle: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ScanConfig {
    /// How long each rotate command is held.
    pub fn hold_duration(&self) -> Duration {
        let secs = self.overshoot_factor * self.step_angle / self.angular_speed.abs();
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::ZERO)
    }
}

/// Result of one scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanReport {
    pub found: bool,
    pub steps_completed: usize,
}

/// Runs the rotate-hold-stop-settle cycle.
#[derive(Debug)]
pub struct ScanRoutine {
    config: ScanConfig,
    command: Twist,
}

impl ScanRoutine {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            command: Twist::zero(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Current velocity command held by the routine.
    pub fn command(&self) -> &Twist {
        &self.command
    }

    /// Perform the scan. Stops at the first step whose check point finds a
    /// target; the robot is always left with a zero command.
    pub fn run(&mut self, ports: &mut Ports<'_>, world: &mut WorldState) -> Result<ScanReport> {
        let hold = self.config.hold_duration();
        let poll = self.config.poll_interval;
        tracing::info!(
            "Starting scan: {} steps of {:.0}° at {:.1} rad/s (hold {:?})",
            self.config.steps,
            self.config.step_angle.to_degrees(),
            self.config.angular_speed,
            hold
        );

        for step in 1..=self.config.steps {
            self.command = Twist::turn(self.config.angular_speed);
            ports.publish(world, &self.command)?;
            ports.wait(world, hold, poll)?;

            self.command.reset();
            ports.publish(world, &self.command)?;
            ports.wait(world, self.config.settle, poll)?;

            if world.target_found() {
                tracing::info!("Target spotted during scan step {}/{}", step, self.config.steps);
                return Ok(ScanReport {
                    found: true,
                    steps_completed: step,
                });
            }
            tracing::debug!("Scan step {}/{}: nothing found", step, self.config.steps);
        }

        self.command.reset();
        ports.publish(world, &self.command)?;
        tracing::info!("Scan complete, no target");
        Ok(ScanReport {
            found: false,
            steps_completed: self.config.steps,
        })
    }
}

impl Default for ScanRoutine {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}
