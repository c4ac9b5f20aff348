//! Goal supervision.
//!
//! Drives a single navigation goal to completion while watching for two
//! things: a target sighting, which ends exploration of this goal early, and
//! travel of more than `interrupt_distance` since the last scan, which
//! cancels the goal, runs a scan and resubmits the same target.
//!
//! ```text
//! Idle ─► GoalSent ─┬─► Monitoring ─┬─► Completed
//!                   │       ▲       ├─► Failed
//!                   │       │       └─► Interrupting ─► Scanning ─► Resuming
//!                   │       └──────────────────────────────────────────┤
//!                   └─► Rejected ◄──────────────────────────────────────┘
//! ```

use std::time::Duration;

use crate::error::{KhojError, Result};
use crate::ports::{CancelAck, GoalHandle, GoalResponse, GoalStatus, NavigationGoal, Ports};
use crate::shared::WorldState;
use crate::types::{Pose, WorldPoint};

use super::scan::{ScanReport, ScanRoutine};
use super::waypoints::Waypoint;

/// Supervisor configuration.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Travel since the last scan that triggers a new one (meters).
    pub interrupt_distance: f32,
    pub poll_interval: Duration,
    /// How long to wait for a cancel acknowledgement.
    pub cancel_timeout: Duration,
    pub frame_id: String,
    /// Cancel the in-flight goal when a target is sighted mid-goal.
    pub cancel_on_sighting: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interrupt_distance: 3.0,
            poll_interval: Duration::from_millis(100),
            cancel_timeout: Duration::from_secs(10),
            frame_id: "odom".to_string(),
            cancel_on_sighting: true,
        }
    }
}

/// Supervisor state-machine phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorPhase {
    Idle,
    GoalSent,
    Monitoring,
    Interrupting,
    Scanning,
    Resuming,
    Completed,
    Failed,
    Rejected,
}

/// How a supervised goal ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalOutcome {
    /// Navigation reported success.
    Reached,
    /// A target was sighted before the goal finished.
    TargetSighted,
    /// Navigation ended without success.
    Failed(GoalStatus),
    /// The navigation service refused the goal.
    Rejected,
    /// Shutdown was requested.
    Aborted,
}

/// Summary of one supervised goal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoalReport {
    pub outcome: GoalOutcome,
    pub target: WorldPoint,
    pub interrupts: u32,
    pub scans: u32,
}

/// Whether the goal is part of exploration, a direct approach to a known
/// target, or a detour taken after an approach failed. Only exploration
/// goals watch for sightings and get interrupted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GoalKind {
    Explore,
    Approach,
    Detour,
}

/// Supervises one navigation goal at a time.
#[derive(Debug)]
pub struct GoalSupervisor {
    config: SupervisorConfig,
    scan: ScanRoutine,
    phase: SupervisorPhase,
    goal: Option<NavigationGoal>,
    last_interrupt_pose: Option<Pose>,
}

impl GoalSupervisor {
    pub fn new(config: SupervisorConfig, scan: ScanRoutine) -> Self {
        Self {
            config,
            scan,
            phase: SupervisorPhase::Idle,
            goal: None,
            last_interrupt_pose: None,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.phase
    }

    /// Most recent goal submitted, with its last known status.
    pub fn goal(&self) -> Option<&NavigationGoal> {
        self.goal.as_ref()
    }

    pub fn last_interrupt_pose(&self) -> Option<Pose> {
        self.last_interrupt_pose
    }

    /// Explore towards a map-frame waypoint. The map origin is added to get
    /// the world-frame target.
    pub fn pursue(
        &mut self,
        waypoint: &Waypoint,
        origin: WorldPoint,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<GoalReport> {
        let target = waypoint.position() + origin;
        tracing::info!(
            "Exploring waypoint ({:.2}, {:.2}) score {:.1} -> world ({:.2}, {:.2})",
            waypoint.x,
            waypoint.y,
            waypoint.score,
            target.x,
            target.y
        );
        self.supervise(target, GoalKind::Explore, ports, world)
    }

    /// Move to a waypoint while a target is already known, to get a new
    /// vantage point after an approach failed. The known target does not
    /// end the goal early.
    pub fn detour(
        &mut self,
        waypoint: &Waypoint,
        origin: WorldPoint,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<GoalReport> {
        let target = waypoint.position() + origin;
        tracing::info!(
            "Detouring via waypoint ({:.2}, {:.2}) -> world ({:.2}, {:.2})",
            waypoint.x,
            waypoint.y,
            target.x,
            target.y
        );
        self.supervise(target, GoalKind::Detour, ports, world)
    }

    /// Drive straight to a known target position, without interrupts.
    pub fn drive_to(
        &mut self,
        target: WorldPoint,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<GoalReport> {
        tracing::info!("Driving to target at ({:.2}, {:.2})", target.x, target.y);
        self.supervise(target, GoalKind::Approach, ports, world)
    }

    /// Run the scan routine outside of any goal.
    pub fn scan(&mut self, ports: &mut Ports<'_>, world: &mut WorldState) -> Result<ScanReport> {
        self.phase = SupervisorPhase::Scanning;
        let report = self.scan.run(ports, world)?;
        self.last_interrupt_pose = world.pose().or(self.last_interrupt_pose);
        self.phase = SupervisorPhase::Idle;
        Ok(report)
    }

    fn supervise(
        &mut self,
        target: WorldPoint,
        kind: GoalKind,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<GoalReport> {
        let mut report = GoalReport {
            outcome: GoalOutcome::Rejected,
            target,
            interrupts: 0,
            scans: 0,
        };
        self.phase = SupervisorPhase::Idle;
        self.goal = None;

        if kind == GoalKind::Explore && world.target_found() {
            tracing::info!("Target already known, not submitting exploration goal");
            self.phase = SupervisorPhase::Completed;
            report.outcome = GoalOutcome::TargetSighted;
            return Ok(report);
        }

        self.last_interrupt_pose = world.pose();
        let goal = NavigationGoal::new(target, self.config.frame_id.as_str());
        let Some(mut handle) = self.submit(goal, ports)? else {
            tracing::warn!("Goal ({:.2}, {:.2}) rejected", target.x, target.y);
            self.phase = SupervisorPhase::Rejected;
            return Ok(report);
        };
        self.phase = SupervisorPhase::Monitoring;

        loop {
            ports.pump(world)?;

            if ports.shutdown_requested() {
                tracing::info!("Shutdown requested, abandoning goal {}", handle);
                self.cancel_best_effort(handle, ports, world)?;
                self.phase = SupervisorPhase::Failed;
                report.outcome = GoalOutcome::Aborted;
                return Ok(report);
            }

            if kind == GoalKind::Explore && world.target_found() {
                tracing::info!("Target sighted while monitoring goal {}", handle);
                if self.config.cancel_on_sighting {
                    self.cancel_best_effort(handle, ports, world)?;
                }
                self.phase = SupervisorPhase::Completed;
                report.outcome = GoalOutcome::TargetSighted;
                return Ok(report);
            }

            match ports.navigation.poll_result(handle)? {
                Some(GoalStatus::Succeeded) => {
                    tracing::info!("Goal {} reached ({:.2}, {:.2})", handle, target.x, target.y);
                    self.set_status(GoalStatus::Succeeded);
                    self.phase = SupervisorPhase::Completed;
                    report.outcome = GoalOutcome::Reached;
                    return Ok(report);
                }
                Some(status) if status.is_terminal() => {
                    tracing::warn!("Goal {} ended with {:?}", handle, status);
                    self.set_status(status);
                    self.phase = SupervisorPhase::Failed;
                    report.outcome = GoalOutcome::Failed(status);
                    return Ok(report);
                }
                _ => {}
            }

            if kind == GoalKind::Explore {
                match world.pose() {
                    None => tracing::debug!("No pose yet, skipping distance check"),
                    Some(pose) => {
                        let anchor = *self.last_interrupt_pose.get_or_insert(pose);
                        let travelled = pose.planar_distance(&anchor);
                        if travelled >= self.config.interrupt_distance {
                            report.interrupts += 1;
                            tracing::info!(
                                "Travelled {:.2}m since last scan, interrupting goal {}",
                                travelled,
                                handle
                            );

                            self.phase = SupervisorPhase::Interrupting;
                            self.cancel_and_confirm(handle, ports, world)?;

                            self.phase = SupervisorPhase::Scanning;
                            let scan = self.scan.run(ports, world)?;
                            report.scans += 1;
                            self.last_interrupt_pose = world.pose().or(Some(pose));

                            if scan.found {
                                self.phase = SupervisorPhase::Completed;
                                report.outcome = GoalOutcome::TargetSighted;
                                return Ok(report);
                            }

                            self.phase = SupervisorPhase::Resuming;
                            let goal = match self.goal.as_ref() {
                                Some(previous) => previous.resubmission(),
                                None => NavigationGoal::new(target, self.config.frame_id.as_str()),
                            };
                            match self.submit(goal, ports)? {
                                Some(next) => {
                                    tracing::info!("Resumed goal as {}", next);
                                    handle = next;
                                    self.phase = SupervisorPhase::Monitoring;
                                }
                                None => {
                                    tracing::error!(
                                        "Resubmitted goal ({:.2}, {:.2}) rejected",
                                        target.x,
                                        target.y
                                    );
                                    self.phase = SupervisorPhase::Rejected;
                                    report.outcome = GoalOutcome::Rejected;
                                    return Ok(report);
                                }
                            }
                        }
                    }
                }
            }

            ports.clock.sleep(self.config.poll_interval);
        }
    }

    fn submit(&mut self, mut goal: NavigationGoal, ports: &mut Ports<'_>) -> Result<Option<GoalHandle>> {
        self.phase = SupervisorPhase::GoalSent;

        let response = ports.navigation.send_goal(&goal)?;
        let handle = match response {
            GoalResponse::Accepted(handle) => {
                goal.handle = Some(handle);
                goal.status = GoalStatus::Accepted;
                tracing::debug!("Goal {} accepted", handle);
                Some(handle)
            }
            GoalResponse::Rejected => {
                goal.status = GoalStatus::Rejected;
                None
            }
        };
        self.goal = Some(goal);
        Ok(handle)
    }

    fn set_status(&mut self, status: GoalStatus) {
        if let Some(goal) = self.goal.as_mut() {
            goal.status = status;
        }
    }

    /// Cancel and poll for the acknowledgement until `cancel_timeout`.
    /// Returns `false` if none arrived in time.
    fn await_cancel(
        &mut self,
        handle: GoalHandle,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<bool> {
        ports.navigation.cancel_goal(handle)?;
        let deadline = ports.clock.now() + self.config.cancel_timeout;

        loop {
            match ports.navigation.poll_cancel(handle)? {
                Some(CancelAck::Accepted) => {
                    self.set_status(GoalStatus::Cancelled);
                    tracing::debug!("Cancel of goal {} acknowledged", handle);
                    return Ok(true);
                }
                Some(CancelAck::Rejected) => {
                    // Already terminal on the server side; nothing left in flight
                    tracing::warn!("Cancel of goal {} rejected", handle);
                    return Ok(true);
                }
                None => {}
            }
            if ports.clock.now() >= deadline {
                return Ok(false);
            }
            ports.pump(world)?;
            ports.clock.sleep(self.config.poll_interval);
        }
    }

    fn cancel_and_confirm(
        &mut self,
        handle: GoalHandle,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<()> {
        if self.await_cancel(handle, ports, world)? {
            return Ok(());
        }
        self.phase = SupervisorPhase::Failed;
        Err(KhojError::CancelTimeout {
            handle,
            timeout: self.config.cancel_timeout,
        })
    }

    fn cancel_best_effort(
        &mut self,
        handle: GoalHandle,
        ports: &mut Ports<'_>,
        world: &mut WorldState,
    ) -> Result<()> {
        if !self.await_cancel(handle, ports, world)? {
            tracing::warn!(
                "Cancel of goal {} not acknowledged within {:?}",
                handle,
                self.config.cancel_timeout
            );
        }
        Ok(())
    }
}

impl Default for GoalSupervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default(), ScanRoutine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let supervisor = GoalSupervisor::default();
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
        assert!(supervisor.goal().is_none());
        assert!(supervisor.last_interrupt_pose().is_none());
    }

    #[test]
    fn test_default_config() {
        let config = SupervisorConfig::default();
        assert_eq!(config.interrupt_distance, 3.0);
        assert_eq!(config.frame_id, "odom");
        assert!(config.cancel_on_sighting);
    }
}
