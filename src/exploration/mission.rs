//! Mission driver: the outer exploration loop.
//!
//! Alternates between exploration goals and scans until a target is known,
//! then drives to it. A failed approach is followed by one exploration goal
//! before the next attempt. Ends on arrival, shutdown, an exhausted goal budget or
//! an unrecoverable navigation error.

use std::time::Duration;

use crate::config::KhojConfig;
use crate::error::{KhojError, Result};
use crate::ports::Ports;
use crate::shared::WorldState;
use crate::types::WorldPoint;

use super::observer::WaypointObserver;
use super::planner::WaypointPlanner;
use super::scan::ScanRoutine;
use super::supervisor::{GoalOutcome, GoalSupervisor};

/// Mission-level settings.
#[derive(Clone, Debug)]
pub struct MissionConfig {
    /// Scan once after every exploration goal while no target is known.
    pub scan_after_goal: bool,
    /// Stop after this many goals (exploration plus approach).
    pub max_goals: Option<u32>,
    pub server_timeout: Duration,
    /// Back-off when no waypoint is available.
    pub poll_interval: Duration,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            scan_after_goal: true,
            max_goals: None,
            server_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MissionOutcome {
    /// Arrived at the sighted target.
    TargetReached(WorldPoint),
    GoalBudgetExhausted,
    Aborted,
}

/// Statistics for a finished mission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MissionReport {
    pub outcome: MissionOutcome,
    pub exploration_goals: u32,
    pub target_attempts: u32,
    /// Goals that were rejected, failed or timed out on cancel.
    pub failed_goals: u32,
    pub interrupts: u32,
    pub scans: u32,
    pub target: Option<WorldPoint>,
}

impl MissionReport {
    fn new() -> Self {
        Self {
            outcome: MissionOutcome::Aborted,
            exploration_goals: 0,
            target_attempts: 0,
            failed_goals: 0,
            interrupts: 0,
            scans: 0,
            target: None,
        }
    }

    /// Goals submitted so far, of either kind.
    pub fn goals(&self) -> u32 {
        self.exploration_goals + self.target_attempts
    }
}

/// Ball-search mission.
pub struct Mission {
    config: MissionConfig,
    planner: WaypointPlanner,
    supervisor: GoalSupervisor,
}

impl Mission {
    pub fn new(config: MissionConfig, planner: WaypointPlanner, supervisor: GoalSupervisor) -> Self {
        Self {
            config,
            planner,
            supervisor,
        }
    }

    pub fn from_config(config: &KhojConfig) -> Self {
        Self::new(
            config.mission_config(),
            WaypointPlanner::new(config.planner_config()),
            GoalSupervisor::new(
                config.supervisor_config(),
                ScanRoutine::new(config.scan_config()),
            ),
        )
    }

    pub fn set_observer(&mut self, observer: Box<dyn WaypointObserver>) {
        self.planner.set_observer(observer);
    }

    pub fn planner(&self) -> &WaypointPlanner {
        &self.planner
    }

    pub fn supervisor(&self) -> &GoalSupervisor {
        &self.supervisor
    }

    pub fn run(&mut self, ports: &mut Ports<'_>, world: &mut WorldState) -> Result<MissionReport> {
        tracing::info!("Waiting for navigation server...");
        if !ports.navigation.wait_for_server(self.config.server_timeout)? {
            return Err(KhojError::NavigationUnavailable(format!(
                "no response within {:?}",
                self.config.server_timeout
            )));
        }
        tracing::info!("Navigation server ready, starting search");

        let mut report = MissionReport::new();
        // Set after a failed approach: take one exploration goal from
        // somewhere else before trying the target again.
        let mut detour_pending = false;
        report.outcome = loop {
            ports.pump(world)?;

            if ports.shutdown_requested() {
                break MissionOutcome::Aborted;
            }
            if let Some(max) = self.config.max_goals
                && report.goals() >= max
            {
                tracing::warn!("Goal budget of {} spent", max);
                break MissionOutcome::GoalBudgetExhausted;
            }

            if let Some(target) = world.target()
                && !detour_pending
            {
                report.target_attempts += 1;
                let goal = self.supervisor.drive_to(target, ports, world)?;
                match goal.outcome {
                    GoalOutcome::Reached => break MissionOutcome::TargetReached(target),
                    GoalOutcome::Aborted => break MissionOutcome::Aborted,
                    other => {
                        tracing::warn!(
                            "Approach to target ended with {:?}, exploring before retrying",
                            other
                        );
                        report.failed_goals += 1;
                        detour_pending = true;
                        continue;
                    }
                }
            }

            self.planner.refresh(world);
            let Some((waypoint, origin)) = self.planner.next_waypoint(world) else {
                ports.clock.sleep(self.config.poll_interval);
                continue;
            };

            report.exploration_goals += 1;
            let result = if detour_pending {
                detour_pending = false;
                self.supervisor.detour(&waypoint, origin, ports, world)
            } else {
                self.supervisor.pursue(&waypoint, origin, ports, world)
            };
            match result {
                Ok(goal) => {
                    report.interrupts += goal.interrupts;
                    report.scans += goal.scans;
                    match goal.outcome {
                        GoalOutcome::Aborted => break MissionOutcome::Aborted,
                        GoalOutcome::Failed(_) | GoalOutcome::Rejected => report.failed_goals += 1,
                        GoalOutcome::Reached | GoalOutcome::TargetSighted => {}
                    }
                }
                Err(e @ KhojError::CancelTimeout { .. }) => {
                    tracing::error!("{}", e);
                    report.failed_goals += 1;
                }
                Err(e) => return Err(e),
            }

            ports.pump(world)?;
            if self.config.scan_after_goal && !world.target_found() && !ports.shutdown_requested() {
                self.supervisor.scan(ports, world)?;
                report.scans += 1;
            }
        };

        report.target = world.target();
        tracing::info!(
            "Mission finished: {:?} after {} exploration goals, {} approach attempts, {} scans",
            report.outcome,
            report.exploration_goals,
            report.target_attempts,
            report.scans
        );
        Ok(report)
    }
}
