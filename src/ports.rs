//! Traits at the external seams of the controller.
//!
//! The decision core never talks to middleware directly. Navigation,
//! velocity output, sensor input, time and shutdown all arrive through
//! these traits, bundled into [`Ports`] for each run.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::clock::Clock;
use crate::error::Result;
use crate::shared::WorldState;
use crate::types::{Twist, WorldPoint};

/// Opaque token identifying one accepted navigation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GoalHandle(pub u64);

impl fmt::Display for GoalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a navigation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalStatus {
    Pending,
    Accepted,
    Rejected,
    Succeeded,
    Cancelled,
    Failed,
}

impl GoalStatus {
    /// True once the navigation service will report nothing further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GoalStatus::Rejected | GoalStatus::Succeeded | GoalStatus::Cancelled | GoalStatus::Failed
        )
    }
}

/// A navigation request and what the service has said about it so far.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationGoal {
    pub target: WorldPoint,
    pub frame_id: String,
    pub handle: Option<GoalHandle>,
    pub status: GoalStatus,
}

impl NavigationGoal {
    pub fn new(target: WorldPoint, frame_id: impl Into<String>) -> Self {
        Self {
            target,
            frame_id: frame_id.into(),
            handle: None,
            status: GoalStatus::Pending,
        }
    }

    /// Same target and frame, fresh request state.
    pub fn resubmission(&self) -> Self {
        Self::new(self.target, self.frame_id.clone())
    }
}

/// Immediate answer to a goal submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalResponse {
    Accepted(GoalHandle),
    Rejected,
}

/// Answer to a cancel request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelAck {
    Accepted,
    Rejected,
}

/// Client side of the navigation action.
///
/// All calls are non-blocking except `wait_for_server`. Results and cancel
/// acknowledgements are polled; `Ok(None)` means "not yet".
pub trait NavigationClient {
    /// Block until the navigation service is reachable or `timeout` passes.
    /// Returns `false` on timeout.
    fn wait_for_server(&mut self, timeout: Duration) -> Result<bool>;

    fn send_goal(&mut self, goal: &NavigationGoal) -> Result<GoalResponse>;

    /// Final status of an accepted goal, once available.
    fn poll_result(&mut self, handle: GoalHandle) -> Result<Option<GoalStatus>>;

    fn cancel_goal(&mut self, handle: GoalHandle) -> Result<()>;

    fn poll_cancel(&mut self, handle: GoalHandle) -> Result<Option<CancelAck>>;
}

/// Destination for velocity commands.
pub trait VelocitySink {
    fn publish(&mut self, command: &Twist) -> Result<()>;
}

/// Anything that feeds map, pose and detection updates into the world state.
pub trait InputSource {
    /// Drain pending input into `world`. Never blocks.
    fn pump(&mut self, world: &mut WorldState) -> Result<()>;
}

/// External request to stop the mission.
pub trait ShutdownSignal {
    fn should_shutdown(&self) -> bool;
}

impl ShutdownSignal for AtomicBool {
    fn should_shutdown(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Shutdown signal that never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverShutdown;

impl ShutdownSignal for NeverShutdown {
    fn should_shutdown(&self) -> bool {
        false
    }
}

/// Everything the controller needs from the outside world for one run.
pub struct Ports<'a> {
    pub navigation: &'a mut dyn NavigationClient,
    pub velocity: &'a mut dyn VelocitySink,
    pub inputs: &'a mut dyn InputSource,
    pub clock: &'a dyn Clock,
    pub shutdown: &'a dyn ShutdownSignal,
}

impl Ports<'_> {
    /// Publish a command and remember it as the last one sent.
    pub fn publish(&mut self, world: &mut WorldState, command: &Twist) -> Result<()> {
        self.velocity.publish(command)?;
        world.record_command(*command);
        Ok(())
    }

    pub fn pump(&mut self, world: &mut WorldState) -> Result<()> {
        self.inputs.pump(world)
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.should_shutdown()
    }

    /// Sleep on the injected clock, pumping inputs every `poll` until
    /// `duration` has elapsed.
    pub fn wait(&mut self, world: &mut WorldState, duration: Duration, poll: Duration) -> Result<()> {
        let deadline = self.clock.now() + duration;
        loop {
            self.inputs.pump(world)?;
            let now = self.clock.now();
            if now >= deadline {
                return Ok(());
            }
            let remaining = deadline - now;
            self.clock.sleep(if poll.is_zero() { remaining } else { poll.min(remaining) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_handle_display() {
        assert_eq!(GoalHandle(7).to_string(), "#7");
    }

    #[test]
    fn test_resubmission_keeps_target() {
        let mut goal = NavigationGoal::new(WorldPoint::new(1.0, 2.0), "odom");
        goal.handle = Some(GoalHandle(3));
        goal.status = GoalStatus::Accepted;

        let again = goal.resubmission();
        assert_eq!(again.target, goal.target);
        assert_eq!(again.frame_id, "odom");
        assert_eq!(again.handle, None);
        assert_eq!(again.status, GoalStatus::Pending);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(GoalStatus::Succeeded.is_terminal());
        assert!(GoalStatus::Cancelled.is_terminal());
        assert!(!GoalStatus::Accepted.is_terminal());
        assert!(!GoalStatus::Pending.is_terminal());
    }

    #[test]
    fn test_atomic_bool_shutdown() {
        let flag = AtomicBool::new(false);
        assert!(!flag.should_shutdown());
        flag.store(true, Ordering::Release);
        assert!(flag.should_shutdown());
        assert!(!NeverShutdown.should_shutdown());
    }
}
