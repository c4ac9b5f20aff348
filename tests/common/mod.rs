//! Scripted fake ports shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use khoj_nav::clock::{Clock, ManualClock};
use khoj_nav::error::Result;
use khoj_nav::map::OccupancyGrid;
use khoj_nav::ports::{
    CancelAck, GoalHandle, GoalResponse, GoalStatus, InputSource, NavigationClient,
    NavigationGoal, VelocitySink,
};
use khoj_nav::shared::{InputEvent, WorldState};
use khoj_nav::types::{Twist, WorldPoint};

/// One call made against the scripted navigator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavCall {
    Send(WorldPoint),
    PollResult(GoalHandle),
    Cancel(GoalHandle),
    PollCancel(GoalHandle),
}

type ResultScript = Box<dyn FnMut(GoalHandle, usize) -> Option<GoalStatus>>;

/// Navigation client driven by a script.
///
/// Sends are answered from `responses` and auto-accepted once it runs out.
/// `result` is called with the handle and how many times that handle has
/// been polled; the default never finishes.
pub struct ScriptedNavigator {
    pub calls: Vec<NavCall>,
    pub server_ready: bool,
    pub ack_cancel: bool,
    responses: VecDeque<GoalResponse>,
    result: ResultScript,
    polls: HashMap<GoalHandle, usize>,
    pending_cancel: Option<GoalHandle>,
    next_handle: u64,
}

impl ScriptedNavigator {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            server_ready: true,
            ack_cancel: true,
            responses: VecDeque::new(),
            result: Box::new(|_, _| None),
            polls: HashMap::new(),
            pending_cancel: None,
            next_handle: 1,
        }
    }

    pub fn with_responses(mut self, responses: impl IntoIterator<Item = GoalResponse>) -> Self {
        self.responses = responses.into_iter().collect();
        self
    }

    pub fn with_result(
        mut self,
        result: impl FnMut(GoalHandle, usize) -> Option<GoalStatus> + 'static,
    ) -> Self {
        self.result = Box::new(result);
        self
    }

    pub fn sends(&self) -> Vec<WorldPoint> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                NavCall::Send(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, call: NavCall) -> Option<usize> {
        self.calls.iter().position(|c| *c == call)
    }

    /// Index of the n-th send (0-based).
    pub fn nth_send(&self, n: usize) -> Option<usize> {
        self.calls
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, NavCall::Send(_)))
            .nth(n)
            .map(|(i, _)| i)
    }
}

impl NavigationClient for ScriptedNavigator {
    fn wait_for_server(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.server_ready)
    }

    fn send_goal(&mut self, goal: &NavigationGoal) -> Result<GoalResponse> {
        self.calls.push(NavCall::Send(goal.target));
        let response = self.responses.pop_front().unwrap_or_else(|| {
            let handle = GoalHandle(self.next_handle);
            GoalResponse::Accepted(handle)
        });
        if let GoalResponse::Accepted(handle) = response {
            self.next_handle = self.next_handle.max(handle.0 + 1);
        }
        Ok(response)
    }

    fn poll_result(&mut self, handle: GoalHandle) -> Result<Option<GoalStatus>> {
        self.calls.push(NavCall::PollResult(handle));
        let count = self.polls.entry(handle).or_insert(0);
        *count += 1;
        let count = *count;
        Ok((self.result)(handle, count))
    }

    fn cancel_goal(&mut self, handle: GoalHandle) -> Result<()> {
        self.calls.push(NavCall::Cancel(handle));
        self.pending_cancel = Some(handle);
        Ok(())
    }

    fn poll_cancel(&mut self, handle: GoalHandle) -> Result<Option<CancelAck>> {
        self.calls.push(NavCall::PollCancel(handle));
        if self.ack_cancel && self.pending_cancel == Some(handle) {
            self.pending_cancel = None;
            return Ok(Some(CancelAck::Accepted));
        }
        Ok(None)
    }
}

/// Velocity sink that keeps every command.
#[derive(Default)]
pub struct RecordingVelocity {
    pub commands: Vec<Twist>,
}

impl RecordingVelocity {
    /// Commands with a non-zero yaw rate.
    pub fn rotations(&self) -> usize {
        self.commands.iter().filter(|c| c.angular.z != 0.0).count()
    }
}

impl VelocitySink for RecordingVelocity {
    fn publish(&mut self, command: &Twist) -> Result<()> {
        self.commands.push(*command);
        Ok(())
    }
}

/// Input source whose events are a function of virtual time.
pub struct ScriptedInputs {
    clock: Arc<ManualClock>,
    script: Box<dyn FnMut(Duration) -> Vec<InputEvent>>,
}

impl ScriptedInputs {
    pub fn new(
        clock: Arc<ManualClock>,
        script: impl FnMut(Duration) -> Vec<InputEvent> + 'static,
    ) -> Self {
        Self {
            clock,
            script: Box::new(script),
        }
    }

    /// Source that never produces anything.
    pub fn silent(clock: Arc<ManualClock>) -> Self {
        Self::new(clock, |_| Vec::new())
    }
}

impl InputSource for ScriptedInputs {
    fn pump(&mut self, world: &mut WorldState) -> Result<()> {
        for event in (self.script)(self.clock.now()) {
            world.apply(event);
        }
        Ok(())
    }
}

/// Occupancy grid full of obstacles except for a free square of `free`
/// cells centered on (`row`, `col`).
pub fn walled_grid(
    width: usize,
    height: usize,
    resolution: f32,
    row: usize,
    col: usize,
    free: usize,
) -> OccupancyGrid {
    let mut cells = vec![100i8; width * height];
    let half = free / 2;
    for r in row - half..row - half + free {
        for c in col - half..col - half + free {
            cells[r * width + c] = 0;
        }
    }
    OccupancyGrid::new(width, height, resolution, WorldPoint::ZERO, cells).unwrap()
}
