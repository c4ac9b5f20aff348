//! Simulated robot implementing every external port.
//!
//! One shared core behind a mutex; cheap clones hand out the navigation,
//! velocity and input roles separately. Motion and sensing are integrated
//! lazily from the injected clock whenever any port is touched.
//!
//! Goals are driven in a straight line at `linear_speed`; the path planner
//! is not simulated, so a goal whose straight path is blocked fails. Sensing
//! has no occlusion: range cells within `sensor_range` are revealed and
//! cells within the camera cone are marked seen.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::SimulationSettings;
use crate::error::{KhojError, Result};
use crate::map::{CoverageGrid, OccupancyGrid, UNKNOWN};
use crate::ports::{
    CancelAck, GoalHandle, GoalResponse, GoalStatus, InputSource, NavigationClient,
    NavigationGoal, VelocitySink,
};
use crate::shared::{InputEvent, WorldState};
use crate::types::{Pose, Twist, WorldPoint};
use crate::utils::{angle_between, normalize_angle};

use super::world::SimWorld;

#[derive(Clone, Copy, Debug)]
struct ActiveGoal {
    handle: GoalHandle,
    target: WorldPoint,
    status: GoalStatus,
}

struct SimCore {
    world: SimWorld,
    linear_speed: f32,
    sensor_range: f32,
    camera_range: f32,
    half_fov: f32,
    goal_tolerance: f32,

    x: f32,
    y: f32,
    theta: f32,
    command: Twist,

    known: Vec<i8>,
    seen: Vec<f32>,
    map_dirty: bool,
    coverage_dirty: bool,
    sensed_from: Option<(f32, f32, f32)>,

    goal: Option<ActiveGoal>,
    next_handle: u64,
    cancel_ack: Option<(GoalHandle, CancelAck)>,
    goals_received: u32,
    last_update: Duration,
}

impl SimCore {
    fn advance(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.last_update).as_secs_f32();
        self.last_update = now;

        if dt > 0.0 {
            if self.command.angular.z != 0.0 {
                self.theta = normalize_angle(self.theta + self.command.angular.z * dt);
            }
            self.drive(dt);
        }
        self.sense();
    }

    fn drive(&mut self, dt: f32) {
        let Some(goal) = self.goal.as_mut() else {
            return;
        };
        if goal.status != GoalStatus::Accepted {
            return;
        }

        let dx = goal.target.x - self.x;
        let dy = goal.target.y - self.y;
        let dist = dx.hypot(dy);
        if dist <= self.goal_tolerance {
            goal.status = GoalStatus::Succeeded;
            return;
        }

        let step = (self.linear_speed * dt).min(dist);
        let from = WorldPoint::new(self.x, self.y);
        let to = WorldPoint::new(self.x + dx / dist * step, self.y + dy / dist * step);
        if !self.world.segment_clear(from, to) {
            tracing::debug!("Sim: goal {} blocked at ({:.2}, {:.2})", goal.handle, self.x, self.y);
            goal.status = GoalStatus::Failed;
            return;
        }

        self.x = to.x;
        self.y = to.y;
        self.theta = dy.atan2(dx);
        if dist - step <= self.goal_tolerance {
            goal.status = GoalStatus::Succeeded;
        }
    }

    fn in_camera_cone(&self, dx: f32, dy: f32) -> bool {
        let dist = dx.hypot(dy);
        if dist > self.camera_range {
            return false;
        }
        dist < 1e-6 || angle_between(dy.atan2(dx), self.theta) <= self.half_fov
    }

    fn sense(&mut self) {
        let pose = (self.x, self.y, self.theta);
        if self.sensed_from == Some(pose) {
            return;
        }
        self.sensed_from = Some(pose);

        let res = self.world.resolution();
        let origin = self.world.origin();
        let reach = self.sensor_range.max(self.camera_range);
        let span = |center: f32, origin: f32, len: usize| {
            let lo = ((center - reach - origin) / res).floor().max(0.0) as usize;
            let hi = (((center + reach - origin) / res).ceil().max(0.0) as usize).min(len - 1);
            (lo, hi)
        };
        let (c0, c1) = span(self.x, origin.x, self.world.width());
        let (r0, r1) = span(self.y, origin.y, self.world.height());

        for row in r0..=r1 {
            for col in c0..=c1 {
                let i = row * self.world.width() + col;
                let center = self.world.cell_center(row, col);
                let (dx, dy) = (center.x - self.x, center.y - self.y);

                if dx.hypot(dy) <= self.sensor_range {
                    let value = if self.world.is_occupied_cell(row, col) { 100 } else { 0 };
                    if self.known[i] != value {
                        self.known[i] = value;
                        self.map_dirty = true;
                    }
                }
                if self.seen[i] < 1.0 && self.in_camera_cone(dx, dy) {
                    self.seen[i] = 1.0;
                    self.coverage_dirty = true;
                }
            }
        }
    }

    fn detection(&self) -> (f32, f32) {
        let ball = self.world.ball();
        if self.in_camera_cone(ball.x - self.x, ball.y - self.y) {
            (ball.x, ball.y)
        } else {
            (0.0, 0.0)
        }
    }
}

/// Handle to the shared simulated robot.
#[derive(Clone)]
pub struct SimRobot {
    core: Arc<Mutex<SimCore>>,
    clock: Arc<dyn Clock>,
}

impl SimRobot {
    pub fn new(settings: &SimulationSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        let world = SimWorld::new(settings)?;
        let start = WorldPoint::new(settings.start_x, settings.start_y);
        if world.is_occupied(start) {
            return Err(KhojError::Config(format!(
                "simulation start ({:.2}, {:.2}) is inside an obstacle",
                start.x, start.y
            )));
        }
        let cells = world.width() * world.height();
        tracing::info!(
            "Simulated room {}x{} cells @ {:.2}m, ball at ({:.2}, {:.2})",
            world.width(),
            world.height(),
            world.resolution(),
            settings.ball_x,
            settings.ball_y
        );

        let core = SimCore {
            world,
            linear_speed: settings.linear_speed,
            sensor_range: settings.sensor_range,
            camera_range: settings.camera_range,
            half_fov: settings.camera_fov_deg.to_radians() / 2.0,
            goal_tolerance: settings.goal_tolerance,
            x: start.x,
            y: start.y,
            theta: normalize_angle(settings.start_theta),
            command: Twist::zero(),
            known: vec![UNKNOWN; cells],
            seen: vec![0.0; cells],
            map_dirty: false,
            coverage_dirty: false,
            sensed_from: None,
            goal: None,
            next_handle: 1,
            cancel_ack: None,
            goals_received: 0,
            last_update: clock.now(),
        };

        Ok(Self {
            core: Arc::new(Mutex::new(core)),
            clock,
        })
    }

    /// True pose of the robot (x, y, heading).
    pub fn pose(&self) -> (f32, f32, f32) {
        let core = self.core.lock();
        (core.x, core.y, core.theta)
    }

    pub fn ball(&self) -> WorldPoint {
        self.core.lock().world.ball()
    }

    /// Goals submitted so far, accepted or not.
    pub fn goals_received(&self) -> u32 {
        self.core.lock().goals_received
    }

    fn with_core<T>(&self, f: impl FnOnce(&mut SimCore) -> T) -> T {
        let mut core = self.core.lock();
        core.advance(self.clock.now());
        f(&mut core)
    }
}

impl NavigationClient for SimRobot {
    fn wait_for_server(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    fn send_goal(&mut self, goal: &NavigationGoal) -> Result<GoalResponse> {
        Ok(self.with_core(|core| {
            core.goals_received += 1;
            if core.world.is_occupied(goal.target) {
                tracing::debug!(
                    "Sim: rejecting goal ({:.2}, {:.2}) in occupied space",
                    goal.target.x,
                    goal.target.y
                );
                return GoalResponse::Rejected;
            }

            if let Some(previous) = core.goal.as_mut()
                && previous.status == GoalStatus::Accepted
            {
                tracing::warn!("Sim: goal {} preempted", previous.handle);
                previous.status = GoalStatus::Cancelled;
            }

            let handle = GoalHandle(core.next_handle);
            core.next_handle += 1;
            core.goal = Some(ActiveGoal {
                handle,
                target: goal.target,
                status: GoalStatus::Accepted,
            });
            GoalResponse::Accepted(handle)
        }))
    }

    fn poll_result(&mut self, handle: GoalHandle) -> Result<Option<GoalStatus>> {
        Ok(self.with_core(|core| match core.goal {
            Some(goal) if goal.handle == handle => {
                goal.status.is_terminal().then_some(goal.status)
            }
            // Superseded by a newer goal
            _ => Some(GoalStatus::Cancelled),
        }))
    }

    fn cancel_goal(&mut self, handle: GoalHandle) -> Result<()> {
        self.with_core(|core| {
            let ack = match core.goal.as_mut() {
                Some(goal) if goal.handle == handle && goal.status == GoalStatus::Accepted => {
                    goal.status = GoalStatus::Cancelled;
                    CancelAck::Accepted
                }
                _ => CancelAck::Rejected,
            };
            core.cancel_ack = Some((handle, ack));
        });
        Ok(())
    }

    fn poll_cancel(&mut self, handle: GoalHandle) -> Result<Option<CancelAck>> {
        Ok(self.with_core(|core| match core.cancel_ack {
            Some((pending, ack)) if pending == handle => {
                core.cancel_ack = None;
                Some(ack)
            }
            _ => None,
        }))
    }
}

impl VelocitySink for SimRobot {
    fn publish(&mut self, command: &Twist) -> Result<()> {
        self.with_core(|core| core.command = *command);
        Ok(())
    }
}

impl InputSource for SimRobot {
    fn pump(&mut self, world: &mut WorldState) -> Result<()> {
        let mut core = self.core.lock();
        core.advance(self.clock.now());

        let (width, height) = (core.world.width(), core.world.height());
        let (resolution, origin) = (core.world.resolution(), core.world.origin());

        if core.map_dirty {
            let grid = OccupancyGrid::new(width, height, resolution, origin, core.known.clone())?;
            world.apply(InputEvent::Occupancy(grid));
            core.map_dirty = false;
        }
        if core.coverage_dirty {
            let grid = CoverageGrid::new(width, height, resolution, origin, core.seen.clone())?;
            world.apply(InputEvent::Coverage(grid));
            core.coverage_dirty = false;
        }

        world.apply(InputEvent::Pose(Pose::new(core.x, core.y, 0.0)));
        let (x, y) = core.detection();
        world.apply(InputEvent::Detection { x, y });
        Ok(())
    }
}
