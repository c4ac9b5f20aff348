//! Channel-fed input source.
//!
//! Transport threads (map, coverage, pose and detector subscribers) hold an
//! [`InputSender`] and push decoded messages; the control thread owns the
//! [`ChannelInputs`] end and drains it once per loop iteration. Only the
//! control thread ever touches [`WorldState`].

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::error::{KhojError, Result};
use crate::map::{CoverageGrid, OccupancyGrid};
use crate::ports::InputSource;
use crate::shared::{InputEvent, WorldState};
use crate::types::Pose;

/// Messages drained per source per pump.
pub const MAX_MESSAGES_PER_PUMP: usize = 50;

/// Default per-source channel depth.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Cloneable producer handle for transport threads.
#[derive(Clone, Debug)]
pub struct InputSender {
    occupancy: Sender<OccupancyGrid>,
    coverage: Sender<CoverageGrid>,
    pose: Sender<Pose>,
    detection: Sender<(f32, f32)>,
}

impl InputSender {
    pub fn send_occupancy(&self, grid: OccupancyGrid) -> Result<()> {
        offer(&self.occupancy, grid, "occupancy")
    }

    pub fn send_coverage(&self, grid: CoverageGrid) -> Result<()> {
        offer(&self.coverage, grid, "coverage")
    }

    pub fn send_pose(&self, pose: Pose) -> Result<()> {
        offer(&self.pose, pose, "pose")
    }

    pub fn send_detection(&self, x: f32, y: f32) -> Result<()> {
        offer(&self.detection, (x, y), "detection")
    }
}

// Non-blocking send; a full channel drops the message.
fn offer<T>(tx: &Sender<T>, msg: T, source: &str) -> Result<()> {
    match tx.try_send(msg) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            tracing::debug!("{} channel full, dropping message", source);
            Ok(())
        }
        Err(TrySendError::Disconnected(_)) => Err(KhojError::Transport(format!(
            "{} consumer disconnected",
            source
        ))),
    }
}

/// Consumer end, drained by the control loop.
#[derive(Debug)]
pub struct ChannelInputs {
    occupancy: Receiver<OccupancyGrid>,
    coverage: Receiver<CoverageGrid>,
    pose: Receiver<Pose>,
    detection: Receiver<(f32, f32)>,
    disconnected_warned: bool,
}

/// Create a connected sender/receiver pair with `capacity` slots per source.
pub fn channel_inputs(capacity: usize) -> (InputSender, ChannelInputs) {
    let capacity = capacity.max(1);
    let (occ_tx, occ_rx) = bounded(capacity);
    let (cov_tx, cov_rx) = bounded(capacity);
    let (pose_tx, pose_rx) = bounded(capacity);
    let (det_tx, det_rx) = bounded(capacity);

    (
        InputSender {
            occupancy: occ_tx,
            coverage: cov_tx,
            pose: pose_tx,
            detection: det_tx,
        },
        ChannelInputs {
            occupancy: occ_rx,
            coverage: cov_rx,
            pose: pose_rx,
            detection: det_rx,
            disconnected_warned: false,
        },
    )
}

/// Drain up to [`MAX_MESSAGES_PER_PUMP`] messages. Returns `true` if the
/// producer side is gone.
fn drain<T>(rx: &Receiver<T>, world: &mut WorldState, wrap: impl Fn(T) -> InputEvent) -> bool {
    for _ in 0..MAX_MESSAGES_PER_PUMP {
        match rx.try_recv() {
            Ok(msg) => world.apply(wrap(msg)),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => return true,
        }
    }
    false
}

impl InputSource for ChannelInputs {
    fn pump(&mut self, world: &mut WorldState) -> Result<()> {
        let mut closed = drain(&self.occupancy, world, InputEvent::Occupancy);
        closed |= drain(&self.coverage, world, InputEvent::Coverage);
        closed |= drain(&self.pose, world, InputEvent::Pose);
        closed |= drain(&self.detection, world, |(x, y)| InputEvent::Detection { x, y });

        if closed && !self.disconnected_warned {
            tracing::warn!("Input producer disconnected; continuing with last known state");
            self.disconnected_warned = true;
        }
        Ok(())
    }
}
