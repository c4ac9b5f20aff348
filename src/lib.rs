//! KhojNav - ball-search exploration controller
//!
//! Drives a mobile robot through an unmapped room until a target ball is
//! seen and reached. The decision core picks where to go next from the
//! occupancy and visual-coverage maps, supervises each navigation goal and
//! interleaves it with rotational scans.
//!
//! All external collaborators (mapping, navigation, detector, velocity
//! output, time) are reached through the traits in [`ports`]; [`sim`]
//! provides an in-process implementation of all of them.

pub mod clock;
pub mod config;
pub mod detection;
pub mod error;
pub mod exploration;
pub mod inputs;
pub mod map;
pub mod ports;
pub mod shared;
pub mod sim;
pub mod types;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::KhojConfig;
pub use error::{KhojError, Result};
pub use exploration::{Mission, MissionOutcome, MissionReport};
pub use ports::Ports;
pub use shared::WorldState;
pub use types::{Pose, Twist, WorldPoint};
