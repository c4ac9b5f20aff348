//! In-process simulated robot.
//!
//! Stands in for the mapping service, navigation stack, camera detector and
//! base controller so the full mission can run without middleware.

mod robot;
mod world;

pub use robot::SimRobot;
pub use world::SimWorld;
