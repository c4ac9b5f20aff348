//! Exploration decision core.
//!
//! - [`waypoints`]: candidate lattice generation
//! - [`scorer`]: accessibility scoring against occupancy and coverage
//! - [`queue`]: best-first waypoint queue with fallback
//! - [`planner`]: keeps the queue in step with map updates
//! - [`supervisor`]: goal monitoring, interrupts and resumption
//! - [`scan`]: in-place rotational scan
//! - [`mission`]: outer loop tying it all together

pub mod mission;
pub mod observer;
pub mod planner;
pub mod queue;
pub mod scan;
pub mod scorer;
pub mod supervisor;
pub mod waypoints;

pub use mission::{Mission, MissionConfig, MissionOutcome, MissionReport};
pub use observer::{LoggingObserver, WaypointObserver, WaypointSet};
pub use planner::{PlannerConfig, WaypointPlanner};
pub use queue::{WaypointQueue, fallback_waypoints};
pub use scan::{ScanConfig, ScanReport, ScanRoutine};
pub use scorer::{AccessibilityScorer, ScoringConfig};
pub use supervisor::{GoalOutcome, GoalReport, GoalSupervisor, SupervisorConfig, SupervisorPhase};
pub use waypoints::{GridGenerator, Waypoint};
