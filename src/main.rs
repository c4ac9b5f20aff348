//! KhojNav - ball-search exploration controller
//!
//! Runs the search mission against the in-process simulated robot.
//!
//! Usage: khoj-nav [CONFIG] [--max-goals N] [--realtime]
//!
//! Without `--realtime` the simulation runs on a virtual clock and finishes
//! as fast as the CPU allows.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{error, info, warn};

use khoj_nav::clock::{Clock, ManualClock, SystemClock};
use khoj_nav::config::KhojConfig;
use khoj_nav::error::{KhojError, Result};
use khoj_nav::exploration::{Mission, MissionOutcome};
use khoj_nav::ports::Ports;
use khoj_nav::shared::WorldState;
use khoj_nav::sim::SimRobot;

#[derive(Parser, Debug)]
#[command(name = "khoj-nav", version, about = "Search a room for the ball")]
struct Args {
    /// Path to configuration file (defaults to khoj.toml if present)
    config: Option<PathBuf>,

    /// Stop after this many navigation goals
    #[arg(long)]
    max_goals: Option<u32>,

    /// Run the simulation in wall-clock time
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "khoj_nav=info"
                    .parse()
                    .map_err(|e| KhojError::Config(format!("Invalid log directive: {}", e)))?,
            ),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            KhojConfig::load(path)?
        }
        None if Path::new("khoj.toml").exists() => {
            info!("Loading configuration from khoj.toml");
            KhojConfig::load(Path::new("khoj.toml"))?
        }
        None => {
            info!("Using default configuration");
            KhojConfig::default()
        }
    };
    if let Some(max) = args.max_goals {
        config.mission.max_goals = Some(max);
    }

    info!("KhojNav v{}", env!("CARGO_PKG_VERSION"));

    let clock: Arc<dyn Clock> = if args.realtime {
        Arc::new(SystemClock::new())
    } else {
        Arc::new(ManualClock::new())
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shutdown_handler.store(true, Ordering::Release);
    })
    .map_err(|e| KhojError::Config(format!("Failed to set signal handler: {}", e)))?;

    let robot = SimRobot::new(&config.simulation, Arc::clone(&clock))?;
    let mut navigation = robot.clone();
    let mut velocity = robot.clone();
    let mut inputs = robot.clone();

    let mut ports = Ports {
        navigation: &mut navigation,
        velocity: &mut velocity,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &*shutdown,
    };
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&config);

    let report = match mission.run(&mut ports, &mut world) {
        Ok(report) => report,
        Err(e) => {
            error!("Mission failed: {}", e);
            return Err(e);
        }
    };

    match report.outcome {
        MissionOutcome::TargetReached(target) => {
            let (x, y, _) = robot.pose();
            info!(
                "Reached target at ({:.2}, {:.2}); robot at ({:.2}, {:.2}), true ball at ({:.2}, {:.2})",
                target.x,
                target.y,
                x,
                y,
                robot.ball().x,
                robot.ball().y
            );
        }
        MissionOutcome::GoalBudgetExhausted => warn!("Gave up: goal budget exhausted"),
        MissionOutcome::Aborted => warn!("Mission aborted"),
    }
    info!(
        "{} exploration goals ({} failed), {} interrupts, {} scans, {:.1}s elapsed",
        report.exploration_goals,
        report.failed_goals,
        report.interrupts,
        report.scans,
        clock.now().as_secs_f32()
    );

    info!("KhojNav finished");
    Ok(())
}
