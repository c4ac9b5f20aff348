mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use khoj_nav::clock::{Clock, ManualClock};
use khoj_nav::config::{KhojConfig, ObstacleBlock, SimulationSettings};
use khoj_nav::error::KhojError;
use khoj_nav::exploration::{Mission, MissionOutcome};
use khoj_nav::ports::{GoalStatus, NeverShutdown, Ports};
use khoj_nav::shared::{InputEvent, WorldState};
use khoj_nav::sim::SimRobot;
use khoj_nav::types::WorldPoint;

use common::{RecordingVelocity, ScriptedInputs, ScriptedNavigator};

/// 3m x 3m empty room; every point is within camera range of the ball, which
/// starts outside the field of view.
fn small_room() -> SimulationSettings {
    SimulationSettings {
        room_width: 3.0,
        room_height: 3.0,
        resolution: 0.1,
        origin_x: -1.0,
        origin_y: -1.0,
        obstacles: Vec::new(),
        ball_x: 0.5,
        ball_y: 1.2,
        camera_range: 3.0,
        ..Default::default()
    }
}

#[test]
fn test_simulated_mission_reaches_ball() {
    let mut config = KhojConfig {
        simulation: small_room(),
        ..Default::default()
    };
    config.mission.max_goals = Some(20);

    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
    let robot = SimRobot::new(&config.simulation, Arc::clone(&clock)).unwrap();
    let (mut nav, mut vel, mut inputs) = (robot.clone(), robot.clone(), robot.clone());
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&config);

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    let ball = WorldPoint::new(0.5, 1.2);
    assert_eq!(report.outcome, MissionOutcome::TargetReached(ball));
    assert_eq!(report.target, Some(ball));
    assert!(report.exploration_goals >= 1);
    assert!(report.target_attempts >= 1);

    let (x, y, _) = robot.pose();
    assert!(WorldPoint::new(x, y).distance(&ball) <= 0.1 + 1e-3);
    assert!(world.last_command().is_zero());
}

#[test]
fn test_goal_budget_ends_mission() {
    let mut config = KhojConfig {
        simulation: SimulationSettings {
            // Blind camera: the ball is never seen
            camera_range: 0.0,
            ..small_room()
        },
        ..Default::default()
    };
    config.mission.max_goals = Some(3);

    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
    let robot = SimRobot::new(&config.simulation, Arc::clone(&clock)).unwrap();
    let (mut nav, mut vel, mut inputs) = (robot.clone(), robot.clone(), robot.clone());
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&config);

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(report.outcome, MissionOutcome::GoalBudgetExhausted);
    assert_eq!(report.exploration_goals, 3);
    assert_eq!(report.target_attempts, 0);
    assert!(report.scans >= 3);
    assert_eq!(report.target, None);
    assert!(robot.goals_received() >= 3);
}

#[test]
fn test_known_target_driven_to_directly() {
    let clock = Arc::new(ManualClock::new());
    let mut nav = ScriptedNavigator::new().with_result(|_, _| Some(GoalStatus::Succeeded));
    let mut vel = RecordingVelocity::default();
    let mut inputs = ScriptedInputs::new(Arc::clone(&clock), |_| {
        vec![InputEvent::Detection { x: 2.0, y: -1.0 }]
    });
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&KhojConfig::default());

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(
        report.outcome,
        MissionOutcome::TargetReached(WorldPoint::new(2.0, -1.0))
    );
    assert_eq!(report.exploration_goals, 0);
    assert_eq!(report.target_attempts, 1);
    assert_eq!(nav.sends(), vec![WorldPoint::new(2.0, -1.0)]);
    assert!(vel.commands.is_empty());
}

#[test]
fn test_failed_approach_explores_before_retrying() {
    let clock = Arc::new(ManualClock::new());
    let mut nav = ScriptedNavigator::new().with_result(|handle, _| {
        if handle.0 == 1 {
            Some(GoalStatus::Failed)
        } else {
            Some(GoalStatus::Succeeded)
        }
    });
    let mut vel = RecordingVelocity::default();
    let mut inputs = ScriptedInputs::new(Arc::clone(&clock), |_| {
        vec![InputEvent::Detection { x: 1.0, y: 1.0 }]
    });
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&KhojConfig::default());

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(
        report.outcome,
        MissionOutcome::TargetReached(WorldPoint::new(1.0, 1.0))
    );
    assert_eq!(report.target_attempts, 2);
    assert_eq!(report.exploration_goals, 1);
    assert_eq!(report.failed_goals, 1);
    // Approach, one exploration goal (fallback, no map yet), approach again
    assert_eq!(
        nav.sends(),
        vec![
            WorldPoint::new(1.0, 1.0),
            WorldPoint::new(1.5, 0.0),
            WorldPoint::new(1.0, 1.0),
        ]
    );
}

#[test]
fn test_blocked_approach_alternates_with_exploration() {
    let mut config = KhojConfig {
        simulation: SimulationSettings {
            room_width: 4.0,
            room_height: 3.0,
            resolution: 0.1,
            origin_x: -1.0,
            origin_y: -1.0,
            // Wall between the start and the ball, which is in view from the start
            obstacles: vec![ObstacleBlock {
                min_x: 0.9,
                min_y: -0.5,
                max_x: 1.1,
                max_y: 1.0,
            }],
            ball_x: 2.0,
            ball_y: 0.3,
            camera_range: 3.0,
            ..Default::default()
        },
        ..Default::default()
    };
    config.mission.max_goals = Some(25);

    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
    let robot = SimRobot::new(&config.simulation, Arc::clone(&clock)).unwrap();
    let (mut nav, mut vel, mut inputs) = (robot.clone(), robot.clone(), robot.clone());
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&config);

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(report.target, Some(WorldPoint::new(2.0, 0.3)));
    assert!(report.target_attempts >= 1);
    assert!(report.exploration_goals >= 1);
    // Never two approaches in a row
    assert!(report.target_attempts <= report.exploration_goals + 1);
}

#[test]
fn test_first_goal_without_map_uses_fallback() {
    let clock = Arc::new(ManualClock::new());
    let mut nav = ScriptedNavigator::new().with_result(|_, _| Some(GoalStatus::Failed));
    let mut vel = RecordingVelocity::default();
    let mut inputs = ScriptedInputs::silent(Arc::clone(&clock));
    let mut world = WorldState::new();
    let mut config = KhojConfig::default();
    config.mission.max_goals = Some(1);
    config.mission.scan_after_goal = false;
    let mut mission = Mission::from_config(&config);

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(report.outcome, MissionOutcome::GoalBudgetExhausted);
    assert_eq!(report.failed_goals, 1);
    assert_eq!(nav.sends(), vec![WorldPoint::new(1.5, 0.0)]);
}

#[test]
fn test_shutdown_before_first_goal() {
    let clock = Arc::new(ManualClock::new());
    let mut nav = ScriptedNavigator::new();
    let mut vel = RecordingVelocity::default();
    let mut inputs = ScriptedInputs::silent(Arc::clone(&clock));
    let mut world = WorldState::new();
    let shutdown = AtomicBool::new(true);
    let mut mission = Mission::from_config(&KhojConfig::default());

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &shutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(report.outcome, MissionOutcome::Aborted);
    assert_eq!(report.exploration_goals, 0);
    assert!(nav.sends().is_empty());
}

#[test]
fn test_unavailable_server_is_fatal() {
    let clock = Arc::new(ManualClock::new());
    let mut nav = ScriptedNavigator::new();
    nav.server_ready = false;
    let mut vel = RecordingVelocity::default();
    let mut inputs = ScriptedInputs::silent(Arc::clone(&clock));
    let mut world = WorldState::new();
    let mut mission = Mission::from_config(&KhojConfig::default());

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let err = mission.run(&mut ports, &mut world).unwrap_err();

    assert!(matches!(err, KhojError::NavigationUnavailable(_)));
    assert!(nav.calls.is_empty());
}

#[test]
fn test_cancel_timeout_counts_as_failed_goal() {
    let clock = Arc::new(ManualClock::new());
    let mut nav = ScriptedNavigator::new();
    nav.ack_cancel = false;
    let mut vel = RecordingVelocity::default();
    let mut inputs = ScriptedInputs::new(Arc::clone(&clock), |now| {
        vec![InputEvent::Pose(khoj_nav::types::Pose::new(
            now.as_secs_f32(),
            0.0,
            0.0,
        ))]
    });
    let mut world = WorldState::new();
    let mut config = KhojConfig::default();
    config.mission.max_goals = Some(1);
    config.mission.scan_after_goal = false;
    let mut mission = Mission::from_config(&config);

    let mut ports = Ports {
        navigation: &mut nav,
        velocity: &mut vel,
        inputs: &mut inputs,
        clock: &*clock,
        shutdown: &NeverShutdown,
    };
    let report = mission.run(&mut ports, &mut world).unwrap();

    assert_eq!(report.outcome, MissionOutcome::GoalBudgetExhausted);
    assert_eq!(report.failed_goals, 1);
}
