//! Integration tests for the fleet simulation engine
//!
//! These tests drive the simulator through its public surface:
//! - Task completion on arrival
//! - Operator commands and their state preconditions
//! - Fleet-wide invariants across many seeds and ticks

use fleetwatch::core::types::{Position, RobotId};
use fleetwatch::fleet::{
    Command, CommandError, CommandOutcome, FleetSimulator, RobotStatus, Vendor,
};
use fleetwatch::FleetConfig;
use proptest::prelude::*;

fn assign(from: &str, to: &str) -> Command {
    Command::AssignTask {
        from: Some(from.into()),
        to: Some(to.into()),
        task_type: Some("delivery".into()),
        catalog_id: None,
    }
}

#[test]
fn test_task_completes_when_within_reach() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let id = RobotId::new("AR-001");
    sim.spawn_robot(id.clone(), Vendor::AmazonNormal, Position::new(3.0, 3.0), 80.0)
        .unwrap();

    let outcome = sim.command(&id, assign("Station 1", "Station 2")).unwrap();
    let destination = match outcome {
        CommandOutcome::TaskAssigned { destination, .. } => destination,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(destination, Position::new(10.0, 3.0));

    // 0.4 short of Station 2, moving at 2.0 with a 0.5 s tick
    {
        let robot = sim.robot_mut(&id).unwrap();
        robot.position = Position::new(9.6, 3.0);
        robot.speed = 2.0;
    }
    sim.tick();

    let robot = sim.robot(&id).unwrap();
    assert_eq!(robot.status, RobotStatus::Idle);
    assert!(robot.task.is_none());
    assert_eq!(robot.speed, 0.0);
    assert_eq!(robot.position, destination);
    assert_eq!(robot.stats.tasks_completed, 1);
    assert_eq!(robot.stats.task_durations, vec![0.5]);
}

#[test]
fn test_robot_travels_to_destination_over_ticks() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let id = RobotId::new("BALYO-001");
    sim.spawn_robot(id.clone(), Vendor::Balyo, Position::new(3.0, 12.0), 90.0)
        .unwrap();
    sim.command(&id, assign("Station 7", "Station 8")).unwrap();

    // 7 units at no less than 0.5 per second finishes well within 40 s
    for _ in 0..80 {
        sim.tick();
        if sim.robot(&id).unwrap().task.is_none() {
            break;
        }
    }

    let robot = sim.robot(&id).unwrap();
    assert_eq!(robot.status, RobotStatus::Idle);
    assert_eq!(robot.position, Position::new(10.0, 12.0));
    assert_eq!(robot.stats.tasks_completed, 1);
    assert!(robot.stats.total_distance > 6.0);
}

#[test]
fn test_pause_resume_and_charging_commands() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let id = RobotId::new("AR-002");
    sim.spawn_robot(id.clone(), Vendor::AmazonNormal, Position::new(12.0, 5.0), 70.0)
        .unwrap();

    // Pause needs a moving robot
    assert!(matches!(
        sim.command(&id, Command::Pause),
        Err(CommandError::InvalidState { .. })
    ));

    sim.command(&id, assign("Station 2", "Station 6")).unwrap();
    sim.command(&id, Command::Pause).unwrap();
    let robot = sim.robot(&id).unwrap();
    assert_eq!(robot.status, RobotStatus::Idle);
    assert!(robot.task.is_some());

    sim.command(&id, Command::Resume).unwrap();
    let robot = sim.robot(&id).unwrap();
    assert_eq!(robot.status, RobotStatus::Active);
    assert!(robot.speed >= 1.2 && robot.speed <= 2.8);

    match sim.command(&id, Command::SendToCharging).unwrap() {
        CommandOutcome::ChargingDispatched { charger, .. } => {
            assert_eq!(charger, "Charger C2");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let robot = sim.robot(&id).unwrap();
    assert!(robot.task.as_ref().unwrap().is_charging_trip());
    assert_eq!(robot.speed, config.simulation.dispatch_charging_speed);
}

#[test]
fn test_commands_on_unknown_robot() {
    let mut sim = FleetSimulator::new(&FleetConfig::deterministic()).unwrap();
    let missing = RobotId::new("AR-404");
    assert_eq!(
        sim.command(&missing, Command::Pause),
        Err(CommandError::RobotNotFound(missing.clone()))
    );
    assert!(sim.snapshot_of(&missing).is_none());
}

#[test]
fn test_offline_robot_is_frozen_until_brought_online() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let id = RobotId::new("AMZN-001");
    sim.spawn_robot(id.clone(), Vendor::AmazonInternal, Position::new(8.0, 7.0), 50.0)
        .unwrap();

    sim.command(&id, Command::TakeOffline).unwrap();
    for _ in 0..20 {
        sim.tick();
    }
    let robot = sim.robot(&id).unwrap();
    assert_eq!(robot.status, RobotStatus::Offline);
    assert_eq!(robot.battery, 50.0);
    assert!(matches!(
        sim.command(&id, assign("Station 1", "Station 2")),
        Err(CommandError::InvalidState { .. })
    ));

    sim.command(&id, Command::BringOnline).unwrap();
    assert_eq!(sim.robot(&id).unwrap().status, RobotStatus::Idle);
}

#[test]
fn test_reference_fleet_runs_and_summarises() {
    let mut sim = FleetSimulator::with_default_fleet(&FleetConfig::default()).unwrap();
    for _ in 0..400 {
        sim.tick();
    }
    let summary = sim.fleet_summary();
    assert_eq!(summary.total_robots, 24);
    assert_eq!(
        summary.active + summary.idle + summary.error + summary.charging + summary.offline,
        24
    );
    assert_eq!(sim.now(), 200.0);
    assert_eq!(sim.fleet_snapshot().robots.len(), 24);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_battery_stays_in_range(seed in any::<u64>()) {
        let mut config = FleetConfig::default();
        config.seed = seed;
        let mut sim = FleetSimulator::with_default_fleet(&config).unwrap();
        for _ in 0..300 {
            sim.tick();
            for robot in sim.robots() {
                prop_assert!((0.0..=100.0).contains(&robot.battery));
            }
        }
    }

    #[test]
    fn prop_errored_robots_are_stopped_with_a_fault(seed in any::<u64>()) {
        let mut config = FleetConfig::default();
        config.seed = seed;
        // Faults frequent enough to see plenty of them
        config.vendors.balyo.fault_probability = 0.02;
        let mut sim = FleetSimulator::with_default_fleet(&config).unwrap();
        for _ in 0..200 {
            sim.tick();
            for robot in sim.robots().iter().filter(|r| r.status == RobotStatus::Error) {
                prop_assert_eq!(robot.speed, 0.0);
                prop_assert!(robot.active_fault().is_some());
            }
        }
    }
}
