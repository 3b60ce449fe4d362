//! Integration tests for conflict detection
//!
//! Each scenario builds a small fleet through the simulator, takes a
//! snapshot and runs the conflict engine over it:
//! - Deadlock between paused robots
//! - Head-on collision course
//! - Zone congestion at the threshold
//! - Battery that cannot cover task plus charger trip
//! - Faulted robot blocked by an idle neighbour

use fleetwatch::alerts::{fingerprint, AlertSeverity, AlertType, ConflictEngine};
use fleetwatch::core::types::{Position, RobotId};
use fleetwatch::facility::{Facility, Site, Zone};
use fleetwatch::fleet::{faults, lifecycle, Command, FleetSimulator, Vendor};
use fleetwatch::FleetConfig;

fn engine_for(sim: &FleetSimulator, config: &FleetConfig) -> ConflictEngine {
    ConflictEngine::new(
        config.detection.clone(),
        sim.facility().clone(),
        config.vendors.clone(),
    )
}

fn assign(from: &str, to: &str) -> Command {
    Command::AssignTask {
        from: Some(from.into()),
        to: Some(to.into()),
        task_type: None,
        catalog_id: None,
    }
}

#[test]
fn test_paused_robots_with_tasks_deadlock() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let a = RobotId::new("AR-001");
    let b = RobotId::new("AR-002");
    sim.spawn_robot(a.clone(), Vendor::AmazonNormal, Position::new(5.0, 5.0), 80.0)
        .unwrap();
    sim.spawn_robot(b.clone(), Vendor::AmazonNormal, Position::new(7.0, 5.0), 80.0)
        .unwrap();
    for id in [&a, &b] {
        sim.command(id, assign("Station 1", "Station 3")).unwrap();
        sim.command(id, Command::Pause).unwrap();
    }

    let mut engine = engine_for(&sim, &config);
    let alerts = engine.check_all(&sim.fleet_snapshot());

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.alert_type, AlertType::Deadlock);
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.fingerprint(), fingerprint(AlertType::Deadlock, &[b, a]));
    assert_eq!(alert.fingerprint(), "deadlock:AR-001-AR-002");
}

#[test]
fn test_idle_robots_without_tasks_do_not_deadlock() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    sim.spawn_robot(RobotId::new("AR-001"), Vendor::AmazonNormal, Position::new(5.0, 5.0), 80.0)
        .unwrap();
    sim.spawn_robot(RobotId::new("AR-002"), Vendor::AmazonNormal, Position::new(7.0, 5.0), 80.0)
        .unwrap();

    let mut engine = engine_for(&sim, &config);
    assert!(engine.check_all(&sim.fleet_snapshot()).is_empty());
}

#[test]
fn test_head_on_robots_flagged_as_collision_course() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let west = RobotId::new("BALYO-001");
    let east = RobotId::new("BALYO-002");
    sim.spawn_robot(west.clone(), Vendor::Balyo, Position::new(10.0, 20.0), 90.0)
        .unwrap();
    sim.spawn_robot(east.clone(), Vendor::Balyo, Position::new(20.0, 20.0), 90.0)
        .unwrap();
    sim.command(&west, assign("Station 13", "Station 16")).unwrap();
    sim.command(&east, assign("Station 16", "Station 13")).unwrap();
    for (id, heading) in [(&west, 0.0), (&east, 180.0)] {
        let robot = sim.robot_mut(id).unwrap();
        robot.heading = heading;
        robot.speed = 1.0;
    }

    let mut engine = engine_for(&sim, &config);
    let alerts = engine.check_all(&sim.fleet_snapshot());

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::CollisionCourse);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    assert!(alerts[0].description.contains("~5 s"));
}

fn zone_a_fleet(count: usize) -> (FleetSimulator, FleetConfig) {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    for i in 0..count {
        // Spread out so no pair is close enough to matter otherwise
        let pos = Position::new(1.0 + (i % 4) as f64 * 4.0, 1.0 + (i / 4) as f64 * 6.0);
        sim.spawn_robot(
            RobotId::new(format!("AR-{:03}", i + 1)),
            Vendor::AmazonNormal,
            pos,
            80.0,
        )
        .unwrap();
    }
    (sim, config)
}

#[test]
fn test_congestion_at_threshold() {
    let (sim, config) = zone_a_fleet(8);
    let mut engine = engine_for(&sim, &config);
    let alerts = engine.check_all(&sim.fleet_snapshot());

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.alert_type, AlertType::Congestion);
    assert_eq!(alert.severity, AlertSeverity::Warning);
    assert_eq!(alert.title, "Congestion in Zone A");
    assert_eq!(alert.affected_robots.len(), 8);
    assert!(alert.description.contains("AR-001, AR-002, AR-003, AR-004, AR-005..."));
}

#[test]
fn test_no_congestion_below_threshold() {
    let (sim, config) = zone_a_fleet(7);
    let mut engine = engine_for(&sim, &config);
    assert!(engine.check_all(&sim.fleet_snapshot()).is_empty());
}

/// A long single aisle with one charger 60 units from the west dock
fn long_aisle() -> Facility {
    Facility {
        width: 300,
        height: 10,
        zones: vec![Zone::new("Aisle", 0.0, 299.0, 0.0, 9.0)],
        stations: vec![Site::new("West Dock", 10.0, 5.0), Site::new("East Dock", 290.0, 5.0)],
        chargers: vec![Site::new("Charger C1", 70.0, 5.0)],
        parking: Vec::new(),
    }
}

fn low_battery_config() -> FleetConfig {
    let mut config = FleetConfig::deterministic();
    config.facility = long_aisle();
    config.simulation.speed_jitter = 0.0;
    // Keep the robot on its task instead of diverting to charge
    config.simulation.low_battery_threshold = 0.0;
    let profile = &mut config.vendors.amazon_normal;
    profile.drain_per_minute = 1.0;
    profile.cruise_speed_min = 1.0;
    profile.cruise_speed_max = 1.0;
    config
}

#[test]
fn test_battery_critical_when_task_and_charger_trip_exceed_charge() {
    let config = low_battery_config();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let id = RobotId::new("AR-001");
    sim.spawn_robot(id.clone(), Vendor::AmazonNormal, Position::new(10.0, 5.0), 8.0)
        .unwrap();
    sim.command(&id, assign("West Dock", "East Dock")).unwrap();
    // One tick computes the remaining ETA (about 280 s)
    sim.tick();

    let mut engine = engine_for(&sim, &config);
    let alerts = engine.check_all(&sim.fleet_snapshot());

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.alert_type, AlertType::BatteryCritical);
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert!(alert.suggested_action.contains("Charger C1"));
    assert!(alert.suggested_action.ends_with("Abort the current task first."));
}

#[test]
fn test_battery_without_task_can_reach_charger() {
    let config = low_battery_config();
    let mut sim = FleetSimulator::new(&config).unwrap();
    sim.spawn_robot(RobotId::new("AR-001"), Vendor::AmazonNormal, Position::new(10.0, 5.0), 8.0)
        .unwrap();

    // 60 units at 1.0/s costs 1% plus the 5% margin
    let mut engine = engine_for(&sim, &config);
    assert!(engine.check_all(&sim.fleet_snapshot()).is_empty());
}

#[test]
fn test_faulted_robot_blocked_by_idle_neighbour() {
    let config = FleetConfig::deterministic();
    let mut sim = FleetSimulator::new(&config).unwrap();
    let stuck = RobotId::new("BALYO-004");
    let blocker = RobotId::new("BALYO-005");
    sim.spawn_robot(stuck.clone(), Vendor::Balyo, Position::new(24.0, 17.0), 60.0)
        .unwrap();
    sim.spawn_robot(blocker.clone(), Vendor::Balyo, Position::new(25.5, 17.0), 60.0)
        .unwrap();

    let facility = sim.facility().clone();
    let (_, def) = faults::lookup("PATH_BLOCKED").unwrap();
    lifecycle::inject_fault(sim.robot_mut(&stuck).unwrap(), def, 0.0, 30.0, &facility);

    let mut engine = engine_for(&sim, &config);
    let alerts = engine.check_all(&sim.fleet_snapshot());

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].alert_type, AlertType::RobotError);
    assert_eq!(alerts[0].title, "Error: BALYO-004 - Path Blocked");
    assert_eq!(alerts[1].alert_type, AlertType::PathBlocked);
    assert_eq!(alerts[1].affected_robots, vec![stuck, blocker]);
    assert_eq!(alerts[1].fingerprint(), "path_blocked:BALYO-004-BALYO-005");
    assert!(alerts[1]
        .suggested_action
        .starts_with("Send BALYO-005 to parking P5 (7m away)"));
}
