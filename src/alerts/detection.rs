//! Detection passes
//!
//! Each pass is a pure function from a fleet snapshot to candidate alerts.
//! Passes never see each other's output and never touch live robot state.

use crate::core::config::DetectionConfig;
use crate::facility::Facility;
use crate::fleet::robot::RobotStatus;
use crate::fleet::snapshot::{FleetSnapshot, RobotSnapshot};
use crate::fleet::vendor::VendorTable;

use super::model::{Alert, AlertSeverity, AlertType};

/// Read-only inputs shared by every pass
pub struct DetectionInput<'a> {
    pub snapshot: &'a FleetSnapshot,
    pub facility: &'a Facility,
    pub config: &'a DetectionConfig,
    pub vendors: &'a VendorTable,
}

/// Run all passes in their fixed order
pub fn run_all(input: &DetectionInput<'_>) -> Vec<Alert> {
    let mut alerts = Vec::new();
    alerts.extend(robot_errors(input.snapshot));
    alerts.extend(deadlocks(input.snapshot, input.config));
    alerts.extend(collision_courses(input.snapshot, input.config));
    alerts.extend(congestion(input.snapshot, input.facility, input.config));
    alerts.extend(battery_critical(
        input.snapshot,
        input.facility,
        input.config,
        input.vendors,
    ));
    alerts.extend(path_blocked(input.snapshot, input.facility, input.config));
    alerts
}

/// One critical alert per robot in the error state
pub fn robot_errors(snapshot: &FleetSnapshot) -> Vec<Alert> {
    snapshot
        .robots
        .iter()
        .filter(|r| r.status == RobotStatus::Error)
        .map(|r| {
            let (code, name) = r
                .last_error
                .as_ref()
                .map(|e| (e.code.as_str(), e.name.as_str()))
                .unwrap_or(("UNKNOWN", "Unknown error"));
            Alert::new(
                AlertType::RobotError,
                AlertSeverity::Critical,
                format!("Error: {} - {}", r.id, name),
                format!(
                    "{} ({}) is in error state with code {} ({}). Battery: {:.0}%, zone: {}. \
                     The robot has stopped and needs attention.",
                    r.id, r.vendor, code, name, r.battery, r.zone
                ),
                format!(
                    "Clear the error on {} or send a technician to ({:.0}, {:.0}) in {}.",
                    r.id, r.position.x, r.position.y, r.zone
                ),
                vec![r.id.clone()],
            )
            .at(r.position)
        })
        .collect()
}

/// Stationary robots that both hold a task and sit close together
pub fn deadlocks(snapshot: &FleetSnapshot, config: &DetectionConfig) -> Vec<Alert> {
    let stuck: Vec<&RobotSnapshot> = snapshot
        .robots
        .iter()
        .filter(|r| matches!(r.status, RobotStatus::Idle | RobotStatus::Error) && r.task.is_some())
        .collect();

    let mut alerts = Vec::new();
    for (i, a) in stuck.iter().enumerate() {
        for b in &stuck[i + 1..] {
            if a.position.distance(&b.position) > config.deadlock_distance {
                continue;
            }
            alerts.push(
                Alert::new(
                    AlertType::Deadlock,
                    AlertSeverity::Critical,
                    format!("Deadlock: {} and {}", a.id, b.id),
                    format!(
                        "{} ({}) and {} ({}) are blocking each other near ({:.0}, {:.0}). \
                         Neither robot can reach its destination.",
                        a.id, a.vendor, b.id, b.vendor, a.position.x, a.position.y
                    ),
                    format!(
                        "Back {} off 3 meters and let {} proceed, or cancel one task and \
                         send that robot to parking.",
                        b.id, a.id
                    ),
                    vec![a.id.clone(), b.id.clone()],
                )
                .at(a.position),
            );
        }
    }
    alerts
}

/// Moving pairs whose straight-line projections come too close
pub fn collision_courses(snapshot: &FleetSnapshot, config: &DetectionConfig) -> Vec<Alert> {
    let moving: Vec<&RobotSnapshot> = snapshot
        .robots
        .iter()
        .filter(|r| r.status == RobotStatus::Active && r.speed > 0.0)
        .collect();

    let mut alerts = Vec::new();
    for (i, a) in moving.iter().enumerate() {
        for b in &moving[i + 1..] {
            if a.position.distance(&b.position) > config.collision_scan_distance {
                continue;
            }
            for t in config.collision_offsets() {
                let pa = a.position.project(a.heading, a.speed * t);
                let pb = b.position.project(b.heading, b.speed * t);
                if pa.distance(&pb) < config.collision_distance {
                    alerts.push(
                        Alert::new(
                            AlertType::CollisionCourse,
                            AlertSeverity::Warning,
                            format!("Potential collision: {} and {}", a.id, b.id),
                            format!(
                                "{} and {} are on a collision course, meeting in ~{:.0} s \
                                 near ({:.0}, {:.0}).",
                                a.id, b.id, t, pa.x, pa.y
                            ),
                            format!(
                                "Pause {} for {:.0} seconds to let {} clear the intersection.",
                                b.id, t, a.id
                            ),
                            vec![a.id.clone(), b.id.clone()],
                        )
                        .at(pa),
                    );
                    break;
                }
            }
        }
    }
    alerts
}

/// Zones holding at least the congestion threshold of robots
///
/// Robots standing between zones are grouped under "Unknown", reported
/// after the declared zones.
pub fn congestion(
    snapshot: &FleetSnapshot,
    facility: &Facility,
    config: &DetectionConfig,
) -> Vec<Alert> {
    let mut by_zone: Vec<(String, Vec<&RobotSnapshot>)> = facility
        .zones
        .iter()
        .map(|z| (z.name.clone(), Vec::new()))
        .collect();
    for r in snapshot.robots.iter().filter(|r| r.status != RobotStatus::Offline) {
        let name = facility.zone_name(r.position);
        match by_zone.iter_mut().find(|(zone, _)| *zone == name) {
            Some((_, occupants)) => occupants.push(r),
            None => by_zone.push((name, vec![r])),
        }
    }

    let mut alerts = Vec::new();
    for (zone, occupants) in &by_zone {
        if occupants.len() < config.congestion_threshold {
            continue;
        }

        let listed: Vec<&str> = occupants
            .iter()
            .take(config.congestion_listed)
            .map(|r| r.id.as_str())
            .collect();
        let ellipsis = if occupants.len() > config.congestion_listed {
            "..."
        } else {
            ""
        };

        alerts.push(Alert::new(
            AlertType::Congestion,
            AlertSeverity::Warning,
            format!("Congestion in {}", zone),
            format!(
                "{} has {} robots, above comfortable capacity. Robots: {}{}. \
                 Wait times may increase.",
                zone,
                occupants.len(),
                listed.join(", "),
                ellipsis
            ),
            "Reroute 2-3 robots to adjacent zones and spread new tasks across zones.",
            occupants.iter().map(|r| r.id.clone()).collect(),
        ));
    }
    alerts
}

/// Robots unlikely to finish their task and still reach a charger
pub fn battery_critical(
    snapshot: &FleetSnapshot,
    facility: &Facility,
    config: &DetectionConfig,
    vendors: &VendorTable,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for r in &snapshot.robots {
        if matches!(r.status, RobotStatus::Charging | RobotStatus::Offline) {
            continue;
        }
        if r.battery > config.battery_watch_threshold {
            continue;
        }
        let Some(fix) = facility.nearest_charger(r.position) else {
            continue;
        };

        let drain = vendors.get(r.vendor).drain_per_minute;
        let to_charger = fix.distance / config.assumed_travel_speed / 60.0 * drain;
        let to_finish = r.task_eta() / 60.0 * drain;
        let needed = to_charger + to_finish + config.battery_margin_pct;

        if r.battery >= needed {
            continue;
        }

        let severity = if r.battery < config.battery_critical_threshold {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        let abort = if r.task.is_some() {
            " Abort the current task first."
        } else {
            ""
        };

        alerts.push(
            Alert::new(
                AlertType::BatteryCritical,
                severity,
                format!("Battery critical: {} ({:.0}%)", r.id, r.battery),
                format!(
                    "{} ({}) has {:.0}% battery and needs about {:.1}% to finish its task \
                     and reach a charger at {}%/min. Nearest charger is {} ({:.0}m away).",
                    r.id, r.vendor, r.battery, needed, drain, fix.charger.name, fix.distance
                ),
                format!(
                    "Send {} directly to {} ({:.0}m away).{}",
                    r.id, fix.charger.name, fix.distance, abort
                ),
                vec![r.id.clone()],
            )
            .at(r.position),
        );
    }
    alerts
}

/// Faulted robots with a stationary neighbour close enough to be in the way
pub fn path_blocked(
    snapshot: &FleetSnapshot,
    facility: &Facility,
    config: &DetectionConfig,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for r in &snapshot.robots {
        if r.status != RobotStatus::Error || r.last_error.is_none() {
            continue;
        }
        let blocker = snapshot.robots.iter().find(|o| {
            o.id != r.id
                && matches!(o.status, RobotStatus::Idle | RobotStatus::Error)
                && r.position.distance(&o.position) < config.path_block_distance
        });
        let Some(o) = blocker else {
            continue;
        };
        let state = if o.status == RobotStatus::Idle {
            "idle"
        } else {
            "in error state"
        };
        let clear_out = match facility.nearest_parking(o.position) {
            Some(spot) => format!(
                "Send {} to parking {} ({:.0}m away) or give it a new task",
                o.id,
                spot.name,
                spot.position.distance(&o.position)
            ),
            None => format!("Move {} out of the way with a new task", o.id),
        };
        alerts.push(
            Alert::new(
                AlertType::PathBlocked,
                AlertSeverity::Warning,
                format!("Path blocked: {} by {}", r.id, o.id),
                format!(
                    "{} ({}) cannot proceed; {} ({}) at ({:.0}, {:.0}) appears to block \
                     its path and is {}.",
                    r.id, r.vendor, o.id, o.vendor, o.position.x, o.position.y, state
                ),
                format!("{}; {} should resume on its own.", clear_out, r.id),
                vec![r.id.clone(), o.id.clone()],
            )
            .at(r.position),
        );
    }
    alerts
}
