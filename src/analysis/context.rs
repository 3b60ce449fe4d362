//! Incident context gathered for root-cause analysis
//!
//! Built on the tick path from live simulator state, then handed to an
//! enrichment task by value.

use serde::Serialize;

use crate::core::types::{Position, RobotId, SimTime, TaskId};
use crate::fleet::engine::FleetSimulator;
use crate::fleet::robot::{ActiveFault, ErrorRecord, RobotStatus, Task};

/// Robots within this distance are listed as neighbours
pub const NEARBY_RADIUS: f64 = 15.0;

/// Per-axis window for "errors at this location"
pub const SAME_LOCATION_WINDOW: f64 = 3.0;

/// Historical entries kept per list
pub const HISTORY_KEPT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct NearbyRobot {
    pub id: RobotId,
    pub vendor: String,
    pub position: Position,
    pub status: RobotStatus,
    pub distance: f64,
    pub task: Option<TaskId>,
}

impl NearbyRobot {
    /// Stationary robots are the usual suspects for a blocked path
    pub fn is_stationary(&self) -> bool {
        matches!(self.status, RobotStatus::Idle | RobotStatus::Error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationError {
    pub robot: RobotId,
    pub code: String,
    pub timestamp: SimTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargerRef {
    pub name: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentContext {
    pub robot_id: RobotId,
    pub vendor: String,
    pub position: Position,
    pub zone: String,
    pub battery: f64,
    pub fault: Option<ActiveFault>,
    pub task: Option<Task>,
    /// Sorted nearest first
    pub nearby: Vec<NearbyRobot>,
    pub same_location_errors: Vec<LocationError>,
    pub robot_errors: Vec<ErrorRecord>,
    pub nearest_charger: Option<ChargerRef>,
    pub trail_points: usize,
    pub time: SimTime,
}

impl IncidentContext {
    /// Collect context for a robot currently in the error state
    pub fn gather(sim: &FleetSimulator, id: &RobotId) -> Option<Self> {
        let robot = sim.robot(id)?;
        if robot.status != RobotStatus::Error {
            return None;
        }
        let facility = sim.facility();

        let mut nearby: Vec<NearbyRobot> = sim
            .robots()
            .iter()
            .filter(|r| r.id != robot.id)
            .filter_map(|r| {
                let distance = robot.position.distance(&r.position);
                (distance <= NEARBY_RADIUS).then(|| NearbyRobot {
                    id: r.id.clone(),
                    vendor: r.vendor.label().to_string(),
                    position: r.position,
                    status: r.status,
                    distance,
                    task: r.task.as_ref().map(|t| t.id.clone()),
                })
            })
            .collect();
        nearby.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut same_location: Vec<LocationError> = sim
            .robots()
            .iter()
            .flat_map(|r| r.error_history.iter().map(move |e| (r, e)))
            .filter(|(_, e)| {
                (e.position.x - robot.position.x).abs() < SAME_LOCATION_WINDOW
                    && (e.position.y - robot.position.y).abs() < SAME_LOCATION_WINDOW
            })
            .map(|(r, e)| LocationError {
                robot: r.id.clone(),
                code: e.code.clone(),
                timestamp: e.timestamp,
            })
            .collect();
        same_location.sort_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let same_location = tail(same_location, HISTORY_KEPT);

        let robot_errors = tail(robot.error_history.clone(), HISTORY_KEPT);

        let nearest_charger = facility.nearest_charger(robot.position).map(|fix| ChargerRef {
            name: fix.charger.name.clone(),
            distance: fix.distance,
        });

        Some(Self {
            robot_id: robot.id.clone(),
            vendor: robot.vendor.label().to_string(),
            position: robot.position,
            zone: facility.zone_name(robot.position),
            battery: robot.battery,
            fault: robot.fault.clone(),
            task: robot.task.clone(),
            nearby,
            same_location_errors: same_location,
            robot_errors,
            nearest_charger,
            trail_points: robot.trail.len(),
            time: sim.now(),
        })
    }

    /// Identifies one fault occurrence, so it is analysed once
    pub fn incident_key(&self) -> String {
        let at = self.fault.as_ref().map(|f| f.timestamp).unwrap_or(self.time);
        format!("{}:{}", self.robot_id, at)
    }

    /// First stationary neighbour close enough to block the robot
    pub fn blocker(&self, within: f64) -> Option<&NearbyRobot> {
        self.nearby
            .iter()
            .find(|n| n.is_stationary() && n.distance < within)
    }
}

fn tail<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let skip = items.len().saturating_sub(n);
    items.drain(..skip);
    items
}
