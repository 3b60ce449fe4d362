//! Vendor-independent read views of the fleet
//!
//! Snapshots are owned copies taken between ticks. The conflict engine and
//! every outbound surface read these, never the live records.

use serde::{Deserialize, Serialize};

use crate::core::types::{Position, RobotId, SimTime, Tick};
use crate::facility::Facility;
use crate::fleet::robot::{ActiveFault, ActivityEntry, RobotRecord, RobotStatus, Task};
use crate::fleet::vendor::Vendor;

/// Recent activity entries carried in a snapshot
pub const SNAPSHOT_ACTIVITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSnapshot {
    pub id: RobotId,
    pub vendor: Vendor,
    pub model: String,
    pub position: Position,
    pub heading: f64,
    pub speed: f64,
    pub status: RobotStatus,
    pub battery: f64,
    pub task: Option<Task>,
    /// Most recent fault, resolved or not
    pub last_error: Option<ActiveFault>,
    pub zone: String,
    pub trail: Vec<Position>,
    /// Newest first
    pub activity: Vec<ActivityEntry>,
    pub updated_at: SimTime,
}

impl RobotSnapshot {
    pub fn from_record(record: &RobotRecord, facility: &Facility, now: SimTime) -> Self {
        Self {
            id: record.id.clone(),
            vendor: record.vendor,
            model: record.vendor.model().to_string(),
            position: record.position,
            heading: record.heading,
            speed: record.speed,
            status: record.status,
            battery: record.battery,
            task: record.task.clone(),
            last_error: record.fault.clone(),
            zone: facility.zone_name(record.position),
            trail: record.trail.iter().copied().collect(),
            activity: record
                .activity
                .iter()
                .take(SNAPSHOT_ACTIVITY)
                .cloned()
                .collect(),
            updated_at: now,
        }
    }

    /// Remaining task ETA in seconds, zero without a task or estimate
    pub fn task_eta(&self) -> f64 {
        self.task
            .as_ref()
            .and_then(|t| t.eta_seconds)
            .unwrap_or(0.0)
    }
}

/// The whole fleet at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub tick: Tick,
    pub time: SimTime,
    pub robots: Vec<RobotSnapshot>,
}

impl FleetSnapshot {
    pub fn robot(&self, id: &RobotId) -> Option<&RobotSnapshot> {
        self.robots.iter().find(|r| &r.id == id)
    }

    pub fn count(&self, status: RobotStatus) -> usize {
        self.robots.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::robot::ActivityKind;

    #[test]
    fn test_snapshot_copies_bounded_activity() {
        let facility = Facility::warehouse();
        let mut record = RobotRecord::new(
            RobotId::new("AMZN-002"),
            Vendor::AmazonInternal,
            Position::new(20.0, 15.0),
            55.0,
            90.0,
            60,
            20,
        );
        for i in 0..15 {
            record.log(i as f64, format!("entry {}", i), ActivityKind::Command);
        }
        record.record_trail();

        let snap = RobotSnapshot::from_record(&record, &facility, 7.5);
        assert_eq!(snap.activity.len(), SNAPSHOT_ACTIVITY);
        assert_eq!(snap.activity[0].description, "entry 14");
        assert_eq!(snap.zone, "Zone E");
        assert_eq!(snap.model, "Hercules Drive");
        assert_eq!(snap.trail, vec![Position::new(20.0, 15.0)]);
        assert_eq!(snap.updated_at, 7.5);
        assert_eq!(snap.task_eta(), 0.0);
    }
}
