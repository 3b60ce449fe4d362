//! Alert records produced by the conflict engine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{AlertId, Position, RobotId, SimTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Deadlock,
    CollisionCourse,
    Congestion,
    BatteryCritical,
    PathBlocked,
    #[serde(rename = "error")]
    RobotError,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Deadlock => "deadlock",
            AlertType::CollisionCourse => "collision_course",
            AlertType::Congestion => "congestion",
            AlertType::BatteryCritical => "battery_critical",
            AlertType::PathBlocked => "path_blocked",
            AlertType::RobotError => "error",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
    Resolved,
}

impl AlertSeverity {
    /// Sort rank, most urgent first
    pub fn rank(&self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Info => 2,
            AlertSeverity::Resolved => 3,
        }
    }
}

/// Deduplication key: `type:sorted-ids`
pub fn fingerprint(alert_type: AlertType, robots: &[RobotId]) -> String {
    let mut ids: Vec<&str> = robots.iter().map(|r| r.as_str()).collect();
    ids.sort_unstable();
    format!("{}:{}", alert_type.as_str(), ids.join("-"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub suggested_action: String,
    /// Robots are referenced by id only and may no longer exist
    pub affected_robots: Vec<RobotId>,
    pub position: Option<Position>,
    /// Root-cause text attached after the fact
    pub analysis: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<SimTime>,
    pub resolved: bool,
    pub resolved_at: Option<SimTime>,
    pub created_at: SimTime,
    /// Admission order, breaks ties between alerts created in the same pass
    #[serde(skip)]
    pub(crate) sequence: u64,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
        suggested_action: impl Into<String>,
        affected_robots: Vec<RobotId>,
    ) -> Self {
        Self {
            id: AlertId::generate(),
            alert_type,
            severity,
            title: title.into(),
            description: description.into(),
            suggested_action: suggested_action.into(),
            affected_robots,
            position: None,
            analysis: None,
            acknowledged: false,
            acknowledged_at: None,
            resolved: false,
            resolved_at: None,
            created_at: 0.0,
            sequence: 0,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(self.alert_type, &self.affected_robots)
    }

    pub fn involves(&self, robot: &RobotId) -> bool {
        self.affected_robots.contains(robot)
    }

    pub(crate) fn mark_resolved(&mut self, at: SimTime) {
        self.resolved = true;
        self.resolved_at = Some(at);
        self.severity = AlertSeverity::Resolved;
    }

    /// Age ordering key: creation time, then admission order
    pub(crate) fn age_key(&self) -> (SimTime, u64) {
        (self.created_at, self.sequence)
    }
}
