//! Internal state of one simulated robot

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::types::{Position, RobotId, SimTime, TaskId};
use crate::fleet::faults::{FaultDef, FaultSeverity};
use crate::fleet::vendor::Vendor;

/// Lifecycle state of a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotStatus {
    Idle,
    Active,
    Error,
    Charging,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Pickup,
    Delivery,
    Transport,
    Charging,
    /// Operator-assigned task from the catalog; the label carries its name
    Catalog,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Pickup => "pickup",
            TaskKind::Delivery => "delivery",
            TaskKind::Transport => "transport",
            TaskKind::Charging => "charging",
            TaskKind::Catalog => "catalog",
        }
    }

    /// Parse an operator-supplied task type, defaulting to transport
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pickup" => TaskKind::Pickup,
            "delivery" => TaskKind::Delivery,
            "charging" => TaskKind::Charging,
            _ => TaskKind::Transport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// A task a robot is carrying out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Display name: the task kind, or the catalog entry's name
    pub label: String,
    pub origin: String,
    pub destination: String,
    pub origin_position: Option<Position>,
    pub destination_position: Position,
    pub status: TaskStatus,
    pub started_at: SimTime,
    pub eta_seconds: Option<f64>,
    pub catalog_id: Option<String>,
}

impl Task {
    pub fn is_charging_trip(&self) -> bool {
        self.kind == TaskKind::Charging
    }
}

/// The fault a robot is currently reporting (or last reported)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveFault {
    pub code: String,
    pub name: String,
    pub severity: FaultSeverity,
    pub timestamp: SimTime,
    pub resolved: bool,
    pub resolved_at: Option<SimTime>,
}

impl ActiveFault {
    pub fn from_def(def: &FaultDef, at: SimTime) -> Self {
        Self {
            code: def.code.to_string(),
            name: def.name.to_string(),
            severity: def.severity,
            timestamp: at,
            resolved: false,
            resolved_at: None,
        }
    }

    pub fn resolve(&mut self, at: SimTime) {
        self.resolved = true;
        self.resolved_at = Some(at);
    }
}

/// One entry of the unbounded error history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: String,
    pub name: String,
    pub timestamp: SimTime,
    pub position: Position,
    pub zone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TaskStarted,
    TaskCompleted,
    TaskCancelled,
    Error,
    ErrorResolved,
    ChargingStart,
    ChargingComplete,
    Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: SimTime,
    pub description: String,
    pub kind: ActivityKind,
}

/// Cumulative per-robot counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotStats {
    pub tasks_completed: u32,
    pub total_distance: f64,
    pub total_error_time: f64,
    pub total_charge_time: f64,
    /// Completed task durations in seconds
    pub task_durations: Vec<f64>,
}

impl RobotStats {
    pub fn average_task_secs(&self) -> Option<f64> {
        if self.task_durations.is_empty() {
            None
        } else {
            Some(self.task_durations.iter().sum::<f64>() / self.task_durations.len() as f64)
        }
    }
}

/// Mutable state of a simulated robot, owned by the simulation engine
#[derive(Debug, Clone)]
pub struct RobotRecord {
    pub id: RobotId,
    pub vendor: Vendor,
    pub position: Position,
    /// Degrees, 0-360
    pub heading: f64,
    pub speed: f64,
    pub status: RobotStatus,
    pub battery: f64,
    pub task: Option<Task>,
    pub trail: VecDeque<Position>,
    pub activity: VecDeque<ActivityEntry>,
    pub fault: Option<ActiveFault>,
    pub error_started_at: Option<SimTime>,
    /// Dwell drawn when the current fault was injected
    pub recover_after_secs: f64,
    pub error_history: Vec<ErrorRecord>,
    pub stats: RobotStats,
    trail_cap: usize,
    activity_cap: usize,
}

impl RobotRecord {
    pub fn new(
        id: RobotId,
        vendor: Vendor,
        position: Position,
        battery: f64,
        heading: f64,
        trail_cap: usize,
        activity_cap: usize,
    ) -> Self {
        Self {
            id,
            vendor,
            position,
            heading: heading.rem_euclid(360.0),
            speed: 0.0,
            status: RobotStatus::Idle,
            battery: battery.clamp(0.0, 100.0),
            task: None,
            trail: VecDeque::with_capacity(trail_cap),
            activity: VecDeque::with_capacity(activity_cap),
            fault: None,
            error_started_at: None,
            recover_after_secs: 0.0,
            error_history: Vec::new(),
            stats: RobotStats::default(),
            trail_cap,
            activity_cap,
        }
    }

    /// Newest activity first; oldest entries fall off the end
    pub fn log(&mut self, at: SimTime, description: impl Into<String>, kind: ActivityKind) {
        self.activity.push_front(ActivityEntry {
            timestamp: at,
            description: description.into(),
            kind,
        });
        self.activity.truncate(self.activity_cap);
    }

    pub fn record_trail(&mut self) {
        if self.trail_cap == 0 {
            return;
        }
        if self.trail.len() == self.trail_cap {
            self.trail.pop_front();
        }
        self.trail.push_back(self.position);
    }

    /// Drop the current task, marking it cancelled and logging why
    pub fn cancel_task(&mut self, at: SimTime, reason: &str) -> Option<Task> {
        let mut task = self.task.take()?;
        task.status = TaskStatus::Cancelled;
        self.log(
            at,
            format!("Cancelled task {} ({})", task.id, reason),
            ActivityKind::TaskCancelled,
        );
        Some(task)
    }

    pub fn destination(&self) -> Option<Position> {
        self.task.as_ref().map(|t| t.destination_position)
    }

    /// Fault that is still unresolved
    pub fn active_fault(&self) -> Option<&ActiveFault> {
        self.fault.as_ref().filter(|f| !f.resolved)
    }
}
