//! Fleet configuration with documented constants
//!
//! Every threshold the engines consult lives here so that tests can build
//! small deterministic fleets and deployments can tune detection without
//! touching engine code. The whole tree deserializes from TOML; missing
//! sections fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{FleetError, Result};
use crate::facility::Facility;
use crate::fleet::vendor::VendorTable;

/// Root configuration handed to [`crate::runtime::FleetContext`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Seed for the simulation's random source
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub detection: DetectionConfig,
    pub vendors: VendorTable,
    pub facility: Facility,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            simulation: SimulationConfig::default(),
            detection: DetectionConfig::default(),
            vendors: VendorTable::default(),
            facility: Facility::default(),
        }
    }
}

impl FleetConfig {
    /// Defaults with every probabilistic transition switched off
    ///
    /// Robots only change state through movement, battery and commands,
    /// which makes scenario tests reproducible regardless of seed.
    pub fn deterministic() -> Self {
        let mut config = Self::default();
        config.simulation.task_start_probability = 0.0;
        config.vendors.amazon_normal.fault_probability = 0.0;
        config.vendors.balyo.fault_probability = 0.0;
        config.vendors.amazon_internal.fault_probability = 0.0;
        config
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.detection.validate()?;
        self.vendors.validate()?;
        self.facility.validate()
    }
}

/// Configuration for the fleet simulation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === SCHEDULING ===
    /// Simulated seconds per tick
    pub tick_interval_secs: f64,

    /// Detection passes run every N ticks (4 ticks = 2 s at 500 ms)
    pub detection_every_ticks: u64,

    // === MOVEMENT ===
    /// Distance below which a robot counts as arrived
    pub arrival_epsilon: f64,

    /// Maximum per-tick speed change (absolute, m/s)
    pub speed_jitter: f64,

    /// Global speed floor applied after jitter
    pub min_speed: f64,

    /// Global speed ceiling applied after jitter
    pub max_speed: f64,

    /// Speed used for autonomous trips to a charger
    pub charger_approach_speed: f64,

    /// Speed used when an operator sends a robot to charge
    pub dispatch_charging_speed: f64,

    /// Lower bound on speed when computing ETA
    pub eta_speed_floor: f64,

    // === TASKS ===
    /// Chance per tick that an idle robot picks up a new task
    pub task_start_probability: f64,

    /// Robots given a task when the default fleet is created
    pub initial_tasks: usize,

    // === BATTERY ===
    /// Idle drain as a fraction of active drain
    pub idle_drain_factor: f64,

    /// Below this level a robot heads for a charger
    pub low_battery_threshold: f64,

    /// Charging stops once the battery reaches this level
    pub charged_threshold: f64,

    /// A robot within this distance of a charger docks immediately
    pub docking_range: f64,

    // === FAULTS ===
    /// Shortest dwell before a simulated fault clears itself
    pub error_dwell_min_secs: f64,

    /// Longest dwell before a simulated fault clears itself
    pub error_dwell_max_secs: f64,

    // === HISTORY ===
    /// Trail positions kept per robot (60 = 30 s at 500 ms)
    pub trail_len: usize,

    /// Activity entries kept per robot
    pub activity_len: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 0.5,
            detection_every_ticks: 4,

            arrival_epsilon: 1.0,
            speed_jitter: 0.15,
            min_speed: 0.5,
            max_speed: 3.5,
            charger_approach_speed: 1.0,
            dispatch_charging_speed: 1.5,
            eta_speed_floor: 0.1,

            task_start_probability: 0.05,
            initial_tasks: 12,

            idle_drain_factor: 0.3,
            low_battery_threshold: 15.0,
            charged_threshold: 95.0,
            docking_range: 2.0,

            error_dwell_min_secs: 10.0,
            error_dwell_max_secs: 60.0,

            trail_len: 60,
            activity_len: 20,
        }
    }
}

impl SimulationConfig {
    /// Ticks per simulated minute, used to convert %/min rates to %/tick
    pub fn ticks_per_minute(&self) -> f64 {
        60.0 / self.tick_interval_secs
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs <= 0.0 {
            return Err(FleetError::InvalidConfig(
                "tick_interval_secs must be positive".into(),
            ));
        }
        if self.detection_every_ticks == 0 {
            return Err(FleetError::InvalidConfig(
                "detection_every_ticks must be at least 1".into(),
            ));
        }
        if self.min_speed > self.max_speed {
            return Err(FleetError::InvalidConfig(format!(
                "min_speed ({}) should be <= max_speed ({})",
                self.min_speed, self.max_speed
            )));
        }
        if self.error_dwell_min_secs > self.error_dwell_max_secs {
            return Err(FleetError::InvalidConfig(format!(
                "error_dwell_min_secs ({}) should be <= error_dwell_max_secs ({})",
                self.error_dwell_min_secs, self.error_dwell_max_secs
            )));
        }
        if self.low_battery_threshold >= self.charged_threshold {
            return Err(FleetError::InvalidConfig(format!(
                "low_battery_threshold ({}) should be < charged_threshold ({})",
                self.low_battery_threshold, self.charged_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.task_start_probability) {
            return Err(FleetError::InvalidConfig(
                "task_start_probability must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the conflict and alert engine
///
/// Distances are in grid units, durations in simulated seconds. The
/// defaults were tuned for 24 robots on a 40x30 grid; larger or denser
/// fleets will want to scale the proximity thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    // === LIFECYCLE ===
    /// Hard cap on unresolved alerts, also the length of the active list
    pub max_active_alerts: usize,

    /// Minimum time between two admissions of the same fingerprint
    pub cooldown_secs: f64,

    /// An undetected condition's alert resolves once older than this
    pub stale_secs: f64,

    /// Resolved alerts are purged after this long
    pub resolved_ttl_secs: f64,

    // === DEADLOCK ===
    pub deadlock_distance: f64,

    // === COLLISION COURSE ===
    /// Only pairs closer than this are projected
    pub collision_scan_distance: f64,

    /// Projection step
    pub collision_step_secs: f64,

    /// Furthest projection offset
    pub collision_horizon_secs: f64,

    /// Projected separation below which a pair is on a collision course
    pub collision_distance: f64,

    // === CONGESTION ===
    /// Zone occupancy at which congestion is reported
    pub congestion_threshold: usize,

    /// Occupants named in the congestion description
    pub congestion_listed: usize,

    // === BATTERY ===
    /// Robots above this level are not evaluated
    pub battery_watch_threshold: f64,

    /// Below this level a battery alert is critical rather than a warning
    pub battery_critical_threshold: f64,

    /// Safety margin added to the estimated need (percentage points)
    pub battery_margin_pct: f64,

    /// Travel speed assumed when estimating the trip to a charger
    pub assumed_travel_speed: f64,

    // === PATH BLOCKED ===
    pub path_block_distance: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_active_alerts: 8,
            cooldown_secs: 120.0,
            stale_secs: 90.0,
            resolved_ttl_secs: 30.0,

            deadlock_distance: 5.0,

            collision_scan_distance: 15.0,
            collision_step_secs: 5.0,
            collision_horizon_secs: 20.0,
            collision_distance: 2.0,

            congestion_threshold: 8,
            congestion_listed: 5,

            battery_watch_threshold: 25.0,
            battery_critical_threshold: 10.0,
            battery_margin_pct: 5.0,
            assumed_travel_speed: 1.0,

            path_block_distance: 3.0,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_active_alerts == 0 {
            return Err(FleetError::InvalidConfig(
                "max_active_alerts must be at least 1".into(),
            ));
        }
        if self.collision_step_secs <= 0.0 || self.collision_horizon_secs < self.collision_step_secs {
            return Err(FleetError::InvalidConfig(format!(
                "collision projection needs 0 < step ({}) <= horizon ({})",
                self.collision_step_secs, self.collision_horizon_secs
            )));
        }
        if self.battery_critical_threshold > self.battery_watch_threshold {
            return Err(FleetError::InvalidConfig(format!(
                "battery_critical_threshold ({}) should be <= battery_watch_threshold ({})",
                self.battery_critical_threshold, self.battery_watch_threshold
            )));
        }
        if self.assumed_travel_speed <= 0.0 {
            return Err(FleetError::InvalidConfig(
                "assumed_travel_speed must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Projection offsets for the collision pass (5, 10, 15, 20 by default)
    pub fn collision_offsets(&self) -> impl Iterator<Item = f64> + '_ {
        let steps = (self.collision_horizon_secs / self.collision_step_secs).floor() as usize;
        (1..=steps).map(move |i| i as f64 * self.collision_step_secs)
    }
}
