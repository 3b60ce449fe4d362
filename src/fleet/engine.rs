//! Fleet simulation engine
//!
//! Owns every robot record and advances them one fixed-interval tick at a
//! time. All randomness comes from a single seeded [`ChaCha8Rng`], so two
//! simulators built from the same config evolve identically.

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::core::config::{FleetConfig, SimulationConfig};
use crate::core::error::{FleetError, Result};
use crate::core::types::{Position, RobotId, SimTime, Tick};
use crate::facility::Facility;
use crate::fleet::command::{self, Command, CommandEnv, CommandError, CommandOutcome};
use crate::fleet::lifecycle::{self, TaskIdAllocator, TickContext};
use crate::fleet::robot::{ActivityEntry, ErrorRecord, RobotRecord, RobotStatus};
use crate::fleet::snapshot::{FleetSnapshot, RobotSnapshot};
use crate::fleet::vendor::{Vendor, VendorTable};

/// Task durations reported by [`FleetSimulator::robot_history`]
const HISTORY_DURATIONS: usize = 20;

pub struct FleetSimulator {
    config: SimulationConfig,
    vendors: VendorTable,
    facility: Arc<Facility>,
    robots: Vec<RobotRecord>,
    index: AHashMap<RobotId, usize>,
    rng: ChaCha8Rng,
    tick_count: Tick,
    task_ids: TaskIdAllocator,
}

impl FleetSimulator {
    /// Empty simulator seeded from the config
    ///
    /// Rejects configs the tick loop cannot run with, such as an inverted
    /// speed range.
    pub fn new(config: &FleetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.simulation.clone(),
            vendors: config.vendors.clone(),
            facility: Arc::new(config.facility.clone()),
            robots: Vec::new(),
            index: AHashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tick_count: 0,
            task_ids: TaskIdAllocator::default(),
        })
    }

    /// Replace the random source
    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.rng = rng;
        self
    }

    /// The reference fleet: 8 Amazon Normal, 12 Balyo and 4 Amazon Internal
    /// robots, some of them starting with a task
    pub fn with_default_fleet(config: &FleetConfig) -> Result<Self> {
        let mut sim = Self::new(config)?;

        let ar = [
            (5.0, 5.0), (12.0, 5.0), (5.0, 10.0), (12.0, 10.0),
            (18.0, 5.0), (25.0, 5.0), (18.0, 10.0), (25.0, 10.0),
        ];
        let balyo = [
            (3.0, 17.0), (10.0, 17.0), (17.0, 17.0), (24.0, 17.0),
            (31.0, 17.0), (37.0, 17.0), (3.0, 24.0), (10.0, 24.0),
            (17.0, 24.0), (24.0, 24.0), (31.0, 24.0), (37.0, 24.0),
        ];
        let amzn = [(8.0, 7.0), (20.0, 15.0), (32.0, 7.0), (20.0, 22.0)];

        for (vendor, positions, battery_range) in [
            (Vendor::AmazonNormal, &ar[..], (40.0, 100.0)),
            (Vendor::Balyo, &balyo[..], (40.0, 100.0)),
            (Vendor::AmazonInternal, &amzn[..], (30.0, 90.0)),
        ] {
            for (i, &(x, y)) in positions.iter().enumerate() {
                let id = RobotId::new(format!("{}-{:03}", vendor.id_prefix(), i + 1));
                let battery = sim.rng.gen_range(battery_range.0..=battery_range.1);
                sim.spawn_robot(id, vendor, Position::new(x, y), battery)?;
            }
        }

        let mut order: Vec<usize> = (0..sim.robots.len()).collect();
        order.shuffle(&mut sim.rng);
        order.truncate(sim.config.initial_tasks);

        let ctx = TickContext {
            now: 0.0,
            config: &sim.config,
            vendors: &sim.vendors,
            facility: &sim.facility,
        };
        for idx in order {
            lifecycle::start_random_task(
                &mut sim.robots[idx],
                &mut sim.rng,
                &ctx,
                &mut sim.task_ids,
            );
        }

        tracing::info!(
            "Fleet initialised with {} robots, {} tasks issued",
            sim.robots.len(),
            sim.task_ids.issued()
        );
        Ok(sim)
    }

    /// Add an idle robot with a random heading
    pub fn spawn_robot(
        &mut self,
        id: RobotId,
        vendor: Vendor,
        position: Position,
        battery: f64,
    ) -> Result<&mut RobotRecord> {
        if self.index.contains_key(&id) {
            return Err(FleetError::DuplicateRobot(id));
        }
        let heading = self.rng.gen_range(0.0..360.0);
        let record = RobotRecord::new(
            id.clone(),
            vendor,
            self.facility.clamp(position),
            battery,
            heading,
            self.config.trail_len,
            self.config.activity_len,
        );
        let idx = self.robots.len();
        self.robots.push(record);
        self.index.insert(id, idx);
        Ok(&mut self.robots[idx])
    }

    /// Advance every robot by one tick, in spawn order
    pub fn tick(&mut self) {
        self.tick_count += 1;
        let ctx = TickContext {
            now: self.tick_count as f64 * self.config.tick_interval_secs,
            config: &self.config,
            vendors: &self.vendors,
            facility: &self.facility,
        };
        for robot in self.robots.iter_mut() {
            lifecycle::step(robot, &mut self.rng, &ctx, &mut self.task_ids);
        }
        tracing::trace!("Tick {} complete", self.tick_count);
    }

    pub fn tick_count(&self) -> Tick {
        self.tick_count
    }

    /// Simulated seconds since the fleet was created
    pub fn now(&self) -> SimTime {
        self.tick_count as f64 * self.config.tick_interval_secs
    }

    pub fn facility(&self) -> &Arc<Facility> {
        &self.facility
    }

    pub fn vendors(&self) -> &VendorTable {
        &self.vendors
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn robots(&self) -> &[RobotRecord] {
        &self.robots
    }

    pub fn robot(&self, id: &RobotId) -> Option<&RobotRecord> {
        self.index.get(id).map(|&idx| &self.robots[idx])
    }

    /// Direct mutable access, for scenario setup
    pub fn robot_mut(&mut self, id: &RobotId) -> Option<&mut RobotRecord> {
        let idx = *self.index.get(id)?;
        self.robots.get_mut(idx)
    }

    pub fn snapshots(&self) -> Vec<RobotSnapshot> {
        let now = self.now();
        self.robots
            .iter()
            .map(|r| RobotSnapshot::from_record(r, &self.facility, now))
            .collect()
    }

    pub fn snapshot_of(&self, id: &RobotId) -> Option<RobotSnapshot> {
        self.robot(id)
            .map(|r| RobotSnapshot::from_record(r, &self.facility, self.now()))
    }

    pub fn fleet_snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            tick: self.tick_count,
            time: self.now(),
            robots: self.snapshots(),
        }
    }

    /// Apply an operator command to one robot
    pub fn command(
        &mut self,
        id: &RobotId,
        command: Command,
    ) -> std::result::Result<CommandOutcome, CommandError> {
        let now = self.now();
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| CommandError::RobotNotFound(id.clone()))?;
        let name = command.name();
        let mut env = CommandEnv {
            now,
            rng: &mut self.rng,
            ids: &mut self.task_ids,
            config: &self.config,
            vendors: &self.vendors,
            facility: &self.facility,
        };
        let result = command::execute(&mut self.robots[idx], command, &mut env);
        match &result {
            Ok(_) => tracing::info!("Command {} applied to {}", name, id),
            Err(e) => tracing::debug!("Command {} rejected: {}", name, e),
        }
        result
    }

    /// Status and vendor counts
    pub fn fleet_summary(&self) -> FleetSummary {
        let mut summary = FleetSummary {
            total_robots: self.robots.len(),
            ..FleetSummary::default()
        };
        for robot in &self.robots {
            match robot.status {
                RobotStatus::Active => summary.active += 1,
                RobotStatus::Idle => summary.idle += 1,
                RobotStatus::Error => summary.error += 1,
                RobotStatus::Charging => summary.charging += 1,
                RobotStatus::Offline => summary.offline += 1,
            }
            match robot.vendor {
                Vendor::AmazonNormal => summary.vendors.amazon_normal += 1,
                Vendor::Balyo => summary.vendors.balyo += 1,
                Vendor::AmazonInternal => summary.vendors.amazon_internal += 1,
            }
        }
        summary
    }

    pub fn robot_history(&self, id: &RobotId) -> Option<RobotHistory> {
        let robot = self.robot(id)?;
        let durations = &robot.stats.task_durations;
        let recent = durations[durations.len().saturating_sub(HISTORY_DURATIONS)..].to_vec();
        Some(RobotHistory {
            robot_id: robot.id.clone(),
            tasks_completed: robot.stats.tasks_completed,
            total_distance: robot.stats.total_distance,
            total_error_time: robot.stats.total_error_time,
            total_charge_time: robot.stats.total_charge_time,
            average_task_secs: robot.stats.average_task_secs(),
            trail: robot.trail.iter().copied().collect(),
            activity: robot.activity.iter().cloned().collect(),
            error_history: robot.error_history.clone(),
            task_durations: recent,
        })
    }

    /// Error counts per code and per zone for one robot
    pub fn error_pattern(&self, id: &RobotId) -> Option<ErrorPattern> {
        let robot = self.robot(id)?;
        let mut by_code: Vec<CodeCount> = Vec::new();
        let mut by_zone: Vec<(String, usize)> = Vec::new();

        for err in &robot.error_history {
            match by_code.iter_mut().find(|c| c.code == err.code) {
                Some(entry) => entry.count += 1,
                None => by_code.push(CodeCount {
                    code: err.code.clone(),
                    name: err.name.clone(),
                    count: 1,
                }),
            }
            match by_zone.iter_mut().find(|(zone, _)| *zone == err.zone) {
                Some((_, count)) => *count += 1,
                None => by_zone.push((err.zone.clone(), 1)),
            }
        }
        // Stable sort keeps first-seen order among equal counts
        by_code.sort_by(|a, b| b.count.cmp(&a.count));
        by_zone.sort_by(|a, b| b.1.cmp(&a.1));

        Some(ErrorPattern {
            robot_id: robot.id.clone(),
            total_errors: robot.error_history.len(),
            most_common: by_code.first().map(|c| c.code.clone()),
            by_code,
            by_zone,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VendorCounts {
    pub amazon_normal: usize,
    pub balyo: usize,
    pub amazon_internal: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total_robots: usize,
    pub active: usize,
    pub idle: usize,
    pub error: usize,
    pub charging: usize,
    pub offline: usize,
    pub vendors: VendorCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotHistory {
    pub robot_id: RobotId,
    pub tasks_completed: u32,
    pub total_distance: f64,
    pub total_error_time: f64,
    pub total_charge_time: f64,
    pub average_task_secs: Option<f64>,
    pub trail: Vec<Position>,
    pub activity: Vec<ActivityEntry>,
    pub error_history: Vec<ErrorRecord>,
    /// Most recent completed task durations, oldest first
    pub task_durations: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeCount {
    pub code: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPattern {
    pub robot_id: RobotId,
    pub total_errors: usize,
    pub most_common: Option<String>,
    pub by_code: Vec<CodeCount>,
    pub by_zone: Vec<(String, usize)>,
}
