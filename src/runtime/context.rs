//! The fleet context: one simulator, one conflict engine
//!
//! Owned by the driver. Everything that used to be process-wide state is
//! reachable from here, so tests can build as many independent fleets as
//! they like.

use ahash::AHashSet;
use serde::Serialize;

use crate::alerts::{Alert, ConflictEngine};
use crate::core::config::FleetConfig;
use crate::core::error::Result;
use crate::core::types::{AlertId, RobotId, SimTime, Tick};
use crate::fleet::{
    Command, CommandError, CommandOutcome, FleetSimulator, FleetSummary, RobotSnapshot,
    RobotStatus,
};

/// What one call to [`FleetContext::step`] did
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub tick: Tick,
    pub time: SimTime,
    /// Whether detection ran on this tick
    pub detected: bool,
    pub new_alerts: Vec<Alert>,
    /// Robots that entered the error state during this tick
    pub newly_errored: Vec<RobotId>,
    /// Robots that left the error state during this tick
    pub recovered: Vec<RobotId>,
}

/// Frame published to subscribers after each tick
#[derive(Debug, Clone, Serialize)]
pub struct FleetUpdate {
    pub tick: Tick,
    pub time: SimTime,
    pub summary: FleetSummary,
    pub robots: Vec<RobotSnapshot>,
    pub alerts: Vec<Alert>,
}

pub struct FleetContext {
    pub simulator: FleetSimulator,
    pub engine: ConflictEngine,
    errored: AHashSet<RobotId>,
}

impl FleetContext {
    /// Reference fleet plus a conflict engine built from the same config
    pub fn new(config: &FleetConfig) -> Result<Self> {
        config.validate()?;
        let simulator = FleetSimulator::with_default_fleet(config)?;
        let engine = ConflictEngine::new(
            config.detection.clone(),
            simulator.facility().clone(),
            config.vendors.clone(),
        );
        Ok(Self::from_parts(simulator, engine))
    }

    /// Wrap an already populated simulator
    pub fn from_parts(simulator: FleetSimulator, engine: ConflictEngine) -> Self {
        let errored = errored_set(&simulator);
        Self {
            simulator,
            engine,
            errored,
        }
    }

    /// Advance the fleet one tick and run detection when it is due
    pub fn step(&mut self) -> StepReport {
        self.simulator.tick();
        let tick = self.simulator.tick_count();
        let time = self.simulator.now();

        let now_errored = errored_set(&self.simulator);
        let mut newly_errored: Vec<RobotId> = now_errored
            .iter()
            .filter(|id| !self.errored.contains(*id))
            .cloned()
            .collect();
        newly_errored.sort();
        let mut recovered: Vec<RobotId> = self
            .errored
            .iter()
            .filter(|id| !now_errored.contains(*id))
            .cloned()
            .collect();
        recovered.sort();
        self.errored = now_errored;

        let detected = tick % self.simulator.config().detection_every_ticks == 0;
        let new_alerts = if detected {
            self.engine.check_all(&self.simulator.fleet_snapshot())
        } else {
            Vec::new()
        };

        StepReport {
            tick,
            time,
            detected,
            new_alerts,
            newly_errored,
            recovered,
        }
    }

    pub fn command(
        &mut self,
        id: &RobotId,
        command: Command,
    ) -> std::result::Result<CommandOutcome, CommandError> {
        self.simulator.command(id, command)
    }

    pub fn acknowledge(&mut self, id: &AlertId) -> bool {
        self.engine.acknowledge(id)
    }

    pub fn resolve(&mut self, id: &AlertId) -> bool {
        self.engine.resolve(id)
    }

    /// Current state of the whole fleet as one frame
    pub fn update(&self) -> FleetUpdate {
        FleetUpdate {
            tick: self.simulator.tick_count(),
            time: self.simulator.now(),
            summary: self.simulator.fleet_summary(),
            robots: self.simulator.snapshots(),
            alerts: self.engine.active_alerts(),
        }
    }
}

fn errored_set(sim: &FleetSimulator) -> AHashSet<RobotId> {
    sim.robots()
        .iter()
        .filter(|r| r.status == RobotStatus::Error)
        .map(|r| r.id.clone())
        .collect()
}
