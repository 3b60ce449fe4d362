//! Operator commands against a single robot

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::SimulationConfig;
use crate::core::types::{Position, RobotId, SimTime, TaskId};
use crate::facility::{Facility, Site};
use crate::fleet::catalog;
use crate::fleet::lifecycle::{self, TaskIdAllocator};
use crate::fleet::robot::{ActivityKind, RobotRecord, RobotStatus, TaskKind};
use crate::fleet::vendor::VendorTable;

/// A command an operator can issue to a robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Pause,
    Resume,
    SendToCharging,
    AssignTask {
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        task_type: Option<String>,
        #[serde(default)]
        catalog_id: Option<String>,
    },
    ClearError,
    TakeOffline,
    BringOnline,
}

/// Optional arguments accompanying a command name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub task_type: Option<String>,
    pub catalog_id: Option<String>,
}

impl Command {
    /// Resolve a command by its wire name (`pause`, `assign_task`, ...)
    pub fn from_name(name: &str, params: CommandParams) -> Result<Self, CommandError> {
        let cmd = match name {
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "send_to_charging" => Command::SendToCharging,
            "assign_task" => Command::AssignTask {
                from: params.from,
                to: params.to,
                task_type: params.task_type,
                catalog_id: params.catalog_id,
            },
            "clear_error" => Command::ClearError,
            "take_offline" => Command::TakeOffline,
            "bring_online" => Command::BringOnline,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::SendToCharging => "send_to_charging",
            Command::AssignTask { .. } => "assign_task",
            Command::ClearError => "clear_error",
            Command::TakeOffline => "take_offline",
            Command::BringOnline => "bring_online",
        }
    }
}

/// What a successful command did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Done {
        robot_id: RobotId,
        status: RobotStatus,
    },
    ChargingDispatched {
        robot_id: RobotId,
        task_id: TaskId,
        charger: String,
        charger_position: Position,
        robot_position: Position,
    },
    TaskAssigned {
        robot_id: RobotId,
        task_id: TaskId,
        task_name: String,
        from: String,
        to: String,
        destination: Position,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Robot not found: {0}")]
    RobotNotFound(RobotId),

    #[error("Cannot {command} {robot} while {status:?}")]
    InvalidState {
        robot: RobotId,
        command: &'static str,
        status: RobotStatus,
    },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Facility has no {0} available")]
    Unavailable(&'static str),

    #[error("Task {task} cannot run on {robot} ({family} family)")]
    UnsuitableTask {
        robot: RobotId,
        task: &'static str,
        family: &'static str,
    },
}

/// Everything a command may touch besides the robot itself
pub struct CommandEnv<'a, R: Rng> {
    pub now: SimTime,
    pub rng: &'a mut R,
    pub ids: &'a mut TaskIdAllocator,
    pub config: &'a SimulationConfig,
    pub vendors: &'a VendorTable,
    pub facility: &'a Facility,
}

/// Validate `command` against the robot's state and apply it
pub fn execute<R: Rng>(
    robot: &mut RobotRecord,
    command: Command,
    env: &mut CommandEnv<'_, R>,
) -> Result<CommandOutcome, CommandError> {
    let name = command.name();
    let reject = |robot: &RobotRecord| CommandError::InvalidState {
        robot: robot.id.clone(),
        command: name,
        status: robot.status,
    };

    match command {
        Command::Pause => {
            if robot.status != RobotStatus::Active {
                return Err(reject(robot));
            }
            robot.status = RobotStatus::Idle;
            robot.speed = 0.0;
            robot.log(env.now, "Paused by operator", ActivityKind::Command);
            Ok(done(robot))
        }
        Command::Resume => {
            if robot.status != RobotStatus::Idle || robot.task.is_none() {
                return Err(reject(robot));
            }
            let profile = env.vendors.get(robot.vendor);
            robot.status = RobotStatus::Active;
            robot.speed = if profile.cruise_speed_max > profile.cruise_speed_min {
                env.rng
                    .gen_range(profile.cruise_speed_min..=profile.cruise_speed_max)
            } else {
                profile.cruise_speed_min
            };
            robot.log(env.now, "Resumed by operator", ActivityKind::Command);
            Ok(done(robot))
        }
        Command::SendToCharging => {
            if matches!(robot.status, RobotStatus::Error | RobotStatus::Offline) {
                return Err(reject(robot));
            }
            let charger = env
                .facility
                .nearest_charger(robot.position)
                .map(|fix| fix.charger.clone())
                .ok_or(CommandError::Unavailable("charger"))?;
            let task_id = lifecycle::head_to_charger(
                robot,
                &charger,
                env.facility,
                env.now,
                env.config.dispatch_charging_speed,
                env.ids,
                "sent to charging",
            );
            robot.log(
                env.now,
                format!("Sent to {} for charging", charger.name),
                ActivityKind::Command,
            );
            Ok(CommandOutcome::ChargingDispatched {
                robot_id: robot.id.clone(),
                task_id,
                charger: charger.name,
                charger_position: charger.position,
                robot_position: robot.position,
            })
        }
        Command::AssignTask {
            from,
            to,
            task_type,
            catalog_id,
        } => {
            if matches!(robot.status, RobotStatus::Error | RobotStatus::Offline) {
                return Err(reject(robot));
            }
            let entry = catalog_id.as_deref().and_then(catalog::find);
            if let Some(def) = entry.filter(|def| !def.runs_on(robot.vendor)) {
                return Err(CommandError::UnsuitableTask {
                    robot: robot.id.clone(),
                    task: def.id,
                    family: robot.vendor.family(),
                });
            }
            let (origin, destination) =
                pick_stations(env.facility, from.as_deref(), to.as_deref(), &mut *env.rng)?;

            let (kind, label, speed_range) = match entry {
                Some(def) => (TaskKind::Catalog, def.name.to_string(), def.speed_range),
                None => {
                    let profile = env.vendors.get(robot.vendor);
                    let kind = TaskKind::parse(task_type.as_deref().unwrap_or("transport"));
                    (
                        kind,
                        kind.label().to_string(),
                        (profile.cruise_speed_min, profile.cruise_speed_max),
                    )
                }
            };

            robot.cancel_task(env.now, "reassigned by operator");
            let task_id = lifecycle::begin_task(
                robot,
                &mut *env.rng,
                env.ids,
                env.now,
                kind,
                label.clone(),
                &origin,
                &destination,
                speed_range,
                entry.map(|def| def.id.to_string()),
            );
            Ok(CommandOutcome::TaskAssigned {
                robot_id: robot.id.clone(),
                task_id,
                task_name: label,
                from: origin.name,
                to: destination.name,
                destination: destination.position,
            })
        }
        Command::ClearError => {
            if robot.status != RobotStatus::Error {
                return Err(reject(robot));
            }
            robot.status = RobotStatus::Idle;
            robot.speed = 0.0;
            robot.error_started_at = None;
            if let Some(fault) = robot.fault.as_mut() {
                fault.resolve(env.now);
            }
            robot.log(env.now, "Error cleared by operator", ActivityKind::Command);
            Ok(done(robot))
        }
        Command::TakeOffline => {
            if robot.status == RobotStatus::Offline {
                return Err(reject(robot));
            }
            robot.cancel_task(env.now, "taken offline");
            if robot.status == RobotStatus::Error {
                if let Some(fault) = robot.fault.as_mut() {
                    fault.resolve(env.now);
                }
            }
            robot.status = RobotStatus::Offline;
            robot.speed = 0.0;
            robot.error_started_at = None;
            robot.log(env.now, "Taken offline by operator", ActivityKind::Command);
            Ok(done(robot))
        }
        Command::BringOnline => {
            if robot.status != RobotStatus::Offline {
                return Err(reject(robot));
            }
            robot.status = RobotStatus::Idle;
            robot.log(env.now, "Brought online by operator", ActivityKind::Command);
            Ok(done(robot))
        }
    }
}

fn done(robot: &RobotRecord) -> CommandOutcome {
    CommandOutcome::Done {
        robot_id: robot.id.clone(),
        status: robot.status,
    }
}

/// Resolve requested stations, auto-picking unknown or missing ones
fn pick_stations<R: Rng>(
    facility: &Facility,
    from: Option<&str>,
    to: Option<&str>,
    rng: &mut R,
) -> Result<(Site, Site), CommandError> {
    let random_pair = |rng: &mut R| {
        facility
            .random_station_pair(rng)
            .map(|(a, b)| (a.clone(), b.clone()))
            .ok_or(CommandError::Unavailable("station pair"))
    };

    let origin = match from.and_then(|name| facility.station(name)) {
        Some(site) => site.clone(),
        None => random_pair(&mut *rng)?.0,
    };
    let mut destination = match to.and_then(|name| facility.station(name)) {
        Some(site) => site.clone(),
        None => random_pair(&mut *rng)?.1,
    };
    if destination.name == origin.name {
        destination = facility
            .random_station_except(&origin.name, rng)
            .cloned()
            .ok_or(CommandError::Unavailable("second station"))?;
    }
    Ok((origin, destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FleetConfig;
    use crate::fleet::vendor::Vendor;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Harness {
        config: FleetConfig,
        rng: ChaCha8Rng,
        ids: TaskIdAllocator,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                config: FleetConfig::deterministic(),
                rng: ChaCha8Rng::seed_from_u64(11),
                ids: TaskIdAllocator::default(),
            }
        }

        fn run(
            &mut self,
            robot: &mut RobotRecord,
            command: Command,
        ) -> Result<CommandOutcome, CommandError> {
            let mut env = CommandEnv {
                now: 10.0,
                rng: &mut self.rng,
                ids: &mut self.ids,
                config: &self.config.simulation,
                vendors: &self.config.vendors,
                facility: &self.config.facility,
            };
            execute(robot, command, &mut env)
        }
    }

    fn robot() -> RobotRecord {
        RobotRecord::new(
            RobotId::new("BALYO-001"),
            Vendor::Balyo,
            Position::new(19.0, 3.0),
            70.0,
            0.0,
            60,
            20,
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
    fn test_from_name() {
        assert_eq!(
            Command::from_name("pause", CommandParams::default()),
            Ok(Command::Pause)
        );
        assert_eq!(
            Command::from_name("self_destruct", CommandParams::default()),
            Err(CommandError::UnknownCommand("self_destruct".into()))
        );
    }

    #[test]
    fn test_pause_keeps_task_and_resume_restores() {
        let mut h = Harness::new();
        let mut r = robot();
        h.run(&mut r, assign("Station 1", "Station 6")).unwrap();

        h.run(&mut r, Command::Pause).unwrap();
        assert_eq!(r.status, RobotStatus::Idle);
        assert_eq!(r.speed, 0.0);
        assert!(r.task.is_some());

        h.run(&mut r, Command::Resume).unwrap();
        assert_eq!(r.status, RobotStatus::Active);
        assert!(r.speed >= 1.2 && r.speed <= 2.8);
    }

    #[test]
    fn test_pause_requires_active() {
        let mut h = Harness::new();
        let mut r = robot();
        let err = h.run(&mut r, Command::Pause).unwrap_err();
        assert!(matches!(
            err,
            CommandError::InvalidState {
                command: "pause",
                status: RobotStatus::Idle,
                ..
            }
        ));
    }

    #[test]
    fn test_resume_without_task_rejected() {
        let mut h = Harness::new();
        let mut r = robot();
        assert!(h.run(&mut r, Command::Resume).is_err());
    }

    #[test]
    fn test_send_to_charging_reports_nearest_charger() {
        let mut h = Harness::new();
        let mut r = robot();
        let outcome = h.run(&mut r, Command::SendToCharging).unwrap();
        match outcome {
            CommandOutcome::ChargingDispatched {
                charger,
                robot_position,
                ..
            } => {
                assert_eq!(charger, "Charger C2");
                assert_eq!(robot_position, Position::new(19.0, 3.0));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(r.status, RobotStatus::Active);
        assert_eq!(r.speed, 1.5);
        assert!(r.task.as_ref().unwrap().is_charging_trip());
    }

    #[test]
    fn test_send_to_charging_rejected_in_error() {
        let mut h = Harness::new();
        let mut r = robot();
        r.status = RobotStatus::Error;
        assert!(h.run(&mut r, Command::SendToCharging).is_err());
        assert!(r.task.is_none());
    }

    #[test]
    fn test_assign_task_with_catalog_entry() {
        let mut h = Harness::new();
        let mut r = robot();
        let outcome = h
            .run(
                &mut r,
                Command::AssignTask {
                    from: Some("Station 2".into()),
                    to: Some("Station 9".into()),
                    task_type: None,
                    catalog_id: Some("sort_package".into()),
                },
            )
            .unwrap();
        match outcome {
            CommandOutcome::TaskAssigned {
                task_name,
                from,
                to,
                destination,
                ..
            } => {
                assert_eq!(task_name, "Sort Package");
                assert_eq!(from, "Station 2");
                assert_eq!(to, "Station 9");
                assert_eq!(destination, Position::new(17.0, 12.0));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let task = r.task.as_ref().unwrap();
        assert_eq!(task.catalog_id.as_deref(), Some("sort_package"));
        assert!(r.speed >= 1.5 && r.speed <= 3.5);
    }

    #[test]
    fn test_assign_task_rejects_catalog_entry_of_other_family() {
        let mut h = Harness::new();
        let mut r = robot();
        h.run(&mut r, assign("Station 1", "Station 2")).unwrap();
        let before = r.task.clone();

        let err = h
            .run(
                &mut r,
                Command::AssignTask {
                    from: None,
                    to: None,
                    task_type: None,
                    catalog_id: Some("move_pod".into()),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::UnsuitableTask {
                robot: RobotId::new("BALYO-001"),
                task: "move_pod",
                family: "Balyo",
            }
        );
        // The running task is left alone
        assert_eq!(r.task, before);
        assert_eq!(r.status, RobotStatus::Active);
    }

    #[test]
    fn test_assign_task_repicks_identical_stations() {
        let mut h = Harness::new();
        let mut r = robot();
        let outcome = h.run(&mut r, assign("Station 3", "Station 3")).unwrap();
        match outcome {
            CommandOutcome::TaskAssigned { from, to, .. } => {
                assert_eq!(from, "Station 3");
                assert_ne!(to, "Station 3");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_assign_task_unknown_stations_autopicked() {
        let mut h = Harness::new();
        let mut r = robot();
        let outcome = h.run(&mut r, assign("Dock 99", "Nowhere")).unwrap();
        match outcome {
            CommandOutcome::TaskAssigned { from, to, .. } => {
                assert!(h.config.facility.station(&from).is_some());
                assert!(h.config.facility.station(&to).is_some());
                assert_ne!(from, to);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_clear_error() {
        let mut h = Harness::new();
        let mut r = robot();
        assert!(h.run(&mut r, Command::ClearError).is_err());

        r.status = RobotStatus::Error;
        r.error_started_at = Some(5.0);
        h.run(&mut r, Command::ClearError).unwrap();
        assert_eq!(r.status, RobotStatus::Idle);
        assert!(r.error_started_at.is_none());
    }

    #[test]
    fn test_offline_round_trip() {
        let mut h = Harness::new();
        let mut r = robot();
        h.run(&mut r, assign("Station 1", "Station 2")).unwrap();

        h.run(&mut r, Command::TakeOffline).unwrap();
        assert_eq!(r.status, RobotStatus::Offline);
        assert!(r.task.is_none());
        let retry = Command::AssignTask {
            from: None,
            to: None,
            task_type: None,
            catalog_id: None,
        };
        assert!(h.run(&mut r, retry).is_err());

        h.run(&mut r, Command::BringOnline).unwrap();
        assert_eq!(r.status, RobotStatus::Idle);
        assert!(h.run(&mut r, Command::BringOnline).is_err());
    }
}
