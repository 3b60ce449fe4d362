//! Per-robot state machine
//!
//! One call to [`step`] applies a single tick to a single robot:
//! trail -> fault recovery -> battery -> movement -> task pickup -> fault
//! injection. Robots never see each other here; proximity problems are the
//! conflict engine's business.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{Position, SimTime, TaskId};
use crate::facility::{Facility, Site};
use crate::fleet::faults;
use crate::fleet::robot::{
    ActiveFault, ActivityKind, ErrorRecord, RobotRecord, RobotStatus, Task, TaskKind, TaskStatus,
};
use crate::fleet::vendor::VendorTable;

/// Shared read-only inputs for one tick
pub struct TickContext<'a> {
    pub now: SimTime,
    pub config: &'a SimulationConfig,
    pub vendors: &'a VendorTable,
    pub facility: &'a Facility,
}

/// Sequential task id source (`T-0001`, `T-0002`, ...)
#[derive(Debug, Clone, Default)]
pub struct TaskIdAllocator {
    issued: u32,
}

impl TaskIdAllocator {
    pub fn next(&mut self) -> TaskId {
        self.issued += 1;
        TaskId::from_counter(self.issued)
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }
}

/// Advance one robot by one tick
pub fn step<R: Rng>(
    robot: &mut RobotRecord,
    rng: &mut R,
    ctx: &TickContext<'_>,
    ids: &mut TaskIdAllocator,
) {
    robot.record_trail();

    match robot.status {
        RobotStatus::Error => {
            maybe_recover(robot, ctx);
            return;
        }
        RobotStatus::Offline => return,
        _ => {}
    }

    update_battery(robot, ctx, ids);

    if robot.status == RobotStatus::Charging {
        return;
    }

    if robot.status == RobotStatus::Active {
        advance(robot, rng, ctx);
    }

    // Paused robots keep their suspended task and wait for a resume
    if robot.status == RobotStatus::Idle
        && robot.task.is_none()
        && ctx.config.task_start_probability > 0.0
        && rng.gen_bool(ctx.config.task_start_probability)
    {
        start_random_task(robot, rng, ctx, ids);
    }

    maybe_fault(robot, rng, ctx);
}

/// Auto-recovery once the drawn dwell has elapsed
fn maybe_recover(robot: &mut RobotRecord, ctx: &TickContext<'_>) {
    let Some(started) = robot.error_started_at else {
        return;
    };
    robot.stats.total_error_time += ctx.config.tick_interval_secs;

    if ctx.now - started >= robot.recover_after_secs {
        robot.status = RobotStatus::Idle;
        robot.speed = 0.0;
        robot.error_started_at = None;
        if let Some(fault) = robot.fault.as_mut() {
            fault.resolve(ctx.now);
        }
        robot.log(ctx.now, "Error resolved, resuming operations", ActivityKind::ErrorResolved);
        tracing::debug!("{} recovered after {:.1}s", robot.id, ctx.now - started);
    }
}

/// Drain or charge, then divert to a charger when the battery runs low
fn update_battery(robot: &mut RobotRecord, ctx: &TickContext<'_>, ids: &mut TaskIdAllocator) {
    let profile = ctx.vendors.get(robot.vendor);
    let per_minute = ctx.config.ticks_per_minute();

    match robot.status {
        RobotStatus::Charging => {
            robot.battery = (robot.battery + profile.charge_per_tick(per_minute)).min(100.0);
            robot.stats.total_charge_time += ctx.config.tick_interval_secs;
            if robot.battery >= ctx.config.charged_threshold {
                robot.status = RobotStatus::Idle;
                robot.speed = 0.0;
                robot.log(
                    ctx.now,
                    format!("Charged to {:.0}%", ctx.config.charged_threshold),
                    ActivityKind::ChargingComplete,
                );
                tracing::debug!("{} finished charging", robot.id);
            }
            return;
        }
        RobotStatus::Active | RobotStatus::Idle => {
            let mut drain = profile.drain_per_tick(per_minute);
            if robot.status == RobotStatus::Idle {
                drain *= ctx.config.idle_drain_factor;
            }
            robot.battery = (robot.battery - drain).max(0.0);
        }
        RobotStatus::Error | RobotStatus::Offline => return,
    }

    if robot.battery >= ctx.config.low_battery_threshold {
        return;
    }

    let Some(fix) = ctx.facility.nearest_charger(robot.position) else {
        return;
    };

    let on_charger_trip = robot.task.as_ref().is_some_and(|t| t.is_charging_trip());
    if fix.distance < ctx.config.docking_range {
        dock(robot, &fix.charger.name, ctx.now);
    } else if on_charger_trip {
        // A paused trip is picked up again rather than left to drain
        if robot.status == RobotStatus::Idle {
            robot.status = RobotStatus::Active;
            robot.speed = ctx.config.charger_approach_speed;
            robot.log(ctx.now, "Battery low, resuming charger trip", ActivityKind::TaskStarted);
            tracing::debug!("{} resumed its charger trip", robot.id);
        }
    } else {
        let charger = fix.charger.clone();
        head_to_charger(
            robot,
            &charger,
            ctx.facility,
            ctx.now,
            ctx.config.charger_approach_speed,
            ids,
            "navigating to charger",
        );
    }
}

/// Start charging in place
pub fn dock(robot: &mut RobotRecord, charger: &str, now: SimTime) {
    robot.cancel_task(now, "battery critical");
    robot.status = RobotStatus::Charging;
    robot.speed = 0.0;
    robot.log(
        now,
        format!("Docked at {} for charging ({:.0}%)", charger, robot.battery),
        ActivityKind::ChargingStart,
    );
    tracing::debug!("{} docked at {}", robot.id, charger);
}

/// Replace the current task with a trip to `charger`
pub fn head_to_charger(
    robot: &mut RobotRecord,
    charger: &Site,
    facility: &Facility,
    now: SimTime,
    speed: f64,
    ids: &mut TaskIdAllocator,
    reason: &str,
) -> TaskId {
    robot.cancel_task(now, reason);
    let distance = robot.position.distance(&charger.position);
    let id = ids.next();
    robot.task = Some(Task {
        id: id.clone(),
        kind: TaskKind::Charging,
        label: TaskKind::Charging.label().to_string(),
        origin: facility.zone_name(robot.position),
        destination: charger.name.clone(),
        origin_position: Some(robot.position),
        destination_position: charger.position,
        status: TaskStatus::InProgress,
        started_at: now,
        eta_seconds: Some(distance / speed.max(f64::EPSILON)),
        catalog_id: None,
    });
    robot.status = RobotStatus::Active;
    robot.speed = speed;
    id
}

/// Move toward the destination, completing the task on arrival
fn advance<R: Rng>(robot: &mut RobotRecord, rng: &mut R, ctx: &TickContext<'_>) {
    let Some(dest) = robot.destination() else {
        robot.status = RobotStatus::Idle;
        robot.speed = 0.0;
        return;
    };

    let remaining = robot.position.distance(&dest);
    if remaining < ctx.config.arrival_epsilon {
        arrive(robot, dest, ctx);
        return;
    }

    let jitter = ctx.config.speed_jitter;
    if jitter > 0.0 {
        robot.speed += rng.gen_range(-jitter..=jitter);
    }
    robot.speed = robot.speed.clamp(ctx.config.min_speed, ctx.config.max_speed);

    let step = robot.speed * ctx.config.tick_interval_secs;
    robot.heading = robot.position.bearing_to(&dest);

    if step >= remaining {
        arrive(robot, dest, ctx);
        return;
    }

    let old = robot.position;
    let next = old + (dest - old) * (step / remaining);
    robot.position = ctx.facility.clamp(next);
    robot.stats.total_distance += old.distance(&robot.position);

    let left = robot.position.distance(&dest);
    let eta = left / robot.speed.max(ctx.config.eta_speed_floor);
    if let Some(task) = robot.task.as_mut() {
        task.eta_seconds = Some(eta);
    }
}

fn arrive(robot: &mut RobotRecord, dest: Position, ctx: &TickContext<'_>) {
    let old = robot.position;
    robot.position = ctx.facility.clamp(dest);
    robot.stats.total_distance += old.distance(&robot.position);
    complete_task(robot, ctx.now);
}

/// Mark the current task completed and return to idle
pub fn complete_task(robot: &mut RobotRecord, now: SimTime) {
    if let Some(mut task) = robot.task.take() {
        task.status = TaskStatus::Completed;
        task.eta_seconds = Some(0.0);
        // Charger trips are logistics, not work
        if !task.is_charging_trip() {
            robot.stats.task_durations.push(now - task.started_at);
            robot.stats.tasks_completed += 1;
        }
        robot.log(now, format!("Completed task {}", task.id), ActivityKind::TaskCompleted);
        tracing::debug!("{} completed {} ({})", robot.id, task.id, task.label);
    }
    robot.status = RobotStatus::Idle;
    robot.speed = 0.0;
}

/// Begin a task between two stations at a speed drawn from `speed_range`
#[allow(clippy::too_many_arguments)]
pub fn begin_task<R: Rng>(
    robot: &mut RobotRecord,
    rng: &mut R,
    ids: &mut TaskIdAllocator,
    now: SimTime,
    kind: TaskKind,
    label: String,
    from: &Site,
    to: &Site,
    speed_range: (f64, f64),
    catalog_id: Option<String>,
) -> TaskId {
    let id = ids.next();
    robot.task = Some(Task {
        id: id.clone(),
        kind,
        label: label.clone(),
        origin: from.name.clone(),
        destination: to.name.clone(),
        origin_position: Some(from.position),
        destination_position: to.position,
        status: TaskStatus::InProgress,
        started_at: now,
        eta_seconds: None,
        catalog_id,
    });
    robot.status = RobotStatus::Active;
    robot.speed = draw_speed(rng, speed_range);
    robot.log(
        now,
        format!("Started task {}: {} from {} to {}", id, label, from.name, to.name),
        ActivityKind::TaskStarted,
    );
    id
}

fn draw_speed<R: Rng>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

pub(crate) fn start_random_task<R: Rng>(
    robot: &mut RobotRecord,
    rng: &mut R,
    ctx: &TickContext<'_>,
    ids: &mut TaskIdAllocator,
) {
    let Some((from, to)) = ctx.facility.random_station_pair(rng) else {
        return;
    };
    let (from, to) = (from.clone(), to.clone());
    let kind = *[TaskKind::Pickup, TaskKind::Delivery, TaskKind::Transport]
        .choose(rng)
        .unwrap_or(&TaskKind::Transport);
    let profile = ctx.vendors.get(robot.vendor);
    let id = begin_task(
        robot,
        rng,
        ids,
        ctx.now,
        kind,
        kind.label().to_string(),
        &from,
        &to,
        (profile.cruise_speed_min, profile.cruise_speed_max),
        None,
    );
    tracing::debug!("{} picked up {} ({} -> {})", robot.id, id, from.name, to.name);
}

/// Probabilistic fault injection for working robots
fn maybe_fault<R: Rng>(robot: &mut RobotRecord, rng: &mut R, ctx: &TickContext<'_>) {
    if !matches!(robot.status, RobotStatus::Active | RobotStatus::Idle) {
        return;
    }
    let probability = ctx.vendors.get(robot.vendor).fault_probability;
    if probability <= 0.0 || !rng.gen_bool(probability.min(1.0)) {
        return;
    }
    let pool = faults::injectable(robot.vendor);
    let Some(def) = pool.choose(rng).copied() else {
        return;
    };
    let dwell = draw_speed(
        rng,
        (ctx.config.error_dwell_min_secs, ctx.config.error_dwell_max_secs),
    );
    inject_fault(robot, def, ctx.now, dwell, ctx.facility);
}

/// Put a robot into the error state with the given fault
pub fn inject_fault(
    robot: &mut RobotRecord,
    def: &faults::FaultDef,
    now: SimTime,
    dwell_secs: f64,
    facility: &Facility,
) {
    robot.cancel_task(now, &format!("fault {}", def.code));
    robot.status = RobotStatus::Error;
    robot.speed = 0.0;
    robot.error_started_at = Some(now);
    robot.recover_after_secs = dwell_secs;
    robot.fault = Some(ActiveFault::from_def(def, now));
    robot.error_history.push(ErrorRecord {
        code: def.code.to_string(),
        name: def.name.to_string(),
        timestamp: now,
        position: robot.position,
        zone: facility.zone_name(robot.position),
    });
    robot.log(now, format!("Error: {} - {}", def.code, def.name), ActivityKind::Error);
    tracing::info!("{} faulted with {} ({})", robot.id, def.code, def.name);
}
