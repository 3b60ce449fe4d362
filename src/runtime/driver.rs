//! Periodic driver
//!
//! Ticks the fleet, runs detection on schedule, hands newly errored robots
//! to the enricher and publishes a [`FleetUpdate`] after every tick.

use std::time::Duration;
use tokio::sync::{broadcast, watch};

use crate::analysis::{Enricher, IncidentContext};

use super::context::{FleetContext, FleetUpdate};

#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Wall-clock pause between ticks; `None` runs as fast as possible
    pub tick_interval: Option<Duration>,
    /// Stop after this many ticks; `None` runs until shutdown
    pub max_ticks: Option<u64>,
}

impl DriverOptions {
    /// Real-time pacing at the simulation's own tick interval
    pub fn realtime(tick_secs: f64) -> Self {
        Self {
            tick_interval: Some(Duration::from_secs_f64(tick_secs)),
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverReport {
    pub ticks: u64,
    pub alerts_raised: usize,
    pub incidents_submitted: usize,
    pub analyses_attached: usize,
}

/// Run the tick loop until `max_ticks` or until `shutdown` flips to true
pub async fn run(
    ctx: &mut FleetContext,
    enricher: &mut Enricher,
    options: &DriverOptions,
    updates: &broadcast::Sender<FleetUpdate>,
    shutdown: watch::Receiver<bool>,
) -> DriverReport {
    let mut report = DriverReport::default();
    let mut interval = options.tick_interval.map(tokio::time::interval);

    tracing::info!(
        "Driver started ({})",
        match options.tick_interval {
            Some(d) => format!("{:?} per tick", d),
            None => "unpaced".into(),
        }
    );

    loop {
        if *shutdown.borrow() {
            tracing::info!("Shutdown requested after {} ticks", report.ticks);
            break;
        }
        if options.max_ticks.is_some_and(|max| report.ticks >= max) {
            break;
        }

        match interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            // Give enrichment tasks a chance to run between ticks
            None => tokio::task::yield_now().await,
        }

        let step = ctx.step();
        report.ticks += 1;
        report.alerts_raised += step.new_alerts.len();

        for id in &step.newly_errored {
            if let Some(incident) = IncidentContext::gather(&ctx.simulator, id) {
                if enricher.submit(incident) {
                    report.incidents_submitted += 1;
                }
            }
        }
        for id in &step.recovered {
            enricher.forget(id);
        }
        report.analyses_attached += enricher.drain(&mut ctx.engine);

        if updates.receiver_count() > 0 && updates.send(ctx.update()).is_err() {
            tracing::debug!("No subscribers for tick {}", step.tick);
        }
    }

    report.analyses_attached += enricher.drain(&mut ctx.engine);
    tracing::info!(
        "Driver stopped: {} ticks, {} alerts, {} analyses attached",
        report.ticks,
        report.alerts_raised,
        report.analyses_attached
    );
    report
}
