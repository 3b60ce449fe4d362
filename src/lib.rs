//! FleetWatch - AMR fleet simulation with conflict detection
//!
//! A seeded simulation of a mixed-vendor robot fleet in a warehouse grid,
//! and a conflict engine that turns fleet snapshots into deduplicated,
//! time-bounded operator alerts.

pub mod alerts;
pub mod analysis;
pub mod core;
pub mod facility;
pub mod fleet;
pub mod runtime;

pub use crate::alerts::{Alert, AlertSeverity, AlertType, ConflictEngine};
pub use crate::core::{FleetConfig, FleetError, Result};
pub use crate::fleet::{Command, CommandError, CommandOutcome, FleetSimulator};
pub use crate::runtime::{FleetContext, FleetUpdate};
