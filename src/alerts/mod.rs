//! Conflict detection and alert lifecycle

pub mod detection;
pub mod engine;
pub mod model;

pub use engine::ConflictEngine;
pub use model::{fingerprint, Alert, AlertSeverity, AlertType};
