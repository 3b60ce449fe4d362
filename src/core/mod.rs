pub mod config;
pub mod error;
pub mod types;

pub use config::{DetectionConfig, FleetConfig, SimulationConfig};
pub use error::{FleetError, Result};
pub use types::{AlertId, Position, RobotId, SimTime, TaskId, Tick};
